//! Reply backend client

use assistant_core::{Backend, BackendError, HealthCheck, Reply, ReplyBackend, ReplyRequest};
use async_trait::async_trait;
use std::time::Duration;

use crate::http::{BackendHttp, HttpClientConfig};

/// Client for the reply backend's `POST /chat`
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: BackendHttp,
}

impl LlmClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: BackendHttp::new(Backend::Llm, config)?,
        })
    }
}

#[async_trait]
impl ReplyBackend for LlmClient {
    async fn generate_reply(&self, request: &ReplyRequest) -> Result<Reply, BackendError> {
        let reply: Reply = self.http.post_json("/chat", request).await?;

        tracing::debug!(
            speaker_id = %request.speaker_id,
            history_len = request.history.len(),
            model = %reply.model_used,
            "Reply backend answered"
        );

        Ok(reply)
    }
}

#[async_trait]
impl HealthCheck for LlmClient {
    async fn check_health(&self) -> Result<Duration, BackendError> {
        self.http.health().await
    }
}
