//! Correction backend client

use assistant_core::{
    Backend, BackendError, CorrectionBackend, CorrectionReceipt, CorrectionRequest, HealthCheck,
};
use async_trait::async_trait;
use std::time::Duration;

use crate::http::{BackendHttp, HttpClientConfig};

/// Client for the correction backend's `POST /learning/submit`
#[derive(Debug, Clone)]
pub struct LearningClient {
    http: BackendHttp,
}

impl LearningClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: BackendHttp::new(Backend::Learning, config)?,
        })
    }
}

#[async_trait]
impl CorrectionBackend for LearningClient {
    async fn submit_correction(
        &self,
        request: &CorrectionRequest,
    ) -> Result<CorrectionReceipt, BackendError> {
        self.http.post_json("/learning/submit", request).await
    }
}

#[async_trait]
impl HealthCheck for LearningClient {
    async fn check_health(&self) -> Result<Duration, BackendError> {
        self.http.health().await
    }
}
