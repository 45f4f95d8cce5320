//! Shared request plumbing for backend clients

use assistant_core::{Backend, BackendError};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the service, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// A configured connection to one backend
///
/// Holds only immutable configuration and a pooled `reqwest::Client`, so it
/// is cheap to clone and safe to share across requests.
#[derive(Debug, Clone)]
pub(crate) struct BackendHttp {
    backend: Backend,
    client: Client,
    base_url: String,
}

impl BackendHttp {
    pub(crate) fn new(backend: Backend, config: HttpClientConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Unavailable {
                backend,
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            backend,
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn backend(&self) -> Backend {
        self.backend
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a transport failure onto the backend error taxonomy
    pub(crate) fn send_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                backend: self.backend,
            }
        } else {
            BackendError::Unavailable {
                backend: self.backend,
                reason: err.to_string(),
            }
        }
    }

    /// Reject non-2xx responses, keeping the body for diagnostics
    pub(crate) async fn check_status(&self, response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            backend: self.backend,
            status: status.as_u16(),
            body,
        })
    }

    /// Decode a JSON body; a body that doesn't match is a contract breach
    pub(crate) async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, BackendError> {
        let bytes = response.bytes().await.map_err(|e| self.send_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Protocol {
            backend: self.backend,
            detail: format!("undecodable response: {}", e),
        })
    }

    /// POST a JSON body and decode the JSON answer
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response).await?;
        self.read_json(response).await
    }

    /// `GET /health`, returning the round-trip latency on a 2xx answer
    pub(crate) async fn health(&self) -> Result<Duration, BackendError> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.check_status(response).await?;
        Ok(start.elapsed())
    }
}
