//! Assistant Gateway Server
//!
//! HTTP request surface over the interaction pipeline, health aggregator
//! and correction backend.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use self::metrics::{init_metrics, record_error, record_request};
pub use state::AppState;

use assistant_core::{BackendError, ErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        detail: Option<String>,
    },

    #[error("Backend unavailable: {0}")]
    Unavailable(BackendError),

    #[error("Backend protocol violation: {0}")]
    Protocol(BackendError),
}

impl ServerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServerError::InvalidRequest {
            message: message.into(),
            detail: None,
        }
    }

    pub fn invalid_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ServerError::InvalidRequest {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::InvalidRequest { .. } => ErrorKind::Validation,
            ServerError::Unavailable(_) => ErrorKind::Unavailable,
            ServerError::Protocol(_) => ErrorKind::Protocol,
        }
    }
}

impl From<BackendError> for ServerError {
    fn from(err: BackendError) -> Self {
        if err.is_protocol() {
            ServerError::Protocol(err)
        } else {
            ServerError::Unavailable(err)
        }
    }
}

impl From<assistant_core::Error> for ServerError {
    fn from(err: assistant_core::Error) -> Self {
        match err {
            assistant_core::Error::Validation(message) => ServerError::invalid(message),
            assistant_core::Error::Backend(e) => e.into(),
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        record_error(self.kind());

        let body = match &self {
            ServerError::InvalidRequest { message, detail } => ErrorBody {
                error: message.clone(),
                detail: detail.clone(),
            },
            ServerError::Unavailable(e) => ErrorBody {
                error: format!("{} backend unavailable", e.backend()),
                detail: Some(e.to_string()),
            },
            // Details stay in the logs
            ServerError::Protocol(e) => {
                tracing::error!(backend = %e.backend(), error = %e, "Request failed on protocol violation");
                ErrorBody {
                    error: "unexpected backend response".to_string(),
                    detail: None,
                }
            }
        };

        let status: StatusCode = self.into();
        (status, Json(body)).into_response()
    }
}
