//! Error taxonomy shared by clients, pipeline and request surface

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The backends the gateway talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Speech transcription and speaker identification
    Voice,
    /// Reply generation
    Llm,
    /// Correction review
    Learning,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Voice => "voice",
            Backend::Llm => "llm",
            Backend::Learning => "learning",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of a single backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{backend} backend unreachable: {reason}")]
    Unavailable { backend: Backend, reason: String },

    #[error("{backend} backend returned status {status}: {body}")]
    Status {
        backend: Backend,
        status: u16,
        body: String,
    },

    #[error("{backend} backend timed out")]
    Timeout { backend: Backend },

    /// The backend answered with something outside its documented contract
    #[error("{backend} backend protocol violation: {detail}")]
    Protocol { backend: Backend, detail: String },
}

impl BackendError {
    pub fn backend(&self) -> Backend {
        match self {
            BackendError::Unavailable { backend, .. }
            | BackendError::Status { backend, .. }
            | BackendError::Timeout { backend }
            | BackendError::Protocol { backend, .. } => *backend,
        }
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, BackendError::Protocol { .. })
    }
}

/// Coarse classification used when surfacing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input; never retried
    Validation,
    /// A dependency failed or timed out
    Unavailable,
    /// A dependency broke its contract; details stay in the logs
    Protocol,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Protocol => "protocol",
        }
    }
}

/// Errors surfaced by the interaction pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Backend(e) if e.is_protocol() => ErrorKind::Protocol,
            Error::Backend(_) => ErrorKind::Unavailable,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
