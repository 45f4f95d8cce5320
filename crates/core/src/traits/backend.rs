//! Backend client traits

use async_trait::async_trait;
use std::time::Duration;

use crate::contracts::{CorrectionReceipt, CorrectionRequest, Reply, ReplyRequest};
use crate::error::BackendError;
use crate::voice::VoiceOutcome;

/// Reachability probe shared by every backend
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    /// Probe the backend, returning the latency it observed
    async fn check_health(&self) -> Result<Duration, BackendError>;
}

/// Speech transcription and speaker identification
///
/// Implementations:
/// - `VoiceClient` - HTTP speech backend
#[async_trait]
pub trait SpeechBackend: Send + Sync + 'static {
    /// Transcribe decoded audio and attribute it to a household profile.
    ///
    /// Statuses outside the documented set surface as
    /// `BackendError::Protocol`.
    async fn process_speech(&self, audio: Vec<u8>) -> Result<VoiceOutcome, BackendError>;
}

/// Reply generation
///
/// Implementations:
/// - `LlmClient` - HTTP reply backend
#[async_trait]
pub trait ReplyBackend: Send + Sync + 'static {
    async fn generate_reply(&self, request: &ReplyRequest) -> Result<Reply, BackendError>;
}

/// Correction submission for supervised review
#[async_trait]
pub trait CorrectionBackend: Send + Sync + 'static {
    async fn submit_correction(
        &self,
        request: &CorrectionRequest,
    ) -> Result<CorrectionReceipt, BackendError>;
}
