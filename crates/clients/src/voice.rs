//! Speech backend client

use assistant_core::{
    Backend, BackendError, HealthCheck, SpeechBackend, VoiceOutcome, VoiceResponseWire,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use crate::http::{BackendHttp, HttpClientConfig};

/// Client for the speech backend's `POST /voice/process`
///
/// Audio is uploaded as the multipart part `file`. The backend answers with
/// one of the four documented statuses; anything else becomes
/// [`BackendError::Protocol`].
#[derive(Debug, Clone)]
pub struct VoiceClient {
    http: BackendHttp,
}

impl VoiceClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, BackendError> {
        Ok(Self {
            http: BackendHttp::new(Backend::Voice, config)?,
        })
    }
}

#[async_trait]
impl SpeechBackend for VoiceClient {
    async fn process_speech(&self, audio: Vec<u8>) -> Result<VoiceOutcome, BackendError> {
        let audio_bytes = audio.len();
        let part = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| BackendError::Protocol {
                backend: self.http.backend(),
                detail: format!("invalid upload part: {}", e),
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .client()
            .post(self.http.url("/voice/process"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.http.send_error(e))?;
        let response = self.http.check_status(response).await?;
        let wire: VoiceResponseWire = self.http.read_json(response).await?;

        tracing::debug!(
            status = %wire.status,
            audio_bytes,
            "Speech backend answered"
        );

        VoiceOutcome::try_from(wire).map_err(|violation| BackendError::Protocol {
            backend: self.http.backend(),
            detail: violation.0,
        })
    }
}

#[async_trait]
impl HealthCheck for VoiceClient {
    async fn check_health(&self) -> Result<Duration, BackendError> {
        self.http.health().await
    }
}
