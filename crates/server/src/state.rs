//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use assistant_agent::{HealthAggregator, InteractionPipeline, NamedHealthCheck, SessionStore};
use assistant_clients::{HttpClientConfig, LearningClient, LlmClient, VoiceClient};
use assistant_config::Settings;
use assistant_core::{Backend, CorrectionBackend, HealthCheck};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub settings: Arc<Settings>,
    /// Voice and chat composition over the session store
    pub pipeline: InteractionPipeline,
    /// Health fan-out across all backends
    pub health: HealthAggregator,
    /// Correction backend, called directly by `/learn`
    pub corrections: Arc<dyn CorrectionBackend>,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        pipeline: InteractionPipeline,
        health: HealthAggregator,
        corrections: Arc<dyn CorrectionBackend>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            pipeline,
            health,
            corrections,
            metrics: None,
        }
    }

    /// Build HTTP clients and the session store from `settings`
    pub fn from_settings(settings: Settings) -> Result<Self, ServerError> {
        let backends = &settings.backends;
        let timeout = backends.timeout();

        let voice = Arc::new(VoiceClient::new(HttpClientConfig::new(
            &backends.voice_url,
            timeout,
        ))?);
        let llm = Arc::new(LlmClient::new(HttpClientConfig::new(
            &backends.llm_url,
            timeout,
        ))?);
        let learning = Arc::new(LearningClient::new(HttpClientConfig::new(
            &backends.learning_url,
            timeout,
        ))?);

        let sessions = Arc::new(SessionStore::new(settings.sessions.max_history));
        let pipeline = InteractionPipeline::new(voice.clone(), llm.clone(), sessions);

        let probes: Vec<NamedHealthCheck> = vec![
            NamedHealthCheck::new(Backend::Voice.as_str(), voice as Arc<dyn HealthCheck>),
            NamedHealthCheck::new(Backend::Llm.as_str(), llm as Arc<dyn HealthCheck>),
            NamedHealthCheck::new(
                Backend::Learning.as_str(),
                learning.clone() as Arc<dyn HealthCheck>,
            ),
        ];
        let health = HealthAggregator::new(probes, backends.health_timeout());

        tracing::info!(
            voice_url = %backends.voice_url,
            llm_url = %backends.llm_url,
            learning_url = %backends.learning_url,
            timeout_s = backends.timeout_seconds,
            "Backend clients configured"
        );

        Ok(Self::new(settings, pipeline, health, learning))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.pipeline.sessions()
    }
}
