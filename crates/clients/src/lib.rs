//! HTTP clients for the gateway's backends
//!
//! Each client wraps one backend service behind the matching core trait:
//! - [`VoiceClient`]: speech transcription and speaker identification
//! - [`LlmClient`]: reply generation
//! - [`LearningClient`]: correction submission
//!
//! All three also implement [`assistant_core::HealthCheck`] against the
//! service's `GET /health` endpoint.

mod http;
pub mod learning;
pub mod llm;
pub mod voice;

pub use http::HttpClientConfig;
pub use learning::LearningClient;
pub use llm::LlmClient;
pub use voice::VoiceClient;
