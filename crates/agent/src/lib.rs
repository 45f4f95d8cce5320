//! Conversation orchestration for the assistant gateway
//!
//! Features:
//! - Bounded per-session conversation history with periodic sweeping
//! - Parallel health checks across backends
//! - Voice-to-chat composition with atomic history commits

pub mod health;
pub mod pipeline;
pub mod session;

pub use health::{check_all, HealthAggregator, NamedHealthCheck};
pub use pipeline::{AnsweredVoice, ChatReply, InteractionPipeline, VoiceReply};
pub use session::{Session, SessionStore};
