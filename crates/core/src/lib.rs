//! Core types and traits for the assistant gateway
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation messages and roles
//! - Speech outcomes as a closed sum type
//! - Reply and correction contracts
//! - Backend health types and classification
//! - Backend traits
//! - Error taxonomy

pub mod contracts;
pub mod conversation;
pub mod error;
pub mod health;
pub mod traits;
pub mod voice;

pub use contracts::{CorrectionReceipt, CorrectionRequest, Reply, ReplyRequest};
pub use conversation::{HistoryEntry, Message, Role};
pub use error::{Backend, BackendError, Error, ErrorKind, Result};
pub use health::{AggregateHealth, BackendStatus, HealthResult, OverallStatus};
pub use traits::{CorrectionBackend, HealthCheck, ReplyBackend, SpeechBackend};
pub use voice::{
    ProtocolViolation, RecognizedSpeech, SpeakerMatch, VoiceOutcome, VoiceResponseWire,
    VoiceStatus,
};
