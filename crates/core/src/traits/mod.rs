//! Core traits for the gateway
//!
//! Backends sit behind these traits so the pipeline and the health
//! aggregator can be driven by HTTP clients in production and by fakes in
//! tests.
//!
//! # Trait Hierarchy
//!
//! ```text
//! Health:
//!   - HealthCheck: Reachability probe returning latency
//!
//! Backends:
//!   - SpeechBackend: Audio → VoiceOutcome
//!   - ReplyBackend: Message + history → Reply
//!   - CorrectionBackend: Correction → receipt
//! ```

mod backend;

pub use backend::{CorrectionBackend, HealthCheck, ReplyBackend, SpeechBackend};
