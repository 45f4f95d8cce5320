//! Request/response shapes for the reply and correction backends

use serde::{Deserialize, Serialize};

use crate::conversation::HistoryEntry;

/// Request sent to the reply-generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRequest {
    #[serde(rename = "user_id")]
    pub speaker_id: String,
    pub message: String,
    #[serde(
        rename = "conversation_history",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub history: Vec<HistoryEntry>,
}

impl ReplyRequest {
    /// Request with no prior context
    pub fn fresh(speaker_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            message: message.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }
}

/// Generated reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(rename = "response")]
    pub text: String,
    #[serde(default)]
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memories_used: Vec<String>,
}

/// Free-text correction submitted for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    #[serde(rename = "user_id")]
    pub speaker_id: String,
    pub content: String,
    pub source: String,
}

/// Acknowledgement from the correction backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionReceipt {
    pub id: String,
    pub status: String,
}
