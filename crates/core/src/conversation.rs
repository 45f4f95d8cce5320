//! Conversation types: roles and history messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Household member speaking or typing
    User,
    /// Generated reply
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in a session's history
///
/// `timestamp` is assigned by the session store when the message is
/// appended; whatever the caller puts there is overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the speaker
    pub role: Role,
    /// Text of the turn
    pub content: String,
    /// Household profile this turn is attributed to
    #[serde(rename = "user_id")]
    pub speaker_id: String,
    /// Model label for assistant turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user turn
    pub fn user(speaker_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            speaker_id: speaker_id.into(),
            model_used: None,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(
        speaker_id: impl Into<String>,
        content: impl Into<String>,
        model_used: Option<String>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            speaker_id: speaker_id.into(),
            model_used,
            timestamp: Utc::now(),
        }
    }

    /// Role/content pair sent to the reply backend as context
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Prior-turn context as the reply backend sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}
