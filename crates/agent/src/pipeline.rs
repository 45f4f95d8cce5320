//! Voice and text interaction pipeline
//!
//! # Voice path
//!
//! ```text
//! audio ──► speech backend ──┬─ no_speech ───────────► NoSpeech
//!                            ├─ rejected ────────────► Rejected { confidence }
//!                            ├─ identified/fallback ─► reply backend ─┬─ ok ──► commit 2 turns ──► Answered
//!                            │                                       └─ err ─► Failed
//!                            └─ anything else ───────► Failed (protocol)
//! ```
//!
//! A commit appends the user turn and the assistant turn in one store
//! update, after the reply has arrived. A request that fails, times out or
//! is dropped before that point leaves the session untouched.

use std::sync::Arc;

use assistant_core::{
    BackendError, Error, Message, RecognizedSpeech, ReplyBackend, ReplyRequest, Result,
    SpeakerMatch, SpeechBackend, VoiceOutcome,
};

use crate::session::{Session, SessionStore};

/// Voice request that reached the reply backend
#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredVoice {
    /// How the speaker was attributed; `Fallback` marks a non-voiceprint match
    pub speaker_match: SpeakerMatch,
    pub speaker_id: String,
    pub confidence: f64,
    pub transcript: String,
    pub response: String,
    pub model_used: String,
    pub memories_used: Vec<String>,
}

/// Terminal outcome of the voice path
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceReply {
    /// No speech in the audio; nothing was recorded
    NoSpeech,
    /// Speaker could not be attributed; nothing was recorded
    Rejected { confidence: f64 },
    Answered(AnsweredVoice),
}

/// Result of the text chat path
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub speaker_id: String,
    pub response: String,
    pub model_used: String,
    pub memories_used: Vec<String>,
}

/// Composes speech and reply backends and records exchanges in the store
#[derive(Clone)]
pub struct InteractionPipeline {
    speech: Arc<dyn SpeechBackend>,
    replies: Arc<dyn ReplyBackend>,
    sessions: Arc<SessionStore>,
}

impl InteractionPipeline {
    pub fn new(
        speech: Arc<dyn SpeechBackend>,
        replies: Arc<dyn ReplyBackend>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            speech,
            replies,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Resolve `id` to a live session, creating one if needed
    pub fn open_session(&self, id: &str) -> Session {
        self.sessions.get_or_create(id)
    }

    /// Run the voice path for `audio` and record the exchange in `session_id`
    pub async fn process_voice(&self, session_id: &str, audio: Vec<u8>) -> Result<VoiceReply> {
        if audio.is_empty() {
            return Err(Error::Validation("audio is empty".to_string()));
        }

        let outcome = self
            .speech
            .process_speech(audio)
            .await
            .map_err(|e| backend_failure(session_id, e))?;

        tracing::debug!(
            session_id = %session_id,
            status = %outcome.status(),
            "Speech processed"
        );

        let (speaker_match, speech) = match outcome {
            VoiceOutcome::NoSpeech => return Ok(VoiceReply::NoSpeech),
            VoiceOutcome::Rejected { confidence } => {
                tracing::info!(session_id = %session_id, confidence, "Speaker rejected");
                return Ok(VoiceReply::Rejected { confidence });
            }
            VoiceOutcome::Identified(speech) => (SpeakerMatch::Identified, speech),
            VoiceOutcome::Fallback(speech) => (SpeakerMatch::Fallback, speech),
        };

        let RecognizedSpeech {
            speaker_id,
            confidence,
            transcript,
        } = speech;

        // Voice turns are answered without prior context
        let request = ReplyRequest::fresh(speaker_id.clone(), transcript.clone());
        let reply = self
            .replies
            .generate_reply(&request)
            .await
            .map_err(|e| backend_failure(session_id, e))?;

        self.commit(session_id, &speaker_id, &transcript, &reply.text, &reply.model_used);

        tracing::info!(
            session_id = %session_id,
            speaker_id = %speaker_id,
            status = ?speaker_match,
            model = %reply.model_used,
            "Voice exchange recorded"
        );

        Ok(VoiceReply::Answered(AnsweredVoice {
            speaker_match,
            speaker_id,
            confidence,
            transcript,
            response: reply.text,
            model_used: reply.model_used,
            memories_used: reply.memories_used,
        }))
    }

    /// Answer `message` with the session's history as context and record
    /// the exchange
    pub async fn process_chat(
        &self,
        session_id: &str,
        speaker_id: &str,
        message: &str,
    ) -> Result<ChatReply> {
        if speaker_id.trim().is_empty() {
            return Err(Error::Validation("user_id is required".to_string()));
        }
        if message.trim().is_empty() {
            return Err(Error::Validation("message is required".to_string()));
        }

        let history = self
            .sessions
            .get_history(session_id)
            .iter()
            .map(Message::to_history_entry)
            .collect();
        let request = ReplyRequest::fresh(speaker_id, message).with_history(history);

        let reply = self
            .replies
            .generate_reply(&request)
            .await
            .map_err(|e| backend_failure(session_id, e))?;

        self.commit(session_id, speaker_id, message, &reply.text, &reply.model_used);

        tracing::info!(
            session_id = %session_id,
            speaker_id = %speaker_id,
            history_len = request.history.len(),
            model = %reply.model_used,
            "Chat exchange recorded"
        );

        Ok(ChatReply {
            speaker_id: speaker_id.to_string(),
            response: reply.text,
            model_used: reply.model_used,
            memories_used: reply.memories_used,
        })
    }

    /// Copy of the session's history
    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions.get_history(session_id)
    }

    /// Empty the session's history; `false` if the session is unknown
    pub fn clear_history(&self, session_id: &str) -> bool {
        let cleared = self.sessions.clear(session_id);
        tracing::info!(session_id = %session_id, cleared, "History cleared");
        cleared
    }

    fn commit(&self, session_id: &str, speaker_id: &str, said: &str, answer: &str, model: &str) {
        let model_used = (!model.is_empty()).then(|| model.to_string());
        let turns = vec![
            Message::user(speaker_id, said),
            Message::assistant(speaker_id, answer, model_used),
        ];
        if !self.sessions.append_turns(session_id, turns) {
            tracing::warn!(
                session_id = %session_id,
                "Session expired before the exchange could be recorded"
            );
        }
    }
}

fn backend_failure(session_id: &str, err: BackendError) -> Error {
    if err.is_protocol() {
        tracing::error!(
            session_id = %session_id,
            backend = %err.backend(),
            error = %err,
            "Backend protocol violation"
        );
    } else {
        tracing::warn!(
            session_id = %session_id,
            backend = %err.backend(),
            error = %err,
            "Backend call failed"
        );
    }
    Error::Backend(err)
}
