//! Speech-processing outcomes
//!
//! The speech backend reports one of four statuses. Each status carries a
//! different set of fields, so the outcome is a sum type rather than one
//! struct full of optionals. Decoding from the wire form rejects any status
//! outside the closed set as a protocol violation.

use serde::{Deserialize, Serialize};

/// Status reported by the speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceStatus {
    Identified,
    Fallback,
    NoSpeech,
    Rejected,
}

impl VoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceStatus::Identified => "identified",
            VoiceStatus::Fallback => "fallback",
            VoiceStatus::NoSpeech => "no_speech",
            VoiceStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the speaker was attributed when speech was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerMatch {
    /// Voiceprint matched an enrolled profile
    Identified,
    /// Attributed through the fallback hierarchy
    Fallback,
}

impl From<SpeakerMatch> for VoiceStatus {
    fn from(value: SpeakerMatch) -> Self {
        match value {
            SpeakerMatch::Identified => VoiceStatus::Identified,
            SpeakerMatch::Fallback => VoiceStatus::Fallback,
        }
    }
}

/// Transcript attributed to a household profile
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSpeech {
    pub speaker_id: String,
    pub confidence: f64,
    pub transcript: String,
}

/// Result of one speech-processing call
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    Identified(RecognizedSpeech),
    Fallback(RecognizedSpeech),
    NoSpeech,
    Rejected { confidence: f64 },
}

impl VoiceOutcome {
    pub fn status(&self) -> VoiceStatus {
        match self {
            VoiceOutcome::Identified(_) => VoiceStatus::Identified,
            VoiceOutcome::Fallback(_) => VoiceStatus::Fallback,
            VoiceOutcome::NoSpeech => VoiceStatus::NoSpeech,
            VoiceOutcome::Rejected { .. } => VoiceStatus::Rejected,
        }
    }
}

/// JSON body returned by the speech backend's process endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceResponseWire {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// A wire value that does not fit the documented contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProtocolViolation(pub String);

impl TryFrom<VoiceResponseWire> for VoiceOutcome {
    type Error = ProtocolViolation;

    fn try_from(wire: VoiceResponseWire) -> Result<Self, Self::Error> {
        let recognized = |wire: VoiceResponseWire| -> Result<RecognizedSpeech, ProtocolViolation> {
            let speaker_id = wire
                .user_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    ProtocolViolation(format!("status '{}' without user_id", wire.status))
                })?;
            let transcript = wire.transcript.ok_or_else(|| {
                ProtocolViolation(format!("status '{}' without transcript", wire.status))
            })?;
            Ok(RecognizedSpeech {
                speaker_id,
                confidence: wire.confidence.unwrap_or_default(),
                transcript,
            })
        };

        let status = wire.status.clone();
        match status.as_str() {
            "identified" => Ok(VoiceOutcome::Identified(recognized(wire)?)),
            "fallback" => Ok(VoiceOutcome::Fallback(recognized(wire)?)),
            "no_speech" => Ok(VoiceOutcome::NoSpeech),
            "rejected" => Ok(VoiceOutcome::Rejected {
                confidence: wire.confidence.unwrap_or_default(),
            }),
            other => Err(ProtocolViolation(format!("unknown voice status '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: serde_json::Value) -> VoiceResponseWire {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_identified_decodes_all_fields() {
        let outcome = VoiceOutcome::try_from(wire(serde_json::json!({
            "status": "identified",
            "user_id": "mom",
            "confidence": 0.92,
            "transcript": "hello"
        })))
        .unwrap();

        assert_eq!(
            outcome,
            VoiceOutcome::Identified(RecognizedSpeech {
                speaker_id: "mom".to_string(),
                confidence: 0.92,
                transcript: "hello".to_string(),
            })
        );
        assert_eq!(outcome.status(), VoiceStatus::Identified);
    }

    #[test]
    fn test_rejected_keeps_only_confidence() {
        let outcome = VoiceOutcome::try_from(wire(serde_json::json!({
            "status": "rejected",
            "user_id": null,
            "confidence": 0.41
        })))
        .unwrap();

        assert_eq!(outcome, VoiceOutcome::Rejected { confidence: 0.41 });
    }

    #[test]
    fn test_no_speech_ignores_extra_fields() {
        let outcome = VoiceOutcome::try_from(wire(serde_json::json!({
            "status": "no_speech",
            "transcript": ""
        })))
        .unwrap();

        assert_eq!(outcome, VoiceOutcome::NoSpeech);
    }

    #[test]
    fn test_unknown_status_is_protocol_violation() {
        let err = VoiceOutcome::try_from(wire(serde_json::json!({ "status": "error" })))
            .unwrap_err();
        assert!(err.0.contains("error"));
    }

    #[test]
    fn test_fallback_without_speaker_is_protocol_violation() {
        let result = VoiceOutcome::try_from(wire(serde_json::json!({
            "status": "fallback",
            "transcript": "turn on the lights"
        })));
        assert!(result.is_err());
    }

    #[test]
    fn test_speaker_match_maps_to_status() {
        assert_eq!(VoiceStatus::from(SpeakerMatch::Fallback), VoiceStatus::Fallback);
        assert_eq!(VoiceStatus::NoSpeech.as_str(), "no_speech");
    }
}
