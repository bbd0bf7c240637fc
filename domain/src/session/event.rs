//! Session events reported by the transport and the turn processor.
//!
//! Every externally observable thing that can happen during a call is one
//! variant of [`SessionEvent`]. [`EventKind`] is its fieldless mirror and is
//! the key of the typed handler registry: one guarded handler per kind.

use super::message::TurnMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transcription produced by the transport's speech-to-text stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub participant_id: Option<String>,
    /// UTC timestamp as reported by the transport (RFC 3339).
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub confidence: f64,
}

impl Transcription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            participant_id: None,
            timestamp: None,
            duration_seconds: 0.0,
            confidence: 0.0,
        }
    }

    pub fn with_participant(mut self, id: impl Into<String>) -> Self {
        self.participant_id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Whether the transcription carries any text worth recording.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A tool invocation requested by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    #[serde(default)]
    pub tool_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The result of a tool invocation as delivered back to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default)]
    pub tool_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub result: String,
}

/// Events delivered to the session during a call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The client UI finished loading and can receive bot output.
    ClientReady,
    /// A participant joined the room.
    ClientConnected { participant_id: String },
    /// A participant left, or the transport lost them.
    ClientDisconnected { participant_id: Option<String> },
    /// Speech-to-text output for a participant.
    Transcription(Transcription),
    /// The LLM turn processor started a turn with this context.
    TurnStarted { messages: Vec<TurnMessage> },
    /// The LLM turn processor failed.
    TurnError { error_type: String, message: String },
    /// The LLM asked for a tool to be run.
    ToolInvoked(ToolInvocation),
    /// A tool result was handed back to the LLM.
    ToolResult(ToolResponse),
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::ClientReady => EventKind::ClientReady,
            SessionEvent::ClientConnected { .. } => EventKind::ClientConnected,
            SessionEvent::ClientDisconnected { .. } => EventKind::ClientDisconnected,
            SessionEvent::Transcription(_) => EventKind::Transcription,
            SessionEvent::TurnStarted { .. } => EventKind::TurnStarted,
            SessionEvent::TurnError { .. } => EventKind::TurnError,
            SessionEvent::ToolInvoked(_) => EventKind::ToolInvoked,
            SessionEvent::ToolResult(_) => EventKind::ToolResult,
        }
    }
}

/// Closed enumeration of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ClientReady,
    ClientConnected,
    ClientDisconnected,
    Transcription,
    TurnStarted,
    TurnError,
    ToolInvoked,
    ToolResult,
}

impl EventKind {
    /// All kinds, in registration order.
    pub const ALL: [EventKind; 8] = [
        EventKind::ClientReady,
        EventKind::ClientConnected,
        EventKind::ClientDisconnected,
        EventKind::Transcription,
        EventKind::TurnStarted,
        EventKind::TurnError,
        EventKind::ToolInvoked,
        EventKind::ToolResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClientReady => "client_ready",
            EventKind::ClientConnected => "client_connected",
            EventKind::ClientDisconnected => "client_disconnected",
            EventKind::Transcription => "transcription",
            EventKind::TurnStarted => "turn_started",
            EventKind::TurnError => "turn_error",
            EventKind::ToolInvoked => "tool_invoked",
            EventKind::ToolResult => "tool_result",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_mapping() {
        let event = SessionEvent::Transcription(Transcription::new("hello"));
        assert_eq!(event.kind(), EventKind::Transcription);

        let event = SessionEvent::ClientDisconnected {
            participant_id: None,
        };
        assert_eq!(event.kind(), EventKind::ClientDisconnected);
    }

    #[test]
    fn test_all_kinds_are_distinct() {
        let mut kinds = EventKind::ALL.to_vec();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), EventKind::ALL.len());
    }

    #[test]
    fn test_transcription_has_text() {
        assert!(Transcription::new("hello").has_text());
        assert!(!Transcription::new("   ").has_text());
        assert!(!Transcription::new("").has_text());
    }

    #[test]
    fn test_transcription_builder() {
        let t = Transcription::new("hello")
            .with_participant("p1")
            .with_duration(1.2)
            .with_confidence(0.9);
        assert_eq!(t.participant_id.as_deref(), Some("p1"));
        assert_eq!(t.duration_seconds, 1.2);
        assert_eq!(t.confidence, 0.9);
        assert!(t.timestamp.is_none());
    }
}
