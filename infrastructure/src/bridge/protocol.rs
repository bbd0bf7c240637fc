//! Bridge wire protocol
//!
//! Newline-delimited JSON, one object per line, discriminated by `type`.
//!
//! Inbound (bridge → session):
//!
//! ```text
//! {"type":"client_ready"}
//! {"type":"client_connected","participant_id":"p1"}
//! {"type":"client_disconnected","participant_id":"p1"}
//! {"type":"transcription","text":"hello","participant_id":"p1","timestamp":"...","duration_seconds":1.2,"confidence":0.9}
//! {"type":"turn_started","messages":[{"role":"user","content":"..."}]}
//! {"type":"turn_error","error_type":"ErrorFrame","message":"..."}
//! {"type":"tool_invoked","tool_id":"call-1","name":"search_papers","arguments":{...}}
//! {"type":"tool_result","tool_id":"call-1","name":"search_papers","result":"..."}
//! ```
//!
//! Outbound (session → bridge): `join`, `configure`, `capture_transcription`,
//! `bot_ready`, `run_llm`, `tool_result`, `cancel`.

use super::error::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use voice_domain::{SessionEvent, ToolInvocation, ToolResponse, Transcription, TurnMessage};

/// A frame received from the bridge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    ClientReady,
    ClientConnected {
        participant_id: String,
    },
    ClientDisconnected {
        #[serde(default)]
        participant_id: Option<String>,
    },
    Transcription(Transcription),
    TurnStarted {
        #[serde(default)]
        messages: Vec<TurnMessage>,
    },
    TurnError {
        #[serde(default = "default_error_type")]
        error_type: String,
        #[serde(default)]
        message: String,
    },
    ToolInvoked(ToolInvocation),
    ToolResult(ToolResponse),
}

fn default_error_type() -> String {
    "unknown".to_string()
}

impl From<InboundFrame> for SessionEvent {
    fn from(frame: InboundFrame) -> Self {
        match frame {
            InboundFrame::ClientReady => SessionEvent::ClientReady,
            InboundFrame::ClientConnected { participant_id } => {
                SessionEvent::ClientConnected { participant_id }
            }
            InboundFrame::ClientDisconnected { participant_id } => {
                SessionEvent::ClientDisconnected { participant_id }
            }
            InboundFrame::Transcription(t) => SessionEvent::Transcription(t),
            InboundFrame::TurnStarted { messages } => SessionEvent::TurnStarted { messages },
            InboundFrame::TurnError {
                error_type,
                message,
            } => SessionEvent::TurnError {
                error_type,
                message,
            },
            InboundFrame::ToolInvoked(i) => SessionEvent::ToolInvoked(i),
            InboundFrame::ToolResult(r) => SessionEvent::ToolResult(r),
        }
    }
}

/// Decode one line from the bridge.
///
/// Blank lines yield `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<SessionEvent>, BridgeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<InboundFrame>(trimmed)
        .map(|frame| Some(frame.into()))
        .map_err(|e| BridgeError::ParseError {
            error: e.to_string(),
            raw: trimmed.to_string(),
        })
}

/// A frame sent to the bridge.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame<'a> {
    Join {
        #[serde(skip_serializing_if = "Option::is_none")]
        room_url: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<&'a str>,
        bot_name: &'a str,
    },
    Configure {
        messages: &'a [TurnMessage],
        tools: Vec<Value>,
    },
    CaptureTranscription {
        participant_id: &'a str,
    },
    BotReady,
    RunLlm,
    ToolResult {
        tool_id: &'a str,
        name: &'a str,
        content: &'a str,
        is_error: bool,
    },
    Cancel,
}

/// Encode a frame as one line, including the trailing newline.
pub fn encode_frame(frame: &OutboundFrame<'_>) -> Result<String, BridgeError> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    Ok(line)
}
