//! Per-event session logic
//!
//! One method per [`EventKind`]. Each runs inside the guard, so none of
//! them re-check the shutdown state; they report failures as
//! [`HandlerError`] and let the guard classify them.

use crate::lifecycle::{HandlerError, ShutdownCoordinator};
use crate::ports::pipeline::ToolCallOutput;
use crate::session::SessionContext;
use crate::use_cases::dispatch::EventHandler;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use voice_domain::telemetry::names;
use voice_domain::{
    SessionEvent, SpanAttributes, ToolInvocation, ToolResponse, Transcription, TurnMessage,
    first_user_message,
};

const UNKNOWN: &str = "unknown";

/// Handles every session event kind against one [`SessionContext`].
#[derive(Clone)]
pub struct SessionHandlers {
    context: Arc<SessionContext>,
    coordinator: Arc<ShutdownCoordinator>,
}

impl SessionHandlers {
    pub fn new(context: Arc<SessionContext>, coordinator: Arc<ShutdownCoordinator>) -> Self {
        Self {
            context,
            coordinator,
        }
    }

    fn conversation_id(&self) -> String {
        self.context.conversation_id().to_string()
    }

    async fn on_client_ready(&self) -> Result<(), HandlerError> {
        info!("Client ready, starting conversation");
        let pipeline = self.context.pipeline();
        pipeline.set_bot_ready().await?;
        pipeline.queue_llm_run().await?;
        Ok(())
    }

    async fn on_client_connected(&self, participant_id: String) -> Result<(), HandlerError> {
        info!(participant_id = %participant_id, "Client connected");
        let metadata = SpanAttributes::new()
            .with("service", names::service::VOICE_SESSION)
            .with("participant_id", &participant_id)
            .with("conversation_id", self.conversation_id());

        self.context
            .telemetry()
            .with_span_async(names::CLIENT_CONNECTED, metadata, |_| async {
                let transport = self.context.transport()?;
                transport
                    .capture_participant_transcription(&participant_id)
                    .await?;
                Ok::<(), HandlerError>(())
            })
            .await
    }

    async fn on_client_disconnected(&self, participant_id: Option<String>) -> Result<(), HandlerError> {
        info!(
            participant_id = %participant_id.as_deref().unwrap_or(UNKNOWN),
            "Client disconnected"
        );
        if let Err(e) = self.context.pipeline().cancel().await {
            warn!(error = %e, "Failed to cancel pipeline, shutting down anyway");
        }
        self.coordinator.shutdown().await;
        Ok(())
    }

    fn on_transcription(&self, transcription: Transcription) -> Result<(), HandlerError> {
        if !transcription.has_text() {
            debug!("Ignoring empty transcription");
            return Ok(());
        }
        let timestamp = transcription
            .timestamp
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        debug!(text = %transcription.text, "Transcription");

        self.context.telemetry().emit(
            names::SPEECH_TO_TEXT,
            SpanAttributes::new()
                .with("service", names::service::TRANSPORT)
                .with(
                    "participant_id",
                    transcription.participant_id.as_deref().unwrap_or(UNKNOWN),
                )
                .with("conversation_id", self.conversation_id())
                .with("audio_duration", transcription.duration_seconds)
                .with("transcription_confidence", transcription.confidence),
            Some(
                SpanAttributes::new()
                    .with("stt.text", transcription.text)
                    .with("stt.timestamp", timestamp),
            ),
        );
        Ok(())
    }

    fn on_turn_started(&self, messages: Vec<TurnMessage>) -> Result<(), HandlerError> {
        let Some(user_input) = first_user_message(&messages) else {
            debug!(messages = messages.len(), "Turn started without user input");
            return Ok(());
        };
        self.context.telemetry().emit(
            names::LLM_INPUT_CAPTURE,
            SpanAttributes::new()
                .with("service", names::service::LLM)
                .with("conversation_id", self.conversation_id())
                .with("message_length", user_input.chars().count()),
            Some(SpanAttributes::new().with("llm.user_input", user_input)),
        );
        Ok(())
    }

    fn on_turn_error(&self, error_type: String, message: String) -> Result<(), HandlerError> {
        warn!(error_type = %error_type, error = %message, "LLM turn failed");
        self.context.telemetry().emit(
            names::LLM_ERROR,
            SpanAttributes::new()
                .with("service", names::service::LLM)
                .with("conversation_id", self.conversation_id())
                .with("error_type", error_type),
            Some(
                SpanAttributes::new()
                    .with("error.message", message)
                    .with("error.timestamp", Utc::now().to_rfc3339()),
            ),
        );
        Ok(())
    }

    async fn on_tool_invoked(&self, invocation: ToolInvocation) -> Result<(), HandlerError> {
        let tool_name = invocation.name.unwrap_or_else(|| UNKNOWN.to_string());
        let tool_id = invocation.tool_id.unwrap_or_else(|| UNKNOWN.to_string());
        info!(tool = %tool_name, tool_id = %tool_id, "Tool invoked");

        let metadata = self.tool_metadata(&tool_name, &tool_id);
        let arguments = invocation.arguments;

        self.context
            .telemetry()
            .with_span_async(names::TOOL_CALL, metadata, |recorder| async move {
                recorder.record(SpanAttributes::new().with("tool.arguments", arguments.to_string()));

                let output = match argument_map(arguments) {
                    Ok(args) => match self.context.registry().call_tool(&tool_name, args).await {
                        Ok(content) => ToolCallOutput::success(&tool_id, &tool_name, content),
                        Err(e) => {
                            warn!(tool = %tool_name, error = %e, "Tool call failed");
                            ToolCallOutput::failure(&tool_id, &tool_name, e.to_string())
                        }
                    },
                    Err(message) => ToolCallOutput::failure(&tool_id, &tool_name, message),
                };
                self.context.pipeline().send_tool_result(&output).await?;
                Ok::<(), HandlerError>(())
            })
            .await
    }

    fn on_tool_result(&self, response: ToolResponse) -> Result<(), HandlerError> {
        let tool_name = response.name.as_deref().unwrap_or(UNKNOWN);
        let tool_id = response.tool_id.as_deref().unwrap_or(UNKNOWN);
        debug!(tool = %tool_name, tool_id = %tool_id, "Tool result delivered");

        self.context.telemetry().emit(
            names::TOOL_RESPONSE,
            self.tool_metadata(tool_name, tool_id),
            Some(SpanAttributes::new().with("tool.result", response.result)),
        );
        Ok(())
    }

    fn tool_metadata(&self, tool_name: &str, tool_id: &str) -> SpanAttributes {
        SpanAttributes::new()
            .with("service", names::service::TOOLS)
            .with("conversation_id", self.conversation_id())
            .with("tool_name", tool_name)
            .with("tool_id", tool_id)
    }
}

fn argument_map(arguments: Value) -> Result<Map<String, Value>, String> {
    match arguments {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(format!("Tool arguments must be a JSON object, got: {raw}")),
        },
        other => Err(format!("Tool arguments must be a JSON object, got: {other}")),
    }
}

#[async_trait]
impl EventHandler for SessionHandlers {
    async fn handle(&self, event: SessionEvent) -> Result<(), HandlerError> {
        match event {
            SessionEvent::ClientReady => self.on_client_ready().await,
            SessionEvent::ClientConnected { participant_id } => {
                self.on_client_connected(participant_id).await
            }
            SessionEvent::ClientDisconnected { participant_id } => {
                self.on_client_disconnected(participant_id).await
            }
            SessionEvent::Transcription(t) => self.on_transcription(t),
            SessionEvent::TurnStarted { messages } => self.on_turn_started(messages),
            SessionEvent::TurnError {
                error_type,
                message,
            } => self.on_turn_error(error_type, message),
            SessionEvent::ToolInvoked(invocation) => self.on_tool_invoked(invocation).await,
            SessionEvent::ToolResult(response) => self.on_tool_result(response),
        }
    }
}
