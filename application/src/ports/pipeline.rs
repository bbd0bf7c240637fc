//! Turn pipeline port
//!
//! Outbound control of the media pipeline: the LLM turn processor, the bot
//! UI state and the run/cancel lifecycle. Frame routing inside the pipeline
//! is not the session's concern.

use super::transport::TransportError;
use async_trait::async_trait;
use voice_domain::TurnContext;

/// Result of running a tool on behalf of the LLM.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutput {
    pub tool_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolCallOutput {
    pub fn success(tool_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(tool_id: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            content: message.into(),
            is_error: true,
        }
    }
}

/// Port for driving the conversation pipeline.
#[async_trait]
pub trait PipelinePort: Send + Sync {
    /// Install the LLM context (system prompt and toolset).
    async fn configure(&self, context: &TurnContext) -> Result<(), TransportError>;

    /// Tell the client UI that the bot is ready.
    async fn set_bot_ready(&self) -> Result<(), TransportError>;

    /// Queue an LLM run, which makes the bot speak first.
    async fn queue_llm_run(&self) -> Result<(), TransportError>;

    /// Hand a tool result back to the LLM.
    async fn send_tool_result(&self, output: &ToolCallOutput) -> Result<(), TransportError>;

    /// Stop the pipeline. Must be idempotent.
    async fn cancel(&self) -> Result<(), TransportError>;
}
