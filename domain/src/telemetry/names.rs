//! Span and service names recorded by the session.

pub const CLIENT_CONNECTED: &str = "client_connected";
pub const SPEECH_TO_TEXT: &str = "speech_to_text";
pub const LLM_INPUT_CAPTURE: &str = "llm_input_capture";
pub const LLM_ERROR: &str = "llm_error";
pub const TOOL_CALL: &str = "ai_copilot_tool_call";
pub const TOOL_RESPONSE: &str = "ai_copilot_tool_response";
pub const TOOLS_REGISTERED: &str = "mcp_tools_registered";
pub const PROVIDER_ERROR: &str = "mcp_error";

/// `service` metadata values
pub mod service {
    pub const VOICE_SESSION: &str = "voice_session";
    pub const TRANSPORT: &str = "daily_transport";
    pub const LLM: &str = "google_llm";
    pub const TOOLS: &str = "ai_copilot_mcp";
}
