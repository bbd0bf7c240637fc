//! Session parameters: orchestrator inputs.
//!
//! [`SessionParams`] groups the static values the
//! [`SessionOrchestrator`](crate::use_cases::run_session::SessionOrchestrator)
//! needs at startup. They are resolved from file and environment
//! configuration by the infrastructure layer.

use crate::lifecycle::DEFAULT_CANCEL_TIMEOUT;
use std::fmt;
use std::time::Duration;
use voice_domain::PromptTemplate;

pub const DEFAULT_BOT_NAME: &str = "AI Copilot";

#[derive(Clone)]
pub struct SessionParams {
    /// Room the transport joins (logged only).
    pub room_url: Option<String>,
    /// Room token (never logged).
    pub token: Option<String>,
    pub bot_name: String,
    pub system_prompt: String,
    /// Bound on waiting for cancelled tasks during shutdown.
    pub cancel_timeout: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            room_url: None,
            token: None,
            bot_name: DEFAULT_BOT_NAME.to_string(),
            system_prompt: PromptTemplate::copilot_system().to_string(),
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
        }
    }
}

impl SessionParams {
    // ==================== Builder Methods ====================

    pub fn with_room_url(mut self, url: impl Into<String>) -> Self {
        self.room_url = Some(url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = name.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_cancel_timeout(mut self, timeout: Duration) -> Self {
        self.cancel_timeout = timeout;
        self
    }

    /// Token as it may appear in logs.
    pub fn masked_token(&self) -> &'static str {
        if self.token.is_some() { "***" } else { "<none>" }
    }
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("room_url", &self.room_url)
            .field("token", &self.masked_token())
            .field("bot_name", &self.bot_name)
            .field("cancel_timeout", &self.cancel_timeout)
            .finish_non_exhaustive()
    }
}
