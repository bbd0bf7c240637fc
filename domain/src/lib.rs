//! Domain layer for voice-copilot
//!
//! This crate contains the core entities and value objects of a real-time
//! voice session. It has no dependencies on infrastructure or presentation
//! concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Session
//!
//! One voice call, identified by a [`ConversationId`]. While it is live the
//! transport and the LLM turn processor report [`SessionEvent`]s.
//!
//! ## Shutdown
//!
//! A one-way [`ShutdownPhase`] machine: `Running → ShuttingDown → Completed`.
//!
//! ## Tools
//!
//! External [`ToolProvider`]s advertise [`ToolDescriptor`]s which are merged
//! once per session into an immutable [`ToolsetSnapshot`].
//!
//! ## Telemetry
//!
//! Spans carry [`SpanAttributes`] as metadata and payload.

pub mod core;
pub mod prompt;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod tool;

// Re-export commonly used types
pub use core::error::DomainError;
pub use prompt::{PromptTemplate, TurnContext};
pub use session::{
    ConversationId, EventKind, Role, SessionEvent, TerminationSignal, ToolInvocation,
    ToolResponse, Transcription, TurnMessage, first_user_message,
};
pub use shutdown::ShutdownPhase;
pub use telemetry::{Scalar, SpanAttributes};
pub use tool::{ProviderError, ToolDescriptor, ToolEntry, ToolProvider, ToolsetSnapshot};
