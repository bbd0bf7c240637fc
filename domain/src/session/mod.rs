//! Session domain module
//!
//! One session is one real-time voice interaction, from the first
//! participant connecting to the last one leaving (or the process being
//! told to stop).
//!
//! - [`ConversationId`]: immutable id minted when the session starts
//! - [`SessionEvent`] / [`EventKind`]: what the transport and turn
//!   processor report while the call is live
//! - [`TurnMessage`]: LLM context messages
//! - [`TerminationSignal`]: OS signals that end the session

pub mod conversation;
pub mod event;
pub mod message;
pub mod signal;

pub use conversation::ConversationId;
pub use event::{EventKind, SessionEvent, ToolInvocation, ToolResponse, Transcription};
pub use message::{Role, TurnMessage, first_user_message};
pub use signal::TerminationSignal;
