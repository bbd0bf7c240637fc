//! Application-level configuration.
//!
//! - [`SessionParams`]: orchestrator startup inputs (room, prompt, shutdown bound)

pub mod session_params;

pub use session_params::{DEFAULT_BOT_NAME, SessionParams};
