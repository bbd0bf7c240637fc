//! Session lifecycle
//!
//! ```text
//!   signal ──► listener ──schedule──┐
//!                                   ▼
//!   event ──► guard ──► handler ──► ShutdownCoordinator ──► ShutdownState
//!              │                          │
//!              └── consults ◄─────────────┘
//! ```

pub mod coordinator;
pub mod guard;
pub mod signals;
pub mod state;
pub mod tasks;

pub use coordinator::{
    DEFAULT_CANCEL_TIMEOUT, ShutdownCoordinator, ShutdownReport, ShutdownStep, StepOutcome,
};
pub use guard::{Cancelled, EventHandlerGuard, GuardOutcome, HandlerError};
pub use signals::spawn_signal_listener;
pub use state::ShutdownState;
pub use tasks::{TaskFailure, TaskOutcome, TaskReport, TaskSet};
