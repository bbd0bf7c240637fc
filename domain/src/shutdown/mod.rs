//! Shutdown lifecycle domain module
//!
//! The session's teardown is a one-way state machine:
//!
//! ```text
//! ┌─────────┐  begin   ┌──────────────┐  finish  ┌───────────┐
//! │ Running │────────▶│ ShuttingDown │────────▶│ Completed │
//! └─────────┘          └──────────────┘          └───────────┘
//! ```
//!
//! Each transition fires at most once per process. Nothing ever moves
//! backwards: once a session starts shutting down it is never resumed.

pub mod phase;

pub use phase::ShutdownPhase;
