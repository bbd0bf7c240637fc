//! Use cases
//!
//! - [`run_session`]: the session orchestrator
//! - [`dispatch`]: typed handler registry, event pump and per-kind workers
//! - [`handlers`]: per-event session logic

pub mod dispatch;
pub mod handlers;
pub mod run_session;
