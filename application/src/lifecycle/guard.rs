//! Event handler guard
//!
//! Every externally triggered callback runs through [`EventHandlerGuard::run`].
//! The guard refuses to start a handler once the scheduler is closing or the
//! session is shutting down, and classifies whatever the handler returns:
//!
//! | Handler result            | Guard action            |
//! |---------------------------|-------------------------|
//! | `Ok(())`                  | `Completed`             |
//! | `HandlerError::Cancelled` | propagated as `Err`     |
//! | teardown race             | warning, swallowed      |
//! | any other error or panic  | error, swallowed        |

use super::state::ShutdownState;
use crate::ports::scheduler::SchedulerProbe;
use crate::ports::transport::TransportError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};
use voice_domain::EventKind;

/// Failure raised by a guarded handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Cooperative cancellation. Never swallowed.
    #[error("Handler cancelled")]
    Cancelled,

    /// The handler touched a session resource that was being torn down.
    #[error("Resource torn down during shutdown: {0}")]
    RaceDuringShutdown(String),

    #[error("Handler fault: {0}")]
    Fault(String),
}

impl From<TransportError> for HandlerError {
    fn from(e: TransportError) -> Self {
        if e.is_teardown_race() {
            HandlerError::RaceDuringShutdown(e.to_string())
        } else {
            HandlerError::Fault(e.to_string())
        }
    }
}

/// Cancellation signal surfaced by the guard to its caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cancelled")]
pub struct Cancelled;

/// What the guard did with a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Completed,
    SkippedSchedulerClosed,
    SkippedShuttingDown,
    RaceSwallowed,
    FaultSwallowed,
}

impl GuardOutcome {
    pub fn ran(&self) -> bool {
        !matches!(
            self,
            GuardOutcome::SkippedSchedulerClosed | GuardOutcome::SkippedShuttingDown
        )
    }
}

/// Wraps event handlers with shutdown and scheduler liveness checks.
#[derive(Clone)]
pub struct EventHandlerGuard {
    state: Arc<ShutdownState>,
    scheduler: Arc<dyn SchedulerProbe>,
}

impl EventHandlerGuard {
    pub fn new(state: Arc<ShutdownState>, scheduler: Arc<dyn SchedulerProbe>) -> Self {
        Self { state, scheduler }
    }

    /// Run `handler` unless the session can no longer accept work.
    ///
    /// The liveness checks and the call that creates the handler future run
    /// without a suspension point in between.
    pub async fn run<F, Fut>(&self, kind: EventKind, handler: F) -> Result<GuardOutcome, Cancelled>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), HandlerError>>,
    {
        if !self.scheduler.is_alive() {
            warn!(handler = %kind, "Scheduler closed, skipping handler");
            return Ok(GuardOutcome::SkippedSchedulerClosed);
        }
        if self.state.is_shutting_down() {
            warn!(handler = %kind, phase = %self.state.phase(), "Session shutting down, skipping handler");
            return Ok(GuardOutcome::SkippedShuttingDown);
        }

        let result = AssertUnwindSafe(handler()).catch_unwind().await;

        match result {
            Ok(Ok(())) => Ok(GuardOutcome::Completed),
            Ok(Err(HandlerError::Cancelled)) => Err(Cancelled),
            Ok(Err(HandlerError::RaceDuringShutdown(message))) => {
                warn!(handler = %kind, error = %message, "Handler raced session teardown");
                Ok(GuardOutcome::RaceSwallowed)
            }
            Ok(Err(HandlerError::Fault(message))) if !self.scheduler.is_alive() => {
                warn!(handler = %kind, error = %message, "Handler failed while scheduler was closing");
                Ok(GuardOutcome::RaceSwallowed)
            }
            Ok(Err(HandlerError::Fault(message))) => {
                error!(handler = %kind, error = %message, "Handler failed");
                Ok(GuardOutcome::FaultSwallowed)
            }
            Err(panic) => {
                error!(handler = %kind, error = %panic_message(&*panic), "Handler panicked");
                Ok(GuardOutcome::FaultSwallowed)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
