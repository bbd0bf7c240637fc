//! Shutdown phase value object

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the session shutdown state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPhase {
    /// Normal operation; guarded handlers may run.
    Running,
    /// Teardown in progress; guarded handlers are skipped.
    ShuttingDown,
    /// Teardown finished; all session resources released.
    Completed,
}

impl ShutdownPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownPhase::Running => "running",
            ShutdownPhase::ShuttingDown => "shutting_down",
            ShutdownPhase::Completed => "completed",
        }
    }

    /// `true` once teardown has begun (ShuttingDown or Completed).
    pub fn is_terminating(&self) -> bool {
        !matches!(self, ShutdownPhase::Running)
    }

    /// Only the two forward steps are legal.
    pub fn can_transition_to(&self, next: ShutdownPhase) -> bool {
        matches!(
            (self, next),
            (ShutdownPhase::Running, ShutdownPhase::ShuttingDown)
                | (ShutdownPhase::ShuttingDown, ShutdownPhase::Completed)
        )
    }

    /// Validate a transition, returning the new phase.
    pub fn transition_to(&self, next: ShutdownPhase) -> Result<ShutdownPhase, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
