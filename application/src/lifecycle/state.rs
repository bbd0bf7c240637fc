//! Shared shutdown state
//!
//! One instance per session process, shared by `Arc`. The phase only moves
//! forward; once shutting down it is never reset.

use tokio::sync::watch;
use tracing::debug;
use voice_domain::ShutdownPhase;

/// Observable shutdown phase.
///
/// Backed by a `watch` channel so waiters on [`wait_completed`](Self::wait_completed)
/// are woken by the final transition.
#[derive(Debug)]
pub struct ShutdownState {
    tx: watch::Sender<ShutdownPhase>,
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ShutdownPhase::Running);
        Self { tx }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.tx.borrow()
    }

    /// `true` once shutdown has begun (ShuttingDown or Completed).
    pub fn is_shutting_down(&self) -> bool {
        self.phase().is_terminating()
    }

    pub fn is_completed(&self) -> bool {
        self.phase() == ShutdownPhase::Completed
    }

    /// Running → ShuttingDown.
    ///
    /// Returns `true` only for the caller that performed the transition.
    /// The test-and-set happens inside the channel lock, so exactly one of
    /// any number of concurrent callers wins.
    pub fn begin_shutdown(&self) -> bool {
        self.advance(ShutdownPhase::ShuttingDown)
    }

    /// ShuttingDown → Completed. Returns `true` if this call transitioned.
    pub fn mark_completed(&self) -> bool {
        self.advance(ShutdownPhase::Completed)
    }

    fn advance(&self, to: ShutdownPhase) -> bool {
        let advanced = self.tx.send_if_modified(|phase| match phase.transition_to(to) {
            Ok(next) => {
                *phase = next;
                true
            }
            Err(_) => false,
        });
        if advanced {
            debug!(phase = %to.as_str(), "Shutdown phase advanced");
        }
        advanced
    }

    /// Wait until the phase reaches Completed.
    pub async fn wait_completed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|phase| *phase == ShutdownPhase::Completed).await;
    }
}
