//! Telemetry backends
//!
//! [`LangfuseBackend`] ships spans to a Langfuse project; [`JsonlSpanBackend`]
//! writes them to a local file. Both implement the application's
//! `TelemetryBackend` port.

mod jsonl;
mod langfuse;

pub use jsonl::JsonlSpanBackend;
pub use langfuse::{LangfuseBackend, LangfuseSettings};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::Id;
use tracing::warn;
use voice_application::{TaskFailure, TaskSet, TelemetryBackend};

/// Flush `backend` every `every` as a tracked session task.
///
/// A flush already under way when the task is cancelled runs to
/// completion, so the shutdown drain waits for it. The final flush belongs
/// to the shutdown sequence; the loop exits without one.
pub fn spawn_periodic_flush(
    tasks: &TaskSet,
    backend: Arc<dyn TelemetryBackend>,
    every: Duration,
) -> Id {
    tasks.spawn("telemetry-flush", move |cancel| async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
                _ = ticker.tick() => {
                    if let Err(e) = backend.flush().await {
                        warn!("Periodic telemetry flush failed: {}", e);
                    }
                }
            }
        }
    })
}
