//! Termination signal listener
//!
//! Signal delivery only ever schedules the coordinator; no session logic
//! runs in the listener itself.

use super::coordinator::ShutdownCoordinator;
use crate::ports::signal::SignalSource;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Listen for termination signals until the source is exhausted.
///
/// The listener is not part of the session task set. The binary aborts the
/// returned handle once the session has completed.
pub fn spawn_signal_listener<S>(mut source: S, coordinator: Arc<ShutdownCoordinator>) -> JoinHandle<()>
where
    S: SignalSource + 'static,
{
    tokio::spawn(async move {
        while let Some(signal) = source.next_signal().await {
            info!(signal = %signal, "Received termination signal");
            coordinator.schedule();
        }
    })
}
