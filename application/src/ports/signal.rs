//! Termination signal source port

use async_trait::async_trait;
use tokio::sync::mpsc;
use voice_domain::TerminationSignal;

/// A stream of OS termination signals.
#[async_trait]
pub trait SignalSource: Send {
    /// Wait for the next signal. `None` when the source is exhausted.
    async fn next_signal(&mut self) -> Option<TerminationSignal>;
}

#[async_trait]
impl SignalSource for mpsc::UnboundedReceiver<TerminationSignal> {
    async fn next_signal(&mut self) -> Option<TerminationSignal> {
        self.recv().await
    }
}
