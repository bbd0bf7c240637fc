//! Scheduler liveness port

use tokio_util::sync::CancellationToken;

/// Reports whether the cooperative scheduler can still run session work.
pub trait SchedulerProbe: Send + Sync {
    fn is_alive(&self) -> bool;
}

/// Liveness of the tokio runtime driving the session.
///
/// The runtime counts as closed when there is no runtime context on the
/// current thread, or when the binary has cancelled `closing` because it is
/// about to drop the runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioSchedulerProbe {
    closing: CancellationToken,
}

impl TokioSchedulerProbe {
    pub fn new(closing: CancellationToken) -> Self {
        Self { closing }
    }

    pub fn closing_token(&self) -> CancellationToken {
        self.closing.clone()
    }
}

impl SchedulerProbe for TokioSchedulerProbe {
    fn is_alive(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok() && !self.closing.is_cancelled()
    }
}
