//! Graceful session teardown
//!
//! ```text
//!  1. Running → ShuttingDown          (only the first caller proceeds)
//!  2. cancel + await background tasks (bounded, stragglers aborted)
//!  3. release transport
//!  4. close tool providers            (registration order)
//!  5. flush telemetry                 (if enabled)
//!  6. ShuttingDown → Completed
//! ```
//!
//! Every step yields a [`StepOutcome`]; a failing step is logged and the
//! sequence carries on.

use super::tasks::{TaskOutcome, TaskReport};
use crate::session::SessionContext;
use crate::tools::ProviderCloseReport;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default bound on waiting for cancelled tasks.
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    BeginShutdown,
    CancelTasks,
    ReleaseTransport,
    CloseProviders,
    FlushTelemetry,
    MarkCompleted,
}

impl ShutdownStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownStep::BeginShutdown => "begin_shutdown",
            ShutdownStep::CancelTasks => "cancel_tasks",
            ShutdownStep::ReleaseTransport => "release_transport",
            ShutdownStep::CloseProviders => "close_providers",
            ShutdownStep::FlushTelemetry => "flush_telemetry",
            ShutdownStep::MarkCompleted => "mark_completed",
        }
    }
}

impl fmt::Display for ShutdownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    /// Nothing to do (already released, telemetry disabled).
    Skipped,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Everything one teardown did.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub steps: Vec<(ShutdownStep, StepOutcome)>,
    pub tasks: Vec<TaskReport>,
    pub providers: Vec<ProviderCloseReport>,
}

impl ShutdownReport {
    pub fn outcome(&self, step: ShutdownStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, o)| o)
    }

    pub fn failure_count(&self) -> usize {
        self.steps.iter().filter(|(_, o)| o.is_failed()).count()
    }

    fn record(&mut self, step: ShutdownStep, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Failed(e) => error!(step = %step, error = %e, "Shutdown step failed"),
            _ => debug!(step = %step, outcome = ?outcome, "Shutdown step finished"),
        }
        self.steps.push((step, outcome));
    }
}

/// Runs the teardown sequence exactly once per session.
pub struct ShutdownCoordinator {
    context: Arc<SessionContext>,
    cancel_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
        }
    }

    pub fn with_cancel_timeout(mut self, timeout: Duration) -> Self {
        self.cancel_timeout = timeout;
        self
    }

    /// Tear the session down.
    ///
    /// Returns `None` for every caller but the first; those return
    /// immediately without waiting so a caller that is itself one of the
    /// tasks being drained cannot deadlock.
    pub async fn shutdown(&self) -> Option<ShutdownReport> {
        let context = &self.context;
        if !context.state().begin_shutdown() {
            debug!(phase = %context.state().phase(), "Shutdown already in progress");
            return None;
        }
        info!(conversation_id = %context.conversation_id(), "Shutting down session");

        let mut report = ShutdownReport::default();
        report.record(ShutdownStep::BeginShutdown, StepOutcome::Done);

        // 2
        let tasks = context.tasks().drain_except_current(self.cancel_timeout).await;
        let failed = tasks
            .iter()
            .filter(|t| t.outcome != TaskOutcome::Acknowledged)
            .count();
        let outcome = if failed == 0 {
            StepOutcome::Done
        } else {
            StepOutcome::Failed(format!("{failed} of {} tasks failed or were abandoned", tasks.len()))
        };
        report.tasks = tasks;
        report.record(ShutdownStep::CancelTasks, outcome);

        // 3
        let outcome = match context.release_transport().await {
            Ok(true) => StepOutcome::Done,
            Ok(false) => StepOutcome::Skipped,
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        report.record(ShutdownStep::ReleaseTransport, outcome);

        // 4
        let providers = context.registry().close_all().await;
        let failed: Vec<&str> = providers
            .iter()
            .filter(|p| p.result.is_err())
            .map(|p| p.provider.as_str())
            .collect();
        let outcome = if failed.is_empty() {
            StepOutcome::Done
        } else {
            StepOutcome::Failed(format!("failed to close: {}", failed.join(", ")))
        };
        report.providers = providers;
        report.record(ShutdownStep::CloseProviders, outcome);

        // 5
        let outcome = match context.telemetry().flush().await {
            Ok(true) => StepOutcome::Done,
            Ok(false) => StepOutcome::Skipped,
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        report.record(ShutdownStep::FlushTelemetry, outcome);

        // 6
        let outcome = if context.state().mark_completed() {
            StepOutcome::Done
        } else {
            StepOutcome::Failed(format!("unexpected phase {}", context.state().phase()))
        };
        report.record(ShutdownStep::MarkCompleted, outcome);

        if report.failure_count() > 0 {
            warn!(failures = report.failure_count(), "Session shut down with failures");
        } else {
            info!("Session shut down cleanly");
        }
        Some(report)
    }

    /// Spawn [`shutdown`](Self::shutdown) onto the runtime and return at once.
    pub fn schedule(self: &Arc<Self>) -> JoinHandle<Option<ShutdownReport>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.shutdown().await })
    }
}
