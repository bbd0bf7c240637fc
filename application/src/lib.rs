//! Application layer for voice-copilot
//!
//! This crate contains the session use case, port definitions, the
//! lifecycle machinery (guard, coordinator, task tracking) and application
//! configuration. It depends only on the domain layer.

pub mod config;
pub mod lifecycle;
pub mod ports;
pub mod session;
pub mod telemetry;
pub mod tools;
pub mod use_cases;

// Re-export commonly used types
pub use config::SessionParams;
pub use lifecycle::{
    Cancelled, EventHandlerGuard, GuardOutcome, HandlerError, ShutdownCoordinator,
    ShutdownReport, ShutdownState, StepOutcome, TaskFailure, TaskOutcome, TaskReport, TaskSet,
    spawn_signal_listener,
};
pub use ports::{
    pipeline::{PipelinePort, ToolCallOutput},
    scheduler::{SchedulerProbe, TokioSchedulerProbe},
    signal::SignalSource,
    telemetry::{SpanHandle, TelemetryBackend, TelemetryError},
    transport::{SessionTransport, TransportError},
};
pub use session::SessionContext;
pub use telemetry::TelemetryEmitter;
pub use tools::ToolProviderRegistry;
pub use use_cases::dispatch::{EventHandler, HandlerRegistry};
pub use use_cases::run_session::{RunSessionError, SessionOrchestrator, SessionSummary};
