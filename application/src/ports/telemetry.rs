//! Telemetry backend port
//!
//! Backends record spans somewhere (Langfuse, a JSONL file). They are
//! driven exclusively through [`TelemetryEmitter`](crate::telemetry::TelemetryEmitter),
//! which guarantees bracketing and never lets a backend failure escape.

use async_trait::async_trait;
use thiserror::Error;
use voice_domain::SpanAttributes;

/// Telemetry failures. Always recovered locally.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry backend error: {0}")]
    Backend(String),

    #[error("Telemetry flush failed: {0}")]
    Flush(String),
}

/// An open span.
///
/// `end` consumes the handle, so a span cannot be closed twice.
pub trait SpanHandle: Send {
    fn update(&mut self, payload: &SpanAttributes) -> Result<(), TelemetryError>;

    fn end(self: Box<Self>) -> Result<(), TelemetryError>;
}

/// Port for a span-recording backend.
#[async_trait]
pub trait TelemetryBackend: Send + Sync {
    fn start_span(
        &self,
        name: &str,
        metadata: &SpanAttributes,
    ) -> Result<Box<dyn SpanHandle>, TelemetryError>;

    /// Push buffered records to the backend.
    async fn flush(&self) -> Result<(), TelemetryError>;
}
