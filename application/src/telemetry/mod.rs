//! Span bracketing around session events.

pub mod emitter;

pub use emitter::{SpanGuard, SpanRecorder, TelemetryEmitter};
