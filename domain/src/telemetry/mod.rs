//! Telemetry domain module
//!
//! A span is a bracketed record of one discrete session operation:
//! opened with metadata, optionally updated once with a payload, and
//! closed exactly once.
//!
//! This module only defines the data model ([`SpanAttributes`], [`Scalar`])
//! and the span names used across the session; the emitter lives in the
//! application layer and backends in infrastructure.

pub mod attributes;
pub mod names;

pub use attributes::{Scalar, SpanAttributes};
