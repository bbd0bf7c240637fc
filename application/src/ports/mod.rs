//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod pipeline;
pub mod scheduler;
pub mod signal;
pub mod telemetry;
pub mod transport;
