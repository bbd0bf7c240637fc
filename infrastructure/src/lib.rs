//! Infrastructure layer for voice-copilot
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the JSON-lines media bridge, MCP tool providers,
//! telemetry backends, OS signals and configuration file loading.

pub mod bridge;
pub mod config;
pub mod mcp;
pub mod signal;
pub mod telemetry;

// Re-export commonly used types
pub use bridge::{BridgeCommand, BridgeError, BridgeTransport, JoinRequest};
pub use config::{
    ConfigError, ConfigLoader, ConfigSource, ConfigValidationError, FileConfig,
    FileProviderConfig, FileTelemetryBackend,
};
pub use mcp::{McpEndpoint, McpToolProvider};
pub use signal::OsSignals;
pub use telemetry::{JsonlSpanBackend, LangfuseBackend, LangfuseSettings, spawn_periodic_flush};
