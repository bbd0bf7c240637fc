//! Configuration file loading for voice-copilot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `VOICE_COPILOT_*` environment variables
//! 2. `ENABLE_TRACING` and `LANGFUSE_*` environment variables
//! 3. `--config <path>` specified file
//! 4. Project root: `./voice-copilot.toml` or `./.voice-copilot.toml`
//! 5. XDG config: `$XDG_CONFIG_HOME/voice-copilot/config.toml`
//! 6. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBridgeConfig, FileConfig, FileLangfuseConfig, FileProviderConfig,
    FileShutdownConfig, FileTelemetryBackend, FileTelemetryConfig, FileToolsConfig,
    default_providers,
};
pub use loader::{ConfigError, ConfigLoader, ConfigSource};
