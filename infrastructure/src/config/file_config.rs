//! Raw TOML configuration data types
//!
//! These structs mirror the config file layout one-to-one. Conversion into
//! runtime values ([`SessionParams`], [`McpEndpoint`], durations) happens
//! here so the rest of the crate never sees raw strings.

use crate::mcp::McpEndpoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use voice_application::SessionParams;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("provider '{name}' needs either `command` or `url`")]
    MissingEndpoint { name: String },

    #[error("provider '{name}' sets both `command` and `url`")]
    AmbiguousEndpoint { name: String },

    #[error("provider name cannot be empty")]
    EmptyProviderName,

    #[error("duplicate provider name '{0}'")]
    DuplicateProvider(String),

    #[error("{0} cannot be 0")]
    ZeroDuration(&'static str),
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProviderConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Executable for a stdio server
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Streamable HTTP endpoint
    #[serde(default)]
    pub url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl FileProviderConfig {
    pub fn stdio(name: &str, command: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            command: Some(command.to_string()),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
            url: None,
        }
    }

    pub fn endpoint(&self) -> Result<McpEndpoint, ConfigValidationError> {
        match (&self.command, &self.url) {
            (Some(command), None) => Ok(McpEndpoint::Stdio {
                command: command.clone(),
                args: self.args.clone(),
                env: self.env.clone(),
            }),
            (None, Some(url)) => Ok(McpEndpoint::Http { url: url.clone() }),
            (Some(_), Some(_)) => Err(ConfigValidationError::AmbiguousEndpoint {
                name: self.name.clone(),
            }),
            (None, None) => Err(ConfigValidationError::MissingEndpoint {
                name: self.name.clone(),
            }),
        }
    }
}

/// Providers used when the config names none.
pub fn default_providers() -> Vec<FileProviderConfig> {
    vec![
        FileProviderConfig::stdio("arxiv", "python", &["-m", "arxiv_mcp_server"]),
        FileProviderConfig::stdio(
            "huggingface",
            "python",
            &["-c", "import huggingface; huggingface.main()"],
        ),
    ]
}

/// `[bridge]`: media pipeline sidecar and room settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBridgeConfig {
    /// Sidecar executable; absent means the bridge speaks on our stdio
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub room_url: Option<String>,
    pub token: Option<String>,
    pub bot_name: String,
    /// Overrides the built-in system prompt
    pub system_prompt: Option<String>,
}

impl Default for FileBridgeConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            env: BTreeMap::new(),
            room_url: None,
            token: None,
            bot_name: voice_application::config::DEFAULT_BOT_NAME.to_string(),
            system_prompt: None,
        }
    }
}

/// `[shutdown]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileShutdownConfig {
    pub cancel_timeout_ms: u64,
}

impl Default for FileShutdownConfig {
    fn default() -> Self {
        Self {
            cancel_timeout_ms: 5000,
        }
    }
}

/// `[tools]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub list_timeout_secs: u64,
}

impl Default for FileToolsConfig {
    fn default() -> Self {
        Self {
            list_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTelemetryBackend {
    #[default]
    Langfuse,
    Jsonl,
}

/// `[telemetry.langfuse]`
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLangfuseConfig {
    pub host: String,
    pub public_key: String,
    pub secret_key: String,
}

impl Default for FileLangfuseConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:3000".to_string(),
            public_key: "pk-lf-local".to_string(),
            secret_key: "sk-lf-local-secret-key".to_string(),
        }
    }
}

impl std::fmt::Debug for FileLangfuseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLangfuseConfig")
            .field("host", &self.host)
            .field("public_key", &self.public_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// `[telemetry]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTelemetryConfig {
    /// Mirrors `ENABLE_TRACING`
    pub enabled: bool,
    pub backend: FileTelemetryBackend,
    pub jsonl_path: PathBuf,
    /// Periodic flush; absent means flush only at shutdown
    pub flush_interval_secs: Option<u64>,
    pub langfuse: FileLangfuseConfig,
}

impl Default for FileTelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: FileTelemetryBackend::default(),
            jsonl_path: PathBuf::from("voice-copilot-spans.jsonl"),
            flush_interval_secs: None,
            langfuse: FileLangfuseConfig::default(),
        }
    }
}

impl FileTelemetryConfig {
    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub providers: Vec<FileProviderConfig>,
    pub bridge: FileBridgeConfig,
    pub shutdown: FileShutdownConfig,
    pub tools: FileToolsConfig,
    pub telemetry: FileTelemetryConfig,
}

impl FileConfig {
    /// Configured providers, or the built-in defaults when none are listed.
    /// Disabled entries are filtered out.
    pub fn effective_providers(&self) -> Vec<FileProviderConfig> {
        let providers = if self.providers.is_empty() {
            default_providers()
        } else {
            self.providers.clone()
        };
        providers.into_iter().filter(|p| p.enabled).collect()
    }

    pub fn cancel_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown.cancel_timeout_ms)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.list_timeout_secs)
    }

    pub fn session_params(&self) -> SessionParams {
        let mut params = SessionParams::default()
            .with_bot_name(self.bridge.bot_name.clone())
            .with_cancel_timeout(self.cancel_timeout());
        if let Some(url) = &self.bridge.room_url {
            params = params.with_room_url(url.clone());
        }
        if let Some(token) = &self.bridge.token {
            params = params.with_token(token.clone());
        }
        if let Some(prompt) = &self.bridge.system_prompt {
            params = params.with_system_prompt(prompt.clone());
        }
        params
    }

    /// Validate the configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                issues.push(ConfigValidationError::EmptyProviderName);
                continue;
            }
            if !seen.insert(provider.name.as_str()) {
                issues.push(ConfigValidationError::DuplicateProvider(
                    provider.name.clone(),
                ));
            }
            if let Err(e) = provider.endpoint() {
                issues.push(e);
            }
        }

        if self.shutdown.cancel_timeout_ms == 0 {
            issues.push(ConfigValidationError::ZeroDuration(
                "shutdown.cancel_timeout_ms",
            ));
        }
        if self.tools.list_timeout_secs == 0 {
            issues.push(ConfigValidationError::ZeroDuration(
                "tools.list_timeout_secs",
            ));
        }

        issues
    }
}
