//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "voice-copilot";
const PROJECT_FILES: [&str; 2] = ["voice-copilot.toml", ".voice-copilot.toml"];
const ENV_PREFIX: &str = "VOICE_COPILOT_";

/// Flat environment variables and the config keys they set.
const FLAT_ENV: [(&str, &str); 4] = [
    ("ENABLE_TRACING", "telemetry.enabled"),
    ("LANGFUSE_HOST", "telemetry.langfuse.host"),
    ("LANGFUSE_PUBLIC_KEY", "telemetry.langfuse.public_key"),
    ("LANGFUSE_SECRET_KEY", "telemetry.langfuse.secret_key"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// A place configuration may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub location: String,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `VOICE_COPILOT_*` environment (`__` separates sections)
    /// 2. `ENABLE_TRACING`, `LANGFUSE_*`
    /// 3. Explicit config path (if provided)
    /// 4. Project root: `./voice-copilot.toml` or `./.voice-copilot.toml`
    /// 5. Global: `$XDG_CONFIG_HOME/voice-copilot/config.toml`
    /// 6. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        Self::with_env(figment)
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Defaults plus environment only (for --no-config)
    pub fn load_defaults() -> Result<FileConfig, ConfigError> {
        Self::with_env(Figment::new().merge(Serialized::defaults(FileConfig::default())))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    fn with_env(figment: Figment) -> Figment {
        let flat_keys: Vec<&str> = FLAT_ENV.iter().map(|(var, _)| *var).collect();
        figment
            .merge(Env::raw().only(&flat_keys).map(|key| {
                FLAT_ENV
                    .iter()
                    .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
                    .map(|(_, path)| (*path).into())
                    .unwrap_or_else(|| key.as_str().to_owned().into())
            }))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// `$XDG_CONFIG_HOME/voice-copilot/config.toml`, falling back to
    /// `~/.config/voice-copilot/config.toml`
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Config file locations in priority order, for `--show-config`.
    pub fn config_sources(explicit: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        if let Some(path) = explicit {
            sources.push(ConfigSource {
                label: "Explicit",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(match Self::project_config_path() {
            Some(path) => ConfigSource {
                label: "Project",
                location: path.display().to_string(),
                found: true,
            },
            None => ConfigSource {
                label: "Project",
                location: PROJECT_FILES.map(|f| format!("./{f}")).join(" or "),
                found: false,
            },
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                label: "Global",
                location: path.display().to_string(),
                found: path.exists(),
            });
        }

        sources.push(ConfigSource {
            label: "Default",
            location: "built-in defaults".to_string(),
            found: true,
        });
        sources
    }
}
