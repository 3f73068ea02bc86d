//! Configuration for the task client
//!
//! Values are layered, later sources winning:
//! - Built-in defaults
//! - A TOML file (`--config`, `TASKS_CONFIG_FILE`, or the user config dir)
//! - Environment variables with the `TASKS` prefix, e.g. `TASKS__STORE__BASE_URL`
//! - Command line flags, applied by the caller

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use task_list_controller::ConsistencyPolicy;
use task_store_client::DEFAULT_BASE_URL;

const CONFIG_FILE_ENV: &str = "TASKS_CONFIG_FILE";
const APP_DIR: &str = "tasks";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote task store
    pub store: StoreConfig,

    /// List controller behaviour
    pub controller: ControllerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Collection URL, e.g. http://localhost:3000/api/tasks
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// What a failed store call does to the local list
    pub policy: ConsistencyPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter string
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file used while the terminal UI owns the screen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from the file layer and the environment.
    ///
    /// An explicitly named file must exist; the implicit locations are
    /// skipped when absent. Values are not validated here, so that command
    /// line overrides can still replace them.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let source = match resolve_path(explicit) {
            Some((path, true)) if !path.exists() => {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            Some((path, explicit)) if explicit || path.exists() => {
                builder = builder.add_source(File::from(path.clone()));
                Some(path)
            }
            _ => None,
        };

        builder = builder.add_source(
            Environment::with_prefix("TASKS")
                .separator("__") // TASKS__STORE__BASE_URL
                .try_parsing(true),
        );

        let mut settings: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.source = source;
        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = self.store.base_url.to_lowercase();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "Store base URL '{}' must be an http or https URL",
                self.store.base_url
            );
        }

        if self.store.timeout_secs == 0 {
            anyhow::bail!("Store timeout must be greater than 0");
        }

        if !self.logging.is_filter_string() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            let level_lower = self.logging.level.to_lowercase();
            if !valid_levels.contains(&level_lower.as_str()) {
                anyhow::bail!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level,
                    valid_levels
                );
            }
        }

        Ok(())
    }

    /// Get the log filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.logging.is_filter_string() {
            self.logging.level.clone()
        } else {
            let level = self.logging.level.to_lowercase();
            format!(
                "task_tui={level},task_list_controller={level},task_store_client={level},warn"
            )
        }
    }

    /// Where the terminal UI writes its log.
    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.logging.file {
            return Ok(file.clone());
        }
        let dir = dirs::data_local_dir().context("Failed to get data directory")?;
        Ok(dir.join(APP_DIR).join("tasks.log"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }
}

impl LoggingConfig {
    fn is_filter_string(&self) -> bool {
        self.level.contains('=') || self.level.contains(',')
    }
}

/// The file to read and whether the user asked for it explicitly.
fn resolve_path(explicit: Option<&Path>) -> Option<(PathBuf, bool)> {
    if let Some(path) = explicit {
        return Some((path.to_path_buf(), true));
    }
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some((PathBuf::from(path), true));
    }
    Config::default_path().map(|path| (path, false))
}
