//! Settings Module
//!
//! Loads `HalSettings` from a TOML file with an optional environment-specific
//! override file and `VHAL_` environment variables layered on top.

use crate::defaults;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Top-level settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct HalSettings {
    pub client: ClientSettings,
    pub user_hal: UserHalSettings,
    pub logging: LoggingSettings,
}

/// Retry policy of the channel client
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    pub max_retries: u32,
    pub wait_cap_ms: u64,
    pub retry_sleep_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct UserHalSettings {
    pub default_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `vhal_router=debug`
    pub level: String,
    pub json: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_retries: defaults::client::MAX_RETRIES,
            wait_cap_ms: defaults::client::WAIT_CAP_MS,
            retry_sleep_ms: defaults::client::RETRY_SLEEP_MS,
        }
    }
}

impl ClientSettings {
    pub fn wait_cap(&self) -> Duration {
        Duration::from_millis(self.wait_cap_ms)
    }

    pub fn retry_sleep(&self) -> Duration {
        Duration::from_millis(self.retry_sleep_ms)
    }
}

impl Default for UserHalSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: defaults::user_hal::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl UserHalSettings {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl HalSettings {
    /// Load settings from `base_path` with environment overrides.
    ///
    /// When `environment` is given, `environments/<env>.toml` next to the
    /// base file is layered on top if it exists. `VHAL_`-prefixed variables
    /// come last, with `__` separating section and key
    /// (`VHAL_CLIENT__MAX_RETRIES=5`).
    pub fn load(base_path: &Path, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(base_path).required(true));

        if let Some(env) = environment {
            let env_file = base_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(PathBuf::new)
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("VHAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Parse settings embedded as a TOML string; no environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }
}
