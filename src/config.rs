//! Configuration management for Shard Fetcher
//!
//! Settings come from three layers: built-in defaults, an optional TOML file,
//! and command-line flags applied by the CLI on top of the loaded file. Every
//! section is optional in the file; missing keys keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, CoordinatorConfig, TransferConfig, VerifierConfig};
use crate::constants::{config as locations, logging};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Download orchestration settings
    pub download: CoordinatorConfig,
    /// Per-URL transfer settings
    pub transfer: TransferConfig,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Manifest verification settings
    pub verify: VerifierConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level; `RUST_LOG` takes precedence
    pub level: String,
    /// Also write the log stream to this file
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, else the first one found)
    ///
    /// CLI flags are applied afterwards by the command handlers.
    pub async fn load(config_file_override: Option<&Path>) -> Result<Self> {
        let path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    }
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let config = match path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find a configuration file in the standard locations
    ///
    /// Checks `./shard-fetcher.toml`, then the user config directory.
    pub fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(locations::LOCAL_CONFIG_FILE)];
        if let Ok(user_path) = Self::default_config_path() {
            search_paths.push(user_path);
        }

        let found = search_paths.into_iter().find(|path| path.is_file());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Per-user configuration file path
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(locations::APP_DIR).join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::from(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            } else {
                AppError::from(e)
            }
        })?;

        let config = Self::from_toml(&content, path)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Parse configuration text; `origin` is only used in error messages
    pub fn from_toml(content: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|source| ConfigError::InvalidFormat {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the default configuration to `path`
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub async fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(AppError::generic(format!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = format!(
            "# Shard Fetcher configuration\n# Durations accept values such as \"10s\", \"5m\" or \"2h\".\n\n{}",
            Self::default().to_toml()?
        );
        tokio::fs::write(path, content).await?;

        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> ConfigResult<()> {
        self.download.validate()?;
        self.transfer.validate()?;
        self.verify.validate()?;

        if self.client.requests_per_second == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "client.requests_per_second".to_string(),
                value: "0".to_string(),
                reason: "Omit the value to disable pacing".to_string(),
            });
        }

        Ok(())
    }
}
