//! Configuration for the download orchestrator
//!
//! Covers where files land, which URLs are acceptable, and how successive
//! retry waves shrink their concurrency.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{download, source};
use crate::errors::{ConfigError, ConfigResult};

/// How concurrency changes from one wave to the next
///
/// Whatever the strategy, the result is clamped to `1..=previous`, so
/// concurrency never increases between waves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConcurrencyStrategy {
    /// Keep the previous wave's concurrency
    Constant,
    /// Halve the previous wave's concurrency
    #[default]
    Halve,
    /// Subtract a fixed step
    Linear { step: usize },
    /// Drop straight to one worker
    Single,
}

impl ConcurrencyStrategy {
    /// Concurrency for the wave following one that ran at `previous`
    pub fn next(&self, previous: usize) -> usize {
        let previous = previous.max(1);
        let proposed = match self {
            ConcurrencyStrategy::Constant => previous,
            ConcurrencyStrategy::Halve => previous / 2,
            ConcurrencyStrategy::Linear { step } => previous.saturating_sub(*step),
            ConcurrencyStrategy::Single => 1,
        };
        proposed.clamp(1, previous)
    }
}

impl fmt::Display for ConcurrencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyStrategy::Constant => f.write_str("constant"),
            ConcurrencyStrategy::Halve => f.write_str("halve"),
            ConcurrencyStrategy::Linear { step } => write!(f, "linear:{}", step),
            ConcurrencyStrategy::Single => f.write_str("single"),
        }
    }
}

impl FromStr for ConcurrencyStrategy {
    type Err = String;

    /// Parses `constant`, `halve`, `single` or `linear:<step>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(ConcurrencyStrategy::Constant),
            "halve" => Ok(ConcurrencyStrategy::Halve),
            "single" => Ok(ConcurrencyStrategy::Single),
            other => other
                .strip_prefix("linear:")
                .and_then(|step| step.parse().ok())
                .map(|step| ConcurrencyStrategy::Linear { step })
                .ok_or_else(|| {
                    format!(
                        "unknown concurrency strategy '{}' (expected constant, halve, single or linear:<step>)",
                        s
                    )
                }),
        }
    }
}

/// Configuration for the download orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// File listing the URLs to fetch, one per line
    pub url_list: PathBuf,
    /// Prefix every URL must start with; stripped to form the relative path
    pub url_prefix: String,
    /// Directory downloaded files are placed under
    pub base_dir: PathBuf,
    /// Where URLs that exhaust every wave are written
    pub ledger_path: PathBuf,
    /// Concurrency of the first wave
    pub initial_concurrency: usize,
    /// Number of retry waves after the first
    pub max_retry_waves: u32,
    /// How concurrency shrinks between waves
    pub concurrency_strategy: ConcurrencyStrategy,
    /// Pause before each retry wave
    #[serde(with = "humantime_serde")]
    pub wave_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            url_list: PathBuf::from(source::DEFAULT_URL_LIST),
            url_prefix: source::DEFAULT_URL_PREFIX.to_string(),
            base_dir: PathBuf::from(source::DEFAULT_BASE_DIR),
            ledger_path: PathBuf::from(source::DEFAULT_LEDGER_FILE),
            initial_concurrency: download::INITIAL_CONCURRENCY,
            max_retry_waves: download::MAX_RETRY_WAVES,
            concurrency_strategy: ConcurrencyStrategy::default(),
            wave_delay: download::WAVE_DELAY,
        }
    }
}

impl CoordinatorConfig {
    /// Set the first wave's concurrency
    pub fn with_initial_concurrency(mut self, concurrency: usize) -> Self {
        self.initial_concurrency = concurrency;
        self
    }

    /// Set the retry wave ceiling
    pub fn with_max_retry_waves(mut self, waves: u32) -> Self {
        self.max_retry_waves = waves;
        self
    }

    /// Set the pause between waves
    pub fn with_wave_delay(mut self, delay: Duration) -> Self {
        self.wave_delay = delay;
        self
    }

    /// Set the concurrency strategy
    pub fn with_strategy(mut self, strategy: ConcurrencyStrategy) -> Self {
        self.concurrency_strategy = strategy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.initial_concurrency == 0 || self.initial_concurrency > download::MAX_CONCURRENCY {
            return Err(ConfigError::InvalidValue {
                field: "download.initial_concurrency".to_string(),
                value: self.initial_concurrency.to_string(),
                reason: format!("Must be between 1 and {}", download::MAX_CONCURRENCY),
            });
        }

        if self.url_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "download.url_prefix".to_string(),
                value: String::new(),
                reason: "A URL prefix is required to derive local paths".to_string(),
            });
        }

        if let ConcurrencyStrategy::Linear { step: 0 } = self.concurrency_strategy {
            return Err(ConfigError::InvalidValue {
                field: "download.concurrency_strategy".to_string(),
                value: "linear:0".to_string(),
                reason: "Use 'constant' instead of a zero linear step".to_string(),
            });
        }

        Ok(())
    }
}
