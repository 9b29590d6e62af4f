//! Command-line argument parsing for Shard Fetcher
//!
//! Flags given here override the corresponding values of the loaded
//! configuration file; anything left unset keeps the file's (or the built-in)
//! value.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::app::{ConcurrencyStrategy, DigestAlgorithm, MissingLengthPolicy};
use crate::config::AppConfig;
use crate::constants::logging;

/// Shard Fetcher - bulk dataset download and integrity verification
#[derive(Parser, Debug)]
#[command(
    name = "shard_fetcher",
    version,
    about = "Download large dataset shard lists and verify them against digest manifests",
    long_about = "Downloads every URL of a shard list with bounded concurrency, retrying failures in \
waves of shrinking concurrency and backing off when the server rate-limits. Files already complete \
on disk are skipped. The verify command recomputes digests from manifest files and deletes any \
file that does not match."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - only warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write the log to this file (`--log-file=FILE`; default name: download.log)
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = logging::DEFAULT_LOG_FILE
    )]
    pub log_file: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every URL in a URL list
    Download(DownloadArgs),

    /// Verify downloaded files against digest manifests
    Verify(VerifyArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// File with one URL per line
    #[arg(value_name = "URL_LIST")]
    pub url_list: Option<PathBuf>,

    /// Directory downloaded files are placed under
    #[arg(short, long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Prefix every URL must start with
    #[arg(long, value_name = "URL")]
    pub prefix: Option<String>,

    /// Concurrent transfers in the first wave
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Retry waves after the first one
    #[arg(long)]
    pub retry_waves: Option<u32>,

    /// Concurrency strategy for retry waves: constant, halve, single or linear:<step>
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<ConcurrencyStrategy>,

    /// Seconds to wait before each retry wave
    #[arg(long, value_name = "SECONDS")]
    pub wave_delay: Option<u64>,

    /// Where to write URLs that could not be fetched
    #[arg(long, value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Rate-limit retries per URL within one wave
    #[arg(long)]
    pub rate_limit_retries: Option<u32>,

    /// Keep existing files when the server does not report a size
    #[arg(long)]
    pub trust_unsized: bool,

    /// Client-side request pacing (requests per second)
    #[arg(long, value_name = "N")]
    pub requests_per_second: Option<u32>,

    /// Print the session result as JSON instead of a summary line
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone, Default)]
pub struct VerifyArgs {
    /// Manifest files, or directories containing manifests
    #[arg(value_name = "MANIFEST", required = true)]
    pub manifests: Vec<PathBuf>,

    /// Directory the manifest's relative paths are resolved against
    #[arg(short, long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Digest algorithm used by the manifests (sha256 or md5)
    #[arg(long)]
    pub algorithm: Option<DigestAlgorithm>,

    /// Files hashed in parallel (default: number of processing units)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Manifest file suffix used when a directory is given
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Print the reports as JSON instead of per-manifest counts
    #[arg(long)]
    pub json: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration as TOML
    Show,

    /// Write a default configuration file
    Init {
        /// Target path (default: the per-user config file)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print where the configuration is loaded from
    Path,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level requested by the verbosity flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::WARN)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }

    /// Apply global flags to the loaded configuration
    pub fn apply_global(&self, config: &mut AppConfig) {
        if let Some(level) = self.log_level() {
            config.logging.level = level.as_str().to_ascii_lowercase();
        }
        if let Some(path) = &self.global.log_file {
            config.logging.log_file = Some(path.clone());
        }
    }
}

impl DownloadArgs {
    /// Reject flag values that can never be valid
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == Some(0) {
            return Err("Concurrency must be greater than 0".to_string());
        }

        if self.requests_per_second == Some(0) {
            return Err("--requests-per-second must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Override configuration values with the given flags
    pub fn apply(&self, config: &mut AppConfig) {
        let download = &mut config.download;
        if let Some(path) = &self.url_list {
            download.url_list = path.clone();
        }
        if let Some(dir) = &self.base_dir {
            download.base_dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            download.url_prefix = prefix.clone();
        }
        if let Some(concurrency) = self.concurrency {
            download.initial_concurrency = concurrency;
        }
        if let Some(waves) = self.retry_waves {
            download.max_retry_waves = waves;
        }
        if let Some(strategy) = self.strategy {
            download.concurrency_strategy = strategy;
        }
        if let Some(secs) = self.wave_delay {
            download.wave_delay = Duration::from_secs(secs);
        }
        if let Some(ledger) = &self.ledger {
            download.ledger_path = ledger.clone();
        }

        if let Some(retries) = self.rate_limit_retries {
            config.transfer.max_rate_limit_retries = retries;
        }
        if self.trust_unsized {
            config.transfer.missing_length_policy = MissingLengthPolicy::Skip;
        }
        if let Some(rps) = self.requests_per_second {
            config.client.requests_per_second = Some(rps);
        }
    }
}

impl VerifyArgs {
    /// Reject flag values that can never be valid
    pub fn validate(&self) -> Result<(), String> {
        if self.jobs == Some(0) {
            return Err("--jobs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Override configuration values with the given flags
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.base_dir {
            config.download.base_dir = dir.clone();
        }
        if let Some(algorithm) = self.algorithm {
            config.verify.algorithm = algorithm;
        }
        if let Some(jobs) = self.jobs {
            config.verify.concurrency = Some(jobs);
        }
        if let Some(suffix) = &self.suffix {
            config.verify.manifest_suffix = suffix.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args_validation() {
        let mut args = DownloadArgs::default();
        assert!(args.validate().is_ok());

        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        args.concurrency = Some(4);
        args.requests_per_second = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_download_flags_override_config() {
        let cli = Cli::try_parse_from([
            "shard_fetcher",
            "download",
            "urls.txt",
            "--base-dir",
            "/scratch",
            "-c",
            "64",
            "--strategy",
            "linear:16",
            "--wave-delay",
            "3",
            "--trust-unsized",
        ])
        .unwrap();

        let Commands::Download(args) = cli.command else {
            panic!("Expected download command");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.download.url_list, PathBuf::from("urls.txt"));
        assert_eq!(config.download.base_dir, PathBuf::from("/scratch"));
        assert_eq!(config.download.initial_concurrency, 64);
        assert_eq!(
            config.download.concurrency_strategy,
            ConcurrencyStrategy::Linear { step: 16 }
        );
        assert_eq!(config.download.wave_delay, Duration::from_secs(3));
        assert_eq!(config.transfer.missing_length_policy, MissingLengthPolicy::Skip);
        assert_eq!(config.download.max_retry_waves, AppConfig::default().download.max_retry_waves);
    }

    #[test]
    fn test_verify_requires_manifest() {
        assert!(Cli::try_parse_from(["shard_fetcher", "verify"]).is_err());

        let cli = Cli::try_parse_from([
            "shard_fetcher",
            "verify",
            "sha256/",
            "--algorithm",
            "md5",
            "-j",
            "2",
        ])
        .unwrap();
        let Commands::Verify(args) = cli.command else {
            panic!("Expected verify command");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.verify.algorithm, DigestAlgorithm::Md5);
        assert_eq!(config.verify.concurrency, Some(2));
    }

    #[test]
    fn test_log_level() {
        let quiet = Cli::try_parse_from(["shard_fetcher", "-q", "config", "show"]).unwrap();
        let verbose = Cli::try_parse_from(["shard_fetcher", "config", "show", "-v"]).unwrap();
        let default = Cli::try_parse_from(["shard_fetcher", "config", "show"]).unwrap();

        assert_eq!(quiet.log_level(), Some(tracing::Level::WARN));
        assert_eq!(verbose.log_level(), Some(tracing::Level::DEBUG));
        assert_eq!(default.log_level(), None);

        let mut config = AppConfig::default();
        verbose.apply_global(&mut config);
        assert_eq!(config.logging.level, "debug");

        let logged =
            Cli::try_parse_from(["shard_fetcher", "config", "show", "--log-file"]).unwrap();
        assert_eq!(logged.global.log_file, Some(PathBuf::from("download.log")));
    }

    #[test]
    fn test_log_file_does_not_swallow_subcommand() {
        let cli =
            Cli::try_parse_from(["shard_fetcher", "--log-file", "download", "urls.txt"]).unwrap();
        assert_eq!(cli.global.log_file, Some(PathBuf::from("download.log")));
        match cli.command {
            Commands::Download(args) => assert_eq!(args.url_list, Some(PathBuf::from("urls.txt"))),
            _ => panic!("Expected download command"),
        }

        let named = Cli::try_parse_from(["shard_fetcher", "--log-file=run.log", "config", "path"])
            .unwrap();
        assert_eq!(named.global.log_file, Some(PathBuf::from("run.log")));
    }
}
