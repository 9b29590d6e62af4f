//! Command-line interface components
//!
//! Argument parsing, command handlers and the progress display for the
//! `shard_fetcher` binary.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    Cli, Commands, ConfigAction, ConfigArgs, DownloadArgs, GlobalArgs, VerifyArgs,
};
pub use commands::{handle_config, handle_download, handle_verify, CommandStatus};
pub use progress::ProgressDisplay;
