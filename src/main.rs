//! Shard Fetcher CLI application
//!
//! Downloads dataset shard lists with wave-based retries and verifies the
//! results against digest manifests.

use std::process;

use tracing::{debug, info};

use shard_fetcher::cli::{
    handle_config, handle_download, handle_verify, Cli, CommandStatus, Commands,
};
use shard_fetcher::config::AppConfig;
use shard_fetcher::errors::Result;
use shard_fetcher::logging::LogSession;

#[tokio::main]
async fn main() {
    let result = run().await;

    match result {
        Ok(status) => process::exit(status.exit_code()),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Main application logic
async fn run() -> Result<CommandStatus> {
    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.as_deref()).await?;
    cli.apply_global(&mut config);

    // Held until the end of the run so the log file is flushed
    let _log_session = LogSession::init(&config.logging.level, config.logging.log_file.as_deref())?;

    info!("Shard Fetcher v{} starting", env!("CARGO_PKG_VERSION"));
    let show_progress = !cli.global.no_progress && !cli.global.quiet;

    match cli.command {
        Commands::Download(args) => {
            debug!("Executing download command");
            handle_download(args, config, show_progress).await
        }
        Commands::Verify(args) => {
            debug!("Executing verify command");
            handle_verify(args, config, show_progress).await
        }
        Commands::Config(args) => {
            handle_config(args.action, config, cli.global.config.as_deref()).await
        }
    }
}
