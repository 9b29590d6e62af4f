//! Command handlers for the CLI
//!
//! Each handler receives the configuration loaded by `main`, applies its own
//! flags on top, and reports a [`CommandStatus`] that `main` turns into the
//! process exit code.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::args::{ConfigAction, DownloadArgs, VerifyArgs};
use super::progress::ProgressDisplay;
use crate::app::{
    create_shutdown_channel, load_url_records, progress_channel, Coordinator, FetchClient,
    IntegrityVerifier, ProgressSender, SignalHandler, TransferWorker, VerificationReport,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Everything succeeded
    Success,
    /// The command ran but some files failed to download or verify
    Incomplete,
}

impl CommandStatus {
    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::Incomplete => 2,
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::generic(format!("Failed to render JSON: {}", e)))
}

fn start_progress(enabled: bool) -> Result<(Option<ProgressSender>, Option<JoinHandle<()>>)> {
    if !enabled {
        return Ok((None, None));
    }
    let (tx, rx) = progress_channel();
    let handle = ProgressDisplay::new(true)?.spawn(rx);
    Ok((Some(tx), Some(handle)))
}

async fn finish_progress(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        let _ = handle.await;
    }
}

/// Handle the download command
pub async fn handle_download(
    args: DownloadArgs,
    mut config: AppConfig,
    show_progress: bool,
) -> Result<CommandStatus> {
    args.validate().map_err(AppError::generic)?;
    args.apply(&mut config);
    config.validate()?;

    let download = &config.download;
    let records = load_url_records(&download.url_list, &download.url_prefix, &download.base_dir).await?;
    if records.is_empty() {
        warn!("No URLs found in {}", download.url_list.display());
        println!("Nothing to download.");
        return Ok(CommandStatus::Success);
    }

    let client = Arc::new(FetchClient::new(&config.client)?);
    let worker = TransferWorker::new(client, config.transfer.clone());

    let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let signal_task = SignalHandler::new(shutdown_tx).setup();

    let (progress_tx, progress_task) = start_progress(show_progress)?;
    let mut coordinator = Coordinator::new(download.clone(), worker).with_shutdown(shutdown_rx);
    if let Some(tx) = progress_tx {
        coordinator = coordinator.with_progress(tx);
    }

    let result = coordinator.run(&records).await;
    drop(coordinator);
    finish_progress(progress_task).await;
    signal_task.abort();
    let result = result?;

    if args.json {
        println!("{}", to_json(&result)?);
    } else {
        println!("{}", result.summary());
    }
    if result.is_success() {
        Ok(CommandStatus::Success)
    } else {
        Ok(CommandStatus::Incomplete)
    }
}

/// Expand directories into the manifests they contain
async fn collect_manifests(verifier: &IntegrityVerifier, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut manifests = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = verifier.discover(input).await?;
            if found.is_empty() {
                warn!(
                    "No files ending in {} found in {}",
                    verifier.config().manifest_suffix,
                    input.display()
                );
            }
            manifests.extend(found);
        } else {
            manifests.push(input.clone());
        }
    }
    Ok(manifests)
}

/// Handle the verify command
pub async fn handle_verify(
    args: VerifyArgs,
    mut config: AppConfig,
    show_progress: bool,
) -> Result<CommandStatus> {
    args.validate().map_err(AppError::generic)?;
    args.apply(&mut config);
    config.validate()?;

    let (progress_tx, progress_task) = start_progress(show_progress)?;
    let mut verifier = IntegrityVerifier::new(config.verify.clone());
    if let Some(tx) = progress_tx {
        verifier = verifier.with_progress(tx);
    }

    let manifests = collect_manifests(&verifier, &args.manifests).await?;
    if manifests.is_empty() {
        drop(verifier);
        finish_progress(progress_task).await;
        return Err(AppError::generic("No manifest files to verify"));
    }

    info!(
        "Verifying {} manifest(s) against {} using {} with {} workers",
        manifests.len(),
        config.download.base_dir.display(),
        config.verify.algorithm,
        config.verify.effective_concurrency()
    );

    let reports = verifier
        .verify_manifests(&manifests, &config.download.base_dir)
        .await;
    drop(verifier);
    finish_progress(progress_task).await;
    let reports = reports?;

    let total_mismatched: usize = reports.iter().map(|r| r.mismatched).sum();
    if args.json {
        println!("{}", to_json(&reports)?);
    } else {
        print_reports(&reports);
    }

    if total_mismatched == 0 {
        Ok(CommandStatus::Success)
    } else {
        Ok(CommandStatus::Incomplete)
    }
}

fn print_reports(reports: &[VerificationReport]) {
    for report in reports {
        let name = report
            .manifest
            .as_deref()
            .map(Path::display)
            .map(|d| d.to_string())
            .unwrap_or_default();
        println!("{}", name);
        println!("  Matched: {}", report.matched);
        println!("  Not matched: {}", report.mismatched);
        if report.deleted > 0 {
            println!("  Deleted: {}", report.deleted);
        }
    }
}

/// Handle the config command
pub async fn handle_config(
    action: ConfigAction,
    config: AppConfig,
    config_override: Option<&Path>,
) -> Result<CommandStatus> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => AppConfig::default_config_path()?,
            };
            AppConfig::write_default(&path, force).await?;
            println!("Created configuration file: {}", path.display());
        }
        ConfigAction::Path => {
            let path = config_override
                .map(Path::to_path_buf)
                .or_else(AppConfig::find_config_file);
            match path {
                Some(path) => println!("{}", path.display()),
                None => println!("No configuration file found; using defaults"),
            }
        }
    }
    Ok(CommandStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandStatus::Success.exit_code(), 0);
        assert_eq!(CommandStatus::Incomplete.exit_code(), 2);
    }

    /// Test that an empty URL list finishes without contacting anything
    #[tokio::test]
    async fn test_download_with_empty_list() {
        let temp_dir = TempDir::new().unwrap();
        let list = temp_dir.path().join("urls.txt");
        tokio::fs::write(&list, "\n\n").await.unwrap();

        let args = DownloadArgs {
            url_list: Some(list),
            base_dir: Some(temp_dir.path().join("data")),
            ..Default::default()
        };
        let status = handle_download(args, AppConfig::default(), false)
            .await
            .unwrap();
        assert_eq!(status, CommandStatus::Success);
    }

    /// Test that verify reports mismatches through the exit status
    #[tokio::test]
    async fn test_verify_reports_incomplete_on_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data");
        tokio::fs::create_dir_all(&data).await.unwrap();
        tokio::fs::write(data.join("a.jsonl"), b"hello").await.unwrap();
        tokio::fs::write(data.join("b.jsonl"), b"tampered").await.unwrap();

        let manifests = temp_dir.path().join("sha256");
        tokio::fs::create_dir_all(&manifests).await.unwrap();
        let hello = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        tokio::fs::write(
            manifests.join("demo_SHA256SUMS.txt"),
            format!("{h} a.jsonl\n{h} b.jsonl\n", h = hello),
        )
        .await
        .unwrap();

        let args = VerifyArgs {
            manifests: vec![manifests],
            base_dir: Some(data.clone()),
            ..Default::default()
        };
        let status = handle_verify(args, AppConfig::default(), false).await.unwrap();

        assert_eq!(status, CommandStatus::Incomplete);
        assert!(data.join("a.jsonl").exists());
        assert!(!data.join("b.jsonl").exists());
    }

    /// Test that verify with nothing to check is an error
    #[tokio::test]
    async fn test_verify_empty_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let args = VerifyArgs {
            manifests: vec![temp_dir.path().to_path_buf()],
            ..Default::default()
        };
        assert!(handle_verify(args, AppConfig::default(), false).await.is_err());
    }
}
