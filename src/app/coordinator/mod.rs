//! Download orchestration in retry waves
//!
//! The coordinator drives the [`TransferWorker`] over every URL record. Wave 0
//! runs all records at the initial concurrency; each later wave re-dispatches
//! only the records that failed in the wave before, at a concurrency chosen by
//! the [`ConcurrencyStrategy`] and never higher than the previous wave's.
//! Whatever still fails after the last wave goes to the failure ledger; a run
//! with no failures removes any ledger left by an earlier run.
//!
//! - [`config`] - Orchestrator configuration and concurrency strategies
//! - [`stats`] - Per-wave reports and the session result
//! - [`ledger`] - The failure ledger file
//! - [`signals`] - Shutdown flag and signal handling
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shard_fetcher::app::{
//!     load_url_records, ClientConfig, Coordinator, CoordinatorConfig, FetchClient,
//!     TransferConfig, TransferWorker,
//! };
//!
//! # async fn example() -> shard_fetcher::errors::Result<()> {
//! let config = CoordinatorConfig::default().with_initial_concurrency(16);
//! let records = load_url_records(&config.url_list, &config.url_prefix, &config.base_dir).await?;
//!
//! let client = Arc::new(FetchClient::new(&ClientConfig::default())?);
//! let worker = TransferWorker::new(client, TransferConfig::default());
//!
//! let result = Coordinator::new(config, worker).run(&records).await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod signals;
pub mod stats;

use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, info_span, warn, Instrument};

use crate::app::models::UrlRecord;
use crate::app::progress::{emit, ProgressEvent, ProgressSender};
use crate::app::worker::TransferWorker;
use crate::errors::Result;

pub use config::{ConcurrencyStrategy, CoordinatorConfig};
pub use ledger::FailureLedger;
pub use signals::{
    create_shutdown_channel, wait_for_shutdown, ShutdownReceiver, ShutdownSender, SignalHandler,
};
pub use stats::{SessionResult, WaveReport};

/// Runs download waves over a set of URL records
pub struct Coordinator {
    config: CoordinatorConfig,
    worker: TransferWorker,
    progress: Option<ProgressSender>,
    shutdown: Option<ShutdownReceiver>,
}

impl Coordinator {
    /// Create a coordinator with the given configuration and worker
    pub fn new(config: CoordinatorConfig, worker: TransferWorker) -> Self {
        Self {
            config,
            worker,
            progress: None,
            shutdown: None,
        }
    }

    /// Report progress events on `sender`
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Stop dispatching new transfers once `shutdown` is set
    pub fn with_shutdown(mut self, shutdown: ShutdownReceiver) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Orchestrator configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn shutdown_signal(&self) {
        match &self.shutdown {
            Some(rx) => wait_for_shutdown(rx.clone()).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// Download every record, retrying failures in shrinking waves
    ///
    /// Per-URL failures never surface as errors; they end up in
    /// [`SessionResult::remaining_failures`] and in the ledger file. Errors
    /// from this method mean the configuration is invalid or the ledger
    /// could not be written.
    pub async fn run(&self, records: &[UrlRecord]) -> Result<SessionResult> {
        self.config.validate()?;

        let started_at = Utc::now();
        let session_start = Instant::now();
        let mut pending: Vec<&UrlRecord> = records.iter().collect();
        let mut waves = Vec::new();
        let mut concurrency = self.config.initial_concurrency;
        let mut cancelled = false;

        info!(
            "Starting download of {} files into {} with concurrency {}",
            records.len(),
            self.config.base_dir.display(),
            concurrency
        );

        for wave in 0..=self.config.max_retry_waves {
            if pending.is_empty() {
                break;
            }

            if wave > 0 {
                concurrency = self.config.concurrency_strategy.next(concurrency);
                info!(
                    "Retrying {} failed downloads in {:?} with concurrency {}",
                    pending.len(),
                    self.config.wave_delay,
                    concurrency
                );
                tokio::select! {
                    _ = tokio::time::sleep(self.config.wave_delay) => {}
                    _ = self.shutdown_signal() => {}
                }
            }

            if self.shutdown_requested() {
                cancelled = true;
                break;
            }

            let span = info_span!("wave", wave, concurrency, urls = pending.len());
            let (report, failed) = self
                .run_wave(wave, &pending, concurrency)
                .instrument(span)
                .await;
            waves.push(report);
            pending = failed;

            if self.shutdown_requested() {
                cancelled = true;
                break;
            }
        }

        let remaining_failures: Vec<String> =
            pending.iter().map(|r| r.source_url.clone()).collect();

        let ledger_path = if remaining_failures.is_empty() {
            FailureLedger::clear(&self.config.ledger_path).await?;
            None
        } else {
            FailureLedger::new(remaining_failures.clone())
                .write(&self.config.ledger_path)
                .await?;
            Some(self.config.ledger_path.clone())
        };

        let result = SessionResult {
            total_urls: records.len(),
            succeeded: records.len() - remaining_failures.len(),
            remaining_failures,
            waves,
            ledger_path,
            cancelled,
            started_at,
            total_duration: session_start.elapsed(),
        };

        if result.is_success() {
            info!("{}", result.summary());
        } else {
            warn!("{}", result.summary());
        }
        Ok(result)
    }

    /// Run one wave and return its report plus the records that failed
    ///
    /// Outcomes are tagged with their input index, so the failed subset keeps
    /// input order regardless of completion order. Records never dispatched
    /// because of a shutdown request count as failed.
    async fn run_wave<'r>(
        &self,
        wave: u32,
        records: &[&'r UrlRecord],
        concurrency: usize,
    ) -> (WaveReport, Vec<&'r UrlRecord>) {
        let wave_start = Instant::now();
        emit(
            &self.progress,
            ProgressEvent::WaveStarted {
                wave,
                urls: records.len(),
                concurrency,
            },
        );

        let mut outcomes = vec![false; records.len()];
        let mut dispatched = 0usize;

        let mut results = stream::iter(records.iter().enumerate())
            .take_until(Box::pin(self.shutdown_signal()))
            .map(|(index, record)| {
                let worker = &self.worker;
                async move { (index, worker.transfer(record).await) }
            })
            .buffer_unordered(concurrency.max(1));

        while let Some((index, outcome)) = results.next().await {
            dispatched += 1;
            outcomes[index] = outcome.is_complete();
            emit(
                &self.progress,
                ProgressEvent::TransferFinished {
                    url: records[index].source_url.clone(),
                    success: outcome.is_complete(),
                    label: outcome.label(),
                },
            );
        }

        let failed: Vec<&UrlRecord> = records
            .iter()
            .zip(&outcomes)
            .filter(|(_, ok)| !**ok)
            .map(|(record, _)| *record)
            .collect();

        if dispatched < records.len() {
            warn!(
                "Shutdown requested; {} downloads were not started",
                records.len() - dispatched
            );
        }

        let report = WaveReport {
            wave,
            concurrency,
            submitted: records.len(),
            dispatched,
            succeeded: records.len() - failed.len(),
            failed: failed.len(),
            duration: wave_start.elapsed(),
        };

        info!(
            "Wave {} finished: {} succeeded, {} failed in {:.1?}",
            wave, report.succeeded, report.failed, report.duration
        );
        emit(
            &self.progress,
            ProgressEvent::WaveFinished {
                wave,
                succeeded: report.succeeded,
                failed: report.failed,
            },
        );

        (report, failed)
    }
}
