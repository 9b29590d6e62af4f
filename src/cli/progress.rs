//! Progress bars for download waves and manifest verification
//!
//! The display consumes [`ProgressEvent`]s from the library on a background
//! task. Bars are drawn only when stderr is a terminal; otherwise the log
//! stream alone reports progress.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::ProgressEvent;
use crate::errors::{AppError, Result};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Renders progress events as one bar per wave or manifest
pub struct ProgressDisplay {
    draw: bool,
    style: ProgressStyle,
    bar: Option<ProgressBar>,
    failed: usize,
}

impl ProgressDisplay {
    /// Create a display; bars are drawn only if `enabled` and stderr is a terminal
    pub fn new(enabled: bool) -> Result<Self> {
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?
            .progress_chars("##-");

        Ok(Self {
            draw: enabled && atty::is(atty::Stream::Stderr),
            style,
            bar: None,
            failed: 0,
        })
    }

    /// Failures seen in the current wave or manifest
    pub fn failed(&self) -> usize {
        self.failed
    }

    fn start_bar(&mut self, len: usize, message: String) {
        if let Some(previous) = self.bar.take() {
            previous.finish_and_clear();
        }
        self.failed = 0;

        let target = if self.draw {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(len as u64), target);
        bar.set_style(self.style.clone());
        bar.set_message(message);
        self.bar = Some(bar);
    }

    fn advance(&mut self, success: bool) {
        if !success {
            self.failed += 1;
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
            if !success {
                bar.set_message(format!("{} failed", self.failed));
            }
        }
    }

    fn finish_bar(&mut self, message: String) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(message);
        }
    }

    /// Apply one event
    pub fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::WaveStarted {
                wave,
                urls,
                concurrency,
            } => self.start_bar(urls, format!("wave {} x{}", wave, concurrency)),
            ProgressEvent::TransferFinished { success, .. } => self.advance(success),
            ProgressEvent::WaveFinished {
                wave,
                succeeded,
                failed,
            } => self.finish_bar(format!(
                "wave {}: {} ok, {} failed",
                wave, succeeded, failed
            )),
            ProgressEvent::ManifestStarted { path, entries } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.start_bar(entries, name)
            }
            ProgressEvent::EntryVerified { matched, .. } => self.advance(matched),
            ProgressEvent::ManifestFinished {
                matched,
                mismatched,
                ..
            } => self.finish_bar(format!(
                "{} matched, {} not matched",
                matched, mismatched
            )),
        }
    }

    /// Drain `events` on a background task until every sender is gone
    pub fn spawn(mut self, mut events: mpsc::UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle(event);
            }
            if let Some(bar) = self.bar.take() {
                bar.finish_and_clear();
            }
            debug!("Progress display finished");
        })
    }
}
