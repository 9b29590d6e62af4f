//! Progress events emitted by the orchestrator and the verifier
//!
//! Events are fire-and-forget: a closed or absent receiver never affects the
//! work being reported.

use std::path::PathBuf;

use tokio::sync::mpsc;

/// Something observable happened during a run
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A download wave is about to dispatch `urls` transfers
    WaveStarted {
        wave: u32,
        urls: usize,
        concurrency: usize,
    },
    /// One transfer finished
    TransferFinished {
        url: String,
        success: bool,
        label: &'static str,
    },
    /// A download wave finished
    WaveFinished {
        wave: u32,
        succeeded: usize,
        failed: usize,
    },
    /// Verification of a manifest is starting
    ManifestStarted { path: PathBuf, entries: usize },
    /// One manifest entry was checked
    EntryVerified { path: PathBuf, matched: bool },
    /// Verification of a manifest finished
    ManifestFinished {
        path: PathBuf,
        matched: usize,
        mismatched: usize,
    },
}

/// Sending half of a progress channel
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Create a progress channel
pub fn progress_channel() -> (ProgressSender, mpsc::UnboundedReceiver<ProgressEvent>) {
    mpsc::unbounded_channel()
}

pub(crate) fn emit(sender: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event);
    }
}
