//! Signal handling for graceful shutdown
//!
//! A shutdown request is a `watch` flag flipped to `true`. The orchestrator
//! stops dispatching new transfers once it sees the flag; transfers already
//! running are allowed to finish.

use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Sending half of the shutdown flag
pub type ShutdownSender = watch::Sender<bool>;

/// Receiving half of the shutdown flag
pub type ShutdownReceiver = watch::Receiver<bool>;

/// Create a shutdown flag, initially unset
pub fn create_shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

/// Resolve once shutdown has been requested
///
/// Never resolves if the sender is dropped without requesting shutdown.
pub async fn wait_for_shutdown(mut shutdown_rx: ShutdownReceiver) {
    if shutdown_rx.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Flips the shutdown flag on Ctrl-C or SIGTERM
pub struct SignalHandler {
    shutdown_tx: ShutdownSender,
}

impl SignalHandler {
    /// Create a handler that will set `shutdown_tx`
    pub fn new(shutdown_tx: ShutdownSender) -> Self {
        Self { shutdown_tx }
    }

    /// Spawn the background task that waits for a signal
    pub fn setup(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    error!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, finishing in-flight transfers");
                },
                _ = terminate => {
                    info!("Received terminate signal, finishing in-flight transfers");
                },
            }

            let _ = self.shutdown_tx.send(true);
        })
    }
}
