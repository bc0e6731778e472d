use super::{FitcamOrchestrator, ShutdownReason};
use crate::error::{FitcamError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, warn};

type SharedSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl FitcamOrchestrator {
    /// Wait for a shutdown request, then stop everything; returns the exit code
    pub async fn run(&mut self) -> Result<i32> {
        info!("Fitcam is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| FitcamError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| FitcamError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown(&shutdown_reason).await;

        info!("Fitcam shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self) {
        // SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let sender = Arc::clone(&self.shutdown_sender);
            tokio::spawn(async move {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            send_reason(&sender, ShutdownReason::Signal("SIGTERM".to_string()));
                        }
                    }
                    Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
                }
            });
        }

        let sender = Arc::clone(&self.shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                send_reason(&sender, ShutdownReason::Signal("SIGINT".to_string()));
            }
        });
    }
}

fn send_reason(sender: &SharedSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().take() {
        let _ = sender.send(reason);
    }
}
