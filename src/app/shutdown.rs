use super::{ComponentState, FitcamOrchestrator, ShutdownReason};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Extra time the HTTP server gets on top of the arbiter's stop timeout
const SERVER_GRACE: Duration = Duration::from_secs(2);

impl FitcamOrchestrator {
    /// Stop the HTTP server, then release the camera.
    ///
    /// Every step is bounded; a component that overruns is reported and
    /// abandoned. Returns the process exit code.
    pub async fn shutdown(&mut self, reason: &ShutdownReason) -> i32 {
        info!("Beginning graceful shutdown");

        // Feeds and the accept loop watch this token
        self.cancellation_token.cancel();

        let mut exit_code = reason.exit_code();

        if let Some(task) = self.server_task.take() {
            self.set_component_state("http", ComponentState::Stopping);
            let grace = Duration::from_millis(self.config.arbiter.stop_timeout_ms) + SERVER_GRACE;
            match timeout(grace, task).await {
                Ok(Ok(Ok(()))) => self.set_component_state("http", ComponentState::Stopped),
                Ok(Ok(Err(e))) => {
                    error!("HTTP server stopped with error: {}", e);
                    self.set_component_state("http", ComponentState::Failed);
                    exit_code = 1;
                }
                Ok(Err(e)) => {
                    error!("HTTP server task failed: {}", e);
                    self.set_component_state("http", ComponentState::Failed);
                    exit_code = 1;
                }
                Err(_) => {
                    warn!("HTTP server did not stop within {:?}", grace);
                    self.set_component_state("http", ComponentState::Failed);
                    exit_code = 1;
                }
            }
        }

        self.set_component_state("camera", ComponentState::Stopping);
        self.arbiter.stop().await;
        self.set_component_state("camera", ComponentState::Stopped);
        info!(
            "Camera released after {} published frames",
            self.arbiter.frames_published()
        );

        self.set_component_state("uploads", ComponentState::Stopped);

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }
}
