use super::SharedState;
use crate::analyzer::FrameAnalyzer;
use crate::camera::VideoSource;
use crate::classifier::ModeId;
use crate::speech::FeedbackDispatcher;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything one capture session owns.
///
/// Dropping it closes the source, stops speech and, if the session is
/// still the current one, marks the arbiter as stopped.
pub(super) struct CaptureSession {
    pub(super) id: Uuid,
    pub(super) mode: ModeId,
    pub(super) source: Box<dyn VideoSource>,
    pub(super) analyzer: FrameAnalyzer,
    pub(super) dispatcher: Option<FeedbackDispatcher>,
    pub(super) cancel: CancellationToken,
    pub(super) shared: Arc<SharedState>,
    pub(super) read_retry: Duration,
    pub(super) max_consecutive_misses: u32,
}

impl CaptureSession {
    /// Blocking read/analyse/publish loop; returns when cancelled or on a hard error
    pub(super) fn run(mut self) {
        info!("Capture session {} started for {} mode", self.id, self.mode);
        let mut misses = 0u32;

        while !self.cancel.is_cancelled() {
            match self.source.read() {
                Ok(Some(frame)) => {
                    misses = 0;
                    let published = match self.analyzer.process(&frame, Instant::now()) {
                        Ok(analyzed) => {
                            if let (Some(dispatcher), Some(text)) =
                                (&self.dispatcher, analyzed.feedback.as_deref())
                            {
                                dispatcher.say(text);
                            }
                            analyzed.frame
                        }
                        Err(e) => {
                            warn!("Session {} failed to analyse frame {}: {}", self.id, frame.id, e);
                            frame
                        }
                    };
                    self.shared.publish(published, &self.cancel);
                }
                Ok(None) => {
                    misses += 1;
                    if misses >= self.max_consecutive_misses {
                        error!(
                            "Capture session {} got no frames for {} reads, giving up",
                            self.id, misses
                        );
                        break;
                    }
                    thread::sleep(self.read_retry);
                }
                Err(e) => {
                    error!("Capture session {} stopped on camera error: {}", self.id, e);
                    break;
                }
            }
        }

        debug!(
            "Capture session {} leaving loop after {} analysed frames",
            self.id,
            self.analyzer.frames_processed()
        );
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.source.close();
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown();
        }
        self.shared.end_session(self.id);
        self.shared.release_capture();
        info!("Capture session {} for {} mode closed", self.id, self.mode);
    }
}
