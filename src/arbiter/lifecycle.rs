use super::capture::CaptureSession;
use super::SharedState;
use crate::analyzer::AnalyzerFactory;
use crate::camera::{SourceFactory, VideoSource};
use crate::classifier::ModeId;
use crate::config::{ArbiterConfig, SpeechConfig};
use crate::error::{FitcamError, Result};
use crate::frame::FrameData;
use crate::speech::{FeedbackDispatcher, SinkFactory};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

struct ActiveCapture {
    id: Uuid,
    mode: ModeId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the camera on behalf of the streaming endpoints.
///
/// `activate` and `stop` are serialized by one async lock; the latest frame
/// lives behind its own lock so polling it never waits on a mode switch.
pub struct CameraArbiter {
    config: ArbiterConfig,
    sources: SourceFactory,
    analyzers: AnalyzerFactory,
    speech: Option<(SpeechConfig, SinkFactory)>,
    lifecycle: Mutex<Option<ActiveCapture>>,
    shared: Arc<SharedState>,
}

impl CameraArbiter {
    pub fn builder() -> CameraArbiterBuilder {
        CameraArbiterBuilder::new()
    }

    /// Start capturing for `mode`, replacing any other active mode.
    ///
    /// Returns `false` when the video source cannot be opened; the arbiter
    /// is left stopped in that case.
    pub async fn activate(&self, mode: ModeId) -> bool {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(active) = lifecycle.as_ref() {
            let still_current = self.shared.current().map(|(id, _)| id) == Some(active.id);
            if active.mode == mode && still_current {
                debug!("{} mode already active (session {})", mode, active.id);
                return true;
            }
        }

        if let Some(active) = lifecycle.take() {
            self.stop_capture(active).await;
        }

        let sources = Arc::clone(&self.sources);
        let opened = tokio::task::spawn_blocking(move || {
            let mut source = sources();
            source.open().map(|()| source)
        })
        .await;

        let source: Box<dyn VideoSource> = match opened {
            Ok(Ok(source)) => source,
            Ok(Err(e)) => {
                warn!("Cannot activate {} mode: {}", mode, e);
                return false;
            }
            Err(e) => {
                error!("Video source open task failed for {} mode: {}", mode, e);
                return false;
            }
        };

        let dispatcher = self
            .speech
            .as_ref()
            .map(|(config, sinks)| FeedbackDispatcher::start(sinks(), config));

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        self.shared.begin_session(id, mode);

        let session = CaptureSession {
            id,
            mode,
            source,
            analyzer: self.analyzers.build(mode),
            dispatcher,
            cancel: cancel.clone(),
            shared: Arc::clone(&self.shared),
            read_retry: Duration::from_millis(self.config.read_retry_ms),
            max_consecutive_misses: self.config.max_consecutive_misses.max(1),
        };
        let handle = tokio::task::spawn_blocking(move || session.run());

        info!("Activated {} mode (session {})", mode, id);
        *lifecycle = Some(ActiveCapture {
            id,
            mode,
            cancel,
            handle,
        });
        true
    }

    /// Stop the active session, if any, within the configured timeout
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.take() {
            Some(active) => self.stop_capture(active).await,
            None => debug!("Stop requested with no active capture"),
        }
    }

    async fn stop_capture(&self, active: ActiveCapture) {
        info!("Stopping {} mode (session {})", active.mode, active.id);
        active.cancel.cancel();
        self.shared.end_session(active.id);

        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        match tokio::time::timeout(timeout, active.handle).await {
            Ok(Ok(())) => debug!("Capture session {} joined", active.id),
            Ok(Err(e)) => error!("Capture session {} task failed: {}", active.id, e),
            Err(_) => warn!(
                "Capture session {} did not stop within {:?}, abandoning it",
                active.id, timeout
            ),
        }
    }

    /// Most recent annotated frame of the running session
    pub fn latest_frame(&self) -> Option<FrameData> {
        self.shared.latest.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.current().is_some()
    }

    pub fn active_mode(&self) -> Option<ModeId> {
        self.shared.current().map(|(_, mode)| mode)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.shared.current().map(|(id, _)| id)
    }

    /// Capture threads that still own a video source
    pub fn live_captures(&self) -> usize {
        self.shared.live_captures.load(Ordering::SeqCst)
    }

    pub fn frames_published(&self) -> u64 {
        self.shared.frames_published.load(Ordering::Relaxed)
    }
}

impl Drop for CameraArbiter {
    fn drop(&mut self) {
        if let Some(active) = self.lifecycle.get_mut().take() {
            debug!("Arbiter dropped with session {} active", active.id);
            active.cancel.cancel();
            self.shared.end_session(active.id);
        }
    }
}

/// Builder for [`CameraArbiter`]
pub struct CameraArbiterBuilder {
    config: ArbiterConfig,
    sources: Option<SourceFactory>,
    analyzers: Option<AnalyzerFactory>,
    speech: Option<(SpeechConfig, SinkFactory)>,
}

impl CameraArbiterBuilder {
    pub fn new() -> Self {
        Self {
            config: ArbiterConfig::default(),
            sources: None,
            analyzers: None,
            speech: None,
        }
    }

    pub fn config(mut self, config: ArbiterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sources(mut self, sources: SourceFactory) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn analyzers(mut self, analyzers: AnalyzerFactory) -> Self {
        self.analyzers = Some(analyzers);
        self
    }

    /// Speak classifier feedback during capture sessions
    pub fn speech(mut self, config: SpeechConfig, sinks: SinkFactory) -> Self {
        self.speech = Some((config, sinks));
        self
    }

    pub fn build(self) -> Result<CameraArbiter> {
        let sources = self
            .sources
            .ok_or_else(|| FitcamError::system("Video source factory must be specified"))?;
        let analyzers = self
            .analyzers
            .ok_or_else(|| FitcamError::system("Analyzer factory must be specified"))?;

        Ok(CameraArbiter {
            config: self.config,
            sources,
            analyzers,
            speech: self.speech,
            lifecycle: Mutex::new(None),
            shared: Arc::new(SharedState::default()),
        })
    }
}

impl Default for CameraArbiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
