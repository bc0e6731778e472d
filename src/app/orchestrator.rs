use super::types::{ComponentState, ShutdownReason, SourceKind};
use crate::analyzer::{annotator_from_config, AnalyzerFactory};
use crate::arbiter::CameraArbiter;
use crate::camera::{camera_source_factory, SourceFactory, SyntheticVideoSource, VideoSource};
use crate::config::FitcamConfig;
use crate::error::Result;
use crate::pose::synthetic::demo_squat_cycle;
use crate::pose::{EstimatorFactory, NoPoseEstimator, PoseEstimator, ScriptedPoseEstimator};
use crate::session::ModeSessionRegistry;
use crate::speech::{sink_from_config, SinkFactory};
#[cfg(feature = "streaming")]
use crate::streaming::{StreamServer, StreamServerBuilder};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(super) const COMPONENTS: [&str; 3] = ["camera", "uploads", "http"];

/// Main application coordinator that owns every long-lived component
pub struct FitcamOrchestrator {
    pub(super) config: FitcamConfig,
    pub(super) source: SourceKind,
    pub(super) arbiter: Arc<CameraArbiter>,
    pub(super) sessions: Arc<ModeSessionRegistry>,
    #[cfg(feature = "streaming")]
    pub(super) stream_server: Option<StreamServer>,
    pub(super) server_task: Option<JoinHandle<Result<()>>>,

    // Lifecycle management
    pub(super) component_states: Mutex<HashMap<&'static str, ComponentState>>,
    pub(super) shutdown_sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl FitcamOrchestrator {
    /// Wire every component for `config`; nothing runs until [`start`](Self::start)
    pub fn new(config: FitcamConfig, source: SourceKind) -> Result<Self> {
        let (sources, estimators) = match source {
            SourceKind::Synthetic => synthetic_inputs(&config),
            SourceKind::Camera => camera_inputs(&config)?,
        };

        let analyzers = AnalyzerFactory::new(
            Arc::new(config.clone()),
            estimators,
            annotator_from_config(&config.overlay),
        );

        let mut arbiter = CameraArbiter::builder()
            .config(config.arbiter.clone())
            .sources(sources)
            .analyzers(analyzers.clone());
        if config.speech.enabled {
            let speech = config.speech.clone();
            let sinks: SinkFactory = Arc::new(move || sink_from_config(&speech));
            arbiter = arbiter.speech(config.speech.clone(), sinks);
        } else {
            debug!("Speech feedback disabled");
        }
        let arbiter = Arc::new(arbiter.build()?);
        let sessions = Arc::new(ModeSessionRegistry::new(analyzers));

        #[cfg(feature = "streaming")]
        let stream_server = Some(
            StreamServerBuilder::new()
                .config(config.stream.clone())
                .arbiter(Arc::clone(&arbiter))
                .sessions(Arc::clone(&sessions))
                .build()?,
        );

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            source,
            arbiter,
            sessions,
            #[cfg(feature = "streaming")]
            stream_server,
            server_task: None,
            component_states: Mutex::new(HashMap::new()),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Register every component as stopped
    pub fn initialize(&self) -> Result<()> {
        info!("Initializing fitcam components ({:?} source)", self.source);
        let mut states = self.component_states.lock();
        for component in COMPONENTS {
            states.insert(component, ComponentState::Stopped);
        }
        Ok(())
    }

    /// Start serving; the camera itself opens lazily when a feed is requested
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting fitcam");

        self.set_component_state("camera", ComponentState::Running);
        self.set_component_state("uploads", ComponentState::Running);

        #[cfg(feature = "streaming")]
        {
            let server = self
                .stream_server
                .take()
                .ok_or_else(|| crate::error::FitcamError::component("http", "Server already started"))?;
            self.set_component_state("http", ComponentState::Starting);

            let token = self.cancellation_token.clone();
            let shutdown_sender = Arc::clone(&self.shutdown_sender);
            self.server_task = Some(tokio::spawn(async move {
                let result = server.serve(token).await;
                if let Err(e) = &result {
                    tracing::error!("HTTP server error: {}", e);
                    if let Some(sender) = shutdown_sender.lock().take() {
                        let _ = sender.send(ShutdownReason::Error(e.to_string()));
                    }
                }
                result
            }));

            self.set_component_state("http", ComponentState::Running);
            info!(
                "HTTP server starting on {}:{}",
                self.config.stream.ip, self.config.stream.port
            );
        }

        #[cfg(not(feature = "streaming"))]
        warn!("Built without the streaming feature; no HTTP surface will be served");

        info!("Fitcam started");
        Ok(())
    }

    /// Ask a running orchestrator to shut down; later requests are ignored
    pub fn request_shutdown(&self, reason: ShutdownReason) -> bool {
        match self.shutdown_sender.lock().take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }

    pub fn arbiter(&self) -> Arc<CameraArbiter> {
        Arc::clone(&self.arbiter)
    }

    pub fn sessions(&self) -> Arc<ModeSessionRegistry> {
        Arc::clone(&self.sessions)
    }

    pub(super) fn set_component_state(&self, component: &'static str, state: ComponentState) {
        self.component_states.lock().insert(component, state);
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().get(component).copied()
    }

    pub fn component_states(&self) -> HashMap<&'static str, ComponentState> {
        self.component_states.lock().clone()
    }
}

fn synthetic_inputs(config: &FitcamConfig) -> (SourceFactory, EstimatorFactory) {
    let (width, height) = config.camera.resolution;
    let fps = config.camera.fps;
    info!(
        "Using synthetic {}x{} source at {}fps with a scripted squat",
        width, height, fps
    );

    let sources: SourceFactory = Arc::new(move || {
        Box::new(SyntheticVideoSource::new(width, height, fps)) as Box<dyn VideoSource>
    });
    let estimators: EstimatorFactory = Arc::new(|| {
        Box::new(ScriptedPoseEstimator::looping(demo_squat_cycle())) as Box<dyn PoseEstimator>
    });
    (sources, estimators)
}

fn camera_inputs(config: &FitcamConfig) -> Result<(SourceFactory, EstimatorFactory)> {
    let sources = camera_source_factory(&config.camera)?;
    warn!("No pose estimation backend is built in; classifiers will report the body as not visible");
    let estimators: EstimatorFactory =
        Arc::new(|| Box::new(NoPoseEstimator) as Box<dyn PoseEstimator>);
    Ok((sources, estimators))
}
