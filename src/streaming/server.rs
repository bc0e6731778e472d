use crate::{
    arbiter::CameraArbiter,
    config::StreamConfig,
    error::{FitcamError, Result, StreamError},
    session::ModeSessionRegistry,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::handlers::{
    health_handler, index_handler, jump_feed_handler, process_frame_handler,
    reset_analyzer_handler, squat_feed_handler, stop_handler,
};

/// Largest accepted upload on `/process_frame`
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) arbiter: Arc<CameraArbiter>,
    pub(crate) sessions: Arc<ModeSessionRegistry>,
    pub(crate) target_frame_interval: Duration,
    pub(crate) uploads: Arc<AtomicU64>,
    pub(crate) shutdown: CancellationToken,
}

/// HTTP front end: live feeds from the arbiter and per-frame analysis for uploads
pub struct StreamServer {
    pub(crate) config: StreamConfig,
    pub(crate) arbiter: Arc<CameraArbiter>,
    pub(crate) sessions: Arc<ModeSessionRegistry>,
    pub(crate) target_frame_interval: Duration,
}

impl StreamServer {
    pub fn new(
        config: StreamConfig,
        arbiter: Arc<CameraArbiter>,
        sessions: Arc<ModeSessionRegistry>,
    ) -> Self {
        let target_frame_interval =
            Duration::from_micros(1_000_000u64 / config.target_fps.max(1) as u64);

        Self {
            config,
            arbiter,
            sessions,
            target_frame_interval,
        }
    }

    /// Router with every endpoint; feeds end once `shutdown` is cancelled
    pub fn router(&self, shutdown: CancellationToken) -> Router {
        let state = ServerState {
            arbiter: Arc::clone(&self.arbiter),
            sessions: Arc::clone(&self.sessions),
            target_frame_interval: self.target_frame_interval,
            uploads: Arc::new(AtomicU64::new(0)),
            shutdown,
        };

        Router::new()
            .route("/", get(index_handler))
            .route("/squat_feed", get(squat_feed_handler))
            .route("/jump_feed", get(jump_feed_handler))
            .route("/process_frame", post(process_frame_handler))
            .route("/reset_analyzer", post(reset_analyzer_handler))
            .route("/stop", post(stop_handler))
            .route("/health", get(health_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
            .with_state(state)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.address();
        let app = self.router(shutdown.clone());

        info!("Starting fitcam HTTP server on {}", addr);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| StreamError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;

        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| StreamError::StartupFailed {
                details: format!("Server error: {}", e),
            })?;

        info!("HTTP server on {} stopped", addr);
        Ok(())
    }
}

/// Stream server builder for configuration
pub struct StreamServerBuilder {
    config: Option<StreamConfig>,
    arbiter: Option<Arc<CameraArbiter>>,
    sessions: Option<Arc<ModeSessionRegistry>>,
}

impl StreamServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            arbiter: None,
            sessions: None,
        }
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Camera owner backing the live feeds
    pub fn arbiter(mut self, arbiter: Arc<CameraArbiter>) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    /// Per-mode analyzers backing uploaded frames
    pub fn sessions(mut self, sessions: Arc<ModeSessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn build(self) -> Result<StreamServer> {
        let config = self.config.ok_or_else(|| {
            FitcamError::Stream(StreamError::StartupFailed {
                details: "Stream configuration is required".to_string(),
            })
        })?;

        let arbiter = self.arbiter.ok_or_else(|| {
            FitcamError::Stream(StreamError::StartupFailed {
                details: "Camera arbiter is required".to_string(),
            })
        })?;

        let sessions = self.sessions.ok_or_else(|| {
            FitcamError::Stream(StreamError::StartupFailed {
                details: "Session registry is required".to_string(),
            })
        })?;

        Ok(StreamServer::new(config, arbiter, sessions))
    }
}

impl Default for StreamServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
