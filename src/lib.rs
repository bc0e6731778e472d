pub mod analyzer;
pub mod app;
pub mod arbiter;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod error;
pub mod frame;
pub mod pose;
pub mod session;
pub mod smoothing;
pub mod speech;

#[cfg(feature = "streaming")]
pub mod streaming;

pub use analyzer::{AnalyzedFrame, AnalyzerFactory, FrameAnalyzer};
pub use app::{ComponentState, FitcamOrchestrator, ShutdownReason, SourceKind};
pub use arbiter::{CameraArbiter, CameraArbiterBuilder};
pub use classifier::{Classifier, JumpClassifier, ModeClassifier, ModeId, SquatClassifier};
pub use config::FitcamConfig;
pub use error::{FitcamError, Result};
pub use frame::{FrameData, FrameFormat};
pub use session::ModeSessionRegistry;
pub use smoothing::SlidingWindow;
pub use speech::FeedbackDispatcher;

#[cfg(feature = "streaming")]
pub use streaming::{StreamServer, StreamServerBuilder};
