use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Unknown exercise mode: {0}")]
    UnknownMode(String),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl FitcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Video source failures
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera device {device}: {details}")]
    DeviceOpen { device: u32, details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Capture stream error: {details}")]
    CaptureStream { details: String },
}

/// Per-frame analysis failures (decode, annotation)
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to decode frame {frame_id}: {details}")]
    FrameDecode { frame_id: u64, details: String },

    #[error("Annotation failed: {details}")]
    Annotation { details: String },

    #[error("Unsupported frame format: {format}")]
    UnsupportedFormat { format: String },
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech sink failed: {details}")]
    Sink { details: String },

    #[error("Speech queue is closed")]
    QueueClosed,
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream server startup failed: {details}")]
    StartupFailed { details: String },
}

pub type Result<T> = std::result::Result<T, FitcamError>;
