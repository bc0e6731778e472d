mod interface;
mod source;
mod synthetic;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use interface::GstVideoSource;
pub use interface::{camera_source_factory, pipeline_description};
pub use source::{SourceFactory, SourceProbe, VideoSource};
pub use synthetic::SyntheticVideoSource;
