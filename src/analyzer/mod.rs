//! Per-frame analysis: pose estimation, classification and annotation

mod annotate;
pub mod codec;
mod pipeline;

#[cfg(test)]
mod tests;

#[cfg(feature = "overlay")]
pub use annotate::TextOverlayAnnotator;
pub use annotate::{annotator_from_config, Annotator, PassthroughAnnotator};
pub use pipeline::{AnalyzedFrame, AnalyzerFactory, FrameAnalyzer};
