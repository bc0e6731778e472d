use super::Annotator;
use crate::classifier::{Classifier, ModeClassifier, ModeId, Observation};
use crate::config::FitcamConfig;
use crate::error::AnalysisError;
use crate::frame::FrameData;
use crate::pose::{EstimatorFactory, PoseEstimator};
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Annotated output of one analysed frame
#[derive(Debug, Clone)]
pub struct AnalyzedFrame {
    pub frame: FrameData,
    pub feedback: Option<String>,
}

/// One mode's classifier together with the estimator and annotator feeding it
pub struct FrameAnalyzer {
    classifier: ModeClassifier,
    estimator: Box<dyn PoseEstimator>,
    annotator: Arc<dyn Annotator>,
    frames_processed: u64,
}

impl FrameAnalyzer {
    pub fn new(
        classifier: ModeClassifier,
        estimator: Box<dyn PoseEstimator>,
        annotator: Arc<dyn Annotator>,
    ) -> Self {
        Self {
            classifier,
            estimator,
            annotator,
            frames_processed: 0,
        }
    }

    pub fn mode(&self) -> ModeId {
        self.classifier.mode()
    }

    /// Estimate, classify and annotate a frame captured at `at`.
    ///
    /// Classifier state advances even when annotation fails.
    pub fn process(&mut self, frame: &FrameData, at: Instant) -> Result<AnalyzedFrame, AnalysisError> {
        let landmarks = self.estimator.estimate(frame);
        let observation = Observation::new(landmarks, frame.width, frame.height, at);
        let feedback = self.classifier.observe(&observation);
        self.frames_processed += 1;

        trace!(
            "{} frame {} analysed, feedback {:?}",
            self.mode(),
            frame.id,
            feedback
        );

        let annotated = self.annotator.annotate(frame, &self.classifier.overlay())?;
        Ok(AnalyzedFrame {
            frame: annotated,
            feedback,
        })
    }

    pub fn reset(&mut self) {
        self.classifier.reset();
    }

    pub fn classifier(&self) -> &ModeClassifier {
        &self.classifier
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

/// Builds fully wired analyzers for any mode
#[derive(Clone)]
pub struct AnalyzerFactory {
    config: Arc<FitcamConfig>,
    estimators: EstimatorFactory,
    annotator: Arc<dyn Annotator>,
}

impl AnalyzerFactory {
    pub fn new(
        config: Arc<FitcamConfig>,
        estimators: EstimatorFactory,
        annotator: Arc<dyn Annotator>,
    ) -> Self {
        Self {
            config,
            estimators,
            annotator,
        }
    }

    pub fn build(&self, mode: ModeId) -> FrameAnalyzer {
        FrameAnalyzer::new(
            ModeClassifier::new(mode, &self.config),
            (self.estimators)(),
            Arc::clone(&self.annotator),
        )
    }

    pub fn config(&self) -> &FitcamConfig {
        &self.config
    }
}
