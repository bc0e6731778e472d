use crate::frame::FrameData;
use crate::pose::LandmarkSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// Landmark extraction backend.
///
/// Implementations may keep per-stream tracking state, so every analyzer
/// owns its own estimator instance.
pub trait PoseEstimator: Send {
    /// Landmarks for the single tracked person, or `None` when nobody is detected
    fn estimate(&mut self, frame: &FrameData) -> Option<LandmarkSet>;
}

/// Constructs a fresh estimator for each analyzer instance
pub type EstimatorFactory = Arc<dyn Fn() -> Box<dyn PoseEstimator> + Send + Sync>;

/// Estimator that never detects anyone; used when no backend is linked
#[derive(Debug, Default)]
pub struct NoPoseEstimator;

impl PoseEstimator for NoPoseEstimator {
    fn estimate(&mut self, frame: &FrameData) -> Option<LandmarkSet> {
        trace!("No pose backend configured, skipping frame {}", frame.id);
        None
    }
}

/// Replays a prepared sequence of estimates, one per frame
#[derive(Debug, Default)]
pub struct ScriptedPoseEstimator {
    script: VecDeque<Option<LandmarkSet>>,
    looping: bool,
}

impl ScriptedPoseEstimator {
    /// Play the script once, then report no person
    pub fn new(script: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            script: script.into(),
            looping: false,
        }
    }

    /// Play the script forever
    pub fn looping(script: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            script: script.into(),
            looping: true,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PoseEstimator for ScriptedPoseEstimator {
    fn estimate(&mut self, _frame: &FrameData) -> Option<LandmarkSet> {
        let next = self.script.pop_front()?;
        if self.looping {
            self.script.push_back(next.clone());
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;
    use crate::pose::{Landmark, LandmarkName};
    use std::time::SystemTime;

    fn frame() -> FrameData {
        FrameData::new(0, SystemTime::now(), vec![0u8; 12], 2, 2, FrameFormat::Rgb24)
    }

    #[test]
    fn test_scripted_plays_once() {
        let set = LandmarkSet::new().with(LandmarkName::Nose, Landmark::new(0.5, 0.5, 1.0));
        let mut estimator = ScriptedPoseEstimator::new(vec![Some(set.clone()), None]);

        assert_eq!(estimator.estimate(&frame()), Some(set));
        assert_eq!(estimator.estimate(&frame()), None);
        assert_eq!(estimator.remaining(), 0);
        assert_eq!(estimator.estimate(&frame()), None);
    }

    #[test]
    fn test_scripted_looping() {
        let set = LandmarkSet::new().with(LandmarkName::Nose, Landmark::new(0.5, 0.5, 1.0));
        let mut estimator = ScriptedPoseEstimator::looping(vec![Some(set.clone())]);

        for _ in 0..3 {
            assert_eq!(estimator.estimate(&frame()), Some(set.clone()));
        }
    }

    #[test]
    fn test_no_pose() {
        assert!(NoPoseEstimator.estimate(&frame()).is_none());
    }
}
