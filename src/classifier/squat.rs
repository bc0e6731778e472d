use super::{Classifier, ModeId, Observation, Overlay, OverlayAccent, BODY_NOT_VISIBLE};
use crate::config::SquatConfig;
use crate::pose::{joint_angle, Landmark, LandmarkName, LandmarkSet};
use crate::smoothing::SlidingWindow;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Knee angle above which a bottom-to-standing sequence counts as rising out
const RISING_KNEE_ANGLE: f64 = 100.0;

const BACK_TOO_UPRIGHT: f64 = 25.0;
const BACK_TOO_BENT: f64 = 50.0;
const SHALLOW_KNEE_ANGLE: f64 = 80.0;
const TOO_DEEP_KNEE_ANGLE: f64 = 50.0;
const TARGET_DEPTH_ANGLE: f64 = 60.0;

pub const CORRECT_SQUAT: &str = "Correct Squat";
pub const INCOMPLETE_SQUAT: &str = "Incomplete Squat";
pub const HOLD_LONGER: &str = "Hold at bottom longer";

/// Squat depth band derived from the smoothed knee angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Standing
    S1,
    /// Partial squat
    S2,
    /// At depth
    S3,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::S1 => "S1",
            Stage::S2 => "S2",
            Stage::S3 => "S3",
        };
        f.write_str(label)
    }
}

/// Point-in-time copy of the squat state machine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquatSnapshot {
    pub stage: Option<Stage>,
    pub sequence: Vec<Stage>,
    pub depth_hold: u32,
    pub min_knee_angle: f64,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub smoothed_samples: usize,
    pub feedback: Option<String>,
}

/// Stage-sequence rep counter over smoothed knee and back angles.
///
/// Every frame with the four left-side joints visible is classified into a
/// [`Stage`]; stage changes are appended to a sequence, and a rep is resolved
/// when the tail of that sequence matches a full descent and recovery with
/// enough frames held at depth. `depth_hold` survives brief S3/S2 wobble and
/// is only cleared when a rep resolves.
#[derive(Debug, Clone)]
pub struct SquatClassifier {
    config: SquatConfig,
    stage: Option<Stage>,
    sequence: Vec<Stage>,
    depth_hold: u32,
    min_knee_angle: f64,
    correct_count: u32,
    incorrect_count: u32,
    knee_window: SlidingWindow,
    back_window: SlidingWindow,
    angles: Option<(f64, f64)>,
    feedback: Option<String>,
}

impl SquatClassifier {
    pub fn new(config: SquatConfig) -> Self {
        let window = config.smoothing_window;
        Self {
            config,
            stage: None,
            sequence: Vec::new(),
            depth_hold: 0,
            min_knee_angle: 180.0,
            correct_count: 0,
            incorrect_count: 0,
            knee_window: SlidingWindow::new(window),
            back_window: SlidingWindow::new(window),
            angles: None,
            feedback: None,
        }
    }

    /// Feed one frame of landmarks and return the resulting feedback
    pub fn observe_landmarks(&mut self, landmarks: &LandmarkSet) -> Option<String> {
        let threshold = self.config.visibility_threshold;
        let joints = (
            landmarks.visible_above(LandmarkName::LeftShoulder, threshold),
            landmarks.visible_above(LandmarkName::LeftHip, threshold),
            landmarks.visible_above(LandmarkName::LeftKnee, threshold),
            landmarks.visible_above(LandmarkName::LeftAnkle, threshold),
        );
        let (Some(shoulder), Some(hip), Some(knee), Some(ankle)) = joints else {
            self.feedback = Some(BODY_NOT_VISIBLE.to_string());
            return self.feedback.clone();
        };

        self.knee_window
            .push(joint_angle(hip.point(), knee.point(), ankle.point()));
        self.back_window
            .push(joint_angle(shoulder.point(), hip.point(), knee.point()));
        let knee_angle = self.knee_window.mean();
        let back_angle = self.back_window.mean();
        self.angles = Some((knee_angle, back_angle));
        self.min_knee_angle = self.min_knee_angle.min(knee_angle);

        let stage = self.classify(knee_angle);
        if self.stage != Some(stage) {
            debug!(
                "Squat stage {} -> {} (knee {:.1})",
                self.stage.map_or("-".to_string(), |s| s.to_string()),
                stage,
                knee_angle
            );
            self.sequence.push(stage);
        }
        self.stage = Some(stage);

        if stage == Stage::S3 {
            self.depth_hold += 1;
        }

        let mut feedback = self.resolve_rep(knee_angle).map(str::to_string);
        if let Some(form) = self.form_feedback(stage, knee_angle, back_angle, &knee, &ankle) {
            feedback = Some(form.to_string());
        }

        self.feedback = feedback;
        self.feedback.clone()
    }

    fn classify(&self, knee_angle: f64) -> Stage {
        if knee_angle > self.config.standing_angle {
            Stage::S1
        } else if knee_angle > self.config.bottom_angle {
            Stage::S2
        } else {
            Stage::S3
        }
    }

    fn resolve_rep(&mut self, knee_angle: f64) -> Option<&'static str> {
        let hold_met = self.depth_hold >= self.config.depth_hold_frames;
        let tail = &self.sequence[self.sequence.len().saturating_sub(3)..];
        let descended = matches!(tail, [Stage::S1, Stage::S2, Stage::S3]);
        let recovered = matches!(tail, [Stage::S2, Stage::S3, Stage::S2]);

        if descended && hold_met && knee_angle > RISING_KNEE_ANGLE {
            return Some(self.count_rep(true, CORRECT_SQUAT));
        }
        if recovered && hold_met {
            return Some(self.count_rep(true, CORRECT_SQUAT));
        }

        if self.sequence.len() >= 3 && self.sequence.last() == Some(&Stage::S1) {
            if !self.sequence.contains(&Stage::S3) {
                return Some(self.count_rep(false, INCOMPLETE_SQUAT));
            }
            if !hold_met {
                return Some(self.count_rep(false, HOLD_LONGER));
            }
            debug!("Discarding resolved squat sequence {:?}", self.sequence);
            self.sequence.clear();
            self.depth_hold = 0;
        }

        None
    }

    fn count_rep(&mut self, correct: bool, message: &'static str) -> &'static str {
        if correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        info!(
            "Squat rep resolved: {} (sequence {:?}, hold {}, correct {}, incorrect {})",
            message, self.sequence, self.depth_hold, self.correct_count, self.incorrect_count
        );
        self.sequence.clear();
        self.depth_hold = 0;
        self.min_knee_angle = 180.0;
        message
    }

    fn form_feedback(
        &self,
        stage: Stage,
        knee_angle: f64,
        back_angle: f64,
        knee: &Landmark,
        ankle: &Landmark,
    ) -> Option<&'static str> {
        if ankle.x > knee.x {
            return Some("Knees over toes");
        }

        if back_angle < BACK_TOO_UPRIGHT {
            Some("Bend forward")
        } else if back_angle > BACK_TOO_BENT {
            Some("Bend backwards")
        } else if stage == Stage::S2 && knee_angle > SHALLOW_KNEE_ANGLE {
            Some("Lower your hips")
        } else if stage == Stage::S3 && knee_angle < TOO_DEEP_KNEE_ANGLE {
            Some("Squat too deep")
        } else if stage == Stage::S3 && self.min_knee_angle > TARGET_DEPTH_ANGLE {
            Some("Raise deeper")
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> SquatSnapshot {
        SquatSnapshot {
            stage: self.stage,
            sequence: self.sequence.clone(),
            depth_hold: self.depth_hold,
            min_knee_angle: self.min_knee_angle,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            smoothed_samples: self.knee_window.len(),
            feedback: self.feedback.clone(),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn incorrect_count(&self) -> u32 {
        self.incorrect_count
    }
}

impl Classifier for SquatClassifier {
    fn mode(&self) -> ModeId {
        ModeId::Squat
    }

    fn observe(&mut self, observation: &Observation) -> Option<String> {
        match &observation.landmarks {
            Some(landmarks) => self.observe_landmarks(landmarks),
            None => {
                self.feedback = Some(BODY_NOT_VISIBLE.to_string());
                self.feedback.clone()
            }
        }
    }

    fn reset(&mut self) {
        info!(
            "Resetting squat classifier (correct {}, incorrect {})",
            self.correct_count, self.incorrect_count
        );
        *self = Self::new(self.config.clone());
    }

    fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    fn overlay(&self) -> Overlay {
        let mut status = Vec::new();
        if let Some((knee, back)) = self.angles {
            status.push(format!("Knee: {}  Back: {}", knee as i64, back as i64));
        }

        Overlay {
            counters: vec![
                ("CORRECT".to_string(), self.correct_count.to_string()),
                ("INCORRECT".to_string(), self.incorrect_count.to_string()),
                (
                    "STAGE".to_string(),
                    self.stage.map_or("N/A".to_string(), |s| s.to_string()),
                ),
            ],
            status,
            feedback: self.feedback.clone(),
            accent: OverlayAccent::Neutral,
        }
    }
}
