//! Exercise classifiers.
//!
//! Each mode turns a stream of per-frame pose observations into counts and
//! short user-facing feedback. Modes are a closed set selected through
//! [`ModeId`]; [`ModeClassifier::new`] is the only place a mode name becomes
//! an implementation.

mod jump;
mod squat;

#[cfg(test)]
mod tests;

pub use jump::{JumpClassifier, JumpPhase, JumpReason, JumpResult, JumpSnapshot};
pub use squat::{SquatClassifier, SquatSnapshot, Stage};

use crate::config::FitcamConfig;
use crate::error::FitcamError;
use crate::pose::LandmarkSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Feedback emitted whenever the required joints are not confidently tracked
pub const BODY_NOT_VISIBLE: &str = "body not fully visible";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeId {
    Squat,
    Jump,
}

impl ModeId {
    pub const ALL: [ModeId; 2] = [ModeId::Squat, ModeId::Jump];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeId::Squat => "squat",
            ModeId::Jump => "jump",
        }
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeId {
    type Err = FitcamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squat" => Ok(ModeId::Squat),
            "jump" => Ok(ModeId::Jump),
            other => Err(FitcamError::UnknownMode(other.to_string())),
        }
    }
}

/// One frame's worth of input for a classifier
#[derive(Debug, Clone)]
pub struct Observation {
    /// `None` when the estimator found no person
    pub landmarks: Option<LandmarkSet>,
    pub width: u32,
    pub height: u32,
    pub at: Instant,
}

impl Observation {
    pub fn new(landmarks: Option<LandmarkSet>, width: u32, height: u32, at: Instant) -> Self {
        Self {
            landmarks,
            width,
            height,
            at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayAccent {
    #[default]
    Neutral,
    Good,
    Bad,
}

/// Text the annotator draws onto an analysed frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    /// Label/value pairs for the header bar
    pub counters: Vec<(String, String)>,
    pub status: Vec<String>,
    pub feedback: Option<String>,
    pub accent: OverlayAccent,
}

/// Per-frame exercise state machine
pub trait Classifier: Send {
    fn mode(&self) -> ModeId;

    /// Advance the state machine by one frame and return the current feedback
    fn observe(&mut self, observation: &Observation) -> Option<String>;

    /// Return to the freshly constructed state
    fn reset(&mut self);

    fn feedback(&self) -> Option<&str>;

    fn overlay(&self) -> Overlay;
}

/// Enum-dispatched classifier for a [`ModeId`]
#[derive(Debug, Clone)]
pub enum ModeClassifier {
    Squat(SquatClassifier),
    Jump(JumpClassifier),
}

impl ModeClassifier {
    pub fn new(mode: ModeId, config: &FitcamConfig) -> Self {
        match mode {
            ModeId::Squat => ModeClassifier::Squat(SquatClassifier::new(config.squat.clone())),
            ModeId::Jump => ModeClassifier::Jump(JumpClassifier::new(config.jump.clone())),
        }
    }

    pub fn as_squat(&self) -> Option<&SquatClassifier> {
        match self {
            ModeClassifier::Squat(squat) => Some(squat),
            ModeClassifier::Jump(_) => None,
        }
    }

    pub fn as_jump(&self) -> Option<&JumpClassifier> {
        match self {
            ModeClassifier::Jump(jump) => Some(jump),
            ModeClassifier::Squat(_) => None,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            ModeClassifier::Squat(squat) => squat,
            ModeClassifier::Jump(jump) => jump,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            ModeClassifier::Squat(squat) => squat,
            ModeClassifier::Jump(jump) => jump,
        }
    }
}

impl Classifier for ModeClassifier {
    fn mode(&self) -> ModeId {
        self.inner().mode()
    }

    fn observe(&mut self, observation: &Observation) -> Option<String> {
        self.inner_mut().observe(observation)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn feedback(&self) -> Option<&str> {
        self.inner().feedback()
    }

    fn overlay(&self) -> Overlay {
        self.inner().overlay()
    }
}
