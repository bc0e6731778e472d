use serde::{Deserialize, Serialize};

/// Joints the classifiers read from a pose estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum LandmarkName {
    Nose = 0,
    LeftShoulder = 1,
    RightShoulder = 2,
    LeftHip = 3,
    RightHip = 4,
    LeftKnee = 5,
    RightKnee = 6,
    LeftAnkle = 7,
    RightAnkle = 8,
    LeftIndex = 9,
    RightIndex = 10,
}

impl LandmarkName {
    pub const COUNT: usize = 11;

    pub const ALL: [LandmarkName; LandmarkName::COUNT] = [
        LandmarkName::Nose,
        LandmarkName::LeftShoulder,
        LandmarkName::RightShoulder,
        LandmarkName::LeftHip,
        LandmarkName::RightHip,
        LandmarkName::LeftKnee,
        LandmarkName::RightKnee,
        LandmarkName::LeftAnkle,
        LandmarkName::RightAnkle,
        LandmarkName::LeftIndex,
        LandmarkName::RightIndex,
    ];
}

/// A single estimated joint position.
///
/// Coordinates are normalized to the frame (0.0..=1.0 on both axes, y grows
/// downward); `visibility` is the estimator's confidence that the joint is
/// actually in view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    /// Position as an (x, y) pair in normalized space
    pub fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Position scaled to pixel space
    pub fn to_pixel(&self, width: u32, height: u32) -> (f64, f64) {
        (self.x * width as f64, self.y * height as f64)
    }
}

/// Fixed set of named landmarks for one detected person.
///
/// Joints the estimator did not report stay at zero visibility and are
/// rejected by every threshold check.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LandmarkSet {
    points: [Landmark; LandmarkName::COUNT],
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: LandmarkName, landmark: Landmark) -> Self {
        self.set(name, landmark);
        self
    }

    pub fn set(&mut self, name: LandmarkName, landmark: Landmark) {
        self.points[name as usize] = landmark;
    }

    pub fn get(&self, name: LandmarkName) -> &Landmark {
        &self.points[name as usize]
    }

    /// The landmark if its visibility is strictly above `threshold`
    pub fn visible_above(&self, name: LandmarkName, threshold: f64) -> Option<Landmark> {
        let landmark = self.get(name);
        (landmark.visibility > threshold).then_some(*landmark)
    }

    /// The landmark if its visibility is at least `threshold`
    pub fn visible_at_least(&self, name: LandmarkName, threshold: f64) -> Option<Landmark> {
        let landmark = self.get(name);
        (landmark.visibility >= threshold).then_some(*landmark)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkName, &Landmark)> {
        LandmarkName::ALL.iter().map(move |name| (*name, self.get(*name)))
    }
}
