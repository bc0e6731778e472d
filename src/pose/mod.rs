mod estimator;
mod geometry;
mod landmark;
pub mod synthetic;

pub use estimator::{EstimatorFactory, NoPoseEstimator, PoseEstimator, ScriptedPoseEstimator};
pub use geometry::{distance, joint_angle};
pub use landmark::{Landmark, LandmarkName, LandmarkSet};
