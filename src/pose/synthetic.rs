//! Landmark sets built from joint angles.
//!
//! These drive the scripted estimator in demos and give tests exact control
//! over the angles the classifiers will measure.

use super::{Landmark, LandmarkName, LandmarkSet};

const SEGMENT: f64 = 0.25;
const VISIBLE: f64 = 0.99;

fn rotate((x, y): (f64, f64), degrees: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Left-side squat profile with the given knee and back angles.
///
/// The ankle sits directly below the knee, so the knees-over-toes check
/// never fires for these poses.
pub fn squat_pose(knee_angle: f64, back_angle: f64) -> LandmarkSet {
    let knee = (0.5, 0.6);
    let ankle = (0.5, 0.9);

    let (sin, cos) = knee_angle.to_radians().sin_cos();
    let hip = (knee.0 - SEGMENT * sin, knee.1 + SEGMENT * cos);

    let thigh = (sin, -cos);
    let torso = rotate(thigh, back_angle);
    let shoulder = (hip.0 + SEGMENT * torso.0, hip.1 + SEGMENT * torso.1);

    LandmarkSet::new()
        .with(LandmarkName::LeftShoulder, Landmark::new(shoulder.0, shoulder.1, VISIBLE))
        .with(LandmarkName::LeftHip, Landmark::new(hip.0, hip.1, VISIBLE))
        .with(LandmarkName::LeftKnee, Landmark::new(knee.0, knee.1, VISIBLE))
        .with(LandmarkName::LeftAnkle, Landmark::new(ankle.0, ankle.1, VISIBLE))
}

/// Front-facing standing pose with the nose at normalized height `nose_y`.
///
/// Legs are straight and both hands rest well away from the face.
pub fn jump_pose(nose_y: f64) -> LandmarkSet {
    let mut set = LandmarkSet::new()
        .with(LandmarkName::Nose, Landmark::new(0.5, nose_y, VISIBLE))
        .with(LandmarkName::LeftIndex, Landmark::new(0.2, nose_y + 0.3, VISIBLE))
        .with(LandmarkName::RightIndex, Landmark::new(0.8, nose_y + 0.3, VISIBLE));

    for (hip, knee, ankle, x) in [
        (LandmarkName::LeftHip, LandmarkName::LeftKnee, LandmarkName::LeftAnkle, 0.45),
        (LandmarkName::RightHip, LandmarkName::RightKnee, LandmarkName::RightAnkle, 0.55),
    ] {
        set.set(hip, Landmark::new(x, nose_y + 0.35, VISIBLE));
        set.set(knee, Landmark::new(x, nose_y + 0.55, VISIBLE));
        set.set(ankle, Landmark::new(x, nose_y + 0.75, VISIBLE));
    }
    set
}

/// Knees pushed forward and hips dropped: a squat-and-stand posture
pub fn crouched_jump_pose(nose_y: f64) -> LandmarkSet {
    let mut set = jump_pose(nose_y);
    for (hip, knee, ankle, x) in [
        (LandmarkName::LeftHip, LandmarkName::LeftKnee, LandmarkName::LeftAnkle, 0.45),
        (LandmarkName::RightHip, LandmarkName::RightKnee, LandmarkName::RightAnkle, 0.55),
    ] {
        set.set(hip, Landmark::new(x, nose_y + 0.35, VISIBLE));
        set.set(knee, Landmark::new(x + 0.1, nose_y + 0.45, VISIBLE));
        set.set(ankle, Landmark::new(x, nose_y + 0.55, VISIBLE));
    }
    set
}

/// Move one hand onto the nose
pub fn with_hand_at_nose(mut set: LandmarkSet, hand: LandmarkName) -> LandmarkSet {
    let nose = *set.get(LandmarkName::Nose);
    set.set(hand, Landmark::new(nose.x + 0.01, nose.y + 0.01, VISIBLE));
    set
}

/// One slow squat rep followed by a few frames out of view.
///
/// Loops cleanly: it starts and ends standing.
pub fn demo_squat_cycle() -> Vec<Option<LandmarkSet>> {
    let mut script = Vec::new();
    for (knee, back, frames) in [
        (170.0, 35.0, 15),
        (140.0, 35.0, 10),
        (85.0, 40.0, 20),
        (140.0, 35.0, 10),
        (170.0, 35.0, 15),
    ] {
        script.extend(std::iter::repeat_with(|| Some(squat_pose(knee, back))).take(frames));
    }
    script.extend(std::iter::repeat(None).take(5));
    script
}
