use super::*;
use crate::config::{JumpConfig, SquatConfig};
use crate::pose::synthetic::{crouched_jump_pose, jump_pose, squat_pose, with_hand_at_nose};
use crate::pose::{Landmark, LandmarkName};
use std::time::Duration;

const BACK_OK: f64 = 40.0;
const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

fn unsmoothed_squat() -> SquatClassifier {
    SquatClassifier::new(SquatConfig {
        smoothing_window: 1,
        ..SquatConfig::default()
    })
}

fn feed_knee_trace(classifier: &mut SquatClassifier, trace: &[f64]) -> Vec<Option<Stage>> {
    trace
        .iter()
        .map(|&knee| {
            classifier.observe_landmarks(&squat_pose(knee, BACK_OK));
            classifier.stage()
        })
        .collect()
}

struct JumpDriver {
    classifier: JumpClassifier,
    start: Instant,
    frame: u32,
}

impl JumpDriver {
    fn new(config: JumpConfig) -> Self {
        Self {
            classifier: JumpClassifier::new(config),
            start: Instant::now(),
            frame: 0,
        }
    }

    fn feed(&mut self, landmarks: LandmarkSet) -> Option<String> {
        let at = self.start + Duration::from_millis(33) * self.frame;
        self.frame += 1;
        self.classifier
            .observe(&Observation::new(Some(landmarks), FRAME_WIDTH, FRAME_HEIGHT, at))
    }

    /// Arm, stand still, rise 0.1 of the frame height and come back down
    fn jump(&mut self, landing: LandmarkSet) {
        self.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::RightIndex));
        for _ in 0..4 {
            self.feed(jump_pose(0.3));
        }
        for _ in 0..5 {
            self.feed(jump_pose(0.2));
        }
        for _ in 0..4 {
            self.feed(jump_pose(0.3));
        }
        self.feed(landing);
    }
}

#[test]
fn test_mode_id_parsing() {
    assert_eq!("squat".parse::<ModeId>().unwrap(), ModeId::Squat);
    assert_eq!(" Jump ".parse::<ModeId>().unwrap(), ModeId::Jump);
    assert_eq!(ModeId::Jump.to_string(), "jump");

    match "plank".parse::<ModeId>() {
        Err(FitcamError::UnknownMode(name)) => assert_eq!(name, "plank"),
        other => panic!("Expected unknown mode error, got {:?}", other),
    }
}

#[test]
fn test_mode_classifier_dispatch() {
    let config = FitcamConfig::default();
    for mode in ModeId::ALL {
        let classifier = ModeClassifier::new(mode, &config);
        assert_eq!(classifier.mode(), mode);
        assert!(classifier.feedback().is_none());
    }

    let squat = ModeClassifier::new(ModeId::Squat, &config);
    assert!(squat.as_squat().is_some());
    assert!(squat.as_jump().is_none());
}

#[test]
fn test_squat_reference_trace() {
    let mut classifier = unsmoothed_squat();
    let trace = [170.0, 170.0, 140.0, 100.0, 90.0, 90.0, 90.0, 110.0, 150.0, 170.0];

    let mut hold_before_recovery = 0;
    let mut stages = Vec::new();
    for (i, &knee) in trace.iter().enumerate() {
        if i == 7 {
            hold_before_recovery = classifier.snapshot().depth_hold;
        }
        classifier.observe_landmarks(&squat_pose(knee, BACK_OK));
        stages.push(classifier.stage().unwrap());
    }

    use Stage::*;
    assert_eq!(stages, vec![S1, S1, S2, S2, S3, S3, S3, S2, S2, S1]);
    assert!(hold_before_recovery >= 3);
    assert_eq!(classifier.correct_count(), 1);
    assert_eq!(classifier.incorrect_count(), 0);
}

#[test]
fn test_squat_smoothed_rep_counts_once() {
    let mut classifier = SquatClassifier::new(SquatConfig::default());
    let mut trace = Vec::new();
    trace.extend([170.0; 5]);
    trace.extend([140.0; 5]);
    trace.extend([90.0; 8]);
    trace.extend([170.0; 8]);

    feed_knee_trace(&mut classifier, &trace);

    assert_eq!(classifier.correct_count(), 1);
    assert_eq!(classifier.incorrect_count(), 0);
    assert_eq!(classifier.stage(), Some(Stage::S1));
}

#[test]
fn test_squat_incomplete_rep() {
    let mut classifier = unsmoothed_squat();
    feed_knee_trace(&mut classifier, &[170.0, 140.0]);
    let feedback = classifier.observe_landmarks(&squat_pose(170.0, BACK_OK));

    assert_eq!(feedback.as_deref(), Some("Incomplete Squat"));
    assert_eq!(classifier.incorrect_count(), 1);
    assert!(classifier.snapshot().sequence.is_empty());
}

#[test]
fn test_squat_short_hold_is_incorrect() {
    let mut classifier = unsmoothed_squat();
    feed_knee_trace(&mut classifier, &[170.0, 140.0, 90.0, 140.0]);
    assert_eq!(classifier.correct_count(), 0);

    let feedback = classifier.observe_landmarks(&squat_pose(170.0, BACK_OK));
    assert_eq!(feedback.as_deref(), Some("Hold at bottom longer"));
    assert_eq!(classifier.incorrect_count(), 1);
    assert_eq!(classifier.snapshot().depth_hold, 0);
}

#[test]
fn test_squat_hold_survives_depth_wobble() {
    let mut classifier = unsmoothed_squat();
    feed_knee_trace(&mut classifier, &[170.0, 140.0, 90.0, 90.0, 100.0, 90.0]);

    let snapshot = classifier.snapshot();
    assert_eq!(snapshot.depth_hold, 3);
    assert_eq!(classifier.correct_count(), 0);
}

#[test]
fn test_squat_form_feedback() {
    let mut classifier = unsmoothed_squat();
    assert_eq!(
        classifier.observe_landmarks(&squat_pose(170.0, 10.0)).as_deref(),
        Some("Bend forward")
    );
    assert_eq!(
        classifier.observe_landmarks(&squat_pose(170.0, 70.0)).as_deref(),
        Some("Bend backwards")
    );
    assert_eq!(
        classifier.observe_landmarks(&squat_pose(140.0, BACK_OK)).as_deref(),
        Some("Lower your hips")
    );
    assert_eq!(
        classifier.observe_landmarks(&squat_pose(90.0, BACK_OK)).as_deref(),
        Some("Raise deeper")
    );
    assert_eq!(
        classifier.observe_landmarks(&squat_pose(45.0, BACK_OK)).as_deref(),
        Some("Squat too deep")
    );
}

#[test]
fn test_knees_over_toes_wins() {
    let mut classifier = unsmoothed_squat();
    let mut pose = squat_pose(170.0, 10.0);
    let knee = *pose.get(LandmarkName::LeftKnee);
    let ankle = *pose.get(LandmarkName::LeftAnkle);
    pose.set(
        LandmarkName::LeftAnkle,
        Landmark::new(knee.x + 0.05, ankle.y, ankle.visibility),
    );

    assert_eq!(
        classifier.observe_landmarks(&pose).as_deref(),
        Some("Knees over toes")
    );
}

#[test]
fn test_squat_low_visibility_skips_frame() {
    let mut classifier = unsmoothed_squat();
    feed_knee_trace(&mut classifier, &[170.0, 140.0]);
    let before = classifier.snapshot();

    let mut pose = squat_pose(90.0, BACK_OK);
    let knee = *pose.get(LandmarkName::LeftKnee);
    pose.set(LandmarkName::LeftKnee, Landmark::new(knee.x, knee.y, 0.8));

    let feedback = classifier.observe_landmarks(&pose);
    assert_eq!(feedback.as_deref(), Some(BODY_NOT_VISIBLE));

    let after = classifier.snapshot();
    assert_eq!(after.sequence, before.sequence);
    assert_eq!(after.depth_hold, before.depth_hold);
    assert_eq!(after.smoothed_samples, before.smoothed_samples);
}

#[test]
fn test_squat_without_person() {
    let mut classifier = SquatClassifier::new(SquatConfig::default());
    let feedback = classifier.observe(&Observation::new(None, 640, 480, Instant::now()));

    assert_eq!(feedback.as_deref(), Some(BODY_NOT_VISIBLE));
    assert_eq!(classifier.stage(), None);
}

#[test]
fn test_squat_reset_restores_initial_state() {
    let fresh = SquatClassifier::new(SquatConfig::default()).snapshot();
    let mut classifier = SquatClassifier::new(SquatConfig::default());
    feed_knee_trace(&mut classifier, &[170.0, 140.0, 90.0, 90.0, 90.0, 90.0, 170.0, 170.0]);
    assert_ne!(classifier.snapshot(), fresh);

    classifier.reset();
    assert_eq!(classifier.snapshot(), fresh);
}

#[test]
fn test_squat_overlay_counters() {
    let mut classifier = unsmoothed_squat();
    feed_knee_trace(&mut classifier, &[170.0, 140.0, 170.0]);

    let overlay = classifier.overlay();
    assert!(overlay
        .counters
        .contains(&("INCORRECT".to_string(), "1".to_string())));
    assert!(overlay.counters.contains(&("STAGE".to_string(), "S1".to_string())));
    assert_eq!(overlay.feedback.as_deref(), Some("Incomplete Squat"));
}

#[test]
fn test_jump_idle_until_armed() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    let feedback = driver.feed(jump_pose(0.3));

    assert_eq!(feedback.as_deref(), Some("Tap RIGHT hand to nose to arm"));
    assert_eq!(driver.classifier.phase(), JumpPhase::Idle);
    assert_eq!(driver.classifier.snapshot().baseline_y, None);
}

#[test]
fn test_jump_arm_gesture() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    let feedback = driver.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::RightIndex));

    assert_eq!(feedback.as_deref(), Some("Armed: ready to measure"));
    let snapshot = driver.classifier.snapshot();
    assert_eq!(snapshot.phase, JumpPhase::Armed);
    assert!((snapshot.baseline_y.unwrap() - 144.0).abs() < 1e-6);
}

#[test]
fn test_valid_jump_measured() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.jump(jump_pose(0.3));

    assert_eq!(driver.classifier.phase(), JumpPhase::Landed);
    let result = driver.classifier.last_result().cloned().unwrap();
    assert!(result.valid);
    assert_eq!(result.reason, JumpReason::Ok);
    // 48px peak at 0.12 in/px
    assert!((result.inches - 5.76).abs() < 1e-6);
    assert_eq!(driver.classifier.valid_jumps(), 1);
    assert!((driver.classifier.best_inches() - 5.76).abs() < 1e-6);
    assert_eq!(
        driver.classifier.feedback(),
        Some("Last: VALID 5.8 in (ok)")
    );
}

#[test]
fn test_jump_below_minimum_is_too_small() {
    let mut driver = JumpDriver::new(JumpConfig {
        min_jump_inches: 10.0,
        ..JumpConfig::default()
    });
    driver.jump(jump_pose(0.3));

    let result = driver.classifier.last_result().unwrap();
    assert!(!result.valid);
    assert_eq!(result.reason, JumpReason::TooSmall);
    assert_eq!(driver.classifier.valid_jumps(), 0);
}

#[test]
fn test_squat_landing_is_cheat() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.jump(crouched_jump_pose(0.3));

    let result = driver.classifier.last_result().unwrap();
    assert!(!result.valid);
    assert_eq!(result.reason, JumpReason::Cheat);
    assert_eq!(driver.classifier.valid_jumps(), 0);
    assert_eq!(driver.classifier.overlay().accent, OverlayAccent::Bad);
}

#[test]
fn test_no_takeoff_without_steady_stance() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::RightIndex));
    for _ in 0..5 {
        driver.feed(jump_pose(0.2));
    }

    assert_eq!(driver.classifier.phase(), JumpPhase::Armed);
    assert!(driver.classifier.last_result().is_none());
}

#[test]
fn test_baseline_drifts_while_standing() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::RightIndex));
    for _ in 0..4 {
        driver.feed(jump_pose(0.3));
    }
    let settled = driver.classifier.snapshot();
    assert_eq!(settled.steady_frames, 5);
    assert!((settled.baseline_y.unwrap() - 144.0).abs() < 1e-6);

    // 2px lower: the smoothed nose sits at 144.4px
    driver.feed(jump_pose(0.3 + 2.0 / FRAME_HEIGHT as f64));

    let snapshot = driver.classifier.snapshot();
    assert_eq!(snapshot.phase, JumpPhase::Armed);
    assert!((snapshot.baseline_y.unwrap() - 144.04).abs() < 1e-6);
}

#[test]
fn test_baseline_frozen_while_airborne() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::RightIndex));
    for _ in 0..4 {
        driver.feed(jump_pose(0.3));
    }
    let before = driver.classifier.snapshot().baseline_y;

    for _ in 0..5 {
        driver.feed(jump_pose(0.2));
        let snapshot = driver.classifier.snapshot();
        assert_eq!(snapshot.phase, JumpPhase::Airborne);
        assert_eq!(snapshot.baseline_y, before);
    }
}

#[test]
fn test_baseline_holds_until_stance_is_steady() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::RightIndex));
    let armed = driver.classifier.snapshot().baseline_y;

    // 30px lower, well inside the takeoff threshold but not steady
    driver.feed(jump_pose(0.3 + 30.0 / FRAME_HEIGHT as f64));

    let snapshot = driver.classifier.snapshot();
    assert_eq!(snapshot.phase, JumpPhase::Armed);
    assert_eq!(snapshot.steady_frames, 0);
    assert_eq!(snapshot.baseline_y, armed);
}

#[test]
fn test_short_flight_does_not_land() {
    let mut driver = JumpDriver::new(JumpConfig {
        min_airborne_frames: 50,
        ..JumpConfig::default()
    });
    driver.jump(jump_pose(0.3));

    assert_eq!(driver.classifier.phase(), JumpPhase::Airborne);
    assert!(driver.classifier.last_result().is_none());
}

#[test]
fn test_reset_gesture_clears_result() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.jump(jump_pose(0.3));
    assert!(driver.classifier.last_result().is_some());

    let feedback = driver.feed(with_hand_at_nose(jump_pose(0.3), LandmarkName::LeftIndex));

    assert_eq!(feedback.as_deref(), Some("Tap RIGHT hand to nose to arm"));
    assert_eq!(driver.classifier.phase(), JumpPhase::Idle);
    assert!(driver.classifier.last_result().is_none());
    // Lifetime totals survive a gesture reset
    assert_eq!(driver.classifier.valid_jumps(), 1);
}

#[test]
fn test_jump_missing_nose() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    let mut pose = jump_pose(0.3);
    pose.set(LandmarkName::Nose, Landmark::new(0.5, 0.3, 0.1));

    assert_eq!(driver.feed(pose).as_deref(), Some(BODY_NOT_VISIBLE));
    assert_eq!(driver.classifier.phase(), JumpPhase::Idle);
}

#[test]
fn test_jump_reset_restores_initial_state() {
    let fresh = JumpClassifier::new(JumpConfig::default()).snapshot();
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.jump(jump_pose(0.3));

    driver.classifier.reset();
    assert_eq!(driver.classifier.snapshot(), fresh);
}

#[test]
fn test_jump_result_serializes_reason() {
    let mut driver = JumpDriver::new(JumpConfig::default());
    driver.jump(jump_pose(0.3));

    let json = serde_json::to_value(driver.classifier.last_result().unwrap()).unwrap();
    assert_eq!(json["reason"], "ok");
    assert_eq!(json["valid"], true);
}
