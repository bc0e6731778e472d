use super::{Classifier, ModeId, Observation, Overlay, OverlayAccent, BODY_NOT_VISIBLE};
use crate::config::JumpConfig;
use crate::pose::{distance, joint_angle, LandmarkName, LandmarkSet};
use crate::smoothing::{SlidingWindow, DEFAULT_WINDOW_CAPACITY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Smoothed nose height within this many pixels of baseline counts as steady
const STEADY_TOLERANCE_PX: f64 = 4.0;
/// Consecutive steady frames required before a takeoff is accepted
const STEADY_FRAMES_REQUIRED: u32 = 5;
const TAKEOFF_MIN_PX: f64 = 8.0;
const TAKEOFF_HEIGHT_FRACTION: f64 = 0.015;
const LANDING_MIN_PX: f64 = 5.0;
const LANDING_HEIGHT_FRACTION: f64 = 0.01;
const BASELINE_DRIFT_WEIGHT: f64 = 0.1;

const CHEAT_KNEE_ANGLE: f64 = 150.0;
const CHEAT_HIP_MARGIN_PX: f64 = 20.0;
const CHEAT_ANKLE_OFFSET_PX: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpPhase {
    Idle,
    Armed,
    Airborne,
    Landed,
}

impl fmt::Display for JumpPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JumpPhase::Idle => "IDLE",
            JumpPhase::Armed => "ARMED",
            JumpPhase::Airborne => "AIRBORNE",
            JumpPhase::Landed => "LANDED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JumpReason {
    TooSmall,
    Cheat,
    Ok,
}

impl fmt::Display for JumpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JumpReason::TooSmall => "too-small",
            JumpReason::Cheat => "cheat",
            JumpReason::Ok => "ok",
        };
        f.write_str(label)
    }
}

/// Outcome of one measured jump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpResult {
    pub inches: f64,
    pub valid: bool,
    pub reason: JumpReason,
    pub recorded_at: DateTime<Utc>,
}

impl JumpResult {
    pub fn summary(&self) -> String {
        format!(
            "{} {:.1} in ({})",
            if self.valid { "VALID" } else { "BAD" },
            self.inches,
            self.reason
        )
    }
}

/// Point-in-time copy of the jump state machine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpSnapshot {
    pub phase: JumpPhase,
    pub baseline_y: Option<f64>,
    pub peak_delta: f64,
    pub airborne_frames: u32,
    pub steady_frames: u32,
    pub valid_jumps: u32,
    pub best_inches: f64,
    pub last_result: Option<JumpResult>,
    pub smoothed_samples: usize,
    pub feedback: Option<String>,
}

/// Vertical jump measurement driven by the smoothed nose height.
///
/// Tapping the right index finger to the nose arms a measurement and fixes a
/// baseline; the left index finger to the nose discards it. Takeoff needs a
/// steady stance followed by fast upward motion, landing needs a return near
/// baseline with fast downward motion after a minimum number of airborne
/// frames. All geometry is in pixels of the analysed frame.
#[derive(Debug, Clone)]
pub struct JumpClassifier {
    config: JumpConfig,
    phase: JumpPhase,
    baseline_y: Option<f64>,
    peak_delta: f64,
    prev_dy: Option<f64>,
    airborne_frames: u32,
    steady_frames: u32,
    settled: bool,
    nose_window: SlidingWindow,
    last_seen: Option<Instant>,
    dy: f64,
    velocity: f64,
    valid_jumps: u32,
    best_inches: f64,
    last_result: Option<JumpResult>,
    feedback: Option<String>,
}

impl JumpClassifier {
    pub fn new(config: JumpConfig) -> Self {
        let window = config.smoothing_window.max(DEFAULT_WINDOW_CAPACITY);
        Self {
            config,
            phase: JumpPhase::Idle,
            baseline_y: None,
            peak_delta: 0.0,
            prev_dy: None,
            airborne_frames: 0,
            steady_frames: 0,
            settled: false,
            nose_window: SlidingWindow::new(window),
            last_seen: None,
            dy: 0.0,
            velocity: 0.0,
            valid_jumps: 0,
            best_inches: 0.0,
            last_result: None,
            feedback: None,
        }
    }

    /// Feed one frame of landmarks captured at `at`
    pub fn observe_landmarks(
        &mut self,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
        at: Instant,
    ) -> Option<String> {
        let dt = self.advance_clock(at);
        let threshold = self.config.visibility_threshold;
        let pixel = |name| {
            landmarks
                .visible_at_least(name, threshold)
                .map(|lm| lm.to_pixel(width, height))
        };
        let nose = pixel(LandmarkName::Nose);
        let reach = self.config.gesture_distance_px;
        let arm_gesture = hand_near(pixel(LandmarkName::RightIndex), nose, reach);
        let reset_gesture = hand_near(pixel(LandmarkName::LeftIndex), nose, reach);

        if self.phase == JumpPhase::Idle && arm_gesture {
            if let Some((_, nose_y)) = nose {
                self.arm(nose_y);
            }
        }

        if matches!(self.phase, JumpPhase::Armed | JumpPhase::Landed) && reset_gesture {
            info!("Jump measurement cleared by reset gesture");
            self.clear_measurement();
            self.last_result = None;
        }

        if let (Some((_, nose_y)), Some(baseline)) = (nose, self.baseline_y) {
            self.track(nose_y, baseline, dt, landmarks, width, height);
        }

        self.feedback = Some(match nose {
            Some(_) => self.phase_feedback(),
            None => BODY_NOT_VISIBLE.to_string(),
        });
        self.feedback.clone()
    }

    fn advance_clock(&mut self, at: Instant) -> f64 {
        let dt = self
            .last_seen
            .map(|prev| at.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_seen = Some(at);
        dt
    }

    fn arm(&mut self, nose_y: f64) {
        self.clear_measurement();
        self.phase = JumpPhase::Armed;
        self.nose_window.push(nose_y);
        self.baseline_y = Some(self.nose_window.mean());
        info!("Jump armed with baseline {:.1}px", nose_y);
    }

    fn clear_measurement(&mut self) {
        self.phase = JumpPhase::Idle;
        self.baseline_y = None;
        self.peak_delta = 0.0;
        self.prev_dy = None;
        self.airborne_frames = 0;
        self.steady_frames = 0;
        self.settled = false;
        self.dy = 0.0;
        self.velocity = 0.0;
        self.nose_window.clear();
    }

    fn track(
        &mut self,
        nose_y: f64,
        baseline: f64,
        dt: f64,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) {
        self.nose_window.push(nose_y);
        let smoothed = self.nose_window.mean();

        // Readiness is judged on the stance before this frame moved
        let was_steady = self.steady_frames >= STEADY_FRAMES_REQUIRED;
        if (smoothed - baseline).abs() < STEADY_TOLERANCE_PX {
            self.steady_frames += 1;
            if self.steady_frames >= STEADY_FRAMES_REQUIRED {
                self.settled = true;
            }
        } else {
            self.steady_frames = 0;
        }

        let dy = baseline - smoothed;
        let velocity = match self.prev_dy {
            Some(prev) if dt > 0.0 => (dy - prev) / dt,
            _ => 0.0,
        };
        self.prev_dy = Some(dy);
        self.dy = dy;
        self.velocity = velocity;
        self.peak_delta = self.peak_delta.max(dy);

        let frame_height = height as f64;
        let takeoff_dy = TAKEOFF_MIN_PX.max(TAKEOFF_HEIGHT_FRACTION * frame_height);
        let landing_dy = LANDING_MIN_PX.max(LANDING_HEIGHT_FRACTION * frame_height);

        match self.phase {
            JumpPhase::Armed
                if was_steady
                    && dy > takeoff_dy
                    && velocity > self.config.vel_up_fraction * frame_height =>
            {
                self.phase = JumpPhase::Airborne;
                self.airborne_frames = 0;
                debug!("Takeoff detected: dy {:.1}px, velocity {:.1}px/s", dy, velocity);
            }
            JumpPhase::Airborne => {
                self.airborne_frames += 1;
                if dy < landing_dy
                    && velocity < -self.config.vel_down_fraction * frame_height
                    && self.airborne_frames >= self.config.min_airborne_frames
                {
                    self.phase = JumpPhase::Landed;
                    self.steady_frames = 0;
                    self.finalize(landmarks, width, height);
                }
            }
            _ => {}
        }

        if self.phase != JumpPhase::Airborne && self.settled && dy < takeoff_dy {
            self.baseline_y =
                Some(baseline * (1.0 - BASELINE_DRIFT_WEIGHT) + smoothed * BASELINE_DRIFT_WEIGHT);
        }
    }

    fn finalize(&mut self, landmarks: &LandmarkSet, width: u32, height: u32) {
        let inches = self.peak_delta.max(0.0) * self.config.inches_per_pixel();
        let (valid, reason) = if inches < self.config.min_jump_inches {
            (false, JumpReason::TooSmall)
        } else if landed_in_squat(landmarks, width, height, self.config.visibility_threshold) {
            (false, JumpReason::Cheat)
        } else {
            (true, JumpReason::Ok)
        };

        if valid {
            self.valid_jumps += 1;
            self.best_inches = self.best_inches.max(inches);
        }

        let result = JumpResult {
            inches,
            valid,
            reason,
            recorded_at: Utc::now(),
        };
        info!(
            "Jump landed: {} (peak {:.1}px, {} airborne frames)",
            result.summary(),
            self.peak_delta,
            self.airborne_frames
        );
        self.last_result = Some(result);
    }

    fn phase_feedback(&self) -> String {
        match self.phase {
            JumpPhase::Idle => "Tap RIGHT hand to nose to arm".to_string(),
            JumpPhase::Armed => "Armed: ready to measure".to_string(),
            JumpPhase::Airborne => "Airborne".to_string(),
            JumpPhase::Landed => match &self.last_result {
                Some(result) => format!("Last: {}", result.summary()),
                None => "Tap RIGHT hand to nose to arm".to_string(),
            },
        }
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    pub fn last_result(&self) -> Option<&JumpResult> {
        self.last_result.as_ref()
    }

    pub fn valid_jumps(&self) -> u32 {
        self.valid_jumps
    }

    pub fn best_inches(&self) -> f64 {
        self.best_inches
    }

    pub fn snapshot(&self) -> JumpSnapshot {
        JumpSnapshot {
            phase: self.phase,
            baseline_y: self.baseline_y,
            peak_delta: self.peak_delta,
            airborne_frames: self.airborne_frames,
            steady_frames: self.steady_frames,
            valid_jumps: self.valid_jumps,
            best_inches: self.best_inches,
            last_result: self.last_result.clone(),
            smoothed_samples: self.nose_window.len(),
            feedback: self.feedback.clone(),
        }
    }
}

fn hand_near(hand: Option<(f64, f64)>, nose: Option<(f64, f64)>, max_distance: f64) -> bool {
    match (hand, nose) {
        (Some(hand), Some(nose)) => distance(hand, nose) < max_distance,
        _ => false,
    }
}

/// Whether the landing pose is a deep squat rather than an upright stance.
///
/// Requires both legs visible. Bent knees alone are not enough: the hips
/// must also sit near knee height or directly above the ankles.
fn landed_in_squat(landmarks: &LandmarkSet, width: u32, height: u32, threshold: f64) -> bool {
    let pixel = |name| {
        landmarks
            .visible_at_least(name, threshold)
            .map(|lm| lm.to_pixel(width, height))
    };
    let joints = (
        pixel(LandmarkName::LeftHip),
        pixel(LandmarkName::RightHip),
        pixel(LandmarkName::LeftKnee),
        pixel(LandmarkName::RightKnee),
        pixel(LandmarkName::LeftAnkle),
        pixel(LandmarkName::RightAnkle),
    );
    let (Some(l_hip), Some(r_hip), Some(l_knee), Some(r_knee), Some(l_ankle), Some(r_ankle)) =
        joints
    else {
        return false;
    };

    let knee_angle =
        (joint_angle(l_hip, l_knee, l_ankle) + joint_angle(r_hip, r_knee, r_ankle)) / 2.0;
    let hip_y = (l_hip.1 + r_hip.1) / 2.0;
    let knee_y = (l_knee.1 + r_knee.1) / 2.0;
    let hip_x = (l_hip.0 + r_hip.0) / 2.0;
    let ankle_x = (l_ankle.0 + r_ankle.0) / 2.0;

    let knees_bent = knee_angle < CHEAT_KNEE_ANGLE;
    let hips_low = hip_y > knee_y - CHEAT_HIP_MARGIN_PX;
    let hips_over_ankles = (ankle_x - hip_x).abs() < CHEAT_ANKLE_OFFSET_PX;

    knees_bent && (hips_low || hips_over_ankles)
}

impl Classifier for JumpClassifier {
    fn mode(&self) -> ModeId {
        ModeId::Jump
    }

    fn observe(&mut self, observation: &Observation) -> Option<String> {
        match &observation.landmarks {
            Some(landmarks) => self.observe_landmarks(
                landmarks,
                observation.width,
                observation.height,
                observation.at,
            ),
            None => {
                self.advance_clock(observation.at);
                self.feedback = Some(BODY_NOT_VISIBLE.to_string());
                self.feedback.clone()
            }
        }
    }

    fn reset(&mut self) {
        info!(
            "Resetting jump classifier ({} valid jumps, best {:.1} in)",
            self.valid_jumps, self.best_inches
        );
        *self = Self::new(self.config.clone());
    }

    fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    fn overlay(&self) -> Overlay {
        let mut status = vec![format!("STATE: {}", self.phase)];
        if let Some(result) = &self.last_result {
            status.push(format!("Last: {}", result.summary()));
        }
        status.push(format!(
            "dy(px): {:.1}  vel(px/s): {:.1}",
            self.dy, self.velocity
        ));
        status.push("RIGHT hand to nose: arm  LEFT hand to nose: reset".to_string());

        let accent = match &self.last_result {
            Some(result) if result.valid => OverlayAccent::Good,
            Some(_) => OverlayAccent::Bad,
            None => OverlayAccent::Neutral,
        };

        Overlay {
            counters: vec![
                ("JUMPS".to_string(), self.valid_jumps.to_string()),
                ("BEST".to_string(), format!("{:.1} in", self.best_inches)),
            ],
            status,
            feedback: self.feedback.clone(),
            accent,
        }
    }
}
