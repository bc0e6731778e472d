use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FitcamConfig {
    pub camera: CameraConfig,
    pub squat: SquatConfig,
    pub jump: JumpConfig,
    pub speech: SpeechConfig,
    pub arbiter: ArbiterConfig,
    pub overlay: OverlayConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Video format (MJPG, YUYV, etc.)
    #[serde(default = "default_camera_format")]
    pub format: String,
}

/// Thresholds for the squat stage machine
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SquatConfig {
    /// Minimum landmark visibility (exclusive)
    #[serde(default = "default_squat_visibility")]
    pub visibility_threshold: f64,

    /// Knee angle above which the subject is standing (S1)
    #[serde(default = "default_standing_angle")]
    pub standing_angle: f64,

    /// Knee angle at or below which the subject is at depth (S3)
    #[serde(default = "default_bottom_angle")]
    pub bottom_angle: f64,

    /// Frames that must be spent at depth for a rep to count
    #[serde(default = "default_depth_hold_frames")]
    pub depth_hold_frames: u32,

    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

/// Thresholds and calibration for the vertical jump machine
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JumpConfig {
    /// Minimum landmark visibility (inclusive)
    #[serde(default = "default_jump_visibility")]
    pub visibility_threshold: f64,

    /// Hand-to-nose distance that counts as a gesture, in pixels
    #[serde(default = "default_gesture_distance")]
    pub gesture_distance_px: f64,

    /// Real-world length of the calibration reference, in inches
    #[serde(default = "default_calibration_inches")]
    pub calibration_inches: f64,

    /// Pixel length of the calibration reference
    #[serde(default = "default_calibration_pixels")]
    pub calibration_pixels: f64,

    #[serde(default = "default_min_jump_inches")]
    pub min_jump_inches: f64,

    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Debounce floor between takeoff and landing
    #[serde(default = "default_min_airborne_frames")]
    pub min_airborne_frames: u32,

    /// Takeoff velocity threshold as a fraction of frame height per second
    #[serde(default = "default_vel_fraction")]
    pub vel_up_fraction: f64,

    /// Landing velocity threshold as a fraction of frame height per second
    #[serde(default = "default_vel_fraction")]
    pub vel_down_fraction: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpeechConfig {
    /// Speak feedback from the camera-streaming classifiers
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,

    /// External text-to-speech program; feedback is only logged when unset
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default = "default_speech_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_speech_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArbiterConfig {
    /// How long to wait for a capture loop to exit before abandoning it
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Backoff after an empty read
    #[serde(default = "default_read_retry_ms")]
    pub read_retry_ms: u64,

    /// Consecutive empty reads after which the source counts as failed
    #[serde(default = "default_max_consecutive_misses")]
    pub max_consecutive_misses: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    /// Path to TrueType font file for the counter overlay
    #[serde(default = "default_font_path")]
    pub font_path: String,

    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// IP address to bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_stream_port")]
    pub port: u16,

    /// Pacing of the MJPEG feeds
    #[serde(default = "default_stream_target_fps")]
    pub target_fps: u32,
}

impl JumpConfig {
    /// Inches represented by one pixel of vertical displacement
    pub fn inches_per_pixel(&self) -> f64 {
        if self.calibration_pixels > 0.0 {
            self.calibration_inches / self.calibration_pixels
        } else {
            0.12
        }
    }
}

impl FitcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("fitcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.format", default_camera_format())?
            .set_default("squat.visibility_threshold", default_squat_visibility())?
            .set_default("squat.standing_angle", default_standing_angle())?
            .set_default("squat.bottom_angle", default_bottom_angle())?
            .set_default("squat.depth_hold_frames", default_depth_hold_frames())?
            .set_default("squat.smoothing_window", default_smoothing_window() as i64)?
            .set_default("jump.visibility_threshold", default_jump_visibility())?
            .set_default("jump.gesture_distance_px", default_gesture_distance())?
            .set_default("jump.calibration_inches", default_calibration_inches())?
            .set_default("jump.calibration_pixels", default_calibration_pixels())?
            .set_default("jump.min_jump_inches", default_min_jump_inches())?
            .set_default("jump.smoothing_window", default_smoothing_window() as i64)?
            .set_default("jump.min_airborne_frames", default_min_airborne_frames())?
            .set_default("jump.vel_up_fraction", default_vel_fraction())?
            .set_default("jump.vel_down_fraction", default_vel_fraction())?
            .set_default("speech.enabled", default_speech_enabled())?
            .set_default(
                "speech.queue_capacity",
                default_speech_queue_capacity() as i64,
            )?
            .set_default(
                "speech.shutdown_timeout_ms",
                default_speech_shutdown_timeout_ms(),
            )?
            .set_default("arbiter.stop_timeout_ms", default_stop_timeout_ms())?
            .set_default("arbiter.read_retry_ms", default_read_retry_ms())?
            .set_default(
                "arbiter.max_consecutive_misses",
                default_max_consecutive_misses(),
            )?
            .set_default("overlay.font_path", default_font_path())?
            .set_default("overlay.font_size", default_font_size() as f64)?
            .set_default("stream.ip", default_stream_ip())?
            .set_default("stream.port", default_stream_port())?
            .set_default("stream.target_fps", default_stream_target_fps())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // FITCAM_JUMP__CALIBRATION_PIXELS=120 and friends
            .add_source(Environment::with_prefix("FITCAM").separator("__"))
            .build()?;

        let config: FitcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.squat.visibility_threshold)
            || !(0.0..=1.0).contains(&self.jump.visibility_threshold)
        {
            return Err(ConfigError::Message(
                "Visibility thresholds must be within [0, 1]".to_string(),
            ));
        }

        if self.squat.bottom_angle >= self.squat.standing_angle {
            return Err(ConfigError::Message(
                "Squat bottom_angle must be below standing_angle".to_string(),
            ));
        }

        if self.squat.smoothing_window == 0 || self.jump.smoothing_window == 0 {
            return Err(ConfigError::Message(
                "Smoothing windows must hold at least one sample".to_string(),
            ));
        }

        if self.jump.min_jump_inches < 0.0 {
            return Err(ConfigError::Message(
                "Jump min_jump_inches must not be negative".to_string(),
            ));
        }

        if self.speech.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Speech queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.stream.target_fps == 0 {
            return Err(ConfigError::Message(
                "Stream target_fps must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FitcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                format: default_camera_format(),
            },
            squat: SquatConfig::default(),
            jump: JumpConfig::default(),
            speech: SpeechConfig {
                enabled: default_speech_enabled(),
                command: None,
                queue_capacity: default_speech_queue_capacity(),
                shutdown_timeout_ms: default_speech_shutdown_timeout_ms(),
            },
            arbiter: ArbiterConfig::default(),
            overlay: OverlayConfig {
                font_path: default_font_path(),
                font_size: default_font_size(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                port: default_stream_port(),
                target_fps: default_stream_target_fps(),
            },
        }
    }
}

impl Default for SquatConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_squat_visibility(),
            standing_angle: default_standing_angle(),
            bottom_angle: default_bottom_angle(),
            depth_hold_frames: default_depth_hold_frames(),
            smoothing_window: default_smoothing_window(),
        }
    }
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_jump_visibility(),
            gesture_distance_px: default_gesture_distance(),
            calibration_inches: default_calibration_inches(),
            calibration_pixels: default_calibration_pixels(),
            min_jump_inches: default_min_jump_inches(),
            smoothing_window: default_smoothing_window(),
            min_airborne_frames: default_min_airborne_frames(),
            vel_up_fraction: default_vel_fraction(),
            vel_down_fraction: default_vel_fraction(),
        }
    }
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: default_stop_timeout_ms(),
            read_retry_ms: default_read_retry_ms(),
            max_consecutive_misses: default_max_consecutive_misses(),
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_format() -> String {
    "MJPG".to_string()
}

fn default_squat_visibility() -> f64 {
    0.8
}
fn default_standing_angle() -> f64 {
    160.0
}
fn default_bottom_angle() -> f64 {
    95.0
}
fn default_depth_hold_frames() -> u32 {
    3
}
fn default_smoothing_window() -> usize {
    5
}

fn default_jump_visibility() -> f64 {
    0.4
}
fn default_gesture_distance() -> f64 {
    60.0
}
fn default_calibration_inches() -> f64 {
    12.0
}
fn default_calibration_pixels() -> f64 {
    100.0
}
fn default_min_jump_inches() -> f64 {
    2.0
}
fn default_min_airborne_frames() -> u32 {
    6
}
fn default_vel_fraction() -> f64 {
    0.25
}

fn default_speech_enabled() -> bool {
    true
}
fn default_speech_queue_capacity() -> usize {
    32
}
fn default_speech_shutdown_timeout_ms() -> u64 {
    2000
}

fn default_stop_timeout_ms() -> u64 {
    2000
}
fn default_read_retry_ms() -> u64 {
    10
}
fn default_max_consecutive_misses() -> u32 {
    500
}

fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    28.0
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_stream_port() -> u16 {
    5000
}
fn default_stream_target_fps() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FitcamConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.squat.depth_hold_frames, 3);
        assert_eq!(config.jump.min_airborne_frames, 6);
        assert_eq!(config.stream.port, 5000);
    }

    #[test]
    fn test_inches_per_pixel_fallback() {
        let mut jump = JumpConfig::default();
        assert!((jump.inches_per_pixel() - 0.12).abs() < 1e-9);

        jump.calibration_inches = 24.0;
        jump.calibration_pixels = 300.0;
        assert!((jump.inches_per_pixel() - 0.08).abs() < 1e-9);

        jump.calibration_pixels = 0.0;
        assert!((jump.inches_per_pixel() - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FitcamConfig::default();
        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());

        config.camera.resolution = (640, 480);
        config.squat.bottom_angle = 170.0;
        assert!(config.validate().is_err());

        config.squat.bottom_angle = 95.0;
        config.jump.smoothing_window = 0;
        assert!(config.validate().is_err());

        config.jump.smoothing_window = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[jump]\ncalibration_pixels = 240.0\nmin_airborne_frames = 8\n\n[stream]\nport = 9090\n"
        )
        .unwrap();

        let config = FitcamConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.jump.calibration_pixels, 240.0);
        assert_eq!(config.jump.min_airborne_frames, 8);
        assert_eq!(config.stream.port, 9090);
        // Untouched sections keep their defaults
        assert_eq!(config.squat.standing_angle, 160.0);
        assert_eq!(config.camera.resolution, (640, 480));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = FitcamConfig::load_from_file("/nonexistent/fitcam-test.toml").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.speech.queue_capacity, 32);
    }
}
