use super::*;
use crate::classifier::{Classifier, ModeId, Overlay, BODY_NOT_VISIBLE};
use crate::config::{FitcamConfig, OverlayConfig};
use crate::error::AnalysisError;
use crate::frame::{FrameData, FrameFormat};
use crate::pose::synthetic::squat_pose;
use crate::pose::{EstimatorFactory, NoPoseEstimator, PoseEstimator, ScriptedPoseEstimator};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

fn create_test_frame(id: u64) -> FrameData {
    FrameData::new(id, SystemTime::now(), vec![128u8; 32 * 24 * 3], 32, 24, FrameFormat::Rgb24)
}

fn squat_factory(script: Vec<f64>) -> AnalyzerFactory {
    let estimators: EstimatorFactory = Arc::new(move || {
        let poses = script.iter().map(|&knee| Some(squat_pose(knee, 40.0))).collect();
        Box::new(ScriptedPoseEstimator::new(poses)) as Box<dyn PoseEstimator>
    });
    AnalyzerFactory::new(
        Arc::new(FitcamConfig::default()),
        estimators,
        Arc::new(PassthroughAnnotator),
    )
}

struct FailingAnnotator;

impl Annotator for FailingAnnotator {
    fn annotate(&self, _frame: &FrameData, _overlay: &Overlay) -> Result<FrameData, AnalysisError> {
        Err(AnalysisError::Annotation {
            details: "no canvas".to_string(),
        })
    }
}

#[test]
fn test_factory_builds_requested_mode() {
    let factory = squat_factory(vec![]);
    assert_eq!(factory.build(ModeId::Squat).mode(), ModeId::Squat);
    assert_eq!(factory.build(ModeId::Jump).mode(), ModeId::Jump);
}

#[test]
fn test_process_runs_classifier() {
    let factory = squat_factory(vec![170.0, 140.0]);
    let mut analyzer = factory.build(ModeId::Squat);

    let first = analyzer.process(&create_test_frame(0), Instant::now()).unwrap();
    assert_eq!(first.feedback, None);
    assert_eq!(first.frame.id, 0);

    let second = analyzer.process(&create_test_frame(1), Instant::now()).unwrap();
    assert!(second.feedback.is_some());
    assert_eq!(analyzer.frames_processed(), 2);
    assert!(analyzer.classifier().as_squat().unwrap().stage().is_some());

    // Script exhausted: no person in frame
    let third = analyzer.process(&create_test_frame(2), Instant::now()).unwrap();
    assert_eq!(third.feedback.as_deref(), Some(BODY_NOT_VISIBLE));
}

#[test]
fn test_reset_clears_classifier() {
    let factory = squat_factory(vec![170.0, 140.0, 170.0]);
    let mut analyzer = factory.build(ModeId::Squat);
    for id in 0..3 {
        analyzer.process(&create_test_frame(id), Instant::now()).unwrap();
    }
    assert!(analyzer.classifier().feedback().is_some());

    analyzer.reset();
    let squat = analyzer.classifier().as_squat().unwrap();
    assert_eq!(squat.stage(), None);
    assert_eq!(squat.incorrect_count(), 0);
}

#[test]
fn test_annotation_failure_still_advances_state() {
    let mut analyzer = FrameAnalyzer::new(
        crate::classifier::ModeClassifier::new(ModeId::Jump, &FitcamConfig::default()),
        Box::new(NoPoseEstimator),
        Arc::new(FailingAnnotator),
    );

    let result = analyzer.process(&create_test_frame(0), Instant::now());
    assert!(matches!(result, Err(AnalysisError::Annotation { .. })));
    assert_eq!(analyzer.frames_processed(), 1);
    assert_eq!(analyzer.classifier().feedback(), Some(BODY_NOT_VISIBLE));
}

#[test]
fn test_passthrough_shares_pixels() {
    let frame = create_test_frame(5);
    let output = PassthroughAnnotator
        .annotate(&frame, &Overlay::default())
        .unwrap();
    assert!(Arc::ptr_eq(&frame.data, &output.data));
}

#[test]
fn test_annotator_from_config_falls_back() {
    let config = OverlayConfig {
        font_path: "/nonexistent/font.ttf".to_string(),
        font_size: 28.0,
    };
    let annotator = annotator_from_config(&config);
    let frame = create_test_frame(1);
    let output = annotator.annotate(&frame, &Overlay::default()).unwrap();
    assert_eq!(output.format, FrameFormat::Rgb24);
}

#[cfg(feature = "overlay")]
mod overlay {
    use super::*;
    use crate::analyzer::codec::{decode_rgb, encode_jpeg, frame_from_jpeg, jpeg_bytes};
    use crate::classifier::OverlayAccent;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    #[test]
    fn test_rgb_frame_round_trips_through_jpeg() {
        let frame = create_test_frame(3);
        let jpeg = jpeg_bytes(&frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let uploaded = frame_from_jpeg(9, jpeg.to_vec()).unwrap();
        assert_eq!((uploaded.width, uploaded.height), (32, 24));
        assert_eq!(uploaded.format, FrameFormat::Mjpeg);
        assert_eq!(decode_rgb(&uploaded).unwrap().dimensions(), (32, 24));
    }

    #[test]
    fn test_invalid_uploads_are_rejected() {
        assert!(matches!(
            frame_from_jpeg(1, vec![1, 2, 3]),
            Err(AnalysisError::FrameDecode { frame_id: 1, .. })
        ));

        let short = create_test_frame(2).with_data(vec![0u8; 10], FrameFormat::Rgb24);
        assert!(matches!(
            decode_rgb(&short),
            Err(AnalysisError::FrameDecode { .. })
        ));
    }

    #[test]
    fn test_encode_jpeg_output() {
        let jpeg = encode_jpeg(image::RgbImage::new(16, 16)).unwrap();
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_bad_font_data_rejected() {
        assert!(TextOverlayAnnotator::from_font_data(vec![0u8; 16], 20.0).is_err());
    }

    #[test]
    fn test_text_overlay_outputs_jpeg() {
        let Ok(font_data) = std::fs::read(SYSTEM_FONT) else {
            println!("Font {} not available - test skipped", SYSTEM_FONT);
            return;
        };
        let annotator = TextOverlayAnnotator::from_font_data(font_data, 14.0).unwrap();
        let frame = FrameData::new(
            1,
            SystemTime::now(),
            vec![200u8; 160 * 120 * 3],
            160,
            120,
            FrameFormat::Rgb24,
        );
        let overlay = Overlay {
            counters: vec![("CORRECT".to_string(), "3".to_string())],
            status: vec!["Knee: 92  Back: 40".to_string()],
            feedback: Some("Lower your hips".to_string()),
            accent: OverlayAccent::Good,
        };

        let output = annotator.annotate(&frame, &overlay).unwrap();
        assert_eq!(output.format, FrameFormat::Mjpeg);
        assert_eq!(output.id, 1);
        let decoded = decode_rgb(&output).unwrap();
        assert_eq!(decoded.dimensions(), (160, 120));
    }
}
