use super::*;
use crate::classifier::ModeId;
use crate::config::FitcamConfig;

fn create_test_config() -> FitcamConfig {
    let mut config = FitcamConfig::default();
    config.camera.resolution = (64, 48);
    config.camera.fps = 60;
    config.speech.enabled = false;
    config.arbiter.stop_timeout_ms = 500;
    config.stream.ip = "127.0.0.1".to_string();
    config.stream.port = 0;
    config
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let orchestrator = FitcamOrchestrator::new(create_test_config(), SourceKind::Synthetic).unwrap();
    orchestrator.initialize().unwrap();

    let states = orchestrator.component_states();
    assert_eq!(states.len(), 3);
    assert!(states.values().all(|state| *state == ComponentState::Stopped));
    assert!(!orchestrator.arbiter().is_running());
    assert!(orchestrator.sessions().modes().is_empty());
}

#[tokio::test]
async fn test_camera_source_without_hardware() {
    // Building the camera factory never touches the device, but builds
    // without GStreamer refuse the camera source outright
    match FitcamOrchestrator::new(create_test_config(), SourceKind::Camera) {
        Ok(orchestrator) => {
            orchestrator.initialize().unwrap();
            assert!(!orchestrator.arbiter().is_running());
        }
        Err(e) => assert!(e.to_string().contains("Camera")),
    }
}

#[tokio::test]
async fn test_run_until_user_request() {
    let mut orchestrator =
        FitcamOrchestrator::new(create_test_config(), SourceKind::Synthetic).unwrap();
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();
    assert_eq!(
        orchestrator.component_state("uploads"),
        Some(ComponentState::Running)
    );

    assert!(orchestrator.request_shutdown(ShutdownReason::UserRequest));
    assert!(!orchestrator.request_shutdown(ShutdownReason::UserRequest));

    let exit_code = orchestrator.run().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.component_state("camera"),
        Some(ComponentState::Stopped)
    );
    assert_eq!(
        orchestrator.component_state("http"),
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_shutdown_releases_active_capture() {
    let mut orchestrator =
        FitcamOrchestrator::new(create_test_config(), SourceKind::Synthetic).unwrap();
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();

    let arbiter = orchestrator.arbiter();
    assert!(arbiter.activate(ModeId::Squat).await);
    assert!(arbiter.is_running());

    orchestrator.request_shutdown(ShutdownReason::Signal("SIGTERM".to_string()));
    assert_eq!(orchestrator.run().await.unwrap(), 0);

    assert!(!arbiter.is_running());
    assert_eq!(arbiter.live_captures(), 0);
}

#[tokio::test]
async fn test_error_shutdown_exit_code() {
    let mut orchestrator =
        FitcamOrchestrator::new(create_test_config(), SourceKind::Synthetic).unwrap();
    orchestrator.initialize().unwrap();

    let exit_code = orchestrator
        .shutdown(&ShutdownReason::Error("test".to_string()))
        .await;
    assert_eq!(exit_code, 1);
    assert_eq!(ShutdownReason::UserRequest.exit_code(), 0);
}

#[tokio::test]
async fn test_run_twice_fails() {
    let mut orchestrator =
        FitcamOrchestrator::new(create_test_config(), SourceKind::Synthetic).unwrap();
    orchestrator.initialize().unwrap();
    orchestrator.request_shutdown(ShutdownReason::UserRequest);

    assert_eq!(orchestrator.run().await.unwrap(), 0);
    assert!(orchestrator.run().await.is_err());
}

#[cfg(feature = "streaming")]
#[tokio::test]
async fn test_bind_failure_shuts_down_with_error() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = create_test_config();
    config.stream.port = occupied.local_addr().unwrap().port();

    let mut orchestrator = FitcamOrchestrator::new(config, SourceKind::Synthetic).unwrap();
    orchestrator.initialize().unwrap();
    orchestrator.start().await.unwrap();

    let exit_code = orchestrator.run().await.unwrap();
    assert_eq!(exit_code, 1);
    assert_eq!(
        orchestrator.component_state("http"),
        Some(ComponentState::Failed)
    );
}
