use super::*;
use crate::config::{CameraConfig, IpcamConfig};
use crate::recording::Container;
use std::path::Path;
use std::time::Duration;

fn synthetic_camera(name: &str, folder: &Path) -> CameraConfig {
    let mut camera = CameraConfig::new(name, "synthetic://32x24@50");
    camera.fps = Some(50);
    camera.container = Container::Mjpeg;
    camera.save_folder = folder.join(name).display().to_string();
    camera
}

fn create_test_config(folder: &Path) -> IpcamConfig {
    let mut config = IpcamConfig::default();
    config.system.status_interval_seconds = 1;

    let mut porch = synthetic_camera("porch", folder);
    porch.record_on_start = true;
    config.cameras = vec![porch, synthetic_camera("garage", folder)];
    config
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = CameraOrchestrator::new(create_test_config(dir.path())).unwrap();

    // Nothing started yet
    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty());
    assert!(orchestrator.statuses().await.is_empty());
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.cameras[1].name = "porch".to_string();
    assert!(CameraOrchestrator::new(config).is_err());

    let mut config = create_test_config(dir.path());
    config.system.timezone = "Mars/Olympus".to_string();
    assert!(CameraOrchestrator::new(config).is_err());
}

#[tokio::test]
async fn test_start_and_shutdown_closes_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = CameraOrchestrator::new(create_test_config(dir.path())).unwrap();
    let mut events = orchestrator.event_bus().subscribe();

    orchestrator.start().await.unwrap();
    assert_eq!(
        orchestrator.get_component_state("porch").await,
        Some(ComponentState::Running)
    );

    tokio::time::sleep(Duration::from_millis(400)).await;

    let statuses = orchestrator.statuses().await;
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|s| s.frames_grabbed > 0));
    assert!(orchestrator.check_liveness().await.is_empty());

    orchestrator.set_recording_enabled("garage", false).await.unwrap();
    assert!(orchestrator.set_recording_enabled("attic", true).await.is_err());

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.get_component_state("garage").await,
        Some(ComponentState::Stopped)
    );
    assert!(orchestrator.statuses().await.is_empty());

    let recordings: Vec<_> = std::fs::read_dir(dir.path().join("porch"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(recordings.len(), 1);
    assert!(recordings[0].starts_with("porch_"));
    assert!(recordings[0].ends_with(".mjpeg"));
    assert!(!dir.path().join("garage").exists());

    let mut closed = false;
    while let Ok(event) = events.try_recv() {
        if event.event_type() == "segment_closed" && event.camera() == "porch" {
            closed = true;
        }
    }
    assert!(closed);
}

#[cfg(not(feature = "camera"))]
#[tokio::test]
async fn test_unreachable_camera_reported_as_stalled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    let mut gate = CameraConfig::new("gate", "rtsp://user:pw@192.0.2.10/stream");
    gate.save_folder = dir.path().join("gate").display().to_string();
    gate.container = Container::Mjpeg;
    config.cameras.push(gate);

    let mut orchestrator = CameraOrchestrator::new(config).unwrap();
    orchestrator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(orchestrator.check_liveness().await, vec!["gate".to_string()]);

    assert_eq!(orchestrator.shutdown().await.unwrap(), 0);
}
