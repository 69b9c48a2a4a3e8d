use super::monitor;
use super::types::{ComponentState, ShutdownReason};
use crate::config::IpcamConfig;
use crate::error::{IpcamError, Result};
use crate::events::EventBus;
use crate::processor::{ProcessorStatus, StreamProcessor};
use crate::recording::resolve_timezone;

use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Starts, monitors and stops the stream processors of all configured cameras
pub struct CameraOrchestrator {
    pub(super) config: IpcamConfig,
    pub(super) timezone: Tz,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) processors: Arc<Mutex<Vec<StreamProcessor>>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl CameraOrchestrator {
    pub fn new(config: IpcamConfig) -> Result<Self> {
        config.validate()?;

        let timezone = resolve_timezone(&config.system.timezone);
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            timezone,
            event_bus,
            processors: Arc::new(Mutex::new(Vec::new())),
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Spawn a processor per camera plus the event logger and status monitor
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting {} camera(s)", self.config.cameras.len());

        for camera in self.config.cameras.clone() {
            let name = camera.name.clone();
            self.set_component_state(&name, ComponentState::Starting).await;

            match StreamProcessor::from_config(camera, self.timezone, Some(self.event_bus())) {
                Ok(processor) => {
                    self.processors.lock().await.push(processor);
                    self.set_component_state(&name, ComponentState::Running).await;
                    info!("Camera {} started", name);
                }
                Err(e) => {
                    self.set_component_state(&name, ComponentState::Failed).await;
                    error!("Failed to start camera {}: {}", name, e);
                    return Err(IpcamError::component(name, e.to_string()));
                }
            }
        }

        monitor::spawn_event_logger(self.event_bus.subscribe(), self.cancellation_token.clone());
        monitor::spawn_status_monitor(
            Arc::clone(&self.processors),
            Duration::from_secs(self.config.system.status_interval_seconds),
            self.cancellation_token.clone(),
        );

        info!("All cameras started");
        Ok(())
    }

    /// Names of cameras whose liveness flag did not change since the last check
    pub async fn check_liveness(&self) -> Vec<String> {
        monitor::check_liveness(&self.processors).await
    }

    pub async fn statuses(&self) -> Vec<ProcessorStatus> {
        self.processors
            .lock()
            .await
            .iter()
            .map(|p| p.status())
            .collect()
    }

    /// Apply an explicit recording override to one camera
    pub async fn set_recording_enabled(&self, camera: &str, enabled: bool) -> Result<()> {
        let processors = self.processors.lock().await;
        let processor = processors
            .iter()
            .find(|p| p.name() == camera)
            .ok_or_else(|| IpcamError::system(format!("Unknown camera '{}'", camera)))?;
        processor.set_recording_enabled(enabled);
        Ok(())
    }
}
