use super::{CameraOrchestrator, ComponentState};
use crate::error::{IpcamError, Result};
use crate::processor::StreamProcessor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl CameraOrchestrator {
    /// Stop every processor, closing open recordings. Returns the exit code.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let processors = std::mem::take(&mut *self.processors.lock().await);
        let mut exit_code = 0;

        for processor in processors {
            let name = processor.name().to_string();
            if let Err(e) = self.stop_camera(processor).await {
                error!("Error stopping {}: {}", name, e);
                exit_code = 1;
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_camera(&self, mut processor: StreamProcessor) -> Result<()> {
        let name = processor.name().to_string();
        info!("Stopping camera {}", name);
        self.set_component_state(&name, ComponentState::Stopping).await;

        // Joining the worker blocks for up to one frame period
        let stop = tokio::task::spawn_blocking(move || processor.stop());

        match timeout(STOP_TIMEOUT, stop).await {
            Ok(Ok(Ok(()))) => {
                self.set_component_state(&name, ComponentState::Stopped).await;
                info!("Camera {} stopped", name);
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                self.set_component_state(&name, ComponentState::Failed).await;
                Err(e)
            }
            Ok(Err(join_error)) => {
                self.set_component_state(&name, ComponentState::Failed).await;
                Err(IpcamError::component(name, join_error.to_string()))
            }
            Err(_) => {
                self.set_component_state(&name, ComponentState::Failed).await;
                Err(IpcamError::system(format!("{} stop timeout", name)))
            }
        }
    }
}
