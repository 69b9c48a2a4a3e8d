use super::{CameraOrchestrator, ComponentState};
use std::collections::HashMap;
use tracing::debug;

impl CameraOrchestrator {
    /// Update the supervisor's view of a camera
    pub async fn set_component_state(&self, camera: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        states.insert(camera.to_string(), state.clone());
        debug!("Camera '{}' state changed to: {:?}", camera, state);
    }

    pub async fn get_component_state(&self, camera: &str) -> Option<ComponentState> {
        let states = self.component_states.lock().await;
        states.get(camera).cloned()
    }

    pub async fn get_all_component_states(&self) -> HashMap<String, ComponentState> {
        let states = self.component_states.lock().await;
        states.clone()
    }
}
