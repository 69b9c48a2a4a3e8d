//! Supervisor that runs one stream processor per configured camera.

mod monitor;
mod orchestrator;
mod runtime;
mod shutdown;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::CameraOrchestrator;
pub use types::{ComponentState, ShutdownReason};
