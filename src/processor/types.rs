use crate::analyzer::MotionRect;
use serde::Serialize;
use std::time::Duration;

/// Lifecycle of a stream processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessorState {
    Stopped,
    /// Trying to open the stream
    Connecting,
    /// Frames are arriving
    Running,
    /// Connection attempts or grabs keep failing; retries continue
    Degraded,
}

impl ProcessorState {
    /// Whether the worker thread is still active in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, ProcessorState::Stopped)
    }
}

/// Point-in-time view of a processor for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorStatus {
    pub camera: String,
    pub state: ProcessorState,
    /// Observed frames per second
    pub fps: f64,
    pub recording: bool,
    pub motion: bool,
    pub last_rect: MotionRect,
    pub frames_grabbed: u64,
    pub segments_written: u64,
    /// Time since the last successful grab, None before the first one
    pub last_grab_age: Option<Duration>,
}

impl ProcessorStatus {
    pub(crate) fn new(camera: &str) -> Self {
        Self {
            camera: camera.to_string(),
            state: ProcessorState::Stopped,
            fps: 0.0,
            recording: false,
            motion: false,
            last_rect: MotionRect::default(),
            frames_grabbed: 0,
            segments_written: 0,
            last_grab_age: None,
        }
    }
}
