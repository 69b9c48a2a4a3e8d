use crate::analyzer::MotionRect;
use crate::processor::ProcessorState;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

/// Events published by stream processors
#[derive(Debug, Clone, Serialize)]
pub enum StreamEvent {
    /// Processor moved between lifecycle states
    StateChanged {
        camera: String,
        from: ProcessorState,
        to: ProcessorState,
    },
    /// Motion detector started reporting motion
    MotionStarted {
        camera: String,
        rect: MotionRect,
        timestamp: SystemTime,
    },
    /// Motion detector stopped reporting motion
    MotionStopped { camera: String, timestamp: SystemTime },
    /// A new segment file was opened
    SegmentOpened {
        camera: String,
        path: PathBuf,
        session_id: Uuid,
    },
    /// A segment file was closed
    SegmentClosed {
        camera: String,
        path: PathBuf,
        frame_count: u64,
        duration_secs: f64,
    },
    /// Recording is enabled but no file could be written
    RecordingFailed { camera: String, error: String },
}

impl StreamEvent {
    pub fn camera(&self) -> &str {
        match self {
            StreamEvent::StateChanged { camera, .. }
            | StreamEvent::MotionStarted { camera, .. }
            | StreamEvent::MotionStopped { camera, .. }
            | StreamEvent::SegmentOpened { camera, .. }
            | StreamEvent::SegmentClosed { camera, .. }
            | StreamEvent::RecordingFailed { camera, .. } => camera,
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::StateChanged { .. } => "state_changed",
            StreamEvent::MotionStarted { .. } => "motion_started",
            StreamEvent::MotionStopped { .. } => "motion_stopped",
            StreamEvent::SegmentOpened { .. } => "segment_opened",
            StreamEvent::SegmentClosed { .. } => "segment_closed",
            StreamEvent::RecordingFailed { .. } => "recording_failed",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            StreamEvent::StateChanged { camera, from, to } => {
                format!("{}: {:?} -> {:?}", camera, from, to)
            }
            StreamEvent::MotionStarted { camera, rect, .. } => format!(
                "{}: motion at {}x{}+{}+{}",
                camera, rect.width, rect.height, rect.x, rect.y
            ),
            StreamEvent::MotionStopped { camera, .. } => format!("{}: motion stopped", camera),
            StreamEvent::SegmentOpened { camera, path, .. } => {
                format!("{}: recording to {}", camera, path.display())
            }
            StreamEvent::SegmentClosed {
                camera,
                path,
                frame_count,
                duration_secs,
            } => format!(
                "{}: closed {} ({} frames, {:.1}s)",
                camera,
                path.display(),
                frame_count,
                duration_secs
            ),
            StreamEvent::RecordingFailed { camera, error } => {
                format!("{}: recording failed: {}", camera, error)
            }
        }
    }
}

/// Broadcast bus for processor events.
///
/// Publishing never blocks; slow subscribers lag and lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StreamEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning the number of subscribers that received it
    pub fn publish(&self, event: StreamEvent) -> usize {
        trace!("Publishing event: {}", event.description());
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        let delivered = bus.publish(StreamEvent::MotionStopped {
            camera: "porch".to_string(),
            timestamp: SystemTime::now(),
        });
        assert_eq!(delivered, 1);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.camera(), "porch");
        assert_eq!(event.event_type(), "motion_stopped");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        let delivered = bus.publish(StreamEvent::RecordingFailed {
            camera: "porch".to_string(),
            error: "disk full".to_string(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_state_change_description() {
        let event = StreamEvent::StateChanged {
            camera: "garage".to_string(),
            from: ProcessorState::Running,
            to: ProcessorState::Degraded,
        };
        assert_eq!(event.description(), "garage: Running -> Degraded");
    }
}
