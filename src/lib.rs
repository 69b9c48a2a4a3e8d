pub mod analyzer;
pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod frame_buffer;
pub mod processor;
pub mod recording;
pub mod recovery;
pub mod schedule;

pub use analyzer::{MotionDetector, MotionRect, MotionResult, MotionSensitivity};
pub use app::{CameraOrchestrator, ComponentState, ShutdownReason};
pub use capture::{source_for_url, CaptureSource, StreamInfo};
pub use config::{CameraConfig, IpcamConfig, SystemConfig};
pub use error::{IpcamError, Result};
pub use events::{EventBus, StreamEvent};
pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use processor::{ProcessorState, ProcessorStatus, StreamProcessor};
pub use recording::{should_record, Container, RecordingController, RecordingSettings};
pub use schedule::WeeklySchedule;
