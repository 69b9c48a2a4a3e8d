use super::types::{ProcessorState, ProcessorStatus};
use super::worker::{Shared, Worker};
use crate::capture::{source_for_url, CaptureSource};
use crate::config::CameraConfig;
use crate::error::{IpcamError, Result};
use crate::events::EventBus;
use crate::frame::Frame;
use crate::recording::{writer_factory_for, WriterFactory};

use chrono_tz::Tz;
use crossbeam::channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Handle to one camera's background worker.
///
/// All queries read copies or flags; none of them touch the worker's frame
/// history. Dropping the handle stops the worker.
pub struct StreamProcessor {
    name: String,
    shared: Arc<Shared>,
    stop_sender: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl StreamProcessor {
    /// Start a processor with the capture backend and container chosen by the config
    pub fn from_config(config: CameraConfig, timezone: Tz, events: Option<Arc<EventBus>>) -> Result<Self> {
        let source = source_for_url(&config.url);
        let factory = writer_factory_for(config.container)?;
        Self::spawn(config, timezone, source, factory, events)
    }

    pub fn spawn(
        config: CameraConfig,
        timezone: Tz,
        source: Box<dyn CaptureSource>,
        factory: Box<dyn WriterFactory>,
        events: Option<Arc<EventBus>>,
    ) -> Result<Self> {
        config.validate()?;

        let name = config.name.clone();
        let worker = Worker::new(config, timezone, source, factory, events)?;
        let shared = worker.shared();
        let (stop_sender, stop_receiver) = bounded(1);

        let thread = std::thread::Builder::new()
            .name(format!("cam-{}", name))
            .spawn(move || worker.run(stop_receiver))?;

        info!("Stream processor {} spawned", name);
        Ok(Self {
            name,
            shared,
            stop_sender: Some(stop_sender),
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the worker and wait until it has closed its recording and stream
    pub fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        debug!("Stopping stream processor {}", self.name);
        if let Some(sender) = self.stop_sender.take() {
            // A full channel means a stop is already pending
            let _ = sender.try_send(());
        }

        thread.join().map_err(|_| {
            error!("Stream worker for {} panicked", self.name);
            IpcamError::component(self.name.clone(), "worker thread panicked".to_string())
        })
    }

    /// Explicit recording override, applied on the worker's next iteration
    pub fn set_recording_enabled(&self, enabled: bool) {
        self.shared.recording.set_enabled(enabled);
    }

    pub fn is_recording_enabled(&self) -> bool {
        self.shared.recording.is_enabled()
    }

    /// Combined explicit/schedule decision from the last iteration
    pub fn is_recording(&self) -> bool {
        self.shared.recording.is_recording()
    }

    /// Copy of the newest frame; annotated when requested and available
    pub fn current_frame(&self, want_annotated: bool) -> Option<Frame> {
        self.shared.buffer.current_frame(want_annotated)
    }

    pub fn aspect_ratio_and_size(&self) -> Option<(f64, u32, u32)> {
        self.shared.buffer.aspect_ratio_and_size()
    }

    pub fn current_fps(&self) -> f64 {
        self.shared.fps()
    }

    /// Liveness flag: true once per newly arrived frame
    pub fn video_frame_updated(&self) -> bool {
        self.shared.buffer.consume_updated_flag()
    }

    pub fn state(&self) -> ProcessorState {
        self.shared.state()
    }

    pub fn status(&self) -> ProcessorStatus {
        self.shared.status()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for StreamProcessor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop {}: {}", self.name, e);
        }
    }
}
