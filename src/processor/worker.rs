use super::metrics::FpsMeter;
use super::types::{ProcessorState, ProcessorStatus};
use crate::analyzer::{annotate, MotionDetector, MotionRect};
use crate::capture::{redact_url, CaptureSource};
use crate::config::CameraConfig;
use crate::error::{CaptureError, IpcamError, Result};
use crate::events::{EventBus, StreamEvent};
use crate::frame::Frame;
use crate::frame_buffer::FrameBuffer;
use crate::recording::{RecordingController, RecordingFlags, RecordingSettings, WriterFactory};
use crate::recovery::Backoff;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const DEFAULT_FPS: f64 = 25.0;

/// Iteration period for a configured or native frame rate
pub fn frame_period(configured: Option<u32>, native: Option<f64>) -> Duration {
    let fps = configured
        .map(f64::from)
        .or(native)
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(DEFAULT_FPS);
    Duration::from_secs_f64(1.0 / fps)
}

/// State readable from outside the worker thread
pub(crate) struct Shared {
    pub buffer: FrameBuffer,
    pub recording: RecordingFlags,
    status: RwLock<(ProcessorStatus, Option<Instant>)>,
}

impl Shared {
    pub fn status(&self) -> ProcessorStatus {
        let guard = self.status.read();
        let (status, last_grab) = &*guard;
        let mut status = status.clone();
        status.last_grab_age = last_grab.map(|t| t.elapsed());
        status
    }

    pub fn state(&self) -> ProcessorState {
        self.status.read().0.state
    }

    pub fn fps(&self) -> f64 {
        self.status.read().0.fps
    }
}

/// Everything that runs on the per-camera thread
pub(crate) struct Worker {
    config: CameraConfig,
    timezone: Tz,
    source: Box<dyn CaptureSource>,
    detector: MotionDetector,
    recorder: RecordingController,
    events: Option<Arc<EventBus>>,
    shared: Arc<Shared>,
    meter: FpsMeter,
    backoff: Backoff,
    state: ProcessorState,
    period: Duration,
    record_fps: f64,
    connect_failures: u32,
    grab_failures: u32,
    frames_grabbed: u64,
    motion: bool,
    last_rect: MotionRect,
}

impl Worker {
    pub fn new(
        config: CameraConfig,
        timezone: Tz,
        source: Box<dyn CaptureSource>,
        factory: Box<dyn WriterFactory>,
        events: Option<Arc<EventBus>>,
    ) -> Result<Self> {
        let detector = MotionDetector::new(
            config.motion_sensitivity,
            config.shrink_frames_for_motion,
            config.motion_frame_scalar,
        )?;

        let recorder = RecordingController::new(
            RecordingSettings::from_camera(&config, timezone),
            config.recording_schedule.clone(),
            factory,
            events.clone(),
        );
        recorder.set_enabled(config.record_on_start);

        let shared = Arc::new(Shared {
            buffer: FrameBuffer::new(),
            recording: recorder.flags(),
            status: RwLock::new((ProcessorStatus::new(&config.name), None)),
        });

        let period = frame_period(config.fps, None);
        Ok(Self {
            timezone,
            source,
            detector,
            recorder,
            events,
            shared,
            meter: FpsMeter::new(),
            backoff: Backoff::new(),
            state: ProcessorState::Stopped,
            period,
            record_fps: 1.0 / period.as_secs_f64(),
            connect_failures: 0,
            grab_failures: 0,
            frames_grabbed: 0,
            motion: false,
            last_rect: MotionRect::default(),
            config,
        })
    }

    pub fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }

    pub fn recorder(&self) -> &RecordingController {
        &self.recorder
    }

    /// Loop until `stop` fires or its sender is dropped
    pub fn run(mut self, stop: Receiver<()>) {
        info!("Stream worker for {} started", self.config.name);
        self.set_state(ProcessorState::Connecting);

        loop {
            let started = Instant::now();
            let wall = Utc::now().with_timezone(&self.timezone);
            let target = self.run_iteration(started, &wall);
            let wait = target.saturating_sub(started.elapsed());

            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.shutdown();
    }

    /// One pass of the state machine. Returns the time the iteration should
    /// take in total, measured from its start.
    pub fn run_iteration(&mut self, now: Instant, wall: &DateTime<Tz>) -> Duration {
        if self.state == ProcessorState::Stopped {
            self.set_state(ProcessorState::Connecting);
        }

        // Schedule transitions apply even while the stream is down
        self.recorder.evaluate_schedule(wall);

        let target = if self.source.is_connected() {
            self.grab(now, wall)
        } else {
            self.try_connect(now)
        };

        self.publish_status();
        target
    }

    /// Close the recording and release the stream
    pub fn shutdown(&mut self) {
        self.recorder.close();
        self.source.disconnect();
        self.set_state(ProcessorState::Stopped);
        self.publish_status();
        info!("Stream worker for {} stopped", self.config.name);
    }

    fn try_connect(&mut self, now: Instant) -> Duration {
        match self.source.connect(&self.config.url, self.period) {
            Ok(info) => {
                info!(
                    "Connected to {} ({}x{}, native fps {:?})",
                    redact_url(&self.config.url),
                    info.width,
                    info.height,
                    info.fps
                );
                self.period = frame_period(self.config.fps, self.source.native_frame_rate());
                self.record_fps = 1.0 / self.period.as_secs_f64();
                self.connect_failures = 0;
                self.grab_failures = 0;
                self.backoff.reset();
                self.meter.reset();
                self.set_state(ProcessorState::Running);
                Duration::ZERO
            }
            Err(IpcamError::Capture(CaptureError::Starting)) => {
                trace!("{}: stream still starting", self.config.name);
                self.meter.record_miss(now);
                self.period
            }
            Err(e) => {
                self.connect_failures += 1;
                self.meter.record_miss(now);
                if self.connect_failures == 1 {
                    warn!("Failed to connect {}: {}", self.config.name, e);
                } else {
                    debug!(
                        "Connect attempt {} for {} failed: {}",
                        self.connect_failures, self.config.name, e
                    );
                }

                if self.connect_failures >= self.config.connect_attempts_before_degraded {
                    self.set_state(ProcessorState::Degraded);
                    self.backoff.next_delay().max(self.period)
                } else {
                    self.period
                }
            }
        }
    }

    fn grab(&mut self, now: Instant, wall: &DateTime<Tz>) -> Duration {
        match self.source.next_frame(self.period) {
            Some(frame) => self.process_frame(frame, now, wall),
            None => self.handle_miss(now),
        }
        self.period
    }

    fn process_frame(&mut self, frame: Frame, now: Instant, wall: &DateTime<Tz>) {
        if self.grab_failures > 0 {
            debug!("{} recovered after {} missed grabs", self.config.name, self.grab_failures);
        }
        self.grab_failures = 0;
        self.frames_grabbed += 1;
        self.meter.record_grab(now);
        self.set_state(ProcessorState::Running);

        self.shared.buffer.update_raw(frame.clone());

        let motion_active =
            self.detector.is_enabled() && self.config.motion_schedule.is_active_at(wall);
        let annotated = if motion_active {
            let result = self.detector.process(&frame);
            self.update_motion(result.motion, result.rect, &frame);
            let annotated = if result.motion {
                annotate(&frame, &result.rect)
            } else {
                frame.clone()
            };
            self.shared.buffer.update_annotated(annotated.clone());
            Some(annotated)
        } else {
            self.shared.buffer.clear_annotated();
            self.update_motion(false, MotionRect::default(), &frame);
            None
        };

        let output = match (&annotated, self.config.record_annotated) {
            (Some(annotated), true) => annotated,
            _ => &frame,
        };
        if let Err(e) = self.recorder.write(output, self.record_fps) {
            trace!("Frame {} not recorded: {}", frame.id, e);
        }
    }

    fn handle_miss(&mut self, now: Instant) {
        self.grab_failures += 1;
        self.meter.record_miss(now);
        trace!("{}: empty grab ({} in a row)", self.config.name, self.grab_failures);

        if self.grab_failures == self.config.grab_failures_before_degraded {
            warn!(
                "{} produced no frames for {} grabs",
                self.config.name, self.grab_failures
            );
            self.set_state(ProcessorState::Degraded);
        }

        if self.grab_failures >= self.config.grab_failures_before_reconnect {
            warn!("Reconnecting {} after {} missed grabs", self.config.name, self.grab_failures);
            // A new connection may change resolution; keep segments contiguous
            self.recorder.split_segment();
            self.source.disconnect();
            self.detector.reset();
            self.grab_failures = 0;
            self.connect_failures = 0;
            self.set_state(ProcessorState::Connecting);
        }
    }

    fn update_motion(&mut self, motion: bool, rect: MotionRect, frame: &Frame) {
        self.last_rect = rect;
        if motion == self.motion {
            return;
        }
        self.motion = motion;

        let camera = self.config.name.clone();
        let event = if motion {
            debug!("{}: motion started at {:?}", camera, rect);
            StreamEvent::MotionStarted {
                camera,
                rect,
                timestamp: frame.timestamp,
            }
        } else {
            debug!("{}: motion stopped", camera);
            StreamEvent::MotionStopped {
                camera,
                timestamp: frame.timestamp,
            }
        };
        self.publish(event);
    }

    fn set_state(&mut self, state: ProcessorState) {
        if state == self.state {
            return;
        }
        info!("{}: {:?} -> {:?}", self.config.name, self.state, state);
        let from = self.state;
        self.state = state;
        self.publish(StreamEvent::StateChanged {
            camera: self.config.name.clone(),
            from,
            to: state,
        });
    }

    fn publish_status(&self) {
        let mut guard = self.shared.status.write();
        let (status, last_grab) = &mut *guard;
        status.state = self.state;
        status.fps = self.meter.fps();
        status.recording = self.recorder.is_recording();
        status.motion = self.motion;
        status.last_rect = self.last_rect;
        status.frames_grabbed = self.frames_grabbed;
        status.segments_written = self.recorder.segments_written();
        *last_grab = self.meter.last_grab();
    }

    fn publish(&self, event: StreamEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}
