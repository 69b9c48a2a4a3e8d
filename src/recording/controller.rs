use super::metadata::{save_metadata, SegmentMetadata};
use super::naming::unique_segment_path;
use super::writer::{VideoWriter, WriterFactory};
use crate::config::CameraConfig;
use crate::error::{RecordingError, Result};
use crate::events::{EventBus, StreamEvent};
use crate::frame::Frame;
use crate::schedule::WeeklySchedule;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Combined recording decision: the explicit flag, or a configured schedule
/// that is active at `now`. An empty schedule contributes nothing.
pub fn should_record<T: TimeZone>(explicit: bool, schedule: &WeeklySchedule, now: &DateTime<T>) -> bool {
    explicit || (schedule.is_configured() && schedule.is_active_at(now))
}

#[derive(Debug, Clone)]
pub struct RecordingSettings {
    pub camera_name: String,
    pub folder: PathBuf,
    pub required_duration: Duration,
    pub save_metadata: bool,
    /// Zone used for segment file names
    pub timezone: Tz,
}

impl RecordingSettings {
    pub fn from_camera(camera: &CameraConfig, timezone: Tz) -> Self {
        Self {
            camera_name: camera.name.clone(),
            folder: PathBuf::from(&camera.save_folder),
            required_duration: Duration::try_from_secs_f64(camera.required_file_duration_secs)
                .unwrap_or(Duration::from_secs(600)),
            save_metadata: camera.save_metadata,
            timezone,
        }
    }
}

/// Flags shared between the worker and outside callers
#[derive(Debug, Clone, Default)]
pub struct RecordingFlags {
    explicit: Arc<AtomicBool>,
    recording: Arc<AtomicBool>,
}

impl RecordingFlags {
    pub fn set_enabled(&self, enabled: bool) {
        self.explicit.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.explicit.load(Ordering::Acquire)
    }

    /// Result of the last schedule evaluation
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }
}

struct OpenSegment {
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
    sequence: u32,
    start_time: DateTime<Utc>,
    width: u32,
    height: u32,
    fps: f64,
    frame_limit: u64,
    frames: u64,
}

impl OpenSegment {
    fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.fps)
    }

    fn is_full(&self) -> bool {
        self.frames >= self.frame_limit
    }
}

/// Owns the output writer for one camera and splits a continuous recording
/// session into fixed-length segments.
///
/// Lives on the worker thread. Other threads talk to it only through
/// [`RecordingFlags`].
pub struct RecordingController {
    settings: RecordingSettings,
    schedule: WeeklySchedule,
    factory: Box<dyn WriterFactory>,
    flags: RecordingFlags,
    events: Option<Arc<EventBus>>,
    active: bool,
    session_id: Option<Uuid>,
    next_sequence: u32,
    segment: Option<OpenSegment>,
    failing: bool,
    segments_written: u64,
}

impl RecordingController {
    pub fn new(
        settings: RecordingSettings,
        schedule: WeeklySchedule,
        factory: Box<dyn WriterFactory>,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            settings,
            schedule,
            factory,
            flags: RecordingFlags::default(),
            events,
            active: false,
            session_id: None,
            next_sequence: 1,
            segment: None,
            failing: false,
            segments_written: 0,
        }
    }

    pub fn flags(&self) -> RecordingFlags {
        self.flags.clone()
    }

    /// Explicit user override; takes effect on the next evaluation
    pub fn set_enabled(&self, enabled: bool) {
        self.flags.set_enabled(enabled);
    }

    pub fn is_recording(&self) -> bool {
        self.active
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn has_open_file(&self) -> bool {
        self.segment.is_some()
    }

    pub fn current_file(&self) -> Option<&PathBuf> {
        self.segment.as_ref().map(|s| &s.path)
    }

    /// Footage covered by the open segment
    pub fn current_elapsed(&self) -> Duration {
        self.segment.as_ref().map(|s| s.elapsed()).unwrap_or_default()
    }

    pub fn segments_written(&self) -> u64 {
        self.segments_written
    }

    /// Merge the explicit flag and the schedule, starting or ending the
    /// recording session on a transition. Returns the new decision.
    pub fn evaluate_schedule<T: TimeZone>(&mut self, now: &DateTime<T>) -> bool {
        let should = should_record(self.flags.is_enabled(), &self.schedule, now);

        if should && !self.active {
            let session = Uuid::new_v4();
            info!(
                "Recording started for {} (session {})",
                self.settings.camera_name, session
            );
            self.session_id = Some(session);
            self.next_sequence = 1;
        } else if !should && self.active {
            self.finish_segment();
            info!("Recording stopped for {}", self.settings.camera_name);
            self.session_id = None;
            self.failing = false;
        }

        self.active = should;
        self.flags.recording.store(should, Ordering::Release);
        should
    }

    /// Append a frame to the current segment, opening or rotating the file as
    /// needed. Does nothing while not recording.
    pub fn write(&mut self, frame: &Frame, fps: f64) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        let rotate = self
            .segment
            .as_ref()
            .map(|s| s.is_full() || (s.width, s.height) != frame.dimensions())
            .unwrap_or(false);
        if rotate {
            self.finish_segment();
        }

        if self.segment.is_none() {
            match self.open_segment(frame, fps) {
                Ok(segment) => self.segment = Some(segment),
                Err(e) => {
                    self.report_failure(&e);
                    return Err(e);
                }
            }
        }

        let write_result = match self.segment.as_mut() {
            Some(segment) => segment.writer.write_frame(frame).map(|()| segment.frames += 1),
            None => Ok(()),
        };

        match write_result {
            Ok(()) => {
                self.failing = false;
                Ok(())
            }
            Err(e) => {
                self.report_failure(&e);
                self.finish_segment();
                Err(e)
            }
        }
    }

    /// Close the open segment but stay in the session; the next write opens
    /// a fresh file
    pub fn split_segment(&mut self) {
        self.finish_segment();
    }

    /// Close any open file and end the session
    pub fn close(&mut self) {
        self.finish_segment();
        if self.active {
            info!("Recording closed for {}", self.settings.camera_name);
        }
        self.active = false;
        self.session_id = None;
        self.flags.recording.store(false, Ordering::Release);
    }

    fn open_segment(&mut self, frame: &Frame, fps: f64) -> Result<OpenSegment> {
        let folder = &self.settings.folder;
        std::fs::create_dir_all(folder).map_err(|source| RecordingError::Folder {
            path: folder.display().to_string(),
            source,
        })?;

        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 25.0 };
        let (width, height) = frame.dimensions();
        let start_time = Utc::now();
        let local_start = start_time.with_timezone(&self.settings.timezone);
        let path = unique_segment_path(
            folder,
            &self.settings.camera_name,
            &local_start,
            self.factory.extension(),
        );

        let writer = self.factory.create(&path, width, height, fps)?;
        let frame_limit = (self.settings.required_duration.as_secs_f64() * fps).round().max(1.0) as u64;

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let session_id = *self.session_id.get_or_insert_with(Uuid::new_v4);

        if self.failing {
            info!("Recording for {} recovered", self.settings.camera_name);
        }
        info!(
            "Opened segment {} for {} ({}x{} @ {:.2}fps)",
            path.display(),
            self.settings.camera_name,
            width,
            height,
            fps
        );
        self.publish(StreamEvent::SegmentOpened {
            camera: self.settings.camera_name.clone(),
            path: path.clone(),
            session_id,
        });

        Ok(OpenSegment {
            writer,
            path,
            sequence,
            start_time,
            width,
            height,
            fps,
            frame_limit,
            frames: 0,
        })
    }

    fn finish_segment(&mut self) {
        let Some(segment) = self.segment.take() else {
            return;
        };

        let elapsed = segment.elapsed();
        if let Err(e) = segment.writer.finish() {
            warn!("Failed to finalize {}: {}", segment.path.display(), e);
        }
        self.segments_written += 1;

        info!(
            "Closed segment {} ({} frames, {:.2}s)",
            segment.path.display(),
            segment.frames,
            elapsed.as_secs_f64()
        );

        if self.settings.save_metadata {
            let metadata = SegmentMetadata {
                camera: self.settings.camera_name.clone(),
                session_id: self.session_id.unwrap_or_default(),
                sequence: segment.sequence,
                path: segment.path.clone(),
                start_time: segment.start_time,
                end_time: Utc::now(),
                frame_count: segment.frames,
                duration_secs: elapsed.as_secs_f64(),
                width: segment.width,
                height: segment.height,
                fps: segment.fps,
            };
            if let Err(e) = save_metadata(&metadata) {
                warn!("Failed to save metadata for {}: {}", segment.path.display(), e);
            }
        }

        self.publish(StreamEvent::SegmentClosed {
            camera: self.settings.camera_name.clone(),
            path: segment.path,
            frame_count: segment.frames,
            duration_secs: elapsed.as_secs_f64(),
        });
    }

    fn report_failure(&mut self, error: &crate::error::IpcamError) {
        if self.failing {
            debug!("Recording for {} still failing: {}", self.settings.camera_name, error);
            return;
        }
        self.failing = true;
        warn!("Recording for {} failed: {}", self.settings.camera_name, error);
        self.publish(StreamEvent::RecordingFailed {
            camera: self.settings.camera_name.clone(),
            error: error.to_string(),
        });
    }

    fn publish(&self, event: StreamEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.finish_segment();
    }
}
