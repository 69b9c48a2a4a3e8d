use super::writer::{Container, VideoWriter, WriterFactory};
use crate::error::{RecordingError, Result};
use crate::frame::Frame;

use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const EOS_TIMEOUT_SECS: u64 = 10;

/// H.264/MP4 segment writer fed through an appsrc
pub struct GstMp4Writer {
    path: PathBuf,
    pipeline: Pipeline,
    appsrc: AppSrc,
    width: u32,
    height: u32,
    frame_duration: gstreamer::ClockTime,
    frames_pushed: u64,
}

impl GstMp4Writer {
    fn pipeline_description(path: &Path, width: u32, height: u32, fps: f64) -> String {
        let (numer, denom) = fps_fraction(fps);
        format!(
            "appsrc name=src is-live=false format=time \
             caps=video/x-raw,format=RGB,width={},height={},framerate={}/{} ! \
             videoconvert ! video/x-raw,format=I420 ! \
             x264enc speed-preset=veryfast key-int-max={} ! \
             h264parse ! \
             mp4mux faststart=true ! \
             filesink location=\"{}\"",
            width,
            height,
            numer,
            denom,
            (fps.round() as u32).max(1) * 2,
            path.to_string_lossy().replace('"', "")
        )
    }

    pub fn create(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        let creation_err = |details: String| RecordingError::WriterCreation {
            path: path.display().to_string(),
            width,
            height,
            fps,
            details,
        };

        gstreamer::init().map_err(|e| creation_err(format!("Failed to initialize GStreamer: {}", e)))?;

        let description = Self::pipeline_description(path, width, height, fps);
        debug!("MP4 writer pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| creation_err(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| creation_err("Failed to downcast to Pipeline".to_string()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| creation_err("Failed to get appsrc element".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| creation_err("Failed to downcast to AppSrc".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| creation_err(format!("Failed to start pipeline: {}", e)))?;

        let frame_duration = gstreamer::ClockTime::from_nseconds((1_000_000_000f64 / fps) as u64);

        info!("Opened MP4 writer {} ({}x{} @ {:.2}fps)", path.display(), width, height, fps);
        Ok(Self {
            path: path.to_path_buf(),
            pipeline,
            appsrc,
            width,
            height,
            frame_duration,
            frames_pushed: 0,
        })
    }
}

impl VideoWriter for GstMp4Writer {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(RecordingError::Write {
                details: format!(
                    "frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            }
            .into());
        }

        let mut buffer = gstreamer::Buffer::from_slice(frame.image.as_raw().clone());
        {
            let buffer = buffer.get_mut().ok_or_else(|| RecordingError::Write {
                details: "buffer is not writable".to_string(),
            })?;
            let pts = self.frame_duration * self.frames_pushed;
            buffer.set_pts(pts);
            buffer.set_duration(self.frame_duration);
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| RecordingError::Write {
                details: format!("Failed to push buffer: {:?}", e),
            })?;
        self.frames_pushed += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        if let Err(e) = self.appsrc.end_of_stream() {
            warn!("Failed to send EOS to {}: {:?}", self.path.display(), e);
        }

        let mut result = Ok(());
        if let Some(bus) = self.pipeline.bus() {
            let message = bus.timed_pop_filtered(
                gstreamer::ClockTime::from_seconds(EOS_TIMEOUT_SECS),
                &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
            );
            match message.as_ref().map(|m| m.view()) {
                Some(gstreamer::MessageView::Eos(_)) => {}
                Some(gstreamer::MessageView::Error(err)) => {
                    result = Err(RecordingError::Write {
                        details: format!("Encoder error: {}", err.error()),
                    }
                    .into());
                }
                _ => warn!(
                    "Timed out waiting for {} to finalize",
                    self.path.display()
                ),
            }
        }

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop MP4 writer pipeline cleanly: {}", e);
        }

        debug!(
            "Closed MP4 file {} ({} frames)",
            self.path.display(),
            self.frames_pushed
        );
        result
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mp4WriterFactory;

impl Mp4WriterFactory {
    pub fn new() -> Self {
        Self
    }
}

impl WriterFactory for Mp4WriterFactory {
    fn create(&self, path: &Path, width: u32, height: u32, fps: f64) -> Result<Box<dyn VideoWriter>> {
        Ok(Box::new(GstMp4Writer::create(path, width, height, fps)?))
    }

    fn extension(&self) -> &'static str {
        Container::Mp4.extension()
    }
}

/// Express a frame rate as an integer fraction with millihertz precision
fn fps_fraction(fps: f64) -> (u32, u32) {
    let numer = (fps * 1000.0).round().max(1.0) as u32;
    (numer, 1000)
}
