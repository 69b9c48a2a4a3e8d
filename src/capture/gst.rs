use super::source::{redact_url, CaptureSource, StreamInfo};
use crate::error::{CaptureError, IpcamError, Result};
use crate::frame::Frame;

use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, trace, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A pipeline that is playing but has not delivered its first sample yet
struct StartingPipeline {
    pipeline: Pipeline,
    appsink: AppSink,
    deadline: Instant,
}

fn clock_time(timeout: Duration) -> gstreamer::ClockTime {
    gstreamer::ClockTime::from_mseconds(timeout.as_millis() as u64)
}

/// GStreamer-backed network stream source (RTSP, HTTP, files).
///
/// Decoding and transport are handled by `uridecodebin`; frames arrive as packed RGB.
pub struct GstCaptureSource {
    pipeline: Option<Pipeline>,
    appsink: Option<AppSink>,
    starting: Option<StartingPipeline>,
    info: Option<StreamInfo>,
    pending: Option<Frame>,
    frame_counter: u64,
}

impl GstCaptureSource {
    pub fn new() -> Self {
        Self {
            pipeline: None,
            appsink: None,
            starting: None,
            info: None,
            pending: None,
            frame_counter: 0,
        }
    }

    fn build_pipeline_string(url: &str) -> String {
        format!(
            "uridecodebin uri=\"{}\" ! \
             videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=2 drop=true enable-last-sample=false",
            url.replace('"', "%22")
        )
    }

    fn build(url: &str) -> Result<(Pipeline, AppSink)> {
        gstreamer::init().map_err(|e| CaptureError::Connect {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline = gstreamer::parse::launch(&Self::build_pipeline_string(url))
            .map_err(|e| CaptureError::Connect {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CaptureError::Connect {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CaptureError::Connect {
                details: "Failed to get appsink element".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CaptureError::Connect {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        Ok((pipeline, appsink))
    }

    /// Convert a sample to a frame, honouring row stride padding
    fn sample_to_frame(&mut self, sample: &gstreamer::Sample) -> Result<(Frame, VideoInfo)> {
        let stream_err = |details: String| IpcamError::from(CaptureError::Stream { details });

        let buffer = sample
            .buffer()
            .ok_or_else(|| stream_err("No buffer in sample".to_string()))?;
        let caps = sample
            .caps()
            .ok_or_else(|| stream_err("No caps in sample".to_string()))?;
        let video_info = VideoInfo::from_caps(caps)
            .map_err(|e| stream_err(format!("Failed to get video info: {}", e)))?;

        let width = video_info.width();
        let height = video_info.height();
        let stride = video_info.stride()[0] as usize;
        let row_bytes = width as usize * 3;

        let map = buffer
            .map_readable()
            .map_err(|e| stream_err(format!("Failed to map buffer: {}", e)))?;
        let bytes = map.as_slice();

        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let end = start + row_bytes;
            if end > bytes.len() {
                return Err(stream_err(format!(
                    "Buffer too small for {}x{} frame",
                    width, height
                )));
            }
            data.extend_from_slice(&bytes[start..end]);
        }

        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        let frame = Frame::from_rgb(frame_id, SystemTime::now(), width, height, data)
            .ok_or_else(|| stream_err("Frame size mismatch".to_string()))?;
        Ok((frame, video_info))
    }

    /// Drain bus messages, returning an error description if the stream failed
    fn check_bus(pipeline: &Pipeline) -> Option<String> {
        let bus = pipeline.bus()?;
        while let Some(message) = bus.pop_filtered(&[
            gstreamer::MessageType::Error,
            gstreamer::MessageType::Eos,
        ]) {
            match message.view() {
                gstreamer::MessageView::Error(err) => {
                    return Some(format!("{} ({:?})", err.error(), err.debug()));
                }
                gstreamer::MessageView::Eos(_) => return Some("end of stream".to_string()),
                _ => {}
            }
        }
        None
    }
}

impl Default for GstCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for GstCaptureSource {
    fn connect(&mut self, url: &str, timeout: Duration) -> Result<StreamInfo> {
        if self.pipeline.is_some() {
            self.disconnect();
        }

        let safe_url = redact_url(url);
        let starting = match self.starting.take() {
            Some(starting) => starting,
            None => {
                info!("Connecting to stream {}", safe_url);
                let (pipeline, appsink) = Self::build(url)?;
                if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
                    let _ = pipeline.set_state(gstreamer::State::Null);
                    return Err(CaptureError::Connect {
                        details: format!("Failed to start pipeline for {}: {}", safe_url, e),
                    }
                    .into());
                }
                StartingPipeline {
                    pipeline,
                    appsink,
                    deadline: Instant::now() + CONNECT_TIMEOUT,
                }
            }
        };

        // Wait in slices so the caller can act on a stop request between them
        let Some(sample) = starting.appsink.try_pull_sample(clock_time(timeout)) else {
            let failure = match Self::check_bus(&starting.pipeline) {
                Some(problem) => Some(problem),
                None if Instant::now() >= starting.deadline => {
                    Some(format!("no frames within {:?}", CONNECT_TIMEOUT))
                }
                None => None,
            };

            return match failure {
                Some(details) => {
                    let _ = starting.pipeline.set_state(gstreamer::State::Null);
                    Err(CaptureError::Connect {
                        details: format!("{}: {}", safe_url, details),
                    }
                    .into())
                }
                None => {
                    trace!("Still waiting for the first frame from {}", safe_url);
                    self.starting = Some(starting);
                    Err(CaptureError::Starting.into())
                }
            };
        };

        let (frame, video_info) = match self.sample_to_frame(&sample) {
            Ok(decoded) => decoded,
            Err(e) => {
                let _ = starting.pipeline.set_state(gstreamer::State::Null);
                return Err(e);
            }
        };

        let fps = video_info.fps();
        let native_fps = if fps.numer() > 0 && fps.denom() > 0 {
            Some(fps.numer() as f64 / fps.denom() as f64)
        } else {
            None
        };

        let info = StreamInfo {
            width: video_info.width(),
            height: video_info.height(),
            fps: native_fps,
        };
        info!(
            "Connected to {} ({}x{} @ {:?}fps)",
            safe_url, info.width, info.height, info.fps
        );

        self.pipeline = Some(starting.pipeline);
        self.appsink = Some(starting.appsink);
        self.pending = Some(frame);
        self.info = Some(info.clone());
        Ok(info)
    }

    fn next_frame(&mut self, timeout: Duration) -> Option<Frame> {
        if let Some(frame) = self.pending.take() {
            return Some(frame);
        }

        let appsink = self.appsink.as_ref()?;
        let Some(sample) = appsink.try_pull_sample(clock_time(timeout)) else {
            if let Some(problem) = self.pipeline.as_ref().and_then(Self::check_bus) {
                warn!("Stream reported a problem: {}", problem);
            } else {
                trace!("No sample within {:?}", timeout);
            }
            return None;
        };

        match self.sample_to_frame(&sample) {
            Ok((frame, _)) => Some(frame),
            Err(e) => {
                debug!("Dropping undecodable sample: {}", e);
                None
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(starting) = self.starting.take() {
            let _ = starting.pipeline.set_state(gstreamer::State::Null);
        }
        if let Some(pipeline) = self.pipeline.take() {
            debug!("Stopping capture pipeline");
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop capture pipeline cleanly: {}", e);
            }
        }
        self.appsink = None;
        self.pending = None;
        self.info = None;
    }

    fn is_connected(&self) -> bool {
        self.pipeline.is_some()
    }

    fn stream_info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }
}

impl Drop for GstCaptureSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}
