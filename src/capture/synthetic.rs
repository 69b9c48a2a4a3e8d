use super::source::{CaptureSource, StreamInfo};
use crate::error::{CaptureError, Result};
use crate::frame::Frame;
use image::{Rgb, RgbImage};
use std::time::{Duration, SystemTime};
use tracing::{info, trace};

pub const SYNTHETIC_SCHEME: &str = "synthetic://";

const SQUARE_SIZE: u32 = 32;

/// Generated test pattern: a white square sweeping across a dark background.
///
/// Url form is `synthetic://WIDTHxHEIGHT@FPS`, e.g. `synthetic://640x480@25`.
/// Frames are produced immediately; pacing is left to the caller.
pub struct SyntheticSource {
    info: Option<StreamInfo>,
    frame_counter: u64,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            info: None,
            frame_counter: 0,
        }
    }

    /// Parse `WIDTHxHEIGHT@FPS` from a synthetic url
    pub fn parse_url(url: &str) -> Result<StreamInfo> {
        let unsupported = || CaptureError::UnsupportedUrl {
            url: url.to_string(),
        };

        let rest = url.strip_prefix(SYNTHETIC_SCHEME).ok_or_else(unsupported)?;
        let (size, fps) = rest.split_once('@').ok_or_else(unsupported)?;
        let (width, height) = size.split_once('x').ok_or_else(unsupported)?;

        let width: u32 = width.parse().map_err(|_| unsupported())?;
        let height: u32 = height.parse().map_err(|_| unsupported())?;
        let fps: f64 = fps.parse().map_err(|_| unsupported())?;

        if width == 0 || height == 0 || !(fps > 0.0) {
            return Err(unsupported().into());
        }

        Ok(StreamInfo {
            width,
            height,
            fps: Some(fps),
        })
    }

    fn render(&self, info: &StreamInfo) -> RgbImage {
        let mut image = RgbImage::from_pixel(info.width, info.height, Rgb([16, 16, 16]));

        let size = SQUARE_SIZE.min(info.width).min(info.height);
        let travel = (info.width - size).max(1) as u64;
        let x0 = ((self.frame_counter * 4) % travel) as u32;
        let y0 = (info.height - size) / 2;

        for y in y0..y0 + size {
            for x in x0..x0 + size {
                image.put_pixel(x, y, Rgb([240, 240, 240]));
            }
        }

        image
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for SyntheticSource {
    fn connect(&mut self, url: &str, _timeout: Duration) -> Result<StreamInfo> {
        let info = Self::parse_url(url)?;
        info!(
            "Synthetic source connected ({}x{} @ {:?}fps)",
            info.width, info.height, info.fps
        );
        self.info = Some(info.clone());
        Ok(info)
    }

    fn next_frame(&mut self, _timeout: Duration) -> Option<Frame> {
        let info = self.info.as_ref()?;
        let image = self.render(info);

        let frame_id = self.frame_counter;
        self.frame_counter += 1;
        trace!("Generated synthetic frame {}", frame_id);

        Some(Frame::new(frame_id, SystemTime::now(), image))
    }

    fn disconnect(&mut self) {
        self.info = None;
    }

    fn is_connected(&self) -> bool {
        self.info.is_some()
    }

    fn stream_info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }
}
