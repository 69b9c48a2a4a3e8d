#[cfg(all(target_os = "linux", feature = "camera"))]
mod gst;
mod source;
mod synthetic;
#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gst::GstCaptureSource;
pub use source::{redact_url, CaptureSource, StreamInfo};
pub use synthetic::{SyntheticSource, SYNTHETIC_SCHEME};

use crate::error::{CaptureError, Result};
use crate::frame::Frame;
use std::time::Duration;

/// Pick a capture implementation for a stream url
pub fn source_for_url(url: &str) -> Box<dyn CaptureSource> {
    if url.starts_with(SYNTHETIC_SCHEME) {
        return Box::new(SyntheticSource::new());
    }

    #[cfg(all(target_os = "linux", feature = "camera"))]
    {
        Box::new(GstCaptureSource::new())
    }

    #[cfg(not(all(target_os = "linux", feature = "camera")))]
    {
        tracing::warn!(
            "Stream {} needs the camera feature; it will stay disconnected",
            redact_url(url)
        );
        Box::new(UnavailableSource)
    }
}

/// Stand-in for builds without a network capture backend; every connect fails
pub struct UnavailableSource;

impl CaptureSource for UnavailableSource {
    fn connect(&mut self, url: &str, _timeout: Duration) -> Result<StreamInfo> {
        Err(CaptureError::UnsupportedUrl {
            url: redact_url(url),
        }
        .into())
    }

    fn next_frame(&mut self, _timeout: Duration) -> Option<Frame> {
        None
    }

    fn disconnect(&mut self) {}

    fn is_connected(&self) -> bool {
        false
    }

    fn stream_info(&self) -> Option<&StreamInfo> {
        None
    }
}
