use crate::error::Result;
use crate::frame::Frame;
use std::time::Duration;

/// Properties of a connected stream, queried once after connect
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Native frame rate, when the stream advertises one
    pub fps: Option<f64>,
}

/// A live video connection producing decoded frames.
///
/// Implementations must not panic on network trouble: `connect` reports
/// failures as errors and `next_frame` returns None on a hiccup while keeping
/// the connection open.
pub trait CaptureSource: Send {
    /// Open the stream, blocking for at most `timeout`.
    ///
    /// A source that needs longer to produce its first frame returns
    /// `CaptureError::Starting` and resumes the same attempt on the next call.
    fn connect(&mut self, url: &str, timeout: Duration) -> Result<StreamInfo>;

    /// Blocking read of the next frame, bounded by `timeout`
    fn next_frame(&mut self, timeout: Duration) -> Option<Frame>;

    /// Release the connection. Safe to call when not connected.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Cached stream properties from the last successful connect
    fn stream_info(&self) -> Option<&StreamInfo>;

    fn native_frame_rate(&self) -> Option<f64> {
        self.stream_info().and_then(|info| info.fps)
    }

    fn frame_size(&self) -> Option<(u32, u32)> {
        self.stream_info().map(|info| (info.width, info.height))
    }
}

/// Strip credentials from a stream url before it is logged
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let host_start = rest.find('/').unwrap_or(rest.len());
    match rest[..host_start].rfind('@') {
        Some(at) => format!("{}://***@{}", &url[..scheme_end], &rest[at + 1..]),
        None => url.to_string(),
    }
}
