use crate::frame::Frame;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

#[derive(Debug, Default)]
struct FramePair {
    raw: Option<Frame>,
    annotated: Option<Frame>,
}

/// Latest-frame store shared between the stream worker and readers.
///
/// The worker is the only writer. Readers always receive their own copy, taken
/// under the read lock, so a reader sees either the previous or the new frame.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: RwLock<FramePair>,
    updated: AtomicBool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new raw frame and raise the updated flag
    pub fn update_raw(&self, frame: Frame) {
        trace!("Storing raw frame {} ({}x{})", frame.id, frame.width(), frame.height());
        {
            let mut frames = self.frames.write();
            // Annotated frame from a different resolution would break the size invariant
            if frames
                .annotated
                .as_ref()
                .is_some_and(|a| a.dimensions() != frame.dimensions())
            {
                frames.annotated = None;
            }
            frames.raw = Some(frame);
        }
        self.updated.store(true, Ordering::Release);
    }

    /// Store the motion overlay variant
    pub fn update_annotated(&self, frame: Frame) {
        self.frames.write().annotated = Some(frame);
    }

    /// Drop the annotated variant, e.g. when motion detection goes inactive
    pub fn clear_annotated(&self) {
        self.frames.write().annotated = None;
    }

    /// Copy of the requested variant, falling back to raw when no annotated frame exists
    pub fn current_frame(&self, want_annotated: bool) -> Option<Frame> {
        let frames = self.frames.read();
        if want_annotated {
            if let Some(annotated) = frames.annotated.as_ref() {
                return Some(annotated.clone());
            }
        }
        frames.raw.clone()
    }

    pub fn has_annotated(&self) -> bool {
        self.frames.read().annotated.is_some()
    }

    /// Aspect ratio with width and height of the last raw frame, or None before the first frame
    pub fn aspect_ratio_and_size(&self) -> Option<(f64, u32, u32)> {
        let frames = self.frames.read();
        let (width, height) = frames.raw.as_ref()?.dimensions();
        if height == 0 {
            return None;
        }
        Some((width as f64 / height as f64, width, height))
    }

    /// Return and clear the "new frame since last check" flag
    pub fn consume_updated_flag(&self) -> bool {
        self.updated.swap(false, Ordering::AcqRel)
    }
}
