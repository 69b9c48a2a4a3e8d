use super::sensitivity::{MotionParams, MotionSensitivity};
use crate::error::{AnalyzerError, Result};
use crate::frame::Frame;

use image::{imageops::FilterType, GrayImage, Luma};
use imageproc::{
    contrast::threshold,
    distance_transform::Norm,
    morphology::erode,
    region_labelling::{connected_components, Connectivity},
};
use serde::Serialize;
use tracing::{debug, info, trace};

const HISTORY_LEN: usize = 3;

/// Bounding box of detected motion in full-resolution pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MotionRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl MotionRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scale from analysis resolution back to frame resolution, clamped to the frame
    fn rescale(&self, scale_x: f64, scale_y: f64, max_width: u32, max_height: u32) -> Self {
        let x0 = ((self.x as f64 * scale_x).floor() as u32).min(max_width);
        let y0 = ((self.y as f64 * scale_y).floor() as u32).min(max_height);
        let x1 = (((self.x + self.width) as f64 * scale_x).ceil() as u32).min(max_width);
        let y1 = (((self.y + self.height) as f64 * scale_y).ceil() as u32).min(max_height);

        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Outcome of analysing one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MotionResult {
    /// Both the change count and the box area passed their thresholds
    pub motion: bool,
    /// Zero-area unless `motion` is true
    pub rect: MotionRect,
    /// Changed pixels after erosion, in full-resolution units
    pub changes: usize,
    /// Connected changed regions
    pub regions: usize,
    /// Share of the analysed frame that changed, 0.0 to 1.0
    pub changed_fraction: f64,
}

/// Three-frame differencing motion detector.
///
/// Grey frames are kept in a fixed ring of three slots addressed by a rotating
/// index. Each analysed frame becomes "next", the old "next" becomes "current"
/// and the old "current" becomes "prev"; current and prev are then compared.
pub struct MotionDetector {
    params: Option<MotionParams>,
    frame_scalar: Option<f64>,
    history: [Option<GrayImage>; HISTORY_LEN],
    newest: usize,
    last: MotionResult,
    frames_analyzed: u64,
}

impl MotionDetector {
    /// Create a detector from a sensitivity preset.
    ///
    /// `frame_scalar` is only used when `shrink_frames` is set.
    pub fn new(sensitivity: MotionSensitivity, shrink_frames: bool, frame_scalar: f64) -> Result<Self> {
        let scalar = if shrink_frames { Some(frame_scalar) } else { None };

        match sensitivity.params() {
            Some(params) => {
                info!(
                    "Initializing motion detector ({:?}, shrink: {:?})",
                    sensitivity, scalar
                );
                Self::with_params(params, scalar)
            }
            None => {
                debug!("Motion detector disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Detector that never analyses anything
    pub fn disabled() -> Self {
        Self {
            params: None,
            frame_scalar: None,
            history: Default::default(),
            newest: HISTORY_LEN - 1,
            last: MotionResult::default(),
            frames_analyzed: 0,
        }
    }

    /// Create a detector with explicit thresholds
    pub fn with_params(params: MotionParams, frame_scalar: Option<f64>) -> Result<Self> {
        if let Some(scalar) = frame_scalar {
            if !(scalar > 0.0 && scalar <= 1.0) {
                return Err(AnalyzerError::InvalidParameter {
                    details: format!("frame scalar {} must be in (0, 1]", scalar),
                }
                .into());
            }
        }

        Ok(Self {
            params: Some(params),
            frame_scalar: frame_scalar.filter(|s| *s < 1.0),
            ..Self::disabled()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<&MotionParams> {
        self.params.as_ref()
    }

    /// Result of the most recent analysis
    pub fn last_result(&self) -> &MotionResult {
        &self.last
    }

    /// Number of grey frames currently held
    pub fn history_len(&self) -> usize {
        self.history.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Forget all history, e.g. after a reconnect
    pub fn reset(&mut self) {
        self.history = Default::default();
        self.newest = HISTORY_LEN - 1;
        self.last = MotionResult::default();
    }

    /// Push a frame into the history and analyse the current/prev pair.
    ///
    /// When disabled the history is left untouched and an empty result is returned.
    pub fn process(&mut self, frame: &Frame) -> MotionResult {
        if self.params.is_none() {
            return MotionResult::default();
        }

        let gray = self.prepare(frame);
        self.push_history(gray);
        self.frames_analyzed += 1;

        let result = match (self.slot(2), self.slot(1)) {
            (Some(prev), Some(current)) => {
                let diff = absolute_difference(prev, current);
                self.analyze_difference(&diff, frame.dimensions())
            }
            _ => {
                trace!("Motion history filling ({} of {})", self.history_len(), HISTORY_LEN);
                MotionResult::default()
            }
        };

        self.last = result.clone();
        result
    }

    /// Threshold, erode and measure a difference image.
    ///
    /// `full_dims` is the resolution the result is reported in; the difference
    /// image may be smaller when frames are shrunk.
    pub fn analyze_difference(&self, diff: &GrayImage, full_dims: (u32, u32)) -> MotionResult {
        let Some(params) = self.params.as_ref() else {
            return MotionResult::default();
        };

        let (width, height) = diff.dimensions();
        if width == 0 || height == 0 {
            return MotionResult::default();
        }

        let mut mask = threshold(diff, params.pixel_threshold);
        if let Some(radius) = params.erosion_radius {
            mask = erode(&mask, Norm::LInf, radius);
        }

        let scale_x = full_dims.0 as f64 / width as f64;
        let scale_y = full_dims.1 as f64 / height as f64;

        let changed = mask.pixels().filter(|p| p[0] > 0).count();
        let changes = (changed as f64 * scale_x * scale_y).round() as usize;
        if changed == 0 {
            return MotionResult::default();
        }

        let changed_fraction = changed as f64 / (width as u64 * height as u64) as f64;
        if changed_fraction > params.max_changed_fraction {
            debug!(
                "{:.1}% of the frame changed (limit {:.1}%), treating as global change",
                changed_fraction * 100.0,
                params.max_changed_fraction * 100.0
            );
            return MotionResult {
                changes,
                changed_fraction,
                ..MotionResult::default()
            };
        }

        let (bounds, regions) = component_bounds(&mask);
        let rect = bounds.rescale(scale_x, scale_y, full_dims.0, full_dims.1);

        let motion = changes > params.image_changes_threshold && rect.area() > params.min_area;
        debug!(
            "Motion analysis: changes={} regions={} rect={:?} area={} motion={}",
            changes,
            regions,
            rect,
            rect.area(),
            motion
        );

        MotionResult {
            motion,
            rect: if motion { rect } else { MotionRect::default() },
            changes,
            regions,
            changed_fraction,
        }
    }

    fn prepare(&self, frame: &Frame) -> GrayImage {
        let gray = frame.to_gray();
        match self.frame_scalar {
            Some(scalar) => {
                let width = ((frame.width() as f64 * scalar).round() as u32).max(1);
                let height = ((frame.height() as f64 * scalar).round() as u32).max(1);
                image::imageops::resize(&gray, width, height, FilterType::Triangle)
            }
            None => gray,
        }
    }

    fn push_history(&mut self, gray: GrayImage) {
        let size_changed = self.history[self.newest]
            .as_ref()
            .is_some_and(|newest| newest.dimensions() != gray.dimensions());
        if size_changed {
            debug!("Frame size changed, resetting motion history");
            self.reset();
        }

        self.newest = (self.newest + 1) % HISTORY_LEN;
        self.history[self.newest] = Some(gray);
    }

    /// Slot `age` frames older than the newest (0 = next, 1 = current, 2 = prev)
    fn slot(&self, age: usize) -> Option<&GrayImage> {
        self.history[(self.newest + HISTORY_LEN - age) % HISTORY_LEN].as_ref()
    }
}

/// Per-pixel absolute difference of two equally sized grey images
pub fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    let mut diff = GrayImage::new(width, height);

    for (x, y, pixel) in a.enumerate_pixels() {
        if let Some(other) = b.get_pixel_checked(x, y) {
            diff.put_pixel(x, y, Luma([pixel[0].abs_diff(other[0])]));
        }
    }

    diff
}

/// Union of the bounding boxes of all connected changed regions, plus the region count
fn component_bounds(mask: &GrayImage) -> (MotionRect, usize) {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut regions = 0u32;

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        regions = regions.max(label);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    if regions == 0 {
        return (MotionRect::default(), 0);
    }

    (
        MotionRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        },
        regions as usize,
    )
}
