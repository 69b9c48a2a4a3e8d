use serde::{Deserialize, Serialize};

/// Motion detector sensitivity presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSensitivity {
    /// Detection disabled, no analysis cost
    #[default]
    Off,
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Thresholds used by the detector.
///
/// Counts and areas are in full-resolution pixels, independent of frame shrinking.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionParams {
    /// Per-pixel difference above which a pixel counts as changed
    pub pixel_threshold: u8,
    /// Share of changed pixels above which the change is treated as global
    /// (lighting, exposure or camera shift) rather than motion
    pub max_changed_fraction: f64,
    /// Changed pixels required before motion is reported
    pub image_changes_threshold: usize,
    /// Minimum bounding box area for motion
    pub min_area: u64,
    /// L-infinity erosion radius applied to the change mask
    pub erosion_radius: Option<u8>,
}

impl MotionSensitivity {
    /// Threshold preset for this sensitivity, or None when detection is off
    pub fn params(&self) -> Option<MotionParams> {
        let params = match self {
            MotionSensitivity::Off => return None,
            MotionSensitivity::Low => MotionParams {
                pixel_threshold: 50,
                max_changed_fraction: 0.6,
                image_changes_threshold: 400,
                min_area: 2500,
                erosion_radius: Some(2),
            },
            MotionSensitivity::Medium => MotionParams {
                pixel_threshold: 35,
                max_changed_fraction: 0.7,
                image_changes_threshold: 200,
                min_area: 1200,
                erosion_radius: Some(1),
            },
            MotionSensitivity::High => MotionParams {
                pixel_threshold: 25,
                max_changed_fraction: 0.8,
                image_changes_threshold: 100,
                min_area: 600,
                erosion_radius: Some(1),
            },
            MotionSensitivity::VeryHigh => MotionParams {
                pixel_threshold: 15,
                max_changed_fraction: 0.9,
                image_changes_threshold: 40,
                min_area: 200,
                erosion_radius: None,
            },
        };
        Some(params)
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, MotionSensitivity::Off)
    }
}
