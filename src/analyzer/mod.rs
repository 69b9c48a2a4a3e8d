mod motion;
mod overlay;
mod sensitivity;
#[cfg(test)]
mod tests;

pub use motion::{absolute_difference, MotionDetector, MotionRect, MotionResult};
pub use overlay::annotate;
pub use sensitivity::{MotionParams, MotionSensitivity};
