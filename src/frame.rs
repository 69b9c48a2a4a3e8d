use image::{GrayImage, RgbImage};
use std::time::SystemTime;

/// A decoded RGB frame grabbed from a stream.
///
/// Frames are plain values. Handing one to another component moves or clones it;
/// pixel storage is never shared between the worker and readers.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Sequence number assigned by the capture source
    pub id: u64,
    /// Wall-clock time the frame was grabbed
    pub timestamp: SystemTime,
    /// Packed RGB8 pixels
    pub image: RgbImage,
}

impl Frame {
    pub fn new(id: u64, timestamp: SystemTime, image: RgbImage) -> Self {
        Self {
            id,
            timestamp,
            image,
        }
    }

    /// Build a frame from packed RGB8 bytes, returning None if the length does not match
    pub fn from_rgb(id: u64, timestamp: SystemTime, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(|image| Self::new(id, timestamp, image))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Luma conversion used by the motion detector
    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_from_rgb_validates_length() {
        let ok = Frame::from_rgb(1, SystemTime::now(), 4, 2, vec![0u8; 4 * 2 * 3]);
        assert!(ok.is_some());
        let frame = ok.unwrap();
        assert_eq!(frame.dimensions(), (4, 2));

        assert!(Frame::from_rgb(2, SystemTime::now(), 4, 2, vec![0u8; 10]).is_none());
    }

    #[test]
    fn test_gray_conversion_preserves_size() {
        let image = RgbImage::from_pixel(8, 6, Rgb([255, 255, 255]));
        let frame = Frame::new(7, SystemTime::now(), image);
        let gray = frame.to_gray();

        assert_eq!(gray.dimensions(), (8, 6));
        assert!(gray.pixels().all(|p| p[0] == 255));
    }
}
