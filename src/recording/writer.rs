use crate::error::{RecordingError, Result};
use crate::frame::Frame;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output container for recorded segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// Concatenated JPEG frames, written without external libraries
    Mjpeg,
    /// H.264 in MP4 through GStreamer
    Mp4,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mjpeg => "mjpeg",
            Container::Mp4 => "mp4",
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        if cfg!(all(target_os = "linux", feature = "video_encoding")) {
            Container::Mp4
        } else {
            Container::Mjpeg
        }
    }
}

/// An open output file for one segment
pub trait VideoWriter: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the file
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Creates writers for a given resolution and frame rate
pub trait WriterFactory: Send {
    fn create(&self, path: &Path, width: u32, height: u32, fps: f64) -> Result<Box<dyn VideoWriter>>;

    /// File extension without the dot
    fn extension(&self) -> &'static str;
}

/// Writer factory for the configured container
pub fn writer_factory_for(container: Container) -> Result<Box<dyn WriterFactory>> {
    match container {
        Container::Mjpeg => Ok(Box::new(MjpegWriterFactory::default())),
        #[cfg(all(target_os = "linux", feature = "video_encoding"))]
        Container::Mp4 => Ok(Box::new(super::gst::Mp4WriterFactory::new())),
        #[cfg(not(all(target_os = "linux", feature = "video_encoding")))]
        Container::Mp4 => Err(RecordingError::UnsupportedContainer {
            container: "mp4".to_string(),
        }
        .into()),
    }
}

/// Motion JPEG stream writer
pub struct MjpegWriter {
    path: PathBuf,
    out: BufWriter<File>,
    width: u32,
    height: u32,
    quality: u8,
}

impl MjpegWriter {
    pub fn create(path: &Path, width: u32, height: u32, quality: u8) -> Result<Self> {
        let file = File::create(path).map_err(|e| RecordingError::WriterCreation {
            path: path.display().to_string(),
            width,
            height,
            fps: 0.0,
            details: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            width,
            height,
            quality,
        })
    }
}

impl VideoWriter for MjpegWriter {
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

        let mut encoder = JpegEncoder::new_with_quality(&mut self.out, self.quality);
        encoder
            .encode_image(&frame.image)
            .map_err(|e| RecordingError::Write {
                details: e.to_string(),
            })?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        debug!("Closed MJPEG file {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MjpegWriterFactory {
    pub quality: u8,
}

impl Default for MjpegWriterFactory {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

impl WriterFactory for MjpegWriterFactory {
    fn create(&self, path: &Path, width: u32, height: u32, fps: f64) -> Result<Box<dyn VideoWriter>> {
        if width == 0 || height == 0 {
            return Err(RecordingError::WriterCreation {
                path: path.display().to_string(),
                width,
                height,
                fps,
                details: "empty frame size".to_string(),
            }
            .into());
        }
        Ok(Box::new(MjpegWriter::create(path, width, height, self.quality)?))
    }

    fn extension(&self) -> &'static str {
        Container::Mjpeg.extension()
    }
}
