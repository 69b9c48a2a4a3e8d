//! Segment recording: writer backends, file naming, metadata sidecars and
//! the controller that rotates files inside a recording session.

mod controller;
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
mod gst;
mod metadata;
mod naming;
mod writer;


pub use controller::{should_record, RecordingController, RecordingFlags, RecordingSettings};
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
pub use gst::{GstMp4Writer, Mp4WriterFactory};
pub use metadata::SegmentMetadata;
pub use naming::{resolve_timezone, segment_file_name, unique_segment_path};
pub use writer::{
    writer_factory_for, Container, MjpegWriter, MjpegWriterFactory, VideoWriter, WriterFactory,
};
