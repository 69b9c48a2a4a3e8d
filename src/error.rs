use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Rejected schedule grids
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule must be empty or 7x24, got {days} days")]
    DayCount { days: usize },

    #[error("schedule day {day} has {hours} hours, expected 24")]
    HourCount { day: usize, hours: usize },

    #[error("hour {hour} is out of range 0..24")]
    HourOutOfRange { hour: u32 },
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unsupported stream url '{url}'")]
    UnsupportedUrl { url: String },

    #[error("Failed to connect to stream: {details}")]
    Connect { details: String },

    #[error("Capture stream error: {details}")]
    Stream { details: String },

    /// The connection is still being set up; retry to keep waiting
    #[error("Stream is still starting")]
    Starting,
}

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Output folder '{path}' is not writable: {source}")]
    Folder {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create writer for {path} ({width}x{height} @ {fps:.2}fps): {details}")]
    WriterCreation {
        path: String,
        width: u32,
        height: u32,
        fps: f64,
        details: String,
    },

    #[error("Failed to write frame: {details}")]
    Write { details: String },

    #[error("Container '{container}' is not available in this build")]
    UnsupportedContainer { container: String },
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Invalid motion parameter: {details}")]
    InvalidParameter { details: String },
}

impl IpcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IpcamError>;
