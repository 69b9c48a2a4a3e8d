use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Description of a closed segment, written next to it as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentMetadata {
    pub camera: String,
    pub session_id: Uuid,
    /// Position of the segment within its recording session, starting at 1
    pub sequence: u32,
    pub path: PathBuf,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub frame_count: u64,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

pub(crate) fn sidecar_path(segment: &Path) -> PathBuf {
    segment.with_extension("json")
}

pub(crate) fn save_metadata(metadata: &SegmentMetadata) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(metadata)?;
    let path = sidecar_path(&metadata.path);
    std::fs::write(&path, json)?;
    debug!("Saved segment metadata to {}", path.display());
    Ok(path)
}
