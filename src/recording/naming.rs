use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};

/// Resolve configured timezone, falling back to UTC on parse errors
pub fn resolve_timezone(tz_name: &str) -> Tz {
    match tz_name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("Invalid timezone '{}', falling back to UTC", tz_name);
            chrono_tz::UTC
        }
    }
}

/// `<camera>_<YYYYmmdd_HHMMSS_mmm>.<ext>`, which sorts chronologically per camera
pub fn segment_file_name<T: TimeZone>(camera: &str, start: &DateTime<T>, extension: &str) -> String
where
    T::Offset: std::fmt::Display,
{
    format!(
        "{}_{}.{}",
        camera,
        start.format("%Y%m%d_%H%M%S_%3f"),
        extension
    )
}

/// Segment path in `folder` that does not collide with an existing file
pub fn unique_segment_path<T: TimeZone>(
    folder: &Path,
    camera: &str,
    start: &DateTime<T>,
    extension: &str,
) -> PathBuf
where
    T::Offset: std::fmt::Display,
{
    let candidate = folder.join(segment_file_name(camera, start, extension));
    if !candidate.exists() {
        return candidate;
    }

    let stem = format!("{}_{}", camera, start.format("%Y%m%d_%H%M%S_%3f"));
    (1u32..)
        .map(|n| folder.join(format!("{}_{}.{}", stem, n, extension)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_segment_name_format() {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(
            segment_file_name("porch", &start, "mp4"),
            "porch_20240309_070503_042.mp4"
        );
    }

    #[test]
    fn test_names_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 3, 9, 9, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        assert!(segment_file_name("cam", &early, "mjpeg") < segment_file_name("cam", &late, "mjpeg"));
    }

    #[test]
    fn test_timezone_applied_to_name() {
        let tz = resolve_timezone("Asia/Tokyo");
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().with_timezone(&tz);
        assert_eq!(
            segment_file_name("cam", &start, "mp4"),
            "cam_20240101_090000_000.mp4"
        );
        assert_eq!(resolve_timezone("Not/AZone"), chrono_tz::UTC);
    }

    #[test]
    fn test_collision_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();

        let first = unique_segment_path(dir.path(), "cam", &start, "mjpeg");
        std::fs::write(&first, b"x").unwrap();
        let second = unique_segment_path(dir.path(), "cam", &start, "mjpeg");
        std::fs::write(&second, b"x").unwrap();
        let third = unique_segment_path(dir.path(), "cam", &start, "mjpeg");

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("cam_20240309_070503_000_1.mjpeg"));
        assert!(third.to_string_lossy().ends_with("cam_20240309_070503_000_2.mjpeg"));
    }
}
