//! Correspondence Source adapter – the detector's current view of the world.
//!
//! The capture pipeline publishes its detections as a JSON object mapping
//! string-encoded marker IDs to `[x, y, z]` arrays in the detector frame:
//!
//! ```json
//! { "0": [0.012, -0.104, 0.61], "7": [0.2, 0.05, 0.58] }
//! ```
//!
//! [`CorrespondenceSource::read_snapshot`] never fails: a missing, partially
//! written or malformed source is an empty snapshot.  Missing data is normal
//! (the writer may be between frames) and stays quiet; malformed data is
//! logged.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use framebridge_types::{DetectionSnapshot, DetectorId, Point3};
use thiserror::Error;
use tracing::{trace, warn};

/// Why a snapshot could not be read.  Only ever logged.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("detection source unavailable: {0}")]
    Io(#[from] io::Error),

    #[error("detection data is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("detector key {0:?} is not a non-negative integer")]
    BadDetectorId(String),

    #[error("{0} has a non-finite coordinate")]
    NonFinite(DetectorId),
}

/// A provider of point-in-time detection snapshots.
pub trait CorrespondenceSource {
    /// The current detections, or an empty map when none are available.
    fn read_snapshot(&mut self) -> DetectionSnapshot;
}

/// Parse the detector's JSON format.  Any bad entry rejects the whole
/// snapshot.
pub fn parse_snapshot(raw: &str) -> Result<DetectionSnapshot, SourceError> {
    let entries: BTreeMap<String, [f64; 3]> = serde_json::from_str(raw)?;
    entries
        .into_iter()
        .map(|(key, coords)| {
            let id = key
                .trim()
                .parse::<u32>()
                .map(DetectorId)
                .map_err(|_| SourceError::BadDetectorId(key.clone()))?;
            let point = Point3::from_array(coords);
            if !point.is_finite() {
                return Err(SourceError::NonFinite(id));
            }
            Ok((id, point))
        })
        .collect()
}

/// Reads detections from a JSON file rewritten by the capture process.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DetectionSnapshot, SourceError> {
        let raw = std::fs::read_to_string(&self.path)?;
        // A writer truncates before rewriting; an empty file is "between frames".
        if raw.trim().is_empty() {
            return Ok(DetectionSnapshot::new());
        }
        parse_snapshot(&raw)
    }
}

impl CorrespondenceSource for JsonFileSource {
    fn read_snapshot(&mut self) -> DetectionSnapshot {
        match self.load() {
            Ok(snapshot) => snapshot,
            Err(SourceError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "no detection file yet");
                DetectionSnapshot::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable detections");
                DetectionSnapshot::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_format() {
        let snap = parse_snapshot(r#"{"0": [0.1, 0.2, 0.3], "12": [-1, 0, 2.5]}"#).unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[&DetectorId(0)].to_array(), [0.1, 0.2, 0.3]);
        assert_eq!(snap[&DetectorId(12)].to_array(), [-1.0, 0.0, 2.5]);
    }

    #[test]
    fn empty_object_is_empty_snapshot() {
        assert!(parse_snapshot("{}").unwrap().is_empty());
    }

    #[test]
    fn non_numeric_key_is_rejected() {
        let err = parse_snapshot(r#"{"abc": [0, 0, 0]}"#).unwrap_err();
        assert!(matches!(err, SourceError::BadDetectorId(ref k) if k == "abc"));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(
            parse_snapshot(r#"{"1": [0, 0]}"#),
            Err(SourceError::Json(_))
        ));
    }

    #[test]
    fn truncated_json_is_rejected() {
        assert!(parse_snapshot(r#"{"1": [0, 0, "#).is_err());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let mut source = JsonFileSource::new(dir.path().join("output.json"));
        assert!(source.read_snapshot().is_empty());
    }

    #[test]
    fn malformed_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("output.json");
        std::fs::write(&path, "{\"3\": [1.0, 2.0").unwrap();
        let mut source = JsonFileSource::new(&path);
        assert!(source.read_snapshot().is_empty());
    }

    #[test]
    fn empty_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("output.json");
        std::fs::write(&path, "").unwrap();
        assert!(JsonFileSource::new(&path).read_snapshot().is_empty());
    }

    #[test]
    fn each_read_replaces_the_snapshot() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("output.json");
        let mut source = JsonFileSource::new(&path);

        std::fs::write(&path, r#"{"1": [1, 1, 1], "2": [2, 2, 2]}"#).unwrap();
        assert_eq!(source.read_snapshot().len(), 2);

        std::fs::write(&path, r#"{"5": [5, 5, 5]}"#).unwrap();
        let snap = source.read_snapshot();
        assert_eq!(snap.keys().copied().collect::<Vec<_>>(), vec![DetectorId(5)]);
    }
}
