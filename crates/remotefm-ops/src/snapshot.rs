//! Diagnostic snapshot of an interrupted batch.
//!
//! When a batch stops early the steps that did not complete are written to
//! a single JSON file, overwritten each time. It is never read back to
//! resume work.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::OpsError;
use crate::operation::PlannedOperation;

/// File name of the snapshot inside the data directory.
pub const SNAPSHOT_FILE_NAME: &str = "last_batch.json";

/// The steps left over from an interrupted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    /// Unix timestamp of the stop, in seconds.
    pub ts: i64,
    /// Plan title, e.g. "Moving...".
    pub title: String,
    /// The step that failed or was about to run, and everything after it.
    pub remaining: Vec<PlannedOperation>,
}

impl BatchSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(title: impl Into<String>, remaining: Vec<PlannedOperation>) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp(),
            title: title.into(),
            remaining,
        }
    }

    /// Write the snapshot, replacing any previous one.
    pub fn write_to(&self, path: &Path) -> Result<(), OpsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| OpsError::snapshot(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| OpsError::SnapshotFormat {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| OpsError::snapshot(path, e))
    }

    /// Read a snapshot back, for inspection.
    pub fn load(path: &Path) -> Result<Self, OpsError> {
        let data = fs::read_to_string(path).map_err(|e| OpsError::snapshot(path, e))?;
        serde_json::from_str(&data).map_err(|e| OpsError::SnapshotFormat {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Default snapshot location inside the user data directory.
pub fn default_snapshot_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("remotefm").join(SNAPSHOT_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parent_and_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("state").join(SNAPSHOT_FILE_NAME);

        BatchSnapshot::new("Copying...", vec![PlannedOperation::delete("/a", false)])
            .write_to(&path)
            .unwrap();
        let second = BatchSnapshot::new(
            "Moving...",
            vec![PlannedOperation::move_to("/x", "/y/x")],
        );
        second.write_to(&path).unwrap();

        let loaded = BatchSnapshot::load(&path).unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = BatchSnapshot {
            ts: 1_700_000_000,
            title: "Moving...".to_string(),
            remaining: vec![PlannedOperation::move_to("/a", "/b/a")],
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["ts"], 1_700_000_000);
        assert_eq!(value["remaining"][0]["op"], "move");
        assert_eq!(value["remaining"][0]["dst"], "/b/a");
    }

    #[test]
    fn test_load_malformed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(SNAPSHOT_FILE_NAME);
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            BatchSnapshot::load(&path),
            Err(OpsError::SnapshotFormat { .. })
        ));
    }
}
