//! Remote entry types.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One entry of a remote directory listing.
///
/// Produced fresh by every listing call; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Entry name (last path component).
    pub name: CompactString,
    /// Absolute '/'-separated path.
    pub path: String,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Modification time in unix seconds (0 if unknown).
    pub modified: i64,
    /// Raw mode bits as reported by the backend.
    pub mode: u32,
}

impl RemoteEntry {
    /// Create a file entry.
    pub fn file(name: impl Into<CompactString>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            size,
            modified: 0,
            mode: 0,
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<CompactString>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            size: 0,
            modified: 0,
            mode: 0,
        }
    }

    /// Set the modification time.
    pub fn with_modified(mut self, modified: i64) -> Self {
        self.modified = modified;
        self
    }

    /// Set the mode bits.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }
}

/// Result of a `stat` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Size in bytes.
    pub size: u64,
    /// Modification time in unix seconds.
    pub modified: i64,
}

impl FileStat {
    /// Create a new stat result.
    pub fn new(size: u64, modified: i64) -> Self {
        Self { size, modified }
    }
}
