//! Error types for the operations engine.

use std::path::PathBuf;

use thiserror::Error;

use remotefm_core::BackendError;

use crate::config::EngineConfigBuilderError;

/// Errors surfaced by the engine outside of step execution.
///
/// Step failures are not errors at this level: they end a batch and are
/// reported through [`BatchOutcome`](crate::BatchOutcome).
#[derive(Debug, Error)]
pub enum OpsError {
    /// A panel already has a batch running.
    #[error("Another operation is already running")]
    BatchInProgress,

    /// The diagnostic snapshot could not be read or written.
    #[error("Snapshot I/O error at {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The diagnostic snapshot is not valid JSON.
    #[error("Malformed snapshot at {path}: {source}")]
    SnapshotFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A backend call made outside a batch failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl OpsError {
    /// Create a snapshot I/O error with path context.
    pub fn snapshot(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Snapshot {
            path: path.into(),
            source,
        }
    }
}

impl From<EngineConfigBuilderError> for OpsError {
    fn from(err: EngineConfigBuilderError) -> Self {
        Self::InvalidConfig {
            message: err.to_string(),
        }
    }
}
