//! Error types for backend operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a remote backend.
///
/// The engine treats these as opaque: only the rendered message reaches the
/// caller, and [`ErrorCategory`] inspects that text for presentation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Path not found.
    #[error("No such file or directory: {path}")]
    NotFound { path: String },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// Target already exists.
    #[error("File exists: {path}")]
    AlreadyExists { path: String },

    /// The backend does not implement this primitive.
    #[error("Operation not supported: {operation}")]
    NotSupported { operation: &'static str },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl BackendError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a permission-denied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    /// Create an already-exists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Create a not-supported error.
    pub fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    /// Create a free-form error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Result alias for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Advisory classification of raw error text for presentation.
///
/// Purely cosmetic: nothing in the engine branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    PermissionDenied,
    QuotaExceeded,
    ReadOnly,
    Other,
}

impl ErrorCategory {
    /// Classify raw error text by case-insensitive substring matching.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();

        if lower.contains("permission denied") || lower.contains("access is denied") {
            Self::PermissionDenied
        } else if lower.contains("no space left on device")
            || lower.contains("disk quota exceeded")
            || lower.contains("quota exceeded")
        {
            Self::QuotaExceeded
        } else if lower.contains("read-only file system") {
            Self::ReadOnly
        } else {
            Self::Other
        }
    }

    /// Short title for an error dialog or status line.
    pub fn title(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Permission denied",
            Self::QuotaExceeded => "Disk full / quota exceeded",
            Self::ReadOnly => "Read-only file system",
            Self::Other => "Error",
        }
    }

    /// One-line hint shown next to the raw error text.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "You lack the permissions this operation needs (check chmod/chown or the target directory)."
            }
            Self::QuotaExceeded => "The target has no free space left or the quota limit was reached.",
            Self::ReadOnly => "The target file system is read-only; writes are not possible.",
            Self::Other => "The operation failed. See details below.",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}
