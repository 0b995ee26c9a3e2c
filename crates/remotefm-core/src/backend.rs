//! The remote filesystem backend contract.

use std::path::Path;

use tracing::debug;

use crate::entry::{FileStat, RemoteEntry};
use crate::error::{BackendError, BackendResult};

/// Synchronous primitive operations over a remote tree.
///
/// All paths are absolute and '/'-separated. Every call may fail with an
/// opaque error; callers only render it. Primitives with a default body are
/// optional and report [`BackendError::NotSupported`] until implemented.
///
/// Implementations are shared across threads behind an `Arc`, but the engine
/// never issues overlapping requests on one handle.
pub trait RemoteBackend: Send + Sync {
    /// List a directory, directories first then case-insensitive name.
    fn list_directory(&self, path: &str) -> BackendResult<Vec<RemoteEntry>>;

    /// Read a whole file.
    fn read_file(&self, path: &str) -> BackendResult<Vec<u8>>;

    /// Create or replace a file with the given contents.
    fn write_file(&self, path: &str, data: &[u8]) -> BackendResult<()>;

    /// Size and modification time of a path.
    fn stat(&self, path: &str) -> BackendResult<FileStat>;

    /// Download a remote file to a local path.
    fn download(&self, remote_path: &str, local_path: &Path) -> BackendResult<()>;

    /// Upload a local file to a remote path.
    fn upload(&self, local_path: &Path, remote_path: &str) -> BackendResult<()>;

    /// Whether a path exists. Best-effort: absence may be signaled by an error.
    fn exists(&self, _path: &str) -> BackendResult<bool> {
        Err(BackendError::not_supported("exists"))
    }

    /// Whether a path is a directory.
    fn is_directory(&self, _path: &str) -> BackendResult<bool> {
        Err(BackendError::not_supported("is_directory"))
    }

    /// Remove a path, descending into directories when `recursive` is set.
    fn remove(&self, _path: &str, _recursive: bool) -> BackendResult<()> {
        Err(BackendError::not_supported("remove"))
    }

    /// Rename a path in place.
    fn rename(&self, _path: &str, _new_path: &str) -> BackendResult<()> {
        Err(BackendError::not_supported("rename"))
    }

    /// Create a directory. Succeeds if it already exists.
    fn mkdir(&self, _path: &str) -> BackendResult<()> {
        Err(BackendError::not_supported("mkdir"))
    }

    /// Copy a path, whole subtrees when `recursive` is set.
    fn copy(&self, _src: &str, _dst: &str, _recursive: bool) -> BackendResult<()> {
        Err(BackendError::not_supported("copy"))
    }

    /// Move a path. Whole subtrees move in one call.
    fn move_path(&self, _src: &str, _dst: &str) -> BackendResult<()> {
        Err(BackendError::not_supported("move"))
    }
}

/// Probe whether a path exists.
///
/// Uses `exists`; when that fails (unsupported or erroring) falls back to
/// "can it be listed". The fallback reports an existing file as absent and an
/// unlistable directory (e.g. permission denied) as absent too.
pub fn probe_exists(backend: &dyn RemoteBackend, path: &str) -> bool {
    match backend.exists(path) {
        Ok(exists) => exists,
        Err(err) => {
            debug!(path, error = %err, "exists probe failed, falling back to listing");
            backend.list_directory(path).is_ok()
        }
    }
}

/// Probe whether a path is a directory.
///
/// Returns `None` when neither `is_directory` nor a listing attempt gives an
/// answer. Callers pick their own conservative default for that case.
pub fn probe_is_directory(backend: &dyn RemoteBackend, path: &str) -> Option<bool> {
    match backend.is_directory(path) {
        Ok(is_dir) => Some(is_dir),
        Err(err) => {
            debug!(path, error = %err, "is_directory probe failed, falling back to listing");
            backend.list_directory(path).ok().map(|_| true)
        }
    }
}
