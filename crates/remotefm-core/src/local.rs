//! A local directory presented as a remote tree.
//!
//! Remote "/" maps to the configured root; paths never escape it.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use compact_str::CompactString;

use crate::backend::RemoteBackend;
use crate::entry::{FileStat, RemoteEntry};
use crate::error::{BackendError, BackendResult};
use crate::listing::sort_entries;
use crate::path;

/// Backend over a rooted local directory.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The local root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a remote path onto the local root.
    fn resolve(&self, remote: &str) -> BackendResult<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(remote.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(BackendError::permission_denied(remote)),
            }
        }
        Ok(resolved)
    }
}

fn modified_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &fs::Metadata) -> u32 {
    0
}

/// Recursively copy a directory.
fn copy_dir_recursive(source: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir(dest)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&path, &dest_path)?;
        } else {
            fs::copy(&path, &dest_path)?;
        }
    }

    Ok(())
}

impl RemoteBackend for LocalBackend {
    fn list_directory(&self, dir_path: &str) -> BackendResult<Vec<RemoteEntry>> {
        let local = self.resolve(dir_path)?;
        let read_dir = fs::read_dir(&local).map_err(|e| BackendError::io(dir_path, e))?;
        let dir = path::clean(dir_path);

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| BackendError::io(dir_path, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            entries.push(RemoteEntry {
                path: path::join(dir, &name),
                name: CompactString::from(name),
                is_directory: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified: modified_secs(&metadata),
                mode: mode_bits(&metadata),
            });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn read_file(&self, file_path: &str) -> BackendResult<Vec<u8>> {
        fs::read(self.resolve(file_path)?).map_err(|e| BackendError::io(file_path, e))
    }

    fn write_file(&self, file_path: &str, data: &[u8]) -> BackendResult<()> {
        fs::write(self.resolve(file_path)?, data).map_err(|e| BackendError::io(file_path, e))
    }

    fn stat(&self, node_path: &str) -> BackendResult<FileStat> {
        let metadata =
            fs::metadata(self.resolve(node_path)?).map_err(|e| BackendError::io(node_path, e))?;
        Ok(FileStat::new(metadata.len(), modified_secs(&metadata)))
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> BackendResult<()> {
        let source = self.resolve(remote_path)?;
        fs::copy(&source, local_path)
            .map(|_| ())
            .map_err(|e| BackendError::io(remote_path, e))
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> BackendResult<()> {
        let target = self.resolve(remote_path)?;
        fs::copy(local_path, &target)
            .map(|_| ())
            .map_err(|e| BackendError::io(remote_path, e))
    }

    fn exists(&self, node_path: &str) -> BackendResult<bool> {
        Ok(fs::symlink_metadata(self.resolve(node_path)?).is_ok())
    }

    fn is_directory(&self, node_path: &str) -> BackendResult<bool> {
        fs::metadata(self.resolve(node_path)?)
            .map(|m| m.is_dir())
            .map_err(|e| BackendError::io(node_path, e))
    }

    fn remove(&self, node_path: &str, recursive: bool) -> BackendResult<()> {
        if path::clean(node_path) == "/" {
            return Err(BackendError::permission_denied(node_path));
        }
        let local = self.resolve(node_path)?;
        let metadata = fs::symlink_metadata(&local).map_err(|e| BackendError::io(node_path, e))?;
        let result = if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(&local)
            } else {
                fs::remove_dir(&local)
            }
        } else {
            fs::remove_file(&local)
        };
        result.map_err(|e| BackendError::io(node_path, e))
    }

    fn rename(&self, node_path: &str, new_path: &str) -> BackendResult<()> {
        self.move_path(node_path, new_path)
    }

    fn mkdir(&self, dir_path: &str) -> BackendResult<()> {
        let local = self.resolve(dir_path)?;
        match fs::create_dir(&local) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && local.is_dir() => Ok(()),
            Err(e) => Err(BackendError::io(dir_path, e)),
        }
    }

    fn copy(&self, src: &str, dst: &str, recursive: bool) -> BackendResult<()> {
        let (source, target) = (self.resolve(src)?, self.resolve(dst)?);
        if target.exists() {
            return Err(BackendError::already_exists(dst));
        }
        if source.is_dir() {
            if !recursive {
                return Err(BackendError::other(format!(
                    "-r not specified; omitting directory '{src}'"
                )));
            }
            if target.starts_with(&source) {
                return Err(BackendError::other(format!(
                    "Cannot copy '{src}' into itself"
                )));
            }
            copy_dir_recursive(&source, &target).map_err(|e| BackendError::io(dst, e))
        } else {
            fs::copy(&source, &target)
                .map(|_| ())
                .map_err(|e| BackendError::io(src, e))
        }
    }

    fn move_path(&self, src: &str, dst: &str) -> BackendResult<()> {
        let (source, target) = (self.resolve(src)?, self.resolve(dst)?);
        if target.exists() {
            return Err(BackendError::already_exists(dst));
        }
        fs::rename(&source, &target).map_err(|e| BackendError::io(src, e))
    }
}
