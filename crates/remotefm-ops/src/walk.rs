//! Source-side tree walks for uploads and downloads.
//!
//! Both walks yield a directory strictly before anything inside it, which
//! lets the plan builder emit directory creation ahead of file steps.

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, warn};

use remotefm_core::{path, RemoteBackend};

/// One entry below a walked root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full path of the entry (local or remote, depending on the walk).
    pub path: String,
    /// Path relative to the walk root, '/'-separated.
    pub relative: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Walk a local directory, excluding the root itself.
///
/// Children are visited in name order; unreadable entries are skipped.
pub fn local_walk(root: &Path) -> Vec<WalkEntry> {
    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false)
        .min_depth(1);

    let mut entries = Vec::new();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping unreadable local entry");
                continue;
            }
        };

        let full: PathBuf = entry.path();
        let Ok(relative) = full.strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        entries.push(WalkEntry {
            path: full.to_string_lossy().into_owned(),
            relative,
            is_dir: entry.file_type().is_dir(),
        });
    }
    entries
}

/// Walk a remote directory depth-first, excluding the root itself.
///
/// Subdirectories that cannot be listed contribute nothing below them.
pub fn remote_walk(backend: &dyn RemoteBackend, root: &str) -> Vec<WalkEntry> {
    let mut entries = Vec::new();
    walk_remote_into(backend, path::clean(root), "", &mut entries);
    entries
}

fn walk_remote_into(
    backend: &dyn RemoteBackend,
    current: &str,
    relative: &str,
    out: &mut Vec<WalkEntry>,
) {
    let listing = match backend.list_directory(current) {
        Ok(listing) => listing,
        Err(err) => {
            debug!(path = current, error = %err, "skipping unlistable remote directory");
            return;
        }
    };

    for entry in listing {
        let entry_relative = if relative.is_empty() {
            entry.name.to_string()
        } else {
            format!("{relative}/{}", entry.name)
        };
        let entry_path = path::clean(&entry.path).to_string();

        out.push(WalkEntry {
            path: entry_path.clone(),
            relative: entry_relative.clone(),
            is_dir: entry.is_directory,
        });
        if entry.is_directory {
            walk_remote_into(backend, &entry_path, &entry_relative, out);
        }
    }
}
