//! In-memory backend.
//!
//! Holds a whole tree in a `BTreeMap` keyed by absolute path. Used by tests
//! and demos; it also keeps a log of every mutating call so callers can
//! assert the exact order in which a batch touched the tree.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use compact_str::CompactString;

use crate::backend::RemoteBackend;
use crate::entry::{FileStat, RemoteEntry};
use crate::error::{BackendError, BackendResult};
use crate::listing::sort_entries;
use crate::path;

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, modified: i64 },
    Directory { modified: i64 },
}

impl Node {
    fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<String, Node>,
    calls: Vec<String>,
    exists_supported: bool,
    denied_listings: HashSet<String>,
}

/// A remote tree kept entirely in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl MemoryBackend {
    /// Create a backend containing only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory { modified: now() });
        Self {
            state: Mutex::new(State {
                nodes,
                calls: Vec::new(),
                exists_supported: true,
                denied_listings: HashSet::new(),
            }),
        }
    }

    /// Add a file, creating missing parent directories.
    pub fn with_file(self, file_path: &str, data: impl Into<Vec<u8>>) -> Self {
        {
            let mut state = self.lock();
            let file_path = path::clean(file_path).to_string();
            state.ensure_dirs(path::parent(&file_path));
            state.nodes.insert(
                file_path,
                Node::File {
                    data: data.into(),
                    modified: now(),
                },
            );
        }
        self
    }

    /// Add a directory, creating missing parents.
    pub fn with_dir(self, dir_path: &str) -> Self {
        self.lock().ensure_dirs(path::clean(dir_path));
        self
    }

    /// Report `exists` as unsupported so callers fall back to listing.
    pub fn without_exists_probe(self) -> Self {
        self.lock().exists_supported = false;
        self
    }

    /// Make listing of `dir_path` fail with permission denied.
    pub fn deny_listing(self, dir_path: &str) -> Self {
        self.lock()
            .denied_listings
            .insert(path::clean(dir_path).to_string());
        self
    }

    /// Whether a path is present.
    pub fn contains(&self, node_path: &str) -> bool {
        self.lock().nodes.contains_key(path::clean(node_path))
    }

    /// Whether a path is present and a directory.
    pub fn is_dir(&self, node_path: &str) -> bool {
        self.lock()
            .nodes
            .get(path::clean(node_path))
            .is_some_and(Node::is_dir)
    }

    /// Contents of a file, if present.
    pub fn file_contents(&self, file_path: &str) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path::clean(file_path)) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Mutating calls performed so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn ensure_dirs(&mut self, dir: &str) {
        let mut current = String::new();
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            self.nodes
                .entry(current.clone())
                .or_insert(Node::Directory { modified: now() });
        }
    }

    fn require_parent_dir(&self, node_path: &str) -> BackendResult<()> {
        let parent = path::parent(node_path);
        match self.nodes.get(parent) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(BackendError::other(format!("Not a directory: {parent}"))),
            None => Err(BackendError::not_found(parent)),
        }
    }

    fn subtree_keys(&self, root: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|key| path::is_within(key, root))
            .cloned()
            .collect()
    }

    fn has_children(&self, dir: &str) -> bool {
        self.nodes
            .keys()
            .any(|key| key != dir && path::is_within(key, dir))
    }

    fn check_transfer(&self, src: &str, dst: &str) -> BackendResult<Node> {
        let node = self
            .nodes
            .get(src)
            .cloned()
            .ok_or_else(|| BackendError::not_found(src))?;
        if self.nodes.contains_key(dst) {
            return Err(BackendError::already_exists(dst));
        }
        if node.is_dir() && path::is_within(dst, src) {
            return Err(BackendError::other(format!(
                "Cannot move or copy '{src}' into itself"
            )));
        }
        self.require_parent_dir(dst)?;
        Ok(node)
    }

    fn write(&mut self, file_path: &str, data: Vec<u8>) -> BackendResult<()> {
        if self.nodes.get(file_path).is_some_and(Node::is_dir) {
            return Err(BackendError::other(format!("Is a directory: {file_path}")));
        }
        self.require_parent_dir(file_path)?;
        self.nodes.insert(
            file_path.to_string(),
            Node::File {
                data,
                modified: now(),
            },
        );
        Ok(())
    }
}

fn rebase(key: &str, from: &str, to: &str) -> String {
    format!("{to}{}", &key[from.len()..])
}

impl RemoteBackend for MemoryBackend {
    fn list_directory(&self, dir_path: &str) -> BackendResult<Vec<RemoteEntry>> {
        let state = self.lock();
        let dir = path::clean(dir_path);
        if state.denied_listings.contains(dir) {
            return Err(BackendError::permission_denied(dir));
        }
        match state.nodes.get(dir) {
            Some(node) if node.is_dir() => {}
            Some(_) => return Err(BackendError::other(format!("Not a directory: {dir}"))),
            None => return Err(BackendError::not_found(dir)),
        }

        let mut entries: Vec<RemoteEntry> = state
            .nodes
            .iter()
            .filter(|(key, _)| key.as_str() != dir && path::parent(key) == dir)
            .map(|(key, node)| {
                let name = CompactString::from(path::basename(key));
                match node {
                    Node::File { data, modified } => {
                        RemoteEntry::file(name, key.clone(), data.len() as u64)
                            .with_modified(*modified)
                            .with_mode(0o100644)
                    }
                    Node::Directory { modified } => RemoteEntry::directory(name, key.clone())
                        .with_modified(*modified)
                        .with_mode(0o040755),
                }
            })
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn read_file(&self, file_path: &str) -> BackendResult<Vec<u8>> {
        let state = self.lock();
        match state.nodes.get(path::clean(file_path)) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            Some(Node::Directory { .. }) => {
                Err(BackendError::other(format!("Is a directory: {file_path}")))
            }
            None => Err(BackendError::not_found(file_path)),
        }
    }

    fn write_file(&self, file_path: &str, data: &[u8]) -> BackendResult<()> {
        let mut state = self.lock();
        let file_path = path::clean(file_path);
        state.calls.push(format!("write {file_path}"));
        state.write(file_path, data.to_vec())
    }

    fn stat(&self, node_path: &str) -> BackendResult<FileStat> {
        let state = self.lock();
        match state.nodes.get(path::clean(node_path)) {
            Some(Node::File { data, modified }) => Ok(FileStat::new(data.len() as u64, *modified)),
            Some(Node::Directory { modified }) => Ok(FileStat::new(0, *modified)),
            None => Err(BackendError::not_found(node_path)),
        }
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> BackendResult<()> {
        let data = {
            let mut state = self.lock();
            state
                .calls
                .push(format!("download {remote_path} -> {}", local_path.display()));
            match state.nodes.get(path::clean(remote_path)) {
                Some(Node::File { data, .. }) => data.clone(),
                Some(Node::Directory { .. }) => {
                    return Err(BackendError::other(format!("Is a directory: {remote_path}")));
                }
                None => return Err(BackendError::not_found(remote_path)),
            }
        };
        let local_display = local_path.display().to_string();
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BackendError::io(&local_display, e))?;
        }
        fs::write(local_path, data).map_err(|e| BackendError::io(local_display, e))
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> BackendResult<()> {
        let data = fs::read(local_path)
            .map_err(|e| BackendError::io(local_path.display().to_string(), e))?;
        let mut state = self.lock();
        let remote_path = path::clean(remote_path);
        state
            .calls
            .push(format!("upload {} -> {remote_path}", local_path.display()));
        state.write(remote_path, data)
    }

    fn exists(&self, node_path: &str) -> BackendResult<bool> {
        let state = self.lock();
        if !state.exists_supported {
            return Err(BackendError::not_supported("exists"));
        }
        Ok(state.nodes.contains_key(path::clean(node_path)))
    }

    fn is_directory(&self, node_path: &str) -> BackendResult<bool> {
        let state = self.lock();
        match state.nodes.get(path::clean(node_path)) {
            Some(node) => Ok(node.is_dir()),
            None => Err(BackendError::not_found(node_path)),
        }
    }

    fn remove(&self, node_path: &str, recursive: bool) -> BackendResult<()> {
        let mut state = self.lock();
        let target = path::clean(node_path).to_string();
        state.calls.push(format!("remove {target}"));
        if target == "/" {
            return Err(BackendError::permission_denied(target));
        }
        let node = state
            .nodes
            .get(&target)
            .cloned()
            .ok_or_else(|| BackendError::not_found(&target))?;
        if node.is_dir() && !recursive && state.has_children(&target) {
            return Err(BackendError::other(format!("Directory not empty: {target}")));
        }
        for key in state.subtree_keys(&target) {
            state.nodes.remove(&key);
        }
        Ok(())
    }

    fn rename(&self, node_path: &str, new_path: &str) -> BackendResult<()> {
        self.move_path(node_path, new_path)
    }

    fn mkdir(&self, dir_path: &str) -> BackendResult<()> {
        let mut state = self.lock();
        let dir = path::clean(dir_path).to_string();
        state.calls.push(format!("mkdir {dir}"));
        match state.nodes.get(&dir) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(BackendError::already_exists(dir)),
            None => {
                state.require_parent_dir(&dir)?;
                state.nodes.insert(dir, Node::Directory { modified: now() });
                Ok(())
            }
        }
    }

    fn copy(&self, src: &str, dst: &str, recursive: bool) -> BackendResult<()> {
        let mut state = self.lock();
        let (src, dst) = (path::clean(src).to_string(), path::clean(dst).to_string());
        state.calls.push(format!("copy {src} -> {dst}"));
        let node = state.check_transfer(&src, &dst)?;
        if node.is_dir() && !recursive {
            return Err(BackendError::other(format!(
                "-r not specified; omitting directory '{src}'"
            )));
        }
        let copies: Vec<(String, Node)> = state
            .subtree_keys(&src)
            .into_iter()
            .filter_map(|key| {
                let node = state.nodes.get(&key)?.clone();
                Some((rebase(&key, &src, &dst), node))
            })
            .collect();
        state.nodes.extend(copies);
        Ok(())
    }

    fn move_path(&self, src: &str, dst: &str) -> BackendResult<()> {
        let mut state = self.lock();
        let (src, dst) = (path::clean(src).to_string(), path::clean(dst).to_string());
        state.calls.push(format!("move {src} -> {dst}"));
        state.check_transfer(&src, &dst)?;
        for key in state.subtree_keys(&src) {
            if let Some(node) = state.nodes.remove(&key) {
                state.nodes.insert(rebase(&key, &src, &dst), node);
            }
        }
        Ok(())
    }
}
