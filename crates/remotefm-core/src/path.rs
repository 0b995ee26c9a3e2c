//! Helpers for absolute '/'-separated remote paths.
//!
//! Remote paths are plain strings, not [`std::path::Path`]s: they always use
//! '/' regardless of the local platform.

/// Normalize a directory path: leading '/', no trailing '/', root stays "/".
pub fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() {
        return "/".to_string();
    }
    if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    }
}

/// Strip trailing slashes from a path (root stays "/").
pub fn clean(path: &str) -> &str {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() && path.starts_with('/') {
        "/"
    } else {
        stripped
    }
}

/// Join a directory and a name with exactly one '/'.
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{dir}/{name}")
}

/// Last path component ("" for root).
pub fn basename(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Parent directory ("/" for top-level entries and root).
pub fn parent(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Whether `path` equals `dir` or lies below it.
pub fn is_within(path: &str, dir: &str) -> bool {
    let dir = clean(dir);
    if dir == "/" {
        return path.starts_with('/');
    }
    let path = clean(path);
    path == dir || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}
