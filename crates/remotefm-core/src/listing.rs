//! Directory listing and display categorization.

use std::cmp::Ordering;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::backend::RemoteBackend;
use crate::entry::RemoteEntry;
use crate::error::BackendResult;

/// Display category of a remote entry. Every entry lands in exactly one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryCategory {
    Folders,
    Iso,
    Archives,
    Slurm,
    Other,
}

const ARCHIVE_SUFFIXES: &[&str] = &[".zip", ".rar", ".7z", ".tgz", ".tar.gz", ".tar"];
const SLURM_SUFFIXES: &[&str] = &[".slurm", ".sbatch"];

/// Classify an entry from its name and directory flag.
pub fn categorize(name: &str, is_directory: bool) -> EntryCategory {
    if is_directory {
        return EntryCategory::Folders;
    }
    let lower = name.to_lowercase();
    if lower.ends_with(".iso") {
        EntryCategory::Iso
    } else if ARCHIVE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        EntryCategory::Archives
    } else if SLURM_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        EntryCategory::Slurm
    } else {
        EntryCategory::Other
    }
}

/// Sort entries: directories first, then case-insensitive name.
pub fn sort_entries(entries: &mut [RemoteEntry]) {
    entries.sort_by(|a, b| match (a.is_directory, b.is_directory) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// List a remote directory in display order.
pub fn list(backend: &dyn RemoteBackend, remote_dir: &str) -> BackendResult<Vec<RemoteEntry>> {
    let mut entries = backend.list_directory(remote_dir)?;
    sort_entries(&mut entries);
    Ok(entries)
}

/// One listing split into the "all" view and per-category views.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorizedListing {
    /// Every entry, in listing order.
    pub all: Vec<RemoteEntry>,
    /// Entries per category, each in listing order.
    pub by_category: Vec<(EntryCategory, Vec<RemoteEntry>)>,
}

impl CategorizedListing {
    /// Group an already-sorted listing.
    pub fn new(entries: Vec<RemoteEntry>) -> Self {
        let by_category = EntryCategory::iter()
            .map(|category| {
                let members = entries
                    .iter()
                    .filter(|e| categorize(&e.name, e.is_directory) == category)
                    .cloned()
                    .collect();
                (category, members)
            })
            .collect();

        Self {
            all: entries,
            by_category,
        }
    }

    /// Entries of one category.
    pub fn category(&self, category: EntryCategory) -> &[RemoteEntry] {
        self.by_category
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
    }
}

/// Human-readable type column for an entry.
pub fn file_type_label(name: &str, is_directory: bool) -> String {
    if is_directory {
        return "Folder".to_string();
    }
    let lower = name.to_lowercase();
    if lower.ends_with(".iso") {
        return "Disc Image File".to_string();
    }
    if [".zip", ".rar", ".7z"].iter().any(|s| lower.ends_with(s)) {
        return "ZIP archive".to_string();
    }
    if [".tgz", ".tar.gz", ".tar"].iter().any(|s| lower.ends_with(s)) {
        return "TAR archive".to_string();
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => format!("{} File", ext.to_uppercase()),
        None => "File".to_string(),
    }
}

/// Format a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Format unix seconds as local "dd-mm-yy HH:MM" (empty when unknown).
pub fn format_mtime(unix_secs: i64) -> String {
    if unix_secs == 0 {
        return String::new();
    }
    match Local.timestamp_opt(unix_secs, 0).single() {
        Some(dt) => dt.format("%d-%m-%y %H:%M").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("anything.iso", true), EntryCategory::Folders);
        assert_eq!(categorize("ubuntu.ISO", false), EntryCategory::Iso);
        assert_eq!(categorize("data.tar.gz", false), EntryCategory::Archives);
        assert_eq!(categorize("bundle.7z", false), EntryCategory::Archives);
        assert_eq!(categorize("job.sbatch", false), EntryCategory::Slurm);
        assert_eq!(categorize("run.slurm", false), EntryCategory::Slurm);
        assert_eq!(categorize("notes.txt", false), EntryCategory::Other);
        assert_eq!(categorize("Makefile", false), EntryCategory::Other);
    }

    #[test]
    fn test_sort_entries() {
        let mut entries = vec![
            RemoteEntry::file("b.txt", "/b.txt", 1),
            RemoteEntry::directory("Zeta", "/Zeta"),
            RemoteEntry::file("A.txt", "/A.txt", 1),
            RemoteEntry::directory("alpha", "/alpha"),
        ];
        sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Zeta", "A.txt", "b.txt"]);
    }

    #[test]
    fn test_file_type_label() {
        assert_eq!(file_type_label("x", true), "Folder");
        assert_eq!(file_type_label("a.tar.gz", false), "TAR archive");
        assert_eq!(file_type_label("a.rar", false), "ZIP archive");
        assert_eq!(file_type_label("script.py", false), "PY File");
        assert_eq!(file_type_label("README", false), "File");
    }

    #[test]
    fn test_format_mtime_unknown() {
        assert_eq!(format_mtime(0), "");
        assert!(!format_mtime(1_700_000_000).is_empty());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("slurm".parse::<EntryCategory>().unwrap(), EntryCategory::Slurm);
        assert_eq!(EntryCategory::Archives.to_string(), "archives");
    }
}
