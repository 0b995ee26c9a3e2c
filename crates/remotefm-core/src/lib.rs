//! Core types and traits for remotefm.
//!
//! This crate provides the data model shared by the rest of the workspace:
//! remote entries, the synchronous backend contract, '/'-separated path
//! helpers, directory listing with display categories, and two reference
//! backends (in-memory and a rooted local directory).

mod backend;
mod entry;
mod error;
mod listing;
mod local;
mod memory;
pub mod path;

pub use backend::{probe_exists, probe_is_directory, RemoteBackend};
pub use entry::{FileStat, RemoteEntry};
pub use error::{BackendError, BackendResult, ErrorCategory};
pub use listing::{
    categorize, file_type_label, format_mtime, format_size, list, sort_entries,
    CategorizedListing, EntryCategory,
};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
