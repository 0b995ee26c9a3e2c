//! Cut/copy clipboard shared between panels.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::operation::TransferKind;

/// Paths put on the clipboard and what to do with them on paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardContents {
    pub op: TransferKind,
    pub paths: Vec<String>,
}

/// Shared clipboard handle. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct FileClipboard {
    contents: Arc<Mutex<Option<ClipboardContents>>>,
}

impl FileClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ClipboardContents>> {
        self.contents.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the contents. An empty path list clears the clipboard.
    pub fn set(&self, op: TransferKind, paths: Vec<String>) {
        *self.lock() = if paths.is_empty() {
            None
        } else {
            Some(ClipboardContents { op, paths })
        };
    }

    pub fn get(&self) -> Option<ClipboardContents> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let clipboard = FileClipboard::new();
        let shared = clipboard.clone();

        clipboard.set(TransferKind::Move, vec!["/a".to_string()]);
        assert_eq!(
            shared.get(),
            Some(ClipboardContents {
                op: TransferKind::Move,
                paths: vec!["/a".to_string()],
            })
        );

        shared.clear();
        assert!(clipboard.is_empty());

        clipboard.set(TransferKind::Copy, Vec::new());
        assert!(clipboard.is_empty());
    }
}
