//! Planned operation and plan types.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::Display;

use remotefm_core::path;

/// Kind of a single primitive step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
    Upload,
    Download,
    MkdirRemote,
    MkdirLocal,
    DeleteLocal,
}

impl OperationKind {
    /// Whether the destination of this kind is a local path.
    pub fn targets_local(&self) -> bool {
        matches!(self, Self::Download | Self::MkdirLocal | Self::DeleteLocal)
    }
}

/// One primitive step of a plan.
///
/// Serialized with the short field names used by the diagnostic snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOperation {
    #[serde(rename = "op")]
    pub kind: OperationKind,
    #[serde(rename = "src")]
    pub source: String,
    #[serde(rename = "dst")]
    pub destination: String,
    pub recursive: bool,
}

impl PlannedOperation {
    fn new(
        kind: OperationKind,
        source: impl Into<String>,
        destination: impl Into<String>,
        recursive: bool,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            destination: destination.into(),
            recursive,
        }
    }

    /// Copy `source` to `destination` on the remote side.
    pub fn copy(source: impl Into<String>, destination: impl Into<String>, recursive: bool) -> Self {
        Self::new(OperationKind::Copy, source, destination, recursive)
    }

    /// Move `source` to `destination` on the remote side.
    pub fn move_to(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(OperationKind::Move, source, destination, false)
    }

    /// Remove a remote path.
    pub fn delete(target: impl Into<String>, recursive: bool) -> Self {
        Self::new(OperationKind::Delete, "", target, recursive)
    }

    /// Upload a local file to a remote path.
    pub fn upload(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self::new(OperationKind::Upload, local, remote, false)
    }

    /// Download a remote file to a local path.
    pub fn download(remote: impl Into<String>, local: impl Into<String>) -> Self {
        Self::new(OperationKind::Download, remote, local, false)
    }

    /// Create a remote directory.
    pub fn mkdir_remote(target: impl Into<String>) -> Self {
        Self::new(OperationKind::MkdirRemote, "", target, false)
    }

    /// Create a local directory.
    pub fn mkdir_local(target: impl Into<String>) -> Self {
        Self::new(OperationKind::MkdirLocal, "", target, false)
    }

    /// Remove a local path.
    pub fn delete_local(target: impl Into<String>, recursive: bool) -> Self {
        Self::new(OperationKind::DeleteLocal, "", target, recursive)
    }

    /// The path this step acts upon: destination, or source when empty.
    pub fn target(&self) -> &str {
        if self.destination.is_empty() {
            &self.source
        } else {
            &self.destination
        }
    }

    /// Last component of [`target`](Self::target), for labels.
    pub fn display_name(&self) -> String {
        let target = self.target();
        let local = self.kind.targets_local() && !self.destination.is_empty();
        if local {
            Path::new(target)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| target.to_string())
        } else {
            path::basename(target).to_string()
        }
    }
}

/// A user-level request kind for remote-to-remote transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferKind {
    Copy,
    Move,
}

/// What a whole plan was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanKind {
    Copy,
    Move,
    Upload,
    Download,
    Delete,
    Undo,
}

impl PlanKind {
    /// Progress title for a plan of this kind.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Copy => "Copying...",
            Self::Move => "Moving...",
            Self::Upload => "Uploading...",
            Self::Download => "Downloading...",
            Self::Delete => "Deleting...",
            Self::Undo => "Undoing...",
        }
    }
}

impl From<TransferKind> for PlanKind {
    fn from(kind: TransferKind) -> Self {
        match kind {
            TransferKind::Copy => Self::Copy,
            TransferKind::Move => Self::Move,
        }
    }
}

/// An ordered, immutable list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    kind: PlanKind,
    steps: Vec<PlannedOperation>,
}

impl Plan {
    /// Create a plan.
    pub fn new(kind: PlanKind, steps: Vec<PlannedOperation>) -> Self {
        Self { kind, steps }
    }

    /// What the plan was built for.
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    /// Progress title.
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// The steps in execution order.
    pub fn steps(&self) -> &[PlannedOperation] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `(source, destination)` of every move step, in plan order.
    pub fn moves(&self) -> Vec<(String, String)> {
        self.steps
            .iter()
            .filter(|s| s.kind == OperationKind::Move)
            .map(|s| (s.source.clone(), s.destination.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_has_empty_source() {
        let op = PlannedOperation::delete("/home/backup/a.txt", false);
        assert_eq!(op.source, "");
        assert_eq!(op.target(), "/home/backup/a.txt");
        assert_eq!(op.display_name(), "a.txt");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OperationKind::MkdirRemote.to_string(), "mkdir_remote");
        let json = serde_json::to_string(&PlannedOperation::mkdir_local("/tmp/x")).unwrap();
        assert_eq!(
            json,
            r#"{"op":"mkdir_local","src":"","dst":"/tmp/x","recursive":false}"#
        );
    }

    #[test]
    fn test_plan_moves() {
        let plan = Plan::new(
            PlanKind::Move,
            vec![
                PlannedOperation::delete("/b", false),
                PlannedOperation::move_to("/a", "/b"),
                PlannedOperation::move_to("/c", "/d"),
            ],
        );
        assert_eq!(
            plan.moves(),
            vec![
                ("/a".to_string(), "/b".to_string()),
                ("/c".to_string(), "/d".to_string())
            ]
        );
        assert_eq!(plan.title(), "Moving...");
    }
}
