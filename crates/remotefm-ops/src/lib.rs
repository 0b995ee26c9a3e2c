//! Batch file operations engine for remotefm.
//!
//! This crate turns a single logical request ("move these items into that
//! folder") into an explicit, ordered plan of primitive steps, resolving
//! destination conflicts up front, and then runs the plan on a background
//! task with progress events, cooperative cancellation, a diagnostic
//! snapshot on abnormal stops, and a single-slot undo ledger for moves.

mod builder;
mod clipboard;
mod config;
mod conflict;
mod error;
mod executor;
mod operation;
mod panel;
mod progress;
mod snapshot;
mod undo;
mod walk;

pub use builder::{build_delete, PlanBuilder};
pub use clipboard::{ClipboardContents, FileClipboard};
pub use config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use conflict::{
    ConflictAction, ConflictDecision, ConflictResolver, FixedResolver, ResolutionPolicy,
    ScriptedResolver,
};
pub use error::OpsError;
pub use executor::{BatchExecutor, BatchHandle};
pub use operation::{OperationKind, Plan, PlanKind, PlannedOperation, TransferKind};
pub use panel::{Panel, SharedContext};
pub use progress::{BatchEvent, BatchOutcome, BatchReport, StepProgress};
pub use snapshot::{default_snapshot_path, BatchSnapshot};
pub use undo::{UndoKind, UndoLedger, UndoPlan, UndoRecord};
pub use walk::{local_walk, remote_walk, WalkEntry};

/// Default channel buffer size for batch events.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
