//! Panels: the caller-facing surface tying listing, planning and execution
//! together.
//!
//! A [`SharedContext`] is created once; every [`Panel`] built from it shares
//! the backend, the undo ledger and the clipboard. Each panel runs at most
//! one batch at a time.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use remotefm_core::{list, path, CategorizedListing, RemoteBackend, RemoteEntry};

use crate::builder::{build_delete, PlanBuilder};
use crate::clipboard::FileClipboard;
use crate::config::EngineConfig;
use crate::conflict::ConflictResolver;
use crate::error::OpsError;
use crate::executor::{BatchExecutor, BatchHandle};
use crate::operation::{Plan, PlanKind, TransferKind};
use crate::progress::{BatchEvent, BatchOutcome, BatchReport};
use crate::undo::{UndoLedger, UndoPlan};

/// State shared by every panel of one session.
#[derive(Clone)]
pub struct SharedContext {
    backend: Arc<dyn RemoteBackend>,
    undo: UndoLedger,
    clipboard: FileClipboard,
    config: EngineConfig,
}

impl std::fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedContext")
            .field("undo", &self.undo)
            .field("clipboard", &self.clipboard)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SharedContext {
    /// Create a context around one backend connection.
    pub fn new(backend: Arc<dyn RemoteBackend>, config: EngineConfig) -> Self {
        Self {
            backend,
            undo: UndoLedger::new(),
            clipboard: FileClipboard::new(),
            config,
        }
    }

    pub fn backend(&self) -> &Arc<dyn RemoteBackend> {
        &self.backend
    }

    pub fn undo_ledger(&self) -> &UndoLedger {
        &self.undo
    }

    pub fn clipboard(&self) -> &FileClipboard {
        &self.clipboard
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// An executor configured for this context.
    pub fn executor(&self) -> BatchExecutor {
        BatchExecutor::from_config(Arc::clone(&self.backend), &self.config)
    }
}

type ActiveSlot = Arc<Mutex<Option<CancellationToken>>>;

/// Frees the panel's batch slot when the background task ends.
struct ActiveBatch {
    slot: ActiveSlot,
}

impl Drop for ActiveBatch {
    fn drop(&mut self) {
        *lock_slot(&self.slot) = None;
    }
}

/// Run synchronous backend work from async code.
///
/// On a multi-threaded runtime the worker hands its other tasks off while
/// `f` runs; elsewhere `f` runs inline.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn lock_slot(slot: &ActiveSlot) -> MutexGuard<'_, Option<CancellationToken>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One logical panel browsing a remote directory.
#[derive(Debug)]
pub struct Panel {
    context: SharedContext,
    current_dir: String,
    active: ActiveSlot,
}

impl Panel {
    /// Create a panel showing `current_dir`.
    pub fn new(context: SharedContext, current_dir: impl Into<String>) -> Self {
        Self {
            context,
            current_dir: path::normalize_dir(&current_dir.into()),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    /// Change the displayed directory.
    pub fn set_dir(&mut self, dir: &str) {
        self.current_dir = path::normalize_dir(dir);
    }

    /// List the current directory.
    pub fn list(&self) -> Result<Vec<RemoteEntry>, OpsError> {
        Ok(list(self.context.backend.as_ref(), &self.current_dir)?)
    }

    /// List the current directory grouped by category.
    pub fn categorized(&self) -> Result<CategorizedListing, OpsError> {
        self.list().map(CategorizedListing::new)
    }

    /// Check if a batch is running on this panel.
    pub fn is_busy(&self) -> bool {
        lock_slot(&self.active).is_some()
    }

    fn ensure_idle(&self) -> Result<(), OpsError> {
        if self.is_busy() {
            Err(OpsError::BatchInProgress)
        } else {
            Ok(())
        }
    }

    /// Request cancellation of the running batch, if any.
    pub fn cancel(&self) -> bool {
        match lock_slot(&self.active).as_ref() {
            Some(token) => {
                info!(dir = self.current_dir, "cancelling running batch");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Start `plan` on a background task.
    ///
    /// Fails with [`OpsError::BatchInProgress`] while another batch of this
    /// panel is still running.
    pub fn start(&self, plan: Plan) -> Result<BatchHandle, OpsError> {
        let token = CancellationToken::new();
        {
            let mut slot = lock_slot(&self.active);
            if slot.is_some() {
                return Err(OpsError::BatchInProgress);
            }
            *slot = Some(token.clone());
        }

        let guard = ActiveBatch {
            slot: Arc::clone(&self.active),
        };
        Ok(self.context.executor().start_guarded(plan, token, guard))
    }

    /// Run `plan` to its end, recording successful moves for undo.
    pub async fn run(
        &self,
        plan: Plan,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchOutcome, OpsError> {
        let kind = plan.kind();
        let moves = plan.moves();
        let outcome = self.start(plan)?.wait_with(on_event).await;

        if kind == PlanKind::Move && outcome.is_success() {
            self.context.undo.record_move(moves);
        }
        Ok(outcome)
    }

    async fn run_built(
        &self,
        plan: Option<Plan>,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        match plan {
            None => Ok(BatchReport::Declined),
            Some(plan) if plan.is_empty() => {
                debug!(kind = %plan.kind(), "nothing to execute");
                Ok(BatchReport::NothingToDo)
            }
            Some(plan) => self.run(plan, on_event).await.map(BatchReport::Finished),
        }
    }

    /// Build a remote copy or move plan against this panel's backend.
    ///
    /// Probes the backend synchronously.
    pub fn plan_transfer(
        &self,
        kind: TransferKind,
        sources: &[String],
        destination_dir: &str,
        resolver: &mut dyn ConflictResolver,
    ) -> Option<Plan> {
        PlanBuilder::new(self.context.backend.as_ref(), resolver).build_transfer(
            kind,
            sources,
            destination_dir,
        )
    }

    /// Copy remote `sources` into `destination_dir`.
    pub async fn copy_into(
        &self,
        sources: &[String],
        destination_dir: &str,
        resolver: &mut dyn ConflictResolver,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let plan = blocking(|| {
            self.plan_transfer(TransferKind::Copy, sources, destination_dir, resolver)
        });
        self.run_built(plan, on_event).await
    }

    /// Move remote `sources` into `destination_dir`.
    pub async fn move_into(
        &self,
        sources: &[String],
        destination_dir: &str,
        resolver: &mut dyn ConflictResolver,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let plan = blocking(|| {
            self.plan_transfer(TransferKind::Move, sources, destination_dir, resolver)
        });
        self.run_built(plan, on_event).await
    }

    /// Upload local files and directories into `destination_dir`.
    pub async fn upload_into(
        &self,
        local_paths: &[PathBuf],
        destination_dir: &str,
        resolver: &mut dyn ConflictResolver,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let plan = blocking(|| {
            PlanBuilder::new(self.context.backend.as_ref(), resolver)
                .build_upload(local_paths, destination_dir)
        });
        self.run_built(plan, on_event).await
    }

    /// Download remote `sources` into the local `target_dir`.
    pub async fn download_into(
        &self,
        sources: &[String],
        target_dir: &Path,
        resolver: &mut dyn ConflictResolver,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let plan = blocking(|| {
            PlanBuilder::new(self.context.backend.as_ref(), resolver)
                .build_download(sources, target_dir)
        });
        self.run_built(plan, on_event).await
    }

    /// Delete remote paths.
    pub async fn delete(
        &self,
        paths: &[String],
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let plan = blocking(|| build_delete(self.context.backend.as_ref(), paths));
        self.run_built(Some(plan), on_event).await
    }

    /// Paste the clipboard into `destination_dir`.
    ///
    /// A cut (move) clipboard is cleared once its batch has run; a copy
    /// clipboard stays for further pastes.
    pub async fn paste_into(
        &self,
        destination_dir: &str,
        resolver: &mut dyn ConflictResolver,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let Some(contents) = self.context.clipboard.get() else {
            return Ok(BatchReport::NothingToDo);
        };

        let plan = blocking(|| {
            self.plan_transfer(contents.op, &contents.paths, destination_dir, resolver)
        });
        let report = self.run_built(plan, on_event).await?;
        if contents.op == TransferKind::Move && matches!(report, BatchReport::Finished(_)) {
            self.context.clipboard.clear();
        }
        Ok(report)
    }

    /// Reverse the last successful move batch of the session.
    pub async fn undo(
        &self,
        resolver: &mut dyn ConflictResolver,
        on_event: impl FnMut(&BatchEvent),
    ) -> Result<BatchReport, OpsError> {
        self.ensure_idle()?;
        let ledger = &self.context.undo;
        let backend = self.context.backend.as_ref();
        let inverse = blocking(|| ledger.build_inverse_plan(backend, resolver));
        let (record_id, plan) = match inverse {
            UndoPlan::Nothing => return Ok(BatchReport::NothingToDo),
            UndoPlan::Cancelled => return Ok(BatchReport::Declined),
            UndoPlan::Ready { record_id, plan } => (record_id, plan),
        };

        info!(id = record_id, steps = plan.len(), "undoing move batch");
        let outcome = self.start(plan)?.wait_with(on_event).await;
        ledger.complete(record_id, &outcome);
        Ok(BatchReport::Finished(outcome))
    }
}

impl Drop for Panel {
    fn drop(&mut self) {
        // A closing panel stops its batch at the next step boundary.
        self.cancel();
    }
}
