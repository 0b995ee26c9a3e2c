//! Batch executor: runs a plan on a background task.
//!
//! Steps run strictly in order, one backend call at a time. Cancellation is
//! cooperative and only observed between steps; a step that has started
//! always runs to completion. The first failing step ends the batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use remotefm_core::{probe_is_directory, BackendError, BackendResult, RemoteBackend};

use crate::config::EngineConfig;
use crate::operation::{OperationKind, Plan, PlannedOperation};
use crate::progress::{BatchEvent, BatchOutcome, StepProgress};
use crate::snapshot::BatchSnapshot;
use crate::OPERATION_CHANNEL_SIZE;

/// Runs plans against a shared backend.
#[derive(Clone)]
pub struct BatchExecutor {
    backend: Arc<dyn RemoteBackend>,
    snapshot_path: Option<PathBuf>,
    channel_size: usize,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("snapshot_path", &self.snapshot_path)
            .field("channel_size", &self.channel_size)
            .finish_non_exhaustive()
    }
}

impl BatchExecutor {
    /// Create an executor that writes no snapshots.
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        Self {
            backend,
            snapshot_path: None,
            channel_size: OPERATION_CHANNEL_SIZE,
        }
    }

    /// Create an executor from engine configuration.
    pub fn from_config(backend: Arc<dyn RemoteBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            snapshot_path: config.snapshot_target().cloned(),
            channel_size: config.event_channel_size.max(1),
        }
    }

    /// Write the diagnostic snapshot to `path` when a batch stops early.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// The backend steps run against.
    pub fn backend(&self) -> &Arc<dyn RemoteBackend> {
        &self.backend
    }

    /// Start `plan` on a background task.
    pub fn start(&self, plan: Plan) -> BatchHandle {
        self.start_with(plan, CancellationToken::new())
    }

    /// Start `plan`, observing an externally owned cancellation token.
    pub fn start_with(&self, plan: Plan, cancel: CancellationToken) -> BatchHandle {
        self.start_guarded(plan, cancel, ())
    }

    /// Start `plan`, holding `guard` until the background task ends.
    pub fn start_guarded<G>(&self, plan: Plan, cancel: CancellationToken, guard: G) -> BatchHandle
    where
        G: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.channel_size);
        let executor = self.clone();
        let token = cancel.clone();
        let total = plan.len();

        let join = tokio::spawn(async move {
            let _guard = guard;
            executor.run(&plan, &token, &tx).await
        });

        BatchHandle {
            events: rx,
            cancel,
            join,
            total,
        }
    }

    /// Run `plan` to its end on the current task.
    ///
    /// Emits one [`BatchEvent::Progress`] before each step and a single
    /// [`BatchEvent::Finished`] last. Send failures (receiver gone) are
    /// ignored; the batch still runs.
    pub async fn run(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
        events: &mpsc::Sender<BatchEvent>,
    ) -> BatchOutcome {
        let total = plan.len();
        info!(title = plan.title(), total, "starting batch");

        let mut outcome = BatchOutcome::completed(total);
        for (index, step) in plan.steps().iter().enumerate() {
            let label = format!("{}/{}: {}", index + 1, total, step.display_name());
            let progress = BatchEvent::Progress(StepProgress {
                step: index + 1,
                total,
                label: label.clone(),
            });

            // A full event channel must not hide a cancel request.
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = events.send(progress) => cancel.is_cancelled(),
            };
            if cancelled {
                info!(executed = index, total, "batch cancelled");
                self.persist_remaining(plan, index).await;
                outcome = BatchOutcome::cancelled(index, total);
                break;
            }

            debug!(op = %step.kind, src = step.source, dst = step.destination, "executing step");

            let backend = Arc::clone(&self.backend);
            let owned = step.clone();
            let result = tokio::task::spawn_blocking(move || execute_step(backend.as_ref(), &owned))
                .await
                .map_err(|e| format!("Task failed: {e}"));

            let error = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(e),
            };
            if let Some(error) = error {
                warn!(step = label, error, "batch step failed");
                self.persist_remaining(plan, index).await;
                outcome = BatchOutcome::failed(index, total, format!("{label}\n{error}"));
                break;
            }
        }

        if outcome.is_success() {
            info!(total, "batch finished");
        }
        let _ = events.send(BatchEvent::Finished(outcome.clone())).await;
        outcome
    }

    /// Record `plan[index..]` in the snapshot file, best-effort.
    async fn persist_remaining(&self, plan: &Plan, index: usize) {
        let Some(path) = self.snapshot_path.clone() else {
            return;
        };
        let snapshot = BatchSnapshot::new(plan.title(), plan.steps()[index..].to_vec());
        let remaining = snapshot.remaining.len();
        let result = tokio::task::spawn_blocking(move || {
            snapshot.write_to(&path).map(|()| path)
        })
        .await
        .map_err(|e| format!("Task failed: {e}"));

        match result {
            Ok(Ok(path)) => debug!(path = %path.display(), remaining, "wrote batch snapshot"),
            Ok(Err(err)) => warn!(error = %err, "failed to write batch snapshot"),
            Err(err) => warn!(error = err, "failed to write batch snapshot"),
        }
    }
}

/// Perform one step against the backend or the local filesystem.
fn execute_step(backend: &dyn RemoteBackend, step: &PlannedOperation) -> BackendResult<()> {
    match step.kind {
        OperationKind::Copy => backend.copy(&step.source, &step.destination, step.recursive),
        OperationKind::Move => backend.move_path(&step.source, &step.destination),
        OperationKind::Delete => backend.remove(step.target(), step.recursive),
        OperationKind::Upload => backend.upload(Path::new(&step.source), &step.destination),
        OperationKind::Download => backend.download(&step.source, Path::new(&step.destination)),
        OperationKind::MkdirRemote => match backend.mkdir(&step.destination) {
            // Some backends refuse to create an existing directory.
            Err(err) if probe_is_directory(backend, &step.destination) == Some(true) => {
                debug!(path = step.destination, error = %err, "remote directory already exists");
                Ok(())
            }
            result => result,
        },
        OperationKind::MkdirLocal => {
            fs::create_dir_all(&step.destination).map_err(|e| BackendError::io(&step.destination, e))
        }
        OperationKind::DeleteLocal => delete_local(Path::new(step.target()), step.recursive),
    }
}

fn delete_local(path: &Path, recursive: bool) -> BackendResult<()> {
    let display = path.to_string_lossy().into_owned();
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BackendError::io(display, e)),
    };

    let result = if metadata.is_dir() {
        if recursive {
            fs::remove_dir_all(path)
        } else {
            fs::remove_dir(path)
        }
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| BackendError::io(display, e))
}

/// A running batch: its event stream, cancel switch and final outcome.
#[derive(Debug)]
pub struct BatchHandle {
    events: mpsc::Receiver<BatchEvent>,
    cancel: CancellationToken,
    join: JoinHandle<BatchOutcome>,
    total: usize,
}

impl BatchHandle {
    /// Request cancellation. Takes effect before the next step.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the batch's cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receive the next event, `None` once the batch has ended.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Wait for the batch to end, discarding events.
    pub async fn wait(self) -> BatchOutcome {
        self.wait_with(|_| {}).await
    }

    /// Wait for the batch to end, passing every event to `on_event`.
    pub async fn wait_with(mut self, mut on_event: impl FnMut(&BatchEvent)) -> BatchOutcome {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
        }
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => BatchOutcome::failed(0, self.total, format!("Task failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::PlanKind;
    use remotefm_core::MemoryBackend;

    fn plan(steps: Vec<PlannedOperation>) -> Plan {
        Plan::new(PlanKind::Copy, steps)
    }

    #[tokio::test]
    async fn test_events_precede_steps_and_finish_last() {
        let backend = Arc::new(MemoryBackend::new().with_file("/a.txt", "a").with_dir("/dst"));
        let executor = BatchExecutor::new(backend.clone());

        let mut events = Vec::new();
        let outcome = executor
            .start(plan(vec![
                PlannedOperation::copy("/a.txt", "/dst/a.txt", false),
                PlannedOperation::mkdir_remote("/dst/sub"),
            ]))
            .wait_with(|e| events.push(e.clone()))
            .await;

        assert!(outcome.is_success());
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            BatchEvent::Progress(StepProgress {
                step: 1,
                total: 2,
                label: "1/2: a.txt".to_string()
            })
        );
        assert!(matches!(events[2], BatchEvent::Finished(_)));
        assert!(backend.is_dir("/dst/sub"));
    }

    #[tokio::test]
    async fn test_failure_stops_batch_with_label() {
        let backend = Arc::new(MemoryBackend::new().with_dir("/dst"));
        let executor = BatchExecutor::new(backend.clone());

        let outcome = executor
            .start(plan(vec![
                PlannedOperation::copy("/missing.txt", "/dst/missing.txt", false),
                PlannedOperation::mkdir_remote("/dst/never"),
            ]))
            .wait()
            .await;

        assert_eq!(outcome.executed, 0);
        assert!(outcome.error_message().starts_with("1/2: missing.txt\n"));
        assert!(!backend.contains("/dst/never"));
    }

    #[tokio::test]
    async fn test_cancel_before_start_runs_nothing() {
        let backend = Arc::new(MemoryBackend::new());
        let executor = BatchExecutor::new(backend.clone());
        let token = CancellationToken::new();
        token.cancel();

        let outcome = executor
            .start_with(plan(vec![PlannedOperation::mkdir_remote("/x")]), token)
            .wait()
            .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.executed, 0);
        assert!(!backend.contains("/x"));
    }

    #[tokio::test]
    async fn test_local_steps() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a/b");
        let missing = temp.path().join("gone.txt");
        let executor = BatchExecutor::new(Arc::new(MemoryBackend::new()));

        let outcome = executor
            .start(plan(vec![
                PlannedOperation::mkdir_local(nested.to_string_lossy()),
                PlannedOperation::mkdir_local(nested.to_string_lossy()),
                PlannedOperation::delete_local(missing.to_string_lossy(), false),
            ]))
            .wait()
            .await;

        assert!(outcome.is_success(), "{}", outcome.error_message());
        assert!(nested.is_dir());
    }
}
