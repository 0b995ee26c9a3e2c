//! End-to-end tests for planning, execution and undo.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use remotefm_core::{
    BackendError, BackendResult, FileStat, MemoryBackend, RemoteBackend, RemoteEntry,
};
use remotefm_ops::{
    BatchEvent, BatchExecutor, BatchReport, BatchSnapshot, ConflictAction, ConflictDecision,
    EngineConfig, FixedResolver, OperationKind, OpsError, Panel, Plan, PlanBuilder, PlanKind,
    PlannedOperation, ScriptedResolver, SharedContext, TransferKind, UndoKind, UndoPlan,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn no_snapshot_config() -> EngineConfig {
    EngineConfig::builder()
        .snapshot_path(None::<PathBuf>)
        .build()
        .unwrap()
}

fn panel_over(backend: Arc<MemoryBackend>, dir: &str) -> Panel {
    Panel::new(SharedContext::new(backend, no_snapshot_config()), dir)
}

/// Delegates to a [`MemoryBackend`], running a hook before every mutating call.
struct HookedBackend {
    inner: Arc<MemoryBackend>,
    calls: AtomicUsize,
    on_call: Box<dyn Fn(usize) + Send + Sync>,
    strict_mkdir: bool,
}

impl HookedBackend {
    fn new(inner: Arc<MemoryBackend>, on_call: impl Fn(usize) + Send + Sync + 'static) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            on_call: Box::new(on_call),
            strict_mkdir: false,
        }
    }

    fn mutating_call(&self) {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.on_call)(n);
    }
}

impl RemoteBackend for HookedBackend {
    fn list_directory(&self, path: &str) -> BackendResult<Vec<RemoteEntry>> {
        self.inner.list_directory(path)
    }

    fn read_file(&self, path: &str) -> BackendResult<Vec<u8>> {
        self.inner.read_file(path)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> BackendResult<()> {
        self.mutating_call();
        self.inner.write_file(path, data)
    }

    fn stat(&self, path: &str) -> BackendResult<FileStat> {
        self.inner.stat(path)
    }

    fn download(&self, remote_path: &str, local_path: &Path) -> BackendResult<()> {
        self.mutating_call();
        self.inner.download(remote_path, local_path)
    }

    fn upload(&self, local_path: &Path, remote_path: &str) -> BackendResult<()> {
        self.mutating_call();
        self.inner.upload(local_path, remote_path)
    }

    fn exists(&self, path: &str) -> BackendResult<bool> {
        self.inner.exists(path)
    }

    fn is_directory(&self, path: &str) -> BackendResult<bool> {
        self.inner.is_directory(path)
    }

    fn remove(&self, path: &str, recursive: bool) -> BackendResult<()> {
        self.mutating_call();
        self.inner.remove(path, recursive)
    }

    fn mkdir(&self, path: &str) -> BackendResult<()> {
        self.mutating_call();
        if self.strict_mkdir && self.inner.contains(path) {
            return Err(BackendError::already_exists(path));
        }
        self.inner.mkdir(path)
    }

    fn copy(&self, src: &str, dst: &str, recursive: bool) -> BackendResult<()> {
        self.mutating_call();
        self.inner.copy(src, dst, recursive)
    }

    fn move_path(&self, src: &str, dst: &str) -> BackendResult<()> {
        self.mutating_call();
        self.inner.move_path(src, dst)
    }
}

#[test]
fn test_scenario_a_plain_copy() {
    let backend = MemoryBackend::new()
        .with_file("/home/a.txt", "a")
        .with_dir("/home/backup");
    let mut resolver = ScriptedResolver::default();

    let plan = PlanBuilder::new(&backend, &mut resolver)
        .build_transfer(TransferKind::Copy, &strings(&["/home/a.txt"]), "/home/backup")
        .unwrap();

    assert_eq!(
        plan.steps(),
        &[PlannedOperation::copy("/home/a.txt", "/home/backup/a.txt", false)]
    );
    assert!(resolver.prompts.is_empty());
}

#[test]
fn test_scenario_b_overwrite_prepends_delete() {
    let backend = MemoryBackend::new()
        .with_file("/home/a.txt", "new")
        .with_file("/home/backup/a.txt", "old");
    let mut resolver = ScriptedResolver::new([ConflictDecision::once(ConflictAction::Overwrite)]);

    let plan = PlanBuilder::new(&backend, &mut resolver)
        .build_transfer(TransferKind::Copy, &strings(&["/home/a.txt"]), "/home/backup")
        .unwrap();

    assert_eq!(
        plan.steps(),
        &[
            PlannedOperation::delete("/home/backup/a.txt", false),
            PlannedOperation::copy("/home/a.txt", "/home/backup/a.txt", false),
        ]
    );
    assert_eq!(plan.steps()[0].source, "");
}

#[tokio::test]
async fn test_scenario_c_move_directory_records_undo() {
    let backend = Arc::new(MemoryBackend::new().with_file("/d1/f", "f").with_dir("/d2"));
    let panel = panel_over(backend.clone(), "/");
    let mut resolver = ScriptedResolver::default();

    let plan = panel
        .plan_transfer(TransferKind::Move, &strings(&["/d1"]), "/d2", &mut resolver)
        .unwrap();
    assert_eq!(plan.steps(), &[PlannedOperation::move_to("/d1", "/d2/d1")]);

    let outcome = panel.run(plan, |_| {}).await.unwrap();
    assert!(outcome.is_success());
    assert!(backend.contains("/d2/d1/f"));

    let record = panel.context().undo_ledger().get().unwrap();
    assert_eq!(record.kind, UndoKind::Move);
    assert_eq!(record.moves, vec![("/d1".to_string(), "/d2/d1".to_string())]);
}

#[tokio::test]
async fn test_scenario_d_cancel_returns_no_plan() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_file("/a.txt", "a")
            .with_file("/dst/a.txt", "b"),
    );
    let mut resolver = ScriptedResolver::new([ConflictDecision::once(ConflictAction::Cancel)]);
    let plan = PlanBuilder::new(backend.as_ref(), &mut resolver).build_transfer(
        TransferKind::Move,
        &strings(&["/a.txt"]),
        "/dst",
    );
    assert!(plan.is_none());

    let panel = panel_over(backend.clone(), "/");
    backend.clear_calls();
    let mut resolver = FixedResolver::new(ConflictAction::Cancel);
    let report = panel
        .move_into(&strings(&["/a.txt"]), "/dst", &mut resolver, |_| {})
        .await
        .unwrap();
    assert_eq!(report, BatchReport::Declined);
    assert!(backend.calls().is_empty());
}

#[test]
fn test_upload_creates_directories_before_contents() {
    let temp = tempfile::tempdir().unwrap();
    let tree = temp.path().join("tree");
    std::fs::create_dir_all(tree.join("a/b")).unwrap();
    std::fs::create_dir_all(tree.join("c")).unwrap();
    std::fs::write(tree.join("a/b/deep.txt"), "deep").unwrap();
    std::fs::write(tree.join("a/one.txt"), "one").unwrap();
    std::fs::write(tree.join("c/two.txt"), "two").unwrap();
    std::fs::write(tree.join("top.txt"), "top").unwrap();

    let backend = MemoryBackend::new().with_dir("/up");
    let mut resolver = ScriptedResolver::default();
    let plan = PlanBuilder::new(&backend, &mut resolver)
        .build_upload(&[tree.clone()], "/up")
        .unwrap();

    let steps = plan.steps();
    for (i, step) in steps.iter().enumerate() {
        if step.kind != OperationKind::MkdirRemote {
            continue;
        }
        let prefix = format!("{}/", step.destination);
        let first_inside = steps
            .iter()
            .position(|s| s.destination.starts_with(&prefix));
        if let Some(first_inside) = first_inside {
            assert!(i < first_inside, "mkdir {} after its contents", step.destination);
        }
    }
    assert_eq!(steps[0], PlannedOperation::mkdir_remote("/up/tree"));
    assert_eq!(
        steps
            .iter()
            .filter(|s| s.kind == OperationKind::Upload)
            .count(),
        4
    );
}

#[tokio::test]
async fn test_upload_and_download_run_end_to_end() {
    let temp = tempfile::tempdir().unwrap();
    let tree = temp.path().join("tree");
    std::fs::create_dir_all(tree.join("sub")).unwrap();
    std::fs::write(tree.join("sub/f.txt"), "payload").unwrap();

    let backend = Arc::new(MemoryBackend::new().with_dir("/up"));
    let panel = panel_over(backend.clone(), "/up");
    let mut resolver = FixedResolver::new(ConflictAction::Overwrite);

    let report = panel
        .upload_into(&[tree.clone()], "/up", &mut resolver, |_| {})
        .await
        .unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert_eq!(
        backend.file_contents("/up/tree/sub/f.txt").as_deref(),
        Some(&b"payload"[..])
    );

    let out = temp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();
    let report = panel
        .download_into(&strings(&["/up/tree"]), &out, &mut resolver, |_| {})
        .await
        .unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert_eq!(
        std::fs::read_to_string(out.join("tree/sub/f.txt")).unwrap(),
        "payload"
    );
}

#[test]
fn test_download_overwrite_uses_local_existence() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("a.txt"), "local").unwrap();

    let backend = MemoryBackend::new().with_file("/r/a.txt", "remote");
    let mut resolver = ScriptedResolver::new([ConflictDecision::once(ConflictAction::Overwrite)]);
    let plan = PlanBuilder::new(&backend, &mut resolver)
        .build_download(&strings(&["/r/a.txt"]), temp.path())
        .unwrap();

    let local = temp.path().join("a.txt").to_string_lossy().into_owned();
    assert_eq!(
        plan.steps(),
        &[
            PlannedOperation::delete_local(local.clone(), false),
            PlannedOperation::download("/r/a.txt", local),
        ]
    );
    assert_eq!(resolver.prompts.len(), 1);
}

#[test]
fn test_sticky_skip_prompts_once() {
    let backend = MemoryBackend::new()
        .with_file("/src/a", "a")
        .with_file("/src/b", "b")
        .with_file("/src/c", "c")
        .with_file("/src/d", "d")
        .with_file("/dst/a", "a")
        .with_file("/dst/b", "b")
        .with_file("/dst/c", "c");
    let mut resolver = ScriptedResolver::new([ConflictDecision::for_all(ConflictAction::Skip)]);

    let plan = PlanBuilder::new(&backend, &mut resolver)
        .build_transfer(
            TransferKind::Copy,
            &strings(&["/src/a", "/src/b", "/src/c", "/src/d"]),
            "/dst",
        )
        .unwrap();

    assert_eq!(resolver.prompts, vec!["/dst/a"]);
    assert_eq!(plan.steps(), &[PlannedOperation::copy("/src/d", "/dst/d", false)]);
}

#[test]
fn test_sticky_policy_resets_between_builds() {
    let backend = MemoryBackend::new()
        .with_file("/src/a", "a")
        .with_file("/dst/a", "a");
    let mut resolver = ScriptedResolver::new([
        ConflictDecision::for_all(ConflictAction::Skip),
        ConflictDecision::once(ConflictAction::Overwrite),
    ]);

    let mut builder = PlanBuilder::new(&backend, &mut resolver);
    let first = builder
        .build_transfer(TransferKind::Copy, &strings(&["/src/a"]), "/dst")
        .unwrap();
    let second = builder
        .build_transfer(TransferKind::Copy, &strings(&["/src/a"]), "/dst")
        .unwrap();
    assert!(first.is_empty());
    assert_eq!(second.len(), 2);
}

#[test]
fn test_sticky_rename_only_asks_for_names() {
    let backend = MemoryBackend::new()
        .with_file("/src/a.txt", "a")
        .with_file("/src/b.txt", "b")
        .with_file("/src/c.txt", "c")
        .with_file("/dst/a.txt", "old")
        .with_file("/dst/b.txt", "old")
        .with_file("/dst/b2.txt", "taken")
        .with_file("/dst/c.txt", "old");
    let mut resolver = ScriptedResolver::new([ConflictDecision::for_all(ConflictAction::Rename)])
        .with_names([
            Some("a2.txt".to_string()),
            Some("b2.txt".to_string()),
            Some("b3.txt".to_string()),
            Some("c2.txt".to_string()),
        ]);

    let plan = PlanBuilder::new(&backend, &mut resolver)
        .build_transfer(
            TransferKind::Copy,
            &strings(&["/src/a.txt", "/src/b.txt", "/src/c.txt"]),
            "/dst",
        )
        .unwrap();

    assert_eq!(resolver.prompts, vec!["/dst/a.txt"]);
    let asked: Vec<&str> = resolver
        .rename_prompts
        .iter()
        .map(|(dir, name)| {
            assert_eq!(dir, "/dst");
            name.as_str()
        })
        .collect();
    assert_eq!(asked, vec!["a.txt", "b.txt", "b.txt", "c.txt"]);
    assert_eq!(
        plan.steps(),
        &[
            PlannedOperation::copy("/src/a.txt", "/dst/a2.txt", false),
            PlannedOperation::copy("/src/b.txt", "/dst/b3.txt", false),
            PlannedOperation::copy("/src/c.txt", "/dst/c2.txt", false),
        ]
    );
}

#[tokio::test]
async fn test_download_directory_overwrite_replaces_local_tree() {
    let temp = tempfile::tempdir().unwrap();
    let existing = temp.path().join("proj");
    std::fs::create_dir_all(&existing).unwrap();
    std::fs::write(existing.join("stale.txt"), "stale").unwrap();
    std::fs::write(existing.join("a.txt"), "local").unwrap();

    let backend = Arc::new(
        MemoryBackend::new()
            .with_file("/r/proj/a.txt", "remote")
            .with_file("/r/proj/sub/b.txt", "b"),
    );
    let local = existing.to_string_lossy().into_owned();

    let mut resolver = ScriptedResolver::new([ConflictDecision::once(ConflictAction::Overwrite)]);
    let plan = PlanBuilder::new(backend.as_ref(), &mut resolver)
        .build_download(&strings(&["/r/proj"]), temp.path())
        .unwrap();
    assert_eq!(
        &plan.steps()[..2],
        &[
            PlannedOperation::delete_local(local.clone(), true),
            PlannedOperation::mkdir_local(local),
        ]
    );
    let local_deletes = plan
        .steps()
        .iter()
        .filter(|s| s.kind == OperationKind::DeleteLocal)
        .count();
    assert_eq!(local_deletes, 1);

    let panel = panel_over(backend, "/r");
    let mut resolver = FixedResolver::new(ConflictAction::Overwrite);
    let report = panel
        .download_into(&strings(&["/r/proj"]), temp.path(), &mut resolver, |_| {})
        .await
        .unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert!(!existing.join("stale.txt").exists());
    assert_eq!(std::fs::read_to_string(existing.join("a.txt")).unwrap(), "remote");
    assert_eq!(std::fs::read_to_string(existing.join("sub/b.txt")).unwrap(), "b");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panel_move_and_undo_on_multi_thread_runtime() {
    let backend = Arc::new(MemoryBackend::new().with_file("/a.txt", "a").with_dir("/dst"));
    let panel = panel_over(backend.clone(), "/");
    let mut resolver = FixedResolver::new(ConflictAction::Cancel);

    let report = panel
        .move_into(&strings(&["/a.txt"]), "/dst", &mut resolver, |_| {})
        .await
        .unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert!(backend.contains("/dst/a.txt"));

    let report = panel.undo(&mut resolver, |_| {}).await.unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert!(backend.contains("/a.txt"));
    assert!(!backend.contains("/dst/a.txt"));
    assert!(panel.context().undo_ledger().is_empty());
}

#[tokio::test]
async fn test_cancel_during_step_stops_at_next_boundary() {
    let temp = tempfile::tempdir().unwrap();
    let snapshot_path = temp.path().join("last_batch.json");

    let inner = Arc::new(MemoryBackend::new());
    let token = CancellationToken::new();
    let trigger = token.clone();
    let backend = HookedBackend::new(inner.clone(), move |n| {
        if n == 2 {
            trigger.cancel();
        }
    });

    let plan = Plan::new(
        PlanKind::Copy,
        ["/d1", "/d2", "/d3", "/d4"]
            .into_iter()
            .map(PlannedOperation::mkdir_remote)
            .collect(),
    );
    let executor = BatchExecutor::new(Arc::new(backend)).with_snapshot_path(&snapshot_path);

    let mut progress = Vec::new();
    let outcome = executor
        .start_with(plan, token)
        .wait_with(|event| {
            if let BatchEvent::Progress(p) = event {
                progress.push(p.step);
            }
        })
        .await;

    assert!(outcome.cancelled);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.executed, 2);
    assert_eq!(progress, vec![1, 2]);
    assert!(inner.contains("/d2"));
    assert!(!inner.contains("/d3"));

    let snapshot = BatchSnapshot::load(&snapshot_path).unwrap();
    assert_eq!(snapshot.title, "Copying...");
    assert_eq!(
        snapshot.remaining,
        vec![
            PlannedOperation::mkdir_remote("/d3"),
            PlannedOperation::mkdir_remote("/d4"),
        ]
    );
}

#[tokio::test]
async fn test_cancel_seen_while_event_channel_is_full() {
    let backend = Arc::new(MemoryBackend::new());
    let config = EngineConfig::builder()
        .snapshot_path(None::<PathBuf>)
        .event_channel_size(1usize)
        .build()
        .unwrap();
    let executor = BatchExecutor::from_config(backend.clone(), &config);
    let plan = Plan::new(
        PlanKind::Copy,
        ["/d1", "/d2", "/d3"]
            .into_iter()
            .map(PlannedOperation::mkdir_remote)
            .collect(),
    );

    // Nobody reads events, so the second progress send stays blocked.
    let handle = executor.start(plan);
    for _ in 0..200 {
        if backend.contains("/d1") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(backend.contains("/d1"));
    assert!(!backend.contains("/d2"));

    handle.cancel();
    let outcome = handle.wait().await;
    assert!(outcome.cancelled);
    assert_eq!(outcome.executed, 1);
    assert!(!backend.contains("/d2"));
    assert!(!backend.contains("/d3"));
}

#[tokio::test]
async fn test_error_stops_batch_and_writes_snapshot() {
    let temp = tempfile::tempdir().unwrap();
    let snapshot_path = temp.path().join("state").join("last_batch.json");

    let backend = Arc::new(MemoryBackend::new().with_file("/a.txt", "a"));
    let executor = BatchExecutor::new(backend.clone()).with_snapshot_path(&snapshot_path);
    let plan = Plan::new(
        PlanKind::Move,
        vec![
            PlannedOperation::mkdir_remote("/dst"),
            PlannedOperation::move_to("/missing.txt", "/dst/missing.txt"),
            PlannedOperation::move_to("/a.txt", "/dst/a.txt"),
        ],
    );

    let mut events = Vec::new();
    let outcome = executor
        .start(plan)
        .wait_with(|e| events.push(e.clone()))
        .await;

    assert!(!outcome.cancelled);
    assert_eq!(outcome.executed, 1);
    let message = outcome.error_message();
    assert!(message.starts_with("2/3: missing.txt\n"), "{message}");
    assert!(backend.contains("/a.txt"));
    assert!(matches!(events.last(), Some(BatchEvent::Finished(o)) if o == &outcome));

    let snapshot = BatchSnapshot::load(&snapshot_path).unwrap();
    assert_eq!(snapshot.title, "Moving...");
    assert_eq!(snapshot.remaining.len(), 2);
    assert_eq!(snapshot.remaining[0].source, "/missing.txt");
}

#[tokio::test]
async fn test_successful_batch_writes_no_snapshot() {
    let temp = tempfile::tempdir().unwrap();
    let snapshot_path = temp.path().join("last_batch.json");
    let executor =
        BatchExecutor::new(Arc::new(MemoryBackend::new())).with_snapshot_path(&snapshot_path);

    let outcome = executor
        .start(Plan::new(
            PlanKind::Copy,
            vec![PlannedOperation::mkdir_remote("/x")],
        ))
        .wait()
        .await;
    assert!(outcome.is_success());
    assert!(!snapshot_path.exists());
}

#[tokio::test]
async fn test_mkdir_existing_directory_is_not_an_error() {
    let inner = Arc::new(MemoryBackend::new().with_dir("/exists"));
    let mut backend = HookedBackend::new(inner, |_| {});
    backend.strict_mkdir = true;

    let outcome = BatchExecutor::new(Arc::new(backend))
        .start(Plan::new(
            PlanKind::Upload,
            vec![PlannedOperation::mkdir_remote("/exists")],
        ))
        .wait()
        .await;
    assert!(outcome.is_success(), "{}", outcome.error_message());
}

#[tokio::test]
async fn test_undo_reverses_in_reverse_order() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_file("/a", "a")
            .with_file("/c", "c")
            .with_dir("/x"),
    );
    let panel = panel_over(backend.clone(), "/");
    let mut resolver = ScriptedResolver::default();

    let report = panel
        .move_into(&strings(&["/a", "/c"]), "/x", &mut resolver, |_| {})
        .await
        .unwrap();
    assert!(report.outcome().unwrap().is_success());

    let ledger = panel.context().undo_ledger();
    let UndoPlan::Ready { plan, .. } = ledger.build_inverse_plan(backend.as_ref(), &mut resolver)
    else {
        panic!("expected an inverse plan");
    };
    assert_eq!(
        plan.steps(),
        &[
            PlannedOperation::move_to("/x/c", "/c"),
            PlannedOperation::move_to("/x/a", "/a"),
        ]
    );

    backend.clear_calls();
    let report = panel.undo(&mut resolver, |_| {}).await.unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert_eq!(backend.calls(), vec!["move /x/c -> /c", "move /x/a -> /a"]);
    assert!(ledger.is_empty());
    assert!(backend.contains("/a") && backend.contains("/c"));

    let again = panel.undo(&mut resolver, |_| {}).await.unwrap();
    assert_eq!(again, BatchReport::NothingToDo);
}

#[tokio::test]
async fn test_second_move_replaces_undo_record() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_file("/first", "1")
            .with_file("/second", "2")
            .with_dir("/x"),
    );
    let panel = panel_over(backend.clone(), "/");
    let mut resolver = ScriptedResolver::default();

    panel
        .move_into(&strings(&["/first"]), "/x", &mut resolver, |_| {})
        .await
        .unwrap();
    panel
        .move_into(&strings(&["/second"]), "/x", &mut resolver, |_| {})
        .await
        .unwrap();

    panel.undo(&mut resolver, |_| {}).await.unwrap();
    assert!(backend.contains("/second"));
    assert!(backend.contains("/x/first"));
    assert!(!backend.contains("/first"));
}

#[tokio::test]
async fn test_failed_undo_keeps_record() {
    let backend = Arc::new(MemoryBackend::new().with_file("/a", "a").with_dir("/x"));
    let panel = panel_over(backend.clone(), "/");
    let mut resolver = ScriptedResolver::default();

    panel
        .move_into(&strings(&["/a"]), "/x", &mut resolver, |_| {})
        .await
        .unwrap();
    // The moved file is gone, so the inverse move fails.
    backend.remove("/x/a", false).unwrap();

    let report = panel.undo(&mut resolver, |_| {}).await.unwrap();
    assert!(report.outcome().unwrap().error.is_some());
    assert!(!panel.context().undo_ledger().is_empty());
}

#[tokio::test]
async fn test_copy_and_delete_are_not_undoable() {
    let backend = Arc::new(MemoryBackend::new().with_file("/a", "a").with_dir("/x"));
    let panel = panel_over(backend.clone(), "/");
    let mut resolver = ScriptedResolver::default();

    panel
        .copy_into(&strings(&["/a"]), "/x", &mut resolver, |_| {})
        .await
        .unwrap();
    panel.delete(&strings(&["/a"]), |_| {}).await.unwrap();

    assert!(panel.context().undo_ledger().is_empty());
    assert!(backend.contains("/x/a"));
    assert!(!backend.contains("/a"));
}

#[tokio::test]
async fn test_paste_move_clears_clipboard() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_file("/a.txt", "a")
            .with_file("/b.txt", "b")
            .with_dir("/dst"),
    );
    let panel = panel_over(backend.clone(), "/dst");
    let clipboard = panel.context().clipboard().clone();
    let mut resolver = ScriptedResolver::default();

    clipboard.set(TransferKind::Copy, strings(&["/b.txt"]));
    panel.paste_into("/dst", &mut resolver, |_| {}).await.unwrap();
    assert!(!clipboard.is_empty());

    clipboard.set(TransferKind::Move, strings(&["/a.txt"]));
    let report = panel.paste_into("/dst", &mut resolver, |_| {}).await.unwrap();
    assert!(report.outcome().unwrap().is_success());
    assert!(clipboard.is_empty());
    assert!(backend.contains("/dst/a.txt"));
    assert!(backend.contains("/dst/b.txt"));
    assert!(!panel.context().undo_ledger().is_empty());
}

#[tokio::test]
async fn test_panels_share_ledger_but_not_batch_slot() {
    let backend = Arc::new(MemoryBackend::new());
    let context = SharedContext::new(backend, no_snapshot_config());
    let left = Panel::new(context.clone(), "/");
    let right = Panel::new(context, "/");

    let plan = Plan::new(PlanKind::Copy, vec![PlannedOperation::mkdir_remote("/a")]);
    let handle = left.start(plan.clone()).unwrap();
    assert!(matches!(
        left.delete(&strings(&["/a"]), |_| {}).await,
        Err(OpsError::BatchInProgress)
    ));
    let other = right.start(Plan::new(PlanKind::Copy, Vec::new())).unwrap();

    handle.wait().await;
    other.wait().await;

    left.context()
        .undo_ledger()
        .record_move(vec![("/a".to_string(), "/b".to_string())]);
    assert!(!right.context().undo_ledger().is_empty());
}
