//! Plan building: expanding a request into ordered primitive steps.
//!
//! Building only probes the backend (read-only) and asks the resolver about
//! colliding destinations. Nothing is mutated until the plan is executed.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use remotefm_core::{path, probe_exists, probe_is_directory, RemoteBackend};

use crate::conflict::{ConflictAction, ConflictResolver, ResolutionPolicy};
use crate::operation::{Plan, PlanKind, PlannedOperation, TransferKind};
use crate::walk::{local_walk, remote_walk};

/// Upper bound on rename prompts for a single item.
const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Which filesystem a destination lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Remote,
    Local,
}

/// Where a source ends up after conflict resolution.
#[derive(Debug)]
enum Target {
    /// Destination is free.
    Free(String),
    /// Destination exists and must be deleted first.
    Replace(String),
    Skip,
    Cancel,
}

/// Builds plans against one backend, consulting one resolver.
///
/// Each `build_*` call starts with a fresh [`ResolutionPolicy`], so an
/// "apply to all" answer never leaks from one build into the next.
pub struct PlanBuilder<'a> {
    backend: &'a dyn RemoteBackend,
    resolver: &'a mut dyn ConflictResolver,
}

impl<'a> PlanBuilder<'a> {
    /// Create a builder.
    pub fn new(backend: &'a dyn RemoteBackend, resolver: &'a mut dyn ConflictResolver) -> Self {
        Self { backend, resolver }
    }

    /// Plan a remote copy or move of `sources` into `destination_dir`.
    ///
    /// Returns `None` when the user cancels a conflict.
    pub fn build_transfer(
        &mut self,
        kind: TransferKind,
        sources: &[String],
        destination_dir: &str,
    ) -> Option<Plan> {
        let dest_dir = path::normalize_dir(destination_dir);
        let mut steps = Vec::new();
        let mut policy = ResolutionPolicy::Ask;

        for source in sources {
            let source = path::clean(source).to_string();
            let name = path::basename(&source).to_string();
            if name.is_empty() {
                warn!(source, "refusing to transfer the root directory");
                continue;
            }

            // Unknown counts as a file; only copies care about the flag.
            let recursive = match kind {
                TransferKind::Copy => {
                    probe_is_directory(self.backend, &source).unwrap_or(false)
                }
                TransferKind::Move => false,
            };

            let initial = path::join(&dest_dir, &name);
            let (target, next) =
                self.resolve_target(policy, Side::Remote, initial, &dest_dir, &name);
            policy = next;

            let destination = match target {
                Target::Free(dst) => dst,
                Target::Replace(dst) => {
                    if path::is_within(&source, &dst) {
                        warn!(source, destination = dst, "overwrite would delete the source, skipping");
                        continue;
                    }
                    steps.push(self.remote_delete_step(&dst));
                    dst
                }
                Target::Skip => continue,
                Target::Cancel => {
                    info!(kind = %kind, "plan building cancelled by user");
                    return None;
                }
            };

            if path::is_within(&destination, &source) {
                warn!(source, destination, "cannot place a directory inside itself, skipping");
                continue;
            }

            steps.push(match kind {
                TransferKind::Copy => PlannedOperation::copy(source, destination, recursive),
                TransferKind::Move => PlannedOperation::move_to(source, destination),
            });
        }

        debug!(kind = %kind, steps = steps.len(), "built transfer plan");
        Some(Plan::new(kind.into(), steps))
    }

    /// Plan an upload of local files/directories into `destination_dir`.
    pub fn build_upload(&mut self, local_paths: &[PathBuf], destination_dir: &str) -> Option<Plan> {
        let dest_dir = path::normalize_dir(destination_dir);
        let mut steps = Vec::new();
        let mut policy = ResolutionPolicy::Ask;

        for local in local_paths {
            let local = std::path::absolute(local).unwrap_or_else(|_| local.clone());
            let Some(name) = local.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                warn!(path = %local.display(), "local path has no file name, skipping");
                continue;
            };
            let is_dir = local.is_dir();

            let initial = path::join(&dest_dir, &name);
            let (target, next) =
                self.resolve_target(policy, Side::Remote, initial, &dest_dir, &name);
            policy = next;

            let (remote_base, replaced) = match target {
                Target::Free(dst) => (dst, false),
                Target::Replace(dst) => {
                    steps.push(self.remote_delete_step(&dst));
                    (dst, true)
                }
                Target::Skip => continue,
                Target::Cancel => {
                    info!("upload plan cancelled by user");
                    return None;
                }
            };

            let local_str = local.to_string_lossy().into_owned();
            if !is_dir {
                steps.push(PlannedOperation::upload(local_str, remote_base));
                continue;
            }

            steps.push(PlannedOperation::mkdir_remote(remote_base.clone()));
            for entry in local_walk(&local) {
                let remote_path = path::join(&remote_base, &entry.relative);
                if entry.is_dir {
                    steps.push(PlannedOperation::mkdir_remote(remote_path));
                    continue;
                }
                // Inside a replaced directory everything is already gone.
                if !replaced && probe_exists(self.backend, &remote_path) {
                    steps.push(self.remote_delete_step(&remote_path));
                }
                steps.push(PlannedOperation::upload(entry.path, remote_path));
            }
        }

        debug!(steps = steps.len(), "built upload plan");
        Some(Plan::new(PlanKind::Upload, steps))
    }

    /// Plan a download of remote files/directories into a local directory.
    pub fn build_download(&mut self, sources: &[String], target_dir: &Path) -> Option<Plan> {
        let target_dir = std::path::absolute(target_dir).unwrap_or_else(|_| target_dir.to_path_buf());
        let target_dir_str = target_dir.to_string_lossy().into_owned();
        let mut steps = Vec::new();
        let mut policy = ResolutionPolicy::Ask;

        for source in sources {
            let is_dir = probe_is_directory(self.backend, path::clean(source))
                .unwrap_or_else(|| source.ends_with('/'));
            let source = path::clean(source).to_string();
            let name = path::basename(&source).to_string();
            if name.is_empty() {
                warn!(source, "refusing to download the root directory");
                continue;
            }

            let initial = join_local(&target_dir_str, &name);
            let (target, next) =
                self.resolve_target(policy, Side::Local, initial, &target_dir_str, &name);
            policy = next;

            let (local_base, replaced) = match target {
                Target::Free(dst) => (dst, false),
                Target::Replace(dst) => {
                    let recursive = Path::new(&dst).is_dir();
                    steps.push(PlannedOperation::delete_local(dst.clone(), recursive));
                    (dst, true)
                }
                Target::Skip => continue,
                Target::Cancel => {
                    info!("download plan cancelled by user");
                    return None;
                }
            };

            if !is_dir {
                steps.push(PlannedOperation::download(source, local_base));
                continue;
            }

            steps.push(PlannedOperation::mkdir_local(local_base.clone()));
            for entry in remote_walk(self.backend, &source) {
                let local_path = entry
                    .relative
                    .split('/')
                    .fold(PathBuf::from(&local_base), |acc, part| acc.join(part));
                let local_path = local_path.to_string_lossy().into_owned();
                if entry.is_dir {
                    steps.push(PlannedOperation::mkdir_local(local_path));
                    continue;
                }
                if !replaced && Path::new(&local_path).exists() {
                    steps.push(PlannedOperation::delete_local(local_path.clone(), false));
                }
                steps.push(PlannedOperation::download(entry.path, local_path));
            }
        }

        debug!(steps = steps.len(), "built download plan");
        Some(Plan::new(PlanKind::Download, steps))
    }

    /// Plan the inverse of recorded moves: `dst -> src`, newest first.
    ///
    /// The original locations may have been reused since, so every inverse
    /// destination goes through the same conflict protocol.
    pub fn build_undo(&mut self, moves: &[(String, String)]) -> Option<Plan> {
        let mut steps = Vec::new();
        let mut policy = ResolutionPolicy::Ask;

        for (original, moved_to) in moves.iter().rev() {
            let undo_src = path::clean(moved_to).to_string();
            let undo_dst = path::clean(original).to_string();
            let dir = path::parent(&undo_dst).to_string();
            let name = path::basename(&undo_dst).to_string();

            let (target, next) = self.resolve_target(policy, Side::Remote, undo_dst, &dir, &name);
            policy = next;

            let destination = match target {
                Target::Free(dst) => dst,
                Target::Replace(dst) => {
                    steps.push(self.remote_delete_step(&dst));
                    dst
                }
                Target::Skip => continue,
                Target::Cancel => {
                    info!("undo plan cancelled by user");
                    return None;
                }
            };
            steps.push(PlannedOperation::move_to(undo_src, destination));
        }

        Some(Plan::new(PlanKind::Undo, steps))
    }

    /// Delete step for an existing remote path.
    fn remote_delete_step(&self, target: &str) -> PlannedOperation {
        let recursive = probe_is_directory(self.backend, target).unwrap_or(false);
        PlannedOperation::delete(target, recursive)
    }

    fn exists_on(&self, side: Side, candidate: &str) -> bool {
        match side {
            Side::Remote => probe_exists(self.backend, candidate),
            Side::Local => Path::new(candidate).exists(),
        }
    }

    /// Run the conflict protocol for one item until it settles.
    fn resolve_target(
        &mut self,
        mut policy: ResolutionPolicy,
        side: Side,
        initial: String,
        dir: &str,
        name: &str,
    ) -> (Target, ResolutionPolicy) {
        let mut destination = initial;
        let mut attempts = 0;

        loop {
            if !self.exists_on(side, &destination) {
                return (Target::Free(destination), policy);
            }

            let (action, next) = policy.decide(&mut *self.resolver, &destination);
            policy = next;
            debug!(destination, action = %action, "resolved conflict");

            match action {
                ConflictAction::Overwrite => return (Target::Replace(destination), policy),
                ConflictAction::Skip => return (Target::Skip, policy),
                ConflictAction::Cancel => return (Target::Cancel, policy),
                ConflictAction::Rename => {
                    attempts += 1;
                    if attempts > MAX_RENAME_ATTEMPTS {
                        warn!(destination, "giving up on renaming, skipping item");
                        return (Target::Skip, policy);
                    }
                    let new_name = self
                        .resolver
                        .prompt_rename(dir, name)
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty());
                    match new_name {
                        Some(new_name) => {
                            destination = match side {
                                Side::Remote => path::join(dir, &new_name),
                                Side::Local => join_local(dir, &new_name),
                            };
                        }
                        None => return (Target::Skip, policy),
                    }
                }
            }
        }
    }
}

fn join_local(dir: &str, name: &str) -> String {
    Path::new(dir).join(name).to_string_lossy().into_owned()
}

/// Plan deletion of remote paths.
///
/// Directories are removed recursively; when the directory probe gives no
/// answer a trailing '/' is taken as the hint.
pub fn build_delete(backend: &dyn RemoteBackend, paths: &[String]) -> Plan {
    let steps = paths
        .iter()
        .filter(|p| path::clean(p) != "/")
        .map(|p| {
            let target = path::clean(p);
            let recursive = probe_is_directory(backend, target).unwrap_or_else(|| p.ends_with('/'));
            PlannedOperation::delete(target, recursive)
        })
        .collect();
    Plan::new(PlanKind::Delete, steps)
}
