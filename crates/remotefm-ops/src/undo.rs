//! Single-slot undo ledger for move batches.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info};

use remotefm_core::RemoteBackend;

use crate::builder::PlanBuilder;
use crate::conflict::ConflictResolver;
use crate::operation::Plan;
use crate::progress::BatchOutcome;

/// Kind of batch that can be undone. Only moves are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UndoKind {
    Move,
}

/// The most recent reversible batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    /// Identifier, unique within one ledger.
    pub id: u64,
    /// When the batch completed.
    pub timestamp: SystemTime,
    pub kind: UndoKind,
    /// `(original_source, actual_destination)` pairs in execution order.
    pub moves: Vec<(String, String)>,
    /// Human-readable description.
    pub description: String,
}

impl UndoRecord {
    /// Create a move record.
    pub fn moves(id: u64, moves: Vec<(String, String)>) -> Self {
        let description = format!("Moved {} items", moves.len());
        Self {
            id,
            timestamp: SystemTime::now(),
            kind: UndoKind::Move,
            moves,
            description,
        }
    }

    /// Get a description of how to undo this record.
    pub fn undo_description(&self) -> String {
        format!("Move {} items back to original location", self.moves.len())
    }
}

/// Result of preparing an undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoPlan {
    /// No record, or nothing left to reverse. The ledger is now empty.
    Nothing,
    /// The user cancelled a conflict. The record is kept.
    Cancelled,
    /// An inverse plan for the record with `record_id`.
    Ready { record_id: u64, plan: Plan },
}

#[derive(Debug, Default)]
struct LedgerState {
    record: Option<UndoRecord>,
    next_id: u64,
}

/// Shared handle to the single undo record.
///
/// Clones share the same slot, so every panel created from one context
/// sees and replaces the same record.
#[derive(Debug, Clone, Default)]
pub struct UndoLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl UndoLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the stored record.
    pub fn set(&self, record: UndoRecord) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(record.id + 1);
        state.record = Some(record);
    }

    /// A copy of the stored record.
    pub fn get(&self) -> Option<UndoRecord> {
        self.lock().record.clone()
    }

    /// Drop the stored record.
    pub fn clear(&self) {
        self.lock().record = None;
    }

    /// Check if there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.lock().record.is_none()
    }

    /// Record executed moves, replacing any previous record.
    ///
    /// An empty list leaves the ledger untouched. Returns the new record id.
    pub fn record_move(&self, moves: Vec<(String, String)>) -> Option<u64> {
        if moves.is_empty() {
            return None;
        }
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        debug!(id, moves = moves.len(), "recorded move batch for undo");
        state.record = Some(UndoRecord::moves(id, moves));
        Some(id)
    }

    /// Clear the record only if it is still the one with `record_id`.
    fn clear_if(&self, record_id: u64) {
        let mut state = self.lock();
        if state.record.as_ref().is_some_and(|r| r.id == record_id) {
            state.record = None;
        }
    }

    /// Build the inverse plan of the stored record.
    ///
    /// Inverse moves run newest first, and each original location goes
    /// through the conflict protocol again since it may have been reused.
    pub fn build_inverse_plan(
        &self,
        backend: &dyn RemoteBackend,
        resolver: &mut dyn ConflictResolver,
    ) -> UndoPlan {
        let Some(record) = self.get() else {
            return UndoPlan::Nothing;
        };
        if record.moves.is_empty() {
            self.clear_if(record.id);
            return UndoPlan::Nothing;
        }

        match PlanBuilder::new(backend, resolver).build_undo(&record.moves) {
            None => UndoPlan::Cancelled,
            Some(plan) if plan.is_empty() => {
                info!(id = record.id, "every inverse move was skipped, dropping undo record");
                self.clear_if(record.id);
                UndoPlan::Nothing
            }
            Some(plan) => UndoPlan::Ready {
                record_id: record.id,
                plan,
            },
        }
    }

    /// Settle the record after its inverse plan ran.
    ///
    /// Success clears it. A cancelled or failed undo keeps the record as it
    /// was, even if some inverse moves already happened.
    pub fn complete(&self, record_id: u64, outcome: &BatchOutcome) {
        if outcome.is_success() {
            self.clear_if(record_id);
        } else {
            info!(id = record_id, "undo did not complete, keeping record");
        }
    }
}
