//! Progress and outcome types for batch execution.

use serde::{Deserialize, Serialize};

/// Progress for the step about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgress {
    /// 1-based step number.
    pub step: usize,
    /// Total number of steps in the plan.
    pub total: usize,
    /// Human label, e.g. `3/7: report.txt`.
    pub label: String,
}

impl StepProgress {
    /// Get the progress as a percentage (0.0 to 100.0) of steps started.
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.step as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Event emitted by a running batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// Emitted once per step, strictly before the step executes.
    Progress(StepProgress),
    /// Emitted last, exactly once.
    Finished(BatchOutcome),
}

/// Result of running a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// The batch stopped on a cancellation request.
    pub cancelled: bool,
    /// Failing step label plus raw error text.
    pub error: Option<String>,
    /// Number of steps that completed.
    pub executed: usize,
    /// Number of steps in the plan.
    pub total: usize,
}

impl BatchOutcome {
    /// Every step completed.
    pub fn completed(total: usize) -> Self {
        Self {
            cancelled: false,
            error: None,
            executed: total,
            total,
        }
    }

    /// Stopped between steps on request.
    pub fn cancelled(executed: usize, total: usize) -> Self {
        Self {
            cancelled: true,
            error: None,
            executed,
            total,
        }
    }

    /// Stopped on a failing step.
    pub fn failed(executed: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            cancelled: false,
            error: Some(message.into()),
            executed,
            total,
        }
    }

    /// Check if the batch ran to completion.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.error.is_none()
    }

    /// Error text, empty when there is none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }

    /// Get a human-readable summary of the batch.
    pub fn summary(&self) -> String {
        if self.cancelled {
            format!("Cancelled after {} of {} steps", self.executed, self.total)
        } else if let Some(error) = &self.error {
            format!(
                "Failed after {} of {} steps: {}",
                self.executed, self.total, error
            )
        } else {
            format!("Completed {} steps", self.total)
        }
    }
}

/// What a panel-level request amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchReport {
    /// There was nothing to execute.
    NothingToDo,
    /// The user cancelled while conflicts were being resolved; nothing ran.
    Declined,
    /// A plan was executed.
    Finished(BatchOutcome),
}

impl BatchReport {
    /// The execution outcome, if a plan ran.
    pub fn outcome(&self) -> Option<&BatchOutcome> {
        match self {
            Self::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}
