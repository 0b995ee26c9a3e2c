//! Engine configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::snapshot::default_snapshot_path;
use crate::OPERATION_CHANNEL_SIZE;

/// Configuration for batch execution.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Where the diagnostic snapshot is written (None = nowhere).
    #[builder(default = "default_snapshot_path()")]
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,

    /// Write a snapshot when a batch stops early.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub persist_snapshots: bool,

    /// Buffer size of the batch event channel.
    #[builder(default = "OPERATION_CHANNEL_SIZE")]
    #[serde(default = "default_channel_size")]
    pub event_channel_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_channel_size() -> usize {
    OPERATION_CHANNEL_SIZE
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.event_channel_size == Some(0) {
            return Err("Event channel size must be at least 1".to_string());
        }
        if let Some(Some(path)) = &self.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err("Snapshot path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// The snapshot location, if snapshots are enabled.
    pub fn snapshot_target(&self) -> Option<&PathBuf> {
        if self.persist_snapshots {
            self.snapshot_path.as_ref()
        } else {
            None
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            persist_snapshots: true,
            event_channel_size: OPERATION_CHANNEL_SIZE,
        }
    }
}
