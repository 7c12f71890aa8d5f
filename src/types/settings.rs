use serde::{Deserialize, Serialize};

/// Top-level sync settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    pub storage: StorageSettings,
    pub sync: ReconcileSettings,
    pub logging: LoggingSettings,
}

/// Where the local backend keeps its data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Path of the SQLite file. `None` means the platform data directory.
    pub database_path: Option<String>,
}

/// Reconciliation behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileSettings {
    pub retry: RetrySettings,
    pub delete_rollback: DeleteRollback,
    /// Capacity of the change broadcast buffer per subscriber.
    pub change_buffer: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            delete_rollback: DeleteRollback::Snapshot,
            change_buffer: 256,
        }
    }
}

/// Bounded exponential backoff for transient backend failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySettings {
    /// Total attempts including the first one. `1` disables retrying.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            multiplier: 2,
        }
    }
}

impl RetrySettings {
    /// Settings that make exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// How a failed delete is undone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeleteRollback {
    /// Restore the whole list captured before the delete.
    Snapshot,
    /// Re-insert only the removed entry at its original relative position.
    ReinsertEntry,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing-subscriber` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "bookmark_sync=info".to_string(),
        }
    }
}
