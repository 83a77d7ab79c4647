//! Verbena Store
//!
//! This crate provides the storage trait and implementations for workflow
//! runs. Runs are persisted to SQLite, or held in memory for tests and
//! embedded use.
//!
//! The [`RunStore`] trait defines the operations the trigger core needs:
//! - Looking up an existing run by its dedup key
//! - Atomically inserting a new run ("insert if absent")
//! - Listing run history for a workflow
//!
//! The dedup invariant lives here: at most one run per
//! `(workflow_id, logical_date)` and per `(workflow_id, run_id)`. Both
//! implementations enforce it inside the insert itself, so concurrent
//! callers — including callers in separate processes, for the SQLite
//! store — cannot both create a run for the same key.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use sqlx::types::Json;
pub use types::{Run, RunState, RunType};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Error type for run storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// An insert hit an existing run with the same dedup key.
  #[error("a run with the same dedup key already exists")]
  Conflict,

  /// A database error occurred. May be transient; retry policy belongs
  /// to the caller.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for workflow runs.
#[async_trait]
pub trait RunStore: Send + Sync {
  /// Find a run matching either the given run ID or the
  /// `(workflow_id, logical_date)` key.
  async fn find_run(
    &self,
    workflow_id: &str,
    run_id: Option<&str>,
    logical_date: Option<DateTime<Utc>>,
  ) -> Result<Option<Run>, StoreError>;

  /// Insert a run if no run with the same dedup key exists.
  ///
  /// Fails with [`StoreError::Conflict`] when one does; never overwrites
  /// and never leaves a partial record.
  async fn insert_run(&self, run: &Run) -> Result<(), StoreError>;

  /// List runs for a workflow, newest logical date first.
  async fn list_runs(&self, workflow_id: &str) -> Result<Vec<Run>, StoreError>;
}
