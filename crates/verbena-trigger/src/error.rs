use chrono::{DateTime, Utc};
use thiserror::Error;
use verbena_store::{Run, StoreError};
use verbena_workflow::RegistryError;

use crate::conf::ConfError;

/// Failures surfaced by [`crate::RunTrigger::trigger`].
///
/// Each variant tells the caller what to do next: fix the request
/// (`WorkflowNotFound`, `InvalidLogicalDate`, `ConfigParse`), treat the
/// trigger as already satisfied (`DuplicateRun`), or retry later
/// (`Store`).
#[derive(Debug, Error)]
pub enum TriggerError {
  #[error("workflow not found: {0}")]
  WorkflowNotFound(String),

  /// A run with the same dedup key already exists. Carries the existing
  /// run so callers can branch without re-querying the store.
  #[error("run already exists: {} ({})", .0.run_id, .0.workflow_id)]
  DuplicateRun(Box<Run>),

  #[error("logical date {logical_date} is before the workflow's earliest start date {earliest}")]
  InvalidLogicalDate {
    logical_date: DateTime<Utc>,
    earliest: DateTime<Utc>,
  },

  #[error("invalid conf payload: {0}")]
  ConfigParse(#[from] ConfError),

  #[error("run store failed: {0}")]
  Store(#[from] StoreError),

  #[error("workflow registry failed: {0}")]
  Registry(#[from] RegistryError),
}
