use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// State of a workflow run.
///
/// Only `Queued` is set at creation; later transitions are owned by the
/// execution engine, not by the trigger core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunState {
  Queued,
  Running,
  Success,
  Failed,
}

/// How a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunType {
  Manual,
  Scheduled,
  Backfill,
}

impl RunType {
  pub fn as_str(&self) -> &'static str {
    match self {
      RunType::Manual => "manual",
      RunType::Scheduled => "scheduled",
      RunType::Backfill => "backfill",
    }
  }
}

/// One execution instance of a workflow, as stored in the database.
///
/// `logical_date` is the logical slot this run represents, distinct from
/// `created_at`, the wall-clock commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Run {
  pub workflow_id: String,
  pub run_id: String,
  pub logical_date: DateTime<Utc>,
  pub conf: Json<serde_json::Value>,
  pub state: RunState,
  pub run_type: RunType,
  pub created_at: DateTime<Utc>,
}
