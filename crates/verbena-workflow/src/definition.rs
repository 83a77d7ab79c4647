use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered workflow definition.
///
/// Immutable once loaded. The `schedule` expression is opaque to the
/// trigger core; it is carried for the scheduler, not interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  #[serde(default)]
  pub schedule: Option<String>,
  /// Definition-level default start date, overridable per task.
  #[serde(default)]
  pub start_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub tasks: Vec<TaskDef>,
}

/// A task within a workflow definition.
///
/// Only the fields the trigger core needs are modeled; task execution is
/// owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
  pub task_id: String,
  #[serde(default)]
  pub start_date: Option<DateTime<Utc>>,
}

impl WorkflowDef {
  /// The earliest logical date this workflow accepts: the minimum start
  /// date configured anywhere in the definition, or `None` when the
  /// definition exposes no start bound.
  pub fn effective_start_date(&self) -> Option<DateTime<Utc>> {
    self
      .start_date
      .into_iter()
      .chain(self.tasks.iter().filter_map(|t| t.start_date))
      .min()
  }
}
