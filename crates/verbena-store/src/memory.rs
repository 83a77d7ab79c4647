use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::{Run, RunStore, StoreError};

/// In-memory run store for tests and embedded use.
///
/// A single mutex guards the whole collection, so the duplicate check and
/// the insert happen in one critical section and concurrent callers
/// observe the same insert-if-absent semantics as the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
  runs: Mutex<Vec<Run>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait::async_trait]
impl RunStore for MemoryStore {
  async fn find_run(
    &self,
    workflow_id: &str,
    run_id: Option<&str>,
    logical_date: Option<DateTime<Utc>>,
  ) -> Result<Option<Run>, StoreError> {
    let runs = self.runs.lock().expect("run store mutex poisoned");
    Ok(
      runs
        .iter()
        .find(|r| {
          r.workflow_id == workflow_id
            && (run_id.is_some_and(|id| r.run_id == id)
              || logical_date.is_some_and(|d| r.logical_date == d))
        })
        .cloned(),
    )
  }

  async fn insert_run(&self, run: &Run) -> Result<(), StoreError> {
    let mut runs = self.runs.lock().expect("run store mutex poisoned");
    let duplicate = runs.iter().any(|r| {
      r.workflow_id == run.workflow_id
        && (r.run_id == run.run_id || r.logical_date == run.logical_date)
    });
    if duplicate {
      return Err(StoreError::Conflict);
    }
    runs.push(run.clone());
    Ok(())
  }

  async fn list_runs(&self, workflow_id: &str) -> Result<Vec<Run>, StoreError> {
    let runs = self.runs.lock().expect("run store mutex poisoned");
    let mut matching: Vec<Run> = runs
      .iter()
      .filter(|r| r.workflow_id == workflow_id)
      .cloned()
      .collect();
    matching.sort_by(|a, b| b.logical_date.cmp(&a.logical_date));
    Ok(matching)
  }
}
