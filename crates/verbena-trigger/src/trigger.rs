use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;
use tracing::{debug, info};

use verbena_store::{Json, Run, RunState, RunStore, RunType, StoreError};
use verbena_workflow::WorkflowRegistry;

use crate::conf::normalize_conf;
use crate::error::TriggerError;

/// A request to start a new run of a registered workflow.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
  pub workflow_id: String,
  /// Caller-supplied run ID; derived from the run type and logical date
  /// when absent.
  pub run_id: Option<String>,
  /// The logical slot for the run; defaults to now.
  pub logical_date: Option<DateTime<Utc>>,
  /// Either a JSON object or a string containing a serialized object.
  pub conf: Option<Value>,
  pub run_type: RunType,
  /// Zero the sub-second component of the logical date before it is used
  /// as the dedup key, so two triggers within the same second collapse to
  /// one run. This is the canonical tie-break for same-second triggers.
  pub replace_micros: bool,
}

impl TriggerRequest {
  /// A manual trigger with defaults: logical date now, empty conf,
  /// sub-second component truncated.
  pub fn manual(workflow_id: impl Into<String>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      run_id: None,
      logical_date: None,
      conf: None,
      run_type: RunType::Manual,
      replace_micros: true,
    }
  }
}

/// Orchestrates creation of workflow runs.
///
/// Stateless apart from the injected collaborators: the registry supplies
/// definitions, the run store is the only shared mutable resource.
pub struct RunTrigger {
  registry: Arc<dyn WorkflowRegistry>,
  store: Arc<dyn RunStore>,
}

impl RunTrigger {
  pub fn new(registry: Arc<dyn WorkflowRegistry>, store: Arc<dyn RunStore>) -> Self {
    Self { registry, store }
  }

  /// Create exactly one run for the request, or fail with a typed error.
  ///
  /// Of any set of concurrent calls sharing a dedup key, exactly one
  /// returns the newly created run; the rest observe
  /// [`TriggerError::DuplicateRun`] referencing that same run.
  pub async fn trigger(&self, request: TriggerRequest) -> Result<Run, TriggerError> {
    let logical_date = resolve_logical_date(request.logical_date, request.replace_micros);

    let definition = self
      .registry
      .get(&request.workflow_id)
      .await?
      .ok_or_else(|| TriggerError::WorkflowNotFound(request.workflow_id.clone()))?;

    // Best-effort pre-check; the insert below is the authoritative guard.
    if let Some(existing) = self
      .store
      .find_run(
        &request.workflow_id,
        request.run_id.as_deref(),
        Some(logical_date),
      )
      .await?
    {
      debug!(
        workflow_id = %request.workflow_id,
        run_id = %existing.run_id,
        "duplicate trigger, returning existing run"
      );
      return Err(TriggerError::DuplicateRun(Box::new(existing)));
    }

    if let Some(earliest) = definition.effective_start_date()
      && logical_date < earliest
    {
      return Err(TriggerError::InvalidLogicalDate {
        logical_date,
        earliest,
      });
    }

    let conf = normalize_conf(request.conf)?;

    let run_id = request
      .run_id
      .unwrap_or_else(|| derive_run_id(request.run_type, logical_date));

    let run = Run {
      workflow_id: request.workflow_id,
      run_id,
      logical_date,
      conf: Json(Value::Object(conf)),
      state: RunState::Queued,
      run_type: request.run_type,
      created_at: Utc::now(),
    };

    match self.store.insert_run(&run).await {
      Ok(()) => {
        info!(
          workflow_id = %run.workflow_id,
          run_id = %run.run_id,
          logical_date = %run.logical_date,
          "run created"
        );
        Ok(run)
      }
      // Another caller won the race between the pre-check and the
      // insert. Surface their run, never a raw storage error.
      Err(StoreError::Conflict) => {
        let existing = self
          .store
          .find_run(&run.workflow_id, Some(&run.run_id), Some(run.logical_date))
          .await?
          .ok_or(TriggerError::Store(StoreError::Conflict))?;
        Err(TriggerError::DuplicateRun(Box::new(existing)))
      }
      Err(e) => Err(e.into()),
    }
  }
}

/// Default the logical date to now and, unless disabled, zero its
/// sub-second component so it can serve as a stable dedup key.
fn resolve_logical_date(
  logical_date: Option<DateTime<Utc>>,
  replace_micros: bool,
) -> DateTime<Utc> {
  let date = logical_date.unwrap_or_else(Utc::now);
  if replace_micros {
    date.with_nanosecond(0).unwrap_or(date)
  } else {
    date
  }
}

/// Derive the default run ID for a request without a caller-supplied one.
/// Deterministic, so repeated identical triggers share a dedup key.
fn derive_run_id(run_type: RunType, logical_date: DateTime<Utc>) -> String {
  format!("{}__{}", run_type.as_str(), logical_date.to_rfc3339())
}
