//! Integration tests for the trigger core against an in-memory registry
//! and run store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde_json::json;

use verbena_store::{Json, MemoryStore, Run, RunState, RunStore, RunType, StoreError};
use verbena_trigger::{RunTrigger, TriggerError, TriggerRequest};
use verbena_workflow::{RegistryError, TaskDef, WorkflowDef, WorkflowRegistry};

struct StaticRegistry {
  defs: HashMap<String, WorkflowDef>,
}

impl StaticRegistry {
  fn with(defs: Vec<WorkflowDef>) -> Self {
    Self {
      defs: defs.into_iter().map(|d| (d.workflow_id.clone(), d)).collect(),
    }
  }
}

#[async_trait]
impl WorkflowRegistry for StaticRegistry {
  async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDef>, RegistryError> {
    Ok(self.defs.get(workflow_id).cloned())
  }

  async fn list(&self) -> Result<Vec<WorkflowDef>, RegistryError> {
    Ok(self.defs.values().cloned().collect())
  }
}

fn workflow(workflow_id: &str, start_date: Option<DateTime<Utc>>) -> WorkflowDef {
  WorkflowDef {
    workflow_id: workflow_id.to_string(),
    name: workflow_id.to_string(),
    schedule: None,
    start_date,
    tasks: vec![],
  }
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, 10, 10, 0).unwrap()
}

fn trigger_with(defs: Vec<WorkflowDef>) -> (RunTrigger, Arc<MemoryStore>) {
  let store = Arc::new(MemoryStore::new());
  let trigger = RunTrigger::new(Arc::new(StaticRegistry::with(defs)), store.clone());
  (trigger, store)
}

#[tokio::test]
async fn test_unknown_workflow_creates_no_run() {
  let (trigger, store) = trigger_with(vec![]);

  let err = trigger
    .trigger(TriggerRequest::manual("dag_not_found"))
    .await
    .unwrap_err();

  assert!(matches!(err, TriggerError::WorkflowNotFound(id) if id == "dag_not_found"));
  assert!(store.list_runs("dag_not_found").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logical_date_before_start_date_is_rejected() {
  let (trigger, store) = trigger_with(vec![workflow("wf", Some(date(2016, 9, 5)))]);

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2015, 7, 5));
  let err = trigger.trigger(request).await.unwrap_err();

  assert!(matches!(
    err,
    TriggerError::InvalidLogicalDate { earliest, .. } if earliest == date(2016, 9, 5)
  ));
  assert!(store.list_runs("wf").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logical_date_after_start_date_is_accepted() {
  let (trigger, _store) = trigger_with(vec![workflow("wf", Some(date(2016, 9, 5)))]);

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 5));
  let run = trigger.trigger(request).await.unwrap();

  assert_eq!(run.workflow_id, "wf");
  assert_eq!(run.logical_date, date(2018, 7, 5));
  assert_eq!(run.state, RunState::Queued);
  assert_eq!(run.run_type, RunType::Manual);
}

#[tokio::test]
async fn test_logical_date_equal_to_start_date_is_accepted() {
  let (trigger, _store) = trigger_with(vec![workflow("wf", Some(date(2016, 9, 5)))]);

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2016, 9, 5));
  assert!(trigger.trigger(request).await.is_ok());
}

#[tokio::test]
async fn test_start_bound_uses_minimum_across_tasks() {
  let mut def = workflow("wf", Some(date(2016, 9, 5)));
  def.tasks = vec![TaskDef {
    task_id: "early".to_string(),
    start_date: Some(date(2014, 1, 1)),
  }];
  let (trigger, _store) = trigger_with(vec![def]);

  // Before the definition default but after the earliest task start.
  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2015, 7, 5));
  assert!(trigger.trigger(request).await.is_ok());
}

#[tokio::test]
async fn test_conf_variants() {
  let (trigger, _store) = trigger_with(vec![workflow("wf", None)]);

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 1));
  let run = trigger.trigger(request).await.unwrap();
  assert_eq!(run.conf, Json(json!({})));

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 2));
  request.conf = Some(json!({"foo": "bar"}));
  let run = trigger.trigger(request).await.unwrap();
  assert_eq!(run.conf, Json(json!({"foo": "bar"})));

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 3));
  request.conf = Some(json!(r#"{"foo": "bar"}"#));
  let run = trigger.trigger(request).await.unwrap();
  assert_eq!(run.conf, Json(json!({"foo": "bar"})));

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 4));
  request.conf = Some(json!("not json"));
  let err = trigger.trigger(request).await.unwrap_err();
  assert!(matches!(err, TriggerError::ConfigParse(_)));
}

#[tokio::test]
async fn test_repeated_trigger_is_idempotent() {
  let (trigger, store) = trigger_with(vec![workflow("wf", None)]);

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 5));

  let created = trigger.trigger(request.clone()).await.unwrap();
  let err = trigger.trigger(request).await.unwrap_err();

  match err {
    TriggerError::DuplicateRun(existing) => assert_eq!(*existing, created),
    other => panic!("expected DuplicateRun, got {:?}", other),
  }
  assert_eq!(store.list_runs("wf").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_second_triggers_share_a_dedup_key() {
  let (trigger, store) = trigger_with(vec![workflow("wf", None)]);
  let base = date(2018, 7, 5);

  let mut first = TriggerRequest::manual("wf");
  first.logical_date = Some(base.with_nanosecond(111_000_000).unwrap());
  trigger.trigger(first).await.unwrap();

  let mut second = TriggerRequest::manual("wf");
  second.logical_date = Some(base.with_nanosecond(999_000_000).unwrap());
  let err = trigger.trigger(second).await.unwrap_err();

  assert!(matches!(err, TriggerError::DuplicateRun(_)));
  assert_eq!(store.list_runs("wf").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_keep_micros_separates_subsecond_triggers() {
  let (trigger, store) = trigger_with(vec![workflow("wf", None)]);
  let base = date(2018, 7, 5);

  for nanos in [111_000_000, 999_000_000] {
    let mut request = TriggerRequest::manual("wf");
    request.logical_date = Some(base.with_nanosecond(nanos).unwrap());
    request.replace_micros = false;
    trigger.trigger(request).await.unwrap();
  }

  assert_eq!(store.list_runs("wf").await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_triggers_create_exactly_one_run() {
  let (trigger, store) = trigger_with(vec![workflow("wf", None)]);
  let trigger = Arc::new(trigger);

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(date(2018, 7, 5));

  let mut handles = Vec::new();
  for _ in 0..16 {
    let trigger = trigger.clone();
    let request = request.clone();
    handles.push(tokio::spawn(async move { trigger.trigger(request).await }));
  }

  let mut created = 0;
  let mut duplicates = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => created += 1,
      Err(TriggerError::DuplicateRun(_)) => duplicates += 1,
      Err(other) => panic!("unexpected error: {:?}", other),
    }
  }

  assert_eq!(created, 1);
  assert_eq!(duplicates, 15);
  assert_eq!(store.list_runs("wf").await.unwrap().len(), 1);
}

/// Delegates to a [`MemoryStore`] but sneaks a rival run in after the
/// first lookup, simulating a caller that commits strictly between the
/// pre-check and the insert.
struct RacingStore {
  inner: MemoryStore,
  rival: Run,
  raced: AtomicBool,
}

#[async_trait]
impl RunStore for RacingStore {
  async fn find_run(
    &self,
    workflow_id: &str,
    run_id: Option<&str>,
    logical_date: Option<DateTime<Utc>>,
  ) -> Result<Option<Run>, StoreError> {
    if !self.raced.swap(true, Ordering::SeqCst) {
      self.inner.insert_run(&self.rival).await?;
      return Ok(None);
    }
    self.inner.find_run(workflow_id, run_id, logical_date).await
  }

  async fn insert_run(&self, run: &Run) -> Result<(), StoreError> {
    self.inner.insert_run(run).await
  }

  async fn list_runs(&self, workflow_id: &str) -> Result<Vec<Run>, StoreError> {
    self.inner.list_runs(workflow_id).await
  }
}

#[tokio::test]
async fn test_conflict_after_pre_check_surfaces_as_duplicate() {
  let logical_date = date(2018, 7, 5);
  let rival = Run {
    workflow_id: "wf".to_string(),
    run_id: "manual__2018-07-05T10:10:00+00:00".to_string(),
    logical_date,
    conf: Json(json!({})),
    state: RunState::Queued,
    run_type: RunType::Manual,
    created_at: Utc::now(),
  };
  let store = Arc::new(RacingStore {
    inner: MemoryStore::new(),
    rival: rival.clone(),
    raced: AtomicBool::new(false),
  });

  let trigger = RunTrigger::new(
    Arc::new(StaticRegistry::with(vec![workflow("wf", None)])),
    store.clone(),
  );

  let mut request = TriggerRequest::manual("wf");
  request.logical_date = Some(logical_date);
  let err = trigger.trigger(request).await.unwrap_err();

  match err {
    TriggerError::DuplicateRun(existing) => assert_eq!(*existing, rival),
    other => panic!("expected DuplicateRun, got {:?}", other),
  }
  assert_eq!(store.list_runs("wf").await.unwrap().len(), 1);
}
