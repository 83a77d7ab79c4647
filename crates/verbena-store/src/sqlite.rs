use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{Run, RunStore, StoreError};

/// SQLite-based run store.
///
/// The `workflow_runs` table carries a primary key on
/// `(workflow_id, run_id)` and a unique index on
/// `(workflow_id, logical_date)`; the insert relies on those constraints
/// rather than on any in-process lock, so the dedup invariant holds
/// across processes.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[async_trait::async_trait]
impl RunStore for SqliteStore {
  async fn find_run(
    &self,
    workflow_id: &str,
    run_id: Option<&str>,
    logical_date: Option<DateTime<Utc>>,
  ) -> Result<Option<Run>, StoreError> {
    if let Some(run_id) = run_id {
      let found: Option<Run> = sqlx::query_as(
        r#"
            SELECT workflow_id, run_id, logical_date, conf, state, run_type, created_at
            FROM workflow_runs
            WHERE workflow_id = ? AND run_id = ?
            "#,
      )
      .bind(workflow_id)
      .bind(run_id)
      .fetch_optional(&self.pool)
      .await?;

      if found.is_some() {
        return Ok(found);
      }
    }

    if let Some(logical_date) = logical_date {
      let found: Option<Run> = sqlx::query_as(
        r#"
            SELECT workflow_id, run_id, logical_date, conf, state, run_type, created_at
            FROM workflow_runs
            WHERE workflow_id = ? AND logical_date = ?
            "#,
      )
      .bind(workflow_id)
      .bind(logical_date)
      .fetch_optional(&self.pool)
      .await?;

      return Ok(found);
    }

    Ok(None)
  }

  async fn insert_run(&self, run: &Run) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
            INSERT INTO workflow_runs (workflow_id, run_id, logical_date, conf, state, run_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(&run.workflow_id)
    .bind(&run.run_id)
    .bind(&run.logical_date)
    .bind(&run.conf)
    .bind(&run.state)
    .bind(&run.run_type)
    .bind(&run.created_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::Conflict),
      Err(e) => Err(StoreError::Database(e)),
    }
  }

  async fn list_runs(&self, workflow_id: &str) -> Result<Vec<Run>, StoreError> {
    let runs = sqlx::query_as(
      r#"
            SELECT workflow_id, run_id, logical_date, conf, state, run_type, created_at
            FROM workflow_runs
            WHERE workflow_id = ?
            ORDER BY logical_date DESC
            "#,
    )
    .bind(workflow_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(runs)
  }
}
