use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use verbena_store::{RunStore, RunType, SqliteStore};
use verbena_trigger::{RunTrigger, TriggerError, TriggerRequest};
use verbena_workflow::{FsWorkflowRegistry, WorkflowRegistry};

/// Verbena - trigger and inspect workflow runs
#[derive(Parser)]
#[command(name = "verbena")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.verbena)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Trigger a new run of a registered workflow
  Trigger {
    /// The workflow ID to trigger
    workflow_id: String,

    /// Run ID for the new run (default: derived from type and date)
    #[arg(long)]
    run_id: Option<String>,

    /// Logical date for the run, RFC 3339 (default: now)
    #[arg(long)]
    logical_date: Option<String>,

    /// Conf payload: a JSON object
    #[arg(long)]
    conf: Option<String>,

    /// Run type: manual, scheduled, or backfill
    #[arg(long, default_value = "manual")]
    run_type: String,

    /// Keep the sub-second component of the logical date instead of
    /// truncating it for the dedup key
    #[arg(long)]
    keep_micros: bool,
  },

  /// List stored runs for a workflow
  Runs {
    /// The workflow ID to list runs for
    workflow_id: String,
  },

  /// List registered workflow definitions
  Workflows,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".verbena")
  });

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match cli.command {
      Some(Commands::Trigger {
        workflow_id,
        run_id,
        logical_date,
        conf,
        run_type,
        keep_micros,
      }) => {
        trigger_run(
          data_dir,
          workflow_id,
          run_id,
          logical_date,
          conf,
          run_type,
          keep_micros,
        )
        .await
      }
      Some(Commands::Runs { workflow_id }) => list_runs(data_dir, workflow_id).await,
      Some(Commands::Workflows) => list_workflows(data_dir).await,
      None => {
        println!("verbena - use --help to see available commands");
        Ok(())
      }
    }
  })
}

async fn open_store(data_dir: &Path) -> Result<SqliteStore> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let options = SqliteConnectOptions::new()
    .filename(data_dir.join("verbena.db"))
    .create_if_missing(true);
  let pool = SqlitePool::connect_with(options)
    .await
    .context("failed to open run database")?;

  let store = SqliteStore::new(pool);
  store
    .migrate()
    .await
    .context("failed to run database migrations")?;

  Ok(store)
}

fn registry_for(data_dir: &Path) -> FsWorkflowRegistry {
  FsWorkflowRegistry::new(data_dir.join("workflows"))
}

async fn trigger_run(
  data_dir: PathBuf,
  workflow_id: String,
  run_id: Option<String>,
  logical_date: Option<String>,
  conf: Option<String>,
  run_type: String,
  keep_micros: bool,
) -> Result<()> {
  let logical_date = logical_date
    .map(|raw| {
      DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid --logical-date, expected RFC 3339: {}", raw))
    })
    .transpose()?;

  let run_type = match run_type.as_str() {
    "manual" => RunType::Manual,
    "scheduled" => RunType::Scheduled,
    "backfill" => RunType::Backfill,
    other => bail!(
      "invalid --run-type: {} (expected manual, scheduled, or backfill)",
      other
    ),
  };

  let store = open_store(&data_dir).await?;
  let registry = registry_for(&data_dir);

  let trigger = RunTrigger::new(Arc::new(registry), Arc::new(store));
  let request = TriggerRequest {
    workflow_id,
    run_id,
    logical_date,
    // Passed through as a JSON string; the trigger core parses and
    // validates the object shape.
    conf: conf.map(serde_json::Value::String),
    run_type,
    replace_micros: !keep_micros,
  };

  match trigger.trigger(request).await {
    Ok(run) => {
      eprintln!("Created run: {}", run.run_id);
      println!("{}", serde_json::to_string_pretty(&run)?);
      Ok(())
    }
    Err(TriggerError::DuplicateRun(existing)) => {
      eprintln!("Run already exists, returning it: {}", existing.run_id);
      println!("{}", serde_json::to_string_pretty(&existing)?);
      Ok(())
    }
    Err(e) => Err(e.into()),
  }
}

async fn list_runs(data_dir: PathBuf, workflow_id: String) -> Result<()> {
  let store = open_store(&data_dir).await?;
  let runs = store
    .list_runs(&workflow_id)
    .await
    .context("failed to list runs")?;

  println!("{}", serde_json::to_string_pretty(&runs)?);
  Ok(())
}

async fn list_workflows(data_dir: PathBuf) -> Result<()> {
  let registry = registry_for(&data_dir);
  let defs = registry
    .list()
    .await
    .context("failed to list workflow definitions")?;

  println!("{}", serde_json::to_string_pretty(&defs)?);
  Ok(())
}
