use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::definition::WorkflowDef;
use crate::error::RegistryError;
use crate::registry::WorkflowRegistry;

/// Filesystem-based workflow registry.
///
/// Definitions are stored one per file:
/// ```text
/// {root}/
/// ├── nightly-report.json
/// └── image-resize.json
/// ```
/// The file name (without extension) is the workflow ID. Files are
/// re-read on every lookup, so a trigger always sees the latest on-disk
/// snapshot.
pub struct FsWorkflowRegistry {
  root: PathBuf,
}

impl FsWorkflowRegistry {
  /// Create a new filesystem registry at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the registry.
  pub fn root(&self) -> &Path {
    &self.root
  }

  async fn read_definition(&self, path: &Path) -> Result<WorkflowDef, RegistryError> {
    let content = fs::read_to_string(path).await?;
    let def: WorkflowDef = serde_json::from_str(&content)?;
    Ok(def)
  }
}

#[async_trait]
impl WorkflowRegistry for FsWorkflowRegistry {
  async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDef>, RegistryError> {
    let path = self.root.join(format!("{}.json", workflow_id));
    if !path.exists() {
      return Ok(None);
    }
    Ok(Some(self.read_definition(&path).await?))
  }

  async fn list(&self) -> Result<Vec<WorkflowDef>, RegistryError> {
    let mut defs = Vec::new();

    if !self.root.exists() {
      return Ok(defs);
    }

    let mut entries = fs::read_dir(&self.root).await?;
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) == Some("json")
        && let Ok(def) = self.read_definition(&path).await
      {
        defs.push(def);
      }
    }

    Ok(defs)
  }
}
