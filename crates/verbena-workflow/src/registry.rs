use async_trait::async_trait;

use crate::definition::WorkflowDef;
use crate::error::RegistryError;

/// Read-only lookup of workflow definitions.
#[async_trait]
pub trait WorkflowRegistry: Send + Sync {
  /// Get a workflow definition by ID. Returns `Ok(None)` when the ID is
  /// not in the registry's known set.
  async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDef>, RegistryError>;

  /// List all known workflow definitions.
  async fn list(&self) -> Result<Vec<WorkflowDef>, RegistryError>;
}
