use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("failed to read workflow definition: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse workflow definition: {0}")]
  Parse(#[from] serde_json::Error),
}
