//! Verbena Workflow
//!
//! This crate contains the workflow definition types for Verbena and the
//! registry used to look them up at trigger time.
//!
//! A [`WorkflowDef`] is the registered, named specification of a repeatable
//! process. Definitions can be loaded from:
//! - JSON files in a definitions directory (via [`FsWorkflowRegistry`])
//! - Any other source implementing [`WorkflowRegistry`]
//!
//! The trigger core treats the registry as a read-only snapshot; it never
//! assumes a particular refresh cadence.

mod definition;
mod error;
mod fs_registry;
mod registry;

pub use definition::{TaskDef, WorkflowDef};
pub use error::RegistryError;
pub use fs_registry::FsWorkflowRegistry;
pub use registry::WorkflowRegistry;
