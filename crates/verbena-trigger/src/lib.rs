//! Verbena Trigger
//!
//! This crate contains the decision-and-commit core of Verbena: given a
//! request to start a new run of a registered workflow, it validates the
//! request against the definition's constraints and creates exactly one
//! run record, even when equivalent trigger requests arrive concurrently.
//!
//! The pipeline, each stage short-circuiting with a typed error:
//!
//! ```text
//! registry lookup → duplicate pre-check → start-bound validation
//!                 → conf normalization → atomic insert
//! ```
//!
//! Nothing mutates shared state before the final insert, so no failure
//! needs a compensating rollback. The pre-check is best effort only; the
//! run store's uniqueness constraints are the authoritative guard, and a
//! conflict at insert time is translated back into [`TriggerError::DuplicateRun`]
//! carrying the run that won the race.

mod conf;
mod error;
mod trigger;

pub use conf::{ConfError, normalize_conf};
pub use error::TriggerError;
pub use trigger::{RunTrigger, TriggerRequest};
