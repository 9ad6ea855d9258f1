//! Workflow state and rule-gate engine.
//!
//! Tracks projects, work items and tasks through a status state machine and a
//! per-type phase sequence, and gates every status change on phase, dependency
//! readiness and a project's configurable rules.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod rules;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, OperationOutcome, Result};
