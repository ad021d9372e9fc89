// src/core/mod.rs — Iteration controller

pub mod decision;
pub mod dispatch;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod types;

pub use orchestrator::Orchestrator;
pub use types::{ControlMode, OrchestratorConfig, Outcome, ProgressEvent, RunReport};
