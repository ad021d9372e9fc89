// src/core/types.rs — Controller domain types

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::infra::config::IterationConfig;
use crate::memory::SkillStatus;
use crate::tools::ToolName;

/// How the controller picks the next tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// PLAN → WRITE → TEST → ANALYZE, in that order, every cycle.
    #[default]
    Fixed,
    /// The oracle chooses one action per step.
    Dynamic,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Fixed => write!(f, "fixed"),
            ControlMode::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl FromStr for ControlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ControlMode::Fixed),
            "dynamic" => Ok(ControlMode::Dynamic),
            other => Err(format!("unknown mode '{other}' (expected fixed or dynamic)")),
        }
    }
}

/// States of the fixed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Plan,
    Write,
    Test,
    Analyze,
    Success,
    Retry,
    GiveUp,
}

impl PipelineState {
    /// The tool a working state invokes. Decision states have none.
    pub fn tool(&self) -> Option<ToolName> {
        match self {
            PipelineState::Plan => Some(ToolName::Generate),
            PipelineState::Write => Some(ToolName::Persist),
            PipelineState::Test => Some(ToolName::Execute),
            PipelineState::Analyze => Some(ToolName::Evaluate),
            PipelineState::Success | PipelineState::Retry | PipelineState::GiveUp => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Plan => "PLAN",
            PipelineState::Write => "WRITE",
            PipelineState::Test => "TEST",
            PipelineState::Analyze => "ANALYZE",
            PipelineState::Success => "SUCCESS",
            PipelineState::Retry => "RETRY",
            PipelineState::GiveUp => "GIVE_UP",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    GaveUp,
    DirectAnswer,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::GaveUp => write!(f, "gave up"),
            Outcome::DirectAnswer => write!(f, "direct answer"),
        }
    }
}

/// One entry of the dynamic controller's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub iteration: u32,
    pub action: String,
    pub success: bool,
    pub message: String,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} {}: {} ({})",
            self.iteration,
            self.action,
            if self.success { "ok" } else { "failed" },
            crate::util::truncate_str(&self.message, 200)
        )
    }
}

/// Final result of one controller run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub goal: String,
    pub skill: String,
    pub mode: ControlMode,
    pub outcome: Outcome,
    pub skill_status: Option<SkillStatus>,
    pub iterations: u32,
    pub last_failure: Option<String>,
    pub direct_answer: Option<String>,
    pub artifact: Option<PathBuf>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Success | Outcome::DirectAnswer)
    }
}

/// Progress events emitted during a run for real-time display.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStart {
        goal: String,
        skill: String,
        mode: ControlMode,
        max_iterations: u32,
    },
    IterationStart {
        iteration: u32,
        max_iterations: u32,
    },
    StateChange {
        iteration: u32,
        state: PipelineState,
    },
    ToolCall {
        iteration: u32,
        tool: ToolName,
    },
    ToolResult {
        iteration: u32,
        tool: ToolName,
        success: bool,
        message: String,
    },
    DecisionRejected {
        iteration: u32,
        reason: String,
    },
    Complete {
        outcome: Outcome,
        iterations: u32,
        skill_status: Option<SkillStatus>,
    },
}

/// Controller settings, fixed for the lifetime of an `Orchestrator`.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub mode: ControlMode,
    pub max_iterations: u32,
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&IterationConfig::default())
    }
}

impl From<&IterationConfig> for OrchestratorConfig {
    fn from(cfg: &IterationConfig) -> Self {
        Self {
            mode: cfg.mode,
            max_iterations: cfg.max_iterations,
            history_window: cfg.history_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_mode_parse_and_display() {
        assert_eq!("fixed".parse::<ControlMode>().unwrap(), ControlMode::Fixed);
        assert_eq!(" Dynamic".parse::<ControlMode>().unwrap(), ControlMode::Dynamic);
        assert!("auto".parse::<ControlMode>().is_err());
        assert_eq!(ControlMode::Dynamic.to_string(), "dynamic");
        assert_eq!(ControlMode::default(), ControlMode::Fixed);
    }

    #[test]
    fn test_pipeline_state_tools() {
        assert_eq!(PipelineState::Plan.tool(), Some(ToolName::Generate));
        assert_eq!(PipelineState::Write.tool(), Some(ToolName::Persist));
        assert_eq!(PipelineState::Test.tool(), Some(ToolName::Execute));
        assert_eq!(PipelineState::Analyze.tool(), Some(ToolName::Evaluate));
        assert_eq!(PipelineState::GiveUp.tool(), None);
        assert_eq!(PipelineState::GiveUp.to_string(), "GIVE_UP");
    }

    #[test]
    fn test_step_record_display() {
        let step = StepRecord {
            iteration: 2,
            action: "execute".into(),
            success: false,
            message: "exit code 1".into(),
        };
        assert_eq!(step.to_string(), "step 2 execute: failed (exit code 1)");
    }

    #[test]
    fn test_orchestrator_config_from_iteration() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_iterations, 12);
        assert_eq!(cfg.history_window, 6);
        assert_eq!(cfg.mode, ControlMode::Fixed);
    }

    #[test]
    fn test_report_succeeded() {
        let report = RunReport {
            run_id: "r".into(),
            goal: "g".into(),
            skill: "s".into(),
            mode: ControlMode::Dynamic,
            outcome: Outcome::DirectAnswer,
            skill_status: None,
            iterations: 1,
            last_failure: None,
            direct_answer: Some("4".into()),
            artifact: None,
        };
        assert!(report.succeeded());
    }
}
