// src/core/orchestrator.rs — Iteration controller

use std::sync::Arc;
use std::time::Instant;

use super::types::*;
use crate::infra::errors::SkillforgeError;
use crate::memory::{Directive, DirectiveStatus, MemoryStore, Skill, SkillStatus};
use crate::provider::ModelProvider;
use crate::tools::{Params, Scratchpad, ToolContext, ToolName, ToolRegistry, ToolResult};
use crate::util::skill_name_from_goal;

/// How a control loop ended, before memory is updated.
pub(super) struct LoopEnd {
    pub outcome: Outcome,
    pub iterations: u32,
    pub direct_answer: Option<String>,
}

impl LoopEnd {
    pub fn new(outcome: Outcome, iterations: u32) -> Self {
        Self {
            outcome,
            iterations,
            direct_answer: None,
        }
    }
}

/// Drives one goal to SUCCESS, GIVE_UP or a direct answer, within a bounded
/// number of iterations. The control mode is fixed at construction.
pub struct Orchestrator {
    pub(super) registry: ToolRegistry,
    pub(super) memory: Arc<MemoryStore>,
    pub(super) provider: Arc<dyn ModelProvider>,
    pub(super) config: OrchestratorConfig,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl Orchestrator {
    pub fn new(ctx: Arc<ToolContext>, config: OrchestratorConfig) -> Self {
        Self {
            registry: ToolRegistry::new(ctx.clone()),
            memory: ctx.memory.clone(),
            provider: ctx.provider.clone(),
            config,
            on_progress: None,
        }
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    pub fn mode(&self) -> ControlMode {
        self.config.mode
    }

    pub(super) fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Dispatch one tool and report it to the progress callback.
    pub(super) async fn call_tool(
        &self,
        tool: ToolName,
        params: &Params,
        scratch: &mut Scratchpad,
        iteration: u32,
    ) -> Result<ToolResult, SkillforgeError> {
        self.emit(ProgressEvent::ToolCall { iteration, tool });
        let result = self.registry.dispatch(tool, params, scratch).await?;
        self.emit(ProgressEvent::ToolResult {
            iteration,
            tool,
            success: result.success,
            message: result.message.clone(),
        });
        Ok(result)
    }

    /// Run the loop for `goal`. `skill` defaults to a name derived from the goal.
    ///
    /// Per-attempt problems end up in the failure log and the report; only
    /// corrupt memory and a broken sandbox are returned as errors.
    pub async fn run(&self, goal: &str, skill: Option<&str>) -> Result<RunReport, SkillforgeError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let skill = skill
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| skill_name_from_goal(goal));
        let max_iterations = self.config.max_iterations;

        let doc = self.memory.append_directive(Directive::pending(goal))?;
        let directive_index = doc.directives.len().saturating_sub(1);

        tracing::info!(
            run_id = %run_id,
            goal,
            skill = %skill,
            mode = %self.config.mode,
            max_iterations,
            "Starting run"
        );
        self.emit(ProgressEvent::RunStart {
            goal: goal.to_string(),
            skill: skill.clone(),
            mode: self.config.mode,
            max_iterations,
        });

        let mut scratch = Scratchpad::new(goal, skill.clone(), max_iterations);
        let ended = match self.config.mode {
            ControlMode::Fixed => self.run_fixed(&mut scratch).await,
            ControlMode::Dynamic => self.run_dynamic(&mut scratch).await,
        };
        let end = match ended {
            Ok(end) => end,
            Err(e) => {
                tracing::error!(skill = %skill, "Run aborted: {}", e);
                if !matches!(e, SkillforgeError::MemoryCorruption { .. }) {
                    if let Err(mark_err) = self
                        .memory
                        .update_directive_status(directive_index, DirectiveStatus::Failed)
                    {
                        tracing::warn!(
                            directive = directive_index,
                            "Could not mark directive failed: {}",
                            mark_err
                        );
                    }
                }
                return Err(e);
            }
        };

        let skill_status = self.settle_skill(&scratch, end.outcome)?;
        let directive_status = match end.outcome {
            Outcome::Success | Outcome::DirectAnswer => DirectiveStatus::Completed,
            Outcome::GaveUp => DirectiveStatus::Failed,
        };
        self.memory
            .update_directive_status(directive_index, directive_status)?;

        let last_failure = match end.outcome {
            Outcome::GaveUp => scratch
                .last_failure
                .clone()
                .or_else(|| Some("iteration budget exhausted".into())),
            _ => scratch.last_failure.clone(),
        };

        tracing::info!(
            run_id = %run_id,
            skill = %skill,
            outcome = %end.outcome,
            iterations = end.iterations,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Run finished"
        );
        self.emit(ProgressEvent::Complete {
            outcome: end.outcome,
            iterations: end.iterations,
            skill_status,
        });

        Ok(RunReport {
            run_id,
            goal: goal.to_string(),
            skill,
            mode: self.config.mode,
            outcome: end.outcome,
            skill_status,
            iterations: end.iterations,
            last_failure,
            direct_answer: end.direct_answer,
            artifact: scratch.artifact.clone(),
        })
    }

    /// Record the terminal skill status. A skill that was never persisted is
    /// upserted so the outcome is still on record. Direct answers leave skills alone.
    fn settle_skill(
        &self,
        scratch: &Scratchpad,
        outcome: Outcome,
    ) -> Result<Option<SkillStatus>, SkillforgeError> {
        let status = match outcome {
            Outcome::Success => SkillStatus::Working,
            Outcome::GaveUp => SkillStatus::Failed,
            Outcome::DirectAnswer => return Ok(None),
        };

        if scratch.skill_recorded {
            self.memory.update_skill_status(&scratch.skill, status)?;
        } else {
            self.memory.append_skill(
                Skill::new(scratch.skill.clone(), scratch.goal.clone()).with_status(status),
            )?;
        }
        Ok(Some(status))
    }
}
