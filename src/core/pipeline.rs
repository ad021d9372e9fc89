// src/core/pipeline.rs — Fixed PLAN → WRITE → TEST → ANALYZE state machine

use super::orchestrator::{LoopEnd, Orchestrator};
use super::types::{Outcome, PipelineState, ProgressEvent};
use crate::infra::errors::SkillforgeError;
use crate::tools::{Params, Scratchpad};

const CYCLE: [PipelineState; 4] = [
    PipelineState::Plan,
    PipelineState::Write,
    PipelineState::Test,
    PipelineState::Analyze,
];

impl Orchestrator {
    /// One attempt per cycle; at most `max_iterations` cycles.
    pub(super) async fn run_fixed(&self, scratch: &mut Scratchpad) -> Result<LoopEnd, SkillforgeError> {
        let max = self.config.max_iterations;
        let mut iteration = 0;

        while iteration < max {
            iteration += 1;
            scratch.begin_attempt(iteration);
            self.emit(ProgressEvent::IterationStart {
                iteration,
                max_iterations: max,
            });

            if self.run_cycle(scratch, iteration).await? {
                self.emit(ProgressEvent::StateChange {
                    iteration,
                    state: PipelineState::Success,
                });
                return Ok(LoopEnd::new(Outcome::Success, iteration));
            }

            let next = next_state(iteration, max);
            tracing::info!(
                skill = %scratch.skill,
                iteration,
                max,
                next = %next,
                "Attempt did not pass"
            );
            self.emit(ProgressEvent::StateChange {
                iteration,
                state: next,
            });
        }

        Ok(LoopEnd::new(Outcome::GaveUp, iteration))
    }

    /// Run the working states in order. A failed step skips the rest of the
    /// cycle. Returns the evaluation verdict.
    async fn run_cycle(&self, scratch: &mut Scratchpad, iteration: u32) -> Result<bool, SkillforgeError> {
        let params = Params::new();
        for state in CYCLE {
            let Some(tool) = state.tool() else { continue };
            self.emit(ProgressEvent::StateChange { iteration, state });

            let result = self.call_tool(tool, &params, scratch, iteration).await?;
            if !result.success {
                tracing::debug!(state = %state, "Step failed: {}", result.message);
                return Ok(false);
            }
        }
        Ok(scratch.verdict == Some(true))
    }
}

/// Decision after a failed ANALYZE (or a failed earlier step).
fn next_state(iteration: u32, max: u32) -> PipelineState {
    if iteration < max {
        PipelineState::Retry
    } else {
        PipelineState::GiveUp
    }
}
