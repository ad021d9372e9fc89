// src/core/dispatch.rs — Dynamic oracle-driven tool selection

use super::decision::{parse_decision, Decision};
use super::orchestrator::{LoopEnd, Orchestrator};
use super::prompts::DecisionPrompt;
use super::types::{Outcome, ProgressEvent, StepRecord};
use crate::infra::errors::SkillforgeError;
use crate::memory::Failure;
use crate::provider::ChatRequest;
use crate::tools::Scratchpad;

impl Orchestrator {
    /// Ask the oracle for one decision per iteration until it terminates the
    /// run or the iteration budget is spent. Malformed decisions and oracle
    /// errors use up an iteration and the loop moves on.
    pub(super) async fn run_dynamic(&self, scratch: &mut Scratchpad) -> Result<LoopEnd, SkillforgeError> {
        let max = self.config.max_iterations;
        let descriptors = self.registry.descriptors();
        let mut history: Vec<StepRecord> = Vec::new();
        let mut iteration = 0;

        while iteration < max {
            self.emit(ProgressEvent::IterationStart {
                iteration: iteration + 1,
                max_iterations: max,
            });

            let window: Vec<String> = history
                .iter()
                .skip(history.len().saturating_sub(self.config.history_window))
                .map(StepRecord::to_string)
                .collect();
            let summary = scratch.summary();
            let prompt = DecisionPrompt {
                goal: &scratch.goal,
                state_summary: &summary,
                tools: &descriptors,
                history: &window,
                iteration,
                max_iterations: max,
            };
            let request = ChatRequest::prompt(prompt.system(), prompt.user());

            iteration += 1;
            scratch.attempt = iteration;

            let reply = match self.provider.chat(request).await {
                Ok(r) => r.content,
                Err(e) => {
                    tracing::warn!(iteration, "Oracle unavailable while deciding: {}", e);
                    let failure = Failure::new(
                        scratch.skill.clone(),
                        format!("oracle unavailable: {e}"),
                        scratch.code.as_deref().unwrap_or(""),
                    );
                    scratch.last_failure = Some(failure.error.clone());
                    self.memory.append_failure(failure)?;
                    history.push(step(iteration, "decide", false, e.to_string()));
                    continue;
                }
            };

            let decision = match parse_decision(&reply) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(iteration, "Ignoring malformed decision: {}", e);
                    self.emit(ProgressEvent::DecisionRejected {
                        iteration,
                        reason: e.to_string(),
                    });
                    history.push(step(iteration, "invalid decision", false, e.to_string()));
                    continue;
                }
            };

            match decision {
                Decision::Tool { tool, params } => {
                    let result = self.call_tool(tool, &params, scratch, iteration).await?;
                    history.push(step(iteration, tool.as_str(), result.success, result.message));
                }
                Decision::Complete => {
                    if scratch.verdict != Some(true) {
                        tracing::warn!(
                            skill = %scratch.skill,
                            "Oracle declared completion without a passing evaluation"
                        );
                    }
                    return Ok(LoopEnd::new(Outcome::Success, iteration));
                }
                Decision::Failed { reason } => {
                    tracing::info!(skill = %scratch.skill, "Oracle gave up: {}", reason);
                    scratch.last_failure = Some(reason);
                    return Ok(LoopEnd::new(Outcome::GaveUp, iteration));
                }
                Decision::DirectAnswer { response } => {
                    return Ok(LoopEnd {
                        outcome: Outcome::DirectAnswer,
                        iterations: iteration,
                        direct_answer: Some(response),
                    });
                }
            }
        }

        Ok(LoopEnd::new(Outcome::GaveUp, iteration))
    }
}

fn step(iteration: u32, action: &str, success: bool, message: String) -> StepRecord {
    StepRecord {
        iteration,
        action: action.to_string(),
        success,
        message,
    }
}
