// src/tools/generate.rs — Ask the oracle for a candidate program

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{param_str, param_u64, Params, Scratchpad, Tool, ToolCategory, ToolContext, ToolName, ToolResult};
use crate::core::prompts::GenerationPrompt;
use crate::infra::errors::SkillforgeError;
use crate::provider::ChatRequest;
use crate::util::strip_code_fences;

pub struct GenerateTool {
    ctx: Arc<ToolContext>,
}

impl GenerateTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GenerateTool {
    fn name(&self) -> ToolName {
        ToolName::Generate
    }

    fn description(&self) -> &'static str {
        "Generate candidate Python code for the goal, using past failures of the skill as context"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Deliberation
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal": { "type": "string" },
                "skill": { "type": "string" },
                "attempt": { "type": "integer" }
            }
        })
    }

    async fn execute(
        &self,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError> {
        let goal = param_str(params, "goal").unwrap_or(&scratch.goal).to_string();
        let skill = param_str(params, "skill").unwrap_or(&scratch.skill).to_string();
        let attempt = param_u64(params, "attempt")
            .map(|a| a as u32)
            .unwrap_or(scratch.attempt);

        let failures = self
            .ctx
            .memory
            .relevant_failures(&skill, self.ctx.failure_context_limit)?;

        let prompt = GenerationPrompt {
            goal: &goal,
            skill: &skill,
            attempt,
            max_attempts: scratch.max_attempts,
            failures: &failures,
        };
        let request = ChatRequest::prompt(prompt.system(), format!("Write the skill '{skill}'."));

        let response = match self.ctx.provider.chat(request).await {
            Ok(r) => r,
            Err(e) => {
                let message = format!("oracle unavailable: {e}");
                scratch.code = None;
                self.ctx.record_failure(scratch, message.clone(), "")?;
                return Ok(ToolResult::fail(message));
            }
        };

        let code = strip_code_fences(&response.content);
        if code.is_empty() {
            let message = "oracle returned no code";
            scratch.code = None;
            self.ctx.record_failure(scratch, message, "")?;
            return Ok(ToolResult::fail(message));
        }

        if let Err(violation) = self.ctx.safety.check_source(&code).into_result() {
            let error = violation.to_string();
            tracing::warn!(skill = %skill, "Generated code rejected: {}", error);
            scratch.code = None;
            self.ctx.record_failure(scratch, error.clone(), &code)?;
            return Ok(ToolResult::fail(error));
        }

        // Results of earlier code no longer describe this candidate.
        let code_chars = code.chars().count();
        scratch.code = Some(code);
        scratch.last_execution = None;
        scratch.verdict = None;
        Ok(ToolResult::ok(format!("Generated code ({code_chars} chars)"))
            .with_field("code_chars", code_chars))
    }
}
