// src/tools/evaluate.rs — Ask the oracle whether the run met the goal

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{param_str, Params, Scratchpad, Tool, ToolCategory, ToolContext, ToolName, ToolResult};
use crate::core::prompts;
use crate::infra::errors::SkillforgeError;
use crate::provider::ChatRequest;

pub struct EvaluateTool {
    ctx: Arc<ToolContext>,
}

impl EvaluateTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// Parse a `SUCCESS: <reason>` / `FAILURE: <reason>` reply.
///
/// The prefix match is case-insensitive. Anything that does not start with
/// SUCCESS is a failure, with the whole reply as the rationale.
pub fn parse_verdict(reply: &str) -> (bool, String) {
    let trimmed = reply.trim();
    let upper = trimmed.to_ascii_uppercase();
    for (prefix, verdict) in [("SUCCESS", true), ("FAILURE", false)] {
        if upper.starts_with(prefix) {
            let rest = trimmed[prefix.len()..].trim_start_matches([':', ' ', '-']).trim();
            let rationale = if rest.is_empty() { trimmed } else { rest };
            return (verdict, rationale.to_string());
        }
    }
    (false, trimmed.to_string())
}

#[async_trait]
impl Tool for EvaluateTool {
    fn name(&self) -> ToolName {
        ToolName::Evaluate
    }

    fn description(&self) -> &'static str {
        "Judge whether the latest execution output satisfies the goal"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Deliberation
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal": { "type": "string" },
                "output": { "type": "string" }
            }
        })
    }

    async fn execute(
        &self,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError> {
        let goal = param_str(params, "goal").unwrap_or(&scratch.goal).to_string();
        let output = match (param_str(params, "output"), &scratch.last_execution) {
            (Some(output), _) => output.to_string(),
            (None, Some(exec)) => prompts::test_output(exec.success, &exec.stdout, &exec.stderr),
            (None, None) => {
                return Ok(ToolResult::fail("nothing to evaluate: the skill has not been executed"))
            }
        };
        let execution_succeeded = scratch
            .last_execution
            .as_ref()
            .map(|e| e.success)
            .unwrap_or(false);

        let request = ChatRequest::prompt(
            prompts::evaluation_system(&goal, &scratch.skill, &output),
            "Give your verdict.",
        );
        let reply = match self.ctx.provider.chat(request).await {
            Ok(r) => r.content,
            Err(e) => {
                let message = format!("oracle unavailable: {e}");
                let code = scratch.code.clone().unwrap_or_default();
                scratch.verdict = Some(false);
                self.ctx.record_failure(scratch, message.clone(), &code)?;
                return Ok(ToolResult::fail(message).with_field("verdict", false));
            }
        };

        let (claimed, mut rationale) = parse_verdict(&reply);
        let verdict = claimed && execution_succeeded;
        if claimed && !execution_succeeded {
            rationale = format!("execution did not succeed ({rationale})");
        }

        // Execute already logged failed runs; a clean run judged wrong is new information.
        if !verdict && execution_succeeded {
            let code = scratch.code.clone().unwrap_or_default();
            self.ctx
                .record_failure(scratch, format!("evaluation failed: {rationale}"), &code)?;
        } else if !verdict {
            scratch.last_failure.get_or_insert_with(|| rationale.clone());
        }
        scratch.verdict = Some(verdict);

        tracing::info!(skill = %scratch.skill, verdict, "Evaluation: {}", rationale);
        let message = if verdict {
            format!("SUCCESS: {rationale}")
        } else {
            format!("FAILURE: {rationale}")
        };
        Ok(ToolResult::ok(message)
            .with_field("verdict", verdict)
            .with_field("rationale", rationale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let (v, r) = parse_verdict("SUCCESS: prints 42 as expected");
        assert!(v);
        assert_eq!(r, "prints 42 as expected");
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert!(parse_verdict("success - looks right").0);
        let (v, r) = parse_verdict("Failure: NameError on line 3");
        assert!(!v);
        assert_eq!(r, "NameError on line 3");
    }

    #[test]
    fn test_parse_unrecognized_is_failure() {
        let (v, r) = parse_verdict("  The output seems fine to me.  ");
        assert!(!v);
        assert_eq!(r, "The output seems fine to me.");
    }

    #[test]
    fn test_parse_bare_prefix_keeps_text() {
        let (v, r) = parse_verdict("SUCCESS");
        assert!(v);
        assert_eq!(r, "SUCCESS");
    }
}
