// src/tools/execute.rs — Run the persisted artifact in the sandbox

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{param_str, Params, Scratchpad, Tool, ToolCategory, ToolContext, ToolName, ToolResult};
use crate::infra::errors::SkillforgeError;
use crate::util::truncate_str;

/// Longest error text stored on a Failure record.
const FAILURE_ERROR_MAX: usize = 1_000;

pub struct ExecuteTool {
    ctx: Arc<ToolContext>,
}

impl ExecuteTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ExecuteTool {
    fn name(&self) -> ToolName {
        ToolName::Execute
    }

    fn description(&self) -> &'static str {
        "Run the persisted skill in the sandbox and capture stdout, stderr and exit code"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Action
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace-relative artifact path" }
            }
        })
    }

    async fn execute(
        &self,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError> {
        let Some(path) = param_str(params, "path")
            .map(PathBuf::from)
            .or_else(|| scratch.artifact.clone())
        else {
            return Ok(ToolResult::fail("nothing to execute: no artifact has been persisted"));
        };

        let result = self.ctx.sandbox.run(&path, &[]).await?;

        if !result.success {
            let reason = result.failure_reason(self.ctx.sandbox.timeout());
            let error = truncate_str(&reason, FAILURE_ERROR_MAX).to_string();
            let code = match &scratch.code {
                Some(code) => code.clone(),
                None => tokio::fs::read_to_string(self.ctx.layout.root().join(&path))
                    .await
                    .unwrap_or_default(),
            };
            self.ctx.record_failure(scratch, error, &code)?;
        }

        let message = if result.success {
            format!("Execution succeeded in {}ms", result.duration_ms)
        } else if result.timed_out {
            "Execution timed out".to_string()
        } else {
            format!("Execution failed (exit code {:?})", result.exit_code)
        };

        let tool_result = ToolResult {
            success: result.success,
            message,
            fields: serde_json::Map::new(),
        }
        .with_field("stdout", result.stdout.trim_end())
        .with_field("stderr", result.stderr.trim_end())
        .with_field("exit_code", json!(result.exit_code))
        .with_field("timed_out", result.timed_out);

        scratch.last_execution = Some(result);
        Ok(tool_result)
    }
}
