// src/tools/persist.rs — Write generated code to skills/<name>.<ext>

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{param_str, Params, Scratchpad, Tool, ToolCategory, ToolContext, ToolName, ToolResult};
use crate::infra::errors::SkillforgeError;
use crate::infra::paths::WorkspaceLayout;
use crate::memory::Skill;

pub struct PersistTool {
    ctx: Arc<ToolContext>,
}

impl PersistTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for PersistTool {
    fn name(&self) -> ToolName {
        ToolName::Persist
    }

    fn description(&self) -> &'static str {
        "Save the generated code as the skill's artifact and register the skill as untested"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Action
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": { "type": "string" },
                "skill": { "type": "string" },
                "extension": { "type": "string" }
            }
        })
    }

    async fn execute(
        &self,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError> {
        let Some(code) = param_str(params, "code")
            .map(str::to_string)
            .or_else(|| scratch.code.clone())
        else {
            return Ok(ToolResult::fail("nothing to persist: no code has been generated"));
        };
        let skill = param_str(params, "skill").unwrap_or(&scratch.skill).to_string();
        let extension = param_str(params, "extension").unwrap_or(&self.ctx.artifact_extension);

        let relative = WorkspaceLayout::skill_relative(&skill, extension);
        let root = self.ctx.layout.root();

        let checked = self
            .ctx
            .safety
            .check_path(&relative, root)
            .into_result()
            .and_then(|_| self.ctx.safety.check_source(&code).into_result());
        if let Err(violation) = checked {
            let error = violation.to_string();
            self.ctx.record_failure(scratch, error.clone(), &code)?;
            return Ok(ToolResult::fail(error));
        }

        let path = root.join(&relative);
        if let Err(e) = tokio::fs::write(&path, &code).await {
            let error = format!("write failed: {e}");
            self.ctx.record_failure(scratch, error.clone(), &code)?;
            return Ok(ToolResult::fail(error));
        }

        self.ctx
            .memory
            .append_skill(Skill::new(skill.clone(), scratch.goal.clone()))?;
        if skill == scratch.skill {
            scratch.skill_recorded = true;
        }

        tracing::info!(skill = %skill, path = %path.display(), bytes = code.len(), "Skill written");
        scratch.code = Some(code);
        scratch.artifact = Some(path.clone());
        Ok(ToolResult::ok(format!("Skill written to {}", relative.display()))
            .with_field("path", path.display().to_string()))
    }
}
