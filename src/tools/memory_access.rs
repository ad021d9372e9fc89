// src/tools/memory_access.rs — Let the oracle inspect and annotate memory

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{param_str, param_u64, Params, Scratchpad, Tool, ToolCategory, ToolContext, ToolName, ToolResult};
use crate::infra::errors::SkillforgeError;
use crate::memory::Failure;

pub struct MemoryAccessTool {
    ctx: Arc<ToolContext>,
}

impl MemoryAccessTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for MemoryAccessTool {
    fn name(&self) -> ToolName {
        ToolName::Memory
    }

    fn description(&self) -> &'static str {
        "Read persistent memory (summary, past failures, known skills) or record a failure"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Deliberation
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": ["read", "failures", "skills", "record_failure"] },
                "skill": { "type": "string" },
                "limit": { "type": "integer" },
                "error": { "type": "string" }
            },
            "required": ["action"]
        })
    }

    async fn execute(
        &self,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError> {
        let action = param_str(params, "action").unwrap_or("read");
        let skill = param_str(params, "skill").unwrap_or(&scratch.skill).to_string();
        let limit = param_u64(params, "limit")
            .map(|l| l as usize)
            .unwrap_or(self.ctx.failure_context_limit);

        match action {
            "read" => {
                let doc = self.ctx.memory.read()?;
                Ok(ToolResult::ok(format!("Memory version {}", doc.version))
                    .with_field("version", doc.version)
                    .with_field("skills", doc.skills.len())
                    .with_field("failures", doc.failures.len())
                    .with_field("directives", doc.directives.len()))
            }
            "failures" => {
                let failures = self.ctx.memory.relevant_failures(&skill, limit)?;
                let entries: Vec<Value> = failures
                    .iter()
                    .map(|f| json!({ "error": f.error, "timestamp": f.timestamp.to_rfc3339() }))
                    .collect();
                Ok(
                    ToolResult::ok(format!("{} failure(s) for '{}'", entries.len(), skill))
                        .with_field("failures", entries),
                )
            }
            "skills" => {
                let doc = self.ctx.memory.read()?;
                let skills: Vec<Value> = doc
                    .skills
                    .iter()
                    .map(|s| json!({ "name": s.name, "status": s.status, "description": s.description }))
                    .collect();
                Ok(ToolResult::ok(format!("{} skill(s)", skills.len())).with_field("skills", skills))
            }
            "record_failure" => {
                let Some(error) = param_str(params, "error") else {
                    return Ok(ToolResult::fail("record_failure requires an 'error' param"));
                };
                let code = scratch.code.as_deref().unwrap_or("");
                let doc = self
                    .ctx
                    .memory
                    .append_failure(Failure::new(skill.clone(), error, code))?;
                scratch.last_failure = Some(error.to_string());
                Ok(ToolResult::ok(format!("Recorded failure for '{skill}'"))
                    .with_field("version", doc.version))
            }
            other => Ok(ToolResult::fail(format!(
                "unknown memory action '{other}' (expected read, failures, skills or record_failure)"
            ))),
        }
    }
}
