// src/tools/mod.rs — Tool registry and dispatch contract
//
// Both control strategies drive the loop through the same registry. Tools
// report per-attempt problems as `success: false`; only the fatal error
// kinds (corrupt memory, broken sandbox) come back as `Err`.

pub mod evaluate;
pub mod execute;
pub mod generate;
pub mod memory_access;
pub mod persist;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infra::config::Config;
use crate::infra::errors::SkillforgeError;
use crate::infra::paths::WorkspaceLayout;
use crate::memory::{Failure, MemoryStore};
use crate::provider::ModelProvider;
use crate::sandbox::{ExecutionResult, Sandbox};
use crate::security::SafetyEnforcer;

pub type Params = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    Generate,
    Persist,
    Execute,
    Evaluate,
    Memory,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Generate,
        ToolName::Persist,
        ToolName::Execute,
        ToolName::Evaluate,
        ToolName::Memory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Generate => "generate",
            ToolName::Persist => "persist",
            ToolName::Execute => "execute",
            ToolName::Evaluate => "evaluate",
            ToolName::Memory => "memory",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Consults the oracle or memory; no side effects outside memory.
    Deliberation,
    /// Touches the filesystem or runs code.
    Action,
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCategory::Deliberation => write!(f, "deliberation"),
            ToolCategory::Action => write!(f, "action"),
        }
    }
}

/// What the controller (and the oracle, in dynamic mode) sees of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub category: ToolCategory,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Per-run state shared by the tools of one controller run. Never persisted.
#[derive(Debug, Clone)]
pub struct Scratchpad {
    pub goal: String,
    pub skill: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub code: Option<String>,
    pub artifact: Option<PathBuf>,
    pub last_execution: Option<ExecutionResult>,
    pub verdict: Option<bool>,
    pub last_failure: Option<String>,
    /// Set once the skill has been upserted into memory during this run.
    pub skill_recorded: bool,
}

impl Scratchpad {
    pub fn new(goal: impl Into<String>, skill: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            goal: goal.into(),
            skill: skill.into(),
            attempt: 1,
            max_attempts,
            code: None,
            artifact: None,
            last_execution: None,
            verdict: None,
            last_failure: None,
            skill_recorded: false,
        }
    }

    /// Forget the previous attempt's intermediate products before a retry.
    pub fn begin_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
        self.code = None;
        self.last_execution = None;
        self.verdict = None;
    }

    /// One-paragraph state description for the dynamic controller.
    pub fn summary(&self) -> String {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let mut s = format!(
            "skill: {}\ngenerated: {}\npersisted: {}\ntested: {}\n",
            self.skill,
            yes_no(self.code.is_some()),
            self.artifact
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "no".into()),
            yes_no(self.last_execution.is_some()),
        );
        if let Some(exec) = &self.last_execution {
            s.push_str(&format!(
                "latest result: success={} exit_code={:?} timed_out={}\n",
                exec.success, exec.exit_code, exec.timed_out
            ));
        }
        if let Some(verdict) = self.verdict {
            s.push_str(&format!("evaluated: {}\n", if verdict { "working" } else { "not working" }));
        }
        if let Some(failure) = &self.last_failure {
            s.push_str(&format!("last failure: {}\n", crate::util::truncate_str(failure, 300)));
        }
        s
    }
}

/// Services every tool may use.
pub struct ToolContext {
    pub provider: Arc<dyn ModelProvider>,
    pub memory: Arc<MemoryStore>,
    pub sandbox: Arc<Sandbox>,
    pub safety: Arc<SafetyEnforcer>,
    pub layout: WorkspaceLayout,
    pub failure_context_limit: usize,
    pub artifact_extension: String,
}

impl ToolContext {
    /// Prepare the workspace and assemble every service from `config`.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn ModelProvider>,
    ) -> Result<Self, SkillforgeError> {
        let layout = WorkspaceLayout::new(&config.workspace.root).ensure()?;
        let safety = Arc::new(SafetyEnforcer::new(&config.safety.extra_denied_patterns)?);
        let memory = Arc::new(MemoryStore::open(layout.memory_file())?);
        let sandbox = Arc::new(Sandbox::new(layout.clone(), &config.sandbox, safety.clone()));
        Ok(Self {
            provider,
            memory,
            sandbox,
            safety,
            layout,
            failure_context_limit: config.iteration.failure_context_limit,
            artifact_extension: config.sandbox.artifact_extension.clone(),
        })
    }

    /// Append a Failure for the current skill and remember it on the scratchpad.
    pub(crate) fn record_failure(
        &self,
        scratch: &mut Scratchpad,
        error: impl Into<String>,
        code: &str,
    ) -> Result<(), SkillforgeError> {
        let failure = Failure::new(scratch.skill.clone(), error, code);
        scratch.last_failure = Some(failure.error.clone());
        self.memory.append_failure(failure)?;
        Ok(())
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    fn description(&self) -> &'static str;
    fn category(&self) -> ToolCategory;
    /// JSON schema of the accepted params.
    fn parameters(&self) -> Value;

    async fn execute(
        &self,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name(),
            description: self.description(),
            category: self.category(),
            parameters: self.parameters(),
        }
    }
}

/// All tools, one per `ToolName`.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        let tools = ToolName::ALL
            .into_iter()
            .map(|name| build_tool(name, ctx.clone()))
            .collect();
        Self { tools }
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Run one tool. Non-fatal errors are folded into a failed `ToolResult`.
    pub async fn dispatch(
        &self,
        name: ToolName,
        params: &Params,
        scratch: &mut Scratchpad,
    ) -> Result<ToolResult, SkillforgeError> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return Ok(ToolResult::fail(format!("tool '{name}' is not registered")));
        };

        tracing::debug!(tool = %name, skill = %scratch.skill, attempt = scratch.attempt, "Dispatching tool");
        match tool.execute(params, scratch).await {
            Ok(result) => {
                tracing::info!(tool = %name, success = result.success, "{}", result.message);
                Ok(result)
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(tool = %name, "Fatal tool error: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!(tool = %name, "Tool error: {}", e);
                scratch.last_failure = Some(e.to_string());
                Ok(ToolResult::fail(e.to_string()))
            }
        }
    }
}

fn build_tool(name: ToolName, ctx: Arc<ToolContext>) -> Box<dyn Tool> {
    match name {
        ToolName::Generate => Box::new(generate::GenerateTool::new(ctx)),
        ToolName::Persist => Box::new(persist::PersistTool::new(ctx)),
        ToolName::Execute => Box::new(execute::ExecuteTool::new(ctx)),
        ToolName::Evaluate => Box::new(evaluate::EvaluateTool::new(ctx)),
        ToolName::Memory => Box::new(memory_access::MemoryAccessTool::new(ctx)),
    }
}

pub(crate) fn param_str<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn param_u64(params: &Params, key: &str) -> Option<u64> {
    params.get(key).and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
