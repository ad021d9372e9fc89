// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::types::ControlMode;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub iteration: IterationConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./agent_workspace"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "qwen3-coder".into(),
            temperature: 0.7,
            timeout_seconds: 120,
            max_retries: 2,
            retry_initial_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationConfig {
    pub max_iterations: u32,
    pub mode: ControlMode,
    /// How many past failures for the same skill are fed back into generation.
    pub failure_context_limit: usize,
    /// Step records shown to the oracle in dynamic mode.
    pub history_window: usize,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 12,
            mode: ControlMode::Fixed,
            failure_context_limit: 5,
            history_window: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub timeout_seconds: u64,
    /// PATH handed to the child; nothing else from the parent PATH leaks in.
    pub path: String,
    /// Extra parent variables copied into the child (proxy variables are always dropped).
    pub env_allowlist: Vec<String>,
    pub max_output_bytes: usize,
    pub artifact_extension: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            timeout_seconds: 15,
            path: "/usr/bin:/bin".into(),
            env_allowlist: Vec::new(),
            max_output_bytes: 64 * 1024,
            artifact_extension: "py".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Regexes appended to the built-in source denylist.
    pub extra_denied_patterns: Vec<String>,
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
