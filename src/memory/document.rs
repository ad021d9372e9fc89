// src/memory/document.rs — Memory document schema (memory.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Untested,
    Working,
    Failed,
}

impl std::fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillStatus::Untested => write!(f, "untested"),
            SkillStatus::Working => write!(f, "working"),
            SkillStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveStatus {
    Pending,
    Completed,
    Failed,
}

impl DirectiveStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DirectiveStatus::Pending)
    }
}

/// A named, generated unit of functionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub status: SkillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Skill {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            status: SkillStatus::Untested,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: SkillStatus) -> Self {
        self.status = status;
        self
    }
}

/// One unsuccessful attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub skill: String,
    pub error: String,
    pub code_snippet: String,
    pub timestamp: DateTime<Utc>,
}

/// Longest code snippet kept on a failure record, in bytes.
pub const SNIPPET_MAX_BYTES: usize = 500;

impl Failure {
    pub fn new(skill: impl Into<String>, error: impl Into<String>, code: &str) -> Self {
        Self {
            skill: skill.into(),
            error: error.into(),
            code_snippet: crate::util::truncate_str(code, SNIPPET_MAX_BYTES).to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// One submitted goal, tracked to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub goal: String,
    pub status: DirectiveStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Directive {
    pub fn pending(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            status: DirectiveStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// The aggregate root persisted as `memory.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub failures: Vec<Failure>,
    #[serde(default)]
    pub directives: Vec<Directive>,
}

impl MemoryDocument {
    /// A document that has never been written (version 0).
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            version: 0,
            created_at: now,
            updated_at: now,
            skills: Vec::new(),
            failures: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    /// The most recent `limit` failures for `skill`, oldest first.
    pub fn failures_for(&self, skill: &str, limit: usize) -> Vec<Failure> {
        let relevant: Vec<&Failure> = self.failures.iter().filter(|f| f.skill == skill).collect();
        let start = relevant.len().saturating_sub(limit);
        relevant[start..].iter().map(|f| (*f).clone()).collect()
    }
}
