// src/infra/errors.rs — Error types for skillforge

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillforgeError {
    // Oracle errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Oracle call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    // Per-attempt errors (absorbed into the failure log)
    #[error("Policy violation: {reason}")]
    PolicyViolation { reason: String },

    #[error("Sandbox timeout after {seconds}s")]
    SandboxTimeout { seconds: u64 },

    #[error("{}", runtime_message(exit_code, stderr))]
    SandboxRuntime {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Malformed decision ({reason}): {raw}")]
    MalformedDecision { raw: String, reason: String },

    // Fatal for the whole run
    #[error("Memory at {} is corrupt or unreadable: {message}", path.display())]
    MemoryCorruption { path: PathBuf, message: String },

    #[error("Sandbox infrastructure failure: {message}")]
    SandboxInfrastructure { message: String },

    // Ambient
    #[error("Skill '{name}' not found")]
    SkillNotFound { name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stderr when the program said anything, otherwise how it ended.
fn runtime_message(exit_code: &Option<i32>, stderr: &str) -> String {
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".into(),
    }
}

impl SkillforgeError {
    /// Oracle failures that may succeed on a later attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SkillforgeError::Provider {
                retriable: true,
                ..
            } | SkillforgeError::Timeout { .. }
        )
    }

    /// Errors that abort the whole run instead of counting as a failed attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SkillforgeError::MemoryCorruption { .. } | SkillforgeError::SandboxInfrastructure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        let e = SkillforgeError::Provider {
            provider: "ollama".into(),
            message: "connection refused".into(),
            retriable: true,
        };
        assert!(e.is_retriable());
        assert!(!e.is_fatal());
        assert!(SkillforgeError::Timeout { seconds: 5 }.is_retriable());

        let bad_request = SkillforgeError::Provider {
            provider: "ollama".into(),
            message: "bad request".into(),
            retriable: false,
        };
        assert!(!bad_request.is_retriable());
    }

    #[test]
    fn test_fatal_classification() {
        let corrupt = SkillforgeError::MemoryCorruption {
            path: PathBuf::from("/ws/memory.json"),
            message: "expected value".into(),
        };
        assert!(corrupt.is_fatal());
        assert!(
            SkillforgeError::SandboxInfrastructure {
                message: "no python3".into()
            }
            .is_fatal()
        );
        assert!(
            !SkillforgeError::PolicyViolation {
                reason: "eval".into()
            }
            .is_fatal()
        );
        assert!(!SkillforgeError::SandboxTimeout { seconds: 15 }.is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let e = SkillforgeError::MemoryCorruption {
            path: PathBuf::from("/ws/memory.json"),
            message: "EOF".into(),
        };
        assert_eq!(
            e.to_string(),
            "Memory at /ws/memory.json is corrupt or unreadable: EOF"
        );
        assert_eq!(
            SkillforgeError::SandboxTimeout { seconds: 15 }.to_string(),
            "Sandbox timeout after 15s"
        );
        assert_eq!(
            SkillforgeError::SandboxRuntime {
                exit_code: Some(1),
                stderr: "NameError: x".into()
            }
            .to_string(),
            "NameError: x"
        );
        assert_eq!(
            SkillforgeError::SandboxRuntime {
                exit_code: Some(2),
                stderr: String::new()
            }
            .to_string(),
            "exit code 2"
        );
    }
}
