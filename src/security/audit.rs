// src/security/audit.rs — Workspace permission audit
//
// Anyone who can write into skills/ or memory.json can plant code the loop
// will later execute, or rewrite its failure history. The audit flags
// workspace entries that are writable by group or other.

use std::path::Path;

use crate::infra::paths::WorkspaceLayout;

/// Result of auditing a single workspace entry.
#[derive(Debug, Clone)]
pub struct PermissionCheck {
    pub path: String,
    pub exists: bool,
    pub is_secure: bool,
    pub current_mode: Option<u32>,
    pub message: String,
}

/// Audit the workspace root, `skills/`, `exec/` and `memory.json`.
pub fn audit_workspace(layout: &WorkspaceLayout) -> Vec<PermissionCheck> {
    vec![
        check_not_shared_writable(layout.root(), "workspace root"),
        check_not_shared_writable(&layout.skills_dir(), "skills directory"),
        check_not_shared_writable(&layout.exec_dir(), "exec directory"),
        check_not_shared_writable(&layout.memory_file(), "memory file"),
    ]
}

fn check_not_shared_writable(path: &Path, description: &str) -> PermissionCheck {
    if !path.exists() {
        return PermissionCheck {
            path: path.display().to_string(),
            exists: false,
            is_secure: true,
            current_mode: None,
            message: format!("{} does not exist yet", description),
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(path) {
            Ok(metadata) => {
                let mode = metadata.permissions().mode() & 0o777;
                let is_secure = !is_shared_writable(mode);
                let message = if is_secure {
                    format!("{}: mode {:03o} (OK)", description, mode)
                } else {
                    format!(
                        "{}: mode {:03o} lets other users write into the workspace",
                        description, mode
                    )
                };
                PermissionCheck {
                    path: path.display().to_string(),
                    exists: true,
                    is_secure,
                    current_mode: Some(mode),
                    message,
                }
            }
            Err(e) => PermissionCheck {
                path: path.display().to_string(),
                exists: true,
                is_secure: false,
                current_mode: None,
                message: format!("{}: failed to read metadata: {}", description, e),
            },
        }
    }

    #[cfg(not(unix))]
    {
        PermissionCheck {
            path: path.display().to_string(),
            exists: true,
            is_secure: true,
            current_mode: None,
            message: format!("{}: permission check not applicable on this platform", description),
        }
    }
}

/// Group-write or other-write bit set.
#[cfg(unix)]
fn is_shared_writable(mode: u32) -> bool {
    mode & 0o022 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_workspace_is_reported_not_insecure() {
        let layout = WorkspaceLayout::new("/nonexistent/skillforge-ws");
        let checks = audit_workspace(&layout);
        assert_eq!(checks.len(), 4);
        assert!(checks.iter().all(|c| !c.exists && c.is_secure));
    }

    #[cfg(unix)]
    #[test]
    fn test_is_shared_writable() {
        assert!(!is_shared_writable(0o700));
        assert!(!is_shared_writable(0o755));
        assert!(!is_shared_writable(0o644));
        assert!(is_shared_writable(0o775));
        assert!(is_shared_writable(0o666));
        assert!(is_shared_writable(0o777));
    }

    #[cfg(unix)]
    #[test]
    fn test_world_writable_skills_dir_flagged() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let layout = WorkspaceLayout::new(dir.path()).ensure().unwrap();
        std::fs::set_permissions(layout.skills_dir(), std::fs::Permissions::from_mode(0o777))
            .unwrap();
        let checks = audit_workspace(&layout);
        let skills = checks
            .iter()
            .find(|c| c.path.ends_with("skills"))
            .unwrap();
        assert!(!skills.is_secure);
        assert_eq!(skills.current_mode, Some(0o777));
    }
}
