// src/infra/paths.rs — Config location and workspace layout
//
// The config directory respects SKILLFORGE_HOME for isolation.
// Everything the loop reads or writes lives under the workspace root.

use std::path::{Path, PathBuf};

/// Returns the SKILLFORGE_HOME override, if set.
fn skillforge_home() -> Option<PathBuf> {
    std::env::var_os("SKILLFORGE_HOME").map(PathBuf::from)
}

/// Configuration directory: $SKILLFORGE_HOME/ or ~/.skillforge/
pub fn config_dir() -> PathBuf {
    if let Some(home) = skillforge_home() {
        return home;
    }
    match directories::BaseDirs::new() {
        Some(base) => base.home_dir().join(".skillforge"),
        None => PathBuf::from(".skillforge"),
    }
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Resolved locations inside one workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn memory_file(&self) -> PathBuf {
        self.root.join("memory.json")
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.root.join("skills")
    }

    pub fn exec_dir(&self) -> PathBuf {
        self.root.join("exec")
    }

    /// Workspace-relative path of a skill artifact.
    pub fn skill_relative(name: &str, extension: &str) -> PathBuf {
        Path::new("skills").join(format!("{name}.{extension}"))
    }

    /// Create the root, `skills/` and `exec/`, then canonicalize the root so
    /// later containment checks compare resolved paths.
    pub fn ensure(self) -> std::io::Result<Self> {
        std::fs::create_dir_all(self.skills_dir())?;
        std::fs::create_dir_all(self.exec_dir())?;
        let root = std::fs::canonicalize(&self.root)?;
        Ok(Self { root })
    }
}
