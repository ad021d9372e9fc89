// src/cli/memory.rs — `skillforge memory` and `skillforge skills`

use crate::infra::config::Config;
use crate::infra::paths::WorkspaceLayout;
use crate::memory::{MemoryDocument, MemoryStore};

fn open_store(config: &Config) -> anyhow::Result<MemoryStore> {
    let layout = WorkspaceLayout::new(&config.workspace.root).ensure()?;
    Ok(MemoryStore::open(layout.memory_file())?)
}

/// Print the whole memory document as pretty JSON.
pub fn show_memory(config: &Config) -> anyhow::Result<()> {
    let doc = open_store(config)?.read()?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

/// Print one line per skill with its status and failure count.
pub fn list_skills(config: &Config) -> anyhow::Result<()> {
    let doc = open_store(config)?.read()?;
    for line in skill_lines(&doc) {
        println!("{}", line);
    }
    Ok(())
}

fn skill_lines(doc: &MemoryDocument) -> Vec<String> {
    if doc.skills.is_empty() {
        return vec!["No skills yet.".to_string()];
    }
    let width = doc.skills.iter().map(|s| s.name.len()).max().unwrap_or(0);
    doc.skills
        .iter()
        .map(|s| {
            let failures = doc.failures.iter().filter(|f| f.skill == s.name).count();
            format!(
                "{:<width$}  {:<8}  {} failure(s)  {}",
                s.name,
                s.status.to_string(),
                failures,
                crate::util::truncate_str(&s.description, 60),
                width = width
            )
        })
        .collect()
}
