// src/memory/store.rs — Versioned JSON memory store
//
// Every mutation is a locked read-modify-write against the file on disk:
// read memory.json, apply the change, bump `version`, then atomically
// replace the file (temp file + fsync + rename). Nothing is cached between
// calls, so the persisted copy is always the source of truth.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use super::document::*;
use crate::infra::errors::SkillforgeError;

pub type MemoryResult<T> = Result<T, SkillforgeError>;

/// Exclusive owner of `memory.json`.
pub struct MemoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    /// Open the store at `path`, initialising it (version 1) if the file does
    /// not exist. An existing file that cannot be parsed is an error; it is
    /// never replaced with an empty document.
    pub fn open(path: impl Into<PathBuf>) -> MemoryResult<Self> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };

        if store.path.exists() {
            let doc = store.read()?;
            tracing::debug!(version = doc.version, path = %store.path.display(), "Memory loaded");
        } else {
            if let Some(parent) = store.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let _guard = store.lock();
            let mut doc = MemoryDocument::empty();
            doc.version = 1;
            store.write_atomic(&doc)?;
            tracing::info!(path = %store.path.display(), "Initialised new memory document");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current persisted document. Never changes `version`.
    pub fn read(&self) -> MemoryResult<MemoryDocument> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| self.corruption(e))?;
        serde_json::from_str(&raw).map_err(|e| self.corruption(e))
    }

    /// Insert a skill, or update description/status of the skill with the same name.
    pub fn append_skill(&self, skill: Skill) -> MemoryResult<MemoryDocument> {
        self.mutate(|doc| {
            match doc.skills.iter_mut().find(|s| s.name == skill.name) {
                Some(existing) => {
                    existing.description = skill.description;
                    existing.status = skill.status;
                    existing.updated_at = Utc::now();
                }
                None => doc.skills.push(skill),
            }
            Ok(())
        })
    }

    pub fn append_failure(&self, failure: Failure) -> MemoryResult<MemoryDocument> {
        self.mutate(|doc| {
            doc.failures.push(failure);
            Ok(())
        })
    }

    pub fn append_directive(&self, directive: Directive) -> MemoryResult<MemoryDocument> {
        self.mutate(|doc| {
            doc.directives.push(directive);
            Ok(())
        })
    }

    pub fn update_skill_status(
        &self,
        name: &str,
        status: SkillStatus,
    ) -> MemoryResult<MemoryDocument> {
        self.mutate(|doc| {
            let skill = doc.skills.iter_mut().find(|s| s.name == name).ok_or_else(|| {
                SkillforgeError::SkillNotFound {
                    name: name.to_string(),
                }
            })?;
            skill.status = status;
            skill.updated_at = Utc::now();
            Ok(())
        })
    }

    /// Set the status of the directive at `index`. Terminal statuses stamp `completed_at`.
    pub fn update_directive_status(
        &self,
        index: usize,
        status: DirectiveStatus,
    ) -> MemoryResult<MemoryDocument> {
        self.mutate(|doc| {
            let directive = doc.directives.get_mut(index).ok_or_else(|| {
                SkillforgeError::Config(format!("directive index {index} out of range"))
            })?;
            directive.status = status;
            directive.completed_at = status.is_terminal().then(Utc::now);
            Ok(())
        })
    }

    /// The most recent `limit` failures recorded for `skill`, oldest first.
    pub fn relevant_failures(&self, skill: &str, limit: usize) -> MemoryResult<Vec<Failure>> {
        Ok(self.read()?.failures_for(skill, limit))
    }

    /// Locked read-modify-write. A closure error leaves the file untouched.
    fn mutate<F>(&self, apply: F) -> MemoryResult<MemoryDocument>
    where
        F: FnOnce(&mut MemoryDocument) -> MemoryResult<()>,
    {
        let _guard = self.lock();
        let mut doc = self.read()?;
        apply(&mut doc)?;
        doc.version += 1;
        doc.updated_at = Utc::now();
        self.write_atomic(&doc)?;
        tracing::debug!(version = doc.version, "Memory written");
        Ok(doc)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_atomic(&self, doc: &MemoryDocument) -> MemoryResult<()> {
        let json = serde_json::to_string_pretty(doc)?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "memory.json".into());
        let tmp = self.path.with_file_name(format!(".{file_name}.tmp"));

        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.flush()?;
        f.sync_all()?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn corruption(&self, e: impl std::fmt::Display) -> SkillforgeError {
        SkillforgeError::MemoryCorruption {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}
