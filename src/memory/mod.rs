// src/memory/mod.rs — Persistent, versioned agent memory

pub mod document;
pub mod store;

pub use document::{
    Directive, DirectiveStatus, Failure, MemoryDocument, Skill, SkillStatus, SNIPPET_MAX_BYTES,
};
pub use store::MemoryStore;
