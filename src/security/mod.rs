// src/security/mod.rs — Safety policy and workspace audits

pub mod audit;
pub mod policy;

pub use policy::{SafetyEnforcer, Verdict, DEFAULT_DENIED_PATTERNS};
