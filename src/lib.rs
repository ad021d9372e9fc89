// src/lib.rs — Library root for skillforge

pub mod cli;
pub mod core;
pub mod infra;
pub mod memory;
pub mod provider;
pub mod sandbox;
pub mod security;
pub mod tools;
pub mod util;
