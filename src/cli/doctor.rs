// src/cli/doctor.rs — `skillforge doctor`: environment diagnostics

use crate::infra::config::Config;
use crate::infra::paths::{self, WorkspaceLayout};
use crate::memory::MemoryStore;
use crate::provider::ollama::OllamaProvider;
use crate::security::audit;

/// Run system diagnostics. Problems are reported, never fatal.
pub async fn run_doctor(config: &Config) -> anyhow::Result<()> {
    println!("skillforge doctor v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let config_path = paths::config_file_path();
    if config_path.exists() {
        eprintln!("  Config:       {} (loaded)", config_path.display());
    } else {
        eprintln!("  Config:       (using defaults)");
    }

    // Oracle
    eprint!("  Checking oracle at {}... ", config.oracle.base_url);
    let ollama = OllamaProvider::from_config(&config.oracle);
    match ollama.list_models().await {
        Ok(models) => {
            eprintln!("{} model(s)", models.len());
            if !has_model(&models, ollama.model()) {
                eprintln!(
                    "    WARN: model '{}' is not pulled (try `ollama pull {}`)",
                    ollama.model(),
                    ollama.model()
                );
            }
        }
        Err(e) => eprintln!("FAILED\n    {}", e),
    }

    // Interpreter
    eprint!("  Checking interpreter '{}'... ", config.sandbox.interpreter);
    match which::which(&config.sandbox.interpreter) {
        Ok(path) => eprintln!("ok ({})", path.display()),
        Err(_) => eprintln!("NOT FOUND\n    Every sandbox run will fail until it is installed."),
    }

    // Workspace
    eprint!("  Checking workspace... ");
    match WorkspaceLayout::new(&config.workspace.root).ensure() {
        Ok(layout) => {
            eprintln!("ok ({})", layout.root().display());
            check_memory(&layout);
            check_permissions(&layout);
        }
        Err(e) => eprintln!("FAILED\n    {}", e),
    }

    println!();
    println!("Done.");
    Ok(())
}

fn check_memory(layout: &WorkspaceLayout) {
    eprint!("  Checking memory... ");
    match MemoryStore::open(layout.memory_file()).and_then(|store| store.read()) {
        Ok(doc) => eprintln!(
            "ok (version {}, {} skill(s), {} failure(s))",
            doc.version,
            doc.skills.len(),
            doc.failures.len()
        ),
        Err(e) => eprintln!("FAILED\n    {}", e),
    }
}

fn check_permissions(layout: &WorkspaceLayout) {
    eprint!("  Checking file permissions... ");
    let insecure: Vec<_> = audit::audit_workspace(layout)
        .into_iter()
        .filter(|c| !c.is_secure)
        .collect();
    if insecure.is_empty() {
        eprintln!("ok");
    } else {
        eprintln!("{} issue(s)", insecure.len());
        for check in &insecure {
            eprintln!("    WARN: {}", check.message);
        }
    }
}

/// Ollama reports tags ("qwen3-coder:latest"); a bare name matches any tag.
fn has_model(available: &[String], wanted: &str) -> bool {
    available
        .iter()
        .any(|m| m == wanted || m.split(':').next() == Some(wanted))
}
