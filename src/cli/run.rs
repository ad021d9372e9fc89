// src/cli/run.rs — `skillforge run`: drive one goal through the loop

use std::sync::Arc;

use crate::core::orchestrator::Orchestrator;
use crate::core::types::{ControlMode, OrchestratorConfig, Outcome, RunReport};
use crate::infra::config::Config;
use crate::provider::ollama::OllamaProvider;
use crate::provider::retry::{RetryConfig, RetryProvider};
use crate::provider::ModelProvider;
use crate::tools::ToolContext;

use super::progress::terminal_progress;

/// Per-invocation overrides from the command line.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub skill: Option<String>,
    pub mode: Option<ControlMode>,
    pub max_iterations: Option<u32>,
    pub quiet: bool,
    pub json: bool,
}

/// The configured oracle with timeout and retry applied.
pub fn build_provider(config: &Config) -> Arc<dyn ModelProvider> {
    let ollama: Arc<dyn ModelProvider> = Arc::new(OllamaProvider::from_config(&config.oracle));
    Arc::new(RetryProvider::with_config(
        ollama,
        RetryConfig::from(&config.oracle),
    ))
}

/// Run the loop for `goal`. Returns whether the goal was met.
pub async fn run_goal(goal: &str, config: &Config, options: RunOptions) -> anyhow::Result<bool> {
    let provider = build_provider(config);
    let ctx = Arc::new(ToolContext::from_config(config, provider)?);

    let mut orchestrator_config = OrchestratorConfig::from(&config.iteration);
    if let Some(mode) = options.mode {
        orchestrator_config.mode = mode;
    }
    if let Some(max) = options.max_iterations {
        orchestrator_config.max_iterations = max;
    }

    let mut orchestrator = Orchestrator::new(ctx, orchestrator_config);
    if !options.quiet {
        orchestrator = orchestrator.with_progress(terminal_progress());
    }

    let report = orchestrator.run(goal, options.skill.as_deref()).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.succeeded())
}

fn print_report(report: &RunReport) {
    if let Some(answer) = &report.direct_answer {
        println!("{}", answer);
        return;
    }

    println!();
    println!("  Skill:       {}", report.skill);
    match report.skill_status {
        Some(status) => println!("  Status:      {}", status),
        None => println!("  Status:      (unchanged)"),
    }
    println!("  Iterations:  {}", report.iterations);
    if let Some(path) = &report.artifact {
        println!("  Artifact:    {}", path.display());
    }
    if report.outcome == Outcome::GaveUp {
        if let Some(reason) = &report.last_failure {
            println!(
                "  Last failure: {}",
                crate::util::truncate_str(reason.trim(), 500)
            );
        }
    }
}
