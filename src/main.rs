// src/main.rs — skillforge entry point

use clap::Parser;

use skillforge::cli::run::RunOptions;
use skillforge::cli::{Cli, Commands};
use skillforge::infra::config::Config;
use skillforge::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG)
    logger::init_logging(logger::default_level(cli.verbose));

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns `false` when a run ended without meeting its goal.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Run {
            goal,
            skill,
            mode,
            max_iterations,
            quiet,
            json,
        } => {
            let goal = goal.join(" ");
            if goal.trim().is_empty() {
                anyhow::bail!("Goal must not be empty");
            }
            let options = RunOptions {
                skill,
                mode,
                max_iterations,
                quiet,
                json,
            };
            skillforge::cli::run::run_goal(&goal, &config, options).await
        }
        Commands::Memory => skillforge::cli::memory::show_memory(&config).map(|_| true),
        Commands::Skills => skillforge::cli::memory::list_skills(&config).map(|_| true),
        Commands::Doctor => skillforge::cli::doctor::run_doctor(&config).await.map(|_| true),
    }
}
