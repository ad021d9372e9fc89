// src/cli/mod.rs — CLI definition (clap derive)

pub mod doctor;
pub mod memory;
pub mod progress;
pub mod run;

use clap::{Parser, Subcommand};

use crate::core::types::ControlMode;

#[derive(Parser)]
#[command(
    name = "skillforge",
    about = "Generate, sandbox-test and refine small programs until they work",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log loop progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the loop for a goal
    Run {
        /// Natural-language goal
        #[arg(required = true, trailing_var_arg = true)]
        goal: Vec<String>,

        /// Skill name (derived from the goal when omitted)
        #[arg(long)]
        skill: Option<String>,

        /// Control strategy: fixed or dynamic
        #[arg(long)]
        mode: Option<ControlMode>,

        /// Iteration budget
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,

        /// Suppress progress output (only emit the final report)
        #[arg(long)]
        quiet: bool,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the memory document as JSON
    Memory,
    /// List known skills and their status
    Skills,
    /// Check the oracle, the interpreter and the workspace
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::parse_from([
            "skillforge",
            "run",
            "--mode",
            "dynamic",
            "-n",
            "4",
            "--skill",
            "adder",
            "add",
            "two",
            "numbers",
        ]);
        match cli.command {
            Commands::Run {
                goal,
                skill,
                mode,
                max_iterations,
                ..
            } => {
                assert_eq!(goal.join(" "), "add two numbers");
                assert_eq!(skill.as_deref(), Some("adder"));
                assert_eq!(mode, Some(ControlMode::Dynamic));
                assert_eq!(max_iterations, Some(4));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["skillforge", "skills", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(cli.command, Commands::Skills));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Cli::try_parse_from(["skillforge", "run", "--mode", "auto", "goal"]).is_err());
    }
}
