//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How the finished thread is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every interaction, then the final answer
    Text,
    /// Only the final answer
    Answer,
    /// The whole thread as JSON
    Json,
}

/// CLI arguments for triad
#[derive(Parser, Debug)]
#[command(name = "triad")]
#[command(author, version, about = "Multi-agent plan/task orchestration")]
#[command(long_about = r#"
triad hands a request to an agent. If the agent answers with a plan, every
task of the plan is run by its executor, condensed by a summarizer and judged
by a validator, retrying unsatisfied results with the validator's feedback.

Chains are replayed from a JSON script (--script), so a run is fully
reproducible without a model.

Configuration files are loaded from (in priority order):
1. TRIAD_* environment variables
2. --config <path>     Explicit config file
3. ./triad.toml        Project-level config
4. ~/.config/triad/config.toml   Global config

Example:
  triad --config demos/triad.toml --script demos/budget.json "How much did I spend in May?"
  triad --config demos/triad.toml --script demos/budget.json -o json -vv "How much did I spend in May?"
"#)]
pub struct Cli {
    /// The request to hand to the initiating agent
    pub content: String,

    /// Initiating agent id
    #[arg(short, long, default_value = "planner", value_name = "AGENT")]
    pub agent: String,

    /// Replay script providing chain outputs and tool results
    #[arg(short, long, value_name = "PATH")]
    pub script: PathBuf,

    /// Output format (defaults to `[output].format`, then text)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the working-status spinner
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Write every plan execution context to this JSONL file after the run
    #[arg(long, value_name = "PATH")]
    pub dump_contexts: Option<PathBuf>,
}
