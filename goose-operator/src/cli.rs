//! CLI argument types for `goose-operator proxy` and `goose-operator run`.
//!
//! Defined outside `main.rs` so integration tests can parse them directly.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// goose-operator: admission control for prompts sent to a goose agent.
#[derive(Parser, Debug)]
#[command(name = "goose-operator", version)]
pub struct Cli {
    /// Configuration file (default: $GOOSE_OPERATOR_CONFIG, then the user
    /// config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Streaming proxy: relay stdio to a long-lived agent.
    Proxy(DownstreamArgs),
    /// One-shot: read all of stdin, admit it, run the agent once.
    Run(DownstreamArgs),
}

/// Optional agent command override.
#[derive(Args, Debug, Default)]
pub struct DownstreamArgs {
    /// Agent command and arguments (after `--`). Defaults to the configured
    /// downstream command.
    #[arg(trailing_var_arg = true)]
    pub command: Vec<String>,
}
