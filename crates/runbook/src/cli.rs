//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "runbook", version)]
#[command(about = "Run team commands from layered YAML definitions")]
pub struct Cli {
    /// Command table file or module directory [default: from global.yaml]
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Environment overlay, e.g. `dev` also loads `<stem>.dev.yaml`
    #[arg(short, long, global = true, value_name = "ENV")]
    pub env: Option<String>,

    /// Let module files override each other, reporting each override
    #[arg(long, global = true)]
    pub permissive: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List commands and their actions
    List {
        /// Output as JSON for machine parsing
        #[arg(long)]
        json: bool,
    },
    /// Load and validate the command table without running anything
    Validate,
    /// Run a command or one of its actions
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Command name or alias
    pub command: String,

    /// Action name or alias; omit to run the command's default
    pub action: Option<String>,

    /// Show what would run without spawning anything
    #[arg(long)]
    pub dry_run: bool,

    /// Working directory for the command
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Extra environment variable (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Kill the command after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Arguments passed to the command, each as one literal token
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
