//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output
//! - `--api-base <url>`: Override the configured server
//! - `--project <id>`: Override the configured project

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Paperboard - move research papers through a pipeline board
#[derive(Parser, Debug)]
#[command(name = "pboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if pboard was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON instead of text (and JSON log lines)
    #[arg(long, global = true)]
    pub json: bool,

    /// Board server base URL (overrides config)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Project whose board to use (overrides config)
    #[arg(long, global = true, value_name = "PROJECT")]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the board, stage by stage
    #[command(
        name = "show",
        after_help = "\
WORKFLOW EXAMPLES:
    # Show the default project's board
    pboard show

    # Show another project's board as JSON
    pboard show --project lab-reading-group --json"
    )]
    Show,

    /// Show per-stage counts and the average score
    #[command(name = "stats")]
    Stats,

    /// Move a paper to a stage
    #[command(
        name = "move",
        long_about = "Move a paper to a stage.\n\n\
            The move is validated against the current board, applied, and sent \
            to the server. If the server refuses it the board is left as it was \
            and the reason is printed. A conflict (someone else moved the paper) \
            reloads the board.",
        after_help = "\
WORKFLOW EXAMPLES:
    # File a paper under Screening, at the end of the column
    pboard move 42 --to screening

    # Put it at the top instead
    pboard move 42 --to screening --position 0"
    )]
    Move {
        /// Paper id
        paper: String,

        /// Destination stage id
        #[arg(long = "to", value_name = "STAGE")]
        to: String,

        /// Position in the destination (0 = top; default: end of column)
        #[arg(long, allow_negative_numbers = true)]
        position: Option<i64>,
    },

    /// View or create configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    pboard completion bash >> ~/.bashrc

    # Zsh
    pboard completion zsh > ~/.zfunc/_pboard"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration and where it came from
    Show,
    /// Write a config file
    Init {
        /// Write the global config instead of the workspace one
        #[arg(long)]
        global: bool,

        /// Server base URL to record
        #[arg(long, value_name = "URL")]
        server: Option<String>,

        /// Default project (workspace config only)
        #[arg(long = "default-project", value_name = "PROJECT")]
        default_project: Option<String>,

        /// Persistence timeout in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Shells supported by `pboard completion`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}
