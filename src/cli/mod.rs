//! cli
//!
//! Command-line interface layer for Paperboard.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers, which load a [`crate::engine::Board`] and drive it. Board
//! changes flow through the engine, never through the CLI directly.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::Result;

use crate::logging::{self, LogFormat};
use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// JSON output.
    pub json: bool,
    /// Server override from `--api-base`.
    pub api_base: Option<String>,
    /// Project override from `--project`.
    pub project: Option<String>,
}

impl Context {
    /// Output verbosity implied by the flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        json: cli.json,
        api_base: cli.api_base.clone(),
        project: cli.project.clone(),
    };

    let format = if ctx.json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logging::init(ctx.verbosity(), format);

    commands::dispatch(cli.command, &ctx)
}
