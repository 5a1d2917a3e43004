//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves configuration and the target project
//! 2. Loads the board through the engine
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Board commands talk to the server, so they are async. Each one builds a
//! tokio runtime and blocks on its async body, keeping dispatch synchronous.

mod completion;
mod config_cmd;
mod move_cmd;
mod show;
mod stats;

pub use completion::completion;
pub use config_cmd::{init as config_init, show as config_show};
pub use move_cmd::move_paper;
pub use show::show;
pub use stats::stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;
use crate::core::config::Config;
use crate::core::types::ProjectId;
use crate::engine::{Board, BoardOptions};
use crate::sync::HttpBoardSync;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Show => show::show(ctx),
        Command::Stats => stats::stats(ctx),
        Command::Move {
            paper,
            to,
            position,
        } => move_cmd::move_paper(ctx, &paper, &to, position),
        Command::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(ctx),
            ConfigAction::Init {
                global,
                server,
                default_project,
                timeout_ms,
                force,
            } => config_cmd::init(
                ctx,
                config_cmd::InitOptions {
                    global,
                    server,
                    default_project,
                    timeout_ms,
                    force,
                },
            ),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Directory commands run in.
pub(crate) fn workspace_dir(ctx: &Context) -> Result<PathBuf> {
    match &ctx.cwd {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

/// Load configuration for the workspace.
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let dir = workspace_dir(ctx)?;
    let result = Config::load(Some(&dir)).context("Failed to load config")?;
    Ok(result.config)
}

/// The project a command targets: `--project`, else the workspace default.
pub(crate) fn resolve_project(ctx: &Context, config: &Config) -> Result<ProjectId> {
    let raw = ctx
        .project
        .as_deref()
        .or_else(|| config.default_project())
        .ok_or_else(|| {
            anyhow!("No project given. Pass --project or set default_project in .paperboard/config.toml")
        })?;
    ProjectId::new(raw).context("Invalid project id")
}

/// Build the HTTP sync client, honoring `--api-base`.
pub(crate) fn connect(ctx: &Context, config: &Config) -> Result<HttpBoardSync> {
    let api_base = ctx.api_base.clone().unwrap_or_else(|| config.api_base());
    HttpBoardSync::new(api_base, config.token(), config.timeout())
        .context("Failed to create board client")
}

/// Resolve everything and fetch the board.
pub(crate) async fn load_board(ctx: &Context) -> Result<Board> {
    let config = load_config(ctx)?;
    let project = resolve_project(ctx, &config)?;
    let sync = connect(ctx, &config)?;
    Board::load(project.clone(), Arc::new(sync), BoardOptions::from_config(&config))
        .await
        .with_context(|| format!("Failed to load board for project '{}'", project))
}

/// Run an async command body to completion.
pub(crate) fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    rt.block_on(future)
}
