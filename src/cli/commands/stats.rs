//! stats command - Per-stage counts and average score

use anyhow::{Context as _, Result};

use super::{block_on, load_board};
use crate::cli::Context;
use crate::ui::output::{self, Verbosity};

/// Print board metrics.
///
/// `--quiet` prints the single summary line; `--json` prints the metrics
/// object.
pub fn stats(ctx: &Context) -> Result<()> {
    block_on(async {
        let board = load_board(ctx).await?;
        let metrics = board.metrics();
        if !metrics.consistent {
            tracing::warn!("board lists a paper in more than one place");
        }
        if ctx.json {
            let json = serde_json::to_string_pretty(&metrics)
                .context("Failed to encode metrics")?;
            println!("{}", json);
        } else if ctx.verbosity() == Verbosity::Quiet {
            println!("{}", metrics.summary_line());
        } else {
            print!("{}", output::format_metrics(&metrics));
        }
        Ok(())
    })
}
