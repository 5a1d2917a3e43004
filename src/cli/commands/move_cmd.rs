//! move command - Move a paper to a stage

use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use super::{block_on, load_board};
use crate::cli::Context;
use crate::core::snapshot::MoveIntent;
use crate::core::types::{PaperId, StageId};
use crate::engine::{MoveOutcome, Settlement};
use crate::ui::output;

#[derive(Debug, Serialize)]
struct MoveReport<'a> {
    paper_id: &'a str,
    stage_id: &'a str,
    result: &'static str,
    position: Option<usize>,
}

/// Move `paper` to stage `to`.
///
/// `position` defaults to the end of the destination column. Negative and
/// oversized positions are clamped by the engine.
pub fn move_paper(ctx: &Context, paper: &str, to: &str, position: Option<i64>) -> Result<()> {
    let paper_id = PaperId::new(paper).context("Invalid paper id")?;
    let to_stage = StageId::new(to).context("Invalid stage id")?;
    let verbosity = ctx.verbosity();

    block_on(async {
        let mut board = load_board(ctx).await?;
        let Some(from_stage) = board
            .snapshot()
            .locate(&paper_id)
            .map(|p| p.stage_id.clone())
        else {
            bail!("Paper '{}' is not on the board", paper_id);
        };

        let intent = MoveIntent::new(
            paper_id.clone(),
            from_stage,
            to_stage.clone(),
            position.unwrap_or(i64::MAX),
        );
        let outcome = board
            .move_paper(intent)
            .await
            .context("Failed to reload the board")?;

        for notice in board.drain_notices() {
            output::notice(&notice, verbosity);
        }

        let landed = board
            .snapshot()
            .locate(&paper_id)
            .filter(|p| p.stage_id == to_stage)
            .map(|p| p.position);
        let result = match &outcome {
            MoveOutcome::Unchanged => "unchanged",
            MoveOutcome::Rejected(_) => "rejected",
            MoveOutcome::Held | MoveOutcome::Settled(Settlement::Released { .. }) => "held",
            MoveOutcome::Settled(Settlement::Confirmed { .. }) => "moved",
            MoveOutcome::Settled(Settlement::Diverged { .. }) => "moved",
            MoveOutcome::Settled(Settlement::RolledBack { .. }) => "rolled_back",
            MoveOutcome::Settled(Settlement::Stale { .. }) => "stale",
        };

        if ctx.json {
            let report = MoveReport {
                paper_id: paper_id.as_str(),
                stage_id: to_stage.as_str(),
                result,
                position: landed,
            };
            println!(
                "{}",
                serde_json::to_string(&report).context("Failed to encode result")?
            );
        }

        match outcome {
            MoveOutcome::Unchanged => {
                if !ctx.json {
                    output::print(
                        format!("{} is already there; nothing to do", paper_id),
                        verbosity,
                    );
                }
                Ok(())
            }
            MoveOutcome::Rejected(e) => bail!("Move refused: {}", e),
            MoveOutcome::Held => {
                if !ctx.json {
                    output::print(
                        format!("{} has a move in flight; this one is queued", paper_id),
                        verbosity,
                    );
                }
                Ok(())
            }
            MoveOutcome::Settled(Settlement::RolledBack { notice, .. }) => {
                bail!("Move of {} was undone: {}", paper_id, notice.message)
            }
            MoveOutcome::Settled(_) => {
                if !ctx.json {
                    let stage_name = board
                        .snapshot()
                        .stage(&to_stage)
                        .map(|s| s.name.clone())
                        .unwrap_or_else(|| to_stage.to_string());
                    match landed {
                        Some(pos) => output::print(
                            format!("Moved {} to {} at position {}", paper_id, stage_name, pos),
                            verbosity,
                        ),
                        None => output::print(
                            format!("Moved {}; the server placed it elsewhere", paper_id),
                            verbosity,
                        ),
                    }
                }
                Ok(())
            }
        }
    })
}
