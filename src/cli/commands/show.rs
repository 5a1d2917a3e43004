//! show command - Print the board

use anyhow::{Context as _, Result};

use super::{block_on, load_board};
use crate::cli::Context;
use crate::sync::BoardPayload;
use crate::ui::output;

/// Fetch the board and print it, as columns or as the JSON payload.
pub fn show(ctx: &Context) -> Result<()> {
    block_on(async {
        let board = load_board(ctx).await?;
        if ctx.json {
            let payload = BoardPayload::from_snapshot(board.snapshot());
            let json =
                serde_json::to_string_pretty(&payload).context("Failed to encode board")?;
            println!("{}", json);
            return Ok(());
        }
        print!("{}", output::format_board(board.snapshot()));
        if ctx.debug {
            eprintln!("fingerprint {}", board.snapshot().fingerprint());
        }
        Ok(())
    })
}
