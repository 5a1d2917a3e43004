//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::{Display, Write as _};

use crate::core::snapshot::PipelineSnapshot;
use crate::engine::notice::Notice;
use crate::engine::stats::BoardMetrics;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a notice raised by a failed move.
pub fn notice(notice: &Notice, verbosity: Verbosity) {
    let hint = if notice.retryable { " (retry later)" } else { "" };
    warn(format_args!("{}{}", notice, hint), verbosity);
}

/// Render the board as columns listed one after another.
///
/// ```text
/// Inbox (2)
///   0  p1  Attention Is All You Need  [high, 7.5]
///   1  p2  BERT
/// Screening (0)
///   (empty)
/// ```
pub fn format_board(snapshot: &PipelineSnapshot) -> String {
    let mut out = String::new();
    for stage in snapshot.stages() {
        let column = snapshot.placements(&stage.id);
        let _ = writeln!(out, "{} ({})", stage.name, column.len());
        if column.is_empty() {
            let _ = writeln!(out, "  (empty)");
        }
        for placement in column {
            let Some(paper) = snapshot.summary(&placement.paper_id) else {
                let _ = writeln!(out, "  {}  {}", placement.position, placement.paper_id);
                continue;
            };
            let mut tags = Vec::new();
            if paper.priority != Default::default() {
                tags.push(paper.priority.to_string());
            }
            if let Some(score) = paper.latest_score {
                tags.push(format!("{}", score));
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", tags.join(", "))
            };
            let _ = writeln!(
                out,
                "  {}  {}  {}{}",
                placement.position, paper.id, paper.title, tags
            );
        }
    }
    out
}

/// Render metrics as an aligned table.
pub fn format_metrics(metrics: &BoardMetrics) -> String {
    let width = metrics
        .per_stage
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("Total".len());
    let mut out = String::new();
    for stage in &metrics.per_stage {
        let _ = writeln!(out, "{:<width$}  {}", stage.name, stage.count, width = width);
    }
    let _ = writeln!(out, "{:<width$}  {}", "Total", metrics.total_papers, width = width);
    match metrics.average_score {
        Some(avg) => {
            let _ = writeln!(
                out,
                "Average score {:.2} over {} scored papers",
                avg, metrics.scored_papers
            );
        }
        None => {
            let _ = writeln!(out, "No scored papers");
        }
    }
    out
}
