//! Paperboard - a research-paper pipeline board
//!
//! Papers move through an ordered set of stages (Inbox, Screening, Reading,
//! ...). Paperboard keeps a local view of one project's board, applies moves
//! to it immediately, persists them to the board server in the background and
//! undoes them exactly when the server refuses.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Move validation, drag gestures, optimistic persistence and stats
//! - [`core`] - Domain types, the pipeline snapshot, the board store and config
//! - [`sync`] - Abstraction over the board server (REST v1)
//! - [`logging`] - Diagnostic logging setup
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! Paperboard maintains the following invariants:
//!
//! 1. Every paper sits in exactly one stage, at exactly one position
//! 2. Positions in a stage are contiguous from zero
//! 3. A failed move is undone exactly, without disturbing other moves
//! 4. Out-of-order server responses never overwrite newer local state

pub mod cli;
pub mod core;
pub mod engine;
pub mod logging;
pub mod sync;
pub mod ui;
