//! engine
//!
//! Turns drag gestures into persisted board moves.
//!
//! # Architecture
//!
//! A move flows through the engine in a fixed order:
//!
//! 1. **Gesture**: [`gesture::GestureResolver`] interprets pointer or keyboard
//!    input and resolves a released drag into at most one `MoveIntent`
//! 2. **Validate**: [`validate::validate`] checks the intent against the
//!    current snapshot and the board's [`validate::MovePolicy`]
//! 3. **Apply**: [`coordinator::Coordinator`] applies it to the store
//!    optimistically; a move of a paper with a request in flight is held
//! 4. **Persist**: the move is sent through a `BoardSync` with a timeout
//! 5. **Settle**: success reconciles server fields; failure rolls back and
//!    raises a [`notice::Notice`]; a conflict also forces a refetch
//!
//! [`board::Board`] ties these together for one project.
//! [`stats::StatsAggregator`] follows the store independently.
//!
//! # Invariants
//!
//! - The store is only changed through `apply` and `replace`
//! - Validation rejections never reach the network
//! - Each failed move raises exactly one notice
//! - At most one request per paper is in flight; the next one is sent with
//!   the version the server returned for it

pub mod board;
pub mod coordinator;
pub mod geometry;
pub mod gesture;
pub mod notice;
pub mod stats;
pub mod validate;

pub use board::{Board, BoardOptions, MoveOutcome, RefetchReport, Submission};
pub use coordinator::{Coordinator, Dispatch, Settlement, Ticket};
pub use gesture::{DragEvent, DragKey, DragTrigger, DropTarget, GestureResolver, GestureUpdate};
pub use notice::{FailureKind, Notice};
pub use stats::{BoardMetrics, StatsAggregator};
pub use validate::{validate, MovePolicy, PermissivePolicy, TransitionTable, ValidatedMove};
