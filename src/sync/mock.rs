//! sync::mock
//!
//! In-memory board server for deterministic testing.
//!
//! # Design
//!
//! The mock keeps its own copy of the board as the "server truth". Moves are
//! applied to it the way the real service does: the placement's version must
//! match `expected_version` or the move is refused as a conflict, and each
//! accepted move bumps the version. Failures can be configured permanently
//! with [`FailOn`] or one at a time with [`MockBoardSync::fail_next_move`].
//!
//! # Example
//!
//! ```
//! use paperboard::core::snapshot::{PaperSummary, PipelineSnapshot, Stage};
//! use paperboard::core::types::{PaperId, ProjectId, StageId};
//! use paperboard::sync::mock::MockBoardSync;
//! use paperboard::sync::{BoardSync, MoveRequest};
//!
//! # tokio_test::block_on(async {
//! let inbox = StageId::new("inbox").unwrap();
//! let done = StageId::new("done").unwrap();
//! let board = PipelineSnapshot::from_columns(vec![
//!     (Stage::new(inbox.clone(), "Inbox", 0), vec![PaperSummary::new(PaperId::new("p1").unwrap(), "One")]),
//!     (Stage::new(done.clone(), "Done", 1), vec![]),
//! ]).unwrap();
//!
//! let sync = MockBoardSync::with_board(board);
//! let placed = sync.move_paper(MoveRequest {
//!     project: ProjectId::new("lab").unwrap(),
//!     paper_id: PaperId::new("p1").unwrap(),
//!     stage_id: done.clone(),
//!     position: 0,
//!     expected_version: 0,
//! }).await.unwrap();
//!
//! assert_eq!(placed.version, Some(1));
//! assert_eq!(sync.board().unwrap().stage_len(&done), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{BoardSync, MoveRequest, ServerPlacement, SyncError};
use crate::core::snapshot::{MoveIntent, PipelineSnapshot};
use crate::core::types::ProjectId;

/// Mock board server for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockBoardSync {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug)]
struct MockInner {
    board: Option<PipelineSnapshot>,
    fail_on: Option<FailOn>,
    queued_move_failures: VecDeque<SyncError>,
    move_delay: Option<Duration>,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should always fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail fetch_board with the given error.
    FetchBoard(SyncError),
    /// Fail move_paper with the given error.
    MovePaper(SyncError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    FetchBoard { project: ProjectId },
    MovePaper(MoveRequest),
}

impl MockBoardSync {
    /// Create a mock with no board (fetches fail with 404).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                board: None,
                fail_on: None,
                queued_move_failures: VecDeque::new(),
                move_delay: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Create a mock serving `board`.
    pub fn with_board(board: PipelineSnapshot) -> Self {
        let mock = Self::new();
        mock.set_board(board);
        mock
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use paperboard::sync::mock::{FailOn, MockBoardSync};
    /// use paperboard::sync::SyncError;
    ///
    /// let sync = MockBoardSync::new()
    ///     .fail_on(FailOn::MovePaper(SyncError::Network("connection reset".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Fail the next `move_paper` call with `error`, then behave normally.
    ///
    /// Calls queue up: each consumes one error.
    pub fn fail_next_move(&self, error: SyncError) {
        let mut inner = self.inner.lock().unwrap();
        inner.queued_move_failures.push_back(error);
    }

    /// Delay every `move_paper` response by `delay`.
    pub fn delay_moves(self, delay: Duration) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.move_delay = Some(delay);
        }
        self
    }

    /// Replace the server-side board (simulates another client's edits).
    pub fn set_board(&self, board: PipelineSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.board = Some(board);
    }

    /// The server-side board (for test verification).
    pub fn board(&self) -> Option<PipelineSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner.board.clone()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Number of `move_paper` calls received.
    pub fn move_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::MovePaper(_)))
            .count()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }
}

impl Default for MockBoardSync {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoardSync for MockBoardSync {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_board(&self, project: &ProjectId) -> Result<PipelineSnapshot, SyncError> {
        self.record(MockOperation::FetchBoard {
            project: project.clone(),
        });
        let inner = self.inner.lock().unwrap();
        if let Some(FailOn::FetchBoard(e)) = &inner.fail_on {
            return Err(e.clone());
        }
        inner.board.clone().ok_or_else(|| SyncError::Rejected {
            status: 404,
            message: format!("no board for project '{}'", project),
        })
    }

    async fn move_paper(&self, request: MoveRequest) -> Result<ServerPlacement, SyncError> {
        self.record(MockOperation::MovePaper(request.clone()));

        let delay = self.inner.lock().unwrap().move_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = inner.queued_move_failures.pop_front() {
            return Err(e);
        }
        if let Some(FailOn::MovePaper(e)) = &inner.fail_on {
            return Err(e.clone());
        }

        let not_found = |what: String| SyncError::Rejected {
            status: 404,
            message: what,
        };
        let board = inner
            .board
            .as_ref()
            .ok_or_else(|| not_found(format!("no board for project '{}'", request.project)))?;
        let current = board
            .locate(&request.paper_id)
            .ok_or_else(|| not_found(format!("paper '{}' not found", request.paper_id)))?;
        if current.version != request.expected_version {
            return Err(SyncError::Conflict(format!(
                "paper '{}' is at version {}, request expected {}",
                request.paper_id, current.version, request.expected_version
            )));
        }
        let version = current.version + 1;
        let intent = MoveIntent::new(
            request.paper_id.clone(),
            current.stage_id.clone(),
            request.stage_id.clone(),
            request.position as i64,
        );
        let moved = board.with_move(&intent).map_err(|e| SyncError::Rejected {
            status: 422,
            message: e.to_string(),
        })?;
        let position = moved.locate(&request.paper_id).map(|p| p.position);
        let updated = moved
            .reconcile_placement(&request.paper_id, &request.stage_id, None, Some(version))
            .unwrap_or(moved);
        inner.board = Some(updated);

        Ok(ServerPlacement {
            paper_id: request.paper_id,
            stage_id: request.stage_id,
            position,
            version: Some(version),
        })
    }
}
