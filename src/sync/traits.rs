//! sync::traits
//!
//! The persistence boundary between a board and the REST service that owns
//! the canonical pipeline.
//!
//! # Design
//!
//! [`BoardSync`] is async because both operations are network I/O. It is the
//! only way a board reaches the server: the coordinator calls
//! [`BoardSync::move_paper`] after an optimistic apply, and the board calls
//! [`BoardSync::fetch_board`] on load and whenever it must refetch.
//!
//! Implementations report failures as a [`SyncError`]; callers classify them
//! with [`SyncError::is_conflict`] and [`SyncError::is_retryable`] rather
//! than matching on transport details.
//!
//! # Example
//!
//! ```ignore
//! use paperboard::sync::{BoardSync, MoveRequest};
//!
//! async fn file_paper(sync: &dyn BoardSync, request: MoveRequest) -> Result<(), SyncError> {
//!     let placed = sync.move_paper(request).await?;
//!     println!("{} now at {:?}", placed.paper_id, placed.position);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::snapshot::{PaperSummary, PipelineSnapshot, Placement, SnapshotError, Stage};
use crate::core::types::{PaperId, ProjectId, StageId};

/// Errors from board persistence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// No response arrived within the persistence timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The server detected a concurrent edit of the same placement.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The server refused the request.
    #[error("server rejected request: {status} - {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The server returned a board that violates a board invariant.
    #[error("invalid board: {0}")]
    InvalidBoard(#[from] SnapshotError),
}

impl SyncError {
    /// Whether the server reported a concurrent edit.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict(_))
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, timeouts and server-side (5xx) errors are
    /// transient. Rejections in the 4xx range and conflicts are not: the
    /// request itself or the client's view must change first.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) | SyncError::Timeout(_) => true,
            SyncError::Rejected { status, .. } => *status >= 500,
            SyncError::Conflict(_) | SyncError::Decode(_) | SyncError::InvalidBoard(_) => false,
        }
    }
}

/// Board payload as served by `GET /projects/{project}/board`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardPayload {
    pub stages: Vec<Stage>,
    pub placements: Vec<Placement>,
    #[serde(default)]
    pub papers: Vec<PaperSummary>,
}

impl BoardPayload {
    /// Convert into a checked snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidBoard`] if the payload breaks a board
    /// invariant (a paper in two stages, gaps in positions, ...).
    pub fn into_snapshot(self) -> Result<PipelineSnapshot, SyncError> {
        Ok(PipelineSnapshot::from_parts(
            self.stages,
            self.placements,
            self.papers,
        )?)
    }

    /// Flatten a snapshot back into payload form.
    pub fn from_snapshot(snapshot: &PipelineSnapshot) -> Self {
        let placements = snapshot
            .stages()
            .iter()
            .flat_map(|s| snapshot.placements(&s.id).iter().cloned())
            .collect();
        Self {
            stages: snapshot.stages().to_vec(),
            placements,
            papers: snapshot.summaries().cloned().collect(),
        }
    }
}

/// Request to persist one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// Project that owns the board
    pub project: ProjectId,
    /// Paper being moved
    pub paper_id: PaperId,
    /// Destination stage
    pub stage_id: StageId,
    /// Requested position in the destination (already clamped)
    pub position: usize,
    /// Placement version the client last saw
    pub expected_version: u64,
}

/// Server-confirmed placement after a successful move.
///
/// The server may assign a different canonical position, and usually bumps
/// the version; both are optional in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPlacement {
    pub paper_id: PaperId,
    pub stage_id: StageId,
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(default)]
    pub version: Option<u64>,
}

/// The persistence service for one board.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a board can hold them behind
/// `Arc<dyn BoardSync>` across tasks.
///
/// # Error Handling
///
/// - `Conflict`: the view is stale; roll back and refetch
/// - `Network` / `Timeout`: roll back; the user may retry
/// - `Rejected`: roll back and surface the server's message
#[async_trait]
pub trait BoardSync: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the full board for `project`.
    async fn fetch_board(&self, project: &ProjectId) -> Result<PipelineSnapshot, SyncError>;

    /// Persist a move of one paper.
    async fn move_paper(&self, request: MoveRequest) -> Result<ServerPlacement, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SyncError::Network("reset".into()).is_retryable());
        assert!(SyncError::Timeout(Duration::from_millis(10)).is_retryable());
        assert!(SyncError::Rejected {
            status: 503,
            message: "down".into()
        }
        .is_retryable());
        assert!(!SyncError::Rejected {
            status: 422,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!SyncError::Conflict("stale".into()).is_retryable());
    }

    #[test]
    fn timeout_message_in_millis() {
        let err = SyncError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "timed out after 1500ms");
    }

    #[test]
    fn payload_decodes_server_json() {
        let json = r##"{
            "stages": [
                {"id": "screening", "name": "Screening", "display_color": "#fa0", "order": 1},
                {"id": "inbox", "name": "Inbox", "order": 0}
            ],
            "placements": [
                {"paper_id": "p2", "stage_id": "inbox", "position": 1, "version": 4},
                {"paper_id": "p1", "stage_id": "inbox", "position": 0}
            ],
            "papers": [
                {"id": "p1", "title": "Attention", "latest_score": 7.5, "priority": "high"},
                {"id": "p2", "title": "Transformers"}
            ]
        }"##;
        let payload: BoardPayload = serde_json::from_str(json).unwrap();
        let snapshot = payload.into_snapshot().unwrap();

        let inbox = StageId::new("inbox").unwrap();
        assert_eq!(snapshot.stages()[0].id, inbox);
        let column: Vec<&str> = snapshot.column(&inbox).iter().map(|p| p.as_str()).collect();
        assert_eq!(column, vec!["p1", "p2"]);
        assert_eq!(snapshot.placements(&inbox)[1].version, 4);
    }

    #[test]
    fn payload_with_duplicate_paper_rejected() {
        let json = r#"{
            "stages": [{"id": "inbox", "name": "Inbox", "order": 0},
                       {"id": "done", "name": "Done", "order": 1}],
            "placements": [
                {"paper_id": "p1", "stage_id": "inbox", "position": 0},
                {"paper_id": "p1", "stage_id": "done", "position": 0}
            ],
            "papers": [{"id": "p1", "title": "Twice"}]
        }"#;
        let payload: BoardPayload = serde_json::from_str(json).unwrap();
        assert!(matches!(
            payload.into_snapshot(),
            Err(SyncError::InvalidBoard(_))
        ));
    }

    #[test]
    fn payload_from_snapshot_roundtrip() {
        let snapshot = PipelineSnapshot::from_columns(vec![(
            Stage::new(StageId::new("inbox").unwrap(), "Inbox", 0),
            vec![PaperSummary::new(PaperId::new("p1").unwrap(), "One")],
        )])
        .unwrap();
        let payload = BoardPayload::from_snapshot(&snapshot);
        assert_eq!(payload.into_snapshot().unwrap(), snapshot);
    }

    #[test]
    fn server_placement_optional_fields() {
        let placed: ServerPlacement =
            serde_json::from_str(r#"{"paper_id": "p1", "stage_id": "inbox"}"#).unwrap();
        assert_eq!(placed.position, None);
        assert_eq!(placed.version, None);
    }
}
