//! engine::notice
//!
//! User-visible error notices raised when a move fails to persist.
//!
//! The coordinator raises exactly one [`Notice`] per failed move. Notices are
//! held in a [`NoticeLog`] until the presentation layer drains them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::types::PaperId;
use crate::sync::SyncError;

/// Broad category of a persistence failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Timeout,
    ServerRejected,
    Conflict,
}

impl From<&SyncError> for FailureKind {
    fn from(err: &SyncError) -> Self {
        match err {
            SyncError::Network(_) => FailureKind::Network,
            SyncError::Timeout(_) => FailureKind::Timeout,
            SyncError::Conflict(_) => FailureKind::Conflict,
            SyncError::Rejected { .. } | SyncError::Decode(_) | SyncError::InvalidBoard(_) => {
                FailureKind::ServerRejected
            }
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Network => write!(f, "network"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ServerRejected => write!(f, "rejected"),
            FailureKind::Conflict => write!(f, "conflict"),
        }
    }
}

/// One failed move, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub paper_id: PaperId,
    pub kind: FailureKind,
    pub message: String,
    /// Whether retrying the same move may succeed.
    pub retryable: bool,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    /// Build a notice for a failed move of `paper_id`.
    pub fn from_sync_error(paper_id: PaperId, err: &SyncError) -> Self {
        let kind = FailureKind::from(err);
        let message = match kind {
            FailureKind::Conflict => format!(
                "'{}' was changed elsewhere; the board has been reloaded ({})",
                paper_id, err
            ),
            _ => format!("could not move '{}': {}", paper_id, err),
        };
        Self {
            paper_id,
            kind,
            message,
            retryable: err.is_retryable(),
            raised_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Pending notices, oldest first.
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    notices: Vec<Notice>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notice.
    pub fn push(&mut self, notice: Notice) {
        tracing::warn!(
            paper = %notice.paper_id,
            kind = %notice.kind,
            retryable = notice.retryable,
            "{}",
            notice.message
        );
        self.notices.push(notice);
    }

    /// Notices not yet drained.
    pub fn pending(&self) -> &[Notice] {
        &self.notices
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Take all pending notices.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
