//! engine::coordinator
//!
//! Optimistic application of moves with rollback on persistence failure.
//!
//! # Lifecycle
//!
//! A move goes through three steps, split so callers can interleave many
//! in-flight moves on one task:
//!
//! 1. [`Coordinator::begin`] applies the validated intent to the store
//!    immediately and records it as pending. It returns
//!    [`Dispatch::Ready`] with a [`Ticket`] carrying the request to persist.
//! 2. The caller persists the request, typically via [`persist`], which
//!    bounds the call with a timeout.
//! 3. [`Coordinator::complete`] settles the ticket with the outcome.
//!
//! # Ordering
//!
//! At most one request per paper is in flight. A move of a paper whose
//! earlier request has not settled yet is applied locally but held
//! ([`Dispatch::Held`]); only the newest held move is kept. When the earlier
//! request succeeds, the held move is released as [`Settlement::Released`]
//! with a ticket carrying the version the server just returned. When it
//! fails, the held move is dropped along with it and the paper returns to
//! where the server has it.
//!
//! Every `begin` takes a monotonically increasing sequence number. A
//! response whose ticket no longer matches the paper's pending entry (for
//! instance after a refetch) is stale and ignored.
//!
//! # Rollback
//!
//! While anything is pending the coordinator keeps the last board the
//! server is known to hold: the snapshot at the first `begin`, with every
//! confirmed placement folded in. On failure the board is rebuilt from it by
//! re-applying the intents still pending, in sequence order. An unrelated
//! in-flight move therefore survives another paper's rollback, and a
//! confirmed move cannot be undone by one.
//!
//! A `Conflict` outcome additionally requires a refetch: the local view of
//! that placement is known to be stale.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::snapshot::{MoveError, MoveIntent, PipelineSnapshot};
use crate::core::store::{BoardStore, ReplaceReason};
use crate::core::types::{PaperId, ProjectId};
use crate::sync::{BoardSync, MoveRequest, ServerPlacement, SyncError};

use super::notice::{FailureKind, Notice, NoticeLog};
use super::validate::ValidatedMove;

/// Handle for one in-flight move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    request: MoveRequest,
}

impl Ticket {
    /// Sequence number assigned at `begin`.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The paper being moved.
    pub fn paper_id(&self) -> &PaperId {
        &self.request.paper_id
    }

    /// Request to send to the server.
    pub fn request(&self) -> &MoveRequest {
        &self.request
    }
}

/// What [`Coordinator::begin`] did with an applied move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send the ticket's request now.
    Ready(Ticket),
    /// The paper already has a request in flight. The move is shown locally
    /// and its request is released when the earlier one settles.
    Held { paper_id: PaperId, seq: u64 },
}

/// A move applied locally and sent, awaiting its response.
#[derive(Debug, Clone)]
struct PendingMutation {
    seq: u64,
    intent: MoveIntent,
    project: ProjectId,
    held: Option<HeldMove>,
}

/// The newest move of a paper whose earlier request is still in flight.
#[derive(Debug, Clone)]
struct HeldMove {
    seq: u64,
    intent: MoveIntent,
}

/// How a ticket was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The server confirmed the move; server-owned fields were folded in.
    Confirmed { paper_id: PaperId },
    /// The server confirmed the move and a newer move of the same paper was
    /// waiting on it. Persist `next` and settle it in turn.
    Released { paper_id: PaperId, next: Ticket },
    /// The server confirmed, but placed the paper somewhere the local view
    /// cannot account for. The board should refetch.
    Diverged { paper_id: PaperId },
    /// The move failed and was rolled back, along with any move of the same
    /// paper held behind it.
    RolledBack {
        notice: Notice,
        refetch_required: bool,
    },
    /// The ticket no longer matches the paper's pending entry; ignored.
    Stale { paper_id: PaperId },
}

impl Settlement {
    /// Whether the caller should refetch the board.
    pub fn refetch_required(&self) -> bool {
        match self {
            Settlement::Diverged { .. } => true,
            Settlement::RolledBack {
                refetch_required, ..
            } => *refetch_required,
            Settlement::Confirmed { .. }
            | Settlement::Released { .. }
            | Settlement::Stale { .. } => false,
        }
    }

    /// Whether the move was rolled back.
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Settlement::RolledBack { .. })
    }
}

/// Tracks pending mutations for one board.
#[derive(Debug, Default)]
pub struct Coordinator {
    pending: BTreeMap<PaperId, PendingMutation>,
    /// Board as the server holds it; set while anything is pending.
    server: Option<PipelineSnapshot>,
    next_seq: u64,
    notices: NoticeLog,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `validated` optimistically and record it as pending.
    ///
    /// If the paper already has a request in flight the move is held rather
    /// than sent, replacing any move held before it.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveError`] if the move no longer applies to the store's
    /// snapshot (it was validated against a different one). Nothing changes.
    pub fn begin(
        &mut self,
        store: &mut BoardStore,
        project: &ProjectId,
        validated: ValidatedMove,
    ) -> Result<Dispatch, MoveError> {
        let before = store.snapshot().clone();
        let intent = validated.into_intent();
        let expected_version = before
            .locate(&intent.paper_id)
            .map(|p| p.version)
            .ok_or_else(|| MoveError::UnknownPaper(intent.paper_id.clone()))?;

        let applied = store.apply(&intent)?;
        let position = applied
            .locate(&intent.paper_id)
            .map(|p| p.position)
            .unwrap_or(0);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.server.get_or_insert(before);

        tracing::debug!(
            paper = %intent.paper_id,
            from = %intent.from_stage_id,
            to = %intent.to_stage_id,
            position,
            seq,
            "move applied optimistically"
        );

        if let Some(in_flight) = self.pending.get_mut(&intent.paper_id) {
            tracing::debug!(
                paper = %intent.paper_id,
                in_flight = in_flight.seq,
                replaces = in_flight.held.as_ref().map(|h| h.seq),
                seq,
                "move held until the earlier request settles"
            );
            let paper_id = intent.paper_id.clone();
            in_flight.held = Some(HeldMove { seq, intent });
            return Ok(Dispatch::Held { paper_id, seq });
        }

        let request = MoveRequest {
            project: project.clone(),
            paper_id: intent.paper_id.clone(),
            stage_id: intent.to_stage_id.clone(),
            position,
            expected_version,
        };
        self.pending.insert(
            intent.paper_id.clone(),
            PendingMutation {
                seq,
                intent,
                project: project.clone(),
                held: None,
            },
        );
        Ok(Dispatch::Ready(Ticket { seq, request }))
    }

    /// Settle `ticket` with the persistence outcome.
    pub fn complete(
        &mut self,
        store: &mut BoardStore,
        ticket: Ticket,
        outcome: Result<ServerPlacement, SyncError>,
    ) -> Settlement {
        let paper_id = ticket.request.paper_id;
        let current = self
            .pending
            .get(&paper_id)
            .is_some_and(|pending| pending.seq == ticket.seq);
        if !current {
            tracing::debug!(paper = %paper_id, seq = ticket.seq, "stale response ignored");
            return Settlement::Stale { paper_id };
        }
        let Some(mut pending) = self.pending.remove(&paper_id) else {
            return Settlement::Stale { paper_id };
        };

        let settlement = match outcome {
            Ok(placed) => match pending.held.take() {
                None => self.confirm(store, pending, placed),
                Some(held) => self.release(store, pending, held, placed),
            },
            Err(err) => self.roll_back(store, pending, &err),
        };
        if self.pending.is_empty() {
            self.server = None;
        }
        settlement
    }

    /// Forget every pending mutation, held moves included.
    ///
    /// Called after a refetch replaces the board: in-flight responses are
    /// then stale relative to the fetched state.
    pub fn clear_pending(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(count = self.pending.len(), "pending mutations cleared");
        }
        self.pending.clear();
        self.server = None;
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `paper` has a request awaiting a response.
    pub fn is_pending(&self, paper: &PaperId) -> bool {
        self.pending.contains_key(paper)
    }

    /// Whether `paper` has a move waiting for its earlier request.
    pub fn is_held(&self, paper: &PaperId) -> bool {
        self.pending
            .get(paper)
            .is_some_and(|pending| pending.held.is_some())
    }

    /// Notices raised so far and not yet drained.
    pub fn notices(&self) -> &NoticeLog {
        &self.notices
    }

    /// Take all pending notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    fn confirm(
        &mut self,
        store: &mut BoardStore,
        pending: PendingMutation,
        placed: ServerPlacement,
    ) -> Settlement {
        let paper_id = pending.intent.paper_id.clone();
        if !self.accept(&pending, &placed) {
            return Settlement::Diverged { paper_id };
        }

        let reconciled = store.snapshot().reconcile_placement(
            &paper_id,
            &placed.stage_id,
            placed.position,
            placed.version,
        );
        match reconciled {
            Some(next) => {
                if &next != store.snapshot() {
                    store.replace(next, ReplaceReason::Reconcile);
                }
            }
            None => {
                tracing::warn!(paper = %paper_id, "confirmed placement not found locally");
                return Settlement::Diverged { paper_id };
            }
        }

        tracing::info!(paper = %paper_id, stage = %placed.stage_id, "move confirmed");
        Settlement::Confirmed { paper_id }
    }

    /// The earlier move is confirmed; send the held one from where the
    /// server now has the paper.
    fn release(
        &mut self,
        store: &BoardStore,
        confirmed: PendingMutation,
        held: HeldMove,
        placed: ServerPlacement,
    ) -> Settlement {
        let paper_id = confirmed.intent.paper_id.clone();
        if !self.accept(&confirmed, &placed) {
            return Settlement::Diverged { paper_id };
        }
        let Some(expected_version) = self
            .server
            .as_ref()
            .and_then(|server| server.locate(&paper_id))
            .map(|p| p.version)
        else {
            tracing::warn!(paper = %paper_id, "confirmed placement not found on the server board");
            return Settlement::Diverged { paper_id };
        };

        let position = store
            .snapshot()
            .locate(&paper_id)
            .map(|p| p.position)
            .unwrap_or(0);
        let request = MoveRequest {
            project: confirmed.project.clone(),
            paper_id: paper_id.clone(),
            stage_id: held.intent.to_stage_id.clone(),
            position,
            expected_version,
        };

        tracing::info!(paper = %paper_id, stage = %placed.stage_id, "move confirmed");
        tracing::debug!(
            paper = %paper_id,
            seq = held.seq,
            expected_version,
            "held move released"
        );
        self.pending.insert(
            paper_id.clone(),
            PendingMutation {
                seq: held.seq,
                intent: held.intent,
                project: confirmed.project,
                held: None,
            },
        );
        Settlement::Released {
            paper_id,
            next: Ticket {
                seq: held.seq,
                request,
            },
        }
    }

    /// Check a success response against the pending move and fold it into
    /// the server board. Returns false if the board should be refetched.
    fn accept(&mut self, pending: &PendingMutation, placed: &ServerPlacement) -> bool {
        let paper_id = &pending.intent.paper_id;
        if &placed.paper_id != paper_id || placed.stage_id != pending.intent.to_stage_id {
            tracing::warn!(
                paper = %paper_id,
                expected = %pending.intent.to_stage_id,
                server = %placed.stage_id,
                "server placed paper in an unexpected stage"
            );
            return false;
        }
        let Some(server) = self.server.as_ref() else {
            return true;
        };
        match settle_placement(server, placed, pending.intent.target_position) {
            Some(next) => {
                self.server = Some(next);
                true
            }
            None => {
                tracing::warn!(paper = %paper_id, "confirmed placement does not fit the server board");
                false
            }
        }
    }

    fn roll_back(
        &mut self,
        store: &mut BoardStore,
        failed: PendingMutation,
        err: &SyncError,
    ) -> Settlement {
        let paper_id = failed.intent.paper_id.clone();
        if let Some(held) = &failed.held {
            tracing::debug!(paper = %paper_id, seq = held.seq, "held move dropped with its predecessor");
        }

        let mut restored = self
            .server
            .clone()
            .unwrap_or_else(|| store.snapshot().clone());
        let mut replay: Vec<(u64, &MoveIntent)> = Vec::new();
        for pending in self.pending.values() {
            replay.push((pending.seq, &pending.intent));
            if let Some(held) = &pending.held {
                replay.push((held.seq, &held.intent));
            }
        }
        replay.sort_by_key(|(seq, _)| *seq);
        for (_, intent) in replay {
            match restored.with_move(intent) {
                Ok(next) => restored = next,
                Err(e) => tracing::warn!(
                    paper = %intent.paper_id,
                    error = %e,
                    "could not re-apply pending move after rollback"
                ),
            }
        }
        store.replace(restored, ReplaceReason::Rollback);

        let notice = Notice::from_sync_error(paper_id, err);
        let refetch_required = notice.kind == FailureKind::Conflict;
        self.notices.push(notice.clone());
        Settlement::RolledBack {
            notice,
            refetch_required,
        }
    }
}

/// `server` with `placed` applied: the paper moved to its confirmed stage
/// and position, carrying the confirmed version.
fn settle_placement(
    server: &PipelineSnapshot,
    placed: &ServerPlacement,
    fallback_position: i64,
) -> Option<PipelineSnapshot> {
    let current = server.locate(&placed.paper_id)?;
    let intent = MoveIntent::new(
        placed.paper_id.clone(),
        current.stage_id.clone(),
        placed.stage_id.clone(),
        placed.position.map_or(fallback_position, |p| p as i64),
    );
    server
        .with_move(&intent)
        .ok()?
        .reconcile_placement(&placed.paper_id, &placed.stage_id, None, placed.version)
}

/// Send `request` through `sync`, failing with [`SyncError::Timeout`] if no
/// response arrives within `timeout`.
pub async fn persist(
    sync: &dyn BoardSync,
    request: MoveRequest,
    timeout: Duration,
) -> Result<ServerPlacement, SyncError> {
    match tokio::time::timeout(timeout, sync.move_paper(request)).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout(timeout)),
    }
}
