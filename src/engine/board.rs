//! engine::board
//!
//! The board facade: one project's pipeline as seen by the UI layer.
//!
//! # Architecture
//!
//! [`Board`] owns the store and wires the engine pieces around it:
//!
//! ```text
//!   drag input ──► GestureResolver ──► MoveIntent
//!                                          │
//!                                     validate (MovePolicy)
//!                                          │
//!                                     Coordinator::begin ──► BoardStore::apply ──► subscribers
//!                                          │                                        (StatsAggregator, UI)
//!                                     BoardSync::move_paper
//!                                          │
//!                                     Coordinator::complete ──► reconcile / rollback / refetch
//! ```
//!
//! Everything except the persistence call is synchronous. Callers that need
//! several moves in flight at once use [`Board::submit`], drive
//! [`Board::persistence`] themselves, and settle with [`Board::complete`].
//! A settlement of [`Settlement::Released`] hands back the next ticket for
//! the same paper, which must be persisted and settled the same way.
//! [`Board::move_paper`] does all of this in sequence for the simple case.
//!
//! # Example
//!
//! ```ignore
//! let mut board = Board::load(project, Arc::new(HttpBoardSync::from_config(&config)?),
//!     BoardOptions::from_config(&config)).await?;
//! board.subscribe(|_, snapshot| render(snapshot));
//! let outcome = board.move_paper(intent).await?;
//! for notice in board.drain_notices() {
//!     eprintln!("{}", notice);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::snapshot::{MoveError, MoveIntent, PipelineSnapshot};
use crate::core::store::{BoardStore, ReplaceReason, StoreChange, SubscriptionId};
use crate::core::types::{Fingerprint, PaperId, ProjectId};
use crate::sync::{BoardSync, ServerPlacement, SyncError};

use super::coordinator::{persist, Coordinator, Dispatch, Settlement, Ticket};
use super::geometry::Rect;
use super::gesture::{
    DragEvent, DragOrigin, DragTrigger, DropTarget, GestureConfig, GesturePhase,
    GestureResolver, GestureUpdate,
};
use super::notice::Notice;
use super::stats::{BoardMetrics, StatsAggregator};
use super::validate::{validate, MovePolicy, PermissivePolicy};

/// Tunables for a board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardOptions {
    /// Bound on each persistence call
    pub timeout: Duration,
    pub gesture: GestureConfig,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::core::config::DEFAULT_TIMEOUT_MS),
            gesture: GestureConfig::default(),
        }
    }
}

impl BoardOptions {
    /// Take options from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.timeout(),
            gesture: GestureConfig::from_config(config),
        }
    }
}

/// Result of submitting an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Applied optimistically; persist the ticket and settle it.
    Started(Ticket),
    /// Applied optimistically, but the paper already has a request in
    /// flight. The request is released by that request's settlement.
    Held { paper_id: PaperId },
    /// The move would not change the board; nothing was sent.
    Unchanged,
    /// Validation refused the intent; the board is untouched.
    Rejected(MoveError),
}

/// Result of [`Board::move_paper`].
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Unchanged,
    Rejected(MoveError),
    /// Queued behind a move of the same paper submitted elsewhere.
    Held,
    Settled(Settlement),
}

/// What a refetch found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchReport {
    /// The server layout differs from what was shown before the refetch.
    pub diverged: bool,
    pub fingerprint: Fingerprint,
}

/// One project's board.
pub struct Board {
    project: ProjectId,
    sync: Arc<dyn BoardSync>,
    policy: Box<dyn MovePolicy>,
    store: BoardStore,
    coordinator: Coordinator,
    gestures: GestureResolver,
    stats: StatsAggregator,
    timeout: Duration,
    needs_refetch: bool,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("project", &self.project)
            .field("sync", &self.sync.name())
            .field("policy", &self.policy.name())
            .field("store", &self.store)
            .field("pending", &self.coordinator.pending_count())
            .field("needs_refetch", &self.needs_refetch)
            .finish()
    }
}

impl Board {
    /// Create a board over an already-fetched snapshot.
    pub fn new(
        project: ProjectId,
        sync: Arc<dyn BoardSync>,
        snapshot: PipelineSnapshot,
        options: BoardOptions,
    ) -> Self {
        let mut store = BoardStore::new(snapshot);
        let stats = StatsAggregator::attach(&mut store);
        Self {
            project,
            sync,
            policy: Box::new(PermissivePolicy),
            store,
            coordinator: Coordinator::new(),
            gestures: GestureResolver::new(options.gesture),
            stats,
            timeout: options.timeout,
            needs_refetch: false,
        }
    }

    /// Fetch the board for `project` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns the [`SyncError`] from the initial fetch.
    pub async fn load(
        project: ProjectId,
        sync: Arc<dyn BoardSync>,
        options: BoardOptions,
    ) -> Result<Self, SyncError> {
        tracing::debug!(project = %project, backend = sync.name(), "loading board");
        let snapshot = sync.fetch_board(&project).await?;
        tracing::info!(
            project = %project,
            stages = snapshot.stages().len(),
            papers = snapshot.paper_count(),
            "board loaded"
        );
        Ok(Self::new(project, sync, snapshot, options))
    }

    /// Replace the move policy.
    pub fn with_policy(mut self, policy: impl MovePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// The current (possibly optimistic) snapshot.
    pub fn snapshot(&self) -> &PipelineSnapshot {
        self.store.snapshot()
    }

    /// Number of store mutations so far.
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Register a listener called after every board change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreChange, &PipelineSnapshot) + Send + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Current derived metrics.
    pub fn metrics(&self) -> BoardMetrics {
        self.stats.metrics()
    }

    /// Take the notices raised by failed moves.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.coordinator.drain_notices()
    }

    /// Whether the local view is known to be stale.
    pub fn needs_refetch(&self) -> bool {
        self.needs_refetch
    }

    /// Moves awaiting a server response.
    pub fn pending_count(&self) -> usize {
        self.coordinator.pending_count()
    }

    // -- gestures ---------------------------------------------------------

    /// Replace the drop targets the rendering layer laid out.
    pub fn set_drop_targets(&mut self, targets: Vec<DropTarget>) {
        self.gestures.set_targets(targets);
    }

    /// The gesture resolver (for hover feedback).
    pub fn gesture(&self) -> &GestureResolver {
        &self.gestures
    }

    /// Start dragging `paper`.
    ///
    /// Ignored if the paper is not on the board or another drag is active.
    pub fn begin_drag(&mut self, paper: &PaperId, trigger: DragTrigger) -> GestureUpdate {
        let Some(placement) = self.store.snapshot().locate(paper) else {
            tracing::warn!(paper = %paper, "drag started on a paper not on the board");
            return GestureUpdate::Ignored;
        };
        let rect = self
            .gestures
            .targets()
            .iter()
            .find(|t| t.paper_id() == Some(paper))
            .map(|t| t.rect)
            .unwrap_or_else(|| match trigger {
                DragTrigger::Pointer(p) => Rect::new(p.x, p.y, 0.0, 0.0),
                DragTrigger::Keyboard => Rect::default(),
            });
        let origin = DragOrigin {
            paper_id: placement.paper_id.clone(),
            stage_id: placement.stage_id.clone(),
            position: placement.position,
            rect,
        };
        self.gestures.begin(origin, trigger)
    }

    /// Feed drag input.
    pub fn handle_drag(&mut self, event: DragEvent) -> GestureUpdate {
        self.gestures.handle(event)
    }

    /// Cancel the active drag, if any.
    pub fn cancel_drag(&mut self) -> GestureUpdate {
        self.gestures.cancel()
    }

    /// Take the intent of a released drag and return the resolver to idle.
    ///
    /// A released drag that is never finished is discarded by the next
    /// [`Board::begin_drag`].
    pub fn finish_drag(&mut self) -> Option<MoveIntent> {
        if self.gestures.phase() != GesturePhase::Resolving {
            return None;
        }
        self.gestures.take_resolution(self.store.snapshot())
    }

    // -- moves ------------------------------------------------------------

    /// Validate `intent` and, if it changes the board, apply it optimistically.
    pub fn submit(&mut self, intent: &MoveIntent) -> Submission {
        let validated = match validate(self.store.snapshot(), intent, self.policy.as_ref()) {
            Ok(validated) => validated,
            Err(e) => return self.reject(e),
        };
        if validated.is_noop() {
            tracing::debug!(paper = %intent.paper_id, "drop in place, nothing to do");
            return Submission::Unchanged;
        }
        match self
            .coordinator
            .begin(&mut self.store, &self.project, validated)
        {
            Ok(Dispatch::Ready(ticket)) => Submission::Started(ticket),
            Ok(Dispatch::Held { paper_id, .. }) => Submission::Held { paper_id },
            Err(e) => self.reject(e),
        }
    }

    /// A future that persists `ticket`, bounded by the board's timeout.
    ///
    /// The future does not borrow the board, so several can be in flight
    /// while the board keeps handling input.
    pub fn persistence(
        &self,
        ticket: &Ticket,
    ) -> impl Future<Output = Result<ServerPlacement, SyncError>> + Send + 'static {
        let sync = Arc::clone(&self.sync);
        let request = ticket.request().clone();
        let timeout = self.timeout;
        async move { persist(sync.as_ref(), request, timeout).await }
    }

    /// Settle `ticket` with its persistence outcome.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<ServerPlacement, SyncError>,
    ) -> Settlement {
        let settlement = self.coordinator.complete(&mut self.store, ticket, outcome);
        if settlement.refetch_required() {
            self.needs_refetch = true;
        }
        settlement
    }

    /// Submit, persist and settle one move, refetching if required.
    ///
    /// # Errors
    ///
    /// Only a failed refetch is an error; move failures are reported in the
    /// outcome and as notices.
    pub async fn move_paper(&mut self, intent: MoveIntent) -> Result<MoveOutcome, SyncError> {
        let outcome = match self.submit(&intent) {
            Submission::Unchanged => MoveOutcome::Unchanged,
            Submission::Rejected(e) => MoveOutcome::Rejected(e),
            Submission::Held { .. } => MoveOutcome::Held,
            Submission::Started(mut ticket) => loop {
                let result = self.persistence(&ticket).await;
                match self.complete(ticket, result) {
                    Settlement::Released { next, .. } => ticket = next,
                    settled => break MoveOutcome::Settled(settled),
                }
            },
        };
        if self.needs_refetch {
            self.refetch().await?;
        }
        Ok(outcome)
    }

    /// Fetch the board again and replace the local view.
    ///
    /// All pending mutations are dropped; their responses become stale.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the local view is left as it was.
    pub async fn refetch(&mut self) -> Result<RefetchReport, SyncError> {
        let before = self.store.snapshot().fingerprint();
        let snapshot = self.sync.fetch_board(&self.project).await?;
        let fingerprint = snapshot.fingerprint();
        let diverged = fingerprint != before;
        if diverged {
            tracing::info!(project = %self.project, "server board differs from local view");
        }
        self.store.replace(snapshot, ReplaceReason::Refetch);
        self.coordinator.clear_pending();
        self.needs_refetch = false;
        Ok(RefetchReport {
            diverged,
            fingerprint,
        })
    }

    fn reject(&mut self, err: MoveError) -> Submission {
        if err.is_unknown_entity() {
            tracing::warn!(error = %err, "move references an entity not on the board");
            self.needs_refetch = true;
        } else {
            tracing::info!(error = %err, policy = self.policy.name(), "move rejected");
        }
        Submission::Rejected(err)
    }
}
