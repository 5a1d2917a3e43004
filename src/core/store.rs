//! core::store
//!
//! The single shared mutable holder of a board's current snapshot.
//!
//! # Design
//!
//! [`BoardStore`] owns exactly one [`PipelineSnapshot`] and exposes two
//! mutation paths: [`BoardStore::apply`] for a move intent and
//! [`BoardStore::replace`] for wholesale swaps (initial load, refetch,
//! rollback). Both compute the next snapshot fully before swapping it in, so
//! subscribers never observe a partially applied move.
//!
//! Subscribers are notified synchronously after every successful mutation,
//! in subscription order. They receive the change and a shared borrow of the
//! new snapshot; they cannot mutate the store from inside a notification.

use super::snapshot::{MoveError, MoveIntent, PipelineSnapshot};

/// Handle returned by [`BoardStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Why a snapshot was replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceReason {
    /// First board fetch.
    Initial,
    /// Explicit refetch (conflict recovery or stale view).
    Refetch,
    /// Restoring the pre-intent snapshot after a failed move.
    Rollback,
    /// Folding server-assigned fields into a confirmed move.
    Reconcile,
}

/// The change a subscriber is being told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A move intent was applied.
    Applied(MoveIntent),
    /// The snapshot was swapped.
    Replaced(ReplaceReason),
}

type Listener = Box<dyn FnMut(&StoreChange, &PipelineSnapshot) + Send>;

/// Holder of the current board snapshot.
pub struct BoardStore {
    snapshot: PipelineSnapshot,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    revision: u64,
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("revision", &self.revision)
            .field("papers", &self.snapshot.paper_count())
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}

impl BoardStore {
    /// Create a store holding `snapshot`.
    pub fn new(snapshot: PipelineSnapshot) -> Self {
        Self {
            snapshot,
            listeners: Vec::new(),
            next_subscription: 0,
            revision: 0,
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &PipelineSnapshot {
        &self.snapshot
    }

    /// Number of mutations applied since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a move intent.
    ///
    /// The paper is removed from its origin stage, gaps are closed, and it is
    /// inserted into the destination at the clamped target position.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveError`] if the intent references an unknown paper or
    /// stage. The store is unchanged and no subscriber is notified.
    pub fn apply(&mut self, intent: &MoveIntent) -> Result<&PipelineSnapshot, MoveError> {
        let next = self.snapshot.with_move(intent)?;
        self.snapshot = next;
        self.notify(StoreChange::Applied(intent.clone()));
        Ok(&self.snapshot)
    }

    /// Swap in a new snapshot wholesale.
    pub fn replace(&mut self, snapshot: PipelineSnapshot, reason: ReplaceReason) {
        self.snapshot = snapshot;
        self.notify(StoreChange::Replaced(reason));
    }

    /// Register a listener called after every mutation.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreChange, &PipelineSnapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, change: StoreChange) {
        self.revision += 1;
        for (_, listener) in &mut self.listeners {
            listener(&change, &self.snapshot);
        }
    }
}
