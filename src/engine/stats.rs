//! engine::stats
//!
//! Derived board metrics.
//!
//! Metrics are a pure function of a snapshot ([`BoardMetrics::compute`]).
//! The [`StatsAggregator`] subscribes to a store and recomputes on every
//! notification, so the numbers it hands out can never drift from the board.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::core::snapshot::{PipelineSnapshot, Priority};
use crate::core::store::{BoardStore, SubscriptionId};
use crate::core::types::{PaperId, StageId};

/// Paper count for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage_id: StageId,
    pub name: String,
    pub count: usize,
}

/// Metrics for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardMetrics {
    /// Counts in stage display order
    pub per_stage: Vec<StageCount>,
    pub total_papers: usize,
    /// Papers that have a latest score
    pub scored_papers: usize,
    /// Mean of latest scores, `None` when nothing is scored
    pub average_score: Option<f64>,
    pub by_priority: BTreeMap<Priority, usize>,
    /// Per-stage counts sum to the distinct paper total
    pub consistent: bool,
}

impl BoardMetrics {
    /// Compute metrics for `snapshot`.
    pub fn compute(snapshot: &PipelineSnapshot) -> Self {
        let per_stage: Vec<StageCount> = snapshot
            .stages()
            .iter()
            .map(|stage| StageCount {
                stage_id: stage.id.clone(),
                name: stage.name.clone(),
                count: snapshot.stage_len(&stage.id),
            })
            .collect();
        let placed: usize = per_stage.iter().map(|s| s.count).sum();
        let distinct: BTreeSet<&PaperId> = snapshot
            .stages()
            .iter()
            .flat_map(|stage| snapshot.placements(&stage.id))
            .map(|p| &p.paper_id)
            .collect();
        let total_papers = distinct.len();

        let scores: Vec<f64> = snapshot
            .summaries()
            .filter_map(|p| p.latest_score)
            .collect();
        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        let mut by_priority: BTreeMap<Priority, usize> =
            Priority::all().into_iter().map(|p| (p, 0)).collect();
        for paper in snapshot.summaries() {
            *by_priority.entry(paper.priority).or_insert(0) += 1;
        }

        Self {
            per_stage,
            total_papers,
            scored_papers: scores.len(),
            average_score,
            by_priority,
            consistent: placed == total_papers,
        }
    }

    /// Count for one stage, if the stage exists.
    pub fn count_for(&self, stage: &StageId) -> Option<usize> {
        self.per_stage
            .iter()
            .find(|s| &s.stage_id == stage)
            .map(|s| s.count)
    }

    /// One-line human summary.
    pub fn summary_line(&self) -> String {
        let stages = self
            .per_stage
            .iter()
            .map(|s| format!("{} {}", s.name, s.count))
            .collect::<Vec<_>>()
            .join(", ");
        let score = match self.average_score {
            Some(avg) => format!("avg score {:.2} ({} scored)", avg, self.scored_papers),
            None => "no scores".to_string(),
        };
        format!(
            "{} papers across {} stages ({}); {}",
            self.total_papers,
            self.per_stage.len(),
            stages,
            score
        )
    }
}

/// Keeps [`BoardMetrics`] current for a store.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    metrics: Arc<Mutex<BoardMetrics>>,
    subscription: SubscriptionId,
}

impl StatsAggregator {
    /// Compute metrics for the store's snapshot and subscribe for updates.
    pub fn attach(store: &mut BoardStore) -> Self {
        let metrics = Arc::new(Mutex::new(BoardMetrics::compute(store.snapshot())));
        let shared = Arc::clone(&metrics);
        let subscription = store.subscribe(move |_, snapshot| {
            let next = BoardMetrics::compute(snapshot);
            *shared.lock().unwrap_or_else(|e| e.into_inner()) = next;
        });
        Self {
            metrics,
            subscription,
        }
    }

    /// Current metrics.
    pub fn metrics(&self) -> BoardMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stop receiving updates from `store`.
    pub fn detach(self, store: &mut BoardStore) -> bool {
        store.unsubscribe(self.subscription)
    }
}
