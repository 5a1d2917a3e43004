//! core::snapshot
//!
//! In-memory representation of one pipeline board.
//!
//! # Invariants
//!
//! A [`PipelineSnapshot`] always satisfies:
//!
//! 1. Every paper known to the board appears in exactly one stage.
//! 2. Within a stage, placement positions are the contiguous sequence
//!    `0..n-1` with no duplicates.
//! 3. The stage ids keyed in the placement map equal the ids in `stages`.
//! 4. The board-wide paper count equals the sum of per-stage counts.
//!
//! Snapshots are built from server data with [`PipelineSnapshot::from_parts`],
//! which rejects payloads that violate any of these, and are changed only
//! through [`PipelineSnapshot::with_move`], which returns a new snapshot.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Fingerprint, PaperId, StageId};

/// Errors raised when a snapshot shape violates a board invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("stage '{0}' is declared more than once")]
    DuplicateStage(StageId),

    #[error("placement for paper '{paper}' references unknown stage '{stage}'")]
    UnknownStage { paper: PaperId, stage: StageId },

    #[error("paper '{0}' is placed more than once")]
    DuplicatePaper(PaperId),

    #[error("paper '{0}' has a summary but no placement")]
    Unplaced(PaperId),

    #[error("stage '{stage}' has non-contiguous positions: expected {expected}, found {found}")]
    NonContiguous {
        stage: StageId,
        expected: usize,
        found: usize,
    },

    #[error("placement map and stage list disagree on stage '{0}'")]
    StageSetMismatch(StageId),

    #[error("placement for paper '{paper}' is filed under stage '{filed}' but claims '{claimed}'")]
    MisfiledPlacement {
        paper: PaperId,
        filed: StageId,
        claimed: StageId,
    },

    #[error("paper count mismatch: {per_stage} placed across stages, {distinct} distinct papers")]
    CountMismatch { per_stage: usize, distinct: usize },
}

/// Errors raised when a move cannot be applied to a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("unknown paper '{0}'")]
    UnknownPaper(PaperId),

    #[error("unknown stage '{0}'")]
    UnknownStage(StageId),

    #[error("paper '{paper}' is not in stage '{stage}'")]
    NotInStage { paper: PaperId, stage: StageId },

    #[error("move denied: {0}")]
    Denied(String),
}

impl MoveError {
    /// Whether the error means the intent references an entity the client
    /// view does not know about (a stale view rather than a policy decision).
    pub fn is_unknown_entity(&self) -> bool {
        matches!(
            self,
            MoveError::UnknownPaper(_) | MoveError::UnknownStage(_) | MoveError::NotInStage { .. }
        )
    }
}

/// A pipeline stage (board column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    #[serde(default)]
    pub display_color: String,
    pub order: u32,
}

impl Stage {
    /// Create a stage with a neutral display color.
    pub fn new(id: StageId, name: impl Into<String>, order: u32) -> Self {
        Self {
            id,
            name: name.into(),
            display_color: String::new(),
            order,
        }
    }
}

/// Paper priority, as assigned by the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// All priorities, lowest first.
    pub fn all() -> [Priority; 4] {
        [
            Priority::Low,
            Priority::Normal,
            Priority::High,
            Priority::Urgent,
        ]
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Read-only projection of a paper for display on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSummary {
    pub id: PaperId,
    pub title: String,
    #[serde(default)]
    pub abstract_excerpt: String,
    #[serde(default)]
    pub latest_score: Option<f64>,
    #[serde(default)]
    pub priority: Priority,
}

impl PaperSummary {
    /// Create a summary with only a title.
    pub fn new(id: PaperId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            abstract_excerpt: String::new(),
            latest_score: None,
            priority: Priority::default(),
        }
    }

    /// Set the latest score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.latest_score = Some(score);
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Association of one paper with one stage at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub paper_id: PaperId,
    pub stage_id: StageId,
    pub position: usize,
    /// Server-side revision of this placement, echoed on moves so the server
    /// can detect concurrent edits.
    #[serde(default)]
    pub version: u64,
}

/// A proposed, not-yet-applied move of a paper.
///
/// `target_position` is signed because gesture math can land above the first
/// card; such values clamp to the top of the column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveIntent {
    pub paper_id: PaperId,
    pub from_stage_id: StageId,
    pub to_stage_id: StageId,
    pub target_position: i64,
}

impl MoveIntent {
    pub fn new(paper_id: PaperId, from: StageId, to: StageId, target_position: i64) -> Self {
        Self {
            paper_id,
            from_stage_id: from,
            to_stage_id: to,
            target_position,
        }
    }

    /// Whether the move stays within one stage.
    pub fn is_reorder(&self) -> bool {
        self.from_stage_id == self.to_stage_id
    }
}

/// One board: ordered stages and per-stage ordered placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    stages: Vec<Stage>,
    placements_by_stage: BTreeMap<StageId, Vec<Placement>>,
    papers: BTreeMap<PaperId, PaperSummary>,
}

impl PipelineSnapshot {
    /// Build a snapshot from server-shaped parts.
    ///
    /// Stages are ordered by `order` (ties broken by id), placements are
    /// grouped by stage and ordered by position. The result is checked
    /// against every board invariant.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] describing the first violated invariant.
    pub fn from_parts(
        mut stages: Vec<Stage>,
        placements: Vec<Placement>,
        papers: Vec<PaperSummary>,
    ) -> Result<Self, SnapshotError> {
        stages.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let mut placements_by_stage: BTreeMap<StageId, Vec<Placement>> = BTreeMap::new();
        for stage in &stages {
            if placements_by_stage
                .insert(stage.id.clone(), Vec::new())
                .is_some()
            {
                return Err(SnapshotError::DuplicateStage(stage.id.clone()));
            }
        }

        for placement in placements {
            let column = placements_by_stage
                .get_mut(&placement.stage_id)
                .ok_or_else(|| SnapshotError::UnknownStage {
                    paper: placement.paper_id.clone(),
                    stage: placement.stage_id.clone(),
                })?;
            column.push(placement);
        }
        for column in placements_by_stage.values_mut() {
            column.sort_by_key(|p| p.position);
        }

        let papers = papers.into_iter().map(|p| (p.id.clone(), p)).collect();

        let snapshot = Self {
            stages,
            placements_by_stage,
            papers,
        };
        snapshot.check_invariants()?;
        Ok(snapshot)
    }

    /// Build a snapshot from ordered columns of papers.
    ///
    /// Positions and stage order are taken from the order of the input.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] if a stage or paper repeats.
    pub fn from_columns(columns: Vec<(Stage, Vec<PaperSummary>)>) -> Result<Self, SnapshotError> {
        let mut stages = Vec::with_capacity(columns.len());
        let mut placements = Vec::new();
        let mut papers = Vec::new();
        for (order, (mut stage, column)) in columns.into_iter().enumerate() {
            stage.order = order as u32;
            for (position, paper) in column.into_iter().enumerate() {
                placements.push(Placement {
                    paper_id: paper.id.clone(),
                    stage_id: stage.id.clone(),
                    position,
                    version: 0,
                });
                papers.push(paper);
            }
            stages.push(stage);
        }
        Self::from_parts(stages, placements, papers)
    }

    /// Verify every board invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), SnapshotError> {
        let declared: BTreeSet<&StageId> = self.stages.iter().map(|s| &s.id).collect();
        if declared.len() != self.stages.len() {
            let mut seen = BTreeSet::new();
            for stage in &self.stages {
                if !seen.insert(&stage.id) {
                    return Err(SnapshotError::DuplicateStage(stage.id.clone()));
                }
            }
        }
        for id in self.placements_by_stage.keys() {
            if !declared.contains(id) {
                return Err(SnapshotError::StageSetMismatch(id.clone()));
            }
        }
        for id in &declared {
            if !self.placements_by_stage.contains_key(*id) {
                return Err(SnapshotError::StageSetMismatch((*id).clone()));
            }
        }

        let mut placed: BTreeSet<&PaperId> = BTreeSet::new();
        let mut per_stage = 0;
        for (stage_id, column) in &self.placements_by_stage {
            for (expected, placement) in column.iter().enumerate() {
                if &placement.stage_id != stage_id {
                    return Err(SnapshotError::MisfiledPlacement {
                        paper: placement.paper_id.clone(),
                        filed: stage_id.clone(),
                        claimed: placement.stage_id.clone(),
                    });
                }
                if placement.position != expected {
                    return Err(SnapshotError::NonContiguous {
                        stage: stage_id.clone(),
                        expected,
                        found: placement.position,
                    });
                }
                if !placed.insert(&placement.paper_id) {
                    return Err(SnapshotError::DuplicatePaper(placement.paper_id.clone()));
                }
            }
            per_stage += column.len();
        }

        for id in self.papers.keys() {
            if !placed.contains(id) {
                return Err(SnapshotError::Unplaced(id.clone()));
            }
        }

        if per_stage != placed.len() {
            return Err(SnapshotError::CountMismatch {
                per_stage,
                distinct: placed.len(),
            });
        }
        Ok(())
    }

    /// Stages in board order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Look up a stage by id.
    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| &s.id == id)
    }

    /// Whether the board declares this stage.
    pub fn has_stage(&self, id: &StageId) -> bool {
        self.placements_by_stage.contains_key(id)
    }

    /// Placements of a stage, top to bottom. Empty for unknown stages.
    pub fn placements(&self, stage: &StageId) -> &[Placement] {
        self.placements_by_stage
            .get(stage)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Paper ids of a stage, top to bottom.
    pub fn column(&self, stage: &StageId) -> Vec<&PaperId> {
        self.placements(stage).iter().map(|p| &p.paper_id).collect()
    }

    /// Find the placement of a paper.
    pub fn locate(&self, paper: &PaperId) -> Option<&Placement> {
        self.placements_by_stage
            .values()
            .flat_map(|column| column.iter())
            .find(|p| &p.paper_id == paper)
    }

    /// Whether the paper is on the board.
    pub fn contains_paper(&self, paper: &PaperId) -> bool {
        self.locate(paper).is_some()
    }

    /// Display summary for a paper, if the server sent one.
    pub fn summary(&self, paper: &PaperId) -> Option<&PaperSummary> {
        self.papers.get(paper)
    }

    /// All paper summaries, ordered by id.
    pub fn summaries(&self) -> impl Iterator<Item = &PaperSummary> {
        self.papers.values()
    }

    /// Number of placements in a stage.
    pub fn stage_len(&self, stage: &StageId) -> usize {
        self.placements(stage).len()
    }

    /// Total number of placed papers.
    pub fn paper_count(&self) -> usize {
        self.placements_by_stage.values().map(Vec::len).sum()
    }

    /// Deterministic fingerprint over stage order and column contents.
    ///
    /// Placement versions are excluded: a version bump without a layout
    /// change is not a divergence the user can see.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut tokens = Vec::with_capacity(self.stages.len() + self.paper_count() * 2);
        for stage in &self.stages {
            tokens.push(format!("stage:{}", stage.id));
            for placement in self.placements(&stage.id) {
                tokens.push(format!("paper:{}", placement.paper_id));
            }
        }
        Fingerprint::compute(tokens)
    }

    /// Compute the snapshot that results from applying `intent`.
    ///
    /// The paper is removed from its origin stage, the origin stage is
    /// re-indexed to close the gap, and the paper is inserted into the
    /// destination at `target_position` clamped to `[0, len]`, after which the
    /// destination is re-indexed. `self` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveError`] if the paper or either stage is unknown, or if
    /// the paper is not in the intent's origin stage.
    pub fn with_move(&self, intent: &MoveIntent) -> Result<PipelineSnapshot, MoveError> {
        let mut next = self.clone();
        next.move_in_place(intent)?;
        Ok(next)
    }

    fn move_in_place(&mut self, intent: &MoveIntent) -> Result<(), MoveError> {
        if !self.has_stage(&intent.to_stage_id) {
            return Err(MoveError::UnknownStage(intent.to_stage_id.clone()));
        }
        let origin = self
            .placements_by_stage
            .get_mut(&intent.from_stage_id)
            .ok_or_else(|| MoveError::UnknownStage(intent.from_stage_id.clone()))?;

        let Some(index) = origin.iter().position(|p| p.paper_id == intent.paper_id) else {
            return Err(if self.contains_paper(&intent.paper_id) {
                MoveError::NotInStage {
                    paper: intent.paper_id.clone(),
                    stage: intent.from_stage_id.clone(),
                }
            } else {
                MoveError::UnknownPaper(intent.paper_id.clone())
            });
        };

        let mut moving = origin.remove(index);
        reindex(origin);

        let destination = self
            .placements_by_stage
            .get_mut(&intent.to_stage_id)
            .ok_or_else(|| MoveError::UnknownStage(intent.to_stage_id.clone()))?;
        let at = clamp_position(intent.target_position, destination.len());
        moving.stage_id = intent.to_stage_id.clone();
        destination.insert(at, moving);
        reindex(destination);
        Ok(())
    }

    /// Overwrite the server-owned fields of one placement.
    ///
    /// Used to reconcile a confirmed move: the placement's version is taken
    /// from the server and, when the server assigned a canonical position in
    /// the same stage, the paper is moved there.
    pub(crate) fn reconcile_placement(
        &self,
        paper: &PaperId,
        stage: &StageId,
        position: Option<usize>,
        version: Option<u64>,
    ) -> Option<PipelineSnapshot> {
        let current = self.locate(paper)?;
        if &current.stage_id != stage {
            return None;
        }
        let mut next = match position {
            Some(position) if position != current.position => {
                let intent = MoveIntent::new(
                    paper.clone(),
                    stage.clone(),
                    stage.clone(),
                    position as i64,
                );
                self.with_move(&intent).ok()?
            }
            _ => self.clone(),
        };
        if let Some(version) = version {
            let column = next.placements_by_stage.get_mut(stage)?;
            if let Some(placement) = column.iter_mut().find(|p| &p.paper_id == paper) {
                placement.version = version;
            }
        }
        Some(next)
    }
}

/// Clamp a signed target position to an insertion index in `[0, len]`.
pub fn clamp_position(target: i64, len: usize) -> usize {
    if target <= 0 {
        0
    } else {
        (target as u64).min(len as u64) as usize
    }
}

fn reindex(column: &mut [Placement]) {
    for (position, placement) in column.iter_mut().enumerate() {
        placement.position = position;
    }
}
