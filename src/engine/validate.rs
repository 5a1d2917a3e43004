//! engine::validate
//!
//! Gatekeeping for move intents before they reach the store.
//!
//! # Architecture
//!
//! Validation is split into mechanism and policy. The mechanism in
//! [`validate`] checks that the intent refers to entities present in the
//! snapshot and normalizes the target position. The policy, a
//! [`MovePolicy`], decides which stage transitions a board allows. The
//! baseline policy is [`PermissivePolicy`]: any paper may move to any
//! stage, including a reorder within its own stage.
//!
//! # Invariants
//!
//! - A [`ValidatedMove`] always refers to a paper present in its origin stage
//!   and to a destination stage present in the snapshot it was checked
//!   against.
//! - Its target position is already clamped to the destination's valid
//!   insertion range, so applying it can never fail on that snapshot.
//! - Validation never mutates anything.
//!
//! # Example
//!
//! ```ignore
//! use paperboard::engine::validate::{validate, PermissivePolicy};
//!
//! match validate(store.snapshot(), &intent, &PermissivePolicy) {
//!     Ok(validated) if validated.is_noop() => { /* card springs back */ }
//!     Ok(validated) => coordinator.begin(&mut store, validated),
//!     Err(e) => tracing::warn!(error = %e, "move rejected"),
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::core::snapshot::{clamp_position, MoveError, MoveIntent, PipelineSnapshot};
use crate::core::types::StageId;

/// A board's rule set for stage transitions.
pub trait MovePolicy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decide whether `intent` is allowed on `snapshot`.
    ///
    /// Called only after the intent's entities are known to exist.
    /// Returns a human-readable reason on denial.
    fn check(&self, snapshot: &PipelineSnapshot, intent: &MoveIntent) -> Result<(), String>;
}

/// Any paper may move to any stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissivePolicy;

impl MovePolicy for PermissivePolicy {
    fn name(&self) -> &'static str {
        "permissive"
    }

    fn check(&self, _snapshot: &PipelineSnapshot, _intent: &MoveIntent) -> Result<(), String> {
        Ok(())
    }
}

/// Only listed stage transitions are allowed; reorders within a stage always are.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    allowed: BTreeMap<StageId, BTreeSet<StageId>>,
}

impl TransitionTable {
    /// Create an empty table (only reorders allowed).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow moves from `from` to `to`.
    pub fn allow(mut self, from: StageId, to: StageId) -> Self {
        self.allowed.entry(from).or_default().insert(to);
        self
    }
}

impl MovePolicy for TransitionTable {
    fn name(&self) -> &'static str {
        "transition-table"
    }

    fn check(&self, _snapshot: &PipelineSnapshot, intent: &MoveIntent) -> Result<(), String> {
        if intent.is_reorder() {
            return Ok(());
        }
        let permitted = self
            .allowed
            .get(&intent.from_stage_id)
            .is_some_and(|targets| targets.contains(&intent.to_stage_id));
        if permitted {
            Ok(())
        } else {
            Err(format!(
                "moving from '{}' to '{}' is not allowed on this board",
                intent.from_stage_id, intent.to_stage_id
            ))
        }
    }
}

/// A move intent that passed validation against a specific snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMove {
    intent: MoveIntent,
    origin_position: usize,
}

impl ValidatedMove {
    /// The normalized intent, with an in-range target position.
    pub fn intent(&self) -> &MoveIntent {
        &self.intent
    }

    /// Consume into the normalized intent.
    pub fn into_intent(self) -> MoveIntent {
        self.intent
    }

    /// Position the paper held before the move.
    pub fn origin_position(&self) -> usize {
        self.origin_position
    }

    /// Target position after clamping.
    pub fn target_position(&self) -> usize {
        self.intent.target_position as usize
    }

    /// Whether applying this move would leave the board unchanged.
    pub fn is_noop(&self) -> bool {
        self.intent.is_reorder() && self.target_position() == self.origin_position
    }
}

/// Validate `intent` against `snapshot` under `policy`.
///
/// Negative target positions clamp to the top of the destination column and
/// positions past its end clamp to append-at-end. For a reorder the column
/// is one shorter once the paper is lifted out, which the clamp accounts for.
///
/// # Errors
///
/// - [`MoveError::UnknownPaper`] / [`MoveError::UnknownStage`] /
///   [`MoveError::NotInStage`] when the intent references entities the
///   snapshot does not hold (a stale client view).
/// - [`MoveError::Denied`] when the policy refuses the transition.
pub fn validate(
    snapshot: &PipelineSnapshot,
    intent: &MoveIntent,
    policy: &dyn MovePolicy,
) -> Result<ValidatedMove, MoveError> {
    if !snapshot.has_stage(&intent.from_stage_id) {
        return Err(MoveError::UnknownStage(intent.from_stage_id.clone()));
    }
    if !snapshot.has_stage(&intent.to_stage_id) {
        return Err(MoveError::UnknownStage(intent.to_stage_id.clone()));
    }
    let placement = snapshot
        .locate(&intent.paper_id)
        .ok_or_else(|| MoveError::UnknownPaper(intent.paper_id.clone()))?;
    if placement.stage_id != intent.from_stage_id {
        return Err(MoveError::NotInStage {
            paper: intent.paper_id.clone(),
            stage: intent.from_stage_id.clone(),
        });
    }

    policy.check(snapshot, intent).map_err(MoveError::Denied)?;

    let mut room = snapshot.stage_len(&intent.to_stage_id);
    if intent.is_reorder() {
        room -= 1;
    }
    let target = clamp_position(intent.target_position, room);

    Ok(ValidatedMove {
        intent: MoveIntent {
            target_position: target as i64,
            ..intent.clone()
        },
        origin_position: placement.position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::{PaperSummary, Stage};
    use crate::core::types::PaperId;

    fn pid(s: &str) -> PaperId {
        PaperId::new(s).unwrap()
    }

    fn sid(s: &str) -> StageId {
        StageId::new(s).unwrap()
    }

    fn board() -> PipelineSnapshot {
        PipelineSnapshot::from_columns(vec![
            (
                Stage::new(sid("inbox"), "Inbox", 0),
                vec![
                    PaperSummary::new(pid("A"), "A"),
                    PaperSummary::new(pid("B"), "B"),
                    PaperSummary::new(pid("C"), "C"),
                ],
            ),
            (
                Stage::new(sid("screening"), "Screening", 1),
                vec![PaperSummary::new(pid("D"), "D")],
            ),
            (Stage::new(sid("archived"), "Archived", 2), vec![]),
        ])
        .unwrap()
    }

    mod permissive {
        use super::*;

        #[test]
        fn cross_stage_move_accepted() {
            let intent = MoveIntent::new(pid("B"), sid("inbox"), sid("screening"), 0);
            let validated = validate(&board(), &intent, &PermissivePolicy).unwrap();
            assert_eq!(validated.intent(), &intent);
            assert_eq!(validated.origin_position(), 1);
            assert!(!validated.is_noop());
        }

        #[test]
        fn past_end_clamps_to_append() {
            let intent = MoveIntent::new(pid("A"), sid("inbox"), sid("screening"), 50);
            let validated = validate(&board(), &intent, &PermissivePolicy).unwrap();
            assert_eq!(validated.target_position(), 1);
        }

        #[test]
        fn reorder_past_end_clamps_to_last_slot() {
            let intent = MoveIntent::new(pid("A"), sid("inbox"), sid("inbox"), 3);
            let validated = validate(&board(), &intent, &PermissivePolicy).unwrap();
            assert_eq!(validated.target_position(), 2);
        }

        #[test]
        fn negative_clamps_to_top() {
            let intent = MoveIntent::new(pid("A"), sid("inbox"), sid("archived"), -3);
            let validated = validate(&board(), &intent, &PermissivePolicy).unwrap();
            assert_eq!(validated.target_position(), 0);
        }

        #[test]
        fn drop_in_place_is_noop() {
            let intent = MoveIntent::new(pid("B"), sid("inbox"), sid("inbox"), 1);
            let validated = validate(&board(), &intent, &PermissivePolicy).unwrap();
            assert!(validated.is_noop());
        }

        #[test]
        fn unknown_paper_rejected() {
            let intent = MoveIntent::new(pid("Z"), sid("inbox"), sid("screening"), 0);
            let err = validate(&board(), &intent, &PermissivePolicy).unwrap_err();
            assert_eq!(err, MoveError::UnknownPaper(pid("Z")));
        }

        #[test]
        fn unknown_stage_rejected() {
            let intent = MoveIntent::new(pid("A"), sid("inbox"), sid("outreach"), 0);
            let err = validate(&board(), &intent, &PermissivePolicy).unwrap_err();
            assert!(err.is_unknown_entity());
        }

        #[test]
        fn stale_origin_rejected() {
            let intent = MoveIntent::new(pid("D"), sid("inbox"), sid("archived"), 0);
            let err = validate(&board(), &intent, &PermissivePolicy).unwrap_err();
            assert!(matches!(err, MoveError::NotInStage { .. }));
        }
    }

    mod transition_table {
        use super::*;

        fn table() -> TransitionTable {
            TransitionTable::new().allow(sid("inbox"), sid("screening"))
        }

        #[test]
        fn listed_transition_allowed() {
            let intent = MoveIntent::new(pid("A"), sid("inbox"), sid("screening"), 0);
            assert!(validate(&board(), &intent, &table()).is_ok());
        }

        #[test]
        fn unlisted_transition_denied() {
            let intent = MoveIntent::new(pid("A"), sid("inbox"), sid("archived"), 0);
            let err = validate(&board(), &intent, &table()).unwrap_err();
            assert!(matches!(err, MoveError::Denied(_)));
            assert!(!err.is_unknown_entity());
        }

        #[test]
        fn reorder_always_allowed() {
            let intent = MoveIntent::new(pid("C"), sid("inbox"), sid("inbox"), 0);
            assert!(validate(&board(), &intent, &TransitionTable::new()).is_ok());
        }
    }
}
