//! End-to-end board scenarios against the in-memory server.
//!
//! These tests drive a [`Board`] the way a front end would: drag gestures
//! resolve to intents, intents are applied optimistically and persisted, and
//! server failures are rolled back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use paperboard::core::snapshot::{MoveError, MoveIntent, PaperSummary, PipelineSnapshot, Stage};
use paperboard::core::store::{ReplaceReason, StoreChange};
use paperboard::core::types::{PaperId, ProjectId, StageId};
use paperboard::engine::geometry::{Point, Rect};
use paperboard::engine::{
    Board, BoardOptions, DragEvent, DragKey, DragTrigger, DropTarget, FailureKind, GestureUpdate,
    MoveOutcome, Settlement, Submission, Ticket, TransitionTable,
};
use paperboard::sync::mock::{MockBoardSync, MockOperation};
use paperboard::sync::{ServerPlacement, SyncError};

fn pid(s: &str) -> PaperId {
    PaperId::new(s).unwrap()
}

fn sid(s: &str) -> StageId {
    StageId::new(s).unwrap()
}

fn column(board: &Board, stage: &str) -> Vec<String> {
    board
        .snapshot()
        .column(&sid(stage))
        .into_iter()
        .map(|p| p.to_string())
        .collect()
}

/// Inbox [A, B, C], Screening [], Evaluation [].
fn reading_list() -> PipelineSnapshot {
    PipelineSnapshot::from_columns(vec![
        (
            Stage::new(sid("inbox"), "Inbox", 0),
            vec![
                PaperSummary::new(pid("A"), "Attention Is All You Need").with_score(8.0),
                PaperSummary::new(pid("B"), "BERT"),
                PaperSummary::new(pid("C"), "CLIP").with_score(6.0),
            ],
        ),
        (Stage::new(sid("screening"), "Screening", 1), vec![]),
        (Stage::new(sid("evaluation"), "Evaluation", 2), vec![]),
    ])
    .unwrap()
}

fn setup() -> (Board, MockBoardSync) {
    let sync = MockBoardSync::with_board(reading_list());
    let board = Board::new(
        ProjectId::new("lab").unwrap(),
        Arc::new(sync.clone()),
        reading_list(),
        BoardOptions {
            timeout: Duration::from_secs(2),
            ..Default::default()
        },
    );
    (board, sync)
}

fn intent(paper: &str, from: &str, to: &str, position: i64) -> MoveIntent {
    MoveIntent::new(pid(paper), sid(from), sid(to), position)
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn move_to_another_stage() {
        let (mut board, sync) = setup();

        let outcome = board
            .move_paper(intent("B", "inbox", "screening", 0))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MoveOutcome::Settled(Settlement::Confirmed { .. })
        ));
        assert_eq!(column(&board, "inbox"), ["A", "C"]);
        assert_eq!(column(&board, "screening"), ["B"]);
        assert_eq!(sync.board().unwrap(), board.snapshot().clone());
    }

    #[tokio::test]
    async fn reorder_within_stage() {
        let (mut board, _sync) = setup();

        board
            .move_paper(intent("A", "inbox", "inbox", 2))
            .await
            .unwrap();

        assert_eq!(column(&board, "inbox"), ["B", "C", "A"]);
    }

    #[tokio::test]
    async fn network_failure_reverts_and_notifies_once() {
        let (mut board, sync) = setup();
        sync.fail_next_move(SyncError::Network("connection reset".into()));
        let before = board.snapshot().clone();

        let outcome = board
            .move_paper(intent("B", "inbox", "screening", 0))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MoveOutcome::Settled(Settlement::RolledBack { .. })
        ));
        assert_eq!(board.snapshot(), &before);
        assert_eq!(column(&board, "inbox"), ["A", "B", "C"]);
        assert!(column(&board, "screening").is_empty());

        let notices = board.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, FailureKind::Network);
        assert!(board.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn unknown_paper_is_rejected_without_network() {
        let (mut board, sync) = setup();
        let before = board.snapshot().clone();
        let revision = board.revision();

        let submission = board.submit(&intent("Z", "inbox", "screening", 0));

        assert_eq!(
            submission,
            Submission::Rejected(MoveError::UnknownPaper(pid("Z")))
        );
        assert_eq!(board.snapshot(), &before);
        assert_eq!(board.revision(), revision);
        assert_eq!(sync.move_count(), 0);
        assert!(board.needs_refetch());
    }

    #[tokio::test]
    async fn stats_follow_the_move() {
        let (mut board, _sync) = setup();

        board
            .move_paper(intent("B", "inbox", "screening", 0))
            .await
            .unwrap();

        let metrics = board.metrics();
        assert_eq!(metrics.count_for(&sid("inbox")), Some(2));
        assert_eq!(metrics.count_for(&sid("screening")), Some(1));
        assert_eq!(metrics.total_papers, 3);
        assert!(metrics.consistent);
    }
}

/// Two moves of the same paper in quick succession.
mod same_paper {
    use super::*;

    fn sent_versions(sync: &MockBoardSync) -> Vec<u64> {
        sync.operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::MovePaper(request) => Some(request.expected_version),
                _ => None,
            })
            .collect()
    }

    /// Submit B to Screening, then B to Evaluation while the first is unsent.
    fn submit_both(board: &mut Board) -> Ticket {
        let Submission::Started(first) = board.submit(&intent("B", "inbox", "screening", 0)) else {
            panic!("first move not started");
        };
        assert_eq!(
            board.submit(&intent("B", "screening", "evaluation", 0)),
            Submission::Held { paper_id: pid("B") }
        );
        first
    }

    #[tokio::test]
    async fn second_move_waits_for_first_and_both_land() {
        let (mut board, sync) = setup();
        let first = submit_both(&mut board);
        assert_eq!(column(&board, "evaluation"), ["B"]);

        let result = board.persistence(&first).await;
        let settled = board.complete(first.clone(), result);
        let next = match settled {
            Settlement::Released { next, .. } => next,
            other => panic!("expected the held move to be released, got {:?}", other),
        };
        assert_eq!(next.request().expected_version, 1);
        assert_eq!(column(&board, "evaluation"), ["B"]);

        let result = board.persistence(&next).await;
        assert!(matches!(
            board.complete(next, result),
            Settlement::Confirmed { .. }
        ));

        assert_eq!(column(&board, "inbox"), ["A", "C"]);
        assert!(column(&board, "screening").is_empty());
        assert_eq!(column(&board, "evaluation"), ["B"]);
        assert_eq!(sync.board().unwrap(), board.snapshot().clone());
        assert_eq!(sent_versions(&sync), [0, 1]);
        assert!(board.drain_notices().is_empty());

        // a late duplicate of the first response changes nothing
        let revision = board.revision();
        let late = board.complete(first, Err(SyncError::Network("late".into())));
        assert!(matches!(late, Settlement::Stale { .. }));
        assert_eq!(board.revision(), revision);
        assert!(board.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn second_move_submitted_while_first_is_in_flight() {
        let sync = MockBoardSync::with_board(reading_list()).delay_moves(Duration::from_millis(30));
        let mut board = Board::new(
            ProjectId::new("lab").unwrap(),
            Arc::new(sync.clone()),
            reading_list(),
            BoardOptions::default(),
        );

        let Submission::Started(first) = board.submit(&intent("B", "inbox", "screening", 0)) else {
            panic!("first move not started");
        };
        let in_flight = tokio::spawn(board.persistence(&first));
        tokio::task::yield_now().await;
        assert!(matches!(
            board.submit(&intent("B", "screening", "evaluation", 0)),
            Submission::Held { .. }
        ));

        let result = in_flight.await.unwrap();
        assert_eq!(sync.move_count(), 1);
        let Settlement::Released { next, .. } = board.complete(first, result) else {
            panic!("held move not released");
        };
        let result = board.persistence(&next).await;
        board.complete(next, result);

        assert_eq!(column(&board, "evaluation"), ["B"]);
        assert_eq!(sync.board().unwrap(), board.snapshot().clone());
        assert_eq!(sent_versions(&sync), [0, 1]);
    }

    #[tokio::test]
    async fn move_after_settled_move_is_sent_directly() {
        let (mut board, sync) = setup();
        board
            .move_paper(intent("B", "inbox", "screening", 0))
            .await
            .unwrap();

        let Submission::Started(second) =
            board.submit(&intent("B", "screening", "evaluation", 0))
        else {
            panic!("second move not started");
        };
        assert_eq!(second.request().expected_version, 1);
        let result = board.persistence(&second).await;
        assert!(matches!(
            board.complete(second, result),
            Settlement::Confirmed { .. }
        ));
        assert_eq!(sync.board().unwrap(), board.snapshot().clone());
    }

    #[tokio::test]
    async fn first_failure_undoes_both_moves() {
        let (mut board, sync) = setup();
        sync.fail_next_move(SyncError::Network("connection reset".into()));
        let first = submit_both(&mut board);

        let result = board.persistence(&first).await;
        let settled = board.complete(first, result);

        assert!(settled.is_rolled_back());
        assert_eq!(board.snapshot(), &reading_list());
        assert_eq!(sync.board().unwrap(), board.snapshot().clone());
        assert_eq!(board.pending_count(), 0);
        assert_eq!(sync.move_count(), 1);
        assert!(!board.needs_refetch());
        assert_eq!(board.drain_notices().len(), 1);
    }

    #[tokio::test]
    async fn released_failure_returns_to_server_state() {
        let (mut board, sync) = setup();
        let first = submit_both(&mut board);

        let result = board.persistence(&first).await;
        let Settlement::Released { next, .. } = board.complete(first, result) else {
            panic!("held move not released");
        };
        sync.fail_next_move(SyncError::Network("connection reset".into()));
        let result = board.persistence(&next).await;
        assert!(board.complete(next, result).is_rolled_back());

        assert_eq!(column(&board, "screening"), ["B"]);
        assert!(column(&board, "evaluation").is_empty());
        assert_eq!(sync.board().unwrap(), board.snapshot().clone());
        assert_eq!(board.drain_notices().len(), 1);
    }

    #[tokio::test]
    async fn conflict_on_first_drops_held_move_and_refetches() {
        let (mut board, sync) = setup();
        let first = submit_both(&mut board);
        let edited = reading_list()
            .with_move(&intent("B", "inbox", "evaluation", 0))
            .unwrap();
        sync.set_board(edited.clone());
        sync.fail_next_move(SyncError::Conflict("paper 'B' was moved by someone else".into()));

        let result = board.persistence(&first).await;
        let settled = board.complete(first, result);
        assert!(settled.refetch_required());
        assert!(board.needs_refetch());
        assert_eq!(board.snapshot(), &reading_list());

        board.refetch().await.unwrap();
        assert_eq!(board.snapshot(), &edited);
        assert_eq!(board.pending_count(), 0);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn conflict_rolls_back_then_refetches() {
        let (mut board, sync) = setup();
        // Someone else already moved C to Evaluation.
        let server_view = reading_list()
            .with_move(&intent("C", "inbox", "evaluation", 0))
            .unwrap();
        sync.set_board(server_view.clone());
        sync.fail_next_move(SyncError::Conflict("placement changed".into()));

        let outcome = board
            .move_paper(intent("B", "inbox", "screening", 0))
            .await
            .unwrap();

        match outcome {
            MoveOutcome::Settled(Settlement::RolledBack {
                notice,
                refetch_required,
            }) => {
                assert!(refetch_required);
                assert_eq!(notice.kind, FailureKind::Conflict);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!board.needs_refetch());
        assert_eq!(board.snapshot(), &server_view);
        assert_eq!(column(&board, "evaluation"), ["C"]);
        assert!(sync
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::FetchBoard { .. })));
    }

    #[tokio::test]
    async fn slow_server_times_out_and_rolls_back() {
        let sync = MockBoardSync::with_board(reading_list()).delay_moves(Duration::from_secs(5));
        let mut board = Board::new(
            ProjectId::new("lab").unwrap(),
            Arc::new(sync.clone()),
            reading_list(),
            BoardOptions {
                timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let outcome = board
            .move_paper(intent("A", "inbox", "evaluation", 0))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MoveOutcome::Settled(Settlement::RolledBack { .. })
        ));
        assert_eq!(board.snapshot(), &reading_list());
        let notices = board.drain_notices();
        assert_eq!(notices[0].kind, FailureKind::Timeout);
        assert!(notices[0].retryable);
    }

    #[tokio::test]
    async fn failure_between_two_moves_keeps_the_other() {
        let (mut board, _sync) = setup();

        let Submission::Started(b) = board.submit(&intent("B", "inbox", "screening", 0)) else {
            panic!("B not started");
        };
        let Submission::Started(c) = board.submit(&intent("C", "inbox", "evaluation", 0)) else {
            panic!("C not started");
        };

        let rolled = board.complete(b, Err(SyncError::Network("down".into())));
        assert!(rolled.is_rolled_back());
        assert_eq!(column(&board, "inbox"), ["A", "B"]);
        assert_eq!(column(&board, "evaluation"), ["C"]);

        let confirmed = board.complete(
            c,
            Ok(ServerPlacement {
                paper_id: pid("C"),
                stage_id: sid("evaluation"),
                position: Some(0),
                version: Some(1),
            }),
        );
        assert!(matches!(confirmed, Settlement::Confirmed { .. }));
        assert_eq!(column(&board, "evaluation"), ["C"]);
    }

    #[tokio::test]
    async fn policy_denial_leaves_board_alone() {
        let (board, sync) = setup();
        let mut board = board.with_policy(
            TransitionTable::new()
                .allow(sid("inbox"), sid("screening"))
                .allow(sid("screening"), sid("evaluation")),
        );

        let outcome = board
            .move_paper(intent("A", "inbox", "evaluation", 0))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(MoveError::Denied(_))
        ));
        assert_eq!(board.snapshot(), &reading_list());
        assert_eq!(sync.move_count(), 0);
    }
}

mod gestures {
    use super::*;

    /// Columns 100px wide with 200px gutters; cards 40px tall, 10px apart.
    fn layout(board: &Board) -> Vec<DropTarget> {
        let mut targets = Vec::new();
        for (i, stage) in board.snapshot().stages().iter().enumerate() {
            let x = i as f64 * 200.0;
            targets.push(DropTarget::stage(
                stage.id.clone(),
                Rect::new(x, 0.0, 100.0, 400.0),
            ));
            for placement in board.snapshot().placements(&stage.id) {
                let y = 10.0 + placement.position as f64 * 50.0;
                targets.push(DropTarget::placement(
                    stage.id.clone(),
                    placement.paper_id.clone(),
                    placement.position,
                    Rect::new(x + 10.0, y, 80.0, 40.0),
                ));
            }
        }
        targets
    }

    #[tokio::test]
    async fn pointer_drag_to_empty_column_moves_paper() {
        let (mut board, _sync) = setup();
        let targets = layout(&board);
        board.set_drop_targets(targets);

        assert_eq!(
            board.begin_drag(&pid("B"), DragTrigger::Pointer(Point::new(50.0, 80.0))),
            GestureUpdate::Pending
        );
        assert_eq!(
            board.handle_drag(DragEvent::PointerMove(Point::new(150.0, 80.0))),
            GestureUpdate::Started
        );
        board.handle_drag(DragEvent::PointerMove(Point::new(250.0, 80.0)));
        assert_eq!(
            board.gesture().hovered().map(|t| t.stage_id.clone()),
            Some(sid("screening"))
        );
        assert_eq!(
            board.handle_drag(DragEvent::PointerUp(Point::new(250.0, 80.0))),
            GestureUpdate::Released
        );

        let intent = board.finish_drag().expect("drop should resolve");
        assert_eq!(intent.to_stage_id, sid("screening"));
        assert_eq!(intent.target_position, 0);

        board.move_paper(intent).await.unwrap();
        assert_eq!(column(&board, "inbox"), ["A", "C"]);
        assert_eq!(column(&board, "screening"), ["B"]);
    }

    #[tokio::test]
    async fn dropping_on_a_card_reorders() {
        let (mut board, _sync) = setup();
        let targets = layout(&board);
        board.set_drop_targets(targets);

        board.begin_drag(&pid("A"), DragTrigger::Pointer(Point::new(50.0, 30.0)));
        board.handle_drag(DragEvent::PointerMove(Point::new(50.0, 130.0)));
        board.handle_drag(DragEvent::PointerUp(Point::new(50.0, 130.0)));

        let intent = board.finish_drag().expect("drop should resolve");
        assert!(intent.is_reorder());
        board.move_paper(intent).await.unwrap();
        assert_eq!(column(&board, "inbox"), ["B", "C", "A"]);
    }

    #[test]
    fn release_outside_targets_emits_nothing() {
        let (mut board, sync) = setup();
        let targets = layout(&board);
        board.set_drop_targets(targets);
        let revision = board.revision();

        board.begin_drag(&pid("B"), DragTrigger::Pointer(Point::new(50.0, 80.0)));
        board.handle_drag(DragEvent::PointerMove(Point::new(50.0, 700.0)));
        assert_eq!(
            board.handle_drag(DragEvent::PointerUp(Point::new(50.0, 700.0))),
            GestureUpdate::Released
        );

        assert_eq!(board.finish_drag(), None);
        assert_eq!(board.revision(), revision);
        assert_eq!(sync.move_count(), 0);
    }

    #[test]
    fn short_drag_never_activates() {
        let (mut board, _sync) = setup();
        let targets = layout(&board);
        board.set_drop_targets(targets);

        board.begin_drag(&pid("B"), DragTrigger::Pointer(Point::new(50.0, 80.0)));
        assert_eq!(
            board.handle_drag(DragEvent::PointerMove(Point::new(53.0, 80.0))),
            GestureUpdate::Pending
        );
        assert_eq!(
            board.handle_drag(DragEvent::PointerUp(Point::new(53.0, 80.0))),
            GestureUpdate::Dismissed
        );
        assert_eq!(board.finish_drag(), None);
    }

    #[tokio::test]
    async fn keyboard_drag_moves_right_one_column() {
        let (mut board, _sync) = setup();
        let targets = layout(&board);
        board.set_drop_targets(targets);

        assert_eq!(
            board.begin_drag(&pid("C"), DragTrigger::Keyboard),
            GestureUpdate::Started
        );
        for _ in 0..8 {
            board.handle_drag(DragEvent::Key(DragKey::Right));
        }
        board.handle_drag(DragEvent::Key(DragKey::Enter));

        let intent = board.finish_drag().expect("drop should resolve");
        assert_eq!(intent.to_stage_id, sid("screening"));
        board.move_paper(intent).await.unwrap();
        assert_eq!(column(&board, "screening"), ["C"]);
    }

    #[test]
    fn escape_cancels_without_intent() {
        let (mut board, _sync) = setup();
        let targets = layout(&board);
        board.set_drop_targets(targets);

        board.begin_drag(&pid("A"), DragTrigger::Keyboard);
        board.handle_drag(DragEvent::Key(DragKey::Right));
        assert_eq!(
            board.handle_drag(DragEvent::Key(DragKey::Escape)),
            GestureUpdate::Cancelled
        );
        assert_eq!(board.finish_drag(), None);
    }
}

mod subscriptions {
    use super::*;

    #[tokio::test]
    async fn listeners_see_apply_then_rollback() {
        let (mut board, sync) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        board.subscribe(move |change, _snapshot| {
            let reason = match change {
                StoreChange::Applied(_) => None,
                StoreChange::Replaced(reason) => Some(*reason),
            };
            log.lock().unwrap().push(reason);
        });
        sync.fail_next_move(SyncError::Rejected {
            status: 422,
            message: "stage is archived".into(),
        });

        board
            .move_paper(intent("A", "inbox", "screening", 0))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), [None, Some(ReplaceReason::Rollback)]);
    }
}
