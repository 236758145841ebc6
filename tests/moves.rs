#![allow(non_snake_case)]

use gridstake::ledger::MemoryLedger;
use gridstake::moves::{
    MoveOutcome,
    OptimisticMoveController,
    ReconcilePolicy,
};
use gridstake::test_helpers::TestContext;
use gridstake::types::{
    Address,
    Cell,
    SessionId,
};
use std::time::Duration;

fn fast_policy() -> ReconcilePolicy {
    ReconcilePolicy {
        attempts: 2,
        base_delay: Duration::from_millis(1),
    }
}

async fn controller_for(
    ledger: MemoryLedger,
    id: SessionId,
    actor: Address,
) -> OptimisticMoveController<MemoryLedger> {
    let mut game = OptimisticMoveController::new(ledger, id, actor, fast_policy());
    game.refresh().await.unwrap();
    game
}

#[tokio::test]
async fn request_move__applies_overlay_and_reconciles() {
    let ctx = TestContext::new();
    // given
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;

    // when
    let outcome = game.request_move(0, 0).await;

    // then
    assert_eq!(outcome, MoveOutcome::Reconciled);
    assert!(game.pending().is_none());
    assert_eq!(game.view().unwrap().board.cell(0, 0), Cell::MarkA);
}

#[tokio::test]
async fn request_move__out_of_turn_is_a_noop_without_gateway_call() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.bob()).await;

    // given an armed rejection that any gateway write would consume
    ctx.ledger().reject_next_submission("sentinel");

    // when it is not bob's turn
    let outcome = game.request_move(0, 0).await;

    // then the request dies locally, no submission was issued
    assert_eq!(outcome, MoveOutcome::Ignored);
    assert!(game.pending().is_none());
}

#[tokio::test]
async fn request_move__occupied_cell_is_rejected_locally() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    ctx.play(id, &[(ctx.alice(), 0, 0), (ctx.bob(), 1, 1)]).await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;

    ctx.ledger().reject_next_submission("sentinel");

    // bob already holds (1, 1)
    let outcome = game.request_move(1, 1).await;

    assert_eq!(outcome, MoveOutcome::Ignored);
}

#[tokio::test]
async fn request_move__noop_once_the_game_is_over() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    ctx.play(
        id,
        &[
            (ctx.alice(), 0, 0),
            (ctx.bob(), 1, 0),
            (ctx.alice(), 0, 1),
            (ctx.bob(), 1, 1),
            (ctx.alice(), 0, 2),
        ],
    )
    .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.bob()).await;
    assert!(game.view().unwrap().game_over());

    ctx.ledger().reject_next_submission("sentinel");
    let outcome = game.request_move(2, 2).await;

    assert_eq!(outcome, MoveOutcome::Ignored);
}

#[tokio::test]
async fn request_move__out_of_range_cell_is_ignored() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;

    assert_eq!(game.request_move(3, 0).await, MoveOutcome::Ignored);
    assert_eq!(game.request_move(0, 5).await, MoveOutcome::Ignored);
}

#[tokio::test]
async fn request_move__rejection_reverts_the_overlay_completely() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;
    let board_before = game.display_board().unwrap();

    // given a gateway that rejects the submission
    ctx.ledger().reject_next_submission("not authorized");

    // when
    let outcome = game.request_move(2, 2).await;

    // then: full revert, no partial overlay remains
    assert!(matches!(outcome, MoveOutcome::Reverted(ref r) if r.contains("not authorized")));
    assert!(game.pending().is_none());
    assert_eq!(game.display_board().unwrap(), board_before);
}

#[tokio::test]
async fn request_move__unconfirmed_submission_keeps_the_overlay() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;
    ctx.ledger().hold_confirmations(true);

    // when the confirmation never becomes visible within the budget
    let outcome = game.request_move(0, 0).await;

    // then the status is unknown and the overlay stays painted
    assert_eq!(outcome, MoveOutcome::Unknown);
    assert!(game.pending().is_some());
    assert_eq!(game.display_board().unwrap().cell(0, 0), Cell::MarkA);
    // the clean mirror beneath it is untouched
    assert_eq!(game.view().unwrap().board.cell(0, 0), Cell::Empty);

    // and once the ledger catches up, a routine refresh reconciles it
    ctx.ledger().produce_block();
    game.refresh().await.unwrap();
    assert!(game.pending().is_none());
    assert_eq!(game.view().unwrap().board.cell(0, 0), Cell::MarkA);
}

#[tokio::test]
async fn request_move__second_request_while_pending_is_ignored() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;
    ctx.ledger().hold_confirmations(true);

    // given one move in flight
    assert_eq!(game.request_move(0, 0).await, MoveOutcome::Unknown);

    // when a second request arrives
    let second = game.request_move(1, 1).await;

    // then it is ignored, not queued, and no second submission exists
    assert_eq!(second, MoveOutcome::Ignored);
    ctx.ledger().produce_block();
    game.refresh().await.unwrap();
    assert_eq!(game.view().unwrap().board.occupied(), 1);
    assert_eq!(game.view().unwrap().board.cell(1, 1), Cell::Empty);
}

#[tokio::test]
async fn refresh__drops_overlay_when_the_cell_is_lost() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;
    ctx.ledger().hold_confirmations(true);
    assert_eq!(game.request_move(0, 0).await, MoveOutcome::Unknown);

    // given the ledger settled that cell against us
    ctx.ledger().corrupt_cell(id, 0, 0, 2);

    // when
    game.refresh().await.unwrap();

    // then the stale overlay is gone and the authoritative mark shows
    assert!(game.pending().is_none());
    assert_eq!(game.display_board().unwrap().cell(0, 0), Cell::MarkB);
}

#[tokio::test]
async fn set_actor__invalidates_pending_context_and_blocks_moves() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut game = controller_for(ctx.ledger(), id, ctx.alice()).await;
    ctx.ledger().hold_confirmations(true);
    assert_eq!(game.request_move(0, 0).await, MoveOutcome::Unknown);
    assert!(game.pending().is_some());

    // when the local identity changes
    game.set_actor(ctx.bob());

    // then the old identity's pending context is gone
    assert!(game.pending().is_none());

    // and no move is accepted until a fresh refresh has landed
    ctx.ledger().reject_next_submission("sentinel");
    assert_eq!(game.request_move(2, 2).await, MoveOutcome::Ignored);

    game.refresh().await.unwrap();
    // alice's held move never confirmed, so it is still her turn; bob's
    // request fails the turn guard, locally
    assert_eq!(game.request_move(2, 2).await, MoveOutcome::Ignored);
}

#[tokio::test]
async fn request_move__spectator_has_no_mark_and_is_ignored() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    // carol watches a game she is not part of
    let mut game = controller_for(ctx.ledger(), id, ctx.carol()).await;

    ctx.ledger().reject_next_submission("sentinel");
    assert_eq!(game.request_move(0, 0).await, MoveOutcome::Ignored);
}
