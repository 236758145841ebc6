#![allow(non_snake_case)]

use gridstake::catalog::SessionCatalog;
use gridstake::gateway::{
    GatewayError,
    GatewayResult,
    LedgerGateway,
    OutcomeRead,
    Receipt,
};
use gridstake::test_helpers::TestContext;
use gridstake::types::{
    Address,
    Board,
    SessionId,
    SessionStatus,
    SessionSummary,
};

#[tokio::test]
async fn refresh__waiting_sessions_are_listed_for_everyone() {
    let ctx = TestContext::new();
    let id = ctx.create_session(ctx.alice(), "0.01").await;
    let mut catalog = SessionCatalog::new(ctx.ledger());

    catalog.refresh().await.unwrap();

    for actor in [ctx.alice(), ctx.bob(), ctx.carol()] {
        let visible = catalog.visible_for(actor);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, id);
    }
}

#[tokio::test]
async fn refresh__running_games_hide_from_non_participants() {
    let ctx = TestContext::new();
    let id = ctx
        .create_joined_session(ctx.alice(), ctx.bob(), "0.01")
        .await;
    let mut catalog = SessionCatalog::new(ctx.ledger());

    catalog.refresh().await.unwrap();

    assert_eq!(catalog.visible_for(ctx.alice())[0].id, id);
    assert_eq!(catalog.visible_for(ctx.bob())[0].id, id);
    assert!(catalog.visible_for(ctx.carol()).is_empty());
}

#[tokio::test]
async fn refresh__finished_games_disappear_for_everyone() {
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
    let mut catalog = SessionCatalog::new(ctx.ledger());

    catalog.refresh().await.unwrap();

    assert_eq!(catalog.get(id).unwrap().status, SessionStatus::Finished);
    assert!(catalog.visible_for(ctx.alice()).is_empty());
    assert!(catalog.visible_for(ctx.bob()).is_empty());
}

#[tokio::test]
async fn refresh__listing_failure_keeps_the_previous_entries() {
    let ctx = TestContext::new();
    ctx.create_session(ctx.alice(), "0.01").await;
    let mut catalog = SessionCatalog::new(ctx.ledger());
    catalog.refresh().await.unwrap();
    assert_eq!(catalog.entries().len(), 1);

    // given the next listing call fails outright
    ctx.ledger().fail_next_reads(1);

    // when
    let result = catalog.refresh().await;

    // then the error surfaces and the stale roster survives
    assert!(matches!(result, Err(GatewayError::Transport(_))));
    assert_eq!(catalog.entries().len(), 1);
}

/// Gateway whose listing repeats one id and whose summary lookup fails for
/// a single poisoned session. Reads only; the catalog never writes.
struct FlakyGateway {
    listing: Vec<SessionId>,
    poisoned: SessionId,
}

impl LedgerGateway for FlakyGateway {
    async fn session_summary(&self, id: SessionId) -> GatewayResult<SessionSummary> {
        if id == self.poisoned {
            return Err(GatewayError::Transport("summary unavailable".to_string()));
        }
        Ok(SessionSummary {
            id,
            player1: Address([0xA1; 20]),
            player2: None,
            stake: 1,
            status: SessionStatus::Waiting,
        })
    }

    async fn board(&self, _id: SessionId) -> GatewayResult<Board> {
        unreachable!("catalog never reads boards")
    }

    async fn current_turn(&self, _id: SessionId) -> GatewayResult<Address> {
        unreachable!("catalog never reads turns")
    }

    async fn outcome(&self, _id: SessionId) -> GatewayResult<OutcomeRead> {
        unreachable!("catalog never reads outcomes")
    }

    async fn list_sessions(&self) -> GatewayResult<Vec<SessionId>> {
        Ok(self.listing.clone())
    }

    async fn submit_move(
        &self,
        _id: SessionId,
        _row: usize,
        _col: usize,
        _actor: Address,
    ) -> GatewayResult<Receipt> {
        unreachable!("catalog never submits")
    }

    async fn submit_join(
        &self,
        _id: SessionId,
        _actor: Address,
        _stake: u128,
    ) -> GatewayResult<Receipt> {
        unreachable!("catalog never submits")
    }

    async fn submit_create(
        &self,
        _actor: Address,
        _stake: u128,
    ) -> GatewayResult<Receipt> {
        unreachable!("catalog never submits")
    }
}

#[tokio::test]
async fn refresh__dedupes_the_listing_and_skips_unresolvable_sessions() {
    let good = SessionId(Address([0x01; 20]));
    let bad = SessionId(Address([0x02; 20]));
    let gateway = FlakyGateway {
        // `good` appears twice; `bad` resolves to an error
        listing: vec![good, bad, good],
        poisoned: bad,
    };
    let mut catalog = SessionCatalog::new(gateway);

    catalog.refresh().await.unwrap();

    let ids: Vec<SessionId> = catalog.entries().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![good]);
}
