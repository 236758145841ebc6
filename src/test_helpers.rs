use crate::gateway::LedgerGateway;
use crate::ledger::MemoryLedger;
use crate::types::{
    Address,
    SessionId,
    parse_stake,
};

/// Shared fixture for the integration suites: one in-process ledger and
/// three funded identities. Carol never participates in anything; she is
/// the control for visibility checks.
pub struct TestContext {
    ledger: MemoryLedger,
    alice: Address,
    bob: Address,
    carol: Address,
}

impl TestContext {
    pub fn new() -> Self {
        TestContext {
            ledger: MemoryLedger::new(),
            alice: Address([0xA1; 20]),
            bob: Address([0xB2; 20]),
            carol: Address([0xC3; 20]),
        }
    }

    /// Like [`Self::new`] but confirmations stay queued until
    /// [`MemoryLedger::produce_block`].
    pub fn new_held() -> Self {
        let ctx = Self::new();
        ctx.ledger.hold_confirmations(true);
        ctx
    }

    pub fn ledger(&self) -> MemoryLedger {
        self.ledger.clone()
    }

    pub fn alice(&self) -> Address {
        self.alice
    }

    pub fn bob(&self) -> Address {
        self.bob
    }

    pub fn carol(&self) -> Address {
        self.carol
    }

    /// Create a session directly on the ledger and return its id.
    pub async fn create_session(&self, creator: Address, stake: &str) -> SessionId {
        let value = parse_stake(stake).expect("test stake must parse");
        self.ledger
            .submit_create(creator, value)
            .await
            .expect("create accepted");
        *self
            .ledger
            .session_ids()
            .last()
            .expect("session was recorded")
    }

    /// Create a session and have `joiner` join it at the same stake.
    pub async fn create_joined_session(
        &self,
        creator: Address,
        joiner: Address,
        stake: &str,
    ) -> SessionId {
        let id = self.create_session(creator, stake).await;
        let value = parse_stake(stake).expect("test stake must parse");
        self.ledger
            .submit_join(id, joiner, value)
            .await
            .expect("join accepted");
        id
    }

    /// Apply a sequence of moves straight to the ledger, asserting each is
    /// legal.
    pub async fn play(&self, id: SessionId, moves: &[(Address, usize, usize)]) {
        for (actor, row, col) in moves {
            self.ledger
                .submit_move(id, *row, *col, *actor)
                .await
                .expect("scripted move is legal");
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
