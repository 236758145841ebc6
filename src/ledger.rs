//! In-process stand-in for the on-chain game contracts.
//!
//! An authoritative state machine the rest of the crate talks to only
//! through [`LedgerGateway`]. Enforces the contract rules (stake matching, turn
//! order, cell legality, win/draw detection) and can hold submitted writes
//! in a pending queue until [`MemoryLedger::produce_block`] to model
//! confirmation latency, fail reads, and corrupt stored cells for
//! fault-path tests.

use crate::gateway::{
    GatewayError,
    GatewayResult,
    LedgerGateway,
    OutcomeRead,
    RawBoard,
    Receipt,
    decode_board,
};
use crate::types::{
    Address,
    Board,
    SessionId,
    SessionStatus,
    SessionSummary,
};
use std::collections::{
    HashMap,
    VecDeque,
};
use std::sync::{
    Arc,
    Mutex,
};
use tracing::warn;

struct GameContract {
    player1: Address,
    player2: Option<Address>,
    stake: u128,
    status: SessionStatus,
    board: RawBoard,
    current_turn: Address,
    winner: Address,
    finished: bool,
}

impl GameContract {
    fn new(player1: Address, stake: u128) -> Self {
        GameContract {
            player1,
            player2: None,
            stake,
            status: SessionStatus::Waiting,
            board: [[0; 3]; 3],
            current_turn: Address::ZERO,
            winner: Address::ZERO,
            finished: false,
        }
    }

    fn join(&mut self, actor: Address, stake: u128) -> Result<(), String> {
        if self.status != SessionStatus::Waiting {
            return Err("session is not open for joining".to_string());
        }
        if actor == self.player1 {
            return Err("creator cannot join their own session".to_string());
        }
        if stake != self.stake {
            return Err(format!(
                "stake mismatch: expected {}, got {}",
                self.stake, stake
            ));
        }
        self.player2 = Some(actor);
        self.status = SessionStatus::InProgress;
        // Creator moves first.
        self.current_turn = self.player1;
        Ok(())
    }

    fn make_move(&mut self, row: usize, col: usize, actor: Address) -> Result<(), String> {
        if self.status != SessionStatus::InProgress || self.finished {
            return Err("session is not in progress".to_string());
        }
        if actor != self.current_turn {
            return Err("not this actor's turn".to_string());
        }
        if row >= 3 || col >= 3 {
            return Err(format!("cell ({row}, {col}) is out of range"));
        }
        if self.board[row][col] != 0 {
            return Err(format!("cell ({row}, {col}) is already occupied"));
        }
        let (code, opponent) = if actor == self.player1 {
            (1, self.player2.unwrap_or(Address::ZERO))
        } else {
            (2, self.player1)
        };
        self.board[row][col] = code;
        self.current_turn = opponent;
        self.settle();
        Ok(())
    }

    fn settle(&mut self) {
        if let Some(code) = winning_code(&self.board) {
            self.winner = if code == 1 {
                self.player1
            } else {
                self.player2.unwrap_or(Address::ZERO)
            };
            self.finished = true;
        } else if self.board.iter().flatten().all(|c| *c != 0) {
            // Full board with no line: draw. Winner stays zero; the
            // dedicated finished flag is what distinguishes this from a
            // game still in play.
            self.finished = true;
        }
        if self.finished {
            self.status = SessionStatus::Finished;
            self.current_turn = Address::ZERO;
        }
    }
}

fn winning_code(board: &RawBoard) -> Option<u64> {
    const LINES: [[(usize, usize); 3]; 8] = [
        [(0, 0), (0, 1), (0, 2)],
        [(1, 0), (1, 1), (1, 2)],
        [(2, 0), (2, 1), (2, 2)],
        [(0, 0), (1, 0), (2, 0)],
        [(0, 1), (1, 1), (2, 1)],
        [(0, 2), (1, 2), (2, 2)],
        [(0, 0), (1, 1), (2, 2)],
        [(0, 2), (1, 1), (2, 0)],
    ];
    for line in LINES {
        let [a, b, c] = line.map(|(r, cl)| board[r][cl]);
        if a != 0 && a == b && b == c {
            return Some(a);
        }
    }
    None
}

enum QueuedWrite {
    Create {
        actor: Address,
        stake: u128,
    },
    Join {
        id: SessionId,
        actor: Address,
        stake: u128,
    },
    Move {
        id: SessionId,
        row: usize,
        col: usize,
        actor: Address,
    },
}

#[derive(Default)]
struct Faults {
    failing_reads: u32,
    reject_next_submission: Option<String>,
}

struct LedgerState {
    order: Vec<SessionId>,
    sessions: HashMap<SessionId, GameContract>,
    queue: VecDeque<QueuedWrite>,
    hold_confirmations: bool,
    faults: Faults,
}

/// Cloneable handle to the shared ledger state; every clone observes the
/// same chain, like contract instances sharing one provider.
#[derive(Clone)]
pub struct MemoryLedger {
    inner: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    /// A ledger that confirms every accepted write immediately.
    pub fn new() -> Self {
        MemoryLedger {
            inner: Arc::new(Mutex::new(LedgerState {
                order: Vec::new(),
                sessions: HashMap::new(),
                queue: VecDeque::new(),
                hold_confirmations: false,
                faults: Faults::default(),
            })),
        }
    }

    /// When held, accepted writes sit in the pending queue until
    /// [`Self::produce_block`]; reads keep serving the pre-write snapshot.
    pub fn hold_confirmations(&self, hold: bool) {
        self.lock().hold_confirmations = hold;
    }

    /// Apply all queued writes in submission order. Writes that no longer
    /// pass the contract's checks vanish without a trace, exactly as a
    /// dropped transaction would; clients only ever learn of this by
    /// re-reading.
    pub fn produce_block(&self) {
        let mut state = self.lock();
        while let Some(write) = state.queue.pop_front() {
            if let Err(reason) = state.apply(write) {
                warn!(%reason, "queued write dropped at confirmation");
            }
        }
    }

    /// Make the next `n` reads fail with a transport fault.
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().faults.failing_reads = n;
    }

    /// Make the next submission fail with an authorization rejection.
    pub fn reject_next_submission(&self, reason: &str) {
        self.lock().faults.reject_next_submission = Some(reason.to_string());
    }

    /// Overwrite a stored cell code, bypassing the contract rules. For
    /// exercising the client's decode-fault and desync paths.
    pub fn corrupt_cell(&self, id: SessionId, row: usize, col: usize, code: u64) {
        let mut state = self.lock();
        if let Some(game) = state.sessions.get_mut(&id) {
            game.board[row][col] = code;
        }
    }

    /// Ids in creation order, newest last. Test convenience.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.lock().order.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.inner.lock().expect("ledger state poisoned")
    }

    fn read_gate(&self, state: &mut LedgerState) -> GatewayResult<()> {
        if state.faults.failing_reads > 0 {
            state.faults.failing_reads -= 1;
            return Err(GatewayError::Transport("ledger unreachable".to_string()));
        }
        Ok(())
    }

    fn submit(&self, write: QueuedWrite) -> GatewayResult<Receipt> {
        let mut state = self.lock();
        if let Some(reason) = state.faults.reject_next_submission.take() {
            return Err(GatewayError::Rejected(reason));
        }
        if state.hold_confirmations {
            state.queue.push_back(write);
        } else {
            state
                .apply(write)
                .map_err(GatewayError::Rejected)?;
        }
        Ok(Receipt(rand::random()))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerState {
    fn apply(&mut self, write: QueuedWrite) -> Result<(), String> {
        match write {
            QueuedWrite::Create { actor, stake } => {
                let id = SessionId(Address(rand::random()));
                self.order.push(id);
                self.sessions.insert(id, GameContract::new(actor, stake));
                Ok(())
            }
            QueuedWrite::Join { id, actor, stake } => {
                self.game_mut(id)?.join(actor, stake)
            }
            QueuedWrite::Move {
                id,
                row,
                col,
                actor,
            } => self.game_mut(id)?.make_move(row, col, actor),
        }
    }

    fn game(&self, id: SessionId) -> Result<&GameContract, String> {
        self.sessions
            .get(&id)
            .ok_or_else(|| format!("unknown session {id}"))
    }

    fn game_mut(&mut self, id: SessionId) -> Result<&mut GameContract, String> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| format!("unknown session {id}"))
    }
}

impl LedgerGateway for MemoryLedger {
    async fn session_summary(&self, id: SessionId) -> GatewayResult<SessionSummary> {
        let mut state = self.lock();
        self.read_gate(&mut state)?;
        let game = state.game(id).map_err(GatewayError::Transport)?;
        Ok(SessionSummary {
            id,
            player1: game.player1,
            player2: game.player2,
            stake: game.stake,
            status: game.status,
        })
    }

    async fn board(&self, id: SessionId) -> GatewayResult<Board> {
        let mut state = self.lock();
        self.read_gate(&mut state)?;
        let game = state.game(id).map_err(GatewayError::Transport)?;
        decode_board(&game.board)
    }

    async fn current_turn(&self, id: SessionId) -> GatewayResult<Address> {
        let mut state = self.lock();
        self.read_gate(&mut state)?;
        let game = state.game(id).map_err(GatewayError::Transport)?;
        Ok(game.current_turn)
    }

    async fn outcome(&self, id: SessionId) -> GatewayResult<OutcomeRead> {
        let mut state = self.lock();
        self.read_gate(&mut state)?;
        let game = state.game(id).map_err(GatewayError::Transport)?;
        Ok(OutcomeRead {
            winner: game.winner,
            finished: game.finished,
        })
    }

    async fn list_sessions(&self) -> GatewayResult<Vec<SessionId>> {
        let mut state = self.lock();
        self.read_gate(&mut state)?;
        Ok(state.order.clone())
    }

    async fn submit_move(
        &self,
        id: SessionId,
        row: usize,
        col: usize,
        actor: Address,
    ) -> GatewayResult<Receipt> {
        self.submit(QueuedWrite::Move {
            id,
            row,
            col,
            actor,
        })
    }

    async fn submit_join(
        &self,
        id: SessionId,
        actor: Address,
        stake: u128,
    ) -> GatewayResult<Receipt> {
        self.submit(QueuedWrite::Join { id, actor, stake })
    }

    async fn submit_create(
        &self,
        actor: Address,
        stake: u128,
    ) -> GatewayResult<Receipt> {
        self.submit(QueuedWrite::Create { actor, stake })
    }
}
