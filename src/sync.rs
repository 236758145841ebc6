//! Mirroring of one session's authoritative state.
//!
//! Each refresh issues the four reads (summary, board, current turn,
//! outcome) and composes them into a single new [`GameView`]. Partial
//! results are never applied: if any read fails the refresh is discarded
//! wholesale and the previous mirror is retained.

use crate::gateway::{
    GatewayError,
    LedgerGateway,
    OutcomeRead,
};
use crate::types::{
    Address,
    Board,
    Cell,
    Outcome,
    SessionId,
    TurnState,
};
use chrono::{
    DateTime,
    Utc,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{
    debug,
    warn,
};

/// One consistent snapshot of a session, replaced wholesale on every
/// successful refresh.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GameView {
    pub board: Board,
    pub player1: Address,
    pub player2: Option<Address>,
    pub turn: TurnState,
    pub outcome: Outcome,
    pub refreshed_at: DateTime<Utc>,
}

impl GameView {
    pub fn game_over(&self) -> bool {
        self.outcome.game_over()
    }

    /// The mark the given identity plays with, if it is a participant.
    pub fn mark_of(&self, actor: Address) -> Option<Cell> {
        if actor == self.player1 {
            Some(Cell::MarkA)
        } else if self.player2 == Some(actor) {
            Some(Cell::MarkB)
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// An occupied cell count went backwards between two successful
    /// refreshes of the same session. The ledger never un-places a mark, so
    /// the mirror and the ledger have diverged.
    #[error("desynchronized: occupied cells regressed from {before} to {after}")]
    Desync { before: usize, after: usize },
}

impl SyncError {
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Gateway(e) if e.is_transport())
    }
}

/// Owns the mirrored `{Board, TurnState, Outcome}` triple for one session.
pub struct GameStateSynchronizer<G> {
    gateway: G,
    session: SessionId,
    local_actor: Address,
    view: Option<GameView>,
}

impl<G: LedgerGateway> GameStateSynchronizer<G> {
    pub fn new(gateway: G, session: SessionId, local_actor: Address) -> Self {
        GameStateSynchronizer {
            gateway,
            session,
            local_actor,
            view: None,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn local_actor(&self) -> Address {
        self.local_actor
    }

    pub fn view(&self) -> Option<&GameView> {
        self.view.as_ref()
    }

    /// Rebind the mirror to a new local identity. The turn derivation in the
    /// retained view is updated immediately; callers are expected to refresh
    /// before trusting anything else about it.
    pub fn set_local_actor(&mut self, actor: Address) {
        self.local_actor = actor;
        if let Some(view) = &mut self.view {
            view.turn.local_actor = actor;
        }
    }

    /// One refresh tick. All four reads must succeed for the mirror to
    /// advance; any failure leaves the previous view in place and reports
    /// the error without applying anything.
    pub async fn refresh(&mut self) -> Result<&GameView, SyncError> {
        self.refresh_once().await?;
        Ok(self.view.as_ref().expect("refresh just installed a view"))
    }

    /// Refresh with bounded backoff across transport faults. Decode and
    /// desync faults are not retried; they need intervention, not patience.
    pub async fn refresh_with_retry(
        &mut self,
        attempts: u32,
        base_delay: Duration,
    ) -> Result<&GameView, SyncError> {
        let mut delay = base_delay;
        let mut attempt = 1;
        loop {
            match self.refresh_once().await {
                Ok(()) => {
                    return Ok(self
                        .view
                        .as_ref()
                        .expect("refresh just installed a view"));
                }
                Err(err) if err.is_transport() && attempt < attempts => {
                    warn!(
                        session = %self.session,
                        attempt,
                        error = %err,
                        "refresh failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn refresh_once(&mut self) -> Result<(), SyncError> {
        let summary = self.gateway.session_summary(self.session).await?;
        let board = self.gateway.board(self.session).await?;
        let current_turn = self.gateway.current_turn(self.session).await?;
        let outcome_read = self.gateway.outcome(self.session).await?;

        if let Some(prev) = &self.view {
            let before = prev.board.occupied();
            let after = board.occupied();
            if after < before {
                return Err(SyncError::Desync { before, after });
            }
        }

        let view = GameView {
            board,
            player1: summary.player1,
            player2: summary.player2,
            turn: TurnState {
                current_turn,
                local_actor: self.local_actor,
            },
            outcome: resolve_outcome(outcome_read),
            refreshed_at: Utc::now(),
        };
        debug!(
            session = %self.session,
            occupied = view.board.occupied(),
            local_turn = view.turn.is_local_turn(),
            outcome = ?view.outcome,
            "mirror refreshed"
        );
        self.view = Some(view);
        Ok(())
    }
}

/// Resolve the raw winner/finished pair into the tagged outcome. A non-zero
/// winner always wins; a zero winner means draw only when the contract's
/// finished flag says the game ended.
pub fn resolve_outcome(read: OutcomeRead) -> Outcome {
    if !read.winner.is_zero() {
        Outcome::Winner(read.winner)
    } else if read.finished {
        Outcome::Draw
    } else {
        Outcome::Undetermined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn resolve_outcome_distinguishes_draw_from_in_progress() {
        let in_progress = OutcomeRead {
            winner: Address::ZERO,
            finished: false,
        };
        assert_eq!(resolve_outcome(in_progress), Outcome::Undetermined);

        let draw = OutcomeRead {
            winner: Address::ZERO,
            finished: true,
        };
        assert_eq!(resolve_outcome(draw), Outcome::Draw);

        let won = OutcomeRead {
            winner: addr(7),
            finished: true,
        };
        assert_eq!(resolve_outcome(won), Outcome::Winner(addr(7)));
    }
}
