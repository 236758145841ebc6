//! Optimistic move submission and reconciliation.
//!
//! Per session the controller runs Idle -> Pending -> {Reconciled,
//! Reverted}. A pending move is a speculative overlay painted over the
//! authoritative mirror, never merged into it, so reverting is always a
//! matter of dropping the overlay. Single-flight: a second request while
//! one move is pending is ignored, not queued.

use crate::gateway::LedgerGateway;
use crate::sync::{
    GameStateSynchronizer,
    GameView,
    SyncError,
};
use crate::types::{
    Address,
    Board,
    PendingMove,
    SessionId,
};
use chrono::Utc;
use std::time::Duration;
use tracing::{
    debug,
    error,
    info,
    warn,
};

/// How long to keep polling for a submitted move to become visible before
/// declaring its status unknown.
#[derive(Copy, Clone, Debug)]
pub struct ReconcilePolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        ReconcilePolicy {
            attempts: 5,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Resolution of a move request, surfaced to the interaction layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Guard failed or a move is already in flight. No gateway call was
    /// issued and nothing changed.
    Ignored,
    /// The refreshed mirror shows the cell bearing the local mark; the
    /// overlay has been dropped in favor of the real thing.
    Reconciled,
    /// The submission was rejected (or lost in transport) before
    /// acceptance. Overlay dropped, prior mirror intact.
    Reverted(String),
    /// The submission was accepted but its confirmation did not become
    /// visible within the retry budget. The overlay is retained; the move
    /// may yet confirm.
    Unknown,
}

/// Drives one session's moves for one local actor.
pub struct OptimisticMoveController<G> {
    gateway: G,
    sync: GameStateSynchronizer<G>,
    pending: Option<PendingMove>,
    policy: ReconcilePolicy,
    /// Set on identity change; cleared by the next successful refresh. No
    /// move is accepted while the mirror may still describe the old actor.
    stale_identity: bool,
}

impl<G: LedgerGateway + Clone> OptimisticMoveController<G> {
    pub fn new(gateway: G, session: SessionId, actor: Address, policy: ReconcilePolicy) -> Self {
        let sync = GameStateSynchronizer::new(gateway.clone(), session, actor);
        OptimisticMoveController {
            gateway,
            sync,
            pending: None,
            policy,
            stale_identity: false,
        }
    }

    pub fn session(&self) -> SessionId {
        self.sync.session()
    }

    pub fn actor(&self) -> Address {
        self.sync.local_actor()
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn view(&self) -> Option<&GameView> {
        self.sync.view()
    }

    /// The mirror with the speculative overlay applied on top. This is what
    /// the rendering boundary shows; the underlying mirror stays clean so a
    /// revert is always possible.
    pub fn display_board(&self) -> Option<Board> {
        let view = self.sync.view()?;
        let mut board = view.board;
        if let Some(p) = &self.pending {
            if board.cell(p.row, p.col).is_empty() {
                board.set(p.row, p.col, p.mark);
            }
        }
        Some(board)
    }

    /// Switch the local identity. Any in-flight pending context belonged to
    /// the old identity and is invalidated; a fresh refresh is required
    /// before the next move is accepted.
    pub fn set_actor(&mut self, actor: Address) {
        if actor == self.sync.local_actor() {
            return;
        }
        if let Some(dropped) = self.pending.take() {
            warn!(
                session = %self.session(),
                row = dropped.row,
                col = dropped.col,
                "identity changed with a move in flight; overlay invalidated"
            );
        }
        self.stale_identity = true;
        self.sync.set_local_actor(actor);
    }

    /// Refresh the underlying mirror and absorb anything it says about the
    /// pending overlay.
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        self.sync.refresh().await?;
        self.stale_identity = false;
        self.absorb_refresh();
        Ok(())
    }

    /// Request a move at (row, col). Accepted iff it is the local actor's
    /// turn, the game is not over, the cell is empty in the current mirror,
    /// no move is already pending, and the mirror is not stale after an
    /// identity switch. Anything else is a no-op with no gateway call.
    pub async fn request_move(&mut self, row: usize, col: usize) -> MoveOutcome {
        if self.stale_identity || self.pending.is_some() {
            return MoveOutcome::Ignored;
        }
        if !Board::in_bounds(row, col) {
            return MoveOutcome::Ignored;
        }
        let actor = self.sync.local_actor();
        let Some(view) = self.sync.view() else {
            return MoveOutcome::Ignored;
        };
        if view.game_over() || !view.turn.is_local_turn() {
            return MoveOutcome::Ignored;
        }
        if !view.board.cell(row, col).is_empty() {
            return MoveOutcome::Ignored;
        }
        let Some(mark) = view.mark_of(actor) else {
            return MoveOutcome::Ignored;
        };

        // Speculative overlay first: the interface reflects the intent
        // without waiting out confirmation latency.
        self.pending = Some(PendingMove {
            row,
            col,
            mark,
            submitted_at: Utc::now(),
        });

        let session = self.session();
        match self.gateway.submit_move(session, row, col, actor).await {
            Ok(receipt) => {
                debug!(%session, row, col, %receipt, "move accepted for propagation");
                self.reconcile().await
            }
            Err(err) => {
                error!(%session, row, col, error = %err, "move submission failed");
                self.pending = None;
                MoveOutcome::Reverted(err.to_string())
            }
        }
    }

    /// Poll the mirror until the submitted move becomes visible or the
    /// budget runs out. The overlay is only dropped in favor of the
    /// confirmed mark or on proof the cell went to someone else; an
    /// exhausted budget leaves it in place and reports `Unknown`.
    async fn reconcile(&mut self) -> MoveOutcome {
        let mut delay = self.policy.base_delay;
        for attempt in 1..=self.policy.attempts {
            match self.sync.refresh().await {
                Ok(view) => {
                    let Some(p) = &self.pending else {
                        return MoveOutcome::Reconciled;
                    };
                    let cell = view.board.cell(p.row, p.col);
                    if cell == p.mark {
                        info!(
                            session = %self.sync.session(),
                            row = p.row,
                            col = p.col,
                            "move confirmed"
                        );
                        self.pending = None;
                        return MoveOutcome::Reconciled;
                    }
                    if !cell.is_empty() {
                        // Another actor's mark landed in our cell: the
                        // ledger settled the race against us.
                        warn!(
                            session = %self.sync.session(),
                            row = p.row,
                            col = p.col,
                            "cell was taken by the opponent; move superseded"
                        );
                        self.pending = None;
                        return MoveOutcome::Reverted(
                            "cell confirmed to another actor".to_string(),
                        );
                    }
                }
                Err(err) if err.is_transport() => {
                    warn!(
                        session = %self.sync.session(),
                        attempt,
                        error = %err,
                        "reconciliation refresh failed"
                    );
                }
                Err(err) => {
                    // Decode/desync faults: the mirror is suspect, stop
                    // polling but do not pretend the move failed.
                    error!(
                        session = %self.sync.session(),
                        error = %err,
                        "reconciliation aborted"
                    );
                    return MoveOutcome::Unknown;
                }
            }
            if attempt < self.policy.attempts {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }
        warn!(
            session = %self.sync.session(),
            "confirmation not observed within retry budget; move status unknown"
        );
        MoveOutcome::Unknown
    }

    /// Drop the overlay once the authoritative mirror already shows it, or
    /// once the cell is decided against us. Called after every successful
    /// refresh so routine ticks finish the reconciliation a bounded poll
    /// gave up on.
    fn absorb_refresh(&mut self) {
        let Some(view) = self.sync.view() else {
            return;
        };
        let Some(p) = &self.pending else {
            return;
        };
        let cell = view.board.cell(p.row, p.col);
        if cell == p.mark {
            info!(session = %self.sync.session(), "pending move confirmed on tick");
            self.pending = None;
        } else if !cell.is_empty() {
            warn!(session = %self.sync.session(), "pending move lost the cell; overlay dropped");
            self.pending = None;
        }
    }
}
