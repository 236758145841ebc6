use crate::types::{
    Address,
    Board,
    Cell,
    SessionId,
    SessionSummary,
};
use std::fmt;
use thiserror::Error;

/// Faults a remote call can produce, classified at the boundary.
///
/// `Transport` is retryable at the refresh layer; `Decode` marks a
/// desynchronization between client and ledger and aborts the refresh that
/// observed it; `Rejected` is an authorization rejection of a submission and
/// is never retried automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("ledger transport failure: {0}")]
    Transport(String),
    #[error("ledger returned an undecodable value: {0}")]
    Decode(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

/// Opaque handle for a write accepted for propagation. Irrevocable from the
/// client's perspective; resolution is observed only by re-querying reads.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Receipt(pub [u8; 32]);

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Receipt({self})")
    }
}

/// Raw winner/finished pair as the contract stores it. A zero winner means
/// "draw" only when `finished` is set; the two fields are read together so
/// the client never infers termination from the winner address alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutcomeRead {
    pub winner: Address,
    pub finished: bool,
}

/// Per-cell codes exactly as the contract stores them: 0 empty, 1 player1,
/// 2 player2. Anything else is a decode fault.
pub type RawBoard = [[u64; 3]; 3];

pub fn decode_cell(code: u64) -> GatewayResult<Cell> {
    match code {
        0 => Ok(Cell::Empty),
        1 => Ok(Cell::MarkA),
        2 => Ok(Cell::MarkB),
        other => Err(GatewayError::Decode(format!(
            "unrecognized cell code {other}"
        ))),
    }
}

/// Strict decode of a raw board. Untyped cell codes never cross this
/// boundary.
pub fn decode_board(raw: &RawBoard) -> GatewayResult<Board> {
    let mut board = Board::empty();
    for (r, row) in raw.iter().enumerate() {
        for (c, code) in row.iter().enumerate() {
            board.set(r, c, decode_cell(*code)?);
        }
    }
    Ok(board)
}

/// The client's only window onto the authoritative state machine.
///
/// Reads are eventually-consistent snapshots that may lag the true ledger
/// head. Writes take an explicit actor identity, return once accepted for
/// propagation, and resolve (confirm or vanish) asynchronously; the caller
/// observes resolution by re-reading. An `Err(Rejected)` from a write is a
/// synchronous authorization rejection.
#[allow(async_fn_in_trait)]
pub trait LedgerGateway {
    async fn session_summary(&self, id: SessionId) -> GatewayResult<SessionSummary>;

    async fn board(&self, id: SessionId) -> GatewayResult<Board>;

    async fn current_turn(&self, id: SessionId) -> GatewayResult<Address>;

    async fn outcome(&self, id: SessionId) -> GatewayResult<OutcomeRead>;

    async fn list_sessions(&self) -> GatewayResult<Vec<SessionId>>;

    async fn submit_move(
        &self,
        id: SessionId,
        row: usize,
        col: usize,
        actor: Address,
    ) -> GatewayResult<Receipt>;

    async fn submit_join(
        &self,
        id: SessionId,
        actor: Address,
        stake: u128,
    ) -> GatewayResult<Receipt>;

    async fn submit_create(&self, actor: Address, stake: u128)
    -> GatewayResult<Receipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_cell_maps_the_fixed_table() {
        assert_eq!(decode_cell(0).unwrap(), Cell::Empty);
        assert_eq!(decode_cell(1).unwrap(), Cell::MarkA);
        assert_eq!(decode_cell(2).unwrap(), Cell::MarkB);
    }

    #[test]
    fn decode_cell_rejects_out_of_domain_codes() {
        for code in [3u64, 7, u64::MAX] {
            assert!(matches!(decode_cell(code), Err(GatewayError::Decode(_))));
        }
    }

    #[test]
    fn decode_board_fails_atomically() {
        let mut raw: RawBoard = [[0; 3]; 3];
        raw[1][2] = 9;
        assert!(decode_board(&raw).is_err());
    }
}
