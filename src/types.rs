use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 20-byte ledger identity (account or session address).
///
/// Hex input is accepted in any letter case and normalized to bytes at the
/// boundary, so equality is structural and no per-comparison lowercasing is
/// needed anywhere else.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid address {0:?}: expected 20 hex-encoded bytes")]
pub struct AddressParseError(String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(digits).map_err(|_| AddressParseError(s.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ledger-assigned address of one game session.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Address);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl FromStr for SessionId {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SessionId(s.parse()?))
    }
}

/// One cell of the mirrored board. `MarkA` belongs to player1, `MarkB` to
/// player2, whatever identities the ledger assigned those slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    MarkA,
    MarkB,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Cell::Empty => " ",
            Cell::MarkA => "X",
            Cell::MarkB => "O",
        }
    }
}

/// The mirrored 3x3 grid. Always replaced wholesale on refresh, never patched
/// cell-by-cell from stale data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; 3]; 3],
}

impl Board {
    pub const SIDE: usize = 3;

    pub fn empty() -> Self {
        Board {
            cells: [[Cell::Empty; 3]; 3],
        }
    }

    pub fn from_cells(cells: [[Cell; 3]; 3]) -> Self {
        Board { cells }
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    pub fn in_bounds(row: usize, col: usize) -> bool {
        row < Self::SIDE && col < Self::SIDE
    }

    /// Number of non-empty cells. Monotonically non-decreasing across
    /// successful refreshes of one session; a regression is a desync fault.
    pub fn occupied(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.is_empty())
            .count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == Self::SIDE * Self::SIDE
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Waiting,
    InProgress,
    Finished,
}

/// Read-only cached copy of one session's ledger-held summary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub player1: Address,
    pub player2: Option<Address>,
    pub stake: u128,
    pub status: SessionStatus,
}

impl SessionSummary {
    pub fn is_participant(&self, actor: Address) -> bool {
        self.player1 == actor || self.player2 == Some(actor)
    }
}

/// Who may move next, paired with the local actor so the derived
/// `is_local_turn` can never drift from its inputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TurnState {
    pub current_turn: Address,
    pub local_actor: Address,
}

impl TurnState {
    pub fn is_local_turn(&self) -> bool {
        !self.current_turn.is_zero() && self.current_turn == self.local_actor
    }
}

/// Terminal outcome of a session. `Undetermined` means play continues; the
/// other two variants are terminal and the mirror accepts no further moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Undetermined,
    Draw,
    Winner(Address),
}

impl Outcome {
    pub fn game_over(&self) -> bool {
        !matches!(self, Outcome::Undetermined)
    }
}

/// A locally submitted move awaiting ledger confirmation. At most one per
/// (session, actor) at a time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingMove {
    pub row: usize,
    pub col: usize,
    pub mark: Cell,
    pub submitted_at: DateTime<Utc>,
}

/// Smallest ledger unit per whole stake token, wei-style.
pub const STAKE_DECIMALS: u32 = 18;
const STAKE_UNIT: u128 = 10u128.pow(STAKE_DECIMALS);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakeError {
    #[error("stake amount is empty")]
    Empty,
    #[error("stake amount {0:?} is not a decimal number")]
    Malformed(String),
    #[error("stake amount {0:?} has more than {STAKE_DECIMALS} fractional digits")]
    TooPrecise(String),
    #[error("stake amount must be greater than zero")]
    Zero,
    #[error("stake amount {0:?} overflows the ledger's value range")]
    Overflow(String),
}

/// Parse a user-entered stake string ("0.01") into the ledger's native
/// integer encoding. Positive decimals only, at most 18 fractional digits.
pub fn parse_stake(input: &str) -> Result<u128, StakeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(StakeError::Empty);
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(StakeError::Malformed(input.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(StakeError::Malformed(input.to_string()));
    }
    if frac_part.len() > STAKE_DECIMALS as usize {
        return Err(StakeError::TooPrecise(input.to_string()));
    }

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| StakeError::Overflow(input.to_string()))?
    };
    let mut frac: u128 = if frac_part.is_empty() {
        0
    } else {
        frac_part
            .parse()
            .map_err(|_| StakeError::Overflow(input.to_string()))?
    };
    frac *= 10u128.pow(STAKE_DECIMALS - frac_part.len() as u32);

    let value = whole
        .checked_mul(STAKE_UNIT)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(|| StakeError::Overflow(input.to_string()))?;
    if value == 0 {
        return Err(StakeError::Zero);
    }
    Ok(value)
}

/// Render a native stake value back into the decimal form users entered.
pub fn format_stake(value: u128) -> String {
    let whole = value / STAKE_UNIT;
    let frac = value % STAKE_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:018}");
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
