use alloc::string::String;
use thiserror::Error;

use crate::{Amount, CellCount, CellIndex};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Grid needs at least one row and one column")]
    EmptyGrid,
    #[error("At least one bomb is required")]
    NoBombs,
    #[error("Too many bombs, {bombs} leaves no safe cell out of {total}")]
    TooManyBombs { bombs: CellCount, total: CellCount },
    #[error("Bomb count {bombs} is outside the table limits {min}..={max}")]
    BombsOutOfRange {
        bombs: CellCount,
        min: CellCount,
        max: CellCount,
    },
    #[error("Cell {0} is outside the grid")]
    InvalidCell(CellIndex),
    #[error("Cell {0} is listed more than once")]
    DuplicateBomb(CellIndex),
    #[error("Stake must be positive")]
    ZeroStake,
    #[error("Stake {stake} is outside the table limits {min}..={max}")]
    StakeOutOfRange { stake: Amount, min: Amount, max: Amount },
    #[error("Stake {stake} could win more than a wallet can hold")]
    PayoutOverflow { stake: Amount },
    #[error("Table stake limits are inverted")]
    InvertedStakeLimits,
    #[error("House edge {0} is outside [0, 1]")]
    InvalidHouseEdge(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FairnessError {
    #[error("Secure randomness unavailable: {0}")]
    EntropyUnavailable(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Insufficient funds to cover {requested}")]
    InsufficientFunds { requested: Amount },
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoundError {
    #[error("A round is already in progress")]
    RoundInProgress,
    #[error("No round is active")]
    NotActive,
    #[error("Reveal at least one safe cell before cashing out")]
    NothingToCashOut,
    #[error("Cell {0} is outside the grid")]
    InvalidCell(CellIndex),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Fairness(#[from] FairnessError),
}

impl RoundError {
    /// Intents that arrived in the wrong phase or for the wrong cell. These leave the
    /// game untouched and are expected from stale UI events.
    pub const fn is_rejected_intent(&self) -> bool {
        matches!(
            self,
            Self::RoundInProgress | Self::NotActive | Self::NothingToCashOut | Self::InvalidCell(_)
        )
    }

    /// Errors the caller cannot recover from by retrying with other input.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fairness(FairnessError::EntropyUnavailable(_)))
    }
}

pub type Result<T> = core::result::Result<T, RoundError>;
