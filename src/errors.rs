//! Error types for the fairdraw outcome engine
//!
//! Four families: validation (a declined bet, nothing mutated), configuration
//! (bad tables or settings, fail fast at load time), persistence (balance or
//! history collaborators failing mid-round) and fairness (seed/proof problems).

use crate::games::types::{Currency, GameType};

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum FairdrawError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Fairness error: {0}")]
    Fairness(#[from] FairnessError),
}

/// Rejections raised before any draw happens
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Bet amount must be a positive finite number, got {amount}")]
    NonPositiveBet { amount: f64 },

    #[error("Insufficient balance: need {needed} {currency}, have {available}")]
    InsufficientBalance {
        needed: f64,
        available: f64,
        currency: Currency,
    },

    #[error("Amount must be a positive finite number, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Missing required game setting: {0}")]
    MissingConfig(&'static str),

    #[error("Mine count {count} outside {min}..={max}")]
    InvalidMineCount { count: usize, min: usize, max: usize },

    #[error("Dice target {target} outside {min}..={max}")]
    InvalidTarget { target: u8, min: u8, max: u8 },

    #[error("Luck boost must be >= 1.0, got {value}")]
    InvalidBoost { value: f64 },

    #[error("Cell {cell} is outside the board")]
    CellOutOfRange { cell: usize },

    #[error("Cell {cell} was already revealed")]
    CellAlreadyRevealed { cell: usize },

    #[error("Round already finished")]
    RoundFinished,

    #[error("Deck exhausted")]
    DeckExhausted,

    #[error("A {game} round is already active for this player")]
    SessionActive { game: GameType },

    #[error("No active {game} round for this player")]
    NoActiveSession { game: GameType },

    #[error("Bet game {actual} does not match requested game {expected}")]
    GameMismatch { expected: GameType, actual: GameType },
}

/// Misconfigured tables or settings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Outcome table has no entries")]
    EmptyTable,

    #[error("Entry {index} has bound {bound} outside (0, 1]")]
    BoundOutOfRange { index: usize, bound: f64 },

    #[error("Entry {index} bound does not ascend")]
    BoundsNotAscending { index: usize },

    #[error("Final bound is {last}, table must cover the full range up to 1.0")]
    IncompleteCoverage { last: f64 },

    #[error("Entry {index} has an invalid payout multiplier")]
    InvalidMultiplier { index: usize },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Collaborator failures around a round
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PersistenceError {
    #[error("Debit failed: {0}")]
    DebitFailed(String),

    #[error(
        "Credit of {amount} {currency} to {player} for round {round_id} failed after {attempts} attempts: {reason}"
    )]
    CreditFailed {
        round_id: String,
        player: String,
        currency: Currency,
        amount: f64,
        attempts: u32,
        reason: String,
    },

    #[error("History append failed: {0}")]
    HistoryFailed(String),
}

/// Seed and proof errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FairnessError {
    #[error("Server seed must not be empty")]
    EmptySeed,

    #[error("Invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Revealed server seed does not match the published commitment")]
    CommitmentMismatch,
}

impl From<std::io::Error> for FairdrawError {
    fn from(e: std::io::Error) -> Self {
        FairdrawError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl FairdrawError {
    /// True for declined bets and illegal moves; no state was mutated.
    pub fn is_validation(&self) -> bool {
        matches!(self, FairdrawError::Validation(_))
    }
}

pub type FairdrawResult<T> = Result<T, FairdrawError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err: FairdrawError = ConfigurationError::EmptyTable.into();
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("no entries"));
    }

    #[test]
    fn test_insufficient_balance_details() {
        let err = ValidationError::InsufficientBalance {
            needed: 50.0,
            available: 20.0,
            currency: Currency::Coins,
        };
        let text = err.to_string();
        assert!(text.contains("need 50"));
        assert!(text.contains("have 20"));
    }

    #[test]
    fn test_error_source_chain() {
        let err: FairdrawError = ValidationError::RoundFinished.into();
        assert!(err.is_validation());
        assert!(err.source().is_some());
    }
}
