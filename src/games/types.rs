use crate::errors::ValidationError;
use crate::games::blackjack::{Card, HandOutcome};
use crate::games::dice::Prediction;
use crate::games::fairness::SeedTrace;
use crate::games::mines::CellView;
use crate::games::reels::{Combination, Symbol};
use crate::games::wheel::WheelSection;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Mines,
    Reels,
    Wheel,
    Dice,
    Blackjack,
}

impl GameType {
    pub const ALL: [GameType; 5] = [
        GameType::Mines,
        GameType::Reels,
        GameType::Wheel,
        GameType::Dice,
        GameType::Blackjack,
    ];

    /// Stable index used by per-game counters
    pub fn index(self) -> usize {
        match self {
            GameType::Mines => 0,
            GameType::Reels => 1,
            GameType::Wheel => 2,
            GameType::Dice => 3,
            GameType::Blackjack => 4,
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Mines => write!(f, "mines"),
            GameType::Reels => write!(f, "reels"),
            GameType::Wheel => write!(f, "wheel"),
            GameType::Dice => write!(f, "dice"),
            GameType::Blackjack => write!(f, "blackjack"),
        }
    }
}

/// Wallet currencies. `Itlog` is the secondary token jackpots pay out in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Coins,
    Php,
    Itlog,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Coins => write!(f, "coins"),
            Currency::Php => write!(f, "php"),
            Currency::Itlog => write!(f, "itlog"),
        }
    }
}

/// A stake placed in one currency for one game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub amount: f64,
    pub currency: Currency,
    pub game: GameType,
}

impl Bet {
    pub fn new(amount: f64, currency: Currency, game: GameType) -> Result<Self, ValidationError> {
        let bet = Self {
            amount,
            currency,
            game,
        };
        bet.validate()?;
        Ok(bet)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::NonPositiveBet {
                amount: self.amount,
            });
        }
        Ok(())
    }
}

/// Coarse classification of a finished round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Win,
    Loss,
    Push,
    Jackpot,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Win => write!(f, "win"),
            OutcomeKind::Loss => write!(f, "loss"),
            OutcomeKind::Push => write!(f, "push"),
            OutcomeKind::Jackpot => write!(f, "jackpot"),
        }
    }
}

/// Amount credited back to the player for a round
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Payout {
    pub currency: Currency,
    pub amount: f64,
}

impl Payout {
    pub fn nothing(currency: Currency) -> Self {
        Self {
            currency,
            amount: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount <= 0.0
    }
}

/// Raw and luck-adjusted draw that decided a table lookup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DrawTrace {
    pub raw_draw: f64,
    pub adjusted_draw: f64,
    pub boost: f64,
}

/// What the player gets to see once a round is over
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum RevealedState {
    Mines {
        cells: Vec<CellView>,
        mine_count: usize,
        revealed_safe: usize,
    },
    Reels {
        symbols: [Symbol; 3],
        combination: Combination,
    },
    Wheel {
        section: WheelSection,
    },
    Dice {
        roll: u8,
        target: u8,
        prediction: Prediction,
    },
    Blackjack {
        player: Vec<Card>,
        dealer: Vec<Card>,
        player_total: u8,
        dealer_total: u8,
        outcome: HandOutcome,
    },
}

/// Pure result of resolving one round, before ids and persistence are attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub outcome: OutcomeKind,
    pub payout: Payout,
    pub multiplier: f64,
    pub revealed: RevealedState,
    pub draw: Option<DrawTrace>,
}

/// Identifies one round while it is being resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundContext {
    pub round_id: String,
    pub player_id: String,
    pub game: GameType,
}

impl RoundContext {
    pub fn new(player_id: &str, game: GameType) -> Self {
        Self {
            round_id: Uuid::new_v4().to_string(),
            player_id: player_id.to_string(),
            game,
        }
    }
}

/// Complete record of a finished round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub round_id: String,
    pub player_id: String,
    pub game: GameType,
    pub bet: Bet,
    pub outcome: OutcomeKind,
    pub payout_currency: Currency,
    pub payout_amount: f64,
    pub resolved_multiplier: f64,
    pub revealed: RevealedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<DrawTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedTrace>,
    pub timestamp: i64,
}

impl RoundResult {
    pub fn from_resolution(
        ctx: RoundContext,
        bet: Bet,
        resolution: Resolution,
        seed: Option<SeedTrace>,
    ) -> Self {
        Self {
            round_id: ctx.round_id,
            player_id: ctx.player_id,
            game: ctx.game,
            bet,
            outcome: resolution.outcome,
            payout_currency: resolution.payout.currency,
            payout_amount: resolution.payout.amount,
            resolved_multiplier: resolution.multiplier,
            revealed: resolution.revealed,
            draw: resolution.draw,
            seed,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn payout(&self) -> Payout {
        Payout {
            currency: self.payout_currency,
            amount: self.payout_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_validation() {
        assert!(Bet::new(10.0, Currency::Coins, GameType::Dice).is_ok());
        assert!(Bet::new(0.0, Currency::Coins, GameType::Dice).is_err());
        assert!(Bet::new(-5.0, Currency::Php, GameType::Dice).is_err());
        assert!(Bet::new(f64::NAN, Currency::Php, GameType::Dice).is_err());
    }

    #[test]
    fn test_game_type_display_and_index() {
        assert_eq!(GameType::Blackjack.to_string(), "blackjack");
        let indices: Vec<usize> = GameType::ALL.iter().map(|g| g.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_round_ids_unique() {
        let a = RoundContext::new("p1", GameType::Wheel);
        let b = RoundContext::new("p1", GameType::Wheel);
        assert_ne!(a.round_id, b.round_id);
    }
}
