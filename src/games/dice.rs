//! Over/under dice on a 1-100 roll.

use crate::errors::{ConfigurationError, ValidationError};
use crate::games::luck::LuckBoost;
use crate::games::payout::multiplier_payout;
use crate::games::random::RandomSource;
use crate::games::table::{resolve_draw, OutcomeTable, PayoutRule, TableEntry};
use crate::games::types::{Bet, OutcomeKind, Payout, Resolution, RevealedState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1% house edge baked into the odds-to-multiplier conversion
pub const HOUSE_FACTOR: f64 = 0.99;
pub const MIN_MULTIPLIER: f64 = 1.01;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Over,
    Under,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Over => write!(f, "over"),
            Prediction::Under => write!(f, "under"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceOutcome {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiceParams {
    pub target: u8,
    pub prediction: Prediction,
}

impl DiceParams {
    pub fn new(target: u8, prediction: Prediction) -> Self {
        Self { target, prediction }
    }

    /// Build from optional inputs, rejecting missing or out-of-range settings
    pub fn from_parts(
        target: Option<u8>,
        prediction: Option<Prediction>,
        min_target: u8,
        max_target: u8,
    ) -> Result<Self, ValidationError> {
        let target = target.ok_or(ValidationError::MissingConfig("target number"))?;
        let prediction = prediction.ok_or(ValidationError::MissingConfig("prediction direction"))?;
        let params = Self::new(target, prediction);
        params.validate(min_target, max_target)?;
        Ok(params)
    }

    pub fn validate(&self, min_target: u8, max_target: u8) -> Result<(), ValidationError> {
        // 0 and 100 would leave one side with no winning rolls
        let min = min_target.max(1);
        let max = max_target.min(99);
        if self.target < min || self.target > max {
            return Err(ValidationError::InvalidTarget {
                target: self.target,
                min,
                max,
            });
        }
        Ok(())
    }

    pub fn win_chance(&self) -> f64 {
        win_chance(self.target, self.prediction)
    }

    pub fn multiplier(&self) -> f64 {
        multiplier(self.win_chance())
    }

    /// Two-bucket table for this play. Rolls run low to high across [0, 1),
    /// so "under" wins in the first bucket and "over" in the second.
    pub fn table(&self) -> Result<OutcomeTable<DiceOutcome>, ConfigurationError> {
        let split = self.target as f64 / 100.0;
        let win = PayoutRule::Multiplier(self.multiplier());
        let lose = PayoutRule::Multiplier(0.0);
        match self.prediction {
            Prediction::Under => OutcomeTable::new(vec![
                TableEntry::new(DiceOutcome::Win, split, win),
                TableEntry::new(DiceOutcome::Loss, 1.0, lose),
            ]),
            Prediction::Over => OutcomeTable::new(vec![
                TableEntry::new(DiceOutcome::Loss, split, lose),
                TableEntry::new(DiceOutcome::Win, 1.0, win),
            ]),
        }
    }
}

/// `(100 - target) / 100` for over, `target / 100` for under
pub fn win_chance(target: u8, prediction: Prediction) -> f64 {
    match prediction {
        Prediction::Over => (100.0 - target as f64) / 100.0,
        Prediction::Under => target as f64 / 100.0,
    }
}

/// `max(1.01, 0.99 / win_chance)`
pub fn multiplier(win_chance: f64) -> f64 {
    (HOUSE_FACTOR / win_chance).max(MIN_MULTIPLIER)
}

/// Roll 1..=100 from a draw in [0, 1)
pub fn roll_from_draw(draw: f64) -> u8 {
    ((draw * 100.0).floor() as i64 + 1).clamp(1, 100) as u8
}

/// Resolve one dice play. `params` must already be validated.
pub fn resolve_dice<R: RandomSource + ?Sized>(
    source: &mut R,
    boost: LuckBoost,
    bet: &Bet,
    params: &DiceParams,
) -> Result<Resolution, ConfigurationError> {
    let table = params.table()?;
    // The boost always squeezes draws toward the winning bucket: down for
    // "under", up for "over".
    let raw_draw = source.draw();
    let adjusted_draw = match params.prediction {
        Prediction::Under => boost.adjust(raw_draw),
        Prediction::Over => boost.adjust_from_top(raw_draw),
    };
    let draw = resolve_draw(raw_draw, adjusted_draw, boost, &table);
    let won = draw.entry.kind == DiceOutcome::Win;

    // Keep the shown roll on the side of the target the table resolved to,
    // even when float rounding lands exactly on the split.
    let roll = roll_from_draw(draw.adjusted_draw);
    let target = params.target;
    let roll = match (params.prediction, won) {
        (Prediction::Under, true) | (Prediction::Over, false) => roll.min(target),
        (Prediction::Under, false) | (Prediction::Over, true) => roll.max(target.saturating_add(1)),
    };

    let (outcome, payout, multiplier) = if won {
        let m = draw.entry.payout.multiplier();
        (OutcomeKind::Win, multiplier_payout(bet, m), m)
    } else {
        (OutcomeKind::Loss, Payout::nothing(bet.currency), 0.0)
    };

    Ok(Resolution {
        outcome,
        payout,
        multiplier,
        revealed: RevealedState::Dice {
            roll,
            target,
            prediction: params.prediction,
        },
        draw: Some(draw.trace()),
    })
}
