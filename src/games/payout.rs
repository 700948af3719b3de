use crate::games::table::PayoutRule;
use crate::games::types::{Bet, Currency, Payout};
use serde::{Deserialize, Serialize};

/// Bet-scaled, capped jackpot paid in a secondary currency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JackpotRule {
    pub base_reward: f64,
    pub scale_factor: f64,
    pub max_reward: f64,
    pub currency: Currency,
}

impl JackpotRule {
    /// `min(base + bet * scale, max)`
    pub fn amount(&self, bet_amount: f64) -> f64 {
        (self.base_reward + bet_amount * self.scale_factor).min(self.max_reward)
    }

    pub fn payout(&self, bet: &Bet) -> Payout {
        Payout {
            currency: self.currency,
            amount: self.amount(bet.amount),
        }
    }
}

/// `bet * multiplier` in the bet's own currency
pub fn multiplier_payout(bet: &Bet, multiplier: f64) -> Payout {
    Payout {
        currency: bet.currency,
        amount: bet.amount * multiplier,
    }
}

/// Pure payout for a resolved entry. The stake was already debited at placement,
/// so a losing entry simply pays nothing.
pub fn payout(bet: &Bet, rule: &PayoutRule, jackpot: &JackpotRule) -> Payout {
    match rule {
        PayoutRule::Multiplier(m) if *m > 0.0 => multiplier_payout(bet, *m),
        PayoutRule::Multiplier(_) => Payout::nothing(bet.currency),
        PayoutRule::Jackpot => jackpot.payout(bet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::GameType;

    fn rule() -> JackpotRule {
        JackpotRule {
            base_reward: 10.0,
            scale_factor: 0.05,
            max_reward: 50.0,
            currency: Currency::Itlog,
        }
    }

    #[test]
    fn test_multiplier_payout_same_currency() {
        let bet = Bet::new(100.0, Currency::Php, GameType::Wheel).unwrap();
        let p = payout(&bet, &PayoutRule::Multiplier(2.0), &rule());
        assert_eq!(p, Payout { currency: Currency::Php, amount: 200.0 });
    }

    #[test]
    fn test_loss_pays_nothing() {
        let bet = Bet::new(100.0, Currency::Coins, GameType::Wheel).unwrap();
        let p = payout(&bet, &PayoutRule::Multiplier(0.0), &rule());
        assert!(p.is_empty());
        assert_eq!(p.currency, Currency::Coins);
    }

    #[test]
    fn test_jackpot_is_cross_currency_and_capped() {
        let small = Bet::new(100.0, Currency::Coins, GameType::Reels).unwrap();
        let p = payout(&small, &PayoutRule::Jackpot, &rule());
        assert_eq!(p.currency, Currency::Itlog);
        assert!((p.amount - 15.0).abs() < 1e-12);

        let large = Bet::new(10_000.0, Currency::Coins, GameType::Reels).unwrap();
        assert_eq!(payout(&large, &PayoutRule::Jackpot, &rule()).amount, 50.0);
    }

    #[test]
    fn test_payout_is_pure() {
        let bet = Bet::new(37.5, Currency::Coins, GameType::Dice).unwrap();
        let a = payout(&bet, &PayoutRule::Multiplier(1.98), &rule());
        let b = payout(&bet, &PayoutRule::Multiplier(1.98), &rule());
        assert_eq!(a, b);
    }
}
