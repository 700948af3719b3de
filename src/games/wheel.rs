use crate::errors::ConfigurationError;
use crate::games::luck::LuckBoost;
use crate::games::payout::{payout, JackpotRule};
use crate::games::random::RandomSource;
use crate::games::table::{draw_outcome, OutcomeTable, PayoutRule, TableEntry};
use crate::games::types::{Bet, OutcomeKind, Resolution, RevealedState};
use serde::{Deserialize, Serialize};

/// Wheel sections, rarest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WheelSection {
    Jackpot,
    Times10,
    Times5,
    Times2,
    Refund,
    Lose,
}

impl WheelSection {
    pub const ALL: [WheelSection; 6] = [
        WheelSection::Jackpot,
        WheelSection::Times10,
        WheelSection::Times5,
        WheelSection::Times2,
        WheelSection::Refund,
        WheelSection::Lose,
    ];
}

/// Jackpot 0.5%, x10 2%, x5 5%, x2 15%, refund 17.5%, lose 60%.
/// Returns 0.925 of stake before jackpots.
pub fn table() -> Result<OutcomeTable<WheelSection>, ConfigurationError> {
    OutcomeTable::new(vec![
        TableEntry::new(WheelSection::Jackpot, 0.005, PayoutRule::Jackpot),
        TableEntry::new(WheelSection::Times10, 0.025, PayoutRule::Multiplier(10.0)),
        TableEntry::new(WheelSection::Times5, 0.075, PayoutRule::Multiplier(5.0)),
        TableEntry::new(WheelSection::Times2, 0.225, PayoutRule::Multiplier(2.0)),
        TableEntry::new(WheelSection::Refund, 0.40, PayoutRule::Multiplier(1.0)),
        TableEntry::new(WheelSection::Lose, 1.0, PayoutRule::Multiplier(0.0)),
    ])
}

pub fn resolve_wheel<R: RandomSource + ?Sized>(
    source: &mut R,
    boost: LuckBoost,
    bet: &Bet,
    table: &OutcomeTable<WheelSection>,
    jackpot: &JackpotRule,
) -> Resolution {
    let draw = draw_outcome(source, boost, table);
    let section = draw.entry.kind;
    let outcome = match section {
        WheelSection::Jackpot => OutcomeKind::Jackpot,
        WheelSection::Refund => OutcomeKind::Push,
        WheelSection::Lose => OutcomeKind::Loss,
        _ => OutcomeKind::Win,
    };

    Resolution {
        outcome,
        payout: payout(bet, &draw.entry.payout, jackpot),
        multiplier: draw.entry.payout.multiplier(),
        revealed: RevealedState::Wheel { section },
        draw: Some(draw.trace()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::random::ScriptedSource;
    use crate::games::table::COVERAGE_EPSILON;
    use crate::games::types::{Currency, GameType};

    fn jackpot() -> JackpotRule {
        JackpotRule {
            base_reward: 25.0,
            scale_factor: 0.08,
            max_reward: 750.0,
            currency: Currency::Itlog,
        }
    }

    #[test]
    fn test_table_covers_unit_interval() {
        let t = table().unwrap();
        let total: f64 = t.bucket_widths().iter().sum();
        assert!((total - 1.0).abs() < COVERAGE_EPSILON);
        assert_eq!(t.entries().len(), WheelSection::ALL.len());
        assert!((t.expected_multiplier() - 0.925).abs() < 1e-9);
    }

    #[test]
    fn test_sections_by_draw() {
        let t = table().unwrap();
        let bet = Bet::new(10.0, Currency::Coins, GameType::Wheel).unwrap();
        let cases = [
            (0.001, WheelSection::Jackpot, OutcomeKind::Jackpot),
            (0.02, WheelSection::Times10, OutcomeKind::Win),
            (0.30, WheelSection::Refund, OutcomeKind::Push),
            (0.40, WheelSection::Lose, OutcomeKind::Loss),
            (0.95, WheelSection::Lose, OutcomeKind::Loss),
        ];
        for (d, section, outcome) in cases {
            let mut source = ScriptedSource::new(vec![d]);
            let res = resolve_wheel(&mut source, LuckBoost::NONE, &bet, &t, &jackpot());
            assert_eq!(res.revealed, RevealedState::Wheel { section });
            assert_eq!(res.outcome, outcome);
        }
    }

    #[test]
    fn test_jackpot_section_pays_itlog() {
        let t = table().unwrap();
        let bet = Bet::new(100.0, Currency::Php, GameType::Wheel).unwrap();
        let mut source = ScriptedSource::new(vec![0.001]);
        let res = resolve_wheel(&mut source, LuckBoost::NONE, &bet, &t, &jackpot());
        assert_eq!(res.payout.currency, Currency::Itlog);
        assert!((res.payout.amount - 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_boost_turns_loss_into_refund() {
        let t = table().unwrap();
        let bet = Bet::new(10.0, Currency::Coins, GameType::Wheel).unwrap();
        let mut source = ScriptedSource::new(vec![0.5]);
        let res = resolve_wheel(&mut source, LuckBoost::new(1.5).unwrap(), &bet, &t, &jackpot());
        assert_eq!(res.revealed, RevealedState::Wheel { section: WheelSection::Refund });
        assert_eq!(res.payout.amount, 10.0);
    }
}
