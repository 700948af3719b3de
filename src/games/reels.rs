//! Three-reel slot. The combination is decided by one table draw; the symbols
//! shown are then generated to match it.

use crate::errors::ConfigurationError;
use crate::games::luck::LuckBoost;
use crate::games::payout::{payout, JackpotRule};
use crate::games::random::{shuffle, RandomSource};
use crate::games::table::{draw_outcome, OutcomeTable, PayoutRule, TableEntry};
use crate::games::types::{Bet, OutcomeKind, Resolution, RevealedState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Seven,
    Diamond,
    Bell,
    Cherry,
    Lemon,
}

impl Symbol {
    pub const ALL: [Symbol; 5] = [
        Symbol::Seven,
        Symbol::Diamond,
        Symbol::Bell,
        Symbol::Cherry,
        Symbol::Lemon,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    TripleSeven,
    TripleDiamond,
    TripleBell,
    TripleCherry,
    Pair,
    NoMatch,
}

impl Combination {
    fn triple_symbol(self) -> Option<Symbol> {
        match self {
            Combination::TripleSeven => Some(Symbol::Seven),
            Combination::TripleDiamond => Some(Symbol::Diamond),
            Combination::TripleBell => Some(Symbol::Bell),
            Combination::TripleCherry => Some(Symbol::Cherry),
            Combination::Pair | Combination::NoMatch => None,
        }
    }
}

/// Triple seven jackpot 0.2%, diamonds 0.8%, bells 2%, cherries 5%, pair 22%.
/// Returns 0.94 of stake before jackpots.
pub fn table() -> Result<OutcomeTable<Combination>, ConfigurationError> {
    OutcomeTable::new(vec![
        TableEntry::new(Combination::TripleSeven, 0.002, PayoutRule::Jackpot),
        TableEntry::new(Combination::TripleDiamond, 0.010, PayoutRule::Multiplier(20.0)),
        TableEntry::new(Combination::TripleBell, 0.030, PayoutRule::Multiplier(10.0)),
        TableEntry::new(Combination::TripleCherry, 0.080, PayoutRule::Multiplier(5.0)),
        TableEntry::new(Combination::Pair, 0.300, PayoutRule::Multiplier(1.5)),
        TableEntry::new(Combination::NoMatch, 1.0, PayoutRule::Multiplier(0.0)),
    ])
}

/// Pick reel symbols that display `combination`
pub fn symbols_for<R: RandomSource + ?Sized>(combination: Combination, source: &mut R) -> [Symbol; 3] {
    if let Some(symbol) = combination.triple_symbol() {
        return [symbol; 3];
    }

    let mut pool = Symbol::ALL;
    shuffle(source, &mut pool);
    match combination {
        Combination::Pair => {
            let (paired, odd) = (pool[0], pool[1]);
            let mut reels = [paired; 3];
            reels[source.below(3)] = odd;
            reels
        }
        _ => [pool[0], pool[1], pool[2]],
    }
}

/// Classify three symbols the same way the table names them
pub fn classify(symbols: &[Symbol; 3]) -> Combination {
    let [a, b, c] = *symbols;
    if a == b && b == c {
        match a {
            Symbol::Seven => Combination::TripleSeven,
            Symbol::Diamond => Combination::TripleDiamond,
            Symbol::Bell => Combination::TripleBell,
            Symbol::Cherry => Combination::TripleCherry,
            // Lemon is the blank; three of them pay nothing.
            Symbol::Lemon => Combination::NoMatch,
        }
    } else if a == b || b == c || a == c {
        Combination::Pair
    } else {
        Combination::NoMatch
    }
}

pub fn resolve_reels<R: RandomSource + ?Sized>(
    source: &mut R,
    boost: LuckBoost,
    bet: &Bet,
    table: &OutcomeTable<Combination>,
    jackpot: &JackpotRule,
) -> Resolution {
    let draw = draw_outcome(source, boost, table);
    let combination = draw.entry.kind;
    let symbols = symbols_for(combination, source);

    let outcome = match combination {
        Combination::TripleSeven => OutcomeKind::Jackpot,
        Combination::NoMatch => OutcomeKind::Loss,
        _ => OutcomeKind::Win,
    };

    Resolution {
        outcome,
        payout: payout(bet, &draw.entry.payout, jackpot),
        multiplier: draw.entry.payout.multiplier(),
        revealed: RevealedState::Reels {
            symbols,
            combination,
        },
        draw: Some(draw.trace()),
    }
}
