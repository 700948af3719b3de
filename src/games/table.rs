//! Cumulative probability tables keyed by game-specific enums.

use crate::errors::ConfigurationError;
use crate::games::luck::LuckBoost;
use crate::games::random::RandomSource;
use crate::games::types::DrawTrace;
use serde::{Deserialize, Serialize};

/// Tolerance when checking that a table reaches 1.0
pub const COVERAGE_EPSILON: f64 = 1e-9;

/// How an entry pays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutRule {
    /// `bet * multiplier` in the bet's currency
    Multiplier(f64),
    /// Cross-currency jackpot, see [`JackpotRule`](crate::games::payout::JackpotRule)
    Jackpot,
}

impl PayoutRule {
    pub fn multiplier(&self) -> f64 {
        match self {
            PayoutRule::Multiplier(m) => *m,
            PayoutRule::Jackpot => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEntry<K> {
    pub kind: K,
    pub upper_bound: f64,
    pub payout: PayoutRule,
}

impl<K> TableEntry<K> {
    pub fn new(kind: K, upper_bound: f64, payout: PayoutRule) -> Self {
        Self {
            kind,
            upper_bound,
            payout,
        }
    }
}

/// Ordered buckets; entry `i` covers `[bound[i-1], bound[i])`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeTable<K> {
    entries: Vec<TableEntry<K>>,
}

impl<K: Copy> OutcomeTable<K> {
    /// Validate and build. The final bound is snapped to exactly 1.0.
    pub fn new(mut entries: Vec<TableEntry<K>>) -> Result<Self, ConfigurationError> {
        if entries.is_empty() {
            return Err(ConfigurationError::EmptyTable);
        }

        let mut previous = 0.0;
        for (index, entry) in entries.iter().enumerate() {
            let bound = entry.upper_bound;
            if !bound.is_finite() || bound <= 0.0 || bound > 1.0 + COVERAGE_EPSILON {
                return Err(ConfigurationError::BoundOutOfRange { index, bound });
            }
            if index > 0 && bound <= previous {
                return Err(ConfigurationError::BoundsNotAscending { index });
            }
            let multiplier = entry.payout.multiplier();
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(ConfigurationError::InvalidMultiplier { index });
            }
            previous = bound;
        }

        if (previous - 1.0).abs() > COVERAGE_EPSILON {
            return Err(ConfigurationError::IncompleteCoverage { last: previous });
        }
        if let Some(last) = entries.last_mut() {
            last.upper_bound = 1.0;
        }

        Ok(Self { entries })
    }

    /// First entry whose bound exceeds the draw; anything at or past 1.0 (or NaN)
    /// falls back to the last entry.
    pub fn resolve(&self, draw: f64) -> &TableEntry<K> {
        let last = self.entries.len() - 1;
        if draw.is_nan() {
            return &self.entries[last];
        }
        let index = self.entries.partition_point(|e| e.upper_bound <= draw);
        &self.entries[index.min(last)]
    }

    pub fn entries(&self) -> &[TableEntry<K>] {
        &self.entries
    }

    pub fn bucket_widths(&self) -> Vec<f64> {
        let mut previous = 0.0;
        self.entries
            .iter()
            .map(|e| {
                let width = e.upper_bound - previous;
                previous = e.upper_bound;
                width
            })
            .collect()
    }

    pub fn probability_of(&self, kind: K) -> f64
    where
        K: PartialEq,
    {
        self.entries
            .iter()
            .zip(self.bucket_widths())
            .filter(|(e, _)| e.kind == kind)
            .map(|(_, w)| w)
            .sum()
    }

    /// Expected return per unit bet, ignoring jackpot entries
    pub fn expected_multiplier(&self) -> f64 {
        self.entries
            .iter()
            .zip(self.bucket_widths())
            .map(|(e, w)| e.payout.multiplier() * w)
            .sum()
    }
}

/// One resolved draw. Lives for a single round and is never persisted by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawResult<K> {
    pub raw_draw: f64,
    pub adjusted_draw: f64,
    pub boost: LuckBoost,
    pub entry: TableEntry<K>,
}

impl<K> DrawResult<K> {
    pub fn trace(&self) -> DrawTrace {
        DrawTrace {
            raw_draw: self.raw_draw,
            adjusted_draw: self.adjusted_draw,
            boost: self.boost.value(),
        }
    }
}

/// Draw, apply the boost, resolve.
pub fn draw_outcome<R, K>(source: &mut R, boost: LuckBoost, table: &OutcomeTable<K>) -> DrawResult<K>
where
    R: RandomSource + ?Sized,
    K: Copy,
{
    let raw_draw = source.draw();
    resolve_draw(raw_draw, boost.adjust(raw_draw), boost, table)
}

/// Resolve a draw the caller already adjusted.
pub fn resolve_draw<K: Copy>(
    raw_draw: f64,
    adjusted_draw: f64,
    boost: LuckBoost,
    table: &OutcomeTable<K>,
) -> DrawResult<K> {
    let entry = *table.resolve(adjusted_draw);
    tracing::debug!(raw_draw, adjusted_draw, boost = boost.value(), "resolved draw");
    DrawResult {
        raw_draw,
        adjusted_draw,
        boost,
        entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::random::ScriptedSource;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tier {
        Rare,
        Common,
        Miss,
    }

    fn ladder() -> OutcomeTable<Tier> {
        OutcomeTable::new(vec![
            TableEntry::new(Tier::Rare, 0.1, PayoutRule::Multiplier(10.0)),
            TableEntry::new(Tier::Common, 0.5, PayoutRule::Multiplier(2.0)),
            TableEntry::new(Tier::Miss, 1.0, PayoutRule::Multiplier(0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_bucket_boundaries() {
        let table = ladder();
        assert_eq!(table.resolve(0.0).kind, Tier::Rare);
        assert_eq!(table.resolve(0.0999).kind, Tier::Rare);
        assert_eq!(table.resolve(0.1).kind, Tier::Common);
        assert_eq!(table.resolve(0.4999).kind, Tier::Common);
        assert_eq!(table.resolve(0.5).kind, Tier::Miss);
        assert_eq!(table.resolve(0.9999).kind, Tier::Miss);
    }

    #[test]
    fn test_out_of_range_falls_back_to_last() {
        let table = ladder();
        assert_eq!(table.resolve(1.0).kind, Tier::Miss);
        assert_eq!(table.resolve(7.0).kind, Tier::Miss);
        assert_eq!(table.resolve(f64::NAN).kind, Tier::Miss);
    }

    #[test]
    fn test_widths_sum_to_one() {
        let table = ladder();
        let total: f64 = table.bucket_widths().iter().sum();
        assert!((total - 1.0).abs() < COVERAGE_EPSILON);
        assert!((table.probability_of(Tier::Common) - 0.4).abs() < 1e-12);
        assert!((table.expected_multiplier() - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert_eq!(
            OutcomeTable::<Tier>::new(vec![]),
            Err(ConfigurationError::EmptyTable)
        );
        assert_eq!(
            OutcomeTable::new(vec![
                TableEntry::new(Tier::Rare, 0.5, PayoutRule::Multiplier(1.0)),
                TableEntry::new(Tier::Miss, 0.9, PayoutRule::Multiplier(0.0)),
            ]),
            Err(ConfigurationError::IncompleteCoverage { last: 0.9 })
        );
        assert_eq!(
            OutcomeTable::new(vec![
                TableEntry::new(Tier::Rare, 0.5, PayoutRule::Multiplier(1.0)),
                TableEntry::new(Tier::Miss, 0.5, PayoutRule::Multiplier(0.0)),
            ]),
            Err(ConfigurationError::BoundsNotAscending { index: 1 })
        );
        assert_eq!(
            OutcomeTable::new(vec![TableEntry::new(
                Tier::Miss,
                1.0,
                PayoutRule::Multiplier(-1.0)
            )]),
            Err(ConfigurationError::InvalidMultiplier { index: 0 })
        );
        assert!(matches!(
            OutcomeTable::new(vec![TableEntry::new(Tier::Miss, 0.0, PayoutRule::Multiplier(0.0))]),
            Err(ConfigurationError::BoundOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn test_boost_never_worsens_bucket() {
        let table = ladder();
        let rank = |t: Tier| match t {
            Tier::Rare => 0,
            Tier::Common => 1,
            Tier::Miss => 2,
        };
        for i in 0..1000 {
            let raw = i as f64 / 1000.0;
            let plain = rank(table.resolve(raw).kind);
            let boosted = rank(table.resolve(LuckBoost::new(1.5).unwrap().adjust(raw)).kind);
            assert!(boosted <= plain);
        }
    }

    #[test]
    fn test_draw_outcome_records_trace() {
        let table = ladder();
        let mut source = ScriptedSource::new(vec![0.6]);
        let result = draw_outcome(&mut source, LuckBoost::new(2.0).unwrap(), &table);
        assert_eq!(result.raw_draw, 0.6);
        assert!((result.adjusted_draw - 0.3).abs() < 1e-12);
        assert_eq!(result.entry.kind, Tier::Common);
        assert_eq!(result.trace().boost, 2.0);
    }
}
