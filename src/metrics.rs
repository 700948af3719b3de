//! Round counters per game

use crate::games::types::{GameType, OutcomeKind, RoundResult};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Amounts are stored in thousandths so they fit an atomic integer
const AMOUNT_SCALE: f64 = 1000.0;

#[derive(Default)]
struct GameCounters {
    rounds: AtomicU64,
    wins: AtomicU64,
    pushes: AtomicU64,
    jackpots: AtomicU64,
    wagered_milli: AtomicU64,
    paid_milli: AtomicU64,
}

/// Snapshot of one game's counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameStats {
    pub game: GameType,
    pub rounds: u64,
    pub wins: u64,
    pub pushes: u64,
    pub jackpots: u64,
    pub wagered: f64,
    /// Payouts in the bet currency; jackpots pay a different currency and are only counted
    pub paid_out: f64,
}

impl GameStats {
    pub fn rtp(&self) -> f64 {
        if self.wagered <= 0.0 {
            0.0
        } else {
            self.paid_out / self.wagered
        }
    }
}

pub struct EngineMetrics {
    start_time: Instant,
    games: [GameCounters; 5],
    credit_failures: AtomicU64,
    history_failures: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            games: Default::default(),
            credit_failures: AtomicU64::new(0),
            history_failures: AtomicU64::new(0),
        }
    }

    pub fn record_round(&self, result: &RoundResult) {
        let counters = &self.games[result.game.index()];
        counters.rounds.fetch_add(1, Ordering::SeqCst);
        counters
            .wagered_milli
            .fetch_add(to_milli(result.bet.amount), Ordering::SeqCst);

        match result.outcome {
            OutcomeKind::Win => {
                counters.wins.fetch_add(1, Ordering::SeqCst);
            }
            OutcomeKind::Push => {
                counters.pushes.fetch_add(1, Ordering::SeqCst);
            }
            OutcomeKind::Jackpot => {
                counters.jackpots.fetch_add(1, Ordering::SeqCst);
            }
            OutcomeKind::Loss => {}
        }

        if result.payout_currency == result.bet.currency {
            counters
                .paid_milli
                .fetch_add(to_milli(result.payout_amount), Ordering::SeqCst);
        }
    }

    pub fn record_credit_failure(&self) {
        self.credit_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_history_failure(&self) {
        self.history_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn credit_failures(&self) -> u64 {
        self.credit_failures.load(Ordering::SeqCst)
    }

    pub fn history_failures(&self) -> u64 {
        self.history_failures.load(Ordering::SeqCst)
    }

    pub fn game(&self, game: GameType) -> GameStats {
        let c = &self.games[game.index()];
        GameStats {
            game,
            rounds: c.rounds.load(Ordering::SeqCst),
            wins: c.wins.load(Ordering::SeqCst),
            pushes: c.pushes.load(Ordering::SeqCst),
            jackpots: c.jackpots.load(Ordering::SeqCst),
            wagered: from_milli(c.wagered_milli.load(Ordering::SeqCst)),
            paid_out: from_milli(c.paid_milli.load(Ordering::SeqCst)),
        }
    }

    pub fn total_rounds(&self) -> u64 {
        GameType::ALL.iter().map(|g| self.game(*g).rounds).sum()
    }

    pub fn total_runtime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Plain-text table, one line per game that has played
    pub fn snapshot(&self) -> String {
        let mut out = String::new();
        for game in GameType::ALL {
            let s = self.game(game);
            if s.rounds == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "{:<10} rounds={} wins={} pushes={} jackpots={} wagered={:.2} paid={:.2} rtp={:.4}",
                game.to_string(),
                s.rounds,
                s.wins,
                s.pushes,
                s.jackpots,
                s.wagered,
                s.paid_out,
                s.rtp()
            );
        }
        let _ = writeln!(
            out,
            "credit_failures={} history_failures={}",
            self.credit_failures(),
            self.history_failures()
        );
        out
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_milli(amount: f64) -> u64 {
    if amount.is_finite() && amount > 0.0 {
        (amount * AMOUNT_SCALE).round() as u64
    } else {
        0
    }
}

fn from_milli(value: u64) -> f64 {
    value as f64 / AMOUNT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{Bet, Currency, Payout, Resolution, RevealedState, RoundContext};
    use crate::games::wheel::WheelSection;

    fn result(outcome: OutcomeKind, payout: Payout) -> RoundResult {
        let ctx = RoundContext::new("p", GameType::Wheel);
        let bet = Bet::new(10.0, Currency::Coins, GameType::Wheel).unwrap();
        let resolution = Resolution {
            outcome,
            payout,
            multiplier: 0.0,
            revealed: RevealedState::Wheel {
                section: WheelSection::Lose,
            },
            draw: None,
        };
        RoundResult::from_resolution(ctx, bet, resolution, None)
    }

    #[test]
    fn test_counts_and_rtp() {
        let metrics = EngineMetrics::new();
        metrics.record_round(&result(
            OutcomeKind::Win,
            Payout {
                currency: Currency::Coins,
                amount: 20.0,
            },
        ));
        metrics.record_round(&result(OutcomeKind::Loss, Payout::nothing(Currency::Coins)));
        metrics.record_round(&result(
            OutcomeKind::Jackpot,
            Payout {
                currency: Currency::Itlog,
                amount: 33.0,
            },
        ));

        let stats = metrics.game(GameType::Wheel);
        assert_eq!(stats.rounds, 3);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.jackpots, 1);
        assert_eq!(stats.wagered, 30.0);
        assert_eq!(stats.paid_out, 20.0);
        assert_eq!(metrics.total_rounds(), 3);
        assert!(metrics.snapshot().contains("wheel"));
        assert!(!metrics.snapshot().contains("dice"));
    }

    #[test]
    fn test_failure_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_credit_failure();
        metrics.record_history_failure();
        metrics.record_history_failure();
        assert_eq!(metrics.credit_failures(), 1);
        assert_eq!(metrics.history_failures(), 2);
    }
}
