//! Collaborators a round settles against: balances, history and the activity feed.
//!
//! The engine only sees the traits. In-memory implementations back the CLI,
//! the simulator and the tests.

use crate::config::SettlementConfig;
use crate::errors::{FairdrawError, FairdrawResult, PersistenceError, ValidationError};
use crate::games::types::{Currency, GameType, OutcomeKind, Payout, RoundResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

fn check_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::InvalidAmount { amount });
    }
    Ok(())
}

/// Player balances per currency
#[async_trait]
pub trait BalanceService: Send + Sync {
    async fn read(&self, player_id: &str, currency: Currency) -> FairdrawResult<f64>;

    /// Remove `amount`; fails without side effects when funds are short
    async fn debit(&self, player_id: &str, currency: Currency, amount: f64) -> FairdrawResult<f64>;

    async fn credit(&self, player_id: &str, currency: Currency, amount: f64) -> FairdrawResult<f64>;
}

#[derive(Debug, Default)]
pub struct InMemoryWallet {
    balances: DashMap<(String, Currency), f64>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance directly
    pub fn deposit(&self, player_id: &str, currency: Currency, amount: f64) {
        *self
            .balances
            .entry((player_id.to_string(), currency))
            .or_insert(0.0) += amount;
    }

    pub fn balance(&self, player_id: &str, currency: Currency) -> f64 {
        self.balances
            .get(&(player_id.to_string(), currency))
            .map(|b| *b.value())
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl BalanceService for InMemoryWallet {
    async fn read(&self, player_id: &str, currency: Currency) -> FairdrawResult<f64> {
        Ok(self.balance(player_id, currency))
    }

    async fn debit(&self, player_id: &str, currency: Currency, amount: f64) -> FairdrawResult<f64> {
        check_amount(amount)?;
        let mut entry = self
            .balances
            .entry((player_id.to_string(), currency))
            .or_insert(0.0);
        if *entry < amount {
            return Err(ValidationError::InsufficientBalance {
                needed: amount,
                available: *entry,
                currency,
            }
            .into());
        }
        *entry -= amount;
        Ok(*entry)
    }

    async fn credit(&self, player_id: &str, currency: Currency, amount: f64) -> FairdrawResult<f64> {
        check_amount(amount)?;
        let mut entry = self
            .balances
            .entry((player_id.to_string(), currency))
            .or_insert(0.0);
        *entry += amount;
        Ok(*entry)
    }
}

/// Credit a payout, retrying with exponential backoff.
///
/// Returns the number of attempts used. Empty payouts succeed without touching
/// the balance. Once retries run out the error carries everything needed to
/// pay the player later.
pub async fn credit_with_retry(
    balance: &dyn BalanceService,
    round_id: &str,
    player_id: &str,
    payout: Payout,
    settlement: &SettlementConfig,
) -> Result<u32, PersistenceError> {
    if payout.is_empty() {
        return Ok(0);
    }

    let attempts = settlement.credit_retries.max(1);
    let mut last_error = String::new();
    for attempt in 0..attempts {
        match balance.credit(player_id, payout.currency, payout.amount).await {
            Ok(_) => return Ok(attempt + 1),
            Err(e) => {
                warn!(
                    round_id,
                    player_id,
                    attempt = attempt + 1,
                    "credit failed: {}",
                    e
                );
                last_error = e.to_string();
                // Validation failures will not go away on retry
                if matches!(e, FairdrawError::Validation(_)) {
                    return Err(credit_failed(round_id, player_id, payout, attempt + 1, last_error));
                }
            }
        }
        if attempt + 1 < attempts {
            tokio::time::sleep(settlement.backoff(attempt)).await;
        }
    }

    Err(credit_failed(round_id, player_id, payout, attempts, last_error))
}

fn credit_failed(
    round_id: &str,
    player_id: &str,
    payout: Payout,
    attempts: u32,
    reason: String,
) -> PersistenceError {
    PersistenceError::CreditFailed {
        round_id: round_id.to_string(),
        player: player_id.to_string(),
        currency: payout.currency,
        amount: payout.amount,
        attempts,
        reason,
    }
}

/// Append-only round history. Best effort: a failure never undoes a round.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(&self, result: &RoundResult) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: RwLock<Vec<RoundResult>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<RoundResult> {
        self.entries.read().await.clone()
    }

    pub async fn for_player(&self, player_id: &str) -> Vec<RoundResult> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|r| r.player_id == player_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryLog for InMemoryHistory {
    async fn append(&self, result: &RoundResult) -> Result<(), PersistenceError> {
        self.entries.write().await.push(result.clone());
        Ok(())
    }
}

/// Feed item published after every settled round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub round_id: String,
    pub player_id: String,
    pub game: GameType,
    pub outcome: OutcomeKind,
    pub payout_currency: Currency,
    pub payout_amount: f64,
    pub timestamp: i64,
}

impl From<&RoundResult> for ActivityEvent {
    fn from(result: &RoundResult) -> Self {
        Self {
            round_id: result.round_id.clone(),
            player_id: result.player_id.clone(),
            game: result.game,
            outcome: result.outcome,
            payout_currency: result.payout_currency,
            payout_amount: result.payout_amount,
            timestamp: result.timestamp,
        }
    }
}

/// Fire-and-forget broadcast of finished rounds
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    sender: broadcast::Sender<ActivityEvent>,
}

impl ActivityTracker {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.sender.subscribe()
    }

    /// Never blocks and never fails the round; events are dropped when nobody listens
    pub fn notify(&self, result: &RoundResult) {
        match self.sender.send(ActivityEvent::from(result)) {
            Ok(receivers) => debug!(round_id = %result.round_id, receivers, "activity published"),
            Err(_) => debug!(round_id = %result.round_id, "no activity subscribers"),
        }
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{Bet, Resolution, RevealedState, RoundContext};
    use crate::games::wheel::WheelSection;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` credits
    struct FlakyWallet {
        inner: InMemoryWallet,
        failures: AtomicU32,
    }

    #[async_trait]
    impl BalanceService for FlakyWallet {
        async fn read(&self, player_id: &str, currency: Currency) -> FairdrawResult<f64> {
            self.inner.read(player_id, currency).await
        }

        async fn debit(&self, player_id: &str, currency: Currency, amount: f64) -> FairdrawResult<f64> {
            self.inner.debit(player_id, currency, amount).await
        }

        async fn credit(&self, player_id: &str, currency: Currency, amount: f64) -> FairdrawResult<f64> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(PersistenceError::DebitFailed("backend offline".to_string()).into());
            }
            self.inner.credit(player_id, currency, amount).await
        }
    }

    fn fast_settlement(retries: u32) -> SettlementConfig {
        SettlementConfig {
            credit_retries: retries,
            retry_backoff_ms: 1,
        }
    }

    fn coins(amount: f64) -> Payout {
        Payout {
            currency: Currency::Coins,
            amount,
        }
    }

    #[tokio::test]
    async fn test_debit_and_credit() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("p1", Currency::Coins, 100.0);
        assert_eq!(wallet.debit("p1", Currency::Coins, 40.0).await.unwrap(), 60.0);
        assert_eq!(wallet.credit("p1", Currency::Coins, 15.0).await.unwrap(), 75.0);
        assert_eq!(wallet.read("p1", Currency::Php).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance() {
        let wallet = InMemoryWallet::new();
        wallet.deposit("p1", Currency::Coins, 10.0);
        let err = wallet.debit("p1", Currency::Coins, 50.0).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(wallet.balance("p1", Currency::Coins), 10.0);
    }

    #[tokio::test]
    async fn test_invalid_amounts_rejected() {
        let wallet = InMemoryWallet::new();
        assert!(wallet.credit("p1", Currency::Coins, -1.0).await.is_err());
        assert!(wallet.credit("p1", Currency::Coins, f64::NAN).await.is_err());
        assert!(wallet.debit("p1", Currency::Coins, 0.0).await.is_err());
    }

    #[tokio::test]
    async fn test_credit_retry_recovers() {
        let wallet = FlakyWallet {
            inner: InMemoryWallet::new(),
            failures: AtomicU32::new(2),
        };
        let attempts = credit_with_retry(&wallet, "r1", "p1", coins(20.0), &fast_settlement(3))
            .await
            .unwrap();
        assert_eq!(attempts, 3);
        assert_eq!(wallet.inner.balance("p1", Currency::Coins), 20.0);
    }

    #[tokio::test]
    async fn test_credit_retry_exhausted_reports_owed_payout() {
        let wallet = FlakyWallet {
            inner: InMemoryWallet::new(),
            failures: AtomicU32::new(10),
        };
        let err = credit_with_retry(&wallet, "r1", "p1", coins(20.0), &fast_settlement(2))
            .await
            .unwrap_err();
        match err {
            PersistenceError::CreditFailed {
                round_id,
                amount,
                attempts,
                ..
            } => {
                assert_eq!(round_id, "r1");
                assert_eq!(amount, 20.0);
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_payout_skips_credit() {
        let wallet = InMemoryWallet::new();
        let attempts = credit_with_retry(&wallet, "r1", "p1", coins(0.0), &fast_settlement(3))
            .await
            .unwrap();
        assert_eq!(attempts, 0);
    }

    #[tokio::test]
    async fn test_history_and_activity() {
        let history = InMemoryHistory::new();
        let tracker = ActivityTracker::new(8);
        let mut rx = tracker.subscribe();

        let ctx = RoundContext::new("p1", GameType::Wheel);
        let bet = Bet::new(10.0, Currency::Coins, GameType::Wheel).unwrap();
        let resolution = Resolution {
            outcome: OutcomeKind::Loss,
            payout: Payout::nothing(Currency::Coins),
            multiplier: 0.0,
            revealed: RevealedState::Wheel {
                section: WheelSection::Lose,
            },
            draw: None,
        };
        let result = RoundResult::from_resolution(ctx, bet, resolution, None);

        history.append(&result).await.unwrap();
        tracker.notify(&result);

        assert_eq!(history.for_player("p1").await.len(), 1);
        assert!(history.for_player("p2").await.is_empty());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.round_id, result.round_id);
        assert_eq!(event.outcome, OutcomeKind::Loss);
    }

    #[test]
    fn test_notify_without_subscribers_is_silent() {
        let tracker = ActivityTracker::default();
        let ctx = RoundContext::new("p1", GameType::Dice);
        let bet = Bet::new(1.0, Currency::Coins, GameType::Dice).unwrap();
        let resolution = Resolution {
            outcome: OutcomeKind::Loss,
            payout: Payout::nothing(Currency::Coins),
            multiplier: 0.0,
            revealed: RevealedState::Wheel {
                section: WheelSection::Lose,
            },
            draw: None,
        };
        tracker.notify(&RoundResult::from_resolution(ctx, bet, resolution, None));
    }
}
