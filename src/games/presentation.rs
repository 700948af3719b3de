//! Cosmetic reveal timing.
//!
//! The round is settled before a presentation starts. The delay only decides
//! when a client is told; cancelling it never changes the outcome.

use crate::games::types::RoundResult;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Presentation {
    result: RoundResult,
    delay: Duration,
    handle: JoinHandle<RoundResult>,
}

impl Presentation {
    /// Spawn the delayed reveal on the current tokio runtime
    pub fn schedule(result: RoundResult, delay: Duration) -> Self {
        let revealed = result.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            revealed
        });
        Self {
            result,
            delay,
            handle,
        }
    }

    /// The settled result, available without waiting
    pub fn result(&self) -> &RoundResult {
        &self.result
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_revealed(&self) -> bool {
        self.handle.is_finished()
    }

    /// Skip the animation
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Wait out the delay. A cancelled presentation resolves at once.
    pub async fn reveal(self) -> RoundResult {
        match self.handle.await {
            Ok(result) => result,
            Err(_) => self.result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::dice::Prediction;
    use crate::games::types::{
        Bet, Currency, GameType, OutcomeKind, Payout, Resolution, RevealedState, RoundContext,
    };
    use std::time::Instant;

    fn result() -> RoundResult {
        let ctx = RoundContext::new("p1", GameType::Dice);
        let bet = Bet::new(10.0, Currency::Coins, GameType::Dice).unwrap();
        let resolution = Resolution {
            outcome: OutcomeKind::Win,
            payout: Payout {
                currency: Currency::Coins,
                amount: 19.8,
            },
            multiplier: 1.98,
            revealed: RevealedState::Dice {
                roll: 70,
                target: 50,
                prediction: Prediction::Over,
            },
            draw: None,
        };
        RoundResult::from_resolution(ctx, bet, resolution, None)
    }

    #[tokio::test]
    async fn test_result_available_before_delay() {
        let presentation = Presentation::schedule(result(), Duration::from_secs(5));
        assert_eq!(presentation.result().payout_amount, 19.8);
        assert!(!presentation.is_revealed());
        presentation.cancel();
    }

    #[tokio::test]
    async fn test_cancel_keeps_outcome() {
        let expected = result();
        let presentation = Presentation::schedule(expected.clone(), Duration::from_secs(30));
        let started = Instant::now();
        presentation.cancel();
        let revealed = presentation.reveal().await;
        assert_eq!(revealed, expected);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_reveal_after_delay() {
        let expected = result();
        let presentation = Presentation::schedule(expected.clone(), Duration::from_millis(10));
        assert_eq!(presentation.delay(), Duration::from_millis(10));
        assert_eq!(presentation.reveal().await, expected);
    }
}
