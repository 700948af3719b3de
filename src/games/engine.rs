//! Round orchestration.
//!
//! Every round follows the same path: validate, debit the stake, read the
//! player's luck boost, draw, resolve, credit the payout, then record history
//! and publish activity. Mines and blackjack split that path across several
//! calls and park the live round in a [`SessionPool`] slot in between.

use crate::config::EngineConfig;
use crate::errors::{FairdrawError, FairdrawResult, PersistenceError, ValidationError};
use crate::games::blackjack::{BlackjackHand, HandView};
use crate::games::dice::{resolve_dice, DiceParams, Prediction};
use crate::games::fairness::SeedTrace;
use crate::games::luck::{LuckBoost, LuckProvider, NoLuck};
use crate::games::mines::{validate_mine_count, Board, CellView, MinesRound, RevealOutcome};
use crate::games::presentation::Presentation;
use crate::games::random::{RandomSource, SourceProvider, ThreadSourceProvider};
use crate::games::reels::{self, resolve_reels, Combination};
use crate::games::sessions::{BlackjackSession, MinesSession, Session, SessionPool};
use crate::games::table::OutcomeTable;
use crate::games::types::{Bet, GameType, Payout, Resolution, RoundContext, RoundResult};
use crate::games::wallet::{credit_with_retry, ActivityTracker, BalanceService, HistoryLog};
use crate::games::wheel::{self, resolve_wheel, WheelSection};
use crate::metrics::EngineMetrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type BoxedSource = Box<dyn RandomSource + Send>;

/// State returned when a mines board is created
#[derive(Debug, Clone, Serialize)]
pub struct MinesStart {
    pub round_id: String,
    pub mine_count: usize,
    pub cells: Vec<CellView>,
    pub multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedTrace>,
}

#[derive(Debug, Clone)]
pub enum MinesMove {
    /// Safe tile; the round continues
    Continue {
        outcome: RevealOutcome,
        multiplier: f64,
        cells: Vec<CellView>,
    },
    Finished(RoundResult),
}

#[derive(Debug, Clone)]
pub enum BlackjackMove {
    InPlay(HandView),
    Finished(RoundResult),
}

impl BlackjackMove {
    pub fn finished(&self) -> Option<&RoundResult> {
        match self {
            BlackjackMove::Finished(result) => Some(result),
            BlackjackMove::InPlay(_) => None,
        }
    }
}

pub struct GameEngine {
    config: EngineConfig,
    balance: Arc<dyn BalanceService>,
    history: Arc<dyn HistoryLog>,
    activity: ActivityTracker,
    luck: Arc<dyn LuckProvider>,
    sources: Arc<dyn SourceProvider>,
    sessions: SessionPool,
    metrics: Arc<EngineMetrics>,
    reels_table: OutcomeTable<Combination>,
    wheel_table: OutcomeTable<WheelSection>,
}

impl GameEngine {
    /// Validates the configuration and builds the outcome tables up front
    pub fn new(
        config: EngineConfig,
        balance: Arc<dyn BalanceService>,
        history: Arc<dyn HistoryLog>,
    ) -> FairdrawResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            balance,
            history,
            activity: ActivityTracker::default(),
            luck: Arc::new(NoLuck),
            sources: Arc::new(ThreadSourceProvider),
            sessions: SessionPool::new(),
            metrics: Arc::new(EngineMetrics::new()),
            reels_table: reels::table()?,
            wheel_table: wheel::table()?,
        })
    }

    pub fn with_luck(mut self, luck: Arc<dyn LuckProvider>) -> Self {
        self.luck = luck;
        self
    }

    pub fn with_sources(mut self, sources: Arc<dyn SourceProvider>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_activity(mut self, activity: ActivityTracker) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn has_active_session(&self, player_id: &str, game: GameType) -> bool {
        self.sessions.is_active(player_id, game)
    }

    /// Schedule the cosmetic reveal for a finished round
    pub fn present(&self, result: RoundResult) -> Presentation {
        let delay = self.config.presentation.delay_for(result.game);
        Presentation::schedule(result, delay)
    }

    pub async fn play_reels(&self, player_id: &str, bet: Bet) -> FairdrawResult<RoundResult> {
        let table = &self.reels_table;
        let jackpot = &self.config.jackpots.reels;
        self.play_stateless(player_id, bet, GameType::Reels, |source, boost| {
            Ok(resolve_reels(source, boost, &bet, table, jackpot))
        })
        .await
    }

    pub async fn play_wheel(&self, player_id: &str, bet: Bet) -> FairdrawResult<RoundResult> {
        let table = &self.wheel_table;
        let jackpot = &self.config.jackpots.wheel;
        self.play_stateless(player_id, bet, GameType::Wheel, |source, boost| {
            Ok(resolve_wheel(source, boost, &bet, table, jackpot))
        })
        .await
    }

    /// Both settings are required; a missing one declines the bet before any debit.
    pub async fn play_dice(
        &self,
        player_id: &str,
        bet: Bet,
        target: Option<u8>,
        prediction: Option<Prediction>,
    ) -> FairdrawResult<RoundResult> {
        let params = DiceParams::from_parts(
            target,
            prediction,
            self.config.dice.min_target,
            self.config.dice.max_target,
        )?;
        self.play_stateless(player_id, bet, GameType::Dice, |source, boost| {
            Ok(resolve_dice(source, boost, &bet, &params)?)
        })
        .await
    }

    async fn play_stateless<F>(
        &self,
        player_id: &str,
        bet: Bet,
        game: GameType,
        resolve: F,
    ) -> FairdrawResult<RoundResult>
    where
        F: FnOnce(&mut (dyn RandomSource + Send), LuckBoost) -> FairdrawResult<Resolution> + Send,
    {
        check_bet(&bet, game)?;
        let ctx = RoundContext::new(player_id, game);
        self.debit(&ctx, &bet).await?;

        let boost = self.luck.current_boost(player_id).await;
        let mut source = match self.sources.source_for(&ctx) {
            Ok(source) => source,
            Err(e) => {
                self.refund(&ctx, &bet).await;
                return Err(e);
            }
        };
        let seed = source.trace();

        let resolution = match resolve(source.as_mut(), boost) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.refund(&ctx, &bet).await;
                return Err(e);
            }
        };
        debug!(round_id = %ctx.round_id, %game, draw = ?resolution.draw, "round drawn");

        self.settle(ctx, bet, resolution, seed).await
    }

    /// Debit the stake and lay out a new board. `mines` falls back to the configured default.
    pub async fn start_mines(
        &self,
        player_id: &str,
        bet: Bet,
        mines: Option<usize>,
    ) -> FairdrawResult<MinesStart> {
        check_bet(&bet, GameType::Mines)?;
        let cfg = &self.config.mines;
        let mine_count = mines.unwrap_or(cfg.default_mines);
        validate_mine_count(mine_count, cfg.min_mines, cfg.max_mines)?;

        self.sessions.reserve(player_id, GameType::Mines)?;
        let ctx = RoundContext::new(player_id, GameType::Mines);
        if let Err(e) = self.debit(&ctx, &bet).await {
            self.sessions.release(player_id, GameType::Mines);
            return Err(e);
        }

        let boost = self.luck.current_boost(player_id).await;
        let board = self.open_source(&ctx).and_then(|mut source| {
            let seed = source.trace();
            let board = Board::generate(source.as_mut(), mine_count, boost, cfg.jackpot_chance)?;
            Ok((board, seed))
        });
        let (board, seed) = match board {
            Ok(generated) => generated,
            Err(e) => {
                self.sessions.release(player_id, GameType::Mines);
                self.refund(&ctx, &bet).await;
                return Err(e);
            }
        };
        debug!(
            round_id = %ctx.round_id,
            requested = mine_count,
            placed = board.mine_count(),
            boost = boost.value(),
            "mines board generated"
        );

        let round = MinesRound::new(board);
        let start = MinesStart {
            round_id: ctx.round_id.clone(),
            mine_count,
            cells: round.view(),
            multiplier: round.multiplier(),
            seed: seed.clone(),
        };
        self.sessions.activate(
            player_id,
            GameType::Mines,
            Session::Mines(MinesSession {
                ctx,
                bet,
                round,
                seed,
            }),
        );
        Ok(start)
    }

    pub async fn reveal_mines(&self, player_id: &str, cell: usize) -> FairdrawResult<MinesMove> {
        let (outcome, finished, multiplier, cells) = self.sessions.with_mines(player_id, |s| {
            s.round.reveal(cell).map(|outcome| {
                (
                    outcome,
                    s.round.state().is_terminal(),
                    s.round.multiplier(),
                    s.round.view(),
                )
            })
        })??;

        if finished {
            return Ok(MinesMove::Finished(self.finish_mines(player_id).await?));
        }
        Ok(MinesMove::Continue {
            outcome,
            multiplier,
            cells,
        })
    }

    pub async fn cash_out_mines(&self, player_id: &str) -> FairdrawResult<RoundResult> {
        self.sessions.with_mines(player_id, |s| s.round.cash_out())??;
        self.finish_mines(player_id).await
    }

    async fn finish_mines(&self, player_id: &str) -> FairdrawResult<RoundResult> {
        let session = match self.sessions.release(player_id, GameType::Mines) {
            Some(Session::Mines(session)) => session,
            Some(other) => {
                self.sessions.activate(player_id, GameType::Mines, other);
                return Err(no_session(GameType::Mines).into());
            }
            None => return Err(no_session(GameType::Mines).into()),
        };
        let resolution = session
            .round
            .resolution(&session.bet, &self.config.jackpots.mines)
            .ok_or_else(|| no_session(GameType::Mines))?;
        self.settle(session.ctx, session.bet, resolution, session.seed)
            .await
    }

    /// Debit, shuffle and deal. Naturals settle immediately.
    pub async fn deal_blackjack(&self, player_id: &str, bet: Bet) -> FairdrawResult<BlackjackMove> {
        check_bet(&bet, GameType::Blackjack)?;
        self.sessions.reserve(player_id, GameType::Blackjack)?;
        let ctx = RoundContext::new(player_id, GameType::Blackjack);
        if let Err(e) = self.debit(&ctx, &bet).await {
            self.sessions.release(player_id, GameType::Blackjack);
            return Err(e);
        }

        let stands_on = self.config.blackjack.dealer_stands_on;
        let dealt = self.open_source(&ctx).and_then(|mut source| {
            let seed = source.trace();
            let hand = BlackjackHand::deal(source.as_mut(), stands_on)?;
            Ok((hand, seed))
        });
        let (hand, seed) = match dealt {
            Ok(dealt) => dealt,
            Err(e) => {
                self.sessions.release(player_id, GameType::Blackjack);
                self.refund(&ctx, &bet).await;
                return Err(e);
            }
        };

        if let Some(resolution) = hand.resolution(&bet) {
            self.sessions.release(player_id, GameType::Blackjack);
            let result = self.settle(ctx, bet, resolution, seed).await?;
            return Ok(BlackjackMove::Finished(result));
        }

        let view = hand.view();
        self.sessions.activate(
            player_id,
            GameType::Blackjack,
            Session::Blackjack(BlackjackSession {
                ctx,
                bet,
                hand,
                seed,
            }),
        );
        Ok(BlackjackMove::InPlay(view))
    }

    pub async fn hit(&self, player_id: &str) -> FairdrawResult<BlackjackMove> {
        let (resolved, view) = self.sessions.with_blackjack(player_id, |s| {
            s.hand.hit().map(|_| (s.hand.is_resolved(), s.hand.view()))
        })??;
        if resolved {
            return Ok(BlackjackMove::Finished(self.finish_blackjack(player_id).await?));
        }
        Ok(BlackjackMove::InPlay(view))
    }

    pub async fn stand(&self, player_id: &str) -> FairdrawResult<RoundResult> {
        self.sessions
            .with_blackjack(player_id, |s| s.hand.stand())??;
        self.finish_blackjack(player_id).await
    }

    async fn finish_blackjack(&self, player_id: &str) -> FairdrawResult<RoundResult> {
        let session = match self.sessions.release(player_id, GameType::Blackjack) {
            Some(Session::Blackjack(session)) => session,
            Some(other) => {
                self.sessions.activate(player_id, GameType::Blackjack, other);
                return Err(no_session(GameType::Blackjack).into());
            }
            None => return Err(no_session(GameType::Blackjack).into()),
        };
        let resolution = session
            .hand
            .resolution(&session.bet)
            .ok_or_else(|| no_session(GameType::Blackjack))?;
        self.settle(session.ctx, session.bet, resolution, session.seed)
            .await
    }

    fn open_source(&self, ctx: &RoundContext) -> FairdrawResult<BoxedSource> {
        self.sources.source_for(ctx)
    }

    async fn debit(&self, ctx: &RoundContext, bet: &Bet) -> FairdrawResult<()> {
        let remaining = self
            .balance
            .debit(&ctx.player_id, bet.currency, bet.amount)
            .await?;
        debug!(
            round_id = %ctx.round_id,
            player_id = %ctx.player_id,
            amount = bet.amount,
            currency = %bet.currency,
            remaining,
            "stake debited"
        );
        Ok(())
    }

    /// Return the stake of a round that could not be drawn
    async fn refund(&self, ctx: &RoundContext, bet: &Bet) {
        let stake = Payout {
            currency: bet.currency,
            amount: bet.amount,
        };
        if let Err(e) = credit_with_retry(
            self.balance.as_ref(),
            &ctx.round_id,
            &ctx.player_id,
            stake,
            &self.config.settlement,
        )
        .await
        {
            self.metrics.record_credit_failure();
            error!(round_id = %ctx.round_id, "stake refund failed: {}", e);
        }
    }

    /// Credit, record and publish a resolved round
    async fn settle(
        &self,
        ctx: RoundContext,
        bet: Bet,
        resolution: Resolution,
        seed: Option<SeedTrace>,
    ) -> FairdrawResult<RoundResult> {
        let result = RoundResult::from_resolution(ctx, bet, resolution, seed);

        if let Err(e) = credit_with_retry(
            self.balance.as_ref(),
            &result.round_id,
            &result.player_id,
            result.payout(),
            &self.config.settlement,
        )
        .await
        {
            self.metrics.record_credit_failure();
            error!(
                round_id = %result.round_id,
                player_id = %result.player_id,
                amount = result.payout_amount,
                currency = %result.payout_currency,
                "payout owed after credit retries ran out"
            );
            // Keep a record of the owed round even though the credit failed
            self.append_history(&result).await;
            return Err(e.into());
        }

        self.append_history(&result).await;
        self.activity.notify(&result);
        self.metrics.record_round(&result);

        info!(
            round_id = %result.round_id,
            player_id = %result.player_id,
            game = %result.game,
            outcome = %result.outcome,
            payout = result.payout_amount,
            currency = %result.payout_currency,
            "round settled"
        );
        Ok(result)
    }

    async fn append_history(&self, result: &RoundResult) {
        if let Err(e) = self.history.append(result).await {
            self.metrics.record_history_failure();
            warn!(round_id = %result.round_id, "history append failed: {}", e);
        }
    }
}

fn check_bet(bet: &Bet, game: GameType) -> Result<(), ValidationError> {
    if bet.game != game {
        return Err(ValidationError::GameMismatch {
            expected: game,
            actual: bet.game,
        });
    }
    bet.validate()
}

fn no_session(game: GameType) -> ValidationError {
    ValidationError::NoActiveSession { game }
}

/// Surface an owed payout carried by a failed settlement
pub fn owed_payout(err: &FairdrawError) -> Option<Payout> {
    match err {
        FairdrawError::Persistence(PersistenceError::CreditFailed {
            currency,
            amount,
            ..
        }) => Some(Payout {
            currency: *currency,
            amount: *amount,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::luck::BoostRegistry;
    use crate::games::random::ScriptedSource;
    use crate::games::types::{Currency, OutcomeKind};
    use crate::games::wallet::{InMemoryHistory, InMemoryWallet};

    fn engine_with(draws: Vec<f64>) -> (GameEngine, Arc<InMemoryWallet>, Arc<InMemoryHistory>) {
        let wallet = Arc::new(InMemoryWallet::new());
        wallet.deposit("p1", Currency::Coins, 1000.0);
        let history = Arc::new(InMemoryHistory::new());
        let provider = move |_: &RoundContext| -> Box<dyn RandomSource + Send> {
            Box::new(ScriptedSource::new(draws.clone()))
        };
        let engine = GameEngine::new(EngineConfig::simulation(), wallet.clone(), history.clone())
            .unwrap()
            .with_sources(Arc::new(provider));
        (engine, wallet, history)
    }

    fn bet(amount: f64, game: GameType) -> Bet {
        Bet::new(amount, Currency::Coins, game).unwrap()
    }

    #[tokio::test]
    async fn test_dice_round_settles() {
        let (engine, wallet, history) = engine_with(vec![0.60]);
        let result = engine
            .play_dice("p1", bet(100.0, GameType::Dice), Some(50), Some(Prediction::Over))
            .await
            .unwrap();
        assert_eq!(result.outcome, OutcomeKind::Win);
        assert!((result.payout_amount - 198.0).abs() < 1e-9);
        assert!((wallet.balance("p1", Currency::Coins) - 1098.0).abs() < 1e-9);
        assert_eq!(history.len().await, 1);
        assert_eq!(engine.metrics().game(GameType::Dice).rounds, 1);
    }

    #[tokio::test]
    async fn test_missing_dice_setting_declines_before_debit() {
        let (engine, wallet, history) = engine_with(vec![0.5]);
        let err = engine
            .play_dice("p1", bet(10.0, GameType::Dice), None, Some(Prediction::Under))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(wallet.balance("p1", Currency::Coins), 1000.0);
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn test_insufficient_balance_declines() {
        let (engine, wallet, _) = engine_with(vec![0.5]);
        let err = engine
            .play_wheel("p1", bet(5000.0, GameType::Wheel))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(wallet.balance("p1", Currency::Coins), 1000.0);
    }

    #[tokio::test]
    async fn test_game_mismatch_rejected() {
        let (engine, _, _) = engine_with(vec![0.5]);
        let err = engine
            .play_reels("p1", bet(10.0, GameType::Wheel))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_wheel_jackpot_credits_itlog() {
        let (engine, wallet, _) = engine_with(vec![0.001]);
        let result = engine.play_wheel("p1", bet(100.0, GameType::Wheel)).await.unwrap();
        assert_eq!(result.outcome, OutcomeKind::Jackpot);
        assert_eq!(wallet.balance("p1", Currency::Coins), 900.0);
        assert!((wallet.balance("p1", Currency::Itlog) - 33.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_boost_read_per_round() {
        let (engine, _, _) = engine_with(vec![0.5]);
        let registry = Arc::new(BoostRegistry::new());
        let engine = engine.with_luck(registry.clone());

        let plain = engine.play_wheel("p1", bet(10.0, GameType::Wheel)).await.unwrap();
        assert_eq!(plain.outcome, OutcomeKind::Loss);

        registry.set("p1", 1.5);
        let boosted = engine.play_wheel("p1", bet(10.0, GameType::Wheel)).await.unwrap();
        assert_eq!(boosted.outcome, OutcomeKind::Push);
        assert_eq!(boosted.draw.map(|d| d.boost), Some(1.5));
    }

    #[tokio::test]
    async fn test_second_mines_start_rejected() {
        let (engine, wallet, _) = engine_with(vec![0.3]);
        engine
            .start_mines("p1", bet(10.0, GameType::Mines), Some(3))
            .await
            .unwrap();
        let err = engine
            .start_mines("p1", bet(10.0, GameType::Mines), Some(3))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(wallet.balance("p1", Currency::Coins), 990.0);
    }

    #[tokio::test]
    async fn test_mines_cash_out_without_reveals_returns_stake() {
        let (engine, wallet, _) = engine_with(vec![0.3]);
        engine
            .start_mines("p1", bet(25.0, GameType::Mines), Some(4))
            .await
            .unwrap();
        let result = engine.cash_out_mines("p1").await.unwrap();
        assert_eq!(result.resolved_multiplier, 1.0);
        assert_eq!(wallet.balance("p1", Currency::Coins), 1000.0);
        assert!(!engine.has_active_session("p1", GameType::Mines));
        assert!(engine.cash_out_mines("p1").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_debit_releases_slot() {
        let (engine, _, _) = engine_with(vec![0.3]);
        assert!(engine
            .start_mines("p1", bet(5000.0, GameType::Mines), Some(3))
            .await
            .is_err());
        assert!(!engine.has_active_session("p1", GameType::Mines));
    }

    #[tokio::test]
    async fn test_blackjack_without_session() {
        let (engine, _, _) = engine_with(vec![0.3]);
        assert!(engine.hit("p1").await.unwrap_err().is_validation());
        assert!(engine.stand("p1").await.unwrap_err().is_validation());
    }

    #[test]
    fn test_owed_payout_extraction() {
        let err: FairdrawError = PersistenceError::CreditFailed {
            round_id: "r".to_string(),
            player: "p".to_string(),
            currency: Currency::Php,
            amount: 12.0,
            attempts: 3,
            reason: "down".to_string(),
        }
        .into();
        assert_eq!(
            owed_payout(&err),
            Some(Payout {
                currency: Currency::Php,
                amount: 12.0
            })
        );
    }
}
