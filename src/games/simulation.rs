//! Return-to-player simulation over seeded rounds.
//!
//! Each round draws from its own `SeededSource` (same server and client seed,
//! nonce = round index), so a report can be reproduced exactly from its inputs.

use crate::config::EngineConfig;
use crate::errors::{FairdrawResult, ValidationError};
use crate::games::blackjack::{BlackjackHand, Stage};
use crate::games::dice::{resolve_dice, DiceParams, Prediction};
use crate::games::fairness::FairSeed;
use crate::games::luck::LuckBoost;
use crate::games::mines::{Board, MinesRound, RevealOutcome, BOARD_SIZE};
use crate::games::random::SeededSource;
use crate::games::reels::{self, resolve_reels};
use crate::games::types::{Bet, Currency, GameType, OutcomeKind, Resolution};
use crate::games::wheel::{self, resolve_wheel};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Game plus the fixed strategy used to play it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SimulatedGame {
    Reels,
    Wheel,
    Dice { target: u8, prediction: Prediction },
    /// Reveal cells in board order and cash out after `reveals` safe tiles
    Mines { mines: usize, reveals: usize },
    /// Hit until the hand reaches `stand_at`
    Blackjack { stand_at: u8 },
}

impl SimulatedGame {
    pub fn game_type(&self) -> GameType {
        match self {
            SimulatedGame::Reels => GameType::Reels,
            SimulatedGame::Wheel => GameType::Wheel,
            SimulatedGame::Dice { .. } => GameType::Dice,
            SimulatedGame::Mines { .. } => GameType::Mines,
            SimulatedGame::Blackjack { .. } => GameType::Blackjack,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub game: SimulatedGame,
    pub rounds: u64,
    pub bet_amount: f64,
    pub boost: f64,
    pub server_seed: String,
    pub client_seed: String,
}

impl SimulationConfig {
    pub fn new(game: SimulatedGame, rounds: u64) -> Self {
        Self {
            game,
            rounds,
            bet_amount: 1.0,
            boost: 1.0,
            server_seed: "simulation".to_string(),
            client_seed: "fairdraw".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub game: GameType,
    pub rounds: u64,
    pub total_bet: f64,
    /// Paid in the bet currency
    pub total_payout: f64,
    pub rtp: f64,
    pub win_rate: f64,
    pub pushes: u64,
    pub jackpot_count: u64,
    /// Paid in the jackpot currency, kept apart from `total_payout`
    pub jackpot_payout: f64,
    pub execution_time: Duration,
}

/// Play `config.rounds` rounds with the engine's tables and jackpot rules
pub fn simulate(config: &SimulationConfig, engine: &EngineConfig) -> FairdrawResult<SimulationReport> {
    let started = Instant::now();
    let game = config.game.game_type();
    let bet = Bet::new(config.bet_amount, Currency::Coins, game)?;
    let boost = LuckBoost::new(config.boost)?;

    let reels_table = reels::table()?;
    let wheel_table = wheel::table()?;

    let mut total_payout = 0.0;
    let mut jackpot_payout = 0.0;
    let (mut wins, mut pushes, mut jackpots) = (0u64, 0u64, 0u64);

    for nonce in 0..config.rounds {
        let seed = FairSeed::new(&config.server_seed, &config.client_seed, nonce)?;
        let mut source = SeededSource::new(seed);

        let resolution: Resolution = match config.game {
            SimulatedGame::Reels => resolve_reels(
                &mut source,
                boost,
                &bet,
                &reels_table,
                &engine.jackpots.reels,
            ),
            SimulatedGame::Wheel => resolve_wheel(
                &mut source,
                boost,
                &bet,
                &wheel_table,
                &engine.jackpots.wheel,
            ),
            SimulatedGame::Dice { target, prediction } => {
                let params = DiceParams::from_parts(
                    Some(target),
                    Some(prediction),
                    engine.dice.min_target,
                    engine.dice.max_target,
                )?;
                resolve_dice(&mut source, boost, &bet, &params)?
            }
            SimulatedGame::Mines { mines, reveals } => {
                let board = Board::generate(&mut source, mines, boost, engine.mines.jackpot_chance)?;
                play_mines(MinesRound::new(board), reveals, &bet, engine)?
            }
            SimulatedGame::Blackjack { stand_at } => {
                let hand = BlackjackHand::deal(&mut source, engine.blackjack.dealer_stands_on)?;
                play_blackjack(hand, stand_at, &bet)?
            }
        };

        match resolution.outcome {
            OutcomeKind::Win => wins += 1,
            OutcomeKind::Push => pushes += 1,
            OutcomeKind::Jackpot => jackpots += 1,
            OutcomeKind::Loss => {}
        }
        if resolution.payout.currency == bet.currency {
            total_payout += resolution.payout.amount;
        } else {
            jackpot_payout += resolution.payout.amount;
        }
    }

    let rounds = config.rounds;
    let total_bet = bet.amount * rounds as f64;
    let report = SimulationReport {
        game,
        rounds,
        total_bet,
        total_payout,
        rtp: if total_bet > 0.0 { total_payout / total_bet } else { 0.0 },
        win_rate: if rounds > 0 { wins as f64 / rounds as f64 } else { 0.0 },
        pushes,
        jackpot_count: jackpots,
        jackpot_payout,
        execution_time: started.elapsed(),
    };
    info!(
        game = %report.game,
        rounds,
        rtp = report.rtp,
        jackpots,
        "simulation finished"
    );
    Ok(report)
}

fn play_mines(
    mut round: MinesRound,
    reveals: usize,
    bet: &Bet,
    engine: &EngineConfig,
) -> FairdrawResult<Resolution> {
    for cell in 0..BOARD_SIZE {
        if round.revealed_safe() >= reveals {
            break;
        }
        if !matches!(round.reveal(cell)?, RevealOutcome::Safe { .. }) {
            break;
        }
    }
    if !round.state().is_terminal() {
        round.cash_out()?;
    }
    round
        .resolution(bet, &engine.jackpots.mines)
        .ok_or_else(|| ValidationError::RoundFinished.into())
}

fn play_blackjack(mut hand: BlackjackHand, stand_at: u8, bet: &Bet) -> FairdrawResult<Resolution> {
    while hand.stage() == Stage::PlayerTurn && hand.player_total() < stand_at {
        hand.hit()?;
    }
    if hand.stage() == Stage::PlayerTurn {
        hand.stand()?;
    }
    hand.resolution(bet)
        .ok_or_else(|| ValidationError::RoundFinished.into())
}
