//! fairdraw - provably-fair outcome engine CLI
//!
//! Simulates return-to-player, replays seeded rounds for verification, prints
//! outcome tables and manages the engine configuration.

use clap::{Parser, Subcommand, ValueEnum};
use fairdraw::config::generate_sample_config;
use fairdraw::errors::ConfigurationError;
use fairdraw::games::blackjack::{BlackjackHand, Card};
use fairdraw::games::dice::{resolve_dice, DiceParams, Prediction};
use fairdraw::games::fairness::{commitment, verify_commitment, FairSeed, SeedChain};
use fairdraw::games::mines::Board;
use fairdraw::games::reels::{self, resolve_reels};
use fairdraw::games::simulation::{simulate, SimulatedGame, SimulationConfig, SimulationReport};
use fairdraw::games::table::OutcomeTable;
use fairdraw::games::wheel::{self, resolve_wheel};
use fairdraw::games::{
    Bet, BlackjackMove, Currency, GameType, InMemoryHistory, InMemoryWallet, LuckBoost, MinesMove,
    RoundResult, SeededSource,
};
use fairdraw::{ConfigLoader, EngineConfig, FairdrawResult, GameEngine};
use serde::Serialize;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fairdraw")]
#[command(about = "Provably-fair outcome engine for mines, reels, wheel, dice and blackjack")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate return-to-player over many seeded rounds
    Simulate {
        #[arg(value_enum)]
        game: GameArg,

        #[arg(short = 'n', long, default_value = "100000")]
        rounds: u64,

        #[arg(short, long, default_value = "1.0")]
        bet: f64,

        /// Luck boost applied to every round (>= 1.0)
        #[arg(long, default_value = "1.0")]
        boost: f64,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[arg(long, default_value = "simulation")]
        server_seed: String,

        #[arg(long, default_value = "fairdraw")]
        client_seed: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a revealed server seed and replay the round it produced
    Verify {
        #[arg(value_enum)]
        game: GameArg,

        #[arg(long)]
        server_seed: String,

        /// Commitment published before the round
        #[arg(long)]
        commitment: Option<String>,

        #[arg(long)]
        client_seed: String,

        #[arg(long, default_value = "0")]
        nonce: u64,

        #[arg(short, long, default_value = "1.0")]
        bet: f64,

        /// Luck boost recorded for the round
        #[arg(long, default_value = "1.0")]
        boost: f64,

        #[command(flatten)]
        strategy: StrategyArgs,
    },

    /// Print the reels and wheel outcome tables
    Tables,

    /// Print the effective configuration or write a sample file
    Config {
        /// Write the default configuration to this path instead of printing
        #[arg(long)]
        generate: Option<PathBuf>,
    },

    /// Play a short session against an in-memory wallet
    Demo {
        #[arg(short = 'n', long, default_value = "10")]
        rounds: u64,

        #[arg(long, default_value = "demo-player")]
        player: String,

        #[arg(long, default_value = "1000.0")]
        deposit: f64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GameArg {
    Mines,
    Reels,
    Wheel,
    Dice,
    Blackjack,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PredictionArg {
    Over,
    Under,
}

impl From<PredictionArg> for Prediction {
    fn from(arg: PredictionArg) -> Self {
        match arg {
            PredictionArg::Over => Prediction::Over,
            PredictionArg::Under => Prediction::Under,
        }
    }
}

/// Per-game settings shared by `simulate` and `verify`
#[derive(clap::Args, Clone, Copy, Debug)]
struct StrategyArgs {
    /// Dice target number
    #[arg(long, default_value = "50")]
    target: u8,

    #[arg(long, value_enum, default_value = "over")]
    prediction: PredictionArg,

    /// Mines on the board
    #[arg(long, default_value = "3")]
    mines: usize,

    /// Safe tiles to reveal before cashing out
    #[arg(long, default_value = "3")]
    reveals: usize,

    /// Blackjack: hit until the hand reaches this total
    #[arg(long, default_value = "17")]
    stand_at: u8,
}

impl StrategyArgs {
    fn game(&self, game: GameArg) -> SimulatedGame {
        match game {
            GameArg::Reels => SimulatedGame::Reels,
            GameArg::Wheel => SimulatedGame::Wheel,
            GameArg::Dice => SimulatedGame::Dice {
                target: self.target,
                prediction: self.prediction.into(),
            },
            GameArg::Mines => SimulatedGame::Mines {
                mines: self.mines,
                reveals: self.reveals,
            },
            GameArg::Blackjack => SimulatedGame::Blackjack {
                stand_at: self.stand_at,
            },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "fairdraw=debug" } else { "fairdraw=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> FairdrawResult<()> {
    let mut loader = ConfigLoader::new();
    if let Some(ref path) = cli.config {
        loader = loader.with_path(path);
    }

    match cli.command {
        Commands::Simulate {
            game,
            rounds,
            bet,
            boost,
            strategy,
            server_seed,
            client_seed,
            json,
        } => {
            let engine = loader.load()?;
            let config = SimulationConfig {
                game: strategy.game(game),
                rounds,
                bet_amount: bet,
                boost,
                server_seed,
                client_seed,
            };
            let report = simulate(&config, &engine)?;
            if json {
                print_json(&report)?;
            } else {
                print_report(&report);
            }
        }
        Commands::Verify {
            game,
            server_seed,
            commitment: published,
            client_seed,
            nonce,
            bet,
            boost,
            strategy,
        } => {
            let engine = loader.load()?;
            match published {
                Some(ref published) => {
                    verify_commitment(&server_seed, published)?;
                    println!("Commitment OK: {}", commitment(&server_seed));
                }
                None => println!("Commitment: {}", commitment(&server_seed)),
            }
            let seed = FairSeed::new(&server_seed, &client_seed, nonce)?;
            replay(strategy.game(game), seed, bet, boost, &engine)?;
        }
        Commands::Tables => {
            print_table("Reels", &reels::table()?);
            println!();
            print_table("Wheel", &wheel::table()?);
        }
        Commands::Config { generate } => match generate {
            Some(path) => {
                generate_sample_config(&path.to_string_lossy())?;
                println!("Sample configuration written to {}", path.display());
            }
            None => {
                let engine = loader.load()?;
                let text = toml::to_string_pretty(&engine)
                    .map_err(|e| ConfigurationError::SaveFailed(e.to_string()))?;
                print!("{}", text);
            }
        },
        Commands::Demo {
            rounds,
            player,
            deposit,
        } => {
            let engine = loader.load()?;
            demo(engine, rounds, &player, deposit).await?;
        }
    }
    Ok(())
}

/// Replay one round from its seed triple and print what it resolved to
fn replay(
    game: SimulatedGame,
    seed: FairSeed,
    bet_amount: f64,
    boost: f64,
    engine: &EngineConfig,
) -> FairdrawResult<()> {
    let bet = Bet::new(bet_amount, Currency::Coins, game.game_type())?;
    let boost = LuckBoost::new(boost)?;
    let mut source = SeededSource::new(seed);

    match game {
        SimulatedGame::Reels => {
            let resolution = resolve_reels(
                &mut source,
                boost,
                &bet,
                &reels::table()?,
                &engine.jackpots.reels,
            );
            print_json(&resolution)?;
        }
        SimulatedGame::Wheel => {
            let resolution = resolve_wheel(
                &mut source,
                boost,
                &bet,
                &wheel::table()?,
                &engine.jackpots.wheel,
            );
            print_json(&resolution)?;
        }
        SimulatedGame::Dice { target, prediction } => {
            let params = DiceParams::from_parts(
                Some(target),
                Some(prediction),
                engine.dice.min_target,
                engine.dice.max_target,
            )?;
            print_json(&resolve_dice(&mut source, boost, &bet, &params)?)?;
        }
        SimulatedGame::Mines { mines, .. } => {
            let board = Board::generate(&mut source, mines, boost, engine.mines.jackpot_chance)?;
            println!("Mines ({} placed): {:?}", board.mine_count(), board.mine_positions());
            match board.jackpot_position() {
                Some(cell) => println!("Jackpot tile: {}", cell),
                None => println!("Jackpot tile: none"),
            }
        }
        SimulatedGame::Blackjack { .. } => {
            let hand = BlackjackHand::deal(&mut source, engine.blackjack.dealer_stands_on)?;
            let cards = |cards: &[Card]| {
                cards
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            println!("Player: {} ({})", cards(hand.player_cards()), hand.player_total());
            println!("Dealer: {} ({})", cards(hand.dealer_cards()), hand.dealer_total());
            if let Some(outcome) = hand.outcome() {
                println!("Resolved at deal: {:?}", outcome);
            }
        }
    }
    Ok(())
}

/// Play every game in turn against an in-memory wallet, then reveal the seed
async fn demo(config: EngineConfig, rounds: u64, player: &str, deposit: f64) -> FairdrawResult<()> {
    let wallet = Arc::new(InMemoryWallet::new());
    wallet.deposit(player, Currency::Coins, deposit);
    let history = Arc::new(InMemoryHistory::new());
    let chain = Arc::new(SeedChain::generate(player));
    println!("Server seed commitment: {}", chain.commitment());

    let engine = GameEngine::new(config, wallet.clone(), history.clone())?.with_sources(chain.clone());
    let mut activity = engine.activity().subscribe();

    for round in 0..rounds {
        let played = match GameType::ALL[(round % GameType::ALL.len() as u64) as usize] {
            GameType::Reels => {
                let bet = Bet::new(1.0, Currency::Coins, GameType::Reels)?;
                engine.play_reels(player, bet).await
            }
            GameType::Wheel => {
                let bet = Bet::new(1.0, Currency::Coins, GameType::Wheel)?;
                engine.play_wheel(player, bet).await
            }
            GameType::Dice => {
                engine
                    .play_dice(
                        player,
                        Bet::new(1.0, Currency::Coins, GameType::Dice)?,
                        Some(50),
                        Some(Prediction::Over),
                    )
                    .await
            }
            GameType::Mines => demo_mines(&engine, player).await,
            GameType::Blackjack => demo_blackjack(&engine, player).await,
        };
        match played {
            Ok(result) => {
                let presentation = engine.present(result);
                presentation.cancel();
                let result = presentation.reveal().await;
                info!(
                    game = %result.game,
                    outcome = ?result.outcome,
                    payout = result.payout_amount,
                    currency = %result.payout_currency,
                    "round played"
                );
            }
            Err(e) if e.is_validation() => {
                warn!(error = %e, "round declined");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    let mut events = 0;
    while activity.try_recv().is_ok() {
        events += 1;
    }
    println!("Activity events: {}", events);
    println!("History entries: {}", history.len().await);
    println!(
        "Balance: {:.2} coins, {:.2} itlog",
        wallet.balance(player, Currency::Coins),
        wallet.balance(player, Currency::Itlog)
    );
    println!("{}", engine.metrics().snapshot());
    println!("Server seed (revealed): {}", chain.reveal());
    Ok(())
}

async fn demo_mines(engine: &GameEngine, player: &str) -> FairdrawResult<RoundResult> {
    let bet = Bet::new(1.0, Currency::Coins, GameType::Mines)?;
    engine.start_mines(player, bet, None).await?;
    for cell in 0..3 {
        if let MinesMove::Finished(result) = engine.reveal_mines(player, cell).await? {
            return Ok(result);
        }
    }
    engine.cash_out_mines(player).await
}

async fn demo_blackjack(engine: &GameEngine, player: &str) -> FairdrawResult<RoundResult> {
    let bet = Bet::new(1.0, Currency::Coins, GameType::Blackjack)?;
    let mut next = engine.deal_blackjack(player, bet).await?;
    loop {
        match next {
            BlackjackMove::Finished(result) => return Ok(result),
            BlackjackMove::InPlay(view) if view.player_total < 17 => {
                next = engine.hit(player).await?;
            }
            BlackjackMove::InPlay(_) => return engine.stand(player).await,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> FairdrawResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to encode JSON: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("Game:           {}", report.game);
    println!("Rounds:         {}", report.rounds);
    println!("Total bet:      {:.2}", report.total_bet);
    println!("Total payout:   {:.2}", report.total_payout);
    println!("RTP:            {:.4}", report.rtp);
    println!("Win rate:       {:.4}", report.win_rate);
    println!("Pushes:         {}", report.pushes);
    println!("Jackpots:       {} ({:.2} itlog)", report.jackpot_count, report.jackpot_payout);
    println!("Execution time: {:.2?}", report.execution_time);
}

fn print_table<K: Copy + Debug + PartialEq>(name: &str, table: &OutcomeTable<K>) {
    println!("{} table", name);
    for (entry, width) in table.entries().iter().zip(table.bucket_widths()) {
        println!(
            "  {:<16} p={:<8.4} upper={:<8.4} payout={:?}",
            format!("{:?}", entry.kind),
            width,
            entry.upper_bound,
            entry.payout
        );
    }
    println!("  expected multiplier (excluding jackpots): {:.4}", table.expected_multiplier());
}
