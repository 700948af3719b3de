//! Provably-fair outcome engine for mines, reels, wheel, dice and blackjack

pub mod blackjack;
pub mod dice;
pub mod engine;
pub mod fairness;
pub mod luck;
pub mod mines;
pub mod payout;
pub mod presentation;
pub mod random;
pub mod reels;
pub mod sessions;
pub mod simulation;
pub mod table;
pub mod types;
pub mod vrf_engine;
pub mod wallet;
pub mod wheel;

pub use engine::{BlackjackMove, GameEngine, MinesMove, MinesStart};
pub use fairness::{FairSeed, SeedChain, SeedTrace};
pub use luck::{BoostRegistry, LuckBoost, LuckProvider, NoLuck};
pub use random::{RandomSource, ScriptedSource, SeededSource, SourceProvider, ThreadSource};
pub use types::*;
pub use vrf_engine::{VRFGameEngine, VrfSourceProvider};
pub use wallet::{ActivityEvent, ActivityTracker, BalanceService, HistoryLog, InMemoryHistory, InMemoryWallet};
