//! fairdraw - provably-fair weighted outcome engine
//!
//! Resolves mines, reels, wheel, dice and blackjack rounds from uniform draws
//! through cumulative outcome tables, applies luck boosts, computes payouts and
//! settles them against a pluggable balance service.

pub mod config;
pub mod errors;
pub mod games;
pub mod metrics;

pub use config::{ConfigLoader, EngineConfig};
pub use errors::{FairdrawError, FairdrawResult};
pub use games::GameEngine;
pub use metrics::EngineMetrics;
