//! Uniform draw sources.
//!
//! Every game consumes randomness through [`RandomSource`], so a seeded,
//! verifiable source can replace the OS-seeded one without touching callers.

use crate::errors::FairdrawResult;
use crate::games::fairness::{FairSeed, SeedTrace};
use crate::games::types::RoundContext;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// 2^52, the mantissa span used to map hash bits into [0, 1)
const DRAW_SCALE: f64 = 4_503_599_627_370_496.0;

/// Produces independent uniform draws in [0, 1)
pub trait RandomSource {
    fn draw(&mut self) -> f64;

    /// Uniform index in `0..n`
    fn below(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((self.draw() * n as f64) as usize).min(n - 1)
    }

    /// Seed material needed to replay this source, if it is deterministic
    fn trace(&self) -> Option<SeedTrace> {
        None
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn draw(&mut self) -> f64 {
        (**self).draw()
    }

    fn below(&mut self, n: usize) -> usize {
        (**self).below(n)
    }

    fn trace(&self) -> Option<SeedTrace> {
        (**self).trace()
    }
}

/// Fisher-Yates shuffle, top down, one draw per swap.
pub fn shuffle<R: RandomSource + ?Sized, T>(source: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = source.below(i + 1);
        items.swap(i, j);
    }
}

/// OS-seeded source for casual play
pub struct ThreadSource {
    rng: StdRng,
}

impl ThreadSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for ThreadSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadSource {
    fn draw(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Deterministic source derived from server seed, client seed and nonce.
///
/// Draw `i` is the top 52 bits of `SHA-256("{server}:{client}:{nonce}:{i}")`
/// divided by 2^52, so anyone holding the revealed server seed can replay it.
#[derive(Debug, Clone)]
pub struct SeededSource {
    seed: FairSeed,
    cursor: u64,
}

impl SeededSource {
    pub fn new(seed: FairSeed) -> Self {
        Self { seed, cursor: 0 }
    }

    /// Number of draws consumed so far
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

impl RandomSource for SeededSource {
    fn draw(&mut self) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.server_seed().as_bytes());
        hasher.update(b":");
        hasher.update(self.seed.client_seed().as_bytes());
        hasher.update(b":");
        hasher.update(self.seed.nonce().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(self.cursor.to_string().as_bytes());
        let digest = hasher.finalize();
        self.cursor += 1;

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(head) >> 12) as f64 / DRAW_SCALE
    }

    fn trace(&self) -> Option<SeedTrace> {
        Some(self.seed.trace())
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Used for verification replays and for pinning exact outcomes in tests.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    index: usize,
}

impl ScriptedSource {
    pub fn new(draws: Vec<f64>) -> Self {
        let draws = draws
            .into_iter()
            .map(|d| if d.is_finite() { d.clamp(0.0, 1.0 - f64::EPSILON) } else { 0.0 })
            .collect();
        Self { draws, index: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn draw(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.index % self.draws.len()];
        self.index += 1;
        value
    }
}

/// Hands out a fresh source for each round
pub trait SourceProvider: Send + Sync {
    fn source_for(&self, round: &RoundContext) -> FairdrawResult<Box<dyn RandomSource + Send>>;
}

/// Provider backed by [`ThreadSource`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSourceProvider;

impl SourceProvider for ThreadSourceProvider {
    fn source_for(&self, _round: &RoundContext) -> FairdrawResult<Box<dyn RandomSource + Send>> {
        Ok(Box::new(ThreadSource::new()))
    }
}

impl<F> SourceProvider for F
where
    F: Fn(&RoundContext) -> Box<dyn RandomSource + Send> + Send + Sync,
{
    fn source_for(&self, round: &RoundContext) -> FairdrawResult<Box<dyn RandomSource + Send>> {
        Ok(self(round))
    }
}
