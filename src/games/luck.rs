//! Luck boost applied to draws before table lookup.
//!
//! Tables run from the rarest, best-paying bucket at 0 to the common bucket at
//! 1, so dividing the draw by the boost pushes probability mass toward the
//! favorable end. A boost of 1.5 moves a third of the range down, it is not a
//! flat +50% win rate. Tables with the favorable bucket on top (dice "over")
//! use [`LuckBoost::adjust_from_top`] instead.

use crate::errors::ValidationError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Multiplicative luck, always >= 1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct LuckBoost(f64);

impl LuckBoost {
    pub const NONE: LuckBoost = LuckBoost(1.0);

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || value < 1.0 {
            return Err(ValidationError::InvalidBoost { value });
        }
        Ok(Self(value))
    }

    /// Clamp at the source: anything below 1.0 (or not a number) becomes no boost.
    pub fn clamped(value: f64) -> Self {
        if value.is_finite() && value >= 1.0 {
            Self(value)
        } else {
            Self::NONE
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_active(self) -> bool {
        self.0 > 1.0
    }

    pub fn adjust(self, raw_draw: f64) -> f64 {
        adjust(raw_draw, self)
    }

    /// Mirror of [`adjust`](Self::adjust) for tables whose favorable bucket
    /// sits at the top: `1 - (1 - raw) / boost`.
    pub fn adjust_from_top(self, raw_draw: f64) -> f64 {
        if !self.is_active() {
            return raw_draw;
        }
        1.0 - (1.0 - raw_draw) / self.0
    }
}

impl Default for LuckBoost {
    fn default() -> Self {
        Self::NONE
    }
}

/// `raw / boost`; stays in [0, 1) because the boost is never below 1.
pub fn adjust(raw_draw: f64, boost: LuckBoost) -> f64 {
    raw_draw / boost.0
}

/// External pet/boost system. Read fresh on every draw, never cached.
#[async_trait]
pub trait LuckProvider: Send + Sync {
    async fn current_boost(&self, player_id: &str) -> LuckBoost;
}

/// Provider for tables without a boost system
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLuck;

#[async_trait]
impl LuckProvider for NoLuck {
    async fn current_boost(&self, _player_id: &str) -> LuckBoost {
        LuckBoost::NONE
    }
}

/// In-memory per-player boosts
#[derive(Debug, Default)]
pub struct BoostRegistry {
    boosts: DashMap<String, LuckBoost>,
}

impl BoostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a boost, clamped to >= 1.0
    pub fn set(&self, player_id: &str, value: f64) {
        self.boosts
            .insert(player_id.to_string(), LuckBoost::clamped(value));
    }

    pub fn clear(&self, player_id: &str) {
        self.boosts.remove(player_id);
    }
}

#[async_trait]
impl LuckProvider for BoostRegistry {
    async fn current_boost(&self, player_id: &str) -> LuckBoost {
        self.boosts
            .get(player_id)
            .map(|b| *b.value())
            .unwrap_or(LuckBoost::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_boost_is_noop() {
        for i in 0..100 {
            let d = i as f64 / 100.0;
            assert_eq!(adjust(d, LuckBoost::NONE), d);
        }
    }

    #[test]
    fn test_boost_monotonic() {
        let boosts = [1.0, 1.1, 1.25, 1.5, 2.0, 3.0];
        for i in 0..100 {
            let d = i as f64 / 100.0;
            let adjusted: Vec<f64> = boosts
                .iter()
                .map(|b| adjust(d, LuckBoost::new(*b).unwrap()))
                .collect();
            assert!(adjusted.windows(2).all(|w| w[1] <= w[0]));
        }
    }

    #[test]
    fn test_boost_one_and_a_half_moves_a_third() {
        // Draws in [2/3, 1) land below 2/3 after a 1.5 boost.
        let boost = LuckBoost::new(1.5).unwrap();
        assert!(boost.adjust(0.99) < 0.667);
        assert!((boost.adjust(0.75) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_adjust_from_top_mirrors_adjust() {
        assert_eq!(LuckBoost::NONE.adjust_from_top(0.3), 0.3);
        let boost = LuckBoost::new(1.5).unwrap();
        for i in 0..100 {
            let d = i as f64 / 100.0;
            let up = boost.adjust_from_top(d);
            assert!(up >= d && up < 1.0);
            assert!((up - (1.0 - boost.adjust(1.0 - d))).abs() < 1e-12);
        }
    }

    #[test]
    fn test_boost_validation_and_clamp() {
        assert!(LuckBoost::new(0.5).is_err());
        assert!(LuckBoost::new(f64::NAN).is_err());
        assert_eq!(LuckBoost::clamped(0.3), LuckBoost::NONE);
        assert_eq!(LuckBoost::clamped(1.2).value(), 1.2);
        assert!(!LuckBoost::NONE.is_active());
    }

    #[tokio::test]
    async fn test_registry_reads_fresh_value() {
        let registry = BoostRegistry::new();
        assert_eq!(registry.current_boost("p").await, LuckBoost::NONE);
        registry.set("p", 1.4);
        assert_eq!(registry.current_boost("p").await.value(), 1.4);
        registry.set("p", 0.2);
        assert_eq!(registry.current_boost("p").await, LuckBoost::NONE);
        registry.clear("p");
        assert_eq!(registry.current_boost("p").await, LuckBoost::NONE);
    }
}
