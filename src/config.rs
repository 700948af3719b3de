//! Engine configuration with defaults, file loading and environment overrides
//!
//! Settings load from an optional TOML file, then `FAIRDRAW_*` environment
//! variables are applied on top, then the result is validated. A bad setting
//! fails the load instead of surfacing later as a strange payout.

use crate::errors::{ConfigurationError, FairdrawResult};
use crate::games::blackjack::DEFAULT_DEALER_STANDS_ON;
use crate::games::mines::{MAX_MINES, MIN_MINES};
use crate::games::payout::JackpotRule;
use crate::games::types::{Currency, GameType};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub mines: MinesConfig,
    pub dice: DiceConfig,
    pub blackjack: BlackjackConfig,
    pub jackpots: JackpotsConfig,
    pub settlement: SettlementConfig,
    pub presentation: PresentationConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MinesConfig {
    pub min_mines: usize,
    pub max_mines: usize,
    pub default_mines: usize,
    /// Chance that a board hides a jackpot tile
    pub jackpot_chance: f64,
}

impl Default for MinesConfig {
    fn default() -> Self {
        Self {
            min_mines: MIN_MINES,
            max_mines: MAX_MINES,
            default_mines: 3,
            jackpot_chance: 0.05,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiceConfig {
    pub min_target: u8,
    pub max_target: u8,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            min_target: 1,
            max_target: 99,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlackjackConfig {
    pub dealer_stands_on: u8,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            dealer_stands_on: DEFAULT_DEALER_STANDS_ON,
        }
    }
}

/// Jackpot rules for the games that have one
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JackpotsConfig {
    pub mines: JackpotRule,
    pub reels: JackpotRule,
    pub wheel: JackpotRule,
}

impl Default for JackpotsConfig {
    fn default() -> Self {
        Self {
            mines: JackpotRule {
                base_reward: 10.0,
                scale_factor: 0.05,
                max_reward: 500.0,
                currency: Currency::Itlog,
            },
            reels: JackpotRule {
                base_reward: 50.0,
                scale_factor: 0.1,
                max_reward: 1000.0,
                currency: Currency::Itlog,
            },
            wheel: JackpotRule {
                base_reward: 25.0,
                scale_factor: 0.08,
                max_reward: 750.0,
                currency: Currency::Itlog,
            },
        }
    }
}

impl JackpotsConfig {
    pub fn rule_for(&self, game: GameType) -> Option<&JackpotRule> {
        match game {
            GameType::Mines => Some(&self.mines),
            GameType::Reels => Some(&self.reels),
            GameType::Wheel => Some(&self.wheel),
            GameType::Dice | GameType::Blackjack => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SettlementConfig {
    /// Attempts at crediting a payout before the round is reported as owed
    pub credit_retries: u32,
    /// Delay before the first retry, doubled on each further attempt
    pub retry_backoff_ms: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            credit_retries: 3,
            retry_backoff_ms: 50,
        }
    }
}

impl SettlementConfig {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Cosmetic reveal delays. The outcome is already fixed when these start.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresentationConfig {
    pub mines_ms: u64,
    pub reels_ms: u64,
    pub wheel_ms: u64,
    pub dice_ms: u64,
    pub blackjack_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            mines_ms: 1500,
            reels_ms: 3000,
            wheel_ms: 5000,
            dice_ms: 2000,
            blackjack_ms: 1500,
        }
    }
}

impl PresentationConfig {
    pub fn instant() -> Self {
        Self {
            mines_ms: 0,
            reels_ms: 0,
            wheel_ms: 0,
            dice_ms: 0,
            blackjack_ms: 0,
        }
    }

    pub fn delay_for(&self, game: GameType) -> Duration {
        let ms = match game {
            GameType::Mines => self.mines_ms,
            GameType::Reels => self.reels_ms,
            GameType::Wheel => self.wheel_ms,
            GameType::Dice => self.dice_ms,
            GameType::Blackjack => self.blackjack_ms,
        };
        Duration::from_millis(ms)
    }
}

impl EngineConfig {
    /// No presentation delays and fast credit retries, for simulation and tests
    pub fn simulation() -> Self {
        Self {
            presentation: PresentationConfig::instant(),
            settlement: SettlementConfig {
                credit_retries: 2,
                retry_backoff_ms: 1,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let m = &self.mines;
        if m.min_mines < MIN_MINES || m.max_mines > MAX_MINES || m.min_mines > m.max_mines {
            return Err(invalid(
                "mines.min_mines/max_mines",
                format!("{}..={}", m.min_mines, m.max_mines),
                format!("must lie within {}..={}", MIN_MINES, MAX_MINES),
            ));
        }
        if m.default_mines < m.min_mines || m.default_mines > m.max_mines {
            return Err(invalid(
                "mines.default_mines",
                m.default_mines.to_string(),
                "must lie within the configured mine range".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&m.jackpot_chance) {
            return Err(invalid(
                "mines.jackpot_chance",
                m.jackpot_chance.to_string(),
                "must be a probability".to_string(),
            ));
        }

        let d = &self.dice;
        if d.min_target < 1 || d.max_target > 99 || d.min_target > d.max_target {
            return Err(invalid(
                "dice.min_target/max_target",
                format!("{}..={}", d.min_target, d.max_target),
                "must lie within 1..=99".to_string(),
            ));
        }

        let stands = self.blackjack.dealer_stands_on;
        if !(12..=21).contains(&stands) {
            return Err(invalid(
                "blackjack.dealer_stands_on",
                stands.to_string(),
                "must be between 12 and 21".to_string(),
            ));
        }

        for (name, rule) in [
            ("jackpots.mines", &self.jackpots.mines),
            ("jackpots.reels", &self.jackpots.reels),
            ("jackpots.wheel", &self.jackpots.wheel),
        ] {
            let finite = rule.base_reward.is_finite()
                && rule.scale_factor.is_finite()
                && rule.max_reward.is_finite();
            if !finite || rule.base_reward < 0.0 || rule.scale_factor < 0.0 || rule.max_reward < rule.base_reward {
                return Err(invalid(
                    name,
                    format!("{:?}", rule),
                    "rewards must be non-negative with max >= base".to_string(),
                ));
            }
        }

        if self.settlement.credit_retries == 0 {
            return Err(invalid(
                "settlement.credit_retries",
                "0".to_string(),
                "at least one credit attempt is required".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: String, reason: String) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason,
    }
}

/// Loads [`EngineConfig`] from file and environment
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// File (or defaults), then process environment, then validation
    pub fn load(&self) -> FairdrawResult<EngineConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with a custom variable lookup
    pub fn load_with<F>(&self, lookup: F) -> FairdrawResult<EngineConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => EngineConfig::default(),
        };
        apply_overrides(&mut config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> FairdrawResult<EngineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    pub fn save(&self, config: &EngineConfig, path: &str) -> FairdrawResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason: "could not be parsed".to_string(),
            }),
    }
}

fn apply_overrides<F>(config: &mut EngineConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_MINES_DEFAULT")? {
        config.mines.default_mines = v;
    }
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_MINES_JACKPOT_CHANCE")? {
        config.mines.jackpot_chance = v;
    }
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_DICE_MIN_TARGET")? {
        config.dice.min_target = v;
    }
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_DICE_MAX_TARGET")? {
        config.dice.max_target = v;
    }
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_DEALER_STANDS_ON")? {
        config.blackjack.dealer_stands_on = v;
    }
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_CREDIT_RETRIES")? {
        config.settlement.credit_retries = v;
    }
    if let Some(v) = parse_var(&lookup, "FAIRDRAW_RETRY_BACKOFF_MS")? {
        config.settlement.retry_backoff_ms = v;
    }
    if let Some(instant) = parse_var::<bool, _>(&lookup, "FAIRDRAW_INSTANT_PRESENTATION")? {
        if instant {
            config.presentation = PresentationConfig::instant();
        }
    }
    Ok(())
}

/// Write the default configuration to `path`
pub fn generate_sample_config(path: &str) -> FairdrawResult<()> {
    ConfigLoader::new().save(&EngineConfig::default(), path)
}
