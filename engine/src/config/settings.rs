// Engine settings, loaded from the embedded default or a user JSON file
use crate::coordinator::CoordinatorConfig;
use crate::error::{EngineError, EngineResult};
use crate::indicators::EmaSeed;
use crate::strategies::{StrategyCatalog, StrategyDescriptor};
use serde::{Deserialize, Serialize};
use shared::models::{Interval, SessionKey};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG: &str = include_str!("../../config/default.json");

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub pair: String,
    pub base: String,
    pub interval: Interval,
    pub strategy: String,
    pub history_limit: usize,
    pub pending_tick_limit: usize,
    pub poll_interval_ms: u64,
    pub ema_seed: EmaSeed,
    /// Directory holding `<PAIR>-<BASE>-<interval>.csv` history files.
    pub data_dir: PathBuf,
    /// Extra strategies merged into the built-in catalog.
    pub strategies: Vec<StrategyDescriptor>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            pair: "BTC".to_string(),
            base: "USDT".to_string(),
            interval: Interval::Minute1,
            strategy: "ema_crossover".to_string(),
            history_limit: 1000,
            pending_tick_limit: 256,
            poll_interval_ms: 2000,
            ema_seed: EmaSeed::FirstValue,
            data_dir: PathBuf::from("data"),
            strategies: Vec::new(),
        }
    }
}

impl EngineSettings {
    pub fn load_default() -> EngineResult<Self> {
        Self::from_json_str(DEFAULT_CONFIG)
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let settings: EngineSettings =
            serde_json::from_str(raw).map_err(|e| EngineError::ConfigError(format!("Invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.pair.trim().is_empty() || self.base.trim().is_empty() {
            return Err(EngineError::ConfigError("pair and base must not be empty".to_string()));
        }
        if self.history_limit == 0 {
            return Err(EngineError::ConfigError("history_limit must be greater than 0".to_string()));
        }
        if self.pending_tick_limit == 0 {
            return Err(EngineError::ConfigError("pending_tick_limit must be greater than 0".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::ConfigError("poll_interval_ms must be greater than 0".to_string()));
        }
        let catalog = self.catalog()?;
        if !catalog.contains(&self.strategy) {
            return Err(EngineError::ConfigError(format!("unknown strategy '{}'", self.strategy)));
        }
        Ok(())
    }

    /// Built-ins plus the configured extra strategies.
    pub fn catalog(&self) -> EngineResult<StrategyCatalog> {
        StrategyCatalog::with_extra(self.strategies.clone())
            .map_err(|e| EngineError::ConfigError(format!("bad strategy definition: {}", e)))
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.pair, &self.base, self.interval, &self.strategy)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            history_limit: self.history_limit,
            pending_tick_limit: self.pending_tick_limit,
            ema_seed: self.ema_seed,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
