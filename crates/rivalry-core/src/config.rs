//! Engine configuration
//!
//! Every tunable threshold of the pipeline lives here. Config is resolved
//! in two layers:
//! 1. An explicit override path, or `~/.local/share/rivalry/config/engine.toml`
//! 2. Embedded defaults (compiled into binary)
//!
//! Override files may set any subset of keys; the rest keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Points used for the regression (full series when shorter)
    pub lookback: usize,
    /// Window for the weekly momentum mode
    pub momentum_window: usize,
    /// Points ahead for the projection
    pub projection_horizon: usize,
    /// Below this R² the direction is forced to stable
    pub min_r_squared: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            lookback: 90,
            momentum_window: 7,
            projection_horizon: 30,
            min_r_squared: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub bollinger_window: usize,
    /// Band width in standard deviations
    pub bollinger_k: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            bollinger_window: 20,
            bollinger_k: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalityConfig {
    /// Points required for period-peak analysis
    pub min_points: usize,
    /// Minimum group consistency (0-1) for a peak period
    pub min_consistency: f64,
    pub month_z: f64,
    pub quarter_z: f64,
    pub day_of_week_z: f64,
    /// Points required before Stage A looks for a seasonal signal
    pub signal_min_points: usize,
    pub cyclic_strength_threshold: f64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            min_points: 60,
            min_consistency: 0.7,
            month_z: 1.0,
            quarter_z: 1.0,
            day_of_week_z: 0.5,
            signal_min_points: 12,
            cyclic_strength_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Momentum magnitude (%) that must be exceeded to emit a shift
    pub momentum_threshold: f64,
    pub momentum_medium: f64,
    pub momentum_high: f64,
    /// Both momenta must exceed this (%) with opposite signs for a divergence
    pub divergence_threshold: f64,
    /// Coefficient of variation (ratio) that must be exceeded for a spike
    pub cv_threshold: f64,
    pub cv_medium: f64,
    pub cv_high: f64,
    /// Points per volatility window; longer lookbacks are scanned window by window
    pub volatility_window: usize,
    pub correlation_window: usize,
    pub correlation_change: f64,
    pub correlation_change_high: f64,
    pub crossover_window: usize,
    /// Gap above which a crossover is high severity
    pub crossover_gap_high: f64,
    /// Forecast confidence at or above which a surge is high severity
    pub forecast_high_confidence: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            momentum_threshold: 15.0,
            momentum_medium: 20.0,
            momentum_high: 30.0,
            divergence_threshold: 10.0,
            cv_threshold: 0.5,
            cv_medium: 0.7,
            cv_high: 1.0,
            volatility_window: 30,
            correlation_window: 10,
            correlation_change: 0.3,
            correlation_change_high: 0.5,
            crossover_window: 5,
            crossover_gap_high: 10.0,
            forecast_high_confidence: 85.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub stale_ttl_secs: u64,
    /// Lifetime of memoized signal lists
    pub memo_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            stale_ttl_secs: 7 * 24 * 60 * 60,
            memo_ttl_secs: 5 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn stale_ttl(&self) -> Duration {
        Duration::from_secs(self.stale_ttl_secs)
    }

    pub fn memo_ttl(&self) -> Duration {
        Duration::from_secs(self.memo_ttl_secs)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub trend: TrendConfig,
    pub volatility: VolatilityConfig,
    pub seasonality: SeasonalityConfig,
    pub signals: SignalConfig,
    pub cache: CacheConfig,
}

impl EngineConfig {
    /// Load from an explicit path, the default override location, or embedded defaults
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = override_path
            .map(Path::to_path_buf)
            .or_else(default_config_path);

        let content = match path {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading engine config override");
                fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
            }
            _ => DEFAULT_CONFIG.to_string(),
        };

        Self::from_toml_str(&content)
    }

    /// Parse TOML content; keys not present keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("rivalry").join("config").join("engine.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = EngineConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            "[signals]\nmomentum_threshold = 25.0\n\n[cache]\nttl_secs = 60\n",
        )
        .unwrap();
        assert_eq!(config.signals.momentum_threshold, 25.0);
        assert_eq!(config.signals.cv_threshold, 0.5);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.stale_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.trend, TrendConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = EngineConfig::from_toml_str("[signals\nbroken");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[trend]\nlookback = 30").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.trend.lookback, 30);
        assert_eq!(config.trend.momentum_window, 7);
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let config = EngineConfig::load(Some(Path::new("/nonexistent/rivalry.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let rendered = EngineConfig::default().to_toml_string().unwrap();
        assert_eq!(
            EngineConfig::from_toml_str(&rendered).unwrap(),
            EngineConfig::default()
        );
    }
}
