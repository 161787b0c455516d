//! Volatility detector
//!
//! Coefficient of variation (in percent) is the primary metric. Average
//! absolute point-to-point percent change is a secondary discriminator
//! bucketed with half the CV thresholds; the more volatile of the two
//! readings wins. Bollinger bands flag individual breakout points.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::VolatilityConfig;
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolatilityLevel {
    VeryStable,
    Stable,
    Moderate,
    Volatile,
    HighlyVolatile,
}

impl VolatilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityLevel::VeryStable => "very-stable",
            VolatilityLevel::Stable => "stable",
            VolatilityLevel::Moderate => "moderate",
            VolatilityLevel::Volatile => "volatile",
            VolatilityLevel::HighlyVolatile => "highly-volatile",
        }
    }

    /// Bucket a percent metric against `[10, 20, 35, 50]` scaled by `scale`
    fn bucket(metric: f64, scale: f64) -> Self {
        if metric <= 10.0 * scale {
            VolatilityLevel::VeryStable
        } else if metric <= 20.0 * scale {
            VolatilityLevel::Stable
        } else if metric <= 35.0 * scale {
            VolatilityLevel::Moderate
        } else if metric <= 50.0 * scale {
            VolatilityLevel::Volatile
        } else {
            VolatilityLevel::HighlyVolatile
        }
    }

    /// Combined level from CV (%) and average daily change (%)
    pub fn classify(cv_pct: f64, avg_daily_change: f64) -> Self {
        Self::bucket(cv_pct, 1.0).max(Self::bucket(avg_daily_change, 0.5))
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutDirection {
    Above,
    Below,
}

/// A point outside its Bollinger band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakout {
    pub index: usize,
    pub value: f64,
    pub upper: f64,
    pub lower: f64,
    pub direction: BreakoutDirection,
    /// Distance past the band, in standard deviations
    pub magnitude: f64,
}

/// Points outside `mean ± k·std` of their trailing window, largest breakout first
pub fn bollinger_breakouts(values: &[f64], window: usize, k: f64) -> Vec<Breakout> {
    let window = window.max(2);
    if values.len() < window {
        return Vec::new();
    }

    let mut breakouts: Vec<Breakout> = (window - 1..values.len())
        .filter_map(|i| {
            let slice = &values[i + 1 - window..=i];
            let m = stats::mean(slice);
            let s = stats::std_dev(slice);
            if s == 0.0 {
                return None;
            }
            let upper = m + k * s;
            let lower = m - k * s;
            let value = values[i];
            let (direction, distance) = if value > upper {
                (BreakoutDirection::Above, value - upper)
            } else if value < lower {
                (BreakoutDirection::Below, lower - value)
            } else {
                return None;
            };
            Some(Breakout {
                index: i,
                value,
                upper,
                lower,
                direction,
                magnitude: distance / s,
            })
        })
        .collect();

    breakouts.sort_by(|a, b| {
        b.magnitude
            .total_cmp(&a.magnitude)
            .then_with(|| a.index.cmp(&b.index))
    });
    breakouts
}

/// Absolute percent changes between consecutive points (zero bases skipped)
pub fn daily_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| stats::percent_change(w[0], w[1]).abs())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityAnalysis {
    pub mean: f64,
    pub std_dev: f64,
    /// Coefficient of variation in percent
    pub cv: f64,
    pub avg_daily_change: f64,
    pub max_daily_change: f64,
    pub level: VolatilityLevel,
    /// 0-100, higher is steadier
    pub stability_score: f64,
    /// 0-100, share of daily changes within one standard deviation of their mean
    pub consistency_score: f64,
    /// 0-100
    pub risk_score: f64,
    pub breakouts: Vec<Breakout>,
}

pub struct VolatilityDetector {
    config: VolatilityConfig,
}

impl Default for VolatilityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatilityDetector {
    pub fn new() -> Self {
        Self {
            config: VolatilityConfig::default(),
        }
    }

    pub fn with_config(config: VolatilityConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, values: &[f64]) -> VolatilityAnalysis {
        let cv = stats::coefficient_of_variation(values) * 100.0;
        let changes = daily_changes(values);
        let avg_daily_change = stats::mean(&changes);
        let max_daily_change = stats::max(&changes);

        let stability_score = stats::clamp(
            0.7 * (100.0 - cv) + 0.3 * (100.0 - 5.0 * avg_daily_change),
            0.0,
            100.0,
        );

        let consistency_score = if changes.is_empty() {
            100.0
        } else {
            let m = stats::mean(&changes);
            let s = stats::std_dev(&changes);
            let within = changes.iter().filter(|c| (*c - m).abs() <= s).count();
            within as f64 / changes.len() as f64 * 100.0
        };

        let breakouts =
            bollinger_breakouts(values, self.config.bollinger_window, self.config.bollinger_k);
        let risk_score = stats::clamp(
            100.0 - stability_score + 5.0 * breakouts.len() as f64,
            0.0,
            100.0,
        );

        VolatilityAnalysis {
            mean: stats::mean(values),
            std_dev: stats::std_dev(values),
            cv,
            avg_daily_change,
            max_daily_change,
            level: VolatilityLevel::classify(cv, avg_daily_change),
            stability_score,
            consistency_score,
            risk_score,
            breakouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_buckets() {
        assert_eq!(VolatilityLevel::classify(10.0, 0.0), VolatilityLevel::VeryStable);
        assert_eq!(VolatilityLevel::classify(15.0, 0.0), VolatilityLevel::Stable);
        assert_eq!(VolatilityLevel::classify(35.0, 0.0), VolatilityLevel::Moderate);
        assert_eq!(VolatilityLevel::classify(50.0, 0.0), VolatilityLevel::Volatile);
        assert_eq!(VolatilityLevel::classify(50.1, 0.0), VolatilityLevel::HighlyVolatile);
    }

    #[test]
    fn test_daily_change_can_raise_level() {
        // Low CV but choppy day-to-day movement: 20% daily change > 17.5 halved threshold
        assert_eq!(VolatilityLevel::classify(8.0, 20.0), VolatilityLevel::Volatile);
        assert_eq!(VolatilityLevel::classify(40.0, 1.0), VolatilityLevel::Volatile);
    }

    #[test]
    fn test_flat_series_is_very_stable() {
        let analysis = VolatilityDetector::new().analyze(&[50.0; 30]);
        assert_eq!(analysis.cv, 0.0);
        assert_eq!(analysis.level, VolatilityLevel::VeryStable);
        assert_eq!(analysis.stability_score, 100.0);
        assert!(analysis.breakouts.is_empty());
        assert_eq!(analysis.risk_score, 0.0);
    }

    #[test]
    fn test_stability_score_floor() {
        let values = [1.0, 100.0, 1.0, 100.0, 1.0, 100.0];
        let analysis = VolatilityDetector::new().analyze(&values);
        assert_eq!(analysis.stability_score, 0.0);
        assert_eq!(analysis.level, VolatilityLevel::HighlyVolatile);
    }

    #[test]
    fn test_bollinger_breakout_on_spike() {
        let mut values = vec![50.0; 25];
        values[22] = 90.0;
        values[24] = 51.0;
        let breakouts = bollinger_breakouts(&values, 20, 2.0);
        assert!(!breakouts.is_empty());
        assert_eq!(breakouts[0].index, 22);
        assert_eq!(breakouts[0].direction, BreakoutDirection::Above);
        assert!(breakouts[0].magnitude > 0.0);
    }

    #[test]
    fn test_bollinger_short_series() {
        assert!(bollinger_breakouts(&[1.0, 2.0], 20, 2.0).is_empty());
    }

    #[test]
    fn test_daily_changes_skip_zero_base() {
        let changes = daily_changes(&[0.0, 10.0, 20.0, 10.0]);
        assert_eq!(changes, vec![100.0, 50.0]);
    }
}
