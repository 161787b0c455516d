//! Trend detector
//!
//! Fits a line over the lookback window and measures momentum (percent change
//! between adjacent windows) and acceleration (change in momentum).
//!
//! Momentum has two modes. With at least two full momentum windows of
//! history it compares the trailing window against the one before it
//! (`weekly`). With less history it compares the first half of the lookback
//! against the second half (`half_window`), which is a shorter-horizon
//! reading. Both modes are kept because they answer different questions on
//! short series.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TrendConfig;
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendDirection {
    StrongGrowth,
    Growth,
    Stable,
    Decline,
    StrongDecline,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::StrongGrowth => "strong-growth",
            TrendDirection::Growth => "growth",
            TrendDirection::Stable => "stable",
            TrendDirection::Decline => "decline",
            TrendDirection::StrongDecline => "strong-decline",
        }
    }

    /// Classify a combined slope/momentum score
    pub fn from_score(score: f64) -> Self {
        if score > 10.0 {
            TrendDirection::StrongGrowth
        } else if score > 3.0 {
            TrendDirection::Growth
        } else if score < -10.0 {
            TrendDirection::StrongDecline
        } else if score < -3.0 {
            TrendDirection::Decline
        } else {
            TrendDirection::Stable
        }
    }

    /// Signed ordinal, -2 (strong decline) to 2 (strong growth)
    pub fn level(&self) -> i8 {
        match self {
            TrendDirection::StrongGrowth => 2,
            TrendDirection::Growth => 1,
            TrendDirection::Stable => 0,
            TrendDirection::Decline => -1,
            TrendDirection::StrongDecline => -2,
        }
    }

    pub fn from_level(level: f64) -> Option<Self> {
        match level.round() as i64 {
            2 => Some(TrendDirection::StrongGrowth),
            1 => Some(TrendDirection::Growth),
            0 => Some(TrendDirection::Stable),
            -1 => Some(TrendDirection::Decline),
            -2 => Some(TrendDirection::StrongDecline),
            _ => None,
        }
    }

    pub fn is_growth(&self) -> bool {
        matches!(self, TrendDirection::StrongGrowth | TrendDirection::Growth)
    }

    pub fn is_decline(&self) -> bool {
        matches!(self, TrendDirection::StrongDecline | TrendDirection::Decline)
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumMode {
    /// Trailing window vs the preceding window
    Weekly,
    /// First half vs second half of the lookback
    HalfWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Momentum {
    /// Percent change
    pub value: f64,
    pub mode: MomentumMode,
}

/// Percent momentum of `values` using the dual-mode rule
pub fn momentum(values: &[f64], window: usize) -> Momentum {
    let window = window.max(1);
    let n = values.len();
    if n >= 2 * window {
        let recent = stats::mean(&values[n - window..]);
        let previous = stats::mean(&values[n - 2 * window..n - window]);
        return Momentum {
            value: stats::percent_change(previous, recent),
            mode: MomentumMode::Weekly,
        };
    }

    let half = n / 2;
    let value = if half == 0 {
        0.0
    } else {
        stats::percent_change(stats::mean(&values[..half]), stats::mean(&values[half..]))
    };
    Momentum {
        value,
        mode: MomentumMode::HalfWindow,
    }
}

/// Change in weekly momentum between the two most recent adjacent windows
pub fn acceleration(values: &[f64], window: usize) -> f64 {
    let window = window.max(1);
    let n = values.len();
    if n < 3 * window {
        return 0.0;
    }
    let latest = stats::mean(&values[n - window..]);
    let middle = stats::mean(&values[n - 2 * window..n - window]);
    let oldest = stats::mean(&values[n - 3 * window..n - 2 * window]);
    stats::percent_change(middle, latest) - stats::percent_change(oldest, middle)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendProjection {
    /// Points ahead of the last observation
    pub horizon: usize,
    pub value: f64,
    /// Percent change vs the last observed value
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Slope as a percent of the window mean, per point
    pub normalized_slope: f64,
    pub momentum: f64,
    pub momentum_mode: MomentumMode,
    pub acceleration: f64,
    pub direction: TrendDirection,
    /// 0-100
    pub strength: f64,
    /// 0-100
    pub confidence: f64,
    pub projection: TrendProjection,
    pub sample_size: usize,
}

impl TrendAnalysis {
    pub fn momentum_reading(&self) -> Momentum {
        Momentum {
            value: self.momentum,
            mode: self.momentum_mode,
        }
    }
}

pub struct TrendDetector {
    config: TrendConfig,
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendDetector {
    pub fn new() -> Self {
        Self {
            config: TrendConfig::default(),
        }
    }

    pub fn with_config(config: TrendConfig) -> Self {
        Self { config }
    }

    /// The trailing lookback slice (whole series when shorter)
    pub fn lookback<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        let start = values.len().saturating_sub(self.config.lookback.max(1));
        &values[start..]
    }

    pub fn analyze(&self, values: &[f64]) -> TrendAnalysis {
        let window = self.lookback(values);
        let n = window.len();
        let fit = stats::linear_regression(window);
        let mean = stats::mean(window);
        let normalized_slope = if mean == 0.0 {
            0.0
        } else {
            fit.slope / mean.abs() * 100.0
        };

        let m = momentum(window, self.config.momentum_window);
        let accel = acceleration(window, self.config.momentum_window);

        let direction = if fit.r_squared < self.config.min_r_squared {
            TrendDirection::Stable
        } else {
            TrendDirection::from_score((normalized_slope + m.value) / 2.0)
        };

        let coverage = (n as f64 / self.config.lookback.max(1) as f64).min(1.0);
        let strength = ((normalized_slope.abs() * 10.0).min(100.0) * 0.4
            + fit.r_squared * 100.0 * 0.4
            + coverage * 100.0 * 0.2)
            .clamp(0.0, 100.0);
        let confidence = (fit.r_squared * 70.0 + coverage * 30.0).clamp(0.0, 100.0);

        let last = window.last().copied().unwrap_or(0.0);
        let horizon = self.config.projection_horizon;
        let projected = if n == 0 {
            0.0
        } else {
            fit.predict((n - 1 + horizon) as f64).max(0.0)
        };

        TrendAnalysis {
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            normalized_slope,
            momentum: m.value,
            momentum_mode: m.mode,
            acceleration: accel,
            direction,
            strength,
            confidence,
            projection: TrendProjection {
                horizon,
                value: projected,
                change_pct: stats::percent_change(last, projected),
            },
            sample_size: n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_half_window_momentum_on_short_series() {
        // 12 points: first half mean 55, second half mean 67
        let m = momentum(&linear(12, 50.0, 2.0), 7);
        assert_eq!(m.mode, MomentumMode::HalfWindow);
        assert!((m.value - 21.818).abs() < 0.01);
    }

    #[test]
    fn test_weekly_momentum_with_enough_history() {
        let mut values = vec![10.0; 7];
        values.extend(vec![12.0; 7]);
        let m = momentum(&values, 7);
        assert_eq!(m.mode, MomentumMode::Weekly);
        assert!((m.value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_momentum_degenerate_input() {
        assert_eq!(momentum(&[], 7).value, 0.0);
        assert_eq!(momentum(&[5.0], 7).value, 0.0);
    }

    #[test]
    fn test_acceleration() {
        let mut values = vec![10.0; 7];
        values.extend(vec![10.0; 7]);
        values.extend(vec![15.0; 7]);
        assert!((acceleration(&values, 7) - 50.0).abs() < 1e-9);
        assert_eq!(acceleration(&values[..14], 7), 0.0);
    }

    #[test]
    fn test_direction_thresholds() {
        assert_eq!(TrendDirection::from_score(10.5), TrendDirection::StrongGrowth);
        assert_eq!(TrendDirection::from_score(10.0), TrendDirection::Growth);
        assert_eq!(TrendDirection::from_score(3.0), TrendDirection::Stable);
        assert_eq!(TrendDirection::from_score(-4.0), TrendDirection::Decline);
        assert_eq!(TrendDirection::from_score(-11.0), TrendDirection::StrongDecline);
    }

    #[test]
    fn test_analyze_rising_series() {
        let analysis = TrendDetector::new().analyze(&linear(12, 50.0, 2.0));
        assert!((analysis.slope - 2.0).abs() < 1e-9);
        assert!((analysis.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(analysis.direction, TrendDirection::StrongGrowth);
        assert!(analysis.projection.value > 72.0);
        assert!(analysis.strength > 0.0 && analysis.strength <= 100.0);
        assert!(analysis.confidence > 70.0);
    }

    #[test]
    fn test_low_r_squared_forces_stable() {
        // Alternating values with a slight drift have a tiny R²
        let values: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 20.0 } else { 80.0 } + i as f64 * 0.5)
            .collect();
        let analysis = TrendDetector::new().analyze(&values);
        assert!(analysis.r_squared < 0.3);
        assert_eq!(analysis.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_lookback_limits_window() {
        let detector = TrendDetector::with_config(TrendConfig {
            lookback: 10,
            ..Default::default()
        });
        let mut values = linear(50, 100.0, -1.0);
        values.extend(linear(10, 50.0, 5.0));
        let analysis = detector.analyze(&values);
        assert_eq!(analysis.sample_size, 10);
        assert!(analysis.slope > 0.0);
    }

    #[test]
    fn test_direction_levels() {
        for direction in [
            TrendDirection::StrongGrowth,
            TrendDirection::Growth,
            TrendDirection::Stable,
            TrendDirection::Decline,
            TrendDirection::StrongDecline,
        ] {
            assert_eq!(TrendDirection::from_level(direction.level() as f64), Some(direction));
        }
        assert_eq!(TrendDirection::from_level(3.0), None);
    }

    #[test]
    fn test_empty_series() {
        let analysis = TrendDetector::new().analyze(&[]);
        assert_eq!(analysis.direction, TrendDirection::Stable);
        assert_eq!(analysis.sample_size, 0);
        assert_eq!(analysis.projection.value, 0.0);
    }
}
