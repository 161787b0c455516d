//! Seasonality detector
//!
//! Groups a series by month, quarter and weekday and flags groups whose mean
//! stands out from the cross-group mean (z-score above a per-period
//! threshold) while staying consistent within the group. Weekday effects are
//! naturally smaller, so their threshold is lower.
//!
//! `cyclic_strength` is a lighter check that only needs a dozen points: the
//! strongest autocorrelation of the detrended series at calendar-plausible
//! lags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SeasonalityConfig;
use crate::stats;
use crate::temporal::{self, PeriodKind, TemporalPoint};

/// Candidate cycle lengths in points: monthly-in-weekly, weekly-in-daily,
/// yearly-in-monthly, yearly-in-weekly
pub const CANDIDATE_LAGS: [usize; 4] = [4, 7, 12, 52];

/// Per-group statistics for one calendar period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStat {
    pub kind: PeriodKind,
    pub key: u32,
    pub label: String,
    pub mean: f64,
    pub count: usize,
    pub z_score: f64,
    /// 0-1, one minus the clamped within-group coefficient of variation
    pub consistency: f64,
    /// Percent above the cross-group mean
    pub lift_pct: f64,
    pub is_peak: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclicStrength {
    /// 0-1
    pub strength: f64,
    pub lag: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalityAnalysis {
    pub has_pattern: bool,
    /// Qualifying peak periods, strongest lift first
    pub peaks: Vec<PeriodStat>,
    pub cyclic_strength: CyclicStrength,
    pub description: Option<String>,
}

impl SeasonalityAnalysis {
    pub fn strongest(&self) -> Option<&PeriodStat> {
        self.peaks.first()
    }
}

/// Strongest positive autocorrelation of the detrended values at `CANDIDATE_LAGS`
pub fn cyclic_strength(values: &[f64]) -> CyclicStrength {
    let none = CyclicStrength {
        strength: 0.0,
        lag: None,
    };
    let residuals = stats::detrend(values);
    let scale = stats::mean(values).abs().max(1.0);
    if stats::std_dev(&residuals) < 1e-9 * scale {
        return none;
    }

    CANDIDATE_LAGS
        .iter()
        .copied()
        .filter(|&lag| lag >= 2 && lag <= values.len() / 2)
        .map(|lag| (lag, stats::autocorrelation(&residuals, lag)))
        .filter(|(_, r)| *r > 0.0)
        .fold(none, |best, (lag, r)| {
            if r > best.strength {
                CyclicStrength {
                    strength: r.min(1.0),
                    lag: Some(lag),
                }
            } else {
                best
            }
        })
}

pub struct SeasonalityDetector {
    config: SeasonalityConfig,
}

impl Default for SeasonalityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SeasonalityDetector {
    pub fn new() -> Self {
        Self {
            config: SeasonalityConfig::default(),
        }
    }

    pub fn with_config(config: SeasonalityConfig) -> Self {
        Self { config }
    }

    fn threshold(&self, kind: PeriodKind) -> f64 {
        match kind {
            PeriodKind::Month => self.config.month_z,
            PeriodKind::Quarter => self.config.quarter_z,
            PeriodKind::DayOfWeek => self.config.day_of_week_z,
        }
    }

    /// Statistics for every group of one period kind
    pub fn period_stats(&self, points: &[TemporalPoint], kind: PeriodKind) -> Vec<PeriodStat> {
        let groups = kind.group(points);
        if groups.len() < 2 {
            return Vec::new();
        }

        let group_means: Vec<f64> = groups.values().map(|v| stats::mean(v)).collect();
        let baseline = stats::mean(&group_means);
        let spread = stats::std_dev(&group_means);
        let threshold = self.threshold(kind);

        groups
            .iter()
            .map(|(&key, values)| {
                let mean = stats::mean(values);
                let z_score = stats::z_score(mean, baseline, spread);
                let consistency =
                    1.0 - stats::coefficient_of_variation(values).clamp(0.0, 1.0);
                PeriodStat {
                    kind,
                    key,
                    label: kind.label(key),
                    mean,
                    count: values.len(),
                    z_score,
                    consistency,
                    lift_pct: stats::percent_change(baseline, mean),
                    is_peak: z_score > threshold && consistency > self.config.min_consistency,
                }
            })
            .collect()
    }

    /// Full period analysis; `None` below the configured minimum point count
    pub fn analyze(&self, series: &[(NaiveDate, f64)]) -> Option<SeasonalityAnalysis> {
        if series.len() < self.config.min_points {
            return None;
        }

        let points = temporal::enrich(series);
        let mut peaks: Vec<PeriodStat> = PeriodKind::all()
            .iter()
            .flat_map(|&kind| self.period_stats(&points, kind))
            .filter(|stat| stat.is_peak)
            .collect();
        peaks.sort_by(|a, b| {
            b.lift_pct
                .total_cmp(&a.lift_pct)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.key.cmp(&b.key))
        });

        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        let description = peaks
            .first()
            .map(|peak| format!("{} runs {:.0}% above baseline", peak.label, peak.lift_pct));

        Some(SeasonalityAnalysis {
            has_pattern: !peaks.is_empty(),
            peaks,
            cyclic_strength: cyclic_strength(&values),
            description,
        })
    }
}
