//! Signals summary
//!
//! A compact rollup derived only from the signal list and the scores, so it
//! can always be rebuilt from those two inputs.

use serde::{Deserialize, Serialize};

use crate::models::{ComparisonScores, TermRef};

use super::classify::{classify_series, leader_change_risk, signals_for, term_momentum, SeriesClass};
use super::types::{PerTerm, RiskLevel, Signal, SignalType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalsSummary {
    /// `both` on an exact score tie
    pub winner: TermRef,
    pub margin: f64,
    /// Signed momentum (%) from each term's momentum-shift signal, 0 when none fired
    pub momentum: PerTerm<f64>,
    pub volatility: PerTerm<RiskLevel>,
    pub classification: PerTerm<SeriesClass>,
    pub leader_change_risk: RiskLevel,
    /// 0-100
    pub overall_confidence: f64,
    pub signal_count: usize,
}

/// Volatility bucket from a count of volatility signals
pub fn volatility_bucket(count: usize) -> RiskLevel {
    match count {
        0 => RiskLevel::Low,
        1 | 2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Blend of average signal confidence and a margin-derived term
pub fn overall_confidence(signals: &[Signal], scores: &ComparisonScores) -> f64 {
    let margin_term = (50.0 + 2.0 * scores.margin()).min(100.0);
    if signals.is_empty() {
        return margin_term;
    }
    let avg = signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64;
    (avg + margin_term) / 2.0
}

pub fn create_signals_summary(signals: &[Signal], scores: &ComparisonScores) -> SignalsSummary {
    SignalsSummary {
        winner: scores.winner(),
        margin: scores.margin(),
        momentum: PerTerm::from_fn(|t| term_momentum(signals, t).unwrap_or(0.0)),
        volatility: PerTerm::from_fn(|t| {
            volatility_bucket(
                signals_for(signals, t)
                    .filter(|s| s.is(SignalType::VolatilitySpike))
                    .count(),
            )
        }),
        classification: PerTerm::from_fn(|t| classify_series(signals, t)),
        leader_change_risk: leader_change_risk(signals, scores),
        overall_confidence: overall_confidence(signals, scores),
        signal_count: signals.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::test_utils::{scores, signal};

    #[test]
    fn test_volatility_buckets() {
        assert_eq!(volatility_bucket(0), RiskLevel::Low);
        assert_eq!(volatility_bucket(1), RiskLevel::Medium);
        assert_eq!(volatility_bucket(2), RiskLevel::Medium);
        assert_eq!(volatility_bucket(3), RiskLevel::High);
    }

    #[test]
    fn test_confidence_without_signals_is_margin_term() {
        assert_eq!(overall_confidence(&[], &scores(60.0, 50.0)), 70.0);
        assert_eq!(overall_confidence(&[], &scores(90.0, 10.0)), 100.0);
    }

    #[test]
    fn test_confidence_blends_signals() {
        let mut s = signal(SignalType::Anomaly, Severity::High, TermRef::TermA, &[]);
        s.confidence = 80.0;
        // margin 10 => margin term 70; (80 + 70) / 2
        assert_eq!(overall_confidence(&[s], &scores(60.0, 50.0)), 75.0);
    }

    #[test]
    fn test_summary_rollup() {
        let signals = vec![
            signal(SignalType::MomentumShift, Severity::Medium, TermRef::TermA, &[("momentum", 21.8)]),
            signal(SignalType::VolatilitySpike, Severity::Low, TermRef::TermB, &[("cv", 0.6)]),
        ];
        let summary = create_signals_summary(&signals, &scores(50.0, 50.0));
        assert_eq!(summary.winner, TermRef::Both);
        assert_eq!(summary.margin, 0.0);
        assert!((summary.momentum.term_a - 21.8).abs() < 1e-9);
        assert_eq!(summary.momentum.term_b, 0.0);
        assert_eq!(summary.volatility.term_a, RiskLevel::Low);
        assert_eq!(summary.volatility.term_b, RiskLevel::Medium);
        assert_eq!(summary.classification.term_a, SeriesClass::Stable);
        assert_eq!(summary.leader_change_risk, RiskLevel::High);
        assert_eq!(summary.signal_count, 2);
    }
}
