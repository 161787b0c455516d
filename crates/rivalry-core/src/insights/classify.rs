//! Series classification
//!
//! Each term's behaviour is assigned exactly one class from the signals that
//! mention it. Precedence, first match wins:
//!
//! 1. seasonal signal present => `Seasonal`
//! 2. anomaly present, no high-severity volatility => `EventDriven`
//! 3. high-severity volatility => `Noisy`
//! 4. momentum shift above 30% together with a correlation change => `RegimeShift`
//! 5. otherwise `Stable`
//!
//! Sustainability and leader-change risk are read from the same signals plus
//! the composite scores.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ComparisonScores, Severity, TermRef};
use crate::patterns::TrendDirection;

use super::types::{RiskLevel, Signal, SignalType};

/// Momentum magnitude (%) a shift must exceed to count towards a regime shift
pub const REGIME_SHIFT_MOMENTUM: f64 = 30.0;
/// Momentum magnitude (%) a shift must exceed to count as strong
pub const STRONG_MOMENTUM: f64 = 25.0;
pub const SUSTAINABLE_SCORE: f64 = 55.0;
pub const UNSUSTAINABLE_SCORE: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesClass {
    Stable,
    Seasonal,
    EventDriven,
    Noisy,
    RegimeShift,
}

impl SeriesClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesClass::Stable => "stable",
            SeriesClass::Seasonal => "seasonal",
            SeriesClass::EventDriven => "event_driven",
            SeriesClass::Noisy => "noisy",
            SeriesClass::RegimeShift => "regime_shift",
        }
    }

    /// Phrase used in generated text
    pub fn label(&self) -> &'static str {
        match self {
            SeriesClass::Stable => "stable",
            SeriesClass::Seasonal => "seasonal",
            SeriesClass::EventDriven => "event-driven",
            SeriesClass::Noisy => "noisy",
            SeriesClass::RegimeShift => "regime-shifting",
        }
    }
}

impl fmt::Display for SeriesClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sustainability {
    Sustainable,
    Unsustainable,
    Uncertain,
}

impl Sustainability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sustainability::Sustainable => "sustainable",
            Sustainability::Unsustainable => "unsustainable",
            Sustainability::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for Sustainability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signals about a single term (the joint `both` signals are excluded)
pub fn signals_for<'a>(signals: &'a [Signal], term: TermRef) -> impl Iterator<Item = &'a Signal> {
    signals.iter().filter(move |s| s.term == term)
}

/// Signed momentum (%) of a term's own momentum-shift signal
pub fn term_momentum(signals: &[Signal], term: TermRef) -> Option<f64> {
    signals_for(signals, term)
        .filter(|s| s.is(SignalType::MomentumShift))
        .filter_map(|s| s.data_point("momentum"))
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
}

/// Regression-based direction and strength carried on a term's momentum-shift signal
pub fn term_trend(signals: &[Signal], term: TermRef) -> Option<(TrendDirection, f64)> {
    signals_for(signals, term)
        .filter(|s| s.is(SignalType::MomentumShift))
        .find_map(|s| {
            let direction = TrendDirection::from_level(s.data_point("trendDirection")?)?;
            Some((direction, s.data_point("trendStrength").unwrap_or(0.0)))
        })
}

/// The joint momentum-divergence signal, if any
pub fn divergence(signals: &[Signal]) -> Option<&Signal> {
    signals
        .iter()
        .find(|s| s.is(SignalType::MomentumShift) && s.term == TermRef::Both)
}

pub fn has_crossover(signals: &[Signal]) -> bool {
    signals.iter().any(|s| s.is(SignalType::CompetitorCrossover))
}

pub fn classify_series(signals: &[Signal], term: TermRef) -> SeriesClass {
    let own: Vec<&Signal> = signals_for(signals, term).collect();
    let has = |t: SignalType| own.iter().any(|s| s.is(t));
    let high_volatility = own
        .iter()
        .any(|s| s.is(SignalType::VolatilitySpike) && s.severity == Severity::High);

    if has(SignalType::SeasonalPattern) {
        return SeriesClass::Seasonal;
    }
    if has(SignalType::Anomaly) && !high_volatility {
        return SeriesClass::EventDriven;
    }
    if high_volatility {
        return SeriesClass::Noisy;
    }

    let sharp_shift = term_momentum(signals, term)
        .map(|m| m.abs() > REGIME_SHIFT_MOMENTUM)
        .unwrap_or(false);
    let correlation_changed = signals.iter().any(|s| s.is(SignalType::CorrelationChange));
    if sharp_shift && correlation_changed {
        return SeriesClass::RegimeShift;
    }

    SeriesClass::Stable
}

/// Whether a term's movement is backed by its momentum score
pub fn sustainability(signals: &[Signal], scores: &ComparisonScores, term: TermRef) -> Sustainability {
    let strong = term_momentum(signals, term)
        .map(|m| m.abs() > STRONG_MOMENTUM)
        .unwrap_or(false);
    if !strong {
        return Sustainability::Uncertain;
    }

    let momentum_score = scores.for_term(term).breakdown.momentum;
    if momentum_score > SUSTAINABLE_SCORE {
        Sustainability::Sustainable
    } else if momentum_score < UNSUSTAINABLE_SCORE {
        Sustainability::Unsustainable
    } else {
        Sustainability::Uncertain
    }
}

/// Risk that the current leader loses the lead
pub fn leader_change_risk(signals: &[Signal], scores: &ComparisonScores) -> RiskLevel {
    let margin = scores.margin();
    let diverging = divergence(signals).is_some();

    if has_crossover(signals) || (diverging && margin < 10.0) || margin < 5.0 {
        RiskLevel::High
    } else if diverging || margin < 15.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{scores, signal};

    #[test]
    fn test_no_signals_is_stable() {
        assert_eq!(classify_series(&[], TermRef::TermA), SeriesClass::Stable);
    }

    #[test]
    fn test_seasonal_beats_noisy() {
        let signals = vec![
            signal(SignalType::SeasonalPattern, Severity::Low, TermRef::TermA, &[]),
            signal(SignalType::VolatilitySpike, Severity::High, TermRef::TermA, &[("cv", 1.2)]),
        ];
        assert_eq!(classify_series(&signals, TermRef::TermA), SeriesClass::Seasonal);
        assert_eq!(classify_series(&signals, TermRef::TermB), SeriesClass::Stable);
    }

    #[test]
    fn test_anomaly_without_high_volatility_is_event_driven() {
        let signals = vec![
            signal(SignalType::Anomaly, Severity::High, TermRef::TermB, &[]),
            signal(SignalType::VolatilitySpike, Severity::Medium, TermRef::TermB, &[("cv", 0.8)]),
        ];
        assert_eq!(classify_series(&signals, TermRef::TermB), SeriesClass::EventDriven);
    }

    #[test]
    fn test_anomaly_with_high_volatility_is_noisy() {
        let signals = vec![
            signal(SignalType::Anomaly, Severity::High, TermRef::TermA, &[]),
            signal(SignalType::VolatilitySpike, Severity::High, TermRef::TermA, &[("cv", 1.1)]),
        ];
        assert_eq!(classify_series(&signals, TermRef::TermA), SeriesClass::Noisy);
    }

    #[test]
    fn test_regime_shift_needs_both_signals() {
        let momentum = signal(
            SignalType::MomentumShift,
            Severity::High,
            TermRef::TermA,
            &[("momentum", -42.0)],
        );
        let correlation = signal(
            SignalType::CorrelationChange,
            Severity::High,
            TermRef::Both,
            &[("change", -0.6)],
        );
        assert_eq!(
            classify_series(&[momentum.clone()], TermRef::TermA),
            SeriesClass::Stable
        );
        assert_eq!(
            classify_series(&[momentum, correlation], TermRef::TermA),
            SeriesClass::RegimeShift
        );
    }

    #[test]
    fn test_sustainability() {
        let strong = vec![signal(
            SignalType::MomentumShift,
            Severity::High,
            TermRef::TermA,
            &[("momentum", 32.0)],
        )];
        let mut s = scores(60.0, 50.0);
        s.term_a.breakdown.momentum = 70.0;
        assert_eq!(sustainability(&strong, &s, TermRef::TermA), Sustainability::Sustainable);
        s.term_a.breakdown.momentum = 40.0;
        assert_eq!(sustainability(&strong, &s, TermRef::TermA), Sustainability::Unsustainable);
        s.term_a.breakdown.momentum = 50.0;
        assert_eq!(sustainability(&strong, &s, TermRef::TermA), Sustainability::Uncertain);
        assert_eq!(sustainability(&[], &s, TermRef::TermA), Sustainability::Uncertain);
    }

    #[test]
    fn test_leader_change_risk() {
        assert_eq!(leader_change_risk(&[], &scores(80.0, 50.0)), RiskLevel::Low);
        assert_eq!(leader_change_risk(&[], &scores(62.0, 50.0)), RiskLevel::Medium);
        assert_eq!(leader_change_risk(&[], &scores(53.0, 50.0)), RiskLevel::High);

        let crossover = vec![signal(
            SignalType::CompetitorCrossover,
            Severity::Medium,
            TermRef::Both,
            &[("gap", 3.0)],
        )];
        assert_eq!(leader_change_risk(&crossover, &scores(80.0, 50.0)), RiskLevel::High);

        let diverging = vec![signal(
            SignalType::MomentumShift,
            Severity::Medium,
            TermRef::Both,
            &[("momentumA", 20.0), ("momentumB", -20.0)],
        )];
        assert_eq!(leader_change_risk(&diverging, &scores(80.0, 50.0)), RiskLevel::Medium);
        assert_eq!(leader_change_risk(&diverging, &scores(58.0, 50.0)), RiskLevel::High);
    }
}
