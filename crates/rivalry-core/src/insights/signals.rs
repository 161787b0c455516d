//! Stage A: signal generation
//!
//! Scans both series (plus caller-supplied anomalies and forecast hints) and
//! emits a flat list of typed signals. Each term is scanned on its own first,
//! then the pair jointly. Anomalies and volume surges are not computed here,
//! only wrapped.
//!
//! Signal ids hash the term, the type-specific payload and the generation
//! instant, so a rerun with the same input and instant yields the same ids.

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};

use crate::config::{EngineConfig, SeasonalityConfig, SignalConfig};
use crate::hash::short_id;
use crate::models::{
    AnomalyPoint, ForecastDirection, ForecastHint, GenerationContext, Severity, TermRef,
};
use crate::patterns::{
    cyclic_strength, Momentum, MomentumMode, SeasonalityDetector, TrendAnalysis, TrendDetector,
    VolatilityDetector,
};
use crate::series::{AlignedSeries, TermSeries};
use crate::stats;

use super::input::InsightsInput;
use super::types::{Signal, SignalType};

/// Anything that can turn an input into signals
pub trait SignalSource: Send + Sync {
    fn generate(&self, input: &InsightsInput, ctx: &GenerationContext) -> Vec<Signal>;
}

/// Severity of a momentum magnitude (%) against the medium/high breakpoints
pub fn momentum_severity(magnitude: f64, config: &SignalConfig) -> Severity {
    if magnitude >= config.momentum_high {
        Severity::High
    } else if magnitude >= config.momentum_medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity of a coefficient of variation (ratio)
pub fn volatility_severity(cv: f64, config: &SignalConfig) -> Severity {
    if cv >= config.cv_high {
        Severity::High
    } else if cv >= config.cv_medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity of an anomaly from the magnitude of its z-score
pub fn anomaly_severity(z_score: f64) -> Severity {
    let z = z_score.abs();
    if z >= 3.0 {
        Severity::High
    } else if z >= 2.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn data_points<const N: usize>(entries: [(&str, f64); N]) -> Option<BTreeMap<String, f64>> {
    Some(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn direction_word(value: f64) -> &'static str {
    if value >= 0.0 {
        "upward"
    } else {
        "downward"
    }
}

/// Builds signals for one run; owns the id and provenance rules
struct SignalBuilder<'a> {
    ctx: &'a GenerationContext,
    signals: Vec<Signal>,
    seen: HashSet<String>,
}

impl<'a> SignalBuilder<'a> {
    fn new(ctx: &'a GenerationContext) -> Self {
        Self {
            ctx,
            signals: Vec::new(),
            seen: HashSet::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        signal_type: SignalType,
        severity: Severity,
        term: TermRef,
        description: String,
        detected_at: NaiveDate,
        confidence: f64,
        data_points: Option<BTreeMap<String, f64>>,
        payload: Value,
    ) {
        let id = short_id(
            "sig",
            &json!({
                "term": term.as_str(),
                "type": signal_type.as_str(),
                "payload": payload,
                "generatedAt": self.ctx.generated_at.to_rfc3339(),
            }),
        );
        if !self.seen.insert(id.clone()) {
            tracing::debug!(id = %id, "Dropping duplicate signal");
            return;
        }

        self.signals.push(Signal {
            id,
            signal_type,
            severity,
            term,
            description,
            detected_at,
            confidence: stats::clamp(confidence, 0.0, 100.0),
            data_points,
            source: self.ctx.source.clone(),
            generated_at: self.ctx.generated_at,
        });
    }
}

/// Stage A generator
pub struct SignalGenerator {
    trend: TrendDetector,
    volatility: VolatilityDetector,
    seasonality: SeasonalityDetector,
    seasonal_gate: SeasonalityConfig,
    config: SignalConfig,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalGenerator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            trend: TrendDetector::with_config(config.trend.clone()),
            volatility: VolatilityDetector::with_config(config.volatility.clone()),
            seasonality: SeasonalityDetector::with_config(config.seasonality.clone()),
            seasonal_gate: config.seasonality.clone(),
            config: config.signals.clone(),
        }
    }

    /// Whether a momentum magnitude (%) is large enough to emit a shift
    pub fn is_momentum_shift(&self, momentum: f64) -> bool {
        momentum.abs() > self.config.momentum_threshold
    }

    pub fn generate_signals(&self, input: &InsightsInput, ctx: &GenerationContext) -> Vec<Signal> {
        let mut builder = SignalBuilder::new(ctx);
        let fallback_date = input.series.last_date().unwrap_or_else(|| ctx.generated_on());

        let mut momenta: BTreeMap<TermRef, Momentum> = BTreeMap::new();
        for term in TermRef::sides() {
            let series = input.series.term(term);
            let detected_at = series.last_date().unwrap_or(fallback_date);
            let name = input.terms.name(term);

            let trend = self.trend.analyze(&series.values());
            self.momentum_signal(&mut builder, term, name, &trend, detected_at);
            momenta.insert(term, trend.momentum_reading());

            self.volatility_signals(&mut builder, term, name, series);
            self.seasonal_signal(&mut builder, term, name, series, detected_at);
        }

        if let (Some(a), Some(b)) = (momenta.get(&TermRef::TermA), momenta.get(&TermRef::TermB)) {
            self.divergence_signal(&mut builder, input, a.value, b.value, fallback_date);
        }

        let aligned = input.series.aligned();
        self.correlation_signal(&mut builder, &aligned);
        self.crossover_signal(&mut builder, input, &aligned);

        for anomaly in &input.anomalies {
            anomaly_signal(&mut builder, input.terms.name(anomaly.term), anomaly);
        }

        for term in TermRef::sides() {
            if let Some(hint) = input.forecasts.for_term(term) {
                let detected_at = input.series.term(term).last_date().unwrap_or(fallback_date);
                self.surge_signal(&mut builder, term, input.terms.name(term), hint, detected_at);
            }
        }

        tracing::debug!(count = builder.signals.len(), "Signal generation complete");
        builder.signals
    }

    fn momentum_signal(
        &self,
        builder: &mut SignalBuilder<'_>,
        term: TermRef,
        name: &str,
        trend: &TrendAnalysis,
        detected_at: NaiveDate,
    ) {
        let m = trend.momentum_reading();
        if !self.is_momentum_shift(m.value) {
            return;
        }
        let basis = match m.mode {
            MomentumMode::Weekly => "latest window vs the one before",
            MomentumMode::HalfWindow => "second half vs first half",
        };
        builder.push(
            SignalType::MomentumShift,
            momentum_severity(m.value.abs(), &self.config),
            term,
            format!(
                "{} shows {} momentum of {:+.1}% ({}); overall trend {}",
                name,
                direction_word(m.value),
                m.value,
                basis,
                trend.direction
            ),
            detected_at,
            (60.0 + 0.5 * m.value.abs()).min(95.0),
            data_points([
                ("momentum", m.value),
                ("trendDirection", trend.direction.level() as f64),
                ("trendStrength", trend.strength),
                ("rSquared", trend.r_squared),
                ("acceleration", trend.acceleration),
                ("projectedChangePct", trend.projection.change_pct),
            ]),
            json!({ "momentum": m.value, "date": detected_at }),
        );
    }

    /// One spike per qualifying window; lookbacks shorter than two windows are scanned whole
    fn volatility_signals(
        &self,
        builder: &mut SignalBuilder<'_>,
        term: TermRef,
        name: &str,
        series: &TermSeries,
    ) {
        let values = series.values();
        let window = self.trend.lookback(&values);
        let offset = values.len() - window.len();
        let size = self.config.volatility_window.max(2);

        let spans: Vec<std::ops::Range<usize>> = if window.len() < 2 * size {
            vec![0..window.len()]
        } else {
            let count = window.len() / size;
            (0..count)
                .rev()
                .map(|k| {
                    let end = window.len() - k * size;
                    end - size..end
                })
                .collect()
        };

        for span in spans {
            let slice = &window[span.clone()];
            let cv = stats::coefficient_of_variation(slice);
            if slice.is_empty() || cv <= self.config.cv_threshold {
                continue;
            }
            let analysis = self.volatility.analyze(slice);
            let detected_at = series.points[offset + span.end - 1].0;
            builder.push(
                SignalType::VolatilitySpike,
                volatility_severity(cv, &self.config),
                term,
                format!(
                    "{} is {} over the {} points to {} (coefficient of variation {:.2}, {} band breakouts)",
                    name,
                    analysis.level,
                    slice.len(),
                    detected_at,
                    cv,
                    analysis.breakouts.len()
                ),
                detected_at,
                (50.0 + 20.0 * cv).min(90.0),
                data_points([
                    ("cv", cv),
                    ("stabilityScore", analysis.stability_score),
                    ("breakouts", analysis.breakouts.len() as f64),
                    ("windowPoints", slice.len() as f64),
                ]),
                json!({ "cv": cv, "date": detected_at }),
            );
        }
    }

    /// Gated on cyclic strength; with enough history the calendar peak analysis names the period
    fn seasonal_signal(
        &self,
        builder: &mut SignalBuilder<'_>,
        term: TermRef,
        name: &str,
        series: &TermSeries,
        detected_at: NaiveDate,
    ) {
        let values = series.values();
        if values.len() < self.seasonal_gate.signal_min_points {
            return;
        }
        let cyclic = cyclic_strength(&values);
        if cyclic.strength <= self.seasonal_gate.cyclic_strength_threshold {
            return;
        }
        let lag = cyclic.lag.unwrap_or(0);
        let severity = if cyclic.strength >= 0.7 {
            Severity::High
        } else if cyclic.strength >= 0.5 {
            Severity::Medium
        } else {
            Severity::Low
        };

        let mut points = BTreeMap::from([
            ("cyclicStrength".to_string(), cyclic.strength),
            ("lag".to_string(), lag as f64),
        ]);
        let analysis = self
            .seasonality
            .analyze(&series.points)
            .filter(|a| a.has_pattern);
        let peak = analysis.as_ref().and_then(|a| a.strongest());

        let description = match (peak, analysis.as_ref().and_then(|a| a.description.as_ref())) {
            (Some(peak), Some(text)) => {
                points.insert("peakLiftPct".to_string(), peak.lift_pct);
                points.insert("peakZScore".to_string(), peak.z_score);
                format!("{}: {} (cycle strength {:.2})", name, text, cyclic.strength)
            }
            _ => format!(
                "{} repeats on a {}-point cycle (strength {:.2})",
                name, lag, cyclic.strength
            ),
        };

        builder.push(
            SignalType::SeasonalPattern,
            severity,
            term,
            description,
            detected_at,
            (40.0 + 60.0 * cyclic.strength).min(90.0),
            Some(points),
            json!({
                "strength": cyclic.strength,
                "lag": lag,
                "peak": peak.map(|p| p.label.clone()),
                "date": detected_at,
            }),
        );
    }

    fn divergence_signal(
        &self,
        builder: &mut SignalBuilder<'_>,
        input: &InsightsInput,
        a: f64,
        b: f64,
        detected_at: NaiveDate,
    ) {
        let threshold = self.config.divergence_threshold;
        if a * b >= 0.0 || a.abs() <= threshold || b.abs() <= threshold {
            return;
        }
        builder.push(
            SignalType::MomentumShift,
            momentum_severity(a.abs().min(b.abs()), &self.config),
            TermRef::Both,
            format!(
                "Momentum is diverging: {} {:+.1}% vs {} {:+.1}%",
                input.terms.term_a, a, input.terms.term_b, b
            ),
            detected_at,
            (60.0 + 0.25 * (a.abs() + b.abs())).min(95.0),
            data_points([("momentumA", a), ("momentumB", b)]),
            json!({ "momentumA": a, "momentumB": b, "date": detected_at }),
        );
    }

    fn correlation_signal(&self, builder: &mut SignalBuilder<'_>, aligned: &AlignedSeries) {
        let window = self.config.correlation_window.max(2);
        let n = aligned.len();
        if n < 2 * window {
            return;
        }
        let recent = stats::correlation(&aligned.term_a[n - window..], &aligned.term_b[n - window..]);
        let previous = stats::correlation(
            &aligned.term_a[n - 2 * window..n - window],
            &aligned.term_b[n - 2 * window..n - window],
        );
        let change = recent - previous;
        if change.abs() <= self.config.correlation_change {
            return;
        }
        let severity = if change.abs() > self.config.correlation_change_high {
            Severity::High
        } else {
            Severity::Medium
        };
        let detected_at = aligned.dates[n - 1];
        let direction = if change > 0.0 { "tightened" } else { "weakened" };
        builder.push(
            SignalType::CorrelationChange,
            severity,
            TermRef::Both,
            format!(
                "Correlation between the terms {} from {:.2} to {:.2} over the last {} points",
                direction, previous, recent, window
            ),
            detected_at,
            (50.0 + 40.0 * change.abs()).min(90.0),
            data_points([("previous", previous), ("current", recent), ("change", change)]),
            json!({ "previous": previous, "current": recent, "date": detected_at }),
        );
    }

    fn crossover_signal(
        &self,
        builder: &mut SignalBuilder<'_>,
        input: &InsightsInput,
        aligned: &AlignedSeries,
    ) {
        let window = self.config.crossover_window.max(1);
        let n = aligned.len();
        if n < 2 * window {
            return;
        }
        let gap = |range: std::ops::Range<usize>| {
            stats::mean(&aligned.term_a[range.clone()]) - stats::mean(&aligned.term_b[range])
        };
        let current = gap(n - window..n);
        let previous = gap(n - 2 * window..n - window);
        if current == 0.0 || previous == 0.0 || current.signum() == previous.signum() {
            return;
        }

        let (leader, trailer) = if current > 0.0 {
            (&input.terms.term_a, &input.terms.term_b)
        } else {
            (&input.terms.term_b, &input.terms.term_a)
        };
        let severity = if current.abs() > self.config.crossover_gap_high {
            Severity::High
        } else {
            Severity::Medium
        };
        let detected_at = aligned.dates[n - 1];
        builder.push(
            SignalType::CompetitorCrossover,
            severity,
            TermRef::Both,
            format!(
                "{} overtook {}; {}-point average gap is now {:.1}",
                leader,
                trailer,
                window,
                current.abs()
            ),
            detected_at,
            (60.0 + 2.0 * current.abs()).min(95.0),
            data_points([("gap", current), ("previousGap", previous)]),
            json!({ "gap": current, "previousGap": previous, "date": detected_at }),
        );
    }

    fn surge_signal(
        &self,
        builder: &mut SignalBuilder<'_>,
        term: TermRef,
        name: &str,
        hint: &ForecastHint,
        detected_at: NaiveDate,
    ) {
        if hint.direction != ForecastDirection::Rising {
            return;
        }
        let severity = if hint.confidence >= self.config.forecast_high_confidence {
            Severity::High
        } else {
            Severity::Medium
        };
        let outlook = match (hint.projected_change, hint.horizon_days) {
            (Some(change), Some(days)) => format!(" ({:+.1}% over {} days)", change, days),
            (Some(change), None) => format!(" ({:+.1}%)", change),
            _ => String::new(),
        };

        let mut points = BTreeMap::from([("confidence".to_string(), hint.confidence)]);
        if let Some(change) = hint.projected_change {
            points.insert("projectedChange".to_string(), change);
        }
        builder.push(
            SignalType::VolumeSurge,
            severity,
            term,
            format!("{} is forecast to keep rising{}", name, outlook),
            detected_at,
            hint.confidence,
            Some(points),
            json!({
                "direction": hint.direction.as_str(),
                "confidence": hint.confidence,
                "projectedChange": hint.projected_change,
            }),
        );
    }
}

fn anomaly_signal(builder: &mut SignalBuilder<'_>, name: &str, anomaly: &AnomalyPoint) {
    let confidence = anomaly
        .confidence
        .unwrap_or_else(|| (50.0 + 10.0 * anomaly.z_score.abs()).min(95.0));
    builder.push(
        SignalType::Anomaly,
        anomaly_severity(anomaly.z_score),
        anomaly.term,
        format!(
            "{} recorded an unusual value of {:.1} on {} (z = {:.1})",
            name, anomaly.value, anomaly.date, anomaly.z_score
        ),
        anomaly.date,
        confidence,
        data_points([("value", anomaly.value), ("zScore", anomaly.z_score)]),
        json!({ "date": anomaly.date, "value": anomaly.value, "zScore": anomaly.z_score }),
    );
}

impl SignalSource for SignalGenerator {
    fn generate(&self, input: &InsightsInput, ctx: &GenerationContext) -> Vec<Signal> {
        self.generate_signals(input, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Terms;
    use crate::series::{ComparisonSeries, TermSeries};
    use crate::test_utils::{context, linear_input, monthly_dates, scores};

    #[test]
    fn test_momentum_threshold_is_exclusive() {
        let generator = SignalGenerator::new();
        assert!(!generator.is_momentum_shift(15.0));
        assert!(!generator.is_momentum_shift(-15.0));
        assert!(generator.is_momentum_shift(15.01));
        assert!(generator.is_momentum_shift(-15.01));
    }

    #[test]
    fn test_rising_term_emits_upward_momentum() {
        let input = linear_input((50.0, 2.0), (50.0, 1.0));
        let signals = SignalGenerator::new().generate_signals(&input, &context());

        let momentum: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.is(SignalType::MomentumShift))
            .collect();
        assert_eq!(momentum.len(), 1);
        assert_eq!(momentum[0].term, TermRef::TermA);
        assert!(momentum[0].description.contains("upward"));
        assert_eq!(momentum[0].severity, Severity::Medium);
        assert!((momentum[0].data_point("momentum").unwrap() - 21.818).abs() < 0.01);
        assert!(!signals.iter().any(|s| s.is(SignalType::CompetitorCrossover)));
        assert!(!signals.iter().any(|s| s.is(SignalType::SeasonalPattern)));
    }

    #[test]
    fn test_crossover_and_divergence() {
        let input = linear_input((60.0, -2.0), (40.0, 2.0));
        let signals = SignalGenerator::new().generate_signals(&input, &context());

        let crossover = signals
            .iter()
            .find(|s| s.is(SignalType::CompetitorCrossover))
            .unwrap();
        assert_eq!(crossover.term, TermRef::Both);
        assert_eq!(crossover.severity, Severity::High);
        assert!((crossover.data_point("gap").unwrap() + 16.0).abs() < 1e-9);

        let divergence = signals
            .iter()
            .find(|s| s.is(SignalType::MomentumShift) && s.term == TermRef::Both)
            .unwrap();
        assert!(divergence.data_point("momentumA").unwrap() < 0.0);
        assert!(divergence.data_point("momentumB").unwrap() > 0.0);
    }

    #[test]
    fn test_anomaly_pass_through() {
        let mut input = linear_input((50.0, 0.0), (50.0, 0.0));
        let date = monthly_dates(12)[6];
        input.anomalies = vec![AnomalyPoint {
            term: TermRef::TermA,
            date,
            value: 100.0,
            z_score: 3.3,
            confidence: None,
        }];
        let signals = SignalGenerator::new().generate_signals(&input, &context());
        let anomaly = signals.iter().find(|s| s.is(SignalType::Anomaly)).unwrap();
        assert_eq!(anomaly.detected_at, date);
        assert_eq!(anomaly.severity, Severity::High);
        assert!((anomaly.confidence - 83.0).abs() < 1e-9);
    }

    #[test]
    fn test_forecast_hints() {
        let mut input = linear_input((50.0, 0.0), (50.0, 0.0));
        input.forecasts.term_a = Some(ForecastHint {
            direction: ForecastDirection::Rising,
            confidence: 90.0,
            projected_change: Some(12.0),
            horizon_days: Some(30),
        });
        input.forecasts.term_b = Some(ForecastHint {
            direction: ForecastDirection::Falling,
            confidence: 90.0,
            projected_change: None,
            horizon_days: None,
        });
        let signals = SignalGenerator::new().generate_signals(&input, &context());
        let surges: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.is(SignalType::VolumeSurge))
            .collect();
        assert_eq!(surges.len(), 1);
        assert_eq!(surges[0].term, TermRef::TermA);
        assert_eq!(surges[0].severity, Severity::High);
        assert_eq!(surges[0].confidence, 90.0);
    }

    #[test]
    fn test_volatility_spike() {
        let values = [10.0, 90.0, 5.0, 80.0, 12.0, 95.0, 8.0, 70.0, 10.0, 85.0, 6.0, 90.0];
        let flat = [50.0; 12];
        let terms = Terms::new("a", "b");
        let series =
            ComparisonSeries::from_columns(&terms, &monthly_dates(12), &values, &flat).unwrap();
        let input = InsightsInput::new(terms, series, scores(50.0, 50.0));
        let signals = SignalGenerator::new().generate_signals(&input, &context());
        let spike = signals
            .iter()
            .find(|s| s.is(SignalType::VolatilitySpike))
            .unwrap();
        assert_eq!(spike.term, TermRef::TermA);
        assert!(spike.data_point("cv").unwrap() > 0.7);
        assert!(spike.confidence <= 90.0);
    }

    #[test]
    fn test_volatility_scanned_per_window() {
        let values: Vec<f64> = (0..90).map(|i| if i % 2 == 0 { 10.0 } else { 90.0 }).collect();
        let flat = vec![50.0; 90];
        let terms = Terms::new("a", "b");
        let dates = monthly_dates(90);
        let series = ComparisonSeries::from_columns(&terms, &dates, &values, &flat).unwrap();
        let input = InsightsInput::new(terms, series, scores(50.0, 50.0));

        let spikes: Vec<Signal> = SignalGenerator::new()
            .generate_signals(&input, &context())
            .into_iter()
            .filter(|s| s.is(SignalType::VolatilitySpike))
            .collect();
        assert_eq!(spikes.len(), 3);
        assert!(spikes.iter().all(|s| s.term == TermRef::TermA));
        assert!(spikes.iter().all(|s| s.data_point("windowPoints") == Some(30.0)));
        let ends: Vec<NaiveDate> = spikes.iter().map(|s| s.detected_at).collect();
        assert_eq!(ends, vec![dates[29], dates[59], dates[89]]);
    }

    #[test]
    fn test_momentum_carries_fitted_trend() {
        let input = linear_input((50.0, 2.0), (50.0, 1.0));
        let signals = SignalGenerator::new().generate_signals(&input, &context());
        let momentum = signals
            .iter()
            .find(|s| s.is(SignalType::MomentumShift))
            .unwrap();
        assert_eq!(momentum.data_point("trendDirection"), Some(2.0));
        assert!((momentum.data_point("rSquared").unwrap() - 1.0).abs() < 1e-9);
        assert!(momentum.data_point("projectedChangePct").unwrap() > 0.0);
        assert!(momentum.description.contains("overall trend strong-growth"));
    }

    #[test]
    fn test_ids_are_deterministic() {
        let input = linear_input((60.0, -2.0), (40.0, 2.0));
        let generator = SignalGenerator::new();
        let first: Vec<String> = generator
            .generate_signals(&input, &context())
            .into_iter()
            .map(|s| s.id)
            .collect();
        let second: Vec<String> = generator
            .generate_signals(&input, &context())
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|id| id.starts_with("sig_")));
    }

    #[test]
    fn test_empty_series_yields_no_signals() {
        let input = InsightsInput::new(
            Terms::new("a", "b"),
            ComparisonSeries {
                term_a: TermSeries::new("a", vec![]),
                term_b: TermSeries::new("b", vec![]),
            },
            scores(0.0, 0.0),
        );
        assert!(SignalGenerator::new()
            .generate_signals(&input, &context())
            .is_empty());
    }
}
