//! Stage B: interpretations
//!
//! Five independent rules, one per output category, each reading only the
//! signals, scores and series classes. Rules return drafts; the generator
//! stamps ids, the generation instant and data freshness.

use serde_json::json;

use crate::hash::short_id;
use crate::models::{ComparisonScores, GenerationContext, TermRef, Terms};

use super::classify::{
    classify_series, divergence, leader_change_risk, signals_for, sustainability, term_momentum,
    term_trend, SeriesClass,
};
use super::types::{Interpretation, InterpretationCategory, PerTerm, Signal, SignalType};

/// Everything a rule may read
pub struct RuleContext<'a> {
    pub terms: &'a Terms,
    pub signals: &'a [Signal],
    pub scores: &'a ComparisonScores,
    pub classes: PerTerm<SeriesClass>,
}

impl<'a> RuleContext<'a> {
    pub fn new(terms: &'a Terms, signals: &'a [Signal], scores: &'a ComparisonScores) -> Self {
        Self {
            terms,
            signals,
            scores,
            classes: PerTerm::from_fn(|term| classify_series(signals, term)),
        }
    }

    fn name(&self, term: TermRef) -> &str {
        self.terms.name(term)
    }

    fn term_signals(&self, term: TermRef, types: &[SignalType]) -> Vec<&'a Signal> {
        signals_for(self.signals, term)
            .filter(|s| types.contains(&s.signal_type))
            .collect()
    }
}

/// An interpretation before ids and timestamps are attached
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub category: InterpretationCategory,
    pub term: TermRef,
    pub text: String,
    pub evidence: Vec<String>,
    pub related_signals: Vec<String>,
    pub confidence: f64,
}

impl Draft {
    fn new(category: InterpretationCategory, term: TermRef, text: String) -> Self {
        Self {
            category,
            term,
            text,
            evidence: Vec::new(),
            related_signals: Vec::new(),
            confidence: 50.0,
        }
    }

    fn evidence(mut self, item: impl Into<String>) -> Self {
        self.evidence.push(item.into());
        self
    }

    fn related(mut self, signals: &[&Signal]) -> Self {
        self.related_signals
            .extend(signals.iter().map(|s| s.id.clone()));
        self
    }

    fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 100.0);
        self
    }
}

fn average_confidence(signals: &[&Signal]) -> Option<f64> {
    if signals.is_empty() {
        return None;
    }
    Some(signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64)
}

fn margin_confidence(scores: &ComparisonScores) -> f64 {
    (50.0 + 2.0 * scores.margin()).min(100.0)
}

/// One category's interpretation logic
pub trait InterpretationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn interpret(&self, ctx: &RuleContext<'_>) -> Vec<Draft>;
}

/// Direction and class of each term
pub struct TrendRule;

impl InterpretationRule for TrendRule {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn interpret(&self, ctx: &RuleContext<'_>) -> Vec<Draft> {
        TermRef::sides()
            .into_iter()
            .map(|term| {
                let name = ctx.name(term);
                let class = *ctx.classes.get(term);
                let related = ctx.term_signals(
                    term,
                    &[
                        SignalType::MomentumShift,
                        SignalType::SeasonalPattern,
                        SignalType::Anomaly,
                        SignalType::VolatilitySpike,
                    ],
                );
                let momentum_score = ctx.scores.for_term(term).breakdown.momentum;

                let draft = match term_momentum(ctx.signals, term) {
                    Some(m) => Draft::new(
                        InterpretationCategory::TrendAnalysis,
                        term,
                        format!(
                            "{} is trending {} ({:+.1}%) and behaves as a {} series.",
                            name,
                            if m >= 0.0 { "upward" } else { "downward" },
                            m,
                            class.label()
                        ),
                    )
                    .evidence(format!("momentum: {:+.1}%", m)),
                    None => Draft::new(
                        InterpretationCategory::TrendAnalysis,
                        term,
                        format!(
                            "{} shows no significant momentum shift and behaves as a {} series.",
                            name,
                            class.label()
                        ),
                    )
                    .evidence("momentum: no shift above threshold"),
                };

                let draft = match term_trend(ctx.signals, term) {
                    Some((direction, strength)) => draft.evidence(format!(
                        "fitted trend: {} (strength {:.0}/100)",
                        direction, strength
                    )),
                    None => draft,
                };

                draft
                    .evidence(format!("series class: {}", class))
                    .evidence(format!("momentum score: {:.0}", momentum_score))
                    .confidence(average_confidence(&related).unwrap_or(55.0))
                    .related(&related)
            })
            .collect()
    }
}

/// Who leads and how exposed that lead is
pub struct CompetitiveRule;

impl InterpretationRule for CompetitiveRule {
    fn name(&self) -> &'static str {
        "competitive"
    }

    fn interpret(&self, ctx: &RuleContext<'_>) -> Vec<Draft> {
        let risk = leader_change_risk(ctx.signals, ctx.scores);
        let margin = ctx.scores.margin();
        let crossover = ctx
            .signals
            .iter()
            .find(|s| s.is(SignalType::CompetitorCrossover));
        let diverging = divergence(ctx.signals);

        let text = match (crossover, diverging) {
            (Some(signal), _) => {
                let gap = signal.data_point("gap").unwrap_or(0.0);
                let (now_leading, overtaken) = if gap >= 0.0 {
                    (TermRef::TermA, TermRef::TermB)
                } else {
                    (TermRef::TermB, TermRef::TermA)
                };
                format!(
                    "{} has overtaken {} in the most recent window; leader-change risk is {}.",
                    ctx.name(now_leading),
                    ctx.name(overtaken),
                    risk
                )
            }
            (None, Some(signal)) => format!(
                "Momentum is pulling the terms apart ({} {:+.1}%, {} {:+.1}%); leader-change risk is {}.",
                ctx.terms.term_a,
                signal.data_point("momentumA").unwrap_or(0.0),
                ctx.terms.term_b,
                signal.data_point("momentumB").unwrap_or(0.0),
                risk
            ),
            (None, None) => match ctx.scores.winner() {
                TermRef::Both => format!(
                    "The terms are level on overall score; leader-change risk is {}.",
                    risk
                ),
                leader => format!(
                    "{} leads {} by {:.1} points; leader-change risk is {}.",
                    ctx.name(leader),
                    ctx.name(leader.other()),
                    margin,
                    risk
                ),
            },
        };

        let related: Vec<&Signal> = ctx
            .signals
            .iter()
            .filter(|s| {
                s.is(SignalType::CompetitorCrossover)
                    || s.is(SignalType::CorrelationChange)
                    || (s.is(SignalType::MomentumShift) && s.term == TermRef::Both)
            })
            .collect();

        let mut draft = Draft::new(InterpretationCategory::CompetitiveDynamics, TermRef::Both, text)
            .evidence(format!("margin: {:.1}", margin))
            .evidence(format!("leader-change risk: {}", risk));
        if let Some(gap) = crossover.and_then(|s| s.data_point("gap")) {
            draft = draft.evidence(format!("crossover gap: {:+.1}", gap));
        }
        if let Some(change) = ctx
            .signals
            .iter()
            .find(|s| s.is(SignalType::CorrelationChange))
            .and_then(|s| s.data_point("change"))
        {
            draft = draft.evidence(format!("correlation change: {:+.2}", change));
        }

        let confidence = average_confidence(&related).unwrap_or_else(|| margin_confidence(ctx.scores));
        vec![draft.confidence(confidence).related(&related)]
    }
}

/// Relative standing on the composite score
pub struct PositioningRule;

impl InterpretationRule for PositioningRule {
    fn name(&self) -> &'static str {
        "positioning"
    }

    fn interpret(&self, ctx: &RuleContext<'_>) -> Vec<Draft> {
        let a = ctx.scores.term_a.overall;
        let b = ctx.scores.term_b.overall;
        let winner = ctx.scores.winner();

        let draft = match winner {
            TermRef::Both => Draft::new(
                InterpretationCategory::MarketPositioning,
                TermRef::Both,
                format!("Both terms hold an equal overall position ({:.0}).", a),
            ),
            leader => {
                let score = ctx.scores.for_term(leader);
                let (component, value) = score.breakdown.strongest();
                Draft::new(
                    InterpretationCategory::MarketPositioning,
                    leader,
                    format!(
                        "{} holds the stronger position ({:.0} vs {:.0}), led by {}.",
                        ctx.name(leader),
                        score.overall,
                        ctx.scores.for_term(leader.other()).overall,
                        component
                    ),
                )
                .evidence(format!("strongest component: {} ({:.0})", component, value))
            }
        };

        vec![draft
            .evidence(format!("overall score {}: {:.1}", ctx.terms.term_a, a))
            .evidence(format!("overall score {}: {:.1}", ctx.terms.term_b, b))
            .confidence(margin_confidence(ctx.scores))]
    }
}

/// Growth or decline, and whether it looks durable
pub struct MomentumPatternRule;

impl InterpretationRule for MomentumPatternRule {
    fn name(&self) -> &'static str {
        "momentum_pattern"
    }

    fn interpret(&self, ctx: &RuleContext<'_>) -> Vec<Draft> {
        TermRef::sides()
            .into_iter()
            .filter_map(|term| {
                let momentum = term_momentum(ctx.signals, term);
                let surging = !ctx.term_signals(term, &[SignalType::VolumeSurge]).is_empty();
                let related =
                    ctx.term_signals(term, &[SignalType::MomentumShift, SignalType::VolumeSurge]);
                let name = ctx.name(term);
                let score = ctx.scores.for_term(term).breakdown.momentum;
                let durability = sustainability(ctx.signals, ctx.scores, term);

                let draft = match momentum {
                    Some(m) if m < 0.0 => Draft::new(
                        InterpretationCategory::DeclinePattern,
                        term,
                        format!(
                            "{} is declining ({:+.1}%); the movement looks {} given a momentum score of {:.0}.",
                            name, m, durability, score
                        ),
                    )
                    .evidence(format!("momentum: {:+.1}%", m)),
                    Some(m) => Draft::new(
                        InterpretationCategory::GrowthPattern,
                        term,
                        format!(
                            "{} is growing ({:+.1}%); the growth looks {} given a momentum score of {:.0}.",
                            name, m, durability, score
                        ),
                    )
                    .evidence(format!("momentum: {:+.1}%", m)),
                    None if surging => Draft::new(
                        InterpretationCategory::GrowthPattern,
                        term,
                        format!("{} is expected to keep growing according to the upstream forecast.", name),
                    ),
                    None => return None,
                };

                let max_confidence = related
                    .iter()
                    .map(|s| s.confidence)
                    .fold(0.0_f64, f64::max);
                Some(
                    draft
                        .evidence(format!("momentum score: {:.0}", score))
                        .evidence(format!("sustainability: {}", durability))
                        .confidence(max_confidence)
                        .related(&related),
                )
            })
            .collect()
    }
}

/// How steady each series is
pub struct StabilityRule;

impl InterpretationRule for StabilityRule {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn interpret(&self, ctx: &RuleContext<'_>) -> Vec<Draft> {
        TermRef::sides()
            .into_iter()
            .map(|term| {
                let name = ctx.name(term);
                let class = *ctx.classes.get(term);
                let volatility = ctx.term_signals(term, &[SignalType::VolatilitySpike]);
                let anomalies = ctx.term_signals(term, &[SignalType::Anomaly]);
                let seasonal = ctx.term_signals(term, &[SignalType::SeasonalPattern]);

                let (text, related) = match class {
                    SeriesClass::Seasonal => {
                        let strength = seasonal
                            .first()
                            .and_then(|s| s.data_point("cyclicStrength"))
                            .unwrap_or(0.0);
                        let lag = seasonal
                            .first()
                            .and_then(|s| s.data_point("lag"))
                            .unwrap_or(0.0);
                        (
                            format!(
                                "{} follows a repeating pattern (cycle of {:.0} points, strength {:.2}); expect recurring highs and lows.",
                                name, lag, strength
                            ),
                            seasonal.clone(),
                        )
                    }
                    SeriesClass::EventDriven => (
                        format!(
                            "{} is mostly steady but punctuated by {} unusual data point(s).",
                            name,
                            anomalies.len()
                        ),
                        anomalies.clone(),
                    ),
                    SeriesClass::Noisy => {
                        let cv = volatility
                            .iter()
                            .filter_map(|s| s.data_point("cv"))
                            .fold(0.0_f64, f64::max);
                        (
                            format!(
                                "{} is noisy (coefficient of variation {:.2}); short-term readings are unreliable.",
                                name, cv
                            ),
                            volatility.iter().chain(anomalies.iter()).copied().collect(),
                        )
                    }
                    SeriesClass::RegimeShift => {
                        let mut related = ctx.term_signals(term, &[SignalType::MomentumShift]);
                        related.extend(
                            ctx.signals
                                .iter()
                                .filter(|s| s.is(SignalType::CorrelationChange)),
                        );
                        (
                            format!(
                                "{} appears to have shifted regime: a sharp momentum change coincides with a change in how the terms move together.",
                                name
                            ),
                            related,
                        )
                    }
                    SeriesClass::Stable if !volatility.is_empty() => (
                        format!(
                            "{} is broadly stable, with some elevated variation.",
                            name
                        ),
                        volatility.clone(),
                    ),
                    SeriesClass::Stable => (
                        format!("{} has been stable with no volatility or anomaly signals.", name),
                        Vec::new(),
                    ),
                };

                Draft::new(InterpretationCategory::StabilityAnalysis, term, text)
                    .evidence(format!("series class: {}", class))
                    .evidence(format!("volatility signals: {}", volatility.len()))
                    .evidence(format!("anomalies: {}", anomalies.len()))
                    .confidence(average_confidence(&related).unwrap_or(60.0))
                    .related(&related)
            })
            .collect()
    }
}

/// Stage B generator
pub struct InterpretationGenerator {
    rules: Vec<Box<dyn InterpretationRule>>,
}

impl Default for InterpretationGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpretationGenerator {
    /// Generator with the five built-in rules
    pub fn new() -> Self {
        let mut generator = Self { rules: vec![] };

        generator.register(Box::new(TrendRule));
        generator.register(Box::new(CompetitiveRule));
        generator.register(Box::new(PositioningRule));
        generator.register(Box::new(MomentumPatternRule));
        generator.register(Box::new(StabilityRule));

        generator
    }

    pub fn register(&mut self, rule: Box<dyn InterpretationRule>) {
        self.rules.push(rule);
    }

    pub fn generate(
        &self,
        terms: &Terms,
        signals: &[Signal],
        scores: &ComparisonScores,
        ctx: &GenerationContext,
    ) -> Vec<Interpretation> {
        let rule_ctx = RuleContext::new(terms, signals, scores);
        let freshness = ctx.freshness();

        let interpretations: Vec<Interpretation> = self
            .rules
            .iter()
            .flat_map(|rule| {
                let drafts = rule.interpret(&rule_ctx);
                tracing::debug!(rule = rule.name(), count = drafts.len(), "Interpretation rule complete");
                drafts
            })
            .map(|draft| Interpretation {
                id: short_id(
                    "int",
                    &json!({
                        "category": draft.category.as_str(),
                        "term": draft.term.as_str(),
                        "relatedSignals": draft.related_signals,
                        "generatedAt": ctx.generated_at.to_rfc3339(),
                    }),
                ),
                category: draft.category,
                term: draft.term,
                text: draft.text,
                evidence: draft.evidence,
                related_signals: draft.related_signals,
                confidence: draft.confidence,
                generated_at: ctx.generated_at,
                data_freshness: freshness.clone(),
            })
            .collect();

        tracing::debug!(count = interpretations.len(), "Interpretation generation complete");
        interpretations
    }
}
