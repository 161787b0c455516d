//! Stage C: decision guidance
//!
//! Each role gets two or three items built from fixed phrase templates. Only
//! numbers are interpolated into the text; terms are referred to by their
//! standing ("the leading term"), so the output vocabulary is closed.
//!
//! The marketer track has no rule that emits `pivot`. The founder track
//! answers regime shifts with `scale` (rising) or `pivot` (falling).

use chrono::Duration;
use serde_json::json;

use crate::hash::short_id;
use crate::models::{ComparisonScores, GenerationContext, TermRef};

use super::classify::{
    classify_series, sustainability, term_momentum, SeriesClass, Sustainability, STRONG_MOMENTUM,
};
use super::types::{
    Action, DecisionGuidance, GuidanceSet, Interpretation, InterpretationCategory as Category,
    RiskLevel, Role, Signal, SignalType, Timeframe,
};

pub const MIN_ITEMS_PER_ROLE: usize = 2;
pub const MAX_ITEMS_PER_ROLE: usize = 3;
/// Overall-score margin treated as a settled lead
pub const WIDE_MARGIN: f64 = 20.0;
/// Overall-score margin treated as contested
pub const NARROW_MARGIN: f64 = 10.0;

/// A guidance item before ids and dates are attached
#[derive(Debug, Clone)]
struct Candidate {
    action: Action,
    term: TermRef,
    recommendation: String,
    rationale: String,
    priority: u8,
    timeframe: Timeframe,
    risk_level: RiskLevel,
    risk_notes: Vec<String>,
    related: Vec<String>,
}

/// Everything the templates are gated on, computed once per run
struct Facts<'a> {
    margin: f64,
    leader: TermRef,
    /// Side that took the lead, when a crossover fired
    crossover: Option<(TermRef, f64)>,
    volatility_count: usize,
    /// Largest own-term momentum shift
    strongest_momentum: Option<(TermRef, f64)>,
    interpretations: &'a [Interpretation],
    signals: &'a [Signal],
    scores: &'a ComparisonScores,
}

impl<'a> Facts<'a> {
    fn new(
        signals: &'a [Signal],
        interpretations: &'a [Interpretation],
        scores: &'a ComparisonScores,
    ) -> Self {
        let crossover = signals
            .iter()
            .find(|s| s.is(SignalType::CompetitorCrossover))
            .map(|s| {
                let gap = s.data_point("gap").unwrap_or(0.0);
                let side = if gap >= 0.0 {
                    TermRef::TermA
                } else {
                    TermRef::TermB
                };
                (side, gap.abs())
            });

        let strongest_momentum = TermRef::sides()
            .into_iter()
            .filter_map(|t| term_momentum(signals, t).map(|m| (t, m)))
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));

        Self {
            margin: scores.margin(),
            leader: scores.leader(),
            crossover,
            volatility_count: signals
                .iter()
                .filter(|s| s.is(SignalType::VolatilitySpike))
                .count(),
            strongest_momentum,
            interpretations,
            signals,
            scores,
        }
    }

    fn side(&self, term: TermRef) -> &'static str {
        if term == TermRef::Both {
            "both terms"
        } else if term == self.leader {
            "the leading term"
        } else {
            "the trailing term"
        }
    }

    /// Interpretation ids in `categories` about `term` (joint ones always match)
    fn related(&self, categories: &[Category], term: TermRef) -> Vec<String> {
        self.interpretations
            .iter()
            .filter(|i| categories.contains(&i.category))
            .filter(|i| term == TermRef::Both || i.term == term || i.term == TermRef::Both)
            .map(|i| i.id.clone())
            .collect()
    }
}

fn candidate(
    action: Action,
    term: TermRef,
    priority: u8,
    timeframe: Timeframe,
    risk_level: RiskLevel,
) -> Candidate {
    Candidate {
        action,
        term,
        recommendation: String::new(),
        rationale: String::new(),
        priority,
        timeframe,
        risk_level,
        risk_notes: Vec::new(),
        related: Vec::new(),
    }
}

impl Candidate {
    fn text(mut self, recommendation: impl Into<String>, rationale: impl Into<String>) -> Self {
        self.recommendation = recommendation.into();
        self.rationale = rationale.into();
        self
    }

    fn note(mut self, note: &str) -> Self {
        self.risk_notes.push(note.to_string());
        self
    }

    fn related(mut self, ids: Vec<String>) -> Self {
        self.related = ids;
        self
    }
}

fn durability_risk(durability: Sustainability) -> RiskLevel {
    match durability {
        Sustainability::Sustainable => RiskLevel::Low,
        Sustainability::Uncertain => RiskLevel::Medium,
        Sustainability::Unsustainable => RiskLevel::High,
    }
}

fn marketer_candidates(f: &Facts<'_>) -> Vec<Candidate> {
    let mut out = Vec::new();

    if let Some((taker, gap)) = f.crossover {
        out.push(
            candidate(Action::InvestMore, taker, 1, Timeframe::Immediate, RiskLevel::Medium)
                .text(
                    "Shift campaign emphasis toward the term that just took the lead while the change is fresh.",
                    format!(
                        "Its recent average moved ahead by {:.1} points after trailing in the prior window.",
                        gap
                    ),
                )
                .note("Crossovers can reverse within a few data points; confirm on the next check.")
                .related(f.related(&[Category::CompetitiveDynamics], TermRef::Both)),
        );
    }

    if let Some((term, m)) = f.strongest_momentum.filter(|(_, m)| m.abs() > STRONG_MOMENTUM) {
        let durability = sustainability(f.signals, f.scores, term);
        let related = f.related(
            &[Category::TrendAnalysis, Category::GrowthPattern, Category::DeclinePattern],
            term,
        );
        let item = if m > 0.0 {
            candidate(Action::InvestMore, term, 2, Timeframe::ShortTerm, durability_risk(durability))
                .text(
                    format!(
                        "Increase content and campaign activity around {} to ride its upward momentum.",
                        f.side(term)
                    ),
                    format!("Momentum is {:+.1}% and looks {}.", m, durability),
                )
        } else {
            candidate(Action::InvestLess, term, 2, Timeframe::ShortTerm, durability_risk(durability))
                .text(
                    format!(
                        "Scale back paid promotion tied to {} until its downward momentum settles.",
                        f.side(term)
                    ),
                    format!("Momentum is {:+.1}% and looks {}.", m, durability),
                )
        };
        out.push(
            item.note("Momentum readings on short series can overstate the move.")
                .related(related),
        );
    }

    if f.volatility_count >= 1 {
        let risk = if f.volatility_count >= 2 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };
        out.push(
            candidate(Action::Optimize, TermRef::Both, 3, Timeframe::ShortTerm, risk)
                .text(
                    "Spread campaign timing across the period instead of reacting to individual spikes.",
                    format!(
                        "{} volatility signal(s) make single readings unreliable.",
                        f.volatility_count
                    ),
                )
                .note("Noisy series can hide a genuine change in direction.")
                .related(f.related(&[Category::StabilityAnalysis], TermRef::Both)),
        );
    }

    if f.margin >= WIDE_MARGIN && f.crossover.is_none() {
        out.push(
            candidate(Action::Maintain, f.leader, 3, Timeframe::MediumTerm, RiskLevel::Low)
                .text(
                    "Keep current messaging for the leading term; its position is well established.",
                    format!("The lead is {:.1} points on the overall score.", f.margin),
                )
                .note("A wide lead can still narrow if momentum turns.")
                .related(f.related(&[Category::MarketPositioning], f.leader)),
        );
    }

    if f.margin < NARROW_MARGIN {
        out.push(
            candidate(Action::Monitor, TermRef::Both, 2, Timeframe::ShortTerm, RiskLevel::Medium)
                .text(
                    "Track both terms weekly; the gap is narrow enough for the order to change.",
                    format!("The overall score gap is only {:.1} points.", f.margin),
                )
                .note("Small gaps are sensitive to a single unusual data point.")
                .related(f.related(&[Category::CompetitiveDynamics], TermRef::Both)),
        );
    }

    out
}

fn marketer_fallbacks(f: &Facts<'_>) -> Vec<Candidate> {
    vec![
        candidate(Action::Monitor, f.leader, 4, Timeframe::MediumTerm, RiskLevel::Low)
            .text(
                "Review the comparison again at the next scheduled check.",
                "No signal crossed an action threshold strongly enough to change course.",
            )
            .note("A quiet window says little about longer horizons.")
            .related(f.related(&[Category::TrendAnalysis], f.leader)),
        candidate(Action::Maintain, f.leader, 5, Timeframe::LongTerm, RiskLevel::Low)
            .text(
                "Keep the current campaign plan for the leading term.",
                format!("The leading term holds a {:.1}-point margin.", f.margin),
            )
            .note("Margins can move quickly when a new competitor enters the category.")
            .related(f.related(&[Category::MarketPositioning], f.leader)),
    ]
}

fn founder_candidates(f: &Facts<'_>) -> Vec<Candidate> {
    let mut out = Vec::new();

    for term in TermRef::sides() {
        if classify_series(f.signals, term) != SeriesClass::RegimeShift {
            continue;
        }
        let m = term_momentum(f.signals, term).unwrap_or(0.0);
        let item = if m > 0.0 {
            candidate(Action::Scale, term, 1, Timeframe::MediumTerm, RiskLevel::High).text(
                format!(
                    "Prepare to expand capacity around {}; its behaviour has changed, not just fluctuated.",
                    f.side(term)
                ),
                format!(
                    "Momentum of {:+.1}% coincides with a change in how the two terms move together.",
                    m
                ),
            )
        } else {
            candidate(Action::Pivot, term, 1, Timeframe::MediumTerm, RiskLevel::High).text(
                format!(
                    "Re-examine positioning around {}; its decline coincides with a structural change.",
                    f.side(term)
                ),
                format!(
                    "Momentum of {:+.1}% coincides with a change in how the two terms move together.",
                    m
                ),
            )
        };
        out.push(
            item.note("Regime calls on short histories need confirmation from at least one more period.")
                .related(f.related(&[Category::StabilityAnalysis, Category::TrendAnalysis], term)),
        );
    }

    if let Some((_, gap)) = f.crossover {
        out.push(
            candidate(Action::Monitor, TermRef::Both, 2, Timeframe::ShortTerm, RiskLevel::High)
                .text(
                    "Re-check the competitive picture within a week before committing to roadmap changes.",
                    format!("The lead changed hands; the recent gap is {:.1} points.", gap),
                )
                .note("Lead changes often oscillate before settling.")
                .related(f.related(&[Category::CompetitiveDynamics], TermRef::Both)),
        );
    }

    if let Some((term, m)) = f.strongest_momentum.filter(|(_, m)| m.abs() > STRONG_MOMENTUM) {
        let durability = sustainability(f.signals, f.scores, term);
        let score = f.scores.for_term(term).breakdown.momentum;
        let related = f.related(&[Category::GrowthPattern, Category::DeclinePattern], term);
        if m > 0.0 && durability == Sustainability::Sustainable {
            out.push(
                candidate(Action::Scale, term, 2, Timeframe::MediumTerm, RiskLevel::Medium)
                    .text(
                        format!(
                            "Plan for sustained demand around {}; the current growth is backed by its momentum score.",
                            f.side(term)
                        ),
                        format!("Momentum is {:+.1}% with a momentum score of {:.0}.", m, score),
                    )
                    .note("Sustained growth still depends on upstream data staying current.")
                    .related(related),
            );
        } else if m < 0.0 {
            out.push(
                candidate(Action::Optimize, term, 2, Timeframe::ShortTerm, durability_risk(durability))
                    .text(
                        format!(
                            "Review what drives engagement for {} before the decline deepens.",
                            f.side(term)
                        ),
                        format!("Momentum is {:+.1}% and looks {}.", m, durability),
                    )
                    .note("A single window of decline may be a pause rather than a trend.")
                    .related(related),
            );
        }
    }

    if f.margin >= WIDE_MARGIN && f.crossover.is_none() {
        out.push(
            candidate(Action::Maintain, f.leader, 3, Timeframe::LongTerm, RiskLevel::Low)
                .text(
                    "Keep the long-range plan for the leading term; its position is well established.",
                    format!("The lead is {:.1} points on the overall score.", f.margin),
                )
                .note("A wide lead can still narrow if momentum turns.")
                .related(f.related(&[Category::MarketPositioning], f.leader)),
        );
    }

    if f.volatility_count >= 2 {
        out.push(
            candidate(Action::Monitor, TermRef::Both, 3, Timeframe::ShortTerm, RiskLevel::High)
                .text(
                    "Hold roadmap decisions until the series settle.",
                    format!("{} volatility signals are active.", f.volatility_count),
                )
                .note("Noisy series can hide a genuine change in direction.")
                .related(f.related(&[Category::StabilityAnalysis], TermRef::Both)),
        );
    }

    out
}

fn founder_fallbacks(f: &Facts<'_>) -> Vec<Candidate> {
    vec![
        candidate(Action::Monitor, f.leader, 4, Timeframe::MediumTerm, RiskLevel::Low)
            .text(
                "Revisit the comparison at the next planning cycle.",
                "No signal crossed an action threshold strongly enough to change course.",
            )
            .note("A quiet window says little about longer horizons.")
            .related(f.related(&[Category::TrendAnalysis], f.leader)),
        candidate(Action::Optimize, f.leader, 5, Timeframe::LongTerm, RiskLevel::Low)
            .text(
                "Use the quiet period to refine positioning for the leading term.",
                format!("The leading term holds a {:.1}-point margin.", f.margin),
            )
            .note("Margins can move quickly when a new competitor enters the category.")
            .related(f.related(&[Category::MarketPositioning], f.leader)),
    ]
}

/// Order by priority, drop repeated (action, term) pairs, cap, then pad from fallbacks
fn select(mut candidates: Vec<Candidate>, fallbacks: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| c.priority);

    let mut selected: Vec<Candidate> = Vec::new();
    for c in candidates {
        if selected.len() == MAX_ITEMS_PER_ROLE {
            break;
        }
        if !selected.iter().any(|s| s.action == c.action && s.term == c.term) {
            selected.push(c);
        }
    }
    for c in fallbacks {
        if selected.len() >= MIN_ITEMS_PER_ROLE {
            break;
        }
        if !selected.iter().any(|s| s.action == c.action && s.term == c.term) {
            selected.push(c);
        }
    }
    selected
}

/// Stage C generator
#[derive(Debug, Default)]
pub struct GuidanceGenerator;

impl GuidanceGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(
        &self,
        signals: &[Signal],
        interpretations: &[Interpretation],
        scores: &ComparisonScores,
        ctx: &GenerationContext,
    ) -> GuidanceSet {
        let facts = Facts::new(signals, interpretations, scores);
        let freshness = ctx.freshness();

        let finish = |role: Role, items: Vec<Candidate>| -> Vec<DecisionGuidance> {
            items
                .into_iter()
                .map(|c| DecisionGuidance {
                    id: short_id(
                        "dg",
                        &json!({
                            "role": role.as_str(),
                            "action": c.action.as_str(),
                            "term": c.term.as_str(),
                            "generatedAt": ctx.generated_at.to_rfc3339(),
                        }),
                    ),
                    role,
                    action: c.action,
                    term: c.term,
                    recommendation: c.recommendation,
                    rationale: c.rationale,
                    priority: c.priority.clamp(1, 5),
                    timeframe: c.timeframe,
                    risk_level: c.risk_level,
                    risk_notes: c.risk_notes,
                    next_check: ctx.generated_on()
                        + Duration::days(c.timeframe.check_after_days()),
                    related_interpretations: c.related,
                    generated_at: ctx.generated_at,
                    data_freshness: freshness.clone(),
                })
                .collect()
        };

        let set = GuidanceSet {
            marketer: finish(
                Role::Marketer,
                select(marketer_candidates(&facts), marketer_fallbacks(&facts)),
            ),
            founder: finish(
                Role::Founder,
                select(founder_candidates(&facts), founder_fallbacks(&facts)),
            ),
        };

        tracing::debug!(
            marketer = set.marketer.len(),
            founder = set.founder.len(),
            "Guidance generation complete"
        );
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::test_utils::{context, scores, signal};

    const BANNED: [&str; 7] = [
        "buy",
        "sell",
        "investment",
        "profit",
        "loss",
        "revenue",
        "earnings",
    ];

    fn assert_bounded(set: &GuidanceSet) {
        for item in set.iter() {
            for text in [&item.recommendation, &item.rationale]
                .into_iter()
                .chain(item.risk_notes.iter())
            {
                let lower = text.to_lowercase();
                for word in BANNED {
                    assert!(!lower.contains(word), "{:?} contains {}", text, word);
                }
            }
        }
    }

    fn assert_shape(set: &GuidanceSet) {
        for role in Role::all() {
            let items = set.for_role(role);
            assert!(
                (MIN_ITEMS_PER_ROLE..=MAX_ITEMS_PER_ROLE).contains(&items.len()),
                "{} has {} items",
                role,
                items.len()
            );
            for item in items {
                assert!((1..=5).contains(&item.priority));
                assert!(!item.risk_notes.is_empty());
                assert!(!item.recommendation.is_empty());
                assert!(!item.rationale.is_empty());
                assert!(item.next_check > context().generated_on());
            }
        }
        assert!(set.marketer.iter().all(|g| g.action != Action::Pivot));
    }

    fn everything() -> Vec<Signal> {
        vec![
            signal(SignalType::MomentumShift, Severity::High, TermRef::TermA, &[("momentum", -42.0)]),
            signal(SignalType::MomentumShift, Severity::High, TermRef::TermB, &[("momentum", 38.0)]),
            signal(
                SignalType::MomentumShift,
                Severity::High,
                TermRef::Both,
                &[("momentumA", -42.0), ("momentumB", 38.0)],
            ),
            signal(SignalType::CorrelationChange, Severity::High, TermRef::Both, &[("change", -0.6)]),
            signal(
                SignalType::CompetitorCrossover,
                Severity::High,
                TermRef::Both,
                &[("gap", -16.0)],
            ),
            signal(SignalType::VolatilitySpike, Severity::Medium, TermRef::TermA, &[("cv", 0.8)]),
            signal(SignalType::VolatilitySpike, Severity::Low, TermRef::TermB, &[("cv", 0.6)]),
        ]
    }

    #[test]
    fn test_quiet_input_falls_back_to_two_items() {
        let set = GuidanceGenerator::new().generate(&[], &[], &scores(65.0, 50.0), &context());
        assert_shape(&set);
        assert_bounded(&set);
        assert_eq!(set.marketer.len(), 2);
        assert_eq!(set.founder.len(), 2);
    }

    #[test]
    fn test_busy_input_caps_at_three() {
        let set =
            GuidanceGenerator::new().generate(&everything(), &[], &scores(52.0, 50.0), &context());
        assert_shape(&set);
        assert_bounded(&set);
        assert_eq!(set.marketer.len(), 3);
        assert_eq!(set.founder.len(), 3);
        assert_eq!(set.marketer[0].action, Action::InvestMore);
        assert_eq!(set.marketer[0].term, TermRef::TermB);
    }

    #[test]
    fn test_founder_pivots_on_falling_regime_shift() {
        let set =
            GuidanceGenerator::new().generate(&everything(), &[], &scores(52.0, 50.0), &context());
        let pivot = set
            .founder
            .iter()
            .find(|g| g.action == Action::Pivot)
            .unwrap();
        assert_eq!(pivot.term, TermRef::TermA);
        assert_eq!(pivot.priority, 1);
        assert!(set
            .founder
            .iter()
            .any(|g| g.action == Action::Scale && g.term == TermRef::TermB));
    }

    #[test]
    fn test_wide_margin_maintains_leader() {
        let set = GuidanceGenerator::new().generate(&[], &[], &scores(40.0, 75.0), &context());
        assert!(set
            .marketer
            .iter()
            .any(|g| g.action == Action::Maintain && g.term == TermRef::TermB));
        assert_shape(&set);
    }

    #[test]
    fn test_ids_unique_per_run() {
        let set =
            GuidanceGenerator::new().generate(&everything(), &[], &scores(52.0, 50.0), &context());
        let ids: std::collections::HashSet<&String> = set.iter().map(|g| &g.id).collect();
        assert_eq!(ids.len(), set.iter().count());
    }
}
