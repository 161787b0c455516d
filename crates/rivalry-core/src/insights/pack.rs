//! Stage E: the insights pack
//!
//! `data_hash` addresses the input (cleaned series, timeframe, terms, engine
//! version) and is the cache key. `insights_hash` covers a reduced projection
//! of the output (ids, categories, terms, actions) so wording changes do not
//! invalidate anything keyed on it.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::hash::stable_hash_value;
use crate::models::{DataFreshness, Forecasts, GenerationContext, PeakPoint, Peaks, TermRef, Terms};
use crate::series::TermSeries;
use crate::stats;

use super::input::InsightsInput;
use super::summary::SignalsSummary;
use super::types::{GuidanceSet, Interpretation};

/// Version stamped on every pack and mixed into the data hash
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Derived peaks kept per term
pub const MAX_DERIVED_PEAKS: usize = 5;
/// Minimum peak prominence as a share of the series range
pub const PEAK_PROMINENCE_RATIO: f64 = 0.1;

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

/// URL-safe slug of one term
pub fn slugify(term: &str) -> String {
    slug_re()
        .replace_all(&term.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// `<a>-vs-<b>`
pub fn comparison_slug(terms: &Terms) -> String {
    format!("{}-vs-{}", slugify(&terms.term_a), slugify(&terms.term_b))
}

/// The versioned terminal artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsPack {
    pub version: String,
    pub slug: String,
    pub terms: Terms,
    pub timeframe: String,
    pub geo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub signals: SignalsSummary,
    pub interpretations: Vec<Interpretation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_guidance: Option<GuidanceSet>,
    pub forecasts: Forecasts,
    pub peaks: Peaks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<Value>,
    pub insights_hash: String,
    pub data_hash: String,
    pub generated_at: DateTime<Utc>,
    pub data_freshness: DataFreshness,
}

impl InsightsPack {
    /// Whether the optional forecast or AI sections still need filling in
    pub fn needs_warmup(&self) -> bool {
        self.forecasts.is_empty() || self.ai_insights.is_none()
    }

    /// Recompute the output hash from the current contents
    pub fn compute_insights_hash(&self) -> String {
        insights_hash(
            &self.version,
            &self.slug,
            &self.signals,
            &self.interpretations,
            self.decision_guidance.as_ref(),
            &self.forecasts,
            &self.peaks,
            self.ai_insights.is_some(),
        )
    }
}

/// Hash of the input that determines the pack; used as the cache key
pub fn data_hash(input: &InsightsInput) -> String {
    stable_hash_value(&json!({
        "series": input.series.to_points(),
        "timeframe": input.timeframe,
        "geo": input.geo,
        "terms": input.terms,
        "engineVersion": ENGINE_VERSION,
    }))
}

#[allow(clippy::too_many_arguments)]
fn insights_hash(
    version: &str,
    slug: &str,
    summary: &SignalsSummary,
    interpretations: &[Interpretation],
    guidance: Option<&GuidanceSet>,
    forecasts: &Forecasts,
    peaks: &Peaks,
    has_ai: bool,
) -> String {
    let interpretations: Vec<Value> = interpretations
        .iter()
        .map(|i| json!({ "id": i.id, "category": i.category, "term": i.term }))
        .collect();
    let guidance: Vec<Value> = guidance
        .map(|g| {
            g.iter()
                .map(|d| json!({ "id": d.id, "role": d.role, "action": d.action, "term": d.term }))
                .collect()
        })
        .unwrap_or_default();
    let forecast_directions = json!({
        "termA": forecasts.term_a.as_ref().map(|f| f.direction),
        "termB": forecasts.term_b.as_ref().map(|f| f.direction),
    });
    let peak_dates = json!({
        "termA": peaks.term_a.iter().map(|p| p.date).collect::<Vec<_>>(),
        "termB": peaks.term_b.iter().map(|p| p.date).collect::<Vec<_>>(),
    });

    stable_hash_value(&json!({
        "version": version,
        "slug": slug,
        "summary": {
            "winner": summary.winner,
            "classification": summary.classification,
            "leaderChangeRisk": summary.leader_change_risk,
            "volatility": summary.volatility,
        },
        "interpretations": interpretations,
        "guidance": guidance,
        "forecasts": forecast_directions,
        "peaks": peak_dates,
        "hasAi": has_ai,
    }))
}

/// Up to `MAX_DERIVED_PEAKS` local peaks, highest value first
pub fn derive_peaks(series: &TermSeries) -> Vec<PeakPoint> {
    let values = series.values();
    let range = stats::max(&values) - stats::min(&values);
    let mut peaks: Vec<PeakPoint> = stats::find_peaks(&values, range * PEAK_PROMINENCE_RATIO)
        .into_iter()
        .map(|i| PeakPoint {
            date: series.points[i].0,
            value: series.points[i].1,
        })
        .collect();
    peaks.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.date.cmp(&b.date)));
    peaks.truncate(MAX_DERIVED_PEAKS);
    peaks
}

/// Caller-supplied peaks when present, otherwise derived from the series
pub fn resolve_peaks(input: &InsightsInput) -> Peaks {
    match &input.peaks {
        Some(peaks) if !peaks.is_empty() => peaks.clone(),
        _ => Peaks {
            term_a: derive_peaks(input.series.term(TermRef::TermA)),
            term_b: derive_peaks(input.series.term(TermRef::TermB)),
        },
    }
}

/// Assemble the terminal artifact from the stage outputs
pub fn build_insights_pack(
    input: &InsightsInput,
    summary: SignalsSummary,
    interpretations: Vec<Interpretation>,
    guidance: GuidanceSet,
    ctx: &GenerationContext,
) -> InsightsPack {
    let mut pack = InsightsPack {
        version: ENGINE_VERSION.to_string(),
        slug: comparison_slug(&input.terms),
        terms: input.terms.clone(),
        timeframe: input.timeframe.clone(),
        geo: input.geo.clone(),
        category: input.category.clone(),
        signals: summary,
        interpretations,
        decision_guidance: Some(guidance),
        forecasts: input.forecasts.clone(),
        peaks: resolve_peaks(input),
        ai_insights: input.ai_insights.clone(),
        insights_hash: String::new(),
        data_hash: data_hash(input),
        generated_at: ctx.generated_at,
        data_freshness: ctx.freshness(),
    };
    pack.insights_hash = pack.compute_insights_hash();

    tracing::debug!(
        slug = %pack.slug,
        interpretations = pack.interpretations.len(),
        insights_hash = %&pack.insights_hash[..12],
        "Insights pack assembled"
    );
    pack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::summary::create_signals_summary;
    use crate::models::{ForecastDirection, ForecastHint};
    use crate::test_utils::linear_input;

    #[test]
    fn test_slugs() {
        assert_eq!(slugify("Visual Studio Code"), "visual-studio-code");
        assert_eq!(slugify("  C++ / Rust! "), "c-rust");
        assert_eq!(
            comparison_slug(&Terms::new("ChatGPT", "Claude AI")),
            "chatgpt-vs-claude-ai"
        );
    }

    #[test]
    fn test_data_hash_depends_on_input_only() {
        let input = linear_input((50.0, 2.0), (50.0, 1.0));
        let mut other = input.clone();
        other.ai_insights = Some(json!({"note": "extra"}));
        assert_eq!(data_hash(&input), data_hash(&other));

        other.timeframe = "5y".to_string();
        assert_ne!(data_hash(&input), data_hash(&other));
    }

    #[test]
    fn test_derived_peaks_ranked_by_value() {
        let mut input = linear_input((50.0, 0.0), (50.0, 0.0));
        for (i, v) in [(2, 70.0), (6, 90.0), (9, 60.0)] {
            input.series.term_a.points[i].1 = v;
        }
        let peaks = derive_peaks(&input.series.term_a);
        let values: Vec<f64> = peaks.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![90.0, 70.0, 60.0]);
        assert!(derive_peaks(&input.series.term_b).is_empty());
    }

    #[test]
    fn test_supplied_peaks_win() {
        let input = linear_input((50.0, 0.0), (50.0, 0.0));
        let supplied = Peaks {
            term_a: vec![PeakPoint {
                date: input.series.term_a.points[3].0,
                value: 99.0,
            }],
            term_b: vec![],
        };
        let input = input.with_peaks(supplied.clone());
        assert_eq!(resolve_peaks(&input), supplied);
    }

    #[test]
    fn test_needs_warmup() {
        let mut forecasts = Forecasts::default();
        let empty = forecasts.clone();
        forecasts.term_a = Some(ForecastHint {
            direction: ForecastDirection::Stable,
            confidence: 60.0,
            projected_change: None,
            horizon_days: None,
        });

        let pack = |forecasts: Forecasts, ai: Option<Value>| -> bool {
            let input = linear_input((50.0, 1.0), (50.0, 1.0)).with_forecasts(forecasts);
            let input = match ai {
                Some(ai) => input.with_ai_insights(ai),
                None => input,
            };
            let ctx = crate::test_utils::context();
            build_insights_pack(
                &input,
                create_signals_summary(&[], &input.scores),
                vec![],
                GuidanceSet::default(),
                &ctx,
            )
            .needs_warmup()
        };

        assert!(pack(empty.clone(), None));
        assert!(pack(forecasts.clone(), None));
        assert!(pack(empty, Some(json!({"summary": "x"}))));
        assert!(!pack(forecasts, Some(json!({"summary": "x"}))));
    }
}
