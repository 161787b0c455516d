//! Fixture builders shared by unit and integration tests

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::collections::BTreeMap;

use crate::hash::short_id;
use crate::insights::input::InsightsInput;
use crate::insights::types::{Signal, SignalType};
use crate::models::{ComparisonScores, GenerationContext, Severity, TermRef, TermScore, Terms};
use crate::series::ComparisonSeries;

/// Fixed generation instant for fixtures
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap()
}

pub fn context() -> GenerationContext {
    GenerationContext::at(fixed_now(), "fixture")
}

/// First-of-month dates starting January 2024
pub fn monthly_dates(n: usize) -> Vec<NaiveDate> {
    (0..n)
        .map(|i| {
            NaiveDate::from_ymd_opt(2024 + (i / 12) as i32, (i % 12) as u32 + 1, 1).unwrap()
        })
        .collect()
}

/// Scores with only the overall value set
pub fn scores(a: f64, b: f64) -> ComparisonScores {
    ComparisonScores {
        term_a: TermScore {
            overall: a,
            ..Default::default()
        },
        term_b: TermScore {
            overall: b,
            ..Default::default()
        },
    }
}

/// Twelve monthly points per side, each `start + step * i`, for "Rust" vs "Go"
pub fn linear_input(a: (f64, f64), b: (f64, f64)) -> InsightsInput {
    let dates = monthly_dates(12);
    let line = |(start, step): (f64, f64)| -> Vec<f64> {
        (0..dates.len()).map(|i| start + step * i as f64).collect()
    };
    let terms = Terms::new("Rust", "Go");
    let series = ComparisonSeries::from_columns(&terms, &dates, &line(a), &line(b)).unwrap();
    InsightsInput::new(terms, series, scores(60.0, 50.0))
}

/// Hand-built signal with confidence 70
pub fn signal(
    signal_type: SignalType,
    severity: Severity,
    term: TermRef,
    data: &[(&str, f64)],
) -> Signal {
    let data_points: BTreeMap<String, f64> =
        data.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    let ctx = context();
    Signal {
        id: short_id(
            "sig",
            &json!({ "type": signal_type, "term": term, "data": data_points }),
        ),
        signal_type,
        severity,
        term,
        description: format!("{} fixture", signal_type),
        detected_at: ctx.generated_on(),
        confidence: 70.0,
        data_points: (!data_points.is_empty()).then_some(data_points),
        source: ctx.source.clone(),
        generated_at: ctx.generated_at,
    }
}
