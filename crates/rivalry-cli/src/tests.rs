//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use rivalry_core::insights::InsightsRequest;
use rivalry_core::InMemoryCache;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use crate::commands::{self, AnalyzeSource};

fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Twelve monthly points: Rust falls 60 -> 38 while Go rises 40 -> 62
fn crossover_request() -> Value {
    let series: Vec<Value> = (0..12)
        .map(|i| {
            json!({
                "date": format!("2024-{:02}-01", i + 1),
                "Rust": 60 - 2 * i,
                "Go": 40 + 2 * i,
            })
        })
        .collect();
    json!({
        "terms": {"termA": "Rust", "termB": "Go"},
        "series": series,
        "scores": {
            "termA": {"overall": 48.0},
            "termB": {"overall": 52.0}
        },
        "generatedAt": "2024-12-31T00:00:00Z"
    })
}

fn crossover_file() -> NamedTempFile {
    write_temp(&crossover_request().to_string(), ".json")
}

// ========== Request Loading Tests ==========

#[test]
fn test_read_request() {
    let file = crossover_file();
    let request = commands::read_request(file.path()).unwrap();
    assert_eq!(request.terms.term_a, "Rust");
    assert_eq!(request.series.len(), 12);
    assert_eq!(request.timeframe, "12m");
}

#[test]
fn test_read_request_invalid_json() {
    let file = write_temp("{not json", ".json");
    assert!(commands::read_request(file.path()).is_err());
}

#[test]
fn test_read_request_missing_file() {
    assert!(commands::read_request(&PathBuf::from("/nonexistent/request.json")).is_err());
}

#[test]
fn test_request_from_csv_matches_normalized_columns() {
    let file = write_temp(
        "date,rust-lang,GO\n2024-01-01,50,40\n2024-02-01,55,42\n2024-03-01,,44\n",
        ".csv",
    );
    let request = commands::request_from_csv(file.path(), "Rust Lang", "go", "5y", "US").unwrap();
    assert_eq!(request.timeframe, "5y");
    assert_eq!(request.geo, "US");

    let input = request.to_input().unwrap();
    assert_eq!(input.series.term_a.values(), vec![50.0, 55.0]);
    assert_eq!(input.series.term_b.values(), vec![40.0, 42.0, 44.0]);
}

#[test]
fn test_apply_generated_at() {
    let file = crossover_file();
    let mut request = commands::read_request(file.path()).unwrap();
    commands::apply_generated_at(&mut request, Some("2025-01-15T12:00:00+00:00")).unwrap();
    assert_eq!(
        request.generated_at.unwrap().to_rfc3339(),
        "2025-01-15T12:00:00+00:00"
    );

    assert!(commands::apply_generated_at(&mut request, Some("yesterday")).is_err());
}

// ========== Analyze Command Tests ==========

#[test]
fn test_analyze_source_from_args() {
    let source = AnalyzeSource::from_args(Some("a.json".into()), None, None, None).unwrap();
    assert_eq!(source, AnalyzeSource::Json("a.json".into()));

    let source = AnalyzeSource::from_args(
        None,
        Some("t.csv".into()),
        Some("Rust".into()),
        Some("Go".into()),
    )
    .unwrap();
    assert!(matches!(source, AnalyzeSource::Csv { .. }));

    assert!(AnalyzeSource::from_args(None, Some("t.csv".into()), None, None).is_err());
    assert!(AnalyzeSource::from_args(None, None, None, None).is_err());
}

#[tokio::test]
async fn test_run_analysis_crossover() {
    let request: InsightsRequest = serde_json::from_value(crossover_request()).unwrap();
    let cache = InMemoryCache::new();
    let response = commands::run_analysis(Default::default(), &request, &cache)
        .await
        .unwrap();

    let pack = &response.pack;
    assert_eq!(pack.slug, "rust-vs-go");
    assert_eq!(pack.generated_at.to_rfc3339(), "2024-12-31T00:00:00+00:00");
    assert!(response.needs_warmup);
    assert!(response.cache_key.starts_with("insights:"));

    let guidance = pack.decision_guidance.as_ref().unwrap();
    assert!((2..=3).contains(&guidance.marketer.len()));
    assert!((2..=3).contains(&guidance.founder.len()));

    let text = commands::render_text(&response);
    assert!(text.contains("Rust vs Go"));
    assert!(text.contains("Leader-change risk: high"));
    assert!(text.contains("Marketer"));
}

#[tokio::test]
async fn test_run_analysis_is_cached() {
    let request: InsightsRequest = serde_json::from_value(crossover_request()).unwrap();
    let cache = InMemoryCache::new();
    let first = commands::run_analysis(Default::default(), &request, &cache)
        .await
        .unwrap();
    let second = commands::run_analysis(Default::default(), &request, &cache)
        .await
        .unwrap();
    assert_eq!(first.pack, second.pack);
    assert_eq!(cache.compute_count(), 1);
}

#[tokio::test]
async fn test_cmd_analyze_json_and_text() {
    let file = crossover_file();
    let source = AnalyzeSource::Json(file.path().to_path_buf());
    for format in [crate::cli::OutputFormat::Json, crate::cli::OutputFormat::Text] {
        let result = commands::cmd_analyze(None, &source, "12m", "global", None, format).await;
        assert!(result.is_ok());
    }
}

#[tokio::test]
async fn test_cmd_analyze_unknown_term_fails() {
    let mut request = crossover_request();
    request["terms"]["termB"] = json!("Zig");
    let file = write_temp(&request.to_string(), ".json");
    let source = AnalyzeSource::Json(file.path().to_path_buf());
    let result = commands::cmd_analyze(
        None,
        &source,
        "12m",
        "global",
        None,
        crate::cli::OutputFormat::Json,
    )
    .await;
    assert!(result.is_err());
}

// ========== Signals Command Tests ==========

#[test]
fn test_signals_json_contains_crossover() {
    let request: InsightsRequest = serde_json::from_value(crossover_request()).unwrap();
    let output = commands::signals_json(&Default::default(), &request).unwrap();
    let signals: Vec<Value> = serde_json::from_str(&output).unwrap();
    assert!(signals
        .iter()
        .any(|s| s["type"] == "competitor_crossover" && s["term"] == "both"));
}

#[test]
fn test_signals_are_reproducible_with_fixed_instant() {
    let request: InsightsRequest = serde_json::from_value(crossover_request()).unwrap();
    let first = commands::signals_json(&Default::default(), &request).unwrap();
    let second = commands::signals_json(&Default::default(), &request).unwrap();
    assert_eq!(first, second);
}

// ========== Hash Command Tests ==========

#[test]
fn test_hash_ignores_key_order() {
    let a = write_temp(r#"{"b": 1, "a": [1, 2]}"#, ".json");
    let b = write_temp(r#"{"a": [1, 2], "b": 1}"#, ".json");
    let hash = commands::hash_file(a.path()).unwrap();
    assert_eq!(hash, commands::hash_file(b.path()).unwrap());
    assert_eq!(hash.len(), 64);
}

#[test]
fn test_hash_invalid_json() {
    let file = write_temp("not json", ".json");
    assert!(commands::hash_file(file.path()).is_err());
}

// ========== Config Command Tests ==========

#[test]
fn test_render_config_with_override() {
    let file = write_temp("[signals]\nmomentum_threshold = 25.0\n", ".toml");
    let rendered = commands::render_config(Some(file.path()), false).unwrap();
    assert!(rendered.contains("momentum_threshold = 25.0"));
    assert!(rendered.contains("cv_threshold = 0.5"));
}

#[test]
fn test_render_config_path() {
    let file = write_temp("", ".toml");
    let rendered = commands::render_config(Some(file.path()), true).unwrap();
    assert_eq!(rendered, file.path().display().to_string());

    let missing = commands::render_config(Some(&PathBuf::from("/nonexistent/engine.toml")), true)
        .unwrap();
    assert!(missing.contains("not present"));
}

#[test]
fn test_render_config_invalid_override() {
    let file = write_temp("[signals\nbroken", ".toml");
    assert!(commands::render_config(Some(file.path()), false).is_err());
}
