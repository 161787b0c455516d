//! Shared command utilities
//!
//! This module contains:
//! - `load_config` - Resolve the engine config
//! - `read_request` / `request_from_csv` - Load a comparison request
//! - `apply_generated_at` - Pin the generation instant from `--generated-at`

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rivalry_core::insights::InsightsRequest;
use rivalry_core::models::{ComparisonScores, Forecasts, Terms};
use rivalry_core::series::read_csv;
use rivalry_core::EngineConfig;

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path).context("Failed to load engine config")
}

/// Read a JSON comparison request
pub fn read_request(path: &Path) -> Result<InsightsRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid comparison request in {}", path.display()))
}

/// Build a request from a `date,<term>,<term>` table; scores default to zero
pub fn request_from_csv(
    path: &Path,
    term_a: &str,
    term_b: &str,
    timeframe: &str,
    geo: &str,
) -> Result<InsightsRequest> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let series = read_csv(file).with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(InsightsRequest {
        terms: Terms::new(term_a, term_b),
        series,
        scores: ComparisonScores::default(),
        timeframe: timeframe.to_string(),
        geo: geo.to_string(),
        category: None,
        anomalies: Vec::new(),
        peaks: None,
        forecasts: Forecasts::default(),
        ai_insights: None,
        source: None,
        generated_at: None,
    })
}

pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("Invalid instant '{}' (expected RFC 3339)", s))
}

/// `--generated-at` wins over the instant carried by the request
pub fn apply_generated_at(request: &mut InsightsRequest, generated_at: Option<&str>) -> Result<()> {
    if let Some(s) = generated_at {
        request.generated_at = Some(parse_instant(s)?);
    }
    Ok(())
}
