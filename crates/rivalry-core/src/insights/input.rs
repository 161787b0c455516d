//! Pipeline input
//!
//! `InsightsRequest` is the wire form (raw rows keyed by column name);
//! `InsightsInput` is the resolved form every stage reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    AnomalyPoint, ComparisonScores, DataSource, Forecasts, GenerationContext, Peaks, Terms,
};
use crate::series::{ComparisonSeries, SeriesPoint};

pub const DEFAULT_TIMEFRAME: &str = "12m";
pub const DEFAULT_GEO: &str = "global";
/// Provider recorded when a request carries no source
pub const DEFAULT_PROVIDER: &str = "input";

fn default_timeframe() -> String {
    DEFAULT_TIMEFRAME.to_string()
}

fn default_geo() -> String {
    DEFAULT_GEO.to_string()
}

/// A comparison as supplied by the upstream producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsRequest {
    pub terms: Terms,
    pub series: Vec<SeriesPoint>,
    #[serde(default)]
    pub scores: ComparisonScores,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    #[serde(default = "default_geo")]
    pub geo: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub anomalies: Vec<AnomalyPoint>,
    #[serde(default)]
    pub peaks: Option<Peaks>,
    #[serde(default)]
    pub forecasts: Forecasts,
    #[serde(default)]
    pub ai_insights: Option<Value>,
    /// Provenance of the series; defaults to the caller's provider at generation time
    #[serde(default)]
    pub source: Option<DataSource>,
    /// Generation instant; callers supply this for reproducible output
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl InsightsRequest {
    /// Resolve term columns and clean the rows
    pub fn to_input(&self) -> Result<InsightsInput> {
        let series = ComparisonSeries::from_points(&self.series, &self.terms)?;
        Ok(InsightsInput {
            terms: self.terms.clone(),
            series,
            scores: self.scores,
            timeframe: self.timeframe.clone(),
            geo: self.geo.clone(),
            category: self.category.clone(),
            anomalies: self.anomalies.clone(),
            peaks: self.peaks.clone(),
            forecasts: self.forecasts.clone(),
            ai_insights: self.ai_insights.clone(),
        })
    }

    /// Context for this request; `now` is used when no instant was supplied
    pub fn context(&self, now: DateTime<Utc>) -> GenerationContext {
        let generated_at = self.generated_at.unwrap_or(now);
        match &self.source {
            Some(source) => GenerationContext::new(generated_at, source.clone()),
            None => GenerationContext::at(generated_at, DEFAULT_PROVIDER),
        }
    }
}

/// Resolved input shared by every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsInput {
    pub terms: Terms,
    pub series: ComparisonSeries,
    pub scores: ComparisonScores,
    pub timeframe: String,
    pub geo: String,
    pub category: Option<String>,
    pub anomalies: Vec<AnomalyPoint>,
    /// Caller-supplied peaks; derived from the series when absent
    pub peaks: Option<Peaks>,
    pub forecasts: Forecasts,
    pub ai_insights: Option<Value>,
}

impl InsightsInput {
    pub fn new(terms: Terms, series: ComparisonSeries, scores: ComparisonScores) -> Self {
        Self {
            terms,
            series,
            scores,
            timeframe: default_timeframe(),
            geo: default_geo(),
            category: None,
            anomalies: Vec::new(),
            peaks: None,
            forecasts: Forecasts::default(),
            ai_insights: None,
        }
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    pub fn with_geo(mut self, geo: impl Into<String>) -> Self {
        self.geo = geo.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_anomalies(mut self, anomalies: Vec<AnomalyPoint>) -> Self {
        self.anomalies = anomalies;
        self
    }

    pub fn with_peaks(mut self, peaks: Peaks) -> Self {
        self.peaks = Some(peaks);
        self
    }

    pub fn with_forecasts(mut self, forecasts: Forecasts) -> Self {
        self.forecasts = forecasts;
        self
    }

    pub fn with_ai_insights(mut self, ai_insights: Value) -> Self {
        self.ai_insights = Some(ai_insights);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: InsightsRequest = serde_json::from_value(json!({
            "terms": {"termA": "Rust", "termB": "Go"},
            "series": [
                {"date": "2024-01-01", "rust": 50, "go": 40},
                {"date": "2024-02-01", "rust": 55, "go": 42}
            ]
        }))
        .unwrap();

        assert_eq!(request.timeframe, DEFAULT_TIMEFRAME);
        assert_eq!(request.geo, DEFAULT_GEO);
        assert!(request.anomalies.is_empty());
        assert!(request.generated_at.is_none());

        let input = request.to_input().unwrap();
        assert_eq!(input.series.term_a.values(), vec![50.0, 55.0]);
        assert_eq!(input.series.term_b.values(), vec![40.0, 42.0]);
    }

    #[test]
    fn test_request_with_unknown_term_fails() {
        let request: InsightsRequest = serde_json::from_value(json!({
            "terms": {"termA": "Rust", "termB": "Zig"},
            "series": [{"date": "2024-01-01", "rust": 50, "go": 40}]
        }))
        .unwrap();
        assert!(matches!(request.to_input(), Err(Error::TermNotFound(_))));
    }

    #[test]
    fn test_request_context() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let mut request: InsightsRequest = serde_json::from_value(json!({
            "terms": {"termA": "Rust", "termB": "Go"},
            "series": [],
            "generatedAt": "2024-12-01T00:00:00Z",
            "source": {"provider": "trends", "lastUpdatedAt": "2024-11-28T00:00:00Z"}
        }))
        .unwrap();

        let ctx = request.context(now);
        assert_eq!(ctx.generated_on().to_string(), "2024-12-01");
        assert_eq!(ctx.source.provider, "trends");
        assert!(ctx.freshness().is_stale);

        request.generated_at = None;
        request.source = None;
        let ctx = request.context(now);
        assert_eq!(ctx.generated_at, now);
        assert_eq!(ctx.source.provider, DEFAULT_PROVIDER);
        assert!(!ctx.freshness().is_stale);
    }
}
