//! Domain models shared across the pipeline
//!
//! Term references, composite scores, the optional upstream extras
//! (anomalies, peaks, forecast hints) and the per-run generation context.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source data older than this at generation time is flagged stale
pub const STALE_AFTER_HOURS: i64 = 48;

/// Which side of the comparison something refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TermRef {
    #[serde(rename = "termA")]
    TermA,
    #[serde(rename = "termB")]
    TermB,
    #[serde(rename = "both")]
    Both,
}

impl TermRef {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermRef::TermA => "termA",
            TermRef::TermB => "termB",
            TermRef::Both => "both",
        }
    }

    /// The opposing side; `Both` maps to itself
    pub fn other(&self) -> TermRef {
        match self {
            TermRef::TermA => TermRef::TermB,
            TermRef::TermB => TermRef::TermA,
            TermRef::Both => TermRef::Both,
        }
    }

    /// The two single-term sides, in order
    pub fn sides() -> [TermRef; 2] {
        [TermRef::TermA, TermRef::TermB]
    }
}

impl fmt::Display for TermRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TermRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "termA" => Ok(TermRef::TermA),
            "termB" => Ok(TermRef::TermB),
            "both" => Ok(TermRef::Both),
            _ => Err(format!("Unknown term reference: {}", s)),
        }
    }
}

/// Severity shared by signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// The two compared term names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terms {
    pub term_a: String,
    pub term_b: String,
}

impl Terms {
    pub fn new(term_a: impl Into<String>, term_b: impl Into<String>) -> Self {
        Self {
            term_a: term_a.into(),
            term_b: term_b.into(),
        }
    }

    pub fn name(&self, term: TermRef) -> &str {
        match term {
            TermRef::TermA => &self.term_a,
            TermRef::TermB => &self.term_b,
            TermRef::Both => "both",
        }
    }
}

/// Component scores supplied by the upstream scoring collaborator (0-100 each)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub search_interest: f64,
    pub social_buzz: f64,
    pub authority: f64,
    pub momentum: f64,
}

impl ScoreBreakdown {
    /// Label and value of the highest component
    pub fn strongest(&self) -> (&'static str, f64) {
        [
            ("search interest", self.search_interest),
            ("social buzz", self.social_buzz),
            ("authority", self.authority),
            ("momentum", self.momentum),
        ]
        .into_iter()
        .fold(("search interest", f64::MIN), |best, item| {
            if item.1 > best.1 {
                item
            } else {
                best
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermScore {
    pub overall: f64,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
}

/// Composite scores for both sides of a comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonScores {
    pub term_a: TermScore,
    pub term_b: TermScore,
}

impl ComparisonScores {
    pub fn for_term(&self, term: TermRef) -> &TermScore {
        match term {
            TermRef::TermB => &self.term_b,
            _ => &self.term_a,
        }
    }

    /// Higher overall score; `Both` on an exact tie
    pub fn winner(&self) -> TermRef {
        if self.term_a.overall > self.term_b.overall {
            TermRef::TermA
        } else if self.term_b.overall > self.term_a.overall {
            TermRef::TermB
        } else {
            TermRef::Both
        }
    }

    /// Side treated as the leader; ties resolve to term A
    pub fn leader(&self) -> TermRef {
        match self.winner() {
            TermRef::TermB => TermRef::TermB,
            _ => TermRef::TermA,
        }
    }

    /// Absolute gap between the overall scores
    pub fn margin(&self) -> f64 {
        (self.term_a.overall - self.term_b.overall).abs()
    }
}

/// Anomalous point reported by an upstream detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyPoint {
    pub term: TermRef,
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    pub z_score: f64,
    /// Detector confidence (0-100); derived from the z-score when absent
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Peak points per side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peaks {
    #[serde(default)]
    pub term_a: Vec<PeakPoint>,
    #[serde(default)]
    pub term_b: Vec<PeakPoint>,
}

impl Peaks {
    pub fn is_empty(&self) -> bool {
        self.term_a.is_empty() && self.term_b.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastDirection {
    Rising,
    Falling,
    Stable,
}

impl ForecastDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastDirection::Rising => "rising",
            ForecastDirection::Falling => "falling",
            ForecastDirection::Stable => "stable",
        }
    }
}

/// Direction/confidence hint from an upstream forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastHint {
    pub direction: ForecastDirection,
    /// 0-100
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_days: Option<u32>,
}

/// Forecast hints per side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecasts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_a: Option<ForecastHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_b: Option<ForecastHint>,
}

impl Forecasts {
    pub fn for_term(&self, term: TermRef) -> Option<&ForecastHint> {
        match term {
            TermRef::TermA => self.term_a.as_ref(),
            TermRef::TermB => self.term_b.as_ref(),
            TermRef::Both => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.term_a.is_none() && self.term_b.is_none()
    }
}

/// Where the series came from and when it was last refreshed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub provider: String,
    pub last_updated_at: DateTime<Utc>,
}

/// Age of the source data relative to the generation instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFreshness {
    pub last_updated_at: DateTime<Utc>,
    pub provider: String,
    pub age_hours: i64,
    pub is_stale: bool,
}

/// Per-run context: one generation instant reused for every entity of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    pub generated_at: DateTime<Utc>,
    pub source: DataSource,
}

impl GenerationContext {
    pub fn new(generated_at: DateTime<Utc>, source: DataSource) -> Self {
        Self {
            generated_at,
            source,
        }
    }

    /// Context whose source was refreshed at the generation instant
    pub fn at(generated_at: DateTime<Utc>, provider: impl Into<String>) -> Self {
        Self::new(
            generated_at,
            DataSource {
                provider: provider.into(),
                last_updated_at: generated_at,
            },
        )
    }

    pub fn freshness(&self) -> DataFreshness {
        let age = (self.generated_at - self.source.last_updated_at).max(Duration::zero());
        DataFreshness {
            last_updated_at: self.source.last_updated_at,
            provider: self.source.provider.clone(),
            age_hours: age.num_hours(),
            is_stale: age.num_hours() > STALE_AFTER_HOURS,
        }
    }

    /// Calendar date of the generation instant
    pub fn generated_on(&self) -> NaiveDate {
        self.generated_at.date_naive()
    }
}
