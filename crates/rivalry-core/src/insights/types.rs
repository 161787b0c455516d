//! Core types for the insights pipeline

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{DataFreshness, DataSource, Severity, TermRef};

/// Kinds of statistical observation Stage A can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    MomentumShift,
    VolatilitySpike,
    CorrelationChange,
    CompetitorCrossover,
    SeasonalPattern,
    Anomaly,
    VolumeSurge,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::MomentumShift => "momentum_shift",
            SignalType::VolatilitySpike => "volatility_spike",
            SignalType::CorrelationChange => "correlation_change",
            SignalType::CompetitorCrossover => "competitor_crossover",
            SignalType::SeasonalPattern => "seasonal_pattern",
            SignalType::Anomaly => "anomaly",
            SignalType::VolumeSurge => "volume_surge",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "momentum_shift" => Ok(SignalType::MomentumShift),
            "volatility_spike" => Ok(SignalType::VolatilitySpike),
            "correlation_change" => Ok(SignalType::CorrelationChange),
            "competitor_crossover" => Ok(SignalType::CompetitorCrossover),
            "seasonal_pattern" => Ok(SignalType::SeasonalPattern),
            "anomaly" => Ok(SignalType::Anomaly),
            "volume_surge" => Ok(SignalType::VolumeSurge),
            _ => Err(format!("Unknown signal type: {}", s)),
        }
    }
}

/// An atomic, typed observation about one or both series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Hash of (term, type-specific payload, generation instant)
    pub id: String,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub severity: Severity,
    pub term: TermRef,
    pub description: String,
    pub detected_at: NaiveDate,
    /// 0-100
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_points: Option<BTreeMap<String, f64>>,
    pub source: DataSource,
    pub generated_at: DateTime<Utc>,
}

impl Signal {
    /// A named numeric value recorded with the signal
    pub fn data_point(&self, key: &str) -> Option<f64> {
        self.data_points.as_ref().and_then(|d| d.get(key).copied())
    }

    pub fn is(&self, signal_type: SignalType) -> bool {
        self.signal_type == signal_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationCategory {
    TrendAnalysis,
    CompetitiveDynamics,
    MarketPositioning,
    GrowthPattern,
    DeclinePattern,
    StabilityAnalysis,
}

impl InterpretationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpretationCategory::TrendAnalysis => "trend_analysis",
            InterpretationCategory::CompetitiveDynamics => "competitive_dynamics",
            InterpretationCategory::MarketPositioning => "market_positioning",
            InterpretationCategory::GrowthPattern => "growth_pattern",
            InterpretationCategory::DeclinePattern => "decline_pattern",
            InterpretationCategory::StabilityAnalysis => "stability_analysis",
        }
    }
}

impl fmt::Display for InterpretationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InterpretationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trend_analysis" => Ok(InterpretationCategory::TrendAnalysis),
            "competitive_dynamics" => Ok(InterpretationCategory::CompetitiveDynamics),
            "market_positioning" => Ok(InterpretationCategory::MarketPositioning),
            "growth_pattern" => Ok(InterpretationCategory::GrowthPattern),
            "decline_pattern" => Ok(InterpretationCategory::DeclinePattern),
            "stability_analysis" => Ok(InterpretationCategory::StabilityAnalysis),
            _ => Err(format!("Unknown interpretation category: {}", s)),
        }
    }
}

/// A rule-derived explanation grounded in signals and scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub id: String,
    pub category: InterpretationCategory,
    pub term: TermRef,
    pub text: String,
    /// The signal and score values the rule read
    pub evidence: Vec<String>,
    /// Ids of the signals that justify this interpretation
    pub related_signals: Vec<String>,
    /// 0-100
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
    pub data_freshness: DataFreshness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Marketer,
    Founder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Marketer => "marketer",
            Role::Founder => "founder",
        }
    }

    pub fn all() -> [Role; 2] {
        [Role::Marketer, Role::Founder]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "marketer" => Ok(Role::Marketer),
            "founder" => Ok(Role::Founder),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    InvestMore,
    InvestLess,
    Maintain,
    Monitor,
    Pivot,
    Scale,
    Optimize,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::InvestMore => "invest_more",
            Action::InvestLess => "invest_less",
            Action::Maintain => "maintain",
            Action::Monitor => "monitor",
            Action::Pivot => "pivot",
            Action::Scale => "scale",
            Action::Optimize => "optimize",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invest_more" => Ok(Action::InvestMore),
            "invest_less" => Ok(Action::InvestLess),
            "maintain" => Ok(Action::Maintain),
            "monitor" => Ok(Action::Monitor),
            "pivot" => Ok(Action::Pivot),
            "scale" => Ok(Action::Scale),
            "optimize" => Ok(Action::Optimize),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// Horizon a guidance item applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Immediate,
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Immediate => "immediate",
            Timeframe::ShortTerm => "short_term",
            Timeframe::MediumTerm => "medium_term",
            Timeframe::LongTerm => "long_term",
        }
    }

    /// Days until the guidance should be re-checked
    pub fn check_after_days(&self) -> i64 {
        match self {
            Timeframe::Immediate => 3,
            Timeframe::ShortTerm => 7,
            Timeframe::MediumTerm => 30,
            Timeframe::LongTerm => 90,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Low/medium/high bucket used for risk and volatility rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A role-targeted, bounded-vocabulary recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionGuidance {
    pub id: String,
    pub role: Role,
    pub action: Action,
    pub term: TermRef,
    pub recommendation: String,
    pub rationale: String,
    /// 1 (most urgent) to 5
    pub priority: u8,
    pub timeframe: Timeframe,
    pub risk_level: RiskLevel,
    pub risk_notes: Vec<String>,
    pub next_check: NaiveDate,
    pub related_interpretations: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub data_freshness: DataFreshness,
}

/// Guidance for both roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceSet {
    pub marketer: Vec<DecisionGuidance>,
    pub founder: Vec<DecisionGuidance>,
}

impl GuidanceSet {
    pub fn for_role(&self, role: Role) -> &[DecisionGuidance] {
        match role {
            Role::Marketer => &self.marketer,
            Role::Founder => &self.founder,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecisionGuidance> {
        self.marketer.iter().chain(self.founder.iter())
    }
}

/// One value per side of the comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerTerm<T> {
    pub term_a: T,
    pub term_b: T,
}

impl<T> PerTerm<T> {
    /// Build from a function of each side
    pub fn from_fn(mut f: impl FnMut(TermRef) -> T) -> Self {
        Self {
            term_a: f(TermRef::TermA),
            term_b: f(TermRef::TermB),
        }
    }

    pub fn get(&self, term: TermRef) -> &T {
        match term {
            TermRef::TermB => &self.term_b,
            _ => &self.term_a,
        }
    }
}
