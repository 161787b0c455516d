//! Insights pipeline
//!
//! Turns a pairwise comparison series into a versioned insights pack:
//!
//! - **Stage A: Signals** - statistical observations with severity and confidence
//! - **Stage B: Interpretations** - rule-based narrative claims citing signals
//! - **Stage C: Decision guidance** - 2-3 ranked actions per role
//! - **Stage E: Pack** - summary, peaks, forecasts and content hashes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rivalry_core::insights::{InsightsEngine, InsightsInput};
//! use rivalry_core::models::GenerationContext;
//!
//! let engine = InsightsEngine::new();
//! let ctx = GenerationContext::at(Utc::now(), "trends");
//! let pack = engine.build_insights_pack(&input, &ctx);
//! ```

pub mod classify;
pub mod engine;
pub mod guidance;
pub mod input;
pub mod interpretations;
pub mod memo;
pub mod pack;
pub mod signals;
pub mod summary;
pub mod types;

pub use classify::{classify_series, leader_change_risk, sustainability, SeriesClass, Sustainability};
pub use engine::{cache_key, InsightsEngine, PackResponse};
pub use guidance::GuidanceGenerator;
pub use input::{InsightsInput, InsightsRequest};
pub use interpretations::{InterpretationGenerator, InterpretationRule, RuleContext};
pub use memo::MemoizedSignalGenerator;
pub use pack::{build_insights_pack, comparison_slug, data_hash, InsightsPack, ENGINE_VERSION};
pub use signals::{SignalGenerator, SignalSource};
pub use summary::{create_signals_summary, SignalsSummary};
pub use types::{
    Action, DecisionGuidance, GuidanceSet, Interpretation, InterpretationCategory, PerTerm, RiskLevel,
    Role, Signal, SignalType, Timeframe,
};
