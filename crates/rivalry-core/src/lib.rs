//! Rivalry Core Library
//!
//! Deterministic insights for pairwise trend comparisons:
//! - Series ingestion and alignment (JSON and CSV)
//! - Statistics and temporal enrichment
//! - Trend, volatility and seasonality detectors
//! - Signal, interpretation and decision guidance stages
//! - Versioned insights packs with stable content hashes
//! - Cache collaborator with an in-memory implementation

pub mod cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod insights;
pub mod models;
pub mod patterns;
pub mod series;
pub mod stats;
pub mod temporal;

/// Fixture builders for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{CacheOptions, InMemoryCache, InsightsCache};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use hash::{stable_hash, stable_hash_value};
pub use insights::{InsightsEngine, InsightsInput, InsightsPack, InsightsRequest, PackResponse};
pub use models::{ComparisonScores, GenerationContext, Severity, TermRef, Terms};
pub use series::{ComparisonSeries, SeriesPoint, TermSeries};
