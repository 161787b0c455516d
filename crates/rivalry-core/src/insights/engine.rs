//! Insights engine - runs the stages in order and talks to the cache
//!
//! Stages A-C and the summary are synchronous and pure. `get_insights_pack`
//! is the only async entry point; its single suspension point is the cache
//! collaborator, which is injected per call.

use serde::Serialize;

use crate::cache::{CacheOptions, InsightsCache};
use crate::config::EngineConfig;
use crate::models::GenerationContext;
use crate::Result;

use super::guidance::GuidanceGenerator;
use super::input::InsightsInput;
use super::interpretations::InterpretationGenerator;
use super::memo::MemoizedSignalGenerator;
use super::pack::{build_insights_pack, comparison_slug, data_hash, InsightsPack};
use super::signals::{SignalGenerator, SignalSource};
use super::summary::create_signals_summary;
use super::types::Signal;

/// Result of a cached pack lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackResponse {
    pub pack: InsightsPack,
    /// Forecast or AI sections are missing; informational only
    pub needs_warmup: bool,
    pub cache_key: String,
}

pub fn cache_key(data_hash: &str) -> String {
    format!("insights:{}", data_hash)
}

pub struct InsightsEngine {
    config: EngineConfig,
    signals: MemoizedSignalGenerator<SignalGenerator>,
    interpretations: InterpretationGenerator,
    guidance: GuidanceGenerator,
}

impl Default for InsightsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightsEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            signals: MemoizedSignalGenerator::new(
                SignalGenerator::with_config(&config),
                config.cache.memo_ttl(),
            ),
            interpretations: InterpretationGenerator::new(),
            guidance: GuidanceGenerator::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stage A (memoized)
    pub fn generate_signals(&self, input: &InsightsInput, ctx: &GenerationContext) -> Vec<Signal> {
        self.signals.generate(input, ctx)
    }

    /// Run every stage and assemble the pack
    pub fn build_insights_pack(&self, input: &InsightsInput, ctx: &GenerationContext) -> InsightsPack {
        let signals = self.generate_signals(input, ctx);
        let interpretations =
            self.interpretations
                .generate(&input.terms, &signals, &input.scores, ctx);
        let guidance = self
            .guidance
            .generate(&signals, &interpretations, &input.scores, ctx);
        let summary = create_signals_summary(&signals, &input.scores);

        tracing::info!(
            slug = %comparison_slug(&input.terms),
            signals = signals.len(),
            interpretations = interpretations.len(),
            "Insights generated"
        );
        build_insights_pack(input, summary, interpretations, guidance, ctx)
    }

    /// Cached pack for `input`, keyed on its data hash
    pub async fn get_insights_pack(
        &self,
        cache: &dyn InsightsCache,
        input: &InsightsInput,
        ctx: &GenerationContext,
    ) -> Result<PackResponse> {
        let key = cache_key(&data_hash(input));
        let options = CacheOptions {
            stale_ttl: self.config.cache.stale_ttl(),
            tags: vec![
                "insights".to_string(),
                format!("comparison:{}", comparison_slug(&input.terms)),
            ],
        };

        let value = cache
            .get_or_set(
                &key,
                self.config.cache.ttl(),
                options,
                Box::new(move || -> Result<serde_json::Value> {
                    Ok(serde_json::to_value(self.build_insights_pack(input, ctx))?)
                }),
            )
            .await?;
        let pack: InsightsPack = serde_json::from_value(value)?;

        Ok(PackResponse {
            needs_warmup: pack.needs_warmup(),
            pack,
            cache_key: key,
        })
    }
}
