//! Signals command - Stage A only

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rivalry_core::insights::{InsightsRequest, SignalGenerator};
use rivalry_core::EngineConfig;

use super::core::{apply_generated_at, load_config, read_request};

/// Signals for `request`, pretty-printed as a JSON array
pub fn signals_json(config: &EngineConfig, request: &InsightsRequest) -> Result<String> {
    let input = request
        .to_input()
        .context("Failed to resolve comparison series")?;
    let ctx = request.context(Utc::now());
    let signals = SignalGenerator::with_config(config).generate_signals(&input, &ctx);
    tracing::debug!(count = signals.len(), "Signals generated");
    Ok(serde_json::to_string_pretty(&signals)?)
}

pub fn cmd_signals(config_path: Option<&Path>, input: &Path, generated_at: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut request = read_request(input)?;
    apply_generated_at(&mut request, generated_at)?;
    println!("{}", signals_json(&config, &request)?);
    Ok(())
}
