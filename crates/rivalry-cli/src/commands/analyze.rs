//! Analyze command - full pipeline and pack rendering

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rivalry_core::insights::{InsightsEngine, InsightsRequest, PackResponse};
use rivalry_core::models::TermRef;
use rivalry_core::{EngineConfig, InMemoryCache};

use super::core::{apply_generated_at, load_config, read_request, request_from_csv};
use crate::cli::OutputFormat;

/// Where `analyze` reads its comparison from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeSource {
    Json(PathBuf),
    Csv {
        path: PathBuf,
        term_a: String,
        term_b: String,
    },
}

impl AnalyzeSource {
    pub fn from_args(
        input: Option<PathBuf>,
        csv: Option<PathBuf>,
        term_a: Option<String>,
        term_b: Option<String>,
    ) -> Result<Self> {
        match (input, csv) {
            (Some(path), _) => Ok(AnalyzeSource::Json(path)),
            (None, Some(path)) => {
                let (Some(term_a), Some(term_b)) = (term_a, term_b) else {
                    bail!("--csv requires --term-a and --term-b");
                };
                Ok(AnalyzeSource::Csv {
                    path,
                    term_a,
                    term_b,
                })
            }
            (None, None) => bail!("Provide --input <json> or --csv <file>"),
        }
    }

    pub fn load(&self, timeframe: &str, geo: &str) -> Result<InsightsRequest> {
        match self {
            AnalyzeSource::Json(path) => read_request(path),
            AnalyzeSource::Csv {
                path,
                term_a,
                term_b,
            } => request_from_csv(path, term_a, term_b, timeframe, geo),
        }
    }
}

/// Resolve the request and fetch its pack through `cache`
pub async fn run_analysis(
    config: EngineConfig,
    request: &InsightsRequest,
    cache: &InMemoryCache,
) -> Result<PackResponse> {
    let input = request
        .to_input()
        .context("Failed to resolve comparison series")?;
    let ctx = request.context(Utc::now());
    let engine = InsightsEngine::with_config(config);
    engine
        .get_insights_pack(cache, &input, &ctx)
        .await
        .context("Failed to build insights pack")
}

fn signed(value: f64) -> String {
    format!("{:+.1}%", value)
}

/// Human-readable pack summary
pub fn render_text(response: &PackResponse) -> String {
    let pack = &response.pack;
    let summary = &pack.signals;
    let name = |term: TermRef| pack.terms.name(term).to_string();
    let mut lines = Vec::new();

    lines.push(format!(
        "📊 {} vs {} ({}, {})",
        pack.terms.term_a, pack.terms.term_b, pack.timeframe, pack.geo
    ));
    lines.push("   ─────────────────────────────".to_string());
    let winner = match summary.winner {
        TermRef::Both => "tie".to_string(),
        term => name(term),
    };
    lines.push(format!("   Winner: {} (margin {:.1})", winner, summary.margin));
    lines.push(format!(
        "   Momentum: {} {}, {} {}",
        pack.terms.term_a,
        signed(summary.momentum.term_a),
        pack.terms.term_b,
        signed(summary.momentum.term_b)
    ));
    lines.push(format!(
        "   Volatility: {} {}, {} {}",
        pack.terms.term_a, summary.volatility.term_a, pack.terms.term_b, summary.volatility.term_b
    ));
    lines.push(format!(
        "   Series: {} {}, {} {}",
        pack.terms.term_a,
        summary.classification.term_a.label(),
        pack.terms.term_b,
        summary.classification.term_b.label()
    ));
    lines.push(format!("   Leader-change risk: {}", summary.leader_change_risk));
    lines.push(format!(
        "   Confidence: {:.0} ({} signals)",
        summary.overall_confidence, summary.signal_count
    ));

    if !pack.interpretations.is_empty() {
        lines.push(String::new());
        lines.push("🔎 Interpretations".to_string());
        for interpretation in &pack.interpretations {
            lines.push(format!("   [{}] {}", interpretation.category, interpretation.text));
        }
    }

    if let Some(guidance) = &pack.decision_guidance {
        for (title, items) in [("Marketer", &guidance.marketer), ("Founder", &guidance.founder)] {
            lines.push(String::new());
            lines.push(format!("🧭 {}", title));
            for (i, item) in items.iter().enumerate() {
                lines.push(format!(
                    "   {}. {} - {} ({}, risk {}, next check {})",
                    i + 1,
                    item.action,
                    item.recommendation,
                    item.timeframe,
                    item.risk_level,
                    item.next_check
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!("   Data hash: {}", &pack.data_hash[..12]));
    lines.push(format!("   Insights hash: {}", &pack.insights_hash[..12]));
    if pack.data_freshness.is_stale {
        lines.push(format!(
            "   ⚠️  Source data is {}h old ({})",
            pack.data_freshness.age_hours, pack.data_freshness.provider
        ));
    }
    if response.needs_warmup {
        lines.push("   💡 Forecast or AI sections not supplied yet".to_string());
    }

    lines.join("\n") + "\n"
}

pub async fn cmd_analyze(
    config_path: Option<&Path>,
    source: &AnalyzeSource,
    timeframe: &str,
    geo: &str,
    generated_at: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut request = source.load(timeframe, geo)?;
    apply_generated_at(&mut request, generated_at)?;

    let cache = InMemoryCache::new();
    let response = run_analysis(config, &request, &cache).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response.pack)?),
        OutputFormat::Text => print!("{}", render_text(&response)),
    }
    Ok(())
}
