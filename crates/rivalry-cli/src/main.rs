//! Rivalry CLI - insights for pairwise trend comparisons
//!
//! Usage:
//!   rivalry analyze --input comparison.json          Full pipeline, text summary
//!   rivalry analyze --csv trends.csv --term-a A --term-b B --format json
//!   rivalry signals --input comparison.json          Signals only
//!   rivalry hash --input doc.json                    Stable hash of a document
//!   rivalry config                                   Effective engine config

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Analyze {
            input,
            csv,
            term_a,
            term_b,
            timeframe,
            geo,
            generated_at,
            format,
        } => {
            let source = commands::AnalyzeSource::from_args(input, csv, term_a, term_b)?;
            commands::cmd_analyze(
                config_path,
                &source,
                &timeframe,
                &geo,
                generated_at.as_deref(),
                format,
            )
            .await
        }
        Commands::Signals {
            input,
            generated_at,
        } => commands::cmd_signals(config_path, &input, generated_at.as_deref()),
        Commands::Hash { input } => commands::cmd_hash(&input),
        Commands::Config { path } => commands::cmd_config(config_path, path),
    }
}
