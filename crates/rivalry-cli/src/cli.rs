//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Rivalry - Signals, interpretations and decision guidance for trend comparisons
#[derive(Parser)]
#[command(name = "rivalry")]
#[command(about = "Deterministic insights for pairwise trend comparisons", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Engine config file (defaults to the per-user override, then built-in values)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and print the insights pack
    Analyze {
        /// Comparison request as JSON
        #[arg(short, long, conflicts_with = "csv")]
        input: Option<PathBuf>,

        /// Series table as CSV (`date,<term>,<term>`)
        #[arg(long, requires_all = ["term_a", "term_b"])]
        csv: Option<PathBuf>,

        /// First term (CSV input only)
        #[arg(long)]
        term_a: Option<String>,

        /// Second term (CSV input only)
        #[arg(long)]
        term_b: Option<String>,

        /// Timeframe label (CSV input only)
        #[arg(long, default_value = "12m")]
        timeframe: String,

        /// Geography label (CSV input only)
        #[arg(long, default_value = "global")]
        geo: String,

        /// Generation instant (RFC 3339); overrides the request's own
        #[arg(long)]
        generated_at: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run signal generation only and print the signals as JSON
    Signals {
        /// Comparison request as JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Generation instant (RFC 3339)
        #[arg(long)]
        generated_at: Option<String>,
    },

    /// Print the stable hash of a JSON document
    Hash {
        /// JSON file to hash
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the effective engine config
    Config {
        /// Print the override file location instead
        #[arg(long)]
        path: bool,
    },
}
