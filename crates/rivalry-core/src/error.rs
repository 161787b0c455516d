//! Error types for Rivalry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No series column matches term: {0}")]
    TermNotFound(String),

    #[error("Term {term} matches more than one series column: {columns:?}")]
    AmbiguousTerm { term: String, columns: Vec<String> },

    #[error("Series length mismatch: {left} vs {right} points")]
    SeriesMisaligned { left: usize, right: usize },

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, Error>;
