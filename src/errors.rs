//! Error taxonomy for the look-through pipeline
//!
//! Per-fund failures (`SchemaError`, `FetchError`) are recoverable: the
//! resolver converts them into an `Unresolved` result and the rest of the
//! portfolio is still analyzed. Only `InvalidPortfolioError` aborts a run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("no header row with name and weight columns found in the first {scanned} rows")]
    HeaderNotFound { scanned: usize },
    #[error("header found but required column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error("raw table is not valid CSV: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fund page returned status {0}")]
    Status(u16),
    #[error("no holdings file link found on fund page {0}")]
    LinkNotFound(String),
    #[error("invalid fund reference '{reference}': {message}")]
    BadReference { reference: String, message: String },
    #[error("offline mode: network fetch disabled")]
    Offline,
}

#[derive(Error, Debug)]
pub enum InvalidPortfolioError {
    #[error("declared portfolio weights sum to {0}, cannot normalize")]
    ZeroTotalWeight(f64),
    #[error("line {index} has non-positive weight {weight}")]
    NonPositiveWeight { index: usize, weight: f64 },
    #[error("line {index} declares neither a fund url nor a manual asset name")]
    MalformedLine { index: usize },
    #[error("portfolio file has no lines")]
    Empty,
}
