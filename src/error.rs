//! Error types for Synheart Energy

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse sample payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Errors a raw-sample provider may report for a single query.
///
/// The feature builder never propagates these; a failing source is treated as
/// having no data for the day being built.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Sample source unavailable: {0}")]
    Unavailable(String),

    #[error("Sample query failed: {0}")]
    Query(String),
}
