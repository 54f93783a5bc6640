// =============================================================================
// Error taxonomy
// =============================================================================
//
//   ValidationError  — bad caller input, reported before any computation.
//   PriceSourceError — the price fetch failed or returned malformed data.
//   AnalysisError    — everything the analysis pipeline can surface.
//
// An empty price series is NOT an error; the pipeline reports it as a
// no-data outcome.
// =============================================================================

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("{name} must be at least 1")]
    ZeroWindow { name: &'static str },

    #[error("short window ({short}) must be smaller than long window ({long})")]
    WindowOrder { short: usize, long: usize },

    #[error("entry price must be positive, got {0}")]
    NonPositiveEntryPrice(f64),

    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("price must be finite, got {0}")]
    InvalidPrice(f64),

    #[error("lookback of {days} days is out of range (at most {max})")]
    LookbackOutOfRange { days: u32, max: u32 },

    #[error("end date ({end}) must be after start date ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("dates must strictly increase (index {index}, date {date})")]
    NonIncreasingDates { index: usize, date: NaiveDate },

    #[error("close at index {index} must be finite and positive, got {value}")]
    InvalidClose { index: usize, value: f64 },

    #[error("symbol must not be empty")]
    EmptySymbol,
}

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("price data for {symbol} is missing the `{field}` field")]
    MissingField { symbol: String, field: &'static str },

    #[error("price data for {symbol} is malformed: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("price provider rejected the request for {symbol}: {message}")]
    Upstream { symbol: String, message: String },

    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PriceSource(#[from] PriceSourceError),
}

impl AnalysisError {
    /// True when the failure was caused by caller input, not by the data
    /// provider.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
