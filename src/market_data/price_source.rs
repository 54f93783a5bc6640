// =============================================================================
// Price Source — where daily close series come from
// =============================================================================
//
// A source answers one question: "daily closes for SYMBOL with
// start <= date < end". It performs a single best-effort attempt; there is no
// retry or backoff. An empty series is a legitimate answer meaning "no data".
// =============================================================================

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use futures_util::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PriceSourceError, ValidationError};
use crate::types::PriceSeries;

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// Longest lookback accepted from config or requests (about a century).
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Half-open calendar range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// `days` calendar days back from `today`, ending at `today`.
    ///
    /// Fails when `days` exceeds [`MAX_LOOKBACK_DAYS`] or the start would fall
    /// outside the representable calendar.
    pub fn lookback(today: NaiveDate, days: u32) -> Result<Self, ValidationError> {
        let out_of_range = ValidationError::LookbackOutOfRange {
            days,
            max: MAX_LOOKBACK_DAYS,
        };
        if days > MAX_LOOKBACK_DAYS {
            return Err(out_of_range);
        }
        let start = today
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or(out_of_range)?;
        Self::new(start, today)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// PriceSource trait
// ---------------------------------------------------------------------------

/// Anything that can produce a [`PriceSeries`] for a symbol and date range.
pub trait PriceSource: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    fn fetch<'a>(
        &'a self,
        symbol: &'a str,
        range: DateRange,
    ) -> BoxFuture<'a, Result<PriceSeries, PriceSourceError>>;
}

// ---------------------------------------------------------------------------
// InMemoryPriceSource
// ---------------------------------------------------------------------------

/// Fixed series keyed by symbol. Unknown symbols yield an empty series.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the series for `symbol`.
    pub fn with_series(mut self, symbol: impl Into<String>, series: PriceSeries) -> Self {
        self.series.insert(symbol.into().to_uppercase(), series);
        self
    }
}

impl PriceSource for InMemoryPriceSource {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn fetch<'a>(
        &'a self,
        symbol: &'a str,
        range: DateRange,
    ) -> BoxFuture<'a, Result<PriceSeries, PriceSourceError>> {
        let series = self
            .series
            .get(&symbol.to_uppercase())
            .map(|s| s.within(range.start, range.end))
            .unwrap_or_default();
        debug!(symbol, range = %range, count = series.len(), "in-memory series served");
        Box::pin(future::ready(Ok(series)))
    }
}
