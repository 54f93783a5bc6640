// =============================================================================
// Yahoo Finance chart API client — daily closes
// =============================================================================
//
// GET {base}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//
// Response shape (only the parts we read):
//   chart.result[0].meta.gmtoffset                 seconds east of UTC
//   chart.result[0].timestamp[]                    bar open time (UNIX secs)
//   chart.result[0].indicators.quote[0].close[]    close or null
//   chart.error                                    { code, description } | null
//
// One request per fetch, no retries.
// =============================================================================

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::PriceSourceError;
use crate::market_data::price_source::{DateRange, PriceSource};
use crate::types::{PricePoint, PriceSeries};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Request timeout for a single chart fetch.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Longest slice of a non-JSON error body kept in the error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Yahoo rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; crossover-signals/1.0)";

/// Yahoo Finance chart endpoint client.
#[derive(Clone)]
pub struct YahooChartClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooChartClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build reqwest client")?;

        let raw = base_url.into();
        let base_url =
            Url::parse(&raw).with_context(|| format!("invalid price API base URL: {raw}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("price API base URL cannot carry a path: {raw}");
        }
        debug!(base_url = %base_url, "YahooChartClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET the daily chart for `symbol` over `range`.
    #[instrument(skip(self, range), fields(range = %range), name = "yahoo::get_daily_closes")]
    pub async fn get_daily_closes(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<PriceSeries, PriceSourceError> {
        let url = chart_url(&self.base_url, symbol).ok_or_else(|| {
            PriceSourceError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("cannot build chart URL from {}", self.base_url),
            }
        })?;
        let period1 = unix_midnight(range.start).to_string();
        let period2 = unix_midnight(range.end).to_string();

        let resp = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!(symbol, %status, "chart request rejected");
            return Err(upstream_failure(symbol, status, &text));
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| PriceSourceError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("response is not JSON: {e}"),
            })?;

        let series = parse_chart_response(symbol, &body)?;
        debug!(symbol, count = series.len(), "daily closes fetched");
        Ok(series)
    }
}

impl PriceSource for YahooChartClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn fetch<'a>(
        &'a self,
        symbol: &'a str,
        range: DateRange,
    ) -> BoxFuture<'a, Result<PriceSeries, PriceSourceError>> {
        self.get_daily_closes(symbol, range).boxed()
    }
}

impl std::fmt::Debug for YahooChartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooChartClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// `{base}/v8/finance/chart/{symbol}` with the symbol as one encoded path
/// segment. `None` only for a base URL that cannot carry a path.
fn chart_url(base: &Url, symbol: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["v8", "finance", "chart", symbol]);
    Some(url)
}

/// Error for a non-success response. Yahoo usually answers with a JSON
/// `chart.error` object; rate limits and gateway failures come back as HTML
/// or plain text, which is kept (shortened) instead.
fn upstream_failure(symbol: &str, status: StatusCode, body: &str) -> PriceSourceError {
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(json) => error_description(&json),
        Err(_) => {
            let text: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
            if text.is_empty() {
                "empty response body".to_string()
            } else {
                text
            }
        }
    };
    PriceSourceError::Upstream {
        symbol: symbol.to_string(),
        message: format!("{status}: {detail}"),
    }
}

fn error_description(body: &Value) -> String {
    let err = &body["chart"]["error"];
    err["description"]
        .as_str()
        .or_else(|| err["code"].as_str())
        .unwrap_or("no error description")
        .to_string()
}

/// Parse a chart response body into a [`PriceSeries`].
///
/// - no `timestamp` list (or an empty one) => empty series
/// - no `close` column => [`PriceSourceError::MissingField`]
/// - `null` closes (placeholder rows) are skipped
/// - a second bar on the same exchange-local date replaces the first
pub fn parse_chart_response(symbol: &str, body: &Value) -> Result<PriceSeries, PriceSourceError> {
    let malformed = |reason: &str| PriceSourceError::Malformed {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    };

    let chart = &body["chart"];
    if chart["error"].is_object() {
        return Err(PriceSourceError::Upstream {
            symbol: symbol.to_string(),
            message: error_description(body),
        });
    }

    let result = chart["result"]
        .as_array()
        .and_then(|r| r.first())
        .ok_or_else(|| malformed("missing chart.result"))?;

    let timestamps = match result.get("timestamp").and_then(Value::as_array) {
        Some(ts) if !ts.is_empty() => ts,
        _ => {
            debug!(symbol, "chart response has no bars");
            return Ok(PriceSeries::empty());
        }
    };

    let closes = result["indicators"]["quote"]
        .as_array()
        .and_then(|q| q.first())
        .and_then(|quote| quote.get("close"))
        .and_then(Value::as_array)
        .ok_or_else(|| PriceSourceError::MissingField {
            symbol: symbol.to_string(),
            field: "close",
        })?;

    if closes.len() != timestamps.len() {
        return Err(malformed(&format!(
            "{} timestamps but {} closes",
            timestamps.len(),
            closes.len()
        )));
    }

    let gmt_offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);

    let mut points: Vec<PricePoint> = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (ts, close) in timestamps.iter().zip(closes) {
        let ts = ts
            .as_i64()
            .ok_or_else(|| malformed("non-integer timestamp"))?;

        let close = match close {
            Value::Null => {
                skipped += 1;
                continue;
            }
            other => other
                .as_f64()
                .ok_or_else(|| malformed("non-numeric close"))?,
        };

        let date = DateTime::from_timestamp(ts + gmt_offset, 0)
            .ok_or_else(|| malformed("timestamp out of range"))?
            .date_naive();

        match points.last_mut() {
            Some(last) if last.date == date => {
                warn!(symbol, %date, "duplicate bar for date, keeping the later one");
                last.close = close;
            }
            _ => points.push(PricePoint::new(date, close)),
        }
    }

    if skipped > 0 {
        debug!(symbol, skipped, "skipped bars without a close");
    }

    PriceSeries::new(points).map_err(|e| malformed(&e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
