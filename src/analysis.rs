// =============================================================================
// Analysis pipeline
// =============================================================================
//
//   request ──validate──> DateRange + windows + position
//           ──fetch─────> PriceSeries              (PriceSource, one attempt)
//           ──empty?────> NoData                   (not an error)
//           ──compute───> SignalTable              (signal_engine)
//           ──derive────> chart data, buy/sell rows, PnL vs latest close
//
// Each stage gets its inputs as arguments; nothing is shared between runs.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chart::{build_chart, ChartData};
use crate::error::{AnalysisError, ValidationError};
use crate::market_data::{DateRange, PriceSource};
use crate::position_tracker::{compute_pnl, validate_position, PnlReport};
use crate::runtime_config::AnalysisConfig;
use crate::signal_engine::{
    buy_rows, check_windows, compute_signals, sell_rows, SignalCounts, SignalTable,
};
use crate::types::{PricePoint, Signal, SignalRow};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What a client asks for. Omitted fields fall back to [`AnalysisConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub short_window: Option<usize>,
    #[serde(default)]
    pub long_window: Option<usize>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// A request with every default applied and every input validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub symbol: String,
    pub range: DateRange,
    pub short_window: usize,
    pub long_window: usize,
    pub entry_price: f64,
    pub quantity: u32,
}

impl AnalysisRequest {
    /// Apply defaults from `config` and validate, using `today` when no end
    /// date was given.
    pub fn resolve(
        &self,
        config: &AnalysisConfig,
        today: NaiveDate,
    ) -> Result<ResolvedRequest, ValidationError> {
        let symbol = self.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let range = match (self.start, self.end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            (Some(start), None) => DateRange::new(start, today)?,
            (None, end) => DateRange::lookback(end.unwrap_or(today), config.lookback_days)?,
        };

        let short_window = self.short_window.unwrap_or(config.short_window);
        let long_window = self.long_window.unwrap_or(config.long_window);
        check_windows(short_window, long_window)?;

        let entry_price = self.entry_price.unwrap_or(config.default_entry_price);
        let quantity = self.quantity.unwrap_or(config.default_quantity);
        validate_position(entry_price, quantity)?;

        Ok(ResolvedRequest {
            symbol,
            range,
            short_window,
            long_window,
            entry_price,
            quantity,
        })
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SignalSummary {
    pub counts: SignalCounts,
    pub latest_signal: Option<Signal>,
    /// True when the long window never filled, so an empty table is expected.
    pub insufficient_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub symbol: String,
    pub source: &'static str,
    pub range: DateRange,
    pub price_points: usize,
    pub latest_close: f64,
    pub preview: Vec<PricePoint>,
    pub summary: SignalSummary,
    pub signals: SignalTable,
    pub buy_signals: Vec<SignalRow>,
    pub sell_signals: Vec<SignalRow>,
    pub chart: ChartData,
    pub position: PnlReport,
}

/// Result of one analysis pass.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The source had no prices for the range.
    NoData {
        analysis_id: Uuid,
        symbol: String,
        range: DateRange,
    },
    Report(Box<AnalysisReport>),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one full analysis for `request` against `source`.
pub async fn run_analysis(
    source: &dyn PriceSource,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
    today: NaiveDate,
) -> Result<AnalysisOutcome, AnalysisError> {
    let req = request.resolve(config, today)?;
    let analysis_id = Uuid::new_v4();

    info!(
        %analysis_id,
        symbol = %req.symbol,
        range = %req.range,
        short_window = req.short_window,
        long_window = req.long_window,
        source = source.name(),
        "analysis started"
    );

    let series = source.fetch(&req.symbol, req.range).await.map_err(|e| {
        warn!(%analysis_id, symbol = %req.symbol, error = %e, "price fetch failed");
        e
    })?;

    let latest_close = match series.latest_close() {
        Some(close) => close,
        None => {
            info!(%analysis_id, symbol = %req.symbol, "no price data for range");
            return Ok(AnalysisOutcome::NoData {
                analysis_id,
                symbol: req.symbol,
                range: req.range,
            });
        }
    };

    let signals = compute_signals(&series, req.short_window, req.long_window)?;
    let buy_signals = buy_rows(&signals);
    let sell_signals = sell_rows(&signals);
    let chart = build_chart(&req.symbol, &series, &signals);
    let position = compute_pnl(req.entry_price, req.quantity, latest_close)?;

    let summary = SignalSummary {
        counts: signals.counts(),
        latest_signal: signals.latest().map(|row| row.signal),
        insufficient_data: signals.is_insufficient_data(),
    };

    if summary.insufficient_data {
        info!(
            %analysis_id,
            points = series.len(),
            long_window = req.long_window,
            "series shorter than long window, no signals"
        );
    }

    info!(
        %analysis_id,
        symbol = %req.symbol,
        points = series.len(),
        rows = signals.len(),
        buys = summary.counts.buy,
        sells = summary.counts.sell,
        latest_close,
        unrealized_pnl = position.unrealized_pnl,
        "analysis complete"
    );

    Ok(AnalysisOutcome::Report(Box::new(AnalysisReport {
        analysis_id,
        symbol: req.symbol,
        source: source.name(),
        range: req.range,
        price_points: series.len(),
        latest_close,
        preview: series.head(config.preview_rows).to_vec(),
        summary,
        signals,
        buy_signals,
        sell_signals,
        chart,
        position,
    })))
}
