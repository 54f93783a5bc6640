// =============================================================================
// Signal Engine — moving-average crossover classification
// =============================================================================
//
// For every day i:
//   ma_short[i] = SMA(close, short_window) ending at i   (None until filled)
//   ma_long[i]  = SMA(close, long_window)  ending at i   (None until filled)
//
//   signal[i] = Hold  if either average is missing
//             = Buy   if ma_short > ma_long
//             = Sell  if ma_short < ma_long
//             = Hold  if ma_short == ma_long (a tie is not a crossover)
//
// "Equal" allows for rounding: two averages of the same closes can differ in
// the last bits when summed over different windows, so a relative gap below
// TIE_TOLERANCE counts as a tie.
//
// The published table drops every row before the long window has filled.
// All functions here are pure: the input series is only borrowed.
// =============================================================================

use serde::Serialize;

use crate::error::ValidationError;
use crate::indicators::sma::calculate_sma;
use crate::types::{PriceSeries, Signal, SignalRow};

// ---------------------------------------------------------------------------
// SignalTable
// ---------------------------------------------------------------------------

/// Classified rows where both moving averages are present, together with the
/// inputs needed to interpret an empty table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalTable {
    rows: Vec<SignalRow>,
    series_len: usize,
    short_window: usize,
    long_window: usize,
}

/// Number of rows carrying each signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl SignalTable {
    pub fn rows(&self) -> &[SignalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn series_len(&self) -> usize {
        self.series_len
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    /// True when the series was too short for the long window to ever fill.
    /// An empty table with this flag set is an expected outcome, not a fault.
    pub fn is_insufficient_data(&self) -> bool {
        self.long_window > self.series_len
    }

    /// Row count implied by the inputs: `max(0, n - long_window + 1)`.
    pub fn expected_len(series_len: usize, long_window: usize) -> usize {
        (series_len + 1).saturating_sub(long_window)
    }

    /// Most recent classified row.
    pub fn latest(&self) -> Option<&SignalRow> {
        self.rows.last()
    }

    pub fn counts(&self) -> SignalCounts {
        self.rows
            .iter()
            .fold(SignalCounts::default(), |mut acc, row| {
                match row.signal {
                    Signal::Buy => acc.buy += 1,
                    Signal::Sell => acc.sell += 1,
                    Signal::Hold => acc.hold += 1,
                }
                acc
            })
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Relative gap between the averages below which they are treated as equal.
pub const TIE_TOLERANCE: f64 = 1e-10;

fn is_tie(short: f64, long: f64) -> bool {
    (short - long).abs() <= TIE_TOLERANCE * short.abs().max(long.abs())
}

/// Classify a single day from its two averages.
pub fn classify(ma_short: Option<f64>, ma_long: Option<f64>) -> Signal {
    match (ma_short, ma_long) {
        (Some(short), Some(long)) if is_tie(short, long) => Signal::Hold,
        (Some(short), Some(long)) if short > long => Signal::Buy,
        (Some(short), Some(long)) if short < long => Signal::Sell,
        _ => Signal::Hold,
    }
}

/// Validate a window pair on its own, so requests and config can reject bad
/// windows before any price data is fetched.
pub fn check_windows(short_window: usize, long_window: usize) -> Result<(), ValidationError> {
    if short_window == 0 {
        return Err(ValidationError::ZeroWindow {
            name: "short window",
        });
    }
    if long_window == 0 {
        return Err(ValidationError::ZeroWindow {
            name: "long window",
        });
    }
    if short_window >= long_window {
        return Err(ValidationError::WindowOrder {
            short: short_window,
            long: long_window,
        });
    }
    Ok(())
}

/// Produce one row per price point, including the warm-up rows whose averages
/// are still missing.
pub fn compute_signal_rows(
    series: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<Vec<SignalRow>, ValidationError> {
    if series.is_empty() {
        return Err(ValidationError::EmptySeries);
    }
    check_windows(short_window, long_window)?;

    let closes = series.closes();
    let ma_short = calculate_sma(&closes, short_window);
    let ma_long = calculate_sma(&closes, long_window);

    let rows = series
        .points()
        .iter()
        .zip(ma_short.into_iter().zip(ma_long))
        .map(|(point, (ma_short, ma_long))| SignalRow {
            date: point.date,
            close: point.close,
            ma_short,
            ma_long,
            signal: classify(ma_short, ma_long),
        })
        .collect();

    Ok(rows)
}

/// Compute the crossover signal table for `series`.
///
/// # Errors
/// - empty series
/// - a zero window
/// - `short_window >= long_window`
///
/// A series shorter than `long_window` is not an error: the table is empty
/// and [`SignalTable::is_insufficient_data`] reports why.
pub fn compute_signals(
    series: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Result<SignalTable, ValidationError> {
    let rows = compute_signal_rows(series, short_window, long_window)?
        .into_iter()
        .filter(|row| row.ma_short.is_some() && row.ma_long.is_some())
        .collect();

    Ok(SignalTable {
        rows,
        series_len: series.len(),
        short_window,
        long_window,
    })
}

/// Rows classified as Buy, in date order.
pub fn buy_rows(table: &SignalTable) -> Vec<SignalRow> {
    rows_with(table, Signal::Buy)
}

/// Rows classified as Sell, in date order.
pub fn sell_rows(table: &SignalTable) -> Vec<SignalRow> {
    rows_with(table, Signal::Sell)
}

fn rows_with(table: &SignalTable, signal: Signal) -> Vec<SignalRow> {
    table
        .rows
        .iter()
        .filter(|row| row.signal == signal)
        .copied()
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use chrono::{Duration, NaiveDate};

    /// Helper: consecutive daily points starting 2024-01-01.
    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(start + Duration::days(i as i64), c))
            .collect();
        PriceSeries::new(points).unwrap()
    }

    fn signals(table: &SignalTable) -> Vec<Signal> {
        table.rows().iter().map(|r| r.signal).collect()
    }

    // ---- validation ------------------------------------------------------

    #[test]
    fn empty_series_is_a_validation_error() {
        let err = compute_signals(&PriceSeries::empty(), 2, 4).unwrap_err();
        assert_eq!(err, ValidationError::EmptySeries);
    }

    #[test]
    fn zero_windows_are_rejected() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert_eq!(
            compute_signals(&s, 0, 3).unwrap_err(),
            ValidationError::ZeroWindow {
                name: "short window"
            }
        );
        assert_eq!(
            compute_signals(&s, 2, 0).unwrap_err(),
            ValidationError::ZeroWindow {
                name: "long window"
            }
        );
    }

    #[test]
    fn inverted_or_equal_windows_are_rejected() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            compute_signals(&s, 4, 2).unwrap_err(),
            ValidationError::WindowOrder { short: 4, long: 2 }
        );
        assert_eq!(
            compute_signals(&s, 3, 3).unwrap_err(),
            ValidationError::WindowOrder { short: 3, long: 3 }
        );
    }

    // ---- shape -----------------------------------------------------------

    #[test]
    fn long_window_beyond_series_yields_empty_table() {
        let s = series(&[10.0, 11.0, 12.0]);
        let table = compute_signals(&s, 2, 4).unwrap();
        assert!(table.is_empty());
        assert!(table.is_insufficient_data());
        assert_eq!(table.series_len(), 3);
    }

    #[test]
    fn row_count_matches_filled_windows() {
        let closes: Vec<f64> = (1..=30).map(|i| 100.0 + (i % 5) as f64).collect();
        let s = series(&closes);
        for (short, long) in [(1, 2), (2, 4), (5, 10), (3, 30), (10, 29)] {
            let table = compute_signals(&s, short, long).unwrap();
            assert_eq!(table.len(), SignalTable::expected_len(30, long));
            assert_eq!(table.len(), 30 - long + 1);
            assert!(!table.is_insufficient_data());
        }
        assert_eq!(SignalTable::expected_len(30, 31), 0);
        assert_eq!(SignalTable::expected_len(0, 4), 0);
    }

    #[test]
    fn full_rows_keep_warm_up_days() {
        let s = series(&[10.0, 10.0, 10.0, 12.0]);
        let rows = compute_signal_rows(&s, 2, 3).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].ma_short, None);
        assert_eq!(rows[1].ma_short, Some(10.0));
        assert_eq!(rows[1].ma_long, None);
        assert_eq!(rows[1].signal, Signal::Hold);
        assert_eq!(rows[3].ma_short, Some(11.0));
        assert!(rows[3].ma_long.is_some());
        assert_eq!(rows[3].signal, Signal::Buy);
    }

    #[test]
    fn table_rows_always_have_both_averages() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + ((i * 7) % 13) as f64).collect();
        let table = compute_signals(&series(&closes), 5, 20).unwrap();
        assert!(table
            .rows()
            .iter()
            .all(|r| r.ma_short.is_some() && r.ma_long.is_some()));
    }

    // ---- classification --------------------------------------------------

    #[test]
    fn tie_is_hold() {
        // Index 3: short = (2+2)/2 = 2, long = (1+3+2+2)/4 = 2.
        let s = series(&[1.0, 3.0, 2.0, 2.0]);
        let table = compute_signals(&s, 2, 4).unwrap();
        assert_eq!(table.len(), 1);
        let row = table.rows()[0];
        assert_eq!(row.ma_short, row.ma_long);
        assert_eq!(row.signal, Signal::Hold);
    }

    #[test]
    fn flat_series_is_all_hold() {
        let table = compute_signals(&series(&[10.0; 12]), 3, 6).unwrap();
        assert!(signals(&table).iter().all(|&s| s == Signal::Hold));
    }

    #[test]
    fn flat_series_of_inexact_closes_is_all_hold() {
        // 0.1 and 187.19 have no exact binary form, so the two window sums
        // round differently even though the true means are identical.
        for close in [0.1, 187.19, 33.33] {
            for (short, long) in [(3, 7), (50, 200)] {
                let table = compute_signals(&series(&[close; 400]), short, long).unwrap();
                assert_eq!(table.len(), 400 + 1 - long);
                assert_eq!(
                    table.counts().hold,
                    table.len(),
                    "close {close}, windows {short}/{long}"
                );
            }
        }
    }

    #[test]
    fn small_real_gap_is_not_a_tie() {
        assert_eq!(classify(Some(100.001), Some(100.0)), Signal::Buy);
        assert_eq!(classify(Some(0.1), Some(0.100001)), Signal::Sell);
        assert_eq!(classify(Some(0.10000000000000002), Some(0.1)), Signal::Hold);
    }

    #[test]
    fn step_up_turns_buy_and_never_sell() {
        let s = series(&[10.0, 10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0, 20.0]);
        let table = compute_signals(&s, 2, 4).unwrap();

        assert_eq!(table.len(), 7);
        assert_eq!(
            signals(&table),
            vec![
                Signal::Hold, // idx 3: 10 vs 10
                Signal::Hold, // idx 4: 10 vs 10
                Signal::Buy,  // idx 5: 15 vs 12.5
                Signal::Buy,  // idx 6: 20 vs 15
                Signal::Buy,  // idx 7: 20 vs 17.5
                Signal::Hold, // idx 8: 20 vs 20
                Signal::Hold, // idx 9: 20 vs 20
            ]
        );

        let first_buy = table.rows()[2];
        assert_eq!(first_buy.date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(first_buy.ma_short, Some(15.0));
        assert_eq!(first_buy.ma_long, Some(12.5));
        assert!(sell_rows(&table).is_empty());
    }

    #[test]
    fn step_down_turns_sell() {
        let s = series(&[20.0, 20.0, 20.0, 20.0, 10.0, 10.0]);
        let table = compute_signals(&s, 2, 4).unwrap();
        assert_eq!(
            signals(&table),
            vec![Signal::Hold, Signal::Sell, Signal::Sell]
        );
    }

    #[test]
    fn classify_handles_missing_averages() {
        assert_eq!(classify(None, Some(1.0)), Signal::Hold);
        assert_eq!(classify(Some(1.0), None), Signal::Hold);
        assert_eq!(classify(Some(2.0), Some(1.0)), Signal::Buy);
        assert_eq!(classify(Some(1.0), Some(2.0)), Signal::Sell);
        assert_eq!(classify(Some(1.0), Some(1.0)), Signal::Hold);
    }

    // ---- determinism & purity --------------------------------------------

    #[test]
    fn repeated_calls_are_identical() {
        let closes: Vec<f64> = (0..400)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 12.0)
            .collect();
        let s = series(&closes);
        let before = s.clone();
        let a = compute_signals(&s, 50, 200).unwrap();
        let b = compute_signals(&s, 50, 200).unwrap();
        assert_eq!(a, b);
        assert_eq!(s, before);
    }

    // ---- views -----------------------------------------------------------

    #[test]
    fn buy_and_sell_views_partition_directional_rows() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 * 0.2).sin() * 10.0)
            .collect();
        let table = compute_signals(&series(&closes), 3, 9).unwrap();

        let buys = buy_rows(&table);
        let sells = sell_rows(&table);
        let counts = table.counts();

        assert!(buys.iter().all(|r| r.signal == Signal::Buy));
        assert!(sells.iter().all(|r| r.signal == Signal::Sell));
        assert_eq!(counts.buy, buys.len());
        assert_eq!(counts.sell, sells.len());
        assert_eq!(counts.buy + counts.sell + counts.hold, table.len());
        assert!(buys.windows(2).all(|w| w[0].date < w[1].date));
        assert!(sells.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn latest_is_last_row() {
        let table = compute_signals(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2, 3).unwrap();
        let latest = table.latest().unwrap();
        assert_eq!(latest.close, 5.0);
        assert_eq!(latest.signal, Signal::Buy);
    }
}
