// =============================================================================
// Chart data — the input shape a price chart with MA overlays needs
// =============================================================================
//
// Rendering is left to the client. This module only arranges the series:
//   - the closing-price line (every fetched point)
//   - one overlay line per moving average, named "MA{window}"
//   - buy / sell markers taken from the classified table
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;

use crate::signal_engine::{buy_rows, sell_rows, SignalTable};
use crate::types::{PriceSeries, SignalRow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A named line on the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLine {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub price_line: ChartLine,
    pub ma_short_line: ChartLine,
    pub ma_long_line: ChartLine,
    pub buy_markers: Vec<ChartPoint>,
    pub sell_markers: Vec<ChartPoint>,
}

fn markers(rows: &[SignalRow]) -> Vec<ChartPoint> {
    rows.iter()
        .map(|row| ChartPoint {
            date: row.date,
            value: row.close,
        })
        .collect()
}

fn overlay(table: &SignalTable, window: usize, pick: fn(&SignalRow) -> Option<f64>) -> ChartLine {
    ChartLine {
        name: format!("MA{window}"),
        points: table
            .rows()
            .iter()
            .filter_map(|row| {
                pick(row).map(|value| ChartPoint {
                    date: row.date,
                    value,
                })
            })
            .collect(),
    }
}

/// Arrange `series` and its signal `table` for plotting.
pub fn build_chart(symbol: &str, series: &PriceSeries, table: &SignalTable) -> ChartData {
    let price_line = ChartLine {
        name: "Close".to_string(),
        points: series
            .points()
            .iter()
            .map(|p| ChartPoint {
                date: p.date,
                value: p.close,
            })
            .collect(),
    };

    ChartData {
        title: format!("Stock Closing Prices for {symbol}"),
        price_line,
        ma_short_line: overlay(table, table.short_window(), |row| row.ma_short),
        ma_long_line: overlay(table, table.long_window(), |row| row.ma_long),
        buy_markers: markers(&buy_rows(table)),
        sell_markers: markers(&sell_rows(table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_engine::compute_signals;
    use crate::types::PricePoint;
    use chrono::Duration;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| PricePoint::new(start + Duration::days(i as i64), c))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn chart_lines_follow_series_and_table() {
        let s = series(&[20.0, 20.0, 20.0, 20.0, 10.0, 10.0, 30.0, 30.0]);
        let table = compute_signals(&s, 2, 4).unwrap();
        let chart = build_chart("MSFT", &s, &table);

        assert_eq!(chart.title, "Stock Closing Prices for MSFT");
        assert_eq!(chart.price_line.points.len(), 8);
        assert_eq!(chart.ma_short_line.name, "MA2");
        assert_eq!(chart.ma_long_line.name, "MA4");
        assert_eq!(chart.ma_short_line.points.len(), table.len());
        assert_eq!(chart.ma_long_line.points.len(), table.len());
        assert_eq!(chart.buy_markers.len(), buy_rows(&table).len());
        assert_eq!(chart.sell_markers.len(), sell_rows(&table).len());
        assert!(!chart.sell_markers.is_empty());
        assert!(!chart.buy_markers.is_empty());
    }

    #[test]
    fn empty_table_still_draws_price_line() {
        let s = series(&[1.0, 2.0]);
        let table = compute_signals(&s, 2, 4).unwrap();
        let chart = build_chart("SPY", &s, &table);
        assert_eq!(chart.price_line.points.len(), 2);
        assert!(chart.ma_long_line.points.is_empty());
        assert!(chart.buy_markers.is_empty());
    }
}
