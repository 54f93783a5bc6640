// =============================================================================
// Shared types used across the crossover signal service
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One daily close for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

// ---------------------------------------------------------------------------
// PriceSeries
// ---------------------------------------------------------------------------

/// Time-ordered daily closes.
///
/// Invariants (checked by [`PriceSeries::new`]):
/// - dates strictly increase, so there are no duplicates;
/// - every close is finite and strictly positive.
///
/// An empty series is valid: a source may have no data for a range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order dates and non-positive closes.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(ValidationError::InvalidClose {
                    index,
                    value: point.close,
                });
            }
            if index > 0 && points[index - 1].date >= point.date {
                return Err(ValidationError::NonIncreasingDates {
                    index,
                    date: point.date,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Close of the most recent point, used as the current price.
    pub fn latest_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Points with `start <= date < end`. Filtering an ordered series keeps
    /// it ordered, so no re-validation is needed.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| p.date >= start && p.date < end)
            .copied()
            .collect();
        Self { points }
    }

    /// The first `count` points (the dashboard's "head" preview).
    pub fn head(&self, count: usize) -> &[PricePoint] {
        &self.points[..count.min(self.points.len())]
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Directional classification of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Hold,
    Buy,
    Sell,
}

impl Default for Signal {
    fn default() -> Self {
        Self::Hold
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hold => write!(f, "Hold"),
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// One classified day. The averages are absent until their window fills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: f64,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub signal: Signal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn series_accepts_ordered_points() {
        let series = PriceSeries::new(vec![
            PricePoint::new(day(2), 10.0),
            PricePoint::new(day(3), 11.0),
            PricePoint::new(day(5), 12.5),
        ])
        .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.latest_close(), Some(12.5));
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.5]);
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let err = PriceSeries::new(vec![
            PricePoint::new(day(2), 10.0),
            PricePoint::new(day(2), 11.0),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonIncreasingDates {
                index: 1,
                date: day(2)
            }
        );
    }

    #[test]
    fn series_rejects_non_positive_close() {
        let err = PriceSeries::new(vec![PricePoint::new(day(2), 0.0)]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClose { index: 0, .. }));

        let err = PriceSeries::new(vec![PricePoint::new(day(2), f64::NAN)]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidClose { index: 0, .. }));
    }

    #[test]
    fn empty_series_is_valid() {
        let series = PriceSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.latest_close(), None);
        assert!(series.head(5).is_empty());
    }

    #[test]
    fn head_is_clamped_to_length() {
        let series = PriceSeries::new(vec![
            PricePoint::new(day(2), 10.0),
            PricePoint::new(day(3), 11.0),
        ])
        .unwrap();
        assert_eq!(series.head(5).len(), 2);
        assert_eq!(series.head(1)[0].close, 10.0);
    }

    #[test]
    fn within_is_end_exclusive() {
        let series = PriceSeries::new(vec![
            PricePoint::new(day(2), 10.0),
            PricePoint::new(day(3), 11.0),
            PricePoint::new(day(4), 12.0),
        ])
        .unwrap();
        let slice = series.within(day(3), day(4));
        assert_eq!(slice.len(), 1);
        assert_eq!(slice.points()[0].date, day(3));
        assert!(series.within(day(10), day(20)).is_empty());
    }

    #[test]
    fn signal_serialises_as_label() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "\"Buy\"");
        assert_eq!(Signal::default(), Signal::Hold);
        assert_eq!(Signal::Sell.to_string(), "Sell");
    }
}
