pub mod price_source;
pub mod yahoo;

pub use price_source::{DateRange, InMemoryPriceSource, PriceSource, MAX_LOOKBACK_DAYS};
pub use yahoo::YahooChartClient;
