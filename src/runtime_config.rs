// =============================================================================
// Runtime Configuration — analysis defaults with atomic save
// =============================================================================
//
// Every tunable default of the service lives here: the symbol catalogue, the
// crossover windows, the default lookback, and the default position used by
// the investment tracker when a request does not supply one.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ValidationError;
use crate::market_data::{yahoo, MAX_LOOKBACK_DAYS};
use crate::position_tracker::validate_position;
use crate::signal_engine::check_windows;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    [
        "AAPL", "MSFT", "SPY", "WMT", "AMZN", "GOOG", "FB", "TSLA", "NFLX", "V", "KO", "JPM",
        "INTC", "DIS", "SPOT", "GS", "NKE",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_short_window() -> usize {
    50
}

fn default_long_window() -> usize {
    200
}

fn default_lookback_days() -> u32 {
    1000
}

fn default_entry_price() -> f64 {
    100.0
}

fn default_quantity() -> u32 {
    10
}

fn default_preview_rows() -> usize {
    5
}

fn default_price_api_base_url() -> String {
    yahoo::DEFAULT_BASE_URL.to_string()
}

// =============================================================================
// AnalysisConfig
// =============================================================================

/// Top-level configuration for the crossover signal service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    // --- Universe -----------------------------------------------------------

    /// Symbols offered to clients.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    // --- Crossover windows --------------------------------------------------

    /// Short moving-average window, in trading days.
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    /// Long moving-average window, in trading days. Must exceed
    /// `short_window`.
    #[serde(default = "default_long_window")]
    pub long_window: usize,

    // --- Request defaults ---------------------------------------------------

    /// Calendar days fetched when a request omits its start date.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Number of leading price points echoed back as a preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Entry price assumed by the investment tracker.
    #[serde(default = "default_entry_price")]
    pub default_entry_price: f64,

    /// Quantity assumed by the investment tracker.
    #[serde(default = "default_quantity")]
    pub default_quantity: u32,

    // --- Price provider -----------------------------------------------------

    #[serde(default = "default_price_api_base_url")]
    pub price_api_base_url: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            short_window: default_short_window(),
            long_window: default_long_window(),
            lookback_days: default_lookback_days(),
            preview_rows: default_preview_rows(),
            default_entry_price: default_entry_price(),
            default_quantity: default_quantity(),
            price_api_base_url: default_price_api_base_url(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read analysis config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse analysis config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid analysis config in {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = config.symbols.len(),
            short_window = config.short_window,
            long_window = config.long_window,
            "analysis config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise analysis config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "analysis config saved (atomic)");
        Ok(())
    }

    /// Reject settings the engine or tracker would refuse at request time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_windows(self.short_window, self.long_window)?;
        if self.lookback_days == 0 {
            return Err(ValidationError::ZeroWindow {
                name: "lookback days",
            });
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ValidationError::LookbackOutOfRange {
                days: self.lookback_days,
                max: MAX_LOOKBACK_DAYS,
            });
        }
        validate_position(self.default_entry_price, self.default_quantity)
    }

    /// Replace the symbol list from a comma-separated string (e.g. an env
    /// var). Entries are trimmed, upper-cased and de-duplicated; an input
    /// with no usable entries leaves the list unchanged.
    pub fn apply_symbol_override(&mut self, raw: &str) {
        let mut symbols: Vec<String> = Vec::new();
        for sym in raw.split(',').map(|s| s.trim().to_uppercase()) {
            if !sym.is_empty() && !symbols.contains(&sym) {
                symbols.push(sym);
            }
        }
        if !symbols.is_empty() {
            self.symbols = symbols;
        }
    }
}
