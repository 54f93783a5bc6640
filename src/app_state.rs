// =============================================================================
// Central Application State — crossover signal service
// =============================================================================
//
// Holds what outlives a single request: the active configuration, the price
// source, and a few counters and logs for the health endpoint. Each analysis
// copies the config out under a short read lock and then runs without
// touching shared state.
//
// Thread safety:
//   - Atomic counters for lock-free version / request tracking.
//   - parking_lot::RwLock for the config and the error log.
// =============================================================================

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::PriceSource;
use crate::runtime_config::AnalysisConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded failure for the error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Symbol the failing request was for, when known.
    pub symbol: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Application state shared across handlers via `Arc<AppState>`.
pub struct AppState {
    /// Incremented whenever the configuration changes.
    pub config_version: AtomicU64,

    /// Number of analyses that produced a report or a no-data outcome.
    pub analyses_completed: AtomicU64,

    pub config: RwLock<AnalysisConfig>,
    /// Where config updates are persisted.
    pub config_path: PathBuf,

    pub price_source: Arc<dyn PriceSource>,

    pub recent_errors: RwLock<VecDeque<ErrorRecord>>,

    /// Instant when the service was started. Used for uptime.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: AnalysisConfig,
        config_path: impl Into<PathBuf>,
        price_source: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            config_version: AtomicU64::new(1),
            analyses_completed: AtomicU64::new(0),
            config: RwLock::new(config),
            config_path: config_path.into(),
            price_source,
            recent_errors: RwLock::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
            start_time: std::time::Instant::now(),
        }
    }

    /// Copy of the active configuration.
    pub fn config_snapshot(&self) -> AnalysisConfig {
        self.config.read().clone()
    }

    pub fn increment_config_version(&self) -> u64 {
        self.config_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_config_version(&self) -> u64 {
        self.config_version.load(Ordering::SeqCst)
    }

    pub fn record_analysis(&self) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn analyses_completed(&self) -> u64 {
        self.analyses_completed.load(Ordering::Relaxed)
    }

    /// Record an error. The log is capped at [`MAX_RECENT_ERRORS`]; oldest
    /// entries are evicted first.
    pub fn push_error(&self, message: String, symbol: Option<String>) {
        let record = ErrorRecord {
            message,
            symbol,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push_back(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.pop_front();
        }
    }

    /// Most recent errors, newest first.
    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().iter().rev().cloned().collect()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config_version", &self.current_config_version())
            .field("analyses_completed", &self.analyses_completed())
            .field("config_path", &self.config_path)
            .field("price_source", &self.price_source.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::InMemoryPriceSource;

    fn state() -> AppState {
        AppState::new(
            AnalysisConfig::default(),
            "analysis_config.json",
            Arc::new(InMemoryPriceSource::new()),
        )
    }

    #[test]
    fn error_log_is_capped_and_newest_first() {
        let state = state();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("err {i}"), None);
        }
        let errors = state.recent_errors();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, format!("err {}", MAX_RECENT_ERRORS + 4));
        assert_eq!(errors.last().unwrap().message, "err 5");
    }

    #[test]
    fn counters_advance() {
        let state = state();
        assert_eq!(state.current_config_version(), 1);
        assert_eq!(state.increment_config_version(), 2);
        state.record_analysis();
        state.record_analysis();
        assert_eq!(state.analyses_completed(), 2);
    }
}
