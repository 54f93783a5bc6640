// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//
//   GET  /health     liveness, uptime, counters
//   GET  /symbols    configured symbol catalogue
//   GET  /config     active analysis defaults
//   POST /config     partial update, validated, then persisted
//   POST /analyze    fetch + signals + chart data + position PnL
//   POST /pnl        position PnL against a caller-supplied price
//   GET  /errors     recent provider failures
//
// Validation failures map to 400, provider failures to 502. A range with no
// prices is a normal 200 response with `"status": "no_data"`.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::{run_analysis, AnalysisOutcome, AnalysisRequest};
use crate::app_state::AppState;
use crate::error::{AnalysisError, PriceSourceError, ValidationError};
use crate::position_tracker::{compute_pnl, PnlReport};
use crate::runtime_config::AnalysisConfig;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/symbols", get(symbols))
        .route("/api/v1/config", get(get_config).post(set_config))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/pnl", post(pnl))
        .route("/api/v1/errors", get(errors))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error responses
// =============================================================================

/// JSON error body: `{ "error": "...", "kind": "validation" | "upstream" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: err.to_string(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(e) => e.into(),
            AnalysisError::PriceSource(e) => {
                let kind = match e {
                    PriceSourceError::MissingField { .. } => "missing_field",
                    _ => "upstream",
                };
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    kind,
                    message: e.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    price_source: &'static str,
    config_version: u64,
    analyses_completed: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        price_source: state.price_source.name(),
        config_version: state.current_config_version(),
        analyses_completed: state.analyses_completed(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Symbols
// =============================================================================

async fn symbols(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let symbols = state.config.read().symbols.clone();
    Json(symbols)
}

// =============================================================================
// Config
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config_snapshot())
}

#[derive(Debug, Default, Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    symbols: Option<Vec<String>>,
    #[serde(default)]
    short_window: Option<usize>,
    #[serde(default)]
    long_window: Option<usize>,
    #[serde(default)]
    lookback_days: Option<u32>,
    #[serde(default)]
    preview_rows: Option<usize>,
    #[serde(default)]
    default_entry_price: Option<f64>,
    #[serde(default)]
    default_quantity: Option<u32>,
}

#[derive(Serialize)]
struct ConfigUpdateResponse {
    config: AnalysisConfig,
    changes: Vec<String>,
    persisted: bool,
}

async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<ConfigUpdateResponse>, ApiError> {
    Ok(Json(apply_config_update(&state, &update)?))
}

/// Merge `update` into the active config. The write lock is held from the
/// read through the store (and the save) so concurrent updates serialise.
fn apply_config_update(
    state: &AppState,
    update: &ConfigUpdate,
) -> Result<ConfigUpdateResponse, ValidationError> {
    let mut active = state.config.write();
    let mut candidate = active.clone();
    let mut changes = Vec::new();

    macro_rules! apply_field {
        ($field:ident) => {
            if let Some(val) = update.$field {
                if candidate.$field != val {
                    changes.push(format!(
                        "{}: {} -> {}",
                        stringify!($field),
                        candidate.$field,
                        val
                    ));
                    candidate.$field = val;
                }
            }
        };
    }

    apply_field!(short_window);
    apply_field!(long_window);
    apply_field!(lookback_days);
    apply_field!(preview_rows);
    apply_field!(default_entry_price);
    apply_field!(default_quantity);

    if let Some(symbols) = &update.symbols {
        let before = candidate.symbols.clone();
        candidate.apply_symbol_override(&symbols.join(","));
        if candidate.symbols != before {
            changes.push(format!("symbols: {} entries", candidate.symbols.len()));
        }
    }

    candidate.validate()?;

    let mut persisted = false;
    if !changes.is_empty() {
        *active = candidate.clone();
        state.increment_config_version();
        info!(changes = ?changes, "Analysis config updated");

        // Best-effort: the in-memory config is already active.
        match candidate.save(&state.config_path) {
            Ok(()) => persisted = true,
            Err(e) => warn!(error = %e, "Failed to save analysis config to disk"),
        }
    }

    Ok(ConfigUpdateResponse {
        config: candidate,
        changes,
        persisted,
    })
}

// =============================================================================
// Analysis
// =============================================================================

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let config = state.config_snapshot();
    let today = Local::now().date_naive();

    match run_analysis(state.price_source.as_ref(), &request, &config, today).await {
        Ok(outcome) => {
            state.record_analysis();
            Ok(Json(outcome))
        }
        Err(e) => {
            if !e.is_validation() {
                state.push_error(e.to_string(), Some(request.symbol.trim().to_uppercase()));
            }
            warn!(symbol = %request.symbol, error = %e, "analysis request failed");
            Err(e.into())
        }
    }
}

// =============================================================================
// Position PnL
// =============================================================================

#[derive(Deserialize)]
struct PnlRequest {
    entry_price: f64,
    quantity: u32,
    current_price: f64,
}

async fn pnl(Json(request): Json<PnlRequest>) -> Result<Json<PnlReport>, ApiError> {
    let report = compute_pnl(request.entry_price, request.quantity, request.current_price)?;
    Ok(Json(report))
}

// =============================================================================
// Error log
// =============================================================================

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors())
}
