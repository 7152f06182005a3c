//! Axum router and all HTTP handlers for fills-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests compose the bare router directly.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fills_db::{pnl_by_filters, FillStore, FillsError, StoreError};
use fills_pnl::TimestampMap;
use fills_schemas::{FilterSpec, FilterSpecError};
use tracing::{error, info, warn};

use crate::{
    api_types::{ErrorResponse, GetDataBody, HealthResponse, PnlListResponse, StoreHealth},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/get_data", post(get_data))
        .route("/v1/pnl", post(pnl_list))
        .route("/get_filter_options", get(filter_options))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler failure, rendered as `{"error", "kind"}` with a mapped status.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// Request body missing, not JSON, or without a `filters` string.
    Body(String),
    Filters(FilterSpecError),
    Fills(FillsError),
}

impl From<FilterSpecError> for ApiError {
    fn from(e: FilterSpecError) -> Self {
        Self::Filters(e)
    }
}

impl From<FillsError> for ApiError {
    fn from(e: FillsError) -> Self {
        Self::Fills(e)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Body(_) | Self::Filters(_) => (StatusCode::BAD_REQUEST, "malformed_filters"),
            Self::Fills(FillsError::Query(_)) => (StatusCode::BAD_REQUEST, "invalid_query"),
            Self::Fills(FillsError::Store(StoreError::Connection { .. }))
            | Self::Fills(FillsError::Store(StoreError::Closed)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
            Self::Fills(FillsError::Store(StoreError::Timeout { .. })) => {
                (StatusCode::GATEWAY_TIMEOUT, "store_timeout")
            }
            Self::Fills(FillsError::Store(StoreError::Query { .. })) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "store_query")
            }
            Self::Fills(FillsError::Pnl(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "bad_fill_data"),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Body(msg) => msg.clone(),
            Self::Filters(e) => e.to_string(),
            Self::Fills(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let error = self.message();
        if status.is_server_error() {
            error!(%status, kind, %error, "request failed");
        } else {
            warn!(%status, kind, %error, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

fn store(st: &AppState) -> Result<&FillStore, ApiError> {
    st.store
        .as_deref()
        .map_err(|e| ApiError::Fills(FillsError::Store(e.clone())))
}

fn parse_filters(body: Result<Json<GetDataBody>, JsonRejection>) -> Result<FilterSpec, ApiError> {
    let Json(body) = body.map_err(|rej| ApiError::Body(rej.body_text()))?;
    Ok(FilterSpec::from_json_str(&body.filters)?)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

/// 200 when the store answers and has the fills table, 503 otherwise.
pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let store_health = match &st.store {
        Ok(store) => match fills_db::status(store).await {
            Ok(s) => StoreHealth {
                ok: s.ok,
                has_fills_table: s.has_fills_table,
                error: None,
            },
            Err(e) => StoreHealth {
                ok: false,
                has_fills_table: false,
                error: Some(e.to_string()),
            },
        },
        Err(e) => StoreHealth {
            ok: false,
            has_fills_table: false,
            error: Some(e.to_string()),
        },
    };

    let ok = store_health.ok && store_health.has_fills_table;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            ok,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            now_utc: Utc::now(),
            store: store_health,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /get_data
// ---------------------------------------------------------------------------

/// Legacy shape: `{"<timestamp>": cumulative_pnl}` with one key per distinct
/// timestamp (the value after the last fill at that timestamp), keys in
/// series order.
pub(crate) async fn get_data(
    State(st): State<Arc<AppState>>,
    body: Result<Json<GetDataBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let spec = parse_filters(body)?;
    let series = pnl_by_filters(store(&st)?, &spec).await?;
    let points = series.last_per_timestamp();
    info!(rows = series.len(), keys = points.len(), "get_data");
    Ok((StatusCode::OK, Json(TimestampMap(&points))).into_response())
}

// ---------------------------------------------------------------------------
// POST /v1/pnl
// ---------------------------------------------------------------------------

pub(crate) async fn pnl_list(
    State(st): State<Arc<AppState>>,
    body: Result<Json<GetDataBody>, JsonRejection>,
) -> Result<Json<PnlListResponse>, ApiError> {
    let spec = parse_filters(body)?;
    let series = pnl_by_filters(store(&st)?, &spec).await?;
    info!(rows = series.len(), "pnl");
    Ok(Json(PnlListResponse {
        points: series.points(),
        final_pnl: series.final_pnl(),
    }))
}

// ---------------------------------------------------------------------------
// GET /get_filter_options
// ---------------------------------------------------------------------------

pub(crate) async fn filter_options(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let options = st.catalog.options(store(&st)?).await?;
    Ok((StatusCode::OK, Json(options)).into_response())
}
