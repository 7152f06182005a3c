//! Request and response types for the fills-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::{DateTime, Utc};
use fills_schemas::PnlPoint;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub now_utc: DateTime<Utc>,
    pub store: StoreHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreHealth {
    pub ok: bool,
    pub has_fills_table: bool,
    /// Set when the store is unreachable or its status check failed.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// /get_data  /v1/pnl
// ---------------------------------------------------------------------------

/// Request body for both PnL endpoints. `filters` is itself a JSON-encoded
/// string: `{"symbol": ["BTC"], "exchange": ["A", "B"]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDataBody {
    pub filters: String,
}

/// Full ordered series; duplicate timestamps are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnlListResponse {
    pub points: Vec<PnlPoint>,
    pub final_pnl: Option<f64>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "malformed_filters" | "invalid_query" | "store_unavailable" |
    /// "store_timeout" | "store_query" | "bad_fill_data"
    pub kind: String,
}
