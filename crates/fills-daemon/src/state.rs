//! Shared runtime state for fills-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The store is opened
//! once at boot; if that fails the daemon still serves, answering every
//! data route with 503 until it is restarted.

use std::sync::Arc;

use fills_config::DatabaseConfig;
use fills_db::{FillStore, FilterCatalog, StoreError, StoreOptions};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "fills-daemon",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub build: BuildInfo,
    /// The shared store, or the error that kept it from opening.
    pub store: Result<Arc<FillStore>, StoreError>,
    /// Columns exposed by `GET /get_filter_options`.
    pub catalog: FilterCatalog,
}

impl AppState {
    pub fn new(store: Arc<FillStore>) -> Self {
        Self {
            build: BuildInfo::default(),
            store: Ok(store),
            catalog: FilterCatalog::default(),
        }
    }

    /// State for a daemon whose store could not be opened.
    pub fn unavailable(err: StoreError) -> Self {
        Self {
            build: BuildInfo::default(),
            store: Err(err),
            catalog: FilterCatalog::default(),
        }
    }

    /// Open the configured store (with bounded retries). The daemon only
    /// reads: it never creates the database file or the schema, so a wrong
    /// path surfaces as 503 rather than an empty result. Failure is logged and
    /// captured rather than aborting boot.
    pub async fn connect(cfg: &DatabaseConfig) -> Self {
        let opts = StoreOptions {
            create_if_missing: false,
            max_connections: cfg.max_connections,
            query_timeout: cfg.query_timeout(),
            connect_attempts: cfg.connect_attempts,
            connect_backoff: cfg.connect_backoff(),
        };

        match FillStore::open(&cfg.url, opts).await {
            Ok(store) => {
                match fills_db::status(&store).await {
                    Ok(s) if s.has_fills_table => info!(url = %cfg.url, "fills store ready"),
                    Ok(_) => warn!(url = %cfg.url, "fills table missing; run `fills db init`"),
                    Err(e) => warn!(url = %cfg.url, error = %e, "fills store status check failed"),
                }
                Self::new(Arc::new(store))
            }
            Err(e) => {
                error!(url = %cfg.url, error = %e, "fills store unavailable; serving 503");
                Self::unavailable(e)
            }
        }
    }

    /// Close the store, if one is open. Later requests fail with 503.
    pub async fn shutdown(&self) {
        if let Ok(store) = &self.store {
            store.close().await;
        }
    }
}
