//! fills-db
//!
//! Read path for the `fills` table:
//! - `store`: pooled SQLite connection returning rows + column names
//! - `predicate`: filter spec -> bound-parameter WHERE fragments
//! - `planner`: SELECT composition
//! - `catalog`: distinct categorical values for filter discovery
//!
//! Domain conveniences (fetch all, distinct, filtered PnL) are free functions
//! taking `&FillStore`.

mod catalog;
mod ingest;
mod store;

pub mod planner;
pub mod predicate;

pub use catalog::FilterCatalog;
pub use ingest::{load_fills_csv, read_fills_csv};
pub use planner::{plan, plan_distinct, PlannedQuery};
pub use predicate::{build, condition_for, Condition, Predicate, QueryError};
pub use store::{FillStore, StoreError, StoreOptions};

use std::fmt;

use fills_pnl::{PnlError, PnlSeries};
use fills_schemas::{Cell, FillRecord, FilterSpec, ResultSet, FILLS_TABLE};
use sqlx::migrate::MigrateError;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Anything that can fail between a filter spec and a computed series.
#[derive(Debug, Clone, PartialEq)]
pub enum FillsError {
    Store(StoreError),
    Query(QueryError),
    Pnl(PnlError),
}

impl fmt::Display for FillsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => e.fmt(f),
            Self::Query(e) => e.fmt(f),
            Self::Pnl(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for FillsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Pnl(e) => Some(e),
        }
    }
}

impl From<StoreError> for FillsError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<QueryError> for FillsError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

impl From<PnlError> for FillsError {
    fn from(e: PnlError) -> Self {
        Self::Pnl(e)
    }
}

// ---------------------------------------------------------------------------
// Schema + status
// ---------------------------------------------------------------------------

/// Run embedded SQLx migrations (creates `fills` if missing).
pub async fn migrate(store: &FillStore) -> Result<(), StoreError> {
    store.ensure_open()?;
    store
        .timed(async {
            sqlx::migrate!("./migrations")
                .run(store.pool())
                .await
                .map_err(|e| match e {
                    MigrateError::Execute(e) => store.sqlx_error("migrate", e),
                    other => StoreError::Query {
                        sql: "migrate".to_string(),
                        reason: other.to_string(),
                    },
                })
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStatus {
    pub ok: bool,
    pub has_fills_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(store: &FillStore) -> Result<DbStatus, StoreError> {
    let one = store.execute(&PlannedQuery::raw("select 1")).await?;
    let ok = matches!(one.rows.first().and_then(|r| r.first()), Some(Cell::Integer(1)));

    let mut q = PlannedQuery::raw(
        "select count(*) from sqlite_master where type = 'table' and name = ?",
    );
    q.params.push(FILLS_TABLE.to_string());
    let exists = store.execute(&q).await?;
    let has_fills_table = matches!(
        exists.rows.first().and_then(|r| r.first()),
        Some(Cell::Integer(n)) if *n > 0
    );

    Ok(DbStatus {
        ok,
        has_fills_table,
    })
}

/// Insert fills in one transaction. Returns the number of rows written.
pub async fn insert_fills(store: &FillStore, fills: &[FillRecord]) -> Result<u64, StoreError> {
    const SQL: &str = r#"
        insert into fills (timestamp, symbol, exchange, side, fill_price, fill_quantity)
        values (?, ?, ?, ?, ?, ?)
    "#;
    store.ensure_open()?;
    let map = |e: sqlx::Error| store.sqlx_error("insert into fills", e);

    let written = store
        .timed(async {
            let mut tx = store.pool().begin().await.map_err(map)?;
            let mut n = 0u64;
            for f in fills {
                n += sqlx::query(SQL)
                    .bind(f.timestamp)
                    .bind(&f.symbol)
                    .bind(&f.exchange)
                    .bind(f.side.as_str())
                    .bind(f.fill_price)
                    .bind(f.fill_quantity)
                    .execute(&mut *tx)
                    .await
                    .map_err(map)?
                    .rows_affected();
            }
            tx.commit().await.map_err(map)?;
            Ok(n)
        })
        .await?;

    info!(rows = written, "fills inserted");
    Ok(written)
}

// ---------------------------------------------------------------------------
// Read conveniences
// ---------------------------------------------------------------------------

/// Every record of the fills table.
pub async fn fetch_all_fills(store: &FillStore) -> Result<ResultSet, FillsError> {
    let q = plan(FILLS_TABLE, None, None)?;
    Ok(store.execute(&q).await?)
}

/// Distinct values of one column, in store order.
pub async fn distinct_values(store: &FillStore, column: &str) -> Result<Vec<Cell>, FillsError> {
    let q = plan_distinct(FILLS_TABLE, column)?;
    let rs = store.execute(&q).await?;
    Ok(rs
        .rows
        .into_iter()
        .filter_map(|r| r.into_iter().next())
        .collect())
}

/// Rows matching the filter spec; an unrestricted spec selects all rows.
pub async fn select_fills(store: &FillStore, spec: &FilterSpec) -> Result<ResultSet, FillsError> {
    if spec.is_unrestricted() {
        return fetch_all_fills(store).await;
    }
    let q = plan(FILLS_TABLE, None, condition_for(spec)?.as_ref())?;
    Ok(store.execute(&q).await?)
}

/// Filter, fetch and compute the cumulative PnL series.
pub async fn pnl_by_filters(store: &FillStore, spec: &FilterSpec) -> Result<PnlSeries, FillsError> {
    let rs = select_fills(store, spec).await?;
    debug!(rows = rs.rows.len(), "computing pnl series");
    Ok(PnlSeries::compute(&rs.columns, &rs.rows)?)
}
