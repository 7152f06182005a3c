//! Pooled SQLite store returning dynamically typed result sets.
//!
//! One `FillStore` is shared by the whole process. Every `execute` checks out
//! its own pooled connection for the full prepare + bind + fetch, so no two
//! callers ever interleave on the same cursor.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use fills_schemas::{Cell, ResultSet};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::planner::PlannedQuery;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The connection could not be established.
    Connection { url: String, reason: String },
    /// A round trip exceeded the configured timeout.
    Timeout { after_ms: u64 },
    /// The store was closed.
    Closed,
    /// The engine rejected or failed the statement.
    Query { sql: String, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { url, reason } => {
                write!(f, "store connection to {url} failed: {reason}")
            }
            Self::Timeout { after_ms } => write!(f, "store round trip timed out after {after_ms}ms"),
            Self::Closed => write!(f, "store is closed"),
            Self::Query { sql, reason } => write!(f, "store query failed ({sql}): {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// `timeout` is reported when the pool gives up waiting for a connection.
    fn from_sqlx(sql: &str, e: sqlx::Error, timeout: Duration) -> Self {
        match e {
            sqlx::Error::PoolClosed => StoreError::Closed,
            sqlx::Error::PoolTimedOut => StoreError::Timeout {
                after_ms: timeout.as_millis() as u64,
            },
            other => StoreError::Query {
                sql: sql.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Create the database file when it does not exist. Off for readers, so a
    /// mistyped path fails to open instead of serving an empty database.
    pub create_if_missing: bool,
    pub max_connections: u32,
    pub query_timeout: Duration,
    pub connect_attempts: u32,
    pub connect_backoff: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            create_if_missing: false,
            max_connections: 4,
            query_timeout: Duration::from_secs(5),
            connect_attempts: 3,
            connect_backoff: Duration::from_millis(200),
        }
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

// ---------------------------------------------------------------------------
// FillStore
// ---------------------------------------------------------------------------

pub struct FillStore {
    pool: SqlitePool,
    url: String,
    query_timeout: Duration,
    last_columns: Mutex<Vec<String>>,
}

impl fmt::Debug for FillStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillStore")
            .field("url", &self.url)
            .field("query_timeout", &self.query_timeout)
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

impl FillStore {
    /// Connect, retrying with doubling backoff up to `connect_attempts`.
    ///
    /// An in-memory URL is pinned to one never-recycled connection; otherwise
    /// every pooled connection would see its own empty database.
    pub async fn open(url: &str, opts: StoreOptions) -> Result<Self, StoreError> {
        let memory = is_memory_url(url);
        let connect_opts = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .create_if_missing(opts.create_if_missing || memory);

        let pool_opts = if memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(opts.max_connections.max(1))
        };

        let attempts = opts.connect_attempts.max(1);
        let mut backoff = opts.connect_backoff;
        let mut attempt = 1;
        let pool = loop {
            match pool_opts.clone().connect_with(connect_opts.clone()).await {
                Ok(pool) => break pool,
                Err(e) if attempt < attempts => {
                    warn!(url, attempt, error = %e, "store connect failed; retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(StoreError::Connection {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        };

        info!(url, memory, "store opened");
        Ok(Self {
            pool,
            url: url.to_string(),
            query_timeout: opts.query_timeout,
            last_columns: Mutex::new(Vec::new()),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a planned query and return its rows plus column names.
    pub async fn execute(&self, query: &PlannedQuery) -> Result<ResultSet, StoreError> {
        self.ensure_open()?;
        debug!(sql = %query.sql, params = query.params.len(), "store execute");

        let rs = self.timed(self.execute_inner(query)).await?;
        *self.last_columns.lock().await = rs.columns.clone();
        Ok(rs)
    }

    async fn execute_inner(&self, query: &PlannedQuery) -> Result<ResultSet, StoreError> {
        let sql = query.sql.as_str();
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| self.sqlx_error(sql, e))?;

        let stmt = (&mut *conn)
            .prepare(sql)
            .await
            .map_err(|e| self.sqlx_error(sql, e))?;
        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut q = stmt.query();
        for p in &query.params {
            q = q.bind(p.clone());
        }
        let rows = q
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| self.sqlx_error(sql, e))?;

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.sqlx_error(sql, e))?;

        Ok(ResultSet { columns, rows })
    }

    pub(crate) fn sqlx_error(&self, sql: &str, e: sqlx::Error) -> StoreError {
        StoreError::from_sqlx(sql, e, self.query_timeout)
    }

    /// Fail fast with `Closed` instead of surfacing the pool's error.
    pub(crate) fn ensure_open(&self) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Column names of the most recently completed `execute`.
    pub async fn last_columns(&self) -> Vec<String> {
        self.last_columns.lock().await.clone()
    }

    /// Bound a store future by the configured timeout.
    pub(crate) async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout {
                after_ms: self.query_timeout.as_millis() as u64,
            }),
        }
    }

    /// Release every connection. Pending writes are committed per statement,
    /// so closing flushes nothing further. Later calls fail with `Closed`.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!(url = %self.url, "store closed");
        }
    }
}

/// Decode by the value's runtime storage class, not the declared column type.
fn decode_row(row: &SqliteRow) -> Result<Vec<Cell>, sqlx::Error> {
    (0..row.len())
        .map(|i| {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                return Ok(Cell::Null);
            }
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" => row.try_get::<i64, _>(i).map(Cell::Integer),
                "REAL" => row.try_get::<f64, _>(i).map(Cell::Real),
                "BLOB" => row
                    .try_get::<Vec<u8>, _>(i)
                    .map(|b| Cell::Text(String::from_utf8_lossy(&b).into_owned())),
                _ => row.try_get::<String, _>(i).map(Cell::Text),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_keep_their_meaning() {
        let timeout = Duration::from_millis(250);
        assert_eq!(
            StoreError::from_sqlx("select 1", sqlx::Error::PoolTimedOut, timeout),
            StoreError::Timeout { after_ms: 250 }
        );
        assert_eq!(
            StoreError::from_sqlx("select 1", sqlx::Error::PoolClosed, timeout),
            StoreError::Closed
        );
        assert!(matches!(
            StoreError::from_sqlx("select 1", sqlx::Error::RowNotFound, timeout),
            StoreError::Query { .. }
        ));
    }

    #[test]
    fn timeout_message_names_the_bound() {
        let e = StoreError::from_sqlx("select 1", sqlx::Error::PoolTimedOut, Duration::from_secs(5));
        assert_eq!(e.to_string(), "store round trip timed out after 5000ms");
    }

    #[test]
    fn readers_do_not_create_files_by_default() {
        assert!(!StoreOptions::default().create_if_missing);
    }
}
