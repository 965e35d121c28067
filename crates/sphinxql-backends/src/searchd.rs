//! searchd backend using `mysql_async`.
//!
//! This module provides the [`SearchdBackend`] which implements the
//! [`SearchExecutor`] trait over searchd's SphinxQL listener. searchd speaks
//! the MySQL wire protocol but has no server-side prepared statements, so
//! every statement goes through the text protocol.

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts};

use crate::base::SearchdConfig;
use sphinxql_core::{SphinxError, SphinxResult};
use sphinxql_db::executor::SearchExecutor;
use sphinxql_db::value::Value;
use sphinxql_db::Row;

/// A pooled connection to searchd.
#[derive(Debug, Clone)]
pub struct SearchdBackend {
    pool: Pool,
}

/// Maps a driver error to the crate error.
///
/// Errors reported by the daemon keep their message verbatim. Everything
/// else is a transport problem.
pub fn map_error(err: mysql_async::Error) -> SphinxError {
    match err {
        mysql_async::Error::Server(server) => SphinxError::DatabaseError(server.message),
        other => SphinxError::OperationalError(other.to_string()),
    }
}

/// Builds driver options for a configuration.
///
/// # Errors
///
/// Returns [`SphinxError::ConfigurationError`] for malformed pool options.
pub fn build_opts(config: &SearchdConfig) -> SphinxResult<Opts> {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(config.host.clone())
        .tcp_port(config.port)
        .user(config.user.clone())
        .pass(config.password.clone())
        .db_name(config.name.clone())
        .prefer_socket(false);

    let min = config.option_usize("pool_min")?;
    let max = config.option_usize("pool_max")?;
    if min.is_some() || max.is_some() {
        let min = min.unwrap_or(0);
        let max = max.unwrap_or_else(|| min.max(10));
        let constraints = PoolConstraints::new(min, max).ok_or_else(|| {
            SphinxError::ConfigurationError(format!(
                "pool_min ({min}) must not exceed pool_max ({max})"
            ))
        })?;
        builder = builder.pool_opts(PoolOpts::default().with_constraints(constraints));
    }
    Ok(Opts::from(builder))
}

/// Converts a driver value. The text protocol returns most values as bytes.
fn convert_value(value: mysql_async::Value) -> SphinxResult<Value> {
    Ok(match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(b) => Value::String(String::from_utf8(b).map_err(|e| {
            tracing::warn!(error = %e, "searchd returned invalid UTF-8");
            SphinxError::InvalidValue(format!("searchd returned invalid UTF-8: {e}"))
        })?),
        mysql_async::Value::Int(i) => Value::Int(i),
        mysql_async::Value::UInt(u) => {
            i64::try_from(u).map_or_else(|_| Value::String(u.to_string()), Value::Int)
        }
        mysql_async::Value::Float(f) => Value::Float(f64::from(f)),
        mysql_async::Value::Double(d) => Value::Float(d),
        other => Value::String(other.as_sql(true)),
    })
}

/// Converts a `mysql_async::Row` to our generic `Row`.
fn convert_row(row: mysql_async::Row) -> SphinxResult<Row> {
    let columns: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let values = (0..columns.len())
        .map(|i| {
            row.get::<mysql_async::Value, _>(i)
                .map_or(Ok(Value::Null), convert_value)
        })
        .collect::<SphinxResult<Vec<_>>>()?;
    Ok(Row::new(columns, values))
}

impl SearchdBackend {
    /// Creates a backend from an existing pool.
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a backend for a configuration. No connection is opened until
    /// the first statement.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::ConfigurationError`] for malformed options.
    pub fn from_config(config: &SearchdConfig) -> SphinxResult<Self> {
        let opts = build_opts(config)?;
        tracing::info!(url = %config.display_url(), "configured searchd pool");
        Ok(Self::new(Pool::new(opts)))
    }

    /// Creates a backend from a `mysql://host:port` URL.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::ConfigurationError`] for an invalid URL.
    pub fn from_url(url: &str) -> SphinxResult<Self> {
        let opts = Opts::from_url(url)
            .map_err(|e| SphinxError::ConfigurationError(format!("invalid searchd URL: {e}")))?;
        let opts = OptsBuilder::from_opts(opts).prefer_socket(false);
        Ok(Self::new(Pool::new(opts)))
    }

    /// Creates a backend for the search alias of the global settings.
    ///
    /// # Errors
    ///
    /// As [`SearchdConfig::from_global_settings`].
    pub fn from_settings() -> SphinxResult<Self> {
        Self::from_config(&SearchdConfig::from_global_settings()?)
    }

    async fn conn(&self) -> SphinxResult<Conn> {
        self.pool.get_conn().await.map_err(map_error)
    }

    async fn query_on(conn: &mut Conn, sql: &str) -> SphinxResult<Vec<Row>> {
        tracing::debug!(sql, "searchd query");
        let rows: Vec<mysql_async::Row> = conn.query(sql).await.map_err(map_error)?;
        rows.into_iter().map(convert_row).collect()
    }

    /// Closes every pooled connection.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::OperationalError`] if the pool fails to shut down.
    pub async fn disconnect(self) -> SphinxResult<()> {
        self.pool.disconnect().await.map_err(map_error)
    }
}

#[async_trait::async_trait]
impl SearchExecutor for SearchdBackend {
    async fn execute_sql(&self, sql: &str) -> SphinxResult<u64> {
        let mut conn = self.conn().await?;
        tracing::debug!(sql, "searchd execute");
        conn.query_drop(sql).await.map_err(map_error)?;
        Ok(conn.affected_rows())
    }

    async fn query(&self, sql: &str) -> SphinxResult<Vec<Row>> {
        let mut conn = self.conn().await?;
        Self::query_on(&mut conn, sql).await
    }

    async fn query_with_meta(
        &self,
        sql: &str,
        meta_sql: &str,
    ) -> SphinxResult<(Vec<Row>, Vec<Row>)> {
        let mut conn = self.conn().await?;
        let rows = Self::query_on(&mut conn, sql).await?;
        let meta = Self::query_on(&mut conn, meta_sql).await?;
        Ok((rows, meta))
    }

    async fn insert_returning_id(&self, sql: &str) -> SphinxResult<Value> {
        let mut conn = self.conn().await?;
        tracing::debug!(sql, "searchd insert");
        conn.query_drop(sql).await.map_err(map_error)?;
        match conn.last_insert_id() {
            Some(id) => i64::try_from(id).map(Value::Int).map_err(|_| {
                SphinxError::InvalidValue(format!("document id {id} does not fit in i64"))
            }),
            None => {
                let rows = Self::query_on(&mut conn, "SELECT LAST_INSERT_ID()").await?;
                let raw = rows
                    .first()
                    .map(|row| row.get_by_index::<Value>(0))
                    .transpose()?
                    .unwrap_or(Value::Null);
                sphinxql_db::FieldType::DocId.decode(&raw)
            }
        }
    }
}
