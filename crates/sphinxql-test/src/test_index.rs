//! Index setup for tests.
//!
//! [`setup_index`] recreates a model's real-time index from scratch and
//! [`truncate_index`] empties it between tests. [`live_backend`] connects to
//! the daemon named by `SPHINXQL_TEST_URL`, if any, so integration tests can
//! skip themselves when no daemon is around.

use sphinxql_backends::SearchdBackend;
use sphinxql_core::SphinxResult;
use sphinxql_db::executor::SearchExecutor;
use sphinxql_db::model::ModelMeta;
use sphinxql_db::schema;

/// The environment variable naming a live searchd for integration tests.
pub const TEST_URL_ENV: &str = "SPHINXQL_TEST_URL";

/// Drops and recreates the index described by `meta`.
///
/// # Errors
///
/// Propagates schema and daemon errors.
pub async fn setup_index(meta: &ModelMeta, db: &dyn SearchExecutor) -> SphinxResult<()> {
    schema::drop_index(&meta.db_table, db).await?;
    schema::create_index(meta, db).await
}

/// Removes every document from the index described by `meta`.
///
/// # Errors
///
/// Propagates daemon errors.
pub async fn truncate_index(meta: &ModelMeta, db: &dyn SearchExecutor) -> SphinxResult<()> {
    schema::truncate_index(&meta.db_table, db).await
}

/// Returns a backend for `SPHINXQL_TEST_URL`, or `None` when it is unset.
///
/// # Errors
///
/// Returns an error if the variable holds an invalid URL.
pub fn live_backend() -> SphinxResult<Option<SearchdBackend>> {
    match std::env::var(TEST_URL_ENV) {
        Ok(url) if !url.is_empty() => SearchdBackend::from_url(&url).map(Some),
        _ => Ok(None),
    }
}
