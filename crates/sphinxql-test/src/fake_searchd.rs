//! An in-memory stand-in for searchd.
//!
//! [`FakeSearchd`] implements [`SearchExecutor`] without a network. It
//! records every statement it receives and answers from a queue of scripted
//! responses, so tests can assert on the exact SphinxQL a queryset produces
//! and feed back the rows the daemon would have returned.
//!
//! ## Example
//!
//! ```rust
//! use sphinxql_test::fake_searchd::{text_row, FakeSearchd};
//! use sphinxql_db::SearchExecutor;
//!
//! # tokio_test::block_on(async {
//! let db = FakeSearchd::new();
//! db.push_rows(vec![text_row(&[("id", "1")])]);
//! let rows = db.query("SELECT id FROM `idx`").await.unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(db.captured(), vec!["SELECT id FROM `idx`".to_string()]);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use sphinxql_core::{SphinxError, SphinxResult};
use sphinxql_db::executor::SearchExecutor;
use sphinxql_db::value::Value;
use sphinxql_db::Row;

/// One scripted answer, consumed by the next statement.
#[derive(Debug)]
enum Scripted {
    Rows(Vec<Row>),
    Affected(u64),
    InsertId(i64),
    Error(SphinxError),
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<String>,
    responses: VecDeque<Scripted>,
}

/// A recording, scriptable fake of the search daemon.
///
/// Each statement consumes the next scripted response. Without one, queries
/// return no rows, other statements report one affected document, and
/// inserts get increasing ids starting at 1.
#[derive(Debug, Clone)]
pub struct FakeSearchd {
    state: Arc<Mutex<State>>,
    query_count: Arc<AtomicUsize>,
    next_id: Arc<AtomicI64>,
}

impl Default for FakeSearchd {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a row the way the text protocol delivers it: every value a string.
pub fn text_row(pairs: &[(&str, &str)]) -> Row {
    Row::new(
        pairs.iter().map(|(c, _)| (*c).to_string()).collect(),
        pairs.iter().map(|(_, v)| Value::from(*v)).collect(),
    )
}

/// Builds the rows of a `SHOW META` answer.
pub fn meta_rows(pairs: &[(&str, &str)]) -> Vec<Row> {
    pairs
        .iter()
        .map(|&(name, value)| text_row(&[("Variable_name", name), ("Value", value)]))
        .collect()
}

impl FakeSearchd {
    /// Creates a fake with no scripted responses.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            query_count: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, sql: &str) -> Option<Scripted> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        state.statements.push(sql.to_string());
        state.responses.pop_front()
    }

    /// Queues a result set.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.lock().responses.push_back(Scripted::Rows(rows));
    }

    /// Queues an affected-documents count.
    pub fn push_affected(&self, affected: u64) {
        self.lock().responses.push_back(Scripted::Affected(affected));
    }

    /// Queues the id the next INSERT is assigned.
    pub fn push_insert_id(&self, id: i64) {
        self.lock().responses.push_back(Scripted::InsertId(id));
    }

    /// Queues a daemon error.
    pub fn push_error(&self, error: SphinxError) {
        self.lock().responses.push_back(Scripted::Error(error));
    }

    /// Returns every statement received so far, oldest first.
    pub fn captured(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Returns the most recent statement.
    pub fn last_statement(&self) -> Option<String> {
        self.lock().statements.last().cloned()
    }

    /// Forgets recorded statements and pending responses.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.statements.clear();
        state.responses.clear();
    }

    /// Returns the number of statements executed since the last reset.
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Resets the statement counter to zero.
    pub fn reset_query_count(&self) {
        self.query_count.store(0, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl SearchExecutor for FakeSearchd {
    async fn execute_sql(&self, sql: &str) -> SphinxResult<u64> {
        tracing::debug!(sql, "fake searchd execute");
        match self.record(sql) {
            Some(Scripted::Affected(n)) => Ok(n),
            Some(Scripted::Rows(rows)) => Ok(rows.len() as u64),
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::InsertId(_)) | None => Ok(1),
        }
    }

    async fn query(&self, sql: &str) -> SphinxResult<Vec<Row>> {
        tracing::debug!(sql, "fake searchd query");
        match self.record(sql) {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Affected(_) | Scripted::InsertId(_)) | None => Ok(Vec::new()),
        }
    }

    async fn insert_returning_id(&self, sql: &str) -> SphinxResult<Value> {
        tracing::debug!(sql, "fake searchd insert");
        match self.record(sql) {
            Some(Scripted::InsertId(id)) => Ok(Value::Int(id)),
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Rows(_) | Scripted::Affected(_)) | None => {
                Ok(Value::Int(self.next_id.fetch_add(1, Ordering::Relaxed)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_statements() {
        let db = FakeSearchd::new();
        db.execute_sql("TRUNCATE RTINDEX idx").await.unwrap();
        db.query("SELECT * FROM `idx`").await.unwrap();
        assert_eq!(
            db.captured(),
            vec!["TRUNCATE RTINDEX idx".to_string(), "SELECT * FROM `idx`".to_string()]
        );
        assert_eq!(db.last_statement().as_deref(), Some("SELECT * FROM `idx`"));
        assert_eq!(db.query_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let db = FakeSearchd::new();
        db.push_affected(3);
        db.push_rows(vec![text_row(&[("id", "1")]), text_row(&[("id", "2")])]);
        assert_eq!(db.execute_sql("UPDATE").await.unwrap(), 3);
        assert_eq!(db.query("SELECT").await.unwrap().len(), 2);
        assert!(db.query("SELECT").await.unwrap().is_empty());
        assert_eq!(db.execute_sql("DELETE").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let db = FakeSearchd::new();
        db.push_error(SphinxError::DatabaseError("unknown column".to_string()));
        let err = db.query("SELECT nope FROM `idx`").await.unwrap_err();
        assert!(matches!(err, SphinxError::DatabaseError(msg) if msg == "unknown column"));
        assert!(db.query("SELECT 1").await.is_ok());
    }

    #[tokio::test]
    async fn test_insert_ids() {
        let db = FakeSearchd::new();
        db.push_insert_id(42);
        assert_eq!(db.insert_returning_id("INSERT").await.unwrap(), Value::Int(42));
        assert_eq!(db.insert_returning_id("INSERT").await.unwrap(), Value::Int(1));
        assert_eq!(db.insert_returning_id("INSERT").await.unwrap(), Value::Int(2));
        assert_eq!(db.query_count(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let db = FakeSearchd::new();
        let other = db.clone();
        other.query("SHOW META").await.unwrap();
        assert_eq!(db.captured().len(), 1);
        db.clear();
        db.reset_query_count();
        assert!(other.captured().is_empty());
        assert_eq!(other.query_count(), 0);
    }

    #[test]
    fn test_meta_rows() {
        let rows = meta_rows(&[("total", "2"), ("total_found", "5")]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get::<String>("Value").unwrap(), "5");
    }
}
