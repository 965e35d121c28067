//! Statement counting assertions.
//!
//! Provides [`assert_num_queries`] which counts the statements sent to a
//! [`FakeSearchd`] during an async closure and asserts that the count matches
//! an expected value. Useful for pinning down how many round trips a
//! queryset operation costs (e.g. `with_meta` is two, `save` is one).
//!
//! ## Example
//!
//! ```rust
//! use sphinxql_test::assert_queries::assert_num_queries;
//! use sphinxql_test::fake_searchd::FakeSearchd;
//! use sphinxql_db::SearchExecutor;
//!
//! # tokio_test::block_on(async {
//! let db = FakeSearchd::new();
//! assert_num_queries(&db, 1, || async {
//!     db.execute_sql("TRUNCATE RTINDEX idx").await.unwrap();
//! })
//! .await;
//! # });
//! ```

use std::future::Future;

use crate::fake_searchd::FakeSearchd;

/// Asserts that exactly `expected_count` statements are executed during the
/// async closure.
///
/// # Panics
///
/// Panics if the number of statements does not match `expected_count`.
pub async fn assert_num_queries<F, Fut>(db: &FakeSearchd, expected_count: usize, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    db.reset_query_count();
    f().await;
    let actual = db.query_count();
    assert_eq!(
        actual, expected_count,
        "Expected {expected_count} SphinxQL statements, but {actual} were executed"
    );
}

/// Asserts that at most `max_count` statements are executed during the async
/// closure.
///
/// # Panics
///
/// Panics if more than `max_count` statements are executed.
pub async fn assert_max_queries<F, Fut>(db: &FakeSearchd, max_count: usize, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    db.reset_query_count();
    f().await;
    let actual = db.query_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} SphinxQL statements, but {actual} were executed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphinxql_db::SearchExecutor;

    #[tokio::test]
    async fn test_assert_num_queries_passes() {
        let db = FakeSearchd::new();
        assert_num_queries(&db, 2, || async {
            db.execute_sql("REPLACE INTO `idx` (id) VALUES (1)").await.unwrap();
            db.query("SELECT * FROM `idx`").await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_num_queries_zero() {
        let db = FakeSearchd::new();
        assert_num_queries(&db, 0, || async {}).await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected 1 SphinxQL statements, but 2 were executed")]
    async fn test_assert_num_queries_fails_too_many() {
        let db = FakeSearchd::new();
        assert_num_queries(&db, 1, || async {
            db.query("SELECT * FROM `idx`").await.unwrap();
            db.query("SHOW META").await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_max_queries_passes() {
        let db = FakeSearchd::new();
        assert_max_queries(&db, 3, || async {
            db.query("SELECT * FROM `idx`").await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected at most 1 SphinxQL statements, but 2 were executed")]
    async fn test_assert_max_queries_fails() {
        let db = FakeSearchd::new();
        assert_max_queries(&db, 1, || async {
            db.execute_sql("DELETE FROM `idx` WHERE id > 0").await.unwrap();
            db.execute_sql("DELETE FROM `idx` WHERE id > 0").await.unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_counter_resets_between_assertions() {
        let db = FakeSearchd::new();
        assert_num_queries(&db, 1, || async {
            db.query("SELECT 1").await.unwrap();
        })
        .await;
        assert_num_queries(&db, 1, || async {
            db.query("SELECT 1").await.unwrap();
        })
        .await;
    }
}
