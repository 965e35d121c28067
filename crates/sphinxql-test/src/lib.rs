//! # sphinxql-test
//!
//! Testing utilities for sphinxql. Provides an in-memory fake of the search
//! daemon that records statements and replays scripted results, statement
//! counting assertions, and helpers for setting up indexes on a live daemon.

pub mod assert_queries;
pub mod fake_searchd;
pub mod test_index;

pub use assert_queries::{assert_max_queries, assert_num_queries};
pub use fake_searchd::{meta_rows, text_row, FakeSearchd};
pub use test_index::{live_backend, setup_index, truncate_index, TEST_URL_ENV};
