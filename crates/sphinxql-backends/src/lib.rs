//! # sphinxql-backends
//!
//! Connection handling for the search daemon. Provides the connection
//! configuration derived from settings and a pooled
//! [`SearchExecutor`](sphinxql_db::SearchExecutor) implementation over
//! searchd's SphinxQL listener.
//!
//! - [`base`] - [`SearchdConfig`](base::SearchdConfig)
//! - [`searchd`] - [`SearchdBackend`](searchd::SearchdBackend)

pub mod base;
pub mod searchd;

pub use base::{SearchdConfig, SEARCHD_ENGINE};
pub use searchd::SearchdBackend;
