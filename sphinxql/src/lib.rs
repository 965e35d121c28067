//! # sphinxql
//!
//! A Sphinx / Manticore Search backend for a Django-style async ORM.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. Models describe real-time index documents, querysets compile to
//! SphinxQL, and the searchd backend ships the statements over the MySQL
//! protocol.
//!
//! ```
//! use sphinxql::prelude::*;
//!
//! let q = Q::lookup("attr_uint__gte", 10).unwrap() & !Q::lookup("attr_bool", true).unwrap();
//! assert!(matches!(q, Q::And(_)));
//! ```

/// Settings, logging, and error types.
pub use sphinxql_core as core;

/// ORM: models, querysets, the SphinxQL compiler, and routing.
pub use sphinxql_db as db;

/// The pooled searchd connection.
#[cfg(feature = "searchd")]
pub use sphinxql_backends as backends;

/// Fake daemon and assertions for tests.
#[cfg(feature = "testing")]
pub use sphinxql_test as test;

/// Third-party crates that appear in the public API.
pub use async_trait;
pub use chrono;
pub use serde_json;
pub use tokio;
pub use tracing;

/// The names most programs need.
pub mod prelude {
    pub use sphinxql_core::{SphinxError, SphinxResult, SETTINGS};
    pub use sphinxql_db::{
        create_model, delete_model, refresh_model, save_model, AggregateFunc, FieldDef,
        FieldType, GroupBy, Manager, Model, ModelMeta, OrderBy, QueryResult, QuerySet, Row,
        SearchExecutor, SphinxRouter, Value, Q,
    };

    #[cfg(feature = "searchd")]
    pub use sphinxql_backends::{SearchdBackend, SearchdConfig};
}
