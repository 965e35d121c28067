//! # sphinxql-db
//!
//! ORM layer for Sphinx/Manticore search indexes. Provides the
//! [`Model`](model::Model) trait for describing indexed documents,
//! [`QuerySet`](query::QuerySet) for building and executing SphinxQL queries,
//! and [`Manager`](query::Manager) for model-level operations.
//!
//! ## Architecture
//!
//! A [`QuerySet`](query::QuerySet) builds a [`Query`](query::Query) AST through
//! method chaining without touching the daemon. SphinxQL is only generated
//! when a terminal method (`.get_exec()`, `.count_exec()`, `.first_exec()`,
//! etc.) is called, at which point the [`SphinxCompiler`](query::SphinxCompiler)
//! renders the AST. searchd takes no bound parameters, so every value is
//! rendered as an escaped literal by its [`FieldType`](fields::FieldType).
//!
//! ## Module Overview
//!
//! - [`model`] - The [`Model`](model::Model) trait and [`ModelMeta`](model::ModelMeta)
//! - [`fields`] - Field definitions ([`FieldDef`](fields::FieldDef)) and index column types
//! - [`value`] - The [`Value`](value::Value) enum
//! - [`query`] - Query building, lookups, options, and compilation
//! - [`mapper`] - Decoding result rows into typed values
//! - [`executor`] - The [`SearchExecutor`](executor::SearchExecutor) trait and persistence
//! - [`router`] - Routing search models to the search connection
//! - [`schema`] - Real-time index DDL

// These clippy lints are intentionally allowed for the ORM crate:
// - too_many_lines: the compiler's leaf rendering is one large match
// - cast_precision_loss: i64-to-f64 casts are acceptable for float attributes
// - result_large_err: SphinxError is the crate error type and is used consistently
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
// significant_drop_tightening: false positives with Mutex guards in test doubles
#![allow(clippy::significant_drop_tightening)]

pub mod executor;
pub mod fields;
pub mod mapper;
pub mod model;
pub mod query;
pub mod router;
pub mod schema;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use executor::{create_model, delete_model, refresh_model, save_model, SearchExecutor};
pub use fields::{FieldDef, FieldType};
pub use mapper::{QueryResult, ResultMapper};
pub use model::{Model, ModelMeta};
pub use query::{
    AggregateFunc, GroupBy, Lookup, Manager, OptionValue, OrderBy, Query, QueryOptions, QuerySet,
    Row, SelectColumn, SphinxCompiler, WhereNode, Q,
};
pub use router::{DatabaseRouter, RouterChain, SphinxRouter};
pub use schema::{create_index, drop_index, truncate_index};
pub use value::Value;
