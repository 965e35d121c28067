//! Query building, compilation, and execution.
//!
//! This module contains the complete query pipeline:
//!
//! - [`lookups`] - Q objects and lookup types for filtering
//! - [`options`] - `OPTION` clause values
//! - [`escape`] - full-text escaping and string literal quoting
//! - [`compiler`] - Query AST and SphinxQL compilation
//! - [`queryset`] - QuerySet and Manager for lazy query building

pub mod compiler;
pub mod escape;
pub mod lookups;
pub mod options;
pub mod queryset;

pub use compiler::{
    AggregateFunc, FromValue, GroupBy, OrderBy, Query, Row, SelectColumn, SphinxCompiler,
    WhereNode,
};
pub use escape::{quote_string, sphinx_escape};
pub use lookups::{Lookup, Q};
pub use options::{OptionValue, QueryOptions};
pub use queryset::{Manager, QuerySet};
