//! # sphinxql-core
//!
//! Core types, settings, and error types for sphinxql-rs.
//! This crate has no dependency on the ORM or the backends and provides the
//! foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Database aliases, search daemon defaults, global configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{SphinxError, SphinxResult};
pub use settings::{DatabaseSettings, Settings, SETTINGS};
