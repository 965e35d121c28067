//! Core error types for sphinxql-rs.
//!
//! [`SphinxError`] separates three kinds of failure:
//!
//! - usage errors (unsupported lookups, unknown fields, values that do not fit
//!   a field type), detected while a query is rendered and before anything is
//!   sent to the search daemon;
//! - daemon errors, which carry the daemon's message verbatim and are never
//!   retried or translated;
//! - cardinality errors raised by `get()`.
//!
//! An empty result is never an error.

use thiserror::Error;

/// The primary error type for sphinxql-rs.
#[derive(Error, Debug)]
pub enum SphinxError {
    // ── Usage errors ─────────────────────────────────────────────────

    /// A lookup is not supported for the field it was applied to, or the
    /// lookup name itself is unknown.
    #[error("Unsupported lookup: {0}")]
    UnsupportedLookup(String),

    /// A field name does not exist on the model.
    #[error("Field error: {0}")]
    FieldError(String),

    /// A value cannot be represented in the target field type.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    // ── ORM errors ───────────────────────────────────────────────────

    /// Raised when a query expected exactly one result but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// Raised when a query expected exactly one result but found multiple.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// The filter of a query folded to a constant FALSE; no statement needs
    /// to be sent. Execution methods turn this into an empty result.
    #[error("Query can never match any row")]
    EmptyResultSet,

    // ── Daemon / transport ───────────────────────────────────────────

    /// An error reported by the search daemon (syntax errors, unsupported
    /// statements). The message is passed through unchanged.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A connection or transport failure.
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SphinxError {
    /// Returns `true` for errors detected before any network call.
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLookup(_) | Self::FieldError(_) | Self::InvalidValue(_)
        )
    }

    /// Returns `true` for errors reported by the search daemon itself.
    pub const fn is_daemon_error(&self) -> bool {
        matches!(self, Self::DatabaseError(_))
    }
}

impl From<serde_json::Error> for SphinxError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// A convenience type alias for `Result<T, SphinxError>`.
pub type SphinxResult<T> = Result<T, SphinxError>;
