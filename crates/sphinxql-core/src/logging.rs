//! Logging integration for sphinxql-rs.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-query spans.
//! The backends log every statement sent to searchd at `debug` level under
//! the `sphinxql` target.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "sphinxql_backends=debug"). In debug mode a pretty, human-readable format
/// is used; otherwise a structured JSON format is used. A subscriber that is
/// already installed is left in place.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one query against a search index.
///
/// # Examples
///
/// ```
/// use sphinxql_core::logging::query_span;
///
/// let span = query_span("testapp_testmodel");
/// let _guard = span.enter();
/// tracing::debug!("rendering query");
/// ```
pub fn query_span(index: &str) -> tracing::Span {
    tracing::debug_span!("sphinxql_query", index = index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        let mut settings = Settings::default();
        settings.log_level = "not a valid filter ===".to_string();
        setup_logging(&settings);
        settings.debug = false;
        setup_logging(&settings);
    }

    #[test]
    fn test_query_span_enter() {
        let span = query_span("idx");
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
