//! Settings for sphinxql-rs.
//!
//! This module provides the [`Settings`] struct, which holds the database
//! aliases and search daemon defaults, and [`LazySettings`], a
//! globally-accessible, lazily-initialized settings instance.
//!
//! A deployment normally has two aliases: the primary relational database
//! (`"default"`) and the search daemon (`"sphinx"`). The router sends search
//! models to [`Settings::search_database`].

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// The default SphinxQL listener port of searchd.
pub const DEFAULT_SPHINXQL_PORT: u16 = 9306;

/// The daemon's default `max_matches` window.
pub const DEFAULT_MAX_MATCHES: usize = 1000;

/// The alias of the search connection unless configured otherwise.
pub const DEFAULT_SEARCH_DATABASE: &str = "sphinx";

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine (e.g. `sphinxql.backends.searchd`).
    pub engine: String,
    /// The database name. searchd ignores it, but the MySQL handshake sends it.
    pub name: String,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "sphinxql.backends.searchd".to_string(),
            name: String::new(),
            user: String::new(),
            password: String::new(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SPHINXQL_PORT,
            options: HashMap::new(),
        }
    }
}

impl DatabaseSettings {
    /// Builds a `mysql://` connection URL for this entry.
    pub fn url(&self) -> String {
        let auth = if self.user.is_empty() {
            String::new()
        } else if self.password.is_empty() {
            format!("{}@", self.user)
        } else {
            format!("{}:{}@", self.user, self.password)
        };
        format!("mysql://{auth}{}:{}/{}", self.host, self.port, self.name)
    }
}

/// The complete set of settings.
///
/// # Examples
///
/// ```
/// use sphinxql_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.search_database, "sphinx");
/// assert_eq!(settings.max_matches, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Databases ────────────────────────────────────────────────────

    /// Database configurations, keyed by alias.
    pub databases: HashMap<String, DatabaseSettings>,
    /// The alias of the search daemon connection.
    pub search_database: String,

    // ── Query defaults ───────────────────────────────────────────────

    /// The `max_matches` window assumed when a query does not set one.
    pub max_matches: usize,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log filter (e.g. "info", "sphinxql_db=debug").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert(
            DEFAULT_SEARCH_DATABASE.to_string(),
            DatabaseSettings::default(),
        );

        Self {
            debug: true,
            databases,
            search_database: DEFAULT_SEARCH_DATABASE.to_string(),
            max_matches: DEFAULT_MAX_MATCHES,
            log_level: "info".to_string(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the connection settings of the search daemon alias.
    pub fn search_database_settings(&self) -> Option<&DatabaseSettings> {
        self.databases.get(&self.search_database)
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup to set the
/// settings, then use [`get`](LazySettings::get) to access them.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, if any.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();
