//! Connection configuration for the search daemon.
//!
//! [`SearchdConfig`] holds the connection parameters for one searchd
//! instance. It is normally derived from the
//! [`DatabaseSettings`](sphinxql_core::DatabaseSettings) entry named by
//! `Settings::search_database`.

use std::collections::HashMap;

use sphinxql_core::settings::{Settings, DEFAULT_SPHINXQL_PORT, SETTINGS};
use sphinxql_core::{DatabaseSettings, SphinxError, SphinxResult};

/// The engine name that selects the searchd backend.
pub const SEARCHD_ENGINE: &str = "sphinxql.backends.searchd";

/// Configuration for connecting to searchd's SphinxQL listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchdConfig {
    /// The daemon host.
    pub host: String,
    /// The SphinxQL port, 9306 by default.
    pub port: u16,
    /// The user. searchd ignores credentials unless a proxy checks them.
    pub user: Option<String>,
    /// The password.
    pub password: Option<String>,
    /// The database name sent in the handshake.
    pub name: Option<String>,
    /// Additional options (`pool_min`, `pool_max`).
    pub options: HashMap<String, String>,
}

impl Default for SearchdConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SPHINXQL_PORT,
            user: None,
            password: None,
            name: None,
            options: HashMap::new(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl SearchdConfig {
    /// Creates a configuration for `host:port` with no credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Builds a configuration from a settings entry.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::ConfigurationError`] if the entry names another
    /// engine.
    pub fn from_settings(db: &DatabaseSettings) -> SphinxResult<Self> {
        if db.engine != SEARCHD_ENGINE {
            return Err(SphinxError::ConfigurationError(format!(
                "engine '{}' is not {SEARCHD_ENGINE}",
                db.engine
            )));
        }
        Ok(Self {
            host: if db.host.is_empty() {
                "127.0.0.1".to_string()
            } else {
                db.host.clone()
            },
            port: if db.port == 0 {
                DEFAULT_SPHINXQL_PORT
            } else {
                db.port
            },
            user: non_empty(&db.user),
            password: non_empty(&db.password),
            name: non_empty(&db.name),
            options: db.options.clone(),
        })
    }

    /// Builds the configuration of a database alias.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::ConfigurationError`] if the alias is missing or
    /// is not a searchd entry.
    pub fn for_alias(settings: &Settings, alias: &str) -> SphinxResult<Self> {
        let db = settings.databases.get(alias).ok_or_else(|| {
            SphinxError::ConfigurationError(format!("database alias '{alias}' is not configured"))
        })?;
        Self::from_settings(db)
    }

    /// Builds the configuration of the search alias from the global settings,
    /// falling back to the defaults when nothing is configured.
    ///
    /// # Errors
    ///
    /// As [`for_alias`](Self::for_alias).
    pub fn from_global_settings() -> SphinxResult<Self> {
        match SETTINGS.try_get() {
            Some(settings) => Self::for_alias(settings, &settings.search_database),
            None => Ok(Self::default()),
        }
    }

    /// Returns a `mysql://` URL for this configuration, without the password.
    pub fn display_url(&self) -> String {
        let user = self
            .user
            .as_deref()
            .map_or_else(String::new, |u| format!("{u}@"));
        format!(
            "mysql://{user}{}:{}/{}",
            self.host,
            self.port,
            self.name.as_deref().unwrap_or_default()
        )
    }

    /// Reads a numeric option.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::ConfigurationError`] if the option is not a number.
    pub fn option_usize(&self, key: &str) -> SphinxResult<Option<usize>> {
        self.options
            .get(key)
            .map(|raw| {
                raw.parse().map_err(|_| {
                    SphinxError::ConfigurationError(format!(
                        "option '{key}' must be a number, got '{raw}'"
                    ))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SearchdConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 9306);
        assert!(cfg.user.is_none());
        assert_eq!(cfg.display_url(), "mysql://127.0.0.1:9306/");
    }

    #[test]
    fn test_from_settings() {
        let db = DatabaseSettings {
            host: "search.local".to_string(),
            port: 9312,
            user: "reader".to_string(),
            password: "secret".to_string(),
            ..DatabaseSettings::default()
        };
        let cfg = SearchdConfig::from_settings(&db).unwrap();
        assert_eq!(cfg.host, "search.local");
        assert_eq!(cfg.port, 9312);
        assert_eq!(cfg.user.as_deref(), Some("reader"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));
        assert!(cfg.name.is_none());
        assert_eq!(cfg.display_url(), "mysql://reader@search.local:9312/");
    }

    #[test]
    fn test_from_settings_wrong_engine() {
        let db = DatabaseSettings {
            engine: "django.db.backends.postgresql".to_string(),
            ..DatabaseSettings::default()
        };
        assert!(matches!(
            SearchdConfig::from_settings(&db),
            Err(SphinxError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_from_settings_zero_port() {
        let db = DatabaseSettings {
            port: 0,
            host: String::new(),
            ..DatabaseSettings::default()
        };
        let cfg = SearchdConfig::from_settings(&db).unwrap();
        assert_eq!(cfg.port, DEFAULT_SPHINXQL_PORT);
        assert_eq!(cfg.host, "127.0.0.1");
    }

    #[test]
    fn test_for_alias() {
        let settings = Settings::default();
        let cfg = SearchdConfig::for_alias(&settings, "sphinx").unwrap();
        assert_eq!(cfg, SearchdConfig::default());
        assert!(SearchdConfig::for_alias(&settings, "missing").is_err());
    }

    #[test]
    fn test_option_usize() {
        let mut cfg = SearchdConfig::new("localhost", 9306);
        cfg.options.insert("pool_max".to_string(), "8".to_string());
        cfg.options.insert("pool_min".to_string(), "x".to_string());
        assert_eq!(cfg.option_usize("pool_max").unwrap(), Some(8));
        assert_eq!(cfg.option_usize("absent").unwrap(), None);
        assert!(cfg.option_usize("pool_min").is_err());
    }
}
