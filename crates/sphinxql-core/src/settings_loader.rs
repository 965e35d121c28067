//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `SPHINXQL_DEBUG` | `debug` |
//! | `SPHINXQL_LOG_LEVEL` | `log_level` |
//! | `SPHINXQL_SEARCH_DATABASE` | `search_database` |
//! | `SPHINXQL_MAX_MATCHES` | `max_matches` |
//! | `SPHINXQL_SEARCH_HOST` | `databases[search_database].host` |
//! | `SPHINXQL_SEARCH_PORT` | `databases[search_database].port` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use sphinxql_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/search.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::SphinxError;
use crate::settings::{DatabaseSettings, Settings};

/// Loads settings from a TOML string.
///
/// Keys missing from the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, SphinxError> {
    // Merge through serde_json so partial files keep the defaults.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| SphinxError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, SphinxError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, SphinxError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, SphinxError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| SphinxError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, SphinxError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `SPHINXQL_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Applies overrides using an arbitrary key lookup.
///
/// [`apply_env_overrides`] calls this with the process environment. Values
/// that fail to parse are ignored.
pub fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("SPHINXQL_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("SPHINXQL_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("SPHINXQL_SEARCH_DATABASE") {
        settings.search_database = val;
    }

    if let Some(val) = lookup("SPHINXQL_MAX_MATCHES") {
        if let Ok(max_matches) = val.parse::<usize>() {
            settings.max_matches = max_matches;
        }
    }

    let host = lookup("SPHINXQL_SEARCH_HOST");
    let port = lookup("SPHINXQL_SEARCH_PORT").and_then(|p| p.parse::<u16>().ok());
    if host.is_some() || port.is_some() {
        let entry = settings
            .databases
            .entry(settings.search_database.clone())
            .or_insert_with(DatabaseSettings::default);
        if let Some(host) = host {
            entry.host = host;
        }
        if let Some(port) = port {
            entry.port = port;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_config(path: &Path, format: &str) -> Result<String, SphinxError> {
    std::fs::read_to_string(path).map_err(|e| {
        SphinxError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> Result<Settings, SphinxError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        SphinxError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        SphinxError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
///
/// Database entries are objects too, so a partial `[databases.sphinx]` table
/// keeps the default host and port.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            log_level = "sphinxql_db=debug"
            max_matches = 5000
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "sphinxql_db=debug");
        assert_eq!(settings.max_matches, 5000);
        // Defaults preserved
        assert_eq!(settings.search_database, "sphinx");
    }

    #[test]
    fn test_from_toml_str_partial_database_keeps_defaults() {
        let toml = r#"
            [databases.sphinx]
            host = "search.internal"
        "#;

        let settings = from_toml_str(toml).unwrap();
        let db = settings.databases.get("sphinx").unwrap();
        assert_eq!(db.host, "search.internal");
        assert_eq!(db.port, 9306);
        assert_eq!(db.engine, "sphinxql.backends.searchd");
    }

    #[test]
    fn test_from_toml_str_second_alias() {
        let toml = r#"
            search_database = "manticore"

            [databases.manticore]
            engine = "sphinxql.backends.searchd"
            name = ""
            user = ""
            password = ""
            host = "10.0.0.5"
            port = 9312
            options = {}
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.search_database, "manticore");
        let db = settings.search_database_settings().unwrap();
        assert_eq!(db.port, 9312);
        assert!(settings.databases.contains_key("sphinx"));
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert_eq!(settings.max_matches, 1000);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(matches!(result, Err(SphinxError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("max_matches = \"lots\"");
        assert!(result.is_err());
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{
            "debug": false,
            "log_level": "debug"
        }"#;

        let settings = from_json_str(json).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.search_database, "sphinx");
    }

    #[test]
    fn test_from_json_str_empty_object() {
        let settings = from_json_str("{}").unwrap();
        assert!(settings.debug);
    }

    #[test]
    fn test_from_json_str_invalid() {
        let result = from_json_str("{invalid json");
        assert!(result.is_err());
    }

    // ── File loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join("sphinxql_test_toml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("search.toml");
        std::fs::write(&path, "debug = false\nmax_matches = 20").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.max_matches, 20);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn test_from_json_file() {
        let dir = std::env::temp_dir().join("sphinxql_test_json");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("search.json");
        std::fs::write(&path, r#"{"search_database": "rt"}"#).unwrap();

        let settings = from_json_file(&path).unwrap();
        assert_eq!(settings.search_database, "rt");

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/path/search.toml");
        assert!(matches!(result, Err(SphinxError::ConfigurationError(_))));
    }

    // ── Overrides ───────────────────────────────────────────────────

    #[test]
    fn test_overrides_debug_and_level() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[("SPHINXQL_DEBUG", "0"), ("SPHINXQL_LOG_LEVEL", "trace")]),
        );
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "trace");
    }

    #[test]
    fn test_overrides_max_matches() {
        let mut settings = Settings::default();
        apply_overrides(&mut settings, lookup_from(&[("SPHINXQL_MAX_MATCHES", "250")]));
        assert_eq!(settings.max_matches, 250);
    }

    #[test]
    fn test_overrides_ignore_unparsable_values() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[("SPHINXQL_MAX_MATCHES", "many"), ("SPHINXQL_SEARCH_PORT", "x")]),
        );
        assert_eq!(settings.max_matches, 1000);
        assert_eq!(settings.search_database_settings().unwrap().port, 9306);
    }

    #[test]
    fn test_overrides_search_host_and_port() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("SPHINXQL_SEARCH_HOST", "manticore"),
                ("SPHINXQL_SEARCH_PORT", "19306"),
            ]),
        );
        let db = settings.search_database_settings().unwrap();
        assert_eq!(db.host, "manticore");
        assert_eq!(db.port, 19306);
    }

    #[test]
    fn test_overrides_create_missing_alias() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("SPHINXQL_SEARCH_DATABASE", "rt"),
                ("SPHINXQL_SEARCH_HOST", "10.1.1.1"),
            ]),
        );
        assert_eq!(settings.search_database, "rt");
        assert_eq!(settings.databases.get("rt").unwrap().host, "10.1.1.1");
    }

    #[test]
    fn test_no_overrides_is_identity() {
        let mut settings = Settings::default();
        apply_overrides(&mut settings, |_| None);
        assert_eq!(settings.search_database, "sphinx");
        assert!(settings.debug);
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}});
        let over = serde_json::json!({"a": {"c": 3}});
        assert_eq!(merge_json(base, over), serde_json::json!({"a": {"b": 1, "c": 3}}));
    }
}
