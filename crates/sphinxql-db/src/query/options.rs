//! The trailing `OPTION` clause of a SphinxQL SELECT.
//!
//! [`QueryOptions`] keeps options in insertion order; setting a key twice
//! keeps its first position and the last value. [`OptionValue`] decides how
//! each value is written:
//!
//! ```
//! use sphinxql_db::query::options::{OptionValue, QueryOptions};
//!
//! let mut options = QueryOptions::new();
//! options.set("ranker", "expr('sum(lcs*user_weight)*1000+bm25')");
//! options.set("field_weights", OptionValue::weights([("title", 3), ("body", 2)]));
//! options.set("max_matches", 500);
//! options.set("sort_method", "kbuffer");
//! assert_eq!(
//!     options.to_sql().unwrap().unwrap(),
//!     "OPTION ranker=expr('sum(lcs*user_weight)*1000+bm25'), \
//!      field_weights=(title=3, body=2), max_matches=500, sort_method=kbuffer"
//! );
//! ```

use sphinxql_core::{SphinxError, SphinxResult};

use super::escape::{is_identifier, quote_string};

/// The value of one option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// An integer, e.g. `max_matches=1000`.
    Int(i64),
    /// A float, e.g. `cutoff`-style tuning values.
    Float(f64),
    /// A bare keyword, e.g. `ranker=bm25` or `sort_method=kbuffer`.
    Ident(String),
    /// A string rendered as a quoted literal, e.g. `comment='nightly'`.
    Quoted(String),
    /// A named integer map, e.g. `field_weights=(title=3, body=2)`.
    Weights(Vec<(String, i64)>),
    /// An expression ranker body, rendered as `expr('<body>')`.
    Expr(String),
    /// Text written verbatim.
    Raw(String),
}

impl OptionValue {
    /// Builds a weight map from `(name, weight)` pairs.
    pub fn weights<K: Into<String>>(pairs: impl IntoIterator<Item = (K, i64)>) -> Self {
        Self::Weights(pairs.into_iter().map(|(k, w)| (k.into(), w)).collect())
    }

    /// Builds an expression ranker.
    pub fn expr(body: impl Into<String>) -> Self {
        Self::Expr(body.into())
    }

    /// Renders the value as it appears after `key=`.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::InvalidValue`] for non-finite floats, weight
    /// names that are not identifiers and bare keywords that are not
    /// identifiers.
    pub fn to_sql(&self) -> SphinxResult<String> {
        match self {
            Self::Int(i) => Ok(i.to_string()),
            Self::Float(f) if f.is_finite() => Ok(f.to_string()),
            Self::Float(f) => Err(SphinxError::InvalidValue(format!(
                "{f} is not a valid option value"
            ))),
            Self::Ident(name) if is_identifier(name) => Ok(name.clone()),
            Self::Ident(name) => Err(SphinxError::InvalidValue(format!(
                "'{name}' is not a valid option keyword"
            ))),
            Self::Quoted(text) => Ok(quote_string(text)),
            Self::Weights(pairs) => {
                let parts = pairs
                    .iter()
                    .map(|(name, weight)| {
                        if is_identifier(name) {
                            Ok(format!("{name}={weight}"))
                        } else {
                            Err(SphinxError::InvalidValue(format!(
                                "'{name}' is not a valid weight name"
                            )))
                        }
                    })
                    .collect::<SphinxResult<Vec<_>>>()?;
                Ok(format!("({})", parts.join(", ")))
            }
            Self::Expr(body) => Ok(format!("expr({})", quote_string(body))),
            Self::Raw(text) => Ok(text.clone()),
        }
    }

    /// Returns the integer value, if this is one.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Int(i64::from(v))
    }
}

/// Strings are classified by shape: identifiers become keywords,
/// parenthesized lists and `expr(...)` are already SphinxQL and pass through,
/// anything else is quoted.
impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        let trimmed = v.trim();
        if is_identifier(trimmed) {
            Self::Ident(trimmed.to_string())
        } else if (trimmed.starts_with('(') && trimmed.ends_with(')'))
            || trimmed.to_ascii_lowercase().starts_with("expr(")
        {
            Self::Raw(trimmed.to_string())
        } else {
            Self::Quoted(v.to_string())
        }
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::from(v.as_str())
    }
}

/// Ordered `OPTION` key/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    entries: Vec<(String, OptionValue)>,
}

impl QueryOptions {
    /// Creates an empty option set.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets `key` to `value`, replacing an earlier value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the `max_matches` option when it is a positive integer.
    pub fn max_matches(&self) -> Option<usize> {
        self.get("max_matches")
            .and_then(OptionValue::as_int)
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Renders `OPTION k=v, ...`, or `None` when no option is set.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::InvalidValue`] when a key is not an identifier
    /// or a value cannot be rendered.
    pub fn to_sql(&self) -> SphinxResult<Option<String>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let parts = self
            .entries
            .iter()
            .map(|(key, value)| {
                if !is_identifier(key) {
                    return Err(SphinxError::InvalidValue(format!(
                        "'{key}' is not a valid option name"
                    )));
                }
                Ok(format!("{key}={}", value.to_sql()?))
            })
            .collect::<SphinxResult<Vec<_>>>()?;
        Ok(Some(format!("OPTION {}", parts.join(", "))))
    }
}
