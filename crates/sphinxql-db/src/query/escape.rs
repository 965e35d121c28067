//! Escaping of full-text query text and SphinxQL literals.
//!
//! Two layers apply to user text that ends up inside `MATCH('...')`:
//!
//! 1. [`sphinx_escape`] makes every full-text operator character literal for
//!    the daemon's query parser.
//! 2. [`quote_string`] turns the result into a SphinxQL string literal.
//!
//! # Examples
//!
//! ```
//! use sphinxql_db::query::escape::{quote_string, sphinx_escape};
//!
//! assert_eq!(sphinx_escape("a-b"), "a\\-b");
//! assert_eq!(quote_string(&sphinx_escape("a-b")), "'a\\\\-b'");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters the full-text query parser treats as operators.
pub const SPECIAL_CHARS: &[char] = &[
    '=', '<', '>', '(', ')', '|', '!', '@', '~', '&', '/', '^', '$', '-', '\'', '"', '\\',
];

// Proximity operators that are whole uppercase words.
static KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(SENTENCE|PARAGRAPH)\b").unwrap_or_else(|e| panic!("invalid keyword regex: {e}"))
});

/// Escapes full-text operators so `text` is matched literally.
///
/// Every operator character is prefixed with a backslash, and the proximity
/// keywords `SENTENCE` and `PARAGRAPH` are prefixed as whole words. No
/// character of the input is dropped or reordered.
pub fn sphinx_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    KEYWORDS.replace_all(&escaped, r"\$1").into_owned()
}

/// Quotes `text` as a SphinxQL string literal.
pub fn quote_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\0' => quoted.push_str("\\0"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

/// Returns `true` if `text` is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
