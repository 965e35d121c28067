//! Query lookups and Q objects for building complex filters.
//!
//! This module provides the [`Lookup`] enum for field-level comparisons and
//! the [`Q`] enum for combining filters with AND, OR, and NOT operators.
//! String-keyed lookups such as `"attr_uint__gte"` are resolved to a
//! [`Lookup`] variant once, when the `Q` is built.
//!
//! # Examples
//!
//! ```
//! use sphinxql_db::query::lookups::{Q, Lookup};
//! use sphinxql_db::value::Value;
//!
//! // attr_uint >= 0
//! let q = Q::lookup("attr_uint__gte", 0).unwrap();
//! assert_eq!(q, Q::filter("attr_uint", Lookup::Gte(Value::Int(0))));
//!
//! // attr_uint = 1 OR attr_bool = 0
//! let either = Q::filter("attr_uint", Lookup::Exact(Value::from(1)))
//!     | Q::filter("attr_bool", Lookup::Exact(Value::from(false)));
//!
//! // NOT (attr_multi IN (1, 2))
//! let negated = !Q::lookup("attr_multi__in", vec![1_i64, 2]).unwrap();
//! ```

use std::ops;

use sphinxql_core::{SphinxError, SphinxResult};

use crate::value::Value;

/// A field-level lookup operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Exact match (`col = value`). On full-text fields, an anchored phrase.
    Exact(Value),
    /// Membership test (`col IN (values...)`). On multi-valued attributes any
    /// element may match.
    In(Vec<Value>),
    /// Greater than (`col > value`).
    Gt(Value),
    /// Greater than or equal (`col >= value`).
    Gte(Value),
    /// Less than (`col < value`).
    Lt(Value),
    /// Less than or equal (`col <= value`).
    Lte(Value),
    /// Inclusive range (`col BETWEEN low AND high`).
    Range(Value, Value),
    /// Full-text search in one field, rendered inside `MATCH()`.
    Search(String),
}

impl Lookup {
    /// Returns the lookup suffix used in string-keyed filters.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exact(_) => "exact",
            Self::In(_) => "in",
            Self::Gt(_) => "gt",
            Self::Gte(_) => "gte",
            Self::Lt(_) => "lt",
            Self::Lte(_) => "lte",
            Self::Range(..) => "range",
            Self::Search(_) => "search",
        }
    }

    /// Builds a lookup from its suffix and operand.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::UnsupportedLookup`] for unknown suffixes and
    /// [`SphinxError::InvalidValue`] when the operand has the wrong shape
    /// (e.g. a `range` that is not a two-element list).
    pub fn parse(name: &str, value: Value) -> SphinxResult<Self> {
        match name {
            "exact" => Ok(Self::Exact(value)),
            "in" => match value {
                Value::List(items) => Ok(Self::In(items)),
                single => Ok(Self::In(vec![single])),
            },
            "gt" => Ok(Self::Gt(value)),
            "gte" => Ok(Self::Gte(value)),
            "lt" => Ok(Self::Lt(value)),
            "lte" => Ok(Self::Lte(value)),
            "range" => match value {
                Value::List(items) if items.len() == 2 => {
                    let mut items = items.into_iter();
                    match (items.next(), items.next()) {
                        (Some(low), Some(high)) => Ok(Self::Range(low, high)),
                        _ => Err(SphinxError::InvalidValue(
                            "range lookup needs exactly two bounds".to_string(),
                        )),
                    }
                }
                other => Err(SphinxError::InvalidValue(format!(
                    "range lookup needs exactly two bounds, got {other:?}"
                ))),
            },
            "search" => match value {
                Value::String(text) => Ok(Self::Search(text)),
                other => Err(SphinxError::InvalidValue(format!(
                    "search lookup needs text, got {other:?}"
                ))),
            },
            other => Err(SphinxError::UnsupportedLookup(format!(
                "unknown lookup '{other}'"
            ))),
        }
    }
}

/// A composable query filter.
///
/// `Q` objects can be combined using `&` (AND), `|` (OR), and `!` (NOT)
/// operators to build arbitrarily complex WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    /// A single field lookup.
    Filter {
        /// The field name (or `pk`).
        field: String,
        /// The lookup operation.
        lookup: Lookup,
    },
    /// Logical AND of multiple conditions.
    And(Vec<Q>),
    /// Logical OR of multiple conditions.
    Or(Vec<Q>),
    /// Logical negation of a condition.
    Not(Box<Q>),
}

impl Q {
    /// Creates a new filter Q object.
    pub fn filter(field: impl Into<String>, lookup: Lookup) -> Self {
        Self::Filter {
            field: field.into(),
            lookup,
        }
    }

    /// Creates a filter from a `field__lookup` key, e.g. `"attr_uint__gte"`.
    ///
    /// A key without a suffix is an exact match.
    pub fn lookup(key: &str, value: impl Into<Value>) -> SphinxResult<Self> {
        let (field, name) = match key.rsplit_once("__") {
            Some((field, name)) => (field, name),
            None => (key, "exact"),
        };
        if field.is_empty() {
            return Err(SphinxError::FieldError(format!("empty field name in '{key}'")));
        }
        Ok(Self::filter(field, Lookup::parse(name, value.into())?))
    }

    /// Combines several `field__lookup` pairs with AND, like keyword
    /// arguments to `filter()`.
    pub fn lookups<V: Into<Value>>(
        pairs: impl IntoIterator<Item = (&'static str, V)>,
    ) -> SphinxResult<Self> {
        let children = pairs
            .into_iter()
            .map(|(key, value)| Self::lookup(key, value))
            .collect::<SphinxResult<Vec<_>>>()?;
        Ok(match children.len() {
            1 => children.into_iter().next().unwrap_or_else(|| Self::And(Vec::new())),
            _ => Self::And(children),
        })
    }

    /// Returns `true` if this is an empty AND/OR.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => children.is_empty(),
            _ => false,
        }
    }
}

impl ops::BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            // Flatten nested ANDs
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }
}

impl ops::BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            // Flatten nested ORs
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (other, Self::Or(mut right)) => {
                right.insert(0, other);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }
}

impl ops::Not for Q {
    type Output = Self;

    fn not(self) -> Self::Output {
        // Double negation cancellation
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_without_suffix_is_exact() {
        let q = Q::lookup("attr_uint", 100_500).unwrap();
        assert_eq!(q, Q::filter("attr_uint", Lookup::Exact(Value::Int(100_500))));
    }

    #[test]
    fn test_lookup_suffixes() {
        assert_eq!(
            Q::lookup("attr_uint__exact", 1).unwrap(),
            Q::filter("attr_uint", Lookup::Exact(Value::Int(1)))
        );
        assert_eq!(
            Q::lookup("attr_uint__gte", 0).unwrap(),
            Q::filter("attr_uint", Lookup::Gte(Value::Int(0)))
        );
        assert_eq!(
            Q::lookup("attr_uint__lt", 3).unwrap(),
            Q::filter("attr_uint", Lookup::Lt(Value::Int(3)))
        );
        assert_eq!(
            Q::lookup("sphinx_field__search", "hello").unwrap(),
            Q::filter("sphinx_field", Lookup::Search("hello".into()))
        );
    }

    #[test]
    fn test_lookup_in_wraps_scalar() {
        assert_eq!(
            Q::lookup("attr_multi__in", vec![1_i64, 100]).unwrap(),
            Q::filter("attr_multi", Lookup::In(vec![Value::Int(1), Value::Int(100)]))
        );
        assert_eq!(
            Q::lookup("attr_multi__in", 5).unwrap(),
            Q::filter("attr_multi", Lookup::In(vec![Value::Int(5)]))
        );
    }

    #[test]
    fn test_lookup_range() {
        assert_eq!(
            Q::lookup("attr_uint__range", vec![1_i64, 10]).unwrap(),
            Q::filter("attr_uint", Lookup::Range(Value::Int(1), Value::Int(10)))
        );
        assert!(matches!(
            Q::lookup("attr_uint__range", vec![1_i64]),
            Err(SphinxError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_unknown_lookup_is_rejected() {
        let err = Q::lookup("attr_string__contains", "x").unwrap_err();
        assert!(matches!(err, SphinxError::UnsupportedLookup(_)));
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_search_needs_text() {
        assert!(matches!(
            Q::lookup("sphinx_field__search", 1),
            Err(SphinxError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_lookups_combines_with_and() {
        let q = Q::lookups([("attr_uint", Value::Int(1)), ("attr_bool", Value::Bool(true))])
            .unwrap();
        match q {
            Q::And(children) => assert_eq!(children.len(), 2),
            other => panic!("Expected And, got {other:?}"),
        }
        let single = Q::lookups([("attr_uint", 1)]).unwrap();
        assert!(matches!(single, Q::Filter { .. }));
    }

    #[test]
    fn test_and_operator_flattens() {
        let q1 = Q::filter("a", Lookup::Exact(Value::from(1)));
        let q2 = Q::filter("b", Lookup::Exact(Value::from(2)));
        let q3 = Q::filter("c", Lookup::Exact(Value::from(3)));
        match (q1 & q2) & q3 {
            Q::And(children) => assert_eq!(children.len(), 3),
            other => panic!("Expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_or_operator_flattens() {
        let q1 = Q::filter("a", Lookup::Exact(Value::from(1)));
        let q2 = Q::filter("b", Lookup::Exact(Value::from(2)));
        let q3 = Q::filter("c", Lookup::Exact(Value::from(3)));
        match q1 | (q2 | q3) {
            Q::Or(children) => assert_eq!(children.len(), 3),
            other => panic!("Expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_double_negation() {
        let q = Q::filter("a", Lookup::Exact(Value::from(1)));
        assert_eq!(!!q.clone(), q);
    }

    #[test]
    fn test_is_empty() {
        assert!(Q::And(vec![]).is_empty());
        assert!(!Q::filter("a", Lookup::Exact(Value::Null)).is_empty());
    }

    #[test]
    fn test_lookup_names() {
        assert_eq!(Lookup::Gte(Value::Null).name(), "gte");
        assert_eq!(Lookup::Range(Value::Null, Value::Null).name(), "range");
        assert_eq!(Lookup::Search(String::new()).name(), "search");
    }
}
