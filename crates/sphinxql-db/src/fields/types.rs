//! Field type definitions for search index models.
//!
//! Each [`FieldType`] variant corresponds to one column type of a real-time
//! index. The type decides which lookups a column accepts, how a [`Value`] is
//! written into a statement, whether the column can be changed with a
//! fast in-place `UPDATE`, and how the daemon's textual output is decoded.

use sphinxql_core::{SphinxError, SphinxResult};

use crate::query::escape::quote_string;
use crate::query::lookups::Lookup;
use crate::value::Value;

/// The type of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// The document id (`id` column, unsigned 64-bit).
    DocId,
    /// A full-text field. Only reachable through `MATCH()`.
    Field,
    /// Unsigned 32-bit integer attribute (`int` / `uint`).
    Uint,
    /// Signed 64-bit integer attribute.
    BigInt,
    /// Boolean attribute stored as `0`/`1`.
    Bool,
    /// Single precision float attribute.
    Float,
    /// Timestamp attribute stored as epoch seconds.
    Timestamp,
    /// String attribute.
    String,
    /// JSON attribute.
    Json,
    /// Multi-valued attribute of unsigned 32-bit integers.
    Multi,
    /// Multi-valued attribute of signed 64-bit integers.
    Multi64,
}

impl FieldType {
    /// Returns `true` for multi-valued attributes.
    pub const fn is_multi(self) -> bool {
        matches!(self, Self::Multi | Self::Multi64)
    }

    /// Returns `true` for full-text fields.
    pub const fn is_full_text(self) -> bool {
        matches!(self, Self::Field)
    }

    /// Returns `true` if the column can be changed with an in-place `UPDATE`.
    ///
    /// Strings, JSON and full-text fields are only replaced with the whole
    /// document.
    pub const fn is_updatable(self) -> bool {
        matches!(
            self,
            Self::Uint
                | Self::BigInt
                | Self::Bool
                | Self::Float
                | Self::Timestamp
                | Self::Multi
                | Self::Multi64
        )
    }

    /// Returns `true` if filtering this column with `lookup` is allowed.
    pub const fn supports(self, lookup: &Lookup) -> bool {
        match self {
            Self::DocId | Self::Uint | Self::BigInt | Self::Timestamp | Self::Multi
            | Self::Multi64 => !matches!(lookup, Lookup::Search(_)),
            Self::Float => !matches!(lookup, Lookup::Search(_) | Lookup::In(_)),
            Self::Bool | Self::String => matches!(lookup, Lookup::Exact(_) | Lookup::In(_)),
            Self::Field => matches!(
                lookup,
                Lookup::Exact(_) | Lookup::In(_) | Lookup::Search(_)
            ),
            Self::Json => false,
        }
    }

    /// Returns the column type used in `CREATE TABLE`. `None` for the
    /// implicit document id.
    pub const fn column_type(self) -> Option<&'static str> {
        match self {
            Self::DocId => None,
            Self::Field => Some("text"),
            Self::Uint => Some("int"),
            Self::BigInt => Some("bigint"),
            Self::Bool => Some("bool"),
            Self::Float => Some("float"),
            Self::Timestamp => Some("timestamp"),
            Self::String => Some("string"),
            Self::Json => Some("json"),
            Self::Multi => Some("multi"),
            Self::Multi64 => Some("multi64"),
        }
    }

    /// Renders a single filter operand as a SphinxQL literal.
    ///
    /// For multi-valued attributes this is one element, not the whole list.
    pub fn to_literal(self, value: &Value) -> SphinxResult<String> {
        match self {
            Self::DocId | Self::BigInt | Self::Multi64 => Ok(int_of(self, value)?.to_string()),
            Self::Uint | Self::Multi => Ok(uint_of(self, value)?.to_string()),
            Self::Bool => match value {
                Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
                Value::Int(i @ (0 | 1)) => Ok(i.to_string()),
                other => Err(invalid(self, other)),
            },
            Self::Float => match value {
                Value::Float(f) if f.is_finite() => Ok(format_float(*f)),
                #[allow(clippy::cast_precision_loss)]
                Value::Int(i) => Ok(format_float(*i as f64)),
                other => Err(invalid(self, other)),
            },
            Self::Timestamp => match value {
                Value::DateTime(dt) => Ok(dt.and_utc().timestamp().to_string()),
                Value::Int(i) => Ok(i.to_string()),
                other => Err(invalid(self, other)),
            },
            Self::String | Self::Field => text_of(self, value).map(|s| quote_string(&s)),
            Self::Json => match value {
                Value::Json(j) => Ok(quote_string(&j.to_string())),
                Value::String(s) => Ok(quote_string(s)),
                other => Err(invalid(self, other)),
            },
        }
    }

    /// Renders a value as stored by `INSERT`, `REPLACE` and `UPDATE`.
    ///
    /// Multi-valued attributes render as `(1,2,3)`; `Null` renders as the
    /// column's empty value since the daemon has no NULLs.
    pub fn to_storage_literal(self, value: &Value) -> SphinxResult<String> {
        match (self, value) {
            (Self::Multi | Self::Multi64, Value::List(items)) => {
                let parts = items
                    .iter()
                    .map(|item| self.to_literal(item))
                    .collect::<SphinxResult<Vec<_>>>()?;
                Ok(format!("({})", parts.join(",")))
            }
            (Self::Multi | Self::Multi64, Value::Null) => Ok("()".to_string()),
            (Self::Multi | Self::Multi64, scalar) => Ok(format!("({})", self.to_literal(scalar)?)),
            (Self::Json, Value::Null) => Ok("'{}'".to_string()),
            (Self::String | Self::Field, Value::Null) => Ok("''".to_string()),
            (Self::Float, Value::Null) => Ok("0.0".to_string()),
            (_, Value::Null) => Ok("0".to_string()),
            (_, scalar) => self.to_literal(scalar),
        }
    }

    /// Decodes a raw value returned by the daemon into the column's type.
    ///
    /// The text protocol delivers most values as strings; typed values are
    /// accepted as well so already decoded rows pass through unchanged.
    pub fn decode(self, raw: &Value) -> SphinxResult<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::DocId | Self::Uint | Self::BigInt => match raw {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::String(s) => parse_int(self, s).map(Value::Int),
                other => Err(invalid(self, other)),
            },
            Self::Bool => match raw {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::Int(i) => Ok(Value::Bool(*i != 0)),
                Value::String(s) => parse_int(self, s).map(|i| Value::Bool(i != 0)),
                other => Err(invalid(self, other)),
            },
            Self::Float => match raw {
                Value::Float(f) => Ok(Value::Float(*f)),
                #[allow(clippy::cast_precision_loss)]
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| invalid(self, raw)),
                other => Err(invalid(self, other)),
            },
            Self::Timestamp => match raw {
                Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
                Value::Int(secs) => epoch_to_datetime(*secs),
                Value::String(s) => epoch_to_datetime(parse_int(self, s)?),
                other => Err(invalid(self, other)),
            },
            Self::String | Self::Field => match raw {
                Value::String(s) => Ok(Value::String(s.clone())),
                Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(Value::String(raw.to_string())),
                other => Err(invalid(self, other)),
            },
            Self::Json => match raw {
                Value::Json(j) => Ok(Value::Json(j.clone())),
                Value::String(s) if s.trim().is_empty() => Ok(Value::Json(serde_json::Value::Null)),
                Value::String(s) => Ok(Value::Json(serde_json::from_str(s)?)),
                other => Err(invalid(self, other)),
            },
            Self::Multi | Self::Multi64 => {
                let items = match raw {
                    Value::List(items) => items.iter().map(|v| int_of(self, v)).collect::<SphinxResult<Vec<_>>>()?,
                    Value::Int(i) => vec![*i],
                    Value::String(s) => s
                        .split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| parse_int(self, part))
                        .collect::<SphinxResult<Vec<_>>>()?,
                    other => return Err(invalid(self, other)),
                };
                if self == Self::Multi {
                    if let Some(bad) = items.iter().find(|i| u32::try_from(**i).is_err()) {
                        return Err(SphinxError::InvalidValue(format!(
                            "{bad} is out of range for a 32-bit multi-valued attribute"
                        )));
                    }
                }
                Ok(Value::from(items))
            }
        }
    }
}

fn invalid(field_type: FieldType, value: &Value) -> SphinxError {
    SphinxError::InvalidValue(format!("{value:?} is not a valid {field_type:?} value"))
}

fn int_of(field_type: FieldType, value: &Value) -> SphinxResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => parse_int(field_type, s),
        other => Err(invalid(field_type, other)),
    }
}

fn uint_of(field_type: FieldType, value: &Value) -> SphinxResult<u32> {
    let i = int_of(field_type, value)?;
    u32::try_from(i).map_err(|_| {
        SphinxError::InvalidValue(format!("{i} is out of range for a 32-bit unsigned attribute"))
    })
}

#[allow(clippy::cast_possible_wrap)]
fn parse_int(field_type: FieldType, text: &str) -> SphinxResult<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .or_else(|_| {
            // Document ids and 64-bit attributes may come back unsigned.
            text.parse::<u64>().map(|u| u as i64)
        })
        .map_err(|_| {
            SphinxError::InvalidValue(format!("'{text}' is not a valid {field_type:?} value"))
        })
}

fn text_of(field_type: FieldType, value: &Value) -> SphinxResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(value.to_string()),
        other => Err(invalid(field_type, other)),
    }
}

fn epoch_to_datetime(secs: i64) -> SphinxResult<Value> {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| Value::DateTime(dt.naive_utc()))
        .ok_or_else(|| SphinxError::InvalidValue(format!("{secs} is not a valid timestamp")))
}

fn format_float(f: f64) -> String {
    let text = f.to_string();
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Complete definition of a model field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The Rust attribute name of this field.
    pub name: &'static str,
    /// The index column name (may differ from `name`).
    pub column: String,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the document id.
    pub primary_key: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Human-readable name for the field.
    pub verbose_name: String,
    /// Human-readable help text.
    pub help_text: String,
}

impl FieldDef {
    /// Creates a new `FieldDef` whose column equals its name.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: name.to_string(),
            field_type,
            primary_key: false,
            default: None,
            verbose_name: name.replace('_', " "),
            help_text: String::new(),
        }
    }

    /// Sets the index column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks this field as the document id.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the default value for this field.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the verbose (human-readable) name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Returns `true` if the field can be changed with an in-place `UPDATE`.
    pub const fn is_updatable(&self) -> bool {
        !self.primary_key && self.field_type.is_updatable()
    }
}
