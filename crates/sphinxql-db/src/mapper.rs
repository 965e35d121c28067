//! Decoding of searchd result rows.
//!
//! searchd answers over the text protocol, so most values arrive as strings.
//! [`ResultMapper`] turns each column into the typed [`Value`] its declared
//! [`FieldType`](crate::fields::FieldType) calls for and renames it from the
//! index column to the model field name. Columns the model does not describe
//! (aliases, aggregates, `weight()`) pass through untouched.

use std::collections::HashMap;

use sphinxql_core::{SphinxError, SphinxResult};

use crate::fields::FieldType;
use crate::model::ModelMeta;
use crate::query::compiler::Row;
use crate::value::Value;

/// Rows plus the statistics searchd reported for the query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<M> {
    /// The matched model instances.
    pub items: Vec<M>,
    /// `SHOW META` output, e.g. `total`, `total_found`, `time`.
    pub meta: HashMap<String, String>,
}

impl<M> QueryResult<M> {
    /// Returns the `total_found` statistic.
    pub fn total_found(&self) -> Option<u64> {
        self.meta.get("total_found").and_then(|v| v.parse().ok())
    }
}

/// Decodes rows for one model.
#[derive(Debug, Clone, Copy)]
pub struct ResultMapper<'a> {
    meta: &'a ModelMeta,
}

impl<'a> ResultMapper<'a> {
    /// Creates a mapper for `meta`.
    pub const fn new(meta: &'a ModelMeta) -> Self {
        Self { meta }
    }

    /// Decodes one row. Column names are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::InvalidValue`] (or `SerializationError` for bad
    /// JSON) naming the column that failed to decode.
    pub fn map_row(&self, row: &Row) -> SphinxResult<Row> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, raw) in row.columns().iter().zip(row.values()) {
            let field = self
                .meta
                .fields
                .iter()
                .find(|f| f.column.eq_ignore_ascii_case(column));
            match field {
                Some(field) => {
                    let value = field.field_type.decode(raw).map_err(|e| annotate(column, e))?;
                    columns.push(field.name.to_string());
                    values.push(value);
                }
                None if column.eq_ignore_ascii_case(self.meta.pk_column()) => {
                    let value = FieldType::DocId.decode(raw).map_err(|e| annotate(column, e))?;
                    columns.push(self.meta.pk_column().to_string());
                    values.push(value);
                }
                None => {
                    columns.push(column.clone());
                    values.push(raw.clone());
                }
            }
        }
        Ok(Row::new(columns, values))
    }

    /// Decodes every row.
    ///
    /// # Errors
    ///
    /// As [`map_row`](Self::map_row).
    pub fn map_rows(&self, rows: &[Row]) -> SphinxResult<Vec<Row>> {
        rows.iter().map(|row| self.map_row(row)).collect()
    }

    /// Turns `SHOW META` rows (`Variable_name`, `Value`) into a map.
    pub fn decode_meta(rows: &[Row]) -> HashMap<String, String> {
        let meta: HashMap<String, String> = rows
            .iter()
            .filter_map(|row| match row.values() {
                [name, value, ..] => Some((name.to_string(), value.to_string())),
                _ => None,
            })
            .collect();
        tracing::trace!(?meta, "decoded query meta");
        meta
    }
}

fn annotate(column: &str, err: SphinxError) -> SphinxError {
    match err {
        SphinxError::InvalidValue(msg) => {
            SphinxError::InvalidValue(format!("column '{column}': {msg}"))
        }
        SphinxError::SerializationError(msg) => {
            SphinxError::SerializationError(format!("column '{column}': {msg}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDef;

    fn meta() -> ModelMeta {
        ModelMeta::new("testapp", "testmodel").fields(vec![
            FieldDef::new("id", FieldType::DocId).primary_key(),
            FieldDef::new("sphinx_field", FieldType::Field),
            FieldDef::new("attr_uint", FieldType::Uint).column("attr_uint_"),
            FieldDef::new("attr_bool", FieldType::Bool),
            FieldDef::new("attr_float", FieldType::Float),
            FieldDef::new("attr_multi", FieldType::Multi),
            FieldDef::new("attr_multi_64", FieldType::Multi64),
            FieldDef::new("attr_timestamp", FieldType::Timestamp),
            FieldDef::new("attr_json", FieldType::Json),
        ])
    }

    fn text_row(pairs: &[(&str, &str)]) -> Row {
        Row::new(
            pairs.iter().map(|(c, _)| (*c).to_string()).collect(),
            pairs.iter().map(|(_, v)| Value::from(*v)).collect(),
        )
    }

    #[test]
    fn test_map_row_decodes_by_field_type() {
        let meta = meta();
        let row = text_row(&[
            ("id", "1"),
            ("sphinx_field", "hello"),
            ("attr_uint_", "100500"),
            ("attr_bool", "1"),
            ("attr_float", "1.5"),
            ("attr_multi", "1,2,3"),
            ("attr_multi_64", "8589934592"),
            ("attr_timestamp", "1704067200"),
            ("attr_json", "{\"json\":\"test\"}"),
        ]);
        let mapped = ResultMapper::new(&meta).map_row(&row).unwrap();
        assert_eq!(mapped.get_value("id"), Some(&Value::Int(1)));
        assert_eq!(mapped.get_value("attr_uint"), Some(&Value::Int(100_500)));
        assert!(mapped.get_value("attr_uint_").is_none());
        assert_eq!(mapped.get_value("attr_bool"), Some(&Value::Bool(true)));
        assert_eq!(mapped.get_value("attr_float"), Some(&Value::Float(1.5)));
        assert_eq!(mapped.get::<Vec<i64>>("attr_multi").unwrap(), vec![1, 2, 3]);
        assert_eq!(mapped.get::<Vec<i64>>("attr_multi_64").unwrap(), vec![1 << 33]);
        assert_eq!(
            mapped
                .get::<chrono::NaiveDateTime>("attr_timestamp")
                .unwrap()
                .and_utc()
                .timestamp(),
            1_704_067_200
        );
        assert_eq!(
            mapped.get::<serde_json::Value>("attr_json").unwrap(),
            serde_json::json!({"json": "test"})
        );
    }

    #[test]
    fn test_map_row_case_insensitive_and_passthrough() {
        let meta = meta();
        let row = text_row(&[("ATTR_BOOL", "0"), ("weight()", "1500"), ("const", "0")]);
        let mapped = ResultMapper::new(&meta).map_row(&row).unwrap();
        assert_eq!(mapped.get_value("attr_bool"), Some(&Value::Bool(false)));
        assert_eq!(mapped.get_value("weight()"), Some(&Value::from("1500")));
        assert_eq!(mapped.get_value("const"), Some(&Value::from("0")));
    }

    #[test]
    fn test_map_row_undeclared_pk() {
        let meta = ModelMeta::new("testapp", "bare");
        let mapped = ResultMapper::new(&meta)
            .map_row(&text_row(&[("id", "42")]))
            .unwrap();
        assert_eq!(mapped.get::<i64>("id").unwrap(), 42);
    }

    #[test]
    fn test_map_row_error_names_column() {
        let meta = meta();
        let err = ResultMapper::new(&meta)
            .map_row(&text_row(&[("attr_multi", "1,x")]))
            .unwrap_err();
        match err {
            SphinxError::InvalidValue(msg) => assert!(msg.contains("attr_multi"), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decode_meta() {
        let rows = vec![
            text_row(&[("Variable_name", "total"), ("Value", "2")]),
            text_row(&[("Variable_name", "total_found"), ("Value", "2")]),
            text_row(&[("Variable_name", "time"), ("Value", "0.000")]),
        ];
        let meta = ResultMapper::decode_meta(&rows);
        assert_eq!(meta.len(), 3);
        assert_eq!(meta["total"], "2");
        assert_eq!(meta["time"], "0.000");

        let result = QueryResult::<()> {
            items: Vec::new(),
            meta,
        };
        assert_eq!(result.total_found(), Some(2));
    }
}
