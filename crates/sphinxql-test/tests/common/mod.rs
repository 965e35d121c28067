//! The model shared by the integration tests.

#![allow(dead_code)]

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use sphinxql_core::SphinxResult;
use sphinxql_db::fields::{FieldDef, FieldType};
use sphinxql_db::model::{Model, ModelMeta, Row};
use sphinxql_db::value::Value;
use sphinxql_test::text_row;

#[derive(Debug, Clone, PartialEq)]
pub struct TestModel {
    pub id: Option<i64>,
    pub sphinx_field: String,
    pub attr_uint: i64,
    pub attr_bool: bool,
    pub attr_bigint: i64,
    pub attr_float: f64,
    pub attr_multi: Vec<i64>,
    pub attr_multi_64: Vec<i64>,
    pub attr_timestamp: NaiveDateTime,
    pub attr_string: String,
    pub attr_json: serde_json::Value,
}

impl Model for TestModel {
    fn meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new("testapp", "testmodel")
                .fields(vec![
                    FieldDef::new("id", FieldType::DocId).primary_key(),
                    FieldDef::new("sphinx_field", FieldType::Field),
                    FieldDef::new("attr_uint", FieldType::Uint),
                    FieldDef::new("attr_bool", FieldType::Bool),
                    FieldDef::new("attr_bigint", FieldType::BigInt),
                    FieldDef::new("attr_float", FieldType::Float),
                    FieldDef::new("attr_multi", FieldType::Multi),
                    FieldDef::new("attr_multi_64", FieldType::Multi64),
                    FieldDef::new("attr_timestamp", FieldType::Timestamp),
                    FieldDef::new("attr_string", FieldType::String),
                    FieldDef::new("attr_json", FieldType::Json),
                ])
                .search_index()
        });
        &META
    }

    fn pk(&self) -> Option<Value> {
        self.id.map(Value::Int)
    }

    fn set_pk(&mut self, value: Value) {
        self.id = value.as_int();
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::from(self.id)),
            ("sphinx_field", Value::from(self.sphinx_field.clone())),
            ("attr_uint", Value::Int(self.attr_uint)),
            ("attr_bool", Value::Bool(self.attr_bool)),
            ("attr_bigint", Value::Int(self.attr_bigint)),
            ("attr_float", Value::Float(self.attr_float)),
            ("attr_multi", Value::from(self.attr_multi.clone())),
            ("attr_multi_64", Value::from(self.attr_multi_64.clone())),
            ("attr_timestamp", Value::DateTime(self.attr_timestamp)),
            ("attr_string", Value::from(self.attr_string.clone())),
            ("attr_json", Value::Json(self.attr_json.clone())),
        ]
    }

    // searchd never returns full-text fields, and `values()` drops columns.
    fn from_row(row: &Row) -> SphinxResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            sphinx_field: row.try_get("sphinx_field")?.unwrap_or_default(),
            attr_uint: row.try_get("attr_uint")?.unwrap_or_default(),
            attr_bool: row.try_get("attr_bool")?.unwrap_or_default(),
            attr_bigint: row.try_get("attr_bigint")?.unwrap_or_default(),
            attr_float: row.try_get("attr_float")?.unwrap_or_default(),
            attr_multi: row.try_get("attr_multi")?.unwrap_or_default(),
            attr_multi_64: row.try_get("attr_multi_64")?.unwrap_or_default(),
            attr_timestamp: row.try_get("attr_timestamp")?.unwrap_or_default(),
            attr_string: row.try_get("attr_string")?.unwrap_or_default(),
            attr_json: row.try_get("attr_json")?.unwrap_or_default(),
        })
    }
}

pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

pub fn defaults(id: Option<i64>) -> TestModel {
    TestModel {
        id,
        sphinx_field: "hello sphinx field".to_string(),
        attr_uint: 100_500,
        attr_bool: true,
        attr_bigint: 1 << 33,
        attr_float: 1.2345,
        attr_multi: vec![1, 2, 3],
        attr_multi_64: vec![1 << 33, 1 << 34],
        attr_timestamp: now(),
        attr_string: "hello sphinx attr".to_string(),
        attr_json: serde_json::json!({"json": "test"}),
    }
}

/// The row searchd returns for `defaults(Some(id))` over the text protocol.
pub fn stored_row(id: i64) -> Row {
    let id = id.to_string();
    text_row(&[
        ("id", id.as_str()),
        ("attr_uint", "100500"),
        ("attr_bool", "1"),
        ("attr_bigint", "8589934592"),
        ("attr_float", "1.234500"),
        ("attr_multi", "1,2,3"),
        ("attr_multi_64", "8589934592,17179869184"),
        ("attr_timestamp", "1704067200"),
        ("attr_string", "hello sphinx attr"),
        ("attr_json", "{\"json\":\"test\"}"),
    ])
}

/// Compares everything except the full-text field, which is not stored.
pub fn assert_same_attrs(actual: &TestModel, expected: &TestModel) {
    let mut actual = actual.clone();
    actual.sphinx_field.clone_from(&expected.sphinx_field);
    assert_eq!(&actual, expected);
}
