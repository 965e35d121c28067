//! Model trait and metadata for search index models.
//!
//! The [`Model`] trait is the core abstraction that all index-backed models
//! implement. It provides access to metadata, field values, and construction
//! from decoded rows.
//!
//! [`ModelMeta`] captures the equivalent of a `class Meta`: the index name,
//! default ordering, the field list, and whether the model lives in the
//! search daemon.

use crate::fields::FieldDef;
use crate::query::compiler::OrderBy;
use crate::value::Value;
use sphinxql_core::SphinxResult;

/// A decoded result row, used for constructing model instances.
pub use crate::query::compiler::Row;

/// The core trait for all index models.
///
/// # Examples
///
/// ```
/// use sphinxql_db::model::{Model, ModelMeta};
/// use sphinxql_db::fields::{FieldDef, FieldType};
/// use sphinxql_db::value::Value;
/// use sphinxql_db::query::compiler::Row;
/// use sphinxql_core::SphinxResult;
///
/// struct Article {
///     id: Option<i64>,
///     title: String,
/// }
///
/// impl Model for Article {
///     fn meta() -> &'static ModelMeta {
///         use std::sync::LazyLock;
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
///             ModelMeta::new("blog", "article")
///                 .fields(vec![
///                     FieldDef::new("id", FieldType::DocId).primary_key(),
///                     FieldDef::new("title", FieldType::Field),
///                 ])
///                 .search_index()
///         });
///         &META
///     }
///
///     fn pk(&self) -> Option<Value> { self.id.map(Value::Int) }
///     fn set_pk(&mut self, value: Value) {
///         if let Value::Int(id) = value { self.id = Some(id); }
///     }
///     fn field_values(&self) -> Vec<(&'static str, Value)> {
///         vec![("id", Value::from(self.id)), ("title", Value::String(self.title.clone()))]
///     }
///     fn from_row(row: &Row) -> SphinxResult<Self> {
///         Ok(Article {
///             id: row.get("id")?,
///             title: row.get("title")?,
///         })
///     }
/// }
///
/// assert_eq!(Article::table_name(), "blog_article");
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the index name.
    fn table_name() -> &'static str {
        &Self::meta().db_table
    }

    /// Returns the application label this model belongs to.
    fn app_label() -> &'static str {
        Self::meta().app_label
    }

    /// Returns the document id, or `None` if the instance was never stored.
    fn pk(&self) -> Option<Value>;

    /// Sets the document id on this instance (used after INSERT).
    fn set_pk(&mut self, value: Value);

    /// Returns the name of the primary key field (e.g., "id").
    fn pk_field_name() -> &'static str {
        Self::meta().pk_field().map_or("id", |f| f.name)
    }

    /// Returns all field name-value pairs for this instance.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Returns field name-value pairs excluding the primary key.
    fn non_pk_field_values(&self) -> Vec<(&'static str, Value)> {
        let pk_name = Self::pk_field_name();
        self.field_values()
            .into_iter()
            .filter(|(name, _)| *name != pk_name)
            .collect()
    }

    /// Constructs a model instance from a decoded row.
    fn from_row(row: &Row) -> SphinxResult<Self>
    where
        Self: Sized;
}

/// Metadata about a model.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    /// The application label (e.g., "testapp").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g., "testmodel").
    pub model_name: &'static str,
    /// The index name.
    pub db_table: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Human-readable plural name.
    pub verbose_name_plural: String,
    /// Default ordering for queries.
    pub ordering: Vec<OrderBy>,
    /// Field definitions for this model.
    pub fields: Vec<FieldDef>,
    /// Whether the model is stored in the search daemon.
    pub search_index: bool,
}

impl ModelMeta {
    /// Creates metadata with the conventional `<app>_<model>` index name.
    pub fn new(app_label: &'static str, model_name: &'static str) -> Self {
        Self {
            app_label,
            model_name,
            db_table: format!("{app_label}_{model_name}"),
            verbose_name: model_name.to_string(),
            verbose_name_plural: format!("{model_name}s"),
            ordering: Vec::new(),
            fields: Vec::new(),
            search_index: false,
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn db_table(mut self, name: impl Into<String>) -> Self {
        self.db_table = name.into();
        self
    }

    /// Sets the field list.
    #[must_use]
    pub fn fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the default ordering.
    #[must_use]
    pub fn ordering(mut self, ordering: Vec<OrderBy>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Marks the model as stored in the search daemon.
    #[must_use]
    pub const fn search_index(mut self) -> Self {
        self.search_index = true;
        self
    }

    /// Returns `"app_label.model_name"`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Looks up a field by name, by column, or by the `pk` alias.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        if name == "pk" {
            return self.pk_field();
        }
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.column == name))
    }

    /// Returns the document id field.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Returns the name of the document id column, `id` by default.
    pub fn pk_column(&self) -> &str {
        self.pk_field().map_or("id", |f| f.column.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;

    struct TestModel {
        id: Option<i64>,
        name: String,
    }

    impl Model for TestModel {
        fn meta() -> &'static ModelMeta {
            use std::sync::LazyLock;
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new("test", "testmodel")
                    .fields(vec![
                        FieldDef::new("id", FieldType::DocId).primary_key(),
                        FieldDef::new("name", FieldType::String).column("title"),
                    ])
                    .ordering(vec![OrderBy::desc("id")])
                    .search_index()
            });
            &META
        }

        fn pk(&self) -> Option<Value> {
            self.id.map(Value::Int)
        }

        fn set_pk(&mut self, value: Value) {
            if let Value::Int(id) = value {
                self.id = Some(id);
            }
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::from(self.id)),
                ("name", Value::String(self.name.clone())),
            ]
        }

        fn from_row(row: &Row) -> SphinxResult<Self> {
            Ok(TestModel {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        }
    }

    #[test]
    fn test_model_meta() {
        let meta = TestModel::meta();
        assert_eq!(meta.app_label, "test");
        assert_eq!(meta.model_name, "testmodel");
        assert_eq!(meta.db_table, "test_testmodel");
        assert_eq!(meta.label(), "test.testmodel");
        assert!(meta.search_index);
        assert_eq!(meta.fields.len(), 2);
    }

    #[test]
    fn test_model_defaults() {
        assert_eq!(TestModel::table_name(), "test_testmodel");
        assert_eq!(TestModel::app_label(), "test");
        assert_eq!(TestModel::pk_field_name(), "id");
    }

    #[test]
    fn test_get_field() {
        let meta = TestModel::meta();
        assert_eq!(meta.get_field("name").map(|f| f.column.as_str()), Some("title"));
        assert_eq!(meta.get_field("title").map(|f| f.name), Some("name"));
        assert_eq!(meta.get_field("pk").map(|f| f.name), Some("id"));
        assert!(meta.get_field("missing").is_none());
        assert_eq!(meta.pk_column(), "id");
    }

    #[test]
    fn test_custom_db_table() {
        let meta = ModelMeta::new("test", "forced").db_table("forced_pk_index");
        assert_eq!(meta.db_table, "forced_pk_index");
        assert!(!meta.search_index);
        assert!(meta.pk_field().is_none());
        assert_eq!(meta.pk_column(), "id");
    }

    #[test]
    fn test_non_pk_field_values() {
        let m = TestModel {
            id: Some(1),
            name: "Alice".to_string(),
        };
        assert_eq!(
            m.non_pk_field_values(),
            vec![("name", Value::String("Alice".to_string()))]
        );
        assert_eq!(m.pk(), Some(Value::Int(1)));
    }

    #[test]
    fn test_model_from_row() {
        let row = Row::new(
            vec!["id".to_string(), "name".to_string()],
            vec![Value::Int(1), Value::String("Alice".to_string())],
        );
        let m = TestModel::from_row(&row).unwrap();
        assert_eq!(m.id, Some(1));
        assert_eq!(m.name, "Alice");
    }

    #[test]
    fn test_set_pk() {
        let mut m = TestModel {
            id: None,
            name: String::new(),
        };
        assert!(m.pk().is_none());
        m.set_pk(Value::Int(42));
        assert_eq!(m.id, Some(42));
    }
}
