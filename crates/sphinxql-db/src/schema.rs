//! Real-time index DDL.
//!
//! searchd creates real-time indexes with a MySQL-like `CREATE TABLE`. The
//! document id column is implicit and never declared. These helpers are what
//! test setup uses to create, empty, and drop indexes for a model.

use tracing::Instrument;

use crate::executor::SearchExecutor;
use crate::model::ModelMeta;
use crate::query::escape::is_identifier;
use sphinxql_core::logging::query_span;
use sphinxql_core::{SphinxError, SphinxResult};

fn checked_name(name: &str) -> SphinxResult<&str> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(SphinxError::InvalidValue(format!(
            "'{name}' is not a valid index or column name"
        )))
    }
}

/// Generates `CREATE TABLE` for a model's real-time index.
///
/// # Errors
///
/// Returns [`SphinxError::InvalidValue`] if the index or a column name is not
/// a plain identifier, and [`SphinxError::ConfigurationError`] if the model
/// declares no column besides the document id.
pub fn create_table_sql(meta: &ModelMeta) -> SphinxResult<String> {
    let table = checked_name(&meta.db_table)?;
    let mut columns = Vec::with_capacity(meta.fields.len());
    for field in &meta.fields {
        let Some(column_type) = field.field_type.column_type() else {
            continue;
        };
        if field.primary_key {
            continue;
        }
        columns.push(format!("{} {column_type}", checked_name(&field.column)?));
    }
    if columns.is_empty() {
        return Err(SphinxError::ConfigurationError(format!(
            "model '{}' has no index columns",
            meta.label()
        )));
    }
    Ok(format!("CREATE TABLE `{table}` ({})", columns.join(", ")))
}

/// Generates `TRUNCATE RTINDEX` for an index.
///
/// # Errors
///
/// Returns [`SphinxError::InvalidValue`] for a malformed index name.
pub fn truncate_index_sql(index: &str) -> SphinxResult<String> {
    Ok(format!("TRUNCATE RTINDEX {}", checked_name(index)?))
}

/// Generates `DROP TABLE IF EXISTS` for an index.
///
/// # Errors
///
/// Returns [`SphinxError::InvalidValue`] for a malformed index name.
pub fn drop_table_sql(index: &str) -> SphinxResult<String> {
    Ok(format!("DROP TABLE IF EXISTS {}", checked_name(index)?))
}

/// Creates the real-time index for `meta`.
///
/// # Errors
///
/// See [`create_table_sql`]; daemon errors (e.g. the index already exists)
/// are propagated.
pub async fn create_index(meta: &ModelMeta, db: &dyn SearchExecutor) -> SphinxResult<()> {
    let sql = create_table_sql(meta)?;
    db.execute_sql(&sql)
        .instrument(query_span(&meta.db_table))
        .await?;
    tracing::info!(index = %meta.db_table, "created index");
    Ok(())
}

/// Removes every document from an index.
///
/// # Errors
///
/// Propagates daemon errors.
pub async fn truncate_index(index: &str, db: &dyn SearchExecutor) -> SphinxResult<()> {
    let sql = truncate_index_sql(index)?;
    db.execute_sql(&sql).instrument(query_span(index)).await?;
    Ok(())
}

/// Drops an index if it exists.
///
/// # Errors
///
/// Propagates daemon errors.
pub async fn drop_index(index: &str, db: &dyn SearchExecutor) -> SphinxResult<()> {
    let sql = drop_table_sql(index)?;
    db.execute_sql(&sql).instrument(query_span(index)).await?;
    tracing::info!(index, "dropped index");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::fields::{FieldDef, FieldType};
    use crate::query::compiler::Row;

    #[derive(Default)]
    struct Recorder {
        statements: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SearchExecutor for Recorder {
        async fn execute_sql(&self, sql: &str) -> SphinxResult<u64> {
            self.statements.lock().unwrap().push(sql.to_string());
            Ok(0)
        }

        async fn query(&self, sql: &str) -> SphinxResult<Vec<Row>> {
            self.statements.lock().unwrap().push(sql.to_string());
            Ok(Vec::new())
        }
    }

    fn meta() -> ModelMeta {
        ModelMeta::new("testapp", "testmodel")
            .fields(vec![
                FieldDef::new("id", FieldType::DocId).primary_key(),
                FieldDef::new("sphinx_field", FieldType::Field),
                FieldDef::new("attr_uint", FieldType::Uint).column("attr_uint_"),
                FieldDef::new("attr_bigint", FieldType::BigInt),
                FieldDef::new("attr_bool", FieldType::Bool),
                FieldDef::new("attr_float", FieldType::Float),
                FieldDef::new("attr_timestamp", FieldType::Timestamp),
                FieldDef::new("attr_string", FieldType::String),
                FieldDef::new("attr_json", FieldType::Json),
                FieldDef::new("attr_multi", FieldType::Multi),
                FieldDef::new("attr_multi_64", FieldType::Multi64),
            ])
            .search_index()
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            create_table_sql(&meta()).unwrap(),
            "CREATE TABLE `testapp_testmodel` (sphinx_field text, attr_uint_ int, \
             attr_bigint bigint, attr_bool bool, attr_float float, \
             attr_timestamp timestamp, attr_string string, attr_json json, \
             attr_multi multi, attr_multi_64 multi64)"
        );
    }

    #[test]
    fn test_create_table_sql_without_columns() {
        let meta = ModelMeta::new("testapp", "empty")
            .fields(vec![FieldDef::new("id", FieldType::DocId).primary_key()]);
        assert!(matches!(
            create_table_sql(&meta),
            Err(SphinxError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_bad_names_rejected() {
        let meta = ModelMeta::new("testapp", "x")
            .db_table("bad name")
            .fields(vec![FieldDef::new("a", FieldType::Uint)]);
        assert!(create_table_sql(&meta).is_err());
        assert!(truncate_index_sql("idx; DROP").is_err());
        assert!(drop_table_sql("").is_err());
    }

    #[test]
    fn test_truncate_and_drop_sql() {
        assert_eq!(
            truncate_index_sql("testapp_testmodel").unwrap(),
            "TRUNCATE RTINDEX testapp_testmodel"
        );
        assert_eq!(
            drop_table_sql("testapp_testmodel").unwrap(),
            "DROP TABLE IF EXISTS testapp_testmodel"
        );
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let db = Recorder::default();
        let meta = meta();
        create_index(&meta, &db).await.unwrap();
        truncate_index(&meta.db_table, &db).await.unwrap();
        drop_index(&meta.db_table, &db).await.unwrap();
        let statements = db.statements.lock().unwrap().clone();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE TABLE `testapp_testmodel`"));
        assert_eq!(statements[1], "TRUNCATE RTINDEX testapp_testmodel");
        assert_eq!(statements[2], "DROP TABLE IF EXISTS testapp_testmodel");
    }
}
