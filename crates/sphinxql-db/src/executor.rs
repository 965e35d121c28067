//! Search executor trait and model persistence.
//!
//! This module defines the [`SearchExecutor`] trait that provides the minimal
//! async interface required by [`QuerySet`](crate::query::queryset::QuerySet)
//! execution methods and model persistence. It also provides free functions
//! for create/save/delete/refresh on model instances.
//!
//! `SearchExecutor` is implemented by the searchd backend in the
//! `sphinxql-backends` crate and by the fake daemon in `sphinxql-test`.
//! Statements are plain SphinxQL text; searchd takes no bound parameters.

use tracing::Instrument;

use crate::fields::{FieldDef, FieldType};
use crate::mapper::ResultMapper;
use crate::model::Model;
use crate::query::compiler::{Query, Row, SphinxCompiler, WhereNode};
use crate::query::lookups::Lookup;
use crate::value::Value;
use sphinxql_core::logging::query_span;
use sphinxql_core::{SphinxError, SphinxResult};

/// Minimal async executor for SphinxQL statements.
#[async_trait::async_trait]
pub trait SearchExecutor: Send + Sync {
    /// Runs a statement that does not return rows.
    /// Returns the number of documents affected.
    async fn execute_sql(&self, sql: &str) -> SphinxResult<u64>;

    /// Runs a query and returns all result rows, undecoded.
    async fn query(&self, sql: &str) -> SphinxResult<Vec<Row>>;

    /// Runs a query and returns exactly one row.
    /// Returns `DoesNotExist` if no rows, `MultipleObjectsReturned` if more than one.
    async fn query_one(&self, sql: &str) -> SphinxResult<Row> {
        let mut rows = self.query(sql).await?;
        match rows.len() {
            0 => Err(SphinxError::DoesNotExist(
                "query returned no rows".to_string(),
            )),
            1 => Ok(rows.swap_remove(0)),
            n => Err(SphinxError::MultipleObjectsReturned(format!(
                "query returned {n} rows, expected one"
            ))),
        }
    }

    /// Runs a query followed by `meta_sql` (normally `SHOW META`).
    ///
    /// `SHOW META` describes the previous statement of the same session, so
    /// backends with a pool must run both on one connection.
    async fn query_with_meta(
        &self,
        sql: &str,
        meta_sql: &str,
    ) -> SphinxResult<(Vec<Row>, Vec<Row>)> {
        let rows = self.query(sql).await?;
        let meta = self.query(meta_sql).await?;
        Ok((rows, meta))
    }

    /// Executes an INSERT and returns the id searchd assigned.
    async fn insert_returning_id(&self, sql: &str) -> SphinxResult<Value> {
        self.execute_sql(sql).await?;
        let row = self.query_one("SELECT LAST_INSERT_ID()").await?;
        FieldType::DocId.decode(&row.get_by_index::<Value>(0)?)
    }
}

// ── Model persistence free functions ───────────────────────────────────

/// Inserts a model instance.
///
/// Without a document id the daemon assigns one, which is stored back on the
/// instance.
///
/// # Errors
///
/// Returns an error if a value cannot be stored or the INSERT fails (for
/// example because the id already exists).
pub async fn create_model<M: Model>(model: &mut M, db: &dyn SearchExecutor) -> SphinxResult<()> {
    let compiler = SphinxCompiler::new(M::meta());
    let span = query_span(M::table_name());
    if model.pk().is_some() {
        let sql = compiler.compile_insert(M::table_name(), &model.field_values(), false)?;
        db.execute_sql(&sql).instrument(span).await?;
    } else {
        let sql = compiler.compile_insert(M::table_name(), &model.non_pk_field_values(), false)?;
        let pk = db.insert_returning_id(&sql).instrument(span).await?;
        model.set_pk(pk);
    }
    Ok(())
}

/// Saves a model instance.
///
/// A model without an id is created. Otherwise, when every saved field can
/// be updated in place, a fast `UPDATE ... WHERE id = pk` is issued; strings,
/// JSON and full-text fields can only change by replacing the whole
/// document, so any of those forces a `REPLACE INTO` of all fields.
///
/// `update_fields` limits the save to the named fields.
///
/// # Errors
///
/// Returns [`SphinxError::FieldError`] for an unknown name in
/// `update_fields`, or any error from the statement itself.
pub async fn save_model<M: Model>(
    model: &mut M,
    db: &dyn SearchExecutor,
    update_fields: Option<&[&str]>,
) -> SphinxResult<()> {
    let Some(pk) = model.pk() else {
        return create_model(model, db).await;
    };
    let meta = M::meta();
    let pk_name = M::pk_field_name();
    let values = model.field_values();

    if let Some(names) = update_fields {
        if let Some(unknown) = names
            .iter()
            .find(|name| !values.iter().any(|(field, _)| field == *name))
        {
            return Err(SphinxError::FieldError(format!(
                "'{unknown}' is not a field of {}",
                meta.label()
            )));
        }
    }
    let changed: Vec<(&'static str, Value)> = values
        .iter()
        .filter(|(name, _)| *name != pk_name)
        .filter(|(name, _)| update_fields.map_or(true, |names| names.contains(name)))
        .cloned()
        .collect();
    if changed.is_empty() {
        return Ok(());
    }

    let compiler = SphinxCompiler::new(meta);
    let in_place = changed
        .iter()
        .all(|(name, _)| meta.get_field(name).is_some_and(FieldDef::is_updatable));
    let sql = if in_place {
        let mut query = Query::new(M::table_name());
        query.add_filter(WhereNode::Condition {
            field: pk_name.to_string(),
            lookup: Lookup::Exact(pk),
        });
        compiler.compile_update(&query, &changed)?
    } else {
        tracing::debug!(
            index = M::table_name(),
            "saved fields cannot be updated in place, replacing the document"
        );
        compiler.compile_insert(M::table_name(), &values, true)?
    };
    db.execute_sql(&sql)
        .instrument(query_span(M::table_name()))
        .await?;
    Ok(())
}

/// Deletes a model instance by id.
///
/// # Errors
///
/// Returns [`SphinxError::InvalidValue`] if the id is not set, or any error
/// from the DELETE.
pub async fn delete_model<M: Model>(model: &M, db: &dyn SearchExecutor) -> SphinxResult<u64> {
    let pk = model.pk().ok_or_else(|| {
        SphinxError::InvalidValue("Cannot delete a model without a document id".to_string())
    })?;
    let mut query = Query::new(M::table_name());
    query.add_filter(WhereNode::Condition {
        field: M::pk_field_name().to_string(),
        lookup: Lookup::In(vec![pk]),
    });
    let sql = SphinxCompiler::new(M::meta()).compile_delete(&query)?;
    db.execute_sql(&sql)
        .instrument(query_span(M::table_name()))
        .await
}

/// Reloads a model instance from the index.
///
/// # Errors
///
/// Returns [`SphinxError::DoesNotExist`] if the document is gone, or
/// [`SphinxError::InvalidValue`] if the id is not set.
pub async fn refresh_model<M: Model>(model: &mut M, db: &dyn SearchExecutor) -> SphinxResult<()> {
    let pk = model.pk().ok_or_else(|| {
        SphinxError::InvalidValue("Cannot refresh a model without a document id".to_string())
    })?;
    let mut query = Query::new(M::table_name());
    query.add_filter(WhereNode::Condition {
        field: M::pk_field_name().to_string(),
        lookup: Lookup::Exact(pk.clone()),
    });
    query.order_by = Some(Vec::new());
    query.limit = Some(1);

    let sql = SphinxCompiler::new(M::meta()).compile_select(&query)?;
    let rows = db
        .query(&sql)
        .instrument(query_span(M::table_name()))
        .await?;
    let row = rows.first().ok_or_else(|| {
        SphinxError::DoesNotExist(format!(
            "{} with id {pk} does not exist.",
            M::meta().label()
        ))
    })?;
    *model = M::from_row(&ResultMapper::new(M::meta()).map_row(row)?)?;
    Ok(())
}
