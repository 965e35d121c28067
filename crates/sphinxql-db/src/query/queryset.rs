//! QuerySet and Manager for building and executing search queries.
//!
//! The [`QuerySet`] represents a lazy query that builds up a [`Query`] AST.
//! It only talks to searchd when an `*_exec` method is called. The
//! [`Manager`] is the entry point for accessing querysets on a model,
//! equivalent to Django's `objects` manager.
//!
//! # Examples
//!
//! ```
//! use std::sync::LazyLock;
//! use sphinxql_core::SphinxResult;
//! use sphinxql_db::fields::{FieldDef, FieldType};
//! use sphinxql_db::model::{Model, ModelMeta, Row};
//! use sphinxql_db::query::{GroupBy, Manager, Q};
//! use sphinxql_db::value::Value;
//!
//! struct Product {
//!     id: Option<i64>,
//! }
//!
//! impl Model for Product {
//!     fn meta() -> &'static ModelMeta {
//!         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
//!             ModelMeta::new("shop", "product").fields(vec![
//!                 FieldDef::new("id", FieldType::DocId).primary_key(),
//!                 FieldDef::new("name", FieldType::Field),
//!                 FieldDef::new("brand_id", FieldType::Uint),
//!                 FieldDef::new("price", FieldType::Float),
//!             ])
//!         });
//!         &META
//!     }
//!     fn pk(&self) -> Option<Value> { self.id.map(Value::Int) }
//!     fn set_pk(&mut self, value: Value) { self.id = value.as_int(); }
//!     fn field_values(&self) -> Vec<(&'static str, Value)> { vec![("id", Value::from(self.id))] }
//!     fn from_row(row: &Row) -> SphinxResult<Self> { Ok(Self { id: row.get("id")? }) }
//! }
//!
//! let qs = Manager::<Product>::new()
//!     .matching("phone")
//!     .filter(Q::lookup("price__lt", 500.0).unwrap())
//!     .group_by(GroupBy::new("brand_id").group_limit(1).group_order_by("price"))
//!     .option("ranker", "bm25");
//! assert_eq!(
//!     qs.to_sql().unwrap(),
//!     "SELECT * FROM `shop_product` WHERE MATCH('phone') AND price < 500.0 \
//!      GROUP 1 BY brand_id WITHIN GROUP ORDER BY price ASC OPTION ranker=bm25"
//! );
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Range;

use tracing::Instrument;

use super::compiler::{AggregateFunc, GroupBy, OrderBy, Query, SelectColumn, SphinxCompiler, WhereNode};
use super::lookups::Q;
use super::options::OptionValue;
use crate::executor::SearchExecutor;
use crate::mapper::{QueryResult, ResultMapper};
use crate::model::{Model, Row};
use crate::router::RouterChain;
use crate::value::Value;
use sphinxql_core::logging::query_span;
use sphinxql_core::{SphinxError, SphinxResult};

/// The entry point for model-level query operations.
///
/// The `Manager` itself does not hold any query state; it simply creates
/// fresh `QuerySet` instances.
#[derive(Debug)]
pub struct Manager<M: Model> {
    _phantom: PhantomData<fn() -> M>,
    using: Option<String>,
}

impl<M: Model> Default for Manager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Manager<M> {
    /// Creates a new manager.
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
            using: None,
        }
    }

    /// Sets the database alias for this manager.
    #[must_use]
    pub fn using(mut self, db: impl Into<String>) -> Self {
        self.using = Some(db.into());
        self
    }

    /// Returns a new `QuerySet` that returns all objects.
    pub fn all(&self) -> QuerySet<M> {
        QuerySet::new(self.using.clone())
    }

    /// Returns a new `QuerySet` with the given filter applied.
    pub fn filter(&self, q: Q) -> QuerySet<M> {
        self.all().filter(q)
    }

    /// Returns a new `QuerySet` with the given exclusion applied.
    pub fn exclude(&self, q: Q) -> QuerySet<M> {
        self.all().exclude(q)
    }

    /// Returns a new `QuerySet` with a full-text query.
    pub fn matching(&self, text: impl Into<String>) -> QuerySet<M> {
        self.all().matching(text)
    }

    /// Returns an empty `QuerySet` that matches nothing.
    pub fn none(&self) -> QuerySet<M> {
        self.all().none()
    }

    /// Returns a new `QuerySet` with the given ordering.
    pub fn order_by(&self, fields: Vec<OrderBy>) -> QuerySet<M> {
        self.all().order_by(fields)
    }

    /// Returns a new grouped `QuerySet`.
    pub fn group_by(&self, group: GroupBy) -> QuerySet<M> {
        self.all().group_by(group)
    }

    /// Returns a new `QuerySet` with one `OPTION` entry.
    pub fn option(&self, key: impl Into<String>, value: impl Into<OptionValue>) -> QuerySet<M> {
        self.all().option(key, value)
    }

    /// Returns a new `QuerySet` with several `OPTION` entries.
    pub fn options<K, V>(&self, options: impl IntoIterator<Item = (K, V)>) -> QuerySet<M>
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        self.all().options(options)
    }

    /// Returns a new `QuerySet` with a raw WHERE condition.
    pub fn extra_where(&self, condition: impl Into<String>) -> QuerySet<M> {
        self.all().extra_where(condition)
    }

    /// Returns a new `QuerySet` selecting `expr AS alias` as well.
    pub fn extra_select(&self, alias: impl Into<String>, expr: impl Into<String>) -> QuerySet<M> {
        self.all().extra_select(alias, expr)
    }

    /// Returns a new `QuerySet` restricted to `fields`.
    pub fn values(&self, fields: Vec<&str>) -> QuerySet<M> {
        self.all().values(fields)
    }

    /// Returns a new `QuerySet` leaving `fields` out.
    pub fn defer(&self, fields: Vec<&str>) -> QuerySet<M> {
        self.all().defer(fields)
    }

    /// Returns a new `QuerySet` over the `[start, end)` window.
    pub fn slice(&self, range: Range<usize>) -> QuerySet<M> {
        self.all().slice(range)
    }
}

/// A lazy, composable search query.
///
/// All builder methods consume `self` and return the modified queryset;
/// clone a queryset to branch it.
pub struct QuerySet<M: Model> {
    model: PhantomData<fn() -> M>,
    query: Query,
    using: Option<String>,
    /// Whether this queryset should return no results.
    is_none: bool,
    /// Pending update operation fields.
    pending_update: Option<Vec<(&'static str, Value)>>,
    /// Whether this is a delete operation.
    pending_delete: bool,
}

impl<M: Model> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            model: PhantomData,
            query: self.query.clone(),
            using: self.using.clone(),
            is_none: self.is_none,
            pending_update: self.pending_update.clone(),
            pending_delete: self.pending_delete,
        }
    }
}

impl<M: Model> std::fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySet")
            .field("model", &M::meta().label())
            .field("query", &self.query)
            .field("using", &self.using)
            .field("is_none", &self.is_none)
            .finish_non_exhaustive()
    }
}

impl<M: Model> QuerySet<M> {
    fn new(using: Option<String>) -> Self {
        Self {
            model: PhantomData,
            query: Query::new(M::table_name()),
            using,
            is_none: false,
            pending_update: None,
            pending_delete: false,
        }
    }

    /// Returns a reference to the underlying query AST.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the database alias in use.
    pub fn using_db(&self) -> Option<&str> {
        self.using.as_deref()
    }

    /// Forces this queryset to use a specific database alias.
    #[must_use]
    pub fn using(mut self, db: impl Into<String>) -> Self {
        self.using = Some(db.into());
        self
    }

    /// Resolves the connection alias this queryset runs on: the `using`
    /// alias if set, otherwise the routers' choice (the write route for a
    /// pending UPDATE or DELETE).
    pub fn db_alias(&self, routers: &RouterChain) -> String {
        if let Some(ref alias) = self.using {
            return alias.clone();
        }
        if self.pending_update.is_some() || self.pending_delete {
            routers.db_for_write_model::<M>()
        } else {
            routers.db_for_read_model::<M>()
        }
    }

    // ── Filtering methods (lazy) ─────────────────────────────────────

    /// Adds a filter condition.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.query.add_filter(WhereNode::from_q(&q));
        self
    }

    /// Adds an exclusion: the complement of `q` as a whole.
    #[must_use]
    pub fn exclude(mut self, q: Q) -> Self {
        self.query
            .add_filter(WhereNode::Not(Box::new(WhereNode::from_q(&q))));
        self
    }

    /// Adds a raw full-text query. It is not escaped: use
    /// [`sphinx_escape`](super::escape::sphinx_escape) for user input.
    /// Several calls must all match.
    #[must_use]
    pub fn matching(mut self, text: impl Into<String>) -> Self {
        self.query.match_text.push(text.into());
        self
    }

    /// Adds a raw condition to the WHERE clause.
    #[must_use]
    pub fn extra_where(mut self, condition: impl Into<String>) -> Self {
        self.query.extra_where.push(condition.into());
        self
    }

    /// Adds `expr AS alias` to the select list.
    #[must_use]
    pub fn extra_select(mut self, alias: impl Into<String>, expr: impl Into<String>) -> Self {
        self.query.extra_select.push((alias.into(), expr.into()));
        self
    }

    // ── Shaping ──────────────────────────────────────────────────────

    /// Sets the ordering. An empty list removes any ordering, including the
    /// model's default.
    #[must_use]
    pub fn order_by(mut self, fields: Vec<OrderBy>) -> Self {
        self.query.order_by = Some(fields);
        self
    }

    /// Reverses the current (or default) ordering.
    #[must_use]
    pub fn reverse(mut self) -> Self {
        let mut orders = self
            .query
            .order_by
            .take()
            .unwrap_or_else(|| M::meta().ordering.clone());
        for order in orders.iter_mut().filter(|o| !o.is_random()) {
            order.descending = !order.descending;
        }
        self.query.order_by = Some(orders);
        self
    }

    /// Groups results.
    #[must_use]
    pub fn group_by(mut self, group: GroupBy) -> Self {
        self.query.group_by = Some(group);
        self
    }

    /// Sets one `OPTION` entry.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.query.options.set(key, value);
        self
    }

    /// Sets several `OPTION` entries in order.
    #[must_use]
    pub fn options<K, V>(mut self, options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        for (key, value) in options {
            self.query.options.set(key, value);
        }
        self
    }

    /// Selects specific fields (equivalent to `.values()`).
    #[must_use]
    pub fn values(mut self, fields: Vec<&str>) -> Self {
        self.query.select = fields
            .into_iter()
            .map(|f| SelectColumn::Column(f.to_string()))
            .collect();
        self
    }

    /// Leaves fields out of the result; the id is always kept.
    #[must_use]
    pub fn defer(mut self, fields: Vec<&str>) -> Self {
        self.query
            .deferred
            .extend(fields.into_iter().map(str::to_string));
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub fn offset(mut self, n: usize) -> Self {
        self.query.offset = Some(n);
        self
    }

    /// Takes the `[start, end)` window of results.
    #[must_use]
    pub fn slice(mut self, range: Range<usize>) -> Self {
        self.query.offset = Some(range.start);
        self.query.limit = Some(range.end.saturating_sub(range.start));
        self
    }

    /// Returns all objects (identity operation for chaining).
    #[must_use]
    pub fn all(self) -> Self {
        self
    }

    /// Returns an empty queryset.
    #[must_use]
    pub fn none(mut self) -> Self {
        self.is_none = true;
        self
    }

    /// Sets fields for an update operation.
    #[must_use]
    pub fn update(mut self, fields: Vec<(&'static str, Value)>) -> Self {
        self.pending_update = Some(fields);
        self
    }

    /// Marks this queryset for deletion.
    #[must_use]
    pub fn delete(mut self) -> Self {
        self.pending_delete = true;
        self
    }

    // ── SphinxQL generation ──────────────────────────────────────────

    fn compiler() -> SphinxCompiler<'static> {
        SphinxCompiler::new(M::meta())
    }

    /// Compiles the queryset: the pending UPDATE or DELETE if any, else the
    /// SELECT.
    ///
    /// # Errors
    ///
    /// Usage errors from the compiler; [`SphinxError::EmptyResultSet`] when
    /// the queryset can never match (`none()`, `IN ()`, an offset past
    /// `max_matches`).
    pub fn to_sql(&self) -> SphinxResult<String> {
        if self.is_none {
            return Err(SphinxError::EmptyResultSet);
        }
        if let Some(ref fields) = self.pending_update {
            return Self::compiler().compile_update(&self.query, fields);
        }
        if self.pending_delete {
            return Self::compiler().compile_delete(&self.query);
        }
        self.select_sql()
    }

    fn select_sql(&self) -> SphinxResult<String> {
        if self.is_none {
            return Err(SphinxError::EmptyResultSet);
        }
        Self::compiler().compile_select(&self.query)
    }

    /// Compiles a COUNT query.
    pub fn count_sql(&self) -> SphinxResult<String> {
        if self.is_none {
            return Err(SphinxError::EmptyResultSet);
        }
        Self::compiler().compile_count(&self.query)
    }

    /// Compiles the query used by `exists()`.
    pub fn exists_sql(&self) -> SphinxResult<String> {
        let mut qs = self.clone();
        qs.query.select = vec![SelectColumn::Column(M::meta().pk_column().to_string())];
        qs.query.extra_select.clear();
        qs.query.deferred.clear();
        qs.query.order_by = Some(Vec::new());
        qs.query.limit = Some(1);
        qs.select_sql()
    }

    /// Compiles a query to get the first result, ordered by id when no
    /// ordering is set.
    pub fn first_sql(&self) -> SphinxResult<String> {
        let mut qs = self.clone();
        if qs.query.order_by.is_none() && M::meta().ordering.is_empty() {
            qs.query.order_by = Some(vec![OrderBy::asc(M::meta().pk_column())]);
        }
        qs.query.limit = Some(1);
        qs.select_sql()
    }

    /// Compiles a query for `.get()` (fetches two rows to detect duplicates).
    pub fn get_sql(&self) -> SphinxResult<String> {
        let mut qs = self.clone();
        qs.query.limit = Some(2);
        qs.select_sql()
    }

    /// Compiles an aggregate query.
    pub fn aggregate_sql(&self, aggregates: &[(&str, AggregateFunc)]) -> SphinxResult<String> {
        if self.is_none {
            return Err(SphinxError::EmptyResultSet);
        }
        Self::compiler().compile_aggregate(&self.query, aggregates)
    }

    // ── Async execution methods ───────────────────────────────────────

    /// Turns an always-empty compile result into `None`.
    fn ready(sql: SphinxResult<String>) -> SphinxResult<Option<String>> {
        match sql {
            Ok(sql) => Ok(Some(sql)),
            Err(SphinxError::EmptyResultSet) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Executes the query and returns decoded rows keyed by field name.
    pub async fn execute_rows(&self, db: &dyn SearchExecutor) -> SphinxResult<Vec<Row>> {
        let Some(sql) = Self::ready(self.select_sql())? else {
            return Ok(Vec::new());
        };
        let rows = db
            .query(&sql)
            .instrument(query_span(M::table_name()))
            .await?;
        ResultMapper::new(M::meta()).map_rows(&rows)
    }

    /// Executes the query and returns all matching model instances.
    pub async fn execute_query(&self, db: &dyn SearchExecutor) -> SphinxResult<Vec<M>> {
        self.execute_rows(db).await?.iter().map(M::from_row).collect()
    }

    /// Executes the query followed by `SHOW META` on the same session.
    pub async fn execute_with_meta(
        &self,
        db: &dyn SearchExecutor,
    ) -> SphinxResult<QueryResult<M>> {
        let Some(sql) = Self::ready(self.select_sql())? else {
            return Ok(QueryResult {
                items: Vec::new(),
                meta: HashMap::new(),
            });
        };
        let compiler = Self::compiler();
        let (rows, meta_rows) = db
            .query_with_meta(&sql, compiler.compile_show_meta())
            .instrument(query_span(M::table_name()))
            .await?;
        let items = ResultMapper::new(M::meta())
            .map_rows(&rows)?
            .iter()
            .map(M::from_row)
            .collect::<SphinxResult<Vec<_>>>()?;
        Ok(QueryResult {
            items,
            meta: ResultMapper::decode_meta(&meta_rows),
        })
    }

    /// Returns the number of matching documents.
    pub async fn count_exec(&self, db: &dyn SearchExecutor) -> SphinxResult<i64> {
        let Some(sql) = Self::ready(self.count_sql())? else {
            return Ok(0);
        };
        let rows = db
            .query(&sql)
            .instrument(query_span(M::table_name()))
            .await?;
        match rows.first() {
            Some(row) => row.get_by_index::<i64>(0),
            None => Ok(0),
        }
    }

    /// Returns whether any document matches the query.
    pub async fn exists_exec(&self, db: &dyn SearchExecutor) -> SphinxResult<bool> {
        let Some(sql) = Self::ready(self.exists_sql())? else {
            return Ok(false);
        };
        let rows = db
            .query(&sql)
            .instrument(query_span(M::table_name()))
            .await?;
        Ok(!rows.is_empty())
    }

    /// Returns the first matching instance, or `None`.
    pub async fn first_exec(&self, db: &dyn SearchExecutor) -> SphinxResult<Option<M>> {
        let Some(sql) = Self::ready(self.first_sql())? else {
            return Ok(None);
        };
        let rows = db
            .query(&sql)
            .instrument(query_span(M::table_name()))
            .await?;
        rows.first()
            .map(|row| M::from_row(&ResultMapper::new(M::meta()).map_row(row)?))
            .transpose()
    }

    /// Returns a single matching instance.
    ///
    /// Returns `DoesNotExist` if nothing matches, or `MultipleObjectsReturned`
    /// if more than one document matches.
    pub async fn get_exec(&self, db: &dyn SearchExecutor) -> SphinxResult<M> {
        let does_not_exist = || {
            SphinxError::DoesNotExist(format!(
                "{} matching query does not exist.",
                M::meta().label()
            ))
        };
        let Some(sql) = Self::ready(self.get_sql())? else {
            return Err(does_not_exist());
        };
        let rows = db
            .query(&sql)
            .instrument(query_span(M::table_name()))
            .await?;
        match rows.as_slice() {
            [] => Err(does_not_exist()),
            [row] => M::from_row(&ResultMapper::new(M::meta()).map_row(row)?),
            _ => Err(SphinxError::MultipleObjectsReturned(format!(
                "get() returned more than one {}",
                M::meta().label()
            ))),
        }
    }

    /// Runs an aggregate query. The result maps `<field>__<func>` to its
    /// value; an empty queryset maps every alias to `Null`.
    pub async fn aggregate_exec(
        &self,
        db: &dyn SearchExecutor,
        aggregates: &[(&str, AggregateFunc)],
    ) -> SphinxResult<HashMap<String, Value>> {
        let aliases: Vec<String> = aggregates
            .iter()
            .map(|(field, func)| format!("{field}__{}", func.suffix()))
            .collect();
        let row = match Self::ready(self.aggregate_sql(aggregates))? {
            Some(sql) => db
                .query(&sql)
                .instrument(query_span(M::table_name()))
                .await?
                .into_iter()
                .next(),
            None => None,
        };
        Ok(aliases
            .into_iter()
            .map(|alias| {
                let value = row
                    .as_ref()
                    .and_then(|r| r.get_value(&alias).cloned())
                    .unwrap_or(Value::Null);
                (alias, value)
            })
            .collect())
    }

    /// Runs the pending UPDATE and returns the number of documents affected.
    ///
    /// The queryset must have been prepared with `.update(fields)`.
    pub async fn update_exec(&self, db: &dyn SearchExecutor) -> SphinxResult<u64> {
        if self.pending_update.is_none() {
            return Err(SphinxError::InvalidValue(
                "No pending update fields. Call .update(fields) before .update_exec()".to_string(),
            ));
        }
        let Some(sql) = Self::ready(self.to_sql())? else {
            return Ok(0);
        };
        db.execute_sql(&sql)
            .instrument(query_span(M::table_name()))
            .await
    }

    /// Runs the pending DELETE and returns the number of documents affected.
    ///
    /// The queryset must have been prepared with `.delete()`.
    pub async fn delete_exec(&self, db: &dyn SearchExecutor) -> SphinxResult<u64> {
        if !self.pending_delete {
            return Err(SphinxError::InvalidValue(
                "QuerySet is not marked for deletion. Call .delete() before .delete_exec()"
                    .to_string(),
            ));
        }
        let Some(sql) = Self::ready(self.to_sql())? else {
            return Ok(0);
        };
        db.execute_sql(&sql)
            .instrument(query_span(M::table_name()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::fields::{FieldDef, FieldType};
    use crate::model::ModelMeta;
    use crate::query::escape::sphinx_escape;

    struct TestModel {
        id: Option<i64>,
    }

    impl Model for TestModel {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new("testapp", "testmodel")
                    .fields(vec![
                        FieldDef::new("id", FieldType::DocId).primary_key(),
                        FieldDef::new("sphinx_field", FieldType::Field),
                        FieldDef::new("attr_uint", FieldType::Uint),
                        FieldDef::new("attr_float", FieldType::Float),
                        FieldDef::new("attr_multi", FieldType::Multi),
                        FieldDef::new("attr_string", FieldType::String),
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
            vec![("id", Value::from(self.id))]
        }

        fn from_row(row: &Row) -> SphinxResult<Self> {
            Ok(Self { id: row.get("id")? })
        }
    }

    fn objects() -> Manager<TestModel> {
        Manager::new()
    }

    fn q(key: &str, value: impl Into<Value>) -> Q {
        Q::lookup(key, value).unwrap()
    }

    #[test]
    fn test_manager_all() {
        assert_eq!(
            objects().all().to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel`"
        );
    }

    #[test]
    fn test_manager_shortcuts() {
        assert_eq!(
            objects()
                .group_by(GroupBy::new("attr_uint").group_limit(1))
                .to_sql()
                .unwrap(),
            "SELECT * FROM `testapp_testmodel` GROUP 1 BY attr_uint"
        );
        assert_eq!(
            objects()
                .extra_select("const", "0")
                .extra_where("const = 0")
                .to_sql()
                .unwrap(),
            objects()
                .all()
                .extra_select("const", "0")
                .extra_where("const = 0")
                .to_sql()
                .unwrap()
        );
        assert_eq!(
            objects().option("ranker", "none").slice(0..3).to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` LIMIT 3 OPTION ranker=none"
        );
        assert_eq!(
            objects().values(vec!["attr_uint"]).to_sql().unwrap(),
            objects().all().values(vec!["attr_uint"]).to_sql().unwrap()
        );
    }

    #[test]
    fn test_db_alias_follows_routing() {
        let mut routers = RouterChain::new();
        routers.add_router(Box::new(crate::router::SphinxRouter::new("search")));
        assert_eq!(objects().all().db_alias(&routers), "search");
        assert_eq!(objects().all().delete().db_alias(&routers), "search");
        assert_eq!(objects().using("other").all().db_alias(&routers), "other");
        assert_eq!(
            objects().filter(q("attr_uint", 1)).using("replica").db_alias(&routers),
            "replica"
        );
        assert_eq!(objects().all().db_alias(&RouterChain::new()), "default");
    }

    #[test]
    fn test_filter_and_exclude_chain() {
        let qs = objects()
            .filter(q("attr_uint__gte", 1))
            .exclude(q("attr_multi__in", vec![1_i64, 2]))
            .filter(q("attr_string", "x"));
        assert_eq!(
            qs.to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` WHERE attr_uint >= 1 \
             AND ALL(attr_multi) NOT IN (1, 2) AND attr_string = 'x'"
        );
    }

    #[test]
    fn test_matching_is_conjunctive() {
        let qs = objects()
            .matching(sphinx_escape("a-b"))
            .matching("@sphinx_field c")
            .filter(q("attr_uint", 1));
        assert_eq!(
            qs.to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` \
             WHERE MATCH('(a\\\\-b) (@sphinx_field c)') AND attr_uint = 1"
        );
    }

    #[test]
    fn test_querysets_are_values() {
        let base = objects().filter(q("attr_uint", 1));
        let narrowed = base.clone().filter(q("attr_float__lt", 2.5));
        assert_eq!(
            base.to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` WHERE attr_uint = 1"
        );
        assert_eq!(
            narrowed.to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` WHERE attr_uint = 1 AND attr_float < 2.5"
        );
    }

    #[test]
    fn test_reverse_and_clear_ordering() {
        let qs = objects()
            .order_by(vec!["-attr_uint".into(), OrderBy::random()])
            .reverse();
        assert_eq!(
            qs.to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` ORDER BY attr_uint ASC, RAND()"
        );
        assert_eq!(
            qs.order_by(vec![]).to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel`"
        );
    }

    #[test]
    fn test_slice() {
        assert_eq!(
            objects().all().slice(5..15).to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` LIMIT 5, 10"
        );
        assert_eq!(
            objects().all().slice(0..2).to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` LIMIT 2"
        );
        assert!(matches!(
            objects().all().slice(3..3).to_sql(),
            Err(SphinxError::EmptyResultSet)
        ));
    }

    #[test]
    fn test_options() {
        let qs = objects().all().options([
            ("ranker", OptionValue::expr("sum(lcs*user_weight)*1000+bm25")),
            (
                "field_weights",
                OptionValue::weights([("sphinx_field", 3), ("other_field", 2)]),
            ),
        ]);
        assert_eq!(
            qs.option("sort_method", "kbuffer").to_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` OPTION \
             ranker=expr('sum(lcs*user_weight)*1000+bm25'), \
             field_weights=(sphinx_field=3, other_field=2), sort_method=kbuffer"
        );
    }

    #[test]
    fn test_values_defer_and_extra() {
        assert_eq!(
            objects().all().values(vec!["id", "attr_uint"]).to_sql().unwrap(),
            "SELECT id, attr_uint FROM `testapp_testmodel`"
        );
        assert_eq!(
            objects()
                .all()
                .defer(vec!["sphinx_field", "attr_string"])
                .to_sql()
                .unwrap(),
            "SELECT id, attr_uint, attr_float, attr_multi FROM `testapp_testmodel`"
        );
        assert_eq!(
            objects()
                .all()
                .extra_select("const", "0")
                .extra_where("const=0")
                .to_sql()
                .unwrap(),
            "SELECT *, 0 AS const FROM `testapp_testmodel` WHERE const=0"
        );
    }

    #[test]
    fn test_terminal_sql() {
        let qs = objects().filter(q("attr_uint", 1));
        assert_eq!(
            qs.count_sql().unwrap(),
            "SELECT COUNT(*) FROM `testapp_testmodel` WHERE attr_uint = 1"
        );
        assert_eq!(
            qs.exists_sql().unwrap(),
            "SELECT id FROM `testapp_testmodel` WHERE attr_uint = 1 LIMIT 1"
        );
        assert_eq!(
            qs.first_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` WHERE attr_uint = 1 ORDER BY id ASC LIMIT 1"
        );
        assert_eq!(
            qs.get_sql().unwrap(),
            "SELECT * FROM `testapp_testmodel` WHERE attr_uint = 1 LIMIT 2"
        );
        assert_eq!(
            qs.aggregate_sql(&[("attr_float", AggregateFunc::Avg)]).unwrap(),
            "SELECT AVG(attr_float) AS attr_float__avg FROM `testapp_testmodel` \
             WHERE attr_uint = 1"
        );
    }

    #[test]
    fn test_update_and_delete_sql() {
        let qs = objects().filter(q("attr_uint", 1));
        assert_eq!(
            qs.clone()
                .update(vec![("attr_float", Value::Float(0.5))])
                .to_sql()
                .unwrap(),
            "UPDATE `testapp_testmodel` SET attr_float=0.5 WHERE attr_uint = 1"
        );
        assert_eq!(
            qs.delete().to_sql().unwrap(),
            "DELETE FROM `testapp_testmodel` WHERE attr_uint = 1"
        );
        assert!(matches!(
            objects()
                .all()
                .update(vec![("attr_string", Value::from("x"))])
                .to_sql(),
            Err(SphinxError::FieldError(_))
        ));
    }

    #[test]
    fn test_none() {
        let qs = objects().none();
        assert!(matches!(qs.to_sql(), Err(SphinxError::EmptyResultSet)));
        assert!(matches!(qs.count_sql(), Err(SphinxError::EmptyResultSet)));
    }

    #[test]
    fn test_using() {
        let qs = objects().using("sphinx").all();
        assert_eq!(qs.using_db(), Some("sphinx"));
        assert_eq!(objects().all().using_db(), None);
    }

    #[test]
    fn test_usage_errors_before_execution() {
        assert!(matches!(
            objects().filter(q("nope", 1)).to_sql(),
            Err(SphinxError::FieldError(_))
        ));
        assert!(matches!(
            objects().filter(q("attr_float__in", vec![1_i64])).to_sql(),
            Err(SphinxError::UnsupportedLookup(_))
        ));
    }
}
