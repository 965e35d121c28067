//! SphinxQL query AST and compiler.
//!
//! This module defines the [`Query`] AST built by a queryset and the
//! [`SphinxCompiler`] that renders it as SphinxQL text. searchd speaks the
//! MySQL text protocol only, so every literal is escaped and embedded in the
//! statement; there are no bound parameters.
//!
//! Filters are split in two while compiling. Conditions on full-text fields
//! become one `MATCH('...')` expression; conditions on attributes become the
//! ordinary `WHERE` conjuncts. Negation is pushed down to the leaves first,
//! so each leaf renders its own complement and no `NOT (...)` reaches the
//! daemon.

use sphinxql_core::settings::{DEFAULT_MAX_MATCHES, SETTINGS};
use sphinxql_core::{SphinxError, SphinxResult};

use super::escape::{quote_string, sphinx_escape};
use super::lookups::{Lookup, Q};
use super::options::QueryOptions;
use crate::fields::FieldType;
use crate::model::ModelMeta;
use crate::value::Value;

/// A column ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The field, alias or expression to order by. `?` means random order.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Creates a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// Creates a random order (`ORDER BY RAND()`).
    pub fn random() -> Self {
        Self::asc("?")
    }

    /// Parses `"field"`, `"-field"` or `"?"`.
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(column) => Self::desc(column),
            None => Self::asc(spec),
        }
    }

    /// Returns `true` for the random order.
    pub fn is_random(&self) -> bool {
        self.column == "?"
    }
}

impl From<&str> for OrderBy {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

/// A `GROUP [N] BY ... [WITHIN GROUP ORDER BY ...]` specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    /// The grouped fields or aliases.
    pub columns: Vec<String>,
    /// How many rows to keep per group (`GROUP N BY`).
    pub group_limit: Option<usize>,
    /// Which rows of a group are kept (`WITHIN GROUP ORDER BY`).
    pub group_order_by: Option<OrderBy>,
}

impl GroupBy {
    /// Groups by one field.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            columns: vec![column.into()],
            group_limit: None,
            group_order_by: None,
        }
    }

    /// Adds another grouped field.
    #[must_use]
    pub fn and(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Keeps up to `n` rows per group.
    #[must_use]
    pub const fn group_limit(mut self, n: usize) -> Self {
        self.group_limit = Some(n);
        self
    }

    /// Orders rows inside each group, e.g. `"-attr_float"`.
    #[must_use]
    pub fn group_order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.group_order_by = Some(order.into());
        self
    }
}

/// A column to select in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumn {
    /// All columns (`*`).
    Star,
    /// A model field, resolved to its index column.
    Column(String),
    /// A SphinxQL expression with an optional alias.
    Expression {
        /// The expression text, written verbatim.
        expr: String,
        /// The `AS` alias.
        alias: Option<String>,
    },
}

/// A WHERE clause node in the query AST.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    /// A single condition.
    Condition {
        /// The field name.
        field: String,
        /// The lookup type.
        lookup: Lookup,
    },
    /// Logical AND of conditions.
    And(Vec<WhereNode>),
    /// Logical OR of conditions.
    Or(Vec<WhereNode>),
    /// Logical NOT of a condition.
    Not(Box<WhereNode>),
}

impl WhereNode {
    /// Converts a `Q` object into a `WhereNode`.
    pub fn from_q(q: &Q) -> Self {
        match q {
            Q::Filter { field, lookup } => Self::Condition {
                field: field.clone(),
                lookup: lookup.clone(),
            },
            Q::And(children) => Self::And(children.iter().map(Self::from_q).collect()),
            Q::Or(children) => Self::Or(children.iter().map(Self::from_q).collect()),
            Q::Not(inner) => Self::Not(Box::new(Self::from_q(inner))),
        }
    }
}

/// The complete query AST representing a SphinxQL SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// The index name.
    pub index: String,
    /// Columns to select.
    pub select: Vec<SelectColumn>,
    /// Attribute and full-text filters.
    pub where_clause: Option<WhereNode>,
    /// Raw full-text queries; several are conjunctive.
    pub match_text: Vec<String>,
    /// Raw conditions appended to WHERE.
    pub extra_where: Vec<String>,
    /// Extra `expr AS alias` select items, as `(alias, expr)`.
    pub extra_select: Vec<(String, String)>,
    /// Fields left out of `SELECT *`.
    pub deferred: Vec<String>,
    /// GROUP BY specification.
    pub group_by: Option<GroupBy>,
    /// ORDER BY clauses. `None` falls back to the model's ordering.
    pub order_by: Option<Vec<OrderBy>>,
    /// LIMIT.
    pub limit: Option<usize>,
    /// OFFSET.
    pub offset: Option<usize>,
    /// The OPTION clause.
    pub options: QueryOptions,
}

impl Query {
    /// Creates a new query for the given index.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            select: vec![SelectColumn::Star],
            where_clause: None,
            match_text: Vec::new(),
            extra_where: Vec::new(),
            extra_select: Vec::new(),
            deferred: Vec::new(),
            group_by: None,
            order_by: None,
            limit: None,
            offset: None,
            options: QueryOptions::new(),
        }
    }

    /// ANDs `node` onto the current filter.
    pub fn add_filter(&mut self, node: WhereNode) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(WhereNode::And(mut existing)) => {
                existing.push(node);
                WhereNode::And(existing)
            }
            Some(existing) => WhereNode::And(vec![existing, node]),
            None => node,
        });
    }
}

/// A result row: column names and their values.
///
/// `Row` provides typed access via the [`get`](Row::get) method.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning `(column, value)` pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        self.columns.into_iter().zip(self.values)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::FieldError`] if the column does not exist and
    /// [`SphinxError::InvalidValue`] if the value cannot be converted.
    pub fn get<T: FromValue>(&self, column: &str) -> SphinxResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            SphinxError::FieldError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Gets a typed value by column name, or `None` if the column is absent.
    ///
    /// Useful for deferred fields.
    ///
    /// # Errors
    ///
    /// Returns [`SphinxError::InvalidValue`] if the value cannot be converted.
    pub fn try_get<T: FromValue>(&self, column: &str) -> SphinxResult<Option<T>> {
        self.get_value(column).map(T::from_value).transpose()
    }

    /// Gets a typed value by column index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds or the value cannot be
    /// converted to the requested type.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> SphinxResult<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            SphinxError::FieldError(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw Value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> SphinxResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> SphinxError {
    SphinxError::InvalidValue(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(Self::from(*b)),
            Value::String(s) => s.trim().parse().map_err(|_| mismatch("Int", value)),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        let i = i64::from_value(value)?;
        Self::try_from(i)
            .map_err(|e| SphinxError::InvalidValue(format!("Int value out of i32 range: {e}")))
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        let i = i64::from_value(value)?;
        Self::try_from(i)
            .map_err(|e| SphinxError::InvalidValue(format!("Int value out of u32 range: {e}")))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::String(s) => s.trim().parse().map_err(|_| mismatch("Float", value)),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::String(s) if s == "0" || s == "1" => Ok(s == "1"),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Int(_) | Value::Float(_) => Ok(value.to_string()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::List(_) => value.as_int_list().ok_or_else(|| mismatch("integer list", value)),
            Value::String(_) => match FieldType::Multi64.decode(value)? {
                Value::List(items) => items.iter().map(i64::from_value).collect(),
                other => Err(mismatch("integer list", &other)),
            },
            _ => Err(mismatch("integer list", value)),
        }
    }
}

impl FromValue for chrono::NaiveDateTime {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Int(_) | Value::String(_) => match FieldType::Timestamp.decode(value)? {
                Value::DateTime(dt) => Ok(dt),
                other => Err(mismatch("DateTime", &other)),
            },
            _ => Err(mismatch("DateTime", value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::String(s) => Ok(serde_json::from_str(s)?),
            _ => Err(mismatch("Json", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> SphinxResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

/// Aggregate functions available to `aggregate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    /// `SUM(col)`.
    Sum,
    /// `AVG(col)`.
    Avg,
    /// `MIN(col)`.
    Min,
    /// `MAX(col)`.
    Max,
    /// `COUNT(col)`.
    Count,
}

impl AggregateFunc {
    /// Returns the SphinxQL function name.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
        }
    }

    /// Returns the alias suffix, e.g. `sum` in `attr_uint__sum`.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

/// A filter after negation push-down.
#[derive(Debug, Clone, PartialEq)]
enum Cond {
    Const(bool),
    Attr(String),
    Text(String),
    And(Vec<Cond>),
    Or(Vec<Cond>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CondKind {
    Attr,
    Text,
    Mixed,
}

impl Cond {
    fn kind(&self) -> CondKind {
        match self {
            Self::Const(_) | Self::Attr(_) => CondKind::Attr,
            Self::Text(_) => CondKind::Text,
            Self::And(children) | Self::Or(children) => {
                let mut kinds = children.iter().map(Self::kind);
                let first = kinds.next().unwrap_or(CondKind::Attr);
                if kinds.all(|k| k == first) {
                    first
                } else {
                    CondKind::Mixed
                }
            }
        }
    }

    /// Folds constants and flattens nested AND/OR.
    fn simplify(self) -> Self {
        match self {
            Self::And(children) => {
                let mut out = Vec::with_capacity(children.len());
                for child in children {
                    match child.simplify() {
                        Self::Const(true) => {}
                        Self::Const(false) => return Self::Const(false),
                        Self::And(inner) => out.extend(inner),
                        other => out.push(other),
                    }
                }
                collapse(out, true, Self::And)
            }
            Self::Or(children) => {
                let mut out = Vec::with_capacity(children.len());
                for child in children {
                    match child.simplify() {
                        Self::Const(false) => {}
                        Self::Const(true) => return Self::Const(true),
                        Self::Or(inner) => out.extend(inner),
                        other => out.push(other),
                    }
                }
                collapse(out, false, Self::Or)
            }
            leaf => leaf,
        }
    }

    fn render_attr(&self) -> String {
        match self {
            Self::Const(true) => "1=1".to_string(),
            Self::Const(false) => "1=0".to_string(),
            Self::Attr(sql) | Self::Text(sql) => sql.clone(),
            Self::And(children) => join_nested(children, " AND ", Self::render_attr),
            Self::Or(children) => join_nested(children, " OR ", Self::render_attr),
        }
    }

    /// Whether a full-text condition selects documents on its own. searchd
    /// rejects a match made only of NOT terms, and a NOT inside an OR.
    fn has_positive_term(&self) -> bool {
        match self {
            Self::Const(_) | Self::Attr(_) => false,
            Self::Text(text) => !text.starts_with('-'),
            Self::And(children) => children.iter().any(Self::has_positive_term),
            Self::Or(children) => children.iter().all(Self::has_positive_term),
        }
    }

    fn render_text(&self) -> String {
        match self {
            Self::Const(_) => String::new(),
            Self::Attr(text) | Self::Text(text) => text.clone(),
            Self::And(children) => join_nested(children, " ", Self::render_text),
            Self::Or(children) => join_nested(children, " | ", Self::render_text),
        }
    }
}

fn collapse(mut items: Vec<Cond>, empty: bool, wrap: fn(Vec<Cond>) -> Cond) -> Cond {
    match items.len() {
        0 => Cond::Const(empty),
        1 => items.remove(0),
        _ => wrap(items),
    }
}

fn join_nested(children: &[Cond], sep: &str, render: fn(&Cond) -> String) -> String {
    let parts: Vec<String> = children.iter().map(render).collect();
    format!("({})", parts.join(sep))
}

/// Renders a [`Query`] for one model as SphinxQL.
///
/// # Examples
///
/// ```
/// use sphinxql_db::fields::{FieldDef, FieldType};
/// use sphinxql_db::model::ModelMeta;
/// use sphinxql_db::query::compiler::{Query, SphinxCompiler, WhereNode};
/// use sphinxql_db::query::lookups::Q;
///
/// let meta = ModelMeta::new("testapp", "testmodel").fields(vec![
///     FieldDef::new("id", FieldType::DocId).primary_key(),
///     FieldDef::new("attr_uint", FieldType::Uint),
/// ]);
/// let mut query = Query::new(&meta.db_table);
/// query.add_filter(WhereNode::from_q(&Q::lookup("attr_uint", 100_500).unwrap()));
///
/// let sql = SphinxCompiler::new(&meta).compile_select(&query).unwrap();
/// assert_eq!(sql, "SELECT * FROM `testapp_testmodel` WHERE attr_uint = 100500");
/// ```
pub struct SphinxCompiler<'a> {
    meta: &'a ModelMeta,
    max_matches: usize,
}

impl<'a> SphinxCompiler<'a> {
    /// Creates a compiler for `meta`, taking the default `max_matches` from
    /// the global settings when they are configured.
    pub fn new(meta: &'a ModelMeta) -> Self {
        let max_matches = SETTINGS
            .try_get()
            .map_or(DEFAULT_MAX_MATCHES, |s| s.max_matches);
        Self { meta, max_matches }
    }

    /// Overrides the default `max_matches` window.
    #[must_use]
    pub const fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    /// The statement that reads the statistics of the previous query.
    pub const fn compile_show_meta(&self) -> &'static str {
        "SHOW META"
    }

    /// Compiles a SELECT.
    ///
    /// # Errors
    ///
    /// Usage errors for unknown fields, unsupported lookups and bad values;
    /// [`SphinxError::EmptyResultSet`] when the query can never return a row.
    pub fn compile_select(&self, query: &Query) -> SphinxResult<String> {
        let mut sql = format!(
            "SELECT {} FROM `{}`",
            self.select_list(query)?,
            query.index
        );
        sql.push_str(&self.where_sql(query)?);
        if let Some(ref group) = query.group_by {
            sql.push_str(&self.group_sql(query, group)?);
        }
        sql.push_str(&self.order_sql(query)?);
        if let Some(limit) = self.limit_sql(query)? {
            sql.push(' ');
            sql.push_str(&limit);
        }
        if let Some(options) = query.options.to_sql()? {
            sql.push(' ');
            sql.push_str(&options);
        }
        Ok(sql)
    }

    /// Compiles a `COUNT(*)` (or `COUNT(DISTINCT col)` for a grouped query).
    ///
    /// # Errors
    ///
    /// As [`compile_select`](Self::compile_select); grouping by more than one
    /// column is [`SphinxError::UnsupportedLookup`].
    pub fn compile_count(&self, query: &Query) -> SphinxResult<String> {
        let expr = match query.group_by.as_ref().map(|g| g.columns.as_slice()) {
            None | Some([]) => "COUNT(*)".to_string(),
            Some([column]) => format!("COUNT(DISTINCT {})", self.resolve_column(query, column)?),
            Some(_) => {
                return Err(SphinxError::UnsupportedLookup(
                    "count() of a query grouped by several columns".to_string(),
                ))
            }
        };
        let mut count_query = query.clone();
        count_query.select = vec![SelectColumn::Expression { expr, alias: None }];
        count_query.deferred.clear();
        count_query.group_by = None;
        count_query.order_by = Some(Vec::new());
        count_query.limit = None;
        count_query.offset = None;
        self.compile_select(&count_query)
    }

    /// Compiles an aggregate query; each result column is named
    /// `<field>__<func>`.
    ///
    /// # Errors
    ///
    /// As [`compile_select`](Self::compile_select); aggregating a full-text
    /// field is [`SphinxError::UnsupportedLookup`].
    pub fn compile_aggregate(
        &self,
        query: &Query,
        aggregates: &[(&str, AggregateFunc)],
    ) -> SphinxResult<String> {
        if aggregates.is_empty() {
            return Err(SphinxError::InvalidValue(
                "aggregate() needs at least one aggregate".to_string(),
            ));
        }
        let select = aggregates
            .iter()
            .map(|(field, func)| {
                let (column, field_type) = self.filter_field(field)?;
                if field_type.is_full_text() {
                    return Err(SphinxError::UnsupportedLookup(format!(
                        "cannot aggregate full-text field '{field}'"
                    )));
                }
                Ok(SelectColumn::Expression {
                    expr: format!("{}({column})", func.sql_name()),
                    alias: Some(format!("{field}__{}", func.suffix())),
                })
            })
            .collect::<SphinxResult<Vec<_>>>()?;
        let mut agg_query = query.clone();
        agg_query.select = select;
        agg_query.deferred.clear();
        agg_query.group_by = None;
        agg_query.order_by = Some(Vec::new());
        agg_query.limit = None;
        agg_query.offset = None;
        self.compile_select(&agg_query)
    }

    /// Compiles an in-place `UPDATE` of attribute values.
    ///
    /// Without a filter every document is updated (`WHERE id > 0`).
    ///
    /// # Errors
    ///
    /// [`SphinxError::FieldError`] for unknown fields and for fields that
    /// cannot be updated in place (strings, JSON, full-text, the id).
    pub fn compile_update(&self, query: &Query, fields: &[(&str, Value)]) -> SphinxResult<String> {
        if fields.is_empty() {
            return Err(SphinxError::InvalidValue(
                "update() needs at least one field".to_string(),
            ));
        }
        let sets = fields
            .iter()
            .map(|(name, value)| {
                let field = self.model_field(name)?;
                if !field.is_updatable() {
                    return Err(SphinxError::FieldError(format!(
                        "'{name}' ({:?}) cannot be updated in place",
                        field.field_type
                    )));
                }
                Ok(format!(
                    "{}={}",
                    field.column,
                    field.field_type.to_storage_literal(value)?
                ))
            })
            .collect::<SphinxResult<Vec<_>>>()?;
        Ok(format!(
            "UPDATE `{}` SET {} WHERE {}",
            query.index,
            sets.join(", "),
            self.mutation_where(query)?
        ))
    }

    /// Compiles a `DELETE`. Without a filter every document is deleted.
    ///
    /// # Errors
    ///
    /// As [`compile_select`](Self::compile_select).
    pub fn compile_delete(&self, query: &Query) -> SphinxResult<String> {
        Ok(format!(
            "DELETE FROM `{}` WHERE {}",
            query.index,
            self.mutation_where(query)?
        ))
    }

    /// Compiles an `INSERT` (or `REPLACE`) of one document.
    ///
    /// A `Null` document id is left out so the daemon assigns one.
    ///
    /// # Errors
    ///
    /// [`SphinxError::FieldError`] for unknown fields and
    /// [`SphinxError::InvalidValue`] for values the column cannot store.
    pub fn compile_insert(
        &self,
        index: &str,
        fields: &[(&str, Value)],
        replace: bool,
    ) -> SphinxResult<String> {
        let mut columns = Vec::with_capacity(fields.len());
        let mut values = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let (column, field_type) = self.filter_field(name)?;
            if field_type == FieldType::DocId && value.is_null() {
                continue;
            }
            columns.push(column);
            values.push(field_type.to_storage_literal(value)?);
        }
        let verb = if replace { "REPLACE" } else { "INSERT" };
        Ok(format!(
            "{verb} INTO `{index}` ({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        ))
    }

    // ── Fields and columns ───────────────────────────────────────────

    fn model_field(&self, name: &str) -> SphinxResult<&crate::fields::FieldDef> {
        self.meta.get_field(name).ok_or_else(|| {
            SphinxError::FieldError(format!(
                "Cannot resolve keyword '{name}' into field of {}",
                self.meta.label()
            ))
        })
    }

    /// Resolves a filter target to its column and type. `id` and `pk` are
    /// always available, declared or not.
    fn filter_field(&self, name: &str) -> SphinxResult<(String, FieldType)> {
        match self.model_field(name) {
            Ok(field) => Ok((field.column.clone(), field.field_type)),
            Err(_) if name == "pk" || name == "id" => {
                Ok((self.meta.pk_column().to_string(), FieldType::DocId))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves a select, group or order target: a field, `id`/`pk`, or an
    /// extra select alias.
    fn resolve_column(&self, query: &Query, name: &str) -> SphinxResult<String> {
        if query.extra_select.iter().any(|(alias, _)| alias == name) {
            return Ok(name.to_string());
        }
        self.filter_field(name).map(|(column, _)| column)
    }

    fn order_term(&self, query: &Query, order: &OrderBy) -> SphinxResult<String> {
        if order.is_random() {
            return Ok("RAND()".to_string());
        }
        let column = if order.column.contains('(') {
            order.column.clone()
        } else {
            self.resolve_column(query, &order.column)?
        };
        let dir = if order.descending { "DESC" } else { "ASC" };
        Ok(format!("{column} {dir}"))
    }

    // ── Clauses ──────────────────────────────────────────────────────

    fn select_list(&self, query: &Query) -> SphinxResult<String> {
        let mut parts = Vec::new();
        let star_only = query.select.iter().all(|c| *c == SelectColumn::Star);
        if star_only && !query.deferred.is_empty() {
            for name in &query.deferred {
                self.model_field(name)?;
            }
            for field in &self.meta.fields {
                let deferred = query
                    .deferred
                    .iter()
                    .any(|d| d == field.name || *d == field.column);
                if field.primary_key || !deferred {
                    parts.push(field.column.clone());
                }
            }
        } else {
            for column in &query.select {
                parts.push(match column {
                    SelectColumn::Star => "*".to_string(),
                    SelectColumn::Column(name) => self.resolve_column(query, name)?,
                    SelectColumn::Expression { expr, alias: None } => expr.clone(),
                    SelectColumn::Expression {
                        expr,
                        alias: Some(alias),
                    } => format!("{expr} AS {alias}"),
                });
            }
        }
        for (alias, expr) in &query.extra_select {
            parts.push(format!("{expr} AS {alias}"));
        }
        if parts.is_empty() {
            parts.push("*".to_string());
        }
        Ok(parts.join(", "))
    }

    fn where_sql(&self, query: &Query) -> SphinxResult<String> {
        let parts = self.where_parts(query)?;
        if parts.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", parts.join(" AND ")))
        }
    }

    fn mutation_where(&self, query: &Query) -> SphinxResult<String> {
        let parts = self.where_parts(query)?;
        if parts.is_empty() {
            Ok(format!("{} > 0", self.meta.pk_column()))
        } else {
            Ok(parts.join(" AND "))
        }
    }

    /// The WHERE conjuncts: `MATCH(...)` first, then attribute conditions,
    /// then raw extra conditions.
    fn where_parts(&self, query: &Query) -> SphinxResult<Vec<String>> {
        let (text, attrs) = self.filter_parts(query)?;

        let raw: Vec<&str> = query
            .match_text
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let several = raw.len() + text.len() > 1;
        let mut match_parts: Vec<String> = raw
            .into_iter()
            .map(|t| if several { format!("({t})") } else { t.to_string() })
            .collect();
        match_parts.extend(text);

        let mut parts = Vec::new();
        if !match_parts.is_empty() {
            parts.push(format!("MATCH({})", quote_string(&match_parts.join(" "))));
        }
        parts.extend(attrs);
        parts.extend(query.extra_where.iter().cloned());
        Ok(parts)
    }

    /// Splits the filter into full-text parts and attribute conjuncts.
    fn filter_parts(&self, query: &Query) -> SphinxResult<(Vec<String>, Vec<String>)> {
        let mut text = Vec::new();
        let mut attrs = Vec::new();
        let Some(ref node) = query.where_clause else {
            return Ok((text, attrs));
        };
        let conjuncts = match self.normalize(node, false)?.simplify() {
            Cond::Const(false) => return Err(SphinxError::EmptyResultSet),
            Cond::Const(true) => Vec::new(),
            Cond::And(children) => children,
            other => vec![other],
        };
        let mut positive = query.match_text.iter().any(|t| !t.trim().is_empty());
        for cond in conjuncts {
            match cond.kind() {
                CondKind::Text => {
                    if matches!(cond, Cond::Or(_)) && !cond.has_positive_term() {
                        return Err(SphinxError::UnsupportedLookup(
                            "negated full-text conditions cannot be combined with OR"
                                .to_string(),
                        ));
                    }
                    positive |= cond.has_positive_term();
                    text.push(cond.render_text());
                }
                CondKind::Attr => attrs.push(cond.render_attr()),
                CondKind::Mixed => {
                    return Err(SphinxError::UnsupportedLookup(
                        "full-text and attribute conditions cannot be combined with OR"
                            .to_string(),
                    ))
                }
            }
        }
        if !text.is_empty() && !positive {
            return Err(SphinxError::UnsupportedLookup(
                "excluding full-text conditions needs a positive match; add matching() terms"
                    .to_string(),
            ));
        }
        Ok((text, attrs))
    }

    fn group_sql(&self, query: &Query, group: &GroupBy) -> SphinxResult<String> {
        let columns = group
            .columns
            .iter()
            .map(|c| self.resolve_column(query, c))
            .collect::<SphinxResult<Vec<_>>>()?;
        let mut sql = match group.group_limit {
            Some(n) => format!(" GROUP {n} BY {}", columns.join(", ")),
            None => format!(" GROUP BY {}", columns.join(", ")),
        };
        if let Some(ref order) = group.group_order_by {
            sql.push_str(" WITHIN GROUP ORDER BY ");
            sql.push_str(&self.order_term(query, order)?);
        }
        Ok(sql)
    }

    fn order_sql(&self, query: &Query) -> SphinxResult<String> {
        let orders = query.order_by.as_ref().unwrap_or(&self.meta.ordering);
        if orders.is_empty() {
            return Ok(String::new());
        }
        let terms = orders
            .iter()
            .map(|o| self.order_term(query, o))
            .collect::<SphinxResult<Vec<_>>>()?;
        Ok(format!(" ORDER BY {}", terms.join(", ")))
    }

    /// `LIMIT` is always explicit: an offset alone reads up to the end of the
    /// `max_matches` window.
    fn limit_sql(&self, query: &Query) -> SphinxResult<Option<String>> {
        let offset = query.offset.unwrap_or(0);
        match query.limit {
            Some(0) => Err(SphinxError::EmptyResultSet),
            Some(n) if offset == 0 => Ok(Some(format!("LIMIT {n}"))),
            Some(n) => Ok(Some(format!("LIMIT {offset}, {n}"))),
            None if offset == 0 => Ok(None),
            None => {
                let max = query.options.max_matches().unwrap_or(self.max_matches);
                if offset >= max {
                    return Err(SphinxError::EmptyResultSet);
                }
                Ok(Some(format!("LIMIT {offset}, {}", max - offset)))
            }
        }
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// Pushes negation to the leaves (De Morgan).
    fn normalize(&self, node: &WhereNode, negated: bool) -> SphinxResult<Cond> {
        match node {
            WhereNode::Condition { field, lookup } => self.leaf(field, lookup, negated),
            WhereNode::And(children) => {
                let conds = children
                    .iter()
                    .map(|c| self.normalize(c, negated))
                    .collect::<SphinxResult<Vec<_>>>()?;
                Ok(if negated { Cond::Or(conds) } else { Cond::And(conds) })
            }
            WhereNode::Or(children) => {
                let conds = children
                    .iter()
                    .map(|c| self.normalize(c, negated))
                    .collect::<SphinxResult<Vec<_>>>()?;
                Ok(if negated { Cond::And(conds) } else { Cond::Or(conds) })
            }
            WhereNode::Not(inner) => self.normalize(inner, !negated),
        }
    }

    fn leaf(&self, name: &str, lookup: &Lookup, negated: bool) -> SphinxResult<Cond> {
        let (column, field_type) = self.filter_field(name)?;
        if !field_type.supports(lookup) {
            return Err(SphinxError::UnsupportedLookup(format!(
                "'{}' lookup is not supported on {field_type:?} field '{name}'",
                lookup.name()
            )));
        }
        if field_type.is_full_text() {
            text_leaf(&column, lookup, negated)
        } else {
            attr_leaf(&column, field_type, lookup, negated)
        }
    }
}

fn text_leaf(column: &str, lookup: &Lookup, negated: bool) -> SphinxResult<Cond> {
    let sign = if negated { "-" } else { "" };
    let phrase = |value: &Value| -> SphinxResult<String> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => value.to_string(),
            other => {
                return Err(SphinxError::InvalidValue(format!(
                    "{other:?} cannot be matched against full-text field '{column}'"
                )))
            }
        };
        Ok(format!("{sign}(@{column} \"^{}$\")", sphinx_escape(&text)))
    };
    match lookup {
        Lookup::Search(text) => Ok(Cond::Text(format!(
            "{sign}(@{column} {})",
            sphinx_escape(text)
        ))),
        Lookup::Exact(value) => Ok(Cond::Text(phrase(value)?)),
        Lookup::In(values) if values.is_empty() => Ok(Cond::Const(negated)),
        Lookup::In(values) => {
            let leaves = values
                .iter()
                .map(|v| phrase(v).map(Cond::Text))
                .collect::<SphinxResult<Vec<_>>>()?;
            Ok(if negated { Cond::And(leaves) } else { Cond::Or(leaves) })
        }
        other => Err(SphinxError::UnsupportedLookup(format!(
            "'{}' lookup is not supported on full-text field '{column}'",
            other.name()
        ))),
    }
}

/// Renders an attribute leaf, already complemented when `negated`.
///
/// A plain comparison on a multi-valued attribute is true when any element
/// matches; its complement must hold for all elements, hence `ALL(col)`.
fn attr_leaf(
    column: &str,
    field_type: FieldType,
    lookup: &Lookup,
    negated: bool,
) -> SphinxResult<Cond> {
    let target = if negated && field_type.is_multi() {
        format!("ALL({column})")
    } else {
        column.to_string()
    };
    let compare = |op: &str, neg_op: &str, value: &Value| -> SphinxResult<Cond> {
        let op = if negated { neg_op } else { op };
        Ok(Cond::Attr(format!(
            "{target} {op} {}",
            field_type.to_literal(value)?
        )))
    };
    match lookup {
        Lookup::Exact(value) => compare("=", "!=", value),
        Lookup::Gt(value) => compare(">", "<=", value),
        Lookup::Gte(value) => compare(">=", "<", value),
        Lookup::Lt(value) => compare("<", ">=", value),
        Lookup::Lte(value) => compare("<=", ">", value),
        Lookup::In(values) if values.is_empty() => Ok(Cond::Const(negated)),
        Lookup::In(values) => {
            let items = values
                .iter()
                .map(|v| field_type.to_literal(v))
                .collect::<SphinxResult<Vec<_>>>()?;
            let op = if negated { "NOT IN" } else { "IN" };
            Ok(Cond::Attr(format!("{target} {op} ({})", items.join(", "))))
        }
        Lookup::Range(low, high) => {
            let low = field_type.to_literal(low)?;
            let high = field_type.to_literal(high)?;
            if !negated {
                Ok(Cond::Attr(format!("{column} BETWEEN {low} AND {high}")))
            } else if field_type.is_multi() {
                Err(SphinxError::UnsupportedLookup(format!(
                    "excluding a range on multi-valued attribute '{column}'"
                )))
            } else {
                Ok(Cond::Or(vec![
                    Cond::Attr(format!("{column} < {low}")),
                    Cond::Attr(format!("{column} > {high}")),
                ]))
            }
        }
        Lookup::Search(_) => Err(SphinxError::UnsupportedLookup(format!(
            "'search' lookup is not supported on attribute '{column}'"
        ))),
    }
}
