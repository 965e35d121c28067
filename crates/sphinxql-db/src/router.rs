//! Multi-database routing.
//!
//! This module provides the [`DatabaseRouter`] trait and [`RouterChain`] for
//! routing operations to specific database connections, mirroring Django's
//! `DATABASE_ROUTERS` setting, plus [`SphinxRouter`], which sends search
//! index models to the searchd connection.
//!
//! ## How routing works
//!
//! When a query is executed, the router chain is consulted to determine which
//! database to use. Routers are evaluated in order until one returns a definitive
//! answer (`Some`). If no router returns a value, the `"default"` database is used.
//!
//! Typed lookups (`*_model::<M>()`) also see the model's [`ModelMeta`], so
//! [`SphinxRouter`] picks up search index models without registration.
//!
//! ## Example
//!
//! ```
//! use sphinxql_db::router::{DatabaseRouter, RouterChain};
//!
//! struct ArchiveRouter;
//!
//! impl DatabaseRouter for ArchiveRouter {
//!     fn db_for_read(&self, app_label: &str, _model_name: &str) -> Option<String> {
//!         (app_label == "archive").then(|| "archive_search".to_string())
//!     }
//! }
//!
//! let mut chain = RouterChain::new();
//! chain.add_router(Box::new(ArchiveRouter));
//! assert_eq!(chain.db_for_read("archive", "post"), "archive_search");
//! assert_eq!(chain.db_for_write("archive", "post"), "default");
//! ```

use std::collections::HashSet;

use sphinxql_core::settings::{DEFAULT_SEARCH_DATABASE, SETTINGS};

use crate::model::{Model, ModelMeta};

/// Trait for database routers.
///
/// A database router provides hints about which database to use for different
/// operations. Each method returns `Some(db_alias)` to route to a specific
/// database, or `None` to defer to the next router in the chain.
///
/// This mirrors Django's `DatabaseRouter` class.
pub trait DatabaseRouter: Send + Sync {
    /// Suggests the database to use for read operations on the given model.
    ///
    /// Returns `None` to defer to the next router in the chain.
    fn db_for_read(&self, app_label: &str, model_name: &str) -> Option<String> {
        let _ = (app_label, model_name);
        None
    }

    /// Suggests the database to use for write operations on the given model.
    ///
    /// Returns `None` to defer to the next router in the chain.
    fn db_for_write(&self, app_label: &str, model_name: &str) -> Option<String> {
        let _ = (app_label, model_name);
        None
    }

    /// Determines whether a relation between two objects is allowed.
    ///
    /// Returns `Some(true)` to allow, `Some(false)` to deny, or `None`
    /// to defer to the next router.
    fn allow_relation(
        &self,
        obj1_app: &str,
        obj1_model: &str,
        obj2_app: &str,
        obj2_model: &str,
    ) -> Option<bool> {
        let _ = (obj1_app, obj1_model, obj2_app, obj2_model);
        None
    }

    /// Determines whether a migration operation is allowed on the given database.
    ///
    /// Returns `Some(true)` to allow, `Some(false)` to deny, or `None`
    /// to defer to the next router.
    fn allow_migrate(&self, db: &str, app_label: &str, model_name: &str) -> Option<bool> {
        let _ = (db, app_label, model_name);
        None
    }

    /// Like [`db_for_read`](Self::db_for_read), with the full model metadata.
    fn db_for_read_meta(&self, meta: &ModelMeta) -> Option<String> {
        self.db_for_read(meta.app_label, meta.model_name)
    }

    /// Like [`db_for_write`](Self::db_for_write), with the full model metadata.
    fn db_for_write_meta(&self, meta: &ModelMeta) -> Option<String> {
        self.db_for_write(meta.app_label, meta.model_name)
    }

    /// Like [`allow_migrate`](Self::allow_migrate), with the full model metadata.
    fn allow_migrate_meta(&self, db: &str, meta: &ModelMeta) -> Option<bool> {
        self.allow_migrate(db, meta.app_label, meta.model_name)
    }
}

/// A chain of database routers evaluated in order.
///
/// When a routing decision is needed, each router in the chain is consulted
/// in order until one returns `Some`. If no router provides a definitive
/// answer, the default database (`"default"`) is used.
///
/// This mirrors Django's `DATABASE_ROUTERS` setting behavior.
pub struct RouterChain {
    routers: Vec<Box<dyn DatabaseRouter>>,
}

impl Default for RouterChain {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterChain {
    /// Creates a new empty router chain.
    pub fn new() -> Self {
        Self {
            routers: Vec::new(),
        }
    }

    /// Adds a router to the chain. Routers are evaluated in insertion order.
    pub fn add_router(&mut self, router: Box<dyn DatabaseRouter>) {
        self.routers.push(router);
    }

    /// Returns the database alias to use for read operations.
    ///
    /// Evaluates each router in order. If none returns a value, uses `"default"`.
    pub fn db_for_read(&self, app_label: &str, model_name: &str) -> String {
        for router in &self.routers {
            if let Some(db) = router.db_for_read(app_label, model_name) {
                return db;
            }
        }
        "default".to_string()
    }

    /// Returns the database alias to use for write operations.
    ///
    /// Evaluates each router in order. If none returns a value, uses `"default"`.
    pub fn db_for_write(&self, app_label: &str, model_name: &str) -> String {
        for router in &self.routers {
            if let Some(db) = router.db_for_write(app_label, model_name) {
                return db;
            }
        }
        "default".to_string()
    }

    /// Returns the database alias to read `M` from.
    pub fn db_for_read_model<M: Model>(&self) -> String {
        self.routers
            .iter()
            .find_map(|r| r.db_for_read_meta(M::meta()))
            .unwrap_or_else(|| "default".to_string())
    }

    /// Returns the database alias to write `M` to.
    pub fn db_for_write_model<M: Model>(&self) -> String {
        self.routers
            .iter()
            .find_map(|r| r.db_for_write_meta(M::meta()))
            .unwrap_or_else(|| "default".to_string())
    }

    /// Whether `M` may be migrated on `db`.
    pub fn allow_migrate_model<M: Model>(&self, db: &str) -> bool {
        self.routers
            .iter()
            .find_map(|r| r.allow_migrate_meta(db, M::meta()))
            .unwrap_or(true)
    }

    /// Determines whether a relation between two objects is allowed.
    ///
    /// Returns `true` by default if no router makes a decision.
    pub fn allow_relation(
        &self,
        obj1_app: &str,
        obj1_model: &str,
        obj2_app: &str,
        obj2_model: &str,
    ) -> bool {
        for router in &self.routers {
            if let Some(allowed) = router.allow_relation(obj1_app, obj1_model, obj2_app, obj2_model)
            {
                return allowed;
            }
        }
        true
    }

    /// Determines whether a migration is allowed on the given database.
    ///
    /// Returns `true` by default if no router makes a decision.
    pub fn allow_migrate(&self, db: &str, app_label: &str, model_name: &str) -> bool {
        for router in &self.routers {
            if let Some(allowed) = router.allow_migrate(db, app_label, model_name) {
                return allowed;
            }
        }
        true
    }
}

/// Returns `true` if the model type lives in the search daemon.
pub fn is_sphinx_model<M: Model>() -> bool {
    is_sphinx_meta(M::meta())
}

/// Returns `true` if the model described by `meta` lives in the search daemon.
pub const fn is_sphinx_meta(meta: &ModelMeta) -> bool {
    meta.search_index
}

/// Sends search index models to the search connection.
///
/// Reads and writes of search index models go to the search alias. Typed
/// lookups recognise them from [`ModelMeta::search_index`]; the label-based
/// methods only know the models passed to [`register`](Self::register) or
/// [`register_label`](Self::register_label). Relations
/// involving them are denied, and nothing is migrated for them or on the
/// search alias, since real-time indexes are managed with
/// [`schema`](crate::schema) helpers instead.
///
/// ```
/// use sphinxql_db::router::{RouterChain, SphinxRouter};
///
/// let mut chain = RouterChain::new();
/// chain.add_router(Box::new(SphinxRouter::new("sphinx").register_label("shop", "product")));
/// assert_eq!(chain.db_for_read("shop", "product"), "sphinx");
/// assert_eq!(chain.db_for_write("shop", "order"), "default");
/// assert!(!chain.allow_migrate("sphinx", "shop", "order"));
/// ```
#[derive(Debug, Clone)]
pub struct SphinxRouter {
    alias: String,
    models: HashSet<(String, String)>,
}

impl SphinxRouter {
    /// Creates a router for the given search alias.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            models: HashSet::new(),
        }
    }

    /// Creates a router for the configured `search_database` alias.
    pub fn from_settings() -> Self {
        Self::new(
            SETTINGS
                .try_get()
                .map_or_else(|| DEFAULT_SEARCH_DATABASE.to_string(), |s| s.search_database.clone()),
        )
    }

    /// Returns the search alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Routes `M` to the search alias if it is a search index model.
    #[must_use]
    pub fn register<M: Model>(self) -> Self {
        if is_sphinx_model::<M>() {
            let meta = M::meta();
            self.register_label(meta.app_label, meta.model_name)
        } else {
            self
        }
    }

    /// Routes the model `app_label.model_name` to the search alias.
    #[must_use]
    pub fn register_label(mut self, app_label: &str, model_name: &str) -> Self {
        self.models
            .insert((app_label.to_string(), model_name.to_string()));
        self
    }

    /// Returns `true` if the model was registered.
    pub fn handles(&self, app_label: &str, model_name: &str) -> bool {
        self.models
            .contains(&(app_label.to_string(), model_name.to_string()))
    }
}

impl DatabaseRouter for SphinxRouter {
    fn db_for_read(&self, app_label: &str, model_name: &str) -> Option<String> {
        self.handles(app_label, model_name)
            .then(|| self.alias.clone())
    }

    fn db_for_write(&self, app_label: &str, model_name: &str) -> Option<String> {
        self.handles(app_label, model_name)
            .then(|| self.alias.clone())
    }

    fn allow_relation(
        &self,
        obj1_app: &str,
        obj1_model: &str,
        obj2_app: &str,
        obj2_model: &str,
    ) -> Option<bool> {
        if self.handles(obj1_app, obj1_model) || self.handles(obj2_app, obj2_model) {
            Some(false)
        } else {
            None
        }
    }

    fn allow_migrate(&self, db: &str, app_label: &str, model_name: &str) -> Option<bool> {
        if db == self.alias || self.handles(app_label, model_name) {
            Some(false)
        } else {
            None
        }
    }

    fn db_for_read_meta(&self, meta: &ModelMeta) -> Option<String> {
        is_sphinx_meta(meta)
            .then(|| self.alias.clone())
            .or_else(|| self.db_for_read(meta.app_label, meta.model_name))
    }

    fn db_for_write_meta(&self, meta: &ModelMeta) -> Option<String> {
        is_sphinx_meta(meta)
            .then(|| self.alias.clone())
            .or_else(|| self.db_for_write(meta.app_label, meta.model_name))
    }

    fn allow_migrate_meta(&self, db: &str, meta: &ModelMeta) -> Option<bool> {
        if is_sphinx_meta(meta) {
            Some(false)
        } else {
            self.allow_migrate(db, meta.app_label, meta.model_name)
        }
    }
}
