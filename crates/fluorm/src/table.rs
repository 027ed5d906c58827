//! The schema-bound root object.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ast::AggFunc;
use crate::builder::{Aggregate, Delete, Insert, Select, SelectMany, SelectOne, Update};
use crate::condition::resolve_aggregate;
use crate::error::OrmResult;
use crate::monitor::{ExecConfig, NoopMonitor, QueryMonitor};
use crate::render::{Capabilities, Renderer};
use crate::schema::{Model, Schema, TableSchema};

/// Shared, read-only state behind a [`Table`].
#[derive(Clone)]
pub(crate) struct TableInner {
    pub(crate) schema: Schema,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) monitor: Arc<dyn QueryMonitor>,
    pub(crate) config: ExecConfig,
}

/// Entry point for building queries against one table.
///
/// Cheap to clone and safe to share; every factory method returns a fresh
/// builder.
///
/// ```ignore
/// let users = Table::<User>::for_model(SqlRenderer::postgres())?;
///
/// let adults = users
///     .select()
///     .where_("age", ">=", "min_age")
///     .order_by("email", "asc")
///     .fetch_all(&client, &Params::new().set("min_age", 18i32))
///     .await?;
/// ```
pub struct Table<T> {
    pub(crate) inner: Arc<TableInner>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.inner.schema)
            .field("capabilities", &self.inner.renderer.capabilities())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<T: Model> Table<T> {
    /// Build a table from the model's own metadata.
    pub fn for_model(renderer: impl Renderer + 'static) -> OrmResult<Self> {
        Self::new(T::table_schema(), renderer)
    }
}

impl<T> Table<T> {
    pub fn new(schema: TableSchema, renderer: impl Renderer + 'static) -> OrmResult<Self> {
        Ok(Self::from_parts(Schema::new(schema)?, Arc::new(renderer)))
    }

    pub fn from_parts(schema: Schema, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            inner: Arc::new(TableInner {
                schema,
                renderer,
                monitor: Arc::new(NoopMonitor),
                config: ExecConfig::default(),
            }),
            _marker: PhantomData,
        }
    }

    pub fn with_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        Arc::make_mut(&mut self.inner).monitor = monitor;
        self
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        Arc::make_mut(&mut self.inner).config = config;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.inner.renderer.as_ref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.renderer.capabilities()
    }

    pub fn config(&self) -> &ExecConfig {
        &self.inner.config
    }

    /// A query that must match exactly one row.
    pub fn select_one(&self) -> SelectOne<T> {
        Select::new(self.clone())
    }

    /// A query returning any number of rows.
    pub fn select(&self) -> SelectMany<T> {
        Select::new(self.clone())
    }

    /// INSERT of every non-primary-key column.
    pub fn insert(&self) -> Insert<T> {
        Insert::new(self.clone())
    }

    pub fn update(&self) -> Update<T> {
        Update::new(self.clone())
    }

    pub fn delete(&self) -> Delete<T> {
        Delete::new(self.clone())
    }

    /// `COUNT(*)`
    pub fn count(&self) -> Aggregate<T> {
        Aggregate::new(self.clone(), Ok(AggFunc::Count), None)
    }

    pub fn count_distinct(&self, field: &str) -> Aggregate<T> {
        Aggregate::new(self.clone(), Ok(AggFunc::CountDistinct), Some(field))
    }

    pub fn sum(&self, field: &str) -> Aggregate<T> {
        Aggregate::new(self.clone(), Ok(AggFunc::Sum), Some(field))
    }

    pub fn avg(&self, field: &str) -> Aggregate<T> {
        Aggregate::new(self.clone(), Ok(AggFunc::Avg), Some(field))
    }

    pub fn min(&self, field: &str) -> Aggregate<T> {
        Aggregate::new(self.clone(), Ok(AggFunc::Min), Some(field))
    }

    pub fn max(&self, field: &str) -> Aggregate<T> {
        Aggregate::new(self.clone(), Ok(AggFunc::Max), Some(field))
    }

    /// Aggregate by function name (`"sum"`, `"count distinct"`, ...).
    /// `field` may be `"*"` for `COUNT(*)`.
    pub fn aggregate(&self, func: &str, field: &str) -> Aggregate<T> {
        let field = (field != "*").then_some(field);
        Aggregate::new(self.clone(), resolve_aggregate(func), field)
    }
}
