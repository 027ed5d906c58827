//! # fluorm
//!
//! A fluent, string-keyed query builder and executor for databases that
//! speak the Postgres wire protocol.
//!
//! ## Features
//!
//! - **Validated names**: every field, parameter, operator and direction is
//!   checked against the table's schema; a typo surfaces at `render`/`exec`
//!   with the offending name
//! - **Named parameters**: SQL uses `$n` placeholders, callers supply values
//!   by name through [`Params`]
//! - **Safe mutations**: UPDATE and DELETE refuse to run without WHERE
//! - **Dialect aware**: [`Capabilities`] pick between inline `RETURNING` and a
//!   follow-up read
//! - **Transaction-friendly**: pass a transaction anywhere a
//!   [`GenericClient`] is expected
//! - **Query monitoring**: timing, slow-query detection and `tracing` events
//!
//! ```ignore
//! use fluorm::{Params, SqlRenderer, Table, c, or};
//!
//! let users = Table::<User>::for_model(SqlRenderer::postgres())?;
//!
//! // SELECT
//! let adults = users
//!     .select()
//!     .where_("age", ">=", "min_age")
//!     .order_by("email", "asc")
//!     .fetch_all(&client, &Params::new().set("min_age", 18i32))
//!     .await?;
//!
//! // UPDATE, returning the row
//! let user = users
//!     .update()
//!     .set("email", "email")
//!     .where_("id", "=", "id")
//!     .exec(&client, &Params::new().set("email", "a@example.com").set("id", 7i64))
//!     .await?;
//!
//! // DELETE in a batch
//! let removed = users
//!     .delete()
//!     .where_("id", "=", "id")
//!     .exec_batch(&tx, &ids.iter().map(|id| Params::new().set("id", *id)).collect::<Vec<_>>())
//!     .await?;
//! ```

pub mod ast;
pub mod builder;
pub mod client;
pub mod condition;
pub mod error;
mod exec;
pub mod ident;
pub mod monitor;
pub mod params;
pub mod projection;
pub mod render;
pub mod row;
pub mod schema;
mod table;

#[cfg(test)]
mod testing;

pub use builder::{
    Aggregate, Compound, Delete, Insert, Many, One, Select, SelectMany, SelectOne, Update,
};
pub use client::GenericClient;
pub use condition::{Condition, and, between, c, cf, not_between, not_null, null, or};
pub use error::{BuildError, NameKind, OrmError, OrmResult};
pub use monitor::{
    CompositeMonitor, ExecConfig, NoopMonitor, OperationKind, QueryContext, QueryMonitor,
    QueryResult, QueryStats, StatsMonitor, TracingMonitor,
};
pub use params::{Param, Params};
pub use projection::Projection;
pub use render::{Capabilities, Dialect, Rendered, Renderer, SqlRenderer};
pub use row::{FromRow, RowExt};
pub use schema::{ColumnMeta, Model, Schema, TableSchema};
pub use table::Table;

// Re-export the driver so callers use the same version
pub use tokio_postgres;
