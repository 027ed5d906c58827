//! Fluent builders returned by [`Table`](crate::Table).
//!
//! Every chain method validates its string inputs against the table's
//! [`Schema`](crate::Schema). The first failure is kept in the builder and
//! later calls become no-ops; `render` and the execute methods report it.
//!
//! ```ignore
//! let adults = users
//!     .select()
//!     .where_("age", ">=", "min_age")
//!     .where_or([c("email", "ilike", "pattern"), null("age")])
//!     .order_by("email", "asc")
//!     .limit(20)
//!     .fetch_all(&client, &params)
//!     .await?;
//! ```

/// WHERE methods shared by every builder that has a `where_: Vec<Cond>`,
/// `table: Table<T>` and `error: Option<BuildError>`.
macro_rules! impl_where_methods {
    () => {
        /// Run `f` unless an error was already recorded; keep its error.
        fn step(
            mut self,
            f: impl FnOnce(&mut Self) -> Result<(), $crate::error::BuildError>,
        ) -> Self {
            if self.error.is_none() {
                if let Err(e) = f(&mut self) {
                    self.error = Some(e);
                }
            }
            self
        }

        /// `field op :param`
        pub fn where_(self, field: &str, op: &str, param: &str) -> Self {
            self.where_cond($crate::condition::c(field, op, param))
        }

        /// Attach any condition, including nested groups.
        pub fn where_cond(self, cond: $crate::condition::Condition) -> Self {
            self.step(|b| {
                let resolved = cond.resolve(b.table.schema())?;
                b.where_.extend(resolved);
                Ok(())
            })
        }

        /// AND group. No conditions leaves the WHERE clause unchanged.
        pub fn where_and(
            self,
            conds: impl IntoIterator<Item = $crate::condition::Condition>,
        ) -> Self {
            self.where_cond($crate::condition::and(conds))
        }

        /// OR group. No conditions leaves the WHERE clause unchanged.
        pub fn where_or(
            self,
            conds: impl IntoIterator<Item = $crate::condition::Condition>,
        ) -> Self {
            self.where_cond($crate::condition::or(conds))
        }

        pub fn where_null(self, field: &str) -> Self {
            self.where_cond($crate::condition::null(field))
        }

        pub fn where_not_null(self, field: &str) -> Self {
            self.where_cond($crate::condition::not_null(field))
        }

        /// `field BETWEEN :low AND :high`
        pub fn where_between(self, field: &str, low: &str, high: &str) -> Self {
            self.where_cond($crate::condition::between(field, low, high))
        }

        pub fn where_not_between(self, field: &str, low: &str, high: &str) -> Self {
            self.where_cond($crate::condition::not_between(field, low, high))
        }

        /// Compare two columns; no parameter is involved.
        pub fn where_fields(self, left: &str, op: &str, right: &str) -> Self {
            self.where_cond($crate::condition::cf(left, op, right))
        }

        /// Whether at least one WHERE condition is attached.
        pub fn has_where(&self) -> bool {
            !self.where_.is_empty()
        }
    };
}

mod aggregate;
mod compound;
mod delete;
mod insert;
mod select;
mod update;


pub use aggregate::Aggregate;
pub use compound::Compound;
pub use delete::Delete;
pub use insert::Insert;
pub use select::{Many, One, Select, SelectMany, SelectOne};
pub use update::Update;

use crate::error::{OrmError, OrmResult};
use crate::render::Rendered;

/// Shared body of every `must_render`.
pub(crate) fn unwrap_rendered(result: OrmResult<Rendered>) -> Rendered {
    match result {
        Ok(rendered) => rendered,
        Err(e) => panic!("{e}"),
    }
}

/// The error slot as a result.
pub(crate) fn check(error: &Option<crate::error::BuildError>) -> OrmResult<()> {
    match error {
        Some(e) => Err(OrmError::Build(e.clone())),
        None => Ok(()),
    }
}
