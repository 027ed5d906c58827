//! Row mapping traits

use crate::error::OrmResult;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// ```ignore
/// use fluorm::{FromRow, RowExt, OrmResult};
///
/// struct User {
///     id: i64,
///     email: String,
///     age: Option<i32>,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             email: row.try_get_column("email")?,
///             age: row.try_get_column("age")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| crate::error::OrmError::decode(column, e.to_string()))
    }
}
