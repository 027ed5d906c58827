//! Table metadata and name resolution.
//!
//! [`Schema`] is the only place that mints [`TableRef`], [`Field`] and
//! [`ParamRef`] tokens. Builders hand it the caller's strings and get back
//! either a token or a [`BuildError::Unresolved`] naming the bad input.

use indexmap::IndexMap;

use crate::ast::{Field, ParamRef, TableRef};
use crate::error::{BuildError, NameKind};
use crate::ident::is_plain_ident;
use crate::row::FromRow;

/// Metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub is_primary_key: bool,
    pub nullable: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            nullable: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Table name plus its columns, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnMeta>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }
}

/// A record type backed by one table.
///
/// Implementations describe their columns once; the metadata is turned into
/// a [`Schema`] when the [`Table`](crate::Table) is created.
///
/// ```ignore
/// impl Model for User {
///     fn table_schema() -> TableSchema {
///         TableSchema::new("users")
///             .column(ColumnMeta::new("id").primary_key())
///             .column(ColumnMeta::new("email"))
///             .column(ColumnMeta::new("age").nullable())
///     }
/// }
/// ```
pub trait Model: FromRow + Send + Sync + 'static {
    fn table_schema() -> TableSchema;
}

/// Validated table metadata used to resolve symbolic names.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    columns: IndexMap<String, ColumnMeta>,
}

impl Schema {
    /// Validate `table` and build a schema from it.
    ///
    /// Every name must be a plain identifier, column names must be unique and
    /// the table needs at least one column.
    pub fn new(table: TableSchema) -> Result<Self, BuildError> {
        if !is_plain_ident(&table.name) {
            return Err(BuildError::InvalidSchema(format!(
                "table name '{}' is not a plain identifier",
                table.name
            )));
        }
        if table.columns.is_empty() {
            return Err(BuildError::InvalidSchema(format!(
                "table '{}' has no columns defined",
                table.name
            )));
        }

        let mut columns = IndexMap::with_capacity(table.columns.len());
        for col in table.columns {
            if !is_plain_ident(&col.name) {
                return Err(BuildError::InvalidSchema(format!(
                    "column name '{}' is not a plain identifier",
                    col.name
                )));
            }
            if columns.contains_key(&col.name) {
                return Err(BuildError::InvalidSchema(format!(
                    "duplicate column '{}' in table '{}'",
                    col.name, table.name
                )));
            }
            columns.insert(col.name.clone(), col);
        }

        Ok(Self {
            table: table.name,
            columns,
        })
    }

    pub fn for_model<T: Model>() -> Result<Self, BuildError> {
        Self::new(T::table_schema())
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.table)
    }

    pub fn resolve_table(&self, name: &str) -> Result<TableRef, BuildError> {
        if name == self.table {
            Ok(self.table_ref())
        } else {
            Err(BuildError::unresolved(NameKind::Table, name))
        }
    }

    pub fn resolve_field(&self, name: &str) -> Result<Field, BuildError> {
        if self.columns.contains_key(name) {
            Ok(Field::new(name))
        } else {
            Err(BuildError::unresolved(NameKind::Field, name))
        }
    }

    pub fn resolve_fields(&self, names: &[&str]) -> Result<Vec<Field>, BuildError> {
        names.iter().map(|n| self.resolve_field(n)).collect()
    }

    /// Parameter names are free-form but must be plain identifiers.
    pub fn resolve_param(&self, name: &str) -> Result<ParamRef, BuildError> {
        if is_plain_ident(name) {
            Ok(ParamRef::new(name))
        } else {
            Err(BuildError::unresolved(NameKind::Param, name))
        }
    }

    pub fn resolve_alias(&self, name: &str) -> Result<String, BuildError> {
        if is_plain_ident(name) {
            Ok(name.to_string())
        } else {
            Err(BuildError::unresolved(NameKind::Alias, name))
        }
    }

    /// Whether `name` is a column that may hold NULL.
    pub fn is_nullable(&self, name: &str) -> bool {
        self.columns.get(name).is_some_and(|c| c.nullable)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.values()
    }

    /// Every column, in declaration order.
    pub fn all_fields(&self) -> Vec<Field> {
        self.columns.keys().map(Field::new).collect()
    }

    pub fn primary_key(&self) -> Vec<Field> {
        self.columns
            .values()
            .filter(|c| c.is_primary_key)
            .map(|c| Field::new(&c.name))
            .collect()
    }

    /// Columns written by INSERT.
    pub fn non_primary_fields(&self) -> Vec<Field> {
        self.columns
            .values()
            .filter(|c| !c.is_primary_key)
            .map(|c| Field::new(&c.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("users")
            .column(ColumnMeta::new("id").primary_key())
            .column(ColumnMeta::new("email"))
            .column(ColumnMeta::new("age").nullable())
    }

    #[test]
    fn resolves_known_names() {
        let schema = Schema::new(users()).unwrap();
        assert_eq!(schema.resolve_field("email").unwrap().name(), "email");
        assert_eq!(schema.resolve_table("users").unwrap().name(), "users");
        assert_eq!(schema.resolve_param("min_age").unwrap().name(), "min_age");
    }

    #[test]
    fn unresolved_names_carry_kind_and_name() {
        let schema = Schema::new(users()).unwrap();

        let err = schema.resolve_field("emial").unwrap_err();
        assert_eq!(err.kind(), Some(NameKind::Field));
        assert_eq!(err.name(), Some("emial"));

        let err = schema.resolve_table("accounts").unwrap_err();
        assert_eq!(err.kind(), Some(NameKind::Table));

        let err = schema.resolve_param("min age").unwrap_err();
        assert_eq!(err.kind(), Some(NameKind::Param));
        assert_eq!(err.name(), Some("min age"));
    }

    #[test]
    fn primary_key_split() {
        let schema = Schema::new(users()).unwrap();
        let pk: Vec<_> = schema
            .primary_key()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        let rest: Vec<_> = schema
            .non_primary_fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(pk, vec!["id"]);
        assert_eq!(rest, vec!["email", "age"]);
        assert_eq!(schema.all_fields().len(), 3);
    }

    #[test]
    fn nullability_comes_from_column_metadata() {
        let schema = Schema::new(users()).unwrap();
        assert!(schema.is_nullable("age"));
        assert!(!schema.is_nullable("email"));
        assert!(!schema.is_nullable("missing"));
    }

    #[test]
    fn rejects_bad_metadata() {
        let dup = users().column(ColumnMeta::new("email"));
        let err = Schema::new(dup).unwrap_err();
        assert!(matches!(err, BuildError::InvalidSchema(_)));

        let bad = TableSchema::new("users").column(ColumnMeta::new("e-mail"));
        let err = Schema::new(bad).unwrap_err();
        assert!(matches!(err, BuildError::InvalidSchema(_)));

        assert!(Schema::new(TableSchema::new("empty")).is_err());
    }
}
