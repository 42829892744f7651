//! Schema definitions for tables and columns.
//!
//! [`ColumnDef`] describes one column of a [`table`](crate::table) clause.
//! The [`Table`] and [`Column`] traits are implemented by the
//! `#[derive(Table)]` macro so that a Rust struct can stand in for a table.

use serde::{Deserialize, Serialize};

use crate::elements::ClauseElement;
use crate::types::DataType;

/// A `table.column` reference target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table name.
    pub table: String,
    /// Referenced column name.
    pub column: String,
}

impl ForeignKeyRef {
    /// Parses `"table.column"`.
    #[must_use]
    pub fn parse(target: &str) -> Option<Self> {
        let (table, column) = target.rsplit_once('.')?;
        if table.is_empty() || column.is_empty() {
            return None;
        }
        Some(Self {
            table: String::from(table),
            column: String::from(column),
        })
    }
}

/// Definition of one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// SQL type.
    #[serde(default)]
    pub data_type: DataType,
    /// Whether the column admits NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the column carries a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Foreign key target.
    #[serde(default)]
    pub references: Option<ForeignKeyRef>,
}

impl ColumnDef {
    /// Creates a column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            primary_key: false,
            unique: false,
            references: None,
        }
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds a foreign key to `"table.column"`.
    ///
    /// A target without a dot is ignored.
    #[must_use]
    pub fn references(mut self, target: &str) -> Self {
        self.references = ForeignKeyRef::parse(target);
        self
    }
}

impl From<&str> for ColumnDef {
    fn from(name: &str) -> Self {
        Self::new(name, DataType::Null)
    }
}

impl From<String> for ColumnDef {
    fn from(name: String) -> Self {
        Self::new(name, DataType::Null)
    }
}

/// Table metadata.
///
/// Implemented by types generated from `#[derive(Table)]`.
pub trait Table {
    /// The row type (the original struct).
    type Row;

    /// The SQL table name.
    const NAME: &'static str;

    /// List of all column names.
    const COLUMNS: &'static [&'static str];

    /// The primary key column name, if any.
    const PRIMARY_KEY: Option<&'static str>;

    /// Column definitions in declaration order.
    fn column_defs() -> Vec<ColumnDef>;

    /// The table clause. Repeated calls return the same element.
    fn table() -> ClauseElement;
}

/// Column metadata.
///
/// Implemented by column types generated from `#[derive(Table)]`.
pub trait Column {
    /// The table this column belongs to.
    type Table: Table;

    /// The Rust type of this column.
    type Type;

    /// The SQL column name.
    const NAME: &'static str;

    /// Position of the column in its table.
    const INDEX: usize;

    /// Whether this column is nullable.
    const NULLABLE: bool;

    /// Whether this column is the primary key.
    const PRIMARY_KEY: bool;

    /// The column element bound to the table clause.
    fn element() -> ClauseElement {
        let table = <Self::Table as Table>::table();
        crate::selectable::bound_column_at(&table, Self::INDEX)
            .unwrap_or_else(|| crate::elements::column(Self::NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_parse() {
        let fk = ForeignKeyRef::parse("users.id").unwrap();
        assert_eq!(fk.table, "users");
        assert_eq!(fk.column, "id");
        assert!(ForeignKeyRef::parse("users").is_none());
        assert!(ForeignKeyRef::parse(".id").is_none());
    }

    #[test]
    fn test_column_def_builder() {
        let def = ColumnDef::new("user_id", DataType::Bigint)
            .nullable()
            .references("users.id");
        assert!(def.nullable);
        assert!(!def.primary_key);
        assert_eq!(def.references.unwrap().table, "users");
    }

    #[test]
    fn test_column_def_from_json() {
        let def: ColumnDef =
            serde_json::from_str(r#"{"name": "id", "data_type": "Integer", "primary_key": true}"#)
                .unwrap();
        assert_eq!(def.data_type, DataType::Integer);
        assert!(def.primary_key);
        assert!(def.references.is_none());
    }
}
