//! # oxide-sql-clause
//!
//! SQL clause trees: build them, transform them, compile them.
//!
//! This crate provides:
//! - An immutable clause element model with object, hash and lineage
//!   identities
//! - Read-only and cloning traversals, plus replacement traversal with
//!   stop markers
//! - [`ClauseAdapter`] and [`ColumnAdapter`], which rewrite expressions
//!   written against a table so they target an alias or subquery of it
//! - A dialect-aware compiler with postcompile expansion of `IN` lists
//!
//! ## Building and compiling
//!
//! ```rust
//! use oxide_sql_clause::{compile, select, table, PostgresDialect};
//!
//! let users = table("users", ["id", "name"]);
//! let query = select([users.c("id").unwrap()])
//!     .where_(users.c("name").unwrap().eq("alice"))
//!     .unwrap();
//!
//! let compiled = compile(&query.into(), &PostgresDialect::new()).unwrap();
//! assert_eq!(compiled.sql(), "SELECT users.id FROM users WHERE users.name = %(name_1)s");
//! ```
//!
//! ## Adapting to an alias
//!
//! ```rust
//! use oxide_sql_clause::{compile, table, ClauseAdapter, GenericDialect, Replacer};
//!
//! let users = table("users", ["id", "name"]);
//! let u = users.alias("u").unwrap();
//! let criterion = users.c("id").unwrap().eq(5);
//!
//! let adapted = ClauseAdapter::new(&u).traverse(&criterion);
//! let sql = compile(&adapted, &GenericDialect::new()).unwrap();
//! assert_eq!(sql.sql(), "u.id = :id_1");
//! ```

pub mod adapter;
pub mod coercion;
pub mod comparator;
pub mod compiler;
pub mod dialect;
pub mod dml;
pub mod elements;
pub mod error;
pub mod operators;
pub mod schema;
pub mod selectable;
pub mod types;
pub mod util;
pub mod value;
pub mod visitors;
pub mod warnings;

pub use adapter::{ClauseAdapter, ColumnAdapter};
pub use compiler::{compile, compile_with, CompileOptions, Compiled, ExpandedStatement};
pub use dialect::{
    ConfiguredDialect, Dialect, DialectConfig, FirebirdDialect, GenericDialect, MsSqlDialect,
    MySqlDialect, OracleDialect, ParamStyle, PostgresDialect, SqliteDialect,
};
pub use dml::{delete, insert, update, Delete, Insert, Update};
pub use elements::{
    and_, asc, bindparam, case, cast, column, column_typed, desc, exists, false_, func, label,
    literal, literal_column, not_, null, or_, text, true_, tuple_, ClauseElement, ElementKind,
};
pub use error::{Error, Result};
pub use operators::Operator;
pub use schema::{Column, ColumnDef, Table};
pub use selectable::{
    except_, intersect, join, select, table, table_in_schema, union, union_all, LabelStyle, Select,
};
pub use types::DataType;
pub use value::{BindValue, SqlValue};
pub use visitors::{cloned_traverse, iterate, replacement_traverse, traverse, ClauseVisitor, Replacer};
