//! Tests for the `#[derive(Table)]` macro output.
//!
//! These tests verify that the derive macro generates:
//! - `{Struct}Table` implementing the `Table` trait
//! - `{Struct}Columns` module with column types implementing `Column`
//! - Column accessors returning elements bound to one shared table clause

mod common;

use common::generic;
use oxide_sql_clause::schema::{Column, Table};
use oxide_sql_clause::{compile, select, DataType, GenericDialect};
use oxide_sql_derive::Table;
use pretty_assertions::assert_eq;

// =============================================================================
// Test: Basic struct with default table name (snake_case)
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Table)]
pub struct User {
    #[column(primary_key)]
    pub id: i64,
    pub name: String,
    #[column(nullable)]
    pub email: Option<String>,
}

#[test]
fn test_user_table_name() {
    assert_eq!(UserTable::NAME, "user");
    assert_eq!(UserTable::table_name(), "user");
}

#[test]
fn test_user_table_columns() {
    assert_eq!(UserTable::COLUMNS, &["id", "name", "email"]);
    assert_eq!(UserTable::PRIMARY_KEY, Some("id"));
}

#[test]
fn test_user_column_metadata() {
    assert_eq!(UserColumns::Id::NAME, "id");
    assert_eq!(UserColumns::Email::INDEX, 2);
    const { assert!(UserColumns::Id::PRIMARY_KEY) };
    const { assert!(!UserColumns::Name::NULLABLE) };
    const { assert!(UserColumns::Email::NULLABLE) };
}

#[test]
fn test_user_column_defs() {
    let defs = UserTable::column_defs();
    assert_eq!(defs[0].data_type, DataType::Bigint);
    assert!(defs[0].primary_key);
    assert_eq!(defs[1].data_type, DataType::Varchar(None));
    assert!(!defs[1].nullable);
    assert!(defs[2].nullable);
}

#[test]
fn test_table_clause_is_shared() {
    assert!(UserTable::table().is(&User::table()));
    assert!(UserTable::id().is(&User::id()));
    assert!(<UserColumns::Name as Column>::element().is(&UserTable::name()));
}

#[test]
fn test_select_from_derived_table() {
    let s = select([User::id(), User::name()])
        .where_(User::id().eq(5))
        .unwrap();
    assert_eq!(
        generic(s.clone()),
        "SELECT \"user\".id, \"user\".name FROM \"user\" WHERE \"user\".id = :id_1"
    );

    let compiled = compile(&s.into(), &GenericDialect::new()).unwrap();
    assert_eq!(compiled.result_columns()[0].data_type(), &DataType::Bigint);
}

// =============================================================================
// Test: Custom names, schema and foreign keys
// =============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Table)]
#[table(name = "posts")]
pub struct BlogPost {
    #[column(primary_key)]
    pub id: i64,
    #[column(references = "user.id")]
    pub author_id: i64,
    #[column(name = "body_text")]
    pub body: String,
    pub published: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Table)]
#[table(name = "accounts", schema = "billing")]
pub struct Account {
    #[column(primary_key, unique)]
    pub id: i32,
}

#[test]
fn test_custom_table_and_column_names() {
    assert_eq!(BlogPostTable::NAME, "posts");
    assert_eq!(BlogPostTable::COLUMNS, &["id", "author_id", "body_text", "published"]);
    assert_eq!(BlogPostColumns::Body::NAME, "body_text");
    assert_eq!(generic(select([BlogPost::body()])), "SELECT posts.body_text FROM posts");
}

#[test]
fn test_join_inferred_from_references() {
    let j = UserTable::table()
        .join(&BlogPostTable::table(), None)
        .unwrap();
    let s = select([User::name(), BlogPost::body()])
        .select_from([j])
        .unwrap()
        .where_(BlogPost::published())
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT \"user\".name, posts.body_text FROM \"user\" \
         JOIN posts ON \"user\".id = posts.author_id WHERE posts.published"
    );
}

#[test]
fn test_schema_qualified_table() {
    let defs = AccountTable::column_defs();
    assert!(defs[0].unique);
    assert_eq!(defs[0].data_type, DataType::Integer);
    assert_eq!(
        generic(select([Account::id()])),
        "SELECT billing.accounts.id FROM billing.accounts"
    );
}
