//! Executes compiled and expanded statements against an in-memory DuckDB.
//!
//! Statements are compiled with the SQLite dialect, whose `?` placeholders
//! DuckDB accepts.

mod common;

use common::*;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use oxide_sql_clause::dml::DmlValue;
use oxide_sql_clause::elements::func;
use oxide_sql_clause::{
    bindparam, insert, select, table, update, BindValue, ClauseElement, ColumnDef, DataType,
    SqlValue, SqliteDialect,
};
use pretty_assertions::assert_eq;

fn items() -> ClauseElement {
    table(
        "items",
        [
            ColumnDef::new("id", DataType::Bigint),
            ColumnDef::new("name", DataType::Varchar(None)),
            ColumnDef::new("price", DataType::Double),
        ],
    )
}

fn to_duckdb(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Boolean(*b),
        SqlValue::Int(i) => Value::BigInt(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

fn connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE items (id BIGINT, name VARCHAR, price DOUBLE)")
        .unwrap();
    let rows = insert(&items())
        .values_multi([
            [
                ("id", DmlValue::from(1)),
                ("name", DmlValue::from("apple")),
                ("price", DmlValue::from(1.5)),
            ],
            [
                ("id", DmlValue::from(2)),
                ("name", DmlValue::from("pear")),
                ("price", DmlValue::from(2.25)),
            ],
            [
                ("id", DmlValue::from(3)),
                ("name", DmlValue::from("plum")),
                ("price", DmlValue::from(0.75)),
            ],
        ])
        .unwrap();
    assert_eq!(execute(&conn, rows.into(), &[]), 3);
    conn
}

fn execute(conn: &Connection, element: ClauseElement, overrides: &[(&str, BindValue)]) -> usize {
    let expanded = compiled(&element, &SqliteDialect::new())
        .expand(overrides)
        .unwrap();
    conn.execute(&expanded.sql, params_from_iter(expanded.values().map(to_duckdb)))
        .unwrap_or_else(|e| panic!("Failed to execute {}\nError: {e}", expanded.sql))
}

fn names(conn: &Connection, element: ClauseElement, overrides: &[(&str, BindValue)]) -> Vec<String> {
    let expanded = compiled(&element, &SqliteDialect::new())
        .expand(overrides)
        .unwrap();
    let mut stmt = conn.prepare(&expanded.sql).unwrap();
    stmt.query_map(params_from_iter(expanded.values().map(to_duckdb)), |row| {
        row.get::<_, String>(0)
    })
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap()
}

// =============================================================================
// Expanded IN lists
// =============================================================================

#[test]
fn test_in_list_expands_to_driver_parameters() {
    let conn = connection();
    let t = items();
    let s = select([col(&t, "name")])
        .where_(col(&t, "id").in_(vec![1, 3]))
        .unwrap()
        .order_by([col(&t, "id")]);

    assert_eq!(names(&conn, s.into(), &[]), vec!["apple", "plum"]);
}

#[test]
fn test_expanding_bindparam_with_runtime_values() {
    let conn = connection();
    let t = items();
    let s: ClauseElement = select([col(&t, "name")])
        .where_(col(&t, "name").in_(bindparam("wanted")))
        .unwrap()
        .order_by([col(&t, "name")])
        .into();

    let wanted = BindValue::from(vec!["pear", "plum", "kiwi"]);
    assert_eq!(names(&conn, s.clone(), &[("wanted", wanted)]), vec!["pear", "plum"]);

    let nothing = BindValue::from(Vec::<String>::new());
    assert!(names(&conn, s, &[("wanted", nothing)]).is_empty());
}

#[test]
fn test_empty_not_in_matches_every_row() {
    let conn = connection();
    let t = items();
    let s = select([col(&t, "name")])
        .where_(col(&t, "id").not_in(Vec::<i64>::new()))
        .unwrap()
        .order_by([col(&t, "id")]);

    assert_eq!(names(&conn, s.into(), &[]), vec!["apple", "pear", "plum"]);
}

// =============================================================================
// Subqueries and DML
// =============================================================================

#[test]
fn test_scalar_subquery_over_alias() {
    let conn = connection();
    let t = items();
    let cheaper = alias(&t, "cheaper");
    let max_price = select([func::max(col(&cheaper, "price"))])
        .where_(col(&cheaper, "price").lt(2.0))
        .unwrap()
        .scalar_subquery();
    let s = select([col(&t, "name")])
        .where_(col(&t, "price").eq(max_price))
        .unwrap();

    assert_eq!(names(&conn, s.into(), &[]), vec!["apple"]);
}

#[test]
fn test_update_then_select() {
    let conn = connection();
    let t = items();
    let upd = update(&t)
        .values([("name", "quince")])
        .unwrap()
        .where_(col(&t, "id").eq(2))
        .unwrap();
    assert_eq!(execute(&conn, upd.into(), &[]), 1);

    let s = select([col(&t, "name")])
        .where_(col(&t, "id").eq(2))
        .unwrap();
    assert_eq!(names(&conn, s.into(), &[]), vec!["quince"]);
}
