//! Integration tests for INSERT, UPDATE and DELETE compilation.

mod common;

use common::*;
use oxide_sql_clause::dml::DmlValue;
use oxide_sql_clause::elements::func;
use oxide_sql_clause::{
    compile, delete, insert, literal, select, table, update, ClauseElement, Error, GenericDialect,
};
use pretty_assertions::assert_eq;

fn mytable() -> ClauseElement {
    table("mytable", ["myid", "name", "description"])
}

// =============================================================================
// INSERT
// =============================================================================

#[test]
fn test_insert_keyword_values() {
    let t = mytable();
    let ins = insert(&t)
        .values([("myid", DmlValue::from(3)), ("name", DmlValue::from("jack"))])
        .unwrap();
    assert_eq!(generic(ins), "INSERT INTO mytable (myid, name) VALUES (:myid, :name)");
}

#[test]
fn test_insert_columns_follow_table_order() {
    let t = mytable();
    let ins = insert(&t)
        .values([("description", "d")])
        .unwrap()
        .values([("myid", 1)])
        .unwrap();
    assert_eq!(
        generic(ins),
        "INSERT INTO mytable (myid, description) VALUES (:myid, :description)"
    );
}

#[test]
fn test_insert_positional_values() {
    let t = mytable();
    let ins = insert(&t).values_positional([1, 2]).unwrap();
    assert_eq!(sqlite(ins), "INSERT INTO mytable (myid, name) VALUES (?, ?)");
}

#[test]
fn test_insert_sql_expression_value() {
    let t = mytable();
    let ins = insert(&t)
        .values([
            ("myid", DmlValue::from(3)),
            ("name", DmlValue::from(func::upper(literal("jack")))),
        ])
        .unwrap();
    assert_eq!(
        generic(ins),
        "INSERT INTO mytable (myid, name) VALUES (:myid, upper(:param_1))"
    );
}

#[test]
fn test_insert_multi_row() {
    let t = mytable();
    let ins = insert(&t)
        .values_multi([
            [("myid", DmlValue::from(1)), ("name", DmlValue::from("a"))],
            [("myid", DmlValue::from(2)), ("name", DmlValue::from("b"))],
        ])
        .unwrap();
    assert_eq!(
        generic(ins),
        "INSERT INTO mytable (myid, name) VALUES (:myid_m0, :name_m0), (:myid_m1, :name_m1)"
    );
}

#[test]
fn test_insert_multi_row_missing_value() {
    let t = mytable();
    let ins = insert(&t)
        .values_multi([vec![("myid", 1)], vec![("myid", 2), ("description", 3)]])
        .unwrap();
    let err = compile(&ins.into(), &GenericDialect::new()).unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
    assert!(err.to_string().contains("description"));
}

#[test]
fn test_insert_default_values() {
    assert_eq!(generic(insert(&mytable())), "INSERT INTO mytable DEFAULT VALUES");
}

#[test]
fn test_insert_from_select() {
    let (t, t2) = (mytable(), t2());
    let ins = insert(&t)
        .from_select(&["myid", "name"], select([col(&t2, "col1"), col(&t2, "col2")]))
        .unwrap();
    assert_eq!(
        generic(ins),
        "INSERT INTO mytable (myid, name) SELECT table2.col1, table2.col2 FROM table2"
    );
}

#[test]
fn test_insert_returning() {
    let t = mytable();
    let ins = insert(&t)
        .values([("name", "jack")])
        .unwrap()
        .returning([col(&t, "myid")]);
    assert_eq!(
        postgres(ins.clone()),
        "INSERT INTO mytable (name) VALUES (%(name)s) RETURNING mytable.myid"
    );

    let err = compile(&ins.into(), &GenericDialect::new()).unwrap_err();
    assert!(err.to_string().contains("RETURNING"));
}

// =============================================================================
// UPDATE / DELETE
// =============================================================================

#[test]
fn test_update_with_where() {
    let t = mytable();
    let upd = update(&t)
        .values([("name", "jack")])
        .unwrap()
        .where_(col(&t, "myid").eq(5))
        .unwrap();
    assert_eq!(
        generic(upd),
        "UPDATE mytable SET name=:name WHERE mytable.myid = :myid_1"
    );
}

#[test]
fn test_update_from_expression() {
    let t = mytable();
    let upd = update(&t)
        .values([("name", DmlValue::from(func::lower(col(&t, "name"))))])
        .unwrap();
    assert_eq!(generic(upd), "UPDATE mytable SET name=lower(mytable.name)");
}

#[test]
fn test_update_without_values_is_compile_error() {
    let t = mytable();
    let upd = update(&t).where_(col(&t, "myid").eq(5)).unwrap();
    let err = compile(&upd.into(), &GenericDialect::new()).unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
}

#[test]
fn test_delete_with_where() {
    let t = mytable();
    let del = delete(&t).where_(col(&t, "myid").eq(5)).unwrap();
    assert_eq!(generic(del), "DELETE FROM mytable WHERE mytable.myid = :myid_1");
}

#[test]
fn test_delete_with_correlated_subquery() {
    let (t, t2) = (mytable(), t2());
    let inner = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t, "name")))
        .unwrap()
        .scalar_subquery();
    let del = delete(&t).where_(col(&t, "myid").eq(inner)).unwrap();
    assert_eq!(
        generic(del),
        "DELETE FROM mytable WHERE mytable.myid = \
         (SELECT table2.col1 FROM table2 WHERE table2.col2 = mytable.name)"
    );
}

#[test]
fn test_delete_returning_postgres() {
    let t = mytable();
    let del = delete(&t)
        .where_(col(&t, "myid").eq(5))
        .unwrap()
        .returning([col(&t, "name")]);
    assert_eq!(
        postgres(del),
        "DELETE FROM mytable WHERE mytable.myid = %(myid_1)s RETURNING mytable.name"
    );
}
