//! Integration tests for FROM-clause correlation of nested SELECTs.

mod common;

use common::*;
use oxide_sql_clause::{compile, select, ClauseElement, Error, GenericDialect};
use pretty_assertions::assert_eq;

// =============================================================================
// Scalar subqueries
// =============================================================================

#[test]
fn test_auto_correlation_in_where() {
    let (t1, t2) = (t1(), t2());
    let inner = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t1, "col2")))
        .unwrap()
        .scalar_subquery();
    let s = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq(inner))
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT table1.col1 FROM table1 WHERE table1.col2 = \
         (SELECT table2.col1 FROM table2 WHERE table2.col2 = table1.col2)"
    );
}

#[test]
fn test_correlate_nothing_keeps_every_from() {
    let (t1, t2) = (t1(), t2());
    let inner = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t1, "col2")))
        .unwrap()
        .correlate(Vec::new())
        .unwrap()
        .scalar_subquery();
    let s = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq(inner))
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT table1.col1 FROM table1 WHERE table1.col2 = \
         (SELECT table2.col1 FROM table2, table1 WHERE table2.col2 = table1.col2)"
    );
}

#[test]
fn test_correlate_except_keeps_named_entries() {
    let (t1, t2) = (t1(), t2());
    let inner = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t1, "col2")))
        .unwrap()
        .correlate_except([t1.clone()])
        .unwrap()
        .scalar_subquery();
    let s = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq(inner))
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT table1.col1 FROM table1 WHERE table1.col2 = \
         (SELECT table2.col1 FROM table2, table1 WHERE table2.col2 = table1.col2)"
    );
}

#[test]
fn test_explicit_correlation_reaches_outer_levels() {
    let (t1, t2, t3) = (t1(), t2(), t3());
    let innermost = select([col(&t3, "col1")])
        .where_(col(&t3, "col2").eq(col(&t1, "col2")))
        .unwrap()
        .correlate([t1.clone()])
        .unwrap()
        .scalar_subquery();
    let middle = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(innermost))
        .unwrap()
        .scalar_subquery();
    let s = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq(middle))
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT table1.col1 FROM table1 WHERE table1.col2 = \
         (SELECT table2.col1 FROM table2 WHERE table2.col2 = \
         (SELECT table3.col1 FROM table3 WHERE table3.col2 = table1.col2))"
    );
}

#[test]
fn test_exists_auto_correlates() {
    let (t1, t2) = (t1(), t2());
    let inner = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t1, "col2")))
        .unwrap();
    let s = select([col(&t1, "col1")]).where_(inner.exists()).unwrap();

    assert_eq!(
        generic(s),
        "SELECT table1.col1 FROM table1 WHERE EXISTS \
         (SELECT table2.col1 FROM table2 WHERE table2.col2 = table1.col2)"
    );
}

#[test]
fn test_correlating_every_from_is_an_error() {
    let (t1, t2) = (t1(), t2());
    let inner = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq(col(&t2, "col2")))
        .unwrap()
        .scalar_subquery();
    let s: ClauseElement = select([col(&t1, "col1"), col(&t2, "col1")])
        .where_(col(&t1, "col3").eq(inner))
        .unwrap()
        .into();

    let err = compile(&s, &GenericDialect::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));
    assert!(err.to_string().contains("auto-correlation"));
}

// =============================================================================
// FROM-clause subqueries
// =============================================================================

#[test]
fn test_from_subquery_does_not_auto_correlate() {
    let (t1, t2) = (t1(), t2());
    let sub = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t1, "col2")))
        .unwrap()
        .subquery("sub");
    let s = select([col(&t1, "col1"), col(&sub, "col1")]);

    assert_eq!(
        generic(s),
        "SELECT table1.col1, sub.col1 AS col1_1 FROM table1, \
         (SELECT table2.col1 FROM table2, table1 WHERE table2.col2 = table1.col2) AS sub"
    );
}

#[test]
fn test_top_level_correlate_is_ignored() {
    let (t1, t2) = (t1(), t2());
    let s = select([col(&t2, "col1")])
        .where_(col(&t2, "col2").eq(col(&t1, "col2")))
        .unwrap()
        .correlate([t1.clone()])
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT table2.col1 FROM table2, table1 WHERE table2.col2 = table1.col2"
    );
}
