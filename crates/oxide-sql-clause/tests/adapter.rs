//! Integration tests for `ClauseAdapter` and `ColumnAdapter`.

mod common;

use common::*;
use oxide_sql_clause::{column, literal_column, select, ClauseAdapter, ColumnAdapter, Replacer};
use pretty_assertions::assert_eq;

// =============================================================================
// Column and FROM correspondence
// =============================================================================

#[test]
fn test_adapt_expression_to_table_alias() {
    let t1 = t1();
    let t1alias = alias(&t1, "t1alias");
    let expr = col(&t1, "col1").eq(col(&t1, "col2"));

    let adapted = ClauseAdapter::new(&t1alias).traverse(&expr);
    assert_eq!(generic(&adapted), "t1alias.col1 = t1alias.col2");
    // The input tree is untouched.
    assert_eq!(generic(&expr), "table1.col1 = table1.col2");
}

#[test]
fn test_unrelated_columns_pass_through() {
    let (t1, t2) = (t1(), t2());
    let t1alias = alias(&t1, "t1alias");
    let expr = col(&t2, "col1").eq(col(&t1, "col1"));

    let adapted = ClauseAdapter::new(&t1alias).traverse(&expr);
    assert_eq!(generic(&adapted), "table2.col1 = t1alias.col1");
}

#[test]
fn test_adapt_select_replaces_from_entries() {
    let t1 = t1();
    let t1alias = alias(&t1, "t1alias");
    let s = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq(7))
        .unwrap();

    let adapted = ClauseAdapter::new(&t1alias).traverse(&s.into());
    assert_eq!(
        generic(&adapted),
        "SELECT t1alias.col1 FROM table1 AS t1alias WHERE t1alias.col2 = :col2_1"
    );
}

#[test]
fn test_adapt_join_onclause() {
    let (t1, t2) = (t1(), t2());
    let t1alias = alias(&t1, "t1alias");
    let j = t1
        .join(&t2, Some(col(&t1, "col1").eq(col(&t2, "col1"))))
        .unwrap();

    let adapted = ClauseAdapter::new(&t1alias).traverse(&j);
    assert_eq!(
        generic(&adapted),
        "table1 AS t1alias JOIN table2 ON t1alias.col1 = table2.col1"
    );
}

#[test]
fn test_adapt_to_subquery() {
    let t1 = t1();
    let s = select([t1.clone()]).subquery("s");
    let expr = col(&t1, "col1").eq(col(&t1, "col2"));

    let adapted = ClauseAdapter::new(&s).traverse(&expr);
    assert_eq!(generic(&adapted), "s.col1 = s.col2");
}

#[test]
fn test_declared_equivalents() {
    let (t1, t2) = (t1(), t2());
    let t1alias = alias(&t1, "t1alias");
    let adapter = ClauseAdapter::new(&t1alias).equivalent(&col(&t2, "col1"), [col(&t1, "col1")]);

    let adapted = adapter.traverse(&col(&t2, "col1").eq(5));
    assert_eq!(generic(&adapted), "t1alias.col1 = :col1_1");
}

#[test]
fn test_adapt_on_names_matches_free_columns() {
    let t1alias = alias(&t1(), "t1alias");
    let expr = column("col2").eq(5);

    let strict = ClauseAdapter::new(&t1alias).traverse(&expr);
    assert_eq!(generic(&strict), "col2 = :col2_1");

    let by_name = ClauseAdapter::new(&t1alias).adapt_on_names(true).traverse(&expr);
    assert_eq!(generic(&by_name), "t1alias.col2 = :col2_1");
}

#[test]
fn test_exclude_keeps_matching_columns() {
    let t1 = t1();
    let t1alias = alias(&t1, "t1alias");
    let adapter = ClauseAdapter::new(&t1alias)
        .exclude(|e| e.name().is_some_and(|name| name.base() == "col2"));

    let adapted = adapter.traverse(&col(&t1, "col1").eq(col(&t1, "col2")));
    assert_eq!(generic(&adapted), "t1alias.col1 = table1.col2");
}

#[test]
fn test_anonymize_labels() {
    let t1 = t1();
    let t1alias = alias(&t1, "t1alias");
    let s = select([col(&t1, "col1").label("foo")]);

    let adapted = ClauseAdapter::new(&t1alias)
        .anonymize_labels(true)
        .traverse(&s.into());
    assert_eq!(generic(&adapted), "SELECT t1alias.col1 AS col1_1 FROM table1 AS t1alias");
}

// =============================================================================
// Correlation survives adaptation
// =============================================================================

#[test]
fn test_correlated_subquery_adapts_with_enclosing_alias() {
    let (t1, t2) = (t1(), t2());
    let t1alias = alias(&t1, "t1alias");
    let s = select([literal_column("*")])
        .where_(col(&t1, "col1").eq(col(&t2, "col1")))
        .unwrap()
        .correlate([t1.clone()])
        .unwrap()
        .scalar_subquery();

    assert_eq!(
        generic(select([col(&t1, "col1"), s.clone()])),
        "SELECT table1.col1, (SELECT * FROM table2 WHERE table1.col1 = table2.col1) AS anon_1 \
         FROM table1"
    );

    let adapted = ClauseAdapter::new(&t1alias).traverse(&s);
    assert_eq!(
        generic(select([col(&t1alias, "col1"), adapted])),
        "SELECT t1alias.col1, (SELECT * FROM table2 WHERE t1alias.col1 = table2.col1) AS anon_1 \
         FROM table1 AS t1alias"
    );
}

#[test]
fn test_auto_correlated_subquery_adapts_with_enclosing_alias() {
    let (t1, t2) = (t1(), t2());
    let t1alias = alias(&t1, "t1alias");
    let s = select([literal_column("*")])
        .where_(col(&t1, "col1").eq(col(&t2, "col1")))
        .unwrap()
        .scalar_subquery();

    let adapted = ClauseAdapter::new(&t1alias).traverse(&s);
    assert_eq!(
        generic(select([col(&t1alias, "col1"), adapted])),
        "SELECT t1alias.col1, (SELECT * FROM table2 WHERE t1alias.col1 = table2.col1) AS anon_1 \
         FROM table1 AS t1alias"
    );
}

// =============================================================================
// ColumnAdapter
// =============================================================================

#[test]
fn test_column_adapter_wrap_translates_twice() {
    let t1 = t1();
    let a1 = alias(&t1, "a1");
    let s = select([a1.clone()]).subquery("s");

    let outer = ColumnAdapter::for_selectable(&a1);
    let inner = ColumnAdapter::for_selectable(&s);

    let wrapped = outer.wrap(&inner);
    assert_eq!(generic(wrapped.traverse(&col(&t1, "col1"))), "s.col1");

    let chained = outer.chain(&inner);
    assert_eq!(generic(chained.traverse(&col(&t1, "col1"))), "a1.col1");
}

#[test]
fn test_column_adapter_wrap_order_matters() {
    let t1 = t1();
    let t1a = alias(&t1, "t1a");
    let s = select([t1.clone()]).subquery("s");

    let a1 = ColumnAdapter::for_selectable(&t1a);
    let a2 = ColumnAdapter::for_selectable(&s);

    let col1 = col(&t1, "col1");
    assert_eq!(generic(a2.wrap(&a1).traverse(&col1)), "s.col1");
    assert_eq!(generic(a1.wrap(&a2).traverse(&col1)), "t1a.col1");
}

#[test]
fn test_column_adapter_adapt_required() {
    let (t1, t2) = (t1(), t2());
    let t1alias = alias(&t1, "t1alias");
    let adapter = ColumnAdapter::for_selectable(&t1alias).adapt_required(true);

    assert!(adapter.columns(&col(&t2, "col1")).is_none());
    let adapted = adapter.columns(&col(&t1, "col1")).unwrap();
    assert_eq!(generic(adapted), "t1alias.col1");
}

#[test]
fn test_column_adapter_memoizes_per_column() {
    let t1 = t1();
    let t1alias = alias(&t1, "t1alias");
    let adapter = ColumnAdapter::for_selectable(&t1alias);
    let expr = col(&t1, "col1").eq(col(&t1, "col2"));

    let first = adapter.columns(&expr).unwrap();
    let second = adapter.columns(&expr).unwrap();
    assert!(first.is(&second));
    assert_eq!(generic(first), "t1alias.col1 = t1alias.col2");
}
