//! Integration tests for statement compilation.

mod common;

use common::*;
use oxide_sql_clause::elements::func;
use oxide_sql_clause::warnings::Warning;
use oxide_sql_clause::{
    and_, case, column, compile, compile_with, literal, literal_column, not_, or_, select,
    table_in_schema, text, union_all, CompileOptions, DataType, GenericDialect, LabelStyle,
    PostgresDialect,
};
use pretty_assertions::assert_eq;

// =============================================================================
// SELECT clauses
// =============================================================================

#[test]
fn test_group_by_having() {
    let t1 = t1();
    let s = select([col(&t1, "col1"), func::count(col(&t1, "col2"))])
        .group_by([col(&t1, "col1")])
        .having(func::count(col(&t1, "col2")).gt(literal(1)))
        .unwrap();

    assert_eq!(
        generic(s),
        "SELECT table1.col1, count(table1.col2) AS count_1 FROM table1 \
         GROUP BY table1.col1 HAVING count(table1.col2) > :param_1"
    );
}

#[test]
fn test_distinct() {
    let t1 = t1();
    assert_eq!(
        generic(select([col(&t1, "col1")]).distinct()),
        "SELECT DISTINCT table1.col1 FROM table1"
    );
}

#[test]
fn test_repeated_names_are_labeled() {
    let (t1, t2) = (t1(), t2());
    let s = select([col(&t1, "col1"), col(&t2, "col1")]);
    assert_eq!(
        generic(s),
        "SELECT table1.col1, table2.col1 AS col1_1 FROM table1, table2"
    );
}

#[test]
fn test_tablename_plus_col_labels() {
    let t1 = t1();
    let s = select([col(&t1, "col1")]).set_label_style(LabelStyle::TablenamePlusCol);
    assert_eq!(generic(s), "SELECT table1.col1 AS table1_col1 FROM table1");
}

#[test]
fn test_label_style_none_reports_duplicates() {
    let (t1, t2) = (t1(), t2());
    let s = select([col(&t1, "col1"), col(&t2, "col1")]).set_label_style(LabelStyle::None);
    let compiled = compiled(&s.into(), &GenericDialect::new());

    assert_eq!(compiled.sql(), "SELECT table1.col1, table2.col1 FROM table1, table2");
    assert_eq!(
        compiled.warnings(),
        &[Warning::DuplicateColumnName {
            name: String::from("col1")
        }]
    );
}

#[test]
fn test_schema_qualified_table_and_quoting() {
    let t = table_in_schema("sales", "order", ["id", "Total"]);
    let s = select([col(&t, "id"), col(&t, "Total")]);
    assert_eq!(
        postgres(s),
        "SELECT sales.\"order\".id, sales.\"order\".\"Total\" FROM sales.\"order\""
    );
}

#[test]
fn test_nested_boolean_grouping() {
    let t1 = t1();
    let expr = and_([
        or_([col(&t1, "col1").eq(1), col(&t1, "col2").eq(2)]),
        not_(&col(&t1, "col3").eq(3)),
    ]);
    let s = select([col(&t1, "col1")]).where_(expr).unwrap();
    assert_eq!(
        generic(s),
        "SELECT table1.col1 FROM table1 WHERE \
         (table1.col1 = :col1_1 OR table1.col2 = :col2_1) AND table1.col3 != :col3_1"
    );
}

#[test]
fn test_case_in_columns_clause() {
    let t1 = t1();
    let expr = case()
        .when(col(&t1, "col1").gt(10), "big")
        .else_("small")
        .end();
    let s = select([expr.label("size")]);
    assert_eq!(
        generic(s),
        "SELECT CASE WHEN table1.col1 > :col1_1 THEN :param_1 ELSE :param_2 END AS size \
         FROM table1"
    );
}

#[test]
fn test_union_all_of_selects() {
    let (t1, t2) = (t1(), t2());
    let u = union_all([
        select([col(&t1, "col1")]).where_(col(&t1, "col2").eq(1)).unwrap(),
        select([col(&t2, "col1")]).where_(col(&t2, "col2").eq(2)).unwrap(),
    ]);
    assert_eq!(
        generic(u),
        "SELECT table1.col1 FROM table1 WHERE table1.col2 = :col2_1 \
         UNION ALL SELECT table2.col1 FROM table2 WHERE table2.col2 = :col2_2"
    );
}

// =============================================================================
// Compiled output
// =============================================================================

#[test]
fn test_result_columns() {
    let t = oxide_sql_clause::table("t", [
        oxide_sql_clause::ColumnDef::new("id", DataType::Integer),
        oxide_sql_clause::ColumnDef::new("name", DataType::Text),
    ]);
    let s = select([col(&t, "id"), col(&t, "name"), func::count(col(&t, "id"))]);
    let compiled = compiled(&s.into(), &GenericDialect::new());

    let columns: Vec<(&str, DataType)> = compiled
        .result_columns()
        .iter()
        .map(|c| (c.name(), c.data_type().clone()))
        .collect();
    assert_eq!(columns[0], ("id", DataType::Integer));
    assert_eq!(columns[1], ("name", DataType::Text));
    assert_eq!(columns[2].0, "count_1");
}

#[test]
fn test_bind_values_are_kept_with_names() {
    let t1 = t1();
    let s = select([col(&t1, "col1")])
        .where_(and_([col(&t1, "col1").eq(5), col(&t1, "col2").eq("x")]))
        .unwrap();
    let compiled = compiled(&s.into(), &PostgresDialect::new());

    assert_eq!(
        compiled.sql(),
        "SELECT table1.col1 FROM table1 WHERE table1.col1 = %(col1_1)s AND table1.col2 = %(col2_1)s"
    );
    let names: Vec<&str> = compiled.params().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["col1_1", "col2_1"]);
}

#[test]
fn test_literal_binds_statement() {
    let t1 = t1();
    let s = select([col(&t1, "col1")])
        .where_(col(&t1, "col2").eq("it's"))
        .unwrap()
        .limit(3);
    let options = CompileOptions::new().literal_binds(true);
    let compiled = compile_with(&s.into(), &GenericDialect::new(), &options).unwrap();

    assert_eq!(
        compiled.sql(),
        "SELECT table1.col1 FROM table1 WHERE table1.col2 = 'it''s' LIMIT 3"
    );
}

#[test]
fn test_missing_bind_value_under_literal_binds() {
    let expr = column("a").eq(oxide_sql_clause::bindparam("p"));
    let options = CompileOptions::new().literal_binds(true);
    let err = compile_with(&expr, &GenericDialect::new(), &options).unwrap_err();
    assert!(err.to_string().contains("'p'"));
}

// =============================================================================
// Control characters in caller text
// =============================================================================

const LOOKS_LIKE_BIND: &str = "\u{1}b0\u{2}";

#[test]
fn test_control_characters_in_inline_literal() {
    let expr = column("a").eq(LOOKS_LIKE_BIND);
    let options = CompileOptions::new().literal_binds(true);
    let compiled = compile_with(&expr, &GenericDialect::new(), &options).unwrap();

    assert_eq!(compiled.sql(), format!("a = '{LOOKS_LIKE_BIND}'"));
    assert!(compiled.binds().is_empty());
}

#[test]
fn test_control_characters_in_text_render_verbatim() {
    let expr = and_([text(format!("note = '{LOOKS_LIKE_BIND}'")), column("b").eq(7)]);
    let compiled = compile(&expr, &GenericDialect::new()).unwrap();

    assert_eq!(compiled.sql(), format!("note = '{LOOKS_LIKE_BIND}' AND b = :b_1"));
    assert_eq!(compiled.binds().len(), 1);
    assert_eq!(compiled.positional_names(), &["b_1"]);
}

#[test]
fn test_control_characters_in_names_and_expansion() {
    let weird = format!("x{LOOKS_LIKE_BIND}");
    let expr = and_([
        literal_column(weird.clone()).eq(column("z")),
        column("y").in_(vec![2, 3]),
    ]);
    let compiled = compile(&expr, &GenericDialect::new()).unwrap();
    let expanded = compiled.expand(&[]).unwrap();

    assert_eq!(expanded.sql, format!("{weird} = z AND y IN (:y_1_1, :y_1_2)"));
    assert_eq!(expanded.parameters.len(), 2);
}

#[test]
fn test_same_statement_compiles_identically_twice() {
    let t1 = t1();
    let s = select([func::count(col(&t1, "col1")), func::count(col(&t1, "col2"))])
        .where_(col(&t1, "col3").eq(1))
        .unwrap()
        .into();
    let first = compile(&s, &GenericDialect::new()).unwrap();
    let second = compile(&s, &GenericDialect::new()).unwrap();
    assert_eq!(first.sql(), second.sql());
    assert_eq!(
        first.sql(),
        "SELECT count(table1.col1) AS count_1, count(table1.col2) AS count_2 FROM table1 \
         WHERE table1.col3 = :col3_1"
    );
}
