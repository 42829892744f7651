#![allow(dead_code)]

use std::sync::Once;

use oxide_sql_clause::{
    compile, ClauseElement, Compiled, Dialect, GenericDialect, PostgresDialect, SqliteDialect,
};

/// Installs a test-writer subscriber once; `RUST_LOG` controls the filter.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("oxide_sql_clause=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

pub fn compiled(element: &ClauseElement, dialect: &dyn Dialect) -> Compiled {
    compile(element, dialect)
        .unwrap_or_else(|e| panic!("Failed to compile {element:?}\nError: {e}"))
}

pub fn sql(element: &ClauseElement, dialect: &dyn Dialect) -> String {
    String::from(compiled(element, dialect).sql())
}

pub fn generic(element: impl Into<ClauseElement>) -> String {
    sql(&element.into(), &GenericDialect::new())
}

pub fn postgres(element: impl Into<ClauseElement>) -> String {
    sql(&element.into(), &PostgresDialect::new())
}

pub fn sqlite(element: impl Into<ClauseElement>) -> String {
    sql(&element.into(), &SqliteDialect::new())
}

pub fn compile_err(element: impl Into<ClauseElement>) -> oxide_sql_clause::Error {
    let element = element.into();
    compile(&element, &GenericDialect::new())
        .expect_err(&format!("Expected compile error for: {element:?}"))
}

pub fn col(table: &ClauseElement, key: &str) -> ClauseElement {
    table
        .c(key)
        .unwrap_or_else(|e| panic!("No column '{key}': {e}"))
}

pub fn alias(table: &ClauseElement, name: &str) -> ClauseElement {
    table
        .alias(name)
        .unwrap_or_else(|e| panic!("Failed to alias as '{name}': {e}"))
}

/// `table1(col1, col2, col3)`
pub fn t1() -> ClauseElement {
    oxide_sql_clause::table("table1", ["col1", "col2", "col3"])
}

/// `table2(col1, col2, col3)`
pub fn t2() -> ClauseElement {
    oxide_sql_clause::table("table2", ["col1", "col2", "col3"])
}

/// `table3(col1, col2, col3)`
pub fn t3() -> ClauseElement {
    oxide_sql_clause::table("table3", ["col1", "col2", "col3"])
}
