//! PostgreSQL dialect implementation.

use super::{Dialect, ParamStyle, RegexStyle};

/// PostgreSQL dialect, with the `pyformat` placeholders of psycopg-style
/// drivers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgresql"
    }

    fn paramstyle(&self) -> ParamStyle {
        ParamStyle::Pyformat
    }

    fn supports_ilike(&self) -> bool {
        true
    }

    fn regex_style(&self) -> RegexStyle {
        RegexStyle::Operator
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.name(), "postgresql");
        assert_eq!(dialect.paramstyle(), ParamStyle::Pyformat);
        assert!(dialect.supports_native_boolean());
        assert!(dialect.supports_ilike());
        assert_eq!(dialect.regex_style(), RegexStyle::Operator);
    }
}
