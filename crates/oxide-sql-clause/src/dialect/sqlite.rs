//! SQLite dialect implementation.

use super::{Dialect, ParamStyle, RegexStyle};

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn paramstyle(&self) -> ParamStyle {
        ParamStyle::Qmark
    }

    fn supports_native_boolean(&self) -> bool {
        false
    }

    fn regex_style(&self) -> RegexStyle {
        RegexStyle::Keyword // needs a user-defined regexp() function
    }

    fn supports_returning(&self) -> bool {
        true // SQLite 3.35.0+
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.paramstyle(), ParamStyle::Qmark);
        assert!(!dialect.supports_native_boolean());
        assert!(dialect.supports_returning());
    }
}
