//! Oracle dialect implementation.

use super::{Dialect, LimitStyle, RegexStyle};

/// Oracle dialect.
///
/// Table aliases are written without `AS`, and a SELECT with no FROM
/// entries selects from `DUAL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates a new Oracle dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn supports_native_boolean(&self) -> bool {
        false
    }

    fn regex_style(&self) -> RegexStyle {
        RegexStyle::Function
    }

    fn table_alias_keyword(&self) -> bool {
        false
    }

    fn from_less_select_suffix(&self) -> Option<&str> {
        Some("DUAL")
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::ParamStyle;

    #[test]
    fn test_oracle_dialect() {
        let dialect = OracleDialect::new();
        assert_eq!(dialect.name(), "oracle");
        assert_eq!(dialect.paramstyle(), ParamStyle::Named);
        assert!(!dialect.table_alias_keyword());
        assert_eq!(dialect.from_less_select_suffix(), Some("DUAL"));
        assert_eq!(dialect.regex_style(), RegexStyle::Function);
    }
}
