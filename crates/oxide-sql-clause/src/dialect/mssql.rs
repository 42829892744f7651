//! Microsoft SQL Server dialect implementation.

use super::{ConcatStyle, Dialect, LimitStyle, ParamStyle};

/// SQL Server dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MsSqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn identifier_quote(&self) -> char {
        '['
    }

    fn identifier_quote_end(&self) -> char {
        ']'
    }

    fn paramstyle(&self) -> ParamStyle {
        ParamStyle::Qmark
    }

    fn supports_native_boolean(&self) -> bool {
        false
    }

    fn concat_style(&self) -> ConcatStyle {
        ConcatStyle::Plus
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }
}
