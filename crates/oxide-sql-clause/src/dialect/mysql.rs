//! MySQL dialect implementation.

use super::{ConcatStyle, Dialect, ParamStyle, RegexStyle};

/// MySQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn paramstyle(&self) -> ParamStyle {
        ParamStyle::Format
    }

    fn regex_style(&self) -> RegexStyle {
        RegexStyle::Keyword
    }

    fn concat_style(&self) -> ConcatStyle {
        ConcatStyle::Function // `||` is logical OR unless PIPES_AS_CONCAT is set
    }
}
