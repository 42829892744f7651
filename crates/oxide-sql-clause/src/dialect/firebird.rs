//! Firebird dialect implementation.

use super::{Dialect, LimitStyle, ParamStyle};

/// Firebird dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirebirdDialect;

impl FirebirdDialect {
    /// Creates a new Firebird dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for FirebirdDialect {
    fn name(&self) -> &str {
        "firebird"
    }

    fn paramstyle(&self) -> ParamStyle {
        ParamStyle::Qmark
    }

    fn supports_native_boolean(&self) -> bool {
        false
    }

    fn from_less_select_suffix(&self) -> Option<&str> {
        Some("rdb$database")
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }
}
