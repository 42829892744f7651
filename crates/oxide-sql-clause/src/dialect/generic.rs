//! The baseline dialect.
//!
//! [`GenericDialect`] takes every default of the [`Dialect`] trait, and the
//! defaults of [`DialectConfig`] are read off it. A custom dialect is
//! described by starting from [`GenericDialect::config`] and changing the
//! fields that differ.

use super::{Dialect, DialectConfig};

/// ANSI-flavored SQL: `:name` binds, native booleans, `"` quoting,
/// `LIMIT` / `OFFSET`. `Display` on clause elements renders with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// This dialect as plain data, ready to be edited into another one.
    #[must_use]
    pub fn config() -> DialectConfig {
        DialectConfig::from_dialect(&Self)
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &str {
        "generic"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::compiler::compile;
    use crate::dialect::{ConcatStyle, LimitStyle, ParamStyle, RegexStyle};
    use crate::elements::column_typed;
    use crate::selectable::{select, table};
    use crate::types::DataType;

    #[test]
    fn test_generic_capabilities() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.name(), "generic");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.paramstyle(), ParamStyle::Named);
        assert!(dialect.supports_native_boolean());
        assert!(!dialect.supports_ilike());
        assert_eq!(dialect.regex_style(), RegexStyle::Unsupported);
        assert_eq!(dialect.concat_style(), ConcatStyle::Operator);
        assert_eq!(dialect.limit_style(), LimitStyle::LimitOffset);
        assert!(!dialect.supports_returning());
    }

    #[test]
    fn test_config_defaults_are_generic() {
        let config = GenericDialect::config();
        assert_eq!(config, DialectConfig::default());
        assert_eq!(DialectConfig::from_json("{}").unwrap(), config);
    }

    #[test]
    fn test_configured_copy_renders_identically() {
        let t = table("My Table", ["id", "name"]);
        let s = select([t.c("id").unwrap()])
            .where_(column_typed("active", DataType::Boolean))
            .unwrap()
            .limit(5)
            .into();

        let configured = GenericDialect::config().into_dialect();
        assert_eq!(
            compile(&s, &configured).unwrap().sql(),
            compile(&s, &GenericDialect::new()).unwrap().sql()
        );
    }
}
