//! Declarative dialect configuration.
//!
//! A [`DialectConfig`] captures every knob of the [`Dialect`] trait as
//! plain data, so a dialect can be described in a JSON document:
//!
//! ```rust
//! use oxide_sql_clause::dialect::{Dialect, DialectConfig, ParamStyle};
//!
//! let config = DialectConfig::from_json(
//!     r#"{"name": "warehouse", "paramstyle": "numeric_dollar", "native_boolean": false}"#,
//! )
//! .unwrap();
//! let dialect = config.into_dialect();
//! assert_eq!(dialect.name(), "warehouse");
//! assert_eq!(dialect.paramstyle(), ParamStyle::NumericDollar);
//! assert_eq!(dialect.identifier_quote(), '"');
//! ```

use serde::{Deserialize, Serialize};

use super::{by_name, ConcatStyle, Dialect, GenericDialect, LimitStyle, ParamStyle, RegexStyle};
use crate::error::Result;

/// Plain-data description of a dialect. Missing fields take the values of
/// the generic dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    /// Dialect name, used in error messages and logs.
    pub name: String,
    /// Placeholder style.
    pub paramstyle: ParamStyle,
    /// Whether `true` / `false` are valid literals.
    pub native_boolean: bool,
    /// Opening identifier quote.
    pub identifier_quote: char,
    /// Closing identifier quote, when it differs from the opening one.
    pub identifier_quote_end: Option<char>,
    /// Whether `ILIKE` is available.
    pub supports_ilike: bool,
    /// Regular expression operator style.
    pub regex_style: RegexStyle,
    /// String concatenation style.
    pub concat_style: ConcatStyle,
    /// Whether table aliases are introduced with `AS`.
    pub table_alias_keyword: bool,
    /// FROM target of a SELECT without FROM entries.
    pub from_less_select_suffix: Option<String>,
    /// LIMIT / OFFSET style.
    pub limit_style: LimitStyle,
    /// Whether RETURNING is available.
    pub supports_returning: bool,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::from_dialect(&GenericDialect::new())
    }
}

impl DialectConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The configuration of a built-in dialect.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Argument`] for unknown names.
    pub fn builtin(name: &str) -> Result<Self> {
        Ok(Self::from_dialect(by_name(name)?.as_ref()))
    }

    /// Captures the behavior of an existing dialect.
    #[must_use]
    pub fn from_dialect(dialect: &dyn Dialect) -> Self {
        let quote = dialect.identifier_quote();
        let quote_end = dialect.identifier_quote_end();
        Self {
            name: String::from(dialect.name()),
            paramstyle: dialect.paramstyle(),
            native_boolean: dialect.supports_native_boolean(),
            identifier_quote: quote,
            identifier_quote_end: (quote_end != quote).then_some(quote_end),
            supports_ilike: dialect.supports_ilike(),
            regex_style: dialect.regex_style(),
            concat_style: dialect.concat_style(),
            table_alias_keyword: dialect.table_alias_keyword(),
            from_less_select_suffix: dialect.from_less_select_suffix().map(String::from),
            limit_style: dialect.limit_style(),
            supports_returning: dialect.supports_returning(),
        }
    }

    /// Builds a dialect from this configuration.
    #[must_use]
    pub const fn into_dialect(self) -> ConfiguredDialect {
        ConfiguredDialect { config: self }
    }
}

/// A dialect driven by a [`DialectConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDialect {
    config: DialectConfig,
}

impl ConfiguredDialect {
    /// The underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &DialectConfig {
        &self.config
    }
}

impl From<DialectConfig> for ConfiguredDialect {
    fn from(config: DialectConfig) -> Self {
        config.into_dialect()
    }
}

impl Dialect for ConfiguredDialect {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn identifier_quote(&self) -> char {
        self.config.identifier_quote
    }

    fn identifier_quote_end(&self) -> char {
        self.config
            .identifier_quote_end
            .unwrap_or(self.config.identifier_quote)
    }

    fn paramstyle(&self) -> ParamStyle {
        self.config.paramstyle
    }

    fn supports_native_boolean(&self) -> bool {
        self.config.native_boolean
    }

    fn supports_ilike(&self) -> bool {
        self.config.supports_ilike
    }

    fn regex_style(&self) -> RegexStyle {
        self.config.regex_style
    }

    fn concat_style(&self) -> ConcatStyle {
        self.config.concat_style
    }

    fn table_alias_keyword(&self) -> bool {
        self.config.table_alias_keyword
    }

    fn from_less_select_suffix(&self) -> Option<&str> {
        self.config.from_less_select_suffix.as_deref()
    }

    fn limit_style(&self) -> LimitStyle {
        self.config.limit_style
    }

    fn supports_returning(&self) -> bool {
        self.config.supports_returning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults_match_generic() {
        let config = DialectConfig::from_json("{}").unwrap();
        assert_eq!(config, DialectConfig::default());
        assert_eq!(config, DialectConfig::builtin("generic").unwrap());
    }

    #[test]
    fn test_builtin_round_trips_through_json() {
        let mssql = DialectConfig::builtin("mssql").unwrap();
        assert_eq!(mssql.identifier_quote, '[');
        assert_eq!(mssql.identifier_quote_end, Some(']'));
        let json = serde_json::to_string(&mssql).unwrap();
        assert!(json.contains("\"limit_style\":\"offset_fetch\""));
        let parsed = DialectConfig::from_json(&json).unwrap();
        assert_eq!(parsed, mssql);
        let dialect = parsed.into_dialect();
        assert_eq!(dialect.quote("Name"), "[Name]");
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let err = DialectConfig::from_json(r#"{"paramstyle": "colon"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_less_suffix_is_carried() {
        let oracle = DialectConfig::builtin("oracle").unwrap().into_dialect();
        assert_eq!(oracle.from_less_select_suffix(), Some("DUAL"));
        assert!(!oracle.table_alias_keyword());
    }
}
