//! SQL Dialect support.
//!
//! Databases disagree on parameter placeholders, identifier quoting,
//! boolean literals and a handful of operator spellings. The compiler asks
//! a [`Dialect`] about each of these; everything else is rendered the same
//! way for every database.

mod config;
mod firebird;
mod generic;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

use serde::{Deserialize, Serialize};

pub use config::{ConfiguredDialect, DialectConfig};
pub use firebird::FirebirdDialect;
pub use generic::GenericDialect;
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Error, Result};

/// Words that are always quoted when used as identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "between",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "column",
    "constraint",
    "create",
    "cross",
    "current_date",
    "current_role",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "new",
    "not",
    "notnull",
    "null",
    "off",
    "offset",
    "old",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "right",
    "select",
    "session_user",
    "set",
    "similar",
    "some",
    "symmetric",
    "table",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "verbose",
    "when",
    "where",
];

/// How bound parameters are written into the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    /// `:name`
    #[default]
    Named,
    /// `?`
    Qmark,
    /// `:1`, `:2`, ...
    Numeric,
    /// `$1`, `$2`, ...
    NumericDollar,
    /// `%s`
    Format,
    /// `%(name)s`
    Pyformat,
}

impl ParamStyle {
    /// Returns true if parameters are matched to placeholders by position.
    #[must_use]
    pub const fn is_positional(self) -> bool {
        matches!(
            self,
            Self::Qmark | Self::Numeric | Self::NumericDollar | Self::Format
        )
    }

    /// Renders the placeholder of the parameter `name` appearing at the
    /// 1-based `position`.
    #[must_use]
    pub fn placeholder(self, name: &str, position: usize) -> String {
        match self {
            Self::Named => format!(":{name}"),
            Self::Qmark => String::from("?"),
            Self::Numeric => format!(":{position}"),
            Self::NumericDollar => format!("${position}"),
            Self::Format => String::from("%s"),
            Self::Pyformat => format!("%({name})s"),
        }
    }
}

/// How regular expression matches are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexStyle {
    /// The dialect has no regular expression operator.
    #[default]
    Unsupported,
    /// `x ~ y` / `x !~ y`.
    Operator,
    /// `x REGEXP y` / `x NOT REGEXP y`.
    Keyword,
    /// `REGEXP_LIKE(x, y)` / `NOT REGEXP_LIKE(x, y)`.
    Function,
}

/// How string concatenation is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcatStyle {
    /// `a || b`.
    #[default]
    Operator,
    /// `concat(a, b)`.
    Function,
    /// `a + b`.
    Plus,
}

/// How LIMIT and OFFSET are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`.
    #[default]
    LimitOffset,
    /// `OFFSET m ROWS FETCH FIRST n ROWS ONLY`.
    OffsetFetch,
}

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &str;

    /// Returns the opening identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the closing identifier quote character.
    fn identifier_quote_end(&self) -> char {
        self.identifier_quote()
    }

    /// Returns the parameter placeholder style.
    fn paramstyle(&self) -> ParamStyle {
        ParamStyle::Named
    }

    /// Returns whether `true` / `false` are valid SQL literals.
    fn supports_native_boolean(&self) -> bool {
        true
    }

    /// Returns whether the dialect has a case-insensitive `ILIKE`.
    fn supports_ilike(&self) -> bool {
        false
    }

    /// Returns the regular expression operator style.
    fn regex_style(&self) -> RegexStyle {
        RegexStyle::Unsupported
    }

    /// Returns the string concatenation style.
    fn concat_style(&self) -> ConcatStyle {
        ConcatStyle::Operator
    }

    /// Returns whether table aliases are introduced with `AS`.
    fn table_alias_keyword(&self) -> bool {
        true
    }

    /// Returns the FROM target of a SELECT without FROM entries, for
    /// dialects that require one.
    fn from_less_select_suffix(&self) -> Option<&str> {
        None
    }

    /// Returns the LIMIT / OFFSET style.
    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset
    }

    /// Returns whether the dialect supports RETURNING clause.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns true if `word` is reserved.
    fn is_reserved(&self, word: &str) -> bool {
        RESERVED_WORDS.contains(&word)
    }

    /// Returns true if `ident` must be quoted: reserved words, names with
    /// upper-case letters, names starting with a digit or `$`, and names
    /// containing anything but letters, digits, `_` and `$`.
    fn requires_quotes(&self, ident: &str) -> bool {
        let Some(first) = ident.chars().next() else {
            return true;
        };
        let lower = ident.to_lowercase();
        self.is_reserved(&lower)
            || first.is_ascii_digit()
            || first == '$'
            || !ident
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            || lower != ident
    }

    /// Quotes an identifier, escaping embedded closing quotes.
    fn quote_identifier(&self, name: &str) -> String {
        let end = self.identifier_quote_end();
        let escaped = name.replace(end, &format!("{end}{end}"));
        format!("{}{escaped}{end}", self.identifier_quote())
    }

    /// Quotes an identifier if necessary.
    fn quote(&self, name: &str) -> String {
        if self.requires_quotes(name) {
            self.quote_identifier(name)
        } else {
            String::from(name)
        }
    }
}

/// Resolves a built-in dialect by name.
///
/// # Errors
///
/// Returns [`Error::Argument`] for unknown names.
pub fn by_name(name: &str) -> Result<Box<dyn Dialect>> {
    let dialect: Box<dyn Dialect> = match name.to_ascii_lowercase().as_str() {
        "generic" | "default" => Box::new(GenericDialect::new()),
        "sqlite" => Box::new(SqliteDialect::new()),
        "postgresql" | "postgres" => Box::new(PostgresDialect::new()),
        "mysql" | "mariadb" => Box::new(MySqlDialect::new()),
        "mssql" => Box::new(MsSqlDialect::new()),
        "oracle" => Box::new(OracleDialect::new()),
        "firebird" => Box::new(FirebirdDialect::new()),
        _ => return Err(Error::argument(format!("Unknown dialect '{name}'"))),
    };
    Ok(dialect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(ParamStyle::Named.placeholder("x_1", 3), ":x_1");
        assert_eq!(ParamStyle::Qmark.placeholder("x_1", 3), "?");
        assert_eq!(ParamStyle::Numeric.placeholder("x_1", 3), ":3");
        assert_eq!(ParamStyle::NumericDollar.placeholder("x_1", 3), "$3");
        assert_eq!(ParamStyle::Format.placeholder("x_1", 3), "%s");
        assert_eq!(ParamStyle::Pyformat.placeholder("x_1", 3), "%(x_1)s");
        assert!(ParamStyle::Qmark.is_positional());
        assert!(!ParamStyle::Pyformat.is_positional());
    }

    #[test]
    fn test_requires_quotes() {
        let dialect = GenericDialect::new();
        assert!(!dialect.requires_quotes("col1"));
        assert!(!dialect.requires_quotes("some_table$"));
        assert!(dialect.requires_quotes("select"));
        assert!(dialect.requires_quotes("Col1"));
        assert!(dialect.requires_quotes("1col"));
        assert!(dialect.requires_quotes("$col"));
        assert!(dialect.requires_quotes("my col"));
        assert!(dialect.requires_quotes(""));
    }

    #[test]
    fn test_quote_escapes_closing_quote() {
        let dialect = GenericDialect::new();
        assert_eq!(dialect.quote("col1"), "col1");
        assert_eq!(dialect.quote("order"), "\"order\"");
        assert_eq!(dialect.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(MsSqlDialect::new().quote("My]Col"), "[My]]Col]");
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("postgres").unwrap().name(), "postgresql");
        assert_eq!(by_name("SQLite").unwrap().name(), "sqlite");
        let err = by_name("db2").err().unwrap();
        assert!(matches!(err, Error::Argument { .. }));
        assert!(err.to_string().contains("db2"));
    }
}
