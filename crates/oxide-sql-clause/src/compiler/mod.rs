//! Rendering clause trees to SQL text.
//!
//! [`compile`] walks a statement once and produces a [`Compiled`]: the SQL
//! string in the dialect's parameter style, the bind parameters in order,
//! the result columns and any warnings raised on the way. All naming state
//! (anonymous labels, bind names, CTE registry) lives for one call only, so
//! compiling the same statement twice yields the same text.
//!
//! Expanding parameters (`x IN (...)` over a Rust list) render as a
//! `__[POSTCOMPILE_<name>]` token; [`Compiled::expand`] replaces each token
//! with one placeholder per list element without compiling again.
//!
//! ```rust
//! use oxide_sql_clause::{column, compile, GenericDialect};
//!
//! let expr = column("x").in_(vec![1, 2, 3]);
//! let compiled = compile(&expr, &GenericDialect::new()).unwrap();
//! assert_eq!(compiled.sql(), "x IN (__[POSTCOMPILE_x_1])");
//!
//! let expanded = compiled.expand(&[]).unwrap();
//! assert_eq!(expanded.sql, "x IN (:x_1_1, :x_1_2, :x_1_3)");
//! ```

mod expanding;
mod names;
mod render;

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

pub use expanding::ExpandedStatement;
pub use names::BoundParameter;

use crate::dialect::{Dialect, ParamStyle};
use crate::elements::{ClauseElement, CustomClause};
use crate::error::{Error, Result};
use crate::types::DataType;
use crate::warnings::{self, Warning};

/// Renders a custom element from its already-rendered children.
///
/// The children carry the compiler's bind markers, so the returned text is
/// spliced in as is. Renderers must pass caller data through
/// [`crate::elements::text`] children rather than formatting it in.
pub type CustomRenderer = Arc<dyn Fn(&CustomClause, &[String]) -> String + Send + Sync>;

/// Per-call compilation settings.
#[derive(Clone, Default)]
pub struct CompileOptions {
    literal_binds: bool,
    renderers: HashMap<String, CustomRenderer>,
}

impl CompileOptions {
    /// Default options: bound parameters, no custom renderers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders bound values inline instead of as placeholders.
    #[must_use]
    pub const fn literal_binds(mut self, enabled: bool) -> Self {
        self.literal_binds = enabled;
        self
    }

    /// Registers the renderer for custom elements tagged `visit_name`.
    #[must_use]
    pub fn renderer(
        mut self,
        visit_name: impl Into<String>,
        render: impl Fn(&CustomClause, &[String]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.renderers.insert(visit_name.into(), Arc::new(render));
        self
    }

    pub(crate) const fn uses_literal_binds(&self) -> bool {
        self.literal_binds
    }

    pub(crate) fn renderer_for(&self, visit_name: &str) -> Option<&CustomRenderer> {
        self.renderers.get(visit_name)
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut renderers: Vec<&String> = self.renderers.keys().collect();
        renderers.sort();
        f.debug_struct("CompileOptions")
            .field("literal_binds", &self.literal_binds)
            .field("renderers", &renderers)
            .finish()
    }
}

/// A column of the statement's result rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    name: String,
    data_type: DataType,
}

impl ResultColumn {
    /// The name the column is returned under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The SQL type.
    #[must_use]
    pub const fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

/// A piece of the rendered statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    /// A single placeholder for the bind at this slot.
    Bind(usize),
    /// A postcompile list; `negated` selects the empty-set form of NOT IN.
    Expanding { bind: usize, negated: bool },
}

const MARK_START: char = '\u{1}';
const MARK_END: char = '\u{2}';

/// Marker body standing for a literal `MARK_START` character.
const ESCAPED_START: &str = "u";

pub(crate) fn bind_marker(slot: usize, tag: char) -> String {
    format!("{MARK_START}{tag}{slot}{MARK_END}")
}

/// Makes text that did not come from the compiler safe to splice into the
/// rendered statement: a marker character in it can't be read back as a
/// bind placeholder.
pub(crate) fn escape_marks(text: &str) -> String {
    if text.contains(MARK_START) {
        text.replace(MARK_START, &format!("{MARK_START}{ESCAPED_START}{MARK_END}"))
    } else {
        String::from(text)
    }
}

/// Splits rendered text at bind markers.
fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(MARK_START) {
        let Some(len) = rest[start..].find(MARK_END) else {
            break;
        };
        let marker = &rest[start + 1..start + len];
        if marker == ESCAPED_START {
            if start > 0 {
                out.push(Segment::Text(String::from(&rest[..start])));
            }
            out.push(Segment::Text(String::from(MARK_START)));
            rest = &rest[start + len + 1..];
            continue;
        }
        let mut chars = marker.chars();
        let tag = chars.next();
        let slot = chars.as_str().parse::<usize>().ok();
        let segment = match (tag, slot) {
            (Some('b'), Some(slot)) => Segment::Bind(slot),
            (Some('e'), Some(slot)) => Segment::Expanding {
                bind: slot,
                negated: false,
            },
            (Some('n'), Some(slot)) => Segment::Expanding {
                bind: slot,
                negated: true,
            },
            _ => {
                out.push(Segment::Text(String::from(&rest[..start + len + 1])));
                rest = &rest[start + len + 1..];
                continue;
            }
        };
        if start > 0 {
            out.push(Segment::Text(String::from(&rest[..start])));
        }
        out.push(segment);
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        out.push(Segment::Text(String::from(rest)));
    }
    out
}

/// The text standing for an expanding parameter until execution time.
#[must_use]
pub fn postcompile_token(name: &str) -> String {
    format!("__[POSTCOMPILE_{name}]")
}

/// The text replacing an expanding parameter bound to an empty list.
pub(crate) const fn empty_set_expr(negated: bool) -> &'static str {
    if negated {
        "NULL) OR (1 = 1"
    } else {
        "NULL) AND (1 != 1"
    }
}

/// A compiled statement.
#[derive(Debug, Clone)]
pub struct Compiled {
    sql: String,
    segments: Vec<Segment>,
    binds: Vec<BoundParameter>,
    positional_names: Vec<String>,
    result_columns: Vec<ResultColumn>,
    warnings: Vec<Warning>,
    paramstyle: ParamStyle,
}

impl Compiled {
    /// The SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind parameters in order of first appearance.
    #[must_use]
    pub fn binds(&self) -> &[BoundParameter] {
        &self.binds
    }

    /// Looks up a bind parameter by rendered name.
    #[must_use]
    pub fn bind(&self, name: &str) -> Option<&BoundParameter> {
        self.binds.iter().find(|b| b.name == name)
    }

    /// Parameters in the order the driver expects them: first appearance
    /// for named styles, one entry per placeholder for positional styles.
    #[must_use]
    pub fn params(&self) -> Vec<&BoundParameter> {
        if self.paramstyle.is_positional() {
            self.positional_names
                .iter()
                .filter_map(|name| self.bind(name))
                .collect()
        } else {
            self.binds.iter().collect()
        }
    }

    /// Names of the non-expanding placeholders in textual order.
    #[must_use]
    pub fn positional_names(&self) -> &[String] {
        &self.positional_names
    }

    /// Columns of the result rows.
    #[must_use]
    pub fn result_columns(&self) -> &[ResultColumn] {
        &self.result_columns
    }

    /// Warnings raised while compiling.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// The parameter style of the SQL text.
    #[must_use]
    pub const fn paramstyle(&self) -> ParamStyle {
        self.paramstyle
    }
}

impl fmt::Display for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Compiles `element` for `dialect` with default options.
///
/// # Errors
///
/// Returns [`crate::Error::Compile`] for structural problems found while
/// rendering and [`crate::Error::UnsupportedCompilation`] for custom
/// elements without a renderer.
pub fn compile(element: &ClauseElement, dialect: &dyn Dialect) -> Result<Compiled> {
    compile_with(element, dialect, &CompileOptions::default())
}

/// Compiles `element` for `dialect` with explicit options.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_with(
    element: &ClauseElement,
    dialect: &dyn Dialect,
    options: &CompileOptions,
) -> Result<Compiled> {
    let (output, warnings) =
        warnings::capture(|| render::SqlCompiler::new(dialect, options).compile_statement(element));
    let output = output?;

    let paramstyle = dialect.paramstyle();
    let segments = segments(&output.text);
    let bind_at = |slot: usize| {
        output.binds.get(slot).ok_or_else(|| {
            Error::compile(format!("Rendered statement refers to unknown bind slot {slot}"))
        })
    };
    let mut sql = String::with_capacity(output.text.len());
    let mut positional_names = Vec::new();
    for segment in &segments {
        match segment {
            Segment::Text(text) => sql.push_str(text),
            Segment::Bind(slot) => {
                let name = &bind_at(*slot)?.name;
                positional_names.push(name.clone());
                sql.push_str(&paramstyle.placeholder(name, positional_names.len()));
            }
            Segment::Expanding { bind, .. } => {
                sql.push_str(&postcompile_token(&bind_at(*bind)?.name));
            }
        }
    }

    debug!(
        dialect = dialect.name(),
        kind = element.visit_name(),
        binds = output.binds.len(),
        warnings = warnings.len(),
        "compiled statement"
    );

    Ok(Compiled {
        sql,
        segments,
        binds: output.binds,
        positional_names,
        result_columns: output.result_columns,
        warnings,
        paramstyle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{GenericDialect, PostgresDialect, SqliteDialect};
    use crate::elements::{and_, bindparam, column};
    use crate::value::BindValue;

    #[test]
    fn test_segments_split_at_markers() {
        let text = format!("a = {} AND b IN ({})", bind_marker(0, 'b'), bind_marker(1, 'n'));
        assert_eq!(
            segments(&text),
            vec![
                Segment::Text(String::from("a = ")),
                Segment::Bind(0),
                Segment::Text(String::from(" AND b IN (")),
                Segment::Expanding {
                    bind: 1,
                    negated: true
                },
                Segment::Text(String::from(")")),
            ]
        );
    }

    #[test]
    fn test_escaped_marker_is_plain_text() {
        let caller = "'\u{1}b0\u{2}'";
        let text = format!("{} = {}", escape_marks(caller), bind_marker(0, 'b'));
        let parts = segments(&text);

        assert_eq!(parts.last(), Some(&Segment::Bind(0)));
        let plain: String = parts
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(plain, format!("{caller} = "));
    }

    #[test]
    fn test_named_and_positional_params() {
        let expr = and_([
            column("a").eq(bindparam("x").value(1)),
            column("b").eq(bindparam("x").value(1)),
        ]);
        let named = compile(&expr, &PostgresDialect::new()).unwrap();
        assert_eq!(named.sql(), "a = %(x)s AND b = %(x)s");
        assert_eq!(named.params().len(), 1);

        let positional = compile(&expr, &SqliteDialect::new()).unwrap();
        assert_eq!(positional.sql(), "a = ? AND b = ?");
        assert_eq!(positional.positional_names(), &["x", "x"]);
        assert_eq!(positional.params().len(), 2);
    }

    #[test]
    fn test_bind_lookup_carries_value() {
        let compiled = compile(&column("a").eq(5), &GenericDialect::new()).unwrap();
        let bind = compiled.bind("a_1").unwrap();
        assert_eq!(bind.value(), Some(&BindValue::from(crate::value::SqlValue::Int(5))));
        assert_eq!(compiled.to_string(), "a = :a_1");
    }

    #[test]
    fn test_literal_binds() {
        let options = CompileOptions::new().literal_binds(true);
        let expr = and_([column("a").eq("it's"), column("b").in_(vec![1, 2])]);
        let compiled = compile_with(&expr, &GenericDialect::new(), &options).unwrap();
        assert_eq!(compiled.sql(), "a = 'it''s' AND b IN (1, 2)");
        assert!(compiled.binds().is_empty());
    }

    #[test]
    fn test_options_debug_lists_renderers() {
        let options = CompileOptions::new().renderer("widget", |_, children| children.join(""));
        let debug = format!("{options:?}");
        assert!(debug.contains("widget"));
        assert!(options.renderer_for("widget").is_some());
    }
}
