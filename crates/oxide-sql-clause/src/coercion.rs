//! Role checks for elements placed into statement slots.
//!
//! Comparator methods accept any element; the statement builders check
//! that what they receive can play the role of the slot it lands in, and
//! coerce SELECT statements into subqueries where that is meaningful.

use core::fmt;

use crate::elements::{ClauseElement, ElementKind, ScalarSelect};
use crate::error::{Error, Result};
use crate::selectable::{describe, AliasKind};
use crate::warnings::{self, Warning};

/// The slot an element is placed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// WHERE criteria.
    Where,
    /// HAVING criteria.
    Having,
    /// ON clause of a join.
    OnClause,
    /// ORDER BY entry.
    OrderBy,
    /// GROUP BY entry.
    GroupBy,
    /// A value of INSERT or UPDATE.
    DmlValue,
    /// The columns clause of a SELECT.
    ColumnsClause,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Where => "WHERE/HAVING",
            Self::Having => "HAVING",
            Self::OnClause => "ON clause",
            Self::OrderBy => "ORDER BY",
            Self::GroupBy => "GROUP BY",
            Self::DmlValue => "DML value",
            Self::ColumnsClause => "columns clause",
        })
    }
}

fn check_operands(element: &ClauseElement, role: Role) -> Result<()> {
    let nested: Vec<&ClauseElement> = match element.kind() {
        ElementKind::Table(_) | ElementKind::Alias(_) | ElementKind::Join(_) => {
            return Err(Error::argument(format!(
                "SQL expression for {role} role expected, got {}",
                describe(element)
            )));
        }
        ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
            return Err(Error::argument(format!(
                "SQL expression for {role} role expected, got a SELECT statement; \
                 call scalar_subquery() on it first"
            )));
        }
        ElementKind::Insert(_) | ElementKind::Update(_) | ElementKind::Delete(_) => {
            return Err(Error::argument(format!(
                "SQL expression for {role} role expected, got a DML statement"
            )));
        }
        ElementKind::Unary(u) => vec![&u.element],
        ElementKind::Binary(b) => vec![&b.left, &b.right],
        ElementKind::ClauseList(list) => list.clauses.iter().collect(),
        ElementKind::Tuple(t) => t.clauses.iter().collect(),
        ElementKind::Grouping(g) => vec![&g.element],
        ElementKind::Label(l) => vec![&l.element],
        ElementKind::Function(f) => f.args.iter().collect(),
        ElementKind::Case(c) => c
            .value
            .iter()
            .chain(c.whens.iter().flat_map(|(w, t)| [w, t]))
            .chain(c.else_.iter())
            .collect(),
        ElementKind::Cast(c) => vec![&c.element],
        ElementKind::Custom(c) => c.children.iter().collect(),
        ElementKind::Column(_)
        | ElementKind::BindParam(_)
        | ElementKind::Text(_)
        | ElementKind::Null
        | ElementKind::True
        | ElementKind::False
        | ElementKind::LabelReference(_)
        | ElementKind::ScalarSelect(_) => Vec::new(),
    };
    nested.into_iter().try_for_each(|e| check_operands(e, role))
}

/// Checks that `element` is a SQL expression usable in `role`.
///
/// # Errors
///
/// Returns [`Error::Argument`] if the element, or one of its operands
/// outside a scalar subquery, is a FROM clause or a statement.
pub fn expect_expression(element: ClauseElement, role: Role) -> Result<ClauseElement> {
    check_operands(&element, role)?;
    Ok(element)
}

/// [`expect_expression`] for WHERE / HAVING / ON criteria.
pub(crate) fn expect_where_clause(element: ClauseElement) -> Result<ClauseElement> {
    expect_expression(element, Role::Where)
}

/// Coerces an entry of a SELECT columns clause.
///
/// FROM clauses are kept as-is; the SELECT expands them into their
/// columns. A SELECT becomes a scalar subquery with a warning.
pub(crate) fn columns_clause_entry(element: ClauseElement) -> ClauseElement {
    if element.is_select_statement() {
        warnings::emit(Warning::ImplicitScalarSubquery);
        return ClauseElement::new(ElementKind::ScalarSelect(ScalarSelect { element }));
    }
    element
}

/// Coerces an element into a FROM entry.
///
/// A SELECT becomes an anonymous subquery with a warning.
///
/// # Errors
///
/// Returns [`Error::Argument`] for column expressions.
pub fn expect_from_clause(element: ClauseElement) -> Result<ClauseElement> {
    match element.kind() {
        ElementKind::Table(_)
        | ElementKind::Alias(_)
        | ElementKind::Join(_)
        | ElementKind::Text(_) => Ok(element),
        ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
            warnings::emit(Warning::ImplicitSubquery);
            Ok(element.wrap_alias(None, "anon", AliasKind::Subquery))
        }
        _ => Err(Error::argument(format!(
            "FROM expression expected, got {}",
            describe(&element)
        ))),
    }
}
