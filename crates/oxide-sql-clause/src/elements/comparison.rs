//! Comparator methods and operator overloads on clause elements.
//!
//! Right-hand values are coerced into elements through [`IntoOperand`]:
//! plain Rust values become unique bind parameters named after the left
//! operand, elements pass through, and SELECT statements become scalar
//! subqueries.

use core::ops;

use super::expression::{
    and_, bind_value, expanding_bind, literal_column, not_, null, or_, BinaryExpression,
    BindParamBuilder, CaseBuilder, Name, ScalarSelect, UnaryExpression,
};
use super::{ClauseElement, ElementKind};
use crate::error::{Error, Result};
use crate::operators::{CustomOp, Operator};
use crate::selectable::{CompoundSelect, Select};
use crate::types::DataType;
use crate::value::{SqlValue, ToSqlValue};
use crate::warnings::{self, Warning};

/// Values accepted on the right side of an operator.
pub trait IntoOperand {
    /// Coerces `self` into an element compared against `against`.
    fn into_operand(self, against: Option<&ClauseElement>) -> ClauseElement;
}

impl IntoOperand for ClauseElement {
    fn into_operand(self, _against: Option<&ClauseElement>) -> ClauseElement {
        if self.is_select_statement() {
            warnings::emit(Warning::ImplicitScalarSubquery);
            return ClauseElement::new(ElementKind::ScalarSelect(ScalarSelect { element: self }));
        }
        self
    }
}

impl IntoOperand for &ClauseElement {
    fn into_operand(self, against: Option<&ClauseElement>) -> ClauseElement {
        self.clone().into_operand(against)
    }
}

impl IntoOperand for Select {
    fn into_operand(self, against: Option<&ClauseElement>) -> ClauseElement {
        ClauseElement::from(self).into_operand(against)
    }
}

impl IntoOperand for CompoundSelect {
    fn into_operand(self, against: Option<&ClauseElement>) -> ClauseElement {
        ClauseElement::from(self).into_operand(against)
    }
}

impl IntoOperand for BindParamBuilder {
    fn into_operand(self, _against: Option<&ClauseElement>) -> ClauseElement {
        self.build()
    }
}

impl IntoOperand for CaseBuilder {
    fn into_operand(self, _against: Option<&ClauseElement>) -> ClauseElement {
        self.end()
    }
}

impl<T: ToSqlValue> IntoOperand for T {
    fn into_operand(self, against: Option<&ClauseElement>) -> ClauseElement {
        let value = self.to_sql_value();
        if value.is_null() {
            return null();
        }
        let (base, data_type) = bind_target(against, &value);
        bind_value(Name::anonymous(base), data_type, value)
    }
}

/// The bind name base and type for a value compared against `against`.
fn bind_target(against: Option<&ClauseElement>, value: &SqlValue) -> (String, DataType) {
    let Some(against) = against else {
        return (String::from("param"), value.data_type());
    };
    let base = match against.kind() {
        ElementKind::Column(c) if !c.is_literal => String::from(c.name.base()),
        ElementKind::Function(f) => f.name.clone(),
        ElementKind::Label(l) => String::from(l.name.base()),
        _ => String::from("param"),
    };
    let data_type = match against.data_type() {
        DataType::Null => value.data_type(),
        other => other,
    };
    (base, data_type)
}

/// Right side of `IN` / `NOT IN`.
#[derive(Debug, Clone)]
pub enum InOperand {
    /// Literal values, bound as one expanding parameter.
    Values(Vec<SqlValue>),
    /// Elements rendered as a parenthesized list.
    Elements(Vec<ClauseElement>),
    /// A subquery, an expanding bind or any other single element.
    Element(ClauseElement),
}

impl<T: ToSqlValue> From<Vec<T>> for InOperand {
    fn from(values: Vec<T>) -> Self {
        Self::Values(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl<T: ToSqlValue, const N: usize> From<[T; N]> for InOperand {
    fn from(values: [T; N]) -> Self {
        Self::Values(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl From<Vec<ClauseElement>> for InOperand {
    fn from(elements: Vec<ClauseElement>) -> Self {
        Self::Elements(elements)
    }
}

impl From<ClauseElement> for InOperand {
    fn from(element: ClauseElement) -> Self {
        Self::Element(element)
    }
}

impl From<Select> for InOperand {
    fn from(select: Select) -> Self {
        Self::Element(select.into())
    }
}

impl From<BindParamBuilder> for InOperand {
    fn from(builder: BindParamBuilder) -> Self {
        Self::Element(builder.expanding().build())
    }
}

#[allow(clippy::should_implement_trait)]
impl ClauseElement {
    fn compare(&self, op: Operator, other: impl IntoOperand) -> Self {
        let right = other.into_operand(Some(self));
        let op = match (&op, right.kind()) {
            (Operator::Eq, ElementKind::Null) => Operator::Is,
            (Operator::NotEq, ElementKind::Null) => Operator::IsNot,
            _ => op,
        };
        self.operate(op, right)
    }

    /// `self = other`; comparing to NULL renders `IS NULL`.
    #[must_use]
    pub fn eq(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::Eq, other)
    }

    /// `self != other`; comparing to NULL renders `IS NOT NULL`.
    #[must_use]
    pub fn ne(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::NotEq, other)
    }

    /// `self < other`.
    #[must_use]
    pub fn lt(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::Lt, other)
    }

    /// `self <= other`.
    #[must_use]
    pub fn le(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::LtEq, other)
    }

    /// `self > other`.
    #[must_use]
    pub fn gt(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::Gt, other)
    }

    /// `self >= other`.
    #[must_use]
    pub fn ge(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::GtEq, other)
    }

    /// `self % other`.
    #[must_use]
    pub fn modulo(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::Mod, other)
    }

    /// `self || other`.
    #[must_use]
    pub fn concat(&self, other: impl IntoOperand) -> Self {
        let right = other.into_operand(Some(self));
        ClauseElement::new(ElementKind::Binary(BinaryExpression {
            left: self.clone(),
            right,
            operator: Operator::Concat,
            negate: None,
            escape: None,
            data_type: DataType::Varchar(None),
        }))
    }

    /// `self LIKE pattern`.
    #[must_use]
    pub fn like(&self, pattern: impl IntoOperand) -> Self {
        self.compare(Operator::Like, pattern)
    }

    /// `self NOT LIKE pattern`.
    #[must_use]
    pub fn not_like(&self, pattern: impl IntoOperand) -> Self {
        self.compare(Operator::NotLike, pattern)
    }

    /// `self ILIKE pattern`.
    #[must_use]
    pub fn ilike(&self, pattern: impl IntoOperand) -> Self {
        self.compare(Operator::ILike, pattern)
    }

    /// `self NOT ILIKE pattern`.
    #[must_use]
    pub fn not_ilike(&self, pattern: impl IntoOperand) -> Self {
        self.compare(Operator::NotILike, pattern)
    }

    /// `self LIKE pattern ESCAPE 'escape'`.
    #[must_use]
    pub fn like_escape(&self, pattern: impl IntoOperand, escape: char) -> Self {
        Self::with_escape(self.like(pattern), escape)
    }

    fn with_escape(expr: Self, escape: char) -> Self {
        match expr.kind() {
            ElementKind::Binary(binary) => {
                let mut binary = binary.clone();
                binary.escape = Some(escape);
                ClauseElement::new(ElementKind::Binary(binary))
            }
            _ => expr,
        }
    }

    fn wildcard_pattern(&self, value: &str, leading: bool, trailing: bool) -> Self {
        let mut pattern = value.into_operand(Some(self));
        if leading {
            pattern = literal_column("'%'").operate(Operator::Concat, pattern);
        }
        if trailing {
            pattern = pattern.operate(Operator::Concat, literal_column("'%'"));
        }
        self.operate(Operator::Like, pattern)
    }

    /// `self LIKE :value || '%'`.
    #[must_use]
    pub fn startswith(&self, value: &str) -> Self {
        self.wildcard_pattern(value, false, true)
    }

    /// `self LIKE '%' || :value`.
    #[must_use]
    pub fn endswith(&self, value: &str) -> Self {
        self.wildcard_pattern(value, true, false)
    }

    /// `self LIKE '%' || :value || '%'`.
    #[must_use]
    pub fn contains(&self, value: &str) -> Self {
        self.wildcard_pattern(value, true, true)
    }

    /// `self IN (...)`.
    ///
    /// Literal values bind as a single expanding parameter rendered as a
    /// postcompile token; see [`crate::compiler::Compiled::expand`].
    #[must_use]
    pub fn in_(&self, other: impl Into<InOperand>) -> Self {
        self.containment(Operator::In, other.into())
    }

    /// `self NOT IN (...)`.
    #[must_use]
    pub fn not_in(&self, other: impl Into<InOperand>) -> Self {
        self.containment(Operator::NotIn, other.into())
    }

    fn containment(&self, op: Operator, other: InOperand) -> Self {
        let right = match other {
            InOperand::Values(values) => {
                let (base, data_type) = match values.first() {
                    Some(first) => bind_target(Some(self), first),
                    None => bind_target(Some(self), &SqlValue::Null),
                };
                expanding_bind(&base, data_type, values)
            }
            InOperand::Elements(elements) => super::tuple_(
                elements
                    .into_iter()
                    .map(|e| e.into_operand(Some(self))),
            ),
            InOperand::Element(element) => element.into_operand(Some(self)),
        };
        self.operate(op, right)
    }

    /// `self BETWEEN lower AND upper`.
    #[must_use]
    pub fn between(&self, lower: impl IntoOperand, upper: impl IntoOperand) -> Self {
        self.range(Operator::Between, lower, upper)
    }

    /// `self NOT BETWEEN lower AND upper`.
    #[must_use]
    pub fn not_between(&self, lower: impl IntoOperand, upper: impl IntoOperand) -> Self {
        self.range(Operator::NotBetween, lower, upper)
    }

    fn range(&self, op: Operator, lower: impl IntoOperand, upper: impl IntoOperand) -> Self {
        let bounds = ClauseElement::new(ElementKind::ClauseList(super::ClauseList {
            operator: Operator::And,
            clauses: vec![lower.into_operand(Some(self)), upper.into_operand(Some(self))],
        }));
        self.operate(op, bounds)
    }

    /// `self IS other`.
    #[must_use]
    pub fn is_(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::Is, other)
    }

    /// `self IS NOT other`.
    #[must_use]
    pub fn is_not(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::IsNot, other)
    }

    /// `self IS DISTINCT FROM other`.
    #[must_use]
    pub fn is_distinct_from(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::IsDistinctFrom, other)
    }

    /// `self IS NOT DISTINCT FROM other`.
    #[must_use]
    pub fn is_not_distinct_from(&self, other: impl IntoOperand) -> Self {
        self.compare(Operator::IsNotDistinctFrom, other)
    }

    /// Regular expression match, spelled by the dialect.
    #[must_use]
    pub fn regexp_match(&self, pattern: impl IntoOperand) -> Self {
        self.compare(Operator::RegexpMatch, pattern)
    }

    /// Negated regular expression match, spelled by the dialect.
    #[must_use]
    pub fn not_regexp_match(&self, pattern: impl IntoOperand) -> Self {
        self.compare(Operator::NotRegexpMatch, pattern)
    }

    /// `self <custom operator> other`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the operator string is empty.
    pub fn op(&self, operator: CustomOp, other: impl IntoOperand) -> Result<Self> {
        if operator.opstring().trim().is_empty() {
            return Err(Error::argument("Custom operator string must not be empty"));
        }
        let right = other.into_operand(Some(self));
        let data_type = if Operator::Custom(operator.clone()).is_boolean() {
            DataType::Boolean
        } else {
            self.data_type()
        };
        Ok(ClauseElement::new(ElementKind::Binary(BinaryExpression {
            left: self.clone(),
            right,
            operator: Operator::Custom(operator),
            negate: None,
            escape: None,
            data_type,
        })))
    }

    /// `self <custom operator> other` returning a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the operator string is empty.
    pub fn bool_op(&self, opstring: &str, other: impl IntoOperand) -> Result<Self> {
        self.op(CustomOp::new(opstring).returns_boolean(), other)
    }

    fn negative(&self) -> Self {
        ClauseElement::new(ElementKind::Unary(UnaryExpression {
            element: self.clone(),
            operator: Some(Operator::Neg),
            modifier: None,
            data_type: self.data_type(),
        }))
    }
}

macro_rules! arithmetic_ops {
    ($($trait:ident :: $method:ident => $op:expr),+ $(,)?) => {
        $(
            impl<R: IntoOperand> ops::$trait<R> for ClauseElement {
                type Output = ClauseElement;

                fn $method(self, rhs: R) -> ClauseElement {
                    let right = rhs.into_operand(Some(&self));
                    self.operate($op, right)
                }
            }

            impl<R: IntoOperand> ops::$trait<R> for &ClauseElement {
                type Output = ClauseElement;

                fn $method(self, rhs: R) -> ClauseElement {
                    let right = rhs.into_operand(Some(self));
                    self.operate($op, right)
                }
            }
        )+
    };
}

arithmetic_ops!(
    Add::add => Operator::Add,
    Sub::sub => Operator::Sub,
    Mul::mul => Operator::Mul,
    Div::div => Operator::Div,
    Rem::rem => Operator::Mod,
);

impl ops::Neg for ClauseElement {
    type Output = ClauseElement;

    fn neg(self) -> ClauseElement {
        self.negative()
    }
}

impl ops::Neg for &ClauseElement {
    type Output = ClauseElement;

    fn neg(self) -> ClauseElement {
        self.negative()
    }
}

impl ops::Not for ClauseElement {
    type Output = ClauseElement;

    fn not(self) -> ClauseElement {
        not_(&self)
    }
}

impl ops::Not for &ClauseElement {
    type Output = ClauseElement;

    fn not(self) -> ClauseElement {
        not_(self)
    }
}

impl ops::BitAnd for ClauseElement {
    type Output = ClauseElement;

    fn bitand(self, rhs: ClauseElement) -> ClauseElement {
        and_([self, rhs])
    }
}

impl ops::BitOr for ClauseElement {
    type Output = ClauseElement;

    fn bitor(self, rhs: ClauseElement) -> ClauseElement {
        or_([self, rhs])
    }
}
