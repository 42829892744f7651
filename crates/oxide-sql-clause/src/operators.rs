//! The operator registry.
//!
//! Every operator knows its precedence, associativity and semantic category.
//! The compiler consults this table to decide parenthesization; expression
//! constructors consult it to decide result types.

use core::fmt;

/// Associativity of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    /// `a op b op c` groups as `(a op b) op c`.
    Left,
    /// `a op b op c` groups as `a op (b op c)`.
    Right,
    /// Chaining requires explicit grouping on both sides.
    None,
}

/// Registry entry for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    /// Binding strength, higher binds tighter.
    pub precedence: i8,
    /// Associativity for equal-precedence chains.
    pub associativity: Associativity,
    /// Whether the operator compares its operands.
    pub is_comparison: bool,
    /// Whether the operator always yields a boolean.
    pub is_boolean: bool,
    /// Whether `a op (b op c)` equals `(a op b) op c`.
    pub associative: bool,
}

/// Precedence given to custom operators unless configured otherwise.
pub const CUSTOM_OP_PRECEDENCE: i8 = 0;

/// A user-defined operator string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomOp {
    opstring: String,
    precedence: i8,
    is_comparison: bool,
    returns_boolean: bool,
}

impl CustomOp {
    /// Creates a custom operator with the lowest precedence.
    #[must_use]
    pub fn new(opstring: impl Into<String>) -> Self {
        Self {
            opstring: opstring.into(),
            precedence: CUSTOM_OP_PRECEDENCE,
            is_comparison: false,
            returns_boolean: false,
        }
    }

    /// Sets the precedence.
    #[must_use]
    pub fn precedence(mut self, precedence: i8) -> Self {
        self.precedence = precedence;
        self
    }

    /// Marks the operator as a comparison (implies a boolean result).
    #[must_use]
    pub fn comparison(mut self) -> Self {
        self.is_comparison = true;
        self.returns_boolean = true;
        self
    }

    /// Marks the operator as returning a boolean without being a comparison.
    #[must_use]
    pub fn returns_boolean(mut self) -> Self {
        self.returns_boolean = true;
        self
    }

    /// The operator text.
    #[must_use]
    pub fn opstring(&self) -> &str {
        &self.opstring
    }
}

/// SQL operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    LeftShift,
    RightShift,

    // String
    Concat,
    Like,
    NotLike,
    ILike,
    NotILike,
    RegexpMatch,
    NotRegexpMatch,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Is,
    IsNot,
    IsDistinctFrom,
    IsNotDistinctFrom,
    In,
    NotIn,
    Between,
    NotBetween,

    // Logical
    And,
    Or,
    Not,

    // Modifiers and keywords
    Desc,
    Asc,
    NullsFirst,
    NullsLast,
    Distinct,
    Exists,
    Collate,
    Comma,
    As,

    /// A user-defined operator.
    Custom(CustomOp),
}

/// Every built-in operator, in registry order.
pub const BUILTIN_OPERATORS: &[Operator] = &[
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Mod,
    Operator::Neg,
    Operator::BitAnd,
    Operator::BitOr,
    Operator::BitXor,
    Operator::BitNot,
    Operator::LeftShift,
    Operator::RightShift,
    Operator::Concat,
    Operator::Like,
    Operator::NotLike,
    Operator::ILike,
    Operator::NotILike,
    Operator::RegexpMatch,
    Operator::NotRegexpMatch,
    Operator::Eq,
    Operator::NotEq,
    Operator::Lt,
    Operator::LtEq,
    Operator::Gt,
    Operator::GtEq,
    Operator::Is,
    Operator::IsNot,
    Operator::IsDistinctFrom,
    Operator::IsNotDistinctFrom,
    Operator::In,
    Operator::NotIn,
    Operator::Between,
    Operator::NotBetween,
    Operator::And,
    Operator::Or,
    Operator::Not,
    Operator::Desc,
    Operator::Asc,
    Operator::NullsFirst,
    Operator::NullsLast,
    Operator::Distinct,
    Operator::Exists,
    Operator::Collate,
    Operator::Comma,
    Operator::As,
];

const fn info(
    precedence: i8,
    associativity: Associativity,
    is_comparison: bool,
    is_boolean: bool,
    associative: bool,
) -> OperatorInfo {
    OperatorInfo {
        precedence,
        associativity,
        is_comparison,
        is_boolean,
        associative,
    }
}

/// Where an operand sits relative to the operator rendering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandPosition {
    /// Left side of a binary operator.
    Left,
    /// Right side of a binary operator.
    Right,
    /// Operand of a prefix operator or postfix modifier.
    Unary,
    /// Member of an operator-joined clause list.
    ListItem,
}

impl Operator {
    /// Returns the registry entry for this operator.
    #[must_use]
    pub const fn info(&self) -> OperatorInfo {
        use Associativity::{Left, None};
        match self {
            Self::Mul | Self::Div | Self::Mod => info(8, Left, false, false, false),
            Self::Neg | Self::BitNot => info(8, None, false, false, false),
            Self::Add => info(7, Left, false, false, true),
            Self::Sub | Self::LeftShift | Self::RightShift => info(7, Left, false, false, false),
            Self::BitAnd | Self::BitOr | Self::BitXor => info(7, Left, false, false, true),
            Self::Concat => info(6, Left, false, false, true),
            Self::Like
            | Self::NotLike
            | Self::ILike
            | Self::NotILike
            | Self::RegexpMatch
            | Self::NotRegexpMatch
            | Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::Is
            | Self::IsNot
            | Self::IsDistinctFrom
            | Self::IsNotDistinctFrom
            | Self::In
            | Self::NotIn
            | Self::Between
            | Self::NotBetween => info(5, None, true, true, false),
            Self::Not => info(5, None, false, true, false),
            Self::Distinct => info(5, None, false, false, false),
            Self::Collate => info(4, None, false, false, false),
            Self::And => info(3, Left, false, true, true),
            Self::Desc | Self::Asc | Self::NullsFirst | Self::NullsLast => {
                info(3, None, false, false, false)
            }
            Self::Or => info(2, Left, false, true, true),
            Self::Exists => info(0, None, false, true, false),
            Self::Comma | Self::As => info(-1, Left, false, false, true),
            Self::Custom(op) => info(
                op.precedence,
                None,
                op.is_comparison,
                op.returns_boolean,
                false,
            ),
        }
    }

    /// Returns the precedence of the operator (higher = binds tighter).
    #[must_use]
    pub const fn precedence(&self) -> i8 {
        self.info().precedence
    }

    /// Returns the associativity of the operator.
    #[must_use]
    pub const fn associativity(&self) -> Associativity {
        self.info().associativity
    }

    /// Returns true for comparison operators.
    #[must_use]
    pub const fn is_comparison(&self) -> bool {
        self.info().is_comparison
    }

    /// Returns true for operators that always produce a boolean.
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        self.info().is_boolean
    }

    /// Returns true for postfix modifiers such as `DESC`.
    #[must_use]
    pub const fn is_modifier(&self) -> bool {
        matches!(
            self,
            Self::Desc | Self::Asc | Self::NullsFirst | Self::NullsLast
        )
    }

    /// Returns true for operators whose right side is a collection.
    #[must_use]
    pub const fn is_containment(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Returns the SQL representation of the operator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Add => "+",
            Self::Sub | Self::Neg => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitNot => "~",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::Concat => "||",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::ILike => "ILIKE",
            Self::NotILike => "NOT ILIKE",
            Self::RegexpMatch => "<regexp>",
            Self::NotRegexpMatch => "<not regexp>",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::IsDistinctFrom => "IS DISTINCT FROM",
            Self::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Desc => "DESC",
            Self::Asc => "ASC",
            Self::NullsFirst => "NULLS FIRST",
            Self::NullsLast => "NULLS LAST",
            Self::Distinct => "DISTINCT",
            Self::Exists => "EXISTS",
            Self::Collate => "COLLATE",
            Self::Comma => ",",
            Self::As => "AS",
            Self::Custom(op) => op.opstring(),
        }
    }

    /// Returns the operator expressing the negation of this one, if any.
    #[must_use]
    pub const fn negate(&self) -> Option<Self> {
        Some(match self {
            Self::Eq => Self::NotEq,
            Self::NotEq => Self::Eq,
            Self::Lt => Self::GtEq,
            Self::GtEq => Self::Lt,
            Self::Gt => Self::LtEq,
            Self::LtEq => Self::Gt,
            Self::Like => Self::NotLike,
            Self::NotLike => Self::Like,
            Self::ILike => Self::NotILike,
            Self::NotILike => Self::ILike,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::Is => Self::IsNot,
            Self::IsNot => Self::Is,
            Self::Between => Self::NotBetween,
            Self::NotBetween => Self::Between,
            Self::RegexpMatch => Self::NotRegexpMatch,
            Self::NotRegexpMatch => Self::RegexpMatch,
            Self::IsDistinctFrom => Self::IsNotDistinctFrom,
            Self::IsNotDistinctFrom => Self::IsDistinctFrom,
            _ => return None,
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether an operand rendered under `parent` needs parentheses.
///
/// Lower-precedence operands are always grouped. At equal precedence a
/// chain of the same associative operator is left bare; otherwise the
/// operand is grouped unless the parent's associativity already binds it
/// on that side.
#[must_use]
pub fn requires_grouping(parent: &Operator, child: &Operator, position: OperandPosition) -> bool {
    let (p, c) = (parent.precedence(), child.precedence());
    if c != p {
        return c < p;
    }
    if child == parent && parent.info().associative {
        return false;
    }
    match position {
        OperandPosition::Left => parent.associativity() != Associativity::Left,
        OperandPosition::Right => parent.associativity() != Associativity::Right,
        OperandPosition::Unary => true,
        OperandPosition::ListItem => child != parent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_precedence_levels() {
        assert_eq!(Operator::Mul.precedence(), 8);
        assert_eq!(Operator::Add.precedence(), 7);
        assert_eq!(Operator::Concat.precedence(), 6);
        assert_eq!(Operator::Eq.precedence(), 5);
        assert_eq!(Operator::Collate.precedence(), 4);
        assert_eq!(Operator::And.precedence(), 3);
        assert_eq!(Operator::Or.precedence(), 2);
        assert_eq!(Operator::Exists.precedence(), 0);
        assert_eq!(Operator::Comma.precedence(), -1);
    }

    #[test]
    fn test_comparisons_are_boolean() {
        for op in BUILTIN_OPERATORS.iter().filter(|op| op.is_comparison()) {
            assert!(op.is_boolean(), "{op:?} should be boolean");
        }
        assert!(!Operator::Add.is_boolean());
    }

    #[test]
    fn test_custom_op_defaults_to_lowest() {
        let op = Operator::Custom(CustomOp::new("->"));
        assert_eq!(op.precedence(), CUSTOM_OP_PRECEDENCE);
        assert!(!op.is_comparison());
        assert!(!op.is_boolean());
        assert_eq!(op.as_str(), "->");

        let op = Operator::Custom(CustomOp::new("@>").precedence(6).comparison());
        assert_eq!(op.precedence(), 6);
        assert!(op.is_comparison());
        assert!(op.is_boolean());
    }

    #[test]
    fn test_negation_is_an_involution() {
        for op in BUILTIN_OPERATORS {
            if let Some(negated) = op.negate() {
                assert_eq!(negated.negate().as_ref(), Some(op));
            }
        }
    }

    #[test]
    fn test_left_associative_grouping() {
        let sub = Operator::Sub;
        assert!(!requires_grouping(&sub, &sub, OperandPosition::Left));
        assert!(requires_grouping(&sub, &sub, OperandPosition::Right));
        assert!(!requires_grouping(&Operator::Add, &Operator::Add, OperandPosition::Right));
    }

    #[test]
    fn test_non_associative_grouping() {
        assert!(requires_grouping(&Operator::NotEq, &Operator::Eq, OperandPosition::Left));
        assert!(requires_grouping(&Operator::NotEq, &Operator::Eq, OperandPosition::Right));
        assert!(requires_grouping(&Operator::Not, &Operator::Eq, OperandPosition::Unary));
    }

    #[test]
    fn test_precedence_grouping() {
        assert!(requires_grouping(&Operator::Mul, &Operator::Add, OperandPosition::Left));
        assert!(!requires_grouping(&Operator::Add, &Operator::Mul, OperandPosition::Left));
        assert!(requires_grouping(&Operator::And, &Operator::Or, OperandPosition::ListItem));
        assert!(!requires_grouping(&Operator::And, &Operator::And, OperandPosition::ListItem));
        assert!(!requires_grouping(&Operator::Or, &Operator::And, OperandPosition::ListItem));
    }
}
