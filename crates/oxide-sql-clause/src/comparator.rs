//! Per-type operator behavior.
//!
//! Each type family supplies a [`Comparator`] deciding how an operator
//! applied to an expression of that type is interpreted and what type the
//! resulting expression has.

use crate::operators::Operator;
use crate::types::{DataType, TypeAffinity};

/// Operator behavior for a family of types.
pub trait Comparator: Sync {
    /// Rewrites an operator for this type (e.g. string `+` becomes `||`).
    fn adapt_operator(&self, op: Operator) -> Operator {
        op
    }

    /// Returns the type of `left op right`.
    fn result_type(&self, op: &Operator, left: &DataType, right: &DataType) -> DataType {
        if op.is_boolean() {
            DataType::Boolean
        } else if left.is_null() {
            right.clone()
        } else {
            left.clone()
        }
    }
}

struct DefaultComparator;

impl Comparator for DefaultComparator {}

struct StringComparator;

impl Comparator for StringComparator {
    fn adapt_operator(&self, op: Operator) -> Operator {
        match op {
            Operator::Add => Operator::Concat,
            other => other,
        }
    }
}

struct NumericComparator;

impl Comparator for NumericComparator {
    fn result_type(&self, op: &Operator, left: &DataType, right: &DataType) -> DataType {
        if op.is_boolean() {
            return DataType::Boolean;
        }
        match (left, right) {
            (DataType::Smallint | DataType::Integer | DataType::Bigint, DataType::Real | DataType::Double) => {
                right.clone()
            }
            _ => left.clone(),
        }
    }
}

/// Returns the comparator for a type.
#[must_use]
pub fn comparator_for(data_type: &DataType) -> &'static dyn Comparator {
    match data_type.affinity() {
        TypeAffinity::String => &StringComparator,
        TypeAffinity::Numeric => &NumericComparator,
        TypeAffinity::Boolean | TypeAffinity::Temporal | TypeAffinity::Other => &DefaultComparator,
    }
}
