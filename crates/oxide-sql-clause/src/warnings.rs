//! Non-fatal diagnostics.
//!
//! Warnings are always logged through `tracing`. Code that wants them as
//! values wraps the work in [`capture`], which collects every warning raised
//! on the current thread while the closure runs.

use core::fmt;
use std::cell::RefCell;

use tracing::warn;

/// An ambiguous-but-recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// `and_()` or `or_()` invoked with no arguments.
    EmptyConjunction {
        /// `"and_"` or `"or_"`.
        function: &'static str,
    },
    /// A SELECT was used where a FROM entry was expected.
    ImplicitSubquery,
    /// A SELECT was used where a column expression was expected.
    ImplicitScalarSubquery,
    /// Two select-list entries render under the same name.
    DuplicateColumnName {
        /// The repeated name.
        name: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyConjunction { function } => write!(
                f,
                "Invoking {function}() without arguments is deprecated; \
                 pass true_() or false_() explicitly as the first element"
            ),
            Self::ImplicitSubquery => f.write_str(
                "Implicitly coercing SELECT object to a subquery; \
                 call .subquery() on the SELECT explicitly",
            ),
            Self::ImplicitScalarSubquery => f.write_str(
                "Coercing SELECT object into a scalar subquery; \
                 call .scalar_subquery() explicitly",
            ),
            Self::DuplicateColumnName { name } => write!(
                f,
                "Column name '{name}' appears more than once in the columns clause"
            ),
        }
    }
}

thread_local! {
    static CAPTURED: RefCell<Vec<Vec<Warning>>> = const { RefCell::new(Vec::new()) };
}

/// Emits a warning through `tracing` and any active [`capture`] scope.
pub fn emit(warning: Warning) {
    warn!(kind = ?warning, "{warning}");
    CAPTURED.with(|stack| {
        if let Some(scope) = stack.borrow_mut().last_mut() {
            scope.push(warning);
        }
    });
}

/// Runs `f`, returning its result with the warnings it raised.
///
/// Scopes nest: an inner capture does not leak warnings to the outer one.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Warning>) {
    CAPTURED.with(|stack| stack.borrow_mut().push(Vec::new()));
    let result = f();
    let warnings = CAPTURED.with(|stack| stack.borrow_mut().pop().unwrap_or_default());
    (result, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_collects_warnings() {
        let ((), warnings) = capture(|| emit(Warning::ImplicitSubquery));
        assert_eq!(warnings, vec![Warning::ImplicitSubquery]);
    }

    #[test]
    fn test_nested_capture_is_isolated() {
        let (inner, outer) = capture(|| {
            let ((), inner) = capture(|| emit(Warning::ImplicitScalarSubquery));
            emit(Warning::ImplicitSubquery);
            inner
        });
        assert_eq!(inner, vec![Warning::ImplicitScalarSubquery]);
        assert_eq!(outer, vec![Warning::ImplicitSubquery]);
    }

    #[test]
    fn test_emit_without_scope_is_noop() {
        emit(Warning::EmptyConjunction { function: "and_" });
    }
}
