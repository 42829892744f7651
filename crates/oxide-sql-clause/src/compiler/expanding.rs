//! Execution-time expansion of postcompile parameters.

use std::collections::HashSet;

use tracing::debug;

use super::{empty_set_expr, BoundParameter, Compiled, Segment};
use crate::error::{Error, Result};
use crate::value::{BindValue, SqlValue};

/// SQL text ready for execution, with one placeholder per value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedStatement {
    /// The SQL text with every postcompile token replaced.
    pub sql: String,
    /// Parameter names and values, in driver order.
    pub parameters: Vec<(String, SqlValue)>,
}

impl ExpandedStatement {
    /// The parameter values in driver order.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> + '_ {
        self.parameters.iter().map(|(_, value)| value)
    }
}

impl Compiled {
    /// Produces executable SQL for one set of parameter values.
    ///
    /// `overrides` replace the values bound at construction time, by
    /// rendered name. Each expanding parameter `name` bound to `n` values
    /// becomes the placeholders `name_1 .. name_n`; an empty list becomes a
    /// predicate that is always false (or always true under `NOT IN`).
    /// Numbered placeholder styles are renumbered over the expanded text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the parameter when no value
    /// is available, when an expanding parameter gets a scalar, or when a
    /// plain parameter gets a list.
    pub fn expand(&self, overrides: &[(&str, BindValue)]) -> Result<ExpandedStatement> {
        let style = self.paramstyle;
        let mut sql = String::with_capacity(self.sql.len());
        let mut parameters = Vec::new();
        let mut emitted = HashSet::new();
        let mut position = 0;

        let mut push = |name: String, value: SqlValue, parameters: &mut Vec<(String, SqlValue)>| {
            if style.is_positional() || emitted.insert(name.clone()) {
                parameters.push((name, value));
            }
        };

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Bind(slot) => {
                    let bind = &self.binds[*slot];
                    let value = match value_for(bind, overrides)? {
                        BindValue::Scalar(value) => value.clone(),
                        BindValue::List(_) => {
                            return Err(Error::invalid_request(format!(
                                "Bind parameter '{}' is not expanding and can't take a list of values",
                                bind.name
                            )));
                        }
                    };
                    position += 1;
                    sql.push_str(&style.placeholder(&bind.name, position));
                    push(bind.name.clone(), value, &mut parameters);
                }
                Segment::Expanding { bind, negated } => {
                    let bind = &self.binds[*bind];
                    let BindValue::List(values) = value_for(bind, overrides)? else {
                        return Err(Error::invalid_request(format!(
                            "Expanding bind parameter '{}' requires a list of values",
                            bind.name
                        )));
                    };
                    if values.is_empty() {
                        sql.push_str(empty_set_expr(*negated));
                        continue;
                    }
                    let mut placeholders = Vec::with_capacity(values.len());
                    for (i, value) in values.iter().enumerate() {
                        let name = format!("{}_{}", bind.name, i + 1);
                        position += 1;
                        placeholders.push(style.placeholder(&name, position));
                        push(name, value.clone(), &mut parameters);
                    }
                    sql.push_str(&placeholders.join(", "));
                }
            }
        }

        debug!(
            parameters = parameters.len(),
            paramstyle = ?style,
            "expanded postcompile parameters"
        );
        Ok(ExpandedStatement { sql, parameters })
    }
}

fn value_for<'a>(bind: &'a BoundParameter, overrides: &'a [(&str, BindValue)]) -> Result<&'a BindValue> {
    overrides
        .iter()
        .find(|(name, _)| *name == bind.name)
        .map(|(_, value)| value)
        .or(bind.value.as_ref())
        .ok_or_else(|| {
            Error::invalid_request(format!(
                "A value is required for bind parameter '{}'",
                bind.name
            ))
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::compiler::compile;
    use crate::dialect::{DialectConfig, GenericDialect, ParamStyle, SqliteDialect};
    use crate::elements::{and_, bindparam, column};
    use crate::error::Error;
    use crate::value::{BindValue, SqlValue};

    #[test]
    fn test_expand_lists_of_different_lengths() {
        let compiled = compile(&column("x").in_(bindparam("ids")), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.sql(), "x IN (__[POSTCOMPILE_ids])");
        for n in [1_i64, 3, 5] {
            let values: Vec<i64> = (1..=n).collect();
            let expanded = compiled.expand(&[("ids", BindValue::from(values))]).unwrap();
            assert_eq!(expanded.parameters.len(), usize::try_from(n).unwrap());
            assert_eq!(expanded.sql.matches(":ids_").count(), usize::try_from(n).unwrap());
        }
    }

    #[test]
    fn test_empty_list_forms() {
        let compiled = compile(&column("x").in_(Vec::<i32>::new()), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.expand(&[]).unwrap().sql, "x IN (NULL) AND (1 != 1)");

        let compiled = compile(&column("x").not_in(Vec::<i32>::new()), &GenericDialect::new()).unwrap();
        assert_eq!(compiled.expand(&[]).unwrap().sql, "(x NOT IN (NULL) OR (1 = 1))");
    }

    #[test]
    fn test_numeric_styles_renumber() {
        let dialect = DialectConfig {
            paramstyle: ParamStyle::NumericDollar,
            ..DialectConfig::default()
        }
        .into_dialect();
        let expr = and_([column("x").in_(vec![1, 2]), column("y").eq(3)]);
        let compiled = compile(&expr, &dialect).unwrap();
        assert_eq!(compiled.sql(), "x IN (__[POSTCOMPILE_x_1]) AND y = $1");
        let expanded = compiled.expand(&[]).unwrap();
        assert_eq!(expanded.sql, "x IN ($1, $2) AND y = $3");
        let values: Vec<&SqlValue> = expanded.values().collect();
        assert_eq!(values, vec![&SqlValue::Int(1), &SqlValue::Int(2), &SqlValue::Int(3)]);
    }

    #[test]
    fn test_qmark_expansion() {
        let compiled = compile(&column("x").in_(vec!["a", "b", "c"]), &SqliteDialect::new()).unwrap();
        let expanded = compiled.expand(&[]).unwrap();
        assert_eq!(expanded.sql, "x IN (?, ?, ?)");
        assert_eq!(expanded.parameters[2], (String::from("x_1_3"), SqlValue::Text(String::from("c"))));
    }

    #[test]
    fn test_missing_and_mismatched_values() {
        let compiled = compile(&column("x").in_(bindparam("ids")), &GenericDialect::new()).unwrap();
        let err = compiled.expand(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
        assert!(err.to_string().contains("'ids'"));

        let err = compiled
            .expand(&[("ids", BindValue::Scalar(SqlValue::Int(1)))])
            .unwrap_err();
        assert!(err.to_string().contains("requires a list"));

        let compiled = compile(&column("x").eq(bindparam("y")), &GenericDialect::new()).unwrap();
        let err = compiled
            .expand(&[("y", BindValue::from(vec![1, 2]))])
            .unwrap_err();
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_named_style_lists_repeated_names_once() {
        let expr = and_([
            column("a").eq(bindparam("p").value(1)),
            column("b").eq(bindparam("p").value(1)),
        ]);
        let expanded = compile(&expr, &GenericDialect::new())
            .unwrap()
            .expand(&[])
            .unwrap();
        assert_eq!(expanded.sql, "a = :p AND b = :p");
        assert_eq!(expanded.parameters.len(), 1);
    }
}
