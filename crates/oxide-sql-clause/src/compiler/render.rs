//! The statement compiler.
//!
//! A single-pass visitor over the clause tree. Bind parameters render as
//! markers (see [`super::bind_marker`]) that the caller turns into the
//! dialect's placeholders once the full text, and therefore the textual
//! order of parameters, is known. Every string that did not come from the
//! compiler itself goes through [`super::escape_marks`] on its way in.

use std::collections::HashSet;

use tracing::trace;

use super::names::{AnonymousNames, BindRegistry, BoundParameter};
use super::{bind_marker, empty_set_expr, escape_marks, CompileOptions, ResultColumn};
use crate::dialect::{ConcatStyle, Dialect, LimitStyle, RegexStyle};
use crate::dml::{Delete, Insert, InsertSource, Update};
use crate::elements::{
    anon_base, BinaryExpression, BindParameter, Case, ClauseElement, ClauseList, ColumnClause,
    CustomClause, ElementId, ElementKind, FunctionCall, Label, Name, UnaryExpression,
};
use crate::error::{Error, Result};
use crate::operators::{requires_grouping, OperandPosition, Operator};
use crate::selectable::{
    statement_columns, Alias, AliasKind, CompoundSelect, Join, Select, SelectedColumn, TableClause,
};
use crate::types::DataType;
use crate::value::{BindValue, SqlValue};

/// Whether an expression stands where SQL expects a truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Value,
    Predicate,
}

/// How a SELECT is embedded in the statement being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    /// The statement itself, or a CTE body.
    Top,
    /// A FROM-clause subquery.
    From,
    /// A scalar subquery, EXISTS or IN operand.
    Scalar,
}

/// How a bind sits in its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Plain,
    In,
    NotIn,
}

impl Placement {
    const fn tag(self) -> char {
        match self {
            Self::Plain => 'b',
            Self::In => 'e',
            Self::NotIn => 'n',
        }
    }
}

/// FROM entries of an enclosing SELECT.
#[derive(Debug)]
struct Scope {
    /// Entries of this SELECT, joins expanded to their members.
    froms: Vec<ClauseElement>,
    /// `froms` of this SELECT and of every SELECT enclosing it.
    correlate_froms: Vec<ClauseElement>,
}

/// Select-list names visible to ORDER BY and GROUP BY.
#[derive(Debug, Default)]
struct LabelScope {
    by_key: Vec<(ElementId, String)>,
    by_name: Vec<(String, String)>,
}

#[derive(Debug)]
struct CteEntry {
    name: String,
    keys: HashSet<ElementId>,
    recursive: bool,
    columns: Vec<String>,
    body: Option<String>,
}

/// Result of compiling a statement, before placeholders are rendered.
#[derive(Debug)]
pub(crate) struct Output {
    pub(crate) text: String,
    pub(crate) binds: Vec<BoundParameter>,
    pub(crate) result_columns: Vec<ResultColumn>,
}

pub(crate) struct SqlCompiler<'a> {
    dialect: &'a dyn Dialect,
    options: &'a CompileOptions,
    names: AnonymousNames,
    binds: BindRegistry,
    ctes: Vec<CteEntry>,
    stack: Vec<Scope>,
    labels: Option<LabelScope>,
}

impl<'a> SqlCompiler<'a> {
    pub(crate) fn new(dialect: &'a dyn Dialect, options: &'a CompileOptions) -> Self {
        Self {
            dialect,
            options,
            names: AnonymousNames::default(),
            binds: BindRegistry::default(),
            ctes: Vec::new(),
            stack: Vec::new(),
            labels: None,
        }
    }

    pub(crate) fn compile_statement(mut self, element: &ClauseElement) -> Result<Output> {
        let body = self.process(element, Position::Value)?;
        let text = if self.ctes.is_empty() {
            body
        } else {
            format!("{} {body}", self.with_clause())
        };
        let result_columns = self.result_columns(element);
        Ok(Output {
            text,
            binds: self.binds.into_vec(),
            result_columns,
        })
    }

    fn process(&mut self, element: &ClauseElement, position: Position) -> Result<String> {
        match element.kind() {
            ElementKind::Column(column) => self.visit_column(column, position),
            ElementKind::BindParam(bind) => self.visit_bind(element, bind, Placement::Plain),
            ElementKind::Text(text) => Ok(escape_marks(text.text())),
            ElementKind::Null => Ok(String::from("NULL")),
            ElementKind::True => Ok(self.boolean(true, position)),
            ElementKind::False => Ok(self.boolean(false, position)),
            ElementKind::Unary(unary) => self.visit_unary(unary),
            ElementKind::Binary(binary) => self.visit_binary(binary),
            ElementKind::ClauseList(list) => self.visit_clause_list(list, position),
            ElementKind::Grouping(grouping) => {
                Ok(format!("({})", self.process(&grouping.element, position)?))
            }
            ElementKind::Tuple(tuple) => Ok(format!("({})", self.process_all(&tuple.clauses)?)),
            ElementKind::Label(label) => self.visit_label(element, label, position),
            ElementKind::LabelReference(reference) => self.visit_label_reference(reference.name()),
            ElementKind::Function(function) => self.visit_function(function),
            ElementKind::Case(case) => self.visit_case(case),
            ElementKind::Cast(cast) => Ok(format!(
                "CAST({} AS {})",
                self.process(&cast.element, Position::Value)?,
                escape_marks(&cast.data_type.to_sql())
            )),
            ElementKind::ScalarSelect(scalar) => Ok(format!(
                "({})",
                self.visit_statement(&scalar.element, Nesting::Scalar)?
            )),
            ElementKind::Table(_) | ElementKind::Alias(_) | ElementKind::Join(_) => {
                self.visit_from(element)
            }
            ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
                if self.stack.is_empty() {
                    self.visit_statement(element, Nesting::Top)
                } else {
                    Ok(format!("({})", self.visit_statement(element, Nesting::Scalar)?))
                }
            }
            ElementKind::Insert(insert) => self.visit_insert(insert),
            ElementKind::Update(update) => self.visit_update(update),
            ElementKind::Delete(delete) => self.visit_delete(delete),
            ElementKind::Custom(custom) => self.visit_custom(custom),
        }
    }

    fn process_all(&mut self, elements: &[ClauseElement]) -> Result<String> {
        let rendered = elements
            .iter()
            .map(|e| self.process(e, Position::Value))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    fn quote_name(&mut self, name: &Name) -> String {
        let rendered = self.names.name(name);
        self.quote(&rendered)
    }

    fn quote(&self, name: &str) -> String {
        escape_marks(&self.dialect.quote(name))
    }

    fn table_name(&self, table: &TableClause) -> String {
        let name = self.quote(table.name());
        match table.schema() {
            Some(schema) => format!("{}.{name}", self.quote(schema)),
            None => name,
        }
    }

    /// The qualifier columns of `parent` render with.
    fn qualifier(&mut self, parent: &ClauseElement) -> Option<String> {
        match parent.kind() {
            ElementKind::Table(table) => Some(self.table_name(table)),
            ElementKind::Alias(alias) => Some(self.quote_name(&alias.name)),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn visit_column(&mut self, column: &ColumnClause, position: Position) -> Result<String> {
        let name = if column.is_literal {
            escape_marks(column.name.base())
        } else {
            self.quote_name(&column.name)
        };
        let rendered = match column.parent.as_ref().and_then(|p| self.qualifier(p)) {
            Some(qualifier) => format!("{qualifier}.{name}"),
            None => name,
        };
        if position == Position::Predicate
            && column.data_type == DataType::Boolean
            && !self.dialect.supports_native_boolean()
        {
            return Ok(format!("{rendered} = 1"));
        }
        Ok(rendered)
    }

    fn visit_bind(
        &mut self,
        element: &ClauseElement,
        bind: &BindParameter,
        placement: Placement,
    ) -> Result<String> {
        let placement = match (bind.expanding, placement) {
            (true, Placement::Plain) => Placement::In,
            (false, _) => Placement::Plain,
            (true, other) => other,
        };
        if self.options.uses_literal_binds() {
            return self.literal_bind(bind, placement);
        }
        let name = self.names.name(&bind.key);
        let slot = self.binds.register(name, element, bind)?;
        Ok(bind_marker(slot, placement.tag()))
    }

    fn literal_bind(&self, bind: &BindParameter, placement: Placement) -> Result<String> {
        let Some(value) = bind.value.as_ref() else {
            return Err(Error::compile(format!(
                "Bind parameter '{}' has no value to render inline",
                bind.key.base()
            )));
        };
        Ok(match value {
            BindValue::Scalar(value) => self.literal_value(value),
            BindValue::List(values) if values.is_empty() => {
                String::from(empty_set_expr(placement == Placement::NotIn))
            }
            BindValue::List(values) => values
                .iter()
                .map(|v| self.literal_value(v))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    fn literal_value(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Bool(b) if !self.dialect.supports_native_boolean() => {
                String::from(if *b { "1" } else { "0" })
            }
            other => escape_marks(&other.to_sql_inline()),
        }
    }

    fn boolean(&self, value: bool, position: Position) -> String {
        let rendered = match (self.dialect.supports_native_boolean(), position, value) {
            (true, _, true) => "true",
            (true, _, false) => "false",
            (false, Position::Predicate, true) => "1 = 1",
            (false, Position::Predicate, false) => "0 = 1",
            (false, Position::Value, true) => "1",
            (false, Position::Value, false) => "0",
        };
        String::from(rendered)
    }

    /// Renders `child` as an operand of `parent`, parenthesized when the
    /// child's operator binds looser.
    fn operand(
        &mut self,
        parent: &Operator,
        child: &ClauseElement,
        side: OperandPosition,
        position: Position,
    ) -> Result<String> {
        let rendered = self.process(child, position)?;
        Ok(match self.child_operator(child) {
            Some(op) if !rendered.is_empty() && requires_grouping(parent, &op, side) => {
                format!("({rendered})")
            }
            _ => rendered,
        })
    }

    /// The operator an element renders at its top level, if any.
    fn child_operator(&self, element: &ClauseElement) -> Option<Operator> {
        match element.kind() {
            ElementKind::Binary(binary) => Some(binary.operator.clone()),
            ElementKind::ClauseList(list) => match list.clauses.as_slice() {
                [single] => self.child_operator(single),
                _ => Some(list.operator.clone()),
            },
            ElementKind::Unary(unary) => unary.operator.clone().or_else(|| unary.modifier.clone()),
            ElementKind::Label(label) if !self.resolves_label(element, label) => {
                self.child_operator(&label.element)
            }
            _ => None,
        }
    }

    fn visit_unary(&mut self, unary: &UnaryExpression) -> Result<String> {
        match (&unary.operator, &unary.modifier) {
            (Some(_), Some(_)) => Err(Error::compile(format!(
                "Unary expression on '{}' does not support operator and modifier simultaneously",
                unary.element.visit_name()
            ))),
            (None, None) => Err(Error::compile(format!(
                "Unary expression on '{}' has no operator or modifier",
                unary.element.visit_name()
            ))),
            (Some(op), None) => {
                if *op == Operator::Not
                    && !self.dialect.supports_native_boolean()
                    && is_bare_boolean_column(&unary.element)
                {
                    let column = self.process(&unary.element, Position::Value)?;
                    return Ok(format!("{column} = 0"));
                }
                let position = if *op == Operator::Not {
                    Position::Predicate
                } else {
                    Position::Value
                };
                let inner = self.operand(op, &unary.element, OperandPosition::Unary, position)?;
                Ok(match op {
                    Operator::Neg | Operator::BitNot => format!("{}{inner}", spelled(op)),
                    _ => format!("{} {inner}", spelled(op)),
                })
            }
            (None, Some(modifier)) => {
                let child = self.child_operator(&unary.element);
                let inner = match child {
                    Some(c) if c.is_modifier() => self.process(&unary.element, Position::Value)?,
                    _ => self.operand(
                        modifier,
                        &unary.element,
                        OperandPosition::Unary,
                        Position::Value,
                    )?,
                };
                Ok(format!("{inner} {}", spelled(modifier)))
            }
        }
    }

    fn visit_binary(&mut self, binary: &BinaryExpression) -> Result<String> {
        let op = &binary.operator;
        if op.is_containment() {
            return self.visit_containment(binary);
        }
        if matches!(op, Operator::Between | Operator::NotBetween) {
            if let ElementKind::ClauseList(bounds) = binary.right.kind() {
                if let [lower, upper] = bounds.clauses.as_slice() {
                    let left = self.operand(op, &binary.left, OperandPosition::Left, Position::Value)?;
                    let lower = self.operand(op, lower, OperandPosition::Right, Position::Value)?;
                    let upper = self.operand(op, upper, OperandPosition::Right, Position::Value)?;
                    return Ok(format!("{left} {} {lower} AND {upper}", spelled(op)));
                }
            }
        }

        let left = self.operand(op, &binary.left, OperandPosition::Left, Position::Value)?;
        let right = self.operand(op, &binary.right, OperandPosition::Right, Position::Value)?;
        let mut sql = self.spell_binary(op, &left, &right)?;
        if let Some(escape) = binary.escape {
            sql.push_str(" ESCAPE ");
            sql.push_str(&escape_marks(&SqlValue::Text(escape.to_string()).to_sql_inline()));
        }
        Ok(sql)
    }

    fn spell_binary(&self, op: &Operator, left: &str, right: &str) -> Result<String> {
        Ok(match op {
            Operator::ILike | Operator::NotILike if !self.dialect.supports_ilike() => {
                let keyword = if *op == Operator::ILike { "LIKE" } else { "NOT LIKE" };
                format!("lower({left}) {keyword} lower({right})")
            }
            Operator::RegexpMatch | Operator::NotRegexpMatch => {
                let negated = *op == Operator::NotRegexpMatch;
                match self.dialect.regex_style() {
                    RegexStyle::Operator => {
                        format!("{left} {} {right}", if negated { "!~" } else { "~" })
                    }
                    RegexStyle::Keyword => {
                        format!("{left} {} {right}", if negated { "NOT REGEXP" } else { "REGEXP" })
                    }
                    RegexStyle::Function => {
                        let call = format!("REGEXP_LIKE({left}, {right})");
                        if negated {
                            format!("NOT {call}")
                        } else {
                            call
                        }
                    }
                    RegexStyle::Unsupported => {
                        return Err(Error::compile(format!(
                            "Regular expression matching is not supported by the {} dialect",
                            self.dialect.name()
                        )));
                    }
                }
            }
            Operator::Concat => match self.dialect.concat_style() {
                ConcatStyle::Operator => format!("{left} || {right}"),
                ConcatStyle::Plus => format!("{left} + {right}"),
                ConcatStyle::Function => format!("concat({left}, {right})"),
            },
            other => format!("{left} {} {right}", spelled(other)),
        })
    }

    fn visit_containment(&mut self, binary: &BinaryExpression) -> Result<String> {
        let op = &binary.operator;
        let negated = *op == Operator::NotIn;
        let left = self.operand(op, &binary.left, OperandPosition::Left, Position::Value)?;
        match binary.right.kind() {
            ElementKind::BindParam(bind) if bind.expanding => {
                let placement = if negated { Placement::NotIn } else { Placement::In };
                let list = self.visit_bind(&binary.right, bind, placement)?;
                Ok(if negated {
                    format!("({left} NOT IN ({list}))")
                } else {
                    format!("{left} IN ({list})")
                })
            }
            ElementKind::Tuple(_) | ElementKind::ScalarSelect(_) | ElementKind::Grouping(_) => {
                let right = self.process(&binary.right, Position::Value)?;
                Ok(format!("{left} {} {right}", spelled(op)))
            }
            _ => {
                let right = self.process(&binary.right, Position::Value)?;
                Ok(format!("{left} {} ({right})", spelled(op)))
            }
        }
    }

    fn visit_clause_list(&mut self, list: &ClauseList, position: Position) -> Result<String> {
        let op = &list.operator;
        let (absorbing, neutral) = match op {
            Operator::And => (Some(false), Some(true)),
            Operator::Or => (Some(true), Some(false)),
            _ => (None, None),
        };
        let member_position = if op.is_boolean() {
            Position::Predicate
        } else {
            position
        };

        let constant = |e: &ClauseElement| match e.kind() {
            ElementKind::True => Some(true),
            ElementKind::False => Some(false),
            _ => None,
        };
        if let Some(absorbing) = absorbing {
            if list.clauses.iter().any(|c| constant(c) == Some(absorbing)) {
                return Ok(self.boolean(absorbing, position));
            }
        }

        let mut skipped_neutral = false;
        let mut parts = Vec::with_capacity(list.clauses.len());
        for clause in &list.clauses {
            if neutral.is_some() && constant(clause) == neutral {
                skipped_neutral = true;
                continue;
            }
            let rendered = self.operand(op, clause, OperandPosition::ListItem, member_position)?;
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }

        if parts.is_empty() {
            if let (true, Some(neutral)) = (skipped_neutral, neutral) {
                return Ok(self.boolean(neutral, position));
            }
            return Ok(String::new());
        }
        let separator = match op {
            Operator::Comma => String::from(", "),
            other => format!(" {} ", spelled(other)),
        };
        Ok(parts.join(&separator))
    }

    fn resolves_label(&self, element: &ClauseElement, label: &Label) -> bool {
        label.allow_label_resolve
            && self
                .labels
                .as_ref()
                .is_some_and(|scope| scope.by_key.iter().any(|(key, _)| *key == element.key()))
    }

    fn visit_label(
        &mut self,
        element: &ClauseElement,
        label: &Label,
        position: Position,
    ) -> Result<String> {
        if label.allow_label_resolve {
            let resolved = self.labels.as_ref().and_then(|scope| {
                scope
                    .by_key
                    .iter()
                    .find(|(key, _)| *key == element.key())
                    .map(|(_, name)| name.clone())
            });
            if let Some(name) = resolved {
                trace!(label = %name, "label resolved against columns clause");
                return Ok(name);
            }
        }
        self.process(&label.element, position)
    }

    fn visit_label_reference(&self, name: &str) -> Result<String> {
        self.labels
            .as_ref()
            .and_then(|scope| scope.by_name.iter().find(|(given, _)| given == name))
            .map(|(_, rendered)| rendered.clone())
            .ok_or_else(|| {
                Error::compile(format!(
                    "Can't resolve label reference for ORDER BY / GROUP BY / DISTINCT etc.; \
                     label '{name}' is not present in the columns clause"
                ))
            })
    }

    fn visit_function(&mut self, function: &FunctionCall) -> Result<String> {
        let name = escape_marks(&function.name);
        Ok(format!("{name}({})", self.process_all(&function.args)?))
    }

    fn visit_case(&mut self, case: &Case) -> Result<String> {
        let mut sql = String::from("CASE");
        let when_position = match &case.value {
            Some(value) => {
                sql.push(' ');
                sql.push_str(&self.process(value, Position::Value)?);
                Position::Value
            }
            None => Position::Predicate,
        };
        for (when, then) in &case.whens {
            sql.push_str(" WHEN ");
            sql.push_str(&self.process(when, when_position)?);
            sql.push_str(" THEN ");
            sql.push_str(&self.process(then, Position::Value)?);
        }
        if let Some(else_) = &case.else_ {
            sql.push_str(" ELSE ");
            sql.push_str(&self.process(else_, Position::Value)?);
        }
        sql.push_str(" END");
        Ok(sql)
    }

    fn visit_custom(&mut self, custom: &CustomClause) -> Result<String> {
        let Some(renderer) = self.options.renderer_for(&custom.visit_name).cloned() else {
            return Err(Error::UnsupportedCompilation {
                kind: custom.visit_name.clone(),
                dialect: String::from(self.dialect.name()),
            });
        };
        let children = custom
            .children
            .iter()
            .map(|c| self.process(c, Position::Value))
            .collect::<Result<Vec<_>>>()?;
        Ok(renderer(custom, &children))
    }

    // -----------------------------------------------------------------------
    // FROM clause
    // -----------------------------------------------------------------------

    fn visit_from(&mut self, element: &ClauseElement) -> Result<String> {
        match element.kind() {
            ElementKind::Table(table) => Ok(self.table_name(table)),
            ElementKind::Alias(alias) => match &alias.kind {
                AliasKind::Cte(_) => self.visit_cte(element, alias),
                AliasKind::Alias | AliasKind::Subquery => {
                    let name = self.quote_name(&alias.name);
                    let source = self.alias_source(&alias.element)?;
                    Ok(if self.dialect.table_alias_keyword() {
                        format!("{source} AS {name}")
                    } else {
                        format!("{source} {name}")
                    })
                }
            },
            ElementKind::Join(join) => self.visit_join(join),
            _ => self.process(element, Position::Value),
        }
    }

    /// The thing an alias names, without the alias name.
    fn alias_source(&mut self, element: &ClauseElement) -> Result<String> {
        match element.kind() {
            ElementKind::Table(table) => Ok(self.table_name(table)),
            ElementKind::Alias(inner) => match &inner.kind {
                AliasKind::Cte(_) => self.visit_cte(element, inner),
                _ => self.alias_source(&inner.element),
            },
            ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
                Ok(format!("({})", self.visit_statement(element, Nesting::From)?))
            }
            _ => self.process(element, Position::Value),
        }
    }

    fn visit_join(&mut self, join: &Join) -> Result<String> {
        let left = self.visit_from(&join.left)?;
        let right = self.visit_from(&join.right)?;
        let right = if matches!(join.right.kind(), ElementKind::Join(_)) {
            format!("({right})")
        } else {
            right
        };
        let keyword = if join.full {
            "FULL OUTER JOIN"
        } else if join.is_outer {
            "LEFT OUTER JOIN"
        } else {
            "JOIN"
        };
        let on = self.process(&join.onclause, Position::Predicate)?;
        Ok(format!("{left} {keyword} {right} ON {on}"))
    }

    /// Registers a CTE for the WITH clause and returns its name.
    fn visit_cte(&mut self, element: &ClauseElement, alias: &Alias) -> Result<String> {
        let name = self.names.name(&alias.name);
        let quoted = self.quote(&name);
        let info = alias.cte().cloned().unwrap_or_default();
        let keys: HashSet<ElementId> = element
            .cloned_set()
            .chain(info.restates.iter().copied())
            .collect();

        if let Some(index) = self.ctes.iter().position(|entry| entry.name == name) {
            let entry = &self.ctes[index];
            if !entry.keys.iter().any(|k| keys.contains(k)) {
                return Err(Error::compile(format!(
                    "Multiple, unrelated CTEs found with the same name: '{name}'"
                )));
            }
            let continues = !entry.keys.contains(&element.key())
                && info.restates.iter().any(|k| entry.keys.contains(k));
            if continues {
                trace!(cte = %name, "CTE continued by a later statement");
                self.ctes[index].keys.extend(keys);
                self.ctes[index].recursive |= info.recursive;
                let body = self.cte_body(&alias.element)?;
                self.ctes[index].body = Some(body);
            }
            return Ok(quoted);
        }

        let columns = if info.recursive {
            statement_columns(&alias.element)
                .iter()
                .map(|col| self.quote_name(&col.name))
                .collect()
        } else {
            Vec::new()
        };
        self.ctes.push(CteEntry {
            name: name.clone(),
            keys,
            recursive: info.recursive,
            columns,
            body: None,
        });
        let body = self.cte_body(&alias.element)?;
        if let Some(entry) = self.ctes.iter_mut().find(|entry| entry.name == name) {
            entry.body = Some(body);
        }
        Ok(quoted)
    }

    /// Renders a CTE body as a top-level statement, outside any correlation
    /// or label scope.
    fn cte_body(&mut self, statement: &ClauseElement) -> Result<String> {
        let stack = std::mem::take(&mut self.stack);
        let labels = self.labels.take();
        let body = self.visit_statement(statement, Nesting::Top);
        self.stack = stack;
        self.labels = labels;
        body
    }

    fn with_clause(&self) -> String {
        let recursive = self.ctes.iter().any(|entry| entry.recursive);
        let entries: Vec<String> = self
            .ctes
            .iter()
            .map(|entry| {
                let name = self.quote(&entry.name);
                let columns = if entry.columns.is_empty() {
                    String::new()
                } else {
                    format!("({})", entry.columns.join(", "))
                };
                format!(
                    "{name}{columns} AS ({})",
                    entry.body.as_deref().unwrap_or_default()
                )
            })
            .collect();
        format!(
            "WITH {}{}",
            if recursive { "RECURSIVE " } else { "" },
            entries.join(", ")
        )
    }

    // -----------------------------------------------------------------------
    // SELECT
    // -----------------------------------------------------------------------

    fn visit_statement(&mut self, element: &ClauseElement, nesting: Nesting) -> Result<String> {
        match element.kind() {
            ElementKind::Select(select) => self.visit_select(select, nesting),
            ElementKind::CompoundSelect(compound) => self.visit_compound(compound, nesting),
            _ => self.process(element, Position::Value),
        }
    }

    /// `(explicit, implicit)` correlation candidates for a SELECT embedded
    /// as `nesting`.
    fn correlation(&self, nesting: Nesting) -> (Vec<ClauseElement>, Vec<ClauseElement>) {
        match (self.stack.last(), nesting) {
            (None, _) | (_, Nesting::Top) => (Vec::new(), Vec::new()),
            (Some(scope), Nesting::From) => {
                let own: HashSet<ElementId> = scope.froms.iter().map(ClauseElement::key).collect();
                let enclosing = scope
                    .correlate_froms
                    .iter()
                    .filter(|f| !own.contains(&f.key()))
                    .cloned()
                    .collect();
                (enclosing, Vec::new())
            }
            (Some(scope), Nesting::Scalar) => (scope.correlate_froms.clone(), scope.froms.clone()),
        }
    }

    fn push_scope(&mut self, froms: &[ClauseElement]) {
        let mut expanded = Vec::new();
        for from in froms {
            expand_joins(from, &mut expanded);
        }
        let mut correlate_froms = expanded.clone();
        if let Some(enclosing) = self.stack.last() {
            correlate_froms.extend(enclosing.correlate_froms.iter().cloned());
        }
        self.stack.push(Scope {
            froms: expanded,
            correlate_froms,
        });
    }

    fn visit_select(&mut self, select: &Select, nesting: Nesting) -> Result<String> {
        let (explicit, implicit) = self.correlation(nesting);
        let froms = select.display_froms(&explicit, &implicit)?;
        trace!(froms = froms.len(), ?nesting, "rendering SELECT");
        self.push_scope(&froms);
        let result = self.select_body(select, &froms);
        self.stack.pop();
        result
    }

    fn select_body(&mut self, select: &Select, froms: &[ClauseElement]) -> Result<String> {
        let columns = select.named_columns_for_compile();
        let mut sql = String::from("SELECT ");
        if select.distinct {
            sql.push_str("DISTINCT ");
        }
        let mut rendered = Vec::with_capacity(columns.len());
        for column in &columns {
            let expr = match column.element.kind() {
                ElementKind::Label(label) => self.process(&label.element, Position::Value)?,
                _ => self.process(&column.element, Position::Value)?,
            };
            if column.labeled {
                let name = self.quote_name(&column.name);
                rendered.push(format!("{expr} AS {name}"));
            } else {
                rendered.push(expr);
            }
        }
        sql.push_str(&rendered.join(", "));

        if froms.is_empty() {
            if let Some(suffix) = self.dialect.from_less_select_suffix() {
                sql.push_str(" FROM ");
                sql.push_str(suffix);
            }
        } else {
            let froms = froms
                .iter()
                .map(|f| self.visit_from(f))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" FROM ");
            sql.push_str(&froms.join(", "));
        }

        if let Some(criterion) = &select.where_clause {
            push_clause(&mut sql, " WHERE ", &self.process(criterion, Position::Predicate)?);
        }

        let scope = self.label_scope(&columns);
        let outer = self.labels.replace(scope);
        let ordering = self.grouping_and_ordering(select);
        self.labels = outer;
        sql.push_str(&ordering?);

        sql.push_str(&self.limit_clause(select.limit.as_ref(), select.offset.as_ref())?);
        Ok(sql)
    }

    fn grouping_and_ordering(&mut self, select: &Select) -> Result<String> {
        let mut sql = String::new();
        if !select.group_by.is_empty() {
            push_clause(&mut sql, " GROUP BY ", &self.process_all(&select.group_by)?);
        }
        if let Some(having) = &select.having {
            push_clause(&mut sql, " HAVING ", &self.process(having, Position::Predicate)?);
        }
        if !select.order_by.is_empty() {
            push_clause(&mut sql, " ORDER BY ", &self.process_all(&select.order_by)?);
        }
        Ok(sql)
    }

    fn label_scope(&mut self, columns: &[SelectedColumn]) -> LabelScope {
        let mut scope = LabelScope::default();
        for column in columns {
            let rendered = self.quote_name(&column.name);
            if let ElementKind::Label(label) = column.element.kind() {
                if label.allow_label_resolve {
                    scope.by_key.push((column.element.key(), rendered.clone()));
                }
            }
            if let Name::Given(given) = &column.name {
                scope.by_name.push((given.clone(), rendered));
            }
        }
        scope
    }

    fn limit_clause(
        &mut self,
        limit: Option<&ClauseElement>,
        offset: Option<&ClauseElement>,
    ) -> Result<String> {
        let limit = limit.map(|l| self.process(l, Position::Value)).transpose()?;
        let offset = offset.map(|o| self.process(o, Position::Value)).transpose()?;
        let mut sql = String::new();
        match self.dialect.limit_style() {
            LimitStyle::LimitOffset => {
                if let Some(limit) = limit {
                    sql.push_str(&format!(" LIMIT {limit}"));
                }
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
            }
            LimitStyle::OffsetFetch => {
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {offset} ROWS"));
                }
                if let Some(limit) = limit {
                    sql.push_str(&format!(" FETCH FIRST {limit} ROWS ONLY"));
                }
            }
        }
        Ok(sql)
    }

    fn visit_compound(&mut self, compound: &CompoundSelect, nesting: Nesting) -> Result<String> {
        let mut members = Vec::with_capacity(compound.selects.len());
        for member in &compound.selects {
            let rendered = self.visit_statement(member, nesting)?;
            let grouped = match member.kind() {
                ElementKind::CompoundSelect(_) => true,
                ElementKind::Select(s) => {
                    !s.order_by.is_empty() || s.limit.is_some() || s.offset.is_some()
                }
                _ => false,
            };
            members.push(if grouped {
                format!("({rendered})")
            } else {
                rendered
            });
        }
        let mut sql = members.join(&format!(" {} ", compound.keyword.as_str()));

        if !compound.order_by.is_empty() {
            let columns = compound
                .selects
                .first()
                .map(statement_columns)
                .unwrap_or_default();
            let scope = self.label_scope(&columns);
            let outer = self.labels.replace(scope);
            let order_by = self.process_all(&compound.order_by);
            self.labels = outer;
            push_clause(&mut sql, " ORDER BY ", &order_by?);
        }
        sql.push_str(&self.limit_clause(compound.limit.as_ref(), compound.offset.as_ref())?);
        Ok(sql)
    }

    // -----------------------------------------------------------------------
    // DML
    // -----------------------------------------------------------------------

    fn dml_column_name(&mut self, column: &ClauseElement) -> String {
        match column.name() {
            Some(name) => self.quote_name(name),
            None => String::new(),
        }
    }

    fn returning_clause(&mut self, columns: &[ClauseElement]) -> Result<String> {
        if columns.is_empty() {
            return Ok(String::new());
        }
        if !self.dialect.supports_returning() {
            return Err(Error::compile(format!(
                "RETURNING is not supported by the {} dialect's statement compiler",
                self.dialect.name()
            )));
        }
        Ok(format!(" RETURNING {}", self.process_all(columns)?))
    }

    fn visit_insert(&mut self, insert: &Insert) -> Result<String> {
        let table = self.visit_from(&insert.table)?;
        self.push_scope(std::slice::from_ref(&insert.table));
        let result = self.insert_body(insert, table);
        self.stack.pop();
        result
    }

    fn insert_body(&mut self, insert: &Insert, table: String) -> Result<String> {
        let mut sql = format!("INSERT INTO {table}");
        match &insert.source {
            InsertSource::Default => sql.push_str(" DEFAULT VALUES"),
            InsertSource::Values { rows, multi } => {
                let columns: Vec<ClauseElement> = insert
                    .table
                    .columns()
                    .into_iter()
                    .filter(|c| rows.iter().flatten().any(|(col, _)| col.same_key(c)))
                    .collect();
                let names: Vec<String> = columns.iter().map(|c| self.dml_column_name(c)).collect();
                let mut rendered_rows = Vec::with_capacity(rows.len());
                for (index, row) in rows.iter().enumerate() {
                    let mut values = Vec::with_capacity(columns.len());
                    for (column, name) in columns.iter().zip(&names) {
                        match row.iter().find(|(col, _)| col.same_key(column)) {
                            Some((_, value)) => values.push(self.process(value, Position::Value)?),
                            None if *multi => {
                                return Err(Error::compile(format!(
                                    "INSERT value for column '{name}' is missing from row {index} \
                                     of a multi-row VALUES clause"
                                )));
                            }
                            None => values.push(String::from("DEFAULT")),
                        }
                    }
                    rendered_rows.push(format!("({})", values.join(", ")));
                }
                sql.push_str(&format!(
                    " ({}) VALUES {}",
                    names.join(", "),
                    rendered_rows.join(", ")
                ));
            }
            InsertSource::Select { columns, select } => {
                let names: Vec<String> = columns.iter().map(|c| self.dml_column_name(c)).collect();
                let body = self.visit_statement(select, Nesting::From)?;
                sql.push_str(&format!(" ({}) {body}", names.join(", ")));
            }
        }
        sql.push_str(&self.returning_clause(&insert.returning)?);
        Ok(sql)
    }

    fn visit_update(&mut self, update: &Update) -> Result<String> {
        let table = self.visit_from(&update.table)?;
        if update.values.is_empty() {
            return Err(Error::compile(format!(
                "UPDATE statement on '{table}' has no SET values"
            )));
        }
        self.push_scope(std::slice::from_ref(&update.table));
        let result = self.update_body(update, &table);
        self.stack.pop();
        result
    }

    fn update_body(&mut self, update: &Update, table: &str) -> Result<String> {
        let mut assignments = Vec::with_capacity(update.values.len());
        for (column, value) in &update.values {
            let name = self.dml_column_name(column);
            assignments.push(format!("{name}={}", self.process(value, Position::Value)?));
        }
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        if let Some(criterion) = &update.where_clause {
            push_clause(&mut sql, " WHERE ", &self.process(criterion, Position::Predicate)?);
        }
        sql.push_str(&self.returning_clause(&update.returning)?);
        Ok(sql)
    }

    fn visit_delete(&mut self, delete: &Delete) -> Result<String> {
        let table = self.visit_from(&delete.table)?;
        self.push_scope(std::slice::from_ref(&delete.table));
        let result = self.delete_body(delete, &table);
        self.stack.pop();
        result
    }

    fn delete_body(&mut self, delete: &Delete, table: &str) -> Result<String> {
        let mut sql = format!("DELETE FROM {table}");
        if let Some(criterion) = &delete.where_clause {
            push_clause(&mut sql, " WHERE ", &self.process(criterion, Position::Predicate)?);
        }
        sql.push_str(&self.returning_clause(&delete.returning)?);
        Ok(sql)
    }

    // -----------------------------------------------------------------------
    // Result columns
    // -----------------------------------------------------------------------

    fn result_columns(&mut self, element: &ClauseElement) -> Vec<ResultColumn> {
        let returning = match element.kind() {
            ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
                return statement_columns(element)
                    .iter()
                    .map(|col| ResultColumn {
                        name: self.names.name(&col.name),
                        data_type: col.element.data_type(),
                    })
                    .collect();
            }
            ElementKind::Insert(insert) => &insert.returning,
            ElementKind::Update(update) => &update.returning,
            ElementKind::Delete(delete) => &delete.returning,
            _ => return Vec::new(),
        };
        returning
            .iter()
            .map(|col| ResultColumn {
                name: col
                    .name()
                    .map_or_else(|| anon_base(col), |name| self.names.name(name)),
                data_type: col.data_type(),
            })
            .collect()
    }
}

/// The operator as SQL text. Custom operators carry caller-supplied text.
fn spelled(op: &Operator) -> String {
    escape_marks(&op.to_string())
}

fn push_clause(sql: &mut String, keyword: &str, rendered: &str) {
    if !rendered.is_empty() {
        sql.push_str(keyword);
        sql.push_str(rendered);
    }
}

fn expand_joins(from: &ClauseElement, out: &mut Vec<ClauseElement>) {
    out.push(from.clone());
    if let ElementKind::Join(join) = from.kind() {
        expand_joins(&join.left, out);
        expand_joins(&join.right, out);
    }
}

fn is_bare_boolean_column(element: &ClauseElement) -> bool {
    matches!(element.kind(), ElementKind::Column(c) if c.data_type == DataType::Boolean)
}
