//! Analysis and rewriting helpers over clause trees.

use std::collections::{HashSet, VecDeque};

use crate::adapter::ClauseAdapter;
use crate::elements::{BinaryExpression, ClauseElement, ElementId, ElementKind, Name};
use crate::error::{Error, Result};
use crate::operators::Operator;
use crate::selectable::Join;
use crate::value::BindValue;
use crate::visitors::{cloned_traverse, iterate, Replacer};

enum Event {
    Atom(ClauseElement),
    Pair(ClauseElement, ClauseElement, ClauseElement),
}

/// Events of `element` in visiting order: leaf columns it exposes to an
/// enclosing comparison, and the comparisons found inside it.
fn product_events(element: &ClauseElement, out: &mut Vec<Event>) {
    match element.kind() {
        ElementKind::ScalarSelect(_) => out.push(Event::Atom(element.clone())),
        ElementKind::Binary(binary) if binary.operator.is_comparison() => {
            let mut left = Vec::new();
            product_events(&binary.left, &mut left);
            for event in left {
                match event {
                    Event::Atom(l) => {
                        let mut right = Vec::new();
                        product_events(&binary.right, &mut right);
                        for event in right {
                            match event {
                                Event::Atom(r) => {
                                    out.push(Event::Pair(element.clone(), l.clone(), r));
                                }
                                pair @ Event::Pair(..) => out.push(pair),
                            }
                        }
                    }
                    pair @ Event::Pair(..) => out.push(pair),
                }
            }
        }
        _ => {
            if element.as_column().is_some() {
                out.push(Event::Atom(element.clone()));
            }
            for child in element.children() {
                product_events(&child, out);
            }
        }
    }
}

/// Delivers every `(comparison, left, right)` combination of the leaf
/// columns on both sides of each comparison in `expr`.
///
/// `and_((a + b).eq(q + func::sum(e + f)), j.eq(r))` delivers `a = q`,
/// `a = e`, `a = f`, `b = q`, `b = e`, `b = f` and `j = r`, in that order.
/// Scalar subqueries count as leaves and are not searched.
pub fn visit_binary_product(
    expr: &ClauseElement,
    mut visit: impl FnMut(&ClauseElement, &ClauseElement, &ClauseElement),
) {
    let mut events = Vec::new();
    product_events(expr, &mut events);
    for event in events {
        if let Event::Pair(binary, left, right) = event {
            visit(&binary, &left, &right);
        }
    }
}

/// [`visit_binary_product`] collected as `(operator, left, right)` triples.
#[must_use]
pub fn binary_product(expr: &ClauseElement) -> Vec<(Operator, ClauseElement, ClauseElement)> {
    let mut out = Vec::new();
    visit_binary_product(expr, |binary, left, right| {
        if let ElementKind::Binary(b) = binary.kind() {
            out.push((b.operator.clone(), left.clone(), right.clone()));
        }
    });
    out
}

/// What [`find_tables`] reports besides tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindTables {
    /// Report the selectable of every column.
    pub check_columns: bool,
    /// Report aliases, subqueries and CTEs.
    pub include_aliases: bool,
    /// Report joins.
    pub include_joins: bool,
    /// Report SELECT and compound SELECT statements.
    pub include_selects: bool,
    /// Report the target table of INSERT, UPDATE and DELETE statements.
    pub include_crud: bool,
}

/// Locates the tables referenced within `clause`.
#[must_use]
pub fn find_tables(clause: &ClauseElement, options: FindTables) -> Vec<ClauseElement> {
    let mut tables = Vec::new();
    for node in iterate(clause) {
        match node.kind() {
            ElementKind::Table(_) => tables.push(node.clone()),
            ElementKind::Alias(alias) => {
                if options.include_aliases {
                    tables.push(node.clone());
                }
                if matches!(alias.element().kind(), ElementKind::Table(_)) {
                    tables.push(alias.element().clone());
                }
            }
            ElementKind::Join(_) if options.include_joins => tables.push(node.clone()),
            ElementKind::Select(_) | ElementKind::CompoundSelect(_) if options.include_selects => {
                tables.push(node.clone());
            }
            ElementKind::Insert(i) if options.include_crud => tables.push(i.table.clone()),
            ElementKind::Update(u) if options.include_crud => tables.push(u.table.clone()),
            ElementKind::Delete(d) if options.include_crud => tables.push(d.table.clone()),
            ElementKind::Column(c) if options.check_columns => {
                if let Some(parent) = c.parent() {
                    tables.push(parent.clone());
                }
            }
            _ => {}
        }
    }
    tables
}

/// The column expressions of an ORDER BY entry, without `DESC`, `ASC`,
/// `NULLS FIRST` or `NULLS LAST`, and without labels around plain
/// expressions.
#[must_use]
pub fn unwrap_order_by(clause: &ClauseElement) -> Vec<ClauseElement> {
    let mut seen: HashSet<ElementId> = HashSet::new();
    let mut out = Vec::new();
    let mut queue = VecDeque::from([clause.clone()]);
    while let Some(next) = queue.pop_front() {
        let ordering = matches!(
            next.kind(),
            ElementKind::Unary(u) if u.modifier.as_ref().is_some_and(Operator::is_modifier)
        );
        if !next.is_column_element() || ordering {
            queue.extend(next.children());
            continue;
        }
        if let ElementKind::Label(label) = next.kind() {
            if !matches!(label.element().kind(), ElementKind::ScalarSelect(_)) {
                let inner = match label.element().kind() {
                    ElementKind::Grouping(g) => g.element.clone(),
                    _ => label.element().clone(),
                };
                queue.push_back(inner);
                continue;
            }
        }
        if seen.insert(next.key()) {
            out.push(next);
        }
    }
    out
}

/// FROM entries visible at the surface of `clause`, descending through
/// joins only.
#[must_use]
pub fn surface_selectables(clause: &ClauseElement) -> Vec<ClauseElement> {
    let mut out = Vec::new();
    let mut stack = vec![clause.clone()];
    while let Some(element) = stack.pop() {
        if let ElementKind::Join(join) = element.kind() {
            stack.push(join.left.clone());
            stack.push(join.right.clone());
        }
        out.push(element);
    }
    out
}

/// Returns true if `clause` is plainly present in `search`, without any
/// subquery or alias in between.
#[must_use]
pub fn clause_is_present(clause: &ClauseElement, search: &ClauseElement) -> bool {
    surface_selectables(search)
        .iter()
        .any(|element| element.same_key(clause))
}

/// Returns true if `left` and `right` share a surface selectable.
#[must_use]
pub fn selectables_overlap(left: &ClauseElement, right: &ClauseElement) -> bool {
    let left: HashSet<ElementId> = surface_selectables(left)
        .iter()
        .map(ClauseElement::key)
        .collect();
    surface_selectables(right)
        .iter()
        .any(|element| left.contains(&element.key()))
}

/// The values of the bind parameters in `clause`, in traversal order.
///
/// Parameters without a value yield `None`.
#[must_use]
pub fn bind_values(clause: &ClauseElement) -> Vec<Option<BindValue>> {
    iterate(clause)
        .iter()
        .filter_map(|node| match node.kind() {
            ElementKind::BindParam(b) => Some(b.value().cloned()),
            _ => None,
        })
        .collect()
}

/// Which columns of a criterion [`criterion_as_pairs`] treats as the
/// referencing side.
#[derive(Debug, Clone, Default)]
pub struct PairsOptions {
    /// Columns to consider foreign keys.
    pub consider_as_foreign_keys: Option<Vec<ClauseElement>>,
    /// Columns to consider referenced keys.
    pub consider_as_referenced_keys: Option<Vec<ClauseElement>>,
    /// Accept every comparison operator, not only `=`.
    pub any_operator: bool,
}

fn contains_key(set: &[ClauseElement], element: &ClauseElement) -> bool {
    set.iter().any(|e| e.same_key(element))
}

/// `(referenced, referencing)` column pairs found in the comparisons of
/// `expression`.
///
/// Without explicit key sets the direction comes from the columns' foreign
/// keys.
///
/// # Errors
///
/// Returns [`Error::Argument`] if both key sets are given.
pub fn criterion_as_pairs(
    expression: &ClauseElement,
    options: &PairsOptions,
) -> Result<Vec<(ClauseElement, ClauseElement)>> {
    if options.consider_as_foreign_keys.is_some() && options.consider_as_referenced_keys.is_some() {
        return Err(Error::argument(
            "Can only specify one of 'consider_as_foreign_keys' or 'consider_as_referenced_keys'",
        ));
    }
    let mut pairs = Vec::new();
    for node in iterate(expression) {
        let ElementKind::Binary(binary) = node.kind() else {
            continue;
        };
        if !options.any_operator && binary.operator != Operator::Eq {
            continue;
        }
        let (left, right) = (&binary.left, &binary.right);
        if !left.is_column_element() || !right.is_column_element() {
            continue;
        }
        if let Some(fks) = &options.consider_as_foreign_keys {
            if contains_key(fks, left) && (right.same_key(left) || !contains_key(fks, right)) {
                pairs.push((right.clone(), left.clone()));
            } else if contains_key(fks, right) && (left.same_key(right) || !contains_key(fks, left)) {
                pairs.push((left.clone(), right.clone()));
            }
        } else if let Some(referenced) = &options.consider_as_referenced_keys {
            if contains_key(referenced, left)
                && (right.same_key(left) || !contains_key(referenced, right))
            {
                pairs.push((left.clone(), right.clone()));
            } else if contains_key(referenced, right)
                && (left.same_key(right) || !contains_key(referenced, left))
            {
                pairs.push((right.clone(), left.clone()));
            }
        } else if left.as_column().is_some() && right.as_column().is_some() {
            if left.references(right) {
                pairs.push((right.clone(), left.clone()));
            } else if right.references(left) {
                pairs.push((left.clone(), right.clone()));
            }
        }
    }
    Ok(pairs)
}

fn bind_key(element: &ClauseElement) -> Option<&str> {
    match element.kind() {
        ElementKind::BindParam(b) => match b.key() {
            Name::Given(key) => Some(key),
            Name::Anonymous(_) => None,
        },
        _ => None,
    }
}

/// Rewrites comparisons against the named bind parameters into
/// `IS NULL` tests.
#[must_use]
pub fn adapt_criterion_to_null(criterion: &ClauseElement, nulls: &[&str]) -> ClauseElement {
    cloned_traverse(criterion, |copy| {
        let ElementKind::Binary(binary) = copy.kind() else {
            return None;
        };
        let is_null = |e: &ClauseElement| bind_key(e).is_some_and(|k| nulls.contains(&k));
        let kept = if is_null(&binary.left) {
            binary.right.clone()
        } else if is_null(&binary.right) {
            binary.left.clone()
        } else {
            return None;
        };
        Some(copy.rebuilt(ElementKind::Binary(BinaryExpression {
            left: kept,
            right: crate::elements::null(),
            operator: Operator::Is,
            negate: Some(Operator::IsNot),
            ..binary.clone()
        })))
    })
}

fn splice(adapter: &ClauseAdapter, right: &ClauseElement, stop_on: Option<&ClauseElement>) -> ClauseElement {
    match right.kind() {
        ElementKind::Join(join) if !stop_on.is_some_and(|s| s.is(right)) => {
            let onclause = adapter.traverse(&join.onclause);
            let left = splice(adapter, &join.left, stop_on);
            right.cloned_with(ElementKind::Join(Join {
                left,
                right: join.right.clone(),
                onclause,
                is_outer: join.is_outer,
                full: join.full,
            }))
        }
        _ => adapter.traverse(right),
    }
}

/// Re-roots the join chain `right` on `left`: the leftmost FROM entry of
/// `right` that `left` derives from becomes `left`, and ON clauses are
/// adapted to it. The chain below `stop_on` is adapted as a whole.
#[must_use]
pub fn splice_joins(
    left: Option<&ClauseElement>,
    right: &ClauseElement,
    stop_on: Option<&ClauseElement>,
) -> ClauseElement {
    match left {
        None => right.clone(),
        Some(left) => splice(&ClauseAdapter::new(left), right, stop_on),
    }
}
