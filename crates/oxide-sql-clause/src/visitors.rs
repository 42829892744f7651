//! Traversal of clause trees.
//!
//! Three modes share one child-enumeration contract
//! ([`ClauseElement::children`]) and one rebuild contract (the per-kind
//! copy in this module):
//!
//! - [`iterate`]: read-only depth-first pre-order walk, each distinct node
//!   once.
//! - [`cloned_traverse`]: identity-distinct copy of the tree; a node
//!   referenced twice is cloned once and the clone reused.
//! - [`replacement_traverse`]: copy driven by a replacement function
//!   consulted before descending into a node.
//!
//! Immutable nodes (tables, free columns, constants) are never copied.
//! A column bound to a selectable that was copied in the same traversal
//! is re-pointed at the copy's column at the same position.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::dml::{Delete, Insert, InsertSource, Update};
use crate::elements::{
    anon_base, AnnotationValue, BinaryExpression, Case, Cast, ClauseElement, ClauseList, CustomClause,
    ElementId, ElementKind, FunctionCall, Grouping, Label, Name, ScalarSelect, Tuple, UnaryExpression,
    NO_REPLACEMENT_TRAVERSE,
};
use crate::selectable::{bound_column_at, Alias, CompoundSelect, Join, Select};

impl ClauseElement {
    /// Immediate child elements in rendering order.
    ///
    /// Columns do not list their parent selectable, and an alias of a table
    /// does not list the table.
    #[must_use]
    pub fn children(&self) -> Vec<ClauseElement> {
        match self.kind() {
            ElementKind::Column(_)
            | ElementKind::BindParam(_)
            | ElementKind::Text(_)
            | ElementKind::Null
            | ElementKind::True
            | ElementKind::False
            | ElementKind::LabelReference(_)
            | ElementKind::Table(_) => Vec::new(),
            ElementKind::Unary(u) => vec![u.element.clone()],
            ElementKind::Binary(b) => vec![b.left.clone(), b.right.clone()],
            ElementKind::ClauseList(list) => list.clauses.clone(),
            ElementKind::Grouping(g) => vec![g.element.clone()],
            ElementKind::Tuple(t) => t.clauses.clone(),
            ElementKind::Label(l) => vec![l.element.clone()],
            ElementKind::Function(f) => f.args.clone(),
            ElementKind::Case(c) => {
                let mut out: Vec<ClauseElement> = c.value.iter().cloned().collect();
                for (when, then) in &c.whens {
                    out.push(when.clone());
                    out.push(then.clone());
                }
                out.extend(c.else_.iter().cloned());
                out
            }
            ElementKind::Cast(c) => vec![c.element.clone()],
            ElementKind::ScalarSelect(s) => vec![s.element.clone()],
            ElementKind::Alias(a) => {
                if matches!(a.element.kind(), ElementKind::Table(_)) {
                    Vec::new()
                } else {
                    vec![a.element.clone()]
                }
            }
            ElementKind::Join(j) => vec![j.left.clone(), j.right.clone(), j.onclause.clone()],
            ElementKind::Select(s) => {
                let mut out = s.raw_columns.clone();
                out.extend(s.from_obj.iter().cloned());
                out.extend(s.where_clause.iter().cloned());
                out.extend(s.having.iter().cloned());
                out.extend(s.group_by.iter().cloned());
                out.extend(s.order_by.iter().cloned());
                out.extend(s.limit.iter().cloned());
                out.extend(s.offset.iter().cloned());
                out
            }
            ElementKind::CompoundSelect(c) => {
                let mut out = c.selects.clone();
                out.extend(c.order_by.iter().cloned());
                out.extend(c.limit.iter().cloned());
                out.extend(c.offset.iter().cloned());
                out
            }
            ElementKind::Insert(i) => {
                let mut out = vec![i.table.clone()];
                match &i.source {
                    InsertSource::Default => {}
                    InsertSource::Values { rows, .. } => {
                        for row in rows {
                            for (col, value) in row {
                                out.push(col.clone());
                                out.push(value.clone());
                            }
                        }
                    }
                    InsertSource::Select { columns, select } => {
                        out.extend(columns.iter().cloned());
                        out.push(select.clone());
                    }
                }
                out.extend(i.returning.iter().cloned());
                out
            }
            ElementKind::Update(u) => {
                let mut out = vec![u.table.clone()];
                for (col, value) in &u.values {
                    out.push(col.clone());
                    out.push(value.clone());
                }
                out.extend(u.where_clause.iter().cloned());
                out.extend(u.returning.iter().cloned());
                out
            }
            ElementKind::Delete(d) => {
                let mut out = vec![d.table.clone()];
                out.extend(d.where_clause.iter().cloned());
                out.extend(d.returning.iter().cloned());
                out
            }
            ElementKind::Custom(c) => c.children.clone(),
        }
    }
}

/// Every distinct node reachable from `element`, depth-first pre-order.
///
/// A node reachable along several paths is yielded once.
#[must_use]
pub fn iterate(element: &ClauseElement) -> Vec<ClauseElement> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![element.clone()];
    while let Some(next) = stack.pop() {
        if !seen.insert(next.id()) {
            continue;
        }
        let children = next.children();
        stack.extend(children.into_iter().rev());
        out.push(next);
    }
    out
}

/// Calls `visit` on every node [`iterate`] yields.
pub fn traverse(element: &ClauseElement, mut visit: impl FnMut(&ClauseElement)) {
    for node in iterate(element) {
        visit(&node);
    }
}

/// A read-only visitor dispatched per node.
pub trait ClauseVisitor {
    /// Visits one node.
    fn visit(&mut self, element: &ClauseElement);

    /// Visits every node reachable from `element`.
    fn traverse(&mut self, element: &ClauseElement)
    where
        Self: Sized,
    {
        for node in iterate(element) {
            self.visit(&node);
        }
    }
}

/// Something that rewrites a tree by substituting nodes.
pub trait Replacer {
    /// The replacement for `element`, or `None` to copy it and descend.
    fn replace(&self, element: &ClauseElement) -> Option<ClauseElement>;

    /// Runs [`replacement_traverse`] with this replacer.
    fn traverse(&self, element: &ClauseElement) -> ClauseElement {
        replacement_traverse(element, &[], |e| self.replace(e))
    }
}

enum Mode<'a> {
    Clone(&'a mut dyn FnMut(&ClauseElement) -> Option<ClauseElement>),
    Replace(&'a mut dyn FnMut(&ClauseElement) -> Option<ClauseElement>),
}

struct Cloner<'a> {
    mode: Mode<'a>,
    /// Copies made so far, by object identity. An annotated copy has its
    /// own identity and gets its own copy.
    memo: HashMap<ElementId, ClauseElement>,
    /// Copies of selectables by the object identity of their origin, used
    /// to re-point bound columns.
    parents: HashMap<ElementId, ClauseElement>,
    stop_on: HashSet<ElementId>,
    anonymize_labels: bool,
}

impl Cloner<'_> {
    fn clone_element(&mut self, element: &ClauseElement) -> ClauseElement {
        if self.stop_on.contains(&element.id()) {
            return element.clone();
        }
        if let Mode::Replace(replace) = &mut self.mode {
            if element.annotations().contains(NO_REPLACEMENT_TRAVERSE) {
                return element.clone();
            }
            if let Some(replacement) = replace(element) {
                trace!(from = %element.id(), to = %replacement.id(), "replaced element");
                self.stop_on.insert(replacement.id());
                return replacement;
            }
        }
        self.copy(element)
    }

    fn copy(&mut self, element: &ClauseElement) -> ClauseElement {
        let immutable = element.is_immutable();
        let copy = if immutable {
            self.repoint(element)
        } else {
            if let Some(done) = self.memo.get(&element.id()) {
                trace!(element = %element.id(), "traversal memo hit");
                return done.clone();
            }
            let kind = self.copy_internals(element);
            element.cloned_with(kind)
        };
        let result = match &mut self.mode {
            Mode::Clone(visit) => visit(&copy).unwrap_or(copy),
            Mode::Replace(_) => copy,
        };
        if !immutable {
            if matches!(result.kind(), ElementKind::Alias(_)) {
                self.parents.insert(element.id(), result.clone());
            }
            self.memo.insert(element.id(), result.clone());
        }
        result
    }

    /// A bound column of a copied selectable becomes the copy's column.
    fn repoint(&self, element: &ClauseElement) -> ClauseElement {
        let Some(column) = element.as_column() else {
            return element.clone();
        };
        let Some(parent) = column.parent() else {
            return element.clone();
        };
        let Some(new_parent) = self.parents.get(&parent.id()) else {
            return element.clone();
        };
        let Some(repointed) = bound_column_at(new_parent, column.index()) else {
            return element.clone();
        };
        if element.annotations().is_empty() {
            repointed
        } else {
            repointed.annotate(
                element
                    .annotations()
                    .iter()
                    .map(|(k, v)| (String::from(k), v.clone()))
                    .collect::<Vec<(String, AnnotationValue)>>(),
            )
        }
    }

    fn all(&mut self, elements: &[ClauseElement]) -> Vec<ClauseElement> {
        elements.iter().map(|e| self.clone_element(e)).collect()
    }

    fn opt(&mut self, element: Option<&ClauseElement>) -> Option<ClauseElement> {
        element.map(|e| self.clone_element(e))
    }

    fn copy_internals(&mut self, element: &ClauseElement) -> ElementKind {
        match element.kind() {
            ElementKind::BindParam(b) => ElementKind::BindParam(b.with_fresh_key()),
            ElementKind::Unary(u) => ElementKind::Unary(UnaryExpression {
                element: self.clone_element(&u.element),
                ..u.clone()
            }),
            ElementKind::Binary(b) => ElementKind::Binary(BinaryExpression {
                left: self.clone_element(&b.left),
                right: self.clone_element(&b.right),
                ..b.clone()
            }),
            ElementKind::ClauseList(list) => ElementKind::ClauseList(ClauseList {
                operator: list.operator.clone(),
                clauses: self.all(&list.clauses),
            }),
            ElementKind::Grouping(g) => ElementKind::Grouping(Grouping {
                element: self.clone_element(&g.element),
            }),
            ElementKind::Tuple(t) => ElementKind::Tuple(Tuple {
                clauses: self.all(&t.clauses),
            }),
            ElementKind::Label(l) => {
                let element = self.clone_element(&l.element);
                let name = if self.anonymize_labels {
                    Name::anonymous(anon_base(&l.element))
                } else {
                    l.name.clone()
                };
                ElementKind::Label(Label {
                    name,
                    element,
                    allow_label_resolve: l.allow_label_resolve,
                })
            }
            ElementKind::Function(f) => ElementKind::Function(FunctionCall {
                args: self.all(&f.args),
                ..f.clone()
            }),
            ElementKind::Case(c) => {
                let value = self.opt(c.value.as_ref());
                let whens = c
                    .whens
                    .iter()
                    .map(|(w, t)| (self.clone_element(w), self.clone_element(t)))
                    .collect();
                let else_ = self.opt(c.else_.as_ref());
                ElementKind::Case(Case {
                    value,
                    whens,
                    else_,
                    data_type: c.data_type.clone(),
                })
            }
            ElementKind::Cast(c) => ElementKind::Cast(Cast {
                element: self.clone_element(&c.element),
                data_type: c.data_type.clone(),
            }),
            ElementKind::ScalarSelect(s) => ElementKind::ScalarSelect(ScalarSelect {
                element: self.clone_element(&s.element),
            }),
            ElementKind::Alias(a) => {
                let inner = if matches!(a.element.kind(), ElementKind::Table(_)) {
                    a.element.clone()
                } else {
                    self.clone_element(&a.element)
                };
                ElementKind::Alias(Alias {
                    element: inner,
                    ..a.clone()
                })
            }
            ElementKind::Join(j) => {
                let left = self.clone_element(&j.left);
                let right = self.clone_element(&j.right);
                let onclause = self.clone_element(&j.onclause);
                ElementKind::Join(Join {
                    left,
                    right,
                    onclause,
                    ..j.clone()
                })
            }
            ElementKind::Select(s) => ElementKind::Select(self.copy_select(s)),
            ElementKind::CompoundSelect(c) => ElementKind::CompoundSelect(CompoundSelect {
                keyword: c.keyword,
                selects: self.all(&c.selects),
                order_by: self.all(&c.order_by),
                limit: self.opt(c.limit.as_ref()),
                offset: self.opt(c.offset.as_ref()),
            }),
            ElementKind::Insert(i) => {
                let table = self.clone_element(&i.table);
                let source = match &i.source {
                    InsertSource::Default => InsertSource::Default,
                    InsertSource::Values { rows, multi } => InsertSource::Values {
                        rows: rows
                            .iter()
                            .map(|row| {
                                row.iter()
                                    .map(|(c, v)| (c.clone(), self.clone_element(v)))
                                    .collect()
                            })
                            .collect(),
                        multi: *multi,
                    },
                    InsertSource::Select { columns, select } => InsertSource::Select {
                        columns: columns.clone(),
                        select: self.clone_element(select),
                    },
                };
                ElementKind::Insert(Insert {
                    table,
                    source,
                    returning: self.all(&i.returning),
                    positional: i.positional,
                })
            }
            ElementKind::Update(u) => {
                let table = self.clone_element(&u.table);
                let values = u
                    .values
                    .iter()
                    .map(|(c, v)| (c.clone(), self.clone_element(v)))
                    .collect();
                ElementKind::Update(Update {
                    table,
                    values,
                    where_clause: self.opt(u.where_clause.as_ref()),
                    returning: self.all(&u.returning),
                })
            }
            ElementKind::Delete(d) => {
                let table = self.clone_element(&d.table);
                ElementKind::Delete(Delete {
                    table,
                    where_clause: self.opt(d.where_clause.as_ref()),
                    returning: self.all(&d.returning),
                })
            }
            ElementKind::Custom(c) => ElementKind::Custom(CustomClause {
                children: self.all(&c.children),
                ..c.clone()
            }),
            ElementKind::Column(_)
            | ElementKind::Text(_)
            | ElementKind::Null
            | ElementKind::True
            | ElementKind::False
            | ElementKind::LabelReference(_)
            | ElementKind::Table(_) => element.kind().clone(),
        }
    }

    /// FROM entries are copied before the columns and criteria that refer
    /// to them, so bound columns find their re-pointed parents.
    fn copy_select(&mut self, s: &Select) -> Select {
        let explicit: HashSet<ElementId> = s.from_obj.iter().map(ClauseElement::id).collect();
        let mut from_obj = Vec::new();
        for from in s.raw_froms() {
            let copy = self.clone_element(&from);
            if explicit.contains(&from.id()) {
                from_obj.push(copy);
            }
        }
        let raw_columns = self.all(&s.raw_columns);
        let where_clause = self.opt(s.where_clause.as_ref());
        let having = self.opt(s.having.as_ref());
        let group_by = self.all(&s.group_by);
        let order_by = self.all(&s.order_by);
        let limit = self.opt(s.limit.as_ref());
        let offset = self.opt(s.offset.as_ref());
        let correlate = self.with_copies(&s.correlate);
        let correlate_except = s.correlate_except.as_ref().map(|set| self.with_copies(set));
        Select {
            raw_columns,
            from_obj,
            where_clause,
            having,
            group_by,
            order_by,
            limit,
            offset,
            distinct: s.distinct,
            correlate,
            correlate_except,
            auto_correlate: s.auto_correlate,
            label_style: s.label_style,
        }
    }

    /// Copies of `set` followed by the originals, so correlation keeps
    /// matching FROM entries that were substituted by the traversal.
    fn with_copies(&mut self, set: &[ClauseElement]) -> Vec<ClauseElement> {
        let mut out = self.all(set);
        for original in set {
            if !out.iter().any(|e| e.is(original)) {
                out.push(original.clone());
            }
        }
        out
    }
}

/// Copies `element`, calling `visit` on every copy.
///
/// `visit` may return a replacement for the copy it receives; the
/// replacement is what the parent copy links to.
pub fn cloned_traverse(
    element: &ClauseElement,
    mut visit: impl FnMut(&ClauseElement) -> Option<ClauseElement>,
) -> ClauseElement {
    let mut cloner = Cloner {
        mode: Mode::Clone(&mut visit),
        memo: HashMap::new(),
        parents: HashMap::new(),
        stop_on: HashSet::new(),
        anonymize_labels: false,
    };
    cloner.clone_element(element)
}

/// Options of a replacement traversal.
#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Nodes returned as-is, neither replaced nor descended into.
    pub stop_on: Vec<ClauseElement>,
    /// Give every copied label a fresh anonymous name.
    pub anonymize_labels: bool,
}

/// Copies `element`, consulting `replace` before descending into a node.
///
/// A replacement is returned as-is and never traversed; nodes in
/// `stop_on` and nodes annotated with [`NO_REPLACEMENT_TRAVERSE`] are
/// left in place.
pub fn replacement_traverse(
    element: &ClauseElement,
    stop_on: &[ClauseElement],
    replace: impl FnMut(&ClauseElement) -> Option<ClauseElement>,
) -> ClauseElement {
    let options = TraverseOptions {
        stop_on: stop_on.to_vec(),
        anonymize_labels: false,
    };
    replacement_traverse_with(element, &options, replace)
}

/// [`replacement_traverse`] with explicit [`TraverseOptions`].
pub fn replacement_traverse_with(
    element: &ClauseElement,
    options: &TraverseOptions,
    mut replace: impl FnMut(&ClauseElement) -> Option<ClauseElement>,
) -> ClauseElement {
    let mut cloner = Cloner {
        mode: Mode::Replace(&mut replace),
        memo: HashMap::new(),
        parents: HashMap::new(),
        stop_on: options.stop_on.iter().map(ClauseElement::id).collect(),
        anonymize_labels: options.anonymize_labels,
    };
    cloner.clone_element(element)
}

/// An identity-distinct copy of `element` that renders identically.
#[must_use]
pub fn clone_tree(element: &ClauseElement) -> ClauseElement {
    cloned_traverse(element, |_| None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{and_, column, literal};
    use crate::selectable::{select, table};

    #[test]
    fn test_iterate_visits_shared_node_once() {
        let shared = column("a").eq(5);
        let tree = and_([shared.clone(), column("b").eq(shared.clone())]);
        let nodes = iterate(&tree);
        let shared_visits = nodes.iter().filter(|n| n.is(&shared)).count();
        assert_eq!(shared_visits, 1);
        assert!(nodes[0].is(&tree));
    }

    #[test]
    fn test_iterate_is_preorder() {
        let e = column("a").eq(literal(1));
        let names: Vec<String> = iterate(&e)
            .iter()
            .map(|n| String::from(n.visit_name()))
            .collect();
        assert_eq!(names, vec!["binary", "column", "bindparam"]);
    }

    #[test]
    fn test_clone_is_distinct_and_renders_identically() {
        let t = table("t", ["a", "b"]);
        let s: ClauseElement = select([t.c("a").unwrap()])
            .where_(t.c("b").unwrap().eq(column("z")))
            .unwrap()
            .into();
        let copy = clone_tree(&s);
        assert!(!copy.is(&s));
        assert!(copy.is_clone_of(&s));
        assert_eq!(copy.to_string(), s.to_string());
    }

    #[test]
    fn test_clone_preserves_sharing() {
        let shared = column("a").eq(5);
        let tree = and_([shared.clone(), shared]);
        let copy = clone_tree(&tree);
        let children = copy.children();
        assert!(children[0].is(&children[1]));
    }

    #[test]
    fn test_clone_repoints_alias_columns() {
        let t = table("t", ["a"]);
        let alias = t.alias("x").unwrap();
        let expr = alias.c("a").unwrap().eq(5);
        let j = t.join(&alias, Some(expr)).unwrap();
        let copy = clone_tree(&j);
        let ElementKind::Join(join) = copy.kind() else {
            panic!("expected join");
        };
        let ElementKind::Binary(on) = join.onclause.kind() else {
            panic!("expected binary");
        };
        let parent = on.left.as_column().unwrap().parent().unwrap();
        assert!(parent.is(&join.right));
    }

    #[test]
    fn test_replacement_is_not_traversed() {
        let e = column("a").eq(column("b"));
        let mut seen = Vec::new();
        let out = replacement_traverse(&e, &[], |node| {
            seen.push(String::from(node.visit_name()));
            if node.as_column().is_some_and(|c| c.name().base() == "a") {
                Some(column("q"))
            } else {
                None
            }
        });
        assert_eq!(out.to_string(), "q = b");
        assert_eq!(seen, vec!["binary", "column", "column"]);
    }

    #[test]
    fn test_no_replacement_traverse_annotation() {
        let a = column("a").annotate([(NO_REPLACEMENT_TRAVERSE, true)]);
        let e = a.eq(column("b"));
        let out = replacement_traverse(&e, &[], |_| Some(column("z")));
        assert_eq!(out.to_string(), "z");
        let out = replacement_traverse(&e, &[], |node| {
            node.as_column().map(|_| column("z"))
        });
        assert_eq!(out.to_string(), "a = z");
    }
}
