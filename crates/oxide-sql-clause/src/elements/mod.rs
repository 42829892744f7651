//! The clause element model.
//!
//! A [`ClauseElement`] is an immutable, reference-counted node of a SQL
//! abstract syntax tree. Every node carries three identities:
//!
//! - its *object identity* ([`ClauseElement::id`]), unique per node,
//! - its *hash identity* ([`ClauseElement::key`]), shared by annotated
//!   copies of the same node,
//! - its *lineage*, the hash identities of the nodes it was cloned from.
//!
//! Columns of tables, aliases and subqueries are materialized on demand
//! from their parent and a position; their identities derive from the
//! parent's, so asking a selectable twice for the same column yields nodes
//! that are identical in every observable way.

mod comparison;
mod expression;

use core::fmt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use comparison::{InOperand, IntoOperand};
pub use expression::{
    and_, asc, bindparam, case, cast, collate, column, column_typed, custom, desc, distinct,
    exists, false_, func, grouping, label, literal, literal_column, not_, null, nulls_first,
    nulls_last, or_, order_by_label, text, true_, tuple_, AnonName, BindParamBuilder,
    BindParameter, BinaryExpression, Case, CaseBuilder, Cast, ClauseList, ColumnClause,
    CustomClause, FunctionCall, Grouping, Label, LabelReference, Name, ScalarSelect, TextClause,
    Tuple, UnaryExpression,
};
pub(crate) use expression::{anon_base, anonymous_label, bind_value, expanding_bind};

use crate::dml::{Delete, Insert, Update};
use crate::selectable::{Alias, CompoundSelect, Join, Select, TableClause};
use crate::types::DataType;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a clause element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    base: u64,
    slot: usize,
}

impl ElementId {
    pub(crate) fn fresh() -> Self {
        Self {
            base: NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed),
            slot: 0,
        }
    }

    /// Identity of the column at `index` of the selectable `parent`.
    pub(crate) const fn column_of(parent: Self, index: usize) -> Self {
        Self {
            base: parent.base,
            slot: index + 1,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.slot == 0 {
            write!(f, "#{}", self.base)
        } else {
            write!(f, "#{}.{}", self.base, self.slot - 1)
        }
    }
}

/// Annotation key marking a subtree that replacement traversal must skip.
pub const NO_REPLACEMENT_TRAVERSE: &str = "no_replacement_traverse";

/// Annotation key naming the column an adapter should look up in place of
/// the annotated element.
pub const ADAPT_COLUMN: &str = "adapt_column";

/// A value stored in an element's annotation map.
#[derive(Debug, Clone)]
pub enum AnnotationValue {
    /// A flag.
    Flag(bool),
    /// Free text.
    Text(String),
    /// An integer.
    Int(i64),
    /// Another element, e.g. the column an expression was adapted from.
    Element(ClauseElement),
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        Self::Text(String::from(value))
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<ClauseElement> for AnnotationValue {
    fn from(value: ClauseElement) -> Self {
        Self::Element(value)
    }
}

/// Side-channel key/value bag attached to an element.
#[derive(Debug, Clone, Default)]
pub struct Annotations(BTreeMap<String, AnnotationValue>);

impl Annotations {
    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.0.get(key)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if no annotations are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the annotations in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The node kinds of the clause tree.
#[derive(Debug, Clone)]
pub enum ElementKind {
    /// A column, bound to a selectable or free-standing.
    Column(ColumnClause),
    /// A bind parameter.
    BindParam(BindParameter),
    /// Raw SQL text.
    Text(TextClause),
    /// `NULL`.
    Null,
    /// The boolean true constant.
    True,
    /// The boolean false constant.
    False,
    /// Prefix operator or postfix modifier applied to one element.
    Unary(UnaryExpression),
    /// `left op right`.
    Binary(BinaryExpression),
    /// Elements joined by `,`, `AND` or `OR`.
    ClauseList(ClauseList),
    /// Explicit parentheses.
    Grouping(Grouping),
    /// `(a, b, ...)`.
    Tuple(Tuple),
    /// `expr AS name`.
    Label(Label),
    /// Reference to a label by its name, for ORDER BY / GROUP BY.
    LabelReference(LabelReference),
    /// `name(args)`.
    Function(FunctionCall),
    /// `CASE ... END`.
    Case(Case),
    /// `CAST(expr AS type)`.
    Cast(Cast),
    /// A SELECT used as a column expression.
    ScalarSelect(ScalarSelect),
    /// A table.
    Table(TableClause),
    /// An alias, subquery or common table expression.
    Alias(Alias),
    /// A join between two FROM entries.
    Join(Join),
    /// A SELECT statement.
    Select(Select),
    /// A UNION / INTERSECT / EXCEPT of SELECT statements.
    CompoundSelect(CompoundSelect),
    /// An INSERT statement.
    Insert(Insert),
    /// An UPDATE statement.
    Update(Update),
    /// A DELETE statement.
    Delete(Delete),
    /// A user-defined element rendered by a registered renderer.
    Custom(CustomClause),
}

struct Node {
    id: ElementId,
    key: ElementId,
    lineage: Vec<ElementId>,
    annotations: Annotations,
    kind: ElementKind,
}

/// A node of the SQL clause tree.
#[derive(Clone)]
pub struct ClauseElement(Arc<Node>);

impl ClauseElement {
    pub(crate) fn new(kind: ElementKind) -> Self {
        let id = ElementId::fresh();
        Self(Arc::new(Node {
            id,
            key: id,
            lineage: Vec::new(),
            annotations: Annotations::default(),
            kind,
        }))
    }

    /// Builds the column node at `index` of `parent`.
    pub(crate) fn bound_column(parent: &Self, index: usize, column: ColumnClause) -> Self {
        Self(Arc::new(Node {
            id: ElementId::column_of(parent.id(), index),
            key: ElementId::column_of(parent.key(), index),
            lineage: parent
                .0
                .lineage
                .iter()
                .map(|id| ElementId::column_of(*id, index))
                .collect(),
            annotations: Annotations::default(),
            kind: ElementKind::Column(column),
        }))
    }

    /// Builds a clone of this node carrying `kind`, remembering its origin.
    pub(crate) fn cloned_with(&self, kind: ElementKind) -> Self {
        let id = ElementId::fresh();
        let mut lineage = Vec::with_capacity(self.0.lineage.len() + 1);
        lineage.push(self.key());
        lineage.extend(self.0.lineage.iter().copied());
        Self(Arc::new(Node {
            id,
            key: id,
            lineage,
            annotations: self.0.annotations.clone(),
            kind,
        }))
    }

    /// Replaces the kind of a node that has not been shared yet, keeping
    /// all of its identities.
    ///
    /// This is the non-generative mutation path used while a traversal
    /// still owns the freshly cloned node.
    pub(crate) fn rebuilt(&self, kind: ElementKind) -> Self {
        Self(Arc::new(Node {
            id: self.0.id,
            key: self.0.key,
            lineage: self.0.lineage.clone(),
            annotations: self.0.annotations.clone(),
            kind,
        }))
    }

    /// Object identity.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.0.id
    }

    /// Hash identity, shared between an element and its annotated copies.
    #[must_use]
    pub fn key(&self) -> ElementId {
        self.0.key
    }

    /// Hash identities of the elements this one was cloned from, nearest
    /// first.
    #[must_use]
    pub fn lineage(&self) -> &[ElementId] {
        &self.0.lineage
    }

    /// This element's hash identity followed by its lineage.
    pub fn cloned_set(&self) -> impl Iterator<Item = ElementId> + '_ {
        core::iter::once(self.key()).chain(self.0.lineage.iter().copied())
    }

    /// Returns true if `other` is this very node.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Returns true if `other` is this node or an annotated copy of it.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.key() == other.key()
    }

    /// Returns true if this element is `other` or was cloned from it.
    #[must_use]
    pub fn is_clone_of(&self, other: &Self) -> bool {
        self.cloned_set().any(|id| id == other.key())
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.0.kind
    }

    /// The annotations attached to this node.
    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.0.annotations
    }

    /// Returns an annotated copy: a new node with the same hash identity.
    #[must_use]
    pub fn annotate<K, V>(&self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<AnnotationValue>,
    {
        let mut annotations = self.0.annotations.clone();
        for (k, v) in values {
            annotations.0.insert(k.into(), v.into());
        }
        Self(Arc::new(Node {
            id: ElementId::fresh(),
            key: self.0.key,
            lineage: self.0.lineage.clone(),
            annotations,
            kind: self.0.kind.clone(),
        }))
    }

    /// Returns a copy without annotations, sharing this node's hash identity.
    #[must_use]
    pub fn deannotate(&self) -> Self {
        if self.0.annotations.is_empty() {
            return self.clone();
        }
        Self(Arc::new(Node {
            id: ElementId::fresh(),
            key: self.0.key,
            lineage: self.0.lineage.clone(),
            annotations: Annotations::default(),
            kind: self.0.kind.clone(),
        }))
    }

    /// The dispatch tag of this node.
    #[must_use]
    pub fn visit_name(&self) -> &str {
        match self.kind() {
            ElementKind::Column(_) => "column",
            ElementKind::BindParam(_) => "bindparam",
            ElementKind::Text(_) => "textclause",
            ElementKind::Null => "null",
            ElementKind::True => "true",
            ElementKind::False => "false",
            ElementKind::Unary(_) => "unary",
            ElementKind::Binary(_) => "binary",
            ElementKind::ClauseList(_) => "clauselist",
            ElementKind::Grouping(_) => "grouping",
            ElementKind::Tuple(_) => "tuple",
            ElementKind::Label(_) => "label",
            ElementKind::LabelReference(_) => "label_reference",
            ElementKind::Function(_) => "function",
            ElementKind::Case(_) => "case",
            ElementKind::Cast(_) => "cast",
            ElementKind::ScalarSelect(_) => "scalar_select",
            ElementKind::Table(_) => "table",
            ElementKind::Alias(alias) => alias.visit_name(),
            ElementKind::Join(_) => "join",
            ElementKind::Select(_) => "select",
            ElementKind::CompoundSelect(_) => "compound_select",
            ElementKind::Insert(_) => "insert",
            ElementKind::Update(_) => "update",
            ElementKind::Delete(_) => "delete",
            ElementKind::Custom(custom) => custom.visit_name(),
        }
    }

    /// The SQL type of the expression.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self.kind() {
            ElementKind::Column(c) => c.data_type.clone(),
            ElementKind::BindParam(b) => b.data_type.clone(),
            ElementKind::True | ElementKind::False => DataType::Boolean,
            ElementKind::Unary(u) => u.data_type.clone(),
            ElementKind::Binary(b) => b.data_type.clone(),
            ElementKind::ClauseList(list) if list.operator.is_boolean() => DataType::Boolean,
            ElementKind::Grouping(g) => g.element.data_type(),
            ElementKind::Label(l) => l.element.data_type(),
            ElementKind::Function(f) => f.data_type.clone(),
            ElementKind::Case(c) => c.data_type.clone(),
            ElementKind::Cast(c) => c.data_type.clone(),
            ElementKind::ScalarSelect(s) => s.data_type(),
            ElementKind::Custom(c) => c.data_type.clone(),
            _ => DataType::Null,
        }
    }

    /// Returns true for elements usable as column expressions.
    #[must_use]
    pub fn is_column_element(&self) -> bool {
        match self.kind() {
            ElementKind::Column(_)
            | ElementKind::BindParam(_)
            | ElementKind::Null
            | ElementKind::True
            | ElementKind::False
            | ElementKind::Unary(_)
            | ElementKind::Binary(_)
            | ElementKind::Tuple(_)
            | ElementKind::Label(_)
            | ElementKind::Function(_)
            | ElementKind::Case(_)
            | ElementKind::Cast(_)
            | ElementKind::ScalarSelect(_)
            | ElementKind::Custom(_) => true,
            ElementKind::ClauseList(list) => list.operator.is_boolean(),
            ElementKind::Grouping(g) => g.element.is_column_element(),
            _ => false,
        }
    }

    /// Returns true for elements usable as FROM entries.
    #[must_use]
    pub fn is_from_clause(&self) -> bool {
        matches!(
            self.kind(),
            ElementKind::Table(_) | ElementKind::Alias(_) | ElementKind::Join(_)
        )
    }

    /// Returns true for SELECT and compound SELECT statements.
    #[must_use]
    pub fn is_select_statement(&self) -> bool {
        matches!(
            self.kind(),
            ElementKind::Select(_) | ElementKind::CompoundSelect(_)
        )
    }

    /// Returns true for the NULL / true / false constants.
    #[must_use]
    pub fn is_singleton_constant(&self) -> bool {
        matches!(
            self.kind(),
            ElementKind::Null | ElementKind::True | ElementKind::False
        )
    }

    /// Returns true for nodes that cloning returns unchanged.
    ///
    /// Bound columns are re-pointed by the traversal when their parent is
    /// cloned, see [`crate::visitors`].
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        matches!(
            self.kind(),
            ElementKind::Column(_)
                | ElementKind::Table(_)
                | ElementKind::Null
                | ElementKind::True
                | ElementKind::False
        )
    }

    /// The name this element is known by, when it has one.
    #[must_use]
    pub fn name(&self) -> Option<&Name> {
        match self.kind() {
            ElementKind::Column(c) => Some(&c.name),
            ElementKind::Label(l) => Some(&l.name),
            ElementKind::Alias(a) => Some(&a.name),
            _ => None,
        }
    }

    /// The column payload, for column nodes.
    #[must_use]
    pub fn as_column(&self) -> Option<&ColumnClause> {
        match self.kind() {
            ElementKind::Column(c) => Some(c),
            _ => None,
        }
    }

    /// The label payload, for label nodes.
    #[must_use]
    pub fn as_label(&self) -> Option<&Label> {
        match self.kind() {
            ElementKind::Label(l) => Some(l),
            _ => None,
        }
    }

    /// The SELECT payload, for SELECT nodes.
    #[must_use]
    pub fn as_select(&self) -> Option<&Select> {
        match self.kind() {
            ElementKind::Select(s) => Some(s),
            _ => None,
        }
    }

    /// The alias payload, for aliases, subqueries and CTEs.
    #[must_use]
    pub fn as_alias(&self) -> Option<&Alias> {
        match self.kind() {
            ElementKind::Alias(a) => Some(a),
            _ => None,
        }
    }

    /// The table payload, for tables.
    #[must_use]
    pub fn as_table(&self) -> Option<&TableClause> {
        match self.kind() {
            ElementKind::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Debug for ClauseElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}({})", self.visit_name(), self.id(), self)
    }
}

impl fmt::Display for ClauseElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::compiler::compile(self, &crate::dialect::GenericDialect::new()) {
            Ok(compiled) => f.write_str(compiled.sql()),
            Err(err) => write!(f, "<unrenderable {}: {err}>", self.visit_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = ClauseElement::new(ElementKind::Null);
        let b = ClauseElement::new(ElementKind::Null);
        assert_ne!(a.id(), b.id());
        assert!(a.is(&a.clone()));
        assert!(!a.is(&b));
    }

    #[test]
    fn test_annotated_copy_shares_key() {
        let col = column("x");
        let annotated = col.annotate([("marker", true)]);
        assert!(!annotated.is(&col));
        assert!(annotated.same_key(&col));
        assert!(annotated.annotations().contains("marker"));
        let plain = annotated.deannotate();
        assert!(plain.same_key(&col));
        assert!(plain.annotations().is_empty());
    }

    #[test]
    fn test_clone_records_lineage() {
        let e = column("x").eq(5);
        let copy = e.cloned_with(e.kind().clone());
        assert!(!copy.same_key(&e));
        assert!(copy.is_clone_of(&e));
        assert!(!e.is_clone_of(&copy));
        let copy2 = copy.cloned_with(copy.kind().clone());
        assert!(copy2.is_clone_of(&e));
        assert_eq!(copy2.lineage(), &[copy.key(), e.key()]);
    }

    #[test]
    fn test_column_identity_is_derived() {
        let parent = ElementId::fresh();
        assert_eq!(
            ElementId::column_of(parent, 2),
            ElementId::column_of(parent, 2)
        );
        assert_ne!(
            ElementId::column_of(parent, 1),
            ElementId::column_of(parent, 2)
        );
    }

    #[test]
    fn test_display_renders_generic_sql() {
        assert_eq!(column("x").eq(column("y")).to_string(), "x = y");
    }
}
