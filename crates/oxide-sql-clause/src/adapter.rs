//! Rewriting expressions into the namespace of a derived selectable.
//!
//! A [`ClauseAdapter`] targets an alias, subquery, CTE or join and rewrites
//! every column that corresponds to one of the target's columns. FROM
//! entries the target derives from are replaced by the target; aliases of
//! other tables are left alone and not descended into. Columns with no
//! correspondence pass through unchanged.
//!
//! [`ColumnAdapter`] adds a memoized per-column lookup and two ways of
//! composing adapters:
//!
//! - [`ColumnAdapter::wrap`] runs `self` and then the wrapped adapter on
//!   the result, so a column can be translated twice.
//! - [`ColumnAdapter::chain`] consults the adapters in order for each node
//!   and the first one that finds a replacement wins.
//!
//! # Example
//!
//! ```
//! use oxide_sql_clause::adapter::ClauseAdapter;
//! use oxide_sql_clause::visitors::Replacer;
//! use oxide_sql_clause::table;
//!
//! let t1 = table("table1", ["col1", "col2"]);
//! let t1a = t1.alias("t1a").unwrap();
//! let expr = t1.c("col1").unwrap().eq(t1.c("col2").unwrap());
//! let adapted = ClauseAdapter::new(&t1a).traverse(&expr);
//! assert_eq!(adapted.to_string(), "t1a.col1 = t1a.col2");
//! ```

use core::fmt;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::elements::{AnnotationValue, ClauseElement, ElementId, ElementKind, Label, ADAPT_COLUMN};
use crate::visitors::{replacement_traverse_with, Replacer, TraverseOptions};

type Predicate = Arc<dyn Fn(&ClauseElement) -> bool + Send + Sync>;

/// Rewrites expressions against a target selectable by column
/// correspondence.
#[derive(Clone)]
pub struct ClauseAdapter {
    selectable: ClauseElement,
    equivalents: HashMap<ElementId, Vec<ClauseElement>>,
    include: Option<Predicate>,
    exclude: Option<Predicate>,
    adapt_on_names: bool,
    anonymize_labels: bool,
    adapt_from_selectables: Vec<ClauseElement>,
    chained: Vec<ClauseAdapter>,
}

impl fmt::Debug for ClauseAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClauseAdapter")
            .field("selectable", &self.selectable)
            .field("equivalents", &self.equivalents.len())
            .field("adapt_on_names", &self.adapt_on_names)
            .field("anonymize_labels", &self.anonymize_labels)
            .field("chained", &self.chained.len())
            .finish_non_exhaustive()
    }
}

impl ClauseAdapter {
    /// An adapter targeting `selectable`.
    #[must_use]
    pub fn new(selectable: &ClauseElement) -> Self {
        Self {
            selectable: selectable.clone(),
            equivalents: HashMap::new(),
            include: None,
            exclude: None,
            adapt_on_names: false,
            anonymize_labels: false,
            adapt_from_selectables: Vec::new(),
            chained: Vec::new(),
        }
    }

    /// Declares `others` equivalent to `column` when no structural
    /// correspondence exists. Equivalents are searched transitively.
    #[must_use]
    pub fn equivalent(
        mut self,
        column: &ClauseElement,
        others: impl IntoIterator<Item = ClauseElement>,
    ) -> Self {
        self.equivalents
            .entry(column.key())
            .or_default()
            .extend(others);
        self
    }

    /// Only elements accepted by `include` are adapted.
    #[must_use]
    pub fn include(mut self, include: impl Fn(&ClauseElement) -> bool + Send + Sync + 'static) -> Self {
        self.include = Some(Arc::new(include));
        self
    }

    /// Elements accepted by `exclude` are never adapted.
    #[must_use]
    pub fn exclude(mut self, exclude: impl Fn(&ClauseElement) -> bool + Send + Sync + 'static) -> Self {
        self.exclude = Some(Arc::new(exclude));
        self
    }

    /// Falls back to matching target columns by name.
    #[must_use]
    pub const fn adapt_on_names(mut self, adapt_on_names: bool) -> Self {
        self.adapt_on_names = adapt_on_names;
        self
    }

    /// Gives every label copied by [`Replacer::traverse`] a fresh
    /// anonymous name.
    #[must_use]
    pub const fn anonymize_labels(mut self, anonymize_labels: bool) -> Self {
        self.anonymize_labels = anonymize_labels;
        self
    }

    /// Restricts adaptation to FROM entries and columns that one of
    /// `selectables` derives from.
    #[must_use]
    pub fn adapt_from_selectables(mut self, selectables: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.adapt_from_selectables.extend(selectables);
        self
    }

    /// Consults `next` for nodes this adapter leaves alone.
    ///
    /// For each node the adapters are tried in order and the first
    /// replacement found is used.
    #[must_use]
    pub fn chain(mut self, mut next: ClauseAdapter) -> Self {
        let rest = std::mem::take(&mut next.chained);
        self.chained.push(next);
        self.chained.extend(rest);
        self
    }

    /// The target selectable.
    #[must_use]
    pub const fn selectable(&self) -> &ClauseElement {
        &self.selectable
    }

    fn visitors(&self) -> impl Iterator<Item = &ClauseAdapter> {
        core::iter::once(self).chain(self.chained.iter())
    }

    fn accepts(&self, element: &ClauseElement) -> bool {
        if self.include.as_ref().is_some_and(|include| !include(element)) {
            return false;
        }
        !self.exclude.as_ref().is_some_and(|exclude| exclude(element))
    }

    /// The target column corresponding to `column`, searching declared
    /// equivalents when no structural correspondence exists.
    #[must_use]
    pub fn corresponding_column(
        &self,
        column: &ClauseElement,
        require_embedded: bool,
    ) -> Option<ClauseElement> {
        let mut seen: HashSet<ElementId> = HashSet::new();
        let mut stack = vec![column.clone()];
        while let Some(candidate) = stack.pop() {
            if let Some(found) = self
                .selectable
                .corresponding_column(&candidate, require_embedded)
            {
                return Some(found);
            }
            if !seen.insert(candidate.key()) {
                continue;
            }
            if let Some(equivalents) = self.equivalents.get(&candidate.key()) {
                stack.extend(
                    equivalents
                        .iter()
                        .rev()
                        .filter(|e| !seen.contains(&e.key()))
                        .cloned(),
                );
            }
        }
        if self.adapt_on_names {
            let name = column.name()?.as_given()?;
            return self.selectable.c(name).ok();
        }
        None
    }

    fn replace_one(&self, element: &ClauseElement, include_singletons: bool) -> Option<ClauseElement> {
        if !self.accepts(element) {
            return None;
        }
        if element.is_from_clause() {
            if self.selectable.is_derived_from(element) {
                if !self.adapt_from_selectables.is_empty()
                    && !self
                        .adapt_from_selectables
                        .iter()
                        .any(|s| s.is_derived_from(element))
                {
                    return None;
                }
                trace!(from = %element.id(), to = %self.selectable.id(), "adapted FROM entry");
                return Some(self.selectable.clone());
            }
            let alias_of_table = element
                .as_alias()
                .is_some_and(|alias| matches!(alias.element().kind(), ElementKind::Table(_)));
            return alias_of_table.then(|| element.clone());
        }
        if !element.is_column_element() {
            return None;
        }
        if !include_singletons && element.is_singleton_constant() {
            return None;
        }
        let column = match element.annotations().get(ADAPT_COLUMN) {
            Some(AnnotationValue::Element(target)) => target,
            _ => element,
        };
        if !self.adapt_from_selectables.is_empty()
            && !self.equivalents.contains_key(&column.key())
            && !self
                .adapt_from_selectables
                .iter()
                .any(|s| s.corresponding_column(column, false).is_some())
        {
            return None;
        }
        let found = self.corresponding_column(column, true)?;
        trace!(from = %element.id(), to = %found.id(), "adapted column");
        Some(found)
    }

    fn replace_chained(&self, element: &ClauseElement, include_singletons: bool) -> Option<ClauseElement> {
        self.visitors()
            .find_map(|adapter| adapter.replace_one(element, include_singletons))
    }

    /// Adapts each element of `elements`.
    #[must_use]
    pub fn adapt_list(&self, elements: &[ClauseElement]) -> Vec<ClauseElement> {
        elements.iter().map(|e| self.traverse(e)).collect()
    }
}

impl Replacer for ClauseAdapter {
    fn replace(&self, element: &ClauseElement) -> Option<ClauseElement> {
        self.replace_chained(element, false)
    }

    fn traverse(&self, element: &ClauseElement) -> ClauseElement {
        let options = TraverseOptions {
            stop_on: vec![self.selectable.clone()],
            anonymize_labels: self.anonymize_labels,
        };
        replacement_traverse_with(element, &options, |node| self.replace(node))
    }
}

/// A [`ClauseAdapter`] with a memoized column lookup and composition.
#[derive(Debug, Clone)]
pub struct ColumnAdapter {
    adapter: ClauseAdapter,
    wrapped: Option<Box<ColumnAdapter>>,
    adapt_required: bool,
    allow_label_resolve: bool,
    cache: RefCell<HashMap<ElementId, Option<ClauseElement>>>,
}

impl From<ClauseAdapter> for ColumnAdapter {
    fn from(adapter: ClauseAdapter) -> Self {
        Self::new(adapter)
    }
}

impl ColumnAdapter {
    /// Wraps a configured [`ClauseAdapter`].
    #[must_use]
    pub fn new(adapter: ClauseAdapter) -> Self {
        Self {
            adapter,
            wrapped: None,
            adapt_required: false,
            allow_label_resolve: true,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// An adapter targeting `selectable` with default options.
    #[must_use]
    pub fn for_selectable(selectable: &ClauseElement) -> Self {
        Self::new(ClauseAdapter::new(selectable))
    }

    /// When set, [`ColumnAdapter::columns`] returns `None` for columns that
    /// were not translated.
    #[must_use]
    pub const fn adapt_required(mut self, adapt_required: bool) -> Self {
        self.adapt_required = adapt_required;
        self
    }

    /// Whether adapted labels may still be referenced by name from ORDER BY
    /// and GROUP BY.
    #[must_use]
    pub const fn allow_label_resolve(mut self, allow_label_resolve: bool) -> Self {
        self.allow_label_resolve = allow_label_resolve;
        self
    }

    /// The underlying clause adapter.
    #[must_use]
    pub const fn clause_adapter(&self) -> &ClauseAdapter {
        &self.adapter
    }

    /// A copy of `self` that passes each of its results through `inner`.
    ///
    /// Elements rejected by `self`'s include/exclude rules go to `inner`
    /// directly.
    #[must_use]
    pub fn wrap(&self, inner: &ColumnAdapter) -> Self {
        Self {
            adapter: self.adapter.clone(),
            wrapped: Some(Box::new(inner.clone())),
            adapt_required: self.adapt_required,
            allow_label_resolve: self.allow_label_resolve,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// A copy of `self` that also consults `next`, first match wins.
    #[must_use]
    pub fn chain(&self, next: &ColumnAdapter) -> Self {
        Self {
            adapter: self.adapter.clone().chain(next.adapter.clone()),
            wrapped: self.wrapped.clone(),
            adapt_required: self.adapt_required,
            allow_label_resolve: self.allow_label_resolve,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The adapted form of `column`, memoized per element.
    ///
    /// Returns `None` only when [`ColumnAdapter::adapt_required`] is set and
    /// nothing was translated.
    #[must_use]
    pub fn columns(&self, column: &ClauseElement) -> Option<ClauseElement> {
        if !self.adapter.accepts(column) {
            return match &self.wrapped {
                Some(inner) => inner.columns(column),
                None => Some(column.clone()),
            };
        }
        if let Some(hit) = self.cache.borrow().get(&column.id()) {
            return hit.clone();
        }
        let located = self.locate(column);
        self.cache.borrow_mut().insert(column.id(), located.clone());
        located
    }

    fn locate(&self, column: &ClauseElement) -> Option<ClauseElement> {
        let mut adapted = if column.is_immutable() {
            self.adapter
                .replace_chained(column, true)
                .unwrap_or_else(|| column.clone())
        } else {
            self.adapter.traverse(column)
        };
        if let Some(inner) = &self.wrapped {
            if let Some(again) = inner.locate(&adapted) {
                adapted = again;
            }
        }
        if adapted.is(column) {
            return (!self.adapt_required).then_some(adapted);
        }
        Some(self.with_label_resolve(adapted))
    }

    fn with_label_resolve(&self, element: ClauseElement) -> ClauseElement {
        match element.kind() {
            ElementKind::Label(label) if label.allow_label_resolve != self.allow_label_resolve => {
                element.rebuilt(ElementKind::Label(Label {
                    allow_label_resolve: self.allow_label_resolve,
                    ..label.clone()
                }))
            }
            _ => element,
        }
    }

    /// Adapts `element`; same as [`ColumnAdapter::columns`] with untouched
    /// elements returned as-is.
    #[must_use]
    pub fn traverse(&self, element: &ClauseElement) -> ClauseElement {
        self.columns(element).unwrap_or_else(|| element.clone())
    }

    /// Adapts each element of `elements`.
    #[must_use]
    pub fn adapt_list(&self, elements: &[ClauseElement]) -> Vec<ClauseElement> {
        elements.iter().map(|e| self.traverse(e)).collect()
    }
}
