//! FROM clause elements and column correspondence.
//!
//! Tables, aliases, subqueries, CTEs and joins export columns. An exported
//! column of an alias *proxies* the column at the same position of the
//! aliased element; [`ClauseElement::corresponding_column`] walks these
//! proxies (and clone lineage) to find, on a derived selectable, the column
//! that stands for a given original column.

mod compound;
mod select;

use std::collections::HashSet;

pub use compound::{
    except_, except_all, intersect, intersect_all, union, union_all, CompoundKeyword,
    CompoundSelect,
};
pub use select::{select, LabelStyle, Select};
pub(crate) use select::{statement_columns, SelectedColumn};

use crate::coercion;
use crate::elements::{ClauseElement, ColumnClause, ElementId, ElementKind, Name};
use crate::error::{Error, Result};
use crate::schema::{ColumnDef, ForeignKeyRef};
use crate::types::DataType;

/// A table: a name and its column definitions.
#[derive(Debug, Clone)]
pub struct TableClause {
    pub(crate) name: String,
    pub(crate) schema: Option<String>,
    pub(crate) columns: Vec<ColumnDef>,
}

impl TableClause {
    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema the table lives in.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Column definitions in order.
    #[must_use]
    pub fn column_defs(&self) -> &[ColumnDef] {
        &self.columns
    }
}

/// A table clause.
#[must_use]
pub fn table<C: Into<ColumnDef>>(
    name: impl Into<String>,
    columns: impl IntoIterator<Item = C>,
) -> ClauseElement {
    ClauseElement::new(ElementKind::Table(TableClause {
        name: name.into(),
        schema: None,
        columns: columns.into_iter().map(Into::into).collect(),
    }))
}

/// A table clause qualified by a schema name.
#[must_use]
pub fn table_in_schema<C: Into<ColumnDef>>(
    schema: impl Into<String>,
    name: impl Into<String>,
    columns: impl IntoIterator<Item = C>,
) -> ClauseElement {
    ClauseElement::new(ElementKind::Table(TableClause {
        name: name.into(),
        schema: Some(schema.into()),
        columns: columns.into_iter().map(Into::into).collect(),
    }))
}

/// CTE-specific state of an [`Alias`].
#[derive(Debug, Clone, Default)]
pub struct CteInfo {
    pub(crate) recursive: bool,
    /// Hash identities of the CTE this one continues with a UNION.
    pub(crate) restates: Vec<ElementId>,
}

impl CteInfo {
    /// Whether the CTE renders under `WITH RECURSIVE`.
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }
}

/// What an [`Alias`] renders as.
#[derive(Debug, Clone)]
pub enum AliasKind {
    /// `table AS name`.
    Alias,
    /// `(SELECT ...) AS name`.
    Subquery,
    /// A named entry of the `WITH` clause.
    Cte(CteInfo),
}

/// A named alias of a table, SELECT or other alias.
#[derive(Debug, Clone)]
pub struct Alias {
    pub(crate) element: ClauseElement,
    pub(crate) name: Name,
    pub(crate) kind: AliasKind,
}

impl Alias {
    /// The aliased element.
    #[must_use]
    pub const fn element(&self) -> &ClauseElement {
        &self.element
    }

    /// The alias name.
    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }

    /// The alias kind.
    #[must_use]
    pub const fn kind(&self) -> &AliasKind {
        &self.kind
    }

    /// The CTE state, for CTEs.
    #[must_use]
    pub const fn cte(&self) -> Option<&CteInfo> {
        match &self.kind {
            AliasKind::Cte(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) const fn visit_name(&self) -> &'static str {
        match self.kind {
            AliasKind::Alias => "alias",
            AliasKind::Subquery => "subquery",
            AliasKind::Cte(_) => "cte",
        }
    }
}

/// `left [LEFT OUTER | FULL OUTER] JOIN right ON onclause`.
#[derive(Debug, Clone)]
pub struct Join {
    pub(crate) left: ClauseElement,
    pub(crate) right: ClauseElement,
    pub(crate) onclause: ClauseElement,
    pub(crate) is_outer: bool,
    pub(crate) full: bool,
}

impl Join {
    /// Left side.
    #[must_use]
    pub const fn left(&self) -> &ClauseElement {
        &self.left
    }

    /// Right side.
    #[must_use]
    pub const fn right(&self) -> &ClauseElement {
        &self.right
    }

    /// The ON clause.
    #[must_use]
    pub const fn onclause(&self) -> &ClauseElement {
        &self.onclause
    }
}

/// Name, type and key flag of an exported column.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSpec {
    pub(crate) name: Name,
    pub(crate) data_type: DataType,
    pub(crate) primary_key: bool,
}

/// Specs of the columns a table, alias or statement exports.
pub(crate) fn column_specs(element: &ClauseElement) -> Vec<ColumnSpec> {
    match element.kind() {
        ElementKind::Table(table) => table
            .columns
            .iter()
            .map(|def| ColumnSpec {
                name: Name::Given(def.name.clone()),
                data_type: def.data_type.clone(),
                primary_key: def.primary_key,
            })
            .collect(),
        ElementKind::Alias(alias) => column_specs(&alias.element),
        ElementKind::Select(_) | ElementKind::CompoundSelect(_) => statement_columns(element)
            .into_iter()
            .map(|sc| ColumnSpec {
                data_type: sc.element.data_type(),
                name: sc.name,
                primary_key: false,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn make_bound(parent: &ClauseElement, index: usize, spec: ColumnSpec) -> ClauseElement {
    ClauseElement::bound_column(
        parent,
        index,
        ColumnClause {
            name: spec.name,
            parent: Some(parent.clone()),
            index,
            data_type: spec.data_type,
            is_literal: false,
            primary_key: spec.primary_key,
        },
    )
}

/// The column at `index` of a table or alias.
pub(crate) fn bound_column_at(parent: &ClauseElement, index: usize) -> Option<ClauseElement> {
    if !matches!(parent.kind(), ElementKind::Table(_) | ElementKind::Alias(_)) {
        return None;
    }
    column_specs(parent)
        .into_iter()
        .nth(index)
        .map(|spec| make_bound(parent, index, spec))
}

/// Columns exported by a FROM clause or statement.
pub(crate) fn exported_columns(element: &ClauseElement) -> Vec<ClauseElement> {
    match element.kind() {
        ElementKind::Table(_) | ElementKind::Alias(_) => column_specs(element)
            .into_iter()
            .enumerate()
            .map(|(i, spec)| make_bound(element, i, spec))
            .collect(),
        ElementKind::Join(join) => {
            let mut columns = exported_columns(&join.left);
            columns.extend(exported_columns(&join.right));
            columns
        }
        ElementKind::Select(_) | ElementKind::CompoundSelect(_) => statement_columns(element)
            .into_iter()
            .map(|sc| sc.element)
            .collect(),
        _ => Vec::new(),
    }
}

/// Direct proxies of a column with their correspondence weights.
fn proxies(element: &ClauseElement) -> Vec<(ClauseElement, usize)> {
    match element.kind() {
        ElementKind::Column(ColumnClause {
            parent: Some(parent),
            index,
            ..
        }) => match parent.kind() {
            ElementKind::Alias(alias) => element_proxies(&alias.element, *index),
            _ => Vec::new(),
        },
        ElementKind::Label(label) => vec![(label.element.clone(), 1)],
        _ => Vec::new(),
    }
}

fn element_proxies(element: &ClauseElement, index: usize) -> Vec<(ClauseElement, usize)> {
    match element.kind() {
        ElementKind::Table(_) | ElementKind::Alias(_) => bound_column_at(element, index)
            .map(|c| (c, 1))
            .into_iter()
            .collect(),
        ElementKind::Select(_) => statement_columns(element)
            .into_iter()
            .nth(index)
            .map(|sc| (sc.element, 1))
            .into_iter()
            .collect(),
        ElementKind::CompoundSelect(compound) => compound
            .selects
            .iter()
            .enumerate()
            .filter_map(|(position, member)| {
                statement_columns(member)
                    .into_iter()
                    .nth(index)
                    .map(|sc| (sc.element, position + 1))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn collect_proxy_list(element: &ClauseElement, weight: usize, out: &mut Vec<(ClauseElement, usize)>) {
    out.push((element.clone(), weight));
    for (proxy, proxy_weight) in proxies(element) {
        collect_proxy_list(&proxy, proxy_weight, out);
    }
}

/// The column followed by everything it proxies, with weights.
fn proxy_list(element: &ClauseElement) -> Vec<(ClauseElement, usize)> {
    let mut out = Vec::new();
    collect_proxy_list(element, 1, &mut out);
    out
}

/// Elements whose key is in `keys`, expanded with clone lineage.
fn expand_cloned<'a>(elements: impl IntoIterator<Item = &'a ClauseElement>) -> HashSet<ElementId> {
    elements
        .into_iter()
        .flat_map(|e| e.cloned_set().collect::<Vec<_>>())
        .collect()
}

impl ClauseElement {
    /// This column and every column it proxies, deduplicated.
    #[must_use]
    pub fn proxy_set(&self) -> Vec<ClauseElement> {
        let mut seen = HashSet::new();
        proxy_list(self)
            .into_iter()
            .map(|(e, _)| e)
            .filter(|e| seen.insert(e.key()))
            .collect()
    }

    fn proxy_keys(&self) -> HashSet<ElementId> {
        proxy_list(self).iter().map(|(e, _)| e.key()).collect()
    }

    /// Returns true if the proxy sets of `self` and `other` intersect.
    #[must_use]
    pub fn shares_lineage(&self, other: &ClauseElement) -> bool {
        let mine = self.proxy_keys();
        other.proxy_keys().iter().any(|k| mine.contains(k))
    }

    fn weighted_distance(&self, column: &ClauseElement) -> usize {
        proxy_list(self)
            .iter()
            .filter(|(proxy, _)| proxy.shares_lineage(column))
            .map(|(_, weight)| weight)
            .sum()
    }

    /// Finds the exported column of `self` that corresponds to `column`.
    ///
    /// A candidate corresponds when its proxy set, expanded with clone
    /// lineage, intersects the proxy set of `column`. With
    /// `require_embedded`, every proxy of `column` must be reachable from
    /// the candidate. The candidate sharing the most proxies wins; ties go
    /// to the smallest weighted proxy distance.
    #[must_use]
    pub fn corresponding_column(
        &self,
        column: &ClauseElement,
        require_embedded: bool,
    ) -> Option<ClauseElement> {
        let columns = exported_columns(self);
        if let Some(found) = columns.iter().find(|c| c.same_key(column)) {
            return Some(found.clone());
        }

        let target = column.proxy_set();
        let target_keys: HashSet<ElementId> = target.iter().map(ClauseElement::key).collect();
        let mut best: Option<(ClauseElement, HashSet<ElementId>)> = None;

        for candidate in columns {
            let expanded = expand_cloned(&candidate.proxy_set());
            let common: HashSet<ElementId> = target_keys.intersection(&expanded).copied().collect();
            if common.is_empty() {
                continue;
            }
            if require_embedded
                && !target.iter().all(|t| {
                    expanded.contains(&t.key()) || t.lineage().iter().any(|id| expanded.contains(id))
                })
            {
                continue;
            }
            best = match best {
                None => Some((candidate, common)),
                Some((current, current_common)) => {
                    let better = common.len() > current_common.len()
                        || (common == current_common
                            && candidate.weighted_distance(column)
                                < current.weighted_distance(column));
                    if better {
                        Some((candidate, common))
                    } else {
                        Some((current, current_common))
                    }
                }
            };
        }
        best.map(|(c, _)| c)
    }

    /// Returns true if `self` is `from`, a clone of it, or built on it.
    #[must_use]
    pub fn is_derived_from(&self, from: &ClauseElement) -> bool {
        if self.is_clone_of(from) {
            return true;
        }
        match self.kind() {
            ElementKind::Alias(alias) => alias.element.is_derived_from(from),
            ElementKind::Join(join) => {
                join.left.is_derived_from(from) || join.right.is_derived_from(from)
            }
            ElementKind::Select(select) => select
                .raw_froms()
                .iter()
                .any(|f| f.is_derived_from(from)),
            ElementKind::CompoundSelect(compound) => {
                compound.selects.iter().any(|s| s.is_derived_from(from))
            }
            _ => false,
        }
    }

    /// The FROM entries an expression draws on.
    #[must_use]
    pub fn from_objects(&self) -> Vec<ClauseElement> {
        let mut out = Vec::new();
        collect_from_objects(self, &mut out);
        out
    }

    /// Columns exported by this table, alias, join or statement.
    #[must_use]
    pub fn columns(&self) -> Vec<ClauseElement> {
        exported_columns(self)
    }

    /// The exported column named `key`.
    ///
    /// Join columns are keyed `<table>_<column>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if there is no such column.
    pub fn c(&self, key: &str) -> Result<ClauseElement> {
        let is_join = matches!(self.kind(), ElementKind::Join(_));
        exported_columns(self)
            .into_iter()
            .find(|col| {
                if is_join {
                    join_column_key(col).as_deref() == Some(key)
                } else {
                    col.name().and_then(Name::as_given) == Some(key)
                }
            })
            .ok_or_else(|| {
                Error::invalid_request(format!(
                    "{} has no column '{key}'",
                    describe(self)
                ))
            })
    }

    /// The exported column at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the index is out of range.
    pub fn c_at(&self, index: usize) -> Result<ClauseElement> {
        exported_columns(self).into_iter().nth(index).ok_or_else(|| {
            Error::invalid_request(format!(
                "{} has no column at position {index}",
                describe(self)
            ))
        })
    }

    /// Primary key columns of a table or alias.
    #[must_use]
    pub fn primary_key(&self) -> Vec<ClauseElement> {
        exported_columns(self)
            .into_iter()
            .filter(|c| c.as_column().is_some_and(ColumnClause::is_primary_key))
            .collect()
    }

    /// An alias of this table, alias or statement; anonymous when `name`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for joins and non-selectable elements.
    pub fn alias<'a>(&self, name: impl Into<Option<&'a str>>) -> Result<ClauseElement> {
        let name = name.into();
        let (kind, base) = match self.kind() {
            ElementKind::Table(table) => (AliasKind::Alias, table.name.clone()),
            ElementKind::Alias(_) => (AliasKind::Alias, String::from("anon")),
            ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
                (AliasKind::Subquery, String::from("anon"))
            }
            ElementKind::Join(_) => {
                return Err(Error::argument(
                    "Join objects can't be aliased directly; select from the join and \
                     call subquery() instead",
                ))
            }
            _ => {
                return Err(Error::argument(format!(
                    "Can't alias element of kind '{}'",
                    self.visit_name()
                )))
            }
        };
        Ok(self.wrap_alias(name, &base, kind))
    }

    pub(crate) fn wrap_alias(&self, name: Option<&str>, base: &str, kind: AliasKind) -> ClauseElement {
        ClauseElement::new(ElementKind::Alias(Alias {
            element: self.clone(),
            name: name.map_or_else(|| Name::anonymous(base), Name::given),
            kind,
        }))
    }

    /// A named or anonymous subquery of a statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] unless `self` is a SELECT statement.
    pub fn subquery<'a>(&self, name: impl Into<Option<&'a str>>) -> Result<ClauseElement> {
        self.expect_statement("subquery")?;
        Ok(self.wrap_alias(name.into(), "anon", AliasKind::Subquery))
    }

    /// A common table expression of a statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] unless `self` is a SELECT statement.
    pub fn cte<'a>(&self, name: impl Into<Option<&'a str>>) -> Result<ClauseElement> {
        self.expect_statement("cte")?;
        Ok(self.wrap_alias(name.into(), "anon", AliasKind::Cte(CteInfo::default())))
    }

    /// A recursive common table expression of a statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] unless `self` is a SELECT statement.
    pub fn cte_recursive<'a>(&self, name: impl Into<Option<&'a str>>) -> Result<ClauseElement> {
        self.expect_statement("cte")?;
        Ok(self.wrap_alias(
            name.into(),
            "anon",
            AliasKind::Cte(CteInfo {
                recursive: true,
                restates: Vec::new(),
            }),
        ))
    }

    /// The statement as a column expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] unless `self` is a SELECT statement.
    pub fn scalar_subquery(&self) -> Result<ClauseElement> {
        self.expect_statement("scalar_subquery")?;
        Ok(ClauseElement::new(ElementKind::ScalarSelect(
            crate::elements::ScalarSelect {
                element: self.clone(),
            },
        )))
    }

    fn expect_statement(&self, method: &str) -> Result<()> {
        if self.is_select_statement() {
            Ok(())
        } else {
            Err(Error::argument(format!(
                "{method}() requires a SELECT statement, got '{}'",
                self.visit_name()
            )))
        }
    }

    /// `self JOIN right ON onclause`, inferring the ON clause from foreign
    /// keys when `onclause` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if either side is not a FROM clause or
    /// the foreign keys give no or several join paths.
    pub fn join(&self, right: &ClauseElement, onclause: Option<ClauseElement>) -> Result<ClauseElement> {
        join(self, right, onclause, false, false)
    }

    /// `self LEFT OUTER JOIN right ON onclause`.
    ///
    /// # Errors
    ///
    /// See [`ClauseElement::join`].
    pub fn outerjoin(&self, right: &ClauseElement, onclause: Option<ClauseElement>) -> Result<ClauseElement> {
        join(self, right, onclause, true, false)
    }

    /// `self FULL OUTER JOIN right ON onclause`.
    ///
    /// # Errors
    ///
    /// See [`ClauseElement::join`].
    pub fn full_outerjoin(
        &self,
        right: &ClauseElement,
        onclause: Option<ClauseElement>,
    ) -> Result<ClauseElement> {
        join(self, right, onclause, true, true)
    }

    /// `SELECT <all columns> FROM self`.
    #[must_use]
    pub fn select(&self) -> Select {
        select([self.clone()])
    }
}

fn collect_from_objects(element: &ClauseElement, out: &mut Vec<ClauseElement>) {
    match element.kind() {
        ElementKind::Column(c) => out.extend(c.parent.iter().cloned()),
        ElementKind::Table(_) | ElementKind::Alias(_) | ElementKind::Join(_) => {
            out.push(element.clone());
        }
        ElementKind::Unary(u) => collect_from_objects(&u.element, out),
        ElementKind::Binary(b) => {
            collect_from_objects(&b.left, out);
            collect_from_objects(&b.right, out);
        }
        ElementKind::ClauseList(list) => {
            for clause in &list.clauses {
                collect_from_objects(clause, out);
            }
        }
        ElementKind::Tuple(tuple) => {
            for clause in &tuple.clauses {
                collect_from_objects(clause, out);
            }
        }
        ElementKind::Grouping(g) => collect_from_objects(&g.element, out),
        ElementKind::Label(l) => collect_from_objects(&l.element, out),
        ElementKind::Function(f) => {
            for arg in &f.args {
                collect_from_objects(arg, out);
            }
        }
        ElementKind::Case(case) => {
            if let Some(value) = &case.value {
                collect_from_objects(value, out);
            }
            for (when, then) in &case.whens {
                collect_from_objects(when, out);
                collect_from_objects(then, out);
            }
            if let Some(else_) = &case.else_ {
                collect_from_objects(else_, out);
            }
        }
        ElementKind::Cast(c) => collect_from_objects(&c.element, out),
        ElementKind::Custom(custom) => {
            for child in &custom.children {
                collect_from_objects(child, out);
            }
        }
        ElementKind::BindParam(_)
        | ElementKind::Text(_)
        | ElementKind::Null
        | ElementKind::True
        | ElementKind::False
        | ElementKind::LabelReference(_)
        | ElementKind::ScalarSelect(_)
        | ElementKind::Select(_)
        | ElementKind::CompoundSelect(_)
        | ElementKind::Insert(_)
        | ElementKind::Update(_)
        | ElementKind::Delete(_) => {}
    }
}

fn all_froms(element: &ClauseElement, out: &mut Vec<ClauseElement>) {
    out.push(element.clone());
    if let ElementKind::Join(join) = element.kind() {
        all_froms(&join.left, out);
        all_froms(&join.right, out);
    }
}

/// Keys of the FROM entries a FROM entry makes redundant (the tables a
/// join already contains), expanded with clone lineage.
pub(crate) fn hidden_from_keys(froms: &[ClauseElement]) -> HashSet<ElementId> {
    let mut hidden = Vec::new();
    for from in froms {
        if let ElementKind::Join(join) = from.kind() {
            all_froms(&join.left, &mut hidden);
            all_froms(&join.right, &mut hidden);
        }
    }
    expand_cloned(&hidden)
}

/// Human-readable description for error messages.
pub(crate) fn describe(element: &ClauseElement) -> String {
    match element.kind() {
        ElementKind::Table(t) => format!("table '{}'", t.name),
        ElementKind::Alias(a) => format!("{} '{}'", a.visit_name(), a.name.base()),
        ElementKind::Join(_) => String::from("Join object"),
        ElementKind::Column(c) => format!("column '{}'", c.name.base()),
        _ => format!("element '{}'", element.visit_name()),
    }
}

/// Name of the table underlying a column, through aliases.
fn underlying_table(column: &ClauseElement) -> Option<(&TableClause, usize)> {
    let col = column.as_column()?;
    let mut parent = col.parent.as_ref()?;
    loop {
        match parent.kind() {
            ElementKind::Table(table) => return Some((table, col.index)),
            ElementKind::Alias(alias) => parent = &alias.element,
            _ => return None,
        }
    }
}

fn join_column_key(column: &ClauseElement) -> Option<String> {
    let col = column.as_column()?;
    let parent = col.parent.as_ref()?;
    let prefix = match parent.kind() {
        ElementKind::Table(t) => t.name.clone(),
        ElementKind::Alias(a) => String::from(a.name.base()),
        _ => return None,
    };
    Some(format!("{prefix}_{}", col.name.base()))
}

fn foreign_key(column: &ClauseElement) -> Option<&ForeignKeyRef> {
    let (table, index) = underlying_table(column)?;
    table.columns.get(index)?.references.as_ref()
}

impl ClauseElement {
    /// Returns true if this column carries a foreign key to `other`.
    #[must_use]
    pub fn references(&self, other: &ClauseElement) -> bool {
        let Some(fk) = foreign_key(self) else {
            return false;
        };
        underlying_table(other).is_some_and(|(table, _)| table.name == fk.table)
            && other.name().map(Name::base) == Some(fk.column.as_str())
    }
}

/// `(referenced, referencing)` column pairs where a column of `referencing`
/// carries a foreign key to a column of `referenced`.
fn foreign_key_pairs(
    referenced: &ClauseElement,
    referencing: &ClauseElement,
) -> Vec<(ClauseElement, ClauseElement)> {
    let targets = exported_columns(referenced);
    let mut pairs = Vec::new();
    for col in exported_columns(referencing) {
        let Some(fk) = foreign_key(&col) else {
            continue;
        };
        for target in &targets {
            let matches = underlying_table(target).is_some_and(|(table, _)| table.name == fk.table)
                && target.name().map(Name::base) == Some(fk.column.as_str());
            if matches {
                pairs.push((target.clone(), col.clone()));
            }
        }
    }
    pairs
}

/// Infers the ON clause of a join between `left` and `right`.
pub(crate) fn join_condition(left: &ClauseElement, right: &ClauseElement) -> Result<ClauseElement> {
    let mut pairs = foreign_key_pairs(left, right);
    pairs.extend(foreign_key_pairs(right, left));
    match pairs.len() {
        0 => Err(Error::argument(format!(
            "Can't find any foreign key relationships between {} and {}",
            describe(left),
            describe(right)
        ))),
        1 => {
            let (referenced, referencing) = &pairs[0];
            Ok(referenced.eq(referencing))
        }
        _ => Err(Error::argument(format!(
            "Can't determine join between {} and {}; tables have more than one foreign key \
             relationship between them. Please specify the onclause of this join explicitly",
            describe(left),
            describe(right)
        ))),
    }
}

/// Builds a join, coercing both sides into FROM clauses.
pub fn join(
    left: &ClauseElement,
    right: &ClauseElement,
    onclause: Option<ClauseElement>,
    is_outer: bool,
    full: bool,
) -> Result<ClauseElement> {
    let left = coercion::expect_from_clause(left.clone())?;
    let right = coercion::expect_from_clause(right.clone())?;
    let onclause = match onclause {
        Some(on) => coercion::expect_where_clause(on)?,
        None => join_condition(&left, &right)?,
    };
    Ok(ClauseElement::new(ElementKind::Join(Join {
        left,
        right,
        onclause,
        is_outer,
        full,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::column;

    fn table1() -> ClauseElement {
        table("table1", ["col1", "col2", "col3"])
    }

    #[test]
    fn test_bound_columns_are_stable() {
        let t1 = table1();
        let a = t1.c("col1").unwrap();
        let b = t1.c("col1").unwrap();
        assert!(a.is(&b));
        assert!(!a.is(&t1.c("col2").unwrap()));
        assert!(t1.c("nope").is_err());
    }

    #[test]
    fn test_alias_column_corresponds() {
        let t1 = table1();
        let alias = t1.alias("t1alias").unwrap();
        let col = alias.corresponding_column(&t1.c("col2").unwrap(), false).unwrap();
        assert!(col.is(&alias.c("col2").unwrap()));
        assert!(alias.corresponding_column(&column("col2"), false).is_none());
    }

    #[test]
    fn test_subquery_column_corresponds() {
        let t1 = table1();
        let sq = t1.select().subquery(None);
        let col = sq.corresponding_column(&t1.c("col3").unwrap(), true).unwrap();
        assert!(col.is(&sq.c("col3").unwrap()));
        assert!(sq.is_derived_from(&t1));
        assert!(!t1.is_derived_from(&sq));
    }

    #[test]
    fn test_label_corresponds_through_subquery() {
        let t1 = table1();
        let sq = select([t1.c("col1").unwrap().label("foo")]).subquery(None);
        let col = sq.corresponding_column(&t1.c("col1").unwrap(), false).unwrap();
        assert!(col.is(&sq.c("foo").unwrap()));
    }

    #[test]
    fn test_join_requires_foreign_key() {
        let a = table("a", [ColumnDef::new("id", DataType::Integer).primary_key()]);
        let b = table(
            "b",
            [
                ColumnDef::new("id", DataType::Integer).primary_key(),
                ColumnDef::new("a_id", DataType::Integer).references("a.id"),
            ],
        );
        assert!(a.join(&b, None).is_ok());
        let err = a.join(&table1(), None).unwrap_err();
        assert!(matches!(err, Error::Argument { .. }));
        assert!(err.to_string().contains("table1"));
    }

    #[test]
    fn test_join_cannot_be_aliased() {
        let t1 = table1();
        let t2 = table("table2", ["col1"]);
        let j = t1
            .join(&t2, Some(t1.c("col1").unwrap().eq(t2.c("col1").unwrap())))
            .unwrap();
        assert!(matches!(j.alias(None), Err(Error::Argument { .. })));
        assert_eq!(j.columns().len(), 4);
        assert!(j.c("table2_col1").is_ok());
    }

    #[test]
    fn test_primary_key_columns() {
        let t = table(
            "t",
            [
                ColumnDef::new("id", DataType::Integer).primary_key(),
                ColumnDef::new("name", DataType::Text),
            ],
        );
        let pk = t.primary_key();
        assert_eq!(pk.len(), 1);
        assert!(pk[0].is(&t.c("id").unwrap()));
    }
}
