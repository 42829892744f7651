//! The SELECT statement builder.

use std::collections::HashSet;

use super::{exported_columns, hidden_from_keys, join, join_condition, AliasKind, CteInfo};
use crate::coercion::{self, Role};
use crate::elements::{
    and_, anon_base, bind_value, exists, AnonName, ClauseElement, ElementId, ElementKind, Name,
    ScalarSelect,
};
use crate::error::{Error, Result};
use crate::types::DataType;
use crate::value::SqlValue;
use crate::warnings::{self, Warning};

/// How select-list entries are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// Columns keep their names; repeated names get a `_<n>` suffix.
    #[default]
    Disambiguate,
    /// Columns are labeled `<table>_<column>`.
    TablenamePlusCol,
    /// No labels are applied; repeated names raise a warning.
    None,
}

/// A SELECT statement.
///
/// Built by [`select`] and refined with consuming builder methods; convert
/// it into a [`ClauseElement`] with `.into()` to compile or nest it.
#[derive(Debug, Clone)]
pub struct Select {
    pub(crate) raw_columns: Vec<ClauseElement>,
    pub(crate) from_obj: Vec<ClauseElement>,
    pub(crate) where_clause: Option<ClauseElement>,
    pub(crate) having: Option<ClauseElement>,
    pub(crate) group_by: Vec<ClauseElement>,
    pub(crate) order_by: Vec<ClauseElement>,
    pub(crate) limit: Option<ClauseElement>,
    pub(crate) offset: Option<ClauseElement>,
    pub(crate) distinct: bool,
    pub(crate) correlate: Vec<ClauseElement>,
    pub(crate) correlate_except: Option<Vec<ClauseElement>>,
    pub(crate) auto_correlate: bool,
    pub(crate) label_style: LabelStyle,
}

impl Default for Select {
    fn default() -> Self {
        Self {
            raw_columns: Vec::new(),
            from_obj: Vec::new(),
            where_clause: None,
            having: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            correlate: Vec::new(),
            correlate_except: None,
            auto_correlate: true,
            label_style: LabelStyle::default(),
        }
    }
}

/// A selected column together with the name it is exported under.
#[derive(Debug, Clone)]
pub(crate) struct SelectedColumn {
    pub(crate) element: ClauseElement,
    pub(crate) name: Name,
    /// Whether the compiler renders `AS name`.
    pub(crate) labeled: bool,
}

/// `SELECT columns`.
///
/// Tables, aliases and joins in `columns` expand into their columns.
#[must_use]
pub fn select<C: Into<ClauseElement>>(columns: impl IntoIterator<Item = C>) -> Select {
    Select::default().add_columns(columns)
}

pub(super) fn offset_or_limit(value: u64) -> ClauseElement {
    bind_value(
        Name::anonymous("param"),
        DataType::Integer,
        SqlValue::Int(i64::try_from(value).unwrap_or(i64::MAX)),
    )
}

fn key_sets(elements: &[ClauseElement]) -> HashSet<ElementId> {
    elements
        .iter()
        .flat_map(|e| e.cloned_set().collect::<Vec<_>>())
        .collect()
}

/// Members of `froms` sharing clone lineage with `others`.
fn cloned_intersection(froms: &[ClauseElement], others: &[ClauseElement]) -> Vec<ClauseElement> {
    let keys = key_sets(others);
    froms
        .iter()
        .filter(|f| f.cloned_set().any(|id| keys.contains(&id)))
        .cloned()
        .collect()
}

fn contains_clone(set: &[ClauseElement], element: &ClauseElement) -> bool {
    set.iter().any(|e| e.is(element))
}

impl Select {
    /// Appends entries to the columns clause.
    #[must_use]
    pub fn add_columns<C: Into<ClauseElement>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.raw_columns.extend(
            columns
                .into_iter()
                .map(|c| coercion::columns_clause_entry(c.into())),
        );
        self
    }

    /// Replaces the columns clause.
    #[must_use]
    pub fn with_only_columns<C: Into<ClauseElement>>(
        mut self,
        columns: impl IntoIterator<Item = C>,
    ) -> Self {
        self.raw_columns.clear();
        self.add_columns(columns)
    }

    /// Adds explicit FROM entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if an entry is not a FROM clause.
    pub fn select_from<F: Into<ClauseElement>>(mut self, froms: impl IntoIterator<Item = F>) -> Result<Self> {
        for from in froms {
            let from = coercion::expect_from_clause(from.into())?;
            if !self.from_obj.iter().any(|f| f.same_key(&from)) {
                self.from_obj.push(from);
            }
        }
        Ok(self)
    }

    /// Adds WHERE criteria, joined to existing criteria with AND.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the criterion is not a SQL expression.
    pub fn where_(mut self, criterion: ClauseElement) -> Result<Self> {
        let criterion = coercion::expect_expression(criterion, Role::Where)?;
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => and_([existing, criterion]),
            None => criterion,
        });
        Ok(self)
    }

    /// Adds HAVING criteria, joined to existing criteria with AND.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the criterion is not a SQL expression.
    pub fn having(mut self, criterion: ClauseElement) -> Result<Self> {
        let criterion = coercion::expect_expression(criterion, Role::Having)?;
        self.having = Some(match self.having.take() {
            Some(existing) => and_([existing, criterion]),
            None => criterion,
        });
        Ok(self)
    }

    /// Appends GROUP BY entries.
    #[must_use]
    pub fn group_by(mut self, columns: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.group_by.extend(columns);
        self
    }

    /// Appends ORDER BY entries.
    #[must_use]
    pub fn order_by(mut self, columns: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.order_by.extend(columns);
        self
    }

    /// Sets LIMIT, rendered as a bound parameter.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(offset_or_limit(limit));
        self
    }

    /// Sets OFFSET, rendered as a bound parameter.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset_or_limit(offset));
        self
    }

    /// Renders `SELECT DISTINCT`.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Sets the label style of the columns clause.
    #[must_use]
    pub fn set_label_style(mut self, style: LabelStyle) -> Self {
        self.label_style = style;
        self
    }

    /// Correlates the given FROM entries to an enclosing SELECT.
    ///
    /// Disables auto-correlation; with no entries the SELECT correlates
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `correlate_except` was set.
    pub fn correlate(mut self, froms: impl IntoIterator<Item = ClauseElement>) -> Result<Self> {
        if self.correlate_except.is_some() {
            return Err(Error::invalid_request(
                "correlate() and correlate_except() are mutually exclusive on one SELECT",
            ));
        }
        self.auto_correlate = false;
        self.correlate.extend(froms);
        Ok(self)
    }

    /// Correlates every enclosing FROM entry except the given ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `correlate` was set.
    pub fn correlate_except(mut self, froms: impl IntoIterator<Item = ClauseElement>) -> Result<Self> {
        if !self.correlate.is_empty() {
            return Err(Error::invalid_request(
                "correlate() and correlate_except() are mutually exclusive on one SELECT",
            ));
        }
        self.auto_correlate = false;
        self.correlate_except
            .get_or_insert_with(Vec::new)
            .extend(froms);
        Ok(self)
    }

    /// Joins `right` to the leftmost FROM entry it can join with.
    ///
    /// With an ON clause the left side is the first FROM entry the ON
    /// clause refers to; without one it is the first entry with a foreign
    /// key relationship to `right`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the SELECT has no FROM entries,
    /// or the errors of [`ClauseElement::join`].
    pub fn join(self, right: &ClauseElement, onclause: Option<ClauseElement>) -> Result<Self> {
        self.join_from_left(right, onclause, false)
    }

    /// [`Select::join`] with LEFT OUTER JOIN.
    ///
    /// # Errors
    ///
    /// See [`Select::join`].
    pub fn outerjoin(self, right: &ClauseElement, onclause: Option<ClauseElement>) -> Result<Self> {
        self.join_from_left(right, onclause, true)
    }

    fn join_from_left(
        mut self,
        right: &ClauseElement,
        onclause: Option<ClauseElement>,
        is_outer: bool,
    ) -> Result<Self> {
        let froms = self.froms();
        let left = match &onclause {
            Some(on) => {
                let referenced: Vec<ClauseElement> = on
                    .from_objects()
                    .into_iter()
                    .filter(|r| !right.is_derived_from(r))
                    .collect();
                froms
                    .iter()
                    .find(|f| referenced.iter().any(|r| f.is_derived_from(r)))
                    .or_else(|| froms.first())
            }
            None => froms
                .iter()
                .find(|f| join_condition(f, right).is_ok())
                .or_else(|| froms.first()),
        }
        .cloned()
        .ok_or_else(|| Error::invalid_request("No FROM entry to join from; add a FROM first"))?;

        let joined = join(&left, right, onclause, is_outer, false)?;
        match self.from_obj.iter().position(|f| f.is(&left)) {
            Some(pos) => self.from_obj[pos] = joined,
            None => self.from_obj.insert(0, joined),
        }
        Ok(self)
    }

    /// An anonymous or named subquery of this SELECT.
    #[must_use]
    pub fn subquery<'a>(self, name: impl Into<Option<&'a str>>) -> ClauseElement {
        ClauseElement::from(self).wrap_alias(name.into(), "anon", AliasKind::Subquery)
    }

    /// Synonym of [`Select::subquery`].
    #[must_use]
    pub fn alias<'a>(self, name: impl Into<Option<&'a str>>) -> ClauseElement {
        self.subquery(name)
    }

    /// A common table expression of this SELECT.
    #[must_use]
    pub fn cte<'a>(self, name: impl Into<Option<&'a str>>) -> ClauseElement {
        ClauseElement::from(self).wrap_alias(name.into(), "anon", AliasKind::Cte(CteInfo::default()))
    }

    /// A recursive common table expression of this SELECT.
    #[must_use]
    pub fn cte_recursive<'a>(self, name: impl Into<Option<&'a str>>) -> ClauseElement {
        ClauseElement::from(self).wrap_alias(
            name.into(),
            "anon",
            AliasKind::Cte(CteInfo {
                recursive: true,
                restates: Vec::new(),
            }),
        )
    }

    /// This SELECT as a column expression.
    #[must_use]
    pub fn scalar_subquery(self) -> ClauseElement {
        ClauseElement::new(ElementKind::ScalarSelect(ScalarSelect {
            element: self.into(),
        }))
    }

    /// `(SELECT ...) AS name`.
    #[must_use]
    pub fn label(self, name: impl Into<String>) -> ClauseElement {
        self.scalar_subquery().label(name)
    }

    /// `EXISTS (SELECT ...)`.
    #[must_use]
    pub fn exists(self) -> ClauseElement {
        exists(self)
    }

    /// The WHERE criteria.
    #[must_use]
    pub const fn where_clause(&self) -> Option<&ClauseElement> {
        self.where_clause.as_ref()
    }

    /// The columns clause as written, before FROM entries are expanded.
    #[must_use]
    pub fn raw_columns(&self) -> &[ClauseElement] {
        &self.raw_columns
    }

    /// The selected column expressions, FROM entries expanded.
    #[must_use]
    pub fn selected_columns(&self) -> Vec<ClauseElement> {
        self.expanded_columns()
    }

    pub(crate) fn expanded_columns(&self) -> Vec<ClauseElement> {
        self.raw_columns
            .iter()
            .flat_map(|c| {
                if c.is_from_clause() {
                    exported_columns(c)
                } else {
                    vec![c.clone()]
                }
            })
            .collect()
    }

    /// FROM entries in order (explicit, then from columns, then from
    /// WHERE), deduplicated by hash identity, before join hiding.
    pub(crate) fn raw_froms(&self) -> Vec<ClauseElement> {
        let mut seen = HashSet::new();
        let from_columns = self.raw_columns.iter().flat_map(|c| {
            if c.is_from_clause() {
                vec![c.clone()]
            } else {
                c.from_objects()
            }
        });
        self.from_obj
            .iter()
            .cloned()
            .chain(from_columns)
            .chain(self.where_clause.iter().flat_map(ClauseElement::from_objects))
            .filter(|f| seen.insert(f.key()))
            .collect()
    }

    /// FROM entries with entries contained in a join removed.
    #[must_use]
    pub fn froms(&self) -> Vec<ClauseElement> {
        let raw = self.raw_froms();
        let hidden = hidden_from_keys(&raw);
        raw.into_iter()
            .filter(|f| !hidden.contains(&f.key()))
            .collect()
    }

    /// FROM entries to render when nested in a SELECT whose FROM entries
    /// are `enclosing`.
    ///
    /// `explicit` are the entries of enclosing SELECTs available to
    /// explicit `correlate()` / `correlate_except()`; `implicit` are those
    /// of the immediately enclosing SELECT, used by auto-correlation.
    pub(crate) fn display_froms(
        &self,
        explicit: &[ClauseElement],
        implicit: &[ClauseElement],
    ) -> Result<Vec<ClauseElement>> {
        let mut froms = self.froms();

        if !self.correlate.is_empty() {
            let removable = cloned_intersection(&cloned_intersection(&froms, explicit), &self.correlate);
            froms.retain(|f| !contains_clone(&removable, f));
        }

        if let Some(except) = &self.correlate_except {
            let candidates = cloned_intersection(&froms, explicit);
            let keep = cloned_intersection(&candidates, except);
            froms.retain(|f| !contains_clone(&candidates, f) || contains_clone(&keep, f));
        }

        if self.auto_correlate && !implicit.is_empty() && froms.len() > 1 {
            let removable = cloned_intersection(&froms, implicit);
            froms.retain(|f| !contains_clone(&removable, f));
            if froms.is_empty() {
                return Err(Error::invalid_request(
                    "Select statement returned no FROM clauses due to auto-correlation; \
                     specify correlate(<tables>) to control correlation manually",
                ));
            }
        }

        Ok(froms)
    }

    /// The selected columns with the names they export, without warnings.
    pub(crate) fn named_columns(&self) -> Vec<SelectedColumn> {
        self.name_columns(false)
    }

    /// Like [`Select::named_columns`], reporting repeated names.
    pub(crate) fn named_columns_for_compile(&self) -> Vec<SelectedColumn> {
        self.name_columns(true)
    }

    fn name_columns(&self, report: bool) -> Vec<SelectedColumn> {
        let mut used: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for element in self.expanded_columns() {
            let (name, labeled, dedupe) = self.natural_name(&element);
            let (name, labeled) = match name {
                Name::Given(given) if dedupe && used.contains(&given) => {
                    if self.label_style == LabelStyle::None {
                        if report {
                            warnings::emit(Warning::DuplicateColumnName { name: given.clone() });
                        }
                        (Name::Given(given), labeled)
                    } else {
                        let mut n = 1;
                        let mut candidate = format!("{given}_{n}");
                        while used.contains(&candidate) {
                            n += 1;
                            candidate = format!("{given}_{n}");
                        }
                        (Name::Given(candidate), true)
                    }
                }
                other => (other, labeled),
            };
            if let Name::Given(given) = &name {
                used.insert(given.clone());
            }
            out.push(SelectedColumn {
                element,
                name,
                labeled,
            });
        }
        out
    }

    /// `(name, labeled, dedupe)` of a select-list entry before
    /// disambiguation.
    fn natural_name(&self, element: &ClauseElement) -> (Name, bool, bool) {
        match element.kind() {
            ElementKind::Label(label) => (label.name.clone(), true, false),
            ElementKind::Column(col) if col.is_literal => (col.name.clone(), false, false),
            ElementKind::Column(col) => {
                let prefix = col.parent.as_ref().and_then(|p| match p.kind() {
                    ElementKind::Table(t) => Some(t.name.clone()),
                    ElementKind::Alias(a) => a.name.as_given().map(String::from),
                    _ => None,
                });
                match (self.label_style, prefix) {
                    (LabelStyle::TablenamePlusCol, Some(prefix)) => (
                        Name::Given(format!("{prefix}_{}", col.name.base())),
                        true,
                        true,
                    ),
                    _ => (col.name.clone(), false, true),
                }
            }
            ElementKind::Text(t) => (Name::Given(String::from(t.text())), false, false),
            _ => (
                Name::Anonymous(AnonName {
                    token: element.key(),
                    base: anon_base(element),
                }),
                true,
                false,
            ),
        }
    }
}

impl From<Select> for ClauseElement {
    fn from(select: Select) -> Self {
        Self::new(ElementKind::Select(select))
    }
}

impl From<&ClauseElement> for ClauseElement {
    fn from(element: &ClauseElement) -> Self {
        element.clone()
    }
}

/// The exported columns of a SELECT or compound SELECT, with names.
pub(crate) fn statement_columns(element: &ClauseElement) -> Vec<SelectedColumn> {
    match element.kind() {
        ElementKind::Select(select) => select.named_columns(),
        ElementKind::CompoundSelect(compound) => compound
            .selects
            .first()
            .map(statement_columns)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{column, func};
    use crate::selectable::{describe, table};

    fn names(select: &Select) -> Vec<String> {
        select
            .named_columns()
            .iter()
            .map(|c| String::from(c.name.base()))
            .collect()
    }

    #[test]
    fn test_repeated_names_are_disambiguated() {
        let t1 = table("table1", ["col1", "col2"]);
        let t2 = table("table2", ["col1"]);
        let s = select([t1.clone(), t2.clone()]);
        assert_eq!(names(&s), vec!["col1", "col2", "col1_1"]);
    }

    #[test]
    fn test_tablename_plus_col_labels() {
        let t1 = table("table1", ["col1"]);
        let s = select([t1]).set_label_style(LabelStyle::TablenamePlusCol);
        assert_eq!(names(&s), vec!["table1_col1"]);
    }

    #[test]
    fn test_label_style_none_warns_on_compile_naming() {
        let t1 = table("table1", ["col1"]);
        let t2 = table("table2", ["col1"]);
        let s = select([t1, t2]).set_label_style(LabelStyle::None);
        let (cols, warnings) = warnings::capture(|| s.named_columns_for_compile());
        assert_eq!(cols.len(), 2);
        assert_eq!(
            warnings,
            vec![Warning::DuplicateColumnName {
                name: String::from("col1")
            }]
        );
    }

    #[test]
    fn test_expression_gets_anonymous_name() {
        let t = table("t", ["x"]);
        let s = select([func::count(t.c("x").unwrap()), t.c("x").unwrap().eq(5)]);
        let cols = s.named_columns();
        assert!(cols[0].name.is_anonymous());
        assert_eq!(cols[0].name.base(), "count");
        assert_eq!(cols[1].name.base(), "anon");
        let again = s.named_columns();
        assert_eq!(cols[0].name, again[0].name);
    }

    #[test]
    fn test_froms_order_and_hiding() {
        let t1 = table("t1", ["a"]);
        let t2 = table("t2", ["a"]);
        let t3 = table("t3", ["a"]);
        let s = select([t1.c("a").unwrap(), t2.c("a").unwrap()])
            .where_(t3.c("a").unwrap().eq(column("z")))
            .unwrap();
        let froms: Vec<String> = s.froms().iter().map(describe).collect();
        assert_eq!(froms, vec!["table 't1'", "table 't2'", "table 't3'"]);

        let j = t1
            .join(&t2, Some(t1.c("a").unwrap().eq(t2.c("a").unwrap())))
            .unwrap();
        let s = select([t1.c("a").unwrap()]).select_from([j]).unwrap();
        assert_eq!(s.froms().len(), 1);
    }

    #[test]
    fn test_correlate_and_correlate_except_conflict() {
        let t = table("t", ["a"]);
        let s = select([t.c("a").unwrap()]).correlate([t.clone()]).unwrap();
        assert!(matches!(
            s.correlate_except([t]),
            Err(Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_where_rejects_table() {
        let t = table("t", ["a"]);
        assert!(select([t.c("a").unwrap()]).where_(t.clone()).is_err());
    }

    #[test]
    fn test_join_from_left() {
        let t1 = table("table1", ["col1", "col2"]);
        let t2 = table("table2", ["col1", "col2"]);
        let t3 = table("table3", ["col1"]);
        let j = t1
            .join(&t2, Some(t1.c("col1").unwrap().eq(t2.c("col2").unwrap())))
            .unwrap();
        let s = select([j])
            .join(&t3, Some(t1.c("col1").unwrap().eq(t3.c("col1").unwrap())))
            .unwrap();
        let froms = s.froms();
        assert_eq!(froms.len(), 1);
        assert_eq!(froms[0].visit_name(), "join");
    }
}
