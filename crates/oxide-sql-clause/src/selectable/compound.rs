//! UNION / INTERSECT / EXCEPT.

use super::{Alias, AliasKind, CteInfo};
use crate::elements::{ClauseElement, ElementKind, ScalarSelect};
use crate::error::{Error, Result};

/// The set operator of a [`CompoundSelect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKeyword {
    /// `UNION`
    Union,
    /// `UNION ALL`
    UnionAll,
    /// `INTERSECT`
    Intersect,
    /// `INTERSECT ALL`
    IntersectAll,
    /// `EXCEPT`
    Except,
    /// `EXCEPT ALL`
    ExceptAll,
}

impl CompoundKeyword {
    /// The SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::IntersectAll => "INTERSECT ALL",
            Self::Except => "EXCEPT",
            Self::ExceptAll => "EXCEPT ALL",
        }
    }
}

/// SELECT statements combined by a set operator.
#[derive(Debug, Clone)]
pub struct CompoundSelect {
    pub(crate) keyword: CompoundKeyword,
    pub(crate) selects: Vec<ClauseElement>,
    pub(crate) order_by: Vec<ClauseElement>,
    pub(crate) limit: Option<ClauseElement>,
    pub(crate) offset: Option<ClauseElement>,
}

fn compound<S: Into<ClauseElement>>(
    keyword: CompoundKeyword,
    selects: impl IntoIterator<Item = S>,
) -> CompoundSelect {
    CompoundSelect {
        keyword,
        selects: selects.into_iter().map(Into::into).collect(),
        order_by: Vec::new(),
        limit: None,
        offset: None,
    }
}

/// `s1 UNION s2 ...`
#[must_use]
pub fn union<S: Into<ClauseElement>>(selects: impl IntoIterator<Item = S>) -> CompoundSelect {
    compound(CompoundKeyword::Union, selects)
}

/// `s1 UNION ALL s2 ...`
#[must_use]
pub fn union_all<S: Into<ClauseElement>>(selects: impl IntoIterator<Item = S>) -> CompoundSelect {
    compound(CompoundKeyword::UnionAll, selects)
}

/// `s1 INTERSECT s2 ...`
#[must_use]
pub fn intersect<S: Into<ClauseElement>>(selects: impl IntoIterator<Item = S>) -> CompoundSelect {
    compound(CompoundKeyword::Intersect, selects)
}

/// `s1 INTERSECT ALL s2 ...`
#[must_use]
pub fn intersect_all<S: Into<ClauseElement>>(
    selects: impl IntoIterator<Item = S>,
) -> CompoundSelect {
    compound(CompoundKeyword::IntersectAll, selects)
}

/// `s1 EXCEPT s2 ...`
#[must_use]
pub fn except_<S: Into<ClauseElement>>(selects: impl IntoIterator<Item = S>) -> CompoundSelect {
    compound(CompoundKeyword::Except, selects)
}

/// `s1 EXCEPT ALL s2 ...`
#[must_use]
pub fn except_all<S: Into<ClauseElement>>(selects: impl IntoIterator<Item = S>) -> CompoundSelect {
    compound(CompoundKeyword::ExceptAll, selects)
}

impl CompoundSelect {
    /// The set operator.
    #[must_use]
    pub const fn keyword(&self) -> CompoundKeyword {
        self.keyword
    }

    /// The combined statements.
    #[must_use]
    pub fn selects(&self) -> &[ClauseElement] {
        &self.selects
    }

    /// Appends ORDER BY entries applying to the whole compound.
    #[must_use]
    pub fn order_by(mut self, columns: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.order_by.extend(columns);
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(super::select::offset_or_limit(limit));
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(super::select::offset_or_limit(offset));
        self
    }

    /// An anonymous or named subquery of the compound.
    #[must_use]
    pub fn subquery<'a>(self, name: impl Into<Option<&'a str>>) -> ClauseElement {
        ClauseElement::from(self).wrap_alias(name.into(), "anon", AliasKind::Subquery)
    }

    /// A common table expression of the compound.
    #[must_use]
    pub fn cte<'a>(self, name: impl Into<Option<&'a str>>) -> ClauseElement {
        ClauseElement::from(self).wrap_alias(name.into(), "anon", AliasKind::Cte(CteInfo::default()))
    }

    /// The compound as a column expression.
    #[must_use]
    pub fn scalar_subquery(self) -> ClauseElement {
        ClauseElement::new(ElementKind::ScalarSelect(ScalarSelect {
            element: self.into(),
        }))
    }
}

impl From<CompoundSelect> for ClauseElement {
    fn from(compound: CompoundSelect) -> Self {
        Self::new(ElementKind::CompoundSelect(compound))
    }
}

macro_rules! set_operations {
    ($($(#[$doc:meta])* $method:ident => $keyword:ident;)*) => {
        impl super::Select {
            $(
                $(#[$doc])*
                #[must_use]
                pub fn $method(self, other: impl Into<ClauseElement>) -> CompoundSelect {
                    compound(CompoundKeyword::$keyword, [ClauseElement::from(self), other.into()])
                }
            )*
        }
    };
}

set_operations! {
    /// `self UNION other`
    union => Union;
    /// `self UNION ALL other`
    union_all => UnionAll;
    /// `self INTERSECT other`
    intersect => Intersect;
    /// `self INTERSECT ALL other`
    intersect_all => IntersectAll;
    /// `self EXCEPT other`
    except_ => Except;
    /// `self EXCEPT ALL other`
    except_all => ExceptAll;
}

impl ClauseElement {
    fn continue_cte(&self, keyword: CompoundKeyword, other: ClauseElement) -> Result<ClauseElement> {
        let Some(alias) = self.as_alias() else {
            return Err(Error::argument(format!(
                "{}() on an element requires a CTE, got '{}'",
                keyword.as_str().to_lowercase().replace(' ', "_"),
                self.visit_name()
            )));
        };
        let AliasKind::Cte(info) = &alias.kind else {
            return Err(Error::argument(format!(
                "set operations continue CTEs only, got '{}'",
                self.visit_name()
            )));
        };
        let body = compound(keyword, [alias.element.clone(), other]);
        Ok(ClauseElement::new(ElementKind::Alias(Alias {
            element: body.into(),
            name: alias.name.clone(),
            kind: AliasKind::Cte(CteInfo {
                recursive: info.recursive,
                restates: self.cloned_set().collect(),
            }),
        })))
    }

    /// Continues a CTE with `UNION other`, keeping its name.
    ///
    /// References to the original CTE inside `other` render as references
    /// to the continued one, which is how recursive CTEs refer to
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] unless `self` is a CTE.
    pub fn union(&self, other: impl Into<ClauseElement>) -> Result<ClauseElement> {
        self.continue_cte(CompoundKeyword::Union, other.into())
    }

    /// Continues a CTE with `UNION ALL other`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] unless `self` is a CTE.
    pub fn union_all(&self, other: impl Into<ClauseElement>) -> Result<ClauseElement> {
        self.continue_cte(CompoundKeyword::UnionAll, other.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectable::{select, table};

    #[test]
    fn test_compound_exports_first_select_columns() {
        let t1 = table("t1", ["a", "b"]);
        let t2 = table("t2", ["c", "d"]);
        let u: ClauseElement = select([t1.clone()]).union(select([t2])).into();
        let names: Vec<String> = u
            .columns()
            .iter()
            .map(|c| String::from(c.name().map_or("", |n| n.base())))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_compound_subquery_corresponds_to_each_member() {
        let t1 = table("t1", ["a"]);
        let t2 = table("t2", ["a"]);
        let sq = union([select([t1.clone()]), select([t2.clone()])]).subquery("u");
        let a = sq.c("a").unwrap();
        assert!(sq
            .corresponding_column(&t1.c("a").unwrap(), false)
            .unwrap()
            .is(&a));
        assert!(sq
            .corresponding_column(&t2.c("a").unwrap(), false)
            .unwrap()
            .is(&a));
    }

    #[test]
    fn test_cte_union_keeps_name() {
        let t = table("parts", ["part", "sub_part"]);
        let cte = select([t.c("sub_part").unwrap()]).cte_recursive("included");
        let continued = cte
            .union_all(select([t.c("part").unwrap()]))
            .unwrap();
        let alias = continued.as_alias().unwrap();
        assert_eq!(alias.name().as_given(), Some("included"));
        assert!(alias.cte().unwrap().is_recursive());
        assert!(t.union(select([t.c("part").unwrap()])).is_err());
    }
}
