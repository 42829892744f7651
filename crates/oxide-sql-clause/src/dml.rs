//! INSERT, UPDATE and DELETE statements.
//!
//! Literal values become bind parameters named after their column
//! (`:name`), or `:<column>_m<row>` in multi-row VALUES.

use crate::coercion::{self, Role};
use crate::elements::{bind_value, ClauseElement, ElementKind, Name};
use crate::error::{Error, Result};
use crate::selectable::{Select, CompoundSelect};
use crate::value::{SqlValue, ToSqlValue};

/// A value supplied to INSERT or UPDATE.
#[derive(Debug, Clone)]
pub enum DmlValue {
    /// A literal, bound as a parameter named after its column.
    Value(SqlValue),
    /// A SQL expression rendered in place.
    Element(ClauseElement),
}

impl<T: ToSqlValue> From<T> for DmlValue {
    fn from(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }
}

impl From<ClauseElement> for DmlValue {
    fn from(element: ClauseElement) -> Self {
        Self::Element(element)
    }
}

impl From<Select> for DmlValue {
    fn from(select: Select) -> Self {
        Self::Element(select.scalar_subquery())
    }
}

/// What an INSERT inserts.
#[derive(Debug, Clone)]
pub enum InsertSource {
    /// `DEFAULT VALUES`.
    Default,
    /// `VALUES (...)[, (...)]`: `(column, value)` pairs per row.
    Values {
        /// Rows of `(column, value)` pairs in column order.
        rows: Vec<Vec<(ClauseElement, ClauseElement)>>,
        /// Whether the rows came from the multi-row form.
        multi: bool,
    },
    /// `(columns) SELECT ...`.
    Select {
        /// Target columns.
        columns: Vec<ClauseElement>,
        /// The source statement.
        select: ClauseElement,
    },
}

/// An INSERT statement.
#[derive(Debug, Clone)]
pub struct Insert {
    pub(crate) table: ClauseElement,
    pub(crate) source: InsertSource,
    pub(crate) returning: Vec<ClauseElement>,
    pub(crate) positional: bool,
}

/// An UPDATE statement.
#[derive(Debug, Clone)]
pub struct Update {
    pub(crate) table: ClauseElement,
    pub(crate) values: Vec<(ClauseElement, ClauseElement)>,
    pub(crate) where_clause: Option<ClauseElement>,
    pub(crate) returning: Vec<ClauseElement>,
}

/// A DELETE statement.
#[derive(Debug, Clone)]
pub struct Delete {
    pub(crate) table: ClauseElement,
    pub(crate) where_clause: Option<ClauseElement>,
    pub(crate) returning: Vec<ClauseElement>,
}

/// `INSERT INTO table`.
#[must_use]
pub fn insert(table: &ClauseElement) -> Insert {
    Insert {
        table: table.clone(),
        source: InsertSource::Default,
        returning: Vec::new(),
        positional: false,
    }
}

/// `UPDATE table`.
#[must_use]
pub fn update(table: &ClauseElement) -> Update {
    Update {
        table: table.clone(),
        values: Vec::new(),
        where_clause: None,
        returning: Vec::new(),
    }
}

/// `DELETE FROM table`.
#[must_use]
pub fn delete(table: &ClauseElement) -> Delete {
    Delete {
        table: table.clone(),
        where_clause: None,
        returning: Vec::new(),
    }
}

fn column_of(table: &ClauseElement, key: &str) -> Result<ClauseElement> {
    table
        .c(key)
        .map_err(|_| Error::argument(format!("Unconsumed column names: {key}")))
}

fn coerce_value(column: &ClauseElement, bind_name: String, value: DmlValue) -> Result<ClauseElement> {
    match value {
        DmlValue::Value(v) => Ok(bind_value(Name::given(bind_name), column.data_type(), v)),
        DmlValue::Element(e) => coercion::expect_expression(e, Role::DmlValue),
    }
}

fn column_name(column: &ClauseElement) -> String {
    column.name().map_or_else(String::new, |n| String::from(n.base()))
}

fn and_where(existing: Option<ClauseElement>, criterion: ClauseElement) -> Result<ClauseElement> {
    let criterion = coercion::expect_where_clause(criterion)?;
    Ok(match existing {
        Some(existing) => crate::elements::and_([existing, criterion]),
        None => criterion,
    })
}

impl Insert {
    fn check_single_row(&self, positional: bool) -> Result<()> {
        match &self.source {
            InsertSource::Values { multi: true, .. } => Err(Error::invalid_request(
                "This construct already has multiple parameter sets; \
                 can't mix single-row and multi-row VALUES",
            )),
            InsertSource::Select { .. } => Err(Error::invalid_request(
                "This construct already inserts from a SELECT",
            )),
            InsertSource::Values { multi: false, .. } if self.positional != positional => {
                Err(Error::argument(
                    "Can't mix keyword and positional arguments in values()",
                ))
            }
            _ => Ok(()),
        }
    }

    fn take_single_row(&mut self) -> Vec<(ClauseElement, ClauseElement)> {
        match std::mem::replace(&mut self.source, InsertSource::Default) {
            InsertSource::Values { mut rows, multi: false } if !rows.is_empty() => rows.swap_remove(0),
            _ => Vec::new(),
        }
    }

    fn set_single_row(&mut self, row: Vec<(ClauseElement, ClauseElement)>, positional: bool) {
        self.positional = positional;
        self.source = InsertSource::Values {
            rows: vec![row],
            multi: false,
        };
    }

    /// Single-row VALUES by column name; repeated calls add columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for unknown columns or when positional
    /// values were given before, and [`Error::InvalidRequest`] when
    /// multi-row values were given before.
    pub fn values<V: Into<DmlValue>>(
        mut self,
        values: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Result<Self> {
        self.check_single_row(false)?;
        let mut pairs = Vec::new();
        for (key, value) in values {
            let column = column_of(&self.table, key)?;
            let coerced = coerce_value(&column, String::from(key), value.into())?;
            pairs.push((column, coerced));
        }
        let mut row = self.take_single_row();
        for (column, value) in pairs {
            match row.iter_mut().find(|(c, _)| c.same_key(&column)) {
                Some(slot) => slot.1 = value,
                None => row.push((column, value)),
            }
        }
        self.set_single_row(row, false);
        Ok(self)
    }

    /// Single-row VALUES in table column order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when more values than columns are given
    /// or keyword values were given before.
    pub fn values_positional<V: Into<DmlValue>>(mut self, values: impl IntoIterator<Item = V>) -> Result<Self> {
        self.check_single_row(true)?;
        let columns = self.table.columns();
        let mut pairs = Vec::new();
        for (i, value) in values.into_iter().enumerate() {
            let column = columns.get(i).cloned().ok_or_else(|| {
                Error::argument(format!(
                    "values() got {} or more positional values for {} columns",
                    i + 1,
                    columns.len()
                ))
            })?;
            let coerced = coerce_value(&column, column_name(&column), value.into())?;
            pairs.push((column, coerced));
        }
        self.set_single_row(pairs, true);
        Ok(self)
    }

    /// Multi-row VALUES; each row maps column names to values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if single-row values were given
    /// before, and [`Error::Argument`] for unknown columns.
    pub fn values_multi<V: Into<DmlValue>, R: IntoIterator<Item = (&'static str, V)>>(
        mut self,
        rows: impl IntoIterator<Item = R>,
    ) -> Result<Self> {
        if matches!(self.source, InsertSource::Values { multi: false, .. }) {
            return Err(Error::invalid_request(
                "Can't mix single-row and multi-row VALUES on one INSERT",
            ));
        }
        let mut existing = match std::mem::replace(&mut self.source, InsertSource::Default) {
            InsertSource::Values { rows, multi: true } => rows,
            _ => Vec::new(),
        };
        for row in rows {
            let index = existing.len();
            let mut pairs = Vec::new();
            for (key, value) in row {
                let column = column_of(&self.table, key)?;
                let coerced = coerce_value(&column, format!("{key}_m{index}"), value.into())?;
                pairs.push((column, coerced));
            }
            existing.push(pairs);
        }
        self.source = InsertSource::Values {
            rows: existing,
            multi: true,
        };
        Ok(self)
    }

    /// `INSERT INTO table (columns) SELECT ...`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for unknown columns and
    /// [`Error::InvalidRequest`] if VALUES were given before.
    pub fn from_select(mut self, columns: &[&str], select: impl Into<ClauseElement>) -> Result<Self> {
        if !matches!(self.source, InsertSource::Default) {
            return Err(Error::invalid_request(
                "This construct already has VALUES; can't also insert from a SELECT",
            ));
        }
        let select = select.into();
        if !select.is_select_statement() {
            return Err(Error::argument(format!(
                "from_select() requires a SELECT statement, got '{}'",
                select.visit_name()
            )));
        }
        let columns = columns
            .iter()
            .map(|key| column_of(&self.table, key))
            .collect::<Result<Vec<_>>>()?;
        self.source = InsertSource::Select { columns, select };
        Ok(self)
    }

    /// Adds `RETURNING` columns.
    #[must_use]
    pub fn returning(mut self, columns: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.returning.extend(columns);
        self
    }

    /// The target table.
    #[must_use]
    pub const fn table(&self) -> &ClauseElement {
        &self.table
    }

    /// The inserted rows or SELECT.
    #[must_use]
    pub const fn source(&self) -> &InsertSource {
        &self.source
    }
}

impl Update {
    /// SET clauses by column name; repeated calls add or replace columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] for unknown columns.
    pub fn values<V: Into<DmlValue>>(
        mut self,
        values: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Result<Self> {
        for (key, value) in values {
            let column = column_of(&self.table, key)?;
            let coerced = coerce_value(&column, String::from(key), value.into())?;
            match self.values.iter_mut().find(|(c, _)| c.same_key(&column)) {
                Some(slot) => slot.1 = coerced,
                None => self.values.push((column, coerced)),
            }
        }
        Ok(self)
    }

    /// Adds WHERE criteria, joined with AND.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the criterion is not a SQL expression.
    pub fn where_(mut self, criterion: ClauseElement) -> Result<Self> {
        self.where_clause = Some(and_where(self.where_clause.take(), criterion)?);
        Ok(self)
    }

    /// Adds `RETURNING` columns.
    #[must_use]
    pub fn returning(mut self, columns: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.returning.extend(columns);
        self
    }
}

impl Delete {
    /// Adds WHERE criteria, joined with AND.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] if the criterion is not a SQL expression.
    pub fn where_(mut self, criterion: ClauseElement) -> Result<Self> {
        self.where_clause = Some(and_where(self.where_clause.take(), criterion)?);
        Ok(self)
    }

    /// Adds `RETURNING` columns.
    #[must_use]
    pub fn returning(mut self, columns: impl IntoIterator<Item = ClauseElement>) -> Self {
        self.returning.extend(columns);
        self
    }
}

impl From<Insert> for ClauseElement {
    fn from(insert: Insert) -> Self {
        Self::new(ElementKind::Insert(insert))
    }
}

impl From<Update> for ClauseElement {
    fn from(update: Update) -> Self {
        Self::new(ElementKind::Update(update))
    }
}

impl From<Delete> for ClauseElement {
    fn from(delete: Delete) -> Self {
        Self::new(ElementKind::Delete(delete))
    }
}

impl From<CompoundSelect> for DmlValue {
    fn from(compound: CompoundSelect) -> Self {
        Self::Element(compound.scalar_subquery())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectable::table;

    fn mytable() -> ClauseElement {
        table("mytable", ["myid", "name", "description"])
    }

    #[test]
    fn test_keyword_values_accumulate() {
        let ins = insert(&mytable())
            .values([("myid", 3)])
            .unwrap()
            .values([("name", "jack")])
            .unwrap();
        let InsertSource::Values { rows, multi } = ins.source() else {
            panic!("expected values");
        };
        assert!(!multi);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_mixing_positional_and_keyword_is_argument_error() {
        let err = insert(&mytable())
            .values([("myid", 3)])
            .unwrap()
            .values_positional([4])
            .unwrap_err();
        assert!(matches!(err, Error::Argument { .. }));
    }

    #[test]
    fn test_mixing_single_and_multi_row_is_invalid_request() {
        let err = insert(&mytable())
            .values_multi([[("myid", 1)], [("myid", 2)]])
            .unwrap()
            .values([("name", "x")])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));

        let err = insert(&mytable())
            .values([("name", "x")])
            .unwrap()
            .values_multi([[("myid", 1)]])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest { .. }));
    }

    #[test]
    fn test_unknown_column_names_it() {
        let err = update(&mytable()).values([("nope", 1)]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_too_many_positional_values() {
        assert!(insert(&mytable()).values_positional([1, 2, 3, 4]).is_err());
    }
}
