//! Expression node payloads and their constructors.

use core::fmt;

use super::{ClauseElement, ElementId, ElementKind};
use crate::comparator::comparator_for;
use crate::elements::comparison::IntoOperand;
use crate::operators::Operator;
use crate::types::DataType;
use crate::value::{BindValue, SqlValue, ToSqlValue};
use crate::warnings::{self, Warning};

/// A name assigned at compile time, unique within one compiled statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnonName {
    pub(crate) token: ElementId,
    pub(crate) base: String,
}

impl AnonName {
    pub(crate) fn new(base: impl Into<String>) -> Self {
        Self {
            token: ElementId::fresh(),
            base: base.into(),
        }
    }

    /// The prefix of the rendered name (`anon`, `param`, a column name...).
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }
}

/// The name of a column, label, alias or bind parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// A name given by the user.
    Given(String),
    /// A name generated per compilation as `<base>_<n>`.
    Anonymous(AnonName),
}

impl Name {
    pub(crate) fn given(name: impl Into<String>) -> Self {
        Self::Given(name.into())
    }

    pub(crate) fn anonymous(base: impl Into<String>) -> Self {
        Self::Anonymous(AnonName::new(base))
    }

    /// The user-given name, if any.
    #[must_use]
    pub fn as_given(&self) -> Option<&str> {
        match self {
            Self::Given(name) => Some(name),
            Self::Anonymous(_) => None,
        }
    }

    /// The given name, or the base of an anonymous name.
    #[must_use]
    pub fn base(&self) -> &str {
        match self {
            Self::Given(name) => name,
            Self::Anonymous(anon) => &anon.base,
        }
    }

    /// Returns true for compile-time generated names.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous(_))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Given(name) => f.write_str(name),
            Self::Anonymous(anon) => write!(f, "%({} {})", anon.token, anon.base),
        }
    }
}

/// A column reference.
#[derive(Debug, Clone)]
pub struct ColumnClause {
    pub(crate) name: Name,
    pub(crate) parent: Option<ClauseElement>,
    pub(crate) index: usize,
    pub(crate) data_type: DataType,
    pub(crate) is_literal: bool,
    pub(crate) primary_key: bool,
}

impl ColumnClause {
    pub(crate) fn free(name: impl Into<String>, data_type: DataType, is_literal: bool) -> Self {
        Self {
            name: Name::given(name),
            parent: None,
            index: 0,
            data_type,
            is_literal,
            primary_key: false,
        }
    }

    /// The column name.
    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }

    /// The selectable exporting this column.
    #[must_use]
    pub const fn parent(&self) -> Option<&ClauseElement> {
        self.parent.as_ref()
    }

    /// Position within the parent's exported columns.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Whether the name renders verbatim, unquoted and unqualified.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        self.is_literal
    }

    /// Whether the column is part of its table's primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}

/// A bind parameter.
#[derive(Debug, Clone)]
pub struct BindParameter {
    pub(crate) key: Name,
    pub(crate) value: Option<BindValue>,
    pub(crate) unique: bool,
    pub(crate) expanding: bool,
    pub(crate) data_type: DataType,
}

impl BindParameter {
    /// The parameter key.
    #[must_use]
    pub const fn key(&self) -> &Name {
        &self.key
    }

    /// The bound value, if one was supplied at construction.
    #[must_use]
    pub const fn value(&self) -> Option<&BindValue> {
        self.value.as_ref()
    }

    /// Whether the parameter gets a fresh name in every statement it
    /// appears in.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether the parameter stands for a list expanded at execution time.
    #[must_use]
    pub const fn is_expanding(&self) -> bool {
        self.expanding
    }

    /// Copy with a fresh anonymous key, used when a unique bind is cloned.
    pub(crate) fn with_fresh_key(&self) -> Self {
        let mut copy = self.clone();
        if self.unique {
            copy.key = Name::anonymous(self.key.base());
        }
        copy
    }
}

/// Builder for [`bindparam`].
#[derive(Debug, Clone)]
pub struct BindParamBuilder {
    key: String,
    value: Option<BindValue>,
    unique: bool,
    expanding: bool,
    data_type: Option<DataType>,
}

impl BindParamBuilder {
    /// Sets the bound value.
    #[must_use]
    pub fn value(mut self, value: impl ToSqlValue) -> Self {
        self.value = Some(BindValue::Scalar(value.to_sql_value()));
        self
    }

    /// Sets a list value and marks the parameter expanding.
    #[must_use]
    pub fn values<T: ToSqlValue>(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.value = Some(BindValue::List(
            values.into_iter().map(ToSqlValue::to_sql_value).collect(),
        ));
        self.expanding = true;
        self
    }

    /// Gives the parameter a fresh name in every statement.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the parameter as a list expanded at execution time.
    #[must_use]
    pub fn expanding(mut self) -> Self {
        self.expanding = true;
        self
    }

    /// Sets the SQL type.
    #[must_use]
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Builds the element.
    #[must_use]
    pub fn build(self) -> ClauseElement {
        let data_type = self.data_type.unwrap_or_else(|| match &self.value {
            Some(BindValue::Scalar(v)) => v.data_type(),
            Some(BindValue::List(values)) => values
                .first()
                .map_or(DataType::Null, SqlValue::data_type),
            None => DataType::Null,
        });
        let key = if self.unique {
            Name::anonymous(self.key)
        } else {
            Name::given(self.key)
        };
        ClauseElement::new(ElementKind::BindParam(BindParameter {
            key,
            value: self.value,
            unique: self.unique,
            expanding: self.expanding,
            data_type,
        }))
    }
}

impl From<BindParamBuilder> for ClauseElement {
    fn from(builder: BindParamBuilder) -> Self {
        builder.build()
    }
}

/// Raw SQL text.
#[derive(Debug, Clone)]
pub struct TextClause {
    pub(crate) text: String,
}

impl TextClause {
    /// The SQL text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A prefix operator (`NOT x`, `-x`, `EXISTS x`) or a postfix modifier
/// (`x DESC`).
#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub(crate) element: ClauseElement,
    pub(crate) operator: Option<Operator>,
    pub(crate) modifier: Option<Operator>,
    pub(crate) data_type: DataType,
}

impl UnaryExpression {
    /// The operand.
    #[must_use]
    pub const fn element(&self) -> &ClauseElement {
        &self.element
    }

    /// The prefix operator.
    #[must_use]
    pub const fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    /// The postfix modifier.
    #[must_use]
    pub const fn modifier(&self) -> Option<&Operator> {
        self.modifier.as_ref()
    }

    /// Builds a unary expression with explicit operator and modifier.
    ///
    /// Exactly one of the two must be set for the expression to compile.
    #[must_use]
    pub fn build(
        element: ClauseElement,
        operator: Option<Operator>,
        modifier: Option<Operator>,
    ) -> ClauseElement {
        let data_type = element.data_type();
        ClauseElement::new(ElementKind::Unary(Self {
            element,
            operator,
            modifier,
            data_type,
        }))
    }
}

/// `left operator right`.
#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub(crate) left: ClauseElement,
    pub(crate) right: ClauseElement,
    pub(crate) operator: Operator,
    pub(crate) negate: Option<Operator>,
    pub(crate) escape: Option<char>,
    pub(crate) data_type: DataType,
}

impl BinaryExpression {
    /// Left operand.
    #[must_use]
    pub const fn left(&self) -> &ClauseElement {
        &self.left
    }

    /// Right operand.
    #[must_use]
    pub const fn right(&self) -> &ClauseElement {
        &self.right
    }

    /// The operator.
    #[must_use]
    pub const fn operator(&self) -> &Operator {
        &self.operator
    }
}

/// Elements joined by an operator.
#[derive(Debug, Clone)]
pub struct ClauseList {
    pub(crate) operator: Operator,
    pub(crate) clauses: Vec<ClauseElement>,
}

impl ClauseList {
    /// The joining operator.
    #[must_use]
    pub const fn operator(&self) -> &Operator {
        &self.operator
    }

    /// The members.
    #[must_use]
    pub fn clauses(&self) -> &[ClauseElement] {
        &self.clauses
    }
}

/// Explicit parentheses.
#[derive(Debug, Clone)]
pub struct Grouping {
    pub(crate) element: ClauseElement,
}

/// `(a, b, ...)`.
#[derive(Debug, Clone)]
pub struct Tuple {
    pub(crate) clauses: Vec<ClauseElement>,
}

impl Tuple {
    /// The members.
    #[must_use]
    pub fn clauses(&self) -> &[ClauseElement] {
        &self.clauses
    }
}

/// `element AS name`.
#[derive(Debug, Clone)]
pub struct Label {
    pub(crate) name: Name,
    pub(crate) element: ClauseElement,
    pub(crate) allow_label_resolve: bool,
}

impl Label {
    /// The label name.
    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }

    /// The labeled expression.
    #[must_use]
    pub const fn element(&self) -> &ClauseElement {
        &self.element
    }

    /// Whether ORDER BY / GROUP BY may refer to this label by name.
    #[must_use]
    pub const fn allow_label_resolve(&self) -> bool {
        self.allow_label_resolve
    }
}

/// Reference to a label by name.
#[derive(Debug, Clone)]
pub struct LabelReference {
    pub(crate) name: String,
}

impl LabelReference {
    /// The referenced label name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// `name(args)`.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub(crate) name: String,
    pub(crate) args: Vec<ClauseElement>,
    pub(crate) data_type: DataType,
}

impl FunctionCall {
    /// The function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments.
    #[must_use]
    pub fn args(&self) -> &[ClauseElement] {
        &self.args
    }
}

/// `CASE [value] WHEN .. THEN .. [ELSE ..] END`.
#[derive(Debug, Clone)]
pub struct Case {
    pub(crate) value: Option<ClauseElement>,
    pub(crate) whens: Vec<(ClauseElement, ClauseElement)>,
    pub(crate) else_: Option<ClauseElement>,
    pub(crate) data_type: DataType,
}

/// `CAST(element AS type)`.
#[derive(Debug, Clone)]
pub struct Cast {
    pub(crate) element: ClauseElement,
    pub(crate) data_type: DataType,
}

/// A SELECT used as a column expression.
#[derive(Debug, Clone)]
pub struct ScalarSelect {
    pub(crate) element: ClauseElement,
}

impl ScalarSelect {
    /// The wrapped SELECT.
    #[must_use]
    pub const fn element(&self) -> &ClauseElement {
        &self.element
    }

    /// The type of the single selected column.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        crate::selectable::statement_columns(&self.element)
            .first()
            .map_or(DataType::Null, |col| col.element.data_type())
    }
}

/// A user-defined clause element.
///
/// The compiler renders it through the renderer registered for its visit
/// name in [`crate::compiler::CompileOptions`].
#[derive(Debug, Clone)]
pub struct CustomClause {
    pub(crate) visit_name: String,
    pub(crate) children: Vec<ClauseElement>,
    pub(crate) data_type: DataType,
}

impl CustomClause {
    /// The dispatch tag.
    #[must_use]
    pub fn visit_name(&self) -> &str {
        &self.visit_name
    }

    /// Child elements, cloned and adapted by traversals.
    #[must_use]
    pub fn children(&self) -> &[ClauseElement] {
        &self.children
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// A free-standing, untyped column.
#[must_use]
pub fn column(name: impl Into<String>) -> ClauseElement {
    ClauseElement::new(ElementKind::Column(ColumnClause::free(
        name,
        DataType::Null,
        false,
    )))
}

/// A free-standing column of a given type.
#[must_use]
pub fn column_typed(name: impl Into<String>, data_type: DataType) -> ClauseElement {
    ClauseElement::new(ElementKind::Column(ColumnClause::free(name, data_type, false)))
}

/// A column whose name is rendered verbatim.
#[must_use]
pub fn literal_column(text: impl Into<String>) -> ClauseElement {
    ClauseElement::new(ElementKind::Column(ColumnClause::free(
        text,
        DataType::Null,
        true,
    )))
}

/// Raw SQL text.
#[must_use]
pub fn text(sql: impl Into<String>) -> ClauseElement {
    ClauseElement::new(ElementKind::Text(TextClause { text: sql.into() }))
}

/// A value rendered as a unique anonymous bind parameter.
#[must_use]
pub fn literal(value: impl ToSqlValue) -> ClauseElement {
    let value = value.to_sql_value();
    bind_value(Name::anonymous("param"), value.data_type(), value)
}

/// Starts a bind parameter named `key`.
#[must_use]
pub fn bindparam(key: impl Into<String>) -> BindParamBuilder {
    BindParamBuilder {
        key: key.into(),
        value: None,
        unique: false,
        expanding: false,
        data_type: None,
    }
}

pub(crate) fn bind_value(key: Name, data_type: DataType, value: SqlValue) -> ClauseElement {
    let unique = key.is_anonymous();
    ClauseElement::new(ElementKind::BindParam(BindParameter {
        key,
        value: Some(BindValue::Scalar(value)),
        unique,
        expanding: false,
        data_type,
    }))
}

pub(crate) fn expanding_bind(base: &str, data_type: DataType, values: Vec<SqlValue>) -> ClauseElement {
    ClauseElement::new(ElementKind::BindParam(BindParameter {
        key: Name::anonymous(base),
        value: Some(BindValue::List(values)),
        unique: true,
        expanding: true,
        data_type,
    }))
}

/// `NULL`.
#[must_use]
pub fn null() -> ClauseElement {
    ClauseElement::new(ElementKind::Null)
}

/// The boolean true constant.
#[must_use]
pub fn true_() -> ClauseElement {
    ClauseElement::new(ElementKind::True)
}

/// The boolean false constant.
#[must_use]
pub fn false_() -> ClauseElement {
    ClauseElement::new(ElementKind::False)
}

fn conjunction(
    operator: Operator,
    function: &'static str,
    clauses: impl IntoIterator<Item = ClauseElement>,
) -> ClauseElement {
    let is_and = operator == Operator::And;
    let continue_on = |e: &ClauseElement| {
        matches!(
            (is_and, e.kind()),
            (true, ElementKind::True) | (false, ElementKind::False)
        )
    };
    let skip_on = |e: &ClauseElement| {
        matches!(
            (is_and, e.kind()),
            (true, ElementKind::False) | (false, ElementKind::True)
        )
    };

    let mut saw_any = false;
    let mut saw_continue = None;
    let mut flattened = Vec::new();
    for clause in clauses {
        saw_any = true;
        if continue_on(&clause) {
            saw_continue = Some(clause);
            continue;
        }
        if skip_on(&clause) {
            return clause;
        }
        match clause.kind() {
            ElementKind::ClauseList(list) if list.operator == operator => {
                flattened.extend(list.clauses.iter().cloned());
            }
            _ => flattened.push(clause),
        }
    }

    if !saw_any {
        warnings::emit(Warning::EmptyConjunction { function });
    }
    match flattened.len() {
        0 => saw_continue.unwrap_or_else(|| {
            ClauseElement::new(ElementKind::ClauseList(ClauseList {
                operator,
                clauses: Vec::new(),
            }))
        }),
        1 => flattened.remove(0),
        _ => ClauseElement::new(ElementKind::ClauseList(ClauseList {
            operator,
            clauses: flattened,
        })),
    }
}

/// Joins clauses with `AND`.
///
/// A false constant collapses the conjunction; true constants are dropped.
#[must_use]
pub fn and_(clauses: impl IntoIterator<Item = ClauseElement>) -> ClauseElement {
    conjunction(Operator::And, "and_", clauses)
}

/// Joins clauses with `OR`.
///
/// A true constant collapses the disjunction; false constants are dropped.
#[must_use]
pub fn or_(clauses: impl IntoIterator<Item = ClauseElement>) -> ClauseElement {
    conjunction(Operator::Or, "or_", clauses)
}

/// Negates an expression.
///
/// Binary comparisons flip to their negated operator, the boolean constants
/// swap, and everything else is wrapped in `NOT`.
#[must_use]
pub fn not_(element: &ClauseElement) -> ClauseElement {
    match element.kind() {
        ElementKind::True => false_(),
        ElementKind::False => true_(),
        ElementKind::Binary(binary) => match &binary.negate {
            Some(negated) => {
                let mut flipped = binary.clone();
                flipped.negate = Some(flipped.operator.clone());
                flipped.operator = negated.clone();
                ClauseElement::new(ElementKind::Binary(flipped))
            }
            None => negated_unary(element),
        },
        ElementKind::Unary(unary) if unary.operator == Some(Operator::Not) => {
            unary.element.clone()
        }
        _ => negated_unary(element),
    }
}

fn negated_unary(element: &ClauseElement) -> ClauseElement {
    ClauseElement::new(ElementKind::Unary(UnaryExpression {
        element: element.clone(),
        operator: Some(Operator::Not),
        modifier: None,
        data_type: DataType::Boolean,
    }))
}

/// `(a, b, ...)`.
#[must_use]
pub fn tuple_(clauses: impl IntoIterator<Item = ClauseElement>) -> ClauseElement {
    ClauseElement::new(ElementKind::Tuple(Tuple {
        clauses: clauses.into_iter().collect(),
    }))
}

/// Wraps an element in explicit parentheses.
#[must_use]
pub fn grouping(element: ClauseElement) -> ClauseElement {
    ClauseElement::new(ElementKind::Grouping(Grouping { element }))
}

/// `element AS name`.
#[must_use]
pub fn label(name: impl Into<String>, element: ClauseElement) -> ClauseElement {
    ClauseElement::new(ElementKind::Label(Label {
        name: Name::given(name),
        element,
        allow_label_resolve: true,
    }))
}

pub(crate) fn anonymous_label(element: ClauseElement) -> ClauseElement {
    let base = anon_base(&element);
    ClauseElement::new(ElementKind::Label(Label {
        name: Name::anonymous(base),
        element,
        allow_label_resolve: true,
    }))
}

/// The base used for names generated for `element`.
pub(crate) fn anon_base(element: &ClauseElement) -> String {
    match element.kind() {
        ElementKind::Function(f) => f.name.clone(),
        ElementKind::Column(c) if !c.is_literal => String::from(c.name.base()),
        _ => String::from("anon"),
    }
}

/// Refers to a label of the enclosing SELECT by name.
#[must_use]
pub fn order_by_label(name: impl Into<String>) -> ClauseElement {
    ClauseElement::new(ElementKind::LabelReference(LabelReference { name: name.into() }))
}

/// `CAST(element AS data_type)`.
#[must_use]
pub fn cast(element: ClauseElement, data_type: DataType) -> ClauseElement {
    ClauseElement::new(ElementKind::Cast(Cast { element, data_type }))
}

/// `element COLLATE collation`.
#[must_use]
pub fn collate(element: &ClauseElement, collation: &str) -> ClauseElement {
    element.operate(Operator::Collate, literal_column(collation))
}

fn modified(element: ClauseElement, modifier: Operator) -> ClauseElement {
    UnaryExpression::build(element, None, Some(modifier))
}

/// `element DESC`.
#[must_use]
pub fn desc(element: ClauseElement) -> ClauseElement {
    modified(element, Operator::Desc)
}

/// `element ASC`.
#[must_use]
pub fn asc(element: ClauseElement) -> ClauseElement {
    modified(element, Operator::Asc)
}

/// `element NULLS FIRST`.
#[must_use]
pub fn nulls_first(element: ClauseElement) -> ClauseElement {
    modified(element, Operator::NullsFirst)
}

/// `element NULLS LAST`.
#[must_use]
pub fn nulls_last(element: ClauseElement) -> ClauseElement {
    modified(element, Operator::NullsLast)
}

/// `DISTINCT element`.
#[must_use]
pub fn distinct(element: ClauseElement) -> ClauseElement {
    UnaryExpression::build(element, Some(Operator::Distinct), None)
}

/// `EXISTS (select)`.
#[must_use]
pub fn exists(select: impl Into<ClauseElement>) -> ClauseElement {
    let select = select.into();
    let element = match select.kind() {
        ElementKind::Select(_) | ElementKind::CompoundSelect(_) => {
            ClauseElement::new(ElementKind::ScalarSelect(ScalarSelect { element: select }))
        }
        _ => select,
    };
    ClauseElement::new(ElementKind::Unary(UnaryExpression {
        element,
        operator: Some(Operator::Exists),
        modifier: None,
        data_type: DataType::Boolean,
    }))
}

/// A user-defined element rendered by a renderer registered under
/// `visit_name`.
#[must_use]
pub fn custom(
    visit_name: impl Into<String>,
    children: impl IntoIterator<Item = ClauseElement>,
    data_type: DataType,
) -> ClauseElement {
    ClauseElement::new(ElementKind::Custom(CustomClause {
        visit_name: visit_name.into(),
        children: children.into_iter().collect(),
        data_type,
    }))
}

/// Starts a `CASE` expression.
#[must_use]
pub fn case() -> CaseBuilder {
    CaseBuilder {
        value: None,
        whens: Vec::new(),
        else_: None,
    }
}

/// Builder for [`case`].
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    value: Option<ClauseElement>,
    whens: Vec<(ClauseElement, ClauseElement)>,
    else_: Option<ClauseElement>,
}

impl CaseBuilder {
    /// Compares `value` against each WHEN operand (`CASE value WHEN ...`).
    #[must_use]
    pub fn value(mut self, value: ClauseElement) -> Self {
        self.value = Some(value);
        self
    }

    /// Adds a `WHEN condition THEN result` branch.
    #[must_use]
    pub fn when(mut self, condition: impl IntoOperand, result: impl IntoOperand) -> Self {
        self.whens
            .push((condition.into_operand(None), result.into_operand(None)));
        self
    }

    /// Sets the `ELSE` result.
    #[must_use]
    pub fn else_(mut self, result: impl IntoOperand) -> Self {
        self.else_ = Some(result.into_operand(None));
        self
    }

    /// Builds the element.
    #[must_use]
    pub fn end(self) -> ClauseElement {
        let data_type = self
            .whens
            .iter()
            .map(|(_, then)| then.data_type())
            .find(|t| !t.is_null())
            .unwrap_or_default();
        ClauseElement::new(ElementKind::Case(Case {
            value: self.value,
            whens: self.whens,
            else_: self.else_,
            data_type,
        }))
    }
}

impl From<CaseBuilder> for ClauseElement {
    fn from(builder: CaseBuilder) -> Self {
        builder.end()
    }
}

/// SQL functions.
pub mod func {
    use super::{ClauseElement, ElementKind, FunctionCall};
    use crate::types::DataType;

    /// `name(args)` with an explicit return type.
    #[must_use]
    pub fn call(
        name: impl Into<String>,
        args: impl IntoIterator<Item = ClauseElement>,
        data_type: DataType,
    ) -> ClauseElement {
        ClauseElement::new(ElementKind::Function(FunctionCall {
            name: name.into(),
            args: args.into_iter().collect(),
            data_type,
        }))
    }

    /// `name(args)` typed after its first argument.
    #[must_use]
    pub fn generic(
        name: impl Into<String>,
        args: impl IntoIterator<Item = ClauseElement>,
    ) -> ClauseElement {
        let args: Vec<_> = args.into_iter().collect();
        let data_type = args.first().map(ClauseElement::data_type).unwrap_or_default();
        call(name, args, data_type)
    }

    /// `count(expr)`.
    #[must_use]
    pub fn count(expr: ClauseElement) -> ClauseElement {
        call("count", [expr], DataType::Integer)
    }

    /// `count(*)`.
    #[must_use]
    pub fn count_star() -> ClauseElement {
        call("count", [super::literal_column("*")], DataType::Integer)
    }

    /// `max(expr)`.
    #[must_use]
    pub fn max(expr: ClauseElement) -> ClauseElement {
        generic("max", [expr])
    }

    /// `min(expr)`.
    #[must_use]
    pub fn min(expr: ClauseElement) -> ClauseElement {
        generic("min", [expr])
    }

    /// `sum(expr)`.
    #[must_use]
    pub fn sum(expr: ClauseElement) -> ClauseElement {
        generic("sum", [expr])
    }

    /// `coalesce(args)`.
    #[must_use]
    pub fn coalesce(args: impl IntoIterator<Item = ClauseElement>) -> ClauseElement {
        generic("coalesce", args)
    }

    /// `lower(expr)`.
    #[must_use]
    pub fn lower(expr: ClauseElement) -> ClauseElement {
        call("lower", [expr], DataType::Varchar(None))
    }

    /// `upper(expr)`.
    #[must_use]
    pub fn upper(expr: ClauseElement) -> ClauseElement {
        call("upper", [expr], DataType::Varchar(None))
    }
}

impl ClauseElement {
    /// Builds `self op other` with the operator and result type chosen by
    /// the comparator of `self`'s type.
    pub(crate) fn operate(&self, op: Operator, other: ClauseElement) -> ClauseElement {
        let left_type = self.data_type();
        let comparator = comparator_for(&left_type);
        let op = comparator.adapt_operator(op);
        let data_type = comparator.result_type(&op, &left_type, &other.data_type());
        let negate = op.negate();
        ClauseElement::new(ElementKind::Binary(BinaryExpression {
            left: self.clone(),
            right: other,
            operator: op,
            negate,
            escape: None,
            data_type,
        }))
    }

    /// `self AS name`.
    #[must_use]
    pub fn label(&self, name: impl Into<String>) -> Self {
        label(name, self.clone())
    }

    /// `self AS <anonymous name>`.
    #[must_use]
    pub fn anon_label(&self) -> Self {
        anonymous_label(self.clone())
    }

    /// `CAST(self AS data_type)`.
    #[must_use]
    pub fn cast(&self, data_type: DataType) -> Self {
        cast(self.clone(), data_type)
    }

    /// `self COLLATE collation`.
    #[must_use]
    pub fn collate(&self, collation: &str) -> Self {
        collate(self, collation)
    }

    /// `self DESC`.
    #[must_use]
    pub fn desc(&self) -> Self {
        desc(self.clone())
    }

    /// `self ASC`.
    #[must_use]
    pub fn asc(&self) -> Self {
        asc(self.clone())
    }

    /// `self NULLS FIRST`.
    #[must_use]
    pub fn nulls_first(&self) -> Self {
        nulls_first(self.clone())
    }

    /// `self NULLS LAST`.
    #[must_use]
    pub fn nulls_last(&self) -> Self {
        nulls_last(self.clone())
    }

    /// `DISTINCT self`.
    #[must_use]
    pub fn distinct(&self) -> Self {
        distinct(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::capture;

    #[test]
    fn test_and_folds_false() {
        let a = column("a").eq(1);
        let folded = and_([a.clone(), false_(), column("b").eq(2)]);
        assert!(matches!(folded.kind(), ElementKind::False));
        let single = and_([true_(), a.clone()]);
        assert!(single.is(&a));
    }

    #[test]
    fn test_or_folds_true() {
        let folded = or_([column("a").eq(1), true_()]);
        assert!(matches!(folded.kind(), ElementKind::True));
        let only_false = or_([false_()]);
        assert!(matches!(only_false.kind(), ElementKind::False));
    }

    #[test]
    fn test_nested_conjunctions_flatten() {
        let inner = and_([column("a").eq(1), column("b").eq(2)]);
        let outer = and_([inner, column("c").eq(3)]);
        let ElementKind::ClauseList(list) = outer.kind() else {
            panic!("expected a clause list");
        };
        assert_eq!(list.clauses().len(), 3);
    }

    #[test]
    fn test_empty_and_warns() {
        let (el, warnings) = capture(|| and_([]));
        assert!(matches!(el.kind(), ElementKind::ClauseList(l) if l.clauses().is_empty()));
        assert_eq!(warnings, vec![Warning::EmptyConjunction { function: "and_" }]);
    }

    #[test]
    fn test_not_flips_comparison() {
        let negated = not_(&column("a").eq(column("b")));
        let ElementKind::Binary(binary) = negated.kind() else {
            panic!("expected a binary expression");
        };
        assert_eq!(binary.operator(), &Operator::NotEq);
        assert!(matches!(not_(&true_()).kind(), ElementKind::False));
    }

    #[test]
    fn test_unique_bind_gets_fresh_key_on_copy() {
        let el = bindparam("x").unique().value(5).build();
        let ElementKind::BindParam(bind) = el.kind() else {
            panic!("expected a bind");
        };
        let fresh = bind.with_fresh_key();
        assert_ne!(fresh.key(), bind.key());
        assert_eq!(fresh.key().base(), "x");
    }

    #[test]
    fn test_anon_base() {
        assert_eq!(anon_base(&func::count(column("x"))), "count");
        assert_eq!(anon_base(&column("x")), "x");
        assert_eq!(anon_base(&column("x").eq(1)), "anon");
    }
}
