//! Boolean predicate composition for WHERE, HAVING and JOIN ... ON.
//!
//! A [`ConditionClause`] is a flat, ordered list of predicate nodes. Each
//! node carries the conjunction that joins it to its predecessor and an
//! independent negation flag. Grammars render the list left to right: the
//! first node's conjunction is never emitted, and a negated node gets a
//! leading `NOT` after its conjunction.
//!
//! ```rust
//! use oxide_grammar::{ConditionClause, Operator};
//!
//! let clause = ConditionClause::new()
//!     .and("x", Operator::Eq, 1)
//!     .or_not("y", Operator::Gt, 2);
//! assert_eq!(clause.len(), 2);
//! ```

mod date;

pub use date::DatePart;

use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::operator::Operator;
use crate::query::QueryBuilder;
use crate::value::{Operand, SqlValue};

/// How a node joins the node before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl Conjunction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// A subquery used by `EXISTS`, `IN` and scalar comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Subquery {
    /// A nested query compiled with the same grammar.
    Query(Box<QueryBuilder>),
    /// Raw SQL and the values its placeholders bind to.
    Raw(Expression, Vec<SqlValue>),
}

impl Subquery {
    /// Values bound by the subquery, in placeholder order.
    #[must_use]
    pub fn bindings(&self, window_group_limit: bool) -> Vec<SqlValue> {
        match self {
            Self::Query(query) => query.get_bindings(window_group_limit),
            Self::Raw(_, bindings) => bindings.clone(),
        }
    }
}

impl From<QueryBuilder> for Subquery {
    fn from(query: QueryBuilder) -> Self {
        Self::Query(Box::new(query))
    }
}

impl From<Expression> for Subquery {
    fn from(expr: Expression) -> Self {
        Self::Raw(expr, Vec::new())
    }
}

/// Right-hand side of an `IN` predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    /// A literal list; empty lists compile to a constant predicate.
    List(Vec<Operand>),
    /// A subquery.
    Query(Subquery),
}

/// Full-text search flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullTextMode {
    /// Natural language search (`plainto_tsquery` on Postgres).
    #[default]
    Natural,
    /// MySQL boolean mode.
    Boolean,
    /// Postgres `phraseto_tsquery`.
    Phrase,
    /// Postgres `websearch_to_tsquery`.
    Websearch,
}

/// Options for a full-text predicate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FullTextOptions {
    /// Search mode.
    pub mode: FullTextMode,
    /// Text search configuration (Postgres), defaults to `english`.
    pub language: Option<String>,
    /// MySQL `WITH QUERY EXPANSION`.
    pub expanded: bool,
}

/// A single predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op value`
    Value {
        /// Left-hand column.
        column: String,
        /// Comparison operator.
        operator: Operator,
        /// Bound or raw right-hand side.
        value: Operand,
    },
    /// `first op second`, both identifiers.
    Column {
        /// Left-hand column.
        first: String,
        /// Comparison operator.
        operator: Operator,
        /// Right-hand column.
        second: String,
    },
    /// Raw SQL with its own bindings.
    Raw {
        /// The SQL fragment.
        sql: Expression,
        /// Values for the fragment's placeholders.
        bindings: Vec<SqlValue>,
    },
    /// `( inner )`
    Nested(ConditionClause),
    /// `EXISTS ( subquery )`
    Exists(Subquery),
    /// `column IS [NOT] NULL`
    Null {
        /// Tested column.
        column: String,
        /// Emits `IS NOT NULL` instead.
        not: bool,
    },
    /// Comparison on a date component.
    Date {
        /// Date/time column.
        column: String,
        /// Compared component.
        part: DatePart,
        /// Comparison operator.
        operator: Operator,
        /// Normalized comparison value.
        value: Operand,
    },
    /// `column [NOT] IN (...)`
    In {
        /// Tested column.
        column: String,
        /// Candidate values.
        values: InValues,
        /// Emits the negated form.
        not: bool,
    },
    /// `column [NOT] BETWEEN low AND high`
    Between {
        /// Tested column.
        column: String,
        /// Lower bound.
        low: Operand,
        /// Upper bound.
        high: Operand,
        /// Emits `NOT BETWEEN`.
        not: bool,
    },
    /// `column [NOT] BETWEEN low_column AND high_column`
    BetweenColumns {
        /// Tested column.
        column: String,
        /// Lower bound column.
        low: String,
        /// Upper bound column.
        high: String,
        /// Emits `NOT BETWEEN`.
        not: bool,
    },
    /// `column op (subquery)`
    Sub {
        /// Left-hand column.
        column: String,
        /// Comparison operator.
        operator: Operator,
        /// Scalar subquery.
        query: Subquery,
    },
    /// `(a, b) op (?, ?)`
    RowValues {
        /// Left-hand columns.
        columns: Vec<String>,
        /// Comparison operator.
        operator: Operator,
        /// One value per column.
        values: Vec<Operand>,
    },
    /// JSON document containment.
    JsonContains {
        /// JSON column, optionally with a `->` path.
        column: String,
        /// The contained document.
        value: serde_json::Value,
    },
    /// JSON key presence.
    JsonContainsKey {
        /// JSON column with a `->` path ending in the key.
        column: String,
    },
    /// JSON array length comparison.
    JsonLength {
        /// JSON column, optionally with a `->` path.
        column: String,
        /// Comparison operator.
        operator: Operator,
        /// Compared length.
        value: Operand,
    },
    /// Full-text match over one or more columns.
    FullText {
        /// Indexed columns.
        columns: Vec<String>,
        /// Search terms.
        value: String,
        /// Search options.
        options: FullTextOptions,
    },
}

impl Condition {
    /// Appends the values this predicate binds, in placeholder order.
    pub(crate) fn push_bindings(&self, out: &mut Vec<SqlValue>, window_group_limit: bool) {
        match self {
            Self::Value { value, .. }
            | Self::Date { value, .. }
            | Self::JsonLength { value, .. } => value.push_binding(out),
            Self::Raw { bindings, .. } => out.extend(bindings.iter().cloned()),
            Self::Nested(clause) => out.extend(clause.bindings(window_group_limit)),
            Self::Exists(query)
            | Self::Sub { query, .. }
            | Self::In {
                values: InValues::Query(query),
                ..
            } => out.extend(query.bindings(window_group_limit)),
            Self::In {
                values: InValues::List(values),
                ..
            }
            | Self::RowValues { values, .. } => {
                for value in values {
                    value.push_binding(out);
                }
            }
            Self::Between { low, high, .. } => {
                low.push_binding(out);
                high.push_binding(out);
            }
            Self::JsonContains { value, .. } => out.push(SqlValue::Json(value.clone())),
            Self::FullText { value, .. } => out.push(SqlValue::Text(value.clone())),
            Self::Column { .. }
            | Self::Null { .. }
            | Self::BetweenColumns { .. }
            | Self::JsonContainsKey { .. } => {}
        }
    }
}

/// A predicate together with how it attaches to the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionNode {
    /// The predicate.
    pub condition: Condition,
    /// Joins this node to its predecessor; ignored on the first node.
    pub conjunction: Conjunction,
    /// Emits a leading `NOT`.
    pub negated: bool,
}

/// An ordered list of predicates compiled into one boolean expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionClause {
    nodes: Vec<ConditionNode>,
}

impl ConditionClause {
    /// Creates an empty clause.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of predicates. An empty clause omits its WHERE/HAVING/ON.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the clause has no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The predicates in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[ConditionNode] {
        &self.nodes
    }

    /// Values bound by the clause, in the order its placeholders appear.
    /// See [`QueryBuilder::raw_bindings`] for `window_group_limit`.
    #[must_use]
    pub fn bindings(&self, window_group_limit: bool) -> Vec<SqlValue> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.condition.push_bindings(&mut out, window_group_limit);
        }
        out
    }

    pub(crate) fn push(&mut self, condition: Condition, conjunction: Conjunction, negated: bool) {
        self.nodes.push(ConditionNode {
            condition,
            conjunction,
            negated,
        });
    }

    #[must_use]
    fn with(mut self, condition: Condition, conjunction: Conjunction, negated: bool) -> Self {
        self.push(condition, conjunction, negated);
        self
    }

    // Value comparisons

    /// `AND column op value`
    #[must_use]
    pub fn and(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.with(value_condition(column, op, value), Conjunction::And, false)
    }

    /// `OR column op value`
    #[must_use]
    pub fn or(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.with(value_condition(column, op, value), Conjunction::Or, false)
    }

    /// `AND NOT column op value`
    #[must_use]
    pub fn and_not(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Self {
        self.with(value_condition(column, op, value), Conjunction::And, true)
    }

    /// `OR NOT column op value`
    #[must_use]
    pub fn or_not(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.with(value_condition(column, op, value), Conjunction::Or, true)
    }

    // Column comparisons

    /// `AND first op second`
    #[must_use]
    pub fn and_column(
        self,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.with(column_condition(first, op, second), Conjunction::And, false)
    }

    /// `OR first op second`
    #[must_use]
    pub fn or_column(
        self,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.with(column_condition(first, op, second), Conjunction::Or, false)
    }

    /// `AND NOT first op second`
    #[must_use]
    pub fn and_column_not(
        self,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.with(column_condition(first, op, second), Conjunction::And, true)
    }

    /// `OR NOT first op second`
    #[must_use]
    pub fn or_column_not(
        self,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.with(column_condition(first, op, second), Conjunction::Or, true)
    }

    // Raw SQL

    /// `AND <sql>`
    #[must_use]
    pub fn and_raw(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.with(raw_condition(sql, bindings), Conjunction::And, false)
    }

    /// `OR <sql>`
    #[must_use]
    pub fn or_raw(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.with(raw_condition(sql, bindings), Conjunction::Or, false)
    }

    /// `AND NOT <sql>`
    #[must_use]
    pub fn and_raw_not(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.with(raw_condition(sql, bindings), Conjunction::And, true)
    }

    /// `OR NOT <sql>`
    #[must_use]
    pub fn or_raw_not(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.with(raw_condition(sql, bindings), Conjunction::Or, true)
    }

    // Nested clauses

    /// `AND ( clause )`; an empty clause is ignored.
    #[must_use]
    pub fn and_condition_clause(self, clause: Self) -> Self {
        self.nested(clause, Conjunction::And, false)
    }

    /// `OR ( clause )`
    #[must_use]
    pub fn or_condition_clause(self, clause: Self) -> Self {
        self.nested(clause, Conjunction::Or, false)
    }

    /// `AND NOT ( clause )`
    #[must_use]
    pub fn and_condition_clause_not(self, clause: Self) -> Self {
        self.nested(clause, Conjunction::And, true)
    }

    /// `OR NOT ( clause )`
    #[must_use]
    pub fn or_condition_clause_not(self, clause: Self) -> Self {
        self.nested(clause, Conjunction::Or, true)
    }

    fn nested(self, clause: Self, conjunction: Conjunction, negated: bool) -> Self {
        if clause.is_empty() {
            return self;
        }
        self.with(Condition::Nested(clause), conjunction, negated)
    }

    // EXISTS

    /// `AND EXISTS ( subquery )`
    #[must_use]
    pub fn and_exists(self, query: impl Into<Subquery>) -> Self {
        self.with(Condition::Exists(query.into()), Conjunction::And, false)
    }

    /// `OR EXISTS ( subquery )`
    #[must_use]
    pub fn or_exists(self, query: impl Into<Subquery>) -> Self {
        self.with(Condition::Exists(query.into()), Conjunction::Or, false)
    }

    /// `AND NOT EXISTS ( subquery )`
    #[must_use]
    pub fn and_exists_not(self, query: impl Into<Subquery>) -> Self {
        self.with(Condition::Exists(query.into()), Conjunction::And, true)
    }

    /// `OR NOT EXISTS ( subquery )`
    #[must_use]
    pub fn or_exists_not(self, query: impl Into<Subquery>) -> Self {
        self.with(Condition::Exists(query.into()), Conjunction::Or, true)
    }

    // NULL checks

    /// `AND column IS NULL`
    #[must_use]
    pub fn and_null(self, column: impl Into<String>) -> Self {
        self.with(null_condition(column, false), Conjunction::And, false)
    }

    /// `OR column IS NULL`
    #[must_use]
    pub fn or_null(self, column: impl Into<String>) -> Self {
        self.with(null_condition(column, false), Conjunction::Or, false)
    }

    /// `AND column IS NOT NULL`
    #[must_use]
    pub fn and_not_null(self, column: impl Into<String>) -> Self {
        self.with(null_condition(column, true), Conjunction::And, false)
    }

    /// `OR column IS NOT NULL`
    #[must_use]
    pub fn or_not_null(self, column: impl Into<String>) -> Self {
        self.with(null_condition(column, true), Conjunction::Or, false)
    }

    // Date parts

    /// `AND <part>(column) op value`, normalizing `value` for `part`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] when `value` cannot be read as the
    /// requested part.
    pub fn and_date(
        self,
        column: impl Into<String>,
        part: DatePart,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        Ok(self.with(date_condition(column, part, op, value)?, Conjunction::And, false))
    }

    /// `OR <part>(column) op value`
    ///
    /// # Errors
    ///
    /// See [`ConditionClause::and_date`].
    pub fn or_date(
        self,
        column: impl Into<String>,
        part: DatePart,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        Ok(self.with(date_condition(column, part, op, value)?, Conjunction::Or, false))
    }

    /// `AND NOT <part>(column) op value`
    ///
    /// # Errors
    ///
    /// See [`ConditionClause::and_date`].
    pub fn and_date_not(
        self,
        column: impl Into<String>,
        part: DatePart,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        Ok(self.with(date_condition(column, part, op, value)?, Conjunction::And, true))
    }

    // IN lists

    /// `AND column IN (...)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if any value is itself an array.
    pub fn and_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Ok(self.with(in_condition(column, values, false)?, Conjunction::And, false))
    }

    /// `OR column IN (...)`
    ///
    /// # Errors
    ///
    /// See [`ConditionClause::and_in`].
    pub fn or_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Ok(self.with(in_condition(column, values, false)?, Conjunction::Or, false))
    }

    /// `AND column NOT IN (...)`
    ///
    /// # Errors
    ///
    /// See [`ConditionClause::and_in`].
    pub fn and_not_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Ok(self.with(in_condition(column, values, true)?, Conjunction::And, false))
    }

    /// `OR column NOT IN (...)`
    ///
    /// # Errors
    ///
    /// See [`ConditionClause::and_in`].
    pub fn or_not_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        Ok(self.with(in_condition(column, values, true)?, Conjunction::Or, false))
    }

    /// `AND column [NOT] IN (subquery)`
    #[must_use]
    pub fn and_in_query(self, column: impl Into<String>, query: impl Into<Subquery>, not: bool) -> Self {
        let condition = Condition::In {
            column: column.into(),
            values: InValues::Query(query.into()),
            not,
        };
        self.with(condition, Conjunction::And, false)
    }

    /// `OR column [NOT] IN (subquery)`
    #[must_use]
    pub fn or_in_query(self, column: impl Into<String>, query: impl Into<Subquery>, not: bool) -> Self {
        let condition = Condition::In {
            column: column.into(),
            values: InValues::Query(query.into()),
            not,
        };
        self.with(condition, Conjunction::Or, false)
    }

    // BETWEEN

    /// `AND column BETWEEN low AND high`
    #[must_use]
    pub fn and_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.with(between_condition(column, low, high, false), Conjunction::And, false)
    }

    /// `OR column BETWEEN low AND high`
    #[must_use]
    pub fn or_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.with(between_condition(column, low, high, false), Conjunction::Or, false)
    }

    /// `AND column NOT BETWEEN low AND high`
    #[must_use]
    pub fn and_not_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.with(between_condition(column, low, high, true), Conjunction::And, false)
    }

    /// `OR column NOT BETWEEN low AND high`
    #[must_use]
    pub fn or_not_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        self.with(between_condition(column, low, high, true), Conjunction::Or, false)
    }

    /// `AND column [NOT] BETWEEN low_column AND high_column`
    #[must_use]
    pub fn and_between_columns(
        self,
        column: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
        not: bool,
    ) -> Self {
        let condition = Condition::BetweenColumns {
            column: column.into(),
            low: low.into(),
            high: high.into(),
            not,
        };
        self.with(condition, Conjunction::And, false)
    }

    // Subquery comparison and row values

    /// `AND column op (subquery)`
    #[must_use]
    pub fn and_sub(self, column: impl Into<String>, op: Operator, query: impl Into<Subquery>) -> Self {
        let condition = Condition::Sub {
            column: column.into(),
            operator: op,
            query: query.into(),
        };
        self.with(condition, Conjunction::And, false)
    }

    /// `AND (a, b) op (?, ?)`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] when the column and value counts
    /// differ or are zero.
    pub fn and_row_values<C, V>(
        self,
        columns: impl IntoIterator<Item = C>,
        op: Operator,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self>
    where
        C: Into<String>,
        V: Into<Operand>,
    {
        Ok(self.with(row_values_condition(columns, op, values)?, Conjunction::And, false))
    }

    /// `OR (a, b) op (?, ?)`
    ///
    /// # Errors
    ///
    /// See [`ConditionClause::and_row_values`].
    pub fn or_row_values<C, V>(
        self,
        columns: impl IntoIterator<Item = C>,
        op: Operator,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self>
    where
        C: Into<String>,
        V: Into<Operand>,
    {
        Ok(self.with(row_values_condition(columns, op, values)?, Conjunction::Or, false))
    }

    // JSON

    /// JSON containment; `negated` emits the "doesn't contain" form.
    #[must_use]
    pub fn and_json_contains(
        self,
        column: impl Into<String>,
        value: serde_json::Value,
        negated: bool,
    ) -> Self {
        let condition = Condition::JsonContains {
            column: column.into(),
            value,
        };
        self.with(condition, Conjunction::And, negated)
    }

    /// JSON key presence; `negated` emits the "doesn't contain key" form.
    #[must_use]
    pub fn and_json_contains_key(self, column: impl Into<String>, negated: bool) -> Self {
        let condition = Condition::JsonContainsKey {
            column: column.into(),
        };
        self.with(condition, Conjunction::And, negated)
    }

    /// JSON array length comparison.
    #[must_use]
    pub fn and_json_length(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Self {
        let condition = Condition::JsonLength {
            column: column.into(),
            operator: op,
            value: value.into(),
        };
        self.with(condition, Conjunction::And, false)
    }

    // Full text

    /// Full-text match over `columns`.
    #[must_use]
    pub fn and_full_text<C: Into<String>>(
        self,
        columns: impl IntoIterator<Item = C>,
        value: impl Into<String>,
        options: FullTextOptions,
    ) -> Self {
        self.with(full_text_condition(columns, value, options), Conjunction::And, false)
    }

    /// `OR` full-text match over `columns`.
    #[must_use]
    pub fn or_full_text<C: Into<String>>(
        self,
        columns: impl IntoIterator<Item = C>,
        value: impl Into<String>,
        options: FullTextOptions,
    ) -> Self {
        self.with(full_text_condition(columns, value, options), Conjunction::Or, false)
    }
}

pub(crate) fn value_condition(
    column: impl Into<String>,
    operator: Operator,
    value: impl Into<Operand>,
) -> Condition {
    let value = value.into();
    if matches!(value, Operand::Value(SqlValue::Null)) {
        match operator {
            Operator::Eq => return null_condition(column, false),
            Operator::NotEq => return null_condition(column, true),
            _ => {}
        }
    }
    Condition::Value {
        column: column.into(),
        operator,
        value,
    }
}

pub(crate) fn column_condition(
    first: impl Into<String>,
    operator: Operator,
    second: impl Into<String>,
) -> Condition {
    Condition::Column {
        first: first.into(),
        operator,
        second: second.into(),
    }
}

pub(crate) fn raw_condition(sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Condition {
    Condition::Raw {
        sql: sql.into(),
        bindings,
    }
}

pub(crate) fn null_condition(column: impl Into<String>, not: bool) -> Condition {
    Condition::Null {
        column: column.into(),
        not,
    }
}

pub(crate) fn date_condition(
    column: impl Into<String>,
    part: DatePart,
    operator: Operator,
    value: impl Into<Operand>,
) -> Result<Condition> {
    Ok(Condition::Date {
        column: column.into(),
        part,
        operator,
        value: part.normalize(value.into())?,
    })
}

pub(crate) fn in_condition<I, V>(column: impl Into<String>, values: I, not: bool) -> Result<Condition>
where
    I: IntoIterator<Item = V>,
    V: Into<Operand>,
{
    let values: Vec<Operand> = values.into_iter().map(Into::into).collect();
    if values
        .iter()
        .any(|v| matches!(v, Operand::Value(SqlValue::Array(_))))
    {
        return Err(Error::construction(
            "IN predicate",
            "nested arrays may not be passed as IN values",
        ));
    }
    Ok(Condition::In {
        column: column.into(),
        values: InValues::List(values),
        not,
    })
}

pub(crate) fn between_condition(
    column: impl Into<String>,
    low: impl Into<Operand>,
    high: impl Into<Operand>,
    not: bool,
) -> Condition {
    Condition::Between {
        column: column.into(),
        low: low.into(),
        high: high.into(),
        not,
    }
}

pub(crate) fn row_values_condition<C, V>(
    columns: impl IntoIterator<Item = C>,
    operator: Operator,
    values: impl IntoIterator<Item = V>,
) -> Result<Condition>
where
    C: Into<String>,
    V: Into<Operand>,
{
    let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
    let values: Vec<Operand> = values.into_iter().map(Into::into).collect();
    if columns.is_empty() || columns.len() != values.len() {
        return Err(Error::construction(
            "row values predicate",
            format!(
                "{} columns cannot be compared with {} values",
                columns.len(),
                values.len()
            ),
        ));
    }
    Ok(Condition::RowValues {
        columns,
        operator,
        values,
    })
}

pub(crate) fn full_text_condition<C: Into<String>>(
    columns: impl IntoIterator<Item = C>,
    value: impl Into<String>,
    options: FullTextOptions,
) -> Condition {
    Condition::FullText {
        columns: columns.into_iter().map(Into::into).collect(),
        value: value.into(),
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_keep_insertion_order_and_flags() {
        let clause = ConditionClause::new()
            .and("a", Operator::Eq, 1)
            .or_not("b", Operator::Lt, 2)
            .and_null("c");
        let nodes = clause.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].conjunction, Conjunction::Or);
        assert!(nodes[1].negated);
        assert!(!nodes[2].negated);
    }

    #[test]
    fn test_bindings_follow_node_order() {
        let inner = ConditionClause::new().and("x", Operator::Eq, "inner");
        let clause = ConditionClause::new()
            .and("a", Operator::Eq, 1)
            .and_between("b", 2, 3)
            .and_condition_clause(inner)
            .and_column("c", Operator::Eq, "d");
        assert_eq!(
            clause.bindings(true),
            vec![
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3),
                SqlValue::Text("inner".into()),
            ]
        );
    }

    #[test]
    fn test_empty_nested_clause_is_dropped() {
        let clause = ConditionClause::new().and_condition_clause(ConditionClause::new());
        assert!(clause.is_empty());
    }

    #[test]
    fn test_nested_array_in_list_is_rejected() {
        let values = vec![SqlValue::Int(1), SqlValue::Array(vec![SqlValue::Int(2)])];
        let err = ConditionClause::new().and_in("a", values).unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
    }

    #[test]
    fn test_row_values_arity_is_checked() {
        let err = ConditionClause::new()
            .and_row_values(["a", "b"], Operator::Eq, [1])
            .unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
    }

    #[test]
    fn test_raw_operands_do_not_bind() {
        let clause =
            ConditionClause::new().and("created_at", Operator::Lt, crate::raw("NOW()"));
        assert!(clause.bindings(true).is_empty());
    }
}
