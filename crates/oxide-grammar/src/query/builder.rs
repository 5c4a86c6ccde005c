//! Fluent construction of the query AST.

use crate::condition::{
    self, Condition, ConditionClause, Conjunction, DatePart, FullTextOptions, InValues, Subquery,
};
use crate::error::Result;
use crate::expression::Expression;
use crate::grammar::Grammar;
use crate::operator::Operator;
use crate::value::{Operand, SqlValue};

use super::bindings::{BindingType, Bindings};
use super::join::{JoinClause, JoinType};
use super::{
    Aggregate, AggregateFunction, CompiledQuery, Direction, Distinct, FromSource, GroupLimit,
    IndexHint, IndexHintType, Lock, OrderBy, Selectable, Union,
};

/// A statement under construction.
///
/// Setters consume and return the builder; nothing is compiled until a
/// grammar is asked to. Compiling never mutates the builder, so the same
/// AST always produces the same SQL.
///
/// ```rust
/// use oxide_grammar::{Grammar, Operator, PostgresGrammar, QueryBuilder};
///
/// let query = QueryBuilder::table("users")
///     .where_("active", Operator::Eq, true)
///     .order_by_desc("created_at")
///     .limit(10);
/// let compiled = PostgresGrammar::new().compile_select(&query).unwrap();
/// assert_eq!(
///     compiled.sql,
///     r#"SELECT * FROM "users" WHERE "active" = ? ORDER BY "created_at" DESC LIMIT 10"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryBuilder {
    pub(crate) aggregate: Option<Aggregate>,
    pub(crate) columns: Vec<Selectable>,
    pub(crate) distinct: Distinct,
    pub(crate) from: Option<FromSource>,
    pub(crate) index_hint: Option<IndexHint>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) wheres: ConditionClause,
    pub(crate) groups: Vec<Selectable>,
    pub(crate) havings: ConditionClause,
    pub(crate) orders: Vec<OrderBy>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) group_limit: Option<GroupLimit>,
    pub(crate) unions: Vec<Union>,
    pub(crate) union_orders: Vec<OrderBy>,
    pub(crate) union_limit: Option<u64>,
    pub(crate) union_offset: Option<u64>,
    pub(crate) lock: Option<Lock>,
}

impl QueryBuilder {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query selecting from `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self::new().from(table)
    }

    /// Compiles the query as a SELECT with `grammar`.
    ///
    /// # Errors
    ///
    /// Propagates grammar errors; see [`Grammar::compile_select`].
    pub fn to_sql(&self, grammar: &dyn Grammar) -> Result<CompiledQuery> {
        grammar.compile_select(self)
    }

    /// Compiles the query and inlines every binding as an escaped literal.
    ///
    /// # Errors
    ///
    /// Propagates compile and escape errors.
    pub fn to_raw_sql(&self, grammar: &dyn Grammar) -> Result<String> {
        let compiled = grammar.compile_select(self)?;
        grammar.substitute_bindings(&compiled.sql, &compiled.bindings)
    }

    // Accessors

    /// The FROM source.
    #[must_use]
    pub const fn from_source(&self) -> Option<&FromSource> {
        self.from.as_ref()
    }

    /// Row limit.
    #[must_use]
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// Row offset.
    #[must_use]
    pub const fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// WHERE predicates.
    #[must_use]
    pub const fn wheres(&self) -> &ConditionClause {
        &self.wheres
    }

    /// HAVING predicates.
    #[must_use]
    pub const fn havings(&self) -> &ConditionClause {
        &self.havings
    }

    /// Joins in declaration order.
    #[must_use]
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    /// Bound values partitioned by clause category.
    ///
    /// `window_group_limit` tells whether the compiling grammar turns group
    /// limits into `ROW_NUMBER()`, which decides how nested queries flatten.
    #[must_use]
    pub fn raw_bindings(&self, window_group_limit: bool) -> Bindings {
        let mut bindings = Bindings::new();
        let mut select = Vec::new();
        for column in &self.columns {
            column.push_bindings(&mut select, window_group_limit);
        }
        bindings.extend(BindingType::Select, select);

        match &self.from {
            Some(FromSource::Raw(_, values)) => bindings.extend(BindingType::From, values.clone()),
            Some(FromSource::Sub { query, .. }) => {
                bindings.extend(BindingType::From, query.get_bindings(window_group_limit));
            }
            Some(FromSource::Table(_)) | None => {}
        }

        for join in &self.joins {
            bindings.extend(BindingType::Join, join.bindings(window_group_limit));
        }
        bindings.extend(BindingType::Where, self.wheres.bindings(window_group_limit));

        let mut groups = Vec::new();
        for group in &self.groups {
            group.push_bindings(&mut groups, window_group_limit);
        }
        bindings.extend(BindingType::GroupBy, groups);
        bindings.extend(BindingType::Having, self.havings.bindings(window_group_limit));

        let mut orders = Vec::new();
        for order in &self.orders {
            order.push_bindings(&mut orders);
        }
        bindings.extend(BindingType::Order, orders);

        for union in &self.unions {
            bindings.extend(BindingType::Union, union.query.get_bindings(window_group_limit));
        }
        let mut union_orders = Vec::new();
        for order in &self.union_orders {
            order.push_bindings(&mut union_orders);
        }
        bindings.extend(BindingType::UnionOrder, union_orders);
        bindings
    }

    /// Order in which the buckets are flattened.
    #[must_use]
    pub fn binding_order(&self, window_group_limit: bool) -> &'static [BindingType] {
        if self.group_limit.is_some() && window_group_limit {
            &BindingType::WINDOW_GROUP_LIMIT_ORDER
        } else {
            &BindingType::DEFAULT_ORDER
        }
    }

    /// Bound values in the order their placeholders appear.
    #[must_use]
    pub fn get_bindings(&self, window_group_limit: bool) -> Vec<SqlValue> {
        self.raw_bindings(window_group_limit)
            .flatten(self.binding_order(window_group_limit))
    }

    // Source

    /// Sets the FROM table (`"table"` or `"table as alias"`).
    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.from = Some(FromSource::Table(table.into()));
        self
    }

    /// Uses raw SQL as the FROM source.
    #[must_use]
    pub fn from_raw(mut self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.from = Some(FromSource::Raw(sql.into(), bindings));
        self
    }

    /// Selects from a derived table.
    #[must_use]
    pub fn from_sub(mut self, query: Self, alias: impl Into<String>) -> Self {
        self.from = Some(FromSource::Sub {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    // Select list

    /// Replaces the select list.
    #[must_use]
    pub fn select<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns = columns
            .into_iter()
            .map(|c| Selectable::Column(c.into()))
            .collect();
        self
    }

    /// Appends to the select list.
    #[must_use]
    pub fn add_select<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns
            .extend(columns.into_iter().map(|c| Selectable::Column(c.into())));
        self
    }

    /// Appends a raw select expression.
    #[must_use]
    pub fn select_raw(mut self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.columns.push(Selectable::Raw(sql.into(), bindings));
        self
    }

    /// Appends a scalar subselect.
    #[must_use]
    pub fn select_sub(mut self, query: Self, alias: impl Into<String>) -> Self {
        self.columns.push(Selectable::Sub {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    /// `SELECT DISTINCT`
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = Distinct::All;
        self
    }

    /// `SELECT DISTINCT ON (...)` where supported.
    #[must_use]
    pub fn distinct_on<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.distinct = Distinct::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a `USE INDEX` hint.
    #[must_use]
    pub fn use_index(self, index: impl Into<String>) -> Self {
        self.index_hint(IndexHintType::Use, index)
    }

    /// Adds a `FORCE INDEX` hint.
    #[must_use]
    pub fn force_index(self, index: impl Into<String>) -> Self {
        self.index_hint(IndexHintType::Force, index)
    }

    /// Adds an `IGNORE INDEX` hint.
    #[must_use]
    pub fn ignore_index(self, index: impl Into<String>) -> Self {
        self.index_hint(IndexHintType::Ignore, index)
    }

    fn index_hint(mut self, kind: IndexHintType, index: impl Into<String>) -> Self {
        self.index_hint = Some(IndexHint {
            kind,
            index: index.into(),
        });
        self
    }

    // Joins

    /// Adds a prebuilt join.
    #[must_use]
    pub fn join_clause(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    /// `INNER JOIN table ON first op second`
    #[must_use]
    pub fn join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.join_clause(JoinClause::new(JoinType::Inner, table).on(first, op, second))
    }

    /// `LEFT JOIN table ON first op second`
    #[must_use]
    pub fn left_join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.join_clause(JoinClause::new(JoinType::Left, table).on(first, op, second))
    }

    /// `RIGHT JOIN table ON first op second`
    #[must_use]
    pub fn right_join(
        self,
        table: impl Into<String>,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.join_clause(JoinClause::new(JoinType::Right, table).on(first, op, second))
    }

    /// `CROSS JOIN table`
    #[must_use]
    pub fn cross_join(self, table: impl Into<String>) -> Self {
        self.join_clause(JoinClause::new(JoinType::Cross, table))
    }

    /// `INNER JOIN (query) AS alias ON first op second`
    #[must_use]
    pub fn join_sub(
        self,
        query: Self,
        alias: impl Into<String>,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.join_clause(JoinClause::sub(JoinType::Inner, query, alias).on(first, op, second))
    }

    /// `LEFT JOIN (query) AS alias ON first op second`
    #[must_use]
    pub fn left_join_sub(
        self,
        query: Self,
        alias: impl Into<String>,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.join_clause(JoinClause::sub(JoinType::Left, query, alias).on(first, op, second))
    }

    /// Lateral inner join against a correlated subquery.
    #[must_use]
    pub fn join_lateral(self, query: Self, alias: impl Into<String>) -> Self {
        self.join_clause(JoinClause::lateral(JoinType::Inner, query, alias))
    }

    /// Lateral left join against a correlated subquery.
    #[must_use]
    pub fn left_join_lateral(self, query: Self, alias: impl Into<String>) -> Self {
        self.join_clause(JoinClause::lateral(JoinType::Left, query, alias))
    }

    // WHERE

    fn add_where(mut self, condition: Condition, conjunction: Conjunction, negated: bool) -> Self {
        self.wheres.push(condition, conjunction, negated);
        self
    }

    /// `WHERE column op value`
    #[must_use]
    pub fn where_(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.add_where(condition::value_condition(column, op, value), Conjunction::And, false)
    }

    /// `WHERE column = value`
    #[must_use]
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.where_(column, Operator::Eq, value)
    }

    /// `OR column op value`
    #[must_use]
    pub fn or_where(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.add_where(condition::value_condition(column, op, value), Conjunction::Or, false)
    }

    /// `AND NOT column op value`
    #[must_use]
    pub fn where_not(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.add_where(condition::value_condition(column, op, value), Conjunction::And, true)
    }

    /// `OR NOT column op value`
    #[must_use]
    pub fn or_where_not(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Self {
        self.add_where(condition::value_condition(column, op, value), Conjunction::Or, true)
    }

    /// `WHERE first op second`
    #[must_use]
    pub fn where_column(
        self,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.add_where(condition::column_condition(first, op, second), Conjunction::And, false)
    }

    /// `OR first op second`
    #[must_use]
    pub fn or_where_column(
        self,
        first: impl Into<String>,
        op: Operator,
        second: impl Into<String>,
    ) -> Self {
        self.add_where(condition::column_condition(first, op, second), Conjunction::Or, false)
    }

    /// `WHERE <sql>`
    #[must_use]
    pub fn where_raw(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.add_where(condition::raw_condition(sql, bindings), Conjunction::And, false)
    }

    /// `OR <sql>`
    #[must_use]
    pub fn or_where_raw(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.add_where(condition::raw_condition(sql, bindings), Conjunction::Or, false)
    }

    /// `WHERE ( clause )`
    #[must_use]
    pub fn where_clause(mut self, clause: ConditionClause) -> Self {
        self.wheres = std::mem::take(&mut self.wheres).and_condition_clause(clause);
        self
    }

    /// `OR ( clause )`
    #[must_use]
    pub fn or_where_clause(mut self, clause: ConditionClause) -> Self {
        self.wheres = std::mem::take(&mut self.wheres).or_condition_clause(clause);
        self
    }

    /// `AND NOT ( clause )`
    #[must_use]
    pub fn where_not_clause(mut self, clause: ConditionClause) -> Self {
        self.wheres = std::mem::take(&mut self.wheres).and_condition_clause_not(clause);
        self
    }

    /// `WHERE EXISTS ( query )`
    #[must_use]
    pub fn where_exists(self, query: impl Into<Subquery>) -> Self {
        self.add_where(Condition::Exists(query.into()), Conjunction::And, false)
    }

    /// `OR EXISTS ( query )`
    #[must_use]
    pub fn or_where_exists(self, query: impl Into<Subquery>) -> Self {
        self.add_where(Condition::Exists(query.into()), Conjunction::Or, false)
    }

    /// `WHERE NOT EXISTS ( query )`
    #[must_use]
    pub fn where_not_exists(self, query: impl Into<Subquery>) -> Self {
        self.add_where(Condition::Exists(query.into()), Conjunction::And, true)
    }

    /// `WHERE column IS NULL`
    #[must_use]
    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.add_where(condition::null_condition(column, false), Conjunction::And, false)
    }

    /// `OR column IS NULL`
    #[must_use]
    pub fn or_where_null(self, column: impl Into<String>) -> Self {
        self.add_where(condition::null_condition(column, false), Conjunction::Or, false)
    }

    /// `WHERE column IS NOT NULL`
    #[must_use]
    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.add_where(condition::null_condition(column, true), Conjunction::And, false)
    }

    /// `OR column IS NOT NULL`
    #[must_use]
    pub fn or_where_not_null(self, column: impl Into<String>) -> Self {
        self.add_where(condition::null_condition(column, true), Conjunction::Or, false)
    }

    /// Compares a date component of `column`.
    ///
    /// # Errors
    ///
    /// Returns a construction error when `value` is not a valid `part`.
    pub fn where_date_part(
        self,
        column: impl Into<String>,
        part: DatePart,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        let condition = condition::date_condition(column, part, op, value)?;
        Ok(self.add_where(condition, Conjunction::And, false))
    }

    /// `OR` variant of [`QueryBuilder::where_date_part`].
    ///
    /// # Errors
    ///
    /// Returns a construction error when `value` is not a valid `part`.
    pub fn or_where_date_part(
        self,
        column: impl Into<String>,
        part: DatePart,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        let condition = condition::date_condition(column, part, op, value)?;
        Ok(self.add_where(condition, Conjunction::Or, false))
    }

    /// Compares the date of `column` (`YYYY-MM-DD`).
    ///
    /// # Errors
    ///
    /// Returns a construction error for unparseable dates.
    pub fn where_date(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_date_part(column, DatePart::Date, op, value)
    }

    /// Compares the time of `column` (`HH:MM:SS`).
    ///
    /// # Errors
    ///
    /// Returns a construction error for unparseable times.
    pub fn where_time(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_date_part(column, DatePart::Time, op, value)
    }

    /// Compares the day of month of `column`.
    ///
    /// # Errors
    ///
    /// Returns a construction error for days outside 1..=31.
    pub fn where_day(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_date_part(column, DatePart::Day, op, value)
    }

    /// Compares the month of `column`.
    ///
    /// # Errors
    ///
    /// Returns a construction error for months outside 1..=12.
    pub fn where_month(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_date_part(column, DatePart::Month, op, value)
    }

    /// Compares the year of `column`.
    ///
    /// # Errors
    ///
    /// Returns a construction error for non-numeric years.
    pub fn where_year(
        self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        self.where_date_part(column, DatePart::Year, op, value)
    }

    /// `WHERE column IN (...)`
    ///
    /// # Errors
    ///
    /// Returns a construction error if a value is itself an array.
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let condition = condition::in_condition(column, values, false)?;
        Ok(self.add_where(condition, Conjunction::And, false))
    }

    /// `OR column IN (...)`
    ///
    /// # Errors
    ///
    /// Returns a construction error if a value is itself an array.
    pub fn or_where_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let condition = condition::in_condition(column, values, false)?;
        Ok(self.add_where(condition, Conjunction::Or, false))
    }

    /// `WHERE column NOT IN (...)`
    ///
    /// # Errors
    ///
    /// Returns a construction error if a value is itself an array.
    pub fn where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Operand>,
    {
        let condition = condition::in_condition(column, values, true)?;
        Ok(self.add_where(condition, Conjunction::And, false))
    }

    /// `WHERE column IN (subquery)`
    #[must_use]
    pub fn where_in_sub(self, column: impl Into<String>, query: impl Into<Subquery>) -> Self {
        let condition = Condition::In {
            column: column.into(),
            values: InValues::Query(query.into()),
            not: false,
        };
        self.add_where(condition, Conjunction::And, false)
    }

    /// `WHERE column NOT IN (subquery)`
    #[must_use]
    pub fn where_not_in_sub(self, column: impl Into<String>, query: impl Into<Subquery>) -> Self {
        let condition = Condition::In {
            column: column.into(),
            values: InValues::Query(query.into()),
            not: true,
        };
        self.add_where(condition, Conjunction::And, false)
    }

    /// `WHERE column BETWEEN low AND high`
    #[must_use]
    pub fn where_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        let condition = condition::between_condition(column, low, high, false);
        self.add_where(condition, Conjunction::And, false)
    }

    /// `OR column BETWEEN low AND high`
    #[must_use]
    pub fn or_where_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        let condition = condition::between_condition(column, low, high, false);
        self.add_where(condition, Conjunction::Or, false)
    }

    /// `WHERE column NOT BETWEEN low AND high`
    #[must_use]
    pub fn where_not_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        let condition = condition::between_condition(column, low, high, true);
        self.add_where(condition, Conjunction::And, false)
    }

    /// `WHERE column BETWEEN low_column AND high_column`
    #[must_use]
    pub fn where_between_columns(
        self,
        column: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        let condition = Condition::BetweenColumns {
            column: column.into(),
            low: low.into(),
            high: high.into(),
            not: false,
        };
        self.add_where(condition, Conjunction::And, false)
    }

    /// `WHERE column op (subquery)`
    #[must_use]
    pub fn where_sub(self, column: impl Into<String>, op: Operator, query: impl Into<Subquery>) -> Self {
        let condition = Condition::Sub {
            column: column.into(),
            operator: op,
            query: query.into(),
        };
        self.add_where(condition, Conjunction::And, false)
    }

    /// `WHERE (a, b) op (?, ?)`
    ///
    /// # Errors
    ///
    /// Returns a construction error when column and value counts differ.
    pub fn where_row_values<C, V>(
        self,
        columns: impl IntoIterator<Item = C>,
        op: Operator,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self>
    where
        C: Into<String>,
        V: Into<Operand>,
    {
        let condition = condition::row_values_condition(columns, op, values)?;
        Ok(self.add_where(condition, Conjunction::And, false))
    }

    /// JSON document containment.
    #[must_use]
    pub fn where_json_contains(self, column: impl Into<String>, value: serde_json::Value) -> Self {
        let condition = Condition::JsonContains {
            column: column.into(),
            value,
        };
        self.add_where(condition, Conjunction::And, false)
    }

    /// Negated JSON document containment.
    #[must_use]
    pub fn where_json_doesnt_contain(
        self,
        column: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        let condition = Condition::JsonContains {
            column: column.into(),
            value,
        };
        self.add_where(condition, Conjunction::And, true)
    }

    /// JSON key presence; `column` ends with the key (`meta->tags`).
    #[must_use]
    pub fn where_json_contains_key(self, column: impl Into<String>) -> Self {
        let condition = Condition::JsonContainsKey {
            column: column.into(),
        };
        self.add_where(condition, Conjunction::And, false)
    }

    /// Negated JSON key presence.
    #[must_use]
    pub fn where_json_doesnt_contain_key(self, column: impl Into<String>) -> Self {
        let condition = Condition::JsonContainsKey {
            column: column.into(),
        };
        self.add_where(condition, Conjunction::And, true)
    }

    /// JSON array length comparison.
    #[must_use]
    pub fn where_json_length(
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
        self.add_where(condition, Conjunction::And, false)
    }

    /// Full-text match.
    #[must_use]
    pub fn where_full_text<C: Into<String>>(
        self,
        columns: impl IntoIterator<Item = C>,
        value: impl Into<String>,
        options: FullTextOptions,
    ) -> Self {
        let condition = condition::full_text_condition(columns, value, options);
        self.add_where(condition, Conjunction::And, false)
    }

    /// `OR` full-text match.
    #[must_use]
    pub fn or_where_full_text<C: Into<String>>(
        self,
        columns: impl IntoIterator<Item = C>,
        value: impl Into<String>,
        options: FullTextOptions,
    ) -> Self {
        let condition = condition::full_text_condition(columns, value, options);
        self.add_where(condition, Conjunction::Or, false)
    }

    // GROUP BY / HAVING

    /// Appends GROUP BY columns.
    #[must_use]
    pub fn group_by<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.groups
            .extend(columns.into_iter().map(|c| Selectable::Column(c.into())));
        self
    }

    /// Appends a raw GROUP BY expression.
    #[must_use]
    pub fn group_by_raw(mut self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.groups.push(Selectable::Raw(sql.into(), bindings));
        self
    }

    fn add_having(mut self, condition: Condition, conjunction: Conjunction, negated: bool) -> Self {
        self.havings.push(condition, conjunction, negated);
        self
    }

    /// `HAVING column op value`
    #[must_use]
    pub fn having(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.add_having(condition::value_condition(column, op, value), Conjunction::And, false)
    }

    /// `OR column op value` in HAVING.
    #[must_use]
    pub fn or_having(self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.add_having(condition::value_condition(column, op, value), Conjunction::Or, false)
    }

    /// `HAVING <sql>`
    #[must_use]
    pub fn having_raw(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.add_having(condition::raw_condition(sql, bindings), Conjunction::And, false)
    }

    /// `OR <sql>` in HAVING.
    #[must_use]
    pub fn or_having_raw(self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        self.add_having(condition::raw_condition(sql, bindings), Conjunction::Or, false)
    }

    /// `HAVING column IS NULL`
    #[must_use]
    pub fn having_null(self, column: impl Into<String>) -> Self {
        self.add_having(condition::null_condition(column, false), Conjunction::And, false)
    }

    /// `HAVING column IS NOT NULL`
    #[must_use]
    pub fn having_not_null(self, column: impl Into<String>) -> Self {
        self.add_having(condition::null_condition(column, true), Conjunction::And, false)
    }

    /// `HAVING column BETWEEN low AND high`
    #[must_use]
    pub fn having_between(
        self,
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        let condition = condition::between_condition(column, low, high, false);
        self.add_having(condition, Conjunction::And, false)
    }

    /// `HAVING ( clause )`
    #[must_use]
    pub fn having_clause(mut self, clause: ConditionClause) -> Self {
        self.havings = std::mem::take(&mut self.havings).and_condition_clause(clause);
        self
    }

    // ORDER BY

    /// Appends an ORDER BY column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        let order = OrderBy::Column {
            column: column.into(),
            direction,
        };
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Appends a descending ORDER BY column.
    #[must_use]
    pub fn order_by_desc(self, column: impl Into<String>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Newest first by `column`.
    #[must_use]
    pub fn latest(self, column: impl Into<String>) -> Self {
        self.order_by(column, Direction::Desc)
    }

    /// Oldest first by `column`.
    #[must_use]
    pub fn oldest(self, column: impl Into<String>) -> Self {
        self.order_by(column, Direction::Asc)
    }

    /// Appends a raw ORDER BY expression.
    #[must_use]
    pub fn order_by_raw(mut self, sql: impl Into<Expression>, bindings: Vec<SqlValue>) -> Self {
        let order = OrderBy::Raw(sql.into(), bindings);
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Orders rows randomly.
    #[must_use]
    pub fn in_random_order(mut self, seed: Option<u64>) -> Self {
        let order = OrderBy::Random(seed);
        if self.unions.is_empty() {
            self.orders.push(order);
        } else {
            self.union_orders.push(order);
        }
        self
    }

    /// Drops every ORDER BY entry.
    #[must_use]
    pub fn reorder(mut self) -> Self {
        self.orders.clear();
        self.union_orders.clear();
        self
    }

    // Pagination

    /// Caps the number of rows.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        if self.unions.is_empty() {
            self.limit = Some(limit);
        } else {
            self.union_limit = Some(limit);
        }
        self
    }

    /// Alias for [`QueryBuilder::limit`].
    #[must_use]
    pub fn take(self, limit: u64) -> Self {
        self.limit(limit)
    }

    /// Skips rows.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        if self.unions.is_empty() {
            self.offset = Some(offset);
        } else {
            self.union_offset = Some(offset);
        }
        self
    }

    /// Alias for [`QueryBuilder::offset`].
    #[must_use]
    pub fn skip(self, offset: u64) -> Self {
        self.offset(offset)
    }

    /// Sets limit and offset for a one-based page.
    #[must_use]
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        self.offset(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page)
    }

    /// Keeps at most `value` rows per distinct `column`.
    #[must_use]
    pub fn group_limit(mut self, value: u64, column: impl Into<String>) -> Self {
        self.group_limit = Some(GroupLimit {
            value,
            column: column.into(),
        });
        self
    }

    // Unions

    /// `UNION (query)`
    #[must_use]
    pub fn union(mut self, query: Self) -> Self {
        self.unions.push(Union {
            query: Box::new(query),
            all: false,
        });
        self
    }

    /// `UNION ALL (query)`
    #[must_use]
    pub fn union_all(mut self, query: Self) -> Self {
        self.unions.push(Union {
            query: Box::new(query),
            all: true,
        });
        self
    }

    // Locking

    /// Exclusive row lock.
    #[must_use]
    pub fn lock_for_update(mut self) -> Self {
        self.lock = Some(Lock::Update);
        self
    }

    /// Shared row lock.
    #[must_use]
    pub fn shared_lock(mut self) -> Self {
        self.lock = Some(Lock::Shared);
        self
    }

    /// Raw lock clause.
    #[must_use]
    pub fn lock(mut self, lock: Lock) -> Self {
        self.lock = Some(lock);
        self
    }

    // Aggregates

    /// Marks the query as an aggregate over `columns`.
    #[must_use]
    pub fn set_aggregate<C: Into<String>>(
        mut self,
        function: AggregateFunction,
        columns: impl IntoIterator<Item = C>,
    ) -> Self {
        self.aggregate = Some(Aggregate {
            function,
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Clones the query into an aggregate query.
    ///
    /// Select columns are dropped unless the query has unions or havings,
    /// and ordering is dropped unless it is grouped.
    #[must_use]
    pub fn to_aggregate<C: Into<String>>(
        &self,
        function: AggregateFunction,
        columns: impl IntoIterator<Item = C>,
    ) -> Self {
        let mut query = self.clone();
        if query.unions.is_empty() && query.havings.is_empty() {
            query.columns.clear();
        }
        if query.groups.is_empty() {
            query.orders.clear();
        }
        query.set_aggregate(function, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_after_union_targets_the_union() {
        let query = QueryBuilder::table("a")
            .union(QueryBuilder::table("b"))
            .order_by("id", Direction::Asc)
            .limit(5);
        assert!(query.orders.is_empty());
        assert_eq!(query.union_orders.len(), 1);
        assert_eq!(query.union_limit, Some(5));
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_random_order_after_union_targets_the_union() {
        let query = QueryBuilder::table("a")
            .in_random_order(None)
            .union(QueryBuilder::table("b"))
            .in_random_order(Some(7));
        assert_eq!(query.orders, vec![OrderBy::Random(None)]);
        assert_eq!(query.union_orders, vec![OrderBy::Random(Some(7))]);
    }

    #[test]
    fn test_raw_bindings_are_bucketed() {
        let query = QueryBuilder::table("t")
            .select_raw("? AS one", vec![SqlValue::Int(1)])
            .where_("a", Operator::Eq, 2)
            .having("b", Operator::Gt, 3)
            .order_by_raw("FIELD(id, ?)", vec![SqlValue::Int(4)]);
        let bindings = query.raw_bindings(true);
        assert_eq!(bindings.get(BindingType::Select), [SqlValue::Int(1)]);
        assert_eq!(bindings.get(BindingType::Where), [SqlValue::Int(2)]);
        assert_eq!(bindings.get(BindingType::Having), [SqlValue::Int(3)]);
        assert_eq!(bindings.get(BindingType::Order), [SqlValue::Int(4)]);
        assert_eq!(
            query.get_bindings(true),
            vec![
                SqlValue::Int(1),
                SqlValue::Int(2),
                SqlValue::Int(3),
                SqlValue::Int(4)
            ]
        );
    }

    #[test]
    fn test_window_group_limit_flattens_orders_after_select() {
        let query = QueryBuilder::table("t")
            .where_("a", Operator::Eq, 1)
            .order_by_raw("FIELD(x, ?)", vec![SqlValue::Int(2)])
            .group_limit(2, "user_id");
        assert_eq!(
            query.get_bindings(true),
            vec![SqlValue::Int(2), SqlValue::Int(1)]
        );
        assert_eq!(
            query.get_bindings(false),
            vec![SqlValue::Int(1), SqlValue::Int(2)]
        );

        let outer = QueryBuilder::table("users").where_in_sub("id", query);
        assert_eq!(
            outer.get_bindings(true),
            vec![SqlValue::Int(2), SqlValue::Int(1)]
        );
    }

    #[test]
    fn test_aggregate_clone_strips_columns_and_orders() {
        let query = QueryBuilder::table("t")
            .select(["a"])
            .order_by("a", Direction::Asc);
        let aggregate = query.to_aggregate(AggregateFunction::Count, ["*"]);
        assert!(aggregate.columns.is_empty());
        assert!(aggregate.orders.is_empty());
        assert_eq!(query.columns.len(), 1);
    }

    #[test]
    fn test_for_page() {
        let query = QueryBuilder::table("t").for_page(3, 15);
        assert_eq!(query.offset, Some(30));
        assert_eq!(query.limit, Some(15));
    }
}
