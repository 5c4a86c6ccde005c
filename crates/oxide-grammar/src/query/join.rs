//! JOIN clauses.

use crate::condition::{ConditionClause, Conjunction};
use crate::operator::Operator;
use crate::query::QueryBuilder;
use crate::value::{Operand, SqlValue};

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `CROSS JOIN`
    Cross,
}

impl JoinType {
    /// Returns the SQL keyword(s) preceding `JOIN`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Cross => "CROSS",
        }
    }
}

/// What a join attaches.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinTarget {
    /// A table, optionally aliased with `"table as alias"`.
    Table(String),
    /// A derived table.
    Sub {
        /// The subquery.
        query: Box<QueryBuilder>,
        /// Its alias.
        alias: String,
    },
}

/// A single join with its ON predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub(crate) join_type: JoinType,
    pub(crate) target: JoinTarget,
    pub(crate) lateral: bool,
    pub(crate) on: ConditionClause,
}

impl JoinClause {
    /// Creates a join against a table.
    #[must_use]
    pub fn new(join_type: JoinType, table: impl Into<String>) -> Self {
        Self {
            join_type,
            target: JoinTarget::Table(table.into()),
            lateral: false,
            on: ConditionClause::new(),
        }
    }

    /// Creates a join against a derived table.
    #[must_use]
    pub fn sub(join_type: JoinType, query: QueryBuilder, alias: impl Into<String>) -> Self {
        Self {
            join_type,
            target: JoinTarget::Sub {
                query: Box::new(query),
                alias: alias.into(),
            },
            lateral: false,
            on: ConditionClause::new(),
        }
    }

    /// Creates a lateral join against a derived table.
    #[must_use]
    pub fn lateral(join_type: JoinType, query: QueryBuilder, alias: impl Into<String>) -> Self {
        let mut join = Self::sub(join_type, query, alias);
        join.lateral = true;
        join
    }

    /// Join kind.
    #[must_use]
    pub const fn join_type(&self) -> JoinType {
        self.join_type
    }

    /// Joined table or subquery.
    #[must_use]
    pub const fn target(&self) -> &JoinTarget {
        &self.target
    }

    /// Returns `true` for lateral joins.
    #[must_use]
    pub const fn is_lateral(&self) -> bool {
        self.lateral
    }

    /// The ON predicates.
    #[must_use]
    pub const fn conditions(&self) -> &ConditionClause {
        &self.on
    }

    /// `ON first op second`
    #[must_use]
    pub fn on(mut self, first: impl Into<String>, op: Operator, second: impl Into<String>) -> Self {
        self.on.push(
            crate::condition::column_condition(first, op, second),
            Conjunction::And,
            false,
        );
        self
    }

    /// `OR first op second`
    #[must_use]
    pub fn or_on(mut self, first: impl Into<String>, op: Operator, second: impl Into<String>) -> Self {
        self.on.push(
            crate::condition::column_condition(first, op, second),
            Conjunction::Or,
            false,
        );
        self
    }

    /// `AND column op value`, binding `value`.
    #[must_use]
    pub fn where_(mut self, column: impl Into<String>, op: Operator, value: impl Into<Operand>) -> Self {
        self.on.push(
            crate::condition::value_condition(column, op, value),
            Conjunction::And,
            false,
        );
        self
    }

    /// `OR column op value`, binding `value`.
    #[must_use]
    pub fn or_where(
        mut self,
        column: impl Into<String>,
        op: Operator,
        value: impl Into<Operand>,
    ) -> Self {
        self.on.push(
            crate::condition::value_condition(column, op, value),
            Conjunction::Or,
            false,
        );
        self
    }

    /// `AND column IS NULL`
    #[must_use]
    pub fn where_null(mut self, column: impl Into<String>) -> Self {
        self.on
            .push(crate::condition::null_condition(column, false), Conjunction::And, false);
        self
    }

    /// Replaces the ON predicates with a prebuilt clause.
    #[must_use]
    pub fn on_clause(mut self, clause: ConditionClause) -> Self {
        self.on = clause;
        self
    }

    /// Values bound by the join: subquery first, then ON predicates.
    #[must_use]
    pub fn bindings(&self, window_group_limit: bool) -> Vec<SqlValue> {
        let mut out = match &self.target {
            JoinTarget::Sub { query, .. } => query.get_bindings(window_group_limit),
            JoinTarget::Table(_) => Vec::new(),
        };
        out.extend(self.on.bindings(window_group_limit));
        out
    }
}
