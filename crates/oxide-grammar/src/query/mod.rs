//! The query AST and its fluent builder.
//!
//! A [`QueryBuilder`] describes a statement without knowing which database
//! it targets. Compilation happens through a [`Grammar`](crate::Grammar),
//! which renders each component and returns a [`CompiledQuery`].

mod bindings;
mod builder;
mod execute;
mod join;
mod values;

pub use bindings::{BindingType, Bindings};
pub use builder::QueryBuilder;
pub use join::{JoinClause, JoinTarget, JoinType};
pub use values::{Record, Upsert, UpsertColumn, Values};

use crate::expression::Expression;
use crate::value::SqlValue;

/// SQL text plus the values for its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL with positional `?` placeholders.
    pub sql: String,
    /// One value per placeholder.
    pub bindings: Vec<SqlValue>,
}

impl CompiledQuery {
    /// Creates a compiled statement.
    #[must_use]
    pub fn new(sql: impl Into<String>, bindings: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }
}

/// An entry in the select list or GROUP BY.
#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    /// A column, optionally `"column as alias"`.
    Column(String),
    /// Raw SQL with bindings.
    Raw(Expression, Vec<SqlValue>),
    /// A scalar subselect with an alias.
    Sub {
        /// The subquery.
        query: Box<QueryBuilder>,
        /// Output column name.
        alias: String,
    },
}

impl Selectable {
    fn push_bindings(&self, out: &mut Vec<SqlValue>, window_group_limit: bool) {
        match self {
            Self::Column(_) => {}
            Self::Raw(_, bindings) => out.extend(bindings.iter().cloned()),
            Self::Sub { query, .. } => out.extend(query.get_bindings(window_group_limit)),
        }
    }
}

/// DISTINCT handling.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Distinct {
    /// No DISTINCT.
    #[default]
    Off,
    /// `SELECT DISTINCT`
    All,
    /// `SELECT DISTINCT ON (...)` on Postgres, plain DISTINCT elsewhere.
    Columns(Vec<String>),
}

/// The FROM source.
#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    /// A table, optionally `"table as alias"`.
    Table(String),
    /// Raw SQL with bindings.
    Raw(Expression, Vec<SqlValue>),
    /// A derived table.
    Sub {
        /// The subquery.
        query: Box<QueryBuilder>,
        /// Its alias.
        alias: String,
    },
}

impl FromSource {
    /// Table name when the source is a plain table.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Index hint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHintType {
    /// `USE INDEX`
    Use,
    /// `FORCE INDEX`
    Force,
    /// `IGNORE INDEX`
    Ignore,
}

/// An optimizer index hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHint {
    /// Hint kind.
    pub kind: IndexHintType,
    /// Comma separated index names.
    pub index: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    /// `column ASC|DESC`
    Column {
        /// Sorted column.
        column: String,
        /// Direction.
        direction: Direction,
    },
    /// Raw SQL with bindings.
    Raw(Expression, Vec<SqlValue>),
    /// Dialect random ordering, with an optional seed.
    Random(Option<u64>),
}

impl OrderBy {
    fn push_bindings(&self, out: &mut Vec<SqlValue>) {
        if let Self::Raw(_, bindings) = self {
            out.extend(bindings.iter().cloned());
        }
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// `COUNT`
    Count,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
}

impl AggregateFunction {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
        }
    }
}

/// Marks the select as an aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Function applied.
    pub function: AggregateFunction,
    /// Aggregated columns, `*` for all.
    pub columns: Vec<String>,
}

/// Per-partition row cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLimit {
    /// Rows kept per partition.
    pub value: u64,
    /// Partition column.
    pub column: String,
}

/// A unioned query.
#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    /// The other query.
    pub query: Box<QueryBuilder>,
    /// `UNION ALL` instead of `UNION`.
    pub all: bool,
}

/// Row lock mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lock {
    /// Exclusive lock (`FOR UPDATE`).
    Update,
    /// Shared lock.
    Shared,
    /// Raw lock clause.
    Raw(Expression),
}
