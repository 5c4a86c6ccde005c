//! Dialect compilers for query statements.
//!
//! The [`Grammar`] trait has one method per query component. Default
//! implementations produce the SQL shared by most engines; each dialect
//! overrides only the components where its syntax diverges. Every entry
//! point returns a [`CompiledQuery`] whose placeholder count has been
//! checked against its bindings.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;
pub use sqlserver::SqlServerGrammar;

use std::fmt;

use tracing::{debug, trace, warn};

use crate::condition::{
    Condition, ConditionClause, DatePart, FullTextOptions, InValues, Subquery,
};
use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::query::{
    BindingType, Bindings, CompiledQuery, Distinct, FromSource, GroupLimit, IndexHint, JoinClause,
    JoinTarget, Lock, OrderBy, QueryBuilder, Record, Selectable, Upsert, Values,
};
use crate::value::{Operand, SqlValue};

/// State shared by every grammar: identifier quotes, table prefix and the
/// server version used for feature gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseGrammar {
    open_quote: char,
    close_quote: char,
    table_prefix: String,
    version: Option<ServerVersion>,
}

impl BaseGrammar {
    /// Creates the shared state for a grammar quoting identifiers with
    /// `open` and `close`.
    #[must_use]
    pub const fn new(open: char, close: char) -> Self {
        Self {
            open_quote: open,
            close_quote: close,
            table_prefix: String::new(),
            version: None,
        }
    }

    /// Table prefix.
    #[must_use]
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Server version, when known.
    #[must_use]
    pub const fn version(&self) -> Option<&ServerVersion> {
        self.version.as_ref()
    }

    /// Returns `true` when the server is known to be older than the given
    /// version. An unknown version is treated as current.
    #[must_use]
    pub fn older_than(&self, major: u32, minor: u32, patch: u32) -> bool {
        self.version
            .as_ref()
            .is_some_and(|v| !v.at_least(major, minor, patch))
    }

    /// Returns `true` when the server is known to be MariaDB.
    #[must_use]
    pub fn is_mariadb(&self) -> bool {
        self.version.as_ref().is_some_and(|v| v.mariadb)
    }

    pub(crate) fn set_table_prefix(&mut self, prefix: String) {
        self.table_prefix = prefix;
    }

    pub(crate) fn set_version(&mut self, version: Option<ServerVersion>) {
        self.version = version;
    }

    /// Quotes a single identifier segment, doubling embedded close quotes.
    /// `*` is left bare.
    #[must_use]
    pub fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        let close = self.close_quote.to_string();
        let doubled = format!("{close}{close}");
        format!(
            "{}{}{}",
            self.open_quote,
            value.replace(&close, &doubled),
            self.close_quote
        )
    }

    /// Identifier quote characters.
    #[must_use]
    pub const fn quotes(&self) -> (char, char) {
        (self.open_quote, self.close_quote)
    }
}

/// Splits `"name as alias"` (case-insensitive) into its parts.
pub(crate) fn split_alias(value: &str) -> Option<(&str, &str)> {
    let lower = value.to_ascii_lowercase();
    let index = lower.find(" as ")?;
    Some((value[..index].trim(), value[index + 4..].trim()))
}

/// Alias of `"table as alias"`, or the table itself.
pub(crate) fn table_alias(table: &str) -> &str {
    split_alias(table).map_or(table, |(_, alias)| alias)
}

/// Splits `"column->a->b"` into the column and its path segments.
pub(crate) fn json_field_and_path(value: &str) -> (&str, Vec<&str>) {
    let mut parts = value.split("->");
    let field = parts.next().unwrap_or_default();
    (field, parts.filter(|p| !p.is_empty()).collect())
}

/// Renders path segments as a quoted JSON path literal: `'$."a"[0]."b"'`.
pub(crate) fn json_path(segments: &[&str]) -> String {
    let mut path = String::from("'$");
    for segment in segments {
        let (key, index) = match segment.find('[') {
            Some(pos) if segment.ends_with(']') => (&segment[..pos], &segment[pos..]),
            _ => (*segment, ""),
        };
        if !key.is_empty() {
            path.push_str(".\"");
            path.push_str(&key.replace('\'', "''").replace('"', "\\\""));
            path.push('"');
        }
        path.push_str(index);
    }
    path.push('\'');
    path
}

/// Single-quotes a string literal by doubling embedded quotes.
pub(crate) fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Compiles query ASTs for one SQL dialect.
pub trait Grammar: Send + Sync + fmt::Debug {
    /// Dialect name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Shared quoting, prefix and version state.
    fn base(&self) -> &BaseGrammar;

    /// Operators this dialect renders.
    fn operators(&self) -> &'static [Operator];

    /// Returns `true` when `op` can be rendered.
    fn supports_operator(&self, op: Operator) -> bool {
        self.operators().contains(&op)
    }

    /// Fails with [`Error::UnsupportedOperation`] for operators outside the
    /// dialect's vocabulary.
    fn check_operator(&self, op: Operator) -> Result<()> {
        if self.supports_operator(op) {
            Ok(())
        } else {
            Err(Error::unsupported(self.name(), format!("operator {op}")))
        }
    }

    // Identifiers

    /// Quotes a column reference: handles aliases, JSON selectors and
    /// dotted segments.
    fn wrap(&self, value: &str) -> String {
        if let Some((column, alias)) = split_alias(value) {
            return format!("{} AS {}", self.wrap(column), self.base().wrap_value(alias));
        }
        if value.contains("->") {
            return self.wrap_json_selector(value);
        }
        self.wrap_segments(value)
    }

    /// Quotes `table.column` segments; the first of several segments is a
    /// table and receives the prefix.
    fn wrap_segments(&self, value: &str) -> String {
        let segments: Vec<&str> = value.split('.').collect();
        if segments.len() == 1 {
            return self.base().wrap_value(value);
        }
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if i == 0 && segments.len() == 2 {
                    self.wrap_table(segment)
                } else {
                    self.base().wrap_value(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quotes a table name, applying the prefix to the table and its alias.
    fn wrap_table(&self, table: &str) -> String {
        let prefix = self.base().table_prefix();
        if let Some((name, alias)) = split_alias(table) {
            return format!(
                "{} AS {}",
                self.wrap_table(name),
                self.base().wrap_value(&format!("{prefix}{alias}"))
            );
        }
        match table.rsplit_once('.') {
            Some((schema, name)) => format!(
                "{}.{}",
                self.base().wrap_value(schema),
                self.base().wrap_value(&format!("{prefix}{name}"))
            ),
            None => self.base().wrap_value(&format!("{prefix}{table}")),
        }
    }

    /// Renders `column->path` as the dialect's JSON extraction.
    fn wrap_json_selector(&self, value: &str) -> String;

    /// Comma-separated quoted columns.
    fn columnize(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.wrap(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `?` for bound values, the SQL text for raw operands.
    fn parameter(&self, operand: &Operand) -> String {
        match operand {
            Operand::Value(_) => SqlValue::placeholder().to_string(),
            Operand::Raw(expr) => expr.as_str().to_string(),
        }
    }

    /// Comma-separated parameters.
    fn parameterize(&self, operands: &[Operand]) -> String {
        operands
            .iter()
            .map(|o| self.parameter(o))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // Literals

    /// Renders a value as an escaped SQL literal.
    ///
    /// # Errors
    ///
    /// Rejects strings containing NUL and non-finite floats.
    fn escape(&self, value: &SqlValue) -> Result<String> {
        match value {
            SqlValue::Null => Ok("NULL".to_string()),
            SqlValue::Bool(b) => Ok(self.escape_bool(*b)),
            SqlValue::Int(n) => Ok(n.to_string()),
            SqlValue::Float(f) => {
                if f.is_finite() {
                    Ok(format!("{f:?}"))
                } else {
                    Err(Error::construction(
                        "literal",
                        format!("{f} has no SQL representation"),
                    ))
                }
            }
            SqlValue::Text(s) => self.escape_string(s),
            SqlValue::Blob(bytes) => Ok(self.escape_blob(bytes)),
            SqlValue::Date(d) => self.escape_string(&d.format("%Y-%m-%d").to_string()),
            SqlValue::DateTime(dt) => self.escape_string(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            SqlValue::Json(json) => self.escape_string(&json.to_string()),
            SqlValue::Array(items) => self.escape_array(items),
        }
    }

    /// Quotes a string literal.
    ///
    /// # Errors
    ///
    /// Rejects strings containing NUL.
    fn escape_string(&self, value: &str) -> Result<String> {
        if value.contains('\0') {
            return Err(Error::construction(
                "literal",
                "strings may not contain NUL bytes",
            ));
        }
        Ok(quote_string(value))
    }

    /// Boolean literal.
    fn escape_bool(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    /// Binary literal.
    fn escape_blob(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex(bytes))
    }

    /// Array literal; JSON text unless the dialect has native arrays.
    ///
    /// # Errors
    ///
    /// See [`Grammar::escape_string`].
    fn escape_array(&self, items: &[SqlValue]) -> Result<String> {
        self.escape_string(&SqlValue::Array(items.to_vec()).to_json().to_string())
    }

    /// `true` when string literals treat backslash as an escape.
    fn backslash_escapes(&self) -> bool {
        false
    }

    /// Byte offsets of every `?` placeholder outside quoted strings and
    /// quoted identifiers.
    fn placeholder_positions(&self, sql: &str) -> Vec<usize> {
        let (open, close) = self.base().quotes();
        let backslash = self.backslash_escapes();
        let mut positions = Vec::new();
        let mut in_string = false;
        let mut in_identifier = false;
        let mut escaped = false;
        for (i, c) in sql.char_indices() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if backslash && c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    in_string = false;
                }
            } else if in_identifier {
                if c == close {
                    in_identifier = false;
                }
            } else if c == '\'' {
                in_string = true;
            } else if c == open {
                in_identifier = true;
            } else if c == '?' {
                positions.push(i);
            }
        }
        positions
    }

    /// Replaces every placeholder with its escaped binding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompileInvariant`] when counts differ, or an escape
    /// error.
    fn substitute_bindings(&self, sql: &str, bindings: &[SqlValue]) -> Result<String> {
        let positions = self.placeholder_positions(sql);
        if positions.len() != bindings.len() {
            return Err(Error::CompileInvariant {
                placeholders: positions.len(),
                bindings: bindings.len(),
            });
        }
        let mut out = String::with_capacity(sql.len());
        let mut last = 0;
        for (position, value) in positions.iter().zip(bindings) {
            out.push_str(&sql[last..*position]);
            out.push_str(&self.escape(value)?);
            last = position + 1;
        }
        out.push_str(&sql[last..]);
        Ok(out)
    }

    /// Checks the placeholder count and logs the statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompileInvariant`] on a count mismatch.
    fn finish(&self, sql: String, bindings: Vec<SqlValue>) -> Result<CompiledQuery> {
        let placeholders = self.placeholder_positions(&sql).len();
        if placeholders != bindings.len() {
            warn!(
                grammar = self.name(),
                sql = %sql,
                placeholders,
                bindings = bindings.len(),
                "placeholder count does not match bindings"
            );
            return Err(Error::CompileInvariant {
                placeholders,
                bindings: bindings.len(),
            });
        }
        debug!(grammar = self.name(), sql = %sql, bindings = ?bindings, "compiled statement");
        Ok(CompiledQuery::new(sql, bindings))
    }

    // SELECT

    /// Compiles a SELECT.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] for features the dialect
    /// lacks and [`Error::CompileInvariant`] on binding mismatches.
    fn compile_select(&self, query: &QueryBuilder) -> Result<CompiledQuery> {
        let sql = self.select_sql(query)?;
        let bindings = self.bindings_in_order(query);
        self.finish(sql, bindings)
    }

    /// Order in which binding buckets are flattened for `query`.
    fn binding_order(&self, query: &QueryBuilder) -> &'static [BindingType] {
        query.binding_order(self.uses_window_group_limit())
    }

    /// Bucketed values of `query`, with nested queries flattened the way
    /// this grammar compiles them.
    fn raw_bindings(&self, query: &QueryBuilder) -> Bindings {
        query.raw_bindings(self.uses_window_group_limit())
    }

    /// Every value `query` binds as a SELECT, in placeholder order.
    fn bindings_in_order(&self, query: &QueryBuilder) -> Vec<SqlValue> {
        self.raw_bindings(query).flatten(self.binding_order(query))
    }

    /// SELECT text without binding checks; used for subqueries.
    ///
    /// # Errors
    ///
    /// See [`Grammar::compile_select`].
    fn select_sql(&self, query: &QueryBuilder) -> Result<String> {
        if query.aggregate.is_some()
            && (!query.unions.is_empty()
                || !query.havings.is_empty()
                || query.group_limit.is_some())
        {
            return self.compile_wrapped_aggregate(query);
        }
        if let Some(limit) = &query.group_limit {
            return self.compile_group_limit(query, limit);
        }
        let mut sql = concatenate(&self.compile_components(query)?);
        if !query.unions.is_empty() {
            sql = format!("{} {}", self.wrap_union(&sql), self.compile_unions(query)?);
        }
        Ok(sql)
    }

    /// Every select component, in emission order, as `(name, sql)` pairs.
    ///
    /// # Errors
    ///
    /// See [`Grammar::compile_select`].
    fn compile_components(&self, query: &QueryBuilder) -> Result<Vec<(&'static str, String)>> {
        let mut components = vec![
            ("aggregate", self.compile_aggregate(query)),
            ("columns", self.compile_columns(query)?),
            ("from", self.compile_from(query)?),
            ("index_hint", self.compile_index_hint(query)),
            ("joins", self.compile_joins(&query.joins)?),
            ("wheres", self.compile_wheres(&query.wheres)?),
            ("groups", self.compile_groups(&query.groups)?),
            ("havings", self.compile_havings(&query.havings)?),
            ("orders", self.compile_orders(query)?),
        ];
        for piece in self.compile_pagination(query) {
            components.push(("pagination", piece));
        }
        components.push(("lock", self.compile_lock(query)));
        components.retain(|(_, sql)| !sql.is_empty());
        for (name, sql) in &components {
            trace!(component = name, sql = %sql, "compiled component");
        }
        Ok(components)
    }

    /// `SELECT fn(...) AS "aggregate"`
    fn compile_aggregate(&self, query: &QueryBuilder) -> String {
        let Some(aggregate) = &query.aggregate else {
            return String::new();
        };
        let mut column = if aggregate.columns.is_empty() {
            "*".to_string()
        } else {
            self.columnize(&aggregate.columns)
        };
        if query.distinct != Distinct::Off && column != "*" {
            column = format!("DISTINCT {column}");
        }
        format!(
            "SELECT {}({column}) AS {}",
            aggregate.function.as_sql(),
            self.base().wrap_value("aggregate")
        )
    }

    /// `SELECT` or `SELECT DISTINCT`, before the column list.
    fn compile_select_keyword(&self, query: &QueryBuilder) -> String {
        match query.distinct {
            Distinct::Off => "SELECT".to_string(),
            Distinct::All | Distinct::Columns(_) => "SELECT DISTINCT".to_string(),
        }
    }

    /// The select list; empty when the query is an aggregate.
    ///
    /// # Errors
    ///
    /// Propagates subselect errors.
    fn compile_columns(&self, query: &QueryBuilder) -> Result<String> {
        if query.aggregate.is_some() {
            return Ok(String::new());
        }
        let columns = if query.columns.is_empty() {
            "*".to_string()
        } else {
            self.compile_selectables(&query.columns)?
        };
        Ok(format!("{} {columns}", self.compile_select_keyword(query)))
    }

    /// Comma-separated select list entries.
    ///
    /// # Errors
    ///
    /// Propagates subselect errors.
    fn compile_selectables(&self, items: &[Selectable]) -> Result<String> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(match item {
                Selectable::Column(column) => self.wrap(column),
                Selectable::Raw(sql, _) => sql.as_str().to_string(),
                Selectable::Sub { query, alias } => format!(
                    "({}) AS {}",
                    self.select_sql(query)?,
                    self.base().wrap_value(alias)
                ),
            });
        }
        Ok(out.join(", "))
    }

    /// `FROM ...`
    ///
    /// # Errors
    ///
    /// Propagates derived table errors.
    fn compile_from(&self, query: &QueryBuilder) -> Result<String> {
        base_from(self, query)
    }

    /// Optimizer index hint; ignored unless the dialect has one.
    fn compile_index_hint(&self, query: &QueryBuilder) -> String {
        query
            .index_hint
            .as_ref()
            .map_or_else(String::new, |hint| self.render_index_hint(hint))
    }

    /// Renders one index hint.
    fn render_index_hint(&self, _hint: &IndexHint) -> String {
        String::new()
    }

    /// Index names from a hint, quoted.
    fn hint_indexes(&self, hint: &IndexHint) -> String {
        hint.index
            .split(',')
            .map(|name| self.base().wrap_value(name.trim()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Every join, space separated.
    ///
    /// # Errors
    ///
    /// Propagates condition and subquery errors.
    fn compile_joins(&self, joins: &[JoinClause]) -> Result<String> {
        let mut out = Vec::with_capacity(joins.len());
        for join in joins {
            let table = match &join.target {
                JoinTarget::Table(table) => self.wrap_table(table),
                JoinTarget::Sub { query, alias } => {
                    format!("({}) AS {}", self.select_sql(query)?, self.wrap_table(alias))
                }
            };
            if join.lateral {
                out.push(self.compile_join_lateral(join, &table)?);
                continue;
            }
            let on = if join.on.is_empty() {
                String::new()
            } else {
                format!(" ON {}", self.compile_conditions(&join.on)?)
            };
            out.push(format!("{} JOIN {table}{on}", join.join_type.as_sql()));
        }
        Ok(out.join(" "))
    }

    /// Lateral join against `table`, already rendered as `(sub) AS alias`.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_join_lateral(&self, _join: &JoinClause, _table: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "lateral joins"))
    }

    /// `WHERE ...`
    ///
    /// # Errors
    ///
    /// Propagates condition errors.
    fn compile_wheres(&self, clause: &ConditionClause) -> Result<String> {
        if clause.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("WHERE {}", self.compile_conditions(clause)?))
    }

    /// Joins the nodes of a clause left to right. The first node's
    /// conjunction is dropped and negation follows the conjunction.
    ///
    /// # Errors
    ///
    /// Propagates predicate errors.
    fn compile_conditions(&self, clause: &ConditionClause) -> Result<String> {
        let mut sql = String::new();
        for (i, node) in clause.nodes().iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(node.conjunction.as_sql());
                sql.push(' ');
            }
            if node.negated {
                sql.push_str("NOT ");
            }
            sql.push_str(&self.compile_condition(&node.condition)?);
        }
        Ok(sql)
    }

    /// Renders a single predicate.
    ///
    /// # Errors
    ///
    /// Unsupported operators or predicates.
    fn compile_condition(&self, condition: &Condition) -> Result<String> {
        match condition {
            Condition::Value {
                column,
                operator,
                value,
            } => {
                self.check_operator(*operator)?;
                if operator.is_bitwise() {
                    self.where_bitwise(column, *operator, value)
                } else {
                    self.where_basic(column, *operator, value)
                }
            }
            Condition::Column {
                first,
                operator,
                second,
            } => {
                self.check_operator(*operator)?;
                Ok(format!("{} {operator} {}", self.wrap(first), self.wrap(second)))
            }
            Condition::Raw { sql, .. } => Ok(sql.as_str().to_string()),
            Condition::Nested(clause) => Ok(format!("( {} )", self.compile_conditions(clause)?)),
            Condition::Exists(query) => Ok(format!("EXISTS ( {} )", self.compile_subquery(query)?)),
            Condition::Null { column, not } => Ok(format!(
                "{} IS {}NULL",
                self.wrap(column),
                if *not { "NOT " } else { "" }
            )),
            Condition::Date {
                column,
                part,
                operator,
                value,
            } => {
                self.check_operator(*operator)?;
                self.where_date(*part, column, *operator, value)
            }
            Condition::In {
                column,
                values: InValues::List(values),
                not,
            } => {
                if values.is_empty() {
                    return Ok(if *not { "1 = 1" } else { "0 = 1" }.to_string());
                }
                Ok(self.where_in(column, values, *not))
            }
            Condition::In {
                column,
                values: InValues::Query(query),
                not,
            } => Ok(format!(
                "{} {}IN ({})",
                self.wrap(column),
                if *not { "NOT " } else { "" },
                self.compile_subquery(query)?
            )),
            Condition::Between {
                column,
                low,
                high,
                not,
            } => Ok(format!(
                "{} {}BETWEEN {} AND {}",
                self.wrap(column),
                if *not { "NOT " } else { "" },
                self.parameter(low),
                self.parameter(high)
            )),
            Condition::BetweenColumns {
                column,
                low,
                high,
                not,
            } => Ok(format!(
                "{} {}BETWEEN {} AND {}",
                self.wrap(column),
                if *not { "NOT " } else { "" },
                self.wrap(low),
                self.wrap(high)
            )),
            Condition::Sub {
                column,
                operator,
                query,
            } => {
                self.check_operator(*operator)?;
                Ok(format!(
                    "{} {operator} ({})",
                    self.wrap(column),
                    self.compile_subquery(query)?
                ))
            }
            Condition::RowValues {
                columns,
                operator,
                values,
            } => {
                self.check_operator(*operator)?;
                Ok(format!(
                    "({}) {operator} ({})",
                    self.columnize(columns),
                    self.parameterize(values)
                ))
            }
            Condition::JsonContains { column, .. } => self.where_json_contains(column),
            Condition::JsonContainsKey { column } => self.where_json_contains_key(column),
            Condition::JsonLength {
                column,
                operator,
                value,
            } => {
                self.check_operator(*operator)?;
                self.where_json_length(column, *operator, value)
            }
            Condition::FullText {
                columns, options, ..
            } => self.where_full_text(columns, options),
        }
    }

    /// Text of a subquery.
    ///
    /// # Errors
    ///
    /// Propagates nested compile errors.
    fn compile_subquery(&self, query: &Subquery) -> Result<String> {
        match query {
            Subquery::Query(query) => self.select_sql(query),
            Subquery::Raw(sql, _) => Ok(sql.as_str().to_string()),
        }
    }

    /// `column op ?`
    ///
    /// # Errors
    ///
    /// Infallible unless overridden.
    fn where_basic(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        Ok(format!("{} {op} {}", self.wrap(column), self.parameter(value)))
    }

    /// Bitwise comparison.
    ///
    /// # Errors
    ///
    /// Infallible unless overridden.
    fn where_bitwise(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        self.where_basic(column, op, value)
    }

    /// `column IN (?, ?)`; never called with an empty list.
    fn where_in(&self, column: &str, values: &[Operand], not: bool) -> String {
        format!(
            "{} {}IN ({})",
            self.wrap(column),
            if not { "NOT " } else { "" },
            self.parameterize(values)
        )
    }

    /// Date part comparison; `PART(column) op ?` by default.
    ///
    /// # Errors
    ///
    /// Infallible unless overridden.
    fn where_date(
        &self,
        part: DatePart,
        column: &str,
        op: Operator,
        value: &Operand,
    ) -> Result<String> {
        Ok(format!(
            "{}({}) {op} {}",
            part.name().to_ascii_uppercase(),
            self.wrap(column),
            self.parameter(value)
        ))
    }

    /// JSON containment.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn where_json_contains(&self, _column: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "JSON contains"))
    }

    /// JSON key presence.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn where_json_contains_key(&self, _column: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "JSON contains key"))
    }

    /// JSON array length comparison.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn where_json_length(&self, _column: &str, _op: Operator, _value: &Operand) -> Result<String> {
        Err(Error::unsupported(self.name(), "JSON length"))
    }

    /// Full-text match.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn where_full_text(&self, _columns: &[String], _options: &FullTextOptions) -> Result<String> {
        Err(Error::unsupported(self.name(), "full-text search"))
    }

    /// `GROUP BY ...`
    ///
    /// # Errors
    ///
    /// Propagates subselect errors.
    fn compile_groups(&self, groups: &[Selectable]) -> Result<String> {
        if groups.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("GROUP BY {}", self.compile_selectables(groups)?))
    }

    /// `HAVING ...`
    ///
    /// # Errors
    ///
    /// Propagates condition errors.
    fn compile_havings(&self, clause: &ConditionClause) -> Result<String> {
        if clause.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("HAVING {}", self.compile_conditions(clause)?))
    }

    /// `ORDER BY ...` for the main query.
    ///
    /// # Errors
    ///
    /// Infallible unless overridden.
    fn compile_orders(&self, query: &QueryBuilder) -> Result<String> {
        Ok(self.render_orders(&query.orders))
    }

    /// Renders an ORDER BY list; empty input yields an empty string.
    fn render_orders(&self, orders: &[OrderBy]) -> String {
        if orders.is_empty() {
            return String::new();
        }
        let items: Vec<String> = orders
            .iter()
            .map(|order| match order {
                OrderBy::Column { column, direction } => {
                    format!("{} {}", self.wrap(column), direction.as_sql())
                }
                OrderBy::Raw(sql, _) => sql.as_str().to_string(),
                OrderBy::Random(seed) => self.compile_random(*seed),
            })
            .collect();
        format!("ORDER BY {}", items.join(", "))
    }

    /// Random ordering function.
    fn compile_random(&self, _seed: Option<u64>) -> String {
        "RANDOM()".to_string()
    }

    /// LIMIT/OFFSET pieces for the main query.
    fn compile_pagination(&self, query: &QueryBuilder) -> Vec<String> {
        self.pagination(query.limit, query.offset)
    }

    /// LIMIT/OFFSET pieces for any limit and offset pair.
    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(limit) = limit {
            out.push(format!("LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            out.push(format!("OFFSET {offset}"));
        }
        out
    }

    /// Row locking clause.
    fn compile_lock(&self, query: &QueryBuilder) -> String {
        match &query.lock {
            None => String::new(),
            Some(Lock::Update) => "FOR UPDATE".to_string(),
            Some(Lock::Shared) => "FOR SHARE".to_string(),
            Some(Lock::Raw(sql)) => sql.as_str().to_string(),
        }
    }

    // Unions

    /// Wraps a union member.
    fn wrap_union(&self, sql: &str) -> String {
        format!("({sql})")
    }

    /// Every `UNION` member plus the union's ORDER BY and pagination.
    ///
    /// # Errors
    ///
    /// Propagates member compile errors.
    fn compile_unions(&self, query: &QueryBuilder) -> Result<String> {
        let mut parts = Vec::new();
        for union in &query.unions {
            let keyword = if union.all { "UNION ALL" } else { "UNION" };
            parts.push(format!(
                "{keyword} {}",
                self.wrap_union(&self.select_sql(&union.query)?)
            ));
        }
        let orders = self.render_orders(&query.union_orders);
        if !orders.is_empty() {
            parts.push(orders);
        }
        parts.extend(self.union_pagination(query));
        Ok(parts.join(" "))
    }

    /// Pagination applied to the union as a whole.
    fn union_pagination(&self, query: &QueryBuilder) -> Vec<String> {
        self.pagination(query.union_limit, query.union_offset)
    }

    /// `SELECT fn(...) AS "aggregate" FROM (query) AS "temp_table"`, used
    /// when the aggregate must see unions, havings or group limits.
    ///
    /// # Errors
    ///
    /// Propagates inner compile errors.
    fn compile_wrapped_aggregate(&self, query: &QueryBuilder) -> Result<String> {
        let aggregate = self.compile_aggregate(query);
        let mut inner = query.clone();
        inner.aggregate = None;
        Ok(format!(
            "{aggregate} FROM ({}) AS {}",
            self.select_sql(&inner)?,
            self.wrap_table("temp_table")
        ))
    }

    // Group limit

    /// Returns `true` when group limits compile to `ROW_NUMBER()`.
    fn uses_window_group_limit(&self) -> bool {
        true
    }

    /// Caps rows per partition; a window function by default.
    ///
    /// # Errors
    ///
    /// Propagates inner compile errors.
    fn compile_group_limit(&self, query: &QueryBuilder, limit: &GroupLimit) -> Result<String> {
        window_group_limit(self, query, limit)
    }

    /// `, ROW_NUMBER() OVER (PARTITION BY column ORDER BY ...) AS "group_row"`
    fn compile_row_number(&self, partition: &str, orders: &str) -> String {
        let over = format!("PARTITION BY {} {orders}", self.wrap(partition));
        format!(
            ", ROW_NUMBER() OVER ({}) AS {}",
            over.trim_end(),
            self.base().wrap_value("group_row")
        )
    }

    // EXISTS

    /// `SELECT EXISTS(query) AS "exists"`
    ///
    /// # Errors
    ///
    /// See [`Grammar::compile_select`].
    fn compile_exists(&self, query: &QueryBuilder) -> Result<CompiledQuery> {
        let sql = format!(
            "SELECT EXISTS({}) AS {}",
            self.select_sql(query)?,
            self.base().wrap_value("exists")
        );
        let bindings = self.bindings_in_order(query);
        self.finish(sql, bindings)
    }

    // INSERT

    /// Table targeted by a write statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] when the query has no plain table.
    fn target_table<'q>(&self, query: &'q QueryBuilder) -> Result<&'q str> {
        query
            .from
            .as_ref()
            .and_then(FromSource::table)
            .ok_or_else(|| {
                Error::construction("statement target", "write statements need a table")
            })
    }

    /// INSERT text for `values`.
    ///
    /// # Errors
    ///
    /// See [`Grammar::target_table`].
    fn insert_sql(&self, query: &QueryBuilder, values: &Values) -> Result<String> {
        base_insert_sql(self, query, values)
    }

    /// Compiles a (multi-row) INSERT.
    ///
    /// # Errors
    ///
    /// See [`Grammar::target_table`].
    fn compile_insert(&self, query: &QueryBuilder, values: &Values) -> Result<CompiledQuery> {
        self.finish(self.insert_sql(query, values)?, values.bindings())
    }

    /// INSERT that skips rows violating unique constraints.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_insert_or_ignore(&self, _query: &QueryBuilder, _values: &Values) -> Result<CompiledQuery> {
        Err(Error::unsupported(self.name(), "insert or ignore"))
    }

    /// INSERT returning the generated key. Dialects without a returning
    /// form compile a plain insert and rely on the connection's last
    /// insert id.
    ///
    /// # Errors
    ///
    /// See [`Grammar::compile_insert`].
    fn compile_insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &Values,
        _sequence: Option<&str>,
    ) -> Result<CompiledQuery> {
        self.compile_insert(query, values)
    }

    /// `INSERT INTO table (columns) SELECT ...`
    ///
    /// # Errors
    ///
    /// Propagates select compile errors.
    fn compile_insert_using(
        &self,
        query: &QueryBuilder,
        columns: &[String],
        source: &QueryBuilder,
    ) -> Result<CompiledQuery> {
        let table = self.wrap_table(self.target_table(query)?);
        let select = self.select_sql(source)?;
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table} {select}")
        } else {
            format!("INSERT INTO {table} ({}) {select}", self.columnize(columns))
        };
        let bindings = self.bindings_in_order(source);
        self.finish(sql, bindings)
    }

    /// INSERT that updates existing rows on a unique-key conflict. An
    /// upsert with nothing to update compiles to a plain insert.
    ///
    /// # Errors
    ///
    /// Dialect specific; see the implementations.
    fn compile_upsert(&self, query: &QueryBuilder, upsert: &Upsert) -> Result<CompiledQuery>;

    /// Checks an upsert names its conflict target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] when `unique_by` is empty.
    fn require_unique_by(&self, upsert: &Upsert) -> Result<()> {
        if upsert.unique_by().is_empty() {
            return Err(Error::construction(
                "upsert",
                "at least one unique-by column is required",
            ));
        }
        Ok(())
    }

    // UPDATE

    /// Compiles an UPDATE.
    ///
    /// # Errors
    ///
    /// Unsupported joins, limits or JSON assignments.
    fn compile_update(&self, query: &QueryBuilder, record: &Record) -> Result<CompiledQuery> {
        if record.is_empty() {
            return Err(Error::construction("update", "no columns to update"));
        }
        let (columns, values) = self.compile_update_columns(record)?;
        let sql = if query.joins.is_empty() && query.limit.is_none() {
            self.compile_update_without_joins(query, &columns)?
        } else {
            self.compile_update_with_joins_or_limit(query, &columns)?
        };
        let bindings = self.prepare_bindings_for_update(query, values);
        self.finish(sql, bindings)
    }

    /// `a = ?, b = ?` plus the values bound by it.
    ///
    /// # Errors
    ///
    /// JSON path assignments on dialects without a JSON setter.
    fn compile_update_columns(&self, record: &Record) -> Result<(String, Vec<SqlValue>)> {
        let mut values = Vec::new();
        let mut columns = Vec::with_capacity(record.len());
        for (column, value) in record.entries() {
            if column.contains("->") {
                columns.push(self.compile_json_update_column(column, value, &mut values)?);
            } else {
                value.push_binding(&mut values);
                columns.push(format!("{} = {}", self.wrap(column), self.parameter(value)));
            }
        }
        Ok((columns.join(", "), values))
    }

    /// Assignment into a JSON path.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_json_update_column(
        &self,
        column: &str,
        _value: &Operand,
        _bindings: &mut Vec<SqlValue>,
    ) -> Result<String> {
        Err(Error::unsupported(
            self.name(),
            format!("JSON update of {column}"),
        ))
    }

    /// `UPDATE table SET ... WHERE ...`
    ///
    /// # Errors
    ///
    /// Propagates condition errors.
    fn compile_update_without_joins(&self, query: &QueryBuilder, columns: &str) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("UPDATE {table} SET {columns}"),
            self.compile_wheres(&query.wheres)?,
        ]))
    }

    /// UPDATE with joins or a row limit.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_update_with_joins_or_limit(&self, _query: &QueryBuilder, _columns: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "update with joins or limit"))
    }

    /// Assignment values followed by every bucket the statement renders.
    fn prepare_bindings_for_update(&self, query: &QueryBuilder, values: Vec<SqlValue>) -> Vec<SqlValue> {
        let mut bindings = values;
        bindings.extend(
            self.raw_bindings(query)
                .flatten_except(&self.unrendered_write_bindings(query)),
        );
        bindings
    }

    /// Buckets an UPDATE or DELETE leaves out. The plain forms render only
    /// WHERE; the row-key subquery renders a full SELECT minus its columns.
    fn unrendered_write_bindings(&self, query: &QueryBuilder) -> Vec<BindingType> {
        if query.joins.is_empty() && query.limit.is_none() {
            vec![BindingType::Select, BindingType::Order]
        } else {
            vec![BindingType::Select]
        }
    }

    /// Rewrites an UPDATE or DELETE with joins or a limit to target rows by
    /// an internal row key selected in a subquery.
    ///
    /// # Errors
    ///
    /// Propagates subquery compile errors.
    fn row_key_subquery(&self, query: &QueryBuilder, key: &str) -> Result<String> {
        let table = self.target_table(query)?;
        let mut inner = query.clone();
        inner.columns = vec![Selectable::Column(format!("{}.{key}", table_alias(table)))];
        inner.aggregate = None;
        Ok(format!(
            "{} IN ({})",
            self.base().wrap_value(key),
            self.select_sql(&inner)?
        ))
    }

    // DELETE

    /// Compiles a DELETE.
    ///
    /// # Errors
    ///
    /// Unsupported joins or limits.
    fn compile_delete(&self, query: &QueryBuilder) -> Result<CompiledQuery> {
        let sql = if query.joins.is_empty() && query.limit.is_none() {
            self.compile_delete_without_joins(query)?
        } else {
            self.compile_delete_with_joins_or_limit(query)?
        };
        let bindings = self
            .raw_bindings(query)
            .flatten_except(&self.unrendered_write_bindings(query));
        self.finish(sql, bindings)
    }

    /// `DELETE FROM table WHERE ...`
    ///
    /// # Errors
    ///
    /// Propagates condition errors.
    fn compile_delete_without_joins(&self, query: &QueryBuilder) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("DELETE FROM {table}"),
            self.compile_wheres(&query.wheres)?,
        ]))
    }

    /// DELETE with joins or a row limit.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_delete_with_joins_or_limit(&self, _query: &QueryBuilder) -> Result<String> {
        Err(Error::unsupported(self.name(), "delete with joins or limit"))
    }

    // TRUNCATE

    /// Empties the table. Some dialects need several statements.
    ///
    /// # Errors
    ///
    /// See [`Grammar::target_table`].
    fn compile_truncate(&self, query: &QueryBuilder) -> Result<Vec<CompiledQuery>> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(vec![self.finish(format!("TRUNCATE TABLE {table}"), Vec::new())?])
    }
}

/// Wraps the query so `ROW_NUMBER()` over the partition column caps the
/// rows kept per group. Orders move inside the window, and an offset is
/// applied per group.
pub(crate) fn window_group_limit<G: Grammar + ?Sized>(
    grammar: &G,
    query: &QueryBuilder,
    limit: &GroupLimit,
) -> Result<String> {
    let mut inner = query.clone();
    inner.group_limit = None;
    let offset = inner.offset.take();
    let max = limit.value.saturating_add(offset.unwrap_or(0));

    let mut components = grammar.compile_components(&inner)?;
    let orders = components
        .iter()
        .position(|(name, _)| *name == "orders")
        .map(|i| components.remove(i).1)
        .unwrap_or_default();
    let row_number = grammar.compile_row_number(&limit.column, &orders);
    if let Some((_, columns)) = components.iter_mut().find(|(name, _)| *name == "columns") {
        columns.push_str(&row_number);
    }

    let row = grammar.base().wrap_value("group_row");
    let mut sql = format!(
        "SELECT * FROM ({}) AS {} WHERE {row} <= {max}",
        concatenate(&components),
        grammar.base().wrap_value("group_table")
    );
    if let Some(offset) = offset {
        sql.push_str(&format!(" AND {row} > {offset}"));
    }
    sql.push_str(&format!(" ORDER BY {row}"));
    Ok(sql)
}

/// `FROM ...` shared by every dialect.
pub(crate) fn base_from<G: Grammar + ?Sized>(grammar: &G, query: &QueryBuilder) -> Result<String> {
    Ok(match &query.from {
        None => String::new(),
        Some(FromSource::Table(table)) => format!("FROM {}", grammar.wrap_table(table)),
        Some(FromSource::Raw(sql, _)) => format!("FROM {sql}"),
        Some(FromSource::Sub { query, alias }) => format!(
            "FROM ({}) AS {}",
            grammar.select_sql(query)?,
            grammar.wrap_table(alias)
        ),
    })
}

/// `INSERT INTO table (columns) VALUES (...), (...)`; an empty value set
/// yields `DEFAULT VALUES`.
pub(crate) fn base_insert_sql<G: Grammar + ?Sized>(
    grammar: &G,
    query: &QueryBuilder,
    values: &Values,
) -> Result<String> {
    let table = grammar.wrap_table(grammar.target_table(query)?);
    if values.is_empty() {
        return Ok(format!("INSERT INTO {table} DEFAULT VALUES"));
    }
    let rows: Vec<String> = values
        .rows()
        .iter()
        .map(|row| format!("({})", grammar.parameterize(row)))
        .collect();
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES {}",
        grammar.columnize(values.columns()),
        rows.join(", ")
    ))
}

/// Joins component SQL with single spaces.
pub(crate) fn concatenate(components: &[(&'static str, String)]) -> String {
    components
        .iter()
        .map(|(_, sql)| sql.as_str())
        .filter(|sql| !sql.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins non-empty fragments with single spaces.
pub(crate) fn concatenate_parts(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_alias_is_case_insensitive() {
        assert_eq!(split_alias("users AS u"), Some(("users", "u")));
        assert_eq!(split_alias("users as u"), Some(("users", "u")));
        assert_eq!(split_alias("users"), None);
        assert_eq!(table_alias("users as u"), "u");
    }

    #[test]
    fn test_json_path_literal() {
        let (field, path) = json_field_and_path("meta->tags[0]->name");
        assert_eq!(field, "meta");
        assert_eq!(json_path(&path), r#"'$."tags"[0]."name"'"#);
        assert_eq!(json_path(&["it's"]), r#"'$."it''s"'"#);
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
