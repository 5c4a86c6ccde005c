//! SQL Server query grammar.

use super::{
    base_from, concatenate_parts, hex, json_field_and_path, json_path, quote_string, table_alias,
    BaseGrammar, Grammar,
};
use crate::condition::DatePart;
use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::query::{
    BindingType, CompiledQuery, Distinct, FromSource, IndexHint, IndexHintType, JoinClause, JoinType, Lock,
    QueryBuilder, Upsert, UpsertColumn, Values,
};
use crate::value::{Operand, SqlValue};

const OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::NotEq,
    Operator::Lt,
    Operator::LtEq,
    Operator::Gt,
    Operator::GtEq,
    Operator::Like,
    Operator::NotLike,
    Operator::BitAnd,
    Operator::BitOr,
    Operator::BitXor,
];

/// SQL Server grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlServerGrammar {
    base: BaseGrammar,
}

impl Default for SqlServerGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlServerGrammar {
    /// Creates a new SQL Server grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: BaseGrammar::new('[', ']'),
        }
    }

    /// Prefixes every table name.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base.set_table_prefix(prefix.into());
        self
    }

    /// Sets the server version.
    #[must_use]
    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.base.set_version(version);
        self
    }

    /// `OPENJSON(column[, path])`
    fn open_json(&self, field: &str, path: &[&str]) -> String {
        let field = self.wrap_segments(field);
        if path.is_empty() {
            format!("OPENJSON({field})")
        } else {
            format!("OPENJSON({field}, {})", json_path(path))
        }
    }

    /// Table hint appended after the table name for row locks.
    fn lock_hint(&self, query: &QueryBuilder) -> String {
        match &query.lock {
            None => String::new(),
            Some(Lock::Update) => "WITH(ROWLOCK,UPDLOCK,HOLDLOCK)".to_string(),
            Some(Lock::Shared) => "WITH(ROWLOCK,HOLDLOCK)".to_string(),
            Some(Lock::Raw(sql)) => sql.as_str().to_string(),
        }
    }

    /// OFFSET/FETCH needs an ORDER BY; `(SELECT 0)` keeps the server's
    /// order.
    fn paged_order(orders: String, paged: bool) -> String {
        if orders.is_empty() && paged {
            "ORDER BY (SELECT 0)".to_string()
        } else {
            orders
        }
    }

    /// `OFFSET m ROWS [FETCH NEXT n ROWS ONLY]`
    fn offset_fetch(limit: Option<u64>, offset: u64) -> Vec<String> {
        let mut out = vec![format!("OFFSET {offset} ROWS")];
        if let Some(limit) = limit {
            out.push(format!("FETCH NEXT {limit} ROWS ONLY"));
        }
        out
    }

    /// `TOP (n) ` prefix for UPDATE and DELETE with a limit.
    fn top(query: &QueryBuilder) -> String {
        query.limit.map_or_else(String::new, |n| format!("TOP ({n}) "))
    }
}

impl Grammar for SqlServerGrammar {
    fn name(&self) -> &'static str {
        "sqlsrv"
    }

    fn base(&self) -> &BaseGrammar {
        &self.base
    }

    fn operators(&self) -> &'static [Operator] {
        OPERATORS
    }

    fn wrap_json_selector(&self, value: &str) -> String {
        let (field, path) = json_field_and_path(value);
        format!(
            "JSON_VALUE({}, {})",
            self.wrap_segments(field),
            json_path(&path)
        )
    }

    fn escape_blob(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex(bytes))
    }

    /// A limit without an offset becomes `TOP n`.
    fn compile_select_keyword(&self, query: &QueryBuilder) -> String {
        let mut keyword = match query.distinct {
            Distinct::Off => "SELECT".to_string(),
            Distinct::All | Distinct::Columns(_) => "SELECT DISTINCT".to_string(),
        };
        if let (Some(limit), None) = (query.limit, query.offset) {
            keyword.push_str(&format!(" TOP {limit}"));
        }
        keyword
    }

    fn compile_from(&self, query: &QueryBuilder) -> Result<String> {
        let from = base_from(self, query)?;
        let hint = self.lock_hint(query);
        if hint.is_empty() || !matches!(query.from, Some(FromSource::Table(_))) {
            return Ok(from);
        }
        Ok(format!("{from} {hint}"))
    }

    fn render_index_hint(&self, hint: &IndexHint) -> String {
        match hint.kind {
            IndexHintType::Force => format!("WITH (INDEX({}))", self.hint_indexes(hint)),
            IndexHintType::Use | IndexHintType::Ignore => String::new(),
        }
    }

    /// `CROSS APPLY` and `OUTER APPLY` stand in for lateral joins.
    fn compile_join_lateral(&self, join: &JoinClause, table: &str) -> Result<String> {
        let keyword = match join.join_type {
            JoinType::Inner | JoinType::Cross => "CROSS APPLY",
            JoinType::Left => "OUTER APPLY",
            JoinType::Right => {
                return Err(Error::unsupported(self.name(), "right lateral joins"));
            }
        };
        Ok(format!("{keyword} {table}"))
    }

    fn where_bitwise(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        Ok(format!(
            "({} {op} {}) != 0",
            self.wrap(column),
            self.parameter(value)
        ))
    }

    fn where_date(
        &self,
        part: DatePart,
        column: &str,
        op: Operator,
        value: &Operand,
    ) -> Result<String> {
        let column = self.wrap(column);
        let value = self.parameter(value);
        Ok(match part {
            DatePart::Date => format!("CAST({column} AS DATE) {op} {value}"),
            DatePart::Time => format!("CAST({column} AS TIME) {op} {value}"),
            DatePart::Day | DatePart::Month | DatePart::Year => format!(
                "{}({column}) {op} {value}",
                part.name().to_ascii_uppercase()
            ),
        })
    }

    fn where_json_contains(&self, column: &str) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        Ok(format!(
            "? IN (SELECT {} FROM {})",
            self.base.wrap_value("value"),
            self.open_json(field, &path)
        ))
    }

    fn where_json_contains_key(&self, column: &str) -> Result<String> {
        let (field, mut path) = json_field_and_path(column);
        let Some(last) = path.pop() else {
            return Err(Error::construction(
                "JSON key predicate",
                format!("'{column}' does not name a key"),
            ));
        };
        let key = last
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(last);
        Ok(format!(
            "{} IN (SELECT {} FROM {})",
            quote_string(key),
            self.base.wrap_value("key"),
            self.open_json(field, &path)
        ))
    }

    fn where_json_length(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        Ok(format!(
            "(SELECT COUNT(*) FROM {}) {op} {}",
            self.open_json(field, &path),
            self.parameter(value)
        ))
    }

    fn compile_orders(&self, query: &QueryBuilder) -> Result<String> {
        Ok(Self::paged_order(
            self.render_orders(&query.orders),
            query.offset.is_some(),
        ))
    }

    fn compile_random(&self, _seed: Option<u64>) -> String {
        "NEWID()".to_string()
    }

    fn compile_pagination(&self, query: &QueryBuilder) -> Vec<String> {
        query
            .offset
            .map_or_else(Vec::new, |offset| Self::offset_fetch(query.limit, offset))
    }

    fn compile_lock(&self, _query: &QueryBuilder) -> String {
        String::new()
    }

    fn wrap_union(&self, sql: &str) -> String {
        format!("SELECT * FROM ({sql}) AS {}", self.wrap_table("temp_table"))
    }

    /// The union's ORDER BY is already rendered, so `(SELECT 0)` is only
    /// added when there is none.
    fn union_pagination(&self, query: &QueryBuilder) -> Vec<String> {
        if query.union_limit.is_none() && query.union_offset.is_none() {
            return Vec::new();
        }
        let mut out = Vec::new();
        if query.union_orders.is_empty() {
            out.push("ORDER BY (SELECT 0)".to_string());
        }
        out.extend(Self::offset_fetch(
            query.union_limit,
            query.union_offset.unwrap_or(0),
        ));
        out
    }

    fn compile_row_number(&self, partition: &str, orders: &str) -> String {
        let orders = if orders.is_empty() {
            "ORDER BY (SELECT 0)"
        } else {
            orders
        };
        format!(
            ", ROW_NUMBER() OVER (PARTITION BY {} {orders}) AS {}",
            self.wrap(partition),
            self.base.wrap_value("group_row")
        )
    }

    fn compile_exists(&self, query: &QueryBuilder) -> Result<CompiledQuery> {
        let sql = format!(
            "SELECT CAST(CASE WHEN EXISTS({}) THEN 1 ELSE 0 END AS BIT) AS {}",
            self.select_sql(query)?,
            self.base.wrap_value("exists")
        );
        let bindings = self.bindings_in_order(query);
        self.finish(sql, bindings)
    }

    fn compile_insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &Values,
        sequence: Option<&str>,
    ) -> Result<CompiledQuery> {
        let sql = format!(
            "SET NOCOUNT ON;{};SELECT SCOPE_IDENTITY() AS {}",
            self.insert_sql(query, values)?,
            self.wrap(sequence.unwrap_or("id"))
        );
        self.finish(sql, values.bindings())
    }

    /// `MERGE` with the inserted rows as a `VALUES` source.
    fn compile_upsert(&self, query: &QueryBuilder, upsert: &Upsert) -> Result<CompiledQuery> {
        let update = upsert.update_columns();
        if update.is_empty() {
            return self.compile_insert(query, upsert.values());
        }
        self.require_unique_by(upsert)?;
        let values = upsert.values();
        if values.is_empty() {
            return Err(Error::construction("upsert", "no rows to merge"));
        }

        let table = self.wrap_table(self.target_table(query)?);
        let source = self.base.wrap_value("upsert_source");
        let columns = self.columnize(values.columns());
        let rows: Vec<String> = values
            .rows()
            .iter()
            .map(|row| format!("({})", self.parameterize(row)))
            .collect();
        let on: Vec<String> = upsert
            .unique_by()
            .iter()
            .map(|c| format!("{source}.{} = {table}.{}", self.wrap(c), self.wrap(c)))
            .collect();
        let assignments: Vec<String> = update
            .iter()
            .map(|column| match column {
                UpsertColumn::Excluded(c) => format!("{} = {source}.{}", self.wrap(c), self.wrap(c)),
                UpsertColumn::Set(c, value) => format!("{} = {}", self.wrap(c), self.parameter(value)),
            })
            .collect();
        let inserted: Vec<String> = values
            .columns()
            .iter()
            .map(|c| format!("{source}.{}", self.wrap(c)))
            .collect();

        let sql = format!(
            "MERGE {table} USING (VALUES {}) {source} ({columns}) ON {} \
             WHEN MATCHED THEN UPDATE SET {} \
             WHEN NOT MATCHED THEN INSERT ({columns}) VALUES ({});",
            rows.join(", "),
            on.join(" AND "),
            assignments.join(", "),
            inserted.join(", ")
        );
        self.finish(sql, upsert.bindings())
    }

    fn compile_json_update_column(
        &self,
        column: &str,
        value: &Operand,
        bindings: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        let field = self.wrap_segments(field);
        let parameter = match value {
            Operand::Value(v @ (SqlValue::Json(_) | SqlValue::Array(_))) => {
                bindings.push(SqlValue::Json(v.to_json()));
                "JSON_QUERY(?)".to_string()
            }
            Operand::Value(v) => {
                bindings.push(v.clone());
                "?".to_string()
            }
            Operand::Raw(expr) => expr.as_str().to_string(),
        };
        Ok(format!(
            "{field} = JSON_MODIFY({field}, {}, {parameter})",
            json_path(&path)
        ))
    }

    fn compile_update_with_joins_or_limit(&self, query: &QueryBuilder, columns: &str) -> Result<String> {
        let table = self.target_table(query)?;
        let top = Self::top(query);
        if query.joins.is_empty() {
            return Ok(concatenate_parts(&[
                format!("UPDATE {top}{} SET {columns}", self.wrap_table(table)),
                self.compile_wheres(&query.wheres)?,
            ]));
        }
        Ok(concatenate_parts(&[
            format!(
                "UPDATE {top}{} SET {columns} FROM {}",
                self.wrap_table(table_alias(table)),
                self.wrap_table(table)
            ),
            self.compile_joins(&query.joins)?,
            self.compile_wheres(&query.wheres)?,
        ]))
    }

    /// `TOP` replaces ORDER BY on writes.
    fn unrendered_write_bindings(&self, _query: &QueryBuilder) -> Vec<BindingType> {
        vec![BindingType::Select, BindingType::Order]
    }

    fn compile_delete_with_joins_or_limit(&self, query: &QueryBuilder) -> Result<String> {
        let table = self.target_table(query)?;
        let top = Self::top(query);
        if query.joins.is_empty() {
            return Ok(concatenate_parts(&[
                format!("DELETE {top}FROM {}", self.wrap_table(table)),
                self.compile_wheres(&query.wheres)?,
            ]));
        }
        Ok(concatenate_parts(&[
            format!(
                "DELETE {top}{} FROM {}",
                self.wrap_table(table_alias(table)),
                self.wrap_table(table)
            ),
            self.compile_joins(&query.joins)?,
            self.compile_wheres(&query.wheres)?,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, Record};

    #[test]
    fn test_limit_without_offset_uses_top() {
        let grammar = SqlServerGrammar::new();
        let query = QueryBuilder::table("users").limit(10);
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            "SELECT TOP 10 * FROM [users]"
        );
    }

    #[test]
    fn test_offset_injects_order() {
        let grammar = SqlServerGrammar::new();
        let query = QueryBuilder::table("users").offset(20).limit(10);
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            "SELECT * FROM [users] ORDER BY (SELECT 0) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        let ordered = QueryBuilder::table("users")
            .order_by("name", Direction::Asc)
            .offset(20);
        assert_eq!(
            grammar.compile_select(&ordered).unwrap().sql,
            "SELECT * FROM [users] ORDER BY [name] ASC OFFSET 20 ROWS"
        );
    }

    #[test]
    fn test_lock_is_a_table_hint() {
        let grammar = SqlServerGrammar::new();
        let query = QueryBuilder::table("users")
            .where_("id", Operator::Eq, 1)
            .lock_for_update();
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            "SELECT * FROM [users] WITH(ROWLOCK,UPDLOCK,HOLDLOCK) WHERE [id] = ?"
        );
    }

    #[test]
    fn test_identifier_close_quote_is_doubled() {
        let grammar = SqlServerGrammar::new();
        assert_eq!(grammar.wrap("odd]name"), "[odd]]name]");
    }

    #[test]
    fn test_exists_casts_to_bit() {
        let grammar = SqlServerGrammar::new();
        let compiled = grammar
            .compile_exists(&QueryBuilder::table("users").where_("id", Operator::Eq, 1))
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT CAST(CASE WHEN EXISTS(SELECT * FROM [users] WHERE [id] = ?) THEN 1 ELSE 0 END AS BIT) AS [exists]"
        );
    }

    #[test]
    fn test_upsert_is_a_merge() {
        let grammar = SqlServerGrammar::new();
        let values = Values::try_from(Record::new().set("email", "a@b.c").set("name", "A")).unwrap();
        let upsert = Upsert::new(values, ["email"]).update("name");
        let compiled = grammar
            .compile_upsert(&QueryBuilder::table("users"), &upsert)
            .unwrap();
        assert_eq!(
            compiled.sql,
            "MERGE [users] USING (VALUES (?, ?)) [upsert_source] ([email], [name]) \
             ON [upsert_source].[email] = [users].[email] \
             WHEN MATCHED THEN UPDATE SET [name] = [upsert_source].[name] \
             WHEN NOT MATCHED THEN INSERT ([email], [name]) VALUES ([upsert_source].[email], [upsert_source].[name]);"
        );
        assert_eq!(compiled.bindings.len(), 2);
    }

    #[test]
    fn test_delete_with_limit_uses_top() {
        let grammar = SqlServerGrammar::new();
        let query = QueryBuilder::table("logs")
            .where_("level", Operator::Eq, "debug")
            .limit(50);
        assert_eq!(
            grammar.compile_delete(&query).unwrap().sql,
            "DELETE TOP (50) FROM [logs] WHERE [level] = ?"
        );
    }
}
