//! SQLite query grammar.

use super::{
    concatenate_parts, json_field_and_path, json_path, window_group_limit, BaseGrammar, Grammar,
};
use crate::condition::DatePart;
use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::query::{
    CompiledQuery, GroupLimit, IndexHint, IndexHintType, QueryBuilder, Upsert, UpsertColumn,
    Values,
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
    Operator::ShiftLeft,
    Operator::ShiftRight,
    Operator::Glob,
];

/// SQLite grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteGrammar {
    base: BaseGrammar,
}

impl Default for SqliteGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteGrammar {
    /// Creates a new SQLite grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: BaseGrammar::new('"', '"'),
        }
    }

    /// Prefixes every table name.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base.set_table_prefix(prefix.into());
        self
    }

    /// Sets the library version.
    #[must_use]
    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.base.set_version(version);
        self
    }

    fn json_arguments(&self, column: &str) -> String {
        let (field, path) = json_field_and_path(column);
        let field = self.wrap_segments(field);
        if path.is_empty() {
            field
        } else {
            format!("{field}, {}", json_path(&path))
        }
    }
}

impl Grammar for SqliteGrammar {
    fn name(&self) -> &'static str {
        "sqlite"
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
            "JSON_EXTRACT({}, {})",
            self.wrap_segments(field),
            json_path(&path)
        )
    }

    /// Only `FORCE` maps onto SQLite (`INDEXED BY`), and only for a single
    /// index.
    fn render_index_hint(&self, hint: &IndexHint) -> String {
        match hint.kind {
            IndexHintType::Force => format!("INDEXED BY {}", self.hint_indexes(hint)),
            IndexHintType::Use | IndexHintType::Ignore => String::new(),
        }
    }

    /// Dates are stored as text, so every part is compared through
    /// `STRFTIME` against the bound value cast to text.
    fn where_date(
        &self,
        part: DatePart,
        column: &str,
        op: Operator,
        value: &Operand,
    ) -> Result<String> {
        let format = match part {
            DatePart::Date => "%Y-%m-%d",
            DatePart::Time => "%H:%M:%S",
            DatePart::Day => "%d",
            DatePart::Month => "%m",
            DatePart::Year => "%Y",
        };
        Ok(format!(
            "STRFTIME('{format}', {}) {op} CAST({} AS TEXT)",
            self.wrap(column),
            self.parameter(value)
        ))
    }

    fn where_json_contains_key(&self, column: &str) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        if path.is_empty() {
            return Err(Error::construction(
                "JSON key predicate",
                format!("'{column}' does not name a key"),
            ));
        }
        Ok(format!(
            "JSON_TYPE({}, {}) IS NOT NULL",
            self.wrap_segments(field),
            json_path(&path)
        ))
    }

    fn where_json_length(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        Ok(format!(
            "JSON_ARRAY_LENGTH({}) {op} {}",
            self.json_arguments(column),
            self.parameter(value)
        ))
    }

    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> Vec<String> {
        let mut out = Vec::new();
        match (limit, offset) {
            (Some(limit), _) => out.push(format!("LIMIT {limit}")),
            (None, Some(_)) => out.push("LIMIT -1".to_string()),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            out.push(format!("OFFSET {offset}"));
        }
        out
    }

    fn compile_lock(&self, _query: &QueryBuilder) -> String {
        String::new()
    }

    /// Compound members cannot carry their own ORDER BY or LIMIT, so each is
    /// selected from as a derived table.
    fn wrap_union(&self, sql: &str) -> String {
        format!("SELECT * FROM ({sql})")
    }

    fn compile_group_limit(&self, query: &QueryBuilder, limit: &GroupLimit) -> Result<String> {
        if self.base.older_than(3, 25, 0) {
            return Err(Error::unsupported(
                self.name(),
                "group limit before window functions (3.25)",
            ));
        }
        window_group_limit(self, query, limit)
    }

    fn compile_insert_or_ignore(&self, query: &QueryBuilder, values: &Values) -> Result<CompiledQuery> {
        let sql = self.insert_sql(query, values)?;
        let sql = sql
            .strip_prefix("INSERT")
            .map_or_else(|| sql.clone(), |rest| format!("INSERT OR IGNORE{rest}"));
        self.finish(sql, values.bindings())
    }

    fn compile_upsert(&self, query: &QueryBuilder, upsert: &Upsert) -> Result<CompiledQuery> {
        let update = upsert.update_columns();
        if update.is_empty() {
            return self.compile_insert(query, upsert.values());
        }
        self.require_unique_by(upsert)?;
        let excluded = self.base.wrap_value("excluded");
        let assignments: Vec<String> = update
            .iter()
            .map(|column| match column {
                UpsertColumn::Excluded(c) => {
                    format!("{} = {excluded}.{}", self.wrap(c), self.wrap(c))
                }
                UpsertColumn::Set(c, value) => format!("{} = {}", self.wrap(c), self.parameter(value)),
            })
            .collect();
        let sql = format!(
            "{} ON CONFLICT ({}) DO UPDATE SET {}",
            self.insert_sql(query, upsert.values())?,
            self.columnize(upsert.unique_by()),
            assignments.join(", ")
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
                "JSON(?)".to_string()
            }
            Operand::Value(v) => {
                bindings.push(v.clone());
                "?".to_string()
            }
            Operand::Raw(expr) => expr.as_str().to_string(),
        };
        Ok(format!(
            "{field} = JSON_SET({field}, {}, {parameter})",
            json_path(&path)
        ))
    }

    fn compile_update_with_joins_or_limit(&self, query: &QueryBuilder, columns: &str) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(format!(
            "UPDATE {table} SET {columns} WHERE {}",
            self.row_key_subquery(query, "rowid")?
        ))
    }

    fn compile_delete_with_joins_or_limit(&self, query: &QueryBuilder) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("DELETE FROM {table}"),
            format!("WHERE {}", self.row_key_subquery(query, "rowid")?),
        ]))
    }

    /// SQLite has no TRUNCATE: the autoincrement counter is reset, then
    /// every row deleted.
    fn compile_truncate(&self, query: &QueryBuilder) -> Result<Vec<CompiledQuery>> {
        let table = self.target_table(query)?;
        let name = format!("{}{table}", self.base.table_prefix());
        Ok(vec![
            self.finish(
                format!(
                    "DELETE FROM {} WHERE {} = ?",
                    self.base.wrap_value("sqlite_sequence"),
                    self.base.wrap_value("name")
                ),
                vec![SqlValue::Text(name)],
            )?,
            self.finish(format!("DELETE FROM {}", self.wrap_table(table)), Vec::new())?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_date_uses_strftime() {
        let grammar = SqliteGrammar::new();
        let query = QueryBuilder::table("orders")
            .where_date("created_at", Operator::Eq, "2024-01-31")
            .unwrap();
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            r#"SELECT * FROM "orders" WHERE STRFTIME('%Y-%m-%d', "created_at") = CAST(? AS TEXT)"#
        );
    }

    #[test]
    fn test_union_members_are_derived_tables() {
        let grammar = SqliteGrammar::new();
        let query = QueryBuilder::table("a").union(QueryBuilder::table("b"));
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            r#"SELECT * FROM (SELECT * FROM "a") UNION SELECT * FROM (SELECT * FROM "b")"#
        );
    }

    #[test]
    fn test_truncate_resets_sequence() {
        let grammar = SqliteGrammar::new().with_table_prefix("app_");
        let statements = grammar.compile_truncate(&QueryBuilder::table("users")).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].sql,
            r#"DELETE FROM "sqlite_sequence" WHERE "name" = ?"#
        );
        assert_eq!(statements[0].bindings, vec![SqlValue::Text("app_users".into())]);
        assert_eq!(statements[1].sql, r#"DELETE FROM "app_users""#);
    }

    #[test]
    fn test_delete_with_limit_uses_rowid() {
        let grammar = SqliteGrammar::new();
        let query = QueryBuilder::table("logs")
            .where_("level", Operator::Eq, "debug")
            .limit(100);
        let compiled = grammar.compile_delete(&query).unwrap();
        assert_eq!(
            compiled.sql,
            r#"DELETE FROM "logs" WHERE "rowid" IN (SELECT "logs"."rowid" FROM "logs" WHERE "level" = ? LIMIT 100)"#
        );
        assert_eq!(compiled.bindings, vec![SqlValue::Text("debug".into())]);
    }

    #[test]
    fn test_group_limit_needs_window_functions() {
        let grammar = SqliteGrammar::new().with_version(Some(ServerVersion::new(3, 24, 0)));
        let query = QueryBuilder::table("posts").group_limit(2, "user_id");
        assert!(matches!(
            grammar.compile_select(&query),
            Err(Error::UnsupportedOperation { grammar: "sqlite", .. })
        ));
    }
}
