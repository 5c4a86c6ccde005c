//! PostgreSQL query grammar.

use super::{concatenate_parts, hex, json_field_and_path, quote_string, BaseGrammar, Grammar};
use crate::condition::{DatePart, FullTextMode, FullTextOptions};
use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::query::{
    CompiledQuery, Distinct, JoinClause, QueryBuilder, Upsert, UpsertColumn, Values,
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
    Operator::ILike,
    Operator::NotILike,
    Operator::SimilarTo,
    Operator::NotSimilarTo,
    Operator::Match,
    Operator::IMatch,
    Operator::NotMatch,
    Operator::NotIMatch,
    Operator::Contains,
    Operator::ContainedBy,
    Operator::Overlaps,
];

/// PostgreSQL grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresGrammar {
    base: BaseGrammar,
}

impl Default for PostgresGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresGrammar {
    /// Creates a new PostgreSQL grammar.
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

    /// Sets the server version.
    #[must_use]
    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.base.set_version(version);
        self
    }

    /// `"col"->'a'->'b'` with every segment as `->`, for jsonb operators.
    fn wrap_json_object(&self, value: &str) -> String {
        let (field, path) = json_field_and_path(value);
        let mut sql = self.wrap_segments(field);
        for segment in path {
            sql.push_str("->");
            sql.push_str(&json_segment(segment));
        }
        sql
    }
}

/// Numeric segments index arrays; anything else is a quoted key.
fn json_segment(segment: &str) -> String {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.to_string()
    } else {
        quote_string(segment)
    }
}

impl Grammar for PostgresGrammar {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn base(&self) -> &BaseGrammar {
        &self.base
    }

    fn operators(&self) -> &'static [Operator] {
        OPERATORS
    }

    /// `"meta"->'a'->>'b'`: the last segment is extracted as text.
    fn wrap_json_selector(&self, value: &str) -> String {
        let (field, path) = json_field_and_path(value);
        let mut sql = self.wrap_segments(field);
        let last = path.len().saturating_sub(1);
        for (i, segment) in path.iter().enumerate() {
            sql.push_str(if i == last { "->>" } else { "->" });
            sql.push_str(&json_segment(segment));
        }
        sql
    }

    fn escape_bool(&self, value: bool) -> String {
        String::from(if value { "TRUE" } else { "FALSE" })
    }

    fn escape_blob(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex(bytes))
    }

    fn escape_array(&self, items: &[SqlValue]) -> Result<String> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.escape(item)?);
        }
        Ok(format!("ARRAY[{}]", out.join(", ")))
    }

    fn compile_select_keyword(&self, query: &QueryBuilder) -> String {
        match &query.distinct {
            Distinct::Off => "SELECT".to_string(),
            Distinct::All => "SELECT DISTINCT".to_string(),
            Distinct::Columns(columns) => {
                format!("SELECT DISTINCT ON ({})", self.columnize(columns))
            }
        }
    }

    fn compile_join_lateral(&self, join: &JoinClause, table: &str) -> Result<String> {
        Ok(format!("{} JOIN LATERAL {table} ON TRUE", join.join_type.as_sql()))
    }

    /// Pattern operators compare the text form so they work on any type.
    fn where_basic(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        let column = self.wrap(column);
        let column = if op.is_like() {
            format!("{column}::text")
        } else {
            column
        };
        Ok(format!("{column} {op} {}", self.parameter(value)))
    }

    fn where_bitwise(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        Ok(format!(
            "({} {op} {})::bool",
            self.wrap(column),
            self.parameter(value)
        ))
    }

    fn where_in(&self, column: &str, values: &[Operand], not: bool) -> String {
        let (op, quantifier) = if not { ("<>", "ALL") } else { ("=", "ANY") };
        format!(
            "{} {op} {quantifier}(ARRAY[{}])",
            self.wrap(column),
            self.parameterize(values)
        )
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
            DatePart::Date => format!("{column}::date {op} {value}"),
            DatePart::Time => format!("{column}::time {op} {value}"),
            DatePart::Day | DatePart::Month | DatePart::Year => format!(
                "EXTRACT({} FROM {column}) {op} {value}",
                part.name().to_ascii_uppercase()
            ),
        })
    }

    fn where_json_contains(&self, column: &str) -> Result<String> {
        Ok(format!("({})::jsonb @> ?", self.wrap_json_object(column)))
    }

    fn where_json_contains_key(&self, column: &str) -> Result<String> {
        let (field, mut path) = json_field_and_path(column);
        let Some(last) = path.pop() else {
            return Err(Error::construction(
                "JSON key predicate",
                format!("'{column}' does not name a key"),
            ));
        };
        let mut parent = self.wrap_segments(field);
        for segment in path {
            parent.push_str("->");
            parent.push_str(&json_segment(segment));
        }
        let index = last
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(last);
        if let Ok(index) = index.parse::<i64>() {
            return Ok(format!(
                "CASE WHEN JSONB_TYPEOF(({parent})::jsonb) = 'array' \
                 THEN JSONB_ARRAY_LENGTH(({parent})::jsonb) >= {} ELSE FALSE END",
                index.saturating_add(1)
            ));
        }
        Ok(format!(
            "COALESCE(JSONB_EXISTS(({parent})::jsonb, {}), FALSE)",
            quote_string(last)
        ))
    }

    fn where_json_length(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        Ok(format!(
            "JSONB_ARRAY_LENGTH(({})::jsonb) {op} {}",
            self.wrap_json_object(column),
            self.parameter(value)
        ))
    }

    fn where_full_text(&self, columns: &[String], options: &FullTextOptions) -> Result<String> {
        let language = quote_string(options.language.as_deref().unwrap_or("english"));
        let vectors: Vec<String> = columns
            .iter()
            .map(|c| format!("TO_TSVECTOR({language}, {})", self.wrap(c)))
            .collect();
        let function = match options.mode {
            FullTextMode::Natural => "PLAINTO_TSQUERY",
            FullTextMode::Boolean => "TO_TSQUERY",
            FullTextMode::Phrase => "PHRASETO_TSQUERY",
            FullTextMode::Websearch => "WEBSEARCH_TO_TSQUERY",
        };
        Ok(format!(
            "({}) @@ {function}({language}, ?)",
            vectors.join(" || ")
        ))
    }

    fn compile_insert_or_ignore(&self, query: &QueryBuilder, values: &Values) -> Result<CompiledQuery> {
        let sql = format!("{} ON CONFLICT DO NOTHING", self.insert_sql(query, values)?);
        self.finish(sql, values.bindings())
    }

    fn compile_insert_get_id(
        &self,
        query: &QueryBuilder,
        values: &Values,
        sequence: Option<&str>,
    ) -> Result<CompiledQuery> {
        let sql = format!(
            "{} RETURNING {}",
            self.insert_sql(query, values)?,
            self.wrap(sequence.unwrap_or("id"))
        );
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

    /// `"meta" = JSONB_SET("meta"::jsonb, '{a,b}', ?)` with the value bound
    /// as a JSON document.
    fn compile_json_update_column(
        &self,
        column: &str,
        value: &Operand,
        bindings: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        let field = self.wrap_segments(field);
        let path = format!("{{{}}}", path.join(","));
        let parameter = match value {
            Operand::Value(v) => {
                bindings.push(SqlValue::Json(v.to_json()));
                "?".to_string()
            }
            Operand::Raw(expr) => expr.as_str().to_string(),
        };
        Ok(format!(
            "{field} = JSONB_SET({field}::jsonb, {}, {parameter})",
            quote_string(&path)
        ))
    }

    fn compile_update_with_joins_or_limit(&self, query: &QueryBuilder, columns: &str) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(format!(
            "UPDATE {table} SET {columns} WHERE {}",
            self.row_key_subquery(query, "ctid")?
        ))
    }

    fn compile_delete_with_joins_or_limit(&self, query: &QueryBuilder) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("DELETE FROM {table}"),
            format!("WHERE {}", self.row_key_subquery(query, "ctid")?),
        ]))
    }

    fn compile_truncate(&self, query: &QueryBuilder) -> Result<Vec<CompiledQuery>> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(vec![self.finish(
            format!("TRUNCATE {table} RESTART IDENTITY CASCADE"),
            Vec::new(),
        )?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Record;

    #[test]
    fn test_json_selector() {
        let grammar = PostgresGrammar::new();
        assert_eq!(grammar.wrap("meta->a->b"), r#""meta"->'a'->>'b'"#);
        assert_eq!(grammar.wrap("meta->tags->0"), r#""meta"->'tags'->>0"#);
        assert_eq!(grammar.wrap("users.meta->a"), r#""users"."meta"->>'a'"#);
    }

    #[test]
    fn test_escape_literals() {
        let grammar = PostgresGrammar::new();
        assert_eq!(grammar.escape(&SqlValue::Bool(true)).unwrap(), "TRUE");
        assert_eq!(grammar.escape(&SqlValue::Blob(vec![0xde, 0xad])).unwrap(), r"'\xdead'::bytea");
        assert_eq!(
            grammar
                .escape(&SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Text("a'b".into())]))
                .unwrap(),
            "ARRAY[1, 'a''b']"
        );
    }

    #[test]
    fn test_json_update_binds_document() {
        let grammar = PostgresGrammar::new();
        let query = QueryBuilder::table("users").where_("id", Operator::Eq, 1);
        let compiled = grammar
            .compile_update(&query, &Record::new().set("meta->theme", "dark"))
            .unwrap();
        assert_eq!(
            compiled.sql,
            r#"UPDATE "users" SET "meta" = JSONB_SET("meta"::jsonb, '{theme}', ?) WHERE "id" = ?"#
        );
        assert_eq!(
            compiled.bindings,
            vec![SqlValue::Json(serde_json::json!("dark")), SqlValue::Int(1)]
        );
    }
}
