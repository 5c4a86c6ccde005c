//! MySQL and MariaDB query grammar.

use super::{
    base_insert_sql, concatenate, concatenate_parts, json_field_and_path, json_path, quote_string,
    window_group_limit, BaseGrammar, Grammar,
};
use crate::condition::{FullTextMode, FullTextOptions};
use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::query::{
    BindingType, CompiledQuery, Direction, GroupLimit, IndexHint, IndexHintType, JoinClause, Lock,
    OrderBy, QueryBuilder, Upsert, UpsertColumn, Values,
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
    Operator::ShiftLeft,
    Operator::ShiftRight,
    Operator::NullSafeEq,
    Operator::LikeBinary,
    Operator::RLike,
    Operator::NotRLike,
    Operator::Regexp,
    Operator::NotRegexp,
];

/// Largest unsigned BIGINT; MySQL has no OFFSET without LIMIT.
const MAX_LIMIT: &str = "18446744073709551615";

/// MySQL grammar. MariaDB shares it and is detected from the server
/// version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlGrammar {
    base: BaseGrammar,
}

impl Default for MySqlGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlGrammar {
    /// Creates a new MySQL grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: BaseGrammar::new('`', '`'),
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

    /// `LATERAL` arrived in MySQL 8.0.14; MariaDB has none.
    fn supports_lateral(&self) -> bool {
        !self.base.is_mariadb() && !self.base.older_than(8, 0, 14)
    }

    /// `INSERT ... AS alias` row references replaced `VALUES()` in 8.0.19.
    fn supports_upsert_alias(&self) -> bool {
        !self.base.is_mariadb() && !self.base.older_than(8, 0, 19)
    }

    /// Column plus optional path argument for the `JSON_*` functions.
    fn json_arguments(&self, column: &str) -> String {
        let (field, path) = json_field_and_path(column);
        let field = self.wrap_segments(field);
        if path.is_empty() {
            field
        } else {
            format!("{field}, {}", json_path(&path))
        }
    }

    /// Row numbering with session variables for servers without window
    /// functions. The partition column is prepended to the ordering so
    /// consecutive rows share a key.
    fn legacy_group_limit(&self, query: &QueryBuilder, limit: &GroupLimit) -> Result<String> {
        let mut inner = query.clone();
        inner.group_limit = None;
        let offset = inner.offset.take();
        let max = limit.value.saturating_add(offset.unwrap_or(0));
        inner.orders.insert(
            0,
            OrderBy::Column {
                column: limit.column.clone(),
                direction: Direction::Asc,
            },
        );

        let key = limit.column.rsplit('.').next().unwrap_or(&limit.column);
        let key = self.base.wrap_value(key);
        let row = self.base.wrap_value("group_row");
        let table = self.base.wrap_value("group_table");
        let mut sql = format!(
            "SELECT {table}.*, @group_row := IF(@group_key = {key}, @group_row + 1, 1) AS {row}, \
             @group_key := {key} FROM (SELECT @group_row := 0, @group_key := 0) AS {}, ({}) AS {table} \
             HAVING {row} <= {max}",
            self.base.wrap_value("group_variables"),
            concatenate(&self.compile_components(&inner)?)
        );
        if let Some(offset) = offset {
            sql.push_str(&format!(" AND {row} > {offset}"));
        }
        sql.push_str(&format!(" ORDER BY {row}"));
        Ok(sql)
    }

    /// Trailing `ORDER BY` and `LIMIT` accepted by single-table UPDATE and
    /// DELETE.
    fn order_and_limit(&self, query: &QueryBuilder) -> String {
        concatenate_parts(&[
            self.render_orders(&query.orders),
            query.limit.map_or_else(String::new, |n| format!("LIMIT {n}")),
        ])
    }
}

impl Grammar for MySqlGrammar {
    fn name(&self) -> &'static str {
        if self.base.is_mariadb() {
            "mariadb"
        } else {
            "mysql"
        }
    }

    fn base(&self) -> &BaseGrammar {
        &self.base
    }

    fn operators(&self) -> &'static [Operator] {
        OPERATORS
    }

    /// `JSON_UNQUOTE(JSON_EXTRACT(`meta`, '$."a"'))`
    fn wrap_json_selector(&self, value: &str) -> String {
        let (field, path) = json_field_and_path(value);
        format!(
            "JSON_UNQUOTE(JSON_EXTRACT({}, {}))",
            self.wrap_segments(field),
            json_path(&path)
        )
    }

    fn escape_string(&self, value: &str) -> Result<String> {
        if value.contains('\0') {
            return Err(Error::construction(
                "literal",
                "strings may not contain NUL bytes",
            ));
        }
        Ok(quote_string(&value.replace('\\', "\\\\")))
    }

    fn backslash_escapes(&self) -> bool {
        true
    }

    fn render_index_hint(&self, hint: &IndexHint) -> String {
        let keyword = match hint.kind {
            IndexHintType::Use => "USE",
            IndexHintType::Force => "FORCE",
            IndexHintType::Ignore => "IGNORE",
        };
        format!("{keyword} INDEX ({})", self.hint_indexes(hint))
    }

    fn compile_join_lateral(&self, join: &JoinClause, table: &str) -> Result<String> {
        if !self.supports_lateral() {
            return Err(Error::unsupported(self.name(), "lateral joins"));
        }
        Ok(format!("{} JOIN LATERAL {table} ON TRUE", join.join_type.as_sql()))
    }

    fn where_json_contains(&self, column: &str) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        let field = self.wrap_segments(field);
        Ok(if path.is_empty() {
            format!("JSON_CONTAINS({field}, ?)")
        } else {
            format!("JSON_CONTAINS({field}, ?, {})", json_path(&path))
        })
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
            "IFNULL(JSON_CONTAINS_PATH({}, 'one', {}), 0)",
            self.wrap_segments(field),
            json_path(&path)
        ))
    }

    fn where_json_length(&self, column: &str, op: Operator, value: &Operand) -> Result<String> {
        Ok(format!(
            "JSON_LENGTH({}) {op} {}",
            self.json_arguments(column),
            self.parameter(value)
        ))
    }

    fn where_full_text(&self, columns: &[String], options: &FullTextOptions) -> Result<String> {
        let mode = match options.mode {
            FullTextMode::Natural if options.expanded => {
                "IN NATURAL LANGUAGE MODE WITH QUERY EXPANSION"
            }
            FullTextMode::Natural => "IN NATURAL LANGUAGE MODE",
            FullTextMode::Boolean => "IN BOOLEAN MODE",
            FullTextMode::Phrase | FullTextMode::Websearch => {
                return Err(Error::unsupported(
                    self.name(),
                    format!("full-text mode {:?}", options.mode),
                ));
            }
        };
        Ok(format!(
            "MATCH ({}) AGAINST (? {mode})",
            self.columnize(columns)
        ))
    }

    fn compile_random(&self, seed: Option<u64>) -> String {
        seed.map_or_else(|| "RAND()".to_string(), |seed| format!("RAND({seed})"))
    }

    fn pagination(&self, limit: Option<u64>, offset: Option<u64>) -> Vec<String> {
        let mut out = Vec::new();
        match (limit, offset) {
            (Some(limit), _) => out.push(format!("LIMIT {limit}")),
            (None, Some(_)) => out.push(format!("LIMIT {MAX_LIMIT}")),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            out.push(format!("OFFSET {offset}"));
        }
        out
    }

    fn compile_lock(&self, query: &QueryBuilder) -> String {
        match &query.lock {
            None => String::new(),
            Some(Lock::Update) => "FOR UPDATE".to_string(),
            Some(Lock::Shared) => "LOCK IN SHARE MODE".to_string(),
            Some(Lock::Raw(sql)) => sql.as_str().to_string(),
        }
    }

    fn uses_window_group_limit(&self) -> bool {
        self.base.is_mariadb() || !self.base.older_than(8, 0, 11)
    }

    fn compile_group_limit(&self, query: &QueryBuilder, limit: &GroupLimit) -> Result<String> {
        if self.uses_window_group_limit() {
            window_group_limit(self, query, limit)
        } else {
            self.legacy_group_limit(query, limit)
        }
    }

    fn insert_sql(&self, query: &QueryBuilder, values: &Values) -> Result<String> {
        if values.is_empty() {
            let table = self.wrap_table(self.target_table(query)?);
            return Ok(format!("INSERT INTO {table} () VALUES ()"));
        }
        base_insert_sql(self, query, values)
    }

    fn compile_insert_or_ignore(&self, query: &QueryBuilder, values: &Values) -> Result<CompiledQuery> {
        let sql = self.insert_sql(query, values)?;
        let sql = sql
            .strip_prefix("INSERT")
            .map_or_else(|| sql.clone(), |rest| format!("INSERT IGNORE{rest}"));
        self.finish(sql, values.bindings())
    }

    fn compile_upsert(&self, query: &QueryBuilder, upsert: &Upsert) -> Result<CompiledQuery> {
        let update = upsert.update_columns();
        if update.is_empty() {
            return self.compile_insert(query, upsert.values());
        }
        let alias = self.supports_upsert_alias();
        let row = self.base.wrap_value("upsert_row");
        let mut sql = self.insert_sql(query, upsert.values())?;
        if alias {
            sql.push_str(&format!(" AS {row}"));
        }
        let assignments: Vec<String> = update
            .iter()
            .map(|column| match column {
                UpsertColumn::Excluded(c) if alias => {
                    format!("{} = {row}.{}", self.wrap(c), self.wrap(c))
                }
                UpsertColumn::Excluded(c) => {
                    format!("{} = VALUES({})", self.wrap(c), self.wrap(c))
                }
                UpsertColumn::Set(c, value) => format!("{} = {}", self.wrap(c), self.parameter(value)),
            })
            .collect();
        sql.push_str(" ON DUPLICATE KEY UPDATE ");
        sql.push_str(&assignments.join(", "));
        self.finish(sql, upsert.bindings())
    }

    /// `` `meta` = JSON_SET(`meta`, '$."a"', ?) ``; structured values go
    /// through `JSON_EXTRACT(?, '$')` so they are stored as JSON rather
    /// than as a string.
    fn compile_json_update_column(
        &self,
        column: &str,
        value: &Operand,
        bindings: &mut Vec<SqlValue>,
    ) -> Result<String> {
        let (field, path) = json_field_and_path(column);
        let field = self.wrap_segments(field);
        let parameter = match value {
            Operand::Value(v @ (SqlValue::Bool(_) | SqlValue::Json(_) | SqlValue::Array(_))) => {
                bindings.push(SqlValue::Json(v.to_json()));
                "JSON_EXTRACT(?, '$')".to_string()
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

    fn compile_update_without_joins(&self, query: &QueryBuilder, columns: &str) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("UPDATE {table} SET {columns}"),
            self.compile_wheres(&query.wheres)?,
            self.order_and_limit(query),
        ]))
    }

    fn compile_update_with_joins_or_limit(&self, query: &QueryBuilder, columns: &str) -> Result<String> {
        if query.joins.is_empty() {
            return self.compile_update_without_joins(query, columns);
        }
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("UPDATE {table}"),
            self.compile_joins(&query.joins)?,
            format!("SET {columns}"),
            self.compile_wheres(&query.wheres)?,
        ]))
    }

    /// Join values precede the assignments because the joins are rendered
    /// before `SET`.
    fn prepare_bindings_for_update(&self, query: &QueryBuilder, values: Vec<SqlValue>) -> Vec<SqlValue> {
        let raw = self.raw_bindings(query);
        let mut skip = self.unrendered_write_bindings(query);
        skip.push(BindingType::Join);
        let mut bindings = raw.get(BindingType::Join).to_vec();
        bindings.extend(values);
        bindings.extend(raw.flatten_except(&skip));
        bindings
    }

    /// ORDER BY is kept on single-table writes and dropped with joins.
    fn unrendered_write_bindings(&self, query: &QueryBuilder) -> Vec<BindingType> {
        if query.joins.is_empty() {
            vec![BindingType::Select]
        } else {
            vec![BindingType::Select, BindingType::Order]
        }
    }

    fn compile_delete_without_joins(&self, query: &QueryBuilder) -> Result<String> {
        let table = self.wrap_table(self.target_table(query)?);
        Ok(concatenate_parts(&[
            format!("DELETE FROM {table}"),
            self.compile_wheres(&query.wheres)?,
            self.order_and_limit(query),
        ]))
    }

    fn compile_delete_with_joins_or_limit(&self, query: &QueryBuilder) -> Result<String> {
        if query.joins.is_empty() {
            return self.compile_delete_without_joins(query);
        }
        let table = self.target_table(query)?;
        let alias = self.wrap_table(super::table_alias(table));
        Ok(concatenate_parts(&[
            format!("DELETE {alias} FROM {}", self.wrap_table(table)),
            self.compile_joins(&query.joins)?,
            self.compile_wheres(&query.wheres)?,
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Record;

    #[test]
    fn test_backslashes_are_escaped() {
        let grammar = MySqlGrammar::new();
        assert_eq!(
            grammar.escape(&SqlValue::Text(r"a\'b".into())).unwrap(),
            r"'a\\''b'"
        );
        assert_eq!(grammar.placeholder_positions(r"SELECT '\'?' , ?"), vec![15]);
    }

    #[test]
    fn test_offset_without_limit() {
        let grammar = MySqlGrammar::new();
        let query = QueryBuilder::table("users").offset(5);
        assert_eq!(
            grammar.compile_select(&query).unwrap().sql,
            "SELECT * FROM `users` LIMIT 18446744073709551615 OFFSET 5"
        );
    }

    #[test]
    fn test_upsert_alias_depends_on_version() {
        let values = Values::try_from(Record::new().set("email", "a@b.c").set("name", "A")).unwrap();
        let upsert = Upsert::new(values, ["email"]).update("name");
        let query = QueryBuilder::table("users");

        let modern = MySqlGrammar::new().compile_upsert(&query, &upsert).unwrap();
        assert_eq!(
            modern.sql,
            "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) AS `upsert_row` \
             ON DUPLICATE KEY UPDATE `name` = `upsert_row`.`name`"
        );

        let old = MySqlGrammar::new()
            .with_version(Some(ServerVersion::new(5, 7, 40)))
            .compile_upsert(&query, &upsert)
            .unwrap();
        assert_eq!(
            old.sql,
            "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
        );
    }

    #[test]
    fn test_lateral_join_needs_recent_mysql() {
        let sub = QueryBuilder::table("posts").where_column("posts.user_id", Operator::Eq, "users.id");
        let query = QueryBuilder::table("users").join_lateral(sub, "latest");
        assert!(MySqlGrammar::new().compile_select(&query).is_ok());

        let mariadb = MySqlGrammar::new().with_version(Some(ServerVersion::new(10, 11, 0).mariadb()));
        assert!(matches!(
            mariadb.compile_select(&query),
            Err(Error::UnsupportedOperation { grammar: "mariadb", .. })
        ));
    }

    #[test]
    fn test_update_with_join_binds_join_values_first() {
        let grammar = MySqlGrammar::new();
        let query = QueryBuilder::table("users")
            .join_clause(
                crate::query::JoinClause::new(crate::query::JoinType::Inner, "teams")
                    .on("teams.id", Operator::Eq, "users.team_id")
                    .where_("teams.active", Operator::Eq, true),
            )
            .where_("users.id", Operator::Eq, 7);
        let compiled = grammar
            .compile_update(&query, &Record::new().set("users.name", "x"))
            .unwrap();
        assert_eq!(
            compiled.sql,
            "UPDATE `users` INNER JOIN `teams` ON `teams`.`id` = `users`.`team_id` \
             AND `teams`.`active` = ? SET `users`.`name` = ? WHERE `users`.`id` = ?"
        );
        assert_eq!(
            compiled.bindings,
            vec![SqlValue::Bool(true), SqlValue::Text("x".into()), SqlValue::Int(7)]
        );
    }
}
