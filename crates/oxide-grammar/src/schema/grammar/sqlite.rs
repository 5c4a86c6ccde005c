//! SQLite table definitions.
//!
//! SQLite cannot alter most table structure in place: primary and foreign
//! keys only compile inside `CREATE TABLE`, and dropping or renaming
//! columns depends on the library version.

use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::grammar::{Grammar, SqliteGrammar};
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, ForeignKeyDefinition, IndexCommand};

use super::{apply_modifiers, check_in, Modifier, SchemaGrammar};

/// SQLite schema grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSchemaGrammar {
    grammar: SqliteGrammar,
    schema: Option<String>,
}

impl Default for SqliteSchemaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteSchemaGrammar {
    const MODIFIERS: &'static [Modifier<Self>] = &[
        Self::modify_increment,
        Self::modify_nullable,
        Self::modify_default,
        Self::modify_collate,
        Self::modify_virtual_as,
        Self::modify_stored_as,
    ];

    /// Creates a new SQLite schema grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            grammar: SqliteGrammar::new(),
            schema: None,
        }
    }

    /// Prefixes every table name.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.grammar = self.grammar.with_table_prefix(prefix);
        self
    }

    /// Sets the library version.
    #[must_use]
    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.grammar = self.grammar.with_version(version);
        self
    }

    /// Sets the attached database used by introspection queries.
    #[must_use]
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Arguments of the `pragma_*` table functions: `'table'[, 'schema']`.
    fn pragma_arguments(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = match table.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (schema.or(self.schema.as_deref()), table),
        };
        let table = self.quote(&self.prefixed(table))?;
        Ok(match schema {
            Some(schema) => format!("{table}, {}", self.quote(schema)?),
            None => table,
        })
    }

    fn inline_foreign_keys(&self, blueprint: &Blueprint) -> String {
        blueprint
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::Foreign(foreign) => Some(self.inline_foreign_key(foreign)),
                _ => None,
            })
            .collect()
    }

    fn inline_foreign_key(&self, foreign: &ForeignKeyDefinition) -> String {
        format!(", {}", self.foreign_key_clause(foreign))
    }

    fn inline_primary_key(&self, blueprint: &Blueprint) -> String {
        blueprint
            .commands()
            .iter()
            .find_map(|command| match command {
                Command::Primary(index) => Some(format!(", PRIMARY KEY ({})", self.columnize(&index.columns))),
                _ => None,
            })
            .unwrap_or_default()
    }

    // Modifiers

    fn modify_increment(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok((column.auto_increment && column.column_type.is_serial())
            .then(|| " PRIMARY KEY AUTOINCREMENT".to_string()))
    }

    fn modify_nullable(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.virtual_as.is_none() && column.stored_as.is_none() {
            return Ok((!column.is_nullable()).then(|| " NOT NULL".to_string()));
        }
        Ok((column.nullable == Some(false)).then(|| " NOT NULL".to_string()))
    }

    fn modify_default(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.virtual_as.is_some() || column.stored_as.is_some() {
            return Ok(None);
        }
        match self.effective_default(column) {
            Some(value) => Ok(Some(format!(" DEFAULT {}", self.default_value(&value)?))),
            None => Ok(None),
        }
    }

    fn modify_collate(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        match column.collation.as_deref() {
            Some(collation) => Ok(Some(format!(" COLLATE {}", self.quote(collation)?))),
            None => Ok(None),
        }
    }

    fn modify_virtual_as(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .virtual_as
            .as_ref()
            .map(|expression| format!(" AS ({expression})")))
    }

    fn modify_stored_as(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .stored_as
            .as_ref()
            .map(|expression| format!(" AS ({expression}) STORED")))
    }
}

impl SchemaGrammar for SqliteSchemaGrammar {
    fn query_grammar(&self) -> &dyn Grammar {
        &self.grammar
    }

    fn default_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn type_sql(&self, column: &ColumnDefinition) -> Result<String> {
        Ok(match &column.column_type {
            ColumnType::Char { .. }
            | ColumnType::String { .. }
            | ColumnType::Uuid
            | ColumnType::IpAddress
            | ColumnType::MacAddress => "VARCHAR".to_string(),
            ColumnType::TinyText
            | ColumnType::Text
            | ColumnType::MediumText
            | ColumnType::LongText
            | ColumnType::Json
            | ColumnType::Jsonb => "TEXT".to_string(),
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::MediumInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::Year => "INTEGER".to_string(),
            ColumnType::Float { .. } => "FLOAT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Decimal { .. } => "NUMERIC".to_string(),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
            ColumnType::Enum { allowed } => format!("VARCHAR {}", check_in(self, column, allowed)?),
            ColumnType::Set { .. } => return Err(Error::unsupported(self.name(), "set columns")),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime { .. }
            | ColumnType::DateTimeTz { .. }
            | ColumnType::Timestamp { .. }
            | ColumnType::TimestampTz { .. } => "DATETIME".to_string(),
            ColumnType::Time { .. } | ColumnType::TimeTz { .. } => "TIME".to_string(),
            ColumnType::Binary { .. } => "BLOB".to_string(),
            ColumnType::Geometry { .. } | ColumnType::Geography { .. } => "GEOMETRY".to_string(),
            ColumnType::Vector { .. } => return Err(Error::unsupported(self.name(), "vector columns")),
            ColumnType::Computed { .. } => {
                return Err(Error::unsupported(self.name(), "computed columns without a type"))
            }
        })
    }

    fn modifiers_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<String> {
        apply_modifiers(self, Self::MODIFIERS, blueprint, column)
    }

    fn compile_create(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.columns().iter().collect();
        Ok(vec![format!(
            "CREATE {}TABLE {} ({}{}{})",
            if blueprint.temporary { "TEMPORARY " } else { "" },
            self.wrap_table(blueprint),
            self.get_columns(blueprint, &columns)?.join(", "),
            self.inline_foreign_keys(blueprint),
            self.inline_primary_key(blueprint)
        )])
    }

    fn compile_add(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        blueprint
            .added_columns()
            .map(|column| {
                if column.stored_as.is_some() {
                    return Err(Error::unsupported(self.name(), "adding stored generated columns"));
                }
                Ok(format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    self.wrap_table(blueprint),
                    self.column_sql(blueprint, column)?
                ))
            })
            .collect()
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, columns: &[String]) -> Result<Vec<String>> {
        if self.grammar.base().older_than(3, 35, 0) {
            return Err(Error::unsupported(self.name(), "dropping columns before SQLite 3.35"));
        }
        Ok(columns
            .iter()
            .map(|column| {
                format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    self.wrap_table(blueprint),
                    self.wrap(column)
                )
            })
            .collect())
    }

    fn compile_rename_column(&self, blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        if self.grammar.base().older_than(3, 25, 0) {
            return Err(Error::unsupported(self.name(), "renaming columns before SQLite 3.25"));
        }
        Ok(vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.wrap_table(blueprint),
            self.wrap(from),
            self.wrap(to)
        )])
    }

    fn compile_primary(&self, blueprint: &Blueprint, _index: &IndexCommand) -> Result<Vec<String>> {
        if blueprint.creating() {
            return Ok(Vec::new());
        }
        Err(Error::unsupported(self.name(), "adding a primary key to an existing table"))
    }

    fn compile_foreign(&self, blueprint: &Blueprint, _foreign: &ForeignKeyDefinition) -> Result<Vec<String>> {
        if blueprint.creating() {
            return Ok(Vec::new());
        }
        Err(Error::unsupported(self.name(), "adding a foreign key to an existing table"))
    }

    fn compile_drop_primary(&self, _blueprint: &Blueprint, _name: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "dropping a primary key"))
    }

    fn compile_drop_foreign(&self, _blueprint: &Blueprint, _name: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "dropping a foreign key"))
    }

    fn compile_enable_foreign_key_constraints(&self) -> String {
        "PRAGMA foreign_keys = ON".to_string()
    }

    fn compile_disable_foreign_key_constraints(&self) -> String {
        "PRAGMA foreign_keys = OFF".to_string()
    }

    fn compile_tables(&self, schema: Option<&str>) -> Result<String> {
        let filter = match schema.or(self.schema.as_deref()) {
            Some(schema) => format!(" AND tl.schema = {}", self.quote(schema)?),
            None => String::new(),
        };
        Ok(format!(
            "SELECT tl.name AS name, tl.schema AS schema FROM pragma_table_list AS tl \
             WHERE tl.type IN ('table', 'virtual') AND tl.name NOT LIKE 'sqlite\\_%' ESCAPE '\\'{filter} \
             ORDER BY tl.schema, tl.name"
        ))
    }

    fn compile_views(&self, schema: Option<&str>) -> Result<String> {
        let schema = schema.or(self.schema.as_deref()).unwrap_or("main");
        Ok(format!(
            "SELECT name, {} AS schema, sql AS definition FROM {}.sqlite_master \
             WHERE type = 'view' ORDER BY name",
            self.quote(schema)?,
            self.wrap(schema)
        ))
    }

    fn compile_columns(&self, schema: Option<&str>, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT name, type, NOT \"notnull\" AS \"nullable\", dflt_value AS \"default\", \
             pk AS \"primary\", hidden AS \"extra\" \
             FROM pragma_table_xinfo({}) ORDER BY cid ASC",
            self.pragma_arguments(schema, table)?
        ))
    }

    fn compile_indexes(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let arguments = self.pragma_arguments(schema, table)?;
        Ok(format!(
            "SELECT 'primary' AS name, group_concat(col) AS columns, 1 AS \"unique\", 1 AS \"primary\" \
             FROM (SELECT name AS col FROM pragma_table_info({arguments}) WHERE pk > 0 ORDER BY pk, cid) \
             GROUP BY name \
             UNION SELECT name, group_concat(col) AS columns, \"unique\", origin = 'pk' AS \"primary\" \
             FROM (SELECT il.*, ii.name AS col FROM pragma_index_list({arguments}) il, \
             pragma_index_info(il.name) ii ORDER BY il.seq, ii.seqno) \
             GROUP BY name, \"unique\", \"primary\""
        ))
    }

    fn compile_foreign_keys(&self, schema: Option<&str>, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT group_concat(\"from\") AS columns, \"table\" AS foreign_table, \
             group_concat(\"to\") AS foreign_columns, on_update, on_delete \
             FROM (SELECT * FROM pragma_foreign_key_list({}) ORDER BY id DESC, seq) \
             GROUP BY id, \"table\", on_update, on_delete",
            self.pragma_arguments(schema, table)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(blueprint: &Blueprint) -> Result<Vec<String>> {
        blueprint.to_sql(&SqliteSchemaGrammar::new())
    }

    #[test]
    fn test_create_inlines_keys() {
        let mut table = Blueprint::create("posts");
        table.id();
        table.foreign_id("user_id").constrained("users", "id").cascade_on_delete();
        table.string("title", None).collation("nocase");
        assert_eq!(
            compile(&table).unwrap(),
            vec![concat!(
                r#"CREATE TABLE "posts" ("id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, "#,
                r#""user_id" INTEGER NOT NULL, "title" VARCHAR NOT NULL COLLATE 'nocase', "#,
                r#"FOREIGN KEY ("user_id") REFERENCES "users" ("id") ON DELETE CASCADE)"#
            )]
        );
    }

    #[test]
    fn test_composite_primary_key() {
        let mut table = Blueprint::create("role_user");
        table.integer("role_id");
        table.integer("user_id");
        table.primary(["role_id", "user_id"]);
        assert_eq!(
            compile(&table).unwrap(),
            vec![r#"CREATE TABLE "role_user" ("role_id" INTEGER NOT NULL, "user_id" INTEGER NOT NULL, PRIMARY KEY ("role_id", "user_id"))"#]
        );
    }

    #[test]
    fn test_add_emits_one_statement_per_column() {
        let mut table = Blueprint::new("users");
        table.string("nickname", None).nullable();
        table.integer("age").default(18);
        assert_eq!(
            compile(&table).unwrap(),
            vec![
                r#"ALTER TABLE "users" ADD COLUMN "nickname" VARCHAR"#,
                r#"ALTER TABLE "users" ADD COLUMN "age" INTEGER NOT NULL DEFAULT 18"#,
            ]
        );
    }

    #[test]
    fn test_structural_changes_are_unsupported() {
        let mut table = Blueprint::new("users");
        table.string("name", None).change();
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));

        let mut table = Blueprint::new("users");
        table.foreign(ForeignKeyDefinition::new(["team_id"]).references(["id"]).on("teams"));
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));

        let mut table = Blueprint::new("users");
        table.drop_foreign("users_team_id_foreign");
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));

        let mut table = Blueprint::new("users");
        table.rename_index("a", "b");
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));

        let mut table = Blueprint::new("users");
        table.integer("total").stored_as("a + b");
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));
    }

    #[test]
    fn test_version_gates() {
        let mut table = Blueprint::new("users");
        table.drop_column(["a", "b"]);
        table.rename_column("c", "d");

        let old = SqliteSchemaGrammar::new().with_version(Some(ServerVersion::new(3, 31, 0)));
        assert!(matches!(table.to_sql(&old), Err(Error::UnsupportedOperation { .. })));

        let current = SqliteSchemaGrammar::new().with_version(Some(ServerVersion::new(3, 45, 1)));
        assert_eq!(
            table.to_sql(&current).unwrap(),
            vec![
                r#"ALTER TABLE "users" DROP COLUMN "a""#,
                r#"ALTER TABLE "users" DROP COLUMN "b""#,
                r#"ALTER TABLE "users" RENAME COLUMN "c" TO "d""#,
            ]
        );
    }

    #[test]
    fn test_generated_column_skips_default() {
        let mut table = Blueprint::create("items");
        table.integer("total").virtual_as("price * quantity").default(0);
        assert_eq!(
            compile(&table).unwrap(),
            vec![r#"CREATE TABLE "items" ("total" INTEGER AS (price * quantity))"#]
        );
    }

    #[test]
    fn test_indexes_and_pragmas() {
        let mut table = Blueprint::new("users");
        table.unique(["email"]);
        table.drop_index("users_name_index");
        assert_eq!(
            compile(&table).unwrap(),
            vec![
                r#"CREATE UNIQUE INDEX "users_email_unique" ON "users" ("email")"#,
                r#"DROP INDEX "users_name_index""#,
            ]
        );
        let grammar = SqliteSchemaGrammar::new();
        assert_eq!(grammar.compile_disable_foreign_key_constraints(), "PRAGMA foreign_keys = OFF");
        assert!(grammar
            .compile_columns(None, "users")
            .unwrap()
            .contains("pragma_table_xinfo('users')"));
        assert!(grammar
            .compile_foreign_keys(Some("aux"), "users")
            .unwrap()
            .contains("pragma_foreign_key_list('users', 'aux')"));
    }
}
