//! Table blueprints.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::column::{ColumnDefinition, ColumnType};
use super::command::{Command, ForeignKeyDefinition, IndexCommand, IndexKind};
use super::grammar::{FluentCommand, SchemaGrammar};

/// Columns and commands for one table.
///
/// Column methods return the new [`ColumnDefinition`] for chaining
/// modifiers; command methods record the command. Nothing is compiled until
/// [`Blueprint::to_sql`].
///
/// ```rust
/// use oxide_grammar::schema::{Blueprint, PostgresSchemaGrammar};
///
/// let mut table = Blueprint::create("users");
/// table.id();
/// table.string("email", None).unique();
///
/// let statements = table.to_sql(&PostgresSchemaGrammar::new()).unwrap();
/// assert_eq!(
///     statements,
///     vec![
///         r#"CREATE TABLE "users" ("id" BIGSERIAL NOT NULL PRIMARY KEY, "email" VARCHAR(255) NOT NULL)"#,
///         r#"ALTER TABLE "users" ADD CONSTRAINT "users_email_unique" UNIQUE ("email")"#,
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Blueprint {
    /// Table name, without prefix.
    pub(crate) table: String,
    pub(crate) columns: Vec<ColumnDefinition>,
    pub(crate) commands: Vec<Command>,
    /// Create a temporary table.
    pub temporary: bool,
    /// Table character set (MySQL).
    pub charset: Option<String>,
    /// Table collation (MySQL).
    pub collation: Option<String>,
    /// Storage engine (MySQL).
    pub engine: Option<String>,
}

impl Blueprint {
    /// Creates a blueprint that alters `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Creates a blueprint that creates `table`.
    #[must_use]
    pub fn create(table: impl Into<String>) -> Self {
        let mut blueprint = Self::new(table);
        blueprint.commands.push(Command::Create);
        blueprint
    }

    /// Table name, without prefix.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every column in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Recorded commands.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Whether the blueprint creates its table.
    #[must_use]
    pub fn creating(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, Command::Create))
    }

    /// Columns to add to an existing table.
    pub fn added_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| !c.change)
    }

    /// Columns to alter.
    pub fn changed_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.change)
    }

    /// Whether a primary key command covers `column`.
    #[must_use]
    pub fn has_primary_on(&self, column: &str) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, Command::Primary(index) if index.columns.iter().any(|name| name == column)))
    }

    /// Index name derived from the table, its columns and the index type:
    /// `users_email_unique`.
    #[must_use]
    pub fn index_name(&self, prefix: &str, suffix: &str, columns: &[String]) -> String {
        let table = match self.table.rsplit_once('.') {
            Some((schema, table)) => format!("{schema}.{prefix}{table}"),
            None => format!("{prefix}{}", self.table),
        };
        format!("{table}_{}_{suffix}", columns.join("_"))
            .to_lowercase()
            .replace(['-', '.'], "_")
    }

    // Columns

    /// Appends a column of `column_type`.
    pub fn add_column(&mut self, column_type: ColumnType, name: impl Into<String>) -> &mut ColumnDefinition {
        self.columns.push(ColumnDefinition::new(name, column_type));
        let index = self.columns.len() - 1;
        &mut self.columns[index]
    }

    /// Auto-incrementing `BIGINT` key named `id`.
    pub fn id(&mut self) -> &mut ColumnDefinition {
        self.big_increments("id")
    }

    /// Auto-incrementing unsigned `INTEGER` key.
    pub fn increments(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Integer, name).unsigned().auto_increment()
    }

    /// Auto-incrementing unsigned `SMALLINT` key.
    pub fn small_increments(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::SmallInteger, name).unsigned().auto_increment()
    }

    /// Auto-incrementing unsigned `BIGINT` key.
    pub fn big_increments(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::BigInteger, name).unsigned().auto_increment()
    }

    /// Fixed-length string.
    pub fn char(&mut self, name: impl Into<String>, length: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Char { length: length.or(Some(255)) }, name)
    }

    /// Variable-length string, 255 characters unless given.
    pub fn string(&mut self, name: impl Into<String>, length: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::String { length: length.or(Some(255)) }, name)
    }

    /// Short text.
    pub fn tiny_text(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TinyText, name)
    }

    /// Text.
    pub fn text(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Text, name)
    }

    /// Medium text.
    pub fn medium_text(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::MediumText, name)
    }

    /// Long text.
    pub fn long_text(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::LongText, name)
    }

    /// 8-bit integer.
    pub fn tiny_integer(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TinyInteger, name)
    }

    /// 16-bit integer.
    pub fn small_integer(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::SmallInteger, name)
    }

    /// 24-bit integer.
    pub fn medium_integer(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::MediumInteger, name)
    }

    /// 32-bit integer.
    pub fn integer(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Integer, name)
    }

    /// 64-bit integer.
    pub fn big_integer(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::BigInteger, name)
    }

    /// Unsigned 64-bit integer for foreign keys.
    pub fn foreign_id(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.big_integer(name).unsigned()
    }

    /// Floating point.
    pub fn float(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Float { precision }, name)
    }

    /// Double precision.
    pub fn double(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Double, name)
    }

    /// Exact numeric with `total` digits, `places` after the point.
    pub fn decimal(&mut self, name: impl Into<String>, total: u32, places: u32) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Decimal { total, places }, name)
    }

    /// Boolean.
    pub fn boolean(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Boolean, name)
    }

    /// One of `allowed`.
    pub fn enumeration<A: Into<String>>(
        &mut self,
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = A>,
    ) -> &mut ColumnDefinition {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.add_column(ColumnType::Enum { allowed }, name)
    }

    /// Any subset of `allowed` (MySQL).
    pub fn set<A: Into<String>>(
        &mut self,
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = A>,
    ) -> &mut ColumnDefinition {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.add_column(ColumnType::Set { allowed }, name)
    }

    /// JSON document.
    pub fn json(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Json, name)
    }

    /// Binary JSON document.
    pub fn jsonb(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Jsonb, name)
    }

    /// Date.
    pub fn date(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Date, name)
    }

    /// Date and time.
    pub fn date_time(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::DateTime { precision }, name)
    }

    /// Date and time with time zone.
    pub fn date_time_tz(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::DateTimeTz { precision }, name)
    }

    /// Time.
    pub fn time(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Time { precision }, name)
    }

    /// Time with time zone.
    pub fn time_tz(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TimeTz { precision }, name)
    }

    /// Timestamp.
    pub fn timestamp(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Timestamp { precision }, name)
    }

    /// Timestamp with time zone.
    pub fn timestamp_tz(&mut self, name: impl Into<String>, precision: Option<u32>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::TimestampTz { precision }, name)
    }

    /// Nullable `created_at` and `updated_at` timestamps.
    pub fn timestamps(&mut self, precision: Option<u32>) {
        self.timestamp("created_at", precision).nullable();
        self.timestamp("updated_at", precision).nullable();
    }

    /// Nullable `deleted_at` timestamp.
    pub fn soft_deletes(&mut self, precision: Option<u32>) -> &mut ColumnDefinition {
        self.timestamp("deleted_at", precision).nullable()
    }

    /// Year.
    pub fn year(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Year, name)
    }

    /// Binary data.
    pub fn binary(&mut self, name: impl Into<String>, length: Option<u32>, fixed: bool) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Binary { length, fixed }, name)
    }

    /// UUID.
    pub fn uuid(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Uuid, name)
    }

    /// IP address.
    pub fn ip_address(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::IpAddress, name)
    }

    /// MAC address.
    pub fn mac_address(&mut self, name: impl Into<String>) -> &mut ColumnDefinition {
        self.add_column(ColumnType::MacAddress, name)
    }

    /// Spatial geometry.
    pub fn geometry(
        &mut self,
        name: impl Into<String>,
        subtype: Option<&str>,
        srid: Option<u32>,
    ) -> &mut ColumnDefinition {
        let subtype = subtype.map(str::to_string);
        self.add_column(ColumnType::Geometry { subtype, srid }, name)
    }

    /// Spatial geography.
    pub fn geography(
        &mut self,
        name: impl Into<String>,
        subtype: Option<&str>,
        srid: Option<u32>,
    ) -> &mut ColumnDefinition {
        let subtype = subtype.map(str::to_string);
        self.add_column(ColumnType::Geography { subtype, srid }, name)
    }

    /// Vector of `dimensions` floats.
    pub fn vector(&mut self, name: impl Into<String>, dimensions: u32) -> &mut ColumnDefinition {
        self.add_column(ColumnType::Vector { dimensions }, name)
    }

    /// Computed column (SQL Server).
    pub fn computed(&mut self, name: impl Into<String>, expression: impl Into<String>) -> &mut ColumnDefinition {
        let expression = expression.into();
        self.add_column(ColumnType::Computed { expression }, name)
    }

    /// Nullable `remember_token` string.
    pub fn remember_token(&mut self) -> &mut ColumnDefinition {
        self.string("remember_token", Some(100)).nullable()
    }

    // Commands

    /// Records a command.
    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Drops the table.
    pub fn drop(&mut self) {
        self.add_command(Command::Drop);
    }

    /// Drops the table if it exists.
    pub fn drop_if_exists(&mut self) {
        self.add_command(Command::DropIfExists);
    }

    /// Renames the table.
    pub fn rename(&mut self, to: impl Into<String>) {
        self.add_command(Command::Rename { to: to.into() });
    }

    /// Drops columns.
    pub fn drop_column<C: Into<String>>(&mut self, columns: impl IntoIterator<Item = C>) {
        let columns = columns.into_iter().map(Into::into).collect();
        self.add_command(Command::DropColumn { columns });
    }

    /// Renames a column.
    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.add_command(Command::RenameColumn {
            from: from.into(),
            to: to.into(),
        });
    }

    /// Primary key over `columns`.
    pub fn primary<C: Into<String>>(&mut self, columns: impl IntoIterator<Item = C>) {
        self.add_command(Command::Primary(IndexCommand::new(columns)));
    }

    /// Unique index over `columns`.
    pub fn unique<C: Into<String>>(&mut self, columns: impl IntoIterator<Item = C>) {
        self.add_command(Command::Unique(IndexCommand::new(columns)));
    }

    /// Plain index over `columns`.
    pub fn index<C: Into<String>>(&mut self, columns: impl IntoIterator<Item = C>) {
        self.add_command(Command::Index(IndexCommand::new(columns)));
    }

    /// Full-text index over `columns`.
    pub fn fulltext<C: Into<String>>(&mut self, columns: impl IntoIterator<Item = C>) {
        self.add_command(Command::Fulltext(IndexCommand::new(columns)));
    }

    /// Spatial index over `columns`.
    pub fn spatial_index<C: Into<String>>(&mut self, columns: impl IntoIterator<Item = C>) {
        self.add_command(Command::SpatialIndex(IndexCommand::new(columns)));
    }

    /// Foreign key.
    pub fn foreign(&mut self, foreign: ForeignKeyDefinition) {
        self.add_command(Command::Foreign(foreign));
    }

    /// Drops the primary key.
    pub fn drop_primary(&mut self, name: Option<&str>) {
        self.add_command(Command::DropPrimary {
            name: name.unwrap_or_default().to_string(),
        });
    }

    /// Drops a unique index.
    pub fn drop_unique(&mut self, name: impl Into<String>) {
        self.add_command(Command::DropUnique { name: name.into() });
    }

    /// Drops an index.
    pub fn drop_index(&mut self, name: impl Into<String>) {
        self.add_command(Command::DropIndex { name: name.into() });
    }

    /// Drops a full-text index.
    pub fn drop_fulltext(&mut self, name: impl Into<String>) {
        self.add_command(Command::DropFulltext { name: name.into() });
    }

    /// Drops a spatial index.
    pub fn drop_spatial_index(&mut self, name: impl Into<String>) {
        self.add_command(Command::DropSpatialIndex { name: name.into() });
    }

    /// Drops a foreign key.
    pub fn drop_foreign(&mut self, name: impl Into<String>) {
        self.add_command(Command::DropForeign { name: name.into() });
    }

    /// Renames an index.
    pub fn rename_index(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.add_command(Command::RenameIndex {
            from: from.into(),
            to: to.into(),
        });
    }

    /// Sets the table comment.
    pub fn comment(&mut self, comment: impl Into<String>) {
        self.add_command(Command::TableComment {
            comment: comment.into(),
        });
    }

    // Compilation

    /// Compiles the blueprint into statements for `grammar`.
    ///
    /// Implied `change` and `add` commands come first for an existing
    /// table, then the recorded commands, then indexes and foreign keys
    /// declared on columns, then the grammar's per-column commands.
    ///
    /// # Errors
    ///
    /// Returns the first command error; no statements are returned then.
    pub fn to_sql(&self, grammar: &dyn SchemaGrammar) -> Result<Vec<String>> {
        let prepared = self.prepared(grammar);
        let mut statements = Vec::new();
        for command in &prepared.commands {
            statements.extend(grammar.compile(&prepared, command)?);
        }
        debug!(
            grammar = grammar.query_grammar().name(),
            table = %self.table,
            statements = statements.len(),
            "compiled blueprint"
        );
        Ok(statements)
    }

    /// A copy with implied and fluent commands added and every empty index
    /// or constraint name generated.
    fn prepared(&self, grammar: &dyn SchemaGrammar) -> Self {
        let prefix = grammar.query_grammar().base().table_prefix().to_string();
        let mut prepared = self.clone();

        let mut commands = Vec::new();
        if !self.creating() {
            if self.changed_columns().next().is_some() {
                commands.push(Command::Change);
            }
            if self.added_columns().next().is_some() {
                commands.push(Command::Add);
            }
        }
        commands.append(&mut prepared.commands);

        for column in &self.columns {
            for fluent in &column.indexes {
                let mut index = IndexCommand::new([column.name.clone()]);
                if let Some(name) = &fluent.name {
                    index = index.named(name.clone());
                }
                commands.push(Command::from_index(fluent.kind, index));
            }
            if let Some(foreign) = &column.foreign {
                commands.push(Command::Foreign(foreign.clone()));
            }
        }

        for fluent in grammar.fluent_commands() {
            for column in &self.columns {
                match fluent {
                    FluentCommand::ColumnComment => {
                        if let Some(comment) = &column.comment {
                            commands.push(Command::ColumnComment {
                                column: column.name.clone(),
                                comment: comment.clone(),
                            });
                        }
                    }
                    FluentCommand::AutoIncrementStartingValue => {
                        if let (true, Some(value)) = (column.auto_increment, column.starting_value) {
                            commands.push(Command::AutoIncrementStartingValue {
                                column: column.name.clone(),
                                value,
                            });
                        }
                    }
                }
            }
        }

        let name_index = |index: &mut IndexCommand, kind: IndexKind| {
            if index.name.is_empty() {
                index.name = self.index_name(&prefix, kind.suffix(), &index.columns);
            }
        };
        for command in &mut commands {
            match command {
                Command::Primary(index) => name_index(index, IndexKind::Primary),
                Command::Unique(index) => name_index(index, IndexKind::Unique),
                Command::Index(index) => name_index(index, IndexKind::Index),
                Command::Fulltext(index) => name_index(index, IndexKind::Fulltext),
                Command::SpatialIndex(index) => name_index(index, IndexKind::Spatial),
                Command::Foreign(foreign) if foreign.name.is_empty() => {
                    foreign.name = self.index_name(&prefix, "foreign", &foreign.columns);
                }
                _ => {}
            }
        }

        prepared.commands = commands;
        prepared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::grammar::{PostgresSchemaGrammar, SqlServerSchemaGrammar, SqliteSchemaGrammar};

    #[test]
    fn test_implied_commands_come_first() {
        let mut table = Blueprint::new("users");
        table.drop_column(["legacy"]);
        table.integer("votes").change();
        table.string("email", None).unique();

        let prepared = table.prepared(&PostgresSchemaGrammar::new());
        assert!(matches!(
            prepared.commands(),
            [
                Command::Change,
                Command::Add,
                Command::DropColumn { .. },
                Command::Unique(index),
            ] if index.name == "users_email_unique"
        ));
    }

    #[test]
    fn test_creating_skips_add() {
        let mut table = Blueprint::create("users");
        table.id();
        let prepared = table.prepared(&PostgresSchemaGrammar::new());
        assert_eq!(prepared.commands(), &[Command::Create]);
    }

    #[test]
    fn test_generated_names_use_prefix() {
        let mut table = Blueprint::new("posts");
        table.index(["user_id", "created_at"]);
        table.foreign_id("user_id").constrained("users", "id");
        table.unique(["slug"]);

        let grammar = SqliteSchemaGrammar::new().with_table_prefix("app_");
        let prepared = table.prepared(&grammar);
        let names: Vec<&str> = prepared
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::Index(index) | Command::Unique(index) => Some(index.name.as_str()),
                Command::Foreign(foreign) => Some(foreign.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "app_posts_user_id_created_at_index",
                "app_posts_slug_unique",
                "app_posts_user_id_foreign",
            ]
        );
    }

    #[test]
    fn test_explicit_names_are_kept() {
        let mut table = Blueprint::new("posts");
        table.add_command(Command::Index(IndexCommand::new(["title"]).named("by_title")));
        let prepared = table.prepared(&PostgresSchemaGrammar::new());
        assert!(matches!(prepared.commands(), [Command::Index(index)] if index.name == "by_title"));
    }

    #[test]
    fn test_index_name_normalizes_schema_and_case() {
        let table = Blueprint::new("audit.Events");
        assert_eq!(
            table.index_name("", "index", &["kind".to_string()]),
            "audit_events_kind_index"
        );
        let table = Blueprint::new("user-logs");
        assert_eq!(
            table.index_name("x_", "unique", &["id".to_string()]),
            "x_user_logs_id_unique"
        );
    }

    #[test]
    fn test_fluent_commands_follow_grammar() {
        let mut table = Blueprint::create("users");
        table.id().starting_value(100);
        table.string("name", None).comment("display name");

        let postgres = table.prepared(&PostgresSchemaGrammar::new());
        assert!(matches!(
            postgres.commands(),
            [
                Command::Create,
                Command::ColumnComment { column, .. },
                Command::AutoIncrementStartingValue { value: 100, .. },
            ] if column == "name"
        ));

        let sqlserver = table.prepared(&SqlServerSchemaGrammar::new());
        assert_eq!(sqlserver.commands().len(), 2);
    }

    #[test]
    fn test_errors_return_no_statements() {
        let mut table = Blueprint::new("users");
        table.index(["name"]);
        table.drop_primary(None);
        assert!(table.to_sql(&SqliteSchemaGrammar::new()).is_err());
    }

    #[test]
    fn test_deserializes_from_json() {
        let table: Blueprint = serde_json::from_value(serde_json::json!({
            "table": "users",
            "commands": [{ "command": "create" }],
            "columns": [{ "name": "id", "kind": "big_integer", "auto_increment": true }],
        }))
        .unwrap();
        assert!(table.creating());
        assert_eq!(table.table(), "users");
        assert_eq!(table.columns()[0].column_type, ColumnType::BigInteger);
    }
}
