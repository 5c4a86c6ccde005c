//! SQL Server table definitions.

use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::grammar::{Grammar, SqlServerGrammar};
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, IndexCommand};

use super::{apply_modifiers, check_in, FluentCommand, Modifier, SchemaGrammar};

/// SQL Server schema grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlServerSchemaGrammar {
    grammar: SqlServerGrammar,
    schema: Option<String>,
}

impl Default for SqlServerSchemaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlServerSchemaGrammar {
    const MODIFIERS: &'static [Modifier<Self>] = &[
        Self::modify_collate,
        Self::modify_nullable,
        Self::modify_default,
        Self::modify_persisted,
        Self::modify_increment,
    ];

    /// Creates a new SQL Server schema grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            grammar: SqlServerGrammar::new(),
            schema: None,
        }
    }

    /// Prefixes every table name.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.grammar = self.grammar.with_table_prefix(prefix);
        self
    }

    /// Sets the server version.
    #[must_use]
    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.grammar = self.grammar.with_version(version);
        self
    }

    /// Sets the schema used by introspection queries and comments.
    #[must_use]
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Unicode string literal: `N'value'`.
    fn literal(&self, value: &str) -> Result<String> {
        Ok(format!("N{}", self.quote(value)?))
    }

    fn schema_sql(&self, schema: Option<&str>) -> Result<String> {
        schema
            .or(self.schema.as_deref())
            .map_or_else(|| Ok("SCHEMA_NAME()".to_string()), |name| self.literal(name))
    }

    fn catalog_target(&self, schema: Option<&str>, table: &str) -> Result<(String, String)> {
        let (schema, table) = match table.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (schema, table),
        };
        Ok((self.schema_sql(schema)?, self.literal(&self.prefixed(table))?))
    }

    fn has_primary_command(blueprint: &Blueprint) -> bool {
        blueprint
            .commands()
            .iter()
            .any(|command| matches!(command, Command::Primary(_)))
    }

    fn add_description(&self, blueprint: &Blueprint, comment: &str, column: Option<&str>) -> Result<String> {
        let mut sql = format!(
            "EXEC sys.sp_addextendedproperty @name=N'MS_Description', @value={}, \
             @level0type=N'SCHEMA', @level0name={}, @level1type=N'TABLE', @level1name={}",
            self.literal(comment)?,
            self.literal(self.schema.as_deref().unwrap_or("dbo"))?,
            self.literal(&self.prefixed(blueprint.table()))?
        );
        if let Some(column) = column {
            sql.push_str(&format!(", @level2type=N'COLUMN', @level2name={}", self.literal(column)?));
        }
        Ok(sql)
    }

    fn drop_default_constraints(&self, blueprint: &Blueprint, columns: &[String]) -> Result<String> {
        let table = self.wrap_table(blueprint);
        let names = columns
            .iter()
            .map(|column| self.quote(column))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "DECLARE @sql NVARCHAR(MAX) = '';\
             SELECT @sql += {} + OBJECT_NAME([default_object_id]) + ';' FROM sys.columns \
             WHERE [object_id] = OBJECT_ID({}) AND [name] IN ({}) AND [default_object_id] <> 0;\
             EXEC(@sql)",
            self.quote(&format!("ALTER TABLE {table} DROP CONSTRAINT "))?,
            self.literal(&table)?,
            names.join(", ")
        ))
    }

    // Modifiers

    fn modify_collate(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .collation
            .as_ref()
            .map(|collation| format!(" COLLATE {collation}")))
    }

    fn modify_nullable(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if matches!(column.column_type, ColumnType::Computed { .. }) {
            return Ok(None);
        }
        let clause = if column.is_nullable() { " NULL" } else { " NOT NULL" };
        Ok(Some(clause.to_string()))
    }

    fn modify_default(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        match self.effective_default(column) {
            Some(value) => Ok(Some(format!(" DEFAULT {}", self.default_value(&value)?))),
            None => Ok(None),
        }
    }

    fn modify_persisted(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok((column.persisted && matches!(column.column_type, ColumnType::Computed { .. }))
            .then(|| " PERSISTED".to_string()))
    }

    fn modify_increment(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.change || !column.auto_increment || !column.column_type.is_serial() {
            return Ok(None);
        }
        Ok(Some(if Self::has_primary_command(blueprint) {
            " IDENTITY".to_string()
        } else {
            " IDENTITY PRIMARY KEY".to_string()
        }))
    }
}

impl SchemaGrammar for SqlServerSchemaGrammar {
    fn query_grammar(&self) -> &dyn Grammar {
        &self.grammar
    }

    fn default_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn fluent_commands(&self) -> &'static [FluentCommand] {
        &[FluentCommand::ColumnComment]
    }

    /// Temporary tables live in tempdb under a `#` name.
    fn wrap_table(&self, blueprint: &Blueprint) -> String {
        if blueprint.temporary {
            return self
                .grammar
                .base()
                .wrap_value(&format!("#{}", self.prefixed(blueprint.table())));
        }
        self.grammar.wrap_table(blueprint.table())
    }

    fn type_sql(&self, column: &ColumnDefinition) -> Result<String> {
        let precise = |name: &str, precision: Option<u32>, fallback: &str| {
            precision.map_or_else(|| fallback.to_string(), |p| format!("{name}({p})"))
        };
        Ok(match &column.column_type {
            ColumnType::Char { length } => format!("NCHAR({})", length.unwrap_or(255)),
            ColumnType::String { length } => format!("NVARCHAR({})", length.unwrap_or(255)),
            ColumnType::TinyText => "NVARCHAR(255)".to_string(),
            ColumnType::Text
            | ColumnType::MediumText
            | ColumnType::LongText
            | ColumnType::Json
            | ColumnType::Jsonb => "NVARCHAR(MAX)".to_string(),
            ColumnType::TinyInteger => "TINYINT".to_string(),
            ColumnType::SmallInteger => "SMALLINT".to_string(),
            ColumnType::MediumInteger | ColumnType::Integer | ColumnType::Year => "INT".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::Float { precision } => precise("FLOAT", *precision, "FLOAT"),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Decimal { total, places } => format!("DECIMAL({total}, {places})"),
            ColumnType::Boolean => "BIT".to_string(),
            ColumnType::Enum { allowed } => format!("NVARCHAR(255) {}", check_in(self, column, allowed)?),
            ColumnType::Set { .. } => return Err(Error::unsupported(self.name(), "set columns")),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime { precision } | ColumnType::Timestamp { precision } => {
                precise("DATETIME2", *precision, "DATETIME")
            }
            ColumnType::DateTimeTz { precision } | ColumnType::TimestampTz { precision } => {
                precise("DATETIMEOFFSET", *precision, "DATETIMEOFFSET")
            }
            ColumnType::Time { precision } | ColumnType::TimeTz { precision } => {
                precise("TIME", *precision, "TIME")
            }
            ColumnType::Binary { length, fixed: true } => format!("BINARY({})", length.unwrap_or(255)),
            ColumnType::Binary { length: Some(length), fixed: false } => format!("VARBINARY({length})"),
            ColumnType::Binary { length: None, fixed: false } => "VARBINARY(MAX)".to_string(),
            ColumnType::Uuid => "UNIQUEIDENTIFIER".to_string(),
            ColumnType::IpAddress => "NVARCHAR(45)".to_string(),
            ColumnType::MacAddress => "NVARCHAR(17)".to_string(),
            ColumnType::Geometry { .. } => "GEOMETRY".to_string(),
            ColumnType::Geography { .. } => "GEOGRAPHY".to_string(),
            ColumnType::Vector { .. } => return Err(Error::unsupported(self.name(), "vector columns")),
            ColumnType::Computed { expression } => format!("AS ({expression})"),
        })
    }

    fn modifiers_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<String> {
        apply_modifiers(self, Self::MODIFIERS, blueprint, column)
    }

    fn compile_create(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.columns().iter().collect();
        Ok(vec![format!(
            "CREATE TABLE {} ({})",
            self.wrap_table(blueprint),
            self.get_columns(blueprint, &columns)?.join(", ")
        )])
    }

    fn compile_add(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.added_columns().collect();
        Ok(vec![format!(
            "ALTER TABLE {} ADD {}",
            self.wrap_table(blueprint),
            self.get_columns(blueprint, &columns)?.join(", ")
        )])
    }

    fn compile_drop_if_exists(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let table = self.wrap_table(blueprint);
        Ok(vec![format!(
            "IF OBJECT_ID({}, 'U') IS NOT NULL DROP TABLE {table}",
            self.literal(&table)?
        )])
    }

    fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "sp_rename {}, {}",
            self.literal(&self.wrap_table(blueprint))?,
            self.grammar.wrap_table(to)
        )])
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, columns: &[String]) -> Result<Vec<String>> {
        Ok(vec![
            self.drop_default_constraints(blueprint, columns)?,
            format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.wrap_table(blueprint),
                self.columnize(columns)
            ),
        ])
    }

    fn compile_rename_column(&self, blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "sp_rename {}, {}, N'COLUMN'",
            self.literal(&format!("{}.{}", self.wrap_table(blueprint), self.wrap(from)))?,
            self.wrap(to)
        )])
    }

    fn compile_primary(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.wrap_table(blueprint),
            self.wrap(&index.name),
            self.columnize(&index.columns)
        )])
    }

    fn compile_spatial_index(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![format!(
            "CREATE SPATIAL INDEX {} ON {} ({})",
            self.wrap(&index.name),
            self.wrap_table(blueprint),
            self.columnize(&index.columns)
        )])
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        if name.is_empty() {
            return Err(Error::construction(
                "drop primary",
                "SQL Server needs the primary key constraint name",
            ));
        }
        self.compile_drop_constraint(blueprint, name)
    }

    fn compile_drop_index(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "DROP INDEX {} ON {}",
            self.wrap(name),
            self.wrap_table(blueprint)
        )])
    }

    fn compile_drop_spatial_index(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_index(blueprint, name)
    }

    fn compile_rename_index(&self, blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "sp_rename {}, {}, N'INDEX'",
            self.literal(&format!("{}.{}", self.wrap_table(blueprint), self.wrap(from)))?,
            self.wrap(to)
        )])
    }

    fn compile_table_comment(&self, blueprint: &Blueprint, comment: &str) -> Result<Vec<String>> {
        Ok(vec![self.add_description(blueprint, comment, None)?])
    }

    fn compile_column_comment(&self, blueprint: &Blueprint, column: &str, comment: &str) -> Result<Vec<String>> {
        Ok(vec![self.add_description(blueprint, comment, Some(column))?])
    }

    fn compile_create_database(&self, name: &str) -> Result<String> {
        Ok(format!("CREATE DATABASE {}", self.wrap(name)))
    }

    fn compile_drop_database_if_exists(&self, name: &str) -> Result<String> {
        Ok(format!("DROP DATABASE IF EXISTS {}", self.wrap(name)))
    }

    fn compile_enable_foreign_key_constraints(&self) -> String {
        r#"EXEC sp_msforeachtable "ALTER TABLE ? WITH CHECK CHECK CONSTRAINT all""#.to_string()
    }

    fn compile_disable_foreign_key_constraints(&self) -> String {
        r#"EXEC sp_msforeachtable "ALTER TABLE ? NOCHECK CONSTRAINT all""#.to_string()
    }

    fn compile_tables(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT t.name AS name, SCHEMA_NAME(t.schema_id) AS [schema], \
             SUM(u.total_pages) * 8 * 1024 AS size \
             FROM sys.tables AS t \
             JOIN sys.partitions AS p ON p.object_id = t.object_id \
             JOIN sys.allocation_units AS u ON u.container_id = p.hobt_id \
             WHERE SCHEMA_NAME(t.schema_id) = {} \
             GROUP BY t.name, t.schema_id ORDER BY t.name",
            self.schema_sql(schema)?
        ))
    }

    fn compile_views(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT v.name AS name, SCHEMA_NAME(v.schema_id) AS [schema], m.definition AS definition \
             FROM sys.views AS v JOIN sys.sql_modules AS m ON v.object_id = m.object_id \
             WHERE SCHEMA_NAME(v.schema_id) = {} ORDER BY v.name",
            self.schema_sql(schema)?
        ))
    }

    fn compile_columns(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = self.catalog_target(schema, table)?;
        Ok(format!(
            "SELECT col.name AS name, type.name AS type_name, col.max_length AS length, \
             col.precision AS precision, col.scale AS places, col.is_nullable AS nullable, \
             def.definition AS [default], col.is_identity AS autoincrement, \
             col.collation_name AS collation, com.definition AS [expression], \
             com.is_persisted AS [persisted], CAST(prop.value AS NVARCHAR(MAX)) AS comment \
             FROM sys.columns AS col \
             JOIN sys.types AS type ON col.user_type_id = type.user_type_id \
             JOIN sys.objects AS obj ON col.object_id = obj.object_id \
             JOIN sys.schemas AS scm ON obj.schema_id = scm.schema_id \
             LEFT JOIN sys.default_constraints def ON col.default_object_id = def.object_id \
             AND col.object_id = def.parent_object_id \
             LEFT JOIN sys.extended_properties AS prop ON obj.object_id = prop.major_id \
             AND col.column_id = prop.minor_id AND prop.name = 'MS_Description' \
             LEFT JOIN sys.computed_columns AS com ON col.column_id = com.column_id \
             AND col.object_id = com.object_id \
             WHERE obj.type IN ('U', 'V') AND obj.name = {table} AND scm.name = {schema} \
             ORDER BY col.column_id"
        ))
    }

    fn compile_indexes(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = self.catalog_target(schema, table)?;
        Ok(format!(
            "SELECT idx.name AS name, \
             STRING_AGG(col.name, ',') WITHIN GROUP (ORDER BY idxcol.key_ordinal) AS columns, \
             idx.type_desc AS [type], idx.is_unique AS [unique], idx.is_primary_key AS [primary] \
             FROM sys.indexes AS idx \
             JOIN sys.tables AS tbl ON idx.object_id = tbl.object_id \
             JOIN sys.schemas AS scm ON tbl.schema_id = scm.schema_id \
             JOIN sys.index_columns AS idxcol ON idx.object_id = idxcol.object_id \
             AND idx.index_id = idxcol.index_id \
             JOIN sys.columns AS col ON idxcol.object_id = col.object_id \
             AND idxcol.column_id = col.column_id \
             WHERE tbl.name = {table} AND scm.name = {schema} \
             GROUP BY idx.name, idx.type_desc, idx.is_unique, idx.is_primary_key"
        ))
    }

    fn compile_foreign_keys(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = self.catalog_target(schema, table)?;
        Ok(format!(
            "SELECT fk.name AS name, \
             STRING_AGG(lc.name, ',') WITHIN GROUP (ORDER BY fkc.constraint_column_id) AS columns, \
             fs.name AS foreign_schema, ft.name AS foreign_table, \
             STRING_AGG(fc.name, ',') WITHIN GROUP (ORDER BY fkc.constraint_column_id) AS foreign_columns, \
             fk.update_referential_action_desc AS on_update, \
             fk.delete_referential_action_desc AS on_delete \
             FROM sys.foreign_keys AS fk \
             JOIN sys.foreign_key_columns AS fkc ON fkc.constraint_object_id = fk.object_id \
             JOIN sys.tables AS lt ON lt.object_id = fk.parent_object_id \
             JOIN sys.schemas AS ls ON lt.schema_id = ls.schema_id \
             JOIN sys.columns AS lc ON fkc.parent_object_id = lc.object_id \
             AND fkc.parent_column_id = lc.column_id \
             JOIN sys.tables AS ft ON ft.object_id = fk.referenced_object_id \
             JOIN sys.schemas AS fs ON ft.schema_id = fs.schema_id \
             JOIN sys.columns AS fc ON fkc.referenced_object_id = fc.object_id \
             AND fkc.referenced_column_id = fc.column_id \
             WHERE lt.name = {table} AND ls.name = {schema} \
             GROUP BY fk.name, fs.name, ft.name, fk.update_referential_action_desc, \
             fk.delete_referential_action_desc"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(blueprint: &Blueprint) -> Result<Vec<String>> {
        blueprint.to_sql(&SqlServerSchemaGrammar::new())
    }

    #[test]
    fn test_create_with_identity_and_computed() {
        let mut table = Blueprint::create("orders");
        table.id();
        table.decimal("price", 8, 2);
        table.computed("total", "[price] * 2").persisted();
        table.string("note", None).nullable().comment("free text");
        assert_eq!(
            compile(&table).unwrap(),
            vec![
                "CREATE TABLE [orders] ([id] BIGINT NOT NULL IDENTITY PRIMARY KEY, \
                 [price] DECIMAL(8, 2) NOT NULL, [total] AS ([price] * 2) PERSISTED, \
                 [note] NVARCHAR(255) NULL)",
                "EXEC sys.sp_addextendedproperty @name=N'MS_Description', @value=N'free text', \
                 @level0type=N'SCHEMA', @level0name=N'dbo', @level1type=N'TABLE', \
                 @level1name=N'orders', @level2type=N'COLUMN', @level2name=N'note'",
            ]
        );
    }

    #[test]
    fn test_temporary_table_name() {
        let mut table = Blueprint::create("staging");
        table.temporary = true;
        table.integer("n");
        assert_eq!(compile(&table).unwrap(), vec!["CREATE TABLE [#staging] ([n] INT NOT NULL)"]);
    }

    #[test]
    fn test_drop_column_drops_defaults_first() {
        let mut table = Blueprint::new("users");
        table.drop_column(["votes", "rank"]);
        assert_eq!(
            compile(&table).unwrap(),
            vec![
                "DECLARE @sql NVARCHAR(MAX) = '';SELECT @sql += 'ALTER TABLE [users] DROP CONSTRAINT ' \
                 + OBJECT_NAME([default_object_id]) + ';' FROM sys.columns \
                 WHERE [object_id] = OBJECT_ID(N'[users]') AND [name] IN ('votes', 'rank') \
                 AND [default_object_id] <> 0;EXEC(@sql)",
                "ALTER TABLE [users] DROP COLUMN [votes], [rank]",
            ]
        );
    }

    #[test]
    fn test_renames_and_drops() {
        let mut table = Blueprint::new("users");
        table.rename_column("name", "full_name");
        table.rename_index("users_name_index", "users_full_name_index");
        table.drop_unique("users_email_unique");
        table.drop_if_exists();
        assert_eq!(
            compile(&table).unwrap(),
            vec![
                "sp_rename N'[users].[name]', [full_name], N'COLUMN'",
                "sp_rename N'[users].[users_name_index]', [users_full_name_index], N'INDEX'",
                "DROP INDEX [users_email_unique] ON [users]",
                "IF OBJECT_ID(N'[users]', 'U') IS NOT NULL DROP TABLE [users]",
            ]
        );
    }

    #[test]
    fn test_unsupported_commands() {
        let mut table = Blueprint::new("users");
        table.fulltext(["bio"]);
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));

        let mut table = Blueprint::new("users");
        table.integer("votes").change();
        assert!(matches!(compile(&table), Err(Error::UnsupportedOperation { .. })));

        let mut table = Blueprint::new("users");
        table.drop_primary(None);
        assert!(matches!(compile(&table), Err(Error::Construction { .. })));
    }

    #[test]
    fn test_introspection_literals() {
        let grammar = SqlServerSchemaGrammar::new().with_schema(Some("sales".into()));
        let sql = grammar.compile_indexes(None, "orders").unwrap();
        assert!(sql.contains("tbl.name = N'orders' AND scm.name = N'sales'"));
        let sql = SqlServerSchemaGrammar::new().compile_tables(None).unwrap();
        assert!(sql.contains("= SCHEMA_NAME()"));
    }
}
