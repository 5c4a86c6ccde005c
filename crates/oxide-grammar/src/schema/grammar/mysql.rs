//! MySQL and MariaDB table definitions.

use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::grammar::{Grammar, MySqlGrammar};
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, IndexCommand};

use super::{apply_modifiers, FluentCommand, Modifier, SchemaGrammar};

/// MySQL schema grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlSchemaGrammar {
    grammar: MySqlGrammar,
    schema: Option<String>,
    charset: Option<String>,
    collation: Option<String>,
    engine: Option<String>,
}

impl Default for MySqlSchemaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlSchemaGrammar {
    const MODIFIERS: &'static [Modifier<Self>] = &[
        Self::modify_unsigned,
        Self::modify_charset,
        Self::modify_collate,
        Self::modify_virtual_as,
        Self::modify_stored_as,
        Self::modify_nullable,
        Self::modify_default,
        Self::modify_on_update,
        Self::modify_invisible,
        Self::modify_increment,
        Self::modify_comment,
        Self::modify_after,
        Self::modify_first,
    ];

    /// Creates a new MySQL schema grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            grammar: MySqlGrammar::new(),
            schema: None,
            charset: None,
            collation: None,
            engine: None,
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

    /// Sets the database used by introspection queries.
    #[must_use]
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Table options applied when a blueprint does not set its own.
    #[must_use]
    pub fn with_table_defaults(
        mut self,
        charset: Option<String>,
        collation: Option<String>,
        engine: Option<String>,
    ) -> Self {
        self.charset = charset;
        self.collation = collation;
        self.engine = engine;
        self
    }

    fn supports_rename_column(&self) -> bool {
        let base = self.grammar.base();
        if base.is_mariadb() {
            !base.older_than(10, 5, 2)
        } else {
            !base.older_than(8, 0, 0)
        }
    }

    /// `DATABASE()` or the quoted schema.
    fn schema_sql(&self, schema: Option<&str>) -> Result<String> {
        schema
            .or(self.schema.as_deref())
            .map_or_else(|| Ok("DATABASE()".to_string()), |name| self.quote(name))
    }

    fn using(index: &IndexCommand) -> String {
        index
            .algorithm
            .as_ref()
            .map(|algorithm| format!(" USING {}", algorithm.to_uppercase()))
            .unwrap_or_default()
    }

    fn add_index(&self, blueprint: &Blueprint, kind: &str, index: &IndexCommand) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD {kind} {}{} ({})",
            self.wrap_table(blueprint),
            self.wrap(&index.name),
            Self::using(index),
            self.columnize(&index.columns)
        )]
    }

    fn spatial_type(&self, name: &str, subtype: Option<&String>, srid: Option<u32>) -> String {
        let mut sql = subtype.map_or_else(|| name.to_string(), |s| s.to_uppercase());
        if let Some(srid) = srid {
            if !self.grammar.base().is_mariadb() {
                sql.push_str(&format!(" SRID {srid}"));
            }
        }
        sql
    }

    // Modifiers

    fn modify_unsigned(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column.unsigned.then(|| " UNSIGNED".to_string()))
    }

    fn modify_charset(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .charset
            .as_ref()
            .map(|charset| format!(" CHARACTER SET {charset}")))
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

    fn modify_nullable(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.virtual_as.is_none() && column.stored_as.is_none() {
            let clause = if column.is_nullable() { " NULL" } else { " NOT NULL" };
            return Ok(Some(clause.to_string()));
        }
        Ok((column.nullable == Some(false)).then(|| " NOT NULL".to_string()))
    }

    fn modify_default(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        match self.effective_default(column) {
            Some(value) => Ok(Some(format!(" DEFAULT {}", self.default_value(&value)?))),
            None => Ok(None),
        }
    }

    fn modify_on_update(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.use_current_on_update {
            if let Some(precision) = column.column_type.temporal_precision() {
                return Ok(Some(format!(" ON UPDATE {}", self.current_timestamp(precision))));
            }
        }
        Ok(column
            .on_update
            .as_ref()
            .map(|expression| format!(" ON UPDATE {expression}")))
    }

    fn modify_invisible(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column.invisible.then(|| " INVISIBLE".to_string()))
    }

    fn modify_increment(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if !column.auto_increment || !column.column_type.is_serial() {
            return Ok(None);
        }
        if column.change || blueprint.has_primary_on(&column.name) {
            Ok(Some(" AUTO_INCREMENT".to_string()))
        } else {
            Ok(Some(" AUTO_INCREMENT PRIMARY KEY".to_string()))
        }
    }

    fn modify_comment(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        match column.comment.as_deref() {
            Some(comment) => Ok(Some(format!(" COMMENT {}", self.quote(comment)?))),
            None => Ok(None),
        }
    }

    fn modify_after(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .after
            .as_deref()
            .map(|after| format!(" AFTER {}", self.wrap(after))))
    }

    fn modify_first(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column.first.then(|| " FIRST".to_string()))
    }
}

impl SchemaGrammar for MySqlSchemaGrammar {
    fn query_grammar(&self) -> &dyn Grammar {
        &self.grammar
    }

    fn default_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn fluent_commands(&self) -> &'static [FluentCommand] {
        &[FluentCommand::AutoIncrementStartingValue]
    }

    fn type_sql(&self, column: &ColumnDefinition) -> Result<String> {
        let precise = |name: &str, precision: Option<u32>| {
            precision.map_or_else(|| name.to_string(), |p| format!("{name}({p})"))
        };
        let listed = |name: &str, allowed: &[String]| -> Result<String> {
            let values = allowed
                .iter()
                .map(|value| self.quote(value))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{name}({})", values.join(", ")))
        };
        Ok(match &column.column_type {
            ColumnType::Char { length } => format!("CHAR({})", length.unwrap_or(255)),
            ColumnType::String { length } => format!("VARCHAR({})", length.unwrap_or(255)),
            ColumnType::TinyText => "TINYTEXT".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::MediumText => "MEDIUMTEXT".to_string(),
            ColumnType::LongText => "LONGTEXT".to_string(),
            ColumnType::TinyInteger => "TINYINT".to_string(),
            ColumnType::SmallInteger => "SMALLINT".to_string(),
            ColumnType::MediumInteger => "MEDIUMINT".to_string(),
            ColumnType::Integer => "INT".to_string(),
            ColumnType::BigInteger => "BIGINT".to_string(),
            ColumnType::Float { precision } => precise("FLOAT", *precision),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Decimal { total, places } => format!("DECIMAL({total}, {places})"),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
            ColumnType::Enum { allowed } => listed("ENUM", allowed)?,
            ColumnType::Set { allowed } => listed("SET", allowed)?,
            ColumnType::Json | ColumnType::Jsonb => "JSON".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime { precision } | ColumnType::DateTimeTz { precision } => {
                precise("DATETIME", *precision)
            }
            ColumnType::Time { precision } | ColumnType::TimeTz { precision } => precise("TIME", *precision),
            ColumnType::Timestamp { precision } | ColumnType::TimestampTz { precision } => {
                precise("TIMESTAMP", *precision)
            }
            ColumnType::Year => "YEAR".to_string(),
            ColumnType::Binary { length, fixed: true } => format!("BINARY({})", length.unwrap_or(255)),
            ColumnType::Binary { length: Some(length), fixed: false } => format!("VARBINARY({length})"),
            ColumnType::Binary { length: None, fixed: false } => "BLOB".to_string(),
            ColumnType::Uuid => "CHAR(36)".to_string(),
            ColumnType::IpAddress => "VARCHAR(45)".to_string(),
            ColumnType::MacAddress => "VARCHAR(17)".to_string(),
            ColumnType::Geometry { subtype, srid } | ColumnType::Geography { subtype, srid } => {
                self.spatial_type("GEOMETRY", subtype.as_ref(), *srid)
            }
            ColumnType::Vector { dimensions } => format!("VECTOR({dimensions})"),
            ColumnType::Computed { .. } => {
                return Err(Error::unsupported(self.name(), "computed columns without a type"))
            }
        })
    }

    fn modifiers_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<String> {
        apply_modifiers(self, Self::MODIFIERS, blueprint, column)
    }

    fn current_timestamp(&self, precision: Option<u32>) -> String {
        precision.map_or_else(|| "CURRENT_TIMESTAMP".to_string(), |p| format!("CURRENT_TIMESTAMP({p})"))
    }

    fn compile_create(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.columns().iter().collect();
        let mut definitions = self.get_columns(blueprint, &columns)?;
        let primary = blueprint.commands().iter().find_map(|command| match command {
            Command::Primary(index) => Some(index),
            _ => None,
        });
        if let Some(index) = primary {
            definitions.push(format!(
                "PRIMARY KEY{} ({})",
                Self::using(index),
                self.columnize(&index.columns)
            ));
        }

        let mut sql = format!(
            "CREATE {}TABLE {} ({})",
            if blueprint.temporary { "TEMPORARY " } else { "" },
            self.wrap_table(blueprint),
            definitions.join(", ")
        );
        if let Some(charset) = blueprint.charset.as_ref().or(self.charset.as_ref()) {
            sql.push_str(&format!(" DEFAULT CHARACTER SET {charset}"));
        }
        if let Some(collation) = blueprint.collation.as_ref().or(self.collation.as_ref()) {
            sql.push_str(&format!(" COLLATE {}", self.quote(collation)?));
        }
        if let Some(engine) = blueprint.engine.as_ref().or(self.engine.as_ref()) {
            sql.push_str(&format!(" ENGINE = {engine}"));
        }
        Ok(vec![sql])
    }

    fn compile_add(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.added_columns().collect();
        let definitions: Vec<String> = self
            .get_columns(blueprint, &columns)?
            .into_iter()
            .map(|definition| format!("ADD {definition}"))
            .collect();
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.wrap_table(blueprint),
            definitions.join(", ")
        )])
    }

    fn compile_change(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.changed_columns().collect();
        let definitions: Vec<String> = self
            .get_columns(blueprint, &columns)?
            .into_iter()
            .map(|definition| format!("MODIFY {definition}"))
            .collect();
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.wrap_table(blueprint),
            definitions.join(", ")
        )])
    }

    fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "RENAME TABLE {} TO {}",
            self.wrap_table(blueprint),
            self.grammar.wrap_table(to)
        )])
    }

    fn compile_drop_column(&self, blueprint: &Blueprint, columns: &[String]) -> Result<Vec<String>> {
        let drops: Vec<String> = columns
            .iter()
            .map(|column| format!("DROP {}", self.wrap(column)))
            .collect();
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.wrap_table(blueprint),
            drops.join(", ")
        )])
    }

    fn compile_rename_column(&self, blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        if !self.supports_rename_column() {
            return Err(Error::unsupported(
                self.name(),
                "renaming columns before MySQL 8.0 / MariaDB 10.5.2",
            ));
        }
        Ok(vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.wrap_table(blueprint),
            self.wrap(from),
            self.wrap(to)
        )])
    }

    fn compile_primary(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        // Inlined by compile_create.
        if blueprint.creating() {
            return Ok(Vec::new());
        }
        Ok(vec![format!(
            "ALTER TABLE {} ADD PRIMARY KEY{} ({})",
            self.wrap_table(blueprint),
            Self::using(index),
            self.columnize(&index.columns)
        )])
    }

    fn compile_unique(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(self.add_index(blueprint, "UNIQUE", index))
    }

    fn compile_index(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(self.add_index(blueprint, "INDEX", index))
    }

    fn compile_fulltext(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(self.add_index(blueprint, "FULLTEXT", index))
    }

    fn compile_spatial_index(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(self.add_index(blueprint, "SPATIAL INDEX", index))
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, _name: &str) -> Result<Vec<String>> {
        Ok(vec![format!("ALTER TABLE {} DROP PRIMARY KEY", self.wrap_table(blueprint))])
    }

    fn compile_drop_index(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.wrap_table(blueprint),
            self.wrap(name)
        )])
    }

    fn compile_drop_fulltext(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_index(blueprint, name)
    }

    fn compile_drop_spatial_index(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_index(blueprint, name)
    }

    fn compile_drop_foreign(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.wrap_table(blueprint),
            self.wrap(name)
        )])
    }

    fn compile_rename_index(&self, blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} RENAME INDEX {} TO {}",
            self.wrap_table(blueprint),
            self.wrap(from),
            self.wrap(to)
        )])
    }

    fn compile_table_comment(&self, blueprint: &Blueprint, comment: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} COMMENT = {}",
            self.wrap_table(blueprint),
            self.quote(comment)?
        )])
    }

    fn compile_auto_increment_starting_value(
        &self,
        blueprint: &Blueprint,
        _column: &str,
        value: u64,
    ) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} AUTO_INCREMENT = {value}",
            self.wrap_table(blueprint)
        )])
    }

    fn compile_create_database(&self, name: &str) -> Result<String> {
        let mut sql = format!("CREATE DATABASE {}", self.wrap(name));
        if let Some(charset) = &self.charset {
            sql.push_str(&format!(" DEFAULT CHARACTER SET {}", self.wrap(charset)));
        }
        if let Some(collation) = &self.collation {
            sql.push_str(&format!(" DEFAULT COLLATE {}", self.wrap(collation)));
        }
        Ok(sql)
    }

    fn compile_drop_database_if_exists(&self, name: &str) -> Result<String> {
        Ok(format!("DROP DATABASE IF EXISTS {}", self.wrap(name)))
    }

    fn compile_enable_foreign_key_constraints(&self) -> String {
        "SET FOREIGN_KEY_CHECKS=1".to_string()
    }

    fn compile_disable_foreign_key_constraints(&self) -> String {
        "SET FOREIGN_KEY_CHECKS=0".to_string()
    }

    fn compile_tables(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT table_name AS `name`, table_schema AS `schema`, \
             (data_length + index_length) AS `size`, table_comment AS `comment`, \
             engine AS `engine`, table_collation AS `collation` \
             FROM information_schema.tables \
             WHERE table_schema = {} AND table_type IN ('BASE TABLE', 'SYSTEM VERSIONED') \
             ORDER BY table_name",
            self.schema_sql(schema)?
        ))
    }

    fn compile_views(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT table_name AS `name`, table_schema AS `schema`, view_definition AS `definition` \
             FROM information_schema.views WHERE table_schema = {} ORDER BY table_name",
            self.schema_sql(schema)?
        ))
    }

    fn compile_columns(&self, schema: Option<&str>, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT column_name AS `name`, data_type AS `type_name`, column_type AS `type`, \
             collation_name AS `collation`, is_nullable AS `nullable`, \
             column_default AS `default`, column_comment AS `comment`, \
             generation_expression AS `expression`, extra AS `extra` \
             FROM information_schema.columns WHERE table_schema = {} AND table_name = {} \
             ORDER BY ordinal_position ASC",
            self.schema_sql(schema)?,
            self.quote(&self.prefixed(table))?
        ))
    }

    fn compile_indexes(&self, schema: Option<&str>, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT index_name AS `name`, GROUP_CONCAT(column_name ORDER BY seq_in_index) AS `columns`, \
             index_type AS `type`, NOT non_unique AS `unique` \
             FROM information_schema.statistics WHERE table_schema = {} AND table_name = {} \
             GROUP BY index_name, index_type, non_unique",
            self.schema_sql(schema)?,
            self.quote(&self.prefixed(table))?
        ))
    }

    fn compile_foreign_keys(&self, schema: Option<&str>, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT kc.constraint_name AS `name`, \
             GROUP_CONCAT(kc.column_name ORDER BY kc.ordinal_position) AS `columns`, \
             kc.referenced_table_schema AS `foreign_schema`, kc.referenced_table_name AS `foreign_table`, \
             GROUP_CONCAT(kc.referenced_column_name ORDER BY kc.ordinal_position) AS `foreign_columns`, \
             rc.update_rule AS `on_update`, rc.delete_rule AS `on_delete` \
             FROM information_schema.key_column_usage kc \
             JOIN information_schema.referential_constraints rc \
             ON kc.constraint_schema = rc.constraint_schema AND kc.constraint_name = rc.constraint_name \
             WHERE kc.table_schema = {} AND kc.table_name = {} AND kc.referenced_table_name IS NOT NULL \
             GROUP BY kc.constraint_name, kc.referenced_table_schema, kc.referenced_table_name, \
             rc.update_rule, rc.delete_rule",
            self.schema_sql(schema)?,
            self.quote(&self.prefixed(table))?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::command::ForeignKeyDefinition;

    fn compile(blueprint: &Blueprint) -> Vec<String> {
        blueprint.to_sql(&MySqlSchemaGrammar::new()).unwrap()
    }

    #[test]
    fn test_create_table_with_defaults() {
        let grammar = MySqlSchemaGrammar::new().with_table_defaults(
            Some("utf8mb4".into()),
            Some("utf8mb4_unicode_ci".into()),
            Some("InnoDB".into()),
        );
        let mut table = Blueprint::create("users");
        table.id();
        table.string("email", None);
        assert_eq!(
            table.to_sql(&grammar).unwrap(),
            vec![
                "CREATE TABLE `users` (`id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY, \
                 `email` VARCHAR(255) NOT NULL) DEFAULT CHARACTER SET utf8mb4 \
                 COLLATE 'utf8mb4_unicode_ci' ENGINE = InnoDB"
            ]
        );
    }

    #[test]
    fn test_modifier_order() {
        let mut table = Blueprint::new("users");
        table
            .integer("votes")
            .unsigned()
            .nullable()
            .default(0)
            .comment("total")
            .after("name");
        assert_eq!(
            compile(&table),
            vec!["ALTER TABLE `users` ADD `votes` INT UNSIGNED NULL DEFAULT 0 COMMENT 'total' AFTER `name`"]
        );
    }

    #[test]
    fn test_generated_column_nullability() {
        let mut table = Blueprint::new("products");
        table.decimal("total", 8, 2).stored_as("price * quantity");
        table.decimal("tax", 8, 2).virtual_as("price * 0.2").not_null();
        assert_eq!(
            compile(&table),
            vec![
                "ALTER TABLE `products` ADD `total` DECIMAL(8, 2) AS (price * quantity) STORED, \
                 ADD `tax` DECIMAL(8, 2) AS (price * 0.2) NOT NULL"
            ]
        );
    }

    #[test]
    fn test_timestamps_use_current() {
        let mut table = Blueprint::new("posts");
        table
            .timestamp("updated_at", Some(3))
            .use_current()
            .use_current_on_update();
        assert_eq!(
            compile(&table),
            vec![
                "ALTER TABLE `posts` ADD `updated_at` TIMESTAMP(3) NOT NULL \
                 DEFAULT CURRENT_TIMESTAMP(3) ON UPDATE CURRENT_TIMESTAMP(3)"
            ]
        );
    }

    #[test]
    fn test_primary_is_inlined_when_creating() {
        let mut table = Blueprint::create("role_user");
        table.integer("role_id");
        table.integer("user_id");
        table.primary(["role_id", "user_id"]);
        assert_eq!(
            compile(&table),
            vec![
                "CREATE TABLE `role_user` (`role_id` INT NOT NULL, `user_id` INT NOT NULL, \
                 PRIMARY KEY (`role_id`, `user_id`))"
            ]
        );
    }

    #[test]
    fn test_indexes_and_foreign_keys() {
        let mut table = Blueprint::new("posts");
        table.unique(["slug"]);
        table.index(["user_id", "created_at"]);
        table.foreign(
            ForeignKeyDefinition::new(["user_id"])
                .references(["id"])
                .on("users")
                .cascade_on_delete(),
        );
        table.drop_foreign("posts_user_id_foreign");
        assert_eq!(
            compile(&table),
            vec![
                "ALTER TABLE `posts` ADD UNIQUE `posts_slug_unique` (`slug`)",
                "ALTER TABLE `posts` ADD INDEX `posts_user_id_created_at_index` (`user_id`, `created_at`)",
                "ALTER TABLE `posts` ADD CONSTRAINT `posts_user_id_foreign` FOREIGN KEY (`user_id`) \
                 REFERENCES `users` (`id`) ON DELETE CASCADE",
                "ALTER TABLE `posts` DROP FOREIGN KEY `posts_user_id_foreign`",
            ]
        );
    }

    #[test]
    fn test_rename_column_is_version_gated() {
        let mut table = Blueprint::new("users");
        table.rename_column("name", "full_name");

        let old = MySqlSchemaGrammar::new().with_version(Some(ServerVersion::new(5, 7, 0)));
        assert!(matches!(
            table.to_sql(&old),
            Err(Error::UnsupportedOperation { .. })
        ));

        let maria = MySqlSchemaGrammar::new().with_version(Some(ServerVersion::new(10, 6, 0).mariadb()));
        assert_eq!(
            table.to_sql(&maria).unwrap(),
            vec!["ALTER TABLE `users` RENAME COLUMN `name` TO `full_name`"]
        );
    }

    #[test]
    fn test_spatial_srid_skipped_on_mariadb() {
        let mut table = Blueprint::new("places");
        table.geometry("location", Some("point"), Some(4326));
        assert_eq!(
            compile(&table),
            vec!["ALTER TABLE `places` ADD `location` POINT SRID 4326 NOT NULL"]
        );
        let maria = MySqlSchemaGrammar::new().with_version(Some(ServerVersion::new(10, 11, 0).mariadb()));
        assert_eq!(
            table.to_sql(&maria).unwrap(),
            vec!["ALTER TABLE `places` ADD `location` POINT NOT NULL"]
        );
    }

    #[test]
    fn test_starting_value() {
        let mut table = Blueprint::create("orders");
        table.id().starting_value(1000);
        let statements = compile(&table);
        assert_eq!(statements[1], "ALTER TABLE `orders` AUTO_INCREMENT = 1000");
    }

    #[test]
    fn test_introspection_uses_database() {
        let grammar = MySqlSchemaGrammar::new().with_table_prefix("app_");
        let sql = grammar.compile_columns(None, "users").unwrap();
        assert!(sql.contains("table_schema = DATABASE() AND table_name = 'app_users'"));
        let sql = grammar.compile_tables(Some("shop")).unwrap();
        assert!(sql.contains("table_schema = 'shop'"));
    }
}
