//! Dialect compilers for table definitions.
//!
//! A [`SchemaGrammar`] owns the query grammar of its dialect for quoting and
//! literals. Column definitions are rendered as `name type modifiers...`,
//! where the modifiers come from a fixed, per-dialect list of
//! [`Modifier`] functions.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlSchemaGrammar;
pub use postgres::PostgresSchemaGrammar;
pub use sqlite::SqliteSchemaGrammar;
pub use sqlserver::SqlServerSchemaGrammar;

use std::fmt;

use tracing::trace;

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::value::SqlValue;

use super::blueprint::Blueprint;
use super::column::{ColumnDefinition, DefaultValue};
use super::command::{Command, ForeignKeyDefinition, IndexCommand};

/// Commands a grammar derives from column attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluentCommand {
    /// Column comments issued as separate statements.
    ColumnComment,
    /// Sequence restarts for `starting_value`.
    AutoIncrementStartingValue,
}

/// Renders one clause of a column definition, or nothing.
pub type Modifier<G> = fn(&G, &Blueprint, &ColumnDefinition) -> Result<Option<String>>;

/// Runs `modifiers` in order and concatenates their output.
pub(crate) fn apply_modifiers<G>(
    grammar: &G,
    modifiers: &[Modifier<G>],
    blueprint: &Blueprint,
    column: &ColumnDefinition,
) -> Result<String> {
    let mut sql = String::new();
    for modifier in modifiers {
        if let Some(clause) = modifier(grammar, blueprint, column)? {
            sql.push_str(&clause);
        }
    }
    Ok(sql)
}

/// `"name" IN ('a', 'b')` for enum check constraints.
pub(crate) fn check_in(
    grammar: &dyn SchemaGrammar,
    column: &ColumnDefinition,
    allowed: &[String],
) -> Result<String> {
    let values = allowed
        .iter()
        .map(|value| grammar.quote(value))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("CHECK ({} IN ({}))", grammar.wrap(&column.name), values.join(", ")))
}

/// Compiles [`Blueprint`] commands for one dialect.
pub trait SchemaGrammar: Send + Sync + fmt::Debug {
    /// Query grammar used for identifiers and literals.
    fn query_grammar(&self) -> &dyn Grammar;

    /// Schema used by introspection queries when none is given.
    fn default_schema(&self) -> Option<&str>;

    /// Commands this dialect derives from column attributes.
    fn fluent_commands(&self) -> &'static [FluentCommand] {
        &[]
    }

    /// Dialect name used in errors.
    fn name(&self) -> &'static str {
        self.query_grammar().name()
    }

    /// Quotes a column or `table.column`.
    fn wrap(&self, value: &str) -> String {
        self.query_grammar().wrap(value)
    }

    /// Quotes the blueprint's table with the prefix applied.
    fn wrap_table(&self, blueprint: &Blueprint) -> String {
        self.query_grammar().wrap_table(blueprint.table())
    }

    /// Comma separated quoted columns.
    fn columnize(&self, columns: &[String]) -> String {
        self.query_grammar().columnize(columns)
    }

    /// String literal.
    ///
    /// # Errors
    ///
    /// Strings that cannot be written as a literal.
    fn quote(&self, value: &str) -> Result<String> {
        self.query_grammar().escape_string(value)
    }

    /// Table name with the prefix, unquoted.
    fn prefixed(&self, table: &str) -> String {
        format!("{}{table}", self.query_grammar().base().table_prefix())
    }

    // Columns

    /// SQL type of `column`.
    ///
    /// # Errors
    ///
    /// Types the dialect cannot store.
    fn type_sql(&self, column: &ColumnDefinition) -> Result<String>;

    /// Modifier clauses of `column`, in the dialect's order.
    ///
    /// # Errors
    ///
    /// Modifiers the dialect rejects.
    fn modifiers_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<String>;

    /// Full column definition.
    ///
    /// # Errors
    ///
    /// See [`SchemaGrammar::type_sql`] and [`SchemaGrammar::modifiers_sql`].
    fn column_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<String> {
        Ok(format!(
            "{} {}{}",
            self.wrap(&column.name),
            self.type_sql(column)?,
            self.modifiers_sql(blueprint, column)?
        ))
    }

    /// Definitions for `columns`.
    ///
    /// # Errors
    ///
    /// See [`SchemaGrammar::column_sql`].
    fn get_columns(&self, blueprint: &Blueprint, columns: &[&ColumnDefinition]) -> Result<Vec<String>> {
        columns
            .iter()
            .map(|column| self.column_sql(blueprint, column))
            .collect()
    }

    /// `CURRENT_TIMESTAMP` for `use_current` columns.
    fn current_timestamp(&self, _precision: Option<u32>) -> String {
        "CURRENT_TIMESTAMP".to_string()
    }

    /// The default a column ends up with, including `use_current`.
    fn effective_default(&self, column: &ColumnDefinition) -> Option<DefaultValue> {
        column.default.clone().or_else(|| {
            let precision = column.column_type.temporal_precision()?;
            column
                .use_current
                .then(|| DefaultValue::Expression(self.current_timestamp(precision)))
        })
    }

    /// Literal for a default value.
    ///
    /// # Errors
    ///
    /// Non-finite floats and strings with NUL bytes.
    fn default_value(&self, value: &DefaultValue) -> Result<String> {
        let grammar = self.query_grammar();
        match value {
            DefaultValue::Null => Ok("NULL".to_string()),
            DefaultValue::Bool(b) => Ok(grammar.escape_bool(*b)),
            DefaultValue::Integer(n) => Ok(n.to_string()),
            DefaultValue::Float(f) => grammar.escape(&SqlValue::Float(*f)),
            DefaultValue::String(s) => grammar.escape_string(s),
            DefaultValue::Expression(sql) => Ok(sql.clone()),
        }
    }

    // Commands

    /// Compiles one command.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedOperation`] when the dialect lacks the command.
    fn compile(&self, blueprint: &Blueprint, command: &Command) -> Result<Vec<String>> {
        let statements = match command {
            Command::Create => self.compile_create(blueprint)?,
            Command::Add => self.compile_add(blueprint)?,
            Command::Change => self.compile_change(blueprint)?,
            Command::Drop => self.compile_drop(blueprint)?,
            Command::DropIfExists => self.compile_drop_if_exists(blueprint)?,
            Command::Rename { to } => self.compile_rename(blueprint, to)?,
            Command::DropColumn { columns } => self.compile_drop_column(blueprint, columns)?,
            Command::RenameColumn { from, to } => self.compile_rename_column(blueprint, from, to)?,
            Command::Primary(index) => self.compile_primary(blueprint, index)?,
            Command::Unique(index) => self.compile_unique(blueprint, index)?,
            Command::Index(index) => self.compile_index(blueprint, index)?,
            Command::Fulltext(index) => self.compile_fulltext(blueprint, index)?,
            Command::SpatialIndex(index) => self.compile_spatial_index(blueprint, index)?,
            Command::Foreign(foreign) => self.compile_foreign(blueprint, foreign)?,
            Command::DropPrimary { name } => self.compile_drop_primary(blueprint, name)?,
            Command::DropUnique { name } => self.compile_drop_unique(blueprint, name)?,
            Command::DropIndex { name } => self.compile_drop_index(blueprint, name)?,
            Command::DropFulltext { name } => self.compile_drop_fulltext(blueprint, name)?,
            Command::DropSpatialIndex { name } => self.compile_drop_spatial_index(blueprint, name)?,
            Command::DropForeign { name } => self.compile_drop_foreign(blueprint, name)?,
            Command::RenameIndex { from, to } => self.compile_rename_index(blueprint, from, to)?,
            Command::TableComment { comment } => self.compile_table_comment(blueprint, comment)?,
            Command::ColumnComment { column, comment } => {
                self.compile_column_comment(blueprint, column, comment)?
            }
            Command::AutoIncrementStartingValue { column, value } => {
                self.compile_auto_increment_starting_value(blueprint, column, *value)?
            }
        };
        trace!(grammar = self.name(), ?command, statements = statements.len(), "compiled command");
        Ok(statements)
    }

    /// CREATE TABLE.
    ///
    /// # Errors
    ///
    /// Column errors.
    fn compile_create(&self, blueprint: &Blueprint) -> Result<Vec<String>>;

    /// Adds the blueprint's new columns.
    ///
    /// # Errors
    ///
    /// Column errors.
    fn compile_add(&self, blueprint: &Blueprint) -> Result<Vec<String>>;

    /// Alters the blueprint's changed columns.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_change(&self, _blueprint: &Blueprint) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "changing columns"))
    }

    /// `DROP TABLE t`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_drop(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        Ok(vec![format!("DROP TABLE {}", self.wrap_table(blueprint))])
    }

    /// `DROP TABLE IF EXISTS t`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_drop_if_exists(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        Ok(vec![format!("DROP TABLE IF EXISTS {}", self.wrap_table(blueprint))])
    }

    /// `ALTER TABLE t RENAME TO u`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            self.wrap_table(blueprint),
            self.query_grammar().wrap_table(to)
        )])
    }

    /// `ALTER TABLE t DROP COLUMN a, DROP COLUMN b`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_drop_column(&self, blueprint: &Blueprint, columns: &[String]) -> Result<Vec<String>> {
        let drops: Vec<String> = columns
            .iter()
            .map(|column| format!("DROP COLUMN {}", self.wrap(column)))
            .collect();
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.wrap_table(blueprint),
            drops.join(", ")
        )])
    }

    /// `ALTER TABLE t RENAME COLUMN a TO b`
    ///
    /// # Errors
    ///
    /// Version gated on some dialects.
    fn compile_rename_column(&self, blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.wrap_table(blueprint),
            self.wrap(from),
            self.wrap(to)
        )])
    }

    /// `ALTER TABLE t ADD PRIMARY KEY (cols)`
    ///
    /// # Errors
    ///
    /// Unsupported on existing SQLite tables.
    fn compile_primary(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.wrap_table(blueprint),
            self.columnize(&index.columns)
        )])
    }

    /// `CREATE UNIQUE INDEX n ON t (cols)`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_unique(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![format!(
            "CREATE UNIQUE INDEX {} ON {} ({})",
            self.wrap(&index.name),
            self.wrap_table(blueprint),
            self.columnize(&index.columns)
        )])
    }

    /// `CREATE INDEX n ON t (cols)`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_index(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![format!(
            "CREATE INDEX {} ON {} ({})",
            self.wrap(&index.name),
            self.wrap_table(blueprint),
            self.columnize(&index.columns)
        )])
    }

    /// Full-text index.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_fulltext(&self, _blueprint: &Blueprint, _index: &IndexCommand) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "full-text indexes"))
    }

    /// Spatial index.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_spatial_index(&self, _blueprint: &Blueprint, _index: &IndexCommand) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "spatial indexes"))
    }

    /// `ALTER TABLE t ADD CONSTRAINT n FOREIGN KEY ...`
    ///
    /// # Errors
    ///
    /// Unsupported on existing SQLite tables.
    fn compile_foreign(&self, blueprint: &Blueprint, foreign: &ForeignKeyDefinition) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.wrap_table(blueprint),
            self.wrap(&foreign.name),
            self.foreign_key_clause(foreign)
        )])
    }

    /// `FOREIGN KEY (cols) REFERENCES t (cols) [ON DELETE ..] [ON UPDATE ..]`
    fn foreign_key_clause(&self, foreign: &ForeignKeyDefinition) -> String {
        let mut sql = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.columnize(&foreign.columns),
            self.query_grammar().wrap_table(&foreign.on),
            self.columnize(&foreign.references)
        );
        if let Some(action) = foreign.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.to_sql());
        }
        if let Some(action) = foreign.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.to_sql());
        }
        sql
    }

    /// Drops the primary key.
    ///
    /// # Errors
    ///
    /// Unsupported on SQLite.
    fn compile_drop_primary(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_constraint(blueprint, name)
    }

    /// `ALTER TABLE t DROP CONSTRAINT n`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_drop_constraint(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.wrap_table(blueprint),
            self.wrap(name)
        )])
    }

    /// Drops a unique index.
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_drop_unique(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_index(blueprint, name)
    }

    /// `DROP INDEX n`
    ///
    /// # Errors
    ///
    /// Infallible by default.
    fn compile_drop_index(&self, _blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        Ok(vec![format!("DROP INDEX {}", self.wrap(name))])
    }

    /// Drops a full-text index.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_drop_fulltext(&self, _blueprint: &Blueprint, _name: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "full-text indexes"))
    }

    /// Drops a spatial index.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_drop_spatial_index(&self, _blueprint: &Blueprint, _name: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "spatial indexes"))
    }

    /// Drops a foreign key.
    ///
    /// # Errors
    ///
    /// Unsupported on SQLite.
    fn compile_drop_foreign(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_constraint(blueprint, name)
    }

    /// Renames an index.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_rename_index(&self, _blueprint: &Blueprint, _from: &str, _to: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "renaming indexes"))
    }

    /// Sets the table comment.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_table_comment(&self, _blueprint: &Blueprint, _comment: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "table comments"))
    }

    /// Sets a column comment.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_column_comment(&self, _blueprint: &Blueprint, _column: &str, _comment: &str) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "column comment statements"))
    }

    /// Restarts an auto-increment counter.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_auto_increment_starting_value(
        &self,
        _blueprint: &Blueprint,
        _column: &str,
        _value: u64,
    ) -> Result<Vec<String>> {
        Err(Error::unsupported(self.name(), "auto-increment starting values"))
    }

    // Databases and constraints

    /// `CREATE DATABASE`.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_create_database(&self, _name: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "creating databases"))
    }

    /// `DROP DATABASE IF EXISTS`.
    ///
    /// # Errors
    ///
    /// Unsupported unless overridden.
    fn compile_drop_database_if_exists(&self, _name: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "dropping databases"))
    }

    /// Turns foreign key checks on.
    fn compile_enable_foreign_key_constraints(&self) -> String;

    /// Turns foreign key checks off.
    fn compile_disable_foreign_key_constraints(&self) -> String;

    // Introspection

    /// Lists tables; columns `name`, `schema`, `size`, `comment`,
    /// `collation`, `engine` where the engine reports them.
    ///
    /// # Errors
    ///
    /// Schema names that cannot be quoted.
    fn compile_tables(&self, schema: Option<&str>) -> Result<String>;

    /// Lists views; columns `name`, `schema`, `definition`.
    ///
    /// # Errors
    ///
    /// Schema names that cannot be quoted.
    fn compile_views(&self, schema: Option<&str>) -> Result<String>;

    /// Lists the columns of `table`.
    ///
    /// # Errors
    ///
    /// Names that cannot be quoted.
    fn compile_columns(&self, schema: Option<&str>, table: &str) -> Result<String>;

    /// Lists the indexes of `table`.
    ///
    /// # Errors
    ///
    /// Names that cannot be quoted.
    fn compile_indexes(&self, schema: Option<&str>, table: &str) -> Result<String>;

    /// Lists the foreign keys of `table`.
    ///
    /// # Errors
    ///
    /// Names that cannot be quoted.
    fn compile_foreign_keys(&self, schema: Option<&str>, table: &str) -> Result<String>;
}
