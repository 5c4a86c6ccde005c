//! Running blueprints and catalog queries through a [`Connection`].

use tracing::debug;

use crate::connection::Connection;
use crate::error::Result;
use crate::processor::{ColumnInfo, ForeignKeyInfo, IndexInfo, TableInfo, ViewInfo};
use crate::query::CompiledQuery;

use super::blueprint::Blueprint;

/// Schema operations against one connection.
///
/// Table names are given without the configured prefix; the schema grammar
/// applies it.
#[derive(Clone, Copy)]
pub struct SchemaBuilder<'c> {
    connection: &'c dyn Connection,
}

impl std::fmt::Debug for SchemaBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("grammar", &self.connection.schema_grammar().name())
            .finish()
    }
}

impl<'c> SchemaBuilder<'c> {
    /// Creates a schema builder over `connection`.
    #[must_use]
    pub fn new(connection: &'c dyn Connection) -> Self {
        Self { connection }
    }

    fn run(&self, sql: &str) -> Result<()> {
        debug!(sql, "schema statement");
        self.connection.statement(&CompiledQuery::new(sql, vec![]))?;
        Ok(())
    }

    /// Compiles and runs every statement of `blueprint`.
    ///
    /// # Errors
    ///
    /// Compile errors before anything runs; connection errors stop at the
    /// failing statement.
    pub fn build(&self, blueprint: &Blueprint) -> Result<()> {
        for sql in blueprint.to_sql(self.connection.schema_grammar())? {
            self.run(&sql)?;
        }
        Ok(())
    }

    /// Creates `table` with the columns `define` adds.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::build`].
    pub fn create(&self, table: &str, define: impl FnOnce(&mut Blueprint)) -> Result<()> {
        let mut blueprint = Blueprint::create(table);
        define(&mut blueprint);
        self.build(&blueprint)
    }

    /// Alters `table`.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::build`].
    pub fn table(&self, table: &str, define: impl FnOnce(&mut Blueprint)) -> Result<()> {
        let mut blueprint = Blueprint::new(table);
        define(&mut blueprint);
        self.build(&blueprint)
    }

    /// Drops `table`.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::build`].
    pub fn drop(&self, table: &str) -> Result<()> {
        self.table(table, Blueprint::drop)
    }

    /// Drops `table` if it exists.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::build`].
    pub fn drop_if_exists(&self, table: &str) -> Result<()> {
        self.table(table, Blueprint::drop_if_exists)
    }

    /// Renames `from` to `to`.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::build`].
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.table(from, |table| table.rename(to))
    }

    /// Creates a database.
    ///
    /// # Errors
    ///
    /// Unsupported on SQLite; connection errors.
    pub fn create_database(&self, name: &str) -> Result<()> {
        self.run(&self.connection.schema_grammar().compile_create_database(name)?)
    }

    /// Drops a database if it exists.
    ///
    /// # Errors
    ///
    /// Unsupported on SQLite; connection errors.
    pub fn drop_database_if_exists(&self, name: &str) -> Result<()> {
        self.run(&self.connection.schema_grammar().compile_drop_database_if_exists(name)?)
    }

    /// Turns foreign key checks on.
    ///
    /// # Errors
    ///
    /// Connection errors.
    pub fn enable_foreign_key_constraints(&self) -> Result<()> {
        self.run(&self.connection.schema_grammar().compile_enable_foreign_key_constraints())
    }

    /// Turns foreign key checks off.
    ///
    /// # Errors
    ///
    /// Connection errors.
    pub fn disable_foreign_key_constraints(&self) -> Result<()> {
        self.run(&self.connection.schema_grammar().compile_disable_foreign_key_constraints())
    }

    /// Runs `f` with foreign key checks off. Checks are turned back on even
    /// when `f` fails; the error from `f` wins.
    ///
    /// # Errors
    ///
    /// Errors from `f` or from toggling the checks.
    pub fn without_foreign_key_constraints<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.disable_foreign_key_constraints()?;
        let result = f(self);
        let enabled = self.enable_foreign_key_constraints();
        let value = result?;
        enabled?;
        Ok(value)
    }

    // Introspection

    fn catalog(&self, sql: String) -> Result<Vec<crate::connection::Row>> {
        debug!(sql = %sql, "catalog query");
        self.connection.select(&CompiledQuery::new(sql, vec![]))
    }

    /// Tables in the connection's schema.
    ///
    /// # Errors
    ///
    /// Connection or processing errors.
    pub fn get_tables(&self) -> Result<Vec<TableInfo>> {
        let sql = self.connection.schema_grammar().compile_tables(None)?;
        self.connection.processor().process_tables(self.catalog(sql)?)
    }

    /// Views in the connection's schema.
    ///
    /// # Errors
    ///
    /// Connection or processing errors.
    pub fn get_views(&self) -> Result<Vec<ViewInfo>> {
        let sql = self.connection.schema_grammar().compile_views(None)?;
        self.connection.processor().process_views(self.catalog(sql)?)
    }

    /// Columns of `table`; `schema.table` selects another schema.
    ///
    /// # Errors
    ///
    /// Connection or processing errors.
    pub fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = self.connection.schema_grammar().compile_columns(None, table)?;
        self.connection.processor().process_columns(self.catalog(sql)?)
    }

    /// Indexes of `table`.
    ///
    /// # Errors
    ///
    /// Connection or processing errors.
    pub fn get_indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let sql = self.connection.schema_grammar().compile_indexes(None, table)?;
        self.connection.processor().process_indexes(self.catalog(sql)?)
    }

    /// Foreign keys of `table`.
    ///
    /// # Errors
    ///
    /// Connection or processing errors.
    pub fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let sql = self.connection.schema_grammar().compile_foreign_keys(None, table)?;
        self.connection.processor().process_foreign_keys(self.catalog(sql)?)
    }

    /// Column names of `table`.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::get_columns`].
    pub fn get_column_listing(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.get_columns(table)?.into_iter().map(|column| column.name).collect())
    }

    /// Whether `table` exists, compared case-insensitively with the prefix
    /// applied.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::get_tables`].
    pub fn has_table(&self, table: &str) -> Result<bool> {
        let wanted = self.connection.schema_grammar().prefixed(table);
        Ok(self
            .get_tables()?
            .iter()
            .any(|info| info.name.eq_ignore_ascii_case(&wanted)))
    }

    /// Whether `table` has `column`, compared case-insensitively.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::get_columns`].
    pub fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .get_column_listing(table)?
            .iter()
            .any(|name| name.eq_ignore_ascii_case(column)))
    }

    /// Whether `table` has every column in `columns`.
    ///
    /// # Errors
    ///
    /// See [`SchemaBuilder::get_columns`].
    pub fn has_columns(&self, table: &str, columns: &[&str]) -> Result<bool> {
        let listing = self.get_column_listing(table)?;
        Ok(columns
            .iter()
            .all(|column| listing.iter().any(|name| name.eq_ignore_ascii_case(column))))
    }
}
