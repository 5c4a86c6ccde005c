//! Running builders through a [`Connection`].

use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::Result;
use crate::grammar::table_alias;
use crate::processor::flag_value;
use crate::value::SqlValue;

use super::builder::QueryBuilder;
use super::values::{Record, Upsert, Values};
use super::{AggregateFunction, CompiledQuery};

/// Name a result column is read back under: the alias, or the last
/// segment of a qualified column.
fn result_key(column: &str) -> &str {
    let column = table_alias(column);
    column.rsplit('.').next().unwrap_or(column)
}

fn log(kind: &'static str, query: &CompiledQuery) {
    debug!(kind, sql = %query.sql, bindings = query.bindings.len(), "executing");
}

impl QueryBuilder {
    /// Runs the query as a SELECT.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn get(&self, connection: &dyn Connection) -> Result<Vec<Row>> {
        let compiled = connection.grammar().compile_select(self)?;
        log("select", &compiled);
        let rows = connection.select(&compiled)?;
        Ok(connection.processor().process_select(self, rows))
    }

    /// First row of the query.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn first(&self, connection: &dyn Connection) -> Result<Option<Row>> {
        Ok(self.clone().limit(1).get(connection)?.into_iter().next())
    }

    /// A single column of the first row.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn value(&self, connection: &dyn Connection, column: &str) -> Result<Option<SqlValue>> {
        let row = self.clone().select([column]).first(connection)?;
        Ok(row.and_then(|mut row| row.remove(result_key(column))))
    }

    /// One column from every row.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn pluck(&self, connection: &dyn Connection, column: &str) -> Result<Vec<SqlValue>> {
        let key = result_key(column);
        Ok(self
            .clone()
            .select([column])
            .get(connection)?
            .into_iter()
            .map(|mut row| row.remove(key).unwrap_or(SqlValue::Null))
            .collect())
    }

    /// Runs an aggregate and returns the `aggregate` column.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn aggregate<C: Into<String>>(
        &self,
        connection: &dyn Connection,
        function: AggregateFunction,
        columns: impl IntoIterator<Item = C>,
    ) -> Result<Option<SqlValue>> {
        let rows = self.to_aggregate(function, columns).get(connection)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.remove("aggregate"))
            .filter(|value| *value != SqlValue::Null))
    }

    /// `COUNT(*)`
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn count(&self, connection: &dyn Connection) -> Result<i64> {
        Ok(self
            .aggregate(connection, AggregateFunction::Count, ["*"])?
            .and_then(|value| value.as_i64())
            .unwrap_or(0))
    }

    /// `MIN(column)`
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn min(&self, connection: &dyn Connection, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(connection, AggregateFunction::Min, [column])
    }

    /// `MAX(column)`
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn max(&self, connection: &dyn Connection, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(connection, AggregateFunction::Max, [column])
    }

    /// `SUM(column)`; an empty set sums to zero.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn sum(&self, connection: &dyn Connection, column: &str) -> Result<SqlValue> {
        Ok(self
            .aggregate(connection, AggregateFunction::Sum, [column])?
            .unwrap_or(SqlValue::Int(0)))
    }

    /// `AVG(column)`
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn avg(&self, connection: &dyn Connection, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(connection, AggregateFunction::Avg, [column])
    }

    /// Whether the query matches any row.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn exists(&self, connection: &dyn Connection) -> Result<bool> {
        let compiled = connection.grammar().compile_exists(self)?;
        log("exists", &compiled);
        let rows = connection.select(&compiled)?;
        Ok(rows.first().is_some_and(|row| flag_value(row.get("exists"))))
    }

    /// Negation of [`QueryBuilder::exists`].
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::get`].
    pub fn doesnt_exist(&self, connection: &dyn Connection) -> Result<bool> {
        Ok(!self.exists(connection)?)
    }

    /// Inserts `values`. Nothing is sent for an empty set.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn insert(&self, connection: &dyn Connection, values: &Values) -> Result<bool> {
        if values.is_empty() {
            return Ok(true);
        }
        let compiled = connection.grammar().compile_insert(self, values)?;
        log("insert", &compiled);
        connection.insert(&compiled)
    }

    /// Inserts `values`, skipping rows that violate unique constraints.
    /// Returns the number of inserted rows.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn insert_or_ignore(&self, connection: &dyn Connection, values: &Values) -> Result<u64> {
        if values.is_empty() {
            return Ok(0);
        }
        let compiled = connection.grammar().compile_insert_or_ignore(self, values)?;
        log("insert or ignore", &compiled);
        connection.affecting_statement(&compiled)
    }

    /// Inserts a row and returns its generated key.
    ///
    /// # Errors
    ///
    /// Compile, connection or processing errors.
    pub fn insert_get_id(
        &self,
        connection: &dyn Connection,
        values: &Values,
        sequence: Option<&str>,
    ) -> Result<i64> {
        let compiled = connection
            .grammar()
            .compile_insert_get_id(self, values, sequence)?;
        log("insert get id", &compiled);
        connection
            .processor()
            .process_insert_get_id(connection, &compiled, sequence)
    }

    /// `INSERT INTO table (columns) SELECT ...`; returns affected rows.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn insert_using(
        &self,
        connection: &dyn Connection,
        columns: &[String],
        source: &Self,
    ) -> Result<u64> {
        let compiled = connection
            .grammar()
            .compile_insert_using(self, columns, source)?;
        log("insert using", &compiled);
        connection.affecting_statement(&compiled)
    }

    /// Inserts or updates on conflict; returns affected rows.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn upsert(&self, connection: &dyn Connection, upsert: &Upsert) -> Result<u64> {
        if upsert.values().is_empty() {
            return Ok(0);
        }
        let compiled = connection.grammar().compile_upsert(self, upsert)?;
        log("upsert", &compiled);
        connection.affecting_statement(&compiled)
    }

    /// Updates matching rows; returns affected rows.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn update(&self, connection: &dyn Connection, record: &Record) -> Result<u64> {
        let compiled = connection.grammar().compile_update(self, record)?;
        log("update", &compiled);
        connection.affecting_statement(&compiled)
    }

    /// Deletes matching rows; returns affected rows.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn delete(&self, connection: &dyn Connection) -> Result<u64> {
        let compiled = connection.grammar().compile_delete(self)?;
        log("delete", &compiled);
        connection.affecting_statement(&compiled)
    }

    /// Empties the table, running every statement the dialect needs.
    ///
    /// # Errors
    ///
    /// Compile or connection errors.
    pub fn truncate(&self, connection: &dyn Connection) -> Result<()> {
        for compiled in connection.grammar().compile_truncate(self)? {
            log("truncate", &compiled);
            connection.statement(&compiled)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_key_strips_alias_and_qualifier() {
        assert_eq!(result_key("users.email"), "email");
        assert_eq!(result_key("users.email as address"), "address");
        assert_eq!(result_key("id"), "id");
    }
}
