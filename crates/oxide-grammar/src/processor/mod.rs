//! Post-processing of executed statements.
//!
//! Catalog queries from [`SchemaGrammar`](crate::schema::SchemaGrammar)
//! return engine specific rows; a [`Processor`] normalizes them into the
//! info types below.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlProcessor;
pub use postgres::PostgresProcessor;
pub use sqlite::SqliteProcessor;
pub use sqlserver::SqlServerProcessor;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::{Error, Result};
use crate::query::{CompiledQuery, QueryBuilder};
use crate::value::SqlValue;

/// A table reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Schema or database holding the table.
    pub schema: Option<String>,
    /// Size in bytes, when the engine reports it.
    pub size: Option<i64>,
    /// Table comment.
    pub comment: Option<String>,
    /// Default collation.
    pub collation: Option<String>,
    /// Storage engine (MySQL).
    pub engine: Option<String>,
}

/// A view reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
    /// View name.
    pub name: String,
    /// Schema holding the view.
    pub schema: Option<String>,
    /// The view's SELECT text.
    pub definition: String,
}

/// How a generated column is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// `stored` or `virtual`.
    pub kind: String,
    /// Generating expression.
    pub expression: Option<String>,
}

/// A column reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Bare type name, lowercased (`varchar`).
    pub type_name: String,
    /// Full type (`varchar(255)`).
    pub full_type: String,
    /// Column collation.
    pub collation: Option<String>,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default expression.
    pub default: Option<String>,
    /// Whether values are generated by a sequence or identity.
    pub auto_increment: bool,
    /// Column comment.
    pub comment: Option<String>,
    /// Generated column definition.
    pub generation: Option<Generation>,
}

/// An index reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Indexed columns in key order.
    pub columns: Vec<String>,
    /// Access method (`btree`, `hash`, ...).
    pub kind: Option<String>,
    /// Whether the index is unique.
    pub unique: bool,
    /// Whether the index backs the primary key.
    pub primary: bool,
}

/// A foreign key reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    /// Constraint name.
    pub name: Option<String>,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Schema of the referenced table.
    pub foreign_schema: Option<String>,
    /// Referenced table.
    pub foreign_table: String,
    /// Referenced columns.
    pub foreign_columns: Vec<String>,
    /// `ON UPDATE` action, lowercased.
    pub on_update: String,
    /// `ON DELETE` action, lowercased.
    pub on_delete: String,
}

/// Normalizes results returned by a [`Connection`].
pub trait Processor: Send + Sync + fmt::Debug {
    /// Dialect name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Post-processes the rows of a SELECT. Rows pass through unchanged by
    /// default.
    fn process_select(&self, _query: &QueryBuilder, rows: Vec<Row>) -> Vec<Row> {
        rows
    }

    /// Runs an INSERT and returns the generated key.
    ///
    /// The default runs the statement and asks the connection for its last
    /// insert id. Dialects whose grammar selects the key back (`RETURNING`,
    /// `SCOPE_IDENTITY()`) read it from the result row instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] when no key is reported.
    fn process_insert_get_id(
        &self,
        connection: &dyn Connection,
        query: &CompiledQuery,
        _sequence: Option<&str>,
    ) -> Result<i64> {
        connection.insert(query)?;
        let id = connection
            .last_insert_id()?
            .ok_or_else(|| Error::Processing("connection reported no insert id".to_string()))?;
        debug!(processor = self.name(), id, "insert id");
        Ok(id)
    }

    /// Normalizes table rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] for rows without a name.
    fn process_tables(&self, rows: Vec<Row>) -> Result<Vec<TableInfo>> {
        rows.iter()
            .map(|row| {
                Ok(TableInfo {
                    name: text(row, "name")?,
                    schema: opt_text(row, "schema"),
                    size: row.get("size").and_then(SqlValue::as_i64),
                    comment: opt_text(row, "comment"),
                    collation: opt_text(row, "collation"),
                    engine: opt_text(row, "engine"),
                })
            })
            .collect()
    }

    /// Normalizes view rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] for rows without a name or definition.
    fn process_views(&self, rows: Vec<Row>) -> Result<Vec<ViewInfo>> {
        rows.iter()
            .map(|row| {
                Ok(ViewInfo {
                    name: text(row, "name")?,
                    schema: opt_text(row, "schema"),
                    definition: text(row, "definition")?,
                })
            })
            .collect()
    }

    /// Normalizes column rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] for malformed rows.
    fn process_columns(&self, rows: Vec<Row>) -> Result<Vec<ColumnInfo>>;

    /// Normalizes index rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] for malformed rows.
    fn process_indexes(&self, rows: Vec<Row>) -> Result<Vec<IndexInfo>>;

    /// Normalizes foreign key rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] for malformed rows.
    fn process_foreign_keys(&self, rows: Vec<Row>) -> Result<Vec<ForeignKeyInfo>>;
}

/// Required text column.
pub(crate) fn text(row: &Row, column: &str) -> Result<String> {
    opt_text(row, column)
        .ok_or_else(|| Error::Processing(format!("row has no text column '{column}'")))
}

/// Optional text column; NULL and missing are `None`.
pub(crate) fn opt_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        SqlValue::Null => None,
        SqlValue::Text(s) => Some(s.clone()),
        SqlValue::Int(n) => Some(n.to_string()),
        SqlValue::Blob(bytes) => String::from_utf8(bytes.clone()).ok(),
        other => Some(other.to_json().to_string()),
    }
}

/// Boolean column; accepts booleans, integers and `YES`/`t`/`true` text.
pub(crate) fn flag(row: &Row, column: &str) -> bool {
    flag_value(row.get(column))
}

pub(crate) fn flag_value(value: Option<&SqlValue>) -> bool {
    match value {
        Some(SqlValue::Bool(b)) => *b,
        Some(SqlValue::Int(n)) => *n != 0,
        Some(SqlValue::Text(s)) => matches!(
            s.to_ascii_lowercase().as_str(),
            "yes" | "y" | "t" | "true" | "1"
        ),
        _ => false,
    }
}

/// Comma separated list column.
pub(crate) fn list(row: &Row, column: &str) -> Vec<String> {
    opt_text(row, column)
        .map(|s| {
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Lowercased text, `None` when missing.
pub(crate) fn lower(row: &Row, column: &str) -> Option<String> {
    opt_text(row, column).map(|s| s.to_ascii_lowercase())
}

/// Reads an integer key from the first column of the first row, or from
/// `column` when present.
pub(crate) fn id_from_rows(rows: &[Row], column: &str) -> Result<i64> {
    let row = rows
        .first()
        .ok_or_else(|| Error::Processing("insert returned no rows".to_string()))?;
    let value = row
        .get(column)
        .or_else(|| row.values().next())
        .ok_or_else(|| Error::Processing("insert returned an empty row".to_string()))?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .ok_or_else(|| Error::Processing(format!("insert id {value:?} is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, SqlValue)]) -> Row {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_flag_accepts_engine_spellings() {
        let r = row(&[
            ("a", SqlValue::Text("YES".into())),
            ("b", SqlValue::Int(0)),
            ("c", SqlValue::Bool(true)),
            ("d", SqlValue::Text("f".into())),
        ]);
        assert!(flag(&r, "a"));
        assert!(!flag(&r, "b"));
        assert!(flag(&r, "c"));
        assert!(!flag(&r, "d"));
        assert!(!flag(&r, "missing"));
    }

    #[test]
    fn test_list_splits_and_trims() {
        let r = row(&[("columns", SqlValue::Text("a, b,c".into()))]);
        assert_eq!(list(&r, "columns"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_id_from_rows_reads_numeric_text() {
        let rows = vec![row(&[("id", SqlValue::Text("42".into()))])];
        assert_eq!(id_from_rows(&rows, "id").unwrap(), 42);
        assert!(matches!(id_from_rows(&[], "id"), Err(Error::Processing(_))));
    }
}
