//! SQLite result processor.

use super::{flag, list, lower, opt_text, text, ColumnInfo, ForeignKeyInfo, Generation, IndexInfo, Processor};
use crate::connection::Row;
use crate::error::Result;
use crate::value::SqlValue;

/// SQLite processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProcessor;

impl SqliteProcessor {
    /// Creates a new SQLite processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for SqliteProcessor {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn process_columns(&self, rows: Vec<Row>) -> Result<Vec<ColumnInfo>> {
        rows.iter()
            .map(|row| {
                let full_type = text(row, "type")?.to_ascii_lowercase();
                let type_name = full_type
                    .split('(')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                // PRAGMA table_xinfo: hidden 2 is virtual, 3 is stored.
                let generation = match row.get("extra").and_then(SqlValue::as_i64) {
                    Some(2) => Some("virtual"),
                    Some(3) => Some("stored"),
                    _ => None,
                };
                Ok(ColumnInfo {
                    name: text(row, "name")?,
                    auto_increment: flag(row, "primary") && type_name == "integer",
                    type_name,
                    full_type,
                    collation: None,
                    nullable: flag(row, "nullable"),
                    default: opt_text(row, "default"),
                    comment: None,
                    generation: generation.map(|kind| Generation {
                        kind: kind.to_string(),
                        expression: None,
                    }),
                })
            })
            .collect()
    }

    fn process_indexes(&self, rows: Vec<Row>) -> Result<Vec<IndexInfo>> {
        rows.iter()
            .map(|row| {
                let primary = flag(row, "primary");
                Ok(IndexInfo {
                    name: if primary {
                        "primary".to_string()
                    } else {
                        text(row, "name")?.to_ascii_lowercase()
                    },
                    columns: list(row, "columns"),
                    kind: None,
                    unique: flag(row, "unique"),
                    primary,
                })
            })
            .collect()
    }

    fn process_foreign_keys(&self, rows: Vec<Row>) -> Result<Vec<ForeignKeyInfo>> {
        rows.iter()
            .map(|row| {
                Ok(ForeignKeyInfo {
                    name: None,
                    columns: list(row, "columns"),
                    foreign_schema: None,
                    foreign_table: text(row, "foreign_table")?,
                    foreign_columns: list(row, "foreign_columns"),
                    on_update: lower(row, "on_update").unwrap_or_else(|| "no action".to_string()),
                    on_delete: lower(row, "on_delete").unwrap_or_else(|| "no action".to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_primary_key_is_auto_increment() {
        let row: Row = [
            ("name", SqlValue::Text("id".into())),
            ("type", SqlValue::Text("INTEGER".into())),
            ("nullable", SqlValue::Int(0)),
            ("primary", SqlValue::Int(1)),
            ("extra", SqlValue::Int(0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let generated: Row = [
            ("name", SqlValue::Text("total".into())),
            ("type", SqlValue::Text("NUMERIC(10, 2)".into())),
            ("nullable", SqlValue::Int(1)),
            ("primary", SqlValue::Int(0)),
            ("extra", SqlValue::Int(3)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let columns = SqliteProcessor::new()
            .process_columns(vec![row, generated])
            .unwrap();
        assert!(columns[0].auto_increment);
        assert_eq!(columns[1].type_name, "numeric");
        assert_eq!(columns[1].full_type, "numeric(10, 2)");
        assert_eq!(
            columns[1].generation.as_ref().map(|g| g.kind.as_str()),
            Some("stored")
        );
    }
}
