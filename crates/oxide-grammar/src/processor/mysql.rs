//! MySQL and MariaDB result processor.

use super::{flag, list, lower, opt_text, text, ColumnInfo, ForeignKeyInfo, Generation, IndexInfo, Processor};
use crate::connection::Row;
use crate::error::Result;

/// MySQL processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlProcessor;

impl MySqlProcessor {
    /// Creates a new MySQL processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for MySqlProcessor {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn process_columns(&self, rows: Vec<Row>) -> Result<Vec<ColumnInfo>> {
        rows.iter()
            .map(|row| {
                let extra = lower(row, "extra").unwrap_or_default();
                let kind = if extra.contains("virtual generated") {
                    Some("virtual")
                } else if extra.contains("stored generated") {
                    Some("stored")
                } else {
                    None
                };
                // MariaDB reports a missing default as the text NULL.
                let default = opt_text(row, "default").filter(|d| d != "NULL");
                Ok(ColumnInfo {
                    name: text(row, "name")?,
                    type_name: text(row, "type_name")?.to_ascii_lowercase(),
                    full_type: text(row, "type")?,
                    collation: opt_text(row, "collation"),
                    nullable: flag(row, "nullable"),
                    default,
                    auto_increment: extra.contains("auto_increment"),
                    comment: opt_text(row, "comment").filter(|c| !c.is_empty()),
                    generation: kind.map(|kind| Generation {
                        kind: kind.to_string(),
                        expression: opt_text(row, "expression"),
                    }),
                })
            })
            .collect()
    }

    fn process_indexes(&self, rows: Vec<Row>) -> Result<Vec<IndexInfo>> {
        rows.iter()
            .map(|row| {
                let name = text(row, "name")?;
                let primary = name == "PRIMARY";
                Ok(IndexInfo {
                    name: if primary { "primary".to_string() } else { name.to_ascii_lowercase() },
                    columns: list(row, "columns"),
                    kind: lower(row, "type"),
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
                    name: opt_text(row, "name"),
                    columns: list(row, "columns"),
                    foreign_schema: opt_text(row, "foreign_schema"),
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
    use crate::value::SqlValue;

    fn row(entries: &[(&str, &str)]) -> Row {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), SqlValue::Text((*v).to_string())))
            .collect()
    }

    #[test]
    fn test_generated_and_auto_increment_from_extra() {
        let rows = vec![
            row(&[
                ("name", "id"),
                ("type_name", "bigint"),
                ("type", "bigint unsigned"),
                ("nullable", "NO"),
                ("extra", "auto_increment"),
            ]),
            row(&[
                ("name", "full_name"),
                ("type_name", "varchar"),
                ("type", "varchar(255)"),
                ("nullable", "YES"),
                ("extra", "VIRTUAL GENERATED"),
                ("expression", "concat(first, ' ', last)"),
                ("default", "NULL"),
            ]),
        ];
        let columns = MySqlProcessor::new().process_columns(rows).unwrap();
        assert!(columns[0].auto_increment);
        assert!(!columns[0].nullable);
        assert_eq!(columns[1].default, None);
        assert_eq!(
            columns[1].generation.as_ref().map(|g| g.kind.as_str()),
            Some("virtual")
        );
    }

    #[test]
    fn test_primary_index_is_named_primary() {
        let rows = vec![row(&[("name", "PRIMARY"), ("columns", "id"), ("type", "BTREE"), ("unique", "1")])];
        let indexes = MySqlProcessor::new().process_indexes(rows).unwrap();
        assert_eq!(indexes[0].name, "primary");
        assert!(indexes[0].primary);
        assert!(indexes[0].unique);
        assert_eq!(indexes[0].kind.as_deref(), Some("btree"));
    }
}
