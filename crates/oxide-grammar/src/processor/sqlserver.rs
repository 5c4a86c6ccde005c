//! SQL Server result processor.

use super::{
    flag, id_from_rows, list, lower, opt_text, text, ColumnInfo, ForeignKeyInfo, Generation,
    IndexInfo, Processor,
};
use crate::connection::{Connection, Row};
use crate::error::Result;
use crate::query::CompiledQuery;
use crate::value::SqlValue;

/// SQL Server processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerProcessor;

impl SqlServerProcessor {
    /// Creates a new SQL Server processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Rebuilds the declared type from `sys.columns` sizes. Character lengths
/// are reported in bytes and `-1` means `max`.
fn full_type(type_name: &str, row: &Row) -> String {
    let number = |column: &str| row.get(column).and_then(SqlValue::as_i64);
    match type_name {
        "binary" | "varbinary" | "char" | "varchar" | "nchar" | "nvarchar" => {
            match number("length") {
                Some(-1) => format!("{type_name}(max)"),
                Some(length) if type_name.starts_with('n') => format!("{type_name}({})", length / 2),
                Some(length) => format!("{type_name}({length})"),
                None => type_name.to_string(),
            }
        }
        "decimal" | "numeric" => format!(
            "{type_name}({}, {})",
            number("precision").unwrap_or(18),
            number("places").unwrap_or(0)
        ),
        "float" | "datetime2" | "datetimeoffset" | "time" => match number("precision") {
            Some(precision) => format!("{type_name}({precision})"),
            None => type_name.to_string(),
        },
        _ => type_name.to_string(),
    }
}

/// `NO_ACTION` → `no action`
fn action(value: Option<String>) -> String {
    value.map_or_else(|| "no action".to_string(), |v| v.replace('_', " "))
}

impl Processor for SqlServerProcessor {
    fn name(&self) -> &'static str {
        "sqlsrv"
    }

    /// The grammar selects `SCOPE_IDENTITY()` after the insert.
    fn process_insert_get_id(
        &self,
        connection: &dyn Connection,
        query: &CompiledQuery,
        sequence: Option<&str>,
    ) -> Result<i64> {
        let rows = connection.select(query)?;
        id_from_rows(&rows, sequence.unwrap_or("id"))
    }

    fn process_columns(&self, rows: Vec<Row>) -> Result<Vec<ColumnInfo>> {
        rows.iter()
            .map(|row| {
                let type_name = text(row, "type_name")?.to_ascii_lowercase();
                let expression = opt_text(row, "expression");
                Ok(ColumnInfo {
                    name: text(row, "name")?,
                    full_type: full_type(&type_name, row),
                    type_name,
                    collation: opt_text(row, "collation"),
                    nullable: flag(row, "nullable"),
                    default: opt_text(row, "default"),
                    auto_increment: flag(row, "autoincrement"),
                    comment: opt_text(row, "comment"),
                    generation: expression.map(|expression| Generation {
                        kind: if flag(row, "persisted") { "stored" } else { "virtual" }.to_string(),
                        expression: Some(expression),
                    }),
                })
            })
            .collect()
    }

    fn process_indexes(&self, rows: Vec<Row>) -> Result<Vec<IndexInfo>> {
        rows.iter()
            .map(|row| {
                Ok(IndexInfo {
                    name: text(row, "name")?.to_ascii_lowercase(),
                    columns: list(row, "columns"),
                    kind: lower(row, "type"),
                    unique: flag(row, "unique"),
                    primary: flag(row, "primary"),
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
                    on_update: action(lower(row, "on_update")),
                    on_delete: action(lower(row, "on_delete")),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_type_from_sizes() {
        let row: Row = [("length", SqlValue::Int(-1))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(full_type("nvarchar", &row), "nvarchar(max)");

        let row: Row = [("length", SqlValue::Int(510))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(full_type("nvarchar", &row), "nvarchar(255)");

        let row: Row = [("precision", SqlValue::Int(10)), ("places", SqlValue::Int(2))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(full_type("decimal", &row), "decimal(10, 2)");
    }

    #[test]
    fn test_referential_action_spelling() {
        assert_eq!(action(Some("set_null".into())), "set null");
        assert_eq!(action(None), "no action");
    }
}
