//! PostgreSQL result processor.

use super::{
    flag, id_from_rows, list, lower, opt_text, text, ColumnInfo, ForeignKeyInfo, Generation,
    IndexInfo, Processor,
};
use crate::connection::{Connection, Row};
use crate::error::Result;
use crate::query::CompiledQuery;

/// PostgreSQL processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresProcessor;

impl PostgresProcessor {
    /// Creates a new PostgreSQL processor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Maps `pg_constraint.confupdtype` / `confdeltype` codes.
fn action(code: Option<String>) -> String {
    match code.as_deref() {
        Some("r") => "restrict",
        Some("c") => "cascade",
        Some("n") => "set null",
        Some("d") => "set default",
        _ => "no action",
    }
    .to_string()
}

impl Processor for PostgresProcessor {
    fn name(&self) -> &'static str {
        "postgres"
    }

    /// The grammar appends `RETURNING`, so the key comes back as a row.
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
                let default = opt_text(row, "default");
                let generated = lower(row, "generated").filter(|g| !g.is_empty());
                let stored = generated.as_deref() == Some("s");
                Ok(ColumnInfo {
                    name: text(row, "name")?,
                    type_name: text(row, "type_name")?.to_ascii_lowercase(),
                    full_type: text(row, "type")?,
                    collation: opt_text(row, "collation"),
                    nullable: flag(row, "nullable"),
                    auto_increment: flag(row, "identity")
                        || default
                            .as_deref()
                            .is_some_and(|d| d.starts_with("nextval(")),
                    generation: stored.then(|| Generation {
                        kind: "stored".to_string(),
                        expression: default.clone(),
                    }),
                    default: if stored { None } else { default },
                    comment: opt_text(row, "comment"),
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
    use crate::value::SqlValue;

    #[test]
    fn test_serial_columns_are_auto_increment() {
        let row: Row = [
            ("name", SqlValue::Text("id".into())),
            ("type_name", SqlValue::Text("INT8".into())),
            ("type", SqlValue::Text("bigint".into())),
            ("nullable", SqlValue::Bool(false)),
            (
                "default",
                SqlValue::Text("nextval('users_id_seq'::regclass)".into()),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let columns = PostgresProcessor::new().process_columns(vec![row]).unwrap();
        assert_eq!(columns[0].type_name, "int8");
        assert!(columns[0].auto_increment);
        assert!(!columns[0].nullable);
        assert!(columns[0].generation.is_none());
    }

    #[test]
    fn test_foreign_key_action_codes() {
        assert_eq!(action(Some("c".into())), "cascade");
        assert_eq!(action(Some("n".into())), "set null");
        assert_eq!(action(None), "no action");
    }
}
