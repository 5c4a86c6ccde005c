//! Row data for INSERT, UPDATE and upsert statements.

use crate::error::{Error, Result};
use crate::value::{Operand, SqlValue};

/// An ordered column to value map.
///
/// Setting a column twice replaces the earlier value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entries: Vec<(String, Operand)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        let column = column.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(c, _)| *c == column) {
            entry.1 = value;
        } else {
            self.entries.push((column, value));
        }
        self
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// `(column, value)` pairs in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, Operand)] {
        &self.entries
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Operand> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values bound by the record, in column order.
    #[must_use]
    pub fn bindings(&self) -> Vec<SqlValue> {
        let mut out = Vec::new();
        for (_, value) in &self.entries {
            value.push_binding(&mut out);
        }
        out
    }
}

impl<K: Into<String>, V: Into<Operand>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |record, (k, v)| record.set(k, v))
    }
}

/// One or more rows sharing a column list.
///
/// The first row fixes the columns; later rows must set exactly the same
/// columns and are reordered to match. An empty value set compiles to the
/// dialect's default-values insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Values {
    columns: Vec<String>,
    rows: Vec<Vec<Operand>>,
}

impl Values {
    /// Creates an empty value set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] if the row's columns differ from the
    /// first row's.
    pub fn row(mut self, record: Record) -> Result<Self> {
        if self.rows.is_empty() {
            self.columns = record.columns().map(String::from).collect();
            self.rows
                .push(record.entries.into_iter().map(|(_, v)| v).collect());
            return Ok(self);
        }
        if record.len() != self.columns.len() {
            return Err(mismatch(&self.columns, &record));
        }
        let mut row = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match record.get(column) {
                Some(value) => row.push(value.clone()),
                None => return Err(mismatch(&self.columns, &record)),
            }
        }
        self.rows.push(row);
        Ok(self)
    }

    /// Builds a value set from several rows.
    ///
    /// # Errors
    ///
    /// See [`Values::row`].
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Result<Self> {
        records
            .into_iter()
            .try_fold(Self::new(), |values, record| values.row(record))
    }

    /// Shared column list.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, each aligned with [`Values::columns`].
    #[must_use]
    pub fn rows(&self) -> &[Vec<Operand>] {
        &self.rows
    }

    /// Returns `true` when there are no columns to insert.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Values bound by every row, row by row.
    #[must_use]
    pub fn bindings(&self) -> Vec<SqlValue> {
        let mut out = Vec::new();
        for value in self.rows.iter().flatten() {
            value.push_binding(&mut out);
        }
        out
    }
}

impl TryFrom<Record> for Values {
    type Error = Error;

    fn try_from(record: Record) -> Result<Self> {
        Self::new().row(record)
    }
}

fn mismatch(columns: &[String], record: &Record) -> Error {
    let got: Vec<&str> = record.columns().collect();
    Error::construction(
        "insert values",
        format!(
            "row sets columns [{}] but the first row set [{}]",
            got.join(", "),
            columns.join(", ")
        ),
    )
}

/// What an upsert does to a column when the row already exists.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertColumn {
    /// Copy the value from the row being inserted.
    Excluded(String),
    /// Assign an explicit value.
    Set(String, Operand),
}

/// INSERT that updates the existing row on a unique-key conflict.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub(crate) values: Values,
    pub(crate) unique_by: Vec<String>,
    pub(crate) update: Option<Vec<UpsertColumn>>,
}

impl Upsert {
    /// Creates an upsert that updates every inserted column on conflict.
    #[must_use]
    pub fn new<C: Into<String>>(values: Values, unique_by: impl IntoIterator<Item = C>) -> Self {
        Self {
            values,
            unique_by: unique_by.into_iter().map(Into::into).collect(),
            update: None,
        }
    }

    /// Copies `column` from the inserted row on conflict.
    #[must_use]
    pub fn update(mut self, column: impl Into<String>) -> Self {
        self.update
            .get_or_insert_with(Vec::new)
            .push(UpsertColumn::Excluded(column.into()));
        self
    }

    /// Assigns `value` to `column` on conflict.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.update
            .get_or_insert_with(Vec::new)
            .push(UpsertColumn::Set(column.into(), value.into()));
        self
    }

    /// Leaves existing rows untouched, turning the upsert into a plain
    /// insert.
    #[must_use]
    pub fn update_nothing(mut self) -> Self {
        self.update = Some(Vec::new());
        self
    }

    /// Inserted rows.
    #[must_use]
    pub const fn values(&self) -> &Values {
        &self.values
    }

    /// Conflict target columns.
    #[must_use]
    pub fn unique_by(&self) -> &[String] {
        &self.unique_by
    }

    /// Columns touched on conflict; defaults to every inserted column.
    #[must_use]
    pub fn update_columns(&self) -> Vec<UpsertColumn> {
        self.update.clone().unwrap_or_else(|| {
            self.values
                .columns()
                .iter()
                .map(|c| UpsertColumn::Excluded(c.clone()))
                .collect()
        })
    }

    /// Insert bindings followed by explicit update values.
    #[must_use]
    pub fn bindings(&self) -> Vec<SqlValue> {
        let mut out = self.values.bindings();
        for column in self.update_columns() {
            if let UpsertColumn::Set(_, value) = column {
                value.push_binding(&mut out);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_rows_are_aligned_with_first() {
        let values = Values::new()
            .row(Record::new().set("a", 1).set("b", "x"))
            .unwrap()
            .row(Record::new().set("b", "y").set("a", 2))
            .unwrap();
        assert_eq!(values.columns(), ["a", "b"]);
        assert_eq!(
            values.bindings(),
            vec![
                SqlValue::Int(1),
                SqlValue::Text("x".into()),
                SqlValue::Int(2),
                SqlValue::Text("y".into()),
            ]
        );
    }

    #[test]
    fn test_mismatched_rows_are_rejected() {
        let err = Values::new()
            .row(Record::new().set("a", 1))
            .unwrap()
            .row(Record::new().set("c", 1))
            .unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
    }

    #[test]
    fn test_upsert_defaults_to_all_columns() {
        let values = Values::try_from(Record::new().set("email", "a@b.c").set("name", "A")).unwrap();
        let upsert = Upsert::new(values, ["email"]);
        assert_eq!(
            upsert.update_columns(),
            vec![
                UpsertColumn::Excluded("email".into()),
                UpsertColumn::Excluded("name".into()),
            ]
        );
    }
}
