//! Table commands.

use serde::{Deserialize, Serialize};

/// Index flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Primary key.
    Primary,
    /// Unique index.
    Unique,
    /// Plain index.
    Index,
    /// Full-text index.
    Fulltext,
    /// Spatial index.
    Spatial,
}

impl IndexKind {
    /// Suffix used in generated index names.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Unique => "unique",
            Self::Index => "index",
            Self::Fulltext => "fulltext",
            Self::Spatial => "spatialindex",
        }
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Restrict (same as NoAction but checked immediately).
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// An index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexCommand {
    /// Index name; generated from the table and columns when empty.
    pub name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
    /// Index method (`btree`, `hash`, `gin`, ...).
    pub algorithm: Option<String>,
    /// Text search configuration for Postgres full-text indexes.
    pub language: Option<String>,
}

impl IndexCommand {
    /// Creates an index over `columns`.
    #[must_use]
    pub fn new<C: Into<String>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the index method.
    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Sets the full-text language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// A foreign key constraint.
///
/// ```rust
/// use oxide_grammar::schema::{ForeignKeyAction, ForeignKeyDefinition};
///
/// let fk = ForeignKeyDefinition::new(["user_id"])
///     .references(["id"])
///     .on("users")
///     .on_delete(ForeignKeyAction::Cascade);
/// assert_eq!(fk.on, "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyDefinition {
    /// Constraint name; generated when empty.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub on: String,
    /// Referenced columns.
    pub references: Vec<String>,
    /// ON DELETE action.
    pub on_delete: Option<ForeignKeyAction>,
    /// ON UPDATE action.
    pub on_update: Option<ForeignKeyAction>,
    /// DEFERRABLE (Postgres).
    pub deferrable: Option<bool>,
    /// INITIALLY IMMEDIATE rather than DEFERRED (Postgres).
    pub initially_immediate: Option<bool>,
    /// NOT VALID (Postgres).
    pub not_valid: bool,
}

impl ForeignKeyDefinition {
    /// Creates a foreign key over `columns`.
    #[must_use]
    pub fn new<C: Into<String>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets an explicit constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the referenced columns.
    #[must_use]
    pub fn references<C: Into<String>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.references = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the referenced table.
    #[must_use]
    pub fn on(mut self, table: impl Into<String>) -> Self {
        self.on = table.into();
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Shorthand for `ON DELETE CASCADE`.
    #[must_use]
    pub const fn cascade_on_delete(self) -> Self {
        self.on_delete(ForeignKeyAction::Cascade)
    }

    /// Makes the constraint deferrable.
    #[must_use]
    pub const fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    /// Checks the constraint immediately (`true`) or at commit.
    #[must_use]
    pub const fn initially_immediate(mut self, immediate: bool) -> Self {
        self.initially_immediate = Some(immediate);
        self
    }

    /// Skips validation of existing rows.
    #[must_use]
    pub const fn not_valid(mut self) -> Self {
        self.not_valid = true;
        self
    }
}

/// A schema change to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// CREATE TABLE with every column.
    Create,
    /// Adds the new columns of an existing table.
    Add,
    /// Alters the columns marked as changed.
    Change,
    /// DROP TABLE.
    Drop,
    /// DROP TABLE IF EXISTS.
    DropIfExists,
    /// Renames the table.
    Rename { to: String },
    /// Drops columns.
    DropColumn { columns: Vec<String> },
    /// Renames a column.
    RenameColumn { from: String, to: String },
    /// Adds a primary key.
    Primary(IndexCommand),
    /// Adds a unique index.
    Unique(IndexCommand),
    /// Adds a plain index.
    Index(IndexCommand),
    /// Adds a full-text index.
    Fulltext(IndexCommand),
    /// Adds a spatial index.
    SpatialIndex(IndexCommand),
    /// Adds a foreign key.
    Foreign(ForeignKeyDefinition),
    /// Drops the primary key.
    DropPrimary {
        #[serde(default)]
        name: String,
    },
    /// Drops a unique index.
    DropUnique { name: String },
    /// Drops an index.
    DropIndex { name: String },
    /// Drops a full-text index.
    DropFulltext { name: String },
    /// Drops a spatial index.
    DropSpatialIndex { name: String },
    /// Drops a foreign key.
    DropForeign { name: String },
    /// Renames an index.
    RenameIndex { from: String, to: String },
    /// Sets the table comment.
    TableComment { comment: String },
    /// Sets a column comment with a separate statement.
    ColumnComment { column: String, comment: String },
    /// Restarts an auto-increment sequence.
    AutoIncrementStartingValue { column: String, value: u64 },
}

impl Command {
    /// The index carried by an index command and its kind.
    #[must_use]
    pub const fn index(&self) -> Option<(IndexKind, &IndexCommand)> {
        match self {
            Self::Primary(index) => Some((IndexKind::Primary, index)),
            Self::Unique(index) => Some((IndexKind::Unique, index)),
            Self::Index(index) => Some((IndexKind::Index, index)),
            Self::Fulltext(index) => Some((IndexKind::Fulltext, index)),
            Self::SpatialIndex(index) => Some((IndexKind::Spatial, index)),
            _ => None,
        }
    }

    /// Wraps `index` in the command for `kind`.
    #[must_use]
    pub fn from_index(kind: IndexKind, index: IndexCommand) -> Self {
        match kind {
            IndexKind::Primary => Self::Primary(index),
            IndexKind::Unique => Self::Unique(index),
            IndexKind::Index => Self::Index(index),
            IndexKind::Fulltext => Self::Fulltext(index),
            IndexKind::Spatial => Self::SpatialIndex(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_json() {
        let command: Command =
            serde_json::from_str(r#"{"command": "unique", "columns": ["email"]}"#).unwrap();
        let (kind, index) = command.index().unwrap();
        assert_eq!(kind, IndexKind::Unique);
        assert!(index.name.is_empty());
        assert_eq!(index.columns, vec!["email"]);

        let command: Command =
            serde_json::from_str(r#"{"command": "rename_column", "from": "a", "to": "b"}"#)
                .unwrap();
        assert_eq!(
            command,
            Command::RenameColumn {
                from: "a".into(),
                to: "b".into()
            }
        );
    }

    #[test]
    fn test_foreign_key_action_sql() {
        assert_eq!(ForeignKeyAction::SetNull.to_sql(), "SET NULL");
        assert_eq!(ForeignKeyAction::default().to_sql(), "NO ACTION");
    }
}
