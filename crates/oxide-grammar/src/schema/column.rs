//! Column definitions.

use serde::{Deserialize, Serialize};

use super::command::{ForeignKeyAction, ForeignKeyDefinition, IndexKind};

/// Logical column types. Each schema grammar maps them to its own SQL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    /// Fixed-length character string.
    Char { length: Option<u32> },
    /// Variable-length character string.
    String { length: Option<u32> },
    /// Short text.
    TinyText,
    /// Unbounded text.
    #[default]
    Text,
    /// Medium text.
    MediumText,
    /// Long text.
    LongText,
    /// 8-bit integer.
    TinyInteger,
    /// 16-bit integer.
    SmallInteger,
    /// 24-bit integer (MySQL), widened elsewhere.
    MediumInteger,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInteger,
    /// Floating point with optional precision.
    Float { precision: Option<u32> },
    /// Double precision.
    Double,
    /// Exact numeric.
    Decimal { total: u32, places: u32 },
    /// Boolean.
    Boolean,
    /// One of a fixed set of strings.
    Enum { allowed: Vec<String> },
    /// Any subset of a fixed set of strings (MySQL).
    Set { allowed: Vec<String> },
    /// JSON document.
    Json,
    /// Binary JSON (Postgres); plain JSON elsewhere.
    Jsonb,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime { precision: Option<u32> },
    /// Date and time with time zone.
    DateTimeTz { precision: Option<u32> },
    /// Time of day.
    Time { precision: Option<u32> },
    /// Time of day with time zone.
    TimeTz { precision: Option<u32> },
    /// Timestamp.
    Timestamp { precision: Option<u32> },
    /// Timestamp with time zone.
    TimestampTz { precision: Option<u32> },
    /// Year.
    Year,
    /// Binary data.
    Binary {
        length: Option<u32>,
        #[serde(default)]
        fixed: bool,
    },
    /// UUID.
    Uuid,
    /// IPv4 or IPv6 address.
    IpAddress,
    /// MAC address.
    MacAddress,
    /// Spatial geometry.
    Geometry {
        subtype: Option<String>,
        srid: Option<u32>,
    },
    /// Spatial geography.
    Geography {
        subtype: Option<String>,
        srid: Option<u32>,
    },
    /// Fixed-dimension vector.
    Vector { dimensions: u32 },
    /// Computed column without a storage type (SQL Server).
    Computed { expression: String },
}

impl ColumnType {
    /// Integer types that may auto-increment.
    #[must_use]
    pub const fn is_serial(&self) -> bool {
        matches!(
            self,
            Self::TinyInteger
                | Self::SmallInteger
                | Self::MediumInteger
                | Self::Integer
                | Self::BigInteger
        )
    }

    /// Precision of date/time types, `None` for every other type.
    #[must_use]
    pub const fn temporal_precision(&self) -> Option<Option<u32>> {
        match self {
            Self::DateTime { precision }
            | Self::DateTimeTz { precision }
            | Self::Time { precision }
            | Self::TimeTz { precision }
            | Self::Timestamp { precision }
            | Self::TimestampTz { precision } => Some(*precision),
            _ => None,
        }
    }
}

/// A column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<crate::Expression> for DefaultValue {
    fn from(value: crate::Expression) -> Self {
        Self::Expression(value.as_str().to_string())
    }
}

/// An index declared on the column itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluentIndex {
    /// Index type.
    pub kind: IndexKind,
    /// Explicit name; generated when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// A column and its modifiers.
///
/// Modifiers take `&mut self` so they chain off the reference returned by
/// the [`Blueprint`](super::Blueprint) column methods:
///
/// ```rust
/// use oxide_grammar::schema::Blueprint;
///
/// let mut table = Blueprint::create("users");
/// table.string("email", None).unique().comment("login");
/// table.integer("votes").unsigned().default(0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(flatten)]
    pub column_type: ColumnType,
    /// `Some(true)` allows NULL. Unset means NOT NULL, except for
    /// generated columns which then carry no nullability clause.
    pub nullable: Option<bool>,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// UNSIGNED (MySQL).
    pub unsigned: bool,
    /// Auto-incrementing integer key.
    pub auto_increment: bool,
    /// Character set (MySQL).
    pub charset: Option<String>,
    /// Collation.
    pub collation: Option<String>,
    /// Column comment.
    pub comment: Option<String>,
    /// Virtual generated column expression.
    pub virtual_as: Option<String>,
    /// Stored generated column expression.
    pub stored_as: Option<String>,
    /// Identity column (Postgres); the value holds sequence options.
    pub generated_as: Option<String>,
    /// `GENERATED ALWAYS` rather than `BY DEFAULT` for identity columns.
    pub always: bool,
    /// PERSISTED computed column (SQL Server).
    pub persisted: bool,
    /// Default to the current timestamp.
    pub use_current: bool,
    /// Refresh to the current timestamp on update (MySQL).
    pub use_current_on_update: bool,
    /// ON UPDATE expression (MySQL).
    pub on_update: Option<String>,
    /// INVISIBLE (MySQL).
    pub invisible: bool,
    /// Place after this column (MySQL).
    pub after: Option<String>,
    /// Place first (MySQL).
    pub first: bool,
    /// Alter an existing column instead of adding one.
    pub change: bool,
    /// First auto-increment value.
    pub starting_value: Option<u64>,
    /// Indexes declared on the column.
    pub indexes: Vec<FluentIndex>,
    /// Foreign key declared on the column.
    pub foreign: Option<ForeignKeyDefinition>,
}

impl ColumnDefinition {
    /// Creates a NOT NULL column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            ..<Self as Default>::default()
        }
    }

    /// Whether NULL is allowed.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }

    /// Whether the column is computed by the database.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.virtual_as.is_some() || self.stored_as.is_some() || self.generated_as.is_some()
    }

    /// Allows NULL.
    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    /// Requires a value.
    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = Some(false);
        self
    }

    /// Sets the default value.
    pub fn default(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the column UNSIGNED.
    pub fn unsigned(&mut self) -> &mut Self {
        self.unsigned = true;
        self
    }

    /// Makes the column an auto-incrementing key.
    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Sets the character set.
    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the collation.
    pub fn collation(&mut self, collation: impl Into<String>) -> &mut Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the comment.
    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    /// Computes the column on read.
    pub fn virtual_as(&mut self, expression: impl Into<String>) -> &mut Self {
        self.virtual_as = Some(expression.into());
        self
    }

    /// Computes the column on write.
    pub fn stored_as(&mut self, expression: impl Into<String>) -> &mut Self {
        self.stored_as = Some(expression.into());
        self
    }

    /// Makes the column an identity column with optional sequence options.
    pub fn generated_as(&mut self, options: Option<&str>) -> &mut Self {
        self.generated_as = Some(options.unwrap_or_default().to_string());
        self
    }

    /// Uses `GENERATED ALWAYS` for identity columns.
    pub fn always(&mut self) -> &mut Self {
        self.always = true;
        self
    }

    /// Persists a computed column.
    pub fn persisted(&mut self) -> &mut Self {
        self.persisted = true;
        self
    }

    /// Defaults a timestamp to the current time.
    pub fn use_current(&mut self) -> &mut Self {
        self.use_current = true;
        self
    }

    /// Refreshes a timestamp to the current time on update.
    pub fn use_current_on_update(&mut self) -> &mut Self {
        self.use_current_on_update = true;
        self
    }

    /// Sets an ON UPDATE expression.
    pub fn on_update(&mut self, expression: impl Into<String>) -> &mut Self {
        self.on_update = Some(expression.into());
        self
    }

    /// Hides the column from `SELECT *`.
    pub fn invisible(&mut self) -> &mut Self {
        self.invisible = true;
        self
    }

    /// Places the column after `column`.
    pub fn after(&mut self, column: impl Into<String>) -> &mut Self {
        self.after = Some(column.into());
        self
    }

    /// Places the column first.
    pub fn first(&mut self) -> &mut Self {
        self.first = true;
        self
    }

    /// Alters the existing column.
    pub fn change(&mut self) -> &mut Self {
        self.change = true;
        self
    }

    /// Sets the first auto-increment value.
    pub fn starting_value(&mut self, value: u64) -> &mut Self {
        self.starting_value = Some(value);
        self
    }

    /// Adds a primary key on the column.
    pub fn primary(&mut self) -> &mut Self {
        self.index_as(IndexKind::Primary, None)
    }

    /// Adds a unique index on the column.
    pub fn unique(&mut self) -> &mut Self {
        self.index_as(IndexKind::Unique, None)
    }

    /// Adds a plain index on the column.
    pub fn index(&mut self) -> &mut Self {
        self.index_as(IndexKind::Index, None)
    }

    /// Adds a full-text index on the column.
    pub fn fulltext(&mut self) -> &mut Self {
        self.index_as(IndexKind::Fulltext, None)
    }

    /// Adds a spatial index on the column.
    pub fn spatial_index(&mut self) -> &mut Self {
        self.index_as(IndexKind::Spatial, None)
    }

    /// Adds an index of `kind`, optionally named.
    pub fn index_as(&mut self, kind: IndexKind, name: Option<&str>) -> &mut Self {
        self.indexes.push(FluentIndex {
            kind,
            name: name.map(str::to_string),
        });
        self
    }

    /// References `column` on `table`.
    pub fn constrained(&mut self, table: impl Into<String>, column: impl Into<String>) -> &mut Self {
        self.foreign = Some(
            ForeignKeyDefinition::new([self.name.clone()])
                .references([column.into()])
                .on(table),
        );
        self
    }

    /// Cascades deletes through the column's foreign key.
    pub fn cascade_on_delete(&mut self) -> &mut Self {
        self.set_foreign_action(|foreign| foreign.on_delete = Some(ForeignKeyAction::Cascade))
    }

    /// Sets the column to NULL when the referenced row is deleted.
    pub fn null_on_delete(&mut self) -> &mut Self {
        self.set_foreign_action(|foreign| foreign.on_delete = Some(ForeignKeyAction::SetNull))
    }

    /// Cascades updates through the column's foreign key.
    pub fn cascade_on_update(&mut self) -> &mut Self {
        self.set_foreign_action(|foreign| foreign.on_update = Some(ForeignKeyAction::Cascade))
    }

    fn set_foreign_action(&mut self, apply: impl FnOnce(&mut ForeignKeyDefinition)) -> &mut Self {
        if let Some(foreign) = self.foreign.as_mut() {
            apply(foreign);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_from_json() {
        let column: ColumnDefinition = serde_json::from_str(
            r#"{"name": "email", "kind": "string", "length": 100, "nullable": true}"#,
        )
        .unwrap();
        assert_eq!(column.column_type, ColumnType::String { length: Some(100) });
        assert!(column.is_nullable());
        assert!(!column.auto_increment);
    }

    #[test]
    fn test_default_value_from_json() {
        let column: ColumnDefinition = serde_json::from_str(
            r#"{"name": "status", "kind": "text", "default": {"string": "draft"}}"#,
        )
        .unwrap();
        assert_eq!(column.default, Some(DefaultValue::String("draft".into())));
    }

    #[test]
    fn test_new_column_starts_without_modifiers() {
        let column = ColumnDefinition::new("title", ColumnType::Text);
        assert_eq!(column.name, "title");
        assert_eq!(column.column_type, ColumnType::Text);
        assert_eq!(column.nullable, None);
        assert_eq!(column.default, None);
        assert!(!column.unsigned);
        assert!(column.foreign.is_none());
    }

    #[test]
    fn test_constrained_column_cascades() {
        let mut column = ColumnDefinition::new("user_id", ColumnType::BigInteger);
        column.constrained("users", "id").cascade_on_delete();
        let foreign = column.foreign.unwrap();
        assert_eq!(foreign.columns, vec!["user_id"]);
        assert_eq!(foreign.on, "users");
        assert_eq!(foreign.on_delete, Some(ForeignKeyAction::Cascade));
    }

    #[test]
    fn test_temporal_precision() {
        assert_eq!(
            ColumnType::Timestamp { precision: Some(3) }.temporal_precision(),
            Some(Some(3))
        );
        assert_eq!(ColumnType::Date.temporal_precision(), None);
        assert!(ColumnType::BigInteger.is_serial());
        assert!(!ColumnType::Decimal { total: 8, places: 2 }.is_serial());
    }
}
