//! PostgreSQL table definitions.

use crate::config::ServerVersion;
use crate::error::{Error, Result};
use crate::grammar::{Grammar, PostgresGrammar};
use crate::schema::blueprint::Blueprint;
use crate::schema::column::{ColumnDefinition, ColumnType};
use crate::schema::command::{Command, ForeignKeyDefinition, IndexCommand};

use super::{apply_modifiers, check_in, FluentCommand, Modifier, SchemaGrammar};

/// PostgreSQL schema grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSchemaGrammar {
    grammar: PostgresGrammar,
    schema: Option<String>,
}

impl Default for PostgresSchemaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresSchemaGrammar {
    const MODIFIERS: &'static [Modifier<Self>] = &[
        Self::modify_collate,
        Self::modify_nullable,
        Self::modify_default,
        Self::modify_virtual_as,
        Self::modify_stored_as,
        Self::modify_generated_as,
        Self::modify_increment,
    ];

    /// Creates a new PostgreSQL schema grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            grammar: PostgresGrammar::new(),
            schema: None,
        }
    }

    /// Prefixes every table name.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.grammar = self.grammar.with_table_prefix(prefix);
        self
    }

    /// Sets the server version.
    #[must_use]
    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.grammar = self.grammar.with_version(version);
        self
    }

    /// Sets the schema used by introspection queries.
    #[must_use]
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Schema literal and prefixed table literal; a `schema.table` name
    /// overrides `schema`.
    fn catalog_target(&self, schema: Option<&str>, table: &str) -> Result<(String, String)> {
        let (schema, table) = match table.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (schema, table),
        };
        Ok((self.schema_sql(schema)?, self.quote(&self.prefixed(table))?))
    }

    fn schema_sql(&self, schema: Option<&str>) -> Result<String> {
        schema
            .or(self.schema.as_deref())
            .map_or_else(|| Ok("CURRENT_SCHEMA()".to_string()), |name| self.quote(name))
    }

    fn identity(column: &ColumnDefinition) -> Option<String> {
        let options = column.generated_as.as_ref()?;
        let mut sql = format!(
            "GENERATED {} AS IDENTITY",
            if column.always { "ALWAYS" } else { "BY DEFAULT" }
        );
        if !options.is_empty() {
            sql.push_str(&format!(" ({options})"));
        }
        Some(sql)
    }

    fn has_primary_command(blueprint: &Blueprint) -> bool {
        blueprint
            .commands()
            .iter()
            .any(|command| matches!(command, Command::Primary(_)))
    }

    fn create_index(&self, blueprint: &Blueprint, unique: bool, index: &IndexCommand, using: Option<&str>) -> String {
        let using = using
            .map(str::to_string)
            .or_else(|| index.algorithm.as_ref().map(|algorithm| algorithm.to_uppercase()))
            .map(|algorithm| format!(" USING {algorithm}"))
            .unwrap_or_default();
        format!(
            "CREATE {}INDEX {} ON {}{using} ({})",
            if unique { "UNIQUE " } else { "" },
            self.wrap(&index.name),
            self.wrap_table(blueprint),
            self.columnize(&index.columns)
        )
    }

    /// Clauses for one `ALTER COLUMN` of a changed column.
    fn change_clauses(&self, column: &ColumnDefinition) -> Result<Vec<String>> {
        if column.virtual_as.is_some() || column.stored_as.is_some() {
            return Err(Error::unsupported(self.name(), "changing generated columns"));
        }
        let mut type_sql = format!("TYPE {}", self.type_sql(column)?);
        if let Some(collation) = &column.collation {
            type_sql.push_str(&format!(" COLLATE {}", self.wrap(collation)));
        }
        let mut clauses = vec![type_sql];
        clauses.push(
            if column.is_nullable() { "DROP NOT NULL" } else { "SET NOT NULL" }.to_string(),
        );
        clauses.push(match self.effective_default(column) {
            Some(value) => format!("SET DEFAULT {}", self.default_value(&value)?),
            None => "DROP DEFAULT".to_string(),
        });
        match Self::identity(column) {
            Some(identity) => {
                clauses.push("DROP IDENTITY IF EXISTS".to_string());
                clauses.push(format!("ADD {identity}"));
            }
            None if !column.auto_increment => clauses.push("DROP IDENTITY IF EXISTS".to_string()),
            None => {}
        }
        Ok(clauses)
    }

    // Modifiers

    fn modify_collate(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .collation
            .as_deref()
            .map(|collation| format!(" COLLATE {}", self.wrap(collation))))
    }

    fn modify_nullable(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.is_generated() && column.nullable.is_none() {
            return Ok(None);
        }
        let clause = if column.is_nullable() { " NULL" } else { " NOT NULL" };
        Ok(Some(clause.to_string()))
    }

    fn modify_default(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        match self.effective_default(column) {
            Some(value) => Ok(Some(format!(" DEFAULT {}", self.default_value(&value)?))),
            None => Ok(None),
        }
    }

    fn modify_virtual_as(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        if column.virtual_as.is_some() {
            return Err(Error::unsupported(self.name(), "virtual generated columns"));
        }
        Ok(None)
    }

    fn modify_stored_as(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(column
            .stored_as
            .as_ref()
            .map(|expression| format!(" GENERATED ALWAYS AS ({expression}) STORED")))
    }

    fn modify_generated_as(&self, _: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        Ok(Self::identity(column).map(|identity| format!(" {identity}")))
    }

    fn modify_increment(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<Option<String>> {
        let incrementing = column.auto_increment
            && (column.column_type.is_serial() || column.generated_as.is_some());
        if incrementing && !column.change && !Self::has_primary_command(blueprint) {
            return Ok(Some(" PRIMARY KEY".to_string()));
        }
        Ok(None)
    }
}

impl SchemaGrammar for PostgresSchemaGrammar {
    fn query_grammar(&self) -> &dyn Grammar {
        &self.grammar
    }

    fn default_schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    fn fluent_commands(&self) -> &'static [FluentCommand] {
        &[FluentCommand::ColumnComment, FluentCommand::AutoIncrementStartingValue]
    }

    fn type_sql(&self, column: &ColumnDefinition) -> Result<String> {
        let serial = column.auto_increment && column.generated_as.is_none() && !column.change;
        let integer = |serial_type: &str, plain: &str| {
            let name = if serial { serial_type } else { plain };
            name.to_string()
        };
        let time = |name: &str, precision: Option<u32>, zone: bool| {
            let precision = precision.map(|p| format!("({p})")).unwrap_or_default();
            let zone = if zone { "WITH" } else { "WITHOUT" };
            format!("{name}{precision} {zone} TIME ZONE")
        };
        Ok(match &column.column_type {
            ColumnType::Char { length } => format!("CHAR({})", length.unwrap_or(255)),
            ColumnType::String { length } => {
                length.map_or_else(|| "VARCHAR".to_string(), |length| format!("VARCHAR({length})"))
            }
            ColumnType::TinyText => "VARCHAR(255)".to_string(),
            ColumnType::Text | ColumnType::MediumText | ColumnType::LongText => "TEXT".to_string(),
            ColumnType::TinyInteger | ColumnType::SmallInteger => integer("SMALLSERIAL", "SMALLINT"),
            ColumnType::MediumInteger | ColumnType::Integer => integer("SERIAL", "INTEGER"),
            ColumnType::BigInteger => integer("BIGSERIAL", "BIGINT"),
            ColumnType::Float { precision } => {
                precision.map_or_else(|| "FLOAT".to_string(), |p| format!("FLOAT({p})"))
            }
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Decimal { total, places } => format!("DECIMAL({total}, {places})"),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Enum { allowed } => format!("VARCHAR(255) {}", check_in(self, column, allowed)?),
            ColumnType::Set { .. } => return Err(Error::unsupported(self.name(), "set columns")),
            ColumnType::Json => "JSON".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime { precision } | ColumnType::Timestamp { precision } => {
                time("TIMESTAMP", *precision, false)
            }
            ColumnType::DateTimeTz { precision } | ColumnType::TimestampTz { precision } => {
                time("TIMESTAMP", *precision, true)
            }
            ColumnType::Time { precision } => time("TIME", *precision, false),
            ColumnType::TimeTz { precision } => time("TIME", *precision, true),
            ColumnType::Year => "INTEGER".to_string(),
            ColumnType::Binary { .. } => "BYTEA".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::IpAddress => "INET".to_string(),
            ColumnType::MacAddress => "MACADDR".to_string(),
            ColumnType::Geometry { subtype, srid } => match subtype {
                Some(subtype) => match srid {
                    Some(srid) => format!("GEOMETRY({}, {srid})", subtype.to_uppercase()),
                    None => format!("GEOMETRY({})", subtype.to_uppercase()),
                },
                None => "GEOMETRY".to_string(),
            },
            ColumnType::Geography { subtype, srid } => match subtype {
                Some(subtype) => format!("GEOGRAPHY({}, {})", subtype.to_uppercase(), srid.unwrap_or(4326)),
                None => "GEOGRAPHY".to_string(),
            },
            ColumnType::Vector { dimensions } => format!("VECTOR({dimensions})"),
            ColumnType::Computed { .. } => {
                return Err(Error::unsupported(self.name(), "computed columns without a type"))
            }
        })
    }

    fn modifiers_sql(&self, blueprint: &Blueprint, column: &ColumnDefinition) -> Result<String> {
        apply_modifiers(self, Self::MODIFIERS, blueprint, column)
    }

    fn compile_create(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.columns().iter().collect();
        Ok(vec![format!(
            "CREATE {}TABLE {} ({})",
            if blueprint.temporary { "TEMPORARY " } else { "" },
            self.wrap_table(blueprint),
            self.get_columns(blueprint, &columns)?.join(", ")
        )])
    }

    fn compile_add(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let columns: Vec<&ColumnDefinition> = blueprint.added_columns().collect();
        let definitions: Vec<String> = self
            .get_columns(blueprint, &columns)?
            .into_iter()
            .map(|definition| format!("ADD COLUMN {definition}"))
            .collect();
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.wrap_table(blueprint),
            definitions.join(", ")
        )])
    }

    fn compile_change(&self, blueprint: &Blueprint) -> Result<Vec<String>> {
        let mut alterations = Vec::new();
        for column in blueprint.changed_columns() {
            let name = self.wrap(&column.name);
            for clause in self.change_clauses(column)? {
                alterations.push(format!("ALTER COLUMN {name} {clause}"));
            }
        }
        Ok(vec![format!(
            "ALTER TABLE {} {}",
            self.wrap_table(blueprint),
            alterations.join(", ")
        )])
    }

    fn compile_unique(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        if index.algorithm.is_some() {
            return Ok(vec![self.create_index(blueprint, true, index, None)]);
        }
        Ok(vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.wrap_table(blueprint),
            self.wrap(&index.name),
            self.columnize(&index.columns)
        )])
    }

    fn compile_index(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![self.create_index(blueprint, false, index, None)])
    }

    fn compile_fulltext(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        let language = self.quote(index.language.as_deref().unwrap_or("english"))?;
        let vectors: Vec<String> = index
            .columns
            .iter()
            .map(|column| format!("TO_TSVECTOR({language}, {})", self.wrap(column)))
            .collect();
        Ok(vec![format!(
            "CREATE INDEX {} ON {} USING GIN (({}))",
            self.wrap(&index.name),
            self.wrap_table(blueprint),
            vectors.join(" || ")
        )])
    }

    fn compile_spatial_index(&self, blueprint: &Blueprint, index: &IndexCommand) -> Result<Vec<String>> {
        Ok(vec![self.create_index(blueprint, false, index, Some("GIST"))])
    }

    fn compile_foreign(&self, blueprint: &Blueprint, foreign: &ForeignKeyDefinition) -> Result<Vec<String>> {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.wrap_table(blueprint),
            self.wrap(&foreign.name),
            self.foreign_key_clause(foreign)
        );
        if let Some(deferrable) = foreign.deferrable {
            sql.push_str(if deferrable { " DEFERRABLE" } else { " NOT DEFERRABLE" });
        }
        if let (Some(true), Some(immediate)) = (foreign.deferrable, foreign.initially_immediate) {
            sql.push_str(if immediate { " INITIALLY IMMEDIATE" } else { " INITIALLY DEFERRED" });
        }
        if foreign.not_valid {
            sql.push_str(" NOT VALID");
        }
        Ok(vec![sql])
    }

    fn compile_drop_primary(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        if !name.is_empty() {
            return self.compile_drop_constraint(blueprint, name);
        }
        let table = blueprint.table().rsplit('.').next().unwrap_or_default();
        let name = format!("{}_pkey", self.prefixed(table));
        self.compile_drop_constraint(blueprint, &name)
    }

    fn compile_drop_unique(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_constraint(blueprint, name)
    }

    fn compile_drop_fulltext(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_index(blueprint, name)
    }

    fn compile_drop_spatial_index(&self, blueprint: &Blueprint, name: &str) -> Result<Vec<String>> {
        self.compile_drop_index(blueprint, name)
    }

    fn compile_rename_index(&self, _blueprint: &Blueprint, from: &str, to: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER INDEX {} RENAME TO {}",
            self.wrap(from),
            self.wrap(to)
        )])
    }

    fn compile_table_comment(&self, blueprint: &Blueprint, comment: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "COMMENT ON TABLE {} IS {}",
            self.wrap_table(blueprint),
            self.quote(comment)?
        )])
    }

    fn compile_column_comment(&self, blueprint: &Blueprint, column: &str, comment: &str) -> Result<Vec<String>> {
        Ok(vec![format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.wrap_table(blueprint),
            self.wrap(column),
            self.quote(comment)?
        )])
    }

    fn compile_auto_increment_starting_value(
        &self,
        blueprint: &Blueprint,
        column: &str,
        value: u64,
    ) -> Result<Vec<String>> {
        let sequence = format!("{}_{column}_seq", blueprint.table());
        Ok(vec![format!(
            "ALTER SEQUENCE {} RESTART WITH {value}",
            self.grammar.wrap_table(&sequence)
        )])
    }

    fn compile_create_database(&self, name: &str) -> Result<String> {
        Ok(format!("CREATE DATABASE {}", self.wrap(name)))
    }

    fn compile_drop_database_if_exists(&self, name: &str) -> Result<String> {
        Ok(format!("DROP DATABASE IF EXISTS {}", self.wrap(name)))
    }

    fn compile_enable_foreign_key_constraints(&self) -> String {
        "SET CONSTRAINTS ALL IMMEDIATE".to_string()
    }

    fn compile_disable_foreign_key_constraints(&self) -> String {
        "SET CONSTRAINTS ALL DEFERRED".to_string()
    }

    fn compile_tables(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT c.relname AS name, n.nspname AS schema, pg_total_relation_size(c.oid) AS size, \
             obj_description(c.oid, 'pg_class') AS comment \
             FROM pg_class c, pg_namespace n \
             WHERE c.relkind IN ('r', 'p') AND n.oid = c.relnamespace AND n.nspname = {} \
             ORDER BY c.relname",
            self.schema_sql(schema)?
        ))
    }

    fn compile_views(&self, schema: Option<&str>) -> Result<String> {
        Ok(format!(
            "SELECT viewname AS name, schemaname AS schema, definition \
             FROM pg_views WHERE schemaname = {} ORDER BY viewname",
            self.schema_sql(schema)?
        ))
    }

    fn compile_columns(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = self.catalog_target(schema, table)?;
        Ok(format!(
            "SELECT a.attname AS name, t.typname AS type_name, \
             format_type(a.atttypid, a.atttypmod) AS type, \
             (SELECT tc.collcollate FROM pg_catalog.pg_collation tc WHERE tc.oid = a.attcollation) AS \"collation\", \
             NOT a.attnotnull AS nullable, \
             (SELECT pg_get_expr(adbin, adrelid) FROM pg_attrdef \
             WHERE c.oid = pg_attrdef.adrelid AND pg_attrdef.adnum = a.attnum) AS \"default\", \
             col_description(c.oid, a.attnum) AS comment, \
             a.attidentity IN ('a', 'd') AS identity, a.attgenerated AS generated \
             FROM pg_attribute a, pg_class c, pg_type t, pg_namespace n \
             WHERE c.relname = {table} AND n.nspname = {schema} AND a.attnum > 0 AND NOT a.attisdropped \
             AND a.attrelid = c.oid AND a.atttypid = t.oid AND n.oid = c.relnamespace \
             ORDER BY a.attnum"
        ))
    }

    fn compile_indexes(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = self.catalog_target(schema, table)?;
        Ok(format!(
            "SELECT ic.relname AS name, string_agg(a.attname, ',' ORDER BY indseq.ord) AS columns, \
             am.amname AS type, i.indisunique AS \"unique\", i.indisprimary AS \"primary\" \
             FROM pg_index i \
             JOIN pg_class tc ON tc.oid = i.indrelid \
             JOIN pg_namespace tn ON tn.oid = tc.relnamespace \
             JOIN pg_class ic ON ic.oid = i.indexrelid \
             JOIN pg_am am ON am.oid = ic.relam \
             JOIN LATERAL unnest(i.indkey) WITH ORDINALITY AS indseq(num, ord) ON TRUE \
             LEFT JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = indseq.num \
             WHERE tc.relname = {table} AND tn.nspname = {schema} \
             GROUP BY ic.relname, am.amname, i.indisunique, i.indisprimary"
        ))
    }

    fn compile_foreign_keys(&self, schema: Option<&str>, table: &str) -> Result<String> {
        let (schema, table) = self.catalog_target(schema, table)?;
        Ok(format!(
            "SELECT c.conname AS name, string_agg(la.attname, ',' ORDER BY conseq.ord) AS columns, \
             fn.nspname AS foreign_schema, fc.relname AS foreign_table, \
             string_agg(fa.attname, ',' ORDER BY conseq.ord) AS foreign_columns, \
             c.confupdtype AS on_update, c.confdeltype AS on_delete \
             FROM pg_constraint c \
             JOIN pg_class tc ON c.conrelid = tc.oid \
             JOIN pg_namespace tn ON tn.oid = tc.relnamespace \
             JOIN pg_class fc ON c.confrelid = fc.oid \
             JOIN pg_namespace fn ON fn.oid = fc.relnamespace \
             JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS conseq(num, ord) ON TRUE \
             JOIN pg_attribute la ON la.attrelid = c.conrelid AND la.attnum = conseq.num \
             JOIN pg_attribute fa ON fa.attrelid = c.confrelid AND fa.attnum = c.confkey[conseq.ord] \
             WHERE c.contype = 'f' AND tc.relname = {table} AND tn.nspname = {schema} \
             GROUP BY c.conname, fn.nspname, fc.relname, c.confupdtype, c.confdeltype"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::command::ForeignKeyAction;

    fn compile(blueprint: &Blueprint) -> Vec<String> {
        blueprint.to_sql(&PostgresSchemaGrammar::new()).unwrap()
    }

    #[test]
    fn test_create_with_serial_key_and_comment() {
        let mut table = Blueprint::create("users");
        table.id();
        table.string("name", Some(100)).nullable().comment("display name");
        table.boolean("active").default(true);
        assert_eq!(
            compile(&table),
            vec![
                r#"CREATE TABLE "users" ("id" BIGSERIAL NOT NULL PRIMARY KEY, "name" VARCHAR(100) NULL, "active" BOOLEAN NOT NULL DEFAULT TRUE)"#,
                r#"COMMENT ON COLUMN "users"."name" IS 'display name'"#,
            ]
        );
    }

    #[test]
    fn test_explicit_primary_suppresses_inline_key() {
        let mut table = Blueprint::create("users");
        table.id().primary();
        assert_eq!(
            compile(&table),
            vec![
                r#"CREATE TABLE "users" ("id" BIGSERIAL NOT NULL)"#,
                r#"ALTER TABLE "users" ADD PRIMARY KEY ("id")"#,
            ]
        );
    }

    #[test]
    fn test_identity_and_stored_columns() {
        let mut table = Blueprint::new("orders");
        table
            .integer("number")
            .auto_increment()
            .generated_as(Some("START WITH 100"))
            .always();
        table.decimal("total", 10, 2).stored_as("price * quantity");
        assert_eq!(
            compile(&table),
            vec![
                r#"ALTER TABLE "orders" ADD COLUMN "number" INTEGER GENERATED ALWAYS AS IDENTITY (START WITH 100) PRIMARY KEY, ADD COLUMN "total" DECIMAL(10, 2) GENERATED ALWAYS AS (price * quantity) STORED"#
            ]
        );
    }

    #[test]
    fn test_virtual_columns_are_unsupported() {
        let mut table = Blueprint::new("orders");
        table.integer("total").virtual_as("price * quantity");
        assert!(matches!(
            table.to_sql(&PostgresSchemaGrammar::new()),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_change_columns() {
        let mut table = Blueprint::new("users");
        table.string("name", Some(50)).nullable().change();
        table.integer("votes").default(1).change();
        assert_eq!(
            compile(&table),
            vec![concat!(
                r#"ALTER TABLE "users" ALTER COLUMN "name" TYPE VARCHAR(50), ALTER COLUMN "name" DROP NOT NULL, "#,
                r#"ALTER COLUMN "name" DROP DEFAULT, ALTER COLUMN "name" DROP IDENTITY IF EXISTS, "#,
                r#"ALTER COLUMN "votes" TYPE INTEGER, ALTER COLUMN "votes" SET NOT NULL, "#,
                r#"ALTER COLUMN "votes" SET DEFAULT 1, ALTER COLUMN "votes" DROP IDENTITY IF EXISTS"#
            )]
        );
    }

    #[test]
    fn test_enum_uses_check_constraint() {
        let mut table = Blueprint::new("posts");
        table.enumeration("status", ["draft", "published"]);
        assert_eq!(
            compile(&table),
            vec![
                r#"ALTER TABLE "posts" ADD COLUMN "status" VARCHAR(255) CHECK ("status" IN ('draft', 'published')) NOT NULL"#
            ]
        );
    }

    #[test]
    fn test_index_kinds() {
        let mut table = Blueprint::new("posts");
        table.index(["title"]);
        table.add_command(Command::Index(IndexCommand::new(["tags"]).algorithm("gin")));
        table.fulltext(["title", "body"]);
        table.spatial_index(["location"]);
        assert_eq!(
            compile(&table),
            vec![
                r#"CREATE INDEX "posts_title_index" ON "posts" ("title")"#,
                r#"CREATE INDEX "posts_tags_index" ON "posts" USING GIN ("tags")"#,
                r#"CREATE INDEX "posts_title_body_fulltext" ON "posts" USING GIN ((TO_TSVECTOR('english', "title") || TO_TSVECTOR('english', "body")))"#,
                r#"CREATE INDEX "posts_location_spatialindex" ON "posts" USING GIST ("location")"#,
            ]
        );
    }

    #[test]
    fn test_deferrable_foreign_key() {
        let mut table = Blueprint::new("posts");
        table.foreign(
            ForeignKeyDefinition::new(["user_id"])
                .references(["id"])
                .on("users")
                .on_delete(ForeignKeyAction::SetNull)
                .deferrable(true)
                .initially_immediate(false)
                .not_valid(),
        );
        assert_eq!(
            compile(&table),
            vec![
                r#"ALTER TABLE "posts" ADD CONSTRAINT "posts_user_id_foreign" FOREIGN KEY ("user_id") REFERENCES "users" ("id") ON DELETE SET NULL DEFERRABLE INITIALLY DEFERRED NOT VALID"#
            ]
        );
    }

    #[test]
    fn test_drops_and_renames_with_prefix() {
        let grammar = PostgresSchemaGrammar::new().with_table_prefix("app_");
        let mut table = Blueprint::new("users");
        table.drop_primary(None);
        table.drop_unique("app_users_email_unique");
        table.rename_index("a", "b");
        table.rename("members");
        assert_eq!(
            table.to_sql(&grammar).unwrap(),
            vec![
                r#"ALTER TABLE "app_users" DROP CONSTRAINT "app_users_pkey""#,
                r#"ALTER TABLE "app_users" DROP CONSTRAINT "app_users_email_unique""#,
                r#"ALTER INDEX "a" RENAME TO "b""#,
                r#"ALTER TABLE "app_users" RENAME TO "app_members""#,
            ]
        );
    }

    #[test]
    fn test_starting_value_restarts_sequence() {
        let mut table = Blueprint::create("orders");
        table.id().starting_value(500);
        assert_eq!(
            compile(&table)[1],
            r#"ALTER SEQUENCE "orders_id_seq" RESTART WITH 500"#
        );
    }

    #[test]
    fn test_introspection_targets() {
        let grammar = PostgresSchemaGrammar::new();
        let sql = grammar.compile_columns(None, "audit.events").unwrap();
        assert!(sql.contains("c.relname = 'events' AND n.nspname = 'audit'"));
        let sql = grammar.compile_indexes(None, "users").unwrap();
        assert!(sql.contains("tn.nspname = CURRENT_SCHEMA()"));
    }
}
