//! Schema builder: DDL execution and catalog introspection through a connection.

mod common;
use common::*;

use oxide_grammar::{Blueprint, Dialect, Error, GrammarConfig, SchemaBuilder, SqlValue};

#[test]
fn create_runs_every_statement_in_order() {
    let connection = MockConnection::new(Dialect::Postgres);
    let schema = SchemaBuilder::new(&connection);
    schema
        .create("users", |table| {
            table.id();
            table.string("name", Some(100)).nullable().comment("display name");
            table.boolean("active").default(true);
        })
        .unwrap();
    assert_eq!(
        connection.sql(),
        vec![
            r#"CREATE TABLE "users" ("id" BIGSERIAL NOT NULL PRIMARY KEY, "name" VARCHAR(100) NULL, "active" BOOLEAN NOT NULL DEFAULT TRUE)"#,
            r#"COMMENT ON COLUMN "users"."name" IS 'display name'"#,
        ]
    );
    assert!(connection.executed().iter().all(|q| q.bindings.is_empty()));
}

#[test]
fn mysql_table_defaults_come_from_config() {
    let config = GrammarConfig::from_json(
        r#"{"dialect": "mysql", "charset": "utf8mb4", "collation": "utf8mb4_unicode_ci", "engine": "InnoDB"}"#,
    )
    .unwrap();
    let connection = MockConnection::with_config(&config);
    let schema = SchemaBuilder::new(&connection);
    schema
        .create("users", |table| {
            table.id();
            table.string("email", None);
        })
        .unwrap();
    schema.create_database("shop").unwrap();
    assert_eq!(
        connection.sql(),
        vec![
            "CREATE TABLE `users` (`id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY, \
             `email` VARCHAR(255) NOT NULL) DEFAULT CHARACTER SET utf8mb4 \
             COLLATE 'utf8mb4_unicode_ci' ENGINE = InnoDB",
            "CREATE DATABASE `shop` DEFAULT CHARACTER SET `utf8mb4` DEFAULT COLLATE `utf8mb4_unicode_ci`",
        ]
    );
}

#[test]
fn drops_and_renames_take_the_prefix() {
    let config = GrammarConfig::new(Dialect::Sqlite).with_table_prefix("app_");
    let connection = MockConnection::with_config(&config);
    let schema = SchemaBuilder::new(&connection);
    schema.drop("users").unwrap();
    schema.drop_if_exists("posts").unwrap();
    schema.rename("teams", "squads").unwrap();
    assert_eq!(
        connection.sql(),
        vec![
            r#"DROP TABLE "app_users""#,
            r#"DROP TABLE IF EXISTS "app_posts""#,
            r#"ALTER TABLE "app_teams" RENAME TO "app_squads""#,
        ]
    );
}

#[test]
fn compile_errors_run_nothing() {
    let connection = MockConnection::new(Dialect::Sqlite);
    let schema = SchemaBuilder::new(&connection);
    let mut table = Blueprint::new("users");
    table.id();
    table.string("name", None).change();
    assert!(matches!(
        schema.build(&table),
        Err(Error::UnsupportedOperation { grammar: "sqlite", .. })
    ));
    assert!(matches!(
        schema.create_database("shop"),
        Err(Error::UnsupportedOperation { .. })
    ));
    assert!(connection.sql().is_empty());
}

#[test]
fn foreign_key_checks_are_restored_after_failure() {
    let connection = MockConnection::new(Dialect::MySql);
    let schema = SchemaBuilder::new(&connection);
    let result = schema.without_foreign_key_constraints(|schema| {
        schema.drop("users")?;
        Err::<(), _>(Error::Processing("interrupted".to_string()))
    });
    assert!(matches!(result, Err(Error::Processing(_))));
    assert_eq!(
        connection.sql(),
        vec![
            "SET FOREIGN_KEY_CHECKS=0",
            "DROP TABLE `users`",
            "SET FOREIGN_KEY_CHECKS=1",
        ]
    );
}

#[test]
fn foreign_key_checks_wrap_successful_work() {
    let connection = MockConnection::new(Dialect::Sqlite);
    let schema = SchemaBuilder::new(&connection);
    let dropped = schema
        .without_foreign_key_constraints(|schema| schema.drop_if_exists("users").map(|()| 1))
        .unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(
        connection.sql(),
        vec![
            "PRAGMA foreign_keys = OFF",
            r#"DROP TABLE IF EXISTS "users""#,
            "PRAGMA foreign_keys = ON",
        ]
    );
}

#[test]
fn has_table_compares_prefixed_names_case_insensitively() {
    let config = GrammarConfig::new(Dialect::Postgres).with_table_prefix("app_");
    let connection = MockConnection::with_config(&config)
        .returning(vec![
            row(&[("name", text("APP_USERS")), ("schema", text("public"))]),
            row(&[("name", text("app_posts")), ("schema", text("public"))]),
        ])
        .returning(vec![row(&[("name", text("users")), ("schema", text("public"))])]);
    let schema = SchemaBuilder::new(&connection);
    assert!(schema.has_table("users").unwrap());
    assert!(!schema.has_table("users").unwrap());
    assert!(connection.sql()[0].contains("FROM pg_class c, pg_namespace n"));
}

#[test]
fn sqlite_columns_are_normalized() {
    let connection = MockConnection::new(Dialect::Sqlite).returning(vec![
        row(&[
            ("name", text("id")),
            ("type", text("INTEGER")),
            ("nullable", SqlValue::Int(0)),
            ("default", SqlValue::Null),
            ("primary", SqlValue::Int(1)),
            ("extra", SqlValue::Int(0)),
        ]),
        row(&[
            ("name", text("title")),
            ("type", text("VARCHAR(255)")),
            ("nullable", SqlValue::Int(1)),
            ("default", text("'untitled'")),
            ("primary", SqlValue::Int(0)),
            ("extra", SqlValue::Int(3)),
        ]),
    ]);
    let columns = SchemaBuilder::new(&connection).get_columns("posts").unwrap();
    assert_eq!(columns.len(), 2);

    assert_eq!(columns[0].name, "id");
    assert_eq!(columns[0].type_name, "integer");
    assert!(columns[0].auto_increment);
    assert!(!columns[0].nullable);
    assert_eq!(columns[0].default, None);

    assert_eq!(columns[1].type_name, "varchar");
    assert_eq!(columns[1].full_type, "varchar(255)");
    assert!(columns[1].nullable);
    assert_eq!(columns[1].default.as_deref(), Some("'untitled'"));
    assert_eq!(
        columns[1].generation.as_ref().map(|g| g.kind.as_str()),
        Some("stored")
    );
    assert!(connection.sql()[0].contains("pragma_table_xinfo('posts')"));
}

#[test]
fn has_columns_checks_every_name() {
    let listing = || {
        vec![
            row(&[("name", text("id")), ("type", text("integer"))]),
            row(&[("name", text("Email")), ("type", text("text"))]),
        ]
    };
    let connection = MockConnection::new(Dialect::Sqlite)
        .returning(listing())
        .returning(listing());
    let schema = SchemaBuilder::new(&connection);
    assert!(schema.has_columns("users", &["id", "email"]).unwrap());
    assert!(!schema.has_column("users", "name").unwrap());
}

#[test]
fn mysql_indexes_mark_the_primary_key() {
    let connection = MockConnection::new(Dialect::MySql).returning(vec![
        row(&[
            ("name", text("PRIMARY")),
            ("columns", text("id")),
            ("type", text("BTREE")),
            ("unique", SqlValue::Int(1)),
        ]),
        row(&[
            ("name", text("users_team_id_email_unique")),
            ("columns", text("team_id,email")),
            ("type", text("BTREE")),
            ("unique", SqlValue::Int(1)),
        ]),
    ]);
    let indexes = SchemaBuilder::new(&connection).get_indexes("users").unwrap();
    assert_eq!(indexes[0].name, "primary");
    assert!(indexes[0].primary);
    assert_eq!(indexes[1].columns, vec!["team_id", "email"]);
    assert_eq!(indexes[1].kind.as_deref(), Some("btree"));
    assert!(!indexes[1].primary);
}

#[test]
fn rows_without_names_are_processing_errors() {
    let connection = MockConnection::new(Dialect::Sqlite)
        .returning(vec![row(&[("schema", text("main"))])]);
    assert!(matches!(
        SchemaBuilder::new(&connection).get_tables(),
        Err(Error::Processing(_))
    ));
}
