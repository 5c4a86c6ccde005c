//! Quoting, literals, JSON selectors and write forms across the four dialects.

use oxide_grammar::query::{Record, Upsert, Values};
use oxide_grammar::{
    Dialect, Error, Grammar, GrammarConfig, MySqlGrammar, Operator, PostgresGrammar, QueryBuilder,
    SqlServerGrammar, SqlValue, SqliteGrammar,
};
use serde_json::json;

fn grammars() -> Vec<Box<dyn Grammar>> {
    vec![
        Box::new(PostgresGrammar::new()),
        Box::new(MySqlGrammar::new()),
        Box::new(SqliteGrammar::new()),
        Box::new(SqlServerGrammar::new()),
    ]
}

#[test]
fn identifiers_are_quoted_per_dialect() {
    let wrapped: Vec<String> = grammars().iter().map(|g| g.wrap("users.name")).collect();
    assert_eq!(
        wrapped,
        vec![
            r#""users"."name""#.to_string(),
            "`users`.`name`".to_string(),
            r#""users"."name""#.to_string(),
            "[users].[name]".to_string(),
        ]
    );
}

#[test]
fn star_and_aliases_are_not_quoted_as_names() {
    let grammar = PostgresGrammar::new();
    assert_eq!(grammar.wrap("*"), "*");
    assert_eq!(grammar.wrap("users.*"), r#""users".*"#);
    assert_eq!(grammar.wrap("name as label"), r#""name" AS "label""#);
}

#[test]
fn embedded_quotes_are_doubled() {
    assert_eq!(PostgresGrammar::new().wrap(r#"we"ird"#), r#""we""ird""#);
    assert_eq!(MySqlGrammar::new().wrap("we`ird"), "`we``ird`");
    assert_eq!(SqlServerGrammar::new().wrap("we]ird"), "[we]]ird]");
}

#[test]
fn string_literals_are_escaped() {
    let value = SqlValue::Text("it's".into());
    for grammar in grammars() {
        assert_eq!(grammar.escape(&value).unwrap(), "'it''s'", "{}", grammar.name());
    }
    assert_eq!(
        MySqlGrammar::new().escape(&SqlValue::Text(r"a\b".into())).unwrap(),
        r"'a\\b'"
    );
    assert!(matches!(
        SqliteGrammar::new().escape(&SqlValue::Text("nul\0".into())),
        Err(Error::Construction { .. })
    ));
}

#[test]
fn booleans_and_nulls() {
    let pg = PostgresGrammar::new();
    let sqlite = SqliteGrammar::new();
    assert_eq!(pg.escape(&SqlValue::Bool(false)).unwrap(), "FALSE");
    assert_eq!(sqlite.escape(&SqlValue::Bool(false)).unwrap(), "0");
    assert_eq!(sqlite.escape(&SqlValue::Null).unwrap(), "NULL");
    assert!(sqlite.escape(&SqlValue::Float(f64::NAN)).is_err());
}

#[test]
fn substituted_bindings_are_escaped() {
    let grammar = SqliteGrammar::new();
    let query = QueryBuilder::table("users")
        .where_("name", Operator::Eq, "O'Brien")
        .where_("age", Operator::Gt, 30);
    assert_eq!(
        query.to_raw_sql(&grammar).unwrap(),
        r#"SELECT * FROM "users" WHERE "name" = 'O''Brien' AND "age" > 30"#
    );
}

#[test]
fn question_marks_inside_literals_are_not_placeholders() {
    let grammar = PostgresGrammar::new();
    let sql = grammar
        .substitute_bindings(r#"SELECT '?' AS "q?", ? AS "v""#, &[SqlValue::Int(7)])
        .unwrap();
    assert_eq!(sql, r#"SELECT '?' AS "q?", 7 AS "v""#);
    assert!(matches!(
        grammar.substitute_bindings("SELECT ?", &[]),
        Err(Error::CompileInvariant {
            placeholders: 1,
            bindings: 0
        })
    ));
}

#[test]
fn json_selectors() {
    assert_eq!(PostgresGrammar::new().wrap("meta->theme"), r#""meta"->>'theme'"#);
    assert_eq!(
        MySqlGrammar::new().wrap("meta->theme"),
        r#"JSON_UNQUOTE(JSON_EXTRACT(`meta`, '$."theme"'))"#
    );
    assert_eq!(
        SqliteGrammar::new().wrap("meta->theme"),
        r#"JSON_EXTRACT("meta", '$."theme"')"#
    );
    assert_eq!(
        SqlServerGrammar::new().wrap("meta->theme"),
        r#"JSON_VALUE([meta], '$."theme"')"#
    );
}

#[test]
fn json_containment_binds_the_document() {
    let query = QueryBuilder::table("users").where_json_contains("meta->tags", json!(["rust"]));

    let pg = PostgresGrammar::new().compile_select(&query).unwrap();
    assert_eq!(
        pg.sql,
        r#"SELECT * FROM "users" WHERE ("meta"->'tags')::jsonb @> ?"#
    );
    assert_eq!(pg.bindings, vec![SqlValue::Json(json!(["rust"]))]);

    assert_eq!(
        MySqlGrammar::new().compile_select(&query).unwrap().sql,
        r#"SELECT * FROM `users` WHERE JSON_CONTAINS(`meta`, ?, '$."tags"')"#
    );
}

#[test]
fn upsert_forms() {
    let values = Values::try_from(Record::new().set("email", "a@b.c").set("name", "A")).unwrap();
    let upsert = Upsert::new(values, ["email"]).update("name");
    let query = QueryBuilder::table("users");

    assert_eq!(
        PostgresGrammar::new().compile_upsert(&query, &upsert).unwrap().sql,
        r#"INSERT INTO "users" ("email", "name") VALUES (?, ?) ON CONFLICT ("email") DO UPDATE SET "name" = "excluded"."name""#
    );
    assert_eq!(
        SqliteGrammar::new().compile_upsert(&query, &upsert).unwrap().sql,
        r#"INSERT INTO "users" ("email", "name") VALUES (?, ?) ON CONFLICT ("email") DO UPDATE SET "name" = "excluded"."name""#
    );
    assert_eq!(
        MySqlGrammar::new().compile_upsert(&query, &upsert).unwrap().sql,
        "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) AS `upsert_row` \
         ON DUPLICATE KEY UPDATE `name` = `upsert_row`.`name`"
    );
    assert!(SqlServerGrammar::new()
        .compile_upsert(&query, &upsert)
        .unwrap()
        .sql
        .starts_with("MERGE [users] USING (VALUES (?, ?)) [upsert_source] ([email], [name])"));
}

#[test]
fn mariadb_upsert_uses_values_function() {
    let config = GrammarConfig::new(Dialect::MariaDb).with_server_version("10.11.2-MariaDB");
    let grammar = config.query_grammar().unwrap();
    let values = Values::try_from(Record::new().set("email", "a@b.c").set("name", "A")).unwrap();
    let upsert = Upsert::new(values, ["email"]).update("name");
    assert_eq!(
        grammar.compile_upsert(&QueryBuilder::table("users"), &upsert).unwrap().sql,
        "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
    );
}

#[test]
fn insert_get_id_forms() {
    let values = Values::try_from(Record::new().set("name", "A")).unwrap();
    let query = QueryBuilder::table("users");
    assert_eq!(
        PostgresGrammar::new()
            .compile_insert_get_id(&query, &values, None)
            .unwrap()
            .sql,
        r#"INSERT INTO "users" ("name") VALUES (?) RETURNING "id""#
    );
    assert_eq!(
        SqliteGrammar::new()
            .compile_insert_get_id(&query, &values, None)
            .unwrap()
            .sql,
        r#"INSERT INTO "users" ("name") VALUES (?)"#
    );
}

#[test]
fn truncate_forms() {
    let query = QueryBuilder::table("users");
    let sql = |grammar: &dyn Grammar| -> Vec<String> {
        grammar
            .compile_truncate(&query)
            .unwrap()
            .into_iter()
            .map(|q| q.sql)
            .collect()
    };
    assert_eq!(
        sql(&PostgresGrammar::new()),
        vec![r#"TRUNCATE "users" RESTART IDENTITY CASCADE"#]
    );
    assert_eq!(sql(&MySqlGrammar::new()), vec!["TRUNCATE TABLE `users`"]);
    assert_eq!(sql(&SqliteGrammar::new()).len(), 2);
}

#[test]
fn config_picks_the_grammar_pair() {
    for (dialect, name) in [
        (Dialect::Postgres, "postgres"),
        (Dialect::MySql, "mysql"),
        (Dialect::Sqlite, "sqlite"),
        (Dialect::SqlServer, "sqlsrv"),
    ] {
        let config = GrammarConfig::new(dialect);
        assert_eq!(config.query_grammar().unwrap().name(), name);
        assert_eq!(config.schema_grammar().unwrap().name(), name);
        assert_eq!(config.processor().name(), name);
    }
}
