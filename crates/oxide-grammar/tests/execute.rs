//! Running builders through a connection: reads, writes and generated keys.

mod common;
use common::*;

use oxide_grammar::query::{Record, Upsert, Values};
use oxide_grammar::{
    Connection, Dialect, Error, Grammar, Operator, QueryBuilder, SqlValue, SqliteGrammar,
};

#[test]
fn count_reads_the_aggregate_column() {
    let connection = MockConnection::new(Dialect::Postgres)
        .returning(vec![row(&[("aggregate", SqlValue::Int(3))])]);
    let count = QueryBuilder::table("users")
        .select(["id", "name"])
        .where_("active", Operator::Eq, true)
        .count(&connection)
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(
        connection.sql(),
        vec![r#"SELECT COUNT(*) AS "aggregate" FROM "users" WHERE "active" = ?"#]
    );
}

#[test]
fn empty_aggregates() {
    let connection = MockConnection::new(Dialect::Sqlite);
    let query = QueryBuilder::table("orders");
    assert_eq!(query.count(&connection).unwrap(), 0);
    assert_eq!(query.sum(&connection, "total").unwrap(), SqlValue::Int(0));
    assert_eq!(query.max(&connection, "total").unwrap(), None);
}

#[test]
fn exists_reads_the_flag() {
    let connection = MockConnection::new(Dialect::Sqlite)
        .returning(vec![row(&[("exists", SqlValue::Int(1))])])
        .returning(vec![row(&[("exists", SqlValue::Int(0))])]);
    let query = QueryBuilder::table("users").where_("email", Operator::Eq, "a@b.c");
    assert!(query.exists(&connection).unwrap());
    assert!(query.doesnt_exist(&connection).unwrap());
    assert_eq!(
        connection.sql()[0],
        r#"SELECT EXISTS(SELECT * FROM "users" WHERE "email" = ?) AS "exists""#
    );
}

#[test]
fn first_value_and_pluck() {
    let connection = MockConnection::new(Dialect::MySql)
        .returning(vec![row(&[("email", text("a@b.c"))])])
        .returning(vec![
            row(&[("email", text("a@b.c"))]),
            row(&[("email", text("d@e.f"))]),
        ]);
    let query = QueryBuilder::table("users").order_by_desc("id");

    assert_eq!(
        query.value(&connection, "users.email").unwrap(),
        Some(text("a@b.c"))
    );
    assert_eq!(
        query.pluck(&connection, "email").unwrap(),
        vec![text("a@b.c"), text("d@e.f")]
    );
    assert_eq!(
        connection.sql(),
        vec![
            "SELECT `users`.`email` FROM `users` ORDER BY `id` DESC LIMIT 1",
            "SELECT `email` FROM `users` ORDER BY `id` DESC",
        ]
    );
}

#[test]
fn insert_binds_rows_in_column_order() {
    let connection = MockConnection::new(Dialect::MySql);
    let values = Values::from_records([
        Record::new().set("email", "a@b.c").set("name", "A"),
        Record::new().set("name", "B").set("email", "d@e.f"),
    ])
    .unwrap();
    QueryBuilder::table("users").insert(&connection, &values).unwrap();

    let executed = connection.executed();
    assert_eq!(
        executed[0].sql,
        "INSERT INTO `users` (`email`, `name`) VALUES (?, ?), (?, ?)"
    );
    assert_eq!(
        executed[0].bindings,
        vec![text("a@b.c"), text("A"), text("d@e.f"), text("B")]
    );
}

#[test]
fn empty_insert_sends_nothing() {
    let connection = MockConnection::new(Dialect::Postgres);
    assert!(QueryBuilder::table("users").insert(&connection, &Values::new()).unwrap());
    assert!(connection.sql().is_empty());

    let compiled = SqliteGrammar::new()
        .compile_insert(&QueryBuilder::table("users"), &Values::new())
        .unwrap();
    assert_eq!(compiled.sql, r#"INSERT INTO "users" DEFAULT VALUES"#);
}

#[test]
fn insert_or_ignore() {
    let connection = MockConnection::new(Dialect::Sqlite);
    let values = Values::try_from(Record::new().set("email", "a@b.c")).unwrap();
    let inserted = QueryBuilder::table("users")
        .insert_or_ignore(&connection, &values)
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(
        connection.sql(),
        vec![r#"INSERT OR IGNORE INTO "users" ("email") VALUES (?)"#]
    );
}

#[test]
fn postgres_insert_get_id_reads_the_returned_row() {
    let connection =
        MockConnection::new(Dialect::Postgres).returning(vec![row(&[("id", SqlValue::Int(42))])]);
    let values = Values::try_from(Record::new().set("name", "A")).unwrap();
    let id = QueryBuilder::table("users")
        .insert_get_id(&connection, &values, None)
        .unwrap();
    assert_eq!(id, 42);
}

#[test]
fn sqlite_insert_get_id_asks_the_connection() {
    let values = Values::try_from(Record::new().set("name", "A")).unwrap();
    let query = QueryBuilder::table("users");

    let connection = MockConnection::new(Dialect::Sqlite).with_insert_id(7);
    assert_eq!(query.insert_get_id(&connection, &values, None).unwrap(), 7);

    let silent = MockConnection::new(Dialect::Sqlite);
    assert!(matches!(
        query.insert_get_id(&silent, &values, None),
        Err(Error::Processing(_))
    ));
}

#[test]
fn update_binds_assignments_before_wheres() {
    let connection = MockConnection::new(Dialect::Sqlite);
    let affected = QueryBuilder::table("users")
        .where_("id", Operator::Eq, 1)
        .update(&connection, &Record::new().set("name", "B").set("votes", 3))
        .unwrap();
    assert_eq!(affected, 1);
    let executed = connection.executed();
    assert_eq!(
        executed[0].sql,
        r#"UPDATE "users" SET "name" = ?, "votes" = ? WHERE "id" = ?"#
    );
    assert_eq!(
        executed[0].bindings,
        vec![text("B"), SqlValue::Int(3), SqlValue::Int(1)]
    );
}

#[test]
fn update_without_columns_is_rejected() {
    let connection = MockConnection::new(Dialect::Sqlite);
    assert!(matches!(
        QueryBuilder::table("users").update(&connection, &Record::new()),
        Err(Error::Construction { .. })
    ));
    assert!(connection.sql().is_empty());
}

#[test]
fn delete_and_truncate() {
    let connection = MockConnection::new(Dialect::Sqlite);
    let query = QueryBuilder::table("users").where_("id", Operator::Eq, 5);
    query.delete(&connection).unwrap();
    QueryBuilder::table("users").truncate(&connection).unwrap();

    let executed = connection.executed();
    assert_eq!(executed[0].sql, r#"DELETE FROM "users" WHERE "id" = ?"#);
    assert_eq!(executed[0].bindings, vec![SqlValue::Int(5)]);
    assert_eq!(
        executed[1].sql,
        r#"DELETE FROM "sqlite_sequence" WHERE "name" = ?"#
    );
    assert_eq!(executed[1].bindings, vec![text("users")]);
    assert_eq!(executed[2].sql, r#"DELETE FROM "users""#);
}

#[test]
fn upsert_runs_one_statement() {
    let connection = MockConnection::new(Dialect::Postgres);
    let values = Values::try_from(Record::new().set("email", "a@b.c").set("name", "A")).unwrap();
    let upsert = Upsert::new(values, ["email"]).update("name");
    QueryBuilder::table("users").upsert(&connection, &upsert).unwrap();
    let executed = connection.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].bindings, vec![text("a@b.c"), text("A")]);
}

#[test]
fn compile_errors_send_nothing() {
    let connection = MockConnection::new(Dialect::MySql);
    let result = QueryBuilder::table("users")
        .where_("name", Operator::ILike, "a%")
        .get(&connection);
    assert!(matches!(result, Err(Error::UnsupportedOperation { .. })));
    assert!(connection.sql().is_empty());
}

#[test]
fn prefix_applies_to_executed_statements() {
    let config = oxide_grammar::GrammarConfig::new(Dialect::Sqlite).with_table_prefix("app_");
    let connection = MockConnection::with_config(&config);
    QueryBuilder::table("users").delete(&connection).unwrap();
    assert_eq!(connection.sql(), vec![r#"DELETE FROM "app_users""#]);
    assert_eq!(connection.grammar().name(), "sqlite");
}
