//! Binding order across clause buckets and placeholder accounting.

use oxide_grammar::query::{JoinClause, JoinType, Record};
use oxide_grammar::{
    Grammar, MySqlGrammar, Operator, PostgresGrammar, QueryBuilder, SqlServerGrammar, SqlValue,
    SqliteGrammar,
};

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

/// Builder calls deliberately out of clause order.
fn shuffled() -> QueryBuilder {
    QueryBuilder::table("orders")
        .where_("status", Operator::Eq, "paid")
        .order_by_raw("CASE WHEN region = ? THEN 0 ELSE 1 END", vec![text("eu")])
        .having("total", Operator::Gt, 100)
        .select_raw("total * ? AS taxed", vec![SqlValue::Float(1.2)])
        .join_clause(
            JoinClause::new(JoinType::Inner, "customers")
                .on("customers.id", Operator::Eq, "orders.customer_id")
                .where_("customers.vip", Operator::Eq, true),
        )
        .group_by(["customer_id"])
        .union(QueryBuilder::table("archived_orders").where_("status", Operator::Eq, "void"))
}

#[test]
fn buckets_flatten_in_clause_order() {
    let compiled = PostgresGrammar::new().compile_select(&shuffled()).unwrap();
    assert_eq!(
        compiled.bindings,
        vec![
            SqlValue::Float(1.2),
            SqlValue::Bool(true),
            text("paid"),
            SqlValue::Int(100),
            text("eu"),
            text("void"),
        ]
    );
}

#[test]
fn placeholders_match_bindings_in_every_dialect() {
    let grammars: Vec<Box<dyn Grammar>> = vec![
        Box::new(PostgresGrammar::new()),
        Box::new(MySqlGrammar::new()),
        Box::new(SqliteGrammar::new()),
        Box::new(SqlServerGrammar::new()),
    ];
    for grammar in grammars {
        let compiled = grammar.compile_select(&shuffled()).unwrap();
        assert_eq!(
            compiled.sql.matches('?').count(),
            compiled.bindings.len(),
            "{}: {}",
            grammar.name(),
            compiled.sql
        );
    }
}

#[test]
fn raw_sql_inlines_every_binding() {
    let raw = shuffled().to_raw_sql(&SqliteGrammar::new()).unwrap();
    assert!(!raw.contains('?'));
    assert!(raw.contains("total * 1.2 AS taxed"));
    assert!(raw.contains(r#""customers"."vip" = 1"#));
    assert!(raw.contains("region = 'eu'"));
}

#[test]
fn group_limit_moves_order_bindings_into_the_window() {
    let query = QueryBuilder::table("posts")
        .select_raw("? AS tag", vec![text("x")])
        .where_("published", Operator::Eq, true)
        .order_by_raw("score * ? DESC", vec![SqlValue::Int(2)])
        .group_limit(3, "user_id");
    let compiled = PostgresGrammar::new().compile_select(&query).unwrap();
    assert_eq!(
        compiled.bindings,
        vec![text("x"), SqlValue::Int(2), SqlValue::Bool(true)]
    );
}

/// Top posts per user; the window carries an order binding.
fn top_posts() -> QueryBuilder {
    QueryBuilder::table("posts")
        .where_("a", Operator::Eq, 1)
        .order_by_raw("FIELD(x, ?)", vec![SqlValue::Int(2)])
        .group_limit(2, "user_id")
}

#[test]
fn grouped_subqueries_keep_window_order_bindings_first() {
    let grammar = PostgresGrammar::new();

    let query = QueryBuilder::table("users")
        .where_in_sub("id", top_posts())
        .where_("active", Operator::Eq, true);
    let compiled = grammar.compile_select(&query).unwrap();
    let window = compiled.sql.find("FIELD(x, ?)").unwrap();
    let filter = compiled.sql.find(r#""a" = ?"#).unwrap();
    assert!(window < filter, "{}", compiled.sql);
    assert_eq!(
        compiled.bindings,
        vec![SqlValue::Int(2), SqlValue::Int(1), SqlValue::Bool(true)]
    );

    let query = QueryBuilder::new()
        .from_sub(top_posts(), "t")
        .where_("t.b", Operator::Eq, 3);
    let compiled = grammar.compile_select(&query).unwrap();
    assert_eq!(
        compiled.bindings,
        vec![SqlValue::Int(2), SqlValue::Int(1), SqlValue::Int(3)]
    );
}

#[test]
fn update_and_delete_drop_orders_they_do_not_render() {
    let query = QueryBuilder::table("users")
        .where_("id", Operator::Eq, 1)
        .order_by_raw("FIELD(id, ?)", vec![SqlValue::Int(9)]);
    let record = Record::new().set("name", "B");

    let compiled = PostgresGrammar::new().compile_update(&query, &record).unwrap();
    assert_eq!(compiled.sql, r#"UPDATE "users" SET "name" = ? WHERE "id" = ?"#);
    assert_eq!(compiled.bindings, vec![text("B"), SqlValue::Int(1)]);

    let compiled = SqliteGrammar::new().compile_delete(&query).unwrap();
    assert_eq!(compiled.sql, r#"DELETE FROM "users" WHERE "id" = ?"#);
    assert_eq!(compiled.bindings, vec![SqlValue::Int(1)]);

    let compiled = MySqlGrammar::new().compile_update(&query, &record).unwrap();
    assert_eq!(
        compiled.sql,
        "UPDATE `users` SET `name` = ? WHERE `id` = ? ORDER BY FIELD(id, ?)"
    );
    assert_eq!(
        compiled.bindings,
        vec![text("B"), SqlValue::Int(1), SqlValue::Int(9)]
    );

    let limited = query.limit(1);
    let compiled = PostgresGrammar::new().compile_update(&limited, &record).unwrap();
    assert!(compiled.sql.contains("ORDER BY FIELD(id, ?) LIMIT 1"), "{}", compiled.sql);
    assert_eq!(
        compiled.bindings,
        vec![text("B"), SqlValue::Int(1), SqlValue::Int(9)]
    );
}

#[test]
fn exists_subqueries_bind_where_they_appear() {
    let posts = QueryBuilder::table("posts")
        .where_column("posts.user_id", Operator::Eq, "users.id")
        .where_("posts.flagged", Operator::Eq, true);
    let query = QueryBuilder::table("users")
        .where_("active", Operator::Eq, 1)
        .where_exists(posts)
        .where_("age", Operator::Gt, 21);
    let compiled = PostgresGrammar::new().compile_select(&query).unwrap();
    assert_eq!(
        compiled.sql,
        r#"SELECT * FROM "users" WHERE "active" = ? AND EXISTS ( SELECT * FROM "posts" WHERE "posts"."user_id" = "users"."id" AND "posts"."flagged" = ? ) AND "age" > ?"#
    );
    assert_eq!(
        compiled.bindings,
        vec![SqlValue::Int(1), SqlValue::Bool(true), SqlValue::Int(21)]
    );
}

#[test]
fn insert_using_binds_the_source_query() {
    let source = QueryBuilder::table("users")
        .select(["id", "email"])
        .where_("active", Operator::Eq, true);
    let compiled = PostgresGrammar::new()
        .compile_insert_using(
            &QueryBuilder::table("subscribers"),
            &["user_id".to_string(), "email".to_string()],
            &source,
        )
        .unwrap();
    assert_eq!(
        compiled.sql,
        r#"INSERT INTO "subscribers" ("user_id", "email") SELECT "id", "email" FROM "users" WHERE "active" = ?"#
    );
    assert_eq!(compiled.bindings, vec![SqlValue::Bool(true)]);
}

#[test]
fn delete_ignores_select_bindings() {
    let query = QueryBuilder::table("sessions")
        .select_raw("? AS marker", vec![text("unused")])
        .where_("expired", Operator::Eq, true);
    let compiled = SqliteGrammar::new().compile_delete(&query).unwrap();
    assert_eq!(compiled.sql, r#"DELETE FROM "sessions" WHERE "expired" = ?"#);
    assert_eq!(compiled.bindings, vec![SqlValue::Bool(true)]);
}
