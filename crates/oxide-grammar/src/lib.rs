//! # oxide-grammar
//!
//! A multi-dialect SQL query and schema compiler.
//!
//! This crate provides:
//! - A [`QueryBuilder`] AST covering selects, joins, unions, aggregates,
//!   locks, inserts, upserts, updates and deletes
//! - One [`Grammar`] per dialect (PostgreSQL, MySQL/MariaDB, SQLite,
//!   SQL Server) that compiles the AST into SQL with positional bindings
//! - A [`schema::Blueprint`] of columns and commands compiled into DDL by a
//!   [`SchemaGrammar`]
//! - [`Processor`]s that normalize catalog rows from a [`Connection`]
//!
//! ## Building queries
//!
//! Values never appear in the SQL text; they are collected in clause order
//! and returned next to it:
//!
//! ```rust
//! use oxide_grammar::{Grammar, Operator, PostgresGrammar, QueryBuilder};
//!
//! let query = QueryBuilder::table("users")
//!     .select(["id", "name"])
//!     .where_("name", Operator::Eq, "'; DROP TABLE users; --");
//!
//! let compiled = PostgresGrammar::new().compile_select(&query).unwrap();
//! assert_eq!(compiled.sql, r#"SELECT "id", "name" FROM "users" WHERE "name" = ?"#);
//! assert_eq!(compiled.bindings.len(), 1);
//! ```
//!
//! ## Choosing a dialect at runtime
//!
//! [`GrammarConfig`] selects the grammar pair once, from configuration:
//!
//! ```rust
//! use oxide_grammar::{Dialect, GrammarConfig, QueryBuilder};
//!
//! let config = GrammarConfig::new(Dialect::SqlServer);
//! let grammar = config.query_grammar().unwrap();
//! let compiled = grammar
//!     .compile_select(&QueryBuilder::table("users").limit(10))
//!     .unwrap();
//! assert_eq!(compiled.sql, "SELECT TOP 10 * FROM [users]");
//! ```

pub mod condition;
pub mod config;
pub mod connection;
mod error;
mod expression;
pub mod grammar;
mod operator;
pub mod processor;
pub mod query;
pub mod schema;
pub mod value;

pub use condition::ConditionClause;
pub use config::{Dialect, GrammarConfig, ServerVersion};
pub use connection::{Connection, Row};
pub use error::{Error, Result};
pub use expression::{raw, Expression};
pub use grammar::{Grammar, MySqlGrammar, PostgresGrammar, SqlServerGrammar, SqliteGrammar};
pub use operator::Operator;
pub use processor::Processor;
pub use query::{CompiledQuery, QueryBuilder};
pub use schema::{Blueprint, SchemaBuilder, SchemaGrammar};
pub use value::SqlValue;
