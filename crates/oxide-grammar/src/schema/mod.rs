//! Table definitions and DDL compilation.
//!
//! A [`Blueprint`] records columns and commands for one table; a
//! [`SchemaGrammar`] turns it into DDL statements for its dialect.
//! [`SchemaBuilder`] runs those statements and the catalog queries through
//! a [`Connection`](crate::Connection).

mod blueprint;
mod builder;
mod column;
mod command;
mod grammar;

pub use blueprint::Blueprint;
pub use builder::SchemaBuilder;
pub use column::{ColumnDefinition, ColumnType, DefaultValue, FluentIndex};
pub use command::{Command, ForeignKeyAction, ForeignKeyDefinition, IndexCommand, IndexKind};
pub use grammar::{
    FluentCommand, Modifier, MySqlSchemaGrammar, PostgresSchemaGrammar, SchemaGrammar,
    SqlServerSchemaGrammar, SqliteSchemaGrammar,
};
