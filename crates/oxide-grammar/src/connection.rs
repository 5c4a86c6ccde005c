//! The executor contract consumed by the query and schema builders.
//!
//! A [`Connection`] runs compiled statements against a live database. This
//! crate ships no driver; applications wrap their driver of choice and hand
//! the builders a `&dyn Connection`.

use std::collections::BTreeMap;

use crate::config::ServerVersion;
use crate::error::Result;
use crate::grammar::Grammar;
use crate::processor::Processor;
use crate::query::CompiledQuery;
use crate::schema::SchemaGrammar;
use crate::value::SqlValue;

/// A result row keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;

/// Executes compiled statements.
///
/// Implementations choose their grammar once, usually from a
/// [`GrammarConfig`](crate::GrammarConfig), and report driver failures as
/// [`Error::Connection`](crate::Error::Connection).
pub trait Connection {
    /// Query grammar for this connection's dialect.
    fn grammar(&self) -> &dyn Grammar;

    /// Schema grammar for this connection's dialect.
    fn schema_grammar(&self) -> &dyn SchemaGrammar;

    /// Result post-processor.
    fn processor(&self) -> &dyn Processor;

    /// Runs a query and returns its rows.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn select(&self, query: &CompiledQuery) -> Result<Vec<Row>>;

    /// Runs a statement, returning whether it succeeded.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn statement(&self, query: &CompiledQuery) -> Result<bool>;

    /// Runs a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn affecting_statement(&self, query: &CompiledQuery) -> Result<u64>;

    /// Runs an INSERT.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn insert(&self, query: &CompiledQuery) -> Result<bool> {
        self.statement(query)
    }

    /// Key generated by the last INSERT, if the driver reports one.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn last_insert_id(&self) -> Result<Option<i64>>;

    /// Version string reported by the server, e.g. `8.0.36` or
    /// `5.5.5-10.11.6-MariaDB`.
    fn server_version(&self) -> Option<String> {
        None
    }

    /// Parsed [`Connection::server_version`].
    fn parsed_server_version(&self) -> Option<ServerVersion> {
        self.server_version()
            .and_then(|version| ServerVersion::parse(&version).ok())
    }

    /// Renders a value as a literal for statements that cannot be bound.
    ///
    /// # Errors
    ///
    /// Values with no literal form.
    fn escape(&self, value: &SqlValue) -> Result<String> {
        self.grammar().escape(value)
    }

    /// Quotes a single identifier.
    fn escape_identifier(&self, name: &str) -> String {
        self.grammar().base().wrap_value(name)
    }
}
