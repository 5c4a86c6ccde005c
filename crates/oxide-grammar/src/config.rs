//! Grammar configuration.
//!
//! A [`GrammarConfig`] names the target dialect plus the connection-level
//! settings that change generated SQL: the server version (which gates
//! features such as window functions or upsert row aliases), a table
//! prefix, and the MySQL table defaults.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grammar::{Grammar, MySqlGrammar, PostgresGrammar, SqlServerGrammar, SqliteGrammar};
use crate::processor::{
    MySqlProcessor, PostgresProcessor, Processor, SqlServerProcessor, SqliteProcessor,
};
use crate::schema::{
    MySqlSchemaGrammar, PostgresSchemaGrammar, SchemaGrammar, SqlServerSchemaGrammar,
    SqliteSchemaGrammar,
};

/// A supported database family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    MySql,
    /// MariaDB, compiled with the MySQL grammar.
    MariaDb,
    /// SQLite.
    Sqlite,
    /// Microsoft SQL Server.
    SqlServer,
}

impl Dialect {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlsrv",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "sqlsrv" | "sqlserver" | "mssql" => Ok(Self::SqlServer),
            other => Err(Error::construction(
                "dialect",
                format!("unknown dialect '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Dialect> for String {
    fn from(dialect: Dialect) -> Self {
        dialect.as_str().to_string()
    }
}

/// A database server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component, `0` when absent.
    pub patch: u32,
    /// The server identified itself as MariaDB.
    pub mariadb: bool,
}

impl ServerVersion {
    /// Creates a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            mariadb: false,
        }
    }

    /// Marks the version as a MariaDB server.
    #[must_use]
    pub const fn mariadb(mut self) -> Self {
        self.mariadb = true;
        self
    }

    /// Parses a version string as reported by a server, such as
    /// `8.0.36`, `PostgreSQL 16.2 on x86_64` or `5.5.5-10.11.6-MariaDB`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] when no `major.minor` pair is found.
    pub fn parse(input: &str) -> Result<Self> {
        let mariadb = input.to_ascii_lowercase().contains("mariadb");
        // MariaDB prefixes its real version with a fake 5.5.5 for replication.
        let text = if mariadb {
            input.strip_prefix("5.5.5-").unwrap_or(input)
        } else {
            input
        };
        let pattern = Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?")
            .map_err(|e| Error::construction("server version", e.to_string()))?;
        let captures = pattern.captures(text).ok_or_else(|| {
            Error::construction("server version", format!("cannot read '{input}'"))
        })?;
        let number = |index: usize| -> Result<u32> {
            captures.get(index).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| Error::construction("server version", format!("cannot read '{input}'")))
            })
        };
        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            mariadb,
        })
    }

    /// Returns `true` when this version is `major.minor.patch` or newer.
    #[must_use]
    pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.mariadb {
            f.write_str("-MariaDB")?;
        }
        Ok(())
    }
}

impl FromStr for ServerVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Settings that select and tune a grammar.
///
/// ```rust
/// use oxide_grammar::GrammarConfig;
///
/// let config = GrammarConfig::from_json(
///     r#"{"dialect": "mysql", "server_version": "8.0.36", "table_prefix": "app_"}"#,
/// )
/// .unwrap();
/// let grammar = config.query_grammar().unwrap();
/// assert_eq!(grammar.wrap_table("users"), "`app_users`");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Target dialect.
    pub dialect: Dialect,
    /// Server version string; newest behavior is assumed when absent.
    #[serde(default)]
    pub server_version: Option<String>,
    /// Prefix prepended to every table name.
    #[serde(default)]
    pub table_prefix: String,
    /// Default schema for introspection queries.
    #[serde(default)]
    pub schema: Option<String>,
    /// MySQL default character set for created tables.
    #[serde(default)]
    pub charset: Option<String>,
    /// MySQL default collation for created tables.
    #[serde(default)]
    pub collation: Option<String>,
    /// MySQL storage engine for created tables.
    #[serde(default)]
    pub engine: Option<String>,
}

impl GrammarConfig {
    /// Creates a configuration with defaults for `dialect`.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            server_version: None,
            table_prefix: String::new(),
            schema: None,
            charset: None,
            collation: None,
            engine: None,
        }
    }

    /// Reads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] when the document is not a valid
    /// configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::construction("grammar config", e.to_string()))
    }

    /// Sets the server version string.
    #[must_use]
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = Some(version.into());
        self
    }

    /// Sets the table prefix.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Sets the default schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Parses the configured server version.
    ///
    /// MariaDB configurations are flagged as MariaDB even when the version
    /// string does not say so.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] for unreadable version strings.
    pub fn version(&self) -> Result<Option<ServerVersion>> {
        let Some(text) = &self.server_version else {
            return Ok((self.dialect == Dialect::MariaDb)
                .then(|| ServerVersion::new(u32::MAX, 0, 0).mariadb()));
        };
        let version = ServerVersion::parse(text)?;
        Ok(Some(if self.dialect == Dialect::MariaDb {
            version.mariadb()
        } else {
            version
        }))
    }

    /// Builds the query grammar for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] for unreadable version strings.
    pub fn query_grammar(&self) -> Result<Box<dyn Grammar>> {
        let version = self.version()?;
        let prefix = self.table_prefix.clone();
        Ok(match self.dialect {
            Dialect::Postgres => Box::new(
                PostgresGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version),
            ),
            Dialect::MySql | Dialect::MariaDb => Box::new(
                MySqlGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version),
            ),
            Dialect::Sqlite => Box::new(
                SqliteGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version),
            ),
            Dialect::SqlServer => Box::new(
                SqlServerGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version),
            ),
        })
    }

    /// Builds the schema grammar for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Construction`] for unreadable version strings.
    pub fn schema_grammar(&self) -> Result<Box<dyn SchemaGrammar>> {
        let version = self.version()?;
        let prefix = self.table_prefix.clone();
        Ok(match self.dialect {
            Dialect::Postgres => Box::new(
                PostgresSchemaGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version)
                    .with_schema(self.schema.clone()),
            ),
            Dialect::MySql | Dialect::MariaDb => Box::new(
                MySqlSchemaGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version)
                    .with_schema(self.schema.clone())
                    .with_table_defaults(
                        self.charset.clone(),
                        self.collation.clone(),
                        self.engine.clone(),
                    ),
            ),
            Dialect::Sqlite => Box::new(
                SqliteSchemaGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version)
                    .with_schema(self.schema.clone()),
            ),
            Dialect::SqlServer => Box::new(
                SqlServerSchemaGrammar::new()
                    .with_table_prefix(prefix)
                    .with_version(version)
                    .with_schema(self.schema.clone()),
            ),
        })
    }

    /// Builds the result processor for this configuration.
    #[must_use]
    pub fn processor(&self) -> Box<dyn Processor> {
        match self.dialect {
            Dialect::Postgres => Box::new(PostgresProcessor::new()),
            Dialect::MySql | Dialect::MariaDb => Box::new(MySqlProcessor::new()),
            Dialect::Sqlite => Box::new(SqliteProcessor::new()),
            Dialect::SqlServer => Box::new(SqlServerProcessor::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_aliases() {
        assert_eq!("pgsql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("SQLSRV".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert_eq!("sqlserver".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_parse_mysql_version() {
        let version = ServerVersion::parse("8.0.19-0ubuntu0.20.04.1").unwrap();
        assert_eq!(version, ServerVersion::new(8, 0, 19));
        assert!(version.at_least(8, 0, 11));
        assert!(!version.at_least(8, 1, 0));
    }

    #[test]
    fn test_parse_mariadb_version() {
        let version = ServerVersion::parse("5.5.5-10.11.6-MariaDB-1:10.11.6+maria~ubu2204").unwrap();
        assert!(version.mariadb);
        assert_eq!((version.major, version.minor, version.patch), (10, 11, 6));
    }

    #[test]
    fn test_parse_postgres_banner() {
        let version = ServerVersion::parse("PostgreSQL 16.2 on x86_64-pc-linux-gnu").unwrap();
        assert_eq!(version, ServerVersion::new(16, 2, 0));
    }

    #[test]
    fn test_unreadable_version() {
        assert!(ServerVersion::parse("unknown").is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config = GrammarConfig::from_json(r#"{"dialect": "mariadb", "server_version": "10.6.4"}"#)
            .unwrap();
        assert_eq!(config.dialect, Dialect::MariaDb);
        assert!(config.version().unwrap().unwrap().mariadb);
        assert!(config.table_prefix.is_empty());
    }

    #[test]
    fn test_config_rejects_unknown_dialect() {
        let err = GrammarConfig::from_json(r#"{"dialect": "oracle"}"#).unwrap_err();
        assert!(matches!(err, Error::Construction { context: "grammar config", .. }));
    }
}
