//! oxide-grammar CLI
//!
//! Compiles JSON table blueprints into DDL and prints catalog queries for a
//! chosen SQL dialect.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use oxide_grammar::{Blueprint, Dialect, GrammarConfig};

/// Multi-dialect DDL compiler.
#[derive(Parser)]
#[command(name = "oxide-grammar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target dialect (postgres, mysql, mariadb, sqlite, sqlsrv).
    #[arg(short, long, env = "OXIDE_GRAMMAR_DIALECT")]
    dialect: Option<Dialect>,

    /// Server version string, e.g. `8.0.36` or `10.11.6-MariaDB`.
    #[arg(long)]
    server_version: Option<String>,

    /// Prefix prepended to every table name.
    #[arg(short, long)]
    prefix: Option<String>,

    /// Grammar configuration file (JSON). Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON blueprint into DDL statements.
    Schema {
        /// Blueprint file.
        blueprint: PathBuf,
    },

    /// Print the catalog query for a kind of schema object.
    Introspect {
        /// What to list.
        kind: CatalogKind,

        /// Table to inspect; `schema.table` selects another schema.
        table: Option<String>,

        /// Schema to list tables and views from.
        #[arg(short, long)]
        schema: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CatalogKind {
    Tables,
    Views,
    Columns,
    Indexes,
    ForeignKeys,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = resolve_config(&cli)?;
    info!(dialect = %config.dialect, prefix = %config.table_prefix, "compiling");

    let statements = match &cli.command {
        Commands::Schema { blueprint } => compile_blueprint(&config, blueprint)?,
        Commands::Introspect {
            kind,
            table,
            schema,
        } => vec![catalog_query(
            &config,
            *kind,
            table.as_deref(),
            schema.as_deref(),
        )?],
    };

    for statement in &statements {
        println!("{statement};");
    }
    Ok(())
}

/// Reads the config file, if any, and applies command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<GrammarConfig> {
    let mut config = match (&cli.config, cli.dialect) {
        (Some(path), _) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            GrammarConfig::from_json(&json)?
        }
        (None, Some(dialect)) => GrammarConfig::new(dialect),
        (None, None) => bail!("no dialect given; pass --dialect or --config"),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    if let Some(version) = &cli.server_version {
        config.server_version = Some(version.clone());
    }
    if let Some(prefix) = &cli.prefix {
        config.table_prefix.clone_from(prefix);
    }
    Ok(config)
}

fn compile_blueprint(config: &GrammarConfig, path: &Path) -> anyhow::Result<Vec<String>> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let blueprint: Blueprint = serde_json::from_str(&json)
        .with_context(|| format!("parsing blueprint {}", path.display()))?;
    debug!(
        table = blueprint.table(),
        columns = blueprint.columns().len(),
        commands = blueprint.commands().len(),
        "blueprint loaded"
    );
    let grammar = config.schema_grammar()?;
    Ok(blueprint.to_sql(grammar.as_ref())?)
}

fn catalog_query(
    config: &GrammarConfig,
    kind: CatalogKind,
    table: Option<&str>,
    schema: Option<&str>,
) -> anyhow::Result<String> {
    let grammar = config.schema_grammar()?;
    let table = || table.context("this catalog query needs a table name");
    let sql = match kind {
        CatalogKind::Tables => grammar.compile_tables(schema)?,
        CatalogKind::Views => grammar.compile_views(schema)?,
        CatalogKind::Columns => grammar.compile_columns(schema, table()?)?,
        CatalogKind::Indexes => grammar.compile_indexes(schema, table()?)?,
        CatalogKind::ForeignKeys => grammar.compile_foreign_keys(schema, table()?)?,
    };
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn blueprint_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("oxide-grammar").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_schema_compiles_blueprint() {
        let file = blueprint_file(
            r#"{
                "table": "users",
                "commands": [{"command": "create"}],
                "columns": [
                    {"name": "id", "kind": "big_integer", "auto_increment": true, "unsigned": true},
                    {"name": "email", "kind": "string", "length": 120}
                ]
            }"#,
        );
        let config = GrammarConfig::new(Dialect::Sqlite);
        let statements = compile_blueprint(&config, file.path()).unwrap();
        assert_eq!(
            statements,
            vec![
                r#"CREATE TABLE "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, "email" VARCHAR NOT NULL)"#
            ]
        );
    }

    #[test]
    fn test_invalid_blueprint_names_the_file() {
        let file = blueprint_file(r#"{"table": "users", "commands": [{"command": "explode"}]}"#);
        let err = compile_blueprint(&GrammarConfig::new(Dialect::Postgres), file.path())
            .unwrap_err();
        assert!(err.to_string().starts_with("parsing blueprint"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = blueprint_file(r#"{"dialect": "mysql", "table_prefix": "app_"}"#);
        let path = file.path().to_str().unwrap();

        let config = resolve_config(&cli(&["--config", path, "introspect", "tables"])).unwrap();
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.table_prefix, "app_");

        let config = resolve_config(&cli(&[
            "--config", path, "--dialect", "pgsql", "--prefix", "", "introspect", "tables",
        ]))
        .unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert!(config.table_prefix.is_empty());
    }

    #[test]
    fn test_dialect_is_required() {
        assert!(resolve_config(&cli(&["schema", "users.json"])).is_err());
    }

    #[test]
    fn test_catalog_query_needs_table() {
        let config = GrammarConfig::new(Dialect::Sqlite);
        assert!(catalog_query(&config, CatalogKind::Columns, None, None).is_err());
        let sql = catalog_query(&config, CatalogKind::Columns, Some("users"), None).unwrap();
        assert!(sql.contains("pragma_table_xinfo('users')"));
        let sql = catalog_query(&config, CatalogKind::Tables, None, None).unwrap();
        assert!(sql.contains("pragma_table_list"));
    }

    #[test]
    fn test_kebab_case_kind() {
        let parsed = cli(&["--dialect", "mysql", "introspect", "foreign-keys", "posts"]);
        assert!(matches!(
            parsed.command,
            Commands::Introspect {
                kind: CatalogKind::ForeignKeys,
                ..
            }
        ));
    }
}
