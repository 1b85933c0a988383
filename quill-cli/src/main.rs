//! quill CLI - run statements against the quill blog database
//!
//! Every subcommand goes through the same context and transaction machinery
//! the application uses, so it doubles as a way to poke at the data layer:
//! - `exec`, `query`, `scalar`, `insert`: one statement each
//! - `tx`: several statements committed atomically
//! - `next-id`: a fresh primary key
//! - `config`: inspect the resolved configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quill_db::QuillConfig;
use tracing::debug;

mod commands;
mod tracing_setup;

use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    author,
    version,
    about = "Database console for the quill blog",
    long_about = "Run SQL against the quill database with lazy connections and reentrant \
                  transactions. Arguments bind to `?` placeholders: `null`, integers and \
                  reals are typed, everything else is text."
)]
struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, short = 'd', global = true, env = "QUILL_DATABASE_PATH")]
    database: Option<PathBuf>,

    /// Config file (default: ~/.quill/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a statement and print the number of affected rows
    Exec(commands::sql::StatementArgs),
    /// Run a query and print the rows as JSON
    Query(commands::sql::QueryArgs),
    /// Run a one-column query and print its first value
    Scalar(commands::sql::StatementArgs),
    /// Insert one row from COLUMN=VALUE pairs
    Insert(commands::sql::InsertArgs),
    /// Execute several statements in a single transaction
    Tx(commands::sql::TxArgs),
    /// Print a new time-ordered primary key
    NextId,
    /// Inspect configuration (show, path)
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Exec(args) => commands::sql::run_exec(&config, args),
        Commands::Query(args) => commands::sql::run_query(&config, args),
        Commands::Scalar(args) => commands::sql::run_scalar(&config, args),
        Commands::Insert(args) => commands::sql::run_insert(&config, args),
        Commands::Tx(args) => commands::sql::run_tx(&config, args),
        Commands::NextId => {
            println!("{}", quill_db::next_id());
            Ok(())
        }
        Commands::Config(args) => commands::config::run_config(&config, args),
    }
}

fn load_config(cli: &Cli) -> Result<QuillConfig> {
    let mut config = match &cli.config {
        Some(path) => QuillConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => QuillConfig::load().context("Failed to load config")?,
    };

    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    debug!(path = %config.database.path.display(), "resolved database");
    Ok(config)
}
