//! Command-line adapter over `catalog_core`.
//!
//! # Responsibility
//! - Parse catalog commands and print products as JSON.
//! - Map catalog outcomes to exit codes: validation 2, not found 3,
//!   everything else 1.

use catalog_core::db::{open_db_in_memory_with, open_db_with};
use catalog_core::{
    init_logging, CatalogConfig, CatalogError, CatalogErrorKind, CatalogStore, ConfigError,
    DbError, LoggingError, ProductDraft, ProductId, RepoError, SqliteProductRepository,
};
use clap::{Parser, Subcommand};
use log::info;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(version)]
#[command(about = "Manage products in a catalog store", long_about = None)]
struct Cli {
    /// SQLite database file (overrides CATALOG_DB_PATH); in-memory when unset
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Directory for rolling log files (overrides CATALOG_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Log level (overrides CATALOG_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all products ordered by id
    #[command(visible_alias = "ls")]
    List,
    /// Show one product
    Get { id: ProductId },
    /// Create a product
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        inventory: i32,
    },
    /// Replace name, price and inventory of a product
    Update {
        id: ProductId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        inventory: i32,
    },
    /// Add a (possibly negative) delta to a product's inventory
    Adjust {
        id: ProductId,
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },
    /// Delete a product
    #[command(visible_alias = "rm")]
    Delete { id: ProductId },
    /// Check core linkage
    Ping,
    /// Print the core version
    Version,
}

#[derive(Debug)]
enum CliError {
    Catalog(CatalogError),
    Config(ConfigError),
    Logging(LoggingError),
    Output(serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Catalog(err) => match err.kind() {
                CatalogErrorKind::Validation => 2,
                CatalogErrorKind::NotFound => 3,
                CatalogErrorKind::Internal => 1,
            },
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(err) => write!(f, "logging error: {err}"),
            Self::Output(err) => write!(f, "failed to encode output: {err}"),
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Catalog(value.into())
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Catalog(RepoError::from(value).into())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Ping => {
            println!("catalog_core ping={}", catalog_core::ping());
            return Ok(());
        }
        Commands::Version => {
            println!("catalog_core version={}", catalog_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let mut config = CatalogConfig::from_env().map_err(CliError::Config)?;
    if cli.db.is_some() {
        config.db_path = cli.db;
    }
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(CliError::Logging)?;
    }

    let conn = open_connection(&config)?;
    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn)?);
    info!("event=cli_command module=cli status=start");

    match cli.command {
        Commands::List => print_json(&store.list_products()?),
        Commands::Get { id } => print_json(&store.get_product(id)?),
        Commands::Create {
            name,
            price,
            inventory,
        } => print_json(&store.create_product(&ProductDraft::new(name, price, inventory))?),
        Commands::Update {
            id,
            name,
            price,
            inventory,
        } => print_json(&store.update_product(id, &ProductDraft::new(name, price, inventory))?),
        Commands::Adjust { id, delta } => print_json(&store.adjust_inventory(id, delta)?),
        Commands::Delete { id } => {
            store.delete_product(id)?;
            Ok(())
        }
        Commands::Ping | Commands::Version => Ok(()),
    }
}

fn open_connection(config: &CatalogConfig) -> Result<Connection, CliError> {
    let conn = match &config.db_path {
        Some(path) => open_db_with(path, &config.db_options())?,
        None => open_db_in_memory_with(&config.db_options())?,
    };
    Ok(conn)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::Output)?;
    println!("{rendered}");
    Ok(())
}
