// ABOUTME: CLI entry point for mysql-cursor-dump
// ABOUTME: Parses flags, sets up logging on stderr, and runs one extraction

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use mysql_cursor_dump::config::DEFAULT_DELIMITER;
use mysql_cursor_dump::session::mysql::{DEFAULT_CHARSET, DEFAULT_PORT};
use mysql_cursor_dump::{export, ExtractionParams, MySqlSession, MySqlSource, SqliteSession};

/// Rows go to stdout; SQL statements, the final row count and logs go to
/// stderr, so `2>/dev/null` keeps only the data.
#[derive(Parser)]
#[command(name = "mysql-cursor-dump")]
#[command(about = "Export a table in batches by paging on an increasing column", long_about = None)]
#[command(version, disable_help_flag = true)]
struct Cli {
    /// Print help
    #[arg(short = 'H', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Connect to the MySQL server on the given host
    #[arg(short = 'h', long, env = "MYSQL_HOST", required_unless_present = "sqlite")]
    host: Option<String>,
    /// The TCP/IP port number to use for the connection
    #[arg(short = 'P', long, env = "MYSQL_TCP_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// The MySQL user name to use when connecting to the server
    #[arg(short = 'u', long, env = "MYSQL_USER", required_unless_present = "sqlite")]
    user: Option<String>,
    /// The password to use when connecting to the server
    #[arg(short = 'p', long, env = "MYSQL_PWD", hide_env_values = true)]
    password: Option<String>,
    /// The database to use
    #[arg(short = 'n', long, required_unless_present = "sqlite")]
    database: Option<String>,
    /// Read from this SQLite database file instead of a MySQL server
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// The table to dump (`table` or `db.table`)
    #[arg(short = 't', long)]
    table: String,
    /// Fields to dump, separated by commas
    #[arg(long, value_delimiter = ',', required = true)]
    fields: Vec<String>,
    /// Raw SQL condition rows must match
    #[arg(long, default_value = "")]
    cond: String,
    /// Increasing integer field to page on; leave empty for a single batch
    #[arg(long, default_value = "")]
    incrfield: String,
    /// Export rows with incrfield greater than this value (0 = start at the table minimum)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    incr: i64,
    /// Character set for the client connection
    #[arg(long, default_value = DEFAULT_CHARSET)]
    charset: String,
    /// Separator between values; escapes like \t are understood
    #[arg(long, alias = "delmiter", default_value = DEFAULT_DELIMITER)]
    delimiter: String,
    /// Number of rows fetched per query
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    batch: i64,

    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log: String,
}

impl Cli {
    fn extraction_params(&self) -> ExtractionParams {
        ExtractionParams {
            table: self.table.clone(),
            fields: self.fields.clone(),
            predicate: self.cond.clone(),
            cursor_field: self.incrfield.clone(),
            initial_cursor: self.incr,
            batch_size: self.batch,
            delimiter: self.delimiter.clone(),
        }
    }

    fn mysql_source(&self) -> MySqlSource {
        MySqlSource {
            host: self.host.clone().unwrap_or_default(),
            port: self.port,
            user: self.user.clone().unwrap_or_default(),
            password: self.password.clone(),
            database: self.database.clone().unwrap_or_default(),
            charset: self.charset.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // 1. RUST_LOG environment variable has highest precedence
    // 2. --log flag is used if RUST_LOG is not set
    // Logs share stderr with the SQL trace; stdout carries rows only.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Validate everything before touching the database.
    let config = cli
        .extraction_params()
        .validate()
        .context("Invalid extraction parameters")?;

    match &cli.sqlite {
        Some(path) => {
            let session = SqliteSession::open(path).context("Failed to open SQLite source")?;
            export(session, &config).await
        }
        None => {
            let session = MySqlSession::connect(&cli.mysql_source())
                .await
                .context("Failed to connect to MySQL")?;
            export(session, &config).await
        }
    }
    .with_context(|| format!("Extraction from '{}' failed", config.table()))?;

    Ok(())
}
