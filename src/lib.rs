// ABOUTME: Library root for mysql-cursor-dump
// ABOUTME: Cursor-paged table extraction over a MySQL or SQLite session

pub mod config;
pub mod cursor;
pub mod error;
pub mod extractor;
pub mod query;
pub mod session;
pub mod utils;

use std::io::{BufWriter, Write};

pub use config::{ExtractionConfig, ExtractionParams};
pub use error::ExtractError;
pub use extractor::{ExtractionSummary, Extractor};
pub use session::{MySqlSession, MySqlSource, Session, SqliteSession};

/// Run one extraction with rows on stdout and diagnostics on stderr.
pub async fn export<S: Session>(
    session: S,
    config: &ExtractionConfig,
) -> error::Result<ExtractionSummary> {
    let stdout = std::io::stdout();
    let data = BufWriter::new(stdout.lock());
    export_to(session, config, data, std::io::stderr()).await
}

/// Run one extraction against `session`, then close it.
///
/// The session is closed whether or not the run succeeded. A close failure
/// after a successful run is only logged; the rows are already out.
pub async fn export_to<S: Session, D: Write, G: Write>(
    mut session: S,
    config: &ExtractionConfig,
    data: D,
    diag: G,
) -> error::Result<ExtractionSummary> {
    let result = Extractor::new(config, data, diag).run(&mut session).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close session: {}", e);
    }

    result
}
