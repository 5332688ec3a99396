// ABOUTME: Error taxonomy for the extraction core
// ABOUTME: Config, connection, query, decode and output failures are all fatal

use thiserror::Error;

/// Boxed driver error, so both MySQL and SQLite failures fit the same variants.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can stop an extraction run.
///
/// None of these are retried. Rows written to the data channel before the
/// failure stay valid; the caller can resume from the last cursor it saw.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A parameter was missing or invalid. Raised before any database work.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Opening the session or changing a session setting failed.
    #[error("Connection error: {context}")]
    Connection {
        context: String,
        #[source]
        source: DriverError,
    },

    /// A statement failed to execute, or fetching its next row failed.
    #[error("Query failed: {statement}")]
    Query {
        statement: String,
        #[source]
        source: DriverError,
    },

    /// A row did not have the expected shape or its cursor value was unusable.
    #[error("Failed to decode row: {0}")]
    Decode(String),

    /// Writing to the data or diagnostic channel failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

impl ExtractError {
    pub fn connection(context: impl Into<String>, source: impl Into<DriverError>) -> Self {
        ExtractError::Connection {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn query(statement: impl Into<String>, source: impl Into<DriverError>) -> Self {
        ExtractError::Query {
            statement: statement.into(),
            source: source.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_config(&self) -> bool {
        matches!(self, ExtractError::Config(_))
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
