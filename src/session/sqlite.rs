// ABOUTME: SQLite session backed by rusqlite
// ABOUTME: Lets the same extraction loop page through a local .db file

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::{Field, RawRow, RowCursor, Session};
use crate::error::{ExtractError, Result};

/// An open SQLite database.
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Open an existing database file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        tracing::info!("Opening SQLite database {}", path.display());

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ExtractError::connection(format!("failed to open {}", path.display()), e))?;

        Ok(Self { conn })
    }

    /// Wrap a connection the caller already opened.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

#[async_trait(?Send)]
impl Session for SqliteSession {
    async fn set_read_uncommitted(&mut self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA read_uncommitted = 1")
            .map_err(|e| ExtractError::connection("failed to set isolation level", e))
    }

    // rusqlite rows borrow their statement, so the batch is collected here and
    // walked afterwards. LIMIT bounds its size.
    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn RowCursor + 'a>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| ExtractError::query(sql, e))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt.query([]).map_err(|e| ExtractError::query(sql, e))?;
        let mut pending = VecDeque::new();
        while let Some(row) = rows.next().map_err(|e| ExtractError::query(sql, e))? {
            let mut fields = Vec::with_capacity(width);
            for idx in 0..width {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| ExtractError::Decode(format!("column {idx}: {e}")))?;
                fields.push(value_to_field(value));
            }
            pending.push_back(fields);
        }

        Ok(Box::new(SqliteRows {
            columns,
            pending,
            current: None,
        }))
    }

    async fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| ExtractError::connection("failed to close database", e))
    }
}

struct SqliteRows {
    columns: Vec<String>,
    pending: VecDeque<RawRow>,
    current: Option<RawRow>,
}

#[async_trait(?Send)]
impl RowCursor for SqliteRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn advance(&mut self) -> Result<bool> {
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn decode(&mut self) -> Result<RawRow> {
        self.current
            .take()
            .ok_or_else(|| ExtractError::Decode("no current row".to_string()))
    }
}

fn value_to_field(value: ValueRef<'_>) -> Field {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(n) => Some(n.to_string().into_bytes()),
        ValueRef::Real(n) => Some(n.to_string().into_bytes()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(bytes.to_vec()),
    }
}
