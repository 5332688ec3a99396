// ABOUTME: Database session abstraction used by the extraction loop
// ABOUTME: A session runs statements and hands back forward-only row cursors

pub mod mysql;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;

use crate::error::Result;

pub use mysql::{MySqlSession, MySqlSource};
pub use sqlite::SqliteSession;

/// One column value as returned by the server: raw bytes in the session
/// character set, or `None` for SQL NULL.
pub type Field = Option<Vec<u8>>;

/// One decoded row, columns in selection order.
pub type RawRow = Vec<Field>;

/// Forward-only view over a result set.
///
/// Call [`advance`](RowCursor::advance) until it returns `false`; after each
/// `true`, [`decode`](RowCursor::decode) yields the current row once.
#[async_trait(?Send)]
pub trait RowCursor {
    /// Column names of the result set, in order.
    fn columns(&self) -> &[String];

    /// Move to the next row. Returns `false` once the result set is exhausted.
    async fn advance(&mut self) -> Result<bool>;

    /// Take the current row as nullable byte strings.
    fn decode(&mut self) -> Result<RawRow>;
}

/// A single open connection, used by one run and never shared.
#[async_trait(?Send)]
pub trait Session {
    /// Switch the session to READ UNCOMMITTED (or the backend's equivalent)
    /// so extraction takes no read locks. Session-scoped; called once.
    async fn set_read_uncommitted(&mut self) -> Result<()>;

    /// Execute `sql` and return a cursor over its rows.
    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn RowCursor + 'a>>;

    /// Release the connection.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Take the first row of a result set and drain whatever follows it.
pub(crate) async fn first_row(cursor: &mut dyn RowCursor) -> Result<Option<RawRow>> {
    if !cursor.advance().await? {
        return Ok(None);
    }
    let row = cursor.decode()?;
    while cursor.advance().await? {}
    Ok(Some(row))
}
