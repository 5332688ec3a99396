// ABOUTME: In-memory session that replays canned results (test only)
// ABOUTME: Records every statement so tests can assert on batch count and shape

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;

use super::{RawRow, RowCursor, Session};
use crate::error::{ExtractError, Result};

/// What the next `query` call should produce.
pub(crate) enum Reply {
    Rows {
        columns: Vec<String>,
        rows: Vec<RawRow>,
    },
    /// Rows are delivered, then fetching the next one fails.
    RowsThenError {
        columns: Vec<String>,
        rows: Vec<RawRow>,
        message: String,
    },
    Error(String),
}

impl Reply {
    pub(crate) fn rows(columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        Reply::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.into_iter().map(text_row).collect(),
        }
    }

    pub(crate) fn error(message: &str) -> Self {
        Reply::Error(message.to_string())
    }
}

pub(crate) fn text_row(values: Vec<Option<&str>>) -> RawRow {
    values
        .into_iter()
        .map(|v| v.map(|s| s.as_bytes().to_vec()))
        .collect()
}

#[derive(Default)]
pub(crate) struct ScriptedSession {
    replies: VecDeque<Reply>,
    pub statements: Vec<String>,
    pub isolation_requests: usize,
    pub fail_isolation: bool,
    closed: Rc<Cell<bool>>,
}

impl ScriptedSession {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            ..Default::default()
        }
    }

    /// Shared flag that flips once `close` runs; `close` consumes the session.
    pub(crate) fn closed_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.closed)
    }
}

#[async_trait(?Send)]
impl Session for ScriptedSession {
    async fn set_read_uncommitted(&mut self) -> Result<()> {
        self.isolation_requests += 1;
        if self.fail_isolation {
            return Err(ExtractError::connection(
                "failed to set isolation level",
                "access denied",
            ));
        }
        Ok(())
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn RowCursor + 'a>> {
        self.statements.push(sql.to_string());
        let reply = self
            .replies
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for: {sql}"));

        match reply {
            Reply::Rows { columns, rows } => Ok(Box::new(ScriptedRows {
                statement: sql.to_string(),
                columns,
                rows: rows.into(),
                current: None,
                trailing_error: None,
            })),
            Reply::RowsThenError {
                columns,
                rows,
                message,
            } => Ok(Box::new(ScriptedRows {
                statement: sql.to_string(),
                columns,
                rows: rows.into(),
                current: None,
                trailing_error: Some(message),
            })),
            Reply::Error(message) => Err(ExtractError::query(sql, message)),
        }
    }

    async fn close(self) -> Result<()> {
        self.closed.set(true);
        Ok(())
    }
}

struct ScriptedRows {
    statement: String,
    columns: Vec<String>,
    rows: VecDeque<RawRow>,
    current: Option<RawRow>,
    trailing_error: Option<String>,
}

#[async_trait(?Send)]
impl RowCursor for ScriptedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn advance(&mut self) -> Result<bool> {
        self.current = self.rows.pop_front();
        if self.current.is_none() {
            if let Some(message) = self.trailing_error.take() {
                return Err(ExtractError::query(self.statement.as_str(), message));
            }
        }
        Ok(self.current.is_some())
    }

    fn decode(&mut self) -> Result<RawRow> {
        self.current
            .take()
            .ok_or_else(|| ExtractError::Decode("no current row".to_string()))
    }
}
