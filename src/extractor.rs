// ABOUTME: Cursor-paged extraction loop
// ABOUTME: Runs one bounded SELECT per batch, streams rows out, advances the cursor

use std::io::Write;

use crate::config::ExtractionConfig;
use crate::cursor::{parse_cursor_value, resolve_start_cursor};
use crate::error::{ExtractError, Result};
use crate::query::build_batch_query;
use crate::session::{Field, RowCursor, Session};

/// Written in place of SQL NULL so it can't be confused with an empty string.
pub const NULL_SENTINEL: &[u8] = b"NULL";

/// Running counters for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExtractionState {
    /// Rows emitted so far, across all batches.
    total_rows: u64,
    /// Strict lower bound for the next batch.
    cursor: i64,
    /// Rows emitted by the batch currently draining.
    batch_rows: u64,
    batches: u64,
    /// Cursor value of the last emitted row, if any row has been emitted in
    /// cursor mode.
    last_emitted: Option<i64>,
}

impl ExtractionState {
    fn new(cursor: i64) -> Self {
        Self {
            cursor,
            ..Default::default()
        }
    }

    fn begin_batch(&mut self) {
        self.batch_rows = 0;
        self.batches += 1;
    }

    /// Reject a cursor value lower than the last one emitted.
    fn check_cursor(&self, value: i64) -> Result<i64> {
        match self.last_emitted {
            Some(previous) if value < previous => Err(ExtractError::Decode(format!(
                "cursor went backwards from {} to {}; is the cursor field numeric?",
                previous, value
            ))),
            _ => Ok(value),
        }
    }

    fn set_cursor(&mut self, value: i64) {
        self.cursor = value;
        self.last_emitted = Some(value);
    }

    fn summary(&self) -> ExtractionSummary {
        ExtractionSummary {
            total_rows: self.total_rows,
            batches: self.batches,
            last_cursor: self.last_emitted,
        }
    }
}

/// What a finished run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub total_rows: u64,
    pub batches: u64,
    /// Feed this back as the initial cursor to continue where this run ended.
    pub last_cursor: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOutcome {
    /// The batch was full; more rows may follow the advanced cursor.
    Continue,
    Done,
}

/// Drives batches against one session.
///
/// Rows go to `data`, one line each. Every statement, and the final row
/// count, goes to `diag`. The two never mix.
pub struct Extractor<'c, D: Write, G: Write> {
    config: &'c ExtractionConfig,
    data: D,
    diag: G,
}

impl<'c, D: Write, G: Write> Extractor<'c, D, G> {
    pub fn new(config: &'c ExtractionConfig, data: D, diag: G) -> Self {
        Self { config, data, diag }
    }

    /// Run to completion.
    ///
    /// Requests non-locking reads, resolves the starting cursor, then pages
    /// through the table until a batch comes back short (cursor mode) or after
    /// the single batch (no cursor field). Any failure aborts the run; rows
    /// flushed before it remain valid.
    pub async fn run<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
    ) -> Result<ExtractionSummary> {
        session.set_read_uncommitted().await?;

        let start = if self.config.cursor_mode() {
            resolve_start_cursor(session, self.config, &mut self.diag).await?
        } else {
            0
        };

        let mut state = ExtractionState::new(start);
        tracing::debug!(
            "Starting extraction of {} (batch size {}, start cursor {})",
            self.config.table(),
            self.config.batch_size(),
            start
        );

        loop {
            let statement = build_batch_query(self.config, state.cursor);
            writeln!(self.diag, "{}", statement)?;
            self.diag.flush()?;

            state.begin_batch();
            let mut rows = session.query(&statement).await?;
            self.drain(rows.as_mut(), &mut state).await?;
            drop(rows);
            self.data.flush()?;

            tracing::debug!(
                "Batch {} emitted {} rows (total {}, cursor {})",
                state.batches,
                state.batch_rows,
                state.total_rows,
                state.cursor
            );

            if self.decide(&state) == BatchOutcome::Done {
                break;
            }
        }

        let summary = state.summary();
        tracing::info!(
            "Extracted {} rows from {} in {} batches",
            summary.total_rows,
            self.config.table(),
            summary.batches
        );
        if let Some(last) = summary.last_cursor {
            tracing::info!("Last cursor value: {}", last);
        }

        // The total is the last thing written to diag.
        writeln!(self.diag, "{}", state.total_rows)?;
        self.diag.flush()?;

        Ok(summary)
    }

    async fn drain(
        &mut self,
        rows: &mut dyn RowCursor,
        state: &mut ExtractionState,
    ) -> Result<()> {
        let width = rows.columns().len();

        while rows.advance().await? {
            let row = rows.decode()?;
            check_shape(&row, width)?;

            let cursor_value = if self.config.cursor_mode() {
                Some(state.check_cursor(parse_cursor_value(row[0].as_deref())?)?)
            } else {
                None
            };

            write_line(&mut self.data, &row, self.config.delimiter().as_bytes())?;

            if let Some(value) = cursor_value {
                state.set_cursor(value);
            }

            state.batch_rows += 1;
            state.total_rows += 1;
        }

        Ok(())
    }

    fn decide(&self, state: &ExtractionState) -> BatchOutcome {
        if !self.config.cursor_mode() || state.batch_rows < self.config.batch_size() {
            BatchOutcome::Done
        } else {
            BatchOutcome::Continue
        }
    }
}

fn check_shape(row: &[Field], width: usize) -> Result<()> {
    if row.is_empty() {
        return Err(ExtractError::Decode("row has no columns".to_string()));
    }
    if row.len() != width {
        return Err(ExtractError::Decode(format!(
            "row has {} columns, result set has {}",
            row.len(),
            width
        )));
    }
    Ok(())
}

/// Write one row as a single delimiter-joined line.
pub fn write_line<W: Write + ?Sized>(
    out: &mut W,
    row: &[Field],
    delimiter: &[u8],
) -> Result<()> {
    let mut line = Vec::new();
    for (idx, value) in row.iter().enumerate() {
        if idx > 0 {
            line.extend_from_slice(delimiter);
        }
        line.extend_from_slice(value.as_deref().unwrap_or(NULL_SENTINEL));
    }
    line.push(b'\n');
    out.write_all(&line)?;
    Ok(())
}
