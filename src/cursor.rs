// ABOUTME: Starting-cursor resolution and cursor value parsing
// ABOUTME: Explicit start values win; otherwise the table's minimum is looked up

use std::io::Write;

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};
use crate::query::build_min_cursor_query;
use crate::session::{first_row, Session};

/// Determine the strict lower bound for the first batch.
///
/// A non-zero configured start is returned as-is without touching the
/// database. Zero means "look it up": the smallest cursor value matching the
/// predicate is fetched, or 0 if nothing matches.
///
/// The first batch filters with `cursor > start`, so when the start comes
/// from this lookup the row holding the minimum is not exported.
///
/// A failed lookup is an error. It never falls back to 0.
pub async fn resolve_start_cursor<S: Session + ?Sized>(
    session: &mut S,
    config: &ExtractionConfig,
    diag: &mut dyn Write,
) -> Result<i64> {
    let explicit = config.initial_cursor();
    if explicit != 0 {
        tracing::debug!("Using configured start cursor {}", explicit);
        return Ok(explicit);
    }

    let Some(statement) = build_min_cursor_query(config) else {
        return Ok(0);
    };

    writeln!(diag, "{}", statement)?;
    diag.flush()?;

    let mut cursor = session.query(&statement).await?;
    let start = match first_row(cursor.as_mut()).await? {
        Some(row) => parse_cursor_value(row.first().and_then(|v| v.as_deref()))?,
        None => 0,
    };

    tracing::info!("Resolved start cursor {} from table minimum", start);
    Ok(start)
}

/// Parse a cursor column value as a signed 64-bit integer.
pub fn parse_cursor_value(value: Option<&[u8]>) -> Result<i64> {
    let bytes = value.ok_or_else(|| ExtractError::Decode("cursor value is NULL".to_string()))?;

    let text = std::str::from_utf8(bytes).map_err(|_| {
        ExtractError::Decode(format!(
            "cursor value is not valid text: {}",
            String::from_utf8_lossy(bytes)
        ))
    })?;

    text.trim().parse::<i64>().map_err(|e| {
        ExtractError::Decode(format!("cursor value '{}' is not an integer: {}", text, e))
    })
}
