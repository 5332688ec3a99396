// ABOUTME: SQL text for each batch and for the starting-cursor lookup
// ABOUTME: Pure functions of the config and cursor value; no hidden state

use crate::config::{ExtractionConfig, ALL_FIELDS};
use crate::utils::quote_qualified;

// `*` is written table-qualified: MySQL rejects a bare `*` after another column.
fn render_field(table: &str, field: &str) -> String {
    if field == ALL_FIELDS {
        format!("{table}.*")
    } else {
        quote_qualified(field)
    }
}

fn select_list(config: &ExtractionConfig, table: &str) -> String {
    let mut columns = Vec::with_capacity(config.fields().len() + 1);
    if let Some(cursor) = config.cursor_field() {
        columns.push(quote_qualified(cursor));
    }
    columns.extend(config.fields().iter().map(|f| render_field(table, f)));
    columns.join(",")
}

/// Compose the statement for one batch.
///
/// Produces one of four shapes depending on whether cursor mode is on and a
/// predicate is set:
///
/// ```text
/// SELECT f FROM t LIMIT n
/// SELECT f FROM t WHERE pred LIMIT n
/// SELECT c,f FROM t WHERE c>v ORDER BY c LIMIT n
/// SELECT c,f FROM t WHERE c>v AND (pred) ORDER BY c LIMIT n
/// ```
///
/// `cursor` is ignored when cursor mode is off. The predicate is inserted
/// verbatim; whoever supplies it controls what it does.
pub fn build_batch_query(config: &ExtractionConfig, cursor: i64) -> String {
    let table = quote_qualified(config.table());
    let fields = select_list(config, &table);
    let limit = config.batch_size();

    match (config.cursor_field(), config.predicate()) {
        (None, None) => format!("SELECT {fields} FROM {table} LIMIT {limit}"),
        (None, Some(predicate)) => {
            format!("SELECT {fields} FROM {table} WHERE {predicate} LIMIT {limit}")
        }
        (Some(cursor_field), None) => {
            let c = quote_qualified(cursor_field);
            format!("SELECT {fields} FROM {table} WHERE {c}>{cursor} ORDER BY {c} LIMIT {limit}")
        }
        (Some(cursor_field), Some(predicate)) => {
            let c = quote_qualified(cursor_field);
            format!(
                "SELECT {fields} FROM {table} WHERE {c}>{cursor} AND ({predicate}) ORDER BY {c} LIMIT {limit}"
            )
        }
    }
}

/// Compose the lookup for the smallest cursor value matching the predicate.
///
/// Returns `None` when cursor mode is off.
pub fn build_min_cursor_query(config: &ExtractionConfig) -> Option<String> {
    let cursor_field = config.cursor_field()?;
    let c = quote_qualified(cursor_field);
    let table = quote_qualified(config.table());

    let filter = match config.predicate() {
        Some(predicate) => format!("{c} IS NOT NULL AND ({predicate})"),
        None => format!("{c} IS NOT NULL"),
    };

    Some(format!("SELECT {c} FROM {table} WHERE {filter} ORDER BY {c} LIMIT 1"))
}
