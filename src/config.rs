// ABOUTME: Validated, immutable extraction parameters
// ABOUTME: Raw ExtractionParams are checked once and frozen into an ExtractionConfig

use crate::error::{ExtractError, Result};
use crate::utils::validate_identifier;

/// Default output delimiter between values.
pub const DEFAULT_DELIMITER: &str = "\t";

/// Field entry that selects every column. Passed through unquoted.
pub const ALL_FIELDS: &str = "*";

/// Unvalidated extraction parameters, as collected from the command line.
///
/// Empty strings mean "not set" for `predicate` and `cursor_field`, matching
/// how the flags behave when given an empty value.
#[derive(Debug, Clone)]
pub struct ExtractionParams {
    pub table: String,
    pub fields: Vec<String>,
    pub predicate: String,
    pub cursor_field: String,
    pub initial_cursor: i64,
    pub batch_size: i64,
    pub delimiter: String,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            table: String::new(),
            fields: Vec::new(),
            predicate: String::new(),
            cursor_field: String::new(),
            initial_cursor: 0,
            batch_size: 1,
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl ExtractionParams {
    /// Check every parameter and freeze the result.
    ///
    /// Runs before any connection is opened; every failure is
    /// [`ExtractError::Config`].
    pub fn validate(self) -> Result<ExtractionConfig> {
        if self.batch_size < 1 {
            return Err(ExtractError::Config(format!(
                "batch size must be at least 1 (got {})",
                self.batch_size
            )));
        }

        let table = self.table.trim().to_string();
        if table.is_empty() {
            return Err(ExtractError::Config("table name not set".to_string()));
        }
        validate_identifier(&table)
            .map_err(|e| ExtractError::Config(format!("invalid table name: {e}")))?;

        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            return Err(ExtractError::Config("field list not set".to_string()));
        }
        for field in &fields {
            if field == ALL_FIELDS {
                continue;
            }
            validate_identifier(field)
                .map_err(|e| ExtractError::Config(format!("invalid field name: {e}")))?;
        }

        let cursor_field = match self.cursor_field.trim() {
            "" => None,
            name => {
                validate_identifier(name).map_err(|e| {
                    ExtractError::Config(format!("invalid cursor field name: {e}"))
                })?;
                Some(name.to_string())
            }
        };

        let predicate = match self.predicate.trim() {
            "" => None,
            text => Some(text.to_string()),
        };

        let delimiter = unescape_delimiter(&self.delimiter);
        if delimiter.is_empty() {
            return Err(ExtractError::Config("delimiter cannot be empty".to_string()));
        }

        if cursor_field.is_none() && self.initial_cursor != 0 {
            tracing::warn!(
                "Initial cursor value {} ignored: no cursor field configured",
                self.initial_cursor
            );
        }

        Ok(ExtractionConfig {
            table,
            fields,
            predicate,
            cursor_field,
            initial_cursor: self.initial_cursor,
            batch_size: self.batch_size as u64,
            delimiter,
        })
    }
}

/// The parameter set for one run. Only constructible through
/// [`ExtractionParams::validate`], and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    table: String,
    fields: Vec<String>,
    predicate: Option<String>,
    cursor_field: Option<String>,
    initial_cursor: i64,
    batch_size: u64,
    delimiter: String,
}

impl ExtractionConfig {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn predicate(&self) -> Option<&str> {
        self.predicate.as_deref()
    }

    /// `None` disables cursor mode: a single unordered batch is read.
    pub fn cursor_field(&self) -> Option<&str> {
        self.cursor_field.as_deref()
    }

    pub fn cursor_mode(&self) -> bool {
        self.cursor_field.is_some()
    }

    /// Zero means "resolve from the table".
    pub fn initial_cursor(&self) -> i64 {
        self.initial_cursor
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

/// Interpret the usual backslash escapes so `--delimiter '\t'` means a tab.
///
/// Unknown escapes are kept literally.
pub fn unescape_delimiter(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
