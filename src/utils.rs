// ABOUTME: Identifier validation and quoting helpers
// ABOUTME: Table and column names cannot be bound as parameters, so they are allow-listed

use anyhow::{bail, Result};

/// MySQL identifier length limit (per qualified part).
const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate a MySQL/SQLite identifier (table, column, or `schema.table`)
///
/// Identifiers are spliced into SQL text because they cannot be sent as bound
/// parameters. Only a conservative allow-list is accepted:
///
/// - one or two dot-separated parts
/// - each part starts with a letter or underscore
/// - remaining characters are letters, digits, underscores or `$`
/// - each part is at most 64 characters
///
/// # Examples
///
/// ```
/// # use mysql_cursor_dump::utils::validate_identifier;
/// assert!(validate_identifier("orders").is_ok());
/// assert!(validate_identifier("shop.orders").is_ok());
/// assert!(validate_identifier("f_id").is_ok());
///
/// assert!(validate_identifier("1orders").is_err());
/// assert!(validate_identifier("a.b.c").is_err());
/// assert!(validate_identifier("orders; DROP TABLE orders").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        bail!("Identifier cannot be empty or whitespace-only");
    }

    let parts: Vec<&str> = identifier.split('.').collect();
    if parts.len() > 2 {
        bail!(
            "Identifier '{}' has too many qualifiers; use 'name' or 'schema.name'",
            sanitize_identifier(identifier)
        );
    }

    for part in parts {
        validate_identifier_part(identifier, part)?;
    }

    Ok(())
}

fn validate_identifier_part(full: &str, part: &str) -> Result<()> {
    let Some(first_char) = part.chars().next() else {
        bail!(
            "Identifier '{}' contains an empty name part",
            sanitize_identifier(full)
        );
    };

    if part.len() > MAX_IDENTIFIER_LEN {
        bail!(
            "Identifier '{}' exceeds maximum length of {} characters (got {})",
            sanitize_identifier(full),
            MAX_IDENTIFIER_LEN,
            part.len()
        );
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        bail!(
            "Identifier '{}' must start with a letter or underscore, not '{}'",
            sanitize_identifier(full),
            first_char
        );
    }

    for (i, c) in part.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '_' && c != '$' {
            bail!(
                "Identifier '{}' contains invalid character '{}' at position {}. \
                 Only letters, digits, underscores and '$' are allowed",
                sanitize_identifier(full),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            );
        }
    }

    Ok(())
}

/// Sanitize an identifier for display
///
/// Removes control characters and limits length to prevent log injection.
/// This is for error messages only, never for SQL.
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Quote a MySQL identifier (database, table, column)
///
/// MySQL uses backticks for identifier quoting. Escapes embedded backticks
/// by doubling them. SQLite accepts the same syntax.
///
/// # Examples
///
/// ```
/// use mysql_cursor_dump::utils::quote_mysql_ident;
/// assert_eq!(quote_mysql_ident("users"), "`users`");
/// assert_eq!(quote_mysql_ident("user`name"), "`user``name`");
/// ```
pub fn quote_mysql_ident(identifier: &str) -> String {
    let mut quoted = String::with_capacity(identifier.len() + 2);
    quoted.push('`');
    for ch in identifier.chars() {
        if ch == '`' {
            quoted.push('`');
        }
        quoted.push(ch);
    }
    quoted.push('`');
    quoted
}

/// Quote a possibly qualified name part by part: `shop.orders` becomes
/// `` `shop`.`orders` ``.
pub fn quote_qualified(identifier: &str) -> String {
    identifier
        .split('.')
        .map(quote_mysql_ident)
        .collect::<Vec<_>>()
        .join(".")
}
