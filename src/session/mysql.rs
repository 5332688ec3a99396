// ABOUTME: MySQL session backed by mysql_async
// ABOUTME: Streams text-protocol rows one at a time with query_iter

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, QueryResult, Row, TextProtocol, Value};

use super::{Field, RawRow, RowCursor, Session};
use crate::error::{ExtractError, Result};

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_CHARSET: &str = "latin1";

const READ_UNCOMMITTED: &str = "SET SESSION TRANSACTION ISOLATION LEVEL READ UNCOMMITTED";

/// Where to connect and how to talk to the server.
#[derive(Debug, Clone)]
pub struct MySqlSource {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub charset: String,
}

impl MySqlSource {
    /// Connection summary for logs. Never includes the password.
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("host", &self.host),
            ("user", &self.user),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                return Err(ExtractError::Config(format!("MySQL {name} not set")));
            }
        }

        // The charset ends up in `SET NAMES`, so keep it to a plain name.
        if self.charset.is_empty()
            || !self
                .charset
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ExtractError::Config(format!(
                "invalid character set '{}'",
                crate::utils::sanitize_identifier(&self.charset)
            )));
        }

        Ok(())
    }

    fn opts(&self) -> Result<OptsBuilder> {
        self.validate()?;
        Ok(OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(self.password.clone())
            .db_name(Some(self.database.clone()))
            .init(vec![format!("SET NAMES {}", self.charset)]))
    }
}

/// An open MySQL connection.
pub struct MySqlSession {
    conn: Conn,
}

impl MySqlSession {
    pub async fn connect(source: &MySqlSource) -> Result<Self> {
        let opts = source.opts()?;

        tracing::info!("Connecting to MySQL at {}", source.describe());
        let conn = Conn::new(opts).await.map_err(|e| {
            ExtractError::connection(format!("failed to connect to {}", source.describe()), e)
        })?;

        tracing::debug!("Connected (charset {})", source.charset);
        Ok(Self { conn })
    }
}

#[async_trait(?Send)]
impl Session for MySqlSession {
    async fn set_read_uncommitted(&mut self) -> Result<()> {
        self.conn
            .query_drop(READ_UNCOMMITTED)
            .await
            .map_err(|e| ExtractError::connection("failed to set isolation level", e))
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<Box<dyn RowCursor + 'a>> {
        let result = self
            .conn
            .query_iter(sql.to_string())
            .await
            .map_err(|e| ExtractError::query(sql, e))?;

        let columns = result
            .columns_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();

        Ok(Box::new(MySqlRows {
            statement: sql.to_string(),
            result,
            columns,
            current: None,
        }))
    }

    async fn close(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| ExtractError::connection("failed to close connection", e))
    }
}

struct MySqlRows<'a> {
    statement: String,
    result: QueryResult<'a, 'static, TextProtocol>,
    columns: Vec<String>,
    current: Option<Row>,
}

#[async_trait(?Send)]
impl RowCursor for MySqlRows<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn advance(&mut self) -> Result<bool> {
        self.current = self
            .result
            .next()
            .await
            .map_err(|e| ExtractError::query(self.statement.as_str(), e))?;
        Ok(self.current.is_some())
    }

    fn decode(&mut self) -> Result<RawRow> {
        let row = self
            .current
            .take()
            .ok_or_else(|| ExtractError::Decode("no current row".to_string()))?;

        (0..row.len())
            .map(|idx| {
                row.as_ref(idx).map(value_to_field).ok_or_else(|| {
                    ExtractError::Decode(format!("column {idx} missing from row"))
                })
            })
            .collect()
    }
}

/// Render a MySQL value the way the text protocol would have sent it.
fn value_to_field(value: &Value) -> Field {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(bytes.clone()),
        Value::Int(n) => Some(n.to_string().into_bytes()),
        Value::UInt(n) => Some(n.to_string().into_bytes()),
        Value::Float(n) => Some(n.to_string().into_bytes()),
        Value::Double(n) => Some(n.to_string().into_bytes()),
        Value::Date(year, month, day, hour, min, sec, micro) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, min, sec
            );
            if *micro > 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            Some(text.into_bytes())
        }
        Value::Time(negative, days, hours, mins, secs, micro) => {
            let sign = if *negative { "-" } else { "" };
            let total_hours = *days * 24 + u32::from(*hours);
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, mins, secs);
            if *micro > 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            Some(text.into_bytes())
        }
    }
}
