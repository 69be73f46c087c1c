//! SQLite reader built on rusqlite

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, Statement};

use super::connection::{parse_connection_string, ConnectionInfo, SqliteTarget};
use super::Reader;
use crate::data::{QueryParams, Row, Value};
use crate::{DashError, Result};

/// Reader backed by a single SQLite connection
pub struct SqliteReader {
    conn: Connection,
}

impl SqliteReader {
    /// Open `sqlite://memory` or `sqlite://<path>`
    pub fn from_connection_string(uri: &str) -> Result<Self> {
        let info = parse_connection_string(uri)?;
        Self::from_connection_info(&info)
    }

    pub fn from_connection_info(info: &ConnectionInfo) -> Result<Self> {
        let ConnectionInfo::Sqlite(target) = info;
        let conn = match target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => Connection::open(path),
        }
        .map_err(|e| DashError::QueryError(format!("Failed to open SQLite database: {}", e)))?;
        Ok(Self { conn })
    }

    /// Underlying connection, for setup outside the Reader trait
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        self.conn.prepare(sql).map_err(query_error)
    }
}

fn query_error(e: rusqlite::Error) -> DashError {
    DashError::QueryError(e.to_string())
}

/// Bind the named parameters the statement actually references
fn bind_params(stmt: &mut Statement<'_>, params: &QueryParams) -> Result<()> {
    for (name, value) in params.iter() {
        let key = format!(":{}", name);
        if let Some(idx) = stmt.parameter_index(&key).map_err(query_error)? {
            stmt.raw_bind_parameter(idx, value).map_err(query_error)?;
        }
    }
    Ok(())
}

fn with_limits(sql: &str, limit_from: u64, limit_num: u64) -> String {
    let sql = sql.trim().trim_end_matches(';');
    match (limit_from, limit_num) {
        (0, 0) => sql.to_string(),
        (from, 0) => format!("{} LIMIT -1 OFFSET {}", sql, from),
        (from, num) => format!("{} LIMIT {} OFFSET {}", sql, num, from),
    }
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Number(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(*b as i64)),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Number(n) => ToSqlOutput::Owned(SqlValue::Real(*n)),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Link { href, .. } => ToSqlOutput::Borrowed(ValueRef::Text(href.as_bytes())),
            Value::Image { src, .. } => ToSqlOutput::Borrowed(ValueRef::Text(src.as_bytes())),
        })
    }
}

impl Reader for SqliteReader {
    fn execute_sql(
        &self,
        sql: &str,
        params: &QueryParams,
        limit_from: u64,
        limit_num: u64,
    ) -> Result<Vec<Row>> {
        let sql = with_limits(sql, limit_from, limit_num);
        let mut stmt = self.prepare(&sql)?;
        bind_params(&mut stmt, params)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.raw_query();
        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), to_value(row.get_ref(idx).map_err(query_error)?));
            }
            result.push(record);
        }
        Ok(result)
    }

    fn count_sql(&self, sql: &str, params: &QueryParams) -> Result<u64> {
        let mut stmt = self.prepare(sql.trim().trim_end_matches(';'))?;
        bind_params(&mut stmt, params)?;

        let mut rows = stmt.raw_query();
        let Some(row) = rows.next().map_err(query_error)? else {
            return Ok(0);
        };
        let value = to_value(row.get_ref(0).map_err(query_error)?);
        match value.as_i64() {
            Some(count) => Ok(count.max(0) as u64),
            None => Err(DashError::QueryError(format!(
                "Count query returned '{}' instead of a number",
                value
            ))),
        }
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(query_error)
    }

    fn supports_batch(&self) -> bool {
        true
    }
}
