//! Connection string parsing

use std::path::PathBuf;

use crate::{DashError, Result};

/// Where a SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

/// Parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionInfo {
    /// `sqlite://memory` or `sqlite://<path>`
    Sqlite(SqliteTarget),
}

/// Parse a connection string such as `sqlite://memory` or `sqlite:///tmp/site.db`
pub fn parse_connection_string(uri: &str) -> Result<ConnectionInfo> {
    let uri = uri.trim();
    if let Some(rest) = uri.strip_prefix("sqlite://") {
        return match rest {
            "" => Err(DashError::ConfigurationError(
                "SQLite connection string needs 'memory' or a file path".to_string(),
            )),
            "memory" | ":memory:" => Ok(ConnectionInfo::Sqlite(SqliteTarget::Memory)),
            path => Ok(ConnectionInfo::Sqlite(SqliteTarget::File(PathBuf::from(path)))),
        };
    }

    Err(DashError::ConfigurationError(format!(
        "Unsupported connection string '{}' (supported: sqlite://memory, sqlite://<path>)",
        uri
    )))
}
