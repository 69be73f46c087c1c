//! Data source abstraction layer for blockdash
//!
//! The reader module provides a pluggable interface for executing composed
//! dashboard queries against a database and returning ordered rows.
//!
//! # Architecture
//!
//! All readers implement the `Reader` trait, which provides:
//! - Bounded query execution → `Vec<Row>`
//! - Count queries for pagination
//! - Optional raw statement execution (schema setup, sample data)
//!
//! # Example
//!
//! ```rust,ignore
//! use blockdash::reader::{Reader, SqliteReader};
//! use blockdash::QueryParams;
//!
//! let reader = SqliteReader::from_connection_string("sqlite://memory")?;
//! let rows = reader.execute_sql("SELECT 1 AS x", &QueryParams::new(), 0, 0)?;
//! ```

use crate::data::{QueryParams, Row};
use crate::{DashError, Result};

pub mod connection;
pub mod data;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteReader;

/// Trait for database readers
///
/// Parameters are named; SQL fragments reference them as `:name` while
/// [`QueryParams`] stores the bare name. Parameters the statement does not
/// reference are ignored.
pub trait Reader {
    /// Execute a query and return its rows
    ///
    /// # Arguments
    ///
    /// * `sql` - The SQL query to execute
    /// * `params` - Named parameters
    /// * `limit_from` - Number of rows to skip
    /// * `limit_num` - Maximum number of rows; 0 means no limit
    ///
    /// # Errors
    ///
    /// Returns `DashError::QueryError` if the SQL is invalid or the database
    /// rejects it.
    fn execute_sql(
        &self,
        sql: &str,
        params: &QueryParams,
        limit_from: u64,
        limit_num: u64,
    ) -> Result<Vec<Row>>;

    /// Run a counting query and return its first column
    ///
    /// An empty result counts as 0; a non-numeric value is a `QueryError`.
    fn count_sql(&self, sql: &str, params: &QueryParams) -> Result<u64>;

    /// Execute one or more statements without results
    ///
    /// Returns an error by default. Override for readers that allow it.
    fn execute_batch(&self, _sql: &str) -> Result<()> {
        Err(DashError::QueryError(
            "This reader does not support batch execution".to_string(),
        ))
    }

    /// Check if this reader supports [`execute_batch`](Reader::execute_batch)
    fn supports_batch(&self) -> bool {
        false
    }
}

/// Build a reader from a connection string
pub fn from_connection_string(uri: &str) -> Result<Box<dyn Reader + Send>> {
    match connection::parse_connection_string(uri)? {
        #[cfg(feature = "sqlite")]
        info @ connection::ConnectionInfo::Sqlite(_) => {
            Ok(Box::new(SqliteReader::from_connection_info(&info)?))
        }
        #[allow(unreachable_patterns)]
        _ => Err(DashError::ConfigurationError(format!(
            "No reader compiled in for '{}'",
            uri
        ))),
    }
}
