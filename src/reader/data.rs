//! Bundled sample data set and catalog
//!
//! Used by the CLI and HTTP server when no database is given, and by the
//! end-to-end tests.

use super::Reader;
use crate::{DashError, Result};

/// Demo catalog describing the `users` and `enrolments` sources
pub static SAMPLE_CATALOG: &str = include_str!("../../demos/catalog.json");

static SAMPLE_SQL: &str = include_str!("../../demos/sample.sql");

/// Create and fill the `users`, `courses` and `enrolments` tables
pub fn load_sample_data(reader: &dyn Reader) -> Result<()> {
    if !reader.supports_batch() {
        return Err(DashError::ConfigurationError(
            "Sample data requires a reader that supports batch execution".to_string(),
        ));
    }
    reader.execute_batch(SAMPLE_SQL)?;
    tracing::debug!("Loaded sample data set");
    Ok(())
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::data::QueryParams;
    use crate::reader::SqliteReader;

    #[test]
    fn test_sample_tables_loaded() {
        let reader = SqliteReader::from_connection_string("sqlite://memory").unwrap();
        load_sample_data(&reader).unwrap();

        let none = QueryParams::new();
        assert_eq!(reader.count_sql("SELECT COUNT(*) FROM users", &none).unwrap(), 9);
        assert_eq!(
            reader
                .count_sql("SELECT COUNT(*) FROM users WHERE deleted = 0", &none)
                .unwrap(),
            7
        );
        assert_eq!(reader.count_sql("SELECT COUNT(*) FROM courses", &none).unwrap(), 4);
        assert_eq!(reader.count_sql("SELECT COUNT(*) FROM enrolments", &none).unwrap(), 9);
    }

    #[test]
    fn test_sample_catalog_is_json() {
        let value: serde_json::Value = serde_json::from_str(SAMPLE_CATALOG).unwrap();
        assert!(value["sources"].is_array());
    }
}
