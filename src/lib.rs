/*!
# blockdash - declarative dashboard queries

blockdash turns a declarative dashboard description into render-ready data.
A data source supplies a parametrised SQL template, a catalog supplies field
definitions, filters and conditions narrow the result, and the rows coming
back from the database are mapped into a nested [`DataCollection`] tree that
any template engine can walk.

## Example

```rust,ignore
use blockdash::{Catalog, Dashboard, Preferences};
use blockdash::reader::SqliteReader;

let catalog = Catalog::from_json(include_str!("../demos/catalog.json"))?;
let reader = SqliteReader::from_connection_string("sqlite://memory")?;
let source = catalog.source("users").unwrap();

let dashboard = Dashboard::new(&catalog, source, Preferences::default());
let output = dashboard.render(&reader)?;
println!("{}", serde_json::to_string_pretty(&output)?);
```

## Core Components

- [`field`] - Field definitions, the registry and attribute chains
- [`filter`] - Filters, conditions and filter collections
- [`query`] - SQL template expansion and execution
- [`data`] - Row values and the data collection tree
- [`paginator`] - Page counts and page link windows
- [`dashboard`] - Wires everything together per request
*/

pub mod config;
pub mod dashboard;
pub mod data;
pub mod field;
pub mod filter;
pub mod layout;
pub mod paginator;
pub mod query;
pub mod reader;
pub mod source;

pub use config::{Preferences, SortPreference};
pub use dashboard::{Column, Dashboard, DashboardOutput, RenderOutcome, Viewer};
pub use data::{DataCollection, DataStrategy, Field, QueryParams, Row, Value};
pub use field::{FieldDefinition, FieldRegistry, SortDirection, Visibility};
pub use filter::{Filter, FilterCollection, FilterKind, Operator};
pub use layout::{LayoutCapabilities, LayoutKind};
pub use paginator::{PageLink, PageLinkKind, Paginator, PaginatorExport};
pub use query::{ComposedQuery, QueryEngine, QueryTemplate};
pub use source::{Catalog, CatalogContribution, DataSource};

/// Version of blockdash
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum DashError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Invalid operator '{operator}' on filter '{filter}'")]
    InvalidOperator { filter: String, operator: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, DashError>;

#[cfg(all(test, feature = "sqlite"))]
mod integration_tests {
    use super::*;
    use crate::reader::{data::SAMPLE_CATALOG, SqliteReader};

    fn sample() -> (Catalog, SqliteReader) {
        let catalog = Catalog::from_json(SAMPLE_CATALOG).unwrap();
        let reader = SqliteReader::from_connection_string("sqlite://memory").unwrap();
        reader::data::load_sample_data(&reader).unwrap();
        (catalog, reader)
    }

    #[test]
    fn test_end_to_end_table_dashboard() {
        let (catalog, reader) = sample();
        let source = catalog.source("users").unwrap();

        let prefs = Preferences {
            per_page: 3,
            ..Default::default()
        };
        let output = Dashboard::new(&catalog, source, prefs).render(&reader).unwrap();

        let rows = output.data.get_children("rows").unwrap();
        assert_eq!(rows.len(), 3);
        // Deleted users are excluded by a condition
        let paginator = output.paginator.unwrap();
        assert_eq!(paginator.page_count, 3);
        assert_eq!(paginator.total, 7);
    }

    #[test]
    fn test_end_to_end_filters_narrow_data_and_count() {
        let (catalog, reader) = sample();
        let source = catalog.source("users").unwrap();

        let prefs: Preferences = serde_json::from_value(serde_json::json!({
            "filter_values": { "u_department": ["Engineering"] }
        }))
        .unwrap();
        let output = Dashboard::new(&catalog, source, prefs).render(&reader).unwrap();

        let rows = output.data.get_children("rows").unwrap();
        let paginator = output.paginator.unwrap();
        assert_eq!(rows.len() as u64, paginator.total);
        for row in rows {
            assert_eq!(
                row.get_field("u_department").unwrap().value,
                Value::String("Engineering".to_string())
            );
        }
    }

    #[test]
    fn test_end_to_end_grouped_dashboard() {
        let (catalog, reader) = sample();
        let source = catalog.source("enrolments").unwrap();

        let prefs = Preferences {
            layout: Some(LayoutKind::Accordion),
            per_page: 100,
            ..Default::default()
        };
        let output = Dashboard::new(&catalog, source, prefs).render(&reader).unwrap();

        let sections = output.data.get_children("sections").unwrap();
        assert!(!sections.is_empty());
        for section in sections {
            assert!(section.get_field("groupby").is_some());
            assert!(section.get_field("label").is_some());
            assert!(!section.get_children("rows").unwrap().is_empty());
        }
    }
}
