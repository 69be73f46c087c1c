//! Data sources and the catalog
//!
//! A [`Catalog`] holds every field definition and data source contributed by
//! plugins. It is built once from JSON contributions and then shared
//! read-only; contributions are merged in order and a later definition with
//! the same name replaces an earlier one.

use serde::{Deserialize, Serialize};

use crate::config::SortPreference;
use crate::field::{FieldContribution, FieldDefinition, FieldRegistry};
use crate::filter::{FilterCollection, FilterDefinition};
use crate::layout::LayoutKind;
use crate::query::QueryTemplate;
use crate::{DashError, Result};

/// A data source as declared in a catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// SQL template with `%%SELECT%%` and optional filter, join and sort markers
    #[serde(default)]
    pub query: String,
    /// Custom count template; defaults to counting the data query's rows
    #[serde(default)]
    pub count_query: Option<String>,
    /// Field names this source can show, in default display order
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,
    #[serde(default)]
    pub layout: LayoutKind,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(default)]
    pub default_sort: Option<SortPreference>,
}

impl DataSource {
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn template(&self) -> Result<QueryTemplate> {
        if self.query.trim().is_empty() {
            return Err(DashError::ConfigurationError(format!(
                "Data source '{}' has no query template",
                self.id
            )));
        }
        QueryTemplate::parse(&self.query)
    }

    pub fn count_template(&self) -> Result<Option<QueryTemplate>> {
        self.count_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .map(QueryTemplate::parse)
            .transpose()
    }

    /// Fresh filter collection for one request
    pub fn filter_collection(&self) -> Result<FilterCollection> {
        let mut collection = FilterCollection::new();
        for definition in &self.filters {
            collection.add(definition.build()?);
        }
        Ok(collection)
    }

    /// Definitions of this source's fields, cloned so a request may adjust them
    ///
    /// Names missing from the registry are skipped.
    pub fn field_definitions(&self, registry: &FieldRegistry) -> Result<Vec<FieldDefinition>> {
        let definitions: Vec<FieldDefinition> = registry
            .get_many(&self.fields)
            .into_iter()
            .cloned()
            .collect();
        if definitions.is_empty() {
            return Err(DashError::ConfigurationError(format!(
                "Data source '{}' has no field definitions",
                self.id
            )));
        }
        Ok(definitions)
    }
}

/// One catalog file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogContribution {
    #[serde(default)]
    pub fields: Vec<FieldContribution>,
    #[serde(default)]
    pub sources: Vec<DataSource>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    fields: FieldRegistry,
    sources: Vec<DataSource>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from one JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let contribution: CatalogContribution = serde_json::from_str(json)
            .map_err(|e| DashError::ConfigurationError(format!("Invalid catalog: {}", e)))?;
        Self::from_contributions([contribution])
    }

    /// Merge contributions in order; later names win
    pub fn from_contributions(
        contributions: impl IntoIterator<Item = CatalogContribution>,
    ) -> Result<Self> {
        let mut catalog = Self::new();
        for contribution in contributions {
            catalog.merge(contribution)?;
        }
        Ok(catalog)
    }

    pub fn merge(&mut self, contribution: CatalogContribution) -> Result<()> {
        for field in &contribution.fields {
            self.fields.register(field.build()?);
        }
        for source in contribution.sources {
            self.add_source(source);
        }
        Ok(())
    }

    /// Add a source, replacing one with the same id in place
    pub fn add_source(&mut self, source: DataSource) {
        match self.sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => {
                tracing::debug!("Data source '{}' replaced by a later contribution", source.id);
                *existing = source;
            }
            None => self.sources.push(source),
        }
    }

    pub fn source(&self, id: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn sources(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }
}
