//! Per-request dashboard rendering
//!
//! A [`Dashboard`] combines a data source, the catalog's field definitions
//! and the user's [`Preferences`] into one query, runs it and maps the rows
//! into a tree. [`Dashboard::render_safely`] is the boundary the host calls:
//! configuration problems become a "not configured" notice and database
//! failures an "unavailable" notice, instead of errors escaping into the page.

use serde::Serialize;

use crate::config::Preferences;
use crate::data::{DataCollection, DataStrategy};
use crate::field::{FieldDefinition, Visibility};
use crate::filter::{FilterCollection, FilterForm};
use crate::layout::{LayoutCapabilities, LayoutKind};
use crate::paginator::PaginatorExport;
use crate::query::{ComposedQuery, QueryEngine, QueryTemplate};
use crate::reader::Reader;
use crate::source::{Catalog, DataSource};
use crate::{DashError, Result};

const UNAVAILABLE_MESSAGE: &str = "This content is currently unavailable.";

/// Who is looking at the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Viewer {
    /// Privileged viewers see error details
    pub privileged: bool,
}

/// Column header for a visible field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub title: String,
    pub sortable: bool,
}

/// Everything a template needs to draw one dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOutput {
    pub source: String,
    pub title: String,
    pub layout: LayoutKind,
    pub capabilities: LayoutCapabilities,
    pub columns: Vec<Column>,
    pub data: DataCollection,
    pub paginator: Option<PaginatorExport>,
    pub filter_form: Option<FilterForm>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Rendered(DashboardOutput),
    NotConfigured {
        message: String,
    },
    Unavailable {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered(_))
    }
}

struct Prepared {
    layout: LayoutKind,
    strategy: DataStrategy,
    template: QueryTemplate,
    count_template: Option<QueryTemplate>,
    definitions: Vec<FieldDefinition>,
    filters: FilterCollection,
}

pub struct Dashboard<'a> {
    catalog: &'a Catalog,
    source: &'a DataSource,
    preferences: Preferences,
}

impl<'a> Dashboard<'a> {
    pub fn new(catalog: &'a Catalog, source: &'a DataSource, preferences: Preferences) -> Self {
        Self {
            catalog,
            source,
            preferences,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Preferred layout, else the source's own
    pub fn layout(&self) -> LayoutKind {
        self.preferences.layout.unwrap_or(self.source.layout)
    }

    /// Source fields with visibility and order from preferences
    ///
    /// With `enabled_fields` set, the listed fields come first in that order
    /// and are visible; the remaining fields follow, hidden. Layouts without
    /// field visibility support ignore the preference.
    pub fn field_definitions(&self) -> Result<Vec<FieldDefinition>> {
        let definitions = self.source.field_definitions(self.catalog.fields())?;

        let enabled = match &self.preferences.enabled_fields {
            Some(enabled) if self.layout().capabilities().supports_field_visibility => enabled,
            _ => return Ok(definitions),
        };

        let (mut shown, mut rest): (Vec<FieldDefinition>, Vec<FieldDefinition>) = definitions
            .into_iter()
            .partition(|d| enabled.iter().any(|name| name == d.name()));

        shown.sort_by_key(|d| enabled.iter().position(|name| name == d.name()));
        for definition in shown.iter_mut() {
            definition.set_visibility(Visibility::Visible);
        }
        for definition in rest.iter_mut() {
            definition.set_visibility(Visibility::Hidden);
        }
        shown.extend(rest);
        Ok(shown)
    }

    /// Source filters with enablement and values from preferences
    ///
    /// Conditions always apply. Layouts without filtering support disable
    /// every user filter.
    pub fn filter_collection(&self) -> Result<FilterCollection> {
        let mut filters = self.source.filter_collection()?;
        let supports_filtering = self.layout().capabilities().supports_filtering;

        let user_filters: Vec<String> = filters.user_filters().map(|f| f.name().to_string()).collect();
        for name in &user_filters {
            let enabled = supports_filtering
                && self
                    .preferences
                    .enabled_filters
                    .as_ref()
                    .map_or(true, |enabled| enabled.contains(name));
            filters.set_enabled(name, enabled);
        }

        if supports_filtering {
            for (name, values) in &self.preferences.filter_values {
                filters.apply(name, values.clone());
            }
        }
        Ok(filters)
    }

    fn prepare(&self) -> Result<Prepared> {
        let layout = self.layout();
        let strategy = layout.data_strategy(
            self.source.group_by.as_deref(),
            self.source.group_label.as_deref(),
        )?;
        Ok(Prepared {
            layout,
            strategy,
            template: self.source.template()?,
            count_template: self.source.count_template()?,
            definitions: self.field_definitions()?,
            filters: self.filter_collection()?,
        })
    }

    fn engine<'p>(&self, prepared: &'p Prepared) -> QueryEngine<'p> {
        let required = prepared.strategy.required_fields();
        let mut engine = QueryEngine::new(&prepared.template, &prepared.definitions, &prepared.filters)
            .with_required_fields(required.as_slice());
        if let Some(count_template) = prepared.count_template.as_ref() {
            engine = engine.with_count_template(count_template);
        }
        if let Some(sort) = self.preferences.sort.as_ref().or(self.source.default_sort.as_ref()) {
            engine = engine.with_sort(&sort.field, sort.direction);
        }
        engine
    }

    /// Data and count SQL this dashboard would run
    pub fn compose(&self) -> Result<ComposedQuery> {
        let prepared = self.prepare()?;
        self.engine(&prepared).compose()
    }

    /// Run the dashboard query and build its output
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for missing templates, fields or group fields,
    /// `InvalidOperator` for bad filter declarations, `ValidationError` for
    /// unusable filter values and `QueryError` when the database rejects the
    /// composed SQL.
    pub fn render(&self, reader: &dyn Reader) -> Result<DashboardOutput> {
        let prepared = self.prepare()?;
        let layout = prepared.layout;
        let capabilities = layout.capabilities();
        let engine = self.engine(&prepared);

        let per_page = if capabilities.supports_pagination {
            self.preferences.per_page
        } else {
            0
        };
        let (rows, paginator) = engine.execute(reader, per_page, self.preferences.current_page)?;
        let row_count = rows.len();
        let data = prepared.strategy.convert(rows, &prepared.definitions)?;
        let paginator = paginator.map(|p| p.export()).transpose()?;

        let filter_form = if capabilities.supports_filtering {
            Some(prepared.filters.form(Some(reader))?)
        } else {
            None
        };

        let columns = prepared
            .definitions
            .iter()
            .filter(|d| d.is_visible())
            .map(|d| Column {
                name: d.name().to_string(),
                title: d.title().to_string(),
                sortable: d.is_sortable(),
            })
            .collect();

        tracing::debug!(
            "Rendered dashboard '{}' as {} with {} rows",
            self.source.id,
            layout,
            row_count
        );

        Ok(DashboardOutput {
            source: self.source.id.clone(),
            title: self.source.title().to_string(),
            layout,
            capabilities,
            columns,
            data,
            paginator,
            filter_form,
        })
    }

    /// Render, degrading failures into notices
    pub fn render_safely(&self, reader: &dyn Reader, viewer: Viewer) -> RenderOutcome {
        match self.render(reader) {
            Ok(output) => RenderOutcome::Rendered(output),
            Err(err @ (DashError::ConfigurationError(_) | DashError::InvalidOperator { .. })) => {
                tracing::info!("Dashboard '{}' is not configured: {}", self.source.id, err);
                RenderOutcome::NotConfigured {
                    message: err.to_string(),
                }
            }
            Err(err) => {
                tracing::warn!("Dashboard '{}' failed to render: {}", self.source.id, err);
                RenderOutcome::Unavailable {
                    message: UNAVAILABLE_MESSAGE.to_string(),
                    detail: viewer.privileged.then(|| err.to_string()),
                }
            }
        }
    }
}
