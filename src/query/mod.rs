//! Query composition and execution
//!
//! A [`QueryEngine`] fills a data source's [`QueryTemplate`] from the field
//! definitions and filter collection of one request. Composition produces a
//! data query and a count query that share one filter predicate and one
//! parameter set, so the page count always agrees with the rows shown.

pub mod template;

pub use template::{Fragments, Placeholder, QueryTemplate};

use crate::data::{QueryParams, Row};
use crate::field::{FieldDefinition, SortDirection};
use crate::filter::FilterCollection;
use crate::paginator::Paginator;
use crate::reader::Reader;
use crate::{DashError, Result};

/// Alias of the wrapped subquery in default count queries
const COUNT_ALIAS: &str = "dash_count";

/// Fully expanded SQL for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub sql: String,
    pub count_sql: String,
    pub params: QueryParams,
}

impl ComposedQuery {
    /// Fetch rows; `limit_num` 0 means all rows
    pub fn fetch(&self, reader: &dyn Reader, limit_from: u64, limit_num: u64) -> Result<Vec<Row>> {
        reader.execute_sql(&self.sql, &self.params, limit_from, limit_num)
    }

    pub fn count(&self, reader: &dyn Reader) -> Result<u64> {
        reader.count_sql(&self.count_sql, &self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Sort {
    field: String,
    direction: Option<SortDirection>,
}

pub struct QueryEngine<'a> {
    template: &'a QueryTemplate,
    count_template: Option<&'a QueryTemplate>,
    fields: &'a [FieldDefinition],
    filters: &'a FilterCollection,
    required: Vec<String>,
    sort: Option<Sort>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        template: &'a QueryTemplate,
        fields: &'a [FieldDefinition],
        filters: &'a FilterCollection,
    ) -> Self {
        Self {
            template,
            count_template: None,
            fields,
            filters,
            required: Vec::new(),
            sort: None,
        }
    }

    /// Count with a custom template instead of wrapping the data query
    pub fn with_count_template(mut self, template: &'a QueryTemplate) -> Self {
        self.count_template = Some(template);
        self
    }

    /// Always select these fields, even when hidden
    pub fn with_required_fields<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.required
            .extend(names.iter().map(|n| n.as_ref().to_string()));
        self
    }

    /// Sort by a field; `None` uses the field's default direction
    pub fn with_sort(mut self, field: &str, direction: Option<SortDirection>) -> Self {
        self.sort = Some(Sort {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Fields the data query selects, identifier fields first
    ///
    /// Hidden fields named by a `{placeholder}` in a selected field's
    /// attributes are selected too, so link and image templates can fill them.
    pub fn selected_fields(&self) -> Vec<&'a FieldDefinition> {
        let fields = self.fields;
        let base = |f: &FieldDefinition| {
            f.is_visible() || f.always_selected() || self.required.iter().any(|r| r == f.name())
        };
        let referenced: Vec<String> = fields
            .iter()
            .filter(|&f| base(f))
            .flat_map(FieldDefinition::referenced_fields)
            .collect();
        let wanted = |f: &FieldDefinition| base(f) || referenced.iter().any(|r| r == f.name());

        let (mut selected, rest): (Vec<&FieldDefinition>, Vec<&FieldDefinition>) = fields
            .iter()
            .filter(|f| wanted(*f))
            .partition(|f| f.is_identifier());
        selected.extend(rest);
        selected
    }

    fn sort_field(&self) -> Option<&'a FieldDefinition> {
        let sort = self.sort.as_ref()?;
        let fields = self.fields;
        match fields.iter().find(|f| f.name() == sort.field) {
            Some(field) if field.is_sortable() => Some(field),
            Some(_) => {
                tracing::debug!("Field '{}' is not sortable, ignoring sort", sort.field);
                None
            }
            None => {
                tracing::debug!("Ignoring sort on unknown field '{}'", sort.field);
                None
            }
        }
    }

    /// Expand the templates
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if the template lacks `%%SELECT%%` or no field
    /// would be selected; `ValidationError` from required filters without
    /// values.
    pub fn compose(&self) -> Result<ComposedQuery> {
        self.template.require(Placeholder::Select)?;

        let selected = self.selected_fields();
        if selected.is_empty() {
            return Err(DashError::ConfigurationError(
                "No field definitions to select".to_string(),
            ));
        }

        let select = selected
            .iter()
            .map(|f| format!("{} AS {}", f.select(), f.name()))
            .collect::<Vec<_>>()
            .join(", ");

        let sort_field = self.sort_field();

        let mut joins: Vec<String> = Vec::new();
        for join in selected
            .iter()
            .copied()
            .chain(sort_field)
            .filter_map(|f| f.join())
            .chain(self.filters.joins())
        {
            let join = join.trim();
            if !joins.iter().any(|j| j == join) {
                joins.push(join.to_string());
            }
        }

        let (predicate, params) = self.filters.to_sql_and_params()?;

        let order_by = match (sort_field, &self.sort) {
            (Some(field), Some(sort)) => Some(format!(
                "{} {}",
                field.sort_select(),
                sort.direction.unwrap_or(field.sort_direction())
            )),
            _ => None,
        };

        let fragments = Fragments {
            select,
            joins,
            predicate,
            order_by,
        };

        let sql = self.template.expand(&fragments);
        let count_sql = match self.count_template {
            Some(template) => template.expand_unordered(&fragments),
            None => format!(
                "SELECT COUNT(*) FROM ({}) AS {}",
                self.template.expand_unordered(&fragments),
                COUNT_ALIAS
            ),
        };

        tracing::debug!(
            "Composed query: {} fields, {} joins, {} params",
            selected.len(),
            fragments.joins.len(),
            params.len()
        );

        Ok(ComposedQuery {
            sql,
            count_sql,
            params,
        })
    }

    /// Compose and fetch one page
    ///
    /// With `per_page` 0 every row is fetched and no paginator is returned.
    /// The paginator counts lazily through the same composed query.
    pub fn execute<'r>(
        &self,
        reader: &'r dyn Reader,
        per_page: u64,
        current_page: u64,
    ) -> Result<(Vec<Row>, Option<Paginator<'r>>)> {
        let composed = self.compose()?;

        if per_page == 0 {
            let rows = composed.fetch(reader, 0, 0)?;
            return Ok((rows, None));
        }

        let rows = composed.fetch(reader, current_page.saturating_mul(per_page), per_page)?;
        let paginator = Paginator::new(per_page, current_page, move || composed.count(reader))?;
        Ok((rows, Some(paginator)))
    }
}
