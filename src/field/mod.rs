//! Field definitions
//!
//! A [`FieldDefinition`] describes one retrievable column: the SQL expression
//! that selects it, the alias it is selected as (its `name`), its title,
//! visibility, sort behaviour and the attribute chain applied to its values.
//! Definitions are contributed as JSON ([`FieldContribution`]) and collected
//! in a [`FieldRegistry`].

pub mod attribute;
mod registry;

pub use attribute::{Attribute, AttributeChain, AttributeKind, AttributeSpec};
pub use registry::FieldRegistry;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::data::{Row, Value};
use crate::Result;

/// Whether a field is shown to the end user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    name: String,
    select: Option<String>,
    title: String,
    visibility: Visibility,
    sortable: bool,
    sort_direction: SortDirection,
    sort_select: Option<String>,
    required: bool,
    join: Option<String>,
    options: Map<String, JsonValue>,
    attributes: AttributeChain,
}

impl FieldDefinition {
    /// Create a visible, unsortable definition
    pub fn new(name: impl Into<String>, select: impl Into<String>, title: impl Into<String>) -> Self {
        let select = select.into();
        Self {
            name: name.into(),
            select: if select.is_empty() { None } else { Some(select) },
            title: title.into(),
            visibility: Visibility::Visible,
            sortable: false,
            sort_direction: SortDirection::Asc,
            sort_select: None,
            required: false,
            join: None,
            options: Map::new(),
            attributes: AttributeChain::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn sortable(mut self, direction: SortDirection) -> Self {
        self.sortable = true;
        self.sort_direction = direction;
        self
    }

    pub fn with_sort_select(mut self, sort_select: impl Into<String>) -> Self {
        self.sort_select = Some(sort_select.into());
        self
    }

    /// Select this field even while hidden
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Join clause this field needs, e.g. `JOIN course c ON c.id = e.courseid`
    pub fn with_join(mut self, join: impl Into<String>) -> Self {
        self.join = Some(join.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// SQL select expression, falling back to the name
    pub fn select(&self) -> &str {
        self.select.as_deref().unwrap_or(&self.name)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Visibility is the one property that changes per request
    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    /// Expression used in ORDER BY, falling back to the select expression
    pub fn sort_select(&self) -> &str {
        self.sort_select.as_deref().unwrap_or_else(|| self.select())
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_identifier(&self) -> bool {
        self.attributes.has_identifier()
    }

    pub fn join(&self) -> Option<&str> {
        self.join.as_deref()
    }

    pub fn options(&self) -> &Map<String, JsonValue> {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&JsonValue> {
        self.options.get(name)
    }

    pub fn attributes(&self) -> &AttributeChain {
        &self.attributes
    }

    /// Other fields this field's attributes read from the row
    pub fn referenced_fields(&self) -> Vec<String> {
        self.attributes
            .referenced_fields()
            .into_iter()
            .filter(|name| *name != self.name)
            .collect()
    }

    /// Whether the query must select this field regardless of visibility
    pub fn always_selected(&self) -> bool {
        self.required || self.is_identifier()
    }

    /// Run the attribute chain over a raw value
    pub fn transform(&self, value: Value, row: &Row) -> Value {
        self.attributes.apply(value, row)
    }
}

/// Field definition as contributed by a catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldContribution {
    pub name: String,
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub sort_select: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub join: Option<String>,
    #[serde(default)]
    pub options: Map<String, JsonValue>,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

impl FieldContribution {
    pub fn build(&self) -> Result<FieldDefinition> {
        let attributes = self
            .attributes
            .iter()
            .map(Attribute::from_spec)
            .collect::<Result<AttributeChain>>()?;

        Ok(FieldDefinition {
            name: self.name.clone(),
            select: self.select.clone().filter(|s| !s.is_empty()),
            title: self.title.clone().unwrap_or_else(|| self.name.clone()),
            visibility: self.visibility,
            sortable: self.sortable,
            sort_direction: self.sort_direction,
            sort_select: self.sort_select.clone().filter(|s| !s.is_empty()),
            required: self.required,
            join: self.join.clone().filter(|s| !s.is_empty()),
            options: self.options.clone(),
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_falls_back_to_name() {
        let field = FieldDefinition::new("u_id", "", "ID");
        assert_eq!(field.select(), "u_id");
        assert_eq!(field.sort_select(), "u_id");
    }

    #[test]
    fn test_sort_select_falls_back_to_select() {
        let field = FieldDefinition::new("u_name", "u.firstname", "Name");
        assert_eq!(field.sort_select(), "u.firstname");

        let field = field.with_sort_select("u.lastname");
        assert_eq!(field.sort_select(), "u.lastname");
    }

    #[test]
    fn test_identifier_is_always_selected() {
        let field = FieldDefinition::new("u_id", "u.id", "ID")
            .with_visibility(Visibility::Hidden)
            .with_attribute(Attribute::identifier());
        assert!(field.is_identifier());
        assert!(field.always_selected());
        assert!(!field.is_visible());
    }

    #[test]
    fn test_contribution_build() {
        let contribution: FieldContribution = serde_json::from_value(json!({
            "name": "u_lastlogin",
            "select": "u.lastlogin",
            "title": "Last login",
            "sortable": true,
            "sort_direction": "DESC",
            "attributes": [{ "kind": "date", "options": { "format": "%Y-%m-%d" } }]
        }))
        .unwrap();

        let field = contribution.build().unwrap();
        assert_eq!(field.name(), "u_lastlogin");
        assert_eq!(field.select(), "u.lastlogin");
        assert!(field.is_sortable());
        assert_eq!(field.sort_direction(), SortDirection::Desc);
        assert_eq!(field.attributes().len(), 1);
        assert!(field.is_visible());
    }

    #[test]
    fn test_contribution_defaults() {
        let contribution: FieldContribution =
            serde_json::from_value(json!({ "name": "c_fullname" })).unwrap();
        let field = contribution.build().unwrap();
        assert_eq!(field.title(), "c_fullname");
        assert_eq!(field.select(), "c_fullname");
        assert!(!field.is_sortable());
        assert!(field.options().is_empty());
    }

    #[test]
    fn test_contribution_bad_attribute_fails() {
        let contribution: FieldContribution = serde_json::from_value(json!({
            "name": "x",
            "attributes": [{ "kind": "link" }]
        }))
        .unwrap();
        assert!(contribution.build().is_err());
    }
}
