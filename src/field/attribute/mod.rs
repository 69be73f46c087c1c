//! Attribute trait and implementations
//!
//! Attributes post-process a cell value after it has been read from the
//! database. Each attribute kind is its own struct implementing
//! [`AttributeTrait`]; field definitions hold them through the [`Attribute`]
//! wrapper and apply them in registration order via an [`AttributeChain`].
//!
//! # Architecture
//!
//! - `AttributeKind`: Enum for pattern matching and serialization
//! - `AttributeTrait`: Trait defining the transform
//! - `Attribute`: Wrapper holding an `Arc<dyn AttributeTrait>` plus its options
//!
//! # Example
//!
//! ```rust,ignore
//! use blockdash::field::attribute::{Attribute, AttributeKind};
//!
//! let date = Attribute::date("%Y-%m-%d");
//! assert_eq!(date.attribute_kind(), AttributeKind::Date);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

use crate::data::{Row, Value};
use crate::{DashError, Result};

mod boolean;
mod callback;
mod date;
mod identifier;
mod image;
mod link;
mod percent;
mod rename_ids;

pub use boolean::Boolean;
pub use callback::Callback;
pub use date::Date;
pub use identifier::Identifier;
pub use image::Image;
pub use link::Link;
pub use percent::Percent;
pub use rename_ids::RenameIds;

/// Enum of all attribute kinds for pattern matching and serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Marks the field as the row identifier
    Identifier,
    /// Unix timestamp → formatted date
    Date,
    /// Truthy/falsy → yes/no labels
    Boolean,
    /// Number → percentage string
    Percent,
    /// Value → hyperlink built from sibling columns
    Link,
    /// Value → image
    Image,
    /// Comma-separated ids → labels
    RenameIds,
    /// Caller-supplied closure, not available from catalog files
    Callback,
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttributeKind::Identifier => "identifier",
            AttributeKind::Date => "date",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Percent => "percent",
            AttributeKind::Link => "link",
            AttributeKind::Image => "image",
            AttributeKind::RenameIds => "rename_ids",
            AttributeKind::Callback => "callback",
        };
        write!(f, "{}", s)
    }
}

/// Core trait for attribute behavior
pub trait AttributeTrait: std::fmt::Debug + Send + Sync {
    /// Returns which attribute kind this is (for pattern matching)
    fn attribute_kind(&self) -> AttributeKind;

    /// Transform a value. `row` is the full database row the value came from,
    /// so an attribute can read sibling columns.
    fn transform(&self, value: Value, row: &Row) -> Value;

    /// Whether the owning field identifies the row
    fn is_identifier(&self) -> bool {
        false
    }

    /// Sibling fields read from the row by `transform`
    fn referenced_fields(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Attribute as declared in a catalog contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub kind: AttributeKind,
    #[serde(default)]
    pub options: Map<String, JsonValue>,
}

/// Wrapper struct for attribute trait objects
#[derive(Clone)]
pub struct Attribute {
    inner: Arc<dyn AttributeTrait>,
    options: Map<String, JsonValue>,
}

impl Attribute {
    pub fn new(inner: impl AttributeTrait + 'static, options: Map<String, JsonValue>) -> Self {
        Self {
            inner: Arc::new(inner),
            options,
        }
    }

    /// Build an attribute from its catalog declaration, validating options
    pub fn from_spec(spec: &AttributeSpec) -> Result<Self> {
        let allowed = allowed_options(spec.kind);
        for key in spec.options.keys() {
            if !allowed.contains(&key.as_str()) {
                return Err(DashError::ConfigurationError(format!(
                    "{} attribute does not support option '{}'. Allowed: {}",
                    spec.kind,
                    key,
                    if allowed.is_empty() {
                        "none".to_string()
                    } else {
                        allowed.join(", ")
                    }
                )));
            }
        }

        let options = spec.options.clone();
        let attribute = match spec.kind {
            AttributeKind::Identifier => Self::new(Identifier, options),
            AttributeKind::Date => Self::new(Date::from_options(&options)?, options),
            AttributeKind::Boolean => Self::new(Boolean::from_options(&options)?, options),
            AttributeKind::Percent => Self::new(Percent::from_options(&options)?, options),
            AttributeKind::Link => Self::new(Link::from_options(&options)?, options),
            AttributeKind::Image => Self::new(Image::from_options(&options)?, options),
            AttributeKind::RenameIds => Self::new(RenameIds::from_options(&options)?, options),
            AttributeKind::Callback => {
                return Err(DashError::ConfigurationError(
                    "callback attributes can only be attached in code".to_string(),
                ))
            }
        };
        Ok(attribute)
    }

    /// Create an identifier attribute
    pub fn identifier() -> Self {
        Self::new(Identifier, Map::new())
    }

    /// Create a date attribute with a strftime format
    pub fn date(format: &str) -> Self {
        let mut options = Map::new();
        options.insert("format".to_string(), JsonValue::from(format));
        Self::new(Date::new(format), options)
    }

    /// Create an attribute from a closure
    pub fn callback<F>(name: &str, f: F) -> Self
    where
        F: Fn(Value, &Row) -> Value + Send + Sync + 'static,
    {
        Self::new(Callback::new(name, f), Map::new())
    }

    pub fn attribute_kind(&self) -> AttributeKind {
        self.inner.attribute_kind()
    }

    pub fn is_identifier(&self) -> bool {
        self.inner.is_identifier()
    }

    pub fn options(&self) -> &Map<String, JsonValue> {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&JsonValue> {
        self.options.get(name)
    }

    pub fn transform(&self, value: Value, row: &Row) -> Value {
        self.inner.transform(value, row)
    }

    pub fn referenced_fields(&self) -> Vec<String> {
        self.inner.referenced_fields()
    }
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.attribute_kind())
            .field("options", &self.options)
            .finish()
    }
}

/// Option names each attribute kind accepts in a catalog file
fn allowed_options(kind: AttributeKind) -> &'static [&'static str] {
    match kind {
        AttributeKind::Identifier | AttributeKind::Callback => &[],
        AttributeKind::Date => &["format"],
        AttributeKind::Boolean => &["true_label", "false_label"],
        AttributeKind::Percent => &["decimals", "ratio"],
        AttributeKind::Link => &["url", "label"],
        AttributeKind::Image => &["alt"],
        AttributeKind::RenameIds => &["labels", "separator"],
    }
}

/// Ordered attributes applied one after another
#[derive(Debug, Clone, Default)]
pub struct AttributeChain(Vec<Attribute>);

impl AttributeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_identifier(&self) -> bool {
        self.0.iter().any(Attribute::is_identifier)
    }

    /// Sibling fields any attribute reads, without duplicates
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.0.iter().flat_map(Attribute::referenced_fields) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Each attribute receives the previous attribute's output
    pub fn apply(&self, value: Value, row: &Row) -> Value {
        self.0
            .iter()
            .fold(value, |acc, attribute| attribute.transform(acc, row))
    }
}

impl FromIterator<Attribute> for AttributeChain {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// Option readers shared by the implementations

fn string_option(options: &Map<String, JsonValue>, name: &str) -> Result<Option<String>> {
    match options.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DashError::ConfigurationError(format!(
            "Attribute option '{}' must be a string, got {}",
            name, other
        ))),
    }
}

fn bool_option(options: &Map<String, JsonValue>, name: &str) -> Result<Option<bool>> {
    match options.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(DashError::ConfigurationError(format!(
            "Attribute option '{}' must be a boolean, got {}",
            name, other
        ))),
    }
}

fn unsigned_option(options: &Map<String, JsonValue>, name: &str) -> Result<Option<u64>> {
    match options.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            DashError::ConfigurationError(format!(
                "Attribute option '{}' must be a non-negative integer, got {}",
                name, value
            ))
        }),
    }
}
