//! Image attribute implementation

use serde_json::{Map, Value as JsonValue};

use super::link::{fill_placeholders, placeholder_names};
use super::{string_option, AttributeKind, AttributeTrait};
use crate::data::{Row, Value};
use crate::Result;

/// Image attribute - treats the value as an image URL
///
/// The `alt` option may reference row columns with `{column}` placeholders.
#[derive(Debug, Clone)]
pub struct Image {
    alt: Option<String>,
}

impl Image {
    pub fn new(alt: Option<&str>) -> Self {
        Self {
            alt: alt.map(str::to_string),
        }
    }

    pub(super) fn from_options(options: &Map<String, JsonValue>) -> Result<Self> {
        let alt = string_option(options, "alt")?;
        Ok(Self::new(alt.as_deref()))
    }
}

impl AttributeTrait for Image {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Image
    }

    fn transform(&self, value: Value, row: &Row) -> Value {
        if !value.is_truthy() {
            return Value::Null;
        }
        Value::Image {
            src: value.to_string(),
            alt: self
                .alt
                .as_deref()
                .map(|alt| fill_placeholders(alt, row))
                .unwrap_or_default(),
        }
    }

    fn referenced_fields(&self) -> Vec<String> {
        self.alt.as_deref().map(placeholder_names).unwrap_or_default()
    }
}
