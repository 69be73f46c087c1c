//! Boolean attribute implementation

use serde_json::{Map, Value as JsonValue};

use super::{string_option, AttributeKind, AttributeTrait};
use crate::data::{Row, Value};
use crate::Result;

/// Boolean attribute - replaces truthy/falsy values with labels
#[derive(Debug, Clone)]
pub struct Boolean {
    true_label: String,
    false_label: String,
}

impl Boolean {
    pub fn new(true_label: &str, false_label: &str) -> Self {
        Self {
            true_label: true_label.to_string(),
            false_label: false_label.to_string(),
        }
    }

    pub(super) fn from_options(options: &Map<String, JsonValue>) -> Result<Self> {
        let true_label = string_option(options, "true_label")?;
        let false_label = string_option(options, "false_label")?;
        Ok(Self::new(
            true_label.as_deref().unwrap_or("Yes"),
            false_label.as_deref().unwrap_or("No"),
        ))
    }
}

impl AttributeTrait for Boolean {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Boolean
    }

    fn transform(&self, value: Value, _row: &Row) -> Value {
        if value.is_truthy() {
            Value::String(self.true_label.clone())
        } else {
            Value::String(self.false_label.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_default_labels() {
        let attribute = Boolean::from_options(&Map::new()).unwrap();
        let row = Row::new();
        assert_eq!(attribute.transform(Value::from(1), &row), Value::from("Yes"));
        assert_eq!(attribute.transform(Value::from(0), &row), Value::from("No"));
        assert_eq!(attribute.transform(Value::Null, &row), Value::from("No"));
    }

    #[test]
    fn test_boolean_custom_labels() {
        let options = json!({ "true_label": "Active", "false_label": "Suspended" });
        let attribute = Boolean::from_options(options.as_object().unwrap()).unwrap();
        let row = Row::new();
        assert_eq!(attribute.transform(Value::from(true), &row), Value::from("Active"));
        assert_eq!(attribute.transform(Value::from("0"), &row), Value::from("Suspended"));
    }

    #[test]
    fn test_boolean_rejects_non_string_label() {
        let options = json!({ "true_label": 1 });
        assert!(Boolean::from_options(options.as_object().unwrap()).is_err());
    }
}
