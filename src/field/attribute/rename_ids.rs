//! Rename ids attribute implementation

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

use super::{string_option, AttributeKind, AttributeTrait};
use crate::data::{Row, Value};
use crate::{DashError, Result};

/// Rename ids attribute - maps a separated list of ids to display labels
///
/// Ids without a label are dropped from the output.
#[derive(Debug, Clone)]
pub struct RenameIds {
    labels: HashMap<String, String>,
    separator: String,
}

impl RenameIds {
    pub fn new(labels: HashMap<String, String>, separator: &str) -> Self {
        Self {
            labels,
            separator: separator.to_string(),
        }
    }

    pub(super) fn from_options(options: &Map<String, JsonValue>) -> Result<Self> {
        let labels = match options.get("labels") {
            Some(JsonValue::Object(map)) => map
                .iter()
                .map(|(id, label)| {
                    let label = match label {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (id.clone(), label)
                })
                .collect(),
            Some(other) => {
                return Err(DashError::ConfigurationError(format!(
                    "rename_ids option 'labels' must be an object, got {}",
                    other
                )))
            }
            None => {
                return Err(DashError::ConfigurationError(
                    "rename_ids attribute requires a 'labels' option".to_string(),
                ))
            }
        };
        let separator = string_option(options, "separator")?;
        Ok(Self::new(labels, separator.as_deref().unwrap_or(",")))
    }
}

impl AttributeTrait for RenameIds {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::RenameIds
    }

    fn transform(&self, value: Value, _row: &Row) -> Value {
        if value.is_null() {
            return value;
        }
        let raw = value.to_string();
        let names: Vec<&str> = raw
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter_map(|id| self.labels.get(id).map(String::as_str))
            .collect();
        Value::String(names.join(", "))
    }
}
