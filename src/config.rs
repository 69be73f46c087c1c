//! Per-dashboard preferences
//!
//! The host stores preferences as an opaque JSON object. Every key is
//! optional and unknown keys are ignored:
//!
//! | key               | effect                                                      | default       |
//! |-------------------|-------------------------------------------------------------|---------------|
//! | `layout`          | `table`, `cards` or `accordion`                             | source layout |
//! | `enabled_fields`  | visible fields, in display order; others become hidden      | all visible   |
//! | `enabled_filters` | user filters shown and applied; conditions always apply     | all enabled   |
//! | `filter_values`   | filter name → value or list of values                       | none          |
//! | `per_page`        | rows per page; 0 disables pagination                        | 10            |
//! | `current_page`    | zero-based page                                             | 0             |
//! | `sort`            | `{"field": name, "direction": "asc" \| "desc"}`             | source sort   |

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::data::Value;
use crate::field::SortDirection;
use crate::layout::LayoutKind;
use crate::{DashError, Result};

pub const DEFAULT_PER_PAGE: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPreference {
    pub field: String,
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub layout: Option<LayoutKind>,
    pub enabled_fields: Option<Vec<String>>,
    pub enabled_filters: Option<Vec<String>>,
    #[serde(deserialize_with = "one_or_many")]
    pub filter_values: BTreeMap<String, Vec<Value>>,
    pub per_page: u64,
    pub current_page: u64,
    pub sort: Option<SortPreference>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            layout: None,
            enabled_fields: None,
            enabled_filters: None,
            filter_values: BTreeMap::new(),
            per_page: DEFAULT_PER_PAGE,
            current_page: 0,
            sort: None,
        }
    }
}

impl Preferences {
    /// Parse stored preferences
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
            .map_err(|e| DashError::ValidationError(format!("Invalid preferences: {}", e)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Value>),
    One(Value),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, values)| {
            let values = match values {
                OneOrMany::Many(values) => values,
                OneOrMany::One(value) => vec![value],
            };
            (name, values)
        })
        .collect())
}
