//! Filter form description
//!
//! The core does not render forms. It describes the inputs a template needs
//! to draw one: labels, input type, options and current values.

use serde::{Deserialize, Serialize};

use crate::data::Value;

/// One choice of a select filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: Value,
    pub label: String,
    #[serde(default, skip_deserializing)]
    pub selected: bool,
}

impl FilterOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected: false,
        }
    }
}

/// Form input for one user filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterInput {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub multiple: bool,
    pub required: bool,
    pub options: Vec<FilterOption>,
    pub values: Vec<Value>,
}

/// Inputs for every enabled user filter, in collection order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterForm {
    pub inputs: Vec<FilterInput>,
}

impl FilterForm {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn input(&self, name: &str) -> Option<&FilterInput> {
        self.inputs.iter().find(|input| input.name == name)
    }
}
