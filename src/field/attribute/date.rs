//! Date attribute implementation (unix timestamp → formatted string)

use chrono::DateTime;
use serde_json::{Map, Value as JsonValue};

use super::{string_option, AttributeKind, AttributeTrait};
use crate::data::{Row, Value};
use crate::Result;

const DEFAULT_FORMAT: &str = "%d %B %Y, %H:%M";

/// Date attribute - formats a unix timestamp (seconds, UTC)
///
/// Zero and null timestamps mean "never" and become null. Values that are not
/// numeric pass through unchanged.
#[derive(Debug, Clone)]
pub struct Date {
    format: String,
}

impl Date {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
        }
    }

    pub(super) fn from_options(options: &Map<String, JsonValue>) -> Result<Self> {
        let format = string_option(options, "format")?;
        Ok(Self::new(format.as_deref().unwrap_or(DEFAULT_FORMAT)))
    }
}

impl AttributeTrait for Date {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Date
    }

    fn transform(&self, value: Value, _row: &Row) -> Value {
        let Some(timestamp) = value.as_i64() else {
            return value;
        };
        if timestamp == 0 {
            return Value::Null;
        }
        match DateTime::from_timestamp(timestamp, 0) {
            Some(dt) => Value::String(dt.format(&self.format).to_string()),
            None => value,
        }
    }
}
