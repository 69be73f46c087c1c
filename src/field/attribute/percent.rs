//! Percent attribute implementation

use serde_json::{Map, Value as JsonValue};

use super::{bool_option, unsigned_option, AttributeKind, AttributeTrait};
use crate::data::{Row, Value};
use crate::Result;

/// Percent attribute - renders a number as a percentage string
///
/// With `ratio` set the value is a fraction (0.25 → 25%), otherwise it is
/// already a percentage.
#[derive(Debug, Clone, Copy)]
pub struct Percent {
    decimals: usize,
    ratio: bool,
}

impl Percent {
    pub fn new(decimals: usize, ratio: bool) -> Self {
        Self { decimals, ratio }
    }

    pub(super) fn from_options(options: &Map<String, JsonValue>) -> Result<Self> {
        let decimals = unsigned_option(options, "decimals")?.unwrap_or(0) as usize;
        let ratio = bool_option(options, "ratio")?.unwrap_or(false);
        Ok(Self::new(decimals, ratio))
    }
}

impl AttributeTrait for Percent {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Percent
    }

    fn transform(&self, value: Value, _row: &Row) -> Value {
        if value.is_null() {
            return value;
        }
        match value.as_f64() {
            Some(n) => {
                let n = if self.ratio { n * 100.0 } else { n };
                Value::String(format!("{:.*}%", self.decimals, n))
            }
            None => value,
        }
    }
}
