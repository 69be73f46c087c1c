//! Identifier attribute

use super::{AttributeKind, AttributeTrait};
use crate::data::{Row, Value};

/// Marks a field as the row identifier
///
/// The value passes through untouched. Identifier fields are always selected
/// and always come first in the select list, so row identity stays stable no
/// matter which subset of fields a dashboard shows.
#[derive(Debug, Clone, Copy)]
pub struct Identifier;

impl AttributeTrait for Identifier {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Identifier
    }

    fn transform(&self, value: Value, _row: &Row) -> Value {
        value
    }

    fn is_identifier(&self) -> bool {
        true
    }
}
