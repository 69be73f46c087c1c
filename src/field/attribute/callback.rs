//! Closure-backed attribute

use std::sync::Arc;

use super::{AttributeKind, AttributeTrait};
use crate::data::{Row, Value};

type TransformFn = dyn Fn(Value, &Row) -> Value + Send + Sync;

/// Attribute backed by a caller-supplied closure
#[derive(Clone)]
pub struct Callback {
    name: String,
    f: Arc<TransformFn>,
}

impl Callback {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(Value, &Row) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            f: Arc::new(f),
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback").field("name", &self.name).finish()
    }
}

impl AttributeTrait for Callback {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Callback
    }

    fn transform(&self, value: Value, row: &Row) -> Value {
        (self.f)(value, row)
    }
}
