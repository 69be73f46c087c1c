//! Field definition registry

use std::collections::HashMap;

use super::{FieldContribution, FieldDefinition};
use crate::Result;

/// All field definitions known to a catalog, indexed by name
///
/// Registering a name twice replaces the earlier definition: the last
/// registration wins, and the replacement keeps the original position so
/// [`get_all`](FieldRegistry::get_all) stays in first-registration order.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    definitions: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from catalog contributions, in order
    pub fn from_contributions<'a>(
        contributions: impl IntoIterator<Item = &'a FieldContribution>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for contribution in contributions {
            registry.register(contribution.build()?);
        }
        Ok(registry)
    }

    /// Register a definition, returning the one it replaced
    pub fn register(&mut self, definition: FieldDefinition) -> Option<FieldDefinition> {
        match self.index.get(definition.name()) {
            Some(&idx) => {
                tracing::debug!("Field definition '{}' overridden", definition.name());
                Some(std::mem::replace(&mut self.definitions[idx], definition))
            }
            None => {
                self.index
                    .insert(definition.name().to_string(), self.definitions.len());
                self.definitions.push(definition);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&idx| &self.definitions[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Resolve definitions in the order of `names`
    ///
    /// Unknown names are omitted without error.
    pub fn get_many<S: AsRef<str>>(&self, names: &[S]) -> Vec<&FieldDefinition> {
        names
            .iter()
            .filter_map(|name| self.get(name.as_ref()))
            .collect()
    }

    /// All definitions in registration order
    pub fn get_all(&self) -> &[FieldDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(FieldDefinition::name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
