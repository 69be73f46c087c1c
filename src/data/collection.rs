//! Data collection tree
//!
//! A [`DataCollection`] is one node of the tree handed to templates. It holds
//! an ordered set of [`Field`]s and, per child type (`"rows"`, `"sections"`),
//! an ordered list of child collections.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::Value;

/// Child collection type holding one node per database row
pub const ROWS: &str = "rows";
/// Child collection type holding one node per group
pub const SECTIONS: &str = "sections";

/// A mapped leaf value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: Value,
    pub visible: bool,
    pub label: String,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        value: Value,
        visible: bool,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            visible,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataCollection {
    fields: Vec<Field>,
    children: Vec<(String, Vec<DataCollection>)>,
}

impl DataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; a field with the same name is replaced in place.
    pub fn add_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Only the fields flagged visible, in insertion order
    pub fn visible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.visible)
    }

    pub fn add_child(&mut self, child_type: &str, child: DataCollection) {
        match self.children.iter_mut().find(|(t, _)| t == child_type) {
            Some((_, list)) => list.push(child),
            None => self.children.push((child_type.to_string(), vec![child])),
        }
    }

    pub fn get_children(&self, child_type: &str) -> Option<&[DataCollection]> {
        self.children
            .iter()
            .find(|(t, _)| t == child_type)
            .map(|(_, list)| list.as_slice())
    }

    pub fn child_types(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(t, _)| t.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.children.iter().all(|(_, list)| list.is_empty())
    }
}

/// Serialized as `{"fields": [...], "<child type>": [...], ...}`
impl Serialize for DataCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.children.len()))?;
        map.serialize_entry("fields", &self.fields)?;
        for (child_type, list) in &self.children {
            map.serialize_entry(child_type, list)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection() {
        let collection = DataCollection::new();
        assert!(collection.is_empty());
        assert!(collection.get_field("x").is_none());
        assert!(collection.get_children(ROWS).is_none());
    }

    #[test]
    fn test_collection_with_child_is_not_empty() {
        let mut collection = DataCollection::new();
        collection.add_child(ROWS, DataCollection::new());
        assert!(!collection.is_empty());
        assert_eq!(collection.get_children(ROWS).unwrap().len(), 1);
    }

    #[test]
    fn test_add_field_replaces_same_name() {
        let mut collection = DataCollection::new();
        collection.add_field(Field::new("a", Value::from(1), true, "A"));
        collection.add_field(Field::new("a", Value::from(2), false, "A"));
        assert_eq!(collection.fields().len(), 1);
        assert_eq!(collection.get_field("a").unwrap().value, Value::Integer(2));
        assert_eq!(collection.visible_fields().count(), 0);
    }

    #[test]
    fn test_serialize_shape() {
        let mut row = DataCollection::new();
        row.add_field(Field::new("name", Value::from("Ann"), true, "Name"));
        let mut root = DataCollection::new();
        root.add_child(ROWS, row);

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["fields"], serde_json::json!([]));
        assert_eq!(json["rows"][0]["fields"][0]["name"], "name");
        assert_eq!(json["rows"][0]["fields"][0]["value"], "Ann");
        assert_eq!(json["rows"][0]["fields"][0]["visible"], true);
    }
}
