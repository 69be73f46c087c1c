//! Row to tree mapping strategies

use std::collections::HashMap;

use super::collection::{DataCollection, Field, ROWS, SECTIONS};
use super::{Row, Value};
use crate::field::FieldDefinition;
use crate::{DashError, Result};

/// Reserved column that only keeps SQL rows distinct; never displayed
pub const UNIQUE_ID: &str = "unique_id";

/// Policy converting flat rows into a [`DataCollection`] tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DataStrategy {
    /// One `"rows"` child per row
    #[default]
    Standard,
    /// Rows bucketed under `"sections"`, one per distinct `group_by` value
    ///
    /// Rows whose group value is falsy (null, 0, empty) are dropped.
    Grouped {
        group_by: String,
        group_label: String,
    },
}

impl DataStrategy {
    pub fn grouped(group_by: impl Into<String>, group_label: impl Into<String>) -> Self {
        DataStrategy::Grouped {
            group_by: group_by.into(),
            group_label: group_label.into(),
        }
    }

    /// Field names the strategy reads besides the visible fields
    pub fn required_fields(&self) -> Vec<&str> {
        match self {
            DataStrategy::Standard => Vec::new(),
            DataStrategy::Grouped {
                group_by,
                group_label,
            } => vec![group_by.as_str(), group_label.as_str()],
        }
    }

    /// Map rows into a tree
    ///
    /// Only visible definitions produce fields, in the order given. A
    /// definition whose column is missing from a row is skipped for that row.
    pub fn convert(&self, rows: Vec<Row>, definitions: &[FieldDefinition]) -> Result<DataCollection> {
        match self {
            DataStrategy::Standard => Ok(convert_standard(rows, definitions)),
            DataStrategy::Grouped {
                group_by,
                group_label,
            } => convert_grouped(rows, definitions, group_by, group_label),
        }
    }
}

fn map_row(row: &Row, definitions: &[FieldDefinition]) -> DataCollection {
    let mut collection = DataCollection::new();
    for definition in definitions.iter().filter(|d| d.is_visible()) {
        let Some(raw) = row.get(definition.name()) else {
            continue;
        };
        let value = definition.transform(raw.clone(), row);
        collection.add_field(Field::new(definition.name(), value, true, definition.title()));
    }
    collection
}

fn convert_standard(rows: Vec<Row>, definitions: &[FieldDefinition]) -> DataCollection {
    let mut result = DataCollection::new();
    let count = rows.len();
    for mut row in rows {
        row.remove(UNIQUE_ID);
        result.add_child(ROWS, map_row(&row, definitions));
    }
    tracing::debug!("Mapped {} rows", count);
    result
}

fn find_definition<'a>(
    definitions: &'a [FieldDefinition],
    name: &str,
    role: &str,
) -> Result<&'a FieldDefinition> {
    definitions.iter().find(|d| d.name() == name).ok_or_else(|| {
        DashError::ConfigurationError(format!(
            "Grouped layout needs {} field '{}' but it is not available",
            role, name
        ))
    })
}

/// Value variant plus its text, so `1` and `"1"` form separate groups
type GroupKey = (&'static str, String);

fn group_key(value: &Value) -> GroupKey {
    match value {
        Value::Null => ("null", String::new()),
        Value::Boolean(b) => ("boolean", b.to_string()),
        Value::Integer(i) => ("integer", i.to_string()),
        Value::Number(n) => ("number", n.to_bits().to_string()),
        Value::String(s) => ("string", s.clone()),
        Value::Link { href, label } => ("link", format!("{}\u{0}{}", href, label)),
        Value::Image { src, alt } => ("image", format!("{}\u{0}{}", src, alt)),
    }
}

fn convert_grouped(
    rows: Vec<Row>,
    definitions: &[FieldDefinition],
    group_by: &str,
    group_label: &str,
) -> Result<DataCollection> {
    let group_by_def = find_definition(definitions, group_by, "group by")?;
    let group_label_def = find_definition(definitions, group_label, "group label")?;

    let mut groups: Vec<DataCollection> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut dropped = 0usize;

    for mut row in rows {
        row.remove(UNIQUE_ID);

        let key = match row.get(group_by_def.name()) {
            Some(value) if value.is_truthy() => value.clone(),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let slot = match index.get(&group_key(&key)) {
            Some(&slot) => slot,
            None => {
                let label = row
                    .get(group_label_def.name())
                    .map(|raw| group_label_def.transform(raw.clone(), &row))
                    .unwrap_or(Value::Null);

                let mut group = DataCollection::new();
                group.add_field(Field::new("groupby", key.clone(), true, group_by_def.title()));
                group.add_field(Field::new("label", label, true, group_label_def.title()));

                groups.push(group);
                index.insert(group_key(&key), groups.len() - 1);
                groups.len() - 1
            }
        };

        groups[slot].add_child(ROWS, map_row(&row, definitions));
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} rows without a '{}' value", dropped, group_by);
    }

    let mut result = DataCollection::new();
    for group in groups {
        result.add_child(SECTIONS, group);
    }
    Ok(result)
}
