//! Link attribute implementation

use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::sync::OnceLock;

use super::{string_option, AttributeKind, AttributeTrait};
use crate::data::{Row, Value};
use crate::{DashError, Result};

/// Link attribute - wraps the value in a hyperlink
///
/// The `url` option is a template; `{column}` placeholders are filled from the
/// row, so a profile link can be built from a user id selected alongside the
/// displayed name. The optional `label` template works the same way and
/// defaults to the value itself.
#[derive(Debug, Clone)]
pub struct Link {
    url: String,
    label: Option<String>,
}

impl Link {
    pub fn new(url: &str, label: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            label: label.map(str::to_string),
        }
    }

    pub(super) fn from_options(options: &Map<String, JsonValue>) -> Result<Self> {
        let url = string_option(options, "url")?.ok_or_else(|| {
            DashError::ConfigurationError("link attribute requires a 'url' option".to_string())
        })?;
        let label = string_option(options, "label")?;
        Ok(Self::new(&url, label.as_deref()))
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("valid placeholder regex"))
}

/// Column names referenced by `{column}` placeholders, in order
pub(crate) fn placeholder_names(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Fill `{column}` placeholders from the row; unknown columns become empty
pub(crate) fn fill_placeholders(template: &str, row: &Row) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            row.get(&caps[1]).map(|v| v.to_string()).unwrap_or_default()
        })
        .into_owned()
}

impl AttributeTrait for Link {
    fn attribute_kind(&self) -> AttributeKind {
        AttributeKind::Link
    }

    fn transform(&self, value: Value, row: &Row) -> Value {
        if value.is_null() {
            return value;
        }
        let label = match &self.label {
            Some(template) => fill_placeholders(template, row),
            None => value.to_string(),
        };
        Value::Link {
            href: fill_placeholders(&self.url, row),
            label,
        }
    }

    fn referenced_fields(&self) -> Vec<String> {
        let mut names = placeholder_names(&self.url);
        if let Some(label) = &self.label {
            names.extend(placeholder_names(label));
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_row() -> Row {
        vec![
            ("u_id", Value::from(7)),
            ("u_firstname", Value::from("Ada")),
            ("u_lastname", Value::from("Lovelace")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_link_reads_sibling_columns() {
        let link = Link::new("/user/profile?id={u_id}", None);
        assert_eq!(
            link.transform(Value::from("Ada"), &user_row()),
            Value::Link {
                href: "/user/profile?id=7".to_string(),
                label: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_link_label_template() {
        let link = Link::new("/u/{u_id}", Some("{u_firstname} {u_lastname}"));
        let Value::Link { label, .. } = link.transform(Value::from(7), &user_row()) else {
            panic!("expected a link");
        };
        assert_eq!(label, "Ada Lovelace");
    }

    #[test]
    fn test_link_unknown_placeholder_is_empty() {
        assert_eq!(fill_placeholders("/x/{missing}/y", &user_row()), "/x//y");
    }

    #[test]
    fn test_link_referenced_fields() {
        let link = Link::new("/u/{u_id}?c={c_id}", Some("{u_firstname}"));
        assert_eq!(link.referenced_fields(), vec!["u_id", "c_id", "u_firstname"]);
        assert!(Link::new("/static", None).referenced_fields().is_empty());
    }

    #[test]
    fn test_link_null_stays_null() {
        let link = Link::new("/u/{u_id}", None);
        assert_eq!(link.transform(Value::Null, &user_row()), Value::Null);
    }

    #[test]
    fn test_link_requires_url() {
        let options = json!({ "label": "x" });
        assert!(Link::from_options(options.as_object().unwrap()).is_err());
    }
}
