//! Filters and conditions
//!
//! A [`Filter`] contributes one WHERE predicate plus its bound parameters.
//! User filters are toggled and filled in by the end user; conditions are
//! always active and never shown in the filter form.
//!
//! Operators are validated when the filter is built, so a typo in a catalog
//! surfaces as [`DashError::InvalidOperator`] immediately instead of at query
//! time.

mod collection;
mod form;

pub use collection::FilterCollection;
pub use form::{FilterForm, FilterInput, FilterOption};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::{QueryParams, Value};
use crate::{DashError, Result};

/// Comparison operators a filter may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    Like,
}

impl Operator {
    /// Parse an operator for the named filter
    pub fn parse(filter: &str, operator: &str) -> Result<Self> {
        let normalized = operator.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_lowercase().as_str() {
            "=" | "==" | "eq" => Operator::Equal,
            "!=" | "<>" | "ne" => Operator::NotEqual,
            "<" | "lt" => Operator::LessThan,
            "<=" | "lte" => Operator::LessThanOrEqual,
            ">" | "gt" => Operator::GreaterThan,
            ">=" | "gte" => Operator::GreaterThanOrEqual,
            "in" => Operator::In,
            "not in" => Operator::NotIn,
            "like" => Operator::Like,
            _ => {
                return Err(DashError::InvalidOperator {
                    filter: filter.to_string(),
                    operator: operator.to_string(),
                })
            }
        };
        Ok(op)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// What kind of input a filter takes and how its values are bound
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Choice among options, either static or loaded by `options_query`
    /// (columns `value` and `label`)
    Select {
        options: Vec<FilterOption>,
        options_query: Option<String>,
        multiple: bool,
    },
    /// Free text, matched with LIKE by default
    Text,
    /// Checkbox, bound as 1 or 0
    Boolean,
    /// ISO date (`YYYY-MM-DD`) or unix timestamp, bound as a timestamp
    Date,
    /// Raw SQL predicate with fixed parameters
    Sql { sql: String, params: QueryParams },
}

impl FilterKind {
    fn default_operator(&self) -> Operator {
        match self {
            FilterKind::Select { multiple: true, .. } => Operator::In,
            FilterKind::Text => Operator::Like,
            FilterKind::Date => Operator::GreaterThanOrEqual,
            _ => Operator::Equal,
        }
    }

    pub fn input_type(&self) -> &'static str {
        match self {
            FilterKind::Select { .. } => "select",
            FilterKind::Text => "text",
            FilterKind::Boolean => "checkbox",
            FilterKind::Date => "date",
            FilterKind::Sql { .. } => "sql",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    selector: String,
    label: String,
    operator: Operator,
    kind: FilterKind,
    condition: bool,
    required: bool,
    values: Vec<Value>,
    defaults: Vec<Value>,
    join: Option<String>,
}

impl Filter {
    /// Create a user filter; `operator` is validated here
    pub fn new(
        name: impl Into<String>,
        selector: impl Into<String>,
        label: impl Into<String>,
        kind: FilterKind,
        operator: Option<&str>,
    ) -> Result<Self> {
        let name = name.into();
        let operator = match operator {
            Some(op) => Operator::parse(&name, op)?,
            None => kind.default_operator(),
        };
        Ok(Self {
            name,
            selector: selector.into(),
            label: label.into(),
            operator,
            kind,
            condition: false,
            required: false,
            values: Vec::new(),
            defaults: Vec::new(),
            join: None,
        })
    }

    /// Create an always-on condition with fixed values
    pub fn condition(
        name: impl Into<String>,
        selector: impl Into<String>,
        operator: &str,
        values: Vec<Value>,
    ) -> Result<Self> {
        let name = name.into();
        let mut filter = Self::new(name.clone(), selector, name, FilterKind::Text, Some(operator))?;
        filter.kind = FilterKind::Select {
            options: Vec::new(),
            options_query: None,
            multiple: values.len() > 1,
        };
        filter.condition = true;
        filter.required = true;
        filter.defaults = clean_values(values);
        Ok(filter)
    }

    /// Create an always-on condition from a raw SQL predicate
    pub fn sql_condition(name: impl Into<String>, sql: impl Into<String>, params: QueryParams) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            selector: String::new(),
            operator: Operator::Equal,
            kind: FilterKind::Sql {
                sql: sql.into(),
                params,
            },
            condition: true,
            required: true,
            values: Vec::new(),
            defaults: Vec::new(),
            join: None,
        }
    }

    /// Fail composition instead of skipping when no value is supplied
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Values used while the user has not applied any
    pub fn with_defaults(mut self, values: Vec<Value>) -> Self {
        self.defaults = clean_values(values);
        self
    }

    /// JOIN clause the selector needs, added to the query only while the
    /// filter contributes a predicate
    pub fn with_join(mut self, join: impl Into<String>) -> Self {
        let join = join.into();
        self.join = (!join.trim().is_empty()).then_some(join);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join(&self) -> Option<&str> {
        self.join.as_deref()
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    pub fn is_condition(&self) -> bool {
        self.condition
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Record user-supplied values. Nulls and empty strings count as no value.
    pub fn apply(&mut self, values: Vec<Value>) {
        self.values = clean_values(values);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Applied values, or the defaults when nothing was applied
    pub fn values(&self) -> &[Value] {
        if self.values.is_empty() {
            &self.defaults
        } else {
            &self.values
        }
    }

    pub fn has_values(&self) -> bool {
        !self.values().is_empty()
    }

    /// SQL fragment and parameters, or `None` when an optional filter has no value
    pub fn sql_and_params(&self) -> Result<Option<(String, QueryParams)>> {
        if let FilterKind::Sql { sql, params } = &self.kind {
            return Ok(Some((format!("({})", sql), params.clone())));
        }

        let values = self.bind_values()?;
        if values.is_empty() {
            if self.required {
                return Err(DashError::ValidationError(format!(
                    "Filter '{}' requires a value but none was supplied",
                    self.name
                )));
            }
            return Ok(None);
        }

        let operator = match (self.operator, values.len()) {
            (Operator::Equal, n) if n > 1 => Operator::In,
            (Operator::NotEqual, n) if n > 1 => Operator::NotIn,
            (op, _) => op,
        };

        let base = param_base(&self.name);
        let mut params = QueryParams::new();
        let sql = match operator {
            Operator::In | Operator::NotIn => {
                let placeholders: Vec<String> = values
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let key = format!("{}_{}", base, i);
                        params.insert(key.clone(), value);
                        format!(":{}", key)
                    })
                    .collect();
                format!(
                    "{} {} ({})",
                    self.selector,
                    operator.as_sql(),
                    placeholders.join(", ")
                )
            }
            Operator::Like => {
                let clauses: Vec<String> = values
                    .into_iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let key = format!("{}_{}", base, i);
                        params.insert(key.clone(), format!("%{}%", escape_like(&value.to_string())));
                        format!("{} LIKE :{} ESCAPE '\\'", self.selector, key)
                    })
                    .collect();
                let joined = clauses.join(" OR ");
                if clauses.len() == 1 {
                    joined
                } else {
                    format!("({})", joined)
                }
            }
            scalar => {
                if values.len() > 1 {
                    tracing::warn!(
                        "Filter '{}' uses '{}' with {} values; only the first is used",
                        self.name,
                        scalar,
                        values.len()
                    );
                }
                let key = format!("{}_0", base);
                let value = values.into_iter().next().unwrap_or(Value::Null);
                params.insert(key.clone(), value);
                format!("{} {} :{}", self.selector, scalar.as_sql(), key)
            }
        };

        Ok(Some((sql, params)))
    }

    /// Convert the effective values into what gets bound for this kind
    fn bind_values(&self) -> Result<Vec<Value>> {
        let values = self.values();
        match &self.kind {
            FilterKind::Boolean => Ok(values
                .iter()
                .take(1)
                .map(|v| Value::Integer(v.is_truthy() as i64))
                .collect()),
            FilterKind::Date => values
                .iter()
                .map(|v| date_to_timestamp(&self.name, v))
                .collect(),
            _ => Ok(values.to_vec()),
        }
    }
}

fn clean_values(values: Vec<Value>) -> Vec<Value> {
    values
        .into_iter()
        .filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
        .collect()
}

/// Parameter name prefix derived from the filter name
fn param_base(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("f_{}", sanitized)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn date_to_timestamp(filter: &str, value: &Value) -> Result<Value> {
    if let Value::Integer(ts) = value {
        return Ok(Value::Integer(*ts));
    }
    let text = value.to_string();
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| {
        DashError::ValidationError(format!(
            "Filter '{}' expects a date as YYYY-MM-DD, got '{}'",
            filter, text
        ))
    })?;
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| DashError::InternalError(format!("Invalid midnight for {}", date)))?;
    Ok(Value::Integer(timestamp))
}

/// Filter as declared in a catalog file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: FilterKindName,
    #[serde(default)]
    pub operator: Option<String>,
    /// Conditions are always active and hidden from the form
    #[serde(default)]
    pub condition: bool,
    #[serde(default)]
    pub required: bool,
    /// Fixed values for conditions, default values for filters
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub options: Vec<FilterOption>,
    #[serde(default)]
    pub options_query: Option<String>,
    #[serde(default)]
    pub multiple: bool,
    /// Predicate for `sql` conditions
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// JOIN clause the selector or predicate depends on
    #[serde(default)]
    pub join: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKindName {
    #[default]
    Select,
    Text,
    Boolean,
    Date,
    Sql,
}

impl FilterDefinition {
    pub fn build(&self) -> Result<Filter> {
        let filter = self.build_filter()?;
        Ok(match &self.join {
            Some(join) => filter.with_join(join.clone()),
            None => filter,
        })
    }

    fn build_filter(&self) -> Result<Filter> {
        let kind = match self.kind {
            FilterKindName::Sql => return self.build_sql_condition(),
            FilterKindName::Select => FilterKind::Select {
                options: self.options.clone(),
                options_query: self.options_query.clone(),
                multiple: self.multiple,
            },
            FilterKindName::Text => FilterKind::Text,
            FilterKindName::Boolean => FilterKind::Boolean,
            FilterKindName::Date => FilterKind::Date,
        };

        let selector = self
            .selector
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                DashError::ConfigurationError(format!("Filter '{}' has no selector", self.name))
            })?;

        if self.condition {
            return Filter::condition(
                self.name.clone(),
                selector,
                self.operator.as_deref().unwrap_or("="),
                self.values.clone(),
            );
        }

        let label = self.label.clone().unwrap_or_else(|| self.name.clone());
        let mut filter = Filter::new(self.name.clone(), selector, label, kind, self.operator.as_deref())?
            .with_defaults(self.values.clone());
        if self.required {
            filter = filter.required();
        }
        Ok(filter)
    }

    fn build_sql_condition(&self) -> Result<Filter> {
        let sql = self.sql.clone().filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            DashError::ConfigurationError(format!(
                "SQL condition '{}' has no 'sql' predicate",
                self.name
            ))
        })?;
        let mut params = QueryParams::new();
        for (name, value) in &self.params {
            params.insert(name.clone(), value.clone());
        }
        Ok(Filter::sql_condition(self.name.clone(), sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select(name: &str, selector: &str) -> Filter {
        Filter::new(
            name,
            selector,
            name,
            FilterKind::Select {
                options: Vec::new(),
                options_query: None,
                multiple: false,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_operator_fails_at_construction() {
        let err = Filter::new("f", "u.id", "F", FilterKind::Text, Some("~=")).unwrap_err();
        match err {
            DashError::InvalidOperator { filter, operator } => {
                assert_eq!(filter, "f");
                assert_eq!(operator, "~=");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_operator_spellings() {
        assert_eq!(Operator::parse("f", "NOT  IN").unwrap(), Operator::NotIn);
        assert_eq!(Operator::parse("f", "<>").unwrap(), Operator::NotEqual);
        assert_eq!(Operator::parse("f", "Like").unwrap(), Operator::Like);
        assert!(Operator::parse("f", "between").is_err());
    }

    #[test]
    fn test_optional_filter_without_value_is_skipped() {
        let filter = select("dept", "u.department");
        assert_eq!(filter.sql_and_params().unwrap(), None);
    }

    #[test]
    fn test_required_filter_without_value_errors() {
        let filter = select("dept", "u.department").required();
        assert!(matches!(
            filter.sql_and_params(),
            Err(DashError::ValidationError(_))
        ));
    }

    #[test]
    fn test_equal_single_value() {
        let mut filter = select("dept", "u.department");
        filter.apply(vec![Value::from("Sales")]);

        let (sql, params) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.department = :f_dept_0");
        assert_eq!(params.get("f_dept_0"), Some(&Value::from("Sales")));
    }

    #[test]
    fn test_equal_many_values_becomes_in() {
        let mut filter = select("dept", "u.department");
        filter.apply(vec![Value::from("Sales"), Value::from("Engineering")]);

        let (sql, params) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.department IN (:f_dept_0, :f_dept_1)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_not_in() {
        let filter = Filter::condition(
            "not_admin",
            "u.id",
            "not in",
            vec![Value::from(1), Value::from(2)],
        )
        .unwrap();
        let (sql, _) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.id NOT IN (:f_not_admin_0, :f_not_admin_1)");
    }

    #[test]
    fn test_text_filter_escapes_like() {
        let mut filter = Filter::new("q", "u.email", "Search", FilterKind::Text, None).unwrap();
        filter.apply(vec![Value::from("50%_off")]);

        let (sql, params) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.email LIKE :f_q_0 ESCAPE '\\'");
        assert_eq!(params.get("f_q_0"), Some(&Value::from("%50\\%\\_off%")));
    }

    #[test]
    fn test_empty_strings_are_no_value() {
        let mut filter = Filter::new("q", "u.email", "Search", FilterKind::Text, None).unwrap();
        filter.apply(vec![Value::from("  "), Value::Null]);
        assert!(!filter.has_values());
        assert_eq!(filter.sql_and_params().unwrap(), None);
    }

    #[test]
    fn test_defaults_until_applied() {
        let mut filter = select("dept", "u.department").with_defaults(vec![Value::from("Sales")]);
        assert_eq!(filter.values(), &[Value::from("Sales")]);

        filter.apply(vec![Value::from("Marketing")]);
        assert_eq!(filter.values(), &[Value::from("Marketing")]);

        filter.clear();
        assert_eq!(filter.values(), &[Value::from("Sales")]);
    }

    #[test]
    fn test_boolean_filter_binds_integer() {
        let mut filter = Filter::new("active", "u.suspended", "Active", FilterKind::Boolean, None).unwrap();
        filter.apply(vec![Value::from(true)]);
        let (sql, params) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.suspended = :f_active_0");
        assert_eq!(params.get("f_active_0"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_date_filter_converts_to_timestamp() {
        let mut filter = Filter::new("since", "u.timecreated", "Since", FilterKind::Date, None).unwrap();
        filter.apply(vec![Value::from("2024-01-05")]);
        let (sql, params) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.timecreated >= :f_since_0");
        assert_eq!(params.get("f_since_0"), Some(&Value::Integer(1_704_412_800)));
    }

    #[test]
    fn test_date_filter_rejects_garbage() {
        let mut filter = Filter::new("since", "u.timecreated", "Since", FilterKind::Date, None).unwrap();
        filter.apply(vec![Value::from("yesterday")]);
        assert!(matches!(
            filter.sql_and_params(),
            Err(DashError::ValidationError(_))
        ));
    }

    #[test]
    fn test_sql_condition_wrapped() {
        let mut params = QueryParams::new();
        params.insert("deleted", 0);
        let filter = Filter::sql_condition("live", "u.deleted = :deleted OR u.id = 1", params);
        let (sql, params) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "(u.deleted = :deleted OR u.id = 1)");
        assert_eq!(params.get("deleted"), Some(&Value::Integer(0)));
        assert!(filter.is_condition());
    }

    #[test]
    fn test_param_names_sanitized() {
        let mut filter = select("course-name", "c.fullname");
        filter.apply(vec![Value::from("Physics")]);
        let (sql, _) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "c.fullname = :f_course_name_0");
    }

    #[test]
    fn test_definition_build_filter() {
        let definition: FilterDefinition = serde_json::from_value(json!({
            "name": "dept",
            "selector": "u.department",
            "label": "Department",
            "kind": "select",
            "multiple": true,
            "options": [{ "value": "Sales", "label": "Sales" }]
        }))
        .unwrap();
        let filter = definition.build().unwrap();
        assert_eq!(filter.operator(), Operator::In);
        assert!(!filter.is_condition());
        assert_eq!(filter.label(), "Department");
    }

    #[test]
    fn test_definition_build_condition() {
        let definition: FilterDefinition = serde_json::from_value(json!({
            "name": "not_deleted",
            "selector": "u.deleted",
            "condition": true,
            "values": [0]
        }))
        .unwrap();
        let filter = definition.build().unwrap();
        assert!(filter.is_condition());
        assert!(filter.is_required());
        let (sql, _) = filter.sql_and_params().unwrap().unwrap();
        assert_eq!(sql, "u.deleted = :f_not_deleted_0");
    }

    #[test]
    fn test_definition_invalid_operator() {
        let definition: FilterDefinition = serde_json::from_value(json!({
            "name": "x",
            "selector": "u.x",
            "operator": "almost"
        }))
        .unwrap();
        assert!(matches!(
            definition.build(),
            Err(DashError::InvalidOperator { .. })
        ));
    }

    #[test]
    fn test_definition_missing_selector() {
        let definition: FilterDefinition =
            serde_json::from_value(json!({ "name": "x", "kind": "text" })).unwrap();
        assert!(matches!(
            definition.build(),
            Err(DashError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_definition_carries_join() {
        let definition: FilterDefinition = serde_json::from_value(json!({
            "name": "course",
            "selector": "c.id",
            "join": "JOIN courses c ON c.id = e.courseid"
        }))
        .unwrap();
        let filter = definition.build().unwrap();
        assert_eq!(filter.join(), Some("JOIN courses c ON c.id = e.courseid"));

        let blank: FilterDefinition = serde_json::from_value(json!({
            "name": "course",
            "selector": "c.id",
            "join": "  "
        }))
        .unwrap();
        assert_eq!(blank.build().unwrap().join(), None);
    }
}
