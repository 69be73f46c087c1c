//! Filter collection for one data source

use super::form::{FilterForm, FilterInput, FilterOption};
use super::{Filter, FilterKind};
use crate::data::{QueryParams, Value};
use crate::reader::Reader;
use crate::{DashError, Result};

#[derive(Debug, Clone)]
struct Entry {
    filter: Filter,
    enabled: bool,
}

/// Ordered set of filters and conditions, keyed by name
///
/// Lookups by an unknown name are silent no-ops: [`apply`](Self::apply) and
/// [`set_enabled`](Self::set_enabled) ignore names the collection does not
/// hold. Callers that need to reject bad names validate against
/// [`get_all`](Self::get_all) first.
#[derive(Debug, Clone, Default)]
pub struct FilterCollection {
    entries: Vec<Entry>,
}

impl FilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enabled filter. A filter with the same name is replaced in place.
    pub fn add(&mut self, filter: Filter) {
        match self.entries.iter_mut().find(|e| e.filter.name() == filter.name()) {
            Some(entry) => entry.filter = filter,
            None => self.entries.push(Entry {
                filter,
                enabled: true,
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Filter> {
        let idx = self.entries.iter().position(|e| e.filter.name() == name)?;
        Some(self.entries.remove(idx).filter)
    }

    pub fn get_all(&self) -> Vec<&Filter> {
        self.entries.iter().map(|e| &e.filter).collect()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Filter> {
        self.entries
            .iter()
            .find(|e| e.filter.name() == name)
            .map(|e| &e.filter)
    }

    /// Record user values for a filter
    ///
    /// Unknown names are ignored, and so are conditions: their values are
    /// fixed by the data source.
    pub fn apply(&mut self, name: &str, values: Vec<Value>) {
        match self.entries.iter_mut().find(|e| e.filter.name() == name) {
            Some(entry) if !entry.filter.is_condition() => entry.filter.apply(values),
            Some(_) => tracing::debug!("Ignoring values for condition '{}'", name),
            None => tracing::debug!("Ignoring values for unknown filter '{}'", name),
        }
    }

    /// Enable or disable a filter; unknown names are ignored
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.filter.name() == name) {
            entry.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.enabled && e.filter.name() == name)
    }

    /// Enabled filters and conditions, in order
    pub fn enabled(&self) -> impl Iterator<Item = &Filter> {
        self.entries.iter().filter(|e| e.enabled).map(|e| &e.filter)
    }

    /// User-adjustable filters (not conditions), enabled or not
    pub fn user_filters(&self) -> impl Iterator<Item = &Filter> {
        self.entries
            .iter()
            .map(|e| &e.filter)
            .filter(|f| !f.is_condition())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Combined predicate of every enabled filter, joined with `AND`
    ///
    /// Optional filters without values contribute nothing, so the result is
    /// an empty string when no predicate applies. Two filters binding the
    /// same parameter name (`course-id` and `course_id` both sanitize to
    /// `f_course_id`) are a configuration error.
    pub fn to_sql_and_params(&self) -> Result<(String, QueryParams)> {
        let mut fragments = Vec::new();
        let mut params = QueryParams::new();
        let mut owners: Vec<(String, &str)> = Vec::new();
        for filter in self.enabled() {
            if let Some((sql, filter_params)) = filter.sql_and_params()? {
                for (key, _) in filter_params.iter() {
                    if let Some((_, owner)) = owners.iter().find(|(k, _)| k == key) {
                        return Err(DashError::ConfigurationError(format!(
                            "Filters '{}' and '{}' both bind parameter ':{}'",
                            owner,
                            filter.name(),
                            key
                        )));
                    }
                    owners.push((key.to_string(), filter.name()));
                }
                fragments.push(sql);
                params.extend(filter_params);
            }
        }
        Ok((fragments.join(" AND "), params))
    }

    /// JOIN clauses of enabled filters that currently contribute a predicate
    pub fn joins(&self) -> Vec<&str> {
        self.enabled()
            .filter(|f| f.is_condition() || f.has_values())
            .filter_map(Filter::join)
            .collect()
    }

    /// Describe the enabled user filters for a form
    ///
    /// `reader` loads options for select filters declared with an options
    /// query; without one those filters only offer their static options.
    pub fn form(&self, reader: Option<&dyn Reader>) -> Result<FilterForm> {
        let mut inputs = Vec::new();
        for filter in self.enabled().filter(|f| !f.is_condition()) {
            let (mut options, multiple) = match filter.kind() {
                FilterKind::Select {
                    options,
                    options_query,
                    multiple,
                } => {
                    let mut all = options.clone();
                    if let (Some(query), Some(reader)) = (options_query, reader) {
                        all.extend(load_options(reader, query)?);
                    }
                    (all, *multiple)
                }
                _ => (Vec::new(), false),
            };

            let values = filter.values().to_vec();
            for option in options.iter_mut() {
                let key = option.value.to_string();
                option.selected = values.iter().any(|v| v.to_string() == key);
            }

            inputs.push(FilterInput {
                name: filter.name().to_string(),
                label: filter.label().to_string(),
                input_type: filter.kind().input_type().to_string(),
                multiple,
                required: filter.is_required(),
                options,
                values,
            });
        }
        Ok(FilterForm { inputs })
    }
}

/// Options from a query returning `value` and `label` columns
fn load_options(reader: &dyn Reader, query: &str) -> Result<Vec<FilterOption>> {
    let rows = reader.execute_sql(query, &QueryParams::new(), 0, 0)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let value = row
                .get("value")
                .cloned()
                .or_else(|| row.columns().next().map(|(_, v)| v.clone()))?;
            let label = row
                .get("label")
                .map(|v| v.to_string())
                .unwrap_or_else(|| value.to_string());
            Some(FilterOption::new(value, label))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept() -> Filter {
        Filter::new(
            "dept",
            "u.department",
            "Department",
            FilterKind::Select {
                options: vec![
                    FilterOption::new("Sales", "Sales"),
                    FilterOption::new("Engineering", "Engineering"),
                ],
                options_query: None,
                multiple: false,
            },
            None,
        )
        .unwrap()
    }

    fn collection() -> FilterCollection {
        let mut filters = FilterCollection::new();
        filters.add(dept());
        filters.add(Filter::new("q", "u.email", "Email", FilterKind::Text, None).unwrap());
        filters.add(
            Filter::condition("not_deleted", "u.deleted", "=", vec![Value::from(0)]).unwrap(),
        );
        filters
    }

    #[test]
    fn test_no_values_only_conditions() {
        let filters = collection();
        let (sql, params) = filters.to_sql_and_params().unwrap();
        assert_eq!(sql, "u.deleted = :f_not_deleted_0");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_single_optional_filter_round_trip() {
        let mut filters = FilterCollection::new();
        filters.add(dept());

        let (sql, params) = filters.to_sql_and_params().unwrap();
        assert_eq!(sql, "");
        assert!(params.is_empty());

        filters.apply("dept", vec![Value::from("Sales")]);
        let (sql, params) = filters.to_sql_and_params().unwrap();
        assert!(sql.contains("u.department"));
        assert_eq!(params.get("f_dept_0"), Some(&Value::from("Sales")));
    }

    #[test]
    fn test_fragments_joined_with_and() {
        let mut filters = collection();
        filters.apply("dept", vec![Value::from("Sales")]);
        filters.apply("q", vec![Value::from("example")]);

        let (sql, params) = filters.to_sql_and_params().unwrap();
        assert_eq!(
            sql,
            "u.department = :f_dept_0 AND u.email LIKE :f_q_0 ESCAPE '\\' AND u.deleted = :f_not_deleted_0"
        );
        assert_eq!(params.len(), 3);
        assert!(!sql.contains("AND ()"));
    }

    #[test]
    fn test_apply_unknown_name_is_noop() {
        let mut filters = collection();
        filters.apply("does_not_exist", vec![Value::from(1)]);
        filters.set_enabled("does_not_exist", false);

        let (sql, _) = filters.to_sql_and_params().unwrap();
        assert_eq!(sql, "u.deleted = :f_not_deleted_0");
        assert_eq!(filters.len(), 3);
    }

    #[test]
    fn test_apply_to_condition_is_ignored() {
        let mut filters = collection();
        filters.apply("not_deleted", vec![Value::from(1)]);
        let (_, params) = filters.to_sql_and_params().unwrap();
        assert_eq!(params.get("f_not_deleted_0"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_disabled_filter_leaves_sql_and_form() {
        let mut filters = collection();
        filters.apply("dept", vec![Value::from("Sales")]);
        filters.set_enabled("dept", false);

        let (sql, _) = filters.to_sql_and_params().unwrap();
        assert!(!sql.contains("u.department"));

        let form = filters.form(None).unwrap();
        assert!(form.input("dept").is_none());
        assert!(form.input("q").is_some());
    }

    #[test]
    fn test_removed_filter_leaves_sql_and_form() {
        let mut filters = collection();
        filters.apply("dept", vec![Value::from("Sales")]);
        let removed = filters.remove("dept").unwrap();
        assert_eq!(removed.name(), "dept");

        let (sql, _) = filters.to_sql_and_params().unwrap();
        assert!(!sql.contains("u.department"));
        assert!(filters.form(None).unwrap().input("dept").is_none());
        assert!(filters.remove("dept").is_none());
    }

    #[test]
    fn test_form_hides_conditions_and_marks_selection() {
        let mut filters = collection();
        filters.apply("dept", vec![Value::from("Engineering")]);

        let form = filters.form(None).unwrap();
        assert_eq!(form.inputs.len(), 2);
        assert!(form.input("not_deleted").is_none());

        let dept = form.input("dept").unwrap();
        assert_eq!(dept.input_type, "select");
        assert_eq!(dept.label, "Department");
        let selected: Vec<&str> = dept
            .options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(selected, vec!["Engineering"]);
    }

    #[test]
    fn test_required_filter_error_propagates() {
        let mut filters = FilterCollection::new();
        filters.add(dept().required());
        assert!(matches!(
            filters.to_sql_and_params(),
            Err(DashError::ValidationError(_))
        ));
    }

    #[test]
    fn test_same_state_same_output() {
        let mut filters = collection();
        filters.apply("dept", vec![Value::from("Sales"), Value::from("Engineering")]);
        let first = filters.to_sql_and_params().unwrap();
        let second = filters.to_sql_and_params().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_colliding_param_names_rejected() {
        let mut filters = FilterCollection::new();
        filters.add(Filter::new("course-id", "c.id", "Course", FilterKind::Text, Some("=")).unwrap());
        filters.add(Filter::new("course_id", "e.courseid", "Course", FilterKind::Text, Some("=")).unwrap());

        filters.apply("course-id", vec![Value::from(1)]);
        assert!(filters.to_sql_and_params().is_ok());

        filters.apply("course_id", vec![Value::from(2)]);
        match filters.to_sql_and_params() {
            Err(DashError::ConfigurationError(msg)) => {
                assert!(msg.contains("course-id"));
                assert!(msg.contains("course_id"));
                assert!(msg.contains(":f_course_id_0"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_sql_condition_param_collision_rejected() {
        let mut params = QueryParams::new();
        params.insert("f_dept_0", "Support");

        let mut filters = FilterCollection::new();
        filters.add(dept());
        filters.add(Filter::sql_condition("raw", "u.department <> :f_dept_0", params));
        assert!(filters.to_sql_and_params().is_ok());

        filters.apply("dept", vec![Value::from("Sales")]);
        assert!(matches!(
            filters.to_sql_and_params(),
            Err(DashError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_joins_follow_active_predicates() {
        let mut filters = FilterCollection::new();
        filters.add(
            Filter::new("course", "c.id", "Course", FilterKind::Text, Some("="))
                .unwrap()
                .with_join("JOIN courses c ON c.id = e.courseid"),
        );
        filters.add(
            Filter::condition("visible", "c.visible", "=", vec![Value::from(1)])
                .unwrap()
                .with_join("JOIN courses c ON c.id = e.courseid"),
        );
        assert_eq!(filters.joins().len(), 1);

        filters.apply("course", vec![Value::from(2)]);
        assert_eq!(filters.joins().len(), 2);

        filters.set_enabled("course", false);
        filters.set_enabled("visible", false);
        assert!(filters.joins().is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_form_loads_query_options() {
        use crate::reader::SqliteReader;

        let reader = SqliteReader::from_connection_string("sqlite://memory").unwrap();
        reader
            .execute_batch(
                "CREATE TABLE dept (id INTEGER, name TEXT);
                 INSERT INTO dept VALUES (1, 'Sales'), (2, 'Support');",
            )
            .unwrap();

        let mut filters = FilterCollection::new();
        filters.add(
            Filter::new(
                "dept",
                "u.deptid",
                "Department",
                FilterKind::Select {
                    options: vec![],
                    options_query: Some(
                        "SELECT id AS value, name AS label FROM dept ORDER BY id".to_string(),
                    ),
                    multiple: false,
                },
                None,
            )
            .unwrap(),
        );
        filters.apply("dept", vec![Value::from("2")]);

        let form = filters.form(Some(&reader as &dyn Reader)).unwrap();
        let input = form.input("dept").unwrap();
        assert_eq!(input.options.len(), 2);
        assert_eq!(input.options[1].label, "Support");
        assert!(input.options[1].selected);
        assert!(!input.options[0].selected);
    }
}
