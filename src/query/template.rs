//! Query templates with `%%PLACEHOLDER%%` markers

use regex::Regex;
use std::sync::OnceLock;

use crate::{DashError, Result};

/// Markers a template may contain, each at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Select,
    Joins,
    Filters,
    Where,
    OrderBy,
}

impl Placeholder {
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Select => "%%SELECT%%",
            Placeholder::Joins => "%%JOINS%%",
            Placeholder::Filters => "%%FILTERS%%",
            Placeholder::Where => "%%WHERE%%",
            Placeholder::OrderBy => "%%ORDERBY%%",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "SELECT" => Some(Placeholder::Select),
            "JOINS" => Some(Placeholder::Joins),
            "FILTERS" => Some(Placeholder::Filters),
            "WHERE" => Some(Placeholder::Where),
            "ORDERBY" => Some(Placeholder::OrderBy),
            _ => None,
        }
    }
}

/// Generated SQL pieces substituted into a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    /// Comma-joined `select AS name` pairs
    pub select: String,
    /// Join clauses, already deduplicated
    pub joins: Vec<String>,
    /// Combined filter predicate without a leading keyword
    pub predicate: String,
    /// `<expression> <direction>` without the `ORDER BY` keyword
    pub order_by: Option<String>,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"%%([A-Z_]+)%%").expect("valid placeholder regex"))
}

/// A validated SQL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    sql: String,
    found: Vec<Placeholder>,
}

impl QueryTemplate {
    /// Parse a template
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if the template is empty, names an unknown
    /// placeholder, repeats one, or uses both `%%FILTERS%%` and `%%WHERE%%`.
    pub fn parse(sql: &str) -> Result<Self> {
        if sql.trim().is_empty() {
            return Err(DashError::ConfigurationError(
                "Query template is empty".to_string(),
            ));
        }

        let mut found = Vec::new();
        for caps in placeholder_regex().captures_iter(sql) {
            let placeholder = Placeholder::from_name(&caps[1]).ok_or_else(|| {
                DashError::ConfigurationError(format!("Unknown placeholder '{}'", &caps[0]))
            })?;
            if found.contains(&placeholder) {
                return Err(DashError::ConfigurationError(format!(
                    "Placeholder {} appears more than once",
                    placeholder.token()
                )));
            }
            found.push(placeholder);
        }

        if found.contains(&Placeholder::Filters) && found.contains(&Placeholder::Where) {
            return Err(DashError::ConfigurationError(
                "Use either %%FILTERS%% or %%WHERE%%, not both".to_string(),
            ));
        }

        Ok(Self {
            sql: sql.trim().trim_end_matches(';').to_string(),
            found,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn has(&self, placeholder: Placeholder) -> bool {
        self.found.contains(&placeholder)
    }

    /// Fail unless the template contains `placeholder`
    pub fn require(&self, placeholder: Placeholder) -> Result<()> {
        if self.has(placeholder) {
            Ok(())
        } else {
            Err(DashError::ConfigurationError(format!(
                "Query template must contain {}",
                placeholder.token()
            )))
        }
    }

    /// Substitute every placeholder
    ///
    /// Filter placeholders expand to nothing when the predicate is empty, so
    /// no dangling `AND` or `WHERE` is left behind.
    pub fn expand(&self, fragments: &Fragments) -> String {
        let mut sql = self.sql.clone();
        for placeholder in &self.found {
            let replacement = match placeholder {
                Placeholder::Select => fragments.select.clone(),
                Placeholder::Joins => fragments.joins.join(" "),
                Placeholder::Filters if fragments.predicate.is_empty() => String::new(),
                Placeholder::Filters => format!("AND {}", fragments.predicate),
                Placeholder::Where if fragments.predicate.is_empty() => String::new(),
                Placeholder::Where => format!("WHERE {}", fragments.predicate),
                Placeholder::OrderBy => fragments
                    .order_by
                    .as_ref()
                    .map(|o| format!("ORDER BY {}", o))
                    .unwrap_or_default(),
            };
            sql = sql.replacen(placeholder.token(), &replacement, 1);
        }
        sql
    }

    /// Expand without the sort clause, for counting
    pub fn expand_unordered(&self, fragments: &Fragments) -> String {
        let unordered = Fragments {
            order_by: None,
            ..fragments.clone()
        };
        self.expand(&unordered)
    }
}
