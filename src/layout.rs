//! Layouts
//!
//! A layout decides how a dashboard is presented. The core only needs to know
//! what a layout supports and which data strategy it renders from.

use serde::{Deserialize, Serialize};

use crate::data::DataStrategy;
use crate::{DashError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// One row per record
    #[default]
    Table,
    /// One card per record
    Cards,
    /// Records grouped into collapsible sections
    Accordion,
}

/// What a layout lets the user adjust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutCapabilities {
    pub supports_pagination: bool,
    pub supports_filtering: bool,
    pub supports_field_visibility: bool,
    pub grouped: bool,
}

impl LayoutKind {
    pub fn capabilities(&self) -> LayoutCapabilities {
        match self {
            LayoutKind::Table => LayoutCapabilities {
                supports_pagination: true,
                supports_filtering: true,
                supports_field_visibility: true,
                grouped: false,
            },
            LayoutKind::Cards => LayoutCapabilities {
                supports_pagination: true,
                supports_filtering: true,
                supports_field_visibility: false,
                grouped: false,
            },
            LayoutKind::Accordion => LayoutCapabilities {
                supports_pagination: false,
                supports_filtering: true,
                supports_field_visibility: true,
                grouped: true,
            },
        }
    }

    /// Strategy this layout renders from
    ///
    /// Grouped layouts need the data source's group fields.
    pub fn data_strategy(
        &self,
        group_by: Option<&str>,
        group_label: Option<&str>,
    ) -> Result<DataStrategy> {
        if !self.capabilities().grouped {
            return Ok(DataStrategy::Standard);
        }
        match (group_by, group_label) {
            (Some(by), Some(label)) => Ok(DataStrategy::grouped(by, label)),
            _ => Err(DashError::ConfigurationError(format!(
                "The {} layout needs a data source with group_by and group_label",
                self
            ))),
        }
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutKind::Table => write!(f, "table"),
            LayoutKind::Cards => write!(f, "cards"),
            LayoutKind::Accordion => write!(f, "accordion"),
        }
    }
}

impl std::str::FromStr for LayoutKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(LayoutKind::Table),
            "cards" => Ok(LayoutKind::Cards),
            "accordion" => Ok(LayoutKind::Accordion),
            other => Err(DashError::ValidationError(format!(
                "Unknown layout '{}'. Expected table, cards or accordion",
                other
            ))),
        }
    }
}
