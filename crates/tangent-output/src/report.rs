//! Timestamped JSON reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fs, path::Path};
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Two sections share a name.
    #[error("Duplicate report section: {0}")]
    DuplicateSection(String),
}

/// A named collection of result sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// Report title.
    pub title: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Sections keyed by name.
    pub sections: Map<String, Value>,
}

impl Report {
    /// Create a report stamped with the current time.
    pub fn new(title: String, sections: Map<String, Value>) -> Self {
        Self {
            title,
            timestamp: Utc::now(),
            sections,
        }
    }

    /// Look up a section.
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the pretty JSON report to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), sections = self.sections.len(), "wrote report");
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: Option<String>,
    sections: Map<String, Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a section serialized from `value`.
    pub fn section<T: Serialize>(mut self, name: &str, value: &T) -> Result<Self, ReportError> {
        if self.sections.contains_key(name) {
            return Err(ReportError::DuplicateSection(name.to_string()));
        }
        self.sections
            .insert(name.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Build the report.
    pub fn build(self) -> Report {
        Report::new(
            self.title.unwrap_or_else(|| "tangent".to_string()),
            self.sections,
        )
    }
}
