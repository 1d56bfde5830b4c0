// concord-core/src/ports/renderer.rs

use crate::domain::report::Report;
use crate::error::ConcordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Color-coded xlsx workbook.
    #[default]
    Workbook,
    /// One CSV row per finding.
    Delimited,
    /// Standalone HTML page.
    Hypertext,
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Workbook => "workbook",
            OutputFormat::Delimited => "csv",
            OutputFormat::Hypertext => "html",
            OutputFormat::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Workbook => "xlsx",
            OutputFormat::Delimited => "csv",
            OutputFormat::Hypertext => "html",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "workbook" | "xlsx" => Ok(OutputFormat::Workbook),
            "csv" | "delimited" => Ok(OutputFormat::Delimited),
            "html" | "hypertext" => Ok(OutputFormat::Hypertext),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown report format: {} (expected workbook, csv, html or json)",
                s
            )),
        }
    }
}

pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &Report) -> Result<Vec<u8>, ConcordError>;

    fn format(&self) -> OutputFormat;
}
