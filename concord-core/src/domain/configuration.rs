// concord-core/src/domain/configuration.rs

use serde::{Deserialize, Serialize};

use crate::domain::normalize::Sensitivity;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(rename = "session-path", default = "default_session_path")]
    pub session_path: String,

    #[serde(rename = "archive-path", default = "default_archive_path")]
    pub archive_path: String,

    #[serde(rename = "report-path", default = "default_report_path")]
    pub report_path: String,

    #[serde(rename = "preview-rows", default = "default_preview_rows")]
    pub preview_rows: usize,

    #[serde(default)]
    pub engine: EngineSettings,

    /// Default sensitivity for reconciliation keys when the command does not override it.
    #[serde(default)]
    pub normalization: Sensitivity,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            session_path: default_session_path(),
            archive_path: default_archive_path(),
            report_path: default_report_path(),
            preview_rows: default_preview_rows(),
            engine: EngineSettings::default(),
            normalization: Sensitivity::default(),
        }
    }
}

/// Knobs for chunked, optionally parallel, rule evaluation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineSettings {
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Datasets with at least this many rows are evaluated on worker threads.
    #[serde(rename = "parallel-threshold", default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Width of the Warning band inside a range rule's bounds (days for date bounds).
    #[serde(rename = "range-tolerance", default)]
    pub range_tolerance: f64,

    #[serde(rename = "date-formats", default)]
    pub date_formats: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            workers: default_workers(),
            parallel_threshold: default_parallel_threshold(),
            range_tolerance: 0.0,
            date_formats: Vec::new(),
        }
    }
}

fn default_name() -> String {
    "concord".to_string()
}
fn default_session_path() -> String {
    ".concord/session.json".to_string()
}
fn default_archive_path() -> String {
    ".concord/archive".to_string()
}
fn default_report_path() -> String {
    "reports".to_string()
}
fn default_preview_rows() -> usize {
    10
}
fn default_chunk_size() -> usize {
    10_000
}
fn default_workers() -> usize {
    4
}
fn default_parallel_threshold() -> usize {
    50_000
}
