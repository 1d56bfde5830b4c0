// concord-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(concord::infra::database::duckdb),
        help("The file could not be scanned by the SQL engine. Check its encoding and delimiter.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(concord::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- SOURCES ---
    #[error("Source file not found: '{path}'")]
    #[diagnostic(
        code(concord::infra::source_not_found),
        help("Paths are resolved against the current directory, not the project directory.")
    )]
    SourceNotFound { path: String },

    #[error("Cannot read source file '{path}': {reason}")]
    #[diagnostic(
        code(concord::infra::source_unreadable),
        help("Supported inputs are .csv, .tsv, .txt, .parquet, .json, .xlsx, .xlsm, .xls, .xlsb and .ods.")
    )]
    SourceUnreadable { path: String, reason: String },

    // --- CONFIG / YAML / JSON ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(concord::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(concord::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(concord::infra::config))]
    ConfigError(String),

    // --- OUTPUTS ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(concord::infra::template),
        help("The built-in report template failed to render.")
    )]
    TemplateError(#[from] minijinja::Error),

    #[error("Workbook Error: {0}")]
    #[diagnostic(code(concord::infra::workbook))]
    WorkbookError(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV Error: {0}")]
    #[diagnostic(code(concord::infra::csv))]
    CsvError(#[from] csv::Error),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
