use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while ingesting billing exports.
#[derive(Error, Debug)]
pub enum FinopsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV upload parsed but contained no data rows.
    #[error("The uploaded CSV file is empty.")]
    EmptyCsv,

    /// No sheet of a workbook contained a header row plus data.
    #[error("The uploaded Excel file is empty or contains no data in any sheet.")]
    EmptySpreadsheet,

    /// The CSV reader rejected the input.
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    /// The workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The external document converter failed or produced nothing.
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FinopsError {
    /// `true` for the "nothing to analyse" variants, which the router reports
    /// with a plain `Error:` prefix instead of a processing-stage prefix.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, FinopsError::EmptyCsv | FinopsError::EmptySpreadsheet)
    }
}

/// Convenience alias used throughout the finops crates.
pub type Result<T> = std::result::Result<T, FinopsError>;
