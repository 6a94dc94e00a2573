use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook write error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid permalink '{url}': {reason}")]
    InvalidPermalink { url: String, reason: String },

    #[error("Column '{column}' not found in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("Root directory {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("Invalid range: start {start} is greater than end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
