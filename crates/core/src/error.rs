//! Error types for spreadsheet-to-presentation binding.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while binding workbook data to a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (presentation package or embedded workbook).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (slide markup, relationships).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Failed to load, read or serialize a spreadsheet workbook.
    #[error("Workbook error: {0}")]
    WorkbookError(String),

    /// A sheet referenced by name does not exist in the workbook.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// A cell reference could not be parsed as an A1-style reference.
    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    /// A part expected to be UTF-8 text could not be decoded.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Invalid transform configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The external chart-refresh step failed.
    #[error("Chart refresh error: {0}")]
    RefreshError(String),
}
