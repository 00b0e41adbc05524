//! Error types for the PDF reflow library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF reflow library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Font loading or embedding error
    #[error("Font error: {0}")]
    Font(String),

    /// Invalid configuration value or file
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid page selection expression
    #[error("Invalid page selection: {0}")]
    InvalidPageSelection(String),

    /// Page content could not be interpreted
    #[error("Content error: {0}")]
    Content(String),

    /// General error
    #[error("{0}")]
    General(String),
}
