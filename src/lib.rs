//! PDF Reflow Library
//!
//! Fixes PDFs whose text is drawn in a font that is missing glyphs for the
//! document's language. This library provides functionality to:
//! - Extract positioned text spans from page content streams
//! - Group spans into lines and shrink lines that overlap
//! - Re-wrap line text to its original width and morph it to fit
//! - Erase the original text and draw it again in an embedded replacement font
//! - Garbage-collect and compress the result
//!
//! # Example
//!
//! ```no_run
//! use pdf_reflow::{ReflowConfig, ReflowOptions, ReplacementFont, reflow_file};
//! use std::path::{Path, PathBuf};
//!
//! let font = ReplacementFont::from_file(Path::new("NotoSansSC-Regular.otf"))
//!     .expect("Failed to load font");
//! let options = ReflowOptions {
//!     input_path: PathBuf::from("manual-zh.pdf"),
//!     output_path: PathBuf::from("manual-fixed.pdf"),
//!     pages: None,
//! };
//!
//! reflow_file(&options, &font, &ReflowConfig::default()).expect("Failed to reflow PDF");
//! ```

pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod layout;
pub mod pdf;
pub mod reflow;
pub mod wrap;

// Re-export commonly used items
pub use config::ReflowConfig;
pub use error::{Error, Result};
pub use font::ReplacementFont;
pub use reflow::{parse_page_selection, reflow_document, reflow_file, ReflowOptions, ReflowReport};
