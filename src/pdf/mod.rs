//! PDF manipulation module

pub mod embed;
pub mod extract;
pub mod insert;
pub mod metadata;
pub mod page;
pub mod redact;
mod standard_fonts;

// Re-export commonly used items
pub use embed::EmbeddedFont;
pub use extract::{extract_page_text, FormText, PageText, TextShow};
pub use insert::{place_line, PageTextWriter, PlacedText};
pub use metadata::{document_metadata, extract_metadata, PdfMetadata};
pub use redact::{erase_text, Erasures};
