//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use super::page::resolve;

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages = catalog
        .get(b"Pages")
        .map(|p| resolve(doc, p))
        .map_err(|_| Error::General("No Pages in catalog".to_string()))?;

    let pages_dict = pages
        .as_dict()
        .map_err(|_| Error::General("Pages is not a dictionary".to_string()))?;

    match pages_dict.get(b"Count").map(|c| resolve(doc, c)) {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        Ok(_) => Err(Error::General("Count is not a page count".to_string())),
        Err(_) => Err(Error::General("No Count in Pages".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Read an Info dictionary text entry, handling UTF-16BE strings
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = resolve(doc, doc.trailer.get(b"Info").ok()?).as_dict().ok()?;
    let bytes = resolve(doc, info.get(key).ok()?).as_str().ok()?;

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }

    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Extract metadata from a loaded document
pub fn document_metadata(doc: &Document) -> Result<PdfMetadata> {
    Ok(PdfMetadata {
        page_count: count_pages_from_catalog(doc)?,
        title: info_string(doc, b"Title"),
        author: info_string(doc, b"Author"),
    })
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let metadata = document_metadata(&doc)?;

    if metadata.page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(metadata)
}
