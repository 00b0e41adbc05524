//! The reflow pipeline: open, rewrite every page, save
//!
//! For each page the original text spans are extracted and grouped into
//! lines, overlapping lines are shrunk, the original text is erased, and the
//! line text is re-wrapped and written back in the replacement font.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use lopdf::{Document, ObjectId};
use crate::config::ReflowConfig;
use crate::error::{Error, Result};
use crate::font::ReplacementFont;
use crate::layout::{adjust_overlaps, build_line_infos, group_spans_into_lines};
use crate::pdf::embed::EmbeddedFont;
use crate::pdf::extract::extract_page_text;
use crate::pdf::insert::{place_line, PageTextWriter};
use crate::pdf::metadata::document_metadata;
use crate::pdf::redact::erase_text;

/// Options for reflowing one PDF file
#[derive(Debug, Clone)]
pub struct ReflowOptions {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// 1-based page numbers to process; all pages when `None`
    pub pages: Option<BTreeSet<u32>>,
}

/// What happened on one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    pub page_number: u32,
    pub spans: usize,
    pub lines: usize,
    /// Wrapped lines written in the replacement font
    pub inserted: usize,
    /// Lines skipped because their text could not be written
    pub failed: usize,
    /// Set when the page content could not be read and the page was left as is
    pub skipped: bool,
}

/// Summary of a reflow run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflowReport {
    pub pages: Vec<PageReport>,
}

impl ReflowReport {
    pub fn inserted(&self) -> usize {
        self.pages.iter().map(|p| p.inserted).sum()
    }

    pub fn failed(&self) -> usize {
        self.pages.iter().map(|p| p.failed).sum()
    }
}

/// Parse a page selection such as `1,3-5,8`
pub fn parse_page_selection(expr: &str) -> Result<BTreeSet<u32>> {
    let mut pages = BTreeSet::new();

    for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parse = |s: &str| -> Result<u32> {
            match s.trim().parse::<u32>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(Error::InvalidPageSelection(format!("'{}' is not a page number", s.trim()))),
            }
        };

        match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(Error::InvalidPageSelection(format!("range {} is reversed", part)));
                }
                pages.extend(start..=end);
            }
            None => {
                pages.insert(parse(part)?);
            }
        }
    }

    if pages.is_empty() {
        return Err(Error::InvalidPageSelection("no pages selected".to_string()));
    }

    Ok(pages)
}

/// Reflow a PDF file and save the result
///
/// # Example
///
/// ```no_run
/// use pdf_reflow::{ReflowConfig, ReflowOptions, ReplacementFont, reflow_file};
/// use std::path::{Path, PathBuf};
///
/// let font = ReplacementFont::from_file(Path::new("FiraGO-Regular.ttf"))
///     .expect("Failed to load font");
/// let options = ReflowOptions {
///     input_path: PathBuf::from("manual-zh.pdf"),
///     output_path: PathBuf::from("manual-fixed.pdf"),
///     pages: None,
/// };
///
/// reflow_file(&options, &font, &ReflowConfig::default()).expect("Failed to reflow");
/// ```
pub fn reflow_file(options: &ReflowOptions, font: &ReplacementFont, config: &ReflowConfig) -> Result<ReflowReport> {
    if !options.input_path.exists() {
        return Err(Error::FileNotFound(options.input_path.clone()));
    }

    let mut doc = Document::load(&options.input_path)?;
    if doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(options.input_path.clone()));
    }

    let page_count = document_metadata(&doc)
        .map(|m| m.page_count)
        .unwrap_or_else(|_| doc.get_pages().len());
    info!("Opened {} ({} pages)", options.input_path.display(), page_count);

    let report = reflow_document(&mut doc, font, config, options.pages.as_ref())?;
    save_document(&mut doc, &options.output_path)?;

    info!(
        "Saved {}: {} lines written, {} failed",
        options.output_path.display(),
        report.inserted(),
        report.failed()
    );

    Ok(report)
}

/// Reflow every selected page of a loaded document
pub fn reflow_document(
    doc: &mut Document,
    font: &ReplacementFont,
    config: &ReflowConfig,
    pages: Option<&BTreeSet<u32>>,
) -> Result<ReflowReport> {
    config.validate()?;

    // Decompress for easier content stream parsing
    doc.decompress();

    let page_ids: Vec<(u32, ObjectId)> = doc
        .get_pages()
        .into_iter()
        .filter(|(number, _)| pages.map_or(true, |selected| selected.contains(number)))
        .collect();

    let mut embedded = EmbeddedFont::new(doc, font)?;
    let mut report = ReflowReport::default();

    for (page_number, page_id) in page_ids {
        info!("Processing page {}", page_number);
        let page_report = reflow_page(doc, page_id, page_number, &mut embedded, config)?;
        info!(
            "Page {}: {} lines written ({} failed)",
            page_number, page_report.inserted, page_report.failed
        );
        report.pages.push(page_report);
    }

    embedded.finish(doc)?;
    Ok(report)
}

/// Reflow a single page
///
/// A page whose content cannot be decoded is left untouched. A line whose
/// text cannot be written is logged and skipped.
pub fn reflow_page(
    doc: &mut Document,
    page_id: ObjectId,
    page_number: u32,
    font: &mut EmbeddedFont<'_>,
    config: &ReflowConfig,
) -> Result<PageReport> {
    let mut report = PageReport {
        page_number,
        ..Default::default()
    };

    let mut page_text = match extract_page_text(doc, page_id) {
        Ok(page_text) => page_text,
        Err(e) => {
            warn!("Page {}: cannot read content, leaving it unchanged: {}", page_number, e);
            report.skipped = true;
            return Ok(report);
        }
    };

    report.spans = page_text.spans.len();
    if page_text.spans.is_empty() {
        debug!("Page {}: no text", page_number);
        return Ok(report);
    }

    let spans = std::mem::take(&mut page_text.spans);
    let lines = group_spans_into_lines(spans, config.line_tolerance);
    let line_infos = build_line_infos(lines, config);
    let adjusted = adjust_overlaps(&line_infos, config);
    report.lines = adjusted.len();

    // Remove the old text
    let hidden: BTreeSet<usize> = line_infos
        .iter()
        .flat_map(|line| line.spans.iter().map(|span| span.show))
        .collect();
    let frame = page_text.frame;
    erase_text(doc, page_id, page_text, &hidden)?;

    let placements: Vec<_> = adjusted
        .iter()
        .map(|line| place_line(line, font.shaper(), config))
        .collect();

    let mut writer = PageTextWriter::new(frame);
    for (line, placed) in adjusted.iter().zip(&placements) {
        match writer.write_line(placed, font) {
            Ok(count) => report.inserted += count,
            Err(e) => {
                warn!("Page {}: skipping line {:?}: {}", page_number, line.text, e);
                report.failed += 1;
            }
        }
    }

    writer.finish(doc, page_id, font)?;
    Ok(report)
}

/// Garbage-collect, compress and write the document
pub fn save_document(doc: &mut Document, path: &Path) -> Result<()> {
    let pruned = doc.prune_objects();
    debug!("Pruned {} unreferenced objects", pruned.len());

    doc.delete_zero_length_streams();
    doc.renumber_objects();
    doc.compress();
    doc.save(path)?;

    Ok(())
}
