//! Line layout: grouping spans into visual lines and resolving overlaps
//!
//! All coordinates are in page space (top-left origin, Y grows downward).

use log::warn;
use crate::config::ReflowConfig;
use crate::geometry::Rect;

/// A contiguous run of uniformly formatted text found on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Decoded text
    pub text: String,
    /// Bounding box in page space
    pub bbox: Rect,
    /// Effective font size in points
    pub size: f32,
    /// Index of the text-showing operator that produced this span, in the
    /// page's list of shown strings
    pub show: usize,
}

/// One visual line and its (possibly adjusted) placement
#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    /// Spans making up the line, sorted left to right
    pub spans: Vec<Span>,
    /// Line text with inferred spaces
    pub text: String,
    pub x0: f32,
    /// Top of the line after adjustment
    pub y0: f32,
    pub x1: f32,
    /// Top of the line as found on the page
    pub original_y0: f32,
    /// Font size the replacement text is written at
    pub font_size: f32,
}

impl LineInfo {
    /// Width available to the replacement text
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }
}

/// Group spans into lines by the top edge of their bounding boxes
///
/// Spans are ordered top to bottom. A span joins the current line while its
/// top is within `tolerance` of the top of the line's first span.
pub fn group_spans_into_lines(mut spans: Vec<Span>, tolerance: f32) -> Vec<Vec<Span>> {
    spans.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));

    let mut lines = Vec::new();
    let mut spans = spans.into_iter();
    let Some(first) = spans.next() else {
        return lines;
    };

    let mut current_y = first.bbox.y0;
    let mut current_line = vec![first];

    for span in spans {
        if (span.bbox.y0 - current_y).abs() < tolerance {
            current_line.push(span);
        } else {
            current_y = span.bbox.y0;
            lines.push(std::mem::replace(&mut current_line, vec![span]));
        }
    }

    lines.push(current_line);
    lines
}

/// Join the text of a line's spans, inserting a space across visible gaps
///
/// The spans are sorted left to right in place.
pub fn build_line_text(spans: &mut [Span], min_gap: f32) -> String {
    spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));

    let mut text = String::new();
    for (i, span) in spans.iter().enumerate() {
        text.push_str(&span.text);

        if let Some(next) = spans.get(i + 1) {
            if next.bbox.x0 - span.bbox.x1 > min_gap {
                text.push(' ');
            }
        }
    }

    text
}

/// Build line records from grouped spans
///
/// Every line starts at the configured base font size.
pub fn build_line_infos(lines: Vec<Vec<Span>>, config: &ReflowConfig) -> Vec<LineInfo> {
    lines
        .into_iter()
        .filter(|spans| !spans.is_empty())
        .map(|mut spans| {
            let text = build_line_text(&mut spans, config.span_gap);
            let x0 = spans.iter().map(|s| s.bbox.x0).fold(f32::INFINITY, f32::min);
            let y0 = spans.iter().map(|s| s.bbox.y0).fold(f32::INFINITY, f32::min);
            let x1 = spans.iter().map(|s| s.bbox.x1).fold(f32::NEG_INFINITY, f32::max);

            LineInfo {
                spans,
                text,
                x0,
                y0,
                x1,
                original_y0: y0,
                font_size: config.base_font_size,
            }
        })
        .collect()
}

/// Shrink lines that would collide with the line above them
///
/// Lines are processed top to bottom. The bottom of the previous adjusted
/// line is `y0 + line_height(font_size)`; if it reaches more than
/// `overlap_threshold` into the current line, the current line's font size
/// drops by `size_step` (not below `min_font_size`) and, if it still starts
/// above that bottom, it is pushed down to `push_down_gap` below it. Lines
/// without overlap are reset to the base font size. The first line is kept
/// as is.
pub fn adjust_overlaps(lines: &[LineInfo], config: &ReflowConfig) -> Vec<LineInfo> {
    let mut sorted: Vec<&LineInfo> = lines.iter().collect();
    sorted.sort_by(|a, b| a.original_y0.total_cmp(&b.original_y0));

    let mut adjusted: Vec<LineInfo> = Vec::with_capacity(sorted.len());

    for line in sorted {
        let mut new_line = line.clone();

        if let Some(prev) = adjusted.last() {
            let prev_bottom = prev.y0 + config.line_height(prev.font_size);
            let current_top = line.original_y0;
            let overlap = prev_bottom - current_top;

            if overlap > config.overlap_threshold {
                let new_size = (line.font_size - config.size_step).max(config.min_font_size);
                warn!(
                    "Overlap of {:.1}pt at y={:.1}: shrinking font from {} to {}",
                    overlap, current_top, line.font_size, new_size
                );
                new_line.font_size = new_size;
                new_line.y0 = current_top;

                if prev_bottom > new_line.y0 {
                    new_line.y0 = prev_bottom + config.push_down_gap;
                }
            } else {
                new_line.font_size = config.base_font_size;
                new_line.y0 = current_top;
            }
        }

        adjusted.push(new_line);
    }

    adjusted
}
