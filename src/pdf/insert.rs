//! Writing re-flowed text back onto a page
//!
//! Each adjusted line is wrapped to its original width, every wrapped line
//! is given its own horizontal morph, and the result is appended to the page
//! as a new content stream drawn with the embedded replacement font.

use std::fmt::Write;
use lopdf::{Dictionary, Document, ObjectId, Stream};
use crate::config::ReflowConfig;
use crate::error::{Error, Result};
use crate::geometry::{Matrix, PageFrame, Rect};
use crate::layout::LineInfo;
use crate::wrap::{morph_matrix, wrap_text, TextMeasure};
use super::embed::EmbeddedFont;
use super::page::{add_font_to_page_resources, append_content_to_page};

/// Resource name of the replacement font on every page
pub const FONT_RESOURCE: &str = "FReflow";

/// One wrapped line ready to be drawn, in page space
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    /// Left edge of the text
    pub x: f32,
    /// Baseline
    pub y: f32,
    pub font_size: f32,
    /// Horizontal scale, applied about `(x, y)`
    pub morph: Matrix,
}

/// Wrap a line to its width and place each wrapped piece
///
/// Wrapped line `i` sits at baseline
/// `y0 + i * font_size * line_spacing + font_size * baseline_ratio`, and is
/// morphed to the width of the original line.
pub fn place_line<M: TextMeasure>(line: &LineInfo, measure: &M, config: &ReflowConfig) -> Vec<PlacedText> {
    let font_size = line.font_size;
    let bbox = Rect::new(line.x0, line.y0, line.x1, line.y0 + font_size);

    wrap_text(&line.text, line.width(), font_size, measure)
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let morph = morph_matrix(&text, bbox, font_size, measure, config);
            let y = line.y0 + i as f32 * config.line_height(font_size) + font_size * config.baseline_ratio;

            PlacedText {
                text,
                x: line.x0,
                y,
                font_size,
                morph,
            }
        })
        .collect()
}

/// Text matrix (PDF space) that draws at `placed` with its morph applied
pub fn text_matrix(placed: &PlacedText, frame: &PageFrame) -> Matrix {
    let (x, y) = frame.to_pdf(placed.x, placed.y);
    Matrix::translate(x, y).multiply(&placed.morph.about(x, y))
}

/// Accumulates the replacement text content stream of one page
pub struct PageTextWriter {
    frame: PageFrame,
    content: String,
    lines: usize,
}

impl PageTextWriter {
    pub fn new(frame: PageFrame) -> Self {
        let mut content = String::new();
        content.push_str("q\n");
        content.push_str("0 g\n"); // gray fill color (0 = black)
        content.push_str("0 Tr\n"); // fill text

        Self {
            frame,
            content,
            lines: 0,
        }
    }

    /// Write all wrapped pieces of one line
    ///
    /// Nothing is written unless every piece can be placed, so a failing
    /// line leaves no partial output behind.
    pub fn write_line(&mut self, placed: &[PlacedText], font: &mut EmbeddedFont<'_>) -> Result<usize> {
        let mut block = String::new();

        for piece in placed {
            let tm = text_matrix(piece, &self.frame);
            if !tm.is_finite() || !piece.font_size.is_finite() {
                return Err(Error::Content(format!(
                    "non-finite placement for {:?}",
                    piece.text
                )));
            }

            let glyphs = font.encode(&piece.text);

            block.push_str("BT\n");
            let _ = writeln!(block, "/{} {} Tf", FONT_RESOURCE, piece.font_size);
            let _ = writeln!(
                block,
                "{} {} {} {} {} {} Tm",
                tm.a, tm.b, tm.c, tm.d, tm.e, tm.f
            );
            let _ = writeln!(block, "{} TJ", glyphs);
            block.push_str("ET\n");
        }

        self.content.push_str(&block);
        self.lines += placed.len();
        Ok(placed.len())
    }

    /// Append the accumulated text to the page, if anything was written
    pub fn finish(mut self, doc: &mut Document, page_id: ObjectId, font: &mut EmbeddedFont<'_>) -> Result<()> {
        if self.lines == 0 {
            return Ok(());
        }

        self.content.push_str("Q\n");

        add_font_to_page_resources(doc, page_id, FONT_RESOURCE, font.font_id())?;

        let content_stream_id = doc.add_object(Stream::new(
            Dictionary::new(),
            self.content.into_bytes(),
        ));
        append_content_to_page(doc, page_id, content_stream_id)?;

        Ok(())
    }
}
