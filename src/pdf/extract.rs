//! Text span extraction from page content streams using lopdf
//!
//! The page's content is decoded into operations and interpreted with just
//! enough of the graphics and text state to place every text-showing
//! operator (`Tj`, `TJ`, `'`, `"`) on the page. Each such operator becomes at
//! most one [`Span`] and one [`TextShow`], which remembers where the operator
//! lives and how far it moved the text position, so that it can be erased
//! later without disturbing the text after it.
//!
//! Form XObjects drawn with `Do` are interpreted with their own `/Matrix`
//! and `/Resources`. Their decoded operations are kept in [`PageText::forms`].

use std::collections::{BTreeMap, HashMap};
use log::{debug, trace, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::Result;
use crate::geometry::{Matrix, PageFrame, Rect};
use crate::layout::Span;
use super::page::{number, page_content, page_frame, page_resources, resolve, stream_content};
use super::standard_fonts::{standard_widths, StandardWidths};

/// Glyph ascent above the baseline, as a fraction of the font size
const ASCENT: f32 = 0.8;
/// Glyph descent below the baseline, as a fraction of the font size
const DESCENT: f32 = 0.2;
/// Width used when a font gives no width for a code (1/1000 em)
const FALLBACK_WIDTH: f32 = 500.0;
/// Largest CID a two-byte code can address
const MAX_CID: u32 = u16::MAX as u32;
/// Form XObjects nested deeper than this are not entered
const MAX_FORM_DEPTH: usize = 8;

/// The decoded content of one page and the spans found in it
#[derive(Debug, Clone)]
pub struct PageText {
    pub frame: PageFrame,
    /// Operations of the page's own content stream
    pub operations: Vec<Operation>,
    /// Operations of every form drawn on the page, keyed by the chain of
    /// form objects leading to it
    pub forms: BTreeMap<Vec<ObjectId>, FormText>,
    /// Text-showing operators behind the spans; `Span::show` indexes this
    pub shows: Vec<TextShow>,
    pub spans: Vec<Span>,
}

/// A Form XObject's decoded content
#[derive(Debug, Clone)]
pub struct FormText {
    pub operations: Vec<Operation>,
    /// Resources the form was interpreted with
    pub resources: Option<Dictionary>,
}

/// Location and displacement of one text-showing operator
#[derive(Debug, Clone, PartialEq)]
pub struct TextShow {
    /// Forms entered to reach the operator; empty for the page itself
    pub form: Vec<ObjectId>,
    /// Index into that stream's operations
    pub op_index: usize,
    /// `TJ` number (1/1000 text space units) that moves the text position
    /// as far as the operator did
    pub adjustment: f32,
}

/// Width and decoding information for one font resource
struct FontInfo<'a> {
    dict: &'a Dictionary,
    /// Type0 fonts use two-byte codes
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    /// Built-in widths of a standard font that has no `/Widths`
    standard: Option<StandardWidths>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
}

/// A `/W` start or end value as a CID, if it is one
fn cid(value: f32) -> Option<u32> {
    (value >= 0.0 && value <= MAX_CID as f32).then_some(value as u32)
}

impl<'a> FontInfo<'a> {
    fn new(doc: &'a Document, dict: &'a Dictionary) -> Self {
        let two_byte = matches!(dict.get(b"Subtype").and_then(|s| s.as_name()), Ok(b"Type0"));

        let mut info = FontInfo {
            dict,
            two_byte,
            first_char: 0,
            widths: Vec::new(),
            standard: None,
            cid_widths: HashMap::new(),
            default_width: FALLBACK_WIDTH,
        };

        if two_byte {
            info.load_cid_widths(doc);
        } else {
            info.load_simple_widths(doc);
        }

        info
    }

    fn load_simple_widths(&mut self, doc: &Document) {
        self.first_char = self
            .dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(resolve(doc, o)))
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);

        if let Ok(widths) = self.dict.get(b"Widths").map(|w| resolve(doc, w)) {
            if let Ok(arr) = widths.as_array() {
                self.widths = arr
                    .iter()
                    .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                    .collect();
            }
        }

        if self.widths.is_empty() {
            self.standard = self
                .dict
                .get(b"BaseFont")
                .ok()
                .and_then(|name| resolve(doc, name).as_name().ok())
                .and_then(|name| standard_widths(&String::from_utf8_lossy(name)));
        }

        let missing_width = self
            .dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve(doc, d).as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|w| number(resolve(doc, w)));
        if let Some(width) = missing_width {
            self.default_width = width;
        }
    }

    fn load_cid_widths(&mut self, doc: &Document) {
        let descendant = self
            .dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|d| resolve(doc, d).as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|d| resolve(doc, d).as_dict().ok());

        let Some(cid_font) = descendant else {
            return;
        };

        self.default_width = cid_font
            .get(b"DW")
            .ok()
            .and_then(|w| number(resolve(doc, w)))
            .unwrap_or(1000.0);

        let Ok(w) = cid_font.get(b"W").map(|w| resolve(doc, w)) else {
            return;
        };
        let Ok(entries) = w.as_array() else {
            return;
        };

        // Entries are either `c [w1 w2 ...]` or `c_first c_last w`. CIDs
        // outside 0..=65535 cannot be shown and are dropped.
        let mut i = 0;
        while i < entries.len() {
            let Some(start) = number(resolve(doc, &entries[i])) else {
                break;
            };

            match entries.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(widths)) => {
                    if let Some(start) = cid(start) {
                        for (offset, width) in widths.iter().enumerate() {
                            let Some(code) = u32::try_from(offset)
                                .ok()
                                .and_then(|offset| start.checked_add(offset))
                                .filter(|&code| code <= MAX_CID)
                            else {
                                break;
                            };
                            if let Some(width) = number(resolve(doc, width)) {
                                self.cid_widths.insert(code, width);
                            }
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) = (
                        number(last),
                        entries.get(i + 2).and_then(|o| number(resolve(doc, o))),
                    ) else {
                        break;
                    };
                    if let Some(first) = cid(start) {
                        if last >= start {
                            let last = last.min(MAX_CID as f32) as u32;
                            for code in first..=last {
                                self.cid_widths.insert(code, width);
                            }
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    /// Glyph width for a character code, in 1/1000 text space units
    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }

        code.checked_sub(self.first_char)
            .and_then(|idx| self.widths.get(idx as usize))
            .copied()
            .or_else(|| self.standard.and_then(|standard| standard.width(code)))
            .unwrap_or(self.default_width)
    }

    /// Split a string operand into character codes
    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(u16::from_be_bytes([*hi, *lo])),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }
}

/// Width information for every font in a Resources dictionary
fn fonts_from_resources<'a>(doc: &'a Document, resources: Option<&'a Dictionary>) -> HashMap<Vec<u8>, FontInfo<'a>> {
    let Some(fonts) = resources
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|f| resolve(doc, f).as_dict().ok())
    else {
        return HashMap::new();
    };

    fonts
        .iter()
        .filter_map(|(name, font)| {
            let dict = resolve(doc, font).as_dict().ok()?;
            Some((name.clone(), FontInfo::new(doc, dict)))
        })
        .collect()
}

/// Text state parameters (saved and restored with the graphics state)
#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Content stream interpreter that collects spans
struct SpanCollector<'a> {
    doc: &'a Document,
    frame: PageFrame,
    resources: Option<&'a Dictionary>,
    fonts: HashMap<Vec<u8>, FontInfo<'a>>,
    /// Forms entered to reach the stream being interpreted
    form_path: Vec<ObjectId>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    forms: BTreeMap<Vec<ObjectId>, FormText>,
    shows: Vec<TextShow>,
    spans: Vec<Span>,
}

impl<'a> SpanCollector<'a> {
    fn new(doc: &'a Document, frame: PageFrame, resources: Option<&'a Dictionary>) -> Self {
        Self {
            doc,
            frame,
            resources,
            fonts: fonts_from_resources(doc, resources),
            form_path: Vec::new(),
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::identity(),
            line_matrix: Matrix::identity(),
            forms: BTreeMap::new(),
            shows: Vec::new(),
            spans: Vec::new(),
        }
    }

    fn operands(op: &Operation) -> Vec<f32> {
        op.operands.iter().filter_map(number).collect()
    }

    fn run(&mut self, operations: &[Operation]) {
        for (index, op) in operations.iter().enumerate() {
            self.apply(index, op);
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn apply(&mut self, index: usize, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&Self::operands(op)) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "Do" => {
                if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                    self.draw_form(name);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::identity();
                self.line_matrix = Matrix::identity();
            }
            "Tf" => {
                if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                    self.state.text.font = name.to_vec();
                }
                if let Some(size) = op.operands.get(1).and_then(number) {
                    self.state.text.size = size;
                }
            }
            "Tc" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.text.horizontal_scale = v / 100.0;
                }
            }
            "TL" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.text.leading = v;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first().and_then(number) {
                    self.state.text.rise = v;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = Self::operands(op)[..] {
                    if op.operator == "TD" {
                        self.state.text.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&Self::operands(op)) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    self.show(index, std::slice::from_ref(operand));
                }
            }
            "TJ" => {
                if let Some(Ok(items)) = op.operands.first().map(|o| o.as_array()) {
                    self.show(index, items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(operand) = op.operands.first() {
                    self.show(index, std::slice::from_ref(operand));
                }
            }
            "\"" => {
                if let [aw, ac, ..] = Self::operands(op)[..] {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(operand) = op.operands.get(2) {
                    self.show(index, std::slice::from_ref(operand));
                }
            }
            _ => {}
        }
    }

    /// Interpret a Form XObject named in the current resources
    ///
    /// Images and other XObjects are ignored.
    fn draw_form(&mut self, name: &[u8]) {
        let doc = self.doc;
        let Some(form_id) = self
            .resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve(doc, x).as_dict().ok())
            .and_then(|x| x.get(name).ok())
            .and_then(|x| x.as_reference().ok())
        else {
            return;
        };

        let Ok(stream) = doc.get_object(form_id).and_then(|o| o.as_stream()) else {
            return;
        };
        if !matches!(stream.dict.get(b"Subtype").and_then(|s| s.as_name()), Ok(b"Form")) {
            return;
        }

        if self.form_path.contains(&form_id) || self.form_path.len() >= MAX_FORM_DEPTH {
            warn!("Not entering form {:?}: nested too deeply or recursive", form_id);
            return;
        }

        let operations = match stream_content(stream).and_then(|data| Ok(Content::decode(&data)?)) {
            Ok(content) => content.operations,
            Err(e) => {
                warn!("Cannot read form {:?}, its text is left as is: {}", form_id, e);
                return;
            }
        };

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| resolve(doc, m).as_array().ok())
            .and_then(|values| {
                let values: Vec<f32> = values.iter().filter_map(|v| number(resolve(doc, v))).collect();
                Matrix::from_operands(&values)
            })
            .unwrap_or_default();
        let resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r).as_dict().ok())
            .or(self.resources);

        debug!("Entering form {:?} with {} operations", form_id, operations.len());

        // The form runs in a copy of the current graphics state
        let saved_state = self.state.clone();
        let saved_stack = std::mem::take(&mut self.stack);
        let saved_matrices = (self.text_matrix, self.line_matrix);
        let saved_resources = std::mem::replace(&mut self.resources, resources);
        let saved_fonts = std::mem::replace(&mut self.fonts, fonts_from_resources(doc, resources));

        self.state.ctm = matrix.multiply(&self.state.ctm);
        self.form_path.push(form_id);
        self.run(&operations);
        self.forms.entry(self.form_path.clone()).or_insert_with(|| FormText {
            operations,
            resources: resources.cloned(),
        });
        self.form_path.pop();

        self.state = saved_state;
        self.stack = saved_stack;
        (self.text_matrix, self.line_matrix) = saved_matrices;
        self.resources = saved_resources;
        self.fonts = saved_fonts;
    }

    /// Decode a string operand with the current font's encoding
    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(font) = self.fonts.get(&self.state.text.font) {
            if let Ok(encoding) = font.dict.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }

        // Latin-1 fallback
        bytes.iter().map(|&b| b as char).collect()
    }

    /// Show a sequence of strings and positioning adjustments as one span
    fn show(&mut self, index: usize, items: &[Object]) {
        let text_state = self.state.text.clone();
        let font = self.fonts.get(&text_state.font);
        let start = self.text_matrix;

        let mut text = String::new();
        let mut advance = 0.0f32;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(bytes));

                    let codes = match font {
                        Some(font) => font.codes(bytes),
                        None => bytes.iter().map(|&b| u32::from(b)).collect(),
                    };
                    let two_byte = font.map(|f| f.two_byte).unwrap_or(false);

                    for code in codes {
                        let w0 = font.map(|f| f.width(code)).unwrap_or(FALLBACK_WIDTH) / 1000.0;
                        let mut tx = w0 * text_state.size + text_state.char_spacing;
                        if code == 32 && !two_byte {
                            tx += text_state.word_spacing;
                        }
                        advance += tx * text_state.horizontal_scale;
                    }
                }
                other => {
                    if let Some(adjust) = number(other) {
                        advance -= adjust / 1000.0 * text_state.size * text_state.horizontal_scale;
                    }
                }
            }
        }

        self.text_matrix = Matrix::translate(advance, 0.0).multiply(&self.text_matrix);

        if text.trim().is_empty() {
            return;
        }

        let to_device = start.multiply(&self.state.ctm);
        let bottom = text_state.rise - DESCENT * text_state.size;
        let top = text_state.rise + ASCENT * text_state.size;

        let corners: Vec<(f32, f32)> = [(0.0, bottom), (advance, bottom), (0.0, top), (advance, top)]
            .iter()
            .map(|&(x, y)| {
                let (px, py) = to_device.apply(x, y);
                self.frame.to_page(px, py)
            })
            .collect();

        let Some(bbox) = Rect::bounding(&corners) else {
            return;
        };

        let size = text_state.size * to_device.vertical_scale();
        trace!("op {}: {:?} at {:?} size {}", index, text, bbox, size);

        // tx = -n / 1000 * size * Th for a lone TJ number n
        let scale = text_state.size * text_state.horizontal_scale;
        let adjustment = if scale.abs() > f32::EPSILON {
            -advance * 1000.0 / scale
        } else {
            0.0
        };

        self.shows.push(TextShow {
            form: self.form_path.clone(),
            op_index: index,
            adjustment,
        });
        self.spans.push(Span {
            text,
            bbox,
            size,
            show: self.shows.len() - 1,
        });
    }
}

/// Extract the text spans of one page
///
/// Returns the decoded operation lists together with the spans so that
/// erasure can rewrite exactly the operators the spans came from.
pub fn extract_page_text(doc: &Document, page_id: ObjectId) -> Result<PageText> {
    let frame = page_frame(doc, page_id);
    let content = Content::decode(&page_content(doc, page_id)?)?;

    let mut collector = SpanCollector::new(doc, frame, page_resources(doc, page_id));
    collector.run(&content.operations);

    debug!(
        "Extracted {} spans from {} operations and {} forms",
        collector.spans.len(),
        content.operations.len(),
        collector.forms.len()
    );

    Ok(PageText {
        frame,
        operations: content.operations,
        forms: collector.forms,
        shows: collector.shows,
        spans: collector.spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Build a one-page Letter document with a Helvetica font and the given content
    fn document_with_content(operations: Vec<Operation>, font: Dictionary) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font);

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        (doc, page_id)
    }

    fn helvetica() -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }
    }

    /// A simple font where every glyph is 600/1000 em wide
    fn monospace() -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
            "FirstChar" => 32,
            "LastChar" => 126,
            "Widths" => Object::Array((32..=126).map(|_| Object::Integer(600)).collect()),
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_tj_span_geometry() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
            monospace(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        assert_eq!(page.spans.len(), 1);

        let span = &page.spans[0];
        assert_eq!(span.text, "Hello");
        assert_eq!(page.shows[span.show].op_index, 3);
        assert!(page.shows[span.show].form.is_empty());
        assert!(approx(span.size, 10.0));
        // 5 glyphs * 0.6 * 10pt = 30pt wide
        assert!(approx(span.bbox.x0, 100.0));
        assert!(approx(span.bbox.x1, 130.0));
        // Baseline at 792 - 700 = 92 in page space
        assert!(approx(span.bbox.y0, 84.0));
        assert!(approx(span.bbox.y1, 94.0));
    }

    #[test]
    fn test_tj_array_advances_and_kerning() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![0.into(), 700.into()]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("AB"),
                        Object::Integer(-1000),
                        Object::string_literal("C"),
                    ])],
                ),
                Operation::new("Tj", vec![Object::string_literal("D")]),
                Operation::new("ET", vec![]),
            ],
            monospace(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        assert_eq!(page.spans.len(), 2);
        assert_eq!(page.spans[0].text, "ABC");
        // 3 glyphs * 6pt + 10pt of positive spacing
        assert!(approx(page.spans[0].bbox.x1, 28.0));
        // The following Tj starts where the TJ ended
        assert!(approx(page.spans[1].bbox.x0, 28.0));
    }

    #[test]
    fn test_ctm_and_graphics_state_stack() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![2.into(), 0.into(), 0.into(), 2.into(), 0.into(), 0.into()]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![50.into(), 300.into()]),
                Operation::new("Tj", vec![Object::string_literal("Big")]),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![50.into(), 300.into()]),
                Operation::new("Tj", vec![Object::string_literal("Small")]),
                Operation::new("ET", vec![]),
            ],
            monospace(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        assert_eq!(page.spans.len(), 2);

        let big = &page.spans[0];
        assert!(approx(big.size, 20.0));
        assert!(approx(big.bbox.x0, 100.0));
        assert!(approx(big.bbox.y1, 792.0 - 600.0 + 4.0));

        let small = &page.spans[1];
        assert!(approx(small.size, 10.0));
        assert!(approx(small.bbox.x0, 50.0));
    }

    #[test]
    fn test_next_line_operators() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("TL", vec![14.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal("one")]),
                Operation::new("'", vec![Object::string_literal("two")]),
                Operation::new("T*", vec![]),
                Operation::new("\"", vec![0.into(), 0.into(), Object::string_literal("four")]),
                Operation::new("ET", vec![]),
            ],
            helvetica(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        let tops: Vec<f32> = page.spans.iter().map(|s| s.bbox.y0).collect();
        assert_eq!(page.spans.len(), 3);
        assert!(approx(tops[1] - tops[0], 14.0));
        assert!(approx(tops[2] - tops[1], 28.0));
        assert!(page.spans.iter().all(|s| approx(s.bbox.x0, 72.0)));
    }

    #[test]
    fn test_whitespace_only_spans_are_dropped() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal("   ")]),
                Operation::new("Tj", vec![Object::string_literal("text")]),
                Operation::new("ET", vec![]),
            ],
            monospace(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        assert_eq!(page.spans.len(), 1);
        assert_eq!(page.spans[0].text, "text");
        // The blank string still advanced the text position: 3 * 6pt
        assert!(approx(page.spans[0].bbox.x0, 90.0));
    }

    #[test]
    fn test_type0_widths() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 1000,
            "W" => Object::Array(vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(500), Object::Integer(250)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(300),
            ]),
        });
        let type0 = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Test",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };

        let info = FontInfo::new(&doc, &type0);
        assert!(info.two_byte);
        assert_eq!(info.codes(&[0x00, 0x01, 0x00, 0x0B]), vec![1, 11]);
        assert_eq!(info.width(1), 500.0);
        assert_eq!(info.width(2), 250.0);
        assert_eq!(info.width(11), 300.0);
        assert_eq!(info.width(99), 1000.0);
    }

    #[test]
    fn test_simple_font_widths_fall_back() {
        let doc = Document::with_version("1.5");
        let font = monospace();
        let info = FontInfo::new(&doc, &font);
        assert!(!info.two_byte);
        assert_eq!(info.width(65), 600.0);
        assert_eq!(info.width(10), FALLBACK_WIDTH);
        assert_eq!(info.width(300), FALLBACK_WIDTH);
    }

    #[test]
    fn test_show_adjustment_cancels_advance() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Tz", vec![50.into()]),
                Operation::new("Tc", vec![2.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
            monospace(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        // (5 * 6pt + 5 * 2pt) * 0.5 = 20pt, undone by -n / 1000 * 10 * 0.5
        let show = &page.shows[page.spans[0].show];
        assert_eq!(show.op_index, 5);
        assert!(approx(show.adjustment, -4000.0));
        assert!(approx(page.spans[0].bbox.x1, 120.0));
    }

    #[test]
    fn test_standard_font_without_widths() {
        let doc = Document::with_version("1.5");
        let font = helvetica();
        let info = FontInfo::new(&doc, &font);
        assert_eq!(info.width(u32::from(b'W')), 944.0);
        assert_eq!(info.width(u32::from(b'i')), 222.0);
        assert_eq!(info.width(10), FALLBACK_WIDTH);
    }

    #[test]
    fn test_helvetica_span_uses_builtin_widths() {
        let (doc, page_id) = document_with_content(
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![0.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("ill")]),
                Operation::new("ET", vec![]),
            ],
            helvetica(),
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        // i and l are 222/1000 em each
        assert!(approx(page.spans[0].bbox.x1, 6.66));
    }

    #[test]
    fn test_cid_width_ranges_are_bounded() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => Object::Array(vec![
                Object::Integer(4294967295),
                Object::Array(vec![Object::Integer(700), Object::Integer(700)]),
                Object::Integer(65535),
                Object::Array(vec![Object::Integer(300), Object::Integer(400)]),
                Object::Integer(0),
                Object::Integer(4294967295),
                Object::Integer(500),
                Object::Integer(-5),
                Object::Integer(-1),
                Object::Integer(900),
            ]),
        });
        let type0 = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Test",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };

        let info = FontInfo::new(&doc, &type0);
        assert_eq!(info.width(0), 500.0);
        assert_eq!(info.width(65535), 500.0);
        assert_eq!(info.width(70000), 1000.0);
        assert!(info.cid_widths.len() <= 65536);
    }

    /// Add a form drawing `operations` to the page's XObject resources as `/Fm1`
    fn add_form(doc: &mut Document, page_id: ObjectId, matrix: [i64; 6], operations: Vec<Operation>) -> ObjectId {
        let resources = doc
            .get_dictionary(page_id).unwrap()
            .get(b"Resources").unwrap()
            .as_dict().unwrap()
            .clone();
        let content = Content { operations };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
                "Matrix" => matrix.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
                "Resources" => resources,
            },
            content.encode().unwrap(),
        ));

        doc.get_dictionary_mut(page_id).unwrap()
            .get_mut(b"Resources").unwrap()
            .as_dict_mut().unwrap()
            .set("XObject", dictionary! { "Fm1" => form_id });
        form_id
    }

    #[test]
    fn test_form_xobject_text_is_extracted() {
        let (mut doc, page_id) = document_with_content(
            vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 0.into(), 100.into()]),
                Operation::new("Do", vec!["Fm1".into()]),
                Operation::new("Q", vec![]),
            ],
            monospace(),
        );
        let form_id = add_form(
            &mut doc,
            page_id,
            [1, 0, 0, 1, 100, 200],
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Tj", vec![Object::string_literal("Inside")]),
                Operation::new("ET", vec![]),
            ],
        );

        let page = extract_page_text(&doc, page_id).unwrap();
        assert_eq!(page.spans.len(), 1);

        let span = &page.spans[0];
        assert_eq!(span.text, "Inside");
        // Baseline at 100 + 200 = 300, i.e. 492 in page space
        assert!(approx(span.bbox.x0, 100.0));
        assert!(approx(span.bbox.y1, 494.0));

        let show = &page.shows[span.show];
        assert_eq!(show.form, vec![form_id]);
        assert_eq!(show.op_index, 2);
        assert_eq!(page.forms[&vec![form_id]].operations.len(), 4);
    }

    #[test]
    fn test_recursive_form_is_entered_once() {
        let (mut doc, page_id) = document_with_content(vec![Operation::new("Do", vec!["Fm1".into()])], monospace());
        let form_id = add_form(&mut doc, page_id, [1, 0, 0, 1, 0, 0], vec![Operation::new("Do", vec!["Fm1".into()])]);

        // The form's resources name itself
        let form = doc.get_object_mut(form_id).unwrap().as_stream_mut().unwrap();
        form.dict
            .get_mut(b"Resources").unwrap()
            .as_dict_mut().unwrap()
            .set("XObject", dictionary! { "Fm1" => form_id });

        let page = extract_page_text(&doc, page_id).unwrap();
        assert!(page.spans.is_empty());
        assert_eq!(page.forms.keys().cloned().collect::<Vec<_>>(), vec![vec![form_id]]);
    }

    #[test]
    fn test_dangling_contents_is_an_error() {
        let (mut doc, page_id) = document_with_content(Vec::new(), monospace());
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Contents", Object::Reference((9999, 0)));

        assert!(extract_page_text(&doc, page_id).is_err());
    }
}
