//! Embedding the replacement font as a Type0 (CID) font
//!
//! Text is written as glyph ids with `Identity-H` encoding and an identity
//! CID-to-GID map, so any glyph in the font can be used regardless of script.
//! The font dictionary's object id is reserved up front so pages can refer to
//! it while they are processed; the widths array and ToUnicode CMap are only
//! known once every page has been written, and are filled in by
//! [`EmbeddedFont::finish`].

use std::collections::BTreeMap;
use std::fmt::Write;
use log::debug;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use crate::error::Result;
use crate::font::{ReplacementFont, ShapedGlyph, Shaper};

/// bfchar entries per block; the CMap format allows at most 100
const CMAP_BLOCK: usize = 100;

/// The replacement font as it is being embedded into one document
pub struct EmbeddedFont<'f> {
    shaper: Shaper<'f>,
    font_id: ObjectId,
    /// Glyph id → (width in 1/1000 em, source text)
    used: BTreeMap<u16, (i64, String)>,
    attached: bool,
}

impl<'f> EmbeddedFont<'f> {
    /// Reserve an object id for the font in `doc`
    pub fn new(doc: &mut Document, font: &'f ReplacementFont) -> Result<Self> {
        Ok(Self {
            shaper: font.shaper()?,
            font_id: doc.new_object_id(),
            used: BTreeMap::new(),
            attached: false,
        })
    }

    /// Object id of the Type0 font dictionary
    ///
    /// Referencing the id marks the font as needed in the output.
    pub fn font_id(&mut self) -> ObjectId {
        self.attached = true;
        self.font_id
    }

    /// Shaper for measuring text in the replacement font
    pub fn shaper(&self) -> &Shaper<'f> {
        &self.shaper
    }

    /// Shape `text` and encode it as a `TJ` array of glyph ids
    ///
    /// Kerning from shaping is expressed as TJ adjustments against the
    /// nominal widths written to the font's `/W` array.
    pub fn encode(&mut self, text: &str) -> String {
        let glyphs = self.shaper.shape(text);
        self.encode_glyphs(&glyphs)
    }

    fn encode_glyphs(&mut self, glyphs: &[ShapedGlyph]) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(glyphs.len() * 2);

        for glyph in glyphs {
            let width = glyph.default_advance.round() as i64;
            let entry = self.used.entry(glyph.gid).or_insert_with(|| (width, String::new()));
            if entry.1.is_empty() && !glyph.text.is_empty() {
                entry.1 = glyph.text.clone();
            }

            parts.push(format!("<{:04X}>", glyph.gid));

            let adjust = (glyph.default_advance - glyph.advance).round() as i64;
            if adjust != 0 {
                parts.push(adjust.to_string());
            }
        }

        format!("[{}]", parts.join(" "))
    }

    /// Write the font objects into the document
    ///
    /// Does nothing if no page ever referenced the font.
    pub fn finish(self, doc: &mut Document) -> Result<()> {
        if !self.attached {
            return Ok(());
        }

        let font = self.shaper.font();
        debug!(
            "Embedding font {} with {} used glyphs",
            font.name(),
            self.used.len()
        );

        let metrics = font.metrics()?;
        let name = font.name().as_bytes().to_vec();

        // Font program: TrueType outlines go in FontFile2, CFF-flavored
        // OpenType in FontFile3
        let data = font.data();
        let mut font_stream_dict = Dictionary::new();
        if font.is_cff() {
            font_stream_dict.set("Subtype", Object::Name(b"OpenType".to_vec()));
        } else {
            font_stream_dict.set("Length1", Object::Integer(data.len() as i64));
        }
        let font_stream_id = doc.add_object(Stream::new(font_stream_dict, data.to_vec()));

        let mut font_descriptor = Dictionary::new();
        font_descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        font_descriptor.set("FontName", Object::Name(name.clone()));
        font_descriptor.set("Flags", Object::Integer(4)); // Symbolic
        font_descriptor.set(
            "FontBBox",
            Object::Array(metrics.bbox.iter().map(|v| Object::Integer(*v)).collect()),
        );
        font_descriptor.set("ItalicAngle", Object::Integer(0));
        font_descriptor.set("Ascent", Object::Integer(metrics.ascent));
        font_descriptor.set("Descent", Object::Integer(metrics.descent));
        font_descriptor.set("CapHeight", Object::Integer(metrics.cap_height));
        font_descriptor.set("StemV", Object::Integer(80));
        if font.is_cff() {
            font_descriptor.set("FontFile3", Object::Reference(font_stream_id));
        } else {
            font_descriptor.set("FontFile2", Object::Reference(font_stream_id));
        }
        let font_descriptor_id = doc.add_object(Object::Dictionary(font_descriptor));

        let mut cid_font = Dictionary::new();
        cid_font.set("Type", Object::Name(b"Font".to_vec()));
        if font.is_cff() {
            cid_font.set("Subtype", Object::Name(b"CIDFontType0".to_vec()));
        } else {
            cid_font.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
            cid_font.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
        }
        cid_font.set("BaseFont", Object::Name(name.clone()));
        cid_font.set(
            "CIDSystemInfo",
            Object::Dictionary(dictionary! {
                "Registry" => Object::String(b"Adobe".to_vec(), StringFormat::Literal),
                "Ordering" => Object::String(b"Identity".to_vec(), StringFormat::Literal),
                "Supplement" => 0,
            }),
        );
        cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
        cid_font.set("DW", Object::Integer(1000));
        cid_font.set("W", Object::Array(self.widths_array()));
        let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

        let to_unicode_id = doc.add_object(Stream::new(
            Dictionary::new(),
            self.to_unicode_cmap().into_bytes(),
        ));

        let mut type0 = Dictionary::new();
        type0.set("Type", Object::Name(b"Font".to_vec()));
        type0.set("Subtype", Object::Name(b"Type0".to_vec()));
        type0.set("BaseFont", Object::Name(name));
        type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
        type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)]));
        type0.set("ToUnicode", Object::Reference(to_unicode_id));

        doc.objects.insert(self.font_id, Object::Dictionary(type0));
        Ok(())
    }

    /// `/W` entries of the form `gid [width]`
    fn widths_array(&self) -> Vec<Object> {
        self.used
            .iter()
            .flat_map(|(gid, (width, _))| {
                [
                    Object::Integer(i64::from(*gid)),
                    Object::Array(vec![Object::Integer(*width)]),
                ]
            })
            .collect()
    }

    /// ToUnicode CMap mapping every used glyph id back to its text
    fn to_unicode_cmap(&self) -> String {
        let entries: Vec<(u16, &str)> = self
            .used
            .iter()
            .filter(|(_, (_, text))| !text.is_empty())
            .map(|(gid, (_, text))| (*gid, text.as_str()))
            .collect();

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo\n\
             << /Registry (Adobe)\n\
             /Ordering (UCS)\n\
             /Supplement 0\n\
             >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );

        for block in entries.chunks(CMAP_BLOCK) {
            let _ = writeln!(cmap, "{} beginbfchar", block.len());
            for (gid, text) in block {
                let utf16: String = text.encode_utf16().map(|u| format!("{:04X}", u)).collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );

        cmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::find_system_font;

    fn glyph(gid: u16, advance: f32, default_advance: f32, text: &str) -> ShapedGlyph {
        ShapedGlyph {
            gid,
            advance,
            default_advance,
            text: text.to_string(),
        }
    }

    fn load_font() -> Option<ReplacementFont> {
        let path = find_system_font()?;
        ReplacementFont::from_file(&path).ok()
    }

    #[test]
    fn test_encode_glyphs_with_kerning() {
        let Some(font) = load_font() else {
            eprintln!("Skipping: no system font");
            return;
        };
        let mut doc = Document::with_version("1.5");
        let mut embedded = EmbeddedFont::new(&mut doc, &font).unwrap();

        let tj = embedded.encode_glyphs(&[
            glyph(36, 667.0, 667.0, "A"),
            glyph(57, 600.0, 667.0, "V"),
            glyph(36, 667.0, 667.0, "A"),
        ]);
        assert_eq!(tj, "[<0024> <0039> 67 <0024>]");
        assert_eq!(embedded.used.len(), 2);
        assert_eq!(embedded.used[&57], (667, "V".to_string()));
    }

    #[test]
    fn test_to_unicode_cmap_entries() {
        let Some(font) = load_font() else {
            eprintln!("Skipping: no system font");
            return;
        };
        let mut doc = Document::with_version("1.5");
        let mut embedded = EmbeddedFont::new(&mut doc, &font).unwrap();
        embedded.encode_glyphs(&[glyph(5, 500.0, 500.0, "Ж"), glyph(7, 500.0, 500.0, "")]);

        let cmap = embedded.to_unicode_cmap();
        assert!(cmap.contains("1 beginbfchar\n<0005> <0416>\nendbfchar"));
        assert!(!cmap.contains("<0007>"));
    }

    #[test]
    fn test_finish_without_use_writes_nothing() {
        let Some(font) = load_font() else {
            eprintln!("Skipping: no system font");
            return;
        };
        let mut doc = Document::with_version("1.5");
        let before = doc.objects.len();
        let embedded = EmbeddedFont::new(&mut doc, &font).unwrap();
        embedded.finish(&mut doc).unwrap();
        assert_eq!(doc.objects.len(), before);
    }

    #[test]
    fn test_finish_writes_type0_font() {
        let Some(font) = load_font() else {
            eprintln!("Skipping: no system font");
            return;
        };
        let mut doc = Document::with_version("1.5");
        let mut embedded = EmbeddedFont::new(&mut doc, &font).unwrap();
        let font_id = embedded.font_id();
        embedded.encode("Hello");
        embedded.finish(&mut doc).unwrap();

        let dict = doc.get_dictionary(font_id).unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(dict.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");

        let descendant_id = dict.get(b"DescendantFonts").unwrap().as_array().unwrap()[0]
            .as_reference()
            .unwrap();
        let cid_font = doc.get_dictionary(descendant_id).unwrap();
        let widths = cid_font.get(b"W").unwrap().as_array().unwrap();
        // "Hello" uses four distinct glyphs
        assert_eq!(widths.len(), 8);
    }
}
