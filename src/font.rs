//! Replacement font loading, shaping and measurement using rustybuzz

use std::path::Path;
use log::warn;
use rustybuzz::{Face, UnicodeBuffer};
use crate::error::{Error, Result};
use crate::wrap::TextMeasure;

/// One shaped glyph, with advances in 1/1000ths of the em square
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedGlyph {
    /// Glyph id in the font (also the CID under Identity-H)
    pub gid: u16,
    /// Advance after shaping (kerning included)
    pub advance: f32,
    /// Nominal advance from the font's hmtx table
    pub default_advance: f32,
    /// Source text this glyph stands for, empty for the tail of a cluster
    pub text: String,
}

/// Font metrics needed for the PDF font descriptor, in 1/1000 em
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: i64,
    pub descent: i64,
    pub cap_height: i64,
    pub bbox: [i64; 4],
}

/// A TrueType/OpenType font used to re-render page text
pub struct ReplacementFont {
    name: String,
    data: Vec<u8>,
    units_per_em: i32,
}

impl std::fmt::Debug for ReplacementFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplacementFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl ReplacementFont {
    /// Load a font file from disk
    ///
    /// The PDF base font name is derived from the file name.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let data = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self::from_bytes(&name, data)
    }

    /// Load a font from memory
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self> {
        if data.starts_with(b"ttcf") {
            return Err(Error::Font(format!(
                "{} is a font collection; extract a single face to embed it",
                name
            )));
        }

        let units_per_em = Face::from_slice(&data, 0)
            .ok_or_else(|| Error::Font(format!("{} is not a TrueType/OpenType font", name)))?
            .units_per_em();

        if units_per_em == 0 {
            return Err(Error::Font(format!("{} has zero units per em", name)));
        }

        Ok(Self {
            name: pdf_font_name(name),
            data,
            units_per_em,
        })
    }

    /// Base font name to use in the PDF (a valid PDF name without spaces)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw font program
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the outlines are CFF (`OTTO` sfnt) rather than TrueType
    pub fn is_cff(&self) -> bool {
        self.data.starts_with(b"OTTO")
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::from_slice(&self.data, 0)
            .ok_or_else(|| Error::Font(format!("failed to parse font {}", self.name)))
    }

    fn to_thousandths(&self, units: f32) -> f32 {
        units * 1000.0 / self.units_per_em as f32
    }

    /// Descriptor metrics scaled to 1/1000 em
    pub fn metrics(&self) -> Result<FontMetrics> {
        let face = self.face()?;
        let scale = |v: i16| self.to_thousandths(v as f32).round() as i64;
        let bbox = face.global_bounding_box();

        Ok(FontMetrics {
            ascent: scale(face.ascender()),
            descent: scale(face.descender()),
            cap_height: face.capital_height().map(scale).unwrap_or_else(|| scale(face.ascender())),
            bbox: [scale(bbox.x_min), scale(bbox.y_min), scale(bbox.x_max), scale(bbox.y_max)],
        })
    }

    /// Parse the font once for shaping and measuring
    pub fn shaper(&self) -> Result<Shaper<'_>> {
        Ok(Shaper {
            font: self,
            face: self.face()?,
        })
    }
}

/// A parsed replacement font, reused for every line of a run
pub struct Shaper<'f> {
    font: &'f ReplacementFont,
    face: Face<'f>,
}

impl<'f> Shaper<'f> {
    pub fn font(&self) -> &'f ReplacementFont {
        self.font
    }

    fn run(&self, text: &str) -> rustybuzz::GlyphBuffer {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        rustybuzz::shape(&self.face, &[], buffer)
    }

    /// Shape a line of text
    ///
    /// Characters the font has no glyph for are dropped with a warning, so
    /// the rest of the line can still be drawn.
    pub fn shape(&self, text: &str) -> Vec<ShapedGlyph> {
        let output = self.run(text);
        let infos = output.glyph_infos();
        let positions = output.glyph_positions();

        // Cluster boundaries give each glyph the source text it represents
        let mut boundaries: Vec<usize> = infos.iter().map(|g| g.cluster as usize).collect();
        boundaries.push(text.len());
        boundaries.sort_unstable();
        boundaries.dedup();

        let mut glyphs = Vec::with_capacity(infos.len());
        let mut last_cluster = None;

        for (info, pos) in infos.iter().zip(positions.iter()) {
            let start = (info.cluster as usize).min(text.len());
            let end = boundaries
                .iter()
                .copied()
                .find(|&b| b > start)
                .unwrap_or(text.len());
            let source = text.get(start..end).unwrap_or_default();

            let first_in_cluster = last_cluster != Some(info.cluster);
            last_cluster = Some(info.cluster);

            let gid = info.glyph_id as u16;
            if gid == 0 {
                for ch in source.chars().filter(|c| !c.is_whitespace() && !c.is_control()) {
                    warn!(
                        "Font {} has no glyph for {:?} (U+{:04X}), dropping it",
                        self.font.name,
                        ch,
                        ch as u32
                    );
                }
                continue;
            }

            let default_units = self
                .face
                .glyph_hor_advance(rustybuzz::ttf_parser::GlyphId(gid))
                .unwrap_or(0);

            glyphs.push(ShapedGlyph {
                gid,
                advance: self.font.to_thousandths(pos.x_advance as f32),
                default_advance: self.font.to_thousandths(default_units as f32),
                text: if first_in_cluster { source.to_string() } else { String::new() },
            });
        }

        glyphs
    }
}

impl TextMeasure for Shaper<'_> {
    /// Width of the drawable glyphs, matching what [`Shaper::shape`] emits
    fn text_length(&self, text: &str, font_size: f32) -> f32 {
        let output = self.run(text);
        let units: i64 = output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .filter(|(info, _)| info.glyph_id != 0)
            .map(|(_, pos)| pos.x_advance as i64)
            .sum();

        units as f32 * font_size / self.font.units_per_em as f32
    }
}

/// Keep only characters that are safe in an unescaped PDF name
fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
        .collect();

    if cleaned.is_empty() {
        "ReflowFont".to_string()
    } else {
        cleaned
    }
}

/// Locate a TrueType font installed on the system, for tests
#[cfg(test)]
pub(crate) fn find_system_font() -> Option<std::path::PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .iter()
    .map(std::path::PathBuf::from)
    .find(|p| p.exists())
}
