//! Glyph widths of the standard 14 fonts
//!
//! Simple fonts that name a standard font without a `/Widths` array are
//! measured with these tables. Widths are in 1/1000 em for the printable
//! ASCII codes 32 to 126; other codes fall back to the font's default width.

/// First code covered by the tables
const FIRST_CODE: u32 = 32;

/// Helvetica and Helvetica-Oblique
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584,
    278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
    722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278,
    278, 278, 469, 556, 222, 556, 556, 500, 556, 556, 278, 556,
    556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold and Helvetica-BoldOblique
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584,
    278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722,
    722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333,
    278, 333, 584, 556, 278, 556, 611, 556, 611, 556, 333, 611,
    611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Times-Roman
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564,
    250, 333, 250, 278, 500, 500, 500, 500, 500, 500, 500, 500,
    500, 500, 278, 278, 564, 564, 564, 444, 921, 722, 667, 667,
    722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333,
    278, 333, 469, 500, 333, 444, 500, 444, 500, 444, 333, 500,
    500, 278, 278, 500, 278, 778, 500, 500, 500, 500, 333, 389,
    278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

/// Times-Bold
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570,
    250, 333, 250, 278, 500, 500, 500, 500, 500, 500, 500, 500,
    500, 500, 333, 333, 570, 570, 570, 500, 930, 722, 667, 722,
    722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333,
    278, 333, 581, 500, 333, 500, 556, 444, 556, 444, 333, 500,
    556, 278, 333, 556, 278, 833, 556, 500, 556, 556, 444, 389,
    333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// Times-Italic
const TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675,
    250, 333, 250, 278, 500, 500, 500, 500, 500, 500, 500, 500,
    500, 500, 333, 333, 675, 675, 675, 500, 920, 611, 611, 667,
    722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389,
    278, 389, 422, 500, 333, 500, 500, 444, 500, 444, 278, 500,
    500, 278, 278, 444, 278, 722, 500, 500, 500, 500, 389, 389,
    278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

/// Times-BoldItalic
const TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570,
    250, 333, 250, 278, 500, 500, 500, 500, 500, 500, 500, 500,
    500, 500, 333, 333, 570, 570, 570, 500, 832, 667, 667, 667,
    722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
    611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333,
    278, 333, 570, 500, 333, 500, 500, 444, 500, 444, 333, 500,
    556, 278, 278, 500, 278, 778, 556, 500, 500, 500, 389, 389,
    278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570,
];

/// Widths of one standard font
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum StandardWidths {
    Table(&'static [u16; 95]),
    /// Every glyph has the same width (Courier)
    Fixed(f32),
}

impl StandardWidths {
    /// Width of a character code, if the table covers it
    pub(crate) fn width(&self, code: u32) -> Option<f32> {
        match self {
            StandardWidths::Fixed(width) => Some(*width),
            StandardWidths::Table(table) => code
                .checked_sub(FIRST_CODE)
                .and_then(|idx| table.get(idx as usize))
                .map(|w| f32::from(*w)),
        }
    }
}

/// Strip a subset tag such as `ABCDEF+` and normalize to lowercase alphanumerics
fn normalize_font_name(name: &str) -> String {
    let name = match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    };

    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Look up the widths for a `/BaseFont` name, including common metric-compatible aliases
pub(crate) fn standard_widths(base_font: &str) -> Option<StandardWidths> {
    let name = normalize_font_name(base_font);

    if name.starts_with("courier") {
        return Some(StandardWidths::Fixed(600.0));
    }

    let table = match name.as_str() {
        "helvetica" | "helveticaoblique" | "arial" | "arialmt" | "arialitalic" | "arialitalicmt" => &HELVETICA,
        "helveticabold" | "helveticaboldoblique" | "arialbold" | "arialboldmt" | "arialbolditalic"
        | "arialbolditalicmt" => &HELVETICA_BOLD,
        "timesroman" | "timesnewroman" | "timesnewromanpsmt" => &TIMES_ROMAN,
        "timesbold" | "timesnewromanbold" | "timesnewromanpsboldmt" => &TIMES_BOLD,
        "timesitalic" | "timesnewromanitalic" | "timesnewromanpsitalicmt" => &TIMES_ITALIC,
        "timesbolditalic" | "timesnewromanbolditalic" | "timesnewromanpsbolditalicmt" => &TIMES_BOLD_ITALIC,
        _ => return None,
    };

    Some(StandardWidths::Table(table))
}
