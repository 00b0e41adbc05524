//! Re-wrapping text to a box width and fitting it horizontally

use crate::config::ReflowConfig;
use crate::geometry::{Matrix, Rect};

/// Anything that can report the rendered width of a string
pub trait TextMeasure {
    /// Advance width of `text` at `font_size`, in points
    fn text_length(&self, text: &str, font_size: f32) -> f32;
}

impl<T: TextMeasure + ?Sized> TextMeasure for &T {
    fn text_length(&self, text: &str, font_size: f32) -> f32 {
        (**self).text_length(text, font_size)
    }
}

/// Wrap text into lines no wider than `max_width`
///
/// Words are separated by single spaces and placed greedily. A word that
/// does not fit on an empty line is broken by characters: the longest prefix
/// that fits becomes its own line and the rest of the word starts the next
/// line unbroken, so that line may still be too wide.
pub fn wrap_text<M: TextMeasure>(text: &str, max_width: f32, font_size: f32, measure: &M) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut current_line: Vec<&str> = Vec::new();

    for word in text.split(' ') {
        let mut candidate = current_line.join(" ");
        if !current_line.is_empty() {
            candidate.push(' ');
        }
        candidate.push_str(word);

        if measure.text_length(&candidate, font_size) <= max_width {
            current_line.push(word);
            continue;
        }

        if current_line.is_empty() {
            match split_to_width(word, max_width, font_size, measure) {
                Some((head, tail)) => {
                    if !head.is_empty() {
                        lines.push(head.to_string());
                    }
                    if !tail.is_empty() {
                        current_line.push(tail);
                    }
                }
                None => current_line.push(word),
            }
        } else {
            lines.push(current_line.join(" "));
            current_line.clear();
            current_line.push(word);
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    lines
}

/// Split a word before the first character that makes it overflow
///
/// Returns `None` when the whole word fits.
fn split_to_width<'a, M: TextMeasure>(
    word: &'a str,
    max_width: f32,
    font_size: f32,
    measure: &M,
) -> Option<(&'a str, &'a str)> {
    for (idx, ch) in word.char_indices() {
        let end = idx + ch.len_utf8();
        if measure.text_length(&word[..end], font_size) > max_width {
            return Some(word.split_at(idx));
        }
    }
    None
}

/// Horizontal scale that makes `text` as wide as `bbox`
///
/// The scale is clamped to `[min_scale, max_scale]` and falls back to 1.0
/// when the text has no measurable width.
pub fn morph_matrix<M: TextMeasure>(
    text: &str,
    bbox: Rect,
    font_size: f32,
    measure: &M,
    config: &ReflowConfig,
) -> Matrix {
    let original_width = bbox.width();
    let new_width = measure.text_length(text, font_size);

    let scale_x = if new_width > 0.0 {
        original_width / new_width
    } else {
        1.0
    };

    let scale_x = scale_x.clamp(config.min_scale, config.max_scale);
    Matrix::scale(scale_x, 1.0)
}
