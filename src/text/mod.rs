//! # Text Measurement and Wrapping
//!
//! Everything above this module is host-agnostic: layout asks a
//! [`TextMeasure`] surface for string widths and for wrapped lines, and
//! never looks at glyphs itself. [`crate::font::FontContext`] is the
//! built-in surface; tests and callers can supply their own.
//!
//! Wrapping is greedy over UAX#14 break opportunities. A word wider than
//! the line is force-broken between characters so wrapping always
//! terminates.

pub mod rich;

use crate::error::SheetError;
use crate::font::FontSpec;
use unicode_linebreak::linebreaks;

/// Tolerance for width comparisons, so a string measured to exactly the
/// available width is not wrapped because of float noise.
pub const WIDTH_EPSILON: f64 = 0.001;

/// The measurement contract the layout engine runs on.
///
/// Errors from either method propagate out of every layout function
/// unchanged.
pub trait TextMeasure {
    /// Width of `text` in points when set in `font`.
    fn text_width(&self, text: &str, font: FontSpec) -> Result<f64, SheetError>;

    /// Break `text` into lines no wider than `max_width`.
    ///
    /// Returns at least one line. `\n` always breaks. Whitespace at a break
    /// is dropped, so the lines read as consecutive slices of the input.
    fn wrap(&self, text: &str, max_width: f64, font: FontSpec) -> Result<Vec<String>, SheetError>;
}

pub struct TextLayout;

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break a string into lines that fit within `max_width`, measuring
    /// each character with `char_width`.
    pub fn break_into_lines<F>(&self, text: &str, max_width: f64, char_width: F) -> Vec<String>
    where
        F: Fn(char) -> f64,
    {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
            self.break_paragraph(paragraph, max_width, &char_width, &mut lines);
        }
        lines
    }

    fn break_paragraph<F>(&self, text: &str, max_width: f64, char_width: &F, lines: &mut Vec<String>)
    where
        F: Fn(char) -> f64,
    {
        let measure = |s: &str| -> f64 { s.chars().map(char_width).sum() };
        let limit = max_width + WIDTH_EPSILON;

        let mut current = String::new();
        let mut current_width = 0.0;
        let mut start = 0;

        for (end, _) in linebreaks(text) {
            let segment = &text[start..end];
            start = end;
            if segment.is_empty() {
                continue;
            }

            // The segment carries its trailing spaces; only the visible part
            // has to fit.
            let visible = segment.trim_end();
            let visible_width = measure(visible);

            if !current.is_empty() {
                if current_width + visible_width <= limit {
                    current.push_str(segment);
                    current_width += measure(segment);
                    continue;
                }
                lines.push(current.trim_end().to_string());
                current.clear();
                current_width = 0.0;
            }

            if visible_width <= limit {
                current.push_str(segment);
                current_width = measure(segment);
                continue;
            }

            // No break opportunity fits: split the word between characters.
            let mut piece = String::new();
            let mut piece_width = 0.0;
            for ch in visible.chars() {
                let w = char_width(ch);
                if !piece.is_empty() && piece_width + w > limit {
                    lines.push(std::mem::take(&mut piece));
                    piece_width = 0.0;
                }
                piece.push(ch);
                piece_width += w;
            }
            let tail = &segment[visible.len()..];
            current = piece;
            current.push_str(tail);
            current_width = piece_width + measure(tail);
        }

        lines.push(current.trim_end().to_string());
    }
}
