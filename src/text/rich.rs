//! Rich-segment flattening for item descriptions.
//!
//! Descriptions carry one emphasis axis: `**` toggles bold on and off, and
//! `\n` is a hard line break. Wrapping works on plain strings, so the markup
//! is first flattened into one string plus the bold character ranges, and
//! only then split into lines. Emphasis is decided per physical line: a
//! wrapped line is bold only when a bold range overlaps its own characters,
//! and a bold span that crosses a line break marks both resulting lines.

use std::ops::Range;

use crate::error::SheetError;
use crate::font::FontSpec;
use crate::text::TextMeasure;

/// Toggles bold on and off.
pub const BOLD_TOGGLE: &str = "**";

/// Markup flattened to plain text plus bold ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatText {
    pub text: String,
    /// Half-open ranges of character offsets into `text`. Sorted, never
    /// empty, never overlapping.
    pub bold: Vec<Range<usize>>,
}

/// One line of text with its emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichLine {
    pub text: String,
    pub bold: bool,
}

/// Flatten markup into text and bold ranges.
///
/// An unterminated toggle leaves the rest of the string bold.
pub fn flatten(markup: &str) -> FlatText {
    let mut text = String::with_capacity(markup.len());
    let mut bold = Vec::new();
    let mut offset = 0;

    for (i, segment) in markup.split(BOLD_TOGGLE).enumerate() {
        let len = segment.chars().count();
        if i % 2 == 1 && len > 0 {
            bold.push(offset..offset + len);
        }
        text.push_str(segment);
        offset += len;
    }

    FlatText { text, bold }
}

impl FlatText {
    /// Split on `\n`. A line is bold when any bold range overlaps it.
    /// Blank lines are kept.
    pub fn logical_lines(&self) -> Vec<RichLine> {
        let mut lines = Vec::new();
        let mut start = 0;
        for line in self.text.split('\n') {
            let end = start + line.chars().count();
            let bold = self
                .bold
                .iter()
                .any(|range| range.start < end && start < range.end);
            lines.push(RichLine {
                text: line.to_string(),
                bold,
            });
            // Skip the newline itself.
            start = end + 1;
        }
        lines
    }

    /// Wrap every logical line at `max_width` and mark each physical line
    /// bold when a bold range overlaps its own characters.
    ///
    /// Each line is broken in the weight it will be drawn in: a line that
    /// touches bold text is re-broken in bold, so it never overflows. If the
    /// shorter bold line no longer touches bold text it is drawn regular,
    /// which is narrower still.
    pub fn physical_lines(
        &self,
        measure: &dyn TextMeasure,
        max_width: f64,
        font: FontSpec,
    ) -> Result<Vec<RichLine>, SheetError> {
        let regular = font.with_bold(false);
        let bold = font.with_bold(true);
        let mut out = Vec::new();

        let mut line_start = 0;
        for logical in self.text.split('\n') {
            let mut offset = line_start;
            let mut rest = logical;
            line_start += logical.chars().count() + 1;

            if rest.trim().is_empty() {
                out.push(RichLine {
                    text: String::new(),
                    bold: false,
                });
                continue;
            }

            while !rest.is_empty() {
                let mut text = first_line(measure, rest, max_width, regular)?;
                if self.overlaps_bold(offset, text.chars().count()) {
                    text = first_line(measure, rest, max_width, bold)?;
                }
                let len = text.chars().count();
                let is_bold = self.overlaps_bold(offset, len);

                let (consumed, tail) = advance_past(rest, &text);
                offset += consumed;
                rest = tail;
                out.push(RichLine {
                    text,
                    bold: is_bold,
                });
            }
        }
        Ok(out)
    }

    /// Whether `len` characters from `start` touch a bold range.
    fn overlaps_bold(&self, start: usize, len: usize) -> bool {
        let end = start + len;
        len > 0
            && self
                .bold
                .iter()
                .any(|range| range.start < end && start < range.end)
    }
}

/// The first wrapped line of `text`.
fn first_line(
    measure: &dyn TextMeasure,
    text: &str,
    max_width: f64,
    font: FontSpec,
) -> Result<String, SheetError> {
    Ok(measure
        .wrap(text, max_width, font)?
        .into_iter()
        .find(|line| !line.is_empty())
        .unwrap_or_else(|| text.to_string()))
}

/// Skip `line` and the whitespace dropped after it. Returns the characters
/// skipped and what is left. Always makes progress on non-empty `text`.
fn advance_past<'a>(text: &'a str, line: &str) -> (usize, &'a str) {
    let skip = match text.strip_prefix(line) {
        Some(rest) => text.len() - rest.len(),
        // A surface that rewrote the text: skip by characters.
        None => text
            .char_indices()
            .nth(line.chars().count().max(1))
            .map(|(i, _)| i)
            .unwrap_or(text.len()),
    };
    let skip = if skip == 0 {
        text.chars().next().map_or(0, char::len_utf8)
    } else {
        skip
    };
    let after = &text[skip..];
    let tail = after.trim_start();
    let dropped = &after[..after.len() - tail.len()];
    let consumed = text[..skip].chars().count() + dropped.chars().count();
    (consumed, tail)
}
