//! # Sheet Layout
//!
//! Layout runs in three passes over the same input:
//!
//! 1. **Measure**: every item is planned at the column width it will be drawn
//!    at ([`item`]), categories are grouped into grid rows and each row gets
//!    its natural height ([`grid`]). Q&A blocks are wrapped to the full
//!    content width ([`qa`]).
//! 2. **Allocate**: the surplus page height is split between the grid and
//!    the Notes section, and sections are assigned to pages ([`page_break`]).
//! 3. **Render**: the plans are turned into positioned draw commands
//!    ([`sheet`]).
//!
//! Row counts have to be known before the vertical budget can be split, so
//! the passes cannot be merged.
//!
//! Positions are in points from the top-left corner of the page. The PDF
//! serializer flips them.

pub mod grid;
pub mod item;
pub mod page_break;
pub mod qa;
pub mod sheet;

use crate::font::FontSpec;
use crate::image_loader::LoadedImage;
use crate::style::Color;

/// Every size the sheet is drawn with. There is exactly one instance,
/// [`LayoutConstants::STANDARD`]; existing printed sheets depend on these
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConstants {
    /// US Letter, landscape.
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Band at the bottom of every page reserved for the footer.
    pub footer_height: f64,
    pub footer_size: f64,

    pub header_height: f64,
    pub logo_height: f64,
    pub logo_max_width: f64,
    pub title_size: f64,
    pub subtitle_size: f64,
    pub gym_name_size: f64,
    pub gym_info_size: f64,
    pub gym_line_height: f64,

    /// Vertical space between consecutive sections.
    pub section_gap: f64,
    pub title_bar_height: f64,
    pub title_bar_size: f64,

    pub row_height: f64,
    pub body_size: f64,
    pub cell_padding: f64,
    /// How much narrower than the column a single fancy line must be.
    pub fit_slack: f64,
    pub continuation_indent: f64,
    /// The item name never shrinks below this share of the column.
    pub name_floor_ratio: f64,
    pub column_gap: f64,
    pub max_columns: usize,
    pub max_table_categories: usize,
    pub border_width: f64,

    pub qa_title_size: f64,
    pub qa_text_size: f64,
    pub qa_line_height: f64,
    pub qa_padding: f64,

    pub notes_base_rows: usize,
}

impl LayoutConstants {
    pub const STANDARD: LayoutConstants = LayoutConstants {
        page_width: 792.0,
        page_height: 612.0,
        margin: 24.0,
        footer_height: 20.0,
        footer_size: 7.0,

        header_height: 58.0,
        logo_height: 50.0,
        logo_max_width: 110.0,
        title_size: 20.0,
        subtitle_size: 11.0,
        gym_name_size: 10.0,
        gym_info_size: 8.0,
        gym_line_height: 10.0,

        section_gap: 6.0,
        title_bar_height: 14.0,
        title_bar_size: 9.0,

        row_height: 12.0,
        body_size: 8.0,
        cell_padding: 2.0,
        fit_slack: 4.0,
        continuation_indent: 8.0,
        name_floor_ratio: 0.3,
        column_gap: 6.0,
        max_columns: 3,
        max_table_categories: 9,
        border_width: 1.0,

        qa_title_size: 9.0,
        qa_text_size: 8.0,
        qa_line_height: 10.0,
        qa_padding: 3.0,

        notes_base_rows: 4,
    };

    pub fn content_left(&self) -> f64 {
        self.margin
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn content_top(&self) -> f64 {
        self.margin
    }

    /// Nothing but the footer is drawn below this line.
    pub fn content_bottom(&self) -> f64 {
        self.page_height - self.margin - self.footer_height
    }

    /// Usable height of a page with no header.
    pub fn page_capacity(&self) -> f64 {
        self.content_bottom() - self.content_top()
    }

    pub fn body_font(&self) -> FontSpec {
        FontSpec::regular(self.body_size)
    }

    pub fn bar_font(&self) -> FontSpec {
        FontSpec::bold(self.title_bar_size)
    }

    /// Height of a section with a title bar and `rows` grid rows.
    pub fn section_height(&self, rows: usize) -> f64 {
        self.title_bar_height + rows as f64 * self.row_height
    }

    /// Minimum height of the Notes section.
    pub fn notes_min_height(&self) -> f64 {
        self.section_height(self.notes_base_rows)
    }
}

/// Where the next thing goes. Layout steps take a cursor and return the
/// one after what they placed; nothing holds a cursor across steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub page: usize,
    pub y: f64,
}

impl Cursor {
    pub fn start(constants: &LayoutConstants) -> Self {
        Self {
            page: 0,
            y: constants.content_top(),
        }
    }

    pub fn advance(self, dy: f64) -> Self {
        Self {
            y: self.y + dy,
            ..self
        }
    }

    pub fn next_page(self, constants: &LayoutConstants) -> Self {
        Self {
            page: self.page + 1,
            y: constants.content_top(),
        }
    }

    /// True when nothing has been placed on this page yet.
    pub fn at_page_top(&self, constants: &LayoutConstants) -> bool {
        self.y <= constants.content_top()
    }

    /// Whether `height` more fits above the content bottom.
    pub fn fits(&self, height: f64, constants: &LayoutConstants) -> bool {
        self.y + height <= constants.content_bottom() + crate::text::WIDTH_EPSILON
    }

    pub fn remaining(&self, constants: &LayoutConstants) -> f64 {
        (constants.content_bottom() - self.y).max(0.0)
    }
}

/// A fully laid-out page.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned draw command.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Top-left corner, except for text where `y` is the baseline.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// A filled and/or stroked rectangle.
    Rect {
        background: Option<Color>,
        border: Option<Border>,
    },
    /// One run of text on one baseline.
    Text {
        text: String,
        font: FontSpec,
        color: Color,
        underline: bool,
        /// Makes the run a clickable link.
        href: Option<String>,
    },
    /// A straight line from (x, y) to (x + width, y + height).
    Line { color: Color, width: f64 },
    Image { image: LoadedImage },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub color: Color,
    pub width: f64,
}

impl DrawCommand {
    pub fn text(text: impl Into<String>, font: FontSpec, color: Color) -> Self {
        DrawCommand::Text {
            text: text.into(),
            font,
            color,
            underline: false,
            href: None,
        }
    }
}

/// Collects elements onto pages by page index.
///
/// Pages are created on demand, so a plan that skips ahead to page 3 gets
/// blank pages 1 and 2 rather than an out-of-range panic.
pub struct Canvas<'c> {
    constants: &'c LayoutConstants,
    pages: Vec<LayoutPage>,
}

impl<'c> Canvas<'c> {
    pub fn new(constants: &'c LayoutConstants) -> Self {
        Self {
            constants,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Make sure pages `0..=page` exist.
    pub fn ensure_page(&mut self, page: usize) {
        while self.pages.len() <= page {
            self.pages.push(LayoutPage {
                width: self.constants.page_width,
                height: self.constants.page_height,
                elements: Vec::new(),
            });
        }
    }

    pub fn push(&mut self, page: usize, element: LayoutElement) {
        self.ensure_page(page);
        self.pages[page].elements.push(element);
    }

    pub fn rect(
        &mut self,
        page: usize,
        (x, y, width, height): (f64, f64, f64, f64),
        background: Option<Color>,
        border: Option<Border>,
    ) {
        self.push(
            page,
            LayoutElement {
                x,
                y,
                width,
                height,
                draw: DrawCommand::Rect { background, border },
            },
        );
    }

    /// Place a text run with its baseline at `baseline`. `width` is the
    /// measured advance of the run.
    pub fn text(&mut self, page: usize, x: f64, baseline: f64, width: f64, draw: DrawCommand) {
        let height = match &draw {
            DrawCommand::Text { font, .. } => font.size,
            _ => 0.0,
        };
        self.push(
            page,
            LayoutElement {
                x,
                y: baseline,
                width,
                height,
                draw,
            },
        );
    }

    pub fn finish(mut self) -> Vec<LayoutPage> {
        if self.pages.is_empty() {
            self.ensure_page(0);
        }
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_area() {
        let c = &LayoutConstants::STANDARD;
        assert_eq!(c.content_width(), 744.0);
        assert_eq!(c.content_bottom(), 568.0);
        assert_eq!(c.page_capacity(), 544.0);
        assert_eq!(c.notes_min_height(), 14.0 + 48.0);
    }

    #[test]
    fn test_cursor_is_a_value() {
        let c = &LayoutConstants::STANDARD;
        let start = Cursor::start(c);
        let moved = start.advance(100.0);
        assert_eq!(start.y, 24.0);
        assert_eq!(moved.y, 124.0);
        assert!(start.at_page_top(c));
        assert!(!moved.at_page_top(c));

        let next = moved.next_page(c);
        assert_eq!(next.page, 1);
        assert_eq!(next.y, c.content_top());
    }

    #[test]
    fn test_cursor_fits_exactly_to_bottom() {
        let c = &LayoutConstants::STANDARD;
        let cursor = Cursor { page: 0, y: 500.0 };
        assert!(cursor.fits(68.0, c));
        assert!(!cursor.fits(68.5, c));
        assert_eq!(cursor.remaining(c), 68.0);
    }

    #[test]
    fn test_canvas_creates_pages_on_demand() {
        let c = &LayoutConstants::STANDARD;
        let mut canvas = Canvas::new(c);
        canvas.rect(2, (0.0, 0.0, 10.0, 10.0), Some(Color::BLACK), None);
        let pages = canvas.finish();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].elements.is_empty());
        assert_eq!(pages[2].elements.len(), 1);
    }

    #[test]
    fn test_empty_canvas_still_has_a_page() {
        let pages = Canvas::new(&LayoutConstants::STANDARD).finish();
        assert_eq!(pages.len(), 1);
    }
}
