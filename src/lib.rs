//! # Rank Sheet
//!
//! A curriculum sheet engine: one rank's graded skills, laid out into
//! landscape pages and written as a PDF.
//!
//! The layout is page-native. Rows are measured first, the page height is
//! split between sections before anything is drawn, and a section that does
//! not fit is moved or split at item boundaries. Nothing is sliced after the
//! fact.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    : Categories, items, gym details
//!       ↓
//!   [style]    : Theme color → bar, tint, text contrast
//!       ↓
//!   [layout]   : Measure, allocate, render to a display list
//!       ↓
//!   [pdf]      : Serialize to PDF bytes
//! ```

pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

use chrono::Local;

pub use error::SheetError;
pub use image_loader::LoadedImage;
pub use layout::sheet::{layout_sheet, SheetInput};
pub use model::{Category, GymInfo, Item, SheetRequest};
pub use text::TextMeasure;

use font::FontContext;
use image_loader::load_image;
use pdf::{Metadata, PdfWriter};

/// Render one rank's sheet to PDF bytes.
///
/// This is the primary entry point. Measures with the built-in Helvetica
/// metrics and prints today's date in the footer.
pub fn generate(
    style_name: &str,
    rank_name: &str,
    categories: &[Category],
    theme_color: &str,
    gym: &GymInfo,
    logo: Option<&LoadedImage>,
) -> Result<Vec<u8>, SheetError> {
    let input = SheetInput {
        style_name,
        rank_name,
        categories,
        theme_color,
        gym,
        logo,
        date: Local::now().date_naive(),
    };
    render_sheet(&input, &FontContext::new())
}

/// Render a sheet with an explicit measurement surface.
///
/// Identical inputs give byte-identical output. A font the surface cannot
/// serve fails the whole render.
pub fn render_sheet(
    input: &SheetInput<'_>,
    measure: &dyn TextMeasure,
) -> Result<Vec<u8>, SheetError> {
    let pages = layout_sheet(input, measure)?;
    let metadata = Metadata {
        title: Some(document_title(input.style_name, input.rank_name)),
        author: Some(input.gym.name.trim().to_string()).filter(|name| !name.is_empty()),
    };
    PdfWriter::new().write(&pages, &metadata, &FontContext::new())
}

/// Render a sheet request described as JSON to PDF bytes.
pub fn render_json(json: &str) -> Result<Vec<u8>, SheetError> {
    let request: SheetRequest = serde_json::from_str(json)?;
    render_request(&request)
}

/// Render a parsed request, loading its logo first.
pub fn render_request(request: &SheetRequest) -> Result<Vec<u8>, SheetError> {
    let logo = request.logo.as_deref().map(load_image).transpose()?;
    let input = SheetInput {
        style_name: &request.style_name,
        rank_name: &request.rank_name,
        categories: &request.categories,
        theme_color: &request.theme_color,
        gym: &request.gym,
        logo: logo.as_ref(),
        date: request.date.unwrap_or_else(|| Local::now().date_naive()),
    };
    render_sheet(&input, &FontContext::new())
}

fn document_title(style_name: &str, rank_name: &str) -> String {
    match (style_name.trim(), rank_name.trim()) {
        ("", rank) => rank.to_string(),
        (style, "") => style.to_string(),
        (style, rank) => format!("{} - {}", style, rank),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_title() {
        assert_eq!(document_title("Kenpo", "Yellow Belt"), "Kenpo - Yellow Belt");
        assert_eq!(document_title("", "Yellow Belt"), "Yellow Belt");
        assert_eq!(document_title(" Kenpo ", ""), "Kenpo");
    }
}
