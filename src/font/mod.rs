//! # Font Management
//!
//! The sheet is drawn entirely with standard PDF fonts, which need no
//! embedding: Helvetica for body text and Helvetica-Bold for emphasis.
//! The registry maps family + weight to one of those fonts, and the
//! `FontContext` turns that into text measurement for the layout passes.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use crate::error::SheetError;
use crate::text::{TextLayout, TextMeasure};

/// Regular weight.
pub const REGULAR: u32 = 400;
/// Bold weight.
pub const BOLD: u32 = 700;

/// The family every sheet element is set in.
pub const HELVETICA: &str = "Helvetica";

/// A font request: family, weight and size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub family: &'static str,
    pub weight: u32,
    pub size: f64,
}

impl FontSpec {
    pub const fn regular(size: f64) -> Self {
        Self {
            family: HELVETICA,
            weight: REGULAR,
            size,
        }
    }

    pub const fn bold(size: f64) -> Self {
        Self {
            family: HELVETICA,
            weight: BOLD,
            size,
        }
    }

    /// Same family and size, bold or regular.
    pub fn with_bold(self, bold: bool) -> Self {
        Self {
            weight: if bold { BOLD } else { REGULAR },
            ..self
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }

    /// The registry key for this request (weights snap to 400 / 700).
    pub fn key(&self) -> FontKey {
        FontKey {
            family: self.family.to_string(),
            weight: if self.is_bold() { BOLD } else { REGULAR },
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
}

/// The standard PDF fonts the sheet uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica => &metrics::HELVETICA,
            Self::HelveticaBold => &metrics::HELVETICA_BOLD,
        }
    }
}

/// Maps family + weight to a standard font.
pub struct FontRegistry {
    fonts: HashMap<FontKey, StandardFont>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        fonts.insert(
            FontKey {
                family: HELVETICA.to_string(),
                weight: REGULAR,
            },
            StandardFont::Helvetica,
        );
        fonts.insert(
            FontKey {
                family: HELVETICA.to_string(),
                weight: BOLD,
            },
            StandardFont::HelveticaBold,
        );
        Self { fonts }
    }

    /// Look up a font. Unknown families are an error, not a silent
    /// fallback: a layout measured with the wrong metrics is worthless.
    pub fn resolve(&self, font: &FontSpec) -> Result<StandardFont, SheetError> {
        self.fonts.get(&font.key()).copied().ok_or_else(|| {
            SheetError::Font(format!(
                "unsupported font family '{}' (weight {})",
                font.family, font.weight
            ))
        })
    }
}

/// Shared font context used by layout and PDF serialization.
/// This is the built-in measurement surface.
pub struct FontContext {
    registry: FontRegistry,
    text_layout: TextLayout,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
            text_layout: TextLayout::new(),
        }
    }

    /// Resolve a font request to its standard font.
    pub fn resolve(&self, font: &FontSpec) -> Result<StandardFont, SheetError> {
        self.registry.resolve(font)
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, font: &FontSpec) -> Result<f64, SheetError> {
        Ok(self.resolve(font)?.metrics().char_width(ch, font.size))
    }
}

impl TextMeasure for FontContext {
    fn text_width(&self, text: &str, font: FontSpec) -> Result<f64, SheetError> {
        Ok(self.resolve(&font)?.metrics().measure_string(text, font.size))
    }

    fn wrap(&self, text: &str, max_width: f64, font: FontSpec) -> Result<Vec<String>, SheetError> {
        let metrics = self.resolve(&font)?.metrics();
        Ok(self
            .text_layout
            .break_into_lines(text, max_width, |ch| metrics.char_width(ch, font.size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', &FontSpec::regular(12.0)).unwrap();
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.text_width("Front kick", FontSpec::regular(12.0)).unwrap();
        let bold = ctx.text_width("Front kick", FontSpec::bold(12.0)).unwrap();
        assert!(bold > regular, "Bold should be wider than regular");
    }

    #[test]
    fn test_font_context_weight_resolution() {
        let ctx = FontContext::new();
        let heavy = FontSpec {
            weight: 800,
            ..FontSpec::regular(12.0)
        };
        let w700 = ctx.char_width('A', &FontSpec::bold(12.0)).unwrap();
        let w800 = ctx.char_width('A', &heavy).unwrap();
        assert!((w700 - w800).abs() < 0.001);
    }

    #[test]
    fn test_unknown_family_is_an_error() {
        let ctx = FontContext::new();
        let font = FontSpec {
            family: "Papyrus",
            ..FontSpec::regular(10.0)
        };
        let err = ctx.text_width("x", font).unwrap_err();
        assert!(matches!(err, SheetError::Font(_)));
    }

    #[test]
    fn test_wrap_uses_font_metrics() {
        let ctx = FontContext::new();
        let lines = ctx
            .wrap("Front kick Side kick", 45.0, FontSpec::regular(8.0))
            .unwrap();
        assert_eq!(lines, vec!["Front kick", "Side kick"]);
    }
}
