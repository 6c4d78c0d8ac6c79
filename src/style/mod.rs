//! # Colors and Theme Resolution
//!
//! Every sheet is driven by one theme color (the rank's belt color). From it
//! we derive the title bar fill, the alternating row tint, and whether text
//! on the title bar must be light to stay readable.
//!
//! Two inputs need special handling: a near-white belt would produce a
//! white title bar on white paper, and a near-black belt would produce a
//! tint that is barely distinguishable from the bar. Both get fixed greys.

use serde::{Deserialize, Serialize};

/// An RGB color with channels in 0.0 - 1.0, as the PDF operators want them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    /// Blue used for "Link" anchors.
    pub const LINK: Color = Color {
        r: 0.0,
        g: 0.2,
        b: 0.8,
    };
    /// Cell borders.
    pub const BORDER: Color = Color {
        r: 0.6,
        g: 0.6,
        b: 0.6,
    };
    /// Secondary text (gym info, footer).
    pub const MUTED: Color = Color {
        r: 0.35,
        g: 0.35,
        b: 0.35,
    };

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

const NEAR_WHITE_THRESHOLD: u8 = 240;
const NEAR_BLACK_THRESHOLD: u8 = 30;

/// Fraction of the distance to white used to derive the row tint.
pub const TINT_BLEND: f64 = 0.78;

/// The substitute for a theme color that fails to parse.
pub const NEUTRAL_GREY: ThemeColor = ThemeColor {
    r: 128,
    g: 128,
    b: 128,
};

const MEDIUM_GREY: ThemeColor = ThemeColor {
    r: 150,
    g: 150,
    b: 150,
};
const LIGHT_GREY: ThemeColor = ThemeColor {
    r: 235,
    g: 235,
    b: 235,
};
const NEAR_BLACK: ThemeColor = ThemeColor {
    r: 30,
    g: 30,
    b: 30,
};

/// A theme color as 8-bit channels, the way it arrives from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThemeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Exactly one of these applies to every theme color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeClass {
    /// All channels above 240.
    NearWhite,
    /// All channels below 30.
    NearBlack,
    Normal,
}

impl ThemeColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `RRGGBB`, case-insensitive.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    pub fn classify(&self) -> ThemeClass {
        let channels = [self.r, self.g, self.b];
        if channels.iter().all(|&c| c > NEAR_WHITE_THRESHOLD) {
            ThemeClass::NearWhite
        } else if channels.iter().all(|&c| c < NEAR_BLACK_THRESHOLD) {
            ThemeClass::NearBlack
        } else {
            ThemeClass::Normal
        }
    }

    /// Perceptual luminance in 0.0 - 1.0.
    pub fn luminance(&self) -> f64 {
        (0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
    }

    /// Blend toward white by `amount` (0.0 keeps the color, 1.0 is white).
    pub fn lighten(&self, amount: f64) -> Self {
        let blend = |c: u8| {
            let c = c as f64;
            (c + (255.0 - c) * amount).round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: blend(self.r),
            g: blend(self.g),
            b: blend(self.b),
        }
    }

    pub fn to_color(self) -> Color {
        Color::from_rgb8(self.r, self.g, self.b)
    }
}

/// The colors a sheet is drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    /// Fill of every title bar.
    pub bar: Color,
    /// Fill of every other row; the rest are white.
    pub tint: Color,
    /// Draw title bar text in white instead of black.
    pub light_text: bool,
}

impl Theme {
    /// Resolve a theme from a hex color string. Malformed input degrades to
    /// neutral grey.
    pub fn from_hex(input: &str) -> Self {
        match ThemeColor::parse(input) {
            Some(color) => Self::resolve(color),
            None => {
                tracing::warn!(input, "malformed theme color, using neutral grey");
                Self::resolve(NEUTRAL_GREY)
            }
        }
    }

    pub fn resolve(color: ThemeColor) -> Self {
        match color.classify() {
            ThemeClass::NearWhite => Theme {
                bar: MEDIUM_GREY.to_color(),
                tint: LIGHT_GREY.to_color(),
                light_text: false,
            },
            ThemeClass::NearBlack => Theme {
                bar: NEAR_BLACK.to_color(),
                tint: LIGHT_GREY.to_color(),
                light_text: true,
            },
            ThemeClass::Normal => Theme {
                bar: color.to_color(),
                tint: color.lighten(TINT_BLEND).to_color(),
                light_text: color.luminance() <= 0.5,
            },
        }
    }

    /// Text color for anything drawn on a title bar.
    pub fn bar_text(&self) -> Color {
        if self.light_text {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }

    /// Fill for the `index`-th cell of an alternating run.
    pub fn row_fill(&self, index: usize) -> Color {
        if index % 2 == 0 {
            self.tint
        } else {
            Color::WHITE
        }
    }
}
