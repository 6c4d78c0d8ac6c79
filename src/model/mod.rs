//! # Curriculum Model
//!
//! The input representation for the sheet engine: one rank's categories,
//! each holding graded items, plus the gym's contact details. The caller
//! resolves all of this from its own records; the engine only reads it.
//!
//! Every optional field is best-effort. A missing or blank value is simply
//! left out of the layout, never an error.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A request as it arrives in JSON: everything needed for one sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRequest {
    /// The martial art or program, e.g. "Kenpo".
    #[serde(default)]
    pub style_name: String,
    /// The rank this sheet is for, e.g. "Yellow Belt".
    pub rank_name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
    /// `#RRGGBB` or `RRGGBB`. Malformed values degrade to neutral grey.
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
    #[serde(default)]
    pub gym: GymInfo,
    /// Logo source: data URI, raw base64, or a file path.
    #[serde(default)]
    pub logo: Option<String>,
    /// Footer date. Defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

fn default_theme_color() -> String {
    "#808080".to_string()
}

/// A group of graded items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: Option<Scalar>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// How a category is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    /// Every item is a knowledge item: free-text Q&A blocks.
    Knowledge,
    /// Bordered grid cells.
    Table,
}

impl Category {
    /// `None` for an empty category, which is left out of the layout.
    pub fn kind(&self) -> Option<CategoryKind> {
        if self.items.is_empty() {
            None
        } else if self.items.iter().all(|item| item.kind == ItemKind::Knowledge) {
            Some(CategoryKind::Knowledge)
        } else {
            Some(CategoryKind::Table)
        }
    }

    pub fn description(&self) -> Option<&str> {
        present(&self.description)
    }
}

/// What an item asks of the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Something to explain or recite.
    Knowledge,
    /// Anything performed: techniques, forms, drills, conditioning.
    #[default]
    #[serde(other)]
    Skill,
}

/// One graded item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub show_title: bool,
    /// Rich text: `**` toggles bold, `\n` breaks the line.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sets: Option<Scalar>,
    #[serde(default)]
    pub reps: Option<Scalar>,
    #[serde(default)]
    pub duration: Option<Scalar>,
    #[serde(default)]
    pub distance: Option<Scalar>,
    #[serde(default)]
    pub time_limit: Option<Scalar>,
    #[serde(default)]
    pub time_limit_operator: Option<Comparison>,
    #[serde(default)]
    pub video_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Item {
    pub fn description(&self) -> Option<&str> {
        present(&self.description)
    }

    pub fn video_url(&self) -> Option<&str> {
        present(&self.video_url)
    }

    pub fn operator(&self) -> Comparison {
        self.time_limit_operator.unwrap_or_default()
    }

    /// The time limit, if set to something non-blank.
    pub fn time_limit(&self) -> Option<String> {
        scalar_text(&self.time_limit)
    }

    /// True when nothing but the name would be rendered.
    pub fn is_name_only(&self) -> bool {
        [&self.sets, &self.reps, &self.duration, &self.distance, &self.time_limit]
            .iter()
            .all(|field| scalar_text(field).is_none())
            && self.video_url().is_none()
    }
}

/// A number or a string, as the curriculum editor stores requirement values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// Display text of an optional scalar, `None` when blank.
pub fn scalar_text(value: &Option<Scalar>) -> Option<String> {
    let text = value.as_ref()?.to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The comparison a time limit is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Comparison {
    /// At most (inclusive).
    #[default]
    Lte,
    /// Under.
    Lt,
    /// Exactly.
    Eq,
    /// At least (inclusive).
    Gte,
    /// Over.
    Gt,
}

impl From<String> for Comparison {
    /// Accepts codes (`lte`) and symbols (`≤`, `<=`). Anything else is the
    /// default.
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "lt" | "<" => Comparison::Lt,
            "eq" | "=" | "==" => Comparison::Eq,
            "gte" | ">=" | "≥" => Comparison::Gte,
            "gt" | ">" => Comparison::Gt,
            _ => Comparison::Lte,
        }
    }
}

impl Comparison {
    /// The glyph drawn in a single-line item. Inclusive bounds reuse the
    /// strict glyph and add an underline.
    ///
    /// `Eq` has no glyph of its own and is drawn as a plain `<`, which makes
    /// it indistinguishable from `Lt` on paper. Existing sheets look like
    /// this.
    pub fn glyph(self) -> &'static str {
        match self {
            Comparison::Lte | Comparison::Lt | Comparison::Eq => "<",
            Comparison::Gte | Comparison::Gt => ">",
        }
    }

    pub fn underlined(self) -> bool {
        matches!(self, Comparison::Lte | Comparison::Gte)
    }

    /// Plain-text form for wrapped lines, where no underline is drawn.
    pub fn inline_text(self) -> &'static str {
        match self {
            Comparison::Lte => "<=",
            Comparison::Gte => ">=",
            Comparison::Lt | Comparison::Eq => "<",
            Comparison::Gt => ">",
        }
    }
}

impl From<Comparison> for String {
    fn from(value: Comparison) -> Self {
        match value {
            Comparison::Lte => "lte",
            Comparison::Lt => "lt",
            Comparison::Eq => "eq",
            Comparison::Gte => "gte",
            Comparison::Gt => "gt",
        }
        .to_string()
    }
}

/// Contact details printed in the header and footer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GymInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl GymInfo {
    /// "City, ST 12345" from whichever parts are present.
    pub fn city_line(&self) -> Option<String> {
        let city = present(&self.city);
        let state_zip: Vec<&str> = [present(&self.state), present(&self.zip_code)]
            .into_iter()
            .flatten()
            .collect();
        let state_zip = state_zip.join(" ");
        match (city, state_zip.is_empty()) {
            (Some(city), false) => Some(format!("{}, {}", city, state_zip)),
            (Some(city), true) => Some(city.to_string()),
            (None, false) => Some(state_zip),
            (None, true) => None,
        }
    }

    /// The header's right-aligned block, top to bottom. The first line is
    /// the gym name.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.name.trim().is_empty() {
            lines.push(self.name.trim().to_string());
        }
        if let Some(address) = present(&self.address) {
            lines.push(address.to_string());
        }
        if let Some(city_line) = self.city_line() {
            lines.push(city_line);
        }
        if let Some(phone) = present(&self.phone) {
            lines.push(format_phone(phone));
        }
        lines
    }

    pub fn website(&self) -> Option<&str> {
        present(&self.website)
    }

    pub fn email(&self) -> Option<&str> {
        present(&self.email)
    }
}

/// Format a phone number as `(NNN) NNN-NNNN`.
///
/// Only plain numeric input is reformatted: ten digits, or eleven with a
/// leading 1. Common separators are tolerated. Anything else comes back
/// verbatim.
pub fn format_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let numeric = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')' | '+'));
    if !numeric {
        return raw.to_string();
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = match digits.len() {
        10 => &digits[..],
        11 if digits.starts_with('1') => &digits[1..],
        _ => return raw.to_string(),
    };
    format!("({}) {}-{}", &local[0..3], &local[3..6], &local[6..10])
}

/// Trimmed, non-empty contents of an optional string.
fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
