//! # Item Row Calculator
//!
//! Decides how one graded item is drawn inside a grid cell of a given
//! width, and how many grid rows that takes.
//!
//! An item is drawn on one compact "fancy" line when everything fits:
//!
//! ```text
//! Push-ups - 3 sets x 10 reps < 30 - Link
//! ```
//!
//! with the name in bold, the comparison glyph underlined for inclusive
//! bounds, and "Link" as a clickable anchor. Otherwise the text is wrapped:
//! the first line at the full text width, continuation lines indented. The
//! link token is appended last and never split across lines.
//!
//! Plans depend on the column width, so they are recomputed for every grid
//! row (a row's column count varies from 1 to 3).

use crate::error::SheetError;
use crate::font::FontSpec;
use crate::layout::LayoutConstants;
use crate::model::{scalar_text, Item};
use crate::text::{TextMeasure, WIDTH_EPSILON};

/// The anchor text drawn for a video link.
pub const LINK_LABEL: &str = "Link";
const SEPARATOR: &str = " - ";
/// Dash that introduces the link when it starts its own line.
const LINK_DASH: &str = "- ";

/// How one item is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPlan {
    Fancy(FancyLine),
    Wrapped(Vec<PlanLine>),
}

impl ItemPlan {
    /// Grid rows this item occupies. Never zero.
    pub fn line_count(&self) -> usize {
        match self {
            ItemPlan::Fancy(_) => 1,
            ItemPlan::Wrapped(lines) => lines.len().max(1),
        }
    }
}

/// A styled run within a fancy line.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
    pub underline: bool,
    /// The run is the video link.
    pub link: bool,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            underline: false,
            link: false,
        }
    }
}

/// A single compact line, drawn left to right without wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct FancyLine {
    pub segments: Vec<Segment>,
}

impl FancyLine {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// One physical line of a wrapped item.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanLine {
    pub text: String,
    /// Drawn indented.
    pub continuation: bool,
    /// Byte offset in `text` where the link label starts. The label always
    /// runs to the end of the line.
    pub link_at: Option<usize>,
}

/// The requirements text without the time clause: `3 sets x 10 reps / 2 min`.
pub fn requirements(item: &Item) -> String {
    let mut parts = Vec::new();
    match (scalar_text(&item.sets), scalar_text(&item.reps)) {
        (Some(sets), Some(reps)) => parts.push(format!("{} sets x {} reps", sets, reps)),
        (Some(sets), None) => parts.push(format!("{} sets", sets)),
        (None, Some(reps)) => parts.push(format!("{} reps", reps)),
        (None, None) => {}
    }
    parts.extend(scalar_text(&item.duration));
    parts.extend(scalar_text(&item.distance));
    parts.join(" / ")
}

/// Plan `item` for a cell `column_width` wide.
pub fn plan(
    item: &Item,
    column_width: f64,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<ItemPlan, SheetError> {
    let font = constants.body_font();
    let text_width = (column_width - constants.fit_slack).max(0.0);

    let fancy = fancy_segments(item);
    let fancy_text: String = fancy.iter().map(|s| s.text.as_str()).collect();
    if measure.text_width(&fancy_text, font)? <= text_width + WIDTH_EPSILON {
        let segments = fit_name(fancy, text_width, column_width, measure, constants)?;
        return Ok(ItemPlan::Fancy(FancyLine { segments }));
    }

    wrapped_lines(item, text_width, measure, constants).map(ItemPlan::Wrapped)
}

fn fancy_segments(item: &Item) -> Vec<Segment> {
    let mut segments = vec![Segment {
        text: item.name.trim().to_string(),
        bold: true,
        underline: false,
        link: false,
    }];
    if item.is_name_only() {
        return segments;
    }

    let reqs = requirements(item);
    let limit = item.time_limit();
    if !reqs.is_empty() || limit.is_some() {
        segments.push(Segment::plain(format!("{}{}", SEPARATOR, reqs)));
    }
    if let Some(limit) = limit {
        let op = item.operator();
        if !reqs.is_empty() {
            segments.push(Segment::plain(" "));
        }
        segments.push(Segment {
            text: op.glyph().to_string(),
            bold: false,
            underline: op.underlined(),
            link: false,
        });
        segments.push(Segment::plain(format!(" {}", limit)));
    }
    if item.video_url().is_some() {
        segments.push(Segment::plain(SEPARATOR));
        segments.push(Segment {
            text: LINK_LABEL.to_string(),
            bold: false,
            underline: true,
            link: true,
        });
    }
    segments
}

/// Shrink the bold name until the whole line fits, but never below the
/// name floor. Whatever still overflows is clipped by the cell.
fn fit_name(
    mut segments: Vec<Segment>,
    text_width: f64,
    column_width: f64,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<Vec<Segment>, SheetError> {
    let font = constants.body_font();
    let mut rest_width = 0.0;
    for segment in &segments[1..] {
        rest_width += measure.text_width(&segment.text, font)?;
    }
    let floor = constants.name_floor_ratio * column_width;
    let name_width = (text_width - rest_width).max(floor);

    let name = &segments[0].text;
    let bold = font.with_bold(true);
    if measure.text_width(name, bold)? <= name_width + WIDTH_EPSILON {
        return Ok(segments);
    }
    let mut chars: Vec<char> = name.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect();
        if measure.text_width(&candidate, bold)? <= name_width + WIDTH_EPSILON {
            break;
        }
    }
    segments[0].text = chars.into_iter().collect();
    Ok(segments)
}

/// The text wrapped in multi-line mode, without the link.
fn base_text(item: &Item) -> String {
    let mut detail = requirements(item);
    if let Some(limit) = item.time_limit() {
        if !detail.is_empty() {
            detail.push(' ');
        }
        detail.push_str(item.operator().inline_text());
        detail.push(' ');
        detail.push_str(&limit);
    }
    let name = item.name.trim();
    if detail.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", name, SEPARATOR, detail)
    }
}

fn wrapped_lines(
    item: &Item,
    text_width: f64,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<Vec<PlanLine>, SheetError> {
    let font = constants.body_font();
    let continuation_width = (text_width - constants.continuation_indent).max(0.0);
    let base = base_text(item);

    let first = measure
        .wrap(&base, text_width, font)?
        .into_iter()
        .next()
        .unwrap_or_default();
    let rest = remainder(&base, &first);

    let mut lines = vec![PlanLine {
        text: first,
        continuation: false,
        link_at: None,
    }];
    if !rest.is_empty() {
        for text in measure.wrap(rest, continuation_width, font)? {
            lines.push(PlanLine {
                text,
                continuation: true,
                link_at: None,
            });
        }
    }

    if item.video_url().is_some() {
        let suffix = format!("{}{}", SEPARATOR, LINK_LABEL);
        let last = lines.len() - 1;
        let width = if lines[last].continuation {
            continuation_width
        } else {
            text_width
        };
        let joined = format!("{}{}", lines[last].text, suffix);
        if measure.text_width(&joined, font)? <= width + WIDTH_EPSILON {
            lines[last].link_at = Some(joined.len() - LINK_LABEL.len());
            lines[last].text = joined;
        } else {
            lines.push(PlanLine {
                text: format!("{}{}", LINK_DASH, LINK_LABEL),
                continuation: true,
                link_at: Some(LINK_DASH.len()),
            });
        }
    }

    Ok(lines)
}

/// What is left of `base` after its first wrapped line.
fn remainder<'a>(base: &'a str, first: &str) -> &'a str {
    match base.strip_prefix(first) {
        Some(rest) => rest.trim_start(),
        // A measurement surface that rewrites text: skip by characters.
        None => {
            let skip = base
                .char_indices()
                .nth(first.chars().count())
                .map(|(i, _)| i)
                .unwrap_or(base.len());
            base[skip..].trim_start()
        }
    }
}

/// The font a fancy segment is drawn in.
pub fn segment_font(segment: &Segment, constants: &LayoutConstants) -> FontSpec {
    constants.body_font().with_bold(segment.bold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::model::{Comparison, Scalar};

    fn skill(name: &str) -> Item {
        Item {
            name: name.to_string(),
            show_title: true,
            ..Default::default()
        }
    }

    fn plan_at(item: &Item, width: f64) -> ItemPlan {
        plan(item, width, &FontContext::new(), &LayoutConstants::STANDARD).unwrap()
    }

    #[test]
    fn test_requirements_string() {
        let mut item = skill("Run");
        item.sets = Some(Scalar::Int(3));
        item.reps = Some(Scalar::Int(10));
        item.duration = Some(Scalar::Text("2 min".to_string()));
        item.distance = Some(Scalar::Text("1 mile".to_string()));
        assert_eq!(requirements(&item), "3 sets x 10 reps / 2 min / 1 mile");

        let mut item = skill("Run");
        item.reps = Some(Scalar::Int(20));
        assert_eq!(requirements(&item), "20 reps");
        assert_eq!(requirements(&skill("Bow")), "");
    }

    #[test]
    fn test_name_only_is_one_fancy_line() {
        let plan = plan_at(&skill("Front kick"), 240.0);
        assert_eq!(plan.line_count(), 1);
        match plan {
            ItemPlan::Fancy(line) => {
                assert_eq!(line.segments.len(), 1);
                assert_eq!(line.text(), "Front kick");
                assert!(line.segments[0].bold);
            }
            other => panic!("expected a fancy line, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_fields_leave_the_name_alone() {
        let mut item = skill("Horse stance");
        item.reps = Some(Scalar::Text(String::new()));
        item.time_limit_operator = Some(Comparison::Lte);
        assert!(item.is_name_only());
        let segments = fancy_segments(&item);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Horse stance");
    }

    #[test]
    fn test_fancy_line_with_clause_and_link() {
        let mut item = skill("Push-ups");
        item.sets = Some(Scalar::Int(3));
        item.reps = Some(Scalar::Int(10));
        item.time_limit = Some(Scalar::Text("30".to_string()));
        item.time_limit_operator = Some(Comparison::Lte);
        item.video_url = Some("https://example.com/v".to_string());

        let ItemPlan::Fancy(line) = plan_at(&item, 744.0) else {
            panic!("expected a single line");
        };
        assert_eq!(line.text(), "Push-ups - 3 sets x 10 reps < 30 - Link");
        let glyph = line.segments.iter().find(|s| s.text == "<").unwrap();
        assert!(glyph.underline);
        let link = line.segments.last().unwrap();
        assert!(link.link && link.underline);
        assert_eq!(link.text, LINK_LABEL);
    }

    #[test]
    fn test_strict_bound_is_not_underlined() {
        let mut item = skill("Sprint");
        item.time_limit = Some(Scalar::Int(12));
        item.time_limit_operator = Some(Comparison::Gt);
        let ItemPlan::Fancy(line) = plan_at(&item, 400.0) else {
            panic!("expected a single line");
        };
        assert_eq!(line.text(), "Sprint - > 12");
        assert!(line.segments.iter().all(|s| !s.underline));
    }

    /// Known quirk: "=" is drawn with the "<" glyph and no underline.
    #[test]
    fn test_exact_limit_draws_as_less_than() {
        let mut item = skill("Plank");
        item.time_limit = Some(Scalar::Text("60s".to_string()));
        item.time_limit_operator = Some(Comparison::Eq);
        let ItemPlan::Fancy(line) = plan_at(&item, 400.0) else {
            panic!("expected a single line");
        };
        assert_eq!(line.text(), "Plank - < 60s");
        assert!(line.segments.iter().all(|s| !s.underline));
    }

    #[test]
    fn test_narrow_cell_wraps_with_indent() {
        let mut item = skill("Spinning back hook kick");
        item.sets = Some(Scalar::Int(3));
        item.reps = Some(Scalar::Int(10));
        item.time_limit = Some(Scalar::Int(30));
        let plan = plan_at(&item, 80.0);
        let ItemPlan::Wrapped(lines) = &plan else {
            panic!("expected wrapping");
        };
        assert!(lines.len() >= 2);
        assert!(!lines[0].continuation);
        assert!(lines[1..].iter().all(|l| l.continuation));
        let joined: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert!(joined.join(" ").contains("<= 30"));
        assert_eq!(plan.line_count(), lines.len());
    }

    #[test]
    fn test_link_is_never_split() {
        let mut item = skill("Kata Heian Shodan full sequence");
        item.video_url = Some("https://example.com/kata".to_string());
        for width in [40.0, 60.0, 80.0, 100.0, 140.0] {
            if let ItemPlan::Wrapped(lines) = plan_at(&item, width) {
                let with_link: Vec<&PlanLine> =
                    lines.iter().filter(|l| l.link_at.is_some()).collect();
                assert_eq!(with_link.len(), 1);
                let line = with_link[0];
                assert!(line.text.ends_with("- Link"));
                assert_eq!(&line.text[line.link_at.unwrap()..], LINK_LABEL);
                assert!(lines.iter().all(|l| l.link_at.is_some() || !l.text.contains("Link")));
            }
        }
    }

    #[test]
    fn test_link_gets_own_line_when_last_line_is_full() {
        let mut item = skill("Roundhouse");
        item.video_url = Some("https://example.com/r".to_string());
        // Wide enough for the name, too narrow for the name and the link.
        let lines = match plan_at(&item, 52.0) {
            ItemPlan::Wrapped(lines) => lines,
            other => panic!("unexpected plan {:?}", other),
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Roundhouse");
        assert_eq!(lines[1].text, "- Link");
        assert_eq!(lines[1].link_at, Some(2));
    }

    #[test]
    fn test_empty_item_takes_one_row() {
        let plan = plan_at(&skill(""), 100.0);
        assert_eq!(plan.line_count(), 1);
        let plan = plan_at(&skill(""), 0.0);
        assert_eq!(plan.line_count(), 1);
    }

    #[test]
    fn test_long_name_is_truncated_not_dropped() {
        let mut item = skill("Wwwwwwwwwwwwwwwwwwww");
        item.reps = Some(Scalar::Int(5));
        // Regular-weight text fits, bold name does not.
        let ctx = FontContext::new();
        let c = &LayoutConstants::STANDARD;
        let regular = ctx
            .text_width("Wwwwwwwwwwwwwwwwwwww - 5 reps", c.body_font())
            .unwrap();
        let width = regular + c.fit_slack + 0.5;
        let ItemPlan::Fancy(line) = plan(&item, width, &ctx, c).unwrap() else {
            panic!("expected a single line");
        };
        let name = &line.segments[0].text;
        assert!(!name.is_empty());
        assert!(name.len() < item.name.len());
        assert!(item.name.starts_with(name.as_str()));
    }

    #[test]
    fn test_remainder_skips_first_line() {
        assert_eq!(remainder("Front kick x 10", "Front kick"), "x 10");
        assert_eq!(remainder("abc def", "ABC"), "def");
        assert_eq!(remainder("abc", "abc"), "");
    }
}
