//! # Page Renderer
//!
//! Drives the three passes for one sheet and draws the result:
//!
//! ```text
//! +--------------------------------------------------------------+
//! | [logo]             Yellow Belt                    Gym name    |
//! |                      Kenpo                        address     |
//! | [== Q&A category bar ================================]       |
//! | [ block ][ block ] ...                                        |
//! | [== Kicks ==]      [== Blocks ==]     [== Forms ==]           |
//! | [ cell ]           [ cell ]           [ cell ]                |
//! | [== Notes ===========================================]       |
//! | website              October 16, 2026              email      |
//! +--------------------------------------------------------------+
//! ```
//!
//! The header is drawn on the first page only; the footer on every page.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::SheetError;
use crate::font::FontSpec;
use crate::image_loader::LoadedImage;
use crate::layout::grid::{measure_sections, table_categories, SectionRow};
use crate::layout::item::{segment_font, ItemPlan, LINK_LABEL};
use crate::layout::page_break::{allocate, paginate, GridLayout, NotesPlacement};
use crate::layout::qa::{measure_qa, paginate_qa, render_qa};
use crate::layout::{
    Border, Canvas, Cursor, DrawCommand, LayoutConstants, LayoutElement, LayoutPage,
};
use crate::model::{Category, GymInfo, Item};
use crate::style::{Color, Theme};
use crate::text::{TextMeasure, WIDTH_EPSILON};

/// Suffix for the title bar of a section continued from the previous page.
pub const CONTINUED: &str = " (cont.)";
pub const NOTES_TITLE: &str = "Notes";

/// Everything one sheet is drawn from. All of it is read-only to the
/// engine.
#[derive(Debug, Clone, Copy)]
pub struct SheetInput<'a> {
    pub style_name: &'a str,
    pub rank_name: &'a str,
    pub categories: &'a [Category],
    pub theme_color: &'a str,
    pub gym: &'a GymInfo,
    pub logo: Option<&'a LoadedImage>,
    /// Printed in the footer.
    pub date: NaiveDate,
}

/// Run measurement, allocation and rendering for one sheet.
pub fn layout_sheet(
    input: &SheetInput<'_>,
    measure: &dyn TextMeasure,
) -> Result<Vec<LayoutPage>, SheetError> {
    let constants = &LayoutConstants::STANDARD;
    let theme = Theme::from_hex(input.theme_color);

    // Measure
    let qa = measure_qa(input.categories, measure, constants)?;
    let tables = table_categories(input.categories, constants);
    let sections = measure_sections(&tables, measure, constants)?;

    // Allocate
    let header_end = Cursor::start(constants).advance(constants.header_height);
    let (qa_placements, grid_start) = paginate_qa(&qa, header_end, constants);
    let naturals: Vec<usize> = sections.iter().map(SectionRow::natural_rows).collect();
    let allocation = allocate(grid_start.remaining(constants), &naturals, constants);
    let grid = paginate(&sections, &allocation, grid_start, constants);

    // Render
    let mut canvas = Canvas::new(constants);
    draw_header(&mut canvas, input, &theme, measure, constants)?;
    render_qa(&qa, &qa_placements, &mut canvas, &theme, measure, constants)?;
    render_grid(&sections, &grid, &mut canvas, &theme, measure, constants)?;
    render_notes(grid.notes, &mut canvas, &theme, measure, constants)?;
    for page in 0..canvas.page_count() {
        draw_footer(&mut canvas, page, input, measure, constants)?;
    }

    let pages = canvas.finish();
    debug!(
        rank = input.rank_name,
        pages = pages.len(),
        qa_categories = qa.len(),
        table_categories = tables.len(),
        "laid out sheet"
    );
    Ok(pages)
}

/// Baseline that visually centers text of `size` in a band.
pub(crate) fn centered_baseline(top: f64, height: f64, size: f64) -> f64 {
    top + (height + size * 0.7) / 2.0
}

/// Drop characters from the end until `text` fits in `width`.
pub(crate) fn clip_to_width(
    text: &str,
    width: f64,
    font: FontSpec,
    measure: &dyn TextMeasure,
) -> Result<String, SheetError> {
    if measure.text_width(text, font)? <= width + WIDTH_EPSILON {
        return Ok(text.to_string());
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect();
        if measure.text_width(&candidate, font)? <= width + WIDTH_EPSILON {
            return Ok(candidate);
        }
    }
    Ok(String::new())
}

/// A colored bar with the category name in bold and its description after
/// it, both clipped to the bar.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_title_bar(
    canvas: &mut Canvas<'_>,
    page: usize,
    (x, y, width): (f64, f64, f64),
    category: &Category,
    continued: bool,
    theme: &Theme,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let title = if continued {
        format!("{}{}", category.name.trim(), CONTINUED)
    } else {
        category.name.trim().to_string()
    };
    draw_bar(canvas, page, (x, y, width), &title, theme, measure, constants)?;

    if let Some(description) = category.description() {
        let font = constants.bar_font();
        let used = measure.text_width(&title, font)?;
        let regular = font.with_bold(false);
        let gap = measure.text_width("  ", regular)?;
        let start = x + constants.cell_padding + used + gap;
        let room = x + width - constants.cell_padding - start;
        let text = clip_to_width(description, room.max(0.0), regular, measure)?;
        if !text.is_empty() {
            let advance = measure.text_width(&text, regular)?;
            let baseline = centered_baseline(y, constants.title_bar_height, font.size);
            canvas.text(
                page,
                start,
                baseline,
                advance,
                DrawCommand::text(text, regular, theme.bar_text()),
            );
        }
    }
    Ok(())
}

fn draw_bar(
    canvas: &mut Canvas<'_>,
    page: usize,
    (x, y, width): (f64, f64, f64),
    title: &str,
    theme: &Theme,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    canvas.rect(
        page,
        (x, y, width, constants.title_bar_height),
        Some(theme.bar),
        Some(Border {
            color: theme.bar,
            width: constants.border_width,
        }),
    );
    let font = constants.bar_font();
    let title = clip_to_width(title, width - 2.0 * constants.cell_padding, font, measure)?;
    let advance = measure.text_width(&title, font)?;
    canvas.text(
        page,
        x + constants.cell_padding,
        centered_baseline(y, constants.title_bar_height, font.size),
        advance,
        DrawCommand::text(title, font, theme.bar_text()),
    );
    Ok(())
}

fn draw_header(
    canvas: &mut Canvas<'_>,
    input: &SheetInput<'_>,
    theme: &Theme,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let left = constants.content_left();
    let top = constants.content_top();
    let right = left + constants.content_width();
    canvas.ensure_page(0);

    if let Some(logo) = input.logo {
        let (width, height) = logo.fit(constants.logo_height, constants.logo_max_width);
        if width > 0.0 {
            canvas.push(
                0,
                LayoutElement {
                    x: left,
                    y: top,
                    width,
                    height,
                    draw: DrawCommand::Image {
                        image: logo.clone(),
                    },
                },
            );
        }
    }

    let centered = |canvas: &mut Canvas<'_>,
                    text: &str,
                    font: FontSpec,
                    baseline: f64|
     -> Result<(), SheetError> {
        let width = measure.text_width(text, font)?;
        canvas.text(
            0,
            left + (constants.content_width() - width) / 2.0,
            baseline,
            width,
            DrawCommand::text(text, font, Color::BLACK),
        );
        Ok(())
    };
    let title_baseline = top + constants.title_size;
    centered(
        canvas,
        input.rank_name.trim(),
        FontSpec::bold(constants.title_size),
        title_baseline,
    )?;
    let style = input.style_name.trim();
    if !style.is_empty() {
        centered(
            canvas,
            style,
            FontSpec::regular(constants.subtitle_size),
            title_baseline + constants.subtitle_size + 4.0,
        )?;
    }

    let has_name = !input.gym.name.trim().is_empty();
    for (i, line) in input.gym.header_lines().iter().enumerate() {
        let font = if i == 0 && has_name {
            FontSpec::bold(constants.gym_name_size)
        } else {
            FontSpec::regular(constants.gym_info_size)
        };
        let width = measure.text_width(line, font)?;
        canvas.text(
            0,
            right - width,
            top + constants.gym_name_size + i as f64 * constants.gym_line_height,
            width,
            DrawCommand::text(line.clone(), font, Color::BLACK),
        );
    }

    // Rule between the header and the body, in the belt color.
    canvas.push(
        0,
        LayoutElement {
            x: left,
            y: top + constants.header_height - constants.section_gap / 2.0,
            width: constants.content_width(),
            height: 0.0,
            draw: DrawCommand::Line {
                color: theme.bar,
                width: constants.border_width,
            },
        },
    );
    Ok(())
}

fn render_grid(
    sections: &[SectionRow<'_>],
    layout: &GridLayout,
    canvas: &mut Canvas<'_>,
    theme: &Theme,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let border = Some(Border {
        color: Color::BORDER,
        width: constants.border_width,
    });
    let row_height = constants.row_height;

    for placement in &layout.sections {
        let section = &sections[placement.section];
        let width = section.column_width;
        for (c, column) in section.columns.iter().enumerate() {
            let x = constants.content_left() + c as f64 * (width + constants.column_gap);
            draw_title_bar(
                canvas,
                placement.page,
                (x, placement.y, width),
                column.category,
                placement.continued,
                theme,
                measure,
                constants,
            )?;

            let top = placement.y + constants.title_bar_height;
            let items = placement.items.get(c).cloned().unwrap_or(0..0);
            let mut used = 0;
            for index in items.clone() {
                let plan = &column.plans[index];
                let lines = plan.line_count();
                let cell_top = top + used as f64 * row_height;
                // One border around the whole item, however many lines.
                canvas.rect(
                    placement.page,
                    (x, cell_top, width, lines as f64 * row_height),
                    Some(theme.row_fill(index)),
                    border,
                );
                draw_plan(
                    canvas,
                    placement.page,
                    (x, cell_top),
                    &column.category.items[index],
                    plan,
                    measure,
                    constants,
                )?;
                used += lines;
            }
            for blank in used..placement.rows {
                canvas.rect(
                    placement.page,
                    (x, top + blank as f64 * row_height, width, row_height),
                    Some(theme.row_fill(items.end + blank - used)),
                    border,
                );
            }
        }
    }
    Ok(())
}

fn draw_plan(
    canvas: &mut Canvas<'_>,
    page: usize,
    (x, top): (f64, f64),
    item: &Item,
    plan: &ItemPlan,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let font = constants.body_font();
    let href = item.video_url().map(str::to_string);
    let link = |text: &str, font: FontSpec| DrawCommand::Text {
        text: text.to_string(),
        font,
        color: Color::LINK,
        underline: true,
        href: href.clone(),
    };

    match plan {
        ItemPlan::Fancy(line) => {
            let baseline = centered_baseline(top, constants.row_height, font.size);
            let mut cursor_x = x + constants.cell_padding;
            for segment in &line.segments {
                if segment.text.is_empty() {
                    continue;
                }
                let font = segment_font(segment, constants);
                let advance = measure.text_width(&segment.text, font)?;
                let draw = if segment.link {
                    link(&segment.text, font)
                } else {
                    DrawCommand::Text {
                        text: segment.text.clone(),
                        font,
                        color: Color::BLACK,
                        underline: segment.underline,
                        href: None,
                    }
                };
                canvas.text(page, cursor_x, baseline, advance, draw);
                cursor_x += advance;
            }
        }
        ItemPlan::Wrapped(lines) => {
            for (i, line) in lines.iter().enumerate() {
                let line_top = top + i as f64 * constants.row_height;
                let baseline = centered_baseline(line_top, constants.row_height, font.size);
                let mut line_x = x + constants.cell_padding;
                if line.continuation {
                    line_x += constants.continuation_indent;
                }
                let (plain, anchor) = match line.link_at {
                    Some(at) => line.text.split_at(at),
                    None => (line.text.as_str(), ""),
                };
                if !plain.is_empty() {
                    let advance = measure.text_width(plain, font)?;
                    canvas.text(
                        page,
                        line_x,
                        baseline,
                        advance,
                        DrawCommand::text(plain, font, Color::BLACK),
                    );
                    line_x += advance;
                }
                if !anchor.is_empty() {
                    let advance = measure.text_width(LINK_LABEL, font)?;
                    canvas.text(page, line_x, baseline, advance, link(anchor, font));
                }
            }
        }
    }
    Ok(())
}

fn render_notes(
    notes: NotesPlacement,
    canvas: &mut Canvas<'_>,
    theme: &Theme,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let x = constants.content_left();
    let width = constants.content_width();
    draw_bar(
        canvas,
        notes.page,
        (x, notes.y, width),
        NOTES_TITLE,
        theme,
        measure,
        constants,
    )?;
    let top = notes.y + constants.title_bar_height;
    for row in 0..notes.rows {
        canvas.rect(
            notes.page,
            (x, top + row as f64 * constants.row_height, width, constants.row_height),
            Some(theme.row_fill(row)),
            Some(Border {
                color: Color::BORDER,
                width: constants.border_width,
            }),
        );
    }
    Ok(())
}

/// Website on the left, date in the middle, email on the right.
fn draw_footer(
    canvas: &mut Canvas<'_>,
    page: usize,
    input: &SheetInput<'_>,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let font = FontSpec::regular(constants.footer_size);
    let baseline = centered_baseline(
        constants.content_bottom(),
        constants.footer_height,
        font.size,
    );
    let left = constants.content_left();
    let width = constants.content_width();

    let date = input.date.format("%B %-d, %Y").to_string();
    let entries = [
        (input.gym.website(), 0.0),
        (Some(date.as_str()), 0.5),
        (input.gym.email(), 1.0),
    ];
    for (text, align) in entries {
        let Some(text) = text else { continue };
        let advance = measure.text_width(text, font)?;
        canvas.text(
            page,
            left + (width - advance) * align,
            baseline,
            advance,
            DrawCommand::text(text, font, Color::MUTED),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::model::{ItemKind, Scalar};

    fn input<'a>(categories: &'a [Category], gym: &'a GymInfo) -> SheetInput<'a> {
        SheetInput {
            style_name: "Kenpo",
            rank_name: "Yellow Belt",
            categories,
            theme_color: "#FFD700",
            gym,
            logo: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        }
    }

    fn texts(page: &LayoutPage) -> Vec<String> {
        page.elements
            .iter()
            .filter_map(|e| match &e.draw {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn skill(name: &str) -> Item {
        Item {
            name: name.to_string(),
            show_title: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_centered_baseline() {
        assert!((centered_baseline(0.0, 12.0, 8.0) - 8.8).abs() < 1e-9);
    }

    #[test]
    fn test_clip_to_width() {
        let ctx = FontContext::new();
        let font = FontSpec::regular(8.0);
        assert_eq!(clip_to_width("Kicks", 100.0, font, &ctx).unwrap(), "Kicks");
        let clipped = clip_to_width("Kicks and strikes", 20.0, font, &ctx).unwrap();
        assert!(clipped.len() < "Kicks and strikes".len());
        assert!(ctx.text_width(&clipped, font).unwrap() <= 20.0);
        assert_eq!(clip_to_width("W", 0.0, font, &ctx).unwrap(), "");
    }

    #[test]
    fn test_empty_sheet_has_header_notes_and_footer() {
        let gym = GymInfo {
            name: "Tiger Dojo".to_string(),
            website: Some("tigerdojo.example".to_string()),
            email: Some("info@tigerdojo.example".to_string()),
            ..Default::default()
        };
        let pages = layout_sheet(&input(&[], &gym), &FontContext::new()).unwrap();
        assert_eq!(pages.len(), 1);
        let texts = texts(&pages[0]);
        for expected in [
            "Yellow Belt",
            "Kenpo",
            "Tiger Dojo",
            "Notes",
            "tigerdojo.example",
            "October 16, 2026",
            "info@tigerdojo.example",
        ] {
            assert!(texts.iter().any(|t| t == expected), "missing {}", expected);
        }
        assert!(pages[0]
            .elements
            .iter()
            .any(|e| matches!(e.draw, DrawCommand::Line { .. })));
    }

    #[test]
    fn test_every_page_gets_a_footer() {
        let categories: Vec<Category> = (0..3)
            .map(|c| Category {
                name: format!("Drills {}", c),
                items: (0..60).map(|i| skill(&format!("Drill {}", i))).collect(),
                ..Default::default()
            })
            .collect();
        let gym = GymInfo::default();
        let pages = layout_sheet(&input(&categories, &gym), &FontContext::new()).unwrap();
        assert!(pages.len() >= 2);
        for page in &pages {
            assert_eq!(
                texts(page).iter().filter(|t| *t == "October 16, 2026").count(),
                1
            );
        }
        assert!(texts(&pages[1]).iter().any(|t| t.ends_with(CONTINUED)));
    }

    #[test]
    fn test_link_is_drawn_as_annotation() {
        let mut item = skill("Front kick");
        item.reps = Some(Scalar::Int(10));
        item.video_url = Some("https://example.com/front-kick".to_string());
        let categories = vec![Category {
            name: "Kicks".to_string(),
            items: vec![item],
            ..Default::default()
        }];
        let gym = GymInfo::default();
        let pages = layout_sheet(&input(&categories, &gym), &FontContext::new()).unwrap();
        let links: Vec<&LayoutElement> = pages[0]
            .elements
            .iter()
            .filter(|e| matches!(&e.draw, DrawCommand::Text { href: Some(_), .. }))
            .collect();
        assert_eq!(links.len(), 1);
        match &links[0].draw {
            DrawCommand::Text {
                text,
                href,
                underline,
                color,
                ..
            } => {
                assert_eq!(text, "Link");
                assert_eq!(href.as_deref(), Some("https://example.com/front-kick"));
                assert!(*underline);
                assert_eq!(*color, Color::LINK);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_qa_section_comes_before_grid() {
        let terms = Category {
            name: "Terms".to_string(),
            items: vec![Item {
                name: "Osu".to_string(),
                kind: ItemKind::Knowledge,
                show_title: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let kicks = Category {
            name: "Kicks".to_string(),
            items: vec![skill("Front kick")],
            ..Default::default()
        };
        // Input order puts the table first.
        let categories = vec![kicks, terms];
        let gym = GymInfo::default();
        let pages = layout_sheet(&input(&categories, &gym), &FontContext::new()).unwrap();

        let y_of = |name: &str| {
            pages[0]
                .elements
                .iter()
                .find(|e| matches!(&e.draw, DrawCommand::Text { text, .. } if text == name))
                .map(|e| e.y)
                .unwrap()
        };
        assert!(y_of("Terms") < y_of("Kicks"));
        assert!(y_of("Kicks") < y_of("Notes"));
    }

    #[test]
    fn test_nothing_drawn_below_content_bottom_except_footer() {
        let categories: Vec<Category> = (0..4)
            .map(|c| Category {
                name: format!("C{}", c),
                items: (0..25).map(|i| skill(&format!("Item {}", i))).collect(),
                ..Default::default()
            })
            .collect();
        let gym = GymInfo::default();
        let c = &LayoutConstants::STANDARD;
        let pages = layout_sheet(&input(&categories, &gym), &FontContext::new()).unwrap();
        for page in &pages {
            for element in &page.elements {
                if let DrawCommand::Rect { .. } = element.draw {
                    assert!(element.y + element.height <= c.content_bottom() + 0.001);
                }
            }
        }
    }
}
