//! # Q&A Section
//!
//! Knowledge categories are not drawn as grid cells but as a full-width
//! title bar followed by one block per item: an optional bold title, the
//! rich description line by line, and a "Link" anchor when the item has a
//! video.
//!
//! Blocks are kept whole when they fit on a page. A title bar never ends a
//! page on its own: it moves along with the start of its first block.

use std::ops::Range;

use tracing::debug;

use crate::error::SheetError;
use crate::font::FontSpec;
use crate::layout::item::LINK_LABEL;
use crate::layout::page_break::{decide_break, BreakDecision};
use crate::layout::sheet::{centered_baseline, draw_title_bar};
use crate::layout::{Border, Canvas, Cursor, DrawCommand, LayoutConstants};
use crate::model::{Category, CategoryKind};
use crate::style::{Color, Theme};
use crate::text::rich;
use crate::text::TextMeasure;

/// One drawn line of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct QaLine {
    pub text: String,
    pub font: FontSpec,
    /// Set on the link line.
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QaBlock {
    pub lines: Vec<QaLine>,
}

/// A knowledge category with its blocks measured.
#[derive(Debug, Clone)]
pub struct QaSection<'a> {
    pub category: &'a Category,
    pub blocks: Vec<QaBlock>,
}

/// Where a bar or (part of) a block goes.
#[derive(Debug, Clone, PartialEq)]
pub enum QaPlacement {
    Bar {
        section: usize,
        page: usize,
        y: f64,
        continued: bool,
    },
    Block {
        section: usize,
        block: usize,
        page: usize,
        y: f64,
        lines: Range<usize>,
    },
}

/// Measure every knowledge category, in input order.
pub fn measure_qa<'a>(
    categories: &'a [Category],
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<Vec<QaSection<'a>>, SheetError> {
    let inner = constants.content_width() - 2.0 * constants.qa_padding;
    let title_font = FontSpec::bold(constants.qa_title_size);
    let text_font = FontSpec::regular(constants.qa_text_size);

    let mut sections = Vec::new();
    for category in categories
        .iter()
        .filter(|c| c.kind() == Some(CategoryKind::Knowledge))
    {
        let mut blocks = Vec::with_capacity(category.items.len());
        for item in &category.items {
            let mut lines = Vec::new();
            let title = item.name.trim();
            if item.show_title && !title.is_empty() {
                for text in measure.wrap(title, inner, title_font)? {
                    lines.push(QaLine {
                        text,
                        font: title_font,
                        href: None,
                    });
                }
            }
            if let Some(description) = item.description() {
                let flat = rich::flatten(description);
                for line in flat.physical_lines(measure, inner, text_font)? {
                    lines.push(QaLine {
                        text: line.text,
                        font: text_font.with_bold(line.bold),
                        href: None,
                    });
                }
            }
            if let Some(url) = item.video_url() {
                lines.push(QaLine {
                    text: LINK_LABEL.to_string(),
                    font: text_font,
                    href: Some(url.to_string()),
                });
            }
            if lines.is_empty() {
                lines.push(QaLine {
                    text: String::new(),
                    font: text_font,
                    href: None,
                });
            }
            blocks.push(QaBlock { lines });
        }
        sections.push(QaSection { category, blocks });
    }
    Ok(sections)
}

fn block_height(lines: usize, constants: &LayoutConstants) -> f64 {
    2.0 * constants.qa_padding + lines as f64 * constants.qa_line_height
}

/// Assign bars and blocks to pages, starting at `start`. Returns the cursor
/// after the last section, gap included.
pub fn paginate_qa(
    sections: &[QaSection<'_>],
    start: Cursor,
    constants: &LayoutConstants,
) -> (Vec<QaPlacement>, Cursor) {
    let bar = constants.title_bar_height;
    let pad = 2.0 * constants.qa_padding;
    let line = constants.qa_line_height;
    // Room for block lines on a fresh page below a title bar.
    let fresh = constants.page_capacity() - bar - pad;

    let mut placements = Vec::new();
    let mut cursor = start;

    for (index, section) in sections.iter().enumerate() {
        let first = section.blocks.first().map_or(0, |b| b.lines.len());
        let first_height = block_height(first, constants);
        let needed = if first_height - pad <= fresh {
            bar + first_height
        } else {
            bar + pad + line
        };
        if !cursor.fits(needed, constants) && !cursor.at_page_top(constants) {
            cursor = cursor.next_page(constants);
        }
        placements.push(QaPlacement::Bar {
            section: index,
            page: cursor.page,
            y: cursor.y,
            continued: false,
        });
        cursor = cursor.advance(bar);

        for (block_index, block) in section.blocks.iter().enumerate() {
            let heights = vec![line; block.lines.len()];
            let mut from = 0;
            while from < heights.len() {
                let decision = decide_break(
                    cursor.remaining(constants) - pad,
                    fresh,
                    &heights[from..],
                    cursor.at_page_top(constants),
                    true,
                );
                let take = match decision {
                    BreakDecision::Place => heights.len() - from,
                    BreakDecision::Split {
                        items_on_current_page,
                    } => items_on_current_page,
                    BreakDecision::MoveToNextPage => 0,
                };
                if take > 0 {
                    placements.push(QaPlacement::Block {
                        section: index,
                        block: block_index,
                        page: cursor.page,
                        y: cursor.y,
                        lines: from..from + take,
                    });
                    cursor = cursor.advance(block_height(take, constants));
                    from += take;
                }
                if from < heights.len() || decision == BreakDecision::MoveToNextPage {
                    cursor = cursor.next_page(constants);
                    debug!(
                        category = %section.category.name,
                        page = cursor.page,
                        "Q&A continues on next page"
                    );
                    placements.push(QaPlacement::Bar {
                        section: index,
                        page: cursor.page,
                        y: cursor.y,
                        continued: true,
                    });
                    cursor = cursor.advance(bar);
                }
            }
        }
        cursor = cursor.advance(constants.section_gap);
    }

    (placements, cursor)
}

/// Draw the placed bars and blocks.
pub fn render_qa(
    sections: &[QaSection<'_>],
    placements: &[QaPlacement],
    canvas: &mut Canvas<'_>,
    theme: &Theme,
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<(), SheetError> {
    let left = constants.content_left();
    let width = constants.content_width();
    let border = Some(Border {
        color: Color::BORDER,
        width: constants.border_width,
    });

    for placement in placements {
        match placement {
            QaPlacement::Bar {
                section,
                page,
                y,
                continued,
            } => {
                let category = sections[*section].category;
                draw_title_bar(
                    canvas,
                    *page,
                    (left, *y, width),
                    category,
                    *continued,
                    theme,
                    measure,
                    constants,
                )?;
            }
            QaPlacement::Block {
                section,
                block,
                page,
                y,
                lines,
            } => {
                let block_lines = &sections[*section].blocks[*block].lines[lines.clone()];
                canvas.rect(
                    *page,
                    (left, *y, width, block_height(block_lines.len(), constants)),
                    Some(theme.row_fill(*block)),
                    border,
                );
                let x = left + constants.qa_padding;
                for (i, line) in block_lines.iter().enumerate() {
                    if line.text.is_empty() {
                        continue;
                    }
                    let top = *y + constants.qa_padding + i as f64 * constants.qa_line_height;
                    let baseline = centered_baseline(top, constants.qa_line_height, line.font.size);
                    let advance = measure.text_width(&line.text, line.font)?;
                    let draw = match &line.href {
                        Some(href) => DrawCommand::Text {
                            text: line.text.clone(),
                            font: line.font,
                            color: Color::LINK,
                            underline: true,
                            href: Some(href.clone()),
                        },
                        None => DrawCommand::text(line.text.clone(), line.font, Color::BLACK),
                    };
                    canvas.text(*page, x, baseline, advance, draw);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::model::{Item, ItemKind};

    const C: &LayoutConstants = &LayoutConstants::STANDARD;

    fn knowledge(name: &str, description: Option<&str>, url: Option<&str>) -> Item {
        Item {
            name: name.to_string(),
            kind: ItemKind::Knowledge,
            show_title: true,
            description: description.map(str::to_string),
            video_url: url.map(str::to_string),
            ..Default::default()
        }
    }

    fn terms(items: Vec<Item>) -> Category {
        Category {
            name: "Terminology".to_string(),
            items,
            ..Default::default()
        }
    }

    #[test]
    fn test_block_lines() {
        let categories = vec![terms(vec![
            knowledge("Dojo", Some("The **training hall**\nBow when entering"), None),
            knowledge("Kiai", None, Some("https://example.com/kiai")),
        ])];
        let sections = measure_qa(&categories, &FontContext::new(), C).unwrap();
        assert_eq!(sections.len(), 1);

        let first = &sections[0].blocks[0].lines;
        assert_eq!(first.len(), 3);
        assert!(first[0].font.is_bold());
        assert!(first[1].font.is_bold());
        assert!(!first[2].font.is_bold());

        let second = &sections[0].blocks[1].lines;
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].text, "Link");
        assert_eq!(second[1].href.as_deref(), Some("https://example.com/kiai"));
    }

    #[test]
    fn test_hidden_title_and_empty_item() {
        let mut hidden = knowledge("Secret", Some("Only the answer"), None);
        hidden.show_title = false;
        let categories = vec![terms(vec![hidden, knowledge("", None, None)])];
        let sections = measure_qa(&categories, &FontContext::new(), C).unwrap();
        assert_eq!(sections[0].blocks[0].lines.len(), 1);
        assert_eq!(sections[0].blocks[0].lines[0].text, "Only the answer");
        assert_eq!(sections[0].blocks[1].lines.len(), 1);
    }

    #[test]
    fn test_table_categories_are_skipped() {
        let mut kicks = terms(vec![knowledge("Front kick", None, None)]);
        kicks.items[0].kind = ItemKind::Skill;
        let categories = vec![kicks];
        let sections = measure_qa(&categories, &FontContext::new(), C).unwrap();
        assert!(sections.is_empty());
    }

    #[test]
    fn test_bar_moves_with_first_block() {
        let categories = vec![terms(vec![knowledge("Dojo", Some("a\nb\nc"), None)])];
        let sections = measure_qa(&categories, &FontContext::new(), C).unwrap();
        // Room for the bar but not for the block under it.
        let start = Cursor {
            page: 0,
            y: C.content_bottom() - 30.0,
        };
        let (placements, _) = paginate_qa(&sections, start, C);
        match &placements[0] {
            QaPlacement::Bar { page, continued, .. } => {
                assert_eq!(*page, 1);
                assert!(!continued);
            }
            other => panic!("unexpected placement {:?}", other),
        }
    }

    #[test]
    fn test_block_moves_whole_and_bar_repeats() {
        let items = (0..12)
            .map(|i| knowledge(&format!("Term {}", i), Some("one\ntwo\nthree"), None))
            .collect();
        let categories = vec![terms(items)];
        let sections = measure_qa(&categories, &FontContext::new(), C).unwrap();
        let start = Cursor { page: 0, y: 300.0 };
        let (placements, end) = paginate_qa(&sections, start, C);

        let blocks: Vec<&QaPlacement> = placements
            .iter()
            .filter(|p| matches!(p, QaPlacement::Block { .. }))
            .collect();
        assert_eq!(blocks.len(), 12);
        for p in &blocks {
            if let QaPlacement::Block { lines, y, .. } = p {
                assert_eq!(lines.len(), 4);
                assert!(*y + block_height(4, C) <= C.content_bottom() + 0.001);
            }
        }
        assert!(placements
            .iter()
            .any(|p| matches!(p, QaPlacement::Bar { page: 1, continued: true, .. })));
        assert_eq!(end.page, 1);
    }

    #[test]
    fn test_oversized_block_splits_by_line() {
        let description = vec!["line"; 80].join("\n");
        let categories = vec![terms(vec![knowledge("Creed", Some(&description), None)])];
        let sections = measure_qa(&categories, &FontContext::new(), C).unwrap();
        let (placements, _) = paginate_qa(&sections, Cursor::start(C), C);

        let placed: usize = placements
            .iter()
            .filter_map(|p| match p {
                QaPlacement::Block { lines, .. } => Some(lines.len()),
                _ => None,
            })
            .sum();
        assert_eq!(placed, 81);
    }
}
