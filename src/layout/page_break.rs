//! # Space Allocation and Page Breaks
//!
//! After the measurement pass every grid section row knows its natural
//! height. This module decides how tall each section is actually drawn and
//! on which page:
//!
//! - [`allocate`] splits the surplus height of the starting page evenly
//!   between the grid and the Notes section, so a short curriculum still
//!   fills the page with blank rows to write in.
//! - [`paginate`] walks the section rows top to bottom, breaking to a new
//!   page whenever a section would cross the bottom margin, and recomputes
//!   the fill rows of a section that moved. A section taller than a whole
//!   page is split between items.
//! - [`decide_break`] is the general rule for a block made of unbreakable
//!   children, such as the lines of a Q&A block.

use std::ops::Range;

use tracing::debug;

use crate::layout::grid::SectionRow;
use crate::layout::{Cursor, LayoutConstants};
use crate::text::WIDTH_EPSILON;

/// What to do with a block that may not fit on the current page.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// The whole block fits here.
    Place,
    /// Move the whole block to the next page.
    MoveToNextPage,
    /// Place the first children here and continue on the next page.
    Split { items_on_current_page: usize },
}

/// Given the remaining space and the heights of a block's children, decide
/// how to break.
///
/// A block is split only when it is breakable and it would not fit on a
/// fresh page either. A split always places at least one child so a
/// caller looping on this makes progress.
pub fn decide_break(
    remaining_height: f64,
    page_height: f64,
    child_heights: &[f64],
    at_page_top: bool,
    is_breakable: bool,
) -> BreakDecision {
    let total: f64 = child_heights.iter().sum();
    if total <= remaining_height + WIDTH_EPSILON {
        return BreakDecision::Place;
    }

    let fits_fresh_page = total <= page_height + WIDTH_EPSILON;
    if !at_page_top && (fits_fresh_page || !is_breakable) {
        return BreakDecision::MoveToNextPage;
    }
    if !is_breakable {
        // Too tall for any page; it overflows wherever it goes.
        return BreakDecision::Place;
    }

    let mut running = 0.0;
    let mut fit_count = 0;
    for &h in child_heights {
        if running + h > remaining_height + WIDTH_EPSILON {
            break;
        }
        running += h;
        fit_count += 1;
    }

    if fit_count == 0 && !at_page_top {
        return BreakDecision::MoveToNextPage;
    }
    BreakDecision::Split {
        items_on_current_page: fit_count.max(1),
    }
}

/// Row counts decided before pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Natural rows plus extra fill rows, per section row.
    pub section_rows: Vec<usize>,
    pub notes_rows: usize,
}

/// Minimum height of the grid: every section at its natural rows, each
/// followed by the section gap.
pub fn grid_min_height(naturals: &[usize], constants: &LayoutConstants) -> f64 {
    naturals
        .iter()
        .map(|&rows| constants.section_height(rows) + constants.section_gap)
        .sum()
}

/// Split the surplus of `available` evenly between grid and Notes.
///
/// The grid's half is spread over the section rows, earliest rows first
/// when it does not divide evenly. With no sections the grid's half is
/// simply unused; Notes is sized to the page later anyway.
pub fn allocate(available: f64, naturals: &[usize], constants: &LayoutConstants) -> Allocation {
    let grid_min = grid_min_height(naturals, constants);
    let notes_min = constants.notes_min_height();
    let extra = (available - grid_min - notes_min).max(0.0);
    let half_rows = ((extra / 2.0) / constants.row_height + WIDTH_EPSILON).floor() as usize;

    let section_rows = if naturals.is_empty() {
        Vec::new()
    } else {
        let per_section = half_rows / naturals.len();
        let remainder = half_rows % naturals.len();
        naturals
            .iter()
            .enumerate()
            .map(|(i, &natural)| natural + per_section + usize::from(i < remainder))
            .collect()
    };

    let allocation = Allocation {
        section_rows,
        notes_rows: constants.notes_base_rows + half_rows,
    };
    debug!(
        available,
        grid_min,
        notes_min,
        extra,
        ?allocation,
        "allocated page height"
    );
    allocation
}

/// A section row (or a fragment of one) placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionPlacement {
    /// Index into the measured section rows.
    pub section: usize,
    pub page: usize,
    /// Top of the title bar.
    pub y: f64,
    /// Grid rows drawn below the title bar, filled or blank.
    pub rows: usize,
    /// Items drawn in this fragment, per column.
    pub items: Vec<Range<usize>>,
    /// A fragment after the first: title bars are marked as continued.
    pub continued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotesPlacement {
    pub page: usize,
    pub y: f64,
    pub rows: usize,
}

/// The result of pagination: where every section row and the Notes
/// section go.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub sections: Vec<SectionPlacement>,
    pub notes: NotesPlacement,
    /// After the Notes section.
    pub end: Cursor,
}

/// Lay out the grid sections and Notes starting at `start`.
pub fn paginate(
    sections: &[SectionRow<'_>],
    allocation: &Allocation,
    start: Cursor,
    constants: &LayoutConstants,
) -> GridLayout {
    let naturals: Vec<usize> = sections.iter().map(SectionRow::natural_rows).collect();
    let mut cursor = start;
    let mut placements = Vec::new();

    for (index, section) in sections.iter().enumerate() {
        let natural = naturals[index];
        let reserved = reserved_after(index, &naturals, allocation.notes_rows, constants);
        let mut rows = allocation.section_rows.get(index).copied().unwrap_or(natural);

        // A section taller than a fresh page splits where it is instead.
        let fits_fresh_page =
            constants.section_height(natural) <= constants.page_capacity() + WIDTH_EPSILON;
        if !cursor.fits(constants.section_height(rows), constants)
            && !cursor.at_page_top(constants)
            && fits_fresh_page
        {
            cursor = cursor.next_page(constants);
            rows = natural + fill_rows(cursor, natural, reserved, constants);
            debug!(section = index, page = cursor.page, rows, "section moved to next page");
        }

        if !cursor.fits(constants.section_height(rows), constants) {
            // Extra rows no longer fit; keep only what the page can take.
            rows = natural + fill_rows(cursor, natural, reserved, constants);
        }

        if cursor.fits(constants.section_height(rows), constants) {
            placements.push(SectionPlacement {
                section: index,
                page: cursor.page,
                y: cursor.y,
                rows,
                items: section.columns.iter().map(|c| 0..c.plans.len()).collect(),
                continued: false,
            });
            cursor = cursor.advance(constants.section_height(rows) + constants.section_gap);
        } else {
            cursor = split_section(index, section, reserved, cursor, constants, &mut placements);
        }
    }

    let (notes, end) = place_notes(cursor, allocation.notes_rows, constants);
    GridLayout {
        sections: placements,
        notes,
        end,
    }
}

/// Height kept free for every section after `index` at its natural rows
/// and for Notes at its allocated rows.
fn reserved_after(
    index: usize,
    naturals: &[usize],
    notes_rows: usize,
    constants: &LayoutConstants,
) -> f64 {
    grid_min_height(&naturals[index + 1..], constants) + constants.section_height(notes_rows)
}

/// Blank rows a section of `natural` rows at `cursor` can take on top of
/// its content while leaving `reserved` free.
fn fill_rows(cursor: Cursor, natural: usize, reserved: f64, constants: &LayoutConstants) -> usize {
    let spare = cursor.remaining(constants)
        - reserved
        - constants.section_height(natural)
        - constants.section_gap;
    if spare <= 0.0 {
        0
    } else {
        (spare / constants.row_height + WIDTH_EPSILON).floor() as usize
    }
}

/// Split a section row that does not fit on the current page between
/// items, column by column. Every fragment but the last runs to the
/// bottom of its page.
fn split_section(
    index: usize,
    section: &SectionRow<'_>,
    reserved: f64,
    mut cursor: Cursor,
    constants: &LayoutConstants,
    placements: &mut Vec<SectionPlacement>,
) -> Cursor {
    let mut starts = vec![0usize; section.columns.len()];
    let mut continued = false;

    loop {
        let remaining_natural = section
            .columns
            .iter()
            .zip(&starts)
            .map(|(column, &from)| column.rows_between(from, column.plans.len()))
            .max()
            .unwrap_or(0);

        if cursor.fits(constants.section_height(remaining_natural), constants) {
            let rows = remaining_natural + fill_rows(cursor, remaining_natural, reserved, constants);
            placements.push(SectionPlacement {
                section: index,
                page: cursor.page,
                y: cursor.y,
                rows,
                items: section
                    .columns
                    .iter()
                    .zip(&starts)
                    .map(|(column, &from)| from..column.plans.len())
                    .collect(),
                continued,
            });
            return cursor.advance(constants.section_height(rows) + constants.section_gap);
        }

        let room = cursor.remaining(constants) - constants.title_bar_height;
        let capacity = if room <= 0.0 {
            0
        } else {
            (room / constants.row_height + WIDTH_EPSILON).floor() as usize
        };
        if capacity == 0 && !cursor.at_page_top(constants) {
            cursor = cursor.next_page(constants);
            continue;
        }

        let at_top = cursor.at_page_top(constants);
        let mut ends = Vec::with_capacity(starts.len());
        let mut used = 0;
        for (column, &from) in section.columns.iter().zip(&starts) {
            let mut end = from;
            let mut rows = 0;
            for plan in &column.plans[from..] {
                if rows + plan.line_count() > capacity {
                    break;
                }
                rows += plan.line_count();
                end += 1;
            }
            // An item taller than a whole page still has to go somewhere.
            if end == from && at_top && from < column.plans.len() {
                rows = column.plans[from].line_count();
                end += 1;
            }
            used = used.max(rows);
            ends.push(end);
        }

        if ends == starts {
            cursor = cursor.next_page(constants);
            continue;
        }

        let rows = capacity.max(used);
        debug!(
            section = index,
            page = cursor.page,
            rows,
            "split section across pages"
        );
        placements.push(SectionPlacement {
            section: index,
            page: cursor.page,
            y: cursor.y,
            rows,
            items: starts.iter().zip(&ends).map(|(&s, &e)| s..e).collect(),
            continued,
        });

        starts = ends;
        continued = true;
        cursor = cursor.next_page(constants);
    }
}

/// Notes take every row left before the bottom margin, and at least their
/// allocated rows when those fit.
fn place_notes(
    cursor: Cursor,
    allocated: usize,
    constants: &LayoutConstants,
) -> (NotesPlacement, Cursor) {
    let mut cursor = cursor;
    if !cursor.fits(constants.section_height(allocated), constants)
        && !cursor.at_page_top(constants)
    {
        cursor = cursor.next_page(constants);
        debug!(page = cursor.page, "notes moved to next page");
    }
    let room = cursor.remaining(constants) - constants.title_bar_height;
    let rows = if room <= 0.0 {
        0
    } else {
        (room / constants.row_height + WIDTH_EPSILON).floor() as usize
    };
    let notes = NotesPlacement {
        page: cursor.page,
        y: cursor.y,
        rows,
    };
    (notes, cursor.advance(constants.section_height(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontContext;
    use crate::layout::grid::measure_sections;
    use crate::model::{Category, Item};

    const C: &LayoutConstants = &LayoutConstants::STANDARD;

    fn category(name: &str, items: usize) -> Category {
        Category {
            name: name.to_string(),
            items: (0..items)
                .map(|i| Item {
                    name: format!("Item {}", i),
                    show_title: true,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn sections(categories: &[Category]) -> Vec<SectionRow<'_>> {
        let refs: Vec<&Category> = categories.iter().collect();
        measure_sections(&refs, &FontContext::new(), C).unwrap()
    }

    #[test]
    fn test_everything_fits() {
        let decision = decide_break(100.0, 500.0, &[20.0, 30.0, 40.0], false, true);
        assert_eq!(decision, BreakDecision::Place);
    }

    #[test]
    fn test_block_that_fits_a_fresh_page_moves() {
        let decision = decide_break(50.0, 500.0, &[20.0, 30.0, 40.0], false, true);
        assert_eq!(decision, BreakDecision::MoveToNextPage);
    }

    #[test]
    fn test_block_taller_than_a_page_splits() {
        let decision = decide_break(55.0, 80.0, &[20.0, 30.0, 40.0], true, true);
        assert_eq!(
            decision,
            BreakDecision::Split {
                items_on_current_page: 2,
            }
        );
    }

    #[test]
    fn test_split_places_at_least_one_child() {
        let decision = decide_break(10.0, 10.0, &[20.0, 20.0], true, true);
        assert_eq!(
            decision,
            BreakDecision::Split {
                items_on_current_page: 1,
            }
        );
    }

    #[test]
    fn test_unbreakable_oversize_block_is_placed_at_top() {
        let decision = decide_break(100.0, 100.0, &[150.0], true, false);
        assert_eq!(decision, BreakDecision::Place);
    }

    #[test]
    fn test_allocate_splits_extra_evenly() {
        // 2 sections of 3 rows: grid min = 2 * (14 + 36 + 6) = 112,
        // notes min = 62, extra = 400 - 174 = 226, half = 113 -> 9 rows.
        let allocation = allocate(400.0, &[3, 3], C);
        assert_eq!(allocation.section_rows, vec![3 + 5, 3 + 4]);
        assert_eq!(allocation.notes_rows, 4 + 9);
    }

    #[test]
    fn test_allocate_without_surplus() {
        let allocation = allocate(100.0, &[10], C);
        assert_eq!(allocation.section_rows, vec![10]);
        assert_eq!(allocation.notes_rows, C.notes_base_rows);
    }

    #[test]
    fn test_single_page_fills_to_bottom() {
        let categories = vec![category("Kicks", 3), category("Blocks", 2)];
        let sections = sections(&categories);
        let start = Cursor { page: 0, y: 100.0 };
        let naturals: Vec<usize> = sections.iter().map(|s| s.natural_rows()).collect();
        let allocation = allocate(start.remaining(C), &naturals, C);
        let layout = paginate(&sections, &allocation, start, C);

        assert_eq!(layout.sections.len(), 1);
        let placement = &layout.sections[0];
        assert_eq!(placement.page, 0);
        assert!(placement.rows >= 3);
        assert_eq!(layout.notes.page, 0);
        assert!(layout.notes.rows >= C.notes_base_rows);
        assert!(layout.end.y <= C.content_bottom() + WIDTH_EPSILON);
        assert!(C.content_bottom() - layout.end.y < C.row_height);
    }

    #[test]
    fn test_section_moves_when_it_does_not_fit() {
        let categories = vec![category("Kicks", 20)];
        let sections = sections(&categories);
        let start = Cursor { page: 0, y: 400.0 };
        let allocation = allocate(start.remaining(C), &[20], C);
        let layout = paginate(&sections, &allocation, start, C);

        let placement = &layout.sections[0];
        assert_eq!(placement.page, 1);
        assert_eq!(placement.y, C.content_top());
        assert!(!placement.continued);
        assert!(placement.rows >= 20);
        // Notes still fit under it on the new page.
        assert_eq!(layout.notes.page, 1);
        assert!(layout.notes.rows >= C.notes_base_rows);
    }

    #[test]
    fn test_oversized_section_splits_without_dropping_items() {
        let categories = vec![category("Drills", 100), category("Forms", 10)];
        let sections = sections(&categories);
        let start = Cursor { page: 0, y: 100.0 };
        let allocation = allocate(start.remaining(C), &[100], C);
        let layout = paginate(&sections, &allocation, start, C);

        assert!(layout.sections.len() >= 3);
        assert!(!layout.sections[0].continued);
        assert!(layout.sections[1..].iter().all(|p| p.continued));

        let placed: usize = layout
            .sections
            .iter()
            .map(|p| p.items[0].end - p.items[0].start)
            .sum();
        assert_eq!(placed, 100);
        let forms: usize = layout
            .sections
            .iter()
            .map(|p| p.items[1].end - p.items[1].start)
            .sum();
        assert_eq!(forms, 10);

        for p in &layout.sections {
            assert!(p.y + C.section_height(p.rows) <= C.content_bottom() + WIDTH_EPSILON);
        }
        let rendered: usize = layout.sections.iter().map(|p| p.rows).sum();
        assert!(rendered >= 100);
    }

    #[test]
    fn test_notes_only_fill_the_page() {
        let start = Cursor { page: 0, y: 200.0 };
        let allocation = allocate(start.remaining(C), &[], C);
        let layout = paginate(&[], &allocation, start, C);
        assert!(layout.sections.is_empty());
        assert_eq!(layout.notes.page, 0);
        // (568 - 200 - 14) / 12 = 29.5
        assert_eq!(layout.notes.rows, 29);
    }

    #[test]
    fn test_notes_move_when_page_is_full() {
        let start = Cursor { page: 0, y: 540.0 };
        let allocation = allocate(start.remaining(C), &[], C);
        let layout = paginate(&[], &allocation, start, C);
        assert_eq!(layout.notes.page, 1);
        assert_eq!(layout.notes.y, C.content_top());
    }
}
