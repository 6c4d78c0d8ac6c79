//! # Grid Partitioning
//!
//! Table categories are laid out side by side in section rows of at most
//! three columns. Rows are filled as evenly as possible: seven categories
//! become rows of 3, 2 and 2, never 3, 3 and 1.
//!
//! This module also runs the measurement pass for the grid. Every item is
//! planned at the width of the column it lands in, and a section row's
//! natural height is its tallest column.

use tracing::{debug, warn};

use crate::error::SheetError;
use crate::layout::item::{self, ItemPlan};
use crate::layout::LayoutConstants;
use crate::model::{Category, CategoryKind};
use crate::text::TextMeasure;

/// Column counts for `count` categories, one entry per section row.
///
/// Every entry is between 1 and `max_columns`, and entries never increase
/// from one row to the next.
pub fn partition(count: usize, max_columns: usize) -> Vec<usize> {
    if count == 0 || max_columns == 0 {
        return Vec::new();
    }
    let rows = count.div_ceil(max_columns);
    let mut remaining = count;
    let mut out = Vec::with_capacity(rows);
    for row in 0..rows {
        let columns = remaining.div_ceil(rows - row);
        out.push(columns);
        remaining -= columns;
    }
    out
}

/// Width of one column when a row has `columns` columns.
pub fn column_width(columns: usize, constants: &LayoutConstants) -> f64 {
    let columns = columns.max(1) as f64;
    (constants.content_width() - (columns - 1.0) * constants.column_gap) / columns
}

/// Non-empty table categories in input order, capped at the grid maximum.
pub fn table_categories<'a>(
    categories: &'a [Category],
    constants: &LayoutConstants,
) -> Vec<&'a Category> {
    let tables: Vec<&Category> = categories
        .iter()
        .filter(|c| c.kind() == Some(CategoryKind::Table))
        .collect();
    if tables.len() > constants.max_table_categories {
        let dropped: Vec<&str> = tables[constants.max_table_categories..]
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        warn!(
            limit = constants.max_table_categories,
            ?dropped,
            "too many table categories, dropping the rest"
        );
        return tables[..constants.max_table_categories].to_vec();
    }
    tables
}

/// One category's items, planned at its column width.
#[derive(Debug, Clone)]
pub struct ColumnMeasure<'a> {
    pub category: &'a Category,
    pub plans: Vec<ItemPlan>,
}

impl ColumnMeasure<'_> {
    pub fn rows(&self) -> usize {
        self.plans.iter().map(ItemPlan::line_count).sum()
    }

    /// Rows used by items `from..to`.
    pub fn rows_between(&self, from: usize, to: usize) -> usize {
        self.plans[from..to].iter().map(ItemPlan::line_count).sum()
    }
}

/// A measured section row: categories side by side.
#[derive(Debug, Clone)]
pub struct SectionRow<'a> {
    pub column_width: f64,
    pub columns: Vec<ColumnMeasure<'a>>,
}

impl SectionRow<'_> {
    /// Grid rows needed to show every item: the tallest column.
    pub fn natural_rows(&self) -> usize {
        self.columns.iter().map(ColumnMeasure::rows).max().unwrap_or(0)
    }
}

/// The measurement pass: group categories into section rows and plan
/// every item.
pub fn measure_sections<'a>(
    categories: &[&'a Category],
    measure: &dyn TextMeasure,
    constants: &LayoutConstants,
) -> Result<Vec<SectionRow<'a>>, SheetError> {
    let mut sections = Vec::new();
    let mut rest = categories;
    for columns in partition(categories.len(), constants.max_columns) {
        let (row, tail) = rest.split_at(columns);
        rest = tail;
        let width = column_width(columns, constants);
        let mut measured = Vec::with_capacity(columns);
        for &category in row {
            let plans = category
                .items
                .iter()
                .map(|it| item::plan(it, width, measure, constants))
                .collect::<Result<Vec<_>, _>>()?;
            measured.push(ColumnMeasure {
                category,
                plans,
            });
        }
        let section = SectionRow {
            column_width: width,
            columns: measured,
        };
        debug!(
            columns,
            natural_rows = section.natural_rows(),
            "measured section row"
        );
        sections.push(section);
    }
    Ok(sections)
}
