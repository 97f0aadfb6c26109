//! Tabular result shaping: sort, filter, paginate.
//!
//! The fixed order of operations matters and matches the result viewer's
//! behavior: stable sort first, then the case-insensitive substring filter
//! across the displayed columns, then the page slice. Row order without an
//! active sort column is the server/query order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::types::Row;

/// Rows shown per page in the result viewer.
pub const PAGE_SIZE: usize = 10;

/// Maximum visible page-number buttons in the pager.
pub const PAGE_WINDOW: usize = 5;

/// Sort direction for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Client-side view state for one result table, carried through HTMX
/// round-trip query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    /// Case-insensitive substring filter; empty matches all rows.
    #[serde(default)]
    pub filter: String,
    /// Active sort column; `None` keeps server order.
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: SortDirection,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort: None,
            dir: SortDirection::Asc,
            page: 1,
        }
    }
}

impl TableQuery {
    /// Apply a new filter text. Changing the filter always resets to page 1.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self.page = 1;
        self
    }

    /// Sort by `column`: toggles direction when it is already the active
    /// column, otherwise starts ascending on the new column.
    #[must_use]
    pub fn toggled(mut self, column: &str) -> Self {
        if self.sort.as_deref() == Some(column) {
            self.dir = self.dir.flipped();
        } else {
            self.sort = Some(column.to_string());
            self.dir = SortDirection::Asc;
        }
        self
    }
}

/// One processed page of a result table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a> {
    /// The rows of the current page, in display order.
    pub visible_rows: Vec<&'a Row>,
    /// Row count after filtering (before pagination).
    pub filtered_count: usize,
    /// Always at least 1, even for an empty filtered set.
    pub total_pages: usize,
    /// The effective 1-based page, clamped into range.
    pub page: usize,
}

impl TableView<'_> {
    /// 1-based index of the first visible record, for the
    /// "showing start–end of N" summary. Zero when nothing matched.
    #[must_use]
    pub fn start_index(&self) -> usize {
        if self.filtered_count == 0 {
            0
        } else {
            (self.page - 1) * PAGE_SIZE + 1
        }
    }

    /// 1-based index of the last visible record.
    #[must_use]
    pub fn end_index(&self) -> usize {
        (self.start_index() + self.visible_rows.len()).saturating_sub(1)
    }
}

/// Sort, filter and paginate `rows` for display.
#[must_use]
pub fn process<'a>(rows: &'a [Row], columns: &[String], query: &TableQuery) -> TableView<'a> {
    let mut ordered: Vec<&Row> = rows.iter().collect();

    if let Some(sort_column) = &query.sort {
        ordered.sort_by(|a, b| {
            let ord = compare_cells(cell(a, sort_column), cell(b, sort_column));
            match query.dir {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    let filter = query.filter.to_lowercase();
    let filtered: Vec<&Row> = if filter.is_empty() {
        ordered
    } else {
        ordered
            .into_iter()
            .filter(|row| {
                columns
                    .iter()
                    .any(|col| display_value(cell(row, col)).to_lowercase().contains(&filter))
            })
            .collect()
    };

    let filtered_count = filtered.len();
    let total_pages = filtered_count.div_ceil(PAGE_SIZE).max(1);
    let page = query.page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let visible_rows: Vec<&Row> = filtered
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();

    TableView {
        visible_rows,
        filtered_count,
        total_pages,
        page,
    }
}

/// Page numbers to render: up to [`PAGE_WINDOW`] buttons centered on the
/// current page, clipped to `1..=total_pages`.
#[must_use]
pub fn page_numbers(total_pages: usize, current: usize) -> Vec<usize> {
    if total_pages <= PAGE_WINDOW {
        return (1..=total_pages).collect();
    }
    let start = current.saturating_sub(PAGE_WINDOW / 2).max(1);
    let end = (start + PAGE_WINDOW - 1).min(total_pages);
    (start..=end).collect()
}

/// String form of a cell for filtering and display. Nulls and missing
/// columns render as the empty string.
#[must_use]
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn cell<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    row.get(column)
}

/// Native ordering: numeric when both operands are numeric, lexicographic
/// on the string form otherwise.
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    if let (Some(na), Some(nb)) = (
        a.and_then(Value::as_f64),
        b.and_then(Value::as_f64),
    ) {
        return na.total_cmp(&nb);
    }
    display_value(a).cmp(&display_value(b))
}
