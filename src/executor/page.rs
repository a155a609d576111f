//! Fixed-size pagination with index clamping.

use std::ops::Range;

use serde::Serialize;

/// Rows per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Position of a page within a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageState {
    /// 0-based page index, clamped into range.
    pub index: usize,
    pub size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
}

impl PageState {
    /// Clamp `requested` into `[0, max(0, total_pages - 1)]`.
    pub fn new(requested: usize, size: usize, total_rows: usize) -> Self {
        let size = size.max(1);
        let total_pages = total_rows.div_ceil(size);
        let index = requested.min(total_pages.saturating_sub(1));
        Self {
            index,
            size,
            total_rows,
            total_pages,
        }
    }

    /// Row range of this page within the full result.
    pub fn range(&self) -> Range<usize> {
        let start = (self.index * self.size).min(self.total_rows);
        let end = (start + self.size).min(self.total_rows);
        start..end
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }
}

/// Cut one page out of `rows`.
pub fn paginate<T>(mut rows: Vec<T>, requested: usize, size: usize) -> (Vec<T>, PageState) {
    let state = PageState::new(requested, size, rows.len());
    let range = state.range();
    rows.truncate(range.end);
    let page = rows.split_off(range.start);
    (page, state)
}
