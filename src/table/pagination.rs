//! Pagination stage
//!
//! Slices the sorted rows into fixed-size windows. Page indices are clamped,
//! never rejected.

/// Current page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 10;

impl PaginationState {
    pub fn new(page_index: usize, page_size: usize) -> Self {
        Self {
            page_index,
            page_size: page_size.max(1),
        }
    }

    /// Move `page_index` into range for `total_rows`
    pub fn clamp_to(&mut self, total_rows: usize) {
        let pages = page_count(total_rows, self.page_size);
        self.page_index = clamp_page_index(self.page_index, pages);
    }
}

/// A window of rows plus how many pages exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    pub page_index: usize,
    pub page_count: usize,
}

/// `max(1, ceil(total / page_size))`
pub fn page_count(total_rows: usize, page_size: usize) -> usize {
    total_rows.div_ceil(page_size.max(1)).max(1)
}

pub fn clamp_page_index(page_index: usize, page_count: usize) -> usize {
    page_index.min(page_count.saturating_sub(1))
}

/// Half-open row range covered by a page, after clamping
pub fn page_bounds(total_rows: usize, state: &PaginationState) -> (usize, usize, usize) {
    let size = state.page_size.max(1);
    let pages = page_count(total_rows, size);
    let index = clamp_page_index(state.page_index, pages);
    let start = (index * size).min(total_rows);
    let end = (start + size).min(total_rows);
    (start, end, index)
}

/// Cut the page described by `state` out of `rows`
pub fn paginate<'a, T>(rows: &'a [T], state: &PaginationState) -> Page<'a, T> {
    let (start, end, page_index) = page_bounds(rows.len(), state);
    Page {
        rows: &rows[start..end],
        page_index,
        page_count: page_count(rows.len(), state.page_size),
    }
}
