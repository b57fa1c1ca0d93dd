//! 1-based page slicing with exact totals.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::constants::pagination::MIN_PAGE;

/// One page of an ordered result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Rows on this page, in result order.
    pub rows: Vec<T>,
    /// Length of the full filtered and ordered result before slicing.
    pub total_count: usize,
    /// 1-based page index actually served (after clamping).
    pub page_index: usize,
    /// Page size actually served (after clamping).
    pub page_size: usize,
}

impl<T> Page<T> {
    /// An empty first page.
    pub fn empty(page_size: usize) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            page_index: MIN_PAGE,
            page_size: page_size.max(MIN_PAGE),
        }
    }

    /// Number of pages needed for `total_count` (at least 1).
    pub fn page_count(&self) -> usize {
        page_count(self.total_count, self.page_size)
    }

    /// Returns `true` when a later page has rows.
    pub fn has_next(&self) -> bool {
        self.page_index < self.page_count()
    }

    /// Returns `true` when this is not the first page.
    pub fn has_previous(&self) -> bool {
        self.page_index > MIN_PAGE
    }

    /// Transform the rows, keeping the paging metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            rows: self.rows.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }
}

/// Number of pages for `total` rows at `page_size` per page (at least 1).
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(MIN_PAGE)).max(MIN_PAGE)
}

/// Slice bounds for a page, clamped to `len`.
///
/// `page_index` and `page_size` below 1 are treated as 1.
pub fn page_bounds(len: usize, page_index: usize, page_size: usize) -> Range<usize> {
    let page_index = page_index.max(MIN_PAGE);
    let page_size = page_size.max(MIN_PAGE);
    let start = (page_index - 1).saturating_mul(page_size).min(len);
    let end = start.saturating_add(page_size).min(len);
    start..end
}

/// Clone one page out of an ordered slice.
pub fn paginate<T: Clone>(rows: &[T], page_index: usize, page_size: usize) -> Page<T> {
    let bounds = page_bounds(rows.len(), page_index, page_size);
    Page {
        rows: rows[bounds].to_vec(),
        total_count: rows.len(),
        page_index: page_index.max(MIN_PAGE),
        page_size: page_size.max(MIN_PAGE),
    }
}

/// Move one page out of an owned ordered sequence.
pub fn paginate_owned<T>(rows: Vec<T>, page_index: usize, page_size: usize) -> Page<T> {
    let total_count = rows.len();
    let bounds = page_bounds(total_count, page_index, page_size);
    Page {
        rows: rows
            .into_iter()
            .skip(bounds.start)
            .take(bounds.len())
            .collect(),
        total_count,
        page_index: page_index.max(MIN_PAGE),
        page_size: page_size.max(MIN_PAGE),
    }
}
