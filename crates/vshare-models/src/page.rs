//! Offset-based pagination.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated page request. Non-positive inputs are clamped rather than
/// rejected; oversized pages are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build from raw query values, clamping out-of-range input.
    pub fn clamped(page: i64, page_size: i64) -> Self {
        let page = if page < 1 { 1 } else { page.min(u32::MAX as i64) as u32 };
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            (page_size as u64).min(MAX_PAGE_SIZE as u64) as u32
        };
        Self { page, page_size }
    }

    /// Number of records to skip: `(page - 1) * page_size`.
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// One page of results plus the pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    /// Page size (the client-facing field is named `limit`).
    #[serde(rename = "limit")]
    pub page_size: u32,
    pub total: u64,
    /// Total page count: `ceil(total / page_size)`.
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            pages: total.div_ceil(request.page_size as u64),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_math() {
        let req = PageRequest::clamped(2, 12);
        assert_eq!(req.offset(), 12);
        assert_eq!(req.limit(), 12);
    }

    #[test]
    fn test_non_positive_values_clamped() {
        let req = PageRequest::clamped(0, -3);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_oversized_page_capped() {
        let req = PageRequest::clamped(1, 5000);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_count_is_ceiling() {
        // 15 matching videos, page size 12: page 1 carries 12, page 2 the
        // remaining 3, and the envelope reports 2 pages.
        let page_one = Page::new(vec![0u8; 12], PageRequest::clamped(1, 12), 15);
        assert_eq!(page_one.pages, 2);
        assert_eq!(page_one.items.len(), 12);

        let page_two = Page::new(vec![0u8; 3], PageRequest::clamped(2, 12), 15);
        assert_eq!(page_two.items.len(), 3);
        assert_eq!(page_two.pages, 2);
    }

    #[test]
    fn test_exact_division_pages() {
        let page = Page::new(Vec::<u8>::new(), PageRequest::clamped(1, 12), 24);
        assert_eq!(page.pages, 2);
    }
}
