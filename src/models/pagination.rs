//! Page/limit pagination over in-memory collections.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page a client may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A validated page request (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

/// Pagination metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationInfo {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(u64::from(limit));

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of items plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

/// Slice an already filtered and sorted collection into the requested page.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let items: Vec<T> = items
        .into_iter()
        .skip(request.offset())
        .take(request.limit as usize)
        .collect();

    Page {
        items,
        pagination: PaginationInfo::new(request.page, request.limit, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_page_of_three() {
        let page = paginate(vec!["a", "b", "c"], PageRequest::new(2, 1));

        assert_eq!(page.items, vec!["b"]);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), PageRequest::new(3, 10));

        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(!page.pagination.has_next);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let page = paginate(vec![1, 2], PageRequest::new(5, 10));

        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total, 2);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[test]
    fn test_empty_collection() {
        let page = paginate(Vec::<u8>::new(), PageRequest::default());

        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_next);
        assert!(!page.pagination.has_prev);
    }

    #[test]
    fn test_page_request_clamps_zero() {
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 1));
    }
}
