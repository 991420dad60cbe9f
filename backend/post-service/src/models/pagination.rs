use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Raw `?page=&limit=` query parameters
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl PaginationParams {
    pub fn resolve(&self) -> Result<Pagination> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Pagination { page, limit })
    }
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total number of matching items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let has_more = pagination.offset() + (items.len() as i64) < total;
        Self {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total,
            has_more,
        }
    }
}

/// Slice an in-memory, already ordered collection the way `LIMIT/OFFSET` would
pub fn window<T: Clone>(items: &[T], limit: i64, offset: i64) -> Vec<T> {
    let start = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let take = usize::try_from(limit.max(0)).unwrap_or(0);
    items.iter().skip(start).take(take).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PaginationParams::default().resolve().unwrap();
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let p = PaginationParams {
            page: Some(3),
            limit: Some(20),
        }
        .resolve()
        .unwrap();
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_rejects_out_of_range() {
        for (page, limit) in [(0, 10), (-1, 10), (1, 0), (1, 51)] {
            let params = PaginationParams {
                page: Some(page),
                limit: Some(limit),
            };
            assert!(params.resolve().is_err(), "page={} limit={}", page, limit);
        }
    }

    #[test]
    fn test_has_more() {
        let p = Pagination { page: 1, limit: 2 };
        assert!(Page::new(vec![1, 2], p, 3).has_more);
        assert!(!Page::new(vec![1, 2], p, 2).has_more);

        let last = Pagination { page: 2, limit: 2 };
        assert!(!Page::new(vec![3], last, 3).has_more);
    }

    #[test]
    fn test_window() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(window(&items, 2, 0), vec![1, 2]);
        assert_eq!(window(&items, 2, 4), vec![5]);
        assert!(window(&items, 2, 10).is_empty());
    }
}
