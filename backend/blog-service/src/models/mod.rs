/// Data models for blog-service
///
/// Row types (`sqlx::FromRow`) mirror the tables in `migrations/`; the
/// response types are what handlers serialize.
pub mod about;
pub mod analytics;
pub mod comment;
pub mod post;
pub mod taxonomy;
pub mod user;

pub use about::*;
pub use analytics::*;
pub use comment::*;
pub use post::*;
pub use taxonomy::*;
pub use user::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Limit clamped to `[1, MAX_PAGE_SIZE]`
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, offset: i64) -> Self {
        let has_more = offset + (items.len() as i64) < total_count;
        Self {
            items,
            total_count,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_limit() {
        let p = Pagination {
            limit: Some(500),
            offset: Some(-3),
        };
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);

        let p = Pagination {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(p.limit(), 1);
        assert_eq!(Pagination::default().limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn page_has_more() {
        let page = Page::new(vec![1, 2], 5, 0);
        assert!(page.has_more);
        let page = Page::new(vec![5], 5, 4);
        assert!(!page.has_more);
        let page: Page<i32> = Page::new(vec![], 0, 0);
        assert!(!page.has_more);
    }
}
