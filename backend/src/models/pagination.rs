use serde::{Deserialize, Serialize};

const MAX_PER_PAGE: u32 = 100;
const DEFAULT_PER_PAGE: u32 = 20;

/// Page parameters as they arrive on the query string; both are optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    /// Page is clamped to at least 1, per page to 1..=100.
    pub fn normalize(&self) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PageParams::default().normalize();
        assert_eq!(p, Pagination { page: 1, per_page: 20 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        let p = PageParams { page: Some(0), per_page: Some(1000) }.normalize();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, 100);

        let p = PageParams { page: Some(3), per_page: Some(0) }.normalize();
        assert_eq!(p.per_page, 1);
        assert_eq!(p.offset(), 2);
    }
}
