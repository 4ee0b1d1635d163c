//! Page requests and pagination envelopes.

use crate::error::{CrudError, CrudResult};
use crate::record::Record;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// A 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Use `page` and `limit` as given; `paginate` rejects values below 1.
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    /// Build from raw query-string values the way the HTTP handlers do:
    /// unparseable or missing page becomes 1 and is at least 1, unparseable or
    /// missing limit becomes 10 and is clamped to `1..=100`.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<i64>().ok()).filter(|n| *n != 0);
        let page = parse(page).unwrap_or(DEFAULT_PAGE).max(1);
        let limit = parse(limit).unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    /// Row offset of the first row on this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub(crate) fn validate(&self) -> CrudResult<()> {
        if self.page < 1 || self.limit < 1 {
            return Err(CrudError::validation(format!(
                "page and limit must be at least 1 (page={}, limit={})",
                self.page, self.limit
            )));
        }
        Ok(())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

/// Pagination metadata returned alongside a page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let PageRequest { page, limit } = request;
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of camelCase records plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub rows: Vec<Record>,
    pub pagination: Pagination,
}
