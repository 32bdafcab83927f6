// lib/src/query/pagination.rs

use models::views::Page;

use crate::config::QueryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Missing or zero values fall back to page 1 and the configured default
    /// size; the size is capped at the configured maximum.
    pub fn new(page: Option<usize>, limit: Option<usize>, config: &QueryConfig) -> Self {
        let limit = limit.filter(|l| *l > 0).unwrap_or(config.default_page_size).min(config.max_page_size);
        PageRequest { page: page.filter(|p| *p > 0).unwrap_or(1), limit: limit.max(1) }
    }
}

pub fn total_pages(total: usize, limit: usize) -> usize {
    total.div_ceil(limit.max(1)).max(1)
}

/// Cuts one page out of an already filtered and sorted list.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let start = (request.page - 1).saturating_mul(request.limit);
    let items: Vec<T> = items.into_iter().skip(start).take(request.limit).collect();
    Page {
        items,
        total,
        page: request.page,
        limit: request.limit,
        total_pages: total_pages(total, request.limit),
    }
}
