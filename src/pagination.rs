use serde::Serialize;

use crate::config::AppConfig;
use crate::validation::non_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Parses raw `page`/`limit` strings. Unparsable values fall back to the
    /// defaults; the result is clamped to `page >= 1` and `1 <= limit <= max_page_size`.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, config: &AppConfig) -> Self {
        let page = non_blank(page)
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(1);
        let limit = non_blank(limit)
            .and_then(|l| l.parse::<i64>().ok())
            .unwrap_or(config.default_page_size);

        Self {
            page: page.max(1),
            limit: limit.clamp(1, config.max_page_size.max(1)),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

pub fn total_pages(total_items: i64, limit: i64) -> i64 {
    if total_items <= 0 || limit <= 0 {
        return 0;
    }
    (total_items + limit - 1) / limit
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: i64) -> Self {
        Self {
            items,
            current_page: request.page,
            total_pages: total_pages(total_items, request.limit),
            total_items,
        }
    }
}
