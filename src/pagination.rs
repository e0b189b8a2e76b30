use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Pagination {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.page_size()
    }
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

/// List response envelope: `{ "data": [...], "meta": { ... } }`.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination, total: i64) -> Self {
        Self {
            data,
            meta: PageMeta {
                page: pagination.page(),
                page_size: pagination.page_size(),
                total,
            },
        }
    }
}

/// Builds an ORDER BY clause from a `sort` query parameter. A leading `-`
/// requests descending order. The field must appear in `allowed`; sort keys
/// are interpolated into SQL, so everything else is refused.
pub fn order_by(sort: Option<&str>, allowed: &[&str], default: &str) -> Result<String> {
    let Some(raw) = sort.filter(|s| !s.is_empty()) else {
        return Ok(default.to_string());
    };

    let (field, direction) = match raw.strip_prefix('-') {
        Some(field) => (field, "DESC"),
        None => (raw, "ASC"),
    };

    if allowed.contains(&field) {
        Ok(format!("{field} {direction}"))
    } else {
        Err(Error::Validation(format!("cannot sort by {field}")))
    }
}
