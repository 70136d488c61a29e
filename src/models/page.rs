//! Pagination types shared by every listing endpoint.
//!
//! Clients send `?page=0&size=20` query parameters which deserialize into
//! `PageRequest`. Stores return a `Page<T>` carrying the rows for the
//! requested window plus the total row count.

use serde::{Deserialize, Serialize};

/// Default number of rows per page when `size` is omitted.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page window requested by a client.
///
/// # Query Example
///
/// ```text
/// GET /api/v1/cards/my?page=2&size=50
/// ```
///
/// Pages are zero-based. `size` is clamped into `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,

    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Page size after clamping.
    pub fn limit(&self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Number of rows to skip (SQL `OFFSET`).
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit())
    }
}

/// One page of results.
///
/// # JSON Example
///
/// ```json
/// {
///   "content": [ ... ],
///   "page": 0,
///   "size": 20,
///   "total_elements": 42,
///   "total_pages": 3
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let size = request.limit();
        let total_pages = if total_elements <= 0 {
            0
        } else {
            (total_elements + i64::from(size) - 1) / i64::from(size)
        };

        Self {
            content,
            page: request.page,
            size,
            total_elements,
            total_pages,
        }
    }

    /// Convert every row, keeping the paging metadata.
    ///
    /// Used by handlers to turn `Page<Card>` into `Page<CardResponse>`.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
