use serde::Serialize;

use crate::{AccountId, OrderStatus};

/// Filtered, paginated order query.
///
/// Results are always sorted by creation time, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// Restrict to orders placed by this account.
    pub owner: Option<AccountId>,

    /// Restrict to orders currently in this status.
    pub status: Option<OrderStatus>,

    /// Zero-based page index.
    pub page: usize,

    /// Page size; always at least 1.
    pub size: usize,
}

impl OrderQuery {
    /// Creates a query for the given page with no filters.
    pub fn page(page: usize, size: usize) -> Self {
        Self {
            owner: None,
            status: None,
            page,
            size: size.max(1),
        }
    }

    /// Filters by owning account.
    pub fn owner(mut self, owner: AccountId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Filters by status, if one is given.
    pub fn status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of results plus the information needed to build page metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.size.max(1) as u64)
    }
}
