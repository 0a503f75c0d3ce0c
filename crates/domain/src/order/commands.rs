//! Order requests as they arrive from callers.
//!
//! Fields are optional so that malformed requests reach the validator and
//! fail with a validation error instead of a deserialization error.

use common::ProductId;
use serde::{Deserialize, Serialize};

/// Request to place a new order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    #[serde(default)]
    pub shipping_address: Option<String>,

    #[serde(default)]
    pub items: Option<Vec<LineRequest>>,
}

impl PlaceOrder {
    /// Creates a request with an empty item list.
    pub fn new(shipping_address: impl Into<String>) -> Self {
        Self {
            shipping_address: Some(shipping_address.into()),
            items: Some(Vec::new()),
        }
    }

    /// Appends a line.
    pub fn line(mut self, product_id: ProductId, quantity: i64) -> Self {
        self.items.get_or_insert_with(Vec::new).push(LineRequest {
            product_id: Some(product_id),
            quantity: Some(quantity),
        });
        self
    }
}

/// One requested product line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    #[serde(default)]
    pub product_id: Option<ProductId>,

    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Request for one page of orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOrders {
    /// Status name; blank or absent means every status.
    #[serde(default)]
    pub status: Option<String>,

    /// Zero-based page index.
    #[serde(default)]
    pub page: Option<usize>,

    #[serde(default)]
    pub size: Option<usize>,
}

impl ListOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn page(mut self, page: usize, size: usize) -> Self {
        self.page = Some(page);
        self.size = Some(size);
        self
    }
}
