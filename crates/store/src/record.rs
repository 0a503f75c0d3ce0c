use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Money, OrderId, OrderStatus, ProductId, Role, Version};

/// Catalog product as seen by the order subsystem.
///
/// Only `quantity` (and the version bump that comes with it) is ever written
/// by order processing; everything else belongs to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    /// List price before any sale, in cents.
    #[serde(default)]
    pub base_price: Option<Money>,
    /// Either a fraction (`0.2`) or a percentage (`20`).
    #[serde(default)]
    pub sale_rate: Option<f64>,
    /// Available stock.
    pub quantity: u32,
    pub category_name: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub version: Version,
}

impl ProductRecord {
    /// Creates an unsaved product with a fresh id.
    pub fn new(
        name: impl Into<String>,
        base_price: Option<Money>,
        sale_rate: Option<f64>,
        quantity: u32,
        category_name: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            base_price,
            sale_rate,
            quantity,
            category_name: category_name.into(),
            image_urls: Vec::new(),
            version: Version::initial(),
        }
    }

    pub fn with_images(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.image_urls = urls.into_iter().map(Into::into).collect();
        self
    }
}

/// Customer or operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub email: String,
    pub role: Role,
}

impl AccountRecord {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            id: AccountId::new(),
            email: email.into(),
            role,
        }
    }
}

/// One product line of an order. Owned by its order and never stored alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Money,
    /// Category name of the product when the order was placed.
    pub product_type: String,
}

impl OrderLineRecord {
    /// `quantity × price_at_purchase`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.price_at_purchase.checked_mul(self.quantity)
    }
}

/// Persisted order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub owner: AccountId,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub lines: Vec<OrderLineRecord>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    pub version: Version,
}
