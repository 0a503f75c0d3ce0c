//! Read-side views of orders.
//!
//! Line prices and the product type come from the order itself. Product
//! name, old price, and image are looked up from the current catalog record
//! when the view is built; a product that no longer exists renders them as
//! `None`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, ProductId};
use serde::{Deserialize, Serialize};
use store::{OrderLineRecord, OrderRecord, Page, ProductRecord};

/// One line of an [`OrderSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineSummary {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub product_type: String,
    pub quantity: u32,
    pub price_at_purchase_cents: i64,
}

/// Compact view returned by mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub shipping_address: String,
    pub total_amount_cents: i64,
    pub status: OrderStatus,
    pub items: Vec<OrderLineSummary>,
}

/// One line of an [`OrderDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineDetail {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub product_type: String,
    pub quantity: u32,
    pub price_at_purchase_cents: i64,
    /// Current list price of the product, before any sale.
    pub old_price_cents: Option<i64>,
    /// First image of the product.
    pub image_url: Option<String>,
}

/// Full view of one order including audit fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order_id: OrderId,
    pub shipping_address: String,
    pub total_amount_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub items: Vec<OrderLineDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: u64,
    pub total_count: u64,
}

/// A page of order details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedOrders {
    pub meta: PageMeta,
    pub items: Vec<OrderDetail>,
}

/// Builds views from stored orders and the current catalog.
pub struct OrderViewProjector;

impl OrderViewProjector {
    /// Ids of every product referenced by `orders`, without duplicates.
    pub fn product_ids<'a>(orders: impl IntoIterator<Item = &'a OrderRecord>) -> Vec<ProductId> {
        let mut ids = Vec::new();
        for line in orders.into_iter().flat_map(|order| order.lines.iter()) {
            if !ids.contains(&line.product_id) {
                ids.push(line.product_id);
            }
        }
        ids
    }

    pub fn summary(
        order: &OrderRecord,
        products: &HashMap<ProductId, ProductRecord>,
    ) -> OrderSummary {
        OrderSummary {
            order_id: order.id,
            shipping_address: order.shipping_address.clone(),
            total_amount_cents: order.total_amount.cents(),
            status: order.status,
            items: order
                .lines
                .iter()
                .map(|line| OrderLineSummary {
                    product_id: line.product_id,
                    product_name: products.get(&line.product_id).map(|p| p.name.clone()),
                    product_type: line.product_type.clone(),
                    quantity: line.quantity,
                    price_at_purchase_cents: line.price_at_purchase.cents(),
                })
                .collect(),
        }
    }

    pub fn detail(
        order: &OrderRecord,
        products: &HashMap<ProductId, ProductRecord>,
    ) -> OrderDetail {
        OrderDetail {
            order_id: order.id,
            shipping_address: order.shipping_address.clone(),
            total_amount_cents: order.total_amount.cents(),
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            created_by: order.created_by.clone(),
            updated_by: order.updated_by.clone(),
            items: order
                .lines
                .iter()
                .map(|line| Self::line_detail(line, products.get(&line.product_id)))
                .collect(),
        }
    }

    pub fn page(
        page: Page<OrderRecord>,
        products: &HashMap<ProductId, ProductRecord>,
    ) -> PagedOrders {
        let meta = PageMeta {
            page: page.page,
            page_size: page.size,
            total_pages: page.total_pages(),
            total_count: page.total_count,
        };
        PagedOrders {
            meta,
            items: page
                .items
                .iter()
                .map(|order| Self::detail(order, products))
                .collect(),
        }
    }

    fn line_detail(line: &OrderLineRecord, product: Option<&ProductRecord>) -> OrderLineDetail {
        OrderLineDetail {
            product_id: line.product_id,
            product_name: product.map(|p| p.name.clone()),
            product_type: line.product_type.clone(),
            quantity: line.quantity,
            price_at_purchase_cents: line.price_at_purchase.cents(),
            old_price_cents: product.and_then(|p| p.base_price).map(|m| m.cents()),
            image_url: product.and_then(|p| p.image_urls.first().cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{AccountId, Money, Version};

    use super::*;

    fn order(product_ids: &[ProductId]) -> OrderRecord {
        let lines: Vec<OrderLineRecord> = product_ids
            .iter()
            .map(|id| OrderLineRecord {
                product_id: *id,
                quantity: 2,
                price_at_purchase: Money::from_cents(8000),
                product_type: "Desks".to_string(),
            })
            .collect();
        OrderRecord {
            id: OrderId::new(),
            owner: AccountId::new(),
            shipping_address: "1 Main St".to_string(),
            status: OrderStatus::Pending,
            total_amount: Money::checked_sum(lines.iter().map(|l| l.line_total().unwrap()))
                .unwrap(),
            lines,
            created_at: Utc::now(),
            created_by: "buyer@example.com".to_string(),
            updated_at: None,
            updated_by: None,
            version: Version::first(),
        }
    }

    #[test]
    fn detail_uses_current_catalog_and_frozen_price() {
        let product = ProductRecord::new("Desk", Some(Money::from_units(120)), None, 3, "Furniture")
            .with_images(["a.png", "b.png"]);
        let order = order(&[product.id]);
        let products = HashMap::from([(product.id, product.clone())]);

        let detail = OrderViewProjector::detail(&order, &products);

        let line = &detail.items[0];
        assert_eq!(line.product_name.as_deref(), Some("Desk"));
        assert_eq!(line.product_type, "Desks");
        assert_eq!(line.price_at_purchase_cents, 8000);
        assert_eq!(line.old_price_cents, Some(12_000));
        assert_eq!(line.image_url.as_deref(), Some("a.png"));
        assert_eq!(detail.total_amount_cents, 16_000);
        assert_eq!(detail.created_by, "buyer@example.com");
    }

    #[test]
    fn vanished_product_renders_empty_fields() {
        let order = order(&[ProductId::new()]);

        let summary = OrderViewProjector::summary(&order, &HashMap::new());
        assert!(summary.items[0].product_name.is_none());

        let detail = OrderViewProjector::detail(&order, &HashMap::new());
        assert!(detail.items[0].old_price_cents.is_none());
        assert!(detail.items[0].image_url.is_none());
    }

    #[test]
    fn page_meta_counts_pages() {
        let page = Page {
            items: vec![order(&[ProductId::new()])],
            page: 1,
            size: 1,
            total_count: 3,
        };

        let paged = OrderViewProjector::page(page, &HashMap::new());

        assert_eq!(
            paged.meta,
            PageMeta {
                page: 1,
                page_size: 1,
                total_pages: 3,
                total_count: 3
            }
        );
        assert_eq!(paged.items.len(), 1);
    }

    #[test]
    fn product_ids_are_deduplicated() {
        let shared = ProductId::new();
        let a = order(&[shared, ProductId::new()]);
        let b = order(&[shared]);

        assert_eq!(OrderViewProjector::product_ids([&a, &b]).len(), 2);
    }

    #[test]
    fn summary_serializes_snake_case() {
        let json = serde_json::to_value(OrderViewProjector::summary(
            &order(&[ProductId::new()]),
            &HashMap::new(),
        ))
        .unwrap();

        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["total_amount_cents"], 16_000);
        assert!(json["items"][0]["price_at_purchase_cents"].is_number());
    }
}
