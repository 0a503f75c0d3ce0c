//! Order lifecycle: validation, pricing, inventory, state machine, and views.

mod aggregate;
mod commands;
mod inventory;
mod pricing;
mod service;
mod state;
mod validator;
mod view;

pub use aggregate::Order;
pub use commands::{LineRequest, ListOrders, PlaceOrder};
pub use inventory::InventoryLedger;
pub use pricing::PriceCalculator;
pub use service::OrderService;
pub use state::{can_transition, ensure_transition};
pub use validator::{OrderValidator, ValidatedLine, ValidatedOrder};
pub use view::{
    OrderDetail, OrderLineDetail, OrderLineSummary, OrderSummary, OrderViewProjector, PageMeta,
    PagedOrders,
};

use common::{OrderStatus, ProductId};
use thiserror::Error;

/// Business rule violations raised by order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The request is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced product or order does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Not enough stock to cover the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// No authenticated principal could be resolved.
    #[error("Authentication required")]
    Unauthenticated,

    /// The principal may not act on this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The status change violates the order state machine.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl OrderError {
    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        OrderError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        OrderError::Forbidden(message.into())
    }
}
