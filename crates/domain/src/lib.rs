//! Domain layer for the order backend.
//!
//! This crate provides the order lifecycle core:
//! - Structural validation of incoming orders
//! - Price snapshots taken at purchase time
//! - An inventory ledger that stages stock changes for atomic commit
//! - The status state machine and role-gated order service
//! - Projection of stored orders into list and detail views

pub mod config;
pub mod error;
pub mod identity;
pub mod order;

pub use config::OrderConfig;
pub use error::DomainError;
pub use identity::{Principal, PrincipalResolver};
pub use order::{
    InventoryLedger, LineRequest, ListOrders, Order, OrderDetail, OrderError, OrderLineDetail,
    OrderLineSummary, OrderService, OrderSummary, OrderValidator, OrderViewProjector, PageMeta,
    PagedOrders, PlaceOrder, PriceCalculator, ValidatedLine, ValidatedOrder,
};
