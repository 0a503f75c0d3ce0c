//! Persistence layer for the order backend.
//!
//! The [`Store`] trait exposes plain CRUD over products, accounts, and orders
//! plus one write primitive, [`Store::commit`], which applies a [`ChangeSet`]
//! atomically with per-record optimistic concurrency checks.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{AccountId, Money, OrderId, OrderStatus, ProductId, Role, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{OrderQuery, Page};
pub use record::{AccountRecord, OrderLineRecord, OrderRecord, ProductRecord};
pub use store::{ChangeSet, OrderWrite, StockWrite, Store, StoreExt};
