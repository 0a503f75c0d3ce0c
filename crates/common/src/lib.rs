//! Shared vocabulary for the order backend.
//!
//! Identifiers, optimistic-concurrency versions, money, and the small enums
//! (order status, account role) that both the persistence layer and the
//! domain layer speak.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, ParseEnumError, Role};
pub use types::{AccountId, OrderId, ProductId, Version};
