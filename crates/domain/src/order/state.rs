//! Order status transition rules.
//!
//! The forward track is checked by ordinal only, so any forward jump
//! (PENDING to SHIPPED, say) is accepted. `CANCELLED` is reachable from
//! every non-terminal status.

use common::OrderStatus;

use super::OrderError;

/// Returns true if an order may move from `from` to `to`.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    if to == OrderStatus::Cancelled {
        return true;
    }
    match (from.ordinal(), to.ordinal()) {
        (Some(old), Some(new)) => new > old,
        _ => false,
    }
}

/// Fails with [`OrderError::InvalidTransition`] unless `from -> to` is allowed.
pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}
