//! Order aggregate.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderStatus, Version};
use store::{OrderLineRecord, OrderRecord};

use super::{OrderError, state::ensure_transition};
use crate::identity::Principal;

/// An order together with the rules for changing it.
///
/// Wraps the stored record; identity, owner, address, lines, and total are
/// fixed once placed. Only the status and update audit fields ever change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    record: OrderRecord,
}

impl Order {
    /// Places a new `PENDING` order owned by `owner`.
    ///
    /// The total is the sum of line totals at their snapshotted prices; a
    /// total that does not fit in cents is rejected.
    pub fn place(
        owner: &Principal,
        shipping_address: String,
        lines: Vec<OrderLineRecord>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let total_amount = lines
            .iter()
            .map(OrderLineRecord::line_total)
            .collect::<Option<Vec<_>>>()
            .and_then(Money::checked_sum)
            .ok_or_else(|| OrderError::validation("order total out of range"))?;
        Ok(Self {
            record: OrderRecord {
                id: OrderId::new(),
                owner: owner.account_id,
                shipping_address,
                status: OrderStatus::Pending,
                total_amount,
                lines,
                created_at: now,
                created_by: owner.email.clone(),
                updated_at: None,
                updated_by: None,
                version: Version::initial(),
            },
        })
    }

    pub fn from_record(record: OrderRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &OrderRecord {
        &self.record
    }

    pub fn into_record(self) -> OrderRecord {
        self.record
    }

    pub fn status(&self) -> OrderStatus {
        self.record.status
    }

    pub fn total_amount(&self) -> Money {
        self.record.total_amount
    }

    pub fn lines(&self) -> &[OrderLineRecord] {
        &self.record.lines
    }

    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.record.owner == principal.account_id
    }

    /// Moves the order to `to`, stamping the update audit fields.
    pub fn transition_to(
        &mut self,
        to: OrderStatus,
        actor: &Principal,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        ensure_transition(self.record.status, to)?;
        self.record.status = to;
        self.record.updated_at = Some(now);
        self.record.updated_by = Some(actor.email.clone());
        Ok(())
    }
}
