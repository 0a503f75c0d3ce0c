//! Order service providing the order lifecycle operations.

use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use common::{OrderId, OrderStatus, ProductId};
use store::{
    ChangeSet, OrderLineRecord, OrderQuery, OrderWrite, ProductRecord, StockWrite, Store, StoreExt,
};

use super::{
    InventoryLedger, ListOrders, Order, OrderDetail, OrderError, OrderSummary, OrderValidator,
    OrderViewProjector, PagedOrders, PlaceOrder, PriceCalculator,
};
use crate::config::OrderConfig;
use crate::error::DomainError;
use crate::identity::Principal;

/// Service for managing orders.
///
/// Every mutating operation reads what it needs, stages all changes in a
/// [`ChangeSet`], and commits it atomically. When the commit loses an
/// optimistic concurrency race the whole operation is re-run from a fresh
/// read, up to `max_commit_attempts` times.
pub struct OrderService<S: Store> {
    store: S,
    config: OrderConfig,
    pricing: PriceCalculator,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, OrderConfig::default())
    }

    pub fn with_config(store: S, config: OrderConfig) -> Self {
        let pricing = PriceCalculator::new(config.treat_missing_price_as_error);
        Self {
            store,
            config,
            pricing,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &OrderConfig {
        &self.config
    }

    /// Places a new `PENDING` order for `principal`, decrementing stock for
    /// every line at the same time.
    #[tracing::instrument(skip(self, request), fields(account = %principal.email))]
    pub async fn create_order(
        &self,
        principal: &Principal,
        request: PlaceOrder,
    ) -> Result<OrderSummary, DomainError> {
        let started = Instant::now();
        let request = &request;
        let result = self
            .with_retry("create_order", move || self.try_create_order(principal, request))
            .await;
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let summary = result?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %summary.order_id,
            total_cents = summary.total_amount_cents,
            lines = summary.items.len(),
            "order created"
        );
        Ok(summary)
    }

    async fn try_create_order(
        &self,
        principal: &Principal,
        request: &PlaceOrder,
    ) -> Result<OrderSummary, DomainError> {
        let validated = OrderValidator::validate(request)?;

        let mut ledger = InventoryLedger::new(&self.store);
        let ids: Vec<ProductId> = validated.lines.iter().map(|l| l.product_id).collect();
        ledger.preload(&ids).await?;

        let mut lines = Vec::with_capacity(validated.lines.len());
        for line in &validated.lines {
            let product = ledger.check_and_fetch(line.product_id, line.quantity).await?;
            let price = self.pricing.price(&product)?;
            ledger.decrement(line.product_id, line.quantity).await?;
            lines.push(OrderLineRecord {
                product_id: product.id,
                quantity: line.quantity,
                price_at_purchase: price,
                product_type: product.category_name,
            });
        }

        let order = Order::place(principal, validated.shipping_address, lines, Utc::now())?;
        let products = ledger.products();
        let write = OrderWrite::insert(order.into_record());
        let summary = OrderViewProjector::summary(&write.order, &products);

        self.store
            .commit(
                ChangeSet::new()
                    .with_stock(ledger.into_stock_changes())
                    .with_order(write),
            )
            .await?;

        Ok(summary)
    }

    /// Cancels an order on behalf of its role: administrators take the
    /// operator path, everyone else the self-service path.
    pub async fn cancel_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderSummary, DomainError> {
        if principal.is_privileged() {
            self.cancel_as_operator(principal, order_id).await
        } else {
            self.cancel_own_order(principal, order_id).await
        }
    }

    /// Self-service cancellation.
    ///
    /// Only the owner may cancel, and only while the order is `PENDING`.
    /// The status check runs before any already-cancelled short circuit, so
    /// cancelling an already cancelled order here is an invalid transition.
    #[tracing::instrument(skip(self), fields(account = %principal.email))]
    pub async fn cancel_own_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderSummary, DomainError> {
        self.with_retry("cancel_own_order", move || {
            self.try_cancel_own_order(principal, order_id)
        })
        .await
    }

    async fn try_cancel_own_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderSummary, DomainError> {
        let order = self.load_order(order_id).await?;
        if !order.is_owned_by(principal) {
            return Err(
                OrderError::forbidden(format!("order {order_id} belongs to another account"))
                    .into(),
            );
        }
        if order.status() != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: order.status(),
                to: OrderStatus::Cancelled,
            }
            .into());
        }
        self.commit_transition(principal, order, OrderStatus::Cancelled)
            .await
    }

    /// Operator cancellation from any non-terminal status.
    ///
    /// Cancelling an order that is already cancelled returns it unchanged
    /// without restocking again.
    #[tracing::instrument(skip(self), fields(account = %principal.email))]
    pub async fn cancel_as_operator(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderSummary, DomainError> {
        require_privileged(principal, "cancel orders as an operator")?;

        self.with_retry("cancel_as_operator", move || {
            self.try_cancel_as_operator(principal, order_id)
        })
        .await
    }

    async fn try_cancel_as_operator(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderSummary, DomainError> {
        let order = self.load_order(order_id).await?;
        if order.status() == OrderStatus::Cancelled {
            tracing::debug!(%order_id, "order already cancelled");
            let products = self.products_for([order.record()]).await?;
            return Ok(OrderViewProjector::summary(order.record(), &products));
        }
        self.commit_transition(principal, order, OrderStatus::Cancelled)
            .await
    }

    /// Moves an order to `status`. Administrators only.
    ///
    /// Moving to `CANCELLED` restocks every line.
    #[tracing::instrument(skip(self), fields(account = %principal.email))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: OrderId,
        status: &str,
    ) -> Result<OrderSummary, DomainError> {
        require_privileged(principal, "update order status")?;
        let to: OrderStatus = status
            .parse()
            .map_err(|e| OrderError::validation(format!("{e}")))?;

        self.with_retry("update_status", move || async move {
            let order = self.load_order(order_id).await?;
            self.commit_transition(principal, order, to).await
        })
        .await
    }

    /// Returns one order. Non-administrators may only see their own.
    #[tracing::instrument(skip(self), fields(account = %principal.email))]
    pub async fn get_order_detail(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<OrderDetail, DomainError> {
        let order = self.load_order(order_id).await?;
        if !principal.is_privileged() && !order.is_owned_by(principal) {
            return Err(
                OrderError::forbidden(format!("order {order_id} belongs to another account"))
                    .into(),
            );
        }

        let products = self.products_for([order.record()]).await?;
        Ok(OrderViewProjector::detail(order.record(), &products))
    }

    /// Lists orders newest first. Non-administrators only see their own.
    #[tracing::instrument(skip(self), fields(account = %principal.email))]
    pub async fn list_orders(
        &self,
        principal: &Principal,
        request: ListOrders,
    ) -> Result<PagedOrders, DomainError> {
        let mut query = self.build_query(&request)?;
        if !principal.is_privileged() {
            query = query.owner(principal.account_id);
        }
        self.run_query(query).await
    }

    /// Lists every account's orders. Administrators only.
    #[tracing::instrument(skip(self), fields(account = %principal.email))]
    pub async fn admin_list_orders(
        &self,
        principal: &Principal,
        request: ListOrders,
    ) -> Result<PagedOrders, DomainError> {
        require_privileged(principal, "list all orders")?;
        let query = self.build_query(&request)?;
        self.run_query(query).await
    }

    /// Applies `to` to `order`, restocking when it becomes cancelled, and
    /// commits the result.
    async fn commit_transition(
        &self,
        principal: &Principal,
        mut order: Order,
        to: OrderStatus,
    ) -> Result<OrderSummary, DomainError> {
        let from = order.status();
        order.transition_to(to, principal, Utc::now())?;

        let (stock, products) = if to == OrderStatus::Cancelled && from != OrderStatus::Cancelled {
            self.restock(&order).await?
        } else {
            (Vec::new(), self.products_for([order.record()]).await?)
        };

        let write = OrderWrite::update(order.into_record());
        let summary = OrderViewProjector::summary(&write.order, &products);
        self.store
            .commit(ChangeSet::new().with_stock(stock).with_order(write))
            .await?;

        if to == OrderStatus::Cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        metrics::counter!("order_status_updates_total", "status" => to.as_str()).increment(1);
        tracing::info!(order_id = %summary.order_id, %from, %to, "order status changed");

        Ok(summary)
    }

    /// Stages a restock of every line of `order`.
    async fn restock(
        &self,
        order: &Order,
    ) -> Result<(Vec<StockWrite>, HashMap<ProductId, ProductRecord>), DomainError> {
        let mut ledger = InventoryLedger::new(&self.store);
        ledger
            .preload(&OrderViewProjector::product_ids([order.record()]))
            .await?;
        for line in order.lines() {
            ledger.increment(line.product_id, line.quantity).await?;
        }
        let products = ledger.products();
        Ok((ledger.into_stock_changes(), products))
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.store
            .get_order(order_id)
            .await?
            .map(Order::from_record)
            .ok_or_else(|| OrderError::not_found("order", order_id).into())
    }

    async fn products_for<'a>(
        &self,
        orders: impl IntoIterator<Item = &'a store::OrderRecord>,
    ) -> Result<HashMap<ProductId, ProductRecord>, DomainError> {
        let ids = OrderViewProjector::product_ids(orders);
        Ok(self.store.get_product_map(&ids).await?)
    }

    fn build_query(&self, request: &ListOrders) -> Result<OrderQuery, DomainError> {
        let status = match request.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<OrderStatus>()
                    .map_err(|e| OrderError::validation(format!("{e}")))?,
            ),
        };

        let size = match request.size {
            None => self.config.default_page_size,
            Some(0) => return Err(OrderError::validation("page size must be positive").into()),
            Some(size) => size.min(self.config.max_page_size),
        };

        let page = request.page.unwrap_or(0);
        let offset_fits = page
            .checked_mul(size)
            .is_some_and(|offset| i64::try_from(offset).is_ok());
        if !offset_fits {
            return Err(OrderError::validation("page index out of range").into());
        }

        Ok(OrderQuery::page(page, size).status(status))
    }

    async fn run_query(&self, query: OrderQuery) -> Result<PagedOrders, DomainError> {
        let page = self.store.query_orders(query).await?;
        let products = self.products_for(&page.items).await?;
        Ok(OrderViewProjector::page(page, &products))
    }

    /// Runs `operation` until it succeeds, fails with anything other than
    /// a concurrency conflict, or runs out of attempts.
    async fn with_retry<T, F, Fut>(
        &self,
        name: &'static str,
        mut operation: F,
    ) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let max_attempts = self.config.max_commit_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Err(err) if err.is_conflict() => {
                    metrics::counter!("order_commit_conflicts_total", "operation" => name)
                        .increment(1);
                    if attempt >= max_attempts {
                        tracing::warn!(
                            operation = name,
                            attempt,
                            "giving up after commit conflicts"
                        );
                        return Err(err);
                    }
                    tracing::debug!(
                        operation = name,
                        attempt,
                        error = %err,
                        "commit conflict, retrying"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn require_privileged(principal: &Principal, action: &str) -> Result<(), OrderError> {
    if principal.is_privileged() {
        Ok(())
    } else {
        Err(OrderError::forbidden(format!(
            "only administrators may {action}"
        )))
    }
}
