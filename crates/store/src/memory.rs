use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AccountRecord, OrderId, OrderQuery, OrderRecord, Page, ProductId, ProductRecord, Result,
    StoreError, Version,
    store::{ChangeSet, Store, validate_change_set},
};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, ProductRecord>,
    accounts: HashMap<String, AccountRecord>,
    orders: HashMap<OrderId, OrderRecord>,
}

/// In-memory store for tests and single-process deployments.
///
/// Every commit runs under one write lock, so change sets are applied
/// serially and atomically.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.accounts.clear();
        state.orders.clear();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<ProductRecord>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn save_product(&self, mut product: ProductRecord) -> Result<ProductRecord> {
        let mut state = self.state.write().await;
        product.version = state
            .products
            .get(&product.id)
            .map(|existing| existing.version.next())
            .unwrap_or(Version::first());
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>> {
        Ok(self.state.read().await.accounts.get(email).cloned())
    }

    async fn save_account(&self, account: AccountRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state.accounts.insert(account.email.clone(), account);
        Ok(())
    }

    async fn count_accounts(&self) -> Result<u64> {
        Ok(self.state.read().await.accounts.len() as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Page<OrderRecord>> {
        let state = self.state.read().await;
        let mut matching: Vec<&OrderRecord> = state
            .orders
            .values()
            .filter(|o| query.owner.is_none_or(|owner| o.owner == owner))
            .filter(|o| query.status.is_none_or(|status| o.status == status))
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total_count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset())
            .take(query.size)
            .cloned()
            .collect();

        Ok(Page {
            items,
            page: query.page,
            size: query.size,
            total_count,
        })
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        validate_change_set(&changes)?;

        let mut state = self.state.write().await;

        // Check every precondition before mutating anything.
        for write in &changes.stock {
            let product =
                state
                    .products
                    .get(&write.product_id)
                    .ok_or_else(|| StoreError::MissingRecord {
                        entity: "product",
                        id: write.product_id.to_string(),
                    })?;
            if product.version != write.expected_version {
                return Err(StoreError::ConcurrencyConflict {
                    entity: "product",
                    id: write.product_id.to_string(),
                    expected: write.expected_version,
                    actual: product.version,
                });
            }
        }

        if let Some(write) = &changes.order {
            let actual = state
                .orders
                .get(&write.order.id)
                .map(|o| o.version)
                .unwrap_or(Version::initial());
            if actual != write.expected_version {
                return Err(StoreError::ConcurrencyConflict {
                    entity: "order",
                    id: write.order.id.to_string(),
                    expected: write.expected_version,
                    actual,
                });
            }
        }

        for write in changes.stock {
            if let Some(product) = state.products.get_mut(&write.product_id) {
                product.quantity = write.quantity;
                product.version = write.expected_version.next();
            }
        }

        if let Some(write) = changes.order {
            state.orders.insert(write.order.id, write.order);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        AccountId, Money, OrderLineRecord, OrderStatus, Role,
        store::{OrderWrite, StockWrite},
    };

    fn order_for(owner: AccountId, product_id: ProductId, age_secs: i64) -> OrderRecord {
        OrderRecord {
            id: OrderId::new(),
            owner,
            shipping_address: "1 Main St".to_string(),
            status: OrderStatus::Pending,
            total_amount: Money::from_cents(500),
            lines: vec![OrderLineRecord {
                product_id,
                quantity: 1,
                price_at_purchase: Money::from_cents(500),
                product_type: "Lamps".to_string(),
            }],
            created_at: Utc::now() - Duration::seconds(age_secs),
            created_by: "user@example.com".to_string(),
            updated_at: None,
            updated_by: None,
            version: Version::initial(),
        }
    }

    async fn seeded_product(store: &InMemoryStore, quantity: u32) -> ProductRecord {
        store
            .save_product(ProductRecord::new(
                "Lamp",
                Some(Money::from_units(5)),
                None,
                quantity,
                "Lamps",
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn save_product_bumps_version() {
        let store = InMemoryStore::new();
        let product = seeded_product(&store, 3).await;
        assert_eq!(product.version, Version::first());

        let again = store.save_product(product).await.unwrap();
        assert_eq!(again.version, Version::new(2));
    }

    #[tokio::test]
    async fn commit_applies_stock_and_order_together() {
        let store = InMemoryStore::new();
        let product = seeded_product(&store, 3).await;
        let order = order_for(AccountId::new(), product.id, 0);
        let order_id = order.id;

        let changes = ChangeSet::new()
            .with_stock(vec![StockWrite {
                product_id: product.id,
                expected_version: product.version,
                quantity: 2,
            }])
            .with_order(OrderWrite::insert(order));
        store.commit(changes).await.unwrap();

        let stored = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 2);
        assert_eq!(stored.version, Version::new(2));

        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.version, Version::first());
    }

    #[tokio::test]
    async fn stale_product_version_rejects_whole_change_set() {
        let store = InMemoryStore::new();
        let product = seeded_product(&store, 3).await;
        let order = order_for(AccountId::new(), product.id, 0);

        let changes = ChangeSet::new()
            .with_stock(vec![StockWrite {
                product_id: product.id,
                expected_version: Version::initial(),
                quantity: 0,
            }])
            .with_order(OrderWrite::insert(order));

        let err = store.commit(changes).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.order_count().await, 0);
        assert_eq!(
            store.get_product(product.id).await.unwrap().unwrap().quantity,
            3
        );
    }

    #[tokio::test]
    async fn inserting_an_existing_order_conflicts() {
        let store = InMemoryStore::new();
        let product = seeded_product(&store, 3).await;
        let order = order_for(AccountId::new(), product.id, 0);

        store
            .commit(ChangeSet::new().with_order(OrderWrite::insert(order.clone())))
            .await
            .unwrap();
        let err = store
            .commit(ChangeSet::new().with_order(OrderWrite::insert(order)))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn stock_write_for_unknown_product_fails() {
        let store = InMemoryStore::new();
        let changes = ChangeSet::new().with_stock(vec![StockWrite {
            product_id: ProductId::new(),
            expected_version: Version::first(),
            quantity: 1,
        }]);
        assert!(matches!(
            store.commit(changes).await,
            Err(StoreError::MissingRecord { .. })
        ));
    }

    #[tokio::test]
    async fn query_filters_sorts_and_paginates() {
        let store = InMemoryStore::new();
        let product = seeded_product(&store, 10).await;
        let alice = AccountId::new();
        let bob = AccountId::new();

        for age in [30, 10, 20] {
            store
                .commit(
                    ChangeSet::new().with_order(OrderWrite::insert(order_for(
                        alice, product.id, age,
                    ))),
                )
                .await
                .unwrap();
        }
        store
            .commit(ChangeSet::new().with_order(OrderWrite::insert(order_for(bob, product.id, 0))))
            .await
            .unwrap();

        let page = store
            .query_orders(OrderQuery::page(0, 2).owner(alice))
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].created_at > page.items[1].created_at);

        let second = store
            .query_orders(OrderQuery::page(1, 2).owner(alice))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);

        let cancelled = store
            .query_orders(OrderQuery::page(0, 10).status(Some(OrderStatus::Cancelled)))
            .await
            .unwrap();
        assert_eq!(cancelled.total_count, 0);
    }

    #[tokio::test]
    async fn accounts_are_found_by_email() {
        let store = InMemoryStore::new();
        let account = AccountRecord::new("admin@example.com", Role::Admin);
        store.save_account(account.clone()).await.unwrap();

        assert_eq!(store.count_accounts().await.unwrap(), 1);
        assert_eq!(
            store.find_account_by_email("admin@example.com").await.unwrap(),
            Some(account)
        );
        assert!(
            store
                .find_account_by_email("nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }
}
