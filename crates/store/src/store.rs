use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::{
    AccountRecord, OrderId, OrderQuery, OrderRecord, Page, ProductId, ProductRecord, Result,
    StoreError, Version,
};

/// Compare-and-swap write of a product's stock level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWrite {
    pub product_id: ProductId,
    /// Version the product had when its stock was read.
    pub expected_version: Version,
    /// New absolute stock level.
    pub quantity: u32,
}

/// Insert or update of one order.
///
/// `order.version` must be `expected_version.next()`. An `expected_version`
/// of [`Version::initial`] means the order must not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWrite {
    pub order: OrderRecord,
    pub expected_version: Version,
}

impl OrderWrite {
    /// Write for a brand-new order.
    pub fn insert(mut order: OrderRecord) -> Self {
        order.version = Version::first();
        Self {
            order,
            expected_version: Version::initial(),
        }
    }

    /// Write for an existing order whose version was read as `order.version`.
    pub fn update(mut order: OrderRecord) -> Self {
        let expected_version = order.version;
        order.version = expected_version.next();
        Self {
            order,
            expected_version,
        }
    }

    pub fn is_insert(&self) -> bool {
        self.expected_version == Version::initial()
    }
}

/// Everything one business operation wants to persist.
///
/// Applied all-or-nothing by [`Store::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub stock: Vec<StockWrite>,
    pub order: Option<OrderWrite>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(mut self, stock: Vec<StockWrite>) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_order(mut self, order: OrderWrite) -> Self {
        self.order = Some(order);
        self
    }
}

/// Core trait for store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name, used by health reporting.
    fn backend(&self) -> &'static str;

    /// Loads one product.
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>>;

    /// Loads several products. Unknown ids are silently skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<ProductRecord>>;

    /// Creates or replaces a catalog product, bumping its version.
    ///
    /// Returns the stored record.
    async fn save_product(&self, product: ProductRecord) -> Result<ProductRecord>;

    /// Looks an account up by login email.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>>;

    /// Creates or replaces an account.
    async fn save_account(&self, account: AccountRecord) -> Result<()>;

    /// Number of accounts in the directory.
    async fn count_accounts(&self) -> Result<u64>;

    /// Loads one order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Runs a filtered, paginated order query, newest first.
    async fn query_orders(&self, query: OrderQuery) -> Result<Page<OrderRecord>>;

    /// Applies a change set atomically.
    ///
    /// Fails with `ConcurrencyConflict` if any product or the order is not
    /// at its expected version; in that case nothing is written.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Loads several products keyed by id.
    async fn get_product_map(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductRecord>> {
        let products = self.get_products(ids).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }
}

impl<T: Store + ?Sized> StoreExt for T {}

/// Validates a change set before any storage is touched.
pub fn validate_change_set(changes: &ChangeSet) -> Result<()> {
    let mut seen = HashSet::new();
    for write in &changes.stock {
        if !seen.insert(write.product_id) {
            return Err(StoreError::InvalidChangeSet(format!(
                "product {} appears more than once",
                write.product_id
            )));
        }
    }

    if let Some(write) = &changes.order {
        if write.order.version != write.expected_version.next() {
            return Err(StoreError::InvalidChangeSet(format!(
                "order {} must advance from version {} to {}, got {}",
                write.order.id,
                write.expected_version,
                write.expected_version.next(),
                write.order.version
            )));
        }
        if write.order.lines.is_empty() {
            return Err(StoreError::InvalidChangeSet(format!(
                "order {} has no lines",
                write.order.id
            )));
        }
    }

    Ok(())
}
