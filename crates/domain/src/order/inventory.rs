//! Inventory ledger.
//!
//! Stock changes are staged in a working set and only reach the store as
//! compare-and-swap writes inside the enclosing order commit. A failure
//! anywhere before the commit therefore leaves stock untouched.

use std::collections::HashMap;

use common::{ProductId, Version};
use store::{ProductRecord, StockWrite, Store, StoreExt};

use super::OrderError;
use crate::error::DomainError;

#[derive(Debug)]
struct Entry {
    product: ProductRecord,
    read_version: Version,
    read_quantity: u32,
}

/// Working set of product stock for one operation.
///
/// Quantities are cumulative, so two lines for the same product are checked
/// against the stock left after the first.
pub struct InventoryLedger<'a, S: Store + ?Sized> {
    store: &'a S,
    entries: HashMap<ProductId, Entry>,
    touched: Vec<ProductId>,
}

impl<'a, S: Store + ?Sized> InventoryLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            entries: HashMap::new(),
            touched: Vec::new(),
        }
    }

    /// Loads several products in one round trip. Unknown ids are ignored
    /// here and reported when they are first used.
    pub async fn preload(&mut self, ids: &[ProductId]) -> Result<(), DomainError> {
        let missing: Vec<ProductId> = ids
            .iter()
            .copied()
            .filter(|id| !self.entries.contains_key(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        for (id, product) in self.store.get_product_map(&missing).await? {
            self.insert(id, product);
        }
        Ok(())
    }

    /// Returns the product if it has at least `quantity` in working stock.
    ///
    /// Fails with `NotFound` for an unknown product and `InsufficientStock`
    /// when the working quantity is too low. Does not change stock.
    pub async fn check_and_fetch(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<ProductRecord, DomainError> {
        let entry = self.entry(product_id).await?;
        if entry.product.quantity < quantity {
            return Err(OrderError::InsufficientStock {
                product_id,
                requested: quantity,
                available: entry.product.quantity,
            }
            .into());
        }
        Ok(entry.product.clone())
    }

    /// Reduces working stock by `quantity`.
    pub async fn decrement(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), DomainError> {
        let entry = self.entry(product_id).await?;
        entry.product.quantity = entry.product.quantity.checked_sub(quantity).ok_or(
            OrderError::InsufficientStock {
                product_id,
                requested: quantity,
                available: entry.product.quantity,
            },
        )?;
        self.touch(product_id);
        Ok(())
    }

    /// Restores working stock by `quantity`. There is no upper bound.
    pub async fn increment(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), DomainError> {
        let entry = self.entry(product_id).await?;
        entry.product.quantity = entry
            .product
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| {
                OrderError::validation(format!("stock of product {product_id} would overflow"))
            })?;
        self.touch(product_id);
        Ok(())
    }

    /// Current working view of every loaded product.
    pub fn products(&self) -> HashMap<ProductId, ProductRecord> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.product.clone()))
            .collect()
    }

    /// Stock writes for every product whose quantity changed, in the order
    /// they were first touched.
    pub fn into_stock_changes(mut self) -> Vec<StockWrite> {
        let touched = std::mem::take(&mut self.touched);
        touched
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .filter(|entry| entry.product.quantity != entry.read_quantity)
            .map(|entry| StockWrite {
                product_id: entry.product.id,
                expected_version: entry.read_version,
                quantity: entry.product.quantity,
            })
            .collect()
    }

    fn insert(&mut self, id: ProductId, product: ProductRecord) {
        self.entries.insert(
            id,
            Entry {
                read_version: product.version,
                read_quantity: product.quantity,
                product,
            },
        );
    }

    fn touch(&mut self, product_id: ProductId) {
        if !self.touched.contains(&product_id) {
            self.touched.push(product_id);
        }
    }

    async fn entry(&mut self, product_id: ProductId) -> Result<&mut Entry, DomainError> {
        if !self.entries.contains_key(&product_id) {
            let product = self
                .store
                .get_product(product_id)
                .await?
                .ok_or_else(|| OrderError::not_found("product", product_id))?;
            self.insert(product_id, product);
        }
        self.entries
            .get_mut(&product_id)
            .ok_or_else(|| OrderError::not_found("product", product_id).into())
    }
}
