//! Startup seeding of accounts and catalog products.

use std::path::Path;

use common::Role;
use serde::Deserialize;
use store::{AccountRecord, ProductRecord, Store, StoreError};
use thiserror::Error;

/// Accounts created when the directory is empty.
pub const DEFAULT_ACCOUNTS: [(&str, Role); 2] = [
    ("admin@example.com", Role::Admin),
    ("user@example.com", Role::User),
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to write seed data: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedAccount {
    pub email: String,
    pub role: Role,
}

/// Contents of a seed file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

impl SeedData {
    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// What seeding actually wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub accounts: usize,
    pub products: usize,
}

/// Seeds the default accounts into an empty directory, then any accounts
/// and products from `data` that do not exist yet.
pub async fn seed_store<S: Store>(
    store: &S,
    data: Option<SeedData>,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    if store.count_accounts().await? == 0 {
        for (email, role) in DEFAULT_ACCOUNTS {
            store.save_account(AccountRecord::new(email, role)).await?;
            report.accounts += 1;
        }
    }

    let data = data.unwrap_or_default();
    for account in data.accounts {
        if store.find_account_by_email(&account.email).await?.is_none() {
            store
                .save_account(AccountRecord::new(account.email, account.role))
                .await?;
            report.accounts += 1;
        }
    }
    for product in data.products {
        if store.get_product(product.id).await?.is_none() {
            store.save_product(product).await?;
            report.products += 1;
        }
    }

    tracing::info!(
        accounts = report.accounts,
        products = report.products,
        "seeded store"
    );
    Ok(report)
}
