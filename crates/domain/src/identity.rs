//! Authenticated principals.
//!
//! Session handling lives outside this crate. The request boundary hands us
//! the subject's login email and [`PrincipalResolver`] turns it into a
//! [`Principal`] once per request; every service operation then receives the
//! principal explicitly.

use common::{AccountId, Role};
use serde::Serialize;
use store::{AccountRecord, Store};

use crate::error::DomainError;
use crate::order::OrderError;

/// The account on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub account_id: AccountId,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(account_id: AccountId, email: impl Into<String>, role: Role) -> Self {
        Self {
            account_id,
            email: email.into(),
            role,
        }
    }

    /// Administrators see and manage every order.
    pub fn is_privileged(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<AccountRecord> for Principal {
    fn from(account: AccountRecord) -> Self {
        Self {
            account_id: account.id,
            email: account.email,
            role: account.role,
        }
    }
}

/// Resolves an authenticated subject against the account directory.
#[derive(Clone)]
pub struct PrincipalResolver<S: Store> {
    store: S,
}

impl<S: Store> PrincipalResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Looks up the account for `subject`.
    ///
    /// A missing or blank subject, or one with no account, fails with
    /// [`OrderError::Unauthenticated`].
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, subject: Option<&str>) -> Result<Principal, DomainError> {
        let email = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(OrderError::Unauthenticated)?;

        match self.store.find_account_by_email(email).await? {
            Some(account) => Ok(account.into()),
            None => {
                tracing::debug!(%email, "no account for subject");
                Err(OrderError::Unauthenticated.into())
            }
        }
    }
}
