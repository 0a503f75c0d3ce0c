//! Request-boundary identity.
//!
//! Sessions are issued upstream; the gateway forwards the authenticated
//! subject in the `x-account-email` header. It is resolved to a
//! [`Principal`] once per request.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::Principal;
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// Header carrying the authenticated account's email.
pub const ACCOUNT_HEADER: &str = "x-account-email";

/// Extractor for the calling principal. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentPrincipal
where
    S: Store + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|value| value.to_str().ok());
        let principal = state.principals.resolve(subject).await?;
        Ok(CurrentPrincipal(principal))
    }
}
