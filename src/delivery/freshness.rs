//! Freshness token retrieval.

use std::sync::Arc;

use crate::resilience::{InvokeError, ResilientInvoker};
use crate::transport::FreshnessToken;

/// Fetches freshness tokens through the resilient invoker.
///
/// No retry beyond the invoker's own policy.
#[derive(Clone)]
pub struct FreshnessProvider {
    invoker: Arc<ResilientInvoker>,
}

impl FreshnessProvider {
    pub fn new(invoker: Arc<ResilientInvoker>) -> Self {
        Self { invoker }
    }

    pub async fn fetch(&self) -> Result<FreshnessToken, InvokeError> {
        let token = self
            .invoker
            .invoke("getLatestBlockhash", |transport| async move {
                transport.get_freshness_token().await
            })
            .await?;

        tracing::debug!(
            token = %token.token,
            expiry_marker = token.expiry_marker,
            "Fetched freshness token"
        );
        Ok(token)
    }
}
