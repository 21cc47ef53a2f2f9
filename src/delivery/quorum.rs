//! Multi-endpoint confirmation polling.
//!
//! # Reduction
//! ```text
//! query first N endpoints in parallel
//!     any executed-with-error → Err(Definite)   (returns at once)
//!     any at target depth     → Ok(true)        (after all settle)
//!     otherwise               → Ok(false)
//! ```
//! A query that fails to reach its node counts as "not confirmed" for that
//! node only.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Commitment;
use crate::delivery::error::QuorumError;
use crate::health::HealthTracker;
use crate::resilience::timeouts::with_timeout;
use crate::transport::{RpcTransport, SignatureStatus, TransportFactory};

/// Polls the leading configured endpoints, independent of the invoker's active one.
pub struct ConfirmationQuorumChecker {
    transports: Vec<Option<Arc<dyn RpcTransport>>>,
    request_timeout: Duration,
}

impl ConfirmationQuorumChecker {
    /// Open one status handle per endpoint, in configured order.
    pub async fn open(
        tracker: &HealthTracker,
        factory: &dyn TransportFactory,
        request_timeout: Duration,
    ) -> Self {
        let mut transports = Vec::with_capacity(tracker.len());
        for endpoint in tracker.endpoints() {
            match factory.open(&endpoint.url).await {
                Ok(transport) => transports.push(Some(transport)),
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint.url, error = %e, "Confirmation handle unavailable");
                    transports.push(None);
                }
            }
        }
        Self {
            transports,
            request_timeout,
        }
    }

    /// Number of endpoints a poll for `nodes` will actually query.
    pub fn fan_out(&self, nodes: usize) -> usize {
        nodes.min(self.transports.len())
    }

    /// Poll the first `nodes` endpoints; a status counts once it reaches `target`.
    pub async fn poll(
        &self,
        signature: &str,
        nodes: usize,
        target: Commitment,
    ) -> Result<bool, QuorumError> {
        let timeout = self.request_timeout;
        let mut pending: FuturesUnordered<_> = self
            .transports
            .iter()
            .take(self.fan_out(nodes))
            .flatten()
            .map(|transport| async move {
                let result = with_timeout(timeout, transport.get_status(signature)).await;
                (transport.url().to_string(), result)
            })
            .collect();

        let mut confirmed_by = None;
        while let Some((endpoint, result)) = pending.next().await {
            match result {
                Ok(Some(SignatureStatus {
                    err: Some(message), ..
                })) => {
                    return Err(QuorumError::Definite {
                        signature: signature.to_string(),
                        endpoint,
                        message,
                    });
                }
                Ok(Some(status)) if status.satisfies(target) => {
                    confirmed_by.get_or_insert(endpoint);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(endpoint = %endpoint, error = %e, "Status query failed, counting as unconfirmed");
                }
            }
        }

        if let Some(endpoint) = &confirmed_by {
            tracing::debug!(signature, endpoint = %endpoint, "Confirmation observed");
        }
        Ok(confirmed_by.is_some())
    }

    pub async fn close(&self) {
        for transport in self.transports.iter().flatten() {
            transport.close().await;
        }
    }
}
