//! Transaction delivery engine.
//!
//! # State Machine
//! ```text
//! Pending → [Simulated] → loop { Sent } → Confirmed | Expired | Failed
//! ```
//!
//! # Loop (until the wall-clock deadline)
//! 1. Refresh the freshness token if it is too old or was rejected
//! 2. Broadcast through the resilient invoker
//! 3. On a rejected token: refresh next iteration, no sleep
//! 4. On any other broadcast error: sleep and retry
//! 5. On success: poll the confirmation quorum; confirmed returns, a
//!    definitive failure fails, otherwise sleep and re-broadcast
//!
//! Re-broadcasting the same transaction is expected and harmless. The
//! deadline is checked at the top of each iteration, so a call or sleep that
//! already started runs to completion.
//!
//! # Freshness refresh and pre-signed payloads
//! A refreshed token is attached to the payload but the payload is NOT
//! re-signed. For payloads whose signature covers the token, the caller must
//! either supply a fresh payload or accept that broadcasts after a refresh
//! may be rejected.

use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::clock::unix_millis;
use crate::config::DeliveryConfig;
use crate::delivery::error::{DeliveryError, DeliveryFailure};
use crate::delivery::freshness::FreshnessProvider;
use crate::delivery::payload::Payload;
use crate::delivery::quorum::ConfirmationQuorumChecker;
use crate::delivery::simulation::simulation_error_message;
use crate::delivery::state::{DeliveryState, DeliveryStatus, DeliveryStore};
use crate::observability::metrics;
use crate::resilience::ResilientInvoker;

/// Successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub delivery_id: String,
    /// Confirmed identifier.
    pub signature: String,
    pub attempts: u32,
}

pub struct TransactionDeliveryEngine {
    invoker: Arc<ResilientInvoker>,
    freshness: FreshnessProvider,
    quorum: ConfirmationQuorumChecker,
    store: DeliveryStore,
    defaults: DeliveryConfig,
}

impl TransactionDeliveryEngine {
    pub fn new(
        invoker: Arc<ResilientInvoker>,
        quorum: ConfirmationQuorumChecker,
        store: DeliveryStore,
        defaults: DeliveryConfig,
    ) -> Self {
        Self {
            freshness: FreshnessProvider::new(invoker.clone()),
            invoker,
            quorum,
            store,
            defaults,
        }
    }

    pub fn store(&self) -> &DeliveryStore {
        &self.store
    }

    /// Close the confirmation handles.
    pub async fn close(&self) {
        self.quorum.close().await;
    }

    /// Simulate, broadcast and confirm `payload`.
    ///
    /// `options` replaces the configured delivery defaults for this call.
    pub async fn send_and_confirm<P: Payload>(
        &self,
        payload: &mut P,
        options: Option<&DeliveryConfig>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let options = options.unwrap_or(&self.defaults);
        let delivery_id = Uuid::new_v4().to_string();
        self.store.insert(DeliveryState::new(delivery_id.clone()));

        tracing::info!(
            delivery_id = %delivery_id,
            timeout_secs = options.timeout_secs,
            skip_simulation = options.skip_simulation,
            "Delivery started"
        );

        let outcome = self.drive(&delivery_id, payload, options).await;
        let state = self.store.get(&delivery_id);
        let attempts = state.as_ref().map(|s| s.attempts).unwrap_or(0);

        match outcome {
            Ok(signature) => {
                metrics::record_delivery(DeliveryStatus::Confirmed.as_str(), attempts);
                tracing::info!(
                    delivery_id = %delivery_id,
                    signature = %signature,
                    attempts,
                    "Delivery confirmed"
                );
                Ok(DeliveryReceipt {
                    delivery_id,
                    signature,
                    attempts,
                })
            }
            Err(failure) => {
                let error = DeliveryError {
                    delivery_id: delivery_id.clone(),
                    attempts,
                    endpoint: self.invoker.active_endpoint(),
                    signature: state.and_then(|s| s.signature),
                    failure,
                };
                let status = error.status();
                self.store.update(&delivery_id, |s| s.error = Some(error.failure.to_string()));
                self.store.transition(&delivery_id, status);
                metrics::record_delivery(status.as_str(), attempts);
                tracing::error!(delivery_id = %delivery_id, error = %error, "Delivery {}", status.as_str());
                Err(error)
            }
        }
    }

    async fn drive<P: Payload>(
        &self,
        id: &str,
        payload: &mut P,
        options: &DeliveryConfig,
    ) -> Result<String, DeliveryFailure> {
        let deadline = Instant::now() + options.timeout();

        if !options.skip_simulation {
            let bytes = payload.serialize();
            let bytes = bytes.as_slice();
            let outcome = self
                .invoker
                .invoke("simulateTransaction", move |transport| async move {
                    transport.simulate(bytes).await
                })
                .await?;

            if let Some(message) = simulation_error_message(&outcome) {
                return Err(DeliveryFailure::Simulation(message));
            }
            self.store.transition(id, DeliveryStatus::Simulated);
        }

        let needs_freshness = payload.requires_freshness();
        let mut token_acquired = Instant::now();
        let mut token_stale = false;
        if needs_freshness && payload.freshness_token().is_none() {
            payload.attach_freshness(self.freshness.fetch().await?);
            token_acquired = Instant::now();
        }

        while Instant::now() < deadline {
            if needs_freshness && (token_stale || token_acquired.elapsed() > options.max_freshness_age()) {
                payload.attach_freshness(self.freshness.fetch().await?);
                token_acquired = Instant::now();
                token_stale = false;
                tracing::debug!(delivery_id = %id, "Freshness token refreshed (payload not re-signed)");
            }

            let bytes = payload.serialize();
            let bytes = bytes.as_slice();
            self.store.update(id, |s| {
                s.attempts += 1;
                s.last_attempt_time = Some(unix_millis());
            });

            let sent = self
                .invoker
                .invoke("sendTransaction", move |transport| async move {
                    transport.submit(bytes).await
                })
                .await;

            match sent {
                Ok(signature) => {
                    self.store.update(id, |s| s.signature = Some(signature.clone()));
                    self.store.transition(id, DeliveryStatus::Sent);

                    let confirmed = self
                        .quorum
                        .poll(&signature, options.confirmation_nodes, options.commitment)
                        .await?;
                    if confirmed {
                        self.store.update(id, |s| s.confirmed_at = Some(unix_millis()));
                        self.store.transition(id, DeliveryStatus::Confirmed);
                        return Ok(signature);
                    }
                    tracing::debug!(delivery_id = %id, signature = %signature, "Not confirmed yet");
                }
                Err(e) if needs_freshness && e.is_freshness_expired() => {
                    tracing::warn!(delivery_id = %id, error = %e, "Freshness token rejected, refreshing");
                    token_stale = true;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(delivery_id = %id, error = %e, "Broadcast failed, will retry");
                }
            }

            tokio::time::sleep(options.retry_interval()).await;
        }

        Err(DeliveryFailure::DeadlineExceeded {
            timeout_secs: options.timeout_secs,
        })
    }
}
