//! Relay facade.
//!
//! Wires configuration, the transport factory, health tracking, the
//! resilient invoker and the delivery engine together, and owns the
//! background health monitor.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::{DeliveryConfig, RelayConfig};
use crate::delivery::{
    ConfirmationQuorumChecker, DeliveryError, DeliveryReceipt, DeliveryState, DeliveryStore,
    Payload, TransactionDeliveryEngine,
};
use crate::health::{EndpointSnapshot, HealthMonitor, HealthTracker};
use crate::lifecycle::Shutdown;
use crate::resilience::{FailoverStats, InvokeError, ResilientInvoker};
use crate::transport::{JsonRpcFactory, TransportFactory};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid configuration: {}", join(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("no endpoint could be opened: {0}")]
    Connect(#[from] InvokeError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct Relay {
    config: RelayConfig,
    tracker: Arc<HealthTracker>,
    factory: Arc<dyn TransportFactory>,
    invoker: Arc<ResilientInvoker>,
    engine: TransactionDeliveryEngine,
    shutdown: Shutdown,
    monitor: Option<JoinHandle<()>>,
}

impl Relay {
    /// Build a relay speaking JSON-RPC over HTTP.
    pub async fn connect(config: RelayConfig) -> Result<Self, RelayError> {
        let factory = Arc::new(JsonRpcFactory::new(config.delivery.commitment));
        Self::with_factory(config, factory).await
    }

    /// Build a relay over any transport factory.
    pub async fn with_factory(
        config: RelayConfig,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self, RelayError> {
        validate_config(&config).map_err(RelayError::InvalidConfig)?;

        let mut urls = Vec::with_capacity(config.endpoints.len());
        let mut errors = Vec::new();
        for raw in &config.endpoints {
            match Url::parse(raw) {
                Ok(url) => urls.push(url),
                Err(e) => errors.push(ValidationError::InvalidEndpoint {
                    url: raw.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        if !errors.is_empty() {
            return Err(RelayError::InvalidConfig(errors));
        }

        let tracker = Arc::new(HealthTracker::new(urls));
        let request_timeout = config.timeouts.request();

        let invoker = Arc::new(
            ResilientInvoker::connect(
                tracker.clone(),
                factory.clone(),
                config.retries.clone(),
                request_timeout,
            )
            .await?,
        );
        let quorum = ConfirmationQuorumChecker::open(&tracker, factory.as_ref(), request_timeout).await;
        let engine = TransactionDeliveryEngine::new(
            invoker.clone(),
            quorum,
            DeliveryStore::new(),
            config.delivery.clone(),
        );

        tracing::info!(
            endpoints = tracker.len(),
            active = %invoker.active_endpoint(),
            "Relay initialized"
        );

        Ok(Self {
            config,
            tracker,
            factory,
            invoker,
            engine,
            shutdown: Shutdown::new(),
            monitor: None,
        })
    }

    /// Start the background health sweep, unless disabled or already running.
    pub fn spawn_health_monitor(&mut self) {
        if self.monitor.is_some() || !self.config.health_check.enabled() {
            return;
        }
        let monitor = self.health_monitor();
        let shutdown = self.shutdown.subscribe();
        self.monitor = Some(tokio::spawn(async move {
            monitor.run(shutdown).await;
        }));
    }

    /// A standalone monitor sharing this relay's health map.
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            self.tracker.clone(),
            self.factory.clone(),
            self.config.health_check.clone(),
        )
    }

    pub async fn send_and_confirm<P: Payload>(
        &self,
        payload: &mut P,
        options: Option<&DeliveryConfig>,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        self.engine.send_and_confirm(payload, options).await
    }

    pub fn delivery_state(&self, id: &str) -> Option<DeliveryState> {
        self.engine.store().get(id)
    }

    pub fn delivery_states(&self) -> Vec<DeliveryState> {
        self.engine.store().all()
    }

    pub fn clear_old_states(&self, max_age: Duration) -> usize {
        self.engine.store().clear_old_states(max_age)
    }

    pub fn endpoint_health(&self) -> Vec<EndpointSnapshot> {
        self.tracker.snapshot()
    }

    pub fn failover_stats(&self) -> FailoverStats {
        self.invoker.failover_stats()
    }

    pub fn active_endpoint(&self) -> String {
        self.invoker.active_endpoint()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Stop the health monitor and close open handles.
    pub async fn shutdown(mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.monitor.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Health monitor task ended abnormally");
            }
        }
        self.invoker.close().await;
        self.engine.close().await;
        tracing::info!("Relay shut down");
    }
}
