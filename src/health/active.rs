//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint in parallel
//! - Update endpoint health and latency from the results
//!
//! Probe failures are logged and recorded, never returned.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::state::HealthTracker;
use crate::transport::{RpcTransport, TransportFactory};

pub struct HealthMonitor {
    tracker: Arc<HealthTracker>,
    factory: Arc<dyn TransportFactory>,
    config: HealthCheckConfig,
    /// Probe handles, opened on first use and kept across sweeps.
    transports: Vec<Option<Arc<dyn RpcTransport>>>,
}

impl HealthMonitor {
    pub fn new(
        tracker: Arc<HealthTracker>,
        factory: Arc<dyn TransportFactory>,
        config: HealthCheckConfig,
    ) -> Self {
        let transports = vec![None; tracker.len()];
        Self {
            tracker,
            factory,
            config,
            transports,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled() {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            endpoints = self.tracker.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        // The first tick completes immediately; skip it so the request path
        // gets the first word on endpoint health.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        for transport in self.transports.iter().flatten() {
            transport.close().await;
        }
    }

    /// Probe every endpoint once, concurrently.
    pub async fn sweep(&mut self) {
        for index in 0..self.tracker.len() {
            if self.transports[index].is_some() {
                continue;
            }
            let Some(endpoint) = self.tracker.endpoint(index) else {
                continue;
            };
            match self.factory.open(&endpoint.url).await {
                Ok(transport) => self.transports[index] = Some(transport),
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint.url, error = %e, "Health check failed: could not open transport");
                    self.tracker.record_failure(index);
                }
            }
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let probes = self
            .transports
            .iter()
            .enumerate()
            .filter_map(|(index, transport)| transport.clone().map(|t| (index, t)))
            .map(|(index, transport)| {
                let tracker = self.tracker.clone();
                async move { probe_one(&tracker, index, transport.as_ref(), timeout).await }
            });

        join_all(probes).await;
    }
}

async fn probe_one(
    tracker: &HealthTracker,
    index: usize,
    transport: &dyn RpcTransport,
    timeout: Duration,
) {
    let started = Instant::now();
    match time::timeout(timeout, transport.probe()).await {
        Ok(Ok(slot)) => {
            tracing::trace!(endpoint = %transport.url(), slot, "Health check ok");
            tracker.record_success(index, Some(started.elapsed()));
        }
        Ok(Err(e)) => {
            tracing::warn!(endpoint = %transport.url(), error = %e, "Health check failed: probe error");
            tracker.record_failure(index);
        }
        Err(_) => {
            tracing::warn!(endpoint = %transport.url(), "Health check failed: timeout");
            tracker.record_failure(index);
        }
    }
}
