//! Endpoint health bookkeeping.
//!
//! # Responsibilities
//! - Hold one entry per configured endpoint (fixed at construction)
//! - Record success/failure and latency from requests and probes
//! - Pick the next endpoint for failover
//!
//! # Design Decisions
//! - Per-field atomics; writers race last-write-wins. Health is advisory and
//!   only steers endpoint selection, so probe results and request outcomes
//!   are not ordered against each other.
//! - Unknown endpoints count as healthy.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

use crate::clock::unix_millis;
use crate::observability::metrics;

const NO_LATENCY: u64 = u64::MAX;

/// A single RPC endpoint.
#[derive(Debug)]
pub struct Endpoint {
    /// The endpoint URL.
    pub url: Url,
    healthy: AtomicBool,
    /// Last check, ms since epoch (0 = never).
    last_checked: AtomicU64,
    /// Last observed latency in microseconds.
    latency_us: AtomicU64,
}

impl Endpoint {
    fn new(url: Url) -> Self {
        Self {
            url,
            healthy: AtomicBool::new(true),
            last_checked: AtomicU64::new(0),
            latency_us: AtomicU64::new(NO_LATENCY),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn latency(&self) -> Option<Duration> {
        match self.latency_us.load(Ordering::Relaxed) {
            NO_LATENCY => None,
            us => Some(Duration::from_micros(us)),
        }
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        let last_checked = self.last_checked.load(Ordering::Relaxed);
        EndpointSnapshot {
            url: self.url.to_string(),
            healthy: self.is_healthy(),
            last_checked_ms: (last_checked != 0).then_some(last_checked),
            latency_ms: self.latency().map(|d| d.as_secs_f64() * 1000.0),
        }
    }
}

/// Point-in-time view of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub url: String,
    pub healthy: bool,
    pub last_checked_ms: Option<u64>,
    pub latency_ms: Option<f64>,
}

/// Health registry for the ordered endpoint list.
#[derive(Debug)]
pub struct HealthTracker {
    endpoints: Vec<Endpoint>,
}

impl HealthTracker {
    /// Create a tracker. Order is preserved and significant.
    pub fn new(urls: Vec<Url>) -> Self {
        Self {
            endpoints: urls.into_iter().map(Endpoint::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoint(&self, index: usize) -> Option<&Endpoint> {
        self.endpoints.get(index)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// URL of the endpoint at `index`, or an empty string if out of range.
    pub fn url(&self, index: usize) -> String {
        self.endpoints
            .get(index)
            .map(|e| e.url.to_string())
            .unwrap_or_default()
    }

    /// Mark an endpoint healthy and record its latency.
    pub fn record_success(&self, index: usize, latency: Option<Duration>) {
        let Some(endpoint) = self.endpoints.get(index) else {
            return;
        };
        let was_healthy = endpoint.healthy.swap(true, Ordering::Relaxed);
        endpoint.last_checked.store(unix_millis(), Ordering::Relaxed);
        if let Some(latency) = latency {
            let us = u64::try_from(latency.as_micros()).unwrap_or(NO_LATENCY - 1);
            endpoint.latency_us.store(us, Ordering::Relaxed);
        }
        if !was_healthy {
            tracing::info!(endpoint = %endpoint.url, "Endpoint recovered");
        }
        metrics::record_endpoint_health(endpoint.url.as_str(), true);
    }

    /// Mark an endpoint unhealthy.
    pub fn record_failure(&self, index: usize) {
        let Some(endpoint) = self.endpoints.get(index) else {
            return;
        };
        let was_healthy = endpoint.healthy.swap(false, Ordering::Relaxed);
        endpoint.last_checked.store(unix_millis(), Ordering::Relaxed);
        if was_healthy {
            tracing::warn!(endpoint = %endpoint.url, "Endpoint marked unhealthy");
        }
        metrics::record_endpoint_health(endpoint.url.as_str(), false);
    }

    /// Pick the endpoint to fail over to from `current`.
    ///
    /// Scans circularly from `current + 1` for the first healthy endpoint not
    /// in `excluding`. If none is healthy, the first endpoint not in
    /// `excluding` wins regardless of health. Only when every other endpoint
    /// is excluded does it return `current + 1` (wrapping).
    pub fn select_next(&self, current: usize, excluding: &HashSet<usize>) -> usize {
        let len = self.endpoints.len();
        if len == 0 {
            return 0;
        }

        let candidates = move || {
            (1..len)
                .map(move |offset| (current + offset) % len)
                .filter(move |index| !excluding.contains(index))
        };

        candidates()
            .find(|&index| self.endpoints[index].is_healthy())
            .or_else(|| candidates().next())
            .unwrap_or((current + 1) % len)
    }

    pub fn healthy_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_healthy()).count()
    }

    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        self.endpoints.iter().map(Endpoint::snapshot).collect()
    }
}
