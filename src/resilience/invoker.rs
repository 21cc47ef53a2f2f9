//! Resilient invocation across a ranked endpoint list.
//!
//! # Algorithm
//! ```text
//! for attempt in 1..=max_retries:
//!     call active endpoint (bounded by request_timeout)
//!     Ok        → record success, return
//!     Transient → backoff, same endpoint
//!     Node      → mark unhealthy, fail over to select_next(excluding tried)
//!                 (backoff on the current endpoint once every endpoint was tried)
//!     other     → stop with InvokeError::Fatal
//! → InvokeError::RetriesExhausted
//! ```
//!
//! # Concurrency
//! The active endpoint is global to the invoker. Concurrent invocations can
//! observe, or trigger, a failover mid-flight for each other; this is not
//! linearizable and is intended. A failover only replaces the handle it
//! observed failing, so two callers failing on the same endpoint produce one
//! switch.

use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::unix_millis;
use crate::config::RetryConfig;
use crate::health::HealthTracker;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::classify::{classify, FailureClass};
use crate::resilience::error::InvokeError;
use crate::resilience::timeouts::with_timeout;
use crate::transport::{RpcTransport, TransportError, TransportFactory, TransportResult};

/// The endpoint currently in use and its open handle.
struct ActiveTransport {
    index: usize,
    transport: Arc<dyn RpcTransport>,
}

/// Failover counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FailoverStats {
    pub count: u64,
    /// Time of the last failover, ms since epoch.
    pub last_time_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct FailoverCounter {
    count: AtomicU64,
    last_time_ms: AtomicU64,
}

impl FailoverCounter {
    fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.last_time_ms.store(unix_millis(), Ordering::Relaxed);
    }

    fn stats(&self) -> FailoverStats {
        let last = self.last_time_ms.load(Ordering::Relaxed);
        FailoverStats {
            count: self.count.load(Ordering::Relaxed),
            last_time_ms: (last != 0).then_some(last),
        }
    }
}

pub struct ResilientInvoker {
    tracker: Arc<HealthTracker>,
    factory: Arc<dyn TransportFactory>,
    active: ArcSwap<ActiveTransport>,
    retry: RetryConfig,
    request_timeout: Duration,
    failovers: FailoverCounter,
}

impl ResilientInvoker {
    /// Open a transport to the first reachable endpoint, in configured order.
    pub async fn connect(
        tracker: Arc<HealthTracker>,
        factory: Arc<dyn TransportFactory>,
        retry: RetryConfig,
        request_timeout: Duration,
    ) -> Result<Self, InvokeError> {
        let mut last_error = TransportError::opaque("no endpoints configured");
        let mut attempts = 0;

        for (index, endpoint) in tracker.endpoints().iter().enumerate() {
            attempts += 1;
            match factory.open(&endpoint.url).await {
                Ok(transport) => {
                    tracing::info!(endpoint = %endpoint.url, "Resilient invoker connected");
                    return Ok(Self {
                        tracker: tracker.clone(),
                        factory,
                        active: ArcSwap::from_pointee(ActiveTransport { index, transport }),
                        retry,
                        request_timeout,
                        failovers: FailoverCounter::default(),
                    });
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint.url, error = %e, "Failed to open transport");
                    tracker.record_failure(index);
                    last_error = e;
                }
            }
        }

        Err(InvokeError::RetriesExhausted {
            method: "connect",
            attempts,
            endpoint: tracker.url(tracker.len().saturating_sub(1)),
            source: last_error,
        })
    }

    /// Run `call` against the active endpoint under the retry/failover policy.
    pub async fn invoke<T, F, Fut>(&self, method: &'static str, call: F) -> Result<T, InvokeError>
    where
        F: Fn(Arc<dyn RpcTransport>) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let max_attempts = self.retry.max_retries.max(1);
        let mut attempted: HashSet<usize> = HashSet::new();
        let mut last_failure: Option<(TransportError, usize)> = None;

        for attempt in 1..=max_attempts {
            let active = self.active.load_full();
            let started = Instant::now();
            let result = with_timeout(self.request_timeout, call(active.transport.clone())).await;
            let elapsed = started.elapsed();

            let error = match result {
                Ok(value) => {
                    self.tracker.record_success(active.index, Some(elapsed));
                    metrics::record_rpc_call(method, "ok", elapsed);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let class = classify(&error);
            metrics::record_rpc_call(method, class_label(class), elapsed);

            match class {
                FailureClass::Transient => {
                    if attempt < max_attempts {
                        let delay = self.backoff(attempt);
                        tracing::warn!(
                            method,
                            endpoint = %active.transport.url(),
                            attempt,
                            delay = ?delay,
                            error = %error,
                            "Transient RPC failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                FailureClass::NodeFailure => {
                    self.tracker.record_failure(active.index);
                    attempted.insert(active.index);
                    tracing::warn!(
                        method,
                        endpoint = %active.transport.url(),
                        attempt,
                        error = %error,
                        "Endpoint failure"
                    );

                    if attempt < max_attempts {
                        if attempted.len() < self.tracker.len() {
                            let next = self.tracker.select_next(active.index, &attempted);
                            if let Err(open_error) = self.failover(&active, next).await {
                                self.tracker.record_failure(next);
                                attempted.insert(next);
                                last_failure = Some((open_error, next));
                                continue;
                            }
                        } else {
                            let delay = self.backoff(attempt);
                            tracing::debug!(method, delay = ?delay, "All endpoints tried, backing off");
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
                FailureClass::FreshnessExpired | FailureClass::Fatal => {
                    return Err(InvokeError::Fatal {
                        method,
                        attempts: attempt,
                        endpoint: active.transport.url().to_string(),
                        source: error,
                    });
                }
            }

            last_failure = Some((error, active.index));
        }

        let (source, index) = last_failure
            .unwrap_or_else(|| (TransportError::opaque("no attempt was made"), self.active_index()));
        Err(InvokeError::RetriesExhausted {
            method,
            attempts: max_attempts,
            endpoint: self.tracker.url(index),
            source,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.retry.base_delay_ms, self.retry.max_delay_ms)
    }

    /// Replace the handle `from` with a freshly opened one for endpoint `to`.
    async fn failover(&self, from: &Arc<ActiveTransport>, to: usize) -> TransportResult<()> {
        let Some(endpoint) = self.tracker.endpoint(to) else {
            return Err(TransportError::opaque(format!("endpoint index {} out of range", to)));
        };

        let transport = self.factory.open(&endpoint.url).await.map_err(|e| {
            tracing::error!(endpoint = %endpoint.url, error = %e, "Failover target could not be opened");
            e
        })?;

        let next = Arc::new(ActiveTransport {
            index: to,
            transport: transport.clone(),
        });
        let previous = self.active.compare_and_swap(from, next);

        if Arc::ptr_eq(&*previous, from) {
            from.transport.close().await;
            self.failovers.record();
            metrics::record_failover(from.transport.url().as_str(), endpoint.url.as_str());
            tracing::info!(
                from = %from.transport.url(),
                to = %endpoint.url,
                "Failed over to next endpoint"
            );
        } else {
            // Another invocation already switched away from `from`.
            transport.close().await;
        }
        Ok(())
    }

    pub fn failover_stats(&self) -> FailoverStats {
        self.failovers.stats()
    }

    pub fn active_index(&self) -> usize {
        self.active.load().index
    }

    pub fn active_endpoint(&self) -> String {
        self.active.load().transport.url().to_string()
    }

    /// Close the active handle.
    pub async fn close(&self) {
        self.active.load_full().transport.close().await;
    }
}

fn class_label(class: FailureClass) -> &'static str {
    match class {
        FailureClass::Transient => "transient",
        FailureClass::NodeFailure => "node_failure",
        FailureClass::FreshnessExpired => "freshness_expired",
        FailureClass::Fatal => "fatal",
    }
}
