//! Transport boundary.
//!
//! # Data Flow
//! ```text
//! ResilientInvoker / QuorumChecker / HealthMonitor
//!     → TransportFactory::open(url)   (one handle per endpoint)
//!     → RpcTransport::{submit, simulate, get_status, ...}
//!     → RpcTransport::close()         (on failover or shutdown)
//! ```
//!
//! Every operation that needs resilience is listed on the trait, so the
//! invoker wraps explicit calls instead of intercepting an opaque client.
//! Cancellation is future drop: a timed-out call is simply abandoned.

pub mod error;
pub mod json_rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::config::Commitment;

pub use error::{TransportError, TransportErrorKind, TransportResult};
pub use json_rpc::{JsonRpcFactory, JsonRpcTransport};

/// Short-lived value a payload must carry to be accepted (e.g. a recent blockhash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessToken {
    /// Opaque token value.
    pub token: String,
    /// Point after which the token is no longer accepted (e.g. last valid block height).
    pub expiry_marker: u64,
}

/// Result of a dry-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Structured error reported by the simulator, if any.
    pub error: Option<String>,
    /// Diagnostic log lines emitted during simulation.
    pub logs: Vec<String>,
}

/// Status of a submitted operation as reported by one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Confirmation depth the endpoint reports, if any.
    pub commitment: Option<Commitment>,
    /// Operation executed and failed with this error.
    pub err: Option<String>,
}

impl SignatureStatus {
    /// Return true if the reported depth reaches `target`.
    pub fn satisfies(&self, target: Commitment) -> bool {
        self.commitment
            .map(|reported| target.is_satisfied_by(reported))
            .unwrap_or(false)
    }
}

/// Remote operations the relay issues against one endpoint.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// URL this handle talks to.
    fn url(&self) -> &Url;

    /// Broadcast serialized transaction bytes and return their identifier.
    ///
    /// The transport must not retry internally.
    async fn submit(&self, tx: &[u8]) -> TransportResult<String>;

    /// Dry-run serialized transaction bytes.
    async fn simulate(&self, tx: &[u8]) -> TransportResult<SimulationOutcome>;

    /// Look up the status of a previously submitted identifier.
    ///
    /// `None` means the endpoint has not seen it (yet). The caller judges the
    /// reported depth against its own target.
    async fn get_status(&self, signature: &str) -> TransportResult<Option<SignatureStatus>>;

    /// Fetch a fresh freshness token.
    async fn get_freshness_token(&self) -> TransportResult<FreshnessToken>;

    /// Cheap liveness probe; returns the endpoint's current slot.
    async fn probe(&self) -> TransportResult<u64>;

    /// Release sockets and any background resources.
    async fn close(&self) {}
}

/// Opens transport handles for endpoint URLs.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(&self, url: &Url) -> TransportResult<Arc<dyn RpcTransport>>;
}
