//! Failure classification.
//!
//! Structured `TransportErrorKind`s decide the class. Only `Opaque` errors
//! fall back to matching lowercase substrings of the message; those lists are
//! provider heuristics and will not catch every wording.

use crate::transport::{TransportError, TransportErrorKind};

/// JSON-RPC code some providers use for an unhealthy / lagging node.
const RPC_NODE_UNHEALTHY: i64 = -32005;

/// How the invoker reacts to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retry the same endpoint after backoff.
    Transient,
    /// Mark the endpoint unhealthy and fail over.
    NodeFailure,
    /// Freshness token rejected; caller refreshes and retries.
    FreshnessExpired,
    /// Stop.
    Fatal,
}

const TRANSIENT_HINTS: &[&str] = &[
    "429",
    "too many requests",
    "rate limit",
    "timeout",
    "timed out",
    "retry",
];

const NODE_FAILURE_HINTS: &[&str] = &[
    "econnrefused",
    "connection refused",
    "econnreset",
    "connection reset",
    "enotfound",
    "dns",
    "502",
    "503",
    "504",
    "bad gateway",
    "service unavailable",
    "network",
];

const FRESHNESS_HINTS: &[&str] = &["blockhash not found", "block height exceeded", "expired"];

pub fn classify(error: &TransportError) -> FailureClass {
    match error.kind {
        TransportErrorKind::RateLimited
        | TransportErrorKind::Timeout
        | TransportErrorKind::RetryLater => FailureClass::Transient,
        TransportErrorKind::ConnectionRefused
        | TransportErrorKind::ConnectionReset
        | TransportErrorKind::Dns
        | TransportErrorKind::Network => FailureClass::NodeFailure,
        TransportErrorKind::Server(status) if status >= 500 => FailureClass::NodeFailure,
        TransportErrorKind::Server(_) => FailureClass::Fatal,
        TransportErrorKind::Rpc(RPC_NODE_UNHEALTHY) => FailureClass::NodeFailure,
        TransportErrorKind::FreshnessExpired => FailureClass::FreshnessExpired,
        TransportErrorKind::Rpc(_) | TransportErrorKind::Decode => FailureClass::Fatal,
        TransportErrorKind::Opaque => classify_message(&error.message),
    }
}

fn classify_message(message: &str) -> FailureClass {
    let lower = message.to_lowercase();
    if FRESHNESS_HINTS.iter().any(|h| lower.contains(h)) {
        FailureClass::FreshnessExpired
    } else if TRANSIENT_HINTS.iter().any(|h| lower.contains(h)) {
        FailureClass::Transient
    } else if NODE_FAILURE_HINTS.iter().any(|h| lower.contains(h)) {
        FailureClass::NodeFailure
    } else {
        FailureClass::Fatal
    }
}
