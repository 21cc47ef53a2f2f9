//! Transport-level error definitions.

use thiserror::Error;

/// Structured failure kind reported by a transport.
///
/// Classification in `resilience::classify` keys off this kind. `Opaque` is
/// reserved for errors the transport could not interpret; only those fall
/// back to message matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Endpoint is throttling us (HTTP 429 or equivalent).
    RateLimited,
    /// Call did not complete within its deadline.
    Timeout,
    /// Endpoint explicitly asked the caller to retry later.
    RetryLater,
    /// TCP connection was refused.
    ConnectionRefused,
    /// Connection dropped mid-request.
    ConnectionReset,
    /// Host name could not be resolved.
    Dns,
    /// Non-success HTTP status other than 429.
    Server(u16),
    /// Any other network-level failure.
    Network,
    /// Freshness token (recent blockhash) is unknown or expired.
    FreshnessExpired,
    /// JSON-RPC error object with the given code.
    Rpc(i64),
    /// Response could not be decoded.
    Decode,
    /// Uninterpreted failure.
    Opaque,
}

/// Error surfaced by a transport call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn opaque(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Opaque, message)
    }

    pub fn timeout(after_ms: u128) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("request timed out after {} ms", after_ms),
        )
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
