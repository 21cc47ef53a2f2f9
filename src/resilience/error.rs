//! Invocation error definitions.

use thiserror::Error;

use crate::resilience::classify::{classify, FailureClass};
use crate::transport::TransportError;

/// Terminal failure of a resilient invocation.
///
/// Both variants carry the method name, the number of attempts made and the
/// endpoint that was active when the invocation gave up.
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    /// A non-retryable failure stopped the invocation.
    #[error("{method} failed on {endpoint} after {attempts} attempt(s): {source}")]
    Fatal {
        method: &'static str,
        attempts: u32,
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// Every allowed attempt failed.
    #[error("{method} exhausted {attempts} attempt(s), last endpoint {endpoint}: {source}")]
    RetriesExhausted {
        method: &'static str,
        attempts: u32,
        endpoint: String,
        #[source]
        source: TransportError,
    },
}

impl InvokeError {
    pub fn method(&self) -> &'static str {
        match self {
            InvokeError::Fatal { method, .. } | InvokeError::RetriesExhausted { method, .. } => {
                method
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            InvokeError::Fatal { attempts, .. } | InvokeError::RetriesExhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            InvokeError::Fatal { endpoint, .. } | InvokeError::RetriesExhausted { endpoint, .. } => {
                endpoint
            }
        }
    }

    /// The last transport error observed.
    pub fn transport_error(&self) -> &TransportError {
        match self {
            InvokeError::Fatal { source, .. } | InvokeError::RetriesExhausted { source, .. } => {
                source
            }
        }
    }

    pub fn class(&self) -> FailureClass {
        classify(self.transport_error())
    }

    /// True when the endpoint rejected the freshness token.
    pub fn is_freshness_expired(&self) -> bool {
        self.class() == FailureClass::FreshnessExpired
    }
}
