//! Delivery error definitions.

use std::fmt;
use thiserror::Error;

use crate::delivery::state::DeliveryStatus;
use crate::resilience::InvokeError;

/// Confirmation polling found a definitive answer: the operation executed and failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumError {
    #[error("{signature} executed with error on {endpoint}: {message}")]
    Definite {
        signature: String,
        endpoint: String,
        message: String,
    },
}

/// Why a delivery stopped.
#[derive(Debug, Clone, Error)]
pub enum DeliveryFailure {
    /// Dry-run rejected the payload; nothing was broadcast.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// An endpoint reported the operation executed and failed.
    #[error(transparent)]
    QuorumDefiniteFailure(#[from] QuorumError),

    /// Deadline passed without confirmation.
    #[error("not confirmed within {timeout_secs}s")]
    DeadlineExceeded { timeout_secs: u64 },

    /// A remote call failed terminally.
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Terminal delivery failure with context.
#[derive(Debug, Clone)]
pub struct DeliveryError {
    pub delivery_id: String,
    pub attempts: u32,
    /// Endpoint active when the delivery stopped.
    pub endpoint: String,
    /// Last identifier returned by a successful broadcast.
    pub signature: Option<String>,
    pub failure: DeliveryFailure,
}

impl DeliveryError {
    /// Terminal status recorded for this failure.
    pub fn status(&self) -> DeliveryStatus {
        match self.failure {
            DeliveryFailure::DeadlineExceeded { .. } => DeliveryStatus::Expired,
            _ => DeliveryStatus::Failed,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.status() == DeliveryStatus::Expired
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivery {} {} after {} attempt(s) (endpoint {}, last signature {}): {}",
            self.delivery_id,
            self.status().as_str(),
            self.attempts,
            self.endpoint,
            self.signature.as_deref().unwrap_or("<none>"),
            self.failure
        )
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.failure)
    }
}
