//! Timeout enforcement.
//!
//! A timed-out call is dropped (aborting the in-flight request) and
//! surfaces as a `Timeout` transport error, which classifies as transient.

use std::future::Future;
use std::time::Duration;

use crate::transport::{TransportError, TransportResult};

/// Run `fut` with a deadline.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> TransportResult<T>
where
    F: Future<Output = TransportResult<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::timeout(duration.as_millis())),
    }
}
