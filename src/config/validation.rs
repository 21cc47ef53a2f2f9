//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and value ranges
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one endpoint must be configured")]
    NoEndpoints,

    #[error("endpoint '{url}' is not a valid URL: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("endpoint '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("endpoint '{0}' is listed more than once")]
    DuplicateEndpoint(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    BackoffInverted { base: u64, max: u64 },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut seen = HashSet::new();
    for raw in &config.endpoints {
        match Url::parse(raw) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                errors.push(ValidationError::UnsupportedScheme(raw.clone()));
            }
            Ok(url) => {
                if !seen.insert(url) {
                    errors.push(ValidationError::DuplicateEndpoint(raw.clone()));
                }
            }
            Err(e) => errors.push(ValidationError::InvalidEndpoint {
                url: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if config.retries.max_retries == 0 {
        errors.push(ValidationError::Zero { field: "retries.max_retries" });
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::BackoffInverted {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }
    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_ms" });
    }
    if config.delivery.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "delivery.timeout_secs" });
    }
    if config.delivery.retry_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "delivery.retry_interval_ms" });
    }
    if config.delivery.confirmation_nodes == 0 {
        errors.push(ValidationError::Zero { field: "delivery.confirmation_nodes" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
