//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the transaction relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Ordered RPC endpoint URLs (primary first, then fallbacks).
    ///
    /// Order matters: failover walks it circularly and confirmation polling
    /// always queries its first `delivery.confirmation_nodes` entries.
    pub endpoints: Vec<String>,

    /// Retry and backoff configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Delivery loop defaults.
    pub delivery: DeliveryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per invocation.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Timeout configuration for RPC calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-call request timeout in milliseconds.
    pub request_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_ms: 30_000 }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Sweep interval in milliseconds. Zero disables the background sweep.
    pub interval_ms: u64,

    /// Timeout for a single probe in milliseconds.
    pub timeout_ms: u64,
}

impl HealthCheckConfig {
    /// Return true if the background sweep should run.
    pub fn enabled(&self) -> bool {
        self.interval_ms > 0
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            timeout_ms: 5_000,
        }
    }
}

/// Commitment level a status query must reach to count as confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Return true if a reported status at `reported` satisfies this level.
    pub fn is_satisfied_by(&self, reported: Commitment) -> bool {
        reported.rank() >= self.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Commitment::Processed => 0,
            Commitment::Confirmed => 1,
            Commitment::Finalized => 2,
        }
    }
}

/// Delivery loop configuration.
///
/// Also used as per-call options on `send_and_confirm`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Wall-clock deadline for one delivery, in seconds.
    pub timeout_secs: u64,

    /// Pause between broadcast/confirm iterations in milliseconds.
    pub retry_interval_ms: u64,

    /// Maximum freshness token age before a refresh, in seconds.
    pub max_freshness_age_secs: u64,

    /// Number of leading endpoints polled for confirmation.
    pub confirmation_nodes: usize,

    /// Skip the pre-broadcast simulation.
    pub skip_simulation: bool,

    /// Target confirmation depth.
    pub commitment: Commitment,
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn max_freshness_age(&self) -> Duration {
        Duration::from_secs(self.max_freshness_age_secs)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            retry_interval_ms: 2_000,
            max_freshness_age_secs: 60,
            confirmation_nodes: 3,
            skip_simulation: false,
            commitment: Commitment::Confirmed,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert!(config.endpoints.is_empty());
        assert_eq!(config.retries.max_retries, 5);
        assert_eq!(config.retries.base_delay_ms, 500);
        assert_eq!(config.timeouts.request_ms, 30_000);
        assert_eq!(config.health_check.interval_ms, 30_000);
        assert_eq!(config.delivery.timeout_secs, 60);
        assert_eq!(config.delivery.retry_interval_ms, 2_000);
        assert_eq!(config.delivery.confirmation_nodes, 3);
        assert!(!config.delivery.skip_simulation);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            endpoints = ["http://a:8899", "http://b:8899"]

            [delivery]
            timeout_secs = 5
            commitment = "finalized"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.delivery.timeout_secs, 5);
        assert_eq!(config.delivery.commitment, Commitment::Finalized);
        assert_eq!(config.delivery.retry_interval_ms, 2_000);
        assert_eq!(config.retries.max_retries, 5);
    }

    #[test]
    fn test_commitment_ordering() {
        assert!(Commitment::Confirmed.is_satisfied_by(Commitment::Finalized));
        assert!(Commitment::Confirmed.is_satisfied_by(Commitment::Confirmed));
        assert!(!Commitment::Confirmed.is_satisfied_by(Commitment::Processed));
        assert!(!Commitment::Finalized.is_satisfied_by(Commitment::Confirmed));
    }
}
