//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared by value or Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the endpoint set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    Commitment, DeliveryConfig, HealthCheckConfig, ObservabilityConfig, RelayConfig, RetryConfig,
    TimeoutConfig,
};
