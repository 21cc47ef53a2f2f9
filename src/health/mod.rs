//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each endpoint in parallel
//!     → Update state.rs
//!
//! Passive health updates (resilience::invoker):
//!     Request success / node failure observed
//!     → Update state.rs
//!
//! Failover (state.rs):
//!     select_next(current, excluding) → next endpoint index
//! ```
//!
//! # Design Decisions
//! - Active and passive checks write the same map, last write wins
//! - Health is per-endpoint and advisory
//! - Endpoint set is fixed at construction

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{Endpoint, EndpointSnapshot, HealthTracker};
