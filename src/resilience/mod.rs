//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an endpoint:
//!     → timeouts.rs (enforce per-call request timeout)
//!     → On failure: classify.rs (transient / node failure / freshness / fatal)
//!     → backoff.rs (exponential delay for transient retries)
//!     → invoker.rs (retry, fail over, record endpoint health)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every remote call has a deadline
//! - Classification uses structured error kinds first
//! - Failover is a global optimization, not a per-call lock

pub mod backoff;
pub mod classify;
pub mod error;
pub mod invoker;
pub mod timeouts;

pub use classify::{classify, FailureClass};
pub use error::InvokeError;
pub use invoker::{FailoverStats, ResilientInvoker};
