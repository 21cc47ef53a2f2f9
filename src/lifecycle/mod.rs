//! Lifecycle management.
//!
//! # Shutdown Sequence
//! ```text
//! Ctrl+C (signals.rs) or Relay::shutdown()
//!     → shutdown.rs broadcasts
//!     → health monitor exits its loop and closes probe handles
//!     → invoker and quorum handles closed
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
