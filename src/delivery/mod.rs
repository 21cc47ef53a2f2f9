//! Transaction delivery subsystem.
//!
//! # Data Flow
//! ```text
//! caller payload
//!     → engine.rs (state machine, deadline loop)
//!         → simulation.rs (dry-run verdict)
//!         → freshness.rs (token fetch via ResilientInvoker)
//!         → ResilientInvoker (broadcast)
//!         → quorum.rs (fan-out status polling)
//!     → state.rs (DeliveryStore records every step)
//! ```

pub mod engine;
pub mod error;
pub mod freshness;
pub mod payload;
pub mod quorum;
pub mod simulation;
pub mod state;

pub use engine::{DeliveryReceipt, TransactionDeliveryEngine};
pub use error::{DeliveryError, DeliveryFailure, QuorumError};
pub use freshness::FreshnessProvider;
pub use payload::{Payload, RawTransaction};
pub use quorum::ConfirmationQuorumChecker;
pub use state::{DeliveryState, DeliveryStatus, DeliveryStore};
