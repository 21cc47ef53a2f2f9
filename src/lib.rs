//! Resilient multi-endpoint RPC relay with transaction delivery.

pub mod clock;
pub mod config;
pub mod delivery;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod transport;

pub use config::RelayConfig;
pub use delivery::{DeliveryError, DeliveryReceipt, DeliveryState, DeliveryStatus, Payload, RawTransaction};
pub use lifecycle::Shutdown;
pub use relay::{Relay, RelayError};
pub use resilience::{InvokeError, ResilientInvoker};
pub use transport::{RpcTransport, TransportError, TransportErrorKind, TransportFactory};
