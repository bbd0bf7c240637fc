//! Media bridge adapter: JSON lines over sidecar stdio or process stdio.

pub mod error;
pub mod protocol;
pub mod transport;

pub use error::BridgeError;
pub use transport::{BridgeCommand, BridgeTransport, JoinRequest};
