//! WebSocket Delivery
//!
//! Real-time direct messaging over WebSocket connections.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod registry;
pub mod router;
pub mod session;

pub use connection::{ConnectionActor, Shutdown};
pub use handler::ws_handler;
pub use messages::{ErrorCode, InboundEnvelope, OutboundEnvelope};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use router::MessageRouter;
pub use session::SessionState;
