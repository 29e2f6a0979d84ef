//! Presentation Layer
//!
//! HTTP routes, middleware and the WebSocket delivery layer.

pub mod http;
pub mod middleware;
pub mod websocket;
