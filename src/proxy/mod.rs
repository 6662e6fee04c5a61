//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! authenticated request + matched RouteEntry
//!     → transport.rs (resolve lb://{service}, send, stream response back)
//!     → Response, or GatewayError::Upstream for the translator
//! ```

pub mod transport;

pub use transport::{HttpForwarder, ProxyTransport};
