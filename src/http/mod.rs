//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → response.rs::catch_panic (outermost: panics become 500 envelopes)
//!     → request.rs (assign/propagate x-request-id, open span)
//!     → auth::gate (Bearer check, JWT verification)
//!     → server.rs (route lookup on the current table)
//!     → proxy::transport (forward to the service)
//!     → response.rs (any GatewayError → JSON envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{error_response, translate, ErrorEnvelope};
pub use server::{build_router, AppState, GatewayServer, StartupError};
