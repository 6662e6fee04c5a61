//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (http::server::GatewayServer):
//!     Load config → build verifier, registry, cache, routes → first route build → listen
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → broadcast → server drains, refresher exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: a verifier or registry construction error is fatal at startup
//! - An unreachable registry at startup is not fatal; requests get 503 until it answers

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
