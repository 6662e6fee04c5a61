//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceRegistry (static list | HTTP / Eureka)
//!     → cache.rs (TTL check, coalesced refresh, stale-on-failure)
//!     → Arc<RegistrySnapshot> (immutable, generation-tagged)
//!     → routing::refresher (rebuilds the route table on a new generation)
//! ```
//!
//! # Design Decisions
//! - At most one outbound fetch per TTL window under steady load
//! - Registry failures never reach the request path once a snapshot exists

pub mod cache;
pub mod client;

pub use cache::{RegistryCache, RegistrySnapshot};
pub use client::{build_registry, HttpRegistry, RegistryError, ServiceRegistry, StaticRegistry};
