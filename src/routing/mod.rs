//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (background, refresher.rs):
//!     RegistryCache::get_services()
//!     → new snapshot generation?
//!     → table.rs: one RouteEntry per service, collisions resolved by policy
//!     → publish into RouteTableHandle (atomic swap)
//!
//! Incoming Request (path):
//!     → RouteTableHandle::current() (one load per request)
//!     → matcher.rs (split /api/{service}/rest)
//!     → Return: matched RouteEntry or NoRoute
//! ```
//!
//! # Design Decisions
//! - Tables are immutable; rebuilds replace the whole table
//! - No regex in hot path (prefix split + map lookup)
//! - Deterministic: same snapshot always yields the same table

pub mod matcher;
pub mod refresher;
pub mod table;

pub use refresher::{RouteRefresher, RouteTableHandle};
pub use table::{RouteEntry, RouteMatch, RouteTable};
