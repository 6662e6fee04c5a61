//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + GATEWAY_JWT_SECRET
//!     → loader.rs (parse & deserialize, apply env override)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → passed by value into component constructors at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CollisionPolicy, GatewayConfig, JwtConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RegistryConfig, RegistrySource, RoutingConfig, TransportConfig,
};
