//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Service registry source and cache settings.
    pub registry: RegistryConfig,

    /// Route table derivation settings.
    pub routing: RoutingConfig,

    /// Token verification settings.
    pub jwt: JwtConfig,

    /// Upstream forwarding settings.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where service names come from.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrySource {
    /// Fixed list from `registry.services`.
    #[default]
    Static,
    /// Polled over HTTP from `registry.url`.
    Http,
}

/// Service registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub source: RegistrySource,

    /// Service names for the static source.
    pub services: Vec<String>,

    /// Listing endpoint for the HTTP source.
    pub url: Option<String>,

    /// Maximum snapshot age before a refetch, in seconds.
    pub ttl_secs: u64,

    /// Upper bound on a single registry fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            source: RegistrySource::Static,
            services: Vec::new(),
            url: None,
            ttl_secs: 60,
            fetch_timeout_ms: 3000,
        }
    }
}

/// What to do when two service names lowercase to the same prefix.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The name seen last in snapshot order owns the prefix.
    #[default]
    LastWins,
    /// The name seen first in snapshot order owns the prefix.
    FirstWins,
    /// Neither name is routable.
    RejectBoth,
}

/// Route table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Leading path segment shared by all service routes.
    pub api_prefix: String,

    /// How often the refresher re-checks the registry cache, in seconds.
    pub rebuild_interval_secs: u64,

    pub collision_policy: CollisionPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            rebuild_interval_secs: 5,
            collision_policy: CollisionPolicy::LastWins,
        }
    }
}

/// JWT verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Base64-encoded HMAC secret. Overridden by `GATEWAY_JWT_SECRET`.
    pub secret: String,

    /// Accepted signing algorithms (HMAC family).
    pub algorithms: Vec<String>,

    /// Clock skew tolerance applied to `exp`, in seconds.
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithms: vec!["HS256".to_string()],
            leeway_secs: 0,
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL for a service; `{service}` is replaced by the lowercased name.
    pub upstream_url_template: String,

    /// Total time allowed for one forwarded request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            upstream_url_template: "http://{service}".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [jwt]
            secret = "c2VjcmV0"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.ttl_secs, 60);
        assert_eq!(config.routing.api_prefix, "/api");
        assert_eq!(config.routing.collision_policy, CollisionPolicy::LastWins);
        assert_eq!(config.jwt.algorithms, vec!["HS256".to_string()]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_enums_parse_snake_case() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [registry]
            source = "http"
            url = "http://registry:8761/services"

            [routing]
            collision_policy = "reject_both"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.source, RegistrySource::Http);
        assert_eq!(config.routing.collision_policy, CollisionPolicy::RejectBoth);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
