//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, intervals > 0, address parses)
//! - Check the JWT secret and algorithm list are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::auth::verifier::parse_algorithm;
use crate::config::schema::{GatewayConfig, RegistrySource};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.registry.ttl_secs == 0 {
        errors.push(ValidationError::new("registry.ttl_secs", "must be greater than zero"));
    }
    if config.registry.fetch_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "registry.fetch_timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.registry.source == RegistrySource::Http
        && config.registry.url.as_deref().map_or(true, str::is_empty)
    {
        errors.push(ValidationError::new("registry.url", "required when source = \"http\""));
    }

    let prefix = &config.routing.api_prefix;
    if !prefix.starts_with('/') || prefix.ends_with('/') {
        errors.push(ValidationError::new(
            "routing.api_prefix",
            "must start with '/' and must not end with '/'",
        ));
    }
    if config.routing.rebuild_interval_secs == 0 {
        errors.push(ValidationError::new(
            "routing.rebuild_interval_secs",
            "must be greater than zero",
        ));
    }

    if config.jwt.secret.trim().is_empty() {
        errors.push(ValidationError::new("jwt.secret", "must be set"));
    } else if STANDARD.decode(config.jwt.secret.trim()).is_err() {
        errors.push(ValidationError::new("jwt.secret", "is not valid base64"));
    }
    if config.jwt.algorithms.is_empty() {
        errors.push(ValidationError::new("jwt.algorithms", "must list at least one algorithm"));
    }
    for name in &config.jwt.algorithms {
        if parse_algorithm(name).is_none() {
            errors.push(ValidationError::new(
                "jwt.algorithms",
                format!("'{}' is not a supported HMAC algorithm", name),
            ));
        }
    }

    if !config.transport.upstream_url_template.contains("{service}") {
        errors.push(ValidationError::new(
            "transport.upstream_url_template",
            "must contain the {service} placeholder",
        ));
    }
    if config.transport.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transport.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
