//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `jwt.secret`.
pub const JWT_SECRET_ENV: &str = "GATEWAY_JWT_SECRET";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let secret_override = std::env::var(JWT_SECRET_ENV).ok();
    parse_config(&content, secret_override)
}

/// Parse and validate configuration text, applying an optional secret override.
pub fn parse_config(
    content: &str,
    secret_override: Option<String>,
) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content)?;

    if let Some(secret) = secret_override.filter(|s| !s.trim().is_empty()) {
        config.jwt.secret = secret;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
