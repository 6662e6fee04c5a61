//! Service registry clients.
//!
//! # Responsibilities
//! - Define the one call the gateway needs from a registry: list service names
//! - Provide a fixed-list registry and an HTTP-polled registry
//!
//! # Design Decisions
//! - Names are returned as a sorted set so snapshot iteration order is deterministic
//! - The HTTP client accepts a plain JSON array or a Eureka `/apps` document

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{RegistryConfig, RegistrySource};

/// Failure to obtain the service list.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Unavailable(String),

    #[error("registry did not answer within {0:?}")]
    Timeout(Duration),

    #[error("registry returned an unreadable listing: {0}")]
    Decode(String),
}

/// Source of currently registered service names.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn list_service_names(&self) -> Result<BTreeSet<String>, RegistryError>;
}

/// Registry backed by a fixed list.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    names: BTreeSet<String>,
}

impl StaticRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn list_service_names(&self) -> Result<BTreeSet<String>, RegistryError> {
        Ok(self.names.clone())
    }
}

/// Registry polled over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    url: String,
}

impl HttpRegistry {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ServiceRegistry for HttpRegistry {
    async fn list_service_names(&self) -> Result<BTreeSet<String>, RegistryError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Unavailable(format!("registry answered {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        parse_listing(&body)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Names(Vec<String>),
    Eureka { applications: EurekaApplications },
}

#[derive(Deserialize)]
struct EurekaApplications {
    #[serde(default)]
    application: Vec<EurekaApplication>,
}

#[derive(Deserialize)]
struct EurekaApplication {
    name: String,
}

/// Parse a registry listing body into service names.
pub fn parse_listing(body: &[u8]) -> Result<BTreeSet<String>, RegistryError> {
    let listing: Listing =
        serde_json::from_slice(body).map_err(|e| RegistryError::Decode(e.to_string()))?;
    let names = match listing {
        Listing::Names(names) => names,
        Listing::Eureka { applications } => {
            applications.application.into_iter().map(|app| app.name).collect()
        }
    };
    Ok(names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Build the registry client selected by configuration.
pub fn build_registry(config: &RegistryConfig) -> Result<Arc<dyn ServiceRegistry>, RegistryError> {
    match config.source {
        RegistrySource::Static => Ok(Arc::new(StaticRegistry::new(config.services.clone()))),
        RegistrySource::Http => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| RegistryError::Unavailable("registry.url is not set".to_string()))?;
            Ok(Arc::new(HttpRegistry::new(
                url,
                Duration::from_millis(config.fetch_timeout_ms),
            )?))
        }
    }
}
