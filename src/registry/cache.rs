//! TTL-bounded cache of registry snapshots.
//!
//! # Responsibilities
//! - Hand out the current snapshot without touching the registry while it is fresh
//! - Refetch once the snapshot is older than the TTL
//! - Keep serving the last good snapshot when a fetch fails or times out
//!
//! # Design Decisions
//! - Readers load an `Arc` from `ArcSwapOption`; no lock on the read path
//! - One refresh at a time, guarded by an async mutex taken with `try_lock`:
//!   callers that lose the race get the previous snapshot instead of waiting
//! - Only when no snapshot has ever been fetched do callers wait for the in-flight fetch;
//!   if that fetch fails they share its failure instead of fetching again
//! - Snapshots are replaced, never mutated

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RegistryConfig;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::registry::client::{RegistryError, ServiceRegistry};

/// Immutable point-in-time set of service names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    services: BTreeSet<String>,
    fetched_at: Instant,
    generation: u64,
}

impl RegistrySnapshot {
    pub fn new(services: BTreeSet<String>, fetched_at: Instant, generation: u64) -> Self {
        Self {
            services,
            fetched_at,
            generation,
        }
    }

    /// Service names in deterministic (sorted) order.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Increases by one for every successful fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cache shielding the registry from per-request load.
pub struct RegistryCache {
    registry: Arc<dyn ServiceRegistry>,
    ttl: Duration,
    fetch_timeout: Duration,
    current: ArcSwapOption<RegistrySnapshot>,
    refresh: Mutex<()>,
    generation: AtomicU64,
    /// Completed fetches, successful or not.
    attempts: AtomicU64,
    last_failure: ArcSwapOption<String>,
}

impl RegistryCache {
    pub fn new(registry: Arc<dyn ServiceRegistry>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            registry,
            ttl,
            fetch_timeout,
            current: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            last_failure: ArcSwapOption::empty(),
        }
    }

    pub fn from_config(registry: Arc<dyn ServiceRegistry>, config: &RegistryConfig) -> Self {
        Self::new(
            registry,
            Duration::from_secs(config.ttl_secs),
            Duration::from_millis(config.fetch_timeout_ms),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Last stored snapshot, whatever its age. Never touches the registry.
    pub fn peek(&self) -> Option<Arc<RegistrySnapshot>> {
        self.current.load_full()
    }

    /// Current snapshot, refreshing it first if it is missing or expired.
    ///
    /// Fails only when the registry has never produced a snapshot.
    pub async fn get_services(&self) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        let attempts_seen = self.attempts.load(Ordering::SeqCst);
        match self.refresh.try_lock() {
            Ok(_guard) => {
                if let Some(snapshot) = self.fresh() {
                    return Ok(snapshot);
                }
                self.refresh_locked().await
            }
            Err(_) => {
                if let Some(stale) = self.current.load_full() {
                    tracing::trace!(age = ?stale.age(), "Refresh in flight, serving previous snapshot");
                    return Ok(stale);
                }
                let _guard = self.refresh.lock().await;
                if let Some(snapshot) = self.current.load_full() {
                    return Ok(snapshot);
                }
                if self.attempts.load(Ordering::SeqCst) != attempts_seen {
                    return Err(self.unavailable());
                }
                self.refresh_locked().await
            }
        }
    }

    fn fresh(&self) -> Option<Arc<RegistrySnapshot>> {
        self.current
            .load_full()
            .filter(|snapshot| snapshot.age() < self.ttl)
    }

    /// Fetch and publish. Caller must hold `self.refresh`.
    async fn refresh_locked(&self) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        let fetched = self.fetch().await;
        self.attempts.fetch_add(1, Ordering::SeqCst);

        match fetched {
            Ok(services) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let snapshot = Arc::new(RegistrySnapshot::new(services, Instant::now(), generation));
                tracing::debug!(
                    services = snapshot.len(),
                    generation,
                    "Registry snapshot refreshed"
                );
                if snapshot.is_empty() {
                    tracing::warn!(generation, "Registry reported no services");
                }
                metrics::record_registry_fetch("success");
                self.current.store(Some(snapshot.clone()));
                Ok(snapshot)
            }
            Err(e) => {
                metrics::record_registry_fetch(match &e {
                    RegistryError::Timeout(_) => "timeout",
                    _ => "failure",
                });
                match self.current.load_full() {
                    Some(stale) => {
                        tracing::warn!(
                            error = %e,
                            age = ?stale.age(),
                            "Registry fetch failed, serving last good snapshot"
                        );
                        Ok(stale)
                    }
                    None => {
                        tracing::warn!(error = %e, "Registry fetch failed and no snapshot exists");
                        self.last_failure.store(Some(Arc::new(e.to_string())));
                        Err(self.unavailable())
                    }
                }
            }
        }
    }

    fn unavailable(&self) -> GatewayError {
        let detail = self
            .last_failure
            .load_full()
            .map(|e| e.as_str().to_string())
            .unwrap_or_else(|| "registry fetch failed".to_string());
        GatewayError::RegistryUnavailable(detail)
    }

    async fn fetch(&self) -> Result<BTreeSet<String>, RegistryError> {
        tokio::time::timeout(self.fetch_timeout, self.registry.list_service_names())
            .await
            .map_err(|_| RegistryError::Timeout(self.fetch_timeout))?
    }
}
