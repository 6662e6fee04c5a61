//! Publishing route tables and keeping them in step with the registry.
//!
//! # Responsibilities
//! - Hold the live `RouteTable` behind an atomic swap
//! - Periodically consult the registry cache and rebuild on a new snapshot generation
//!
//! # Design Decisions
//! - Readers call `current()` once per request and keep that `Arc` for the whole request
//! - Only the refresher writes; it publishes a complete table in one `store`

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::{CollisionPolicy, RoutingConfig};
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::registry::RegistryCache;
use crate::routing::table::RouteTable;

/// Shared handle to the live route table.
#[derive(Clone)]
pub struct RouteTableHandle {
    inner: Arc<ArcSwap<RouteTable>>,
}

impl RouteTableHandle {
    pub fn new(table: RouteTable) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    /// Consistent view of the table; later publishes do not affect it.
    pub fn current(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }

    pub fn publish(&self, table: RouteTable) {
        metrics::record_route_table_size(table.len());
        self.inner.store(Arc::new(table));
    }
}

/// Background task rebuilding the route table from the registry cache.
pub struct RouteRefresher {
    cache: Arc<RegistryCache>,
    routes: RouteTableHandle,
    api_prefix: String,
    policy: CollisionPolicy,
    interval: Duration,
}

impl RouteRefresher {
    pub fn new(cache: Arc<RegistryCache>, routes: RouteTableHandle, config: &RoutingConfig) -> Self {
        Self {
            cache,
            routes,
            api_prefix: config.api_prefix.clone(),
            policy: config.collision_policy,
            interval: Duration::from_secs(config.rebuild_interval_secs),
        }
    }

    /// Rebuild if the cache holds a snapshot the live table was not built from.
    ///
    /// Returns whether a new table was published.
    pub async fn refresh_once(&self) -> Result<bool, GatewayError> {
        let snapshot = self.cache.get_services().await?;
        if snapshot.generation() == self.routes.current().generation() {
            return Ok(false);
        }

        let table = RouteTable::build(&snapshot, &self.api_prefix, self.policy);
        tracing::info!(
            routes = table.len(),
            generation = table.generation(),
            "Route table rebuilt"
        );
        if table.is_empty() {
            tracing::warn!(generation = table.generation(), "Route table is empty");
        }
        self.routes.publish(table);
        Ok(true)
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Route refresher starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh_once().await {
                        tracing::warn!(error = %e, "Route table refresh skipped");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Route refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
