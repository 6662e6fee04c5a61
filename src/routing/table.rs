//! Route table derived from a registry snapshot.
//!
//! # Responsibilities
//! - Derive one `RouteEntry` per service name: `{prefix}/{lowercase(name)}/**`
//! - Apply the configured policy when two names lowercase to the same prefix
//! - Resolve a request path to its entry
//!
//! # Design Decisions
//! - `build` is a pure function of (snapshot, prefix, policy)
//! - Snapshot order is sorted, so "first" and "last" are well defined
//! - Tables are immutable; a changed registry produces a new table

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::CollisionPolicy;
use crate::observability::metrics;
use crate::registry::RegistrySnapshot;
use crate::routing::matcher::{split_service_path, ServicePath};

/// One routable service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// e.g. `/api/orders/**`.
    pub path_prefix: String,
    /// Service name exactly as registered.
    pub service: String,
    /// Logical load-balanced target, `lb://{service}`.
    pub target_uri: String,
}

impl RouteEntry {
    pub fn for_service(api_prefix: &str, service: &str) -> Self {
        Self {
            path_prefix: route_prefix(api_prefix, &service.to_lowercase()),
            service: service.to_string(),
            target_uri: format!("lb://{}", service),
        }
    }
}

fn route_prefix(api_prefix: &str, service_key: &str) -> String {
    format!("{}/{}/**", api_prefix, service_key)
}

/// A request path resolved against the table.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub path: ServicePath<'a>,
}

/// Immutable mapping from path prefix to route entry.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    api_prefix: String,
    entries: BTreeMap<String, RouteEntry>,
    generation: u64,
}

impl RouteTable {
    /// Table with no routes, used before the first snapshot arrives.
    pub fn empty(api_prefix: impl Into<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            entries: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Build a table from a snapshot.
    pub fn build(snapshot: &RegistrySnapshot, api_prefix: &str, policy: CollisionPolicy) -> Self {
        let mut entries: BTreeMap<String, RouteEntry> = BTreeMap::new();
        let mut rejected: BTreeSet<String> = BTreeSet::new();

        for name in snapshot.services() {
            let entry = RouteEntry::for_service(api_prefix, name);

            if rejected.contains(&entry.path_prefix) {
                tracing::warn!(prefix = %entry.path_prefix, service = %name, "Dropping service on rejected prefix");
                metrics::record_route_collision();
                continue;
            }

            match entries.entry(entry.path_prefix.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    tracing::warn!(
                        prefix = %slot.key(),
                        existing = %slot.get().service,
                        incoming = %name,
                        policy = ?policy,
                        "Service names collide after lowercasing"
                    );
                    metrics::record_route_collision();
                    match policy {
                        CollisionPolicy::LastWins => {
                            slot.insert(entry);
                        }
                        CollisionPolicy::FirstWins => {}
                        CollisionPolicy::RejectBoth => {
                            rejected.insert(slot.key().clone());
                            slot.remove();
                        }
                    }
                }
            }
        }

        Self {
            api_prefix: api_prefix.to_string(),
            entries,
            generation: snapshot.generation(),
        }
    }

    /// Generation of the snapshot this table was built from; 0 for the empty table.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry registered under an exact prefix such as `/api/orders/**`.
    pub fn get(&self, path_prefix: &str) -> Option<&RouteEntry> {
        self.entries.get(path_prefix)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    /// Resolve a request path to the route that owns it.
    pub fn resolve<'a>(&'a self, path: &'a str) -> Option<RouteMatch<'a>> {
        let service_path = split_service_path(&self.api_prefix, path)?;
        let entry = self
            .entries
            .get(&route_prefix(&self.api_prefix, &service_path.service_key))?;
        Some(RouteMatch {
            entry,
            path: service_path,
        })
    }
}
