//! In-memory deployment index.
//!
//! Two maps (by id, by URL path) guarded by one reader/writer lock; every
//! mutation keeps them consistent. A deploy to an occupied path evicts the
//! previous occupant, which is how the control plane repoints a path at a
//! new mock version.

use std::collections::HashMap;
use std::sync::Arc;

use mockd_core::Deployment;
use parking_lot::RwLock;

use crate::wire::DeploymentSummary;

#[derive(Debug, Default)]
struct Maps {
    by_id: HashMap<String, Arc<Deployment>>,
    by_path: HashMap<String, Arc<Deployment>>,
}

/// Shared deployment lookup table.
#[derive(Debug, Default)]
pub struct DeploymentIndex {
    maps: RwLock<Maps>,
}

impl DeploymentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a deployment, evicting any prior deployment at the same URL
    /// path (and any prior deployment with the same id). Returns the
    /// evicted path occupant, if any.
    pub fn insert(&self, deployment: Deployment) -> Option<Arc<Deployment>> {
        let deployment = Arc::new(deployment);
        let mut maps = self.maps.write();

        // same id redeployed elsewhere: drop its old path entry
        if let Some(previous) = maps.by_id.remove(&deployment.id) {
            maps.by_path.remove(&previous.url_path);
        }

        let evicted = maps.by_path.remove(&deployment.url_path);
        if let Some(previous) = &evicted {
            maps.by_id.remove(&previous.id);
        }

        maps.by_id
            .insert(deployment.id.clone(), Arc::clone(&deployment));
        maps.by_path
            .insert(deployment.url_path.clone(), deployment);
        evicted
    }

    /// Remove by deployment id. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> Option<Arc<Deployment>> {
        let mut maps = self.maps.write();
        let removed = maps.by_id.remove(id)?;
        maps.by_path.remove(&removed.url_path);
        Some(removed)
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<Deployment>> {
        self.maps.read().by_id.get(id).cloned()
    }

    pub fn by_path(&self, path: &str) -> Option<Arc<Deployment>> {
        self.maps.read().by_path.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.maps.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.read().by_id.is_empty()
    }

    /// Replace the whole index atomically.
    pub fn replace_all(&self, deployments: Vec<Deployment>) {
        let mut fresh = Maps::default();
        for deployment in deployments {
            let deployment = Arc::new(deployment);
            if let Some(previous) = fresh.by_path.remove(&deployment.url_path) {
                fresh.by_id.remove(&previous.id);
            }
            fresh.by_id.insert(deployment.id.clone(), Arc::clone(&deployment));
            fresh.by_path.insert(deployment.url_path.clone(), deployment);
        }
        *self.maps.write() = fresh;
    }

    /// Snapshot for heartbeat reporting.
    pub fn summaries(&self) -> Vec<DeploymentSummary> {
        let maps = self.maps.read();
        let mut summaries: Vec<DeploymentSummary> = maps
            .by_id
            .values()
            .map(|d| DeploymentSummary {
                mock_id: d.mock_id.clone(),
                version: d.mock_version.clone(),
                path: d.url_path.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.path.cmp(&b.path));
        summaries
    }

    /// Snapshot of full deployments, used when rewriting the cache.
    pub fn all(&self) -> Vec<Arc<Deployment>> {
        self.maps.read().by_id.values().cloned().collect()
    }
}
