//! Coordinators keyed by server id.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::info;

use crate::coordinator::{RefreshCoordinator, RefreshOutcome};
use crate::error::{ServerError, ServerResult};

/// All configured servers, one coordinator each.
#[derive(Debug, Default)]
pub struct CoordinatorRegistry {
    coordinators: BTreeMap<String, Arc<RefreshCoordinator>>,
}

impl CoordinatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coordinator under its id.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::DuplicateServer`] if the id is taken.
    pub fn insert(&mut self, coordinator: Arc<RefreshCoordinator>) -> ServerResult<()> {
        let id = coordinator.id().to_string();
        if self.coordinators.contains_key(&id) {
            return Err(ServerError::duplicate_server(id));
        }
        self.coordinators.insert(id, coordinator);
        Ok(())
    }

    /// Unregisters and returns the coordinator for `id`.
    pub fn remove(&mut self, id: &str) -> Option<Arc<RefreshCoordinator>> {
        self.coordinators.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<RefreshCoordinator>> {
        self.coordinators.get(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.coordinators.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RefreshCoordinator>> {
        self.coordinators.values()
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }

    /// Forces a refresh of one server, or of every server when `target` is `None`.
    ///
    /// Servers are refreshed concurrently; each still goes through its own
    /// coordinator guard. Outcomes are returned in id order.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownServer`] if `target` is not registered.
    pub async fn refresh(
        &self,
        target: Option<&str>,
    ) -> ServerResult<Vec<(String, RefreshOutcome)>> {
        let selected: Vec<&Arc<RefreshCoordinator>> = match target {
            Some(id) => vec![self.get(id).ok_or_else(|| ServerError::unknown_server(id))?],
            None => self.coordinators.values().collect(),
        };

        info!(servers = selected.len(), "Refreshing EPG on request");
        let outcomes = join_all(selected.into_iter().map(|coordinator| async move {
            (coordinator.id().to_string(), coordinator.force_refresh().await)
        }))
        .await;

        Ok(outcomes)
    }
}
