use std::sync::Arc;

use crate::config::ReplicationConfig;
use crate::error::{ArborError, Result};
use crate::naming::node::{DirectoryNode, LockMode};
use crate::naming::registry::{Registry, StorageNodeId};
use crate::storage::StorageClient;

/// Read-pressure replication and write-triggered replica teardown.
///
/// Sustained shared access to a file adds one replica per `read_threshold`
/// grants; any exclusive grant collapses the file back to its authoritative
/// copy.
pub struct Replicator {
    registry: Arc<Registry>,
    storage: Arc<dyn StorageClient>,
    read_threshold: u32,
    enabled: bool,
}

impl Replicator {
    pub fn new(
        registry: Arc<Registry>,
        storage: Arc<dyn StorageClient>,
        config: &ReplicationConfig,
    ) -> Self {
        Self {
            registry,
            storage,
            read_threshold: config.get_read_threshold(),
            enabled: config.get_enabled(),
        }
    }

    pub fn read_threshold(&self) -> u32 {
        self.read_threshold
    }

    /// Account for a lock granted on a file and run the matching side effect.
    ///
    /// Failures are logged; they never undo the grant.
    pub(crate) async fn on_leaf_grant(
        &self,
        node: &Arc<DirectoryNode>,
        path: &str,
        mode: LockMode,
    ) {
        if !self.enabled || node.is_directory() {
            return;
        }

        match mode {
            LockMode::Shared => {
                let threshold = self.read_threshold;
                let due = node.with_state(|state| {
                    state.consecutive_reads += 1;
                    if state.consecutive_reads >= threshold {
                        state.consecutive_reads = 0;
                        true
                    } else {
                        false
                    }
                });
                if due {
                    if let Err(e) = self.replicate(node, path).await {
                        tracing::warn!("Replication of '{}' failed: {}", path, e);
                    }
                }
            }
            LockMode::Exclusive => {
                node.with_state(|state| state.consecutive_reads = 0);
                if let Err(e) = self.teardown_replicas(node, path).await {
                    tracing::warn!("Replica teardown for '{}' failed: {}", path, e);
                }
            }
        }
    }

    /// Copy the file to the first known storage node that lacks it.
    ///
    /// Returns the node that received the copy, or `None` when every known
    /// node already holds one or has a copy in flight. The target is claimed
    /// under the node's mutex before the remote call, so concurrent triggers
    /// pick distinct nodes. The replica list only grows once the copy call
    /// has succeeded.
    pub async fn replicate(
        &self,
        node: &Arc<DirectoryNode>,
        path: &str,
    ) -> Result<Option<StorageNodeId>> {
        let known = self.registry.known_nodes();
        let (origin, target) = node.with_state(|state| {
            let origin = state.replicas.first().cloned();
            let target = known
                .into_iter()
                .find(|id| !state.replicas.contains(id) && !state.replicating.contains(id));
            if let (Some(_), Some(target)) = (&origin, &target) {
                state.replicating.push(target.clone());
            }
            (origin, target)
        });

        let Some(origin) = origin else {
            return Err(ArborError::IllegalState(format!(
                "'{}' has no replica to copy from",
                path
            )));
        };
        let Some(target) = target else {
            tracing::debug!("'{}' is already on every known storage node", path);
            return Ok(None);
        };
        let claim = ReplicaClaim {
            node: Arc::clone(node),
            target,
        };

        let destination = self.registry.address_of(&claim.target).ok_or_else(|| {
            ArborError::IllegalState(format!("Storage node {} is not registered", claim.target))
        })?;
        let source = self.registry.client_address_of(&origin).ok_or_else(|| {
            ArborError::IllegalState(format!("Storage node {} is not registered", origin))
        })?;

        tracing::info!("Replicating '{}' from {} to {}", path, origin, claim.target);
        self.storage.copy_file(&destination, path, &source).await?;

        Ok(Some(claim.commit()))
    }

    /// Drop every replica but the authoritative one.
    ///
    /// The list is truncated before the remote deletes go out: a copy that
    /// fails to delete is orphaned on its node but is no longer advertised.
    /// Returns the nodes whose copy was removed from the list.
    pub async fn teardown_replicas(
        &self,
        node: &Arc<DirectoryNode>,
        path: &str,
    ) -> Result<Vec<StorageNodeId>> {
        let stale = node.with_state(|state| {
            if state.replicas.len() > 1 {
                state.replicas.split_off(1)
            } else {
                Vec::new()
            }
        });
        if stale.is_empty() {
            return Ok(stale);
        }

        tracing::info!("Tearing down {} replica(s) of '{}'", stale.len(), path);
        let mut failures = Vec::new();
        for id in &stale {
            let Some(address) = self.registry.address_of(id) else {
                failures.push(format!("{} is not registered", id));
                continue;
            };
            if let Err(e) = self.storage.delete_file(&address, path).await {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(stale)
        } else {
            Err(ArborError::Storage {
                node: stale
                    .iter()
                    .map(|id| id.0.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                message: failures.join("; "),
            })
        }
    }
}

/// A replication target reserved on a file node.
///
/// Dropped without [`ReplicaClaim::commit`] (failed copy, or the `lock`
/// future was cancelled mid-copy), it frees the target for a later trigger.
struct ReplicaClaim {
    node: Arc<DirectoryNode>,
    target: StorageNodeId,
}

impl ReplicaClaim {
    fn commit(self) -> StorageNodeId {
        let target = self.target.clone();
        self.node.with_state(|state| {
            if !state.replicas.contains(&target) {
                state.replicas.push(target.clone());
            }
        });
        target
    }
}

impl Drop for ReplicaClaim {
    fn drop(&mut self) {
        let target = &self.target;
        self.node
            .with_state(|state| state.replicating.retain(|id| id != target));
    }
}
