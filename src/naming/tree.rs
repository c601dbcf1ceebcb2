use std::sync::Arc;

use crate::error::{ArborError, Result};
use crate::naming::node::{DirectoryNode, LockMode};
use crate::naming::path::{self, file_name, is_root, parent_of, segments};
use crate::naming::registry::{Registry, StorageNodeId};
use crate::naming::replication::Replicator;
use crate::storage::StorageClient;

/// The naming service's directory tree.
///
/// All paths handed to it must already be sanitized. Structural changes take
/// the root's exclusive lock, which waits for every path lock in flight since
/// each of those holds the root shared.
pub struct DirectoryTree {
    pub(crate) root: Arc<DirectoryNode>,
    pub(crate) replicator: Replicator,
    registry: Arc<Registry>,
    storage: Arc<dyn StorageClient>,
}

impl DirectoryTree {
    pub fn new(
        registry: Arc<Registry>,
        storage: Arc<dyn StorageClient>,
        replicator: Replicator,
    ) -> Self {
        Self {
            root: DirectoryNode::new_root(),
            replicator,
            registry,
            storage,
        }
    }

    pub fn root(&self) -> &Arc<DirectoryNode> {
        &self.root
    }

    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    /// Walk from the root to `path`. The root path resolves to the root itself.
    pub fn find_node(&self, path: &str) -> Option<Arc<DirectoryNode>> {
        self.resolve_chain(path).and_then(|chain| chain.last().cloned())
    }

    /// Every node from the root down to `path`, inclusive.
    pub(crate) fn resolve_chain(&self, path: &str) -> Option<Vec<Arc<DirectoryNode>>> {
        let mut chain = vec![Arc::clone(&self.root)];
        for segment in segments(path) {
            let next = chain.last()?.child(segment)?;
            chain.push(next);
        }
        Some(chain)
    }

    /// Insert `path`, creating any missing ancestors as directories.
    ///
    /// Returns `false` when the path already exists. Files start with
    /// `origin` as their only replica.
    pub async fn add_node(
        &self,
        path: &str,
        is_directory: bool,
        origin: Option<StorageNodeId>,
    ) -> Result<bool> {
        self.insert(path, is_directory, origin, true).await
    }

    /// Insert `path` under an existing parent directory.
    ///
    /// Fails with NotFound when the parent is missing or is a file.
    pub async fn create_node(
        &self,
        path: &str,
        is_directory: bool,
        origin: Option<StorageNodeId>,
    ) -> Result<bool> {
        self.insert(path, is_directory, origin, false).await
    }

    async fn insert(
        &self,
        path: &str,
        is_directory: bool,
        origin: Option<StorageNodeId>,
        create_parents: bool,
    ) -> Result<bool> {
        let Some(name) = file_name(path) else {
            return Err(ArborError::InvalidArgument(
                "The root directory cannot be created".to_string(),
            ));
        };
        let origin = match (is_directory, origin) {
            (true, _) => None,
            (false, Some(origin)) => Some(origin),
            (false, None) => {
                return Err(ArborError::InvalidArgument(format!(
                    "File '{}' needs an originating storage node",
                    path
                )))
            }
        };

        let _structural = self.root.acquire(LockMode::Exclusive).await?;

        let parent_segments = segments(parent_of(path));
        let mut current = Arc::clone(&self.root);
        for segment in parent_segments {
            let next = current.with_state(|state| {
                if !state.is_directory {
                    return Err(ArborError::IllegalState(format!(
                        "'{}' is a file and cannot hold '{}'",
                        current.name(),
                        segment
                    )));
                }
                match state.children.get(segment) {
                    Some(child) => Ok(Some(Arc::clone(child))),
                    None if create_parents => {
                        let child = DirectoryNode::new_directory(segment);
                        state
                            .children
                            .insert(segment.to_string(), Arc::clone(&child));
                        Ok(Some(child))
                    }
                    None => Ok(None),
                }
            })?;
            current = next.ok_or_else(|| ArborError::NotFound(parent_of(path).to_string()))?;
        }

        let inserted = current.with_state(|state| {
            if !state.is_directory {
                return Err(if create_parents {
                    ArborError::IllegalState(format!(
                        "Parent of '{}' is a file, not a directory",
                        path
                    ))
                } else {
                    ArborError::NotFound(parent_of(path).to_string())
                });
            }
            if state.children.contains_key(name) {
                return Ok(false);
            }
            let node = match origin {
                Some(origin) => DirectoryNode::new_file(name, origin),
                None => DirectoryNode::new_directory(name),
            };
            state.children.insert(name.to_string(), node);
            Ok(true)
        })?;

        if inserted {
            tracing::info!(
                "Added {} '{}'",
                if is_directory { "directory" } else { "file" },
                path
            );
        }
        Ok(inserted)
    }

    /// Delete `path` from every storage node holding it, then detach it.
    ///
    /// Remote delete failures are logged and do not keep the node in the tree.
    pub async fn remove_node(&self, path: &str) -> Result<()> {
        if is_root(path) {
            return Err(ArborError::InvalidArgument(
                "The root directory cannot be deleted".to_string(),
            ));
        }

        let _structural = self.root.acquire(LockMode::Exclusive).await?;

        let node = self
            .find_node(path)
            .ok_or_else(|| ArborError::NotFound(path.to_string()))?;

        for holder in collect_holders(&node) {
            let Some(address) = self.registry.address_of(&holder) else {
                tracing::warn!("Cannot delete '{}' from unknown node {}", path, holder);
                continue;
            };
            if let Err(e) = self.storage.delete_file(&address, path).await {
                tracing::warn!("Failed to delete '{}' on {}: {}", path, holder, e);
            }
        }

        self.detach(path)?;
        tracing::info!("Deleted '{}'", path);
        Ok(())
    }

    /// Unlink `path` from its parent without touching storage nodes.
    ///
    /// Callers must hold the root exclusively.
    pub(crate) fn detach(&self, path: &str) -> Result<()> {
        let name = file_name(path).ok_or_else(|| {
            ArborError::InvalidArgument("The root directory cannot be detached".to_string())
        })?;
        let parent = self
            .find_node(parent_of(path))
            .ok_or_else(|| ArborError::NotFound(path.to_string()))?;
        parent
            .with_state(|state| state.children.remove(name))
            .map(|_| ())
            .ok_or_else(|| ArborError::NotFound(path.to_string()))
    }

    /// Remove a node that was just inserted, under the structural lock.
    pub(crate) async fn rollback_insert(&self, path: &str) -> Result<()> {
        let _structural = self.root.acquire(LockMode::Exclusive).await?;
        self.detach(path)
    }

    /// Render the tree as indented lines, for diagnostics.
    pub fn dump(&self) -> Vec<String> {
        let mut lines = vec![path::ROOT.to_string()];
        dump_children(&self.root, 1, &mut lines);
        lines
    }
}

/// Storage nodes holding `node` or any file beneath it, first-seen order.
fn collect_holders(node: &Arc<DirectoryNode>) -> Vec<StorageNodeId> {
    let mut holders: Vec<StorageNodeId> = Vec::new();
    let mut stack = vec![Arc::clone(node)];
    while let Some(current) = stack.pop() {
        current.with_state(|state| {
            if state.is_directory {
                stack.extend(state.children.values().cloned());
            } else {
                for id in &state.replicas {
                    if !holders.contains(id) {
                        holders.push(id.clone());
                    }
                }
            }
        });
    }
    holders
}

fn dump_children(node: &Arc<DirectoryNode>, depth: usize, lines: &mut Vec<String>) {
    let children: Vec<Arc<DirectoryNode>> =
        node.with_state(|state| state.children.values().cloned().collect());
    for child in children {
        let suffix = if child.is_directory() { "/" } else { "" };
        lines.push(format!("{}{}{}", "  ".repeat(depth), child.name(), suffix));
        dump_children(&child, depth + 1, lines);
    }
}
