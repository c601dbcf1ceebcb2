use std::sync::Arc;

use crate::config::ReplicationConfig;
use crate::error::{ArborError, Result};
use crate::naming::node::{DirectoryNode, LockMode};
use crate::naming::path::{is_root, parent_of, sanitize_path};
use crate::naming::registry::{Registry, StorageNodeId, StorageNodeInfo};
use crate::naming::replication::Replicator;
use crate::naming::tree::DirectoryTree;
use crate::storage::StorageClient;

/// Path-oriented operations offered to clients and storage nodes.
///
/// Every entry point sanitizes its path before touching the tree.
pub struct NamingService {
    tree: DirectoryTree,
    registry: Arc<Registry>,
    storage: Arc<dyn StorageClient>,
}

impl NamingService {
    pub fn new(
        registry: Arc<Registry>,
        storage: Arc<dyn StorageClient>,
        replication: &ReplicationConfig,
    ) -> Self {
        let replicator = Replicator::new(Arc::clone(&registry), Arc::clone(&storage), replication);
        let tree = DirectoryTree::new(Arc::clone(&registry), Arc::clone(&storage), replicator);
        Self {
            tree,
            registry,
            storage,
        }
    }

    pub fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn lock(&self, path: &str, exclusive: bool) -> Result<()> {
        let path = sanitize_path(path)?;
        self.tree.lock(&path, LockMode::from_exclusive(exclusive)).await
    }

    pub fn unlock(&self, path: &str, exclusive: bool) -> Result<()> {
        let path = sanitize_path(path)?;
        self.tree.unlock(&path, LockMode::from_exclusive(exclusive))
    }

    /// Look a path up; malformed paths resolve to nothing.
    pub fn find_node(&self, path: &str) -> Option<Arc<DirectoryNode>> {
        let path = sanitize_path(path).ok()?;
        self.tree.find_node(&path)
    }

    /// Insert a path, creating missing ancestors. `false` if it already existed.
    pub async fn add_file(
        &self,
        path: &str,
        is_directory: bool,
        origin: Option<StorageNodeId>,
    ) -> Result<bool> {
        let path = sanitize_path(path)?;
        self.tree.add_node(&path, is_directory, origin).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let path = sanitize_path(path)?;
        self.tree.remove_node(&path).await
    }

    /// Names of a directory's entries, sorted.
    pub fn list_children(&self, path: &str) -> Result<Vec<String>> {
        let path = sanitize_path(path)?;
        let node = self
            .tree
            .find_node(&path)
            .ok_or_else(|| ArborError::NotFound(path.clone()))?;
        if !node.is_directory() {
            return Err(ArborError::NotADirectory(path));
        }
        Ok(node.child_names())
    }

    pub fn is_directory(&self, path: &str) -> Result<bool> {
        let path = sanitize_path(path)?;
        if is_root(&path) {
            return Ok(true);
        }
        self.tree
            .find_node(&path)
            .map(|node| node.is_directory())
            .ok_or(ArborError::NotFound(path))
    }

    /// Whether `path` is well formed, regardless of whether it exists.
    pub fn is_valid_path(&self, path: &str) -> bool {
        sanitize_path(path).is_ok()
    }

    /// Create an empty file on the first registered storage node.
    ///
    /// Returns `false` if the path already exists. If the storage node
    /// refuses the create, the tree entry is rolled back.
    pub async fn create_file(&self, path: &str) -> Result<bool> {
        let Some(primary) = self.registry.first() else {
            return Err(ArborError::IllegalState(
                "No storage servers are registered with the naming server.".to_string(),
            ));
        };
        let path = self.checked_creation_path(path)?;

        if !self.tree.create_node(&path, false, Some(primary.id())).await? {
            return Ok(false);
        }

        if let Err(e) = self
            .storage
            .create_file(&primary.command_address(), &path)
            .await
        {
            tracing::warn!("Storage create for '{}' failed, rolling back: {}", path, e);
            if let Err(rollback) = self.tree.rollback_insert(&path).await {
                tracing::warn!("Rollback of '{}' failed: {}", path, rollback);
            }
            return Err(e);
        }
        Ok(true)
    }

    pub async fn create_directory(&self, path: &str) -> Result<bool> {
        let path = self.checked_creation_path(path)?;
        self.tree.create_node(&path, true, None).await
    }

    fn checked_creation_path(&self, path: &str) -> Result<String> {
        let path = sanitize_path(path)?;
        if is_root(&path) {
            return Err(ArborError::InvalidArgument(
                "The root directory already exists".to_string(),
            ));
        }
        let parent = parent_of(&path);
        match self.tree.find_node(parent) {
            Some(node) if node.is_directory() => Ok(path),
            _ => Err(ArborError::NotFound(parent.to_string())),
        }
    }

    /// The storage node holding the authoritative copy of a file.
    pub fn get_storage(&self, path: &str) -> Result<StorageNodeInfo> {
        let path = sanitize_path(path)?;
        let node = self
            .tree
            .find_node(&path)
            .filter(|node| !node.is_directory())
            .ok_or_else(|| ArborError::NotFound(path.clone()))?;
        let origin = node
            .replicas()
            .into_iter()
            .next()
            .ok_or_else(|| ArborError::IllegalState(format!("'{}' has no replica", path)))?;
        self.registry.get(&origin).ok_or_else(|| {
            ArborError::IllegalState(format!("Storage node {} is not registered", origin))
        })
    }

    /// Register a storage node and adopt the files it advertises.
    ///
    /// Returns the advertised paths the tree already knows; the node must
    /// delete its local copies of those. A lone `"/"` advertises nothing.
    pub async fn register_storage_node(
        &self,
        info: StorageNodeInfo,
        files: &[String],
    ) -> Result<Vec<String>> {
        let id = self.registry.register(info)?;

        let mut duplicates = Vec::new();
        if files.len() == 1 && files[0] == "/" {
            return Ok(duplicates);
        }

        for raw in files {
            let path = match sanitize_path(raw) {
                Ok(path) if !is_root(&path) => path,
                _ => {
                    tracing::warn!("Ignoring invalid path '{}' from {}", raw, id);
                    continue;
                }
            };
            match self.tree.add_node(&path, false, Some(id.clone())).await {
                Ok(true) => {}
                Ok(false) => duplicates.push(raw.clone()),
                Err(e) => {
                    tracing::debug!("'{}' from {} conflicts with the tree: {}", path, id, e);
                    duplicates.push(raw.clone());
                }
            }
        }

        tracing::debug!("Tree after registering {}:\n{}", id, self.tree.dump().join("\n"));
        Ok(duplicates)
    }
}
