use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ArborError, Result};
use crate::storage::StorageAddress;

/// Identity of a storage node: its client endpoint, `host:client_port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageNodeId(pub String);

impl fmt::Display for StorageNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a storage node tells the naming service about itself when it registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNodeInfo {
    pub host: String,
    /// Port clients use for reads and writes.
    pub client_port: u16,
    /// Port the naming service uses for create/delete/copy commands.
    pub command_port: u16,
}

impl StorageNodeInfo {
    pub fn new(host: impl Into<String>, client_port: u16, command_port: u16) -> Self {
        Self {
            host: host.into(),
            client_port,
            command_port,
        }
    }

    pub fn id(&self) -> StorageNodeId {
        StorageNodeId(format!("{}:{}", self.host, self.client_port))
    }

    pub fn command_address(&self) -> StorageAddress {
        StorageAddress::new(self.host.clone(), self.command_port)
    }

    pub fn client_address(&self) -> StorageAddress {
        StorageAddress::new(self.host.clone(), self.client_port)
    }
}

/// Process-wide set of registered storage nodes, kept in registration order.
///
/// The replication controller reads it to pick placement targets; only
/// registration writes to it.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: RwLock<Vec<StorageNodeInfo>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a storage node. A node whose command endpoint is already known is rejected.
    pub fn register(&self, info: StorageNodeInfo) -> Result<StorageNodeId> {
        let mut nodes = self.nodes.write();
        if nodes.iter().any(|n| {
            n.host == info.host
                && (n.command_port == info.command_port || n.client_port == info.client_port)
        }) {
            return Err(ArborError::IllegalState(
                "This storage server is already registered.".to_string(),
            ));
        }
        let id = info.id();
        tracing::info!(
            "Registered storage node {} (command port {})",
            id,
            info.command_port
        );
        nodes.push(info);
        Ok(id)
    }

    /// Identifiers of every registered node, in registration order.
    pub fn known_nodes(&self) -> Vec<StorageNodeId> {
        self.nodes.read().iter().map(StorageNodeInfo::id).collect()
    }

    pub fn get(&self, id: &StorageNodeId) -> Option<StorageNodeInfo> {
        self.nodes.read().iter().find(|n| &n.id() == id).cloned()
    }

    /// Command endpoint of a node, used for storage_* calls.
    pub fn address_of(&self, id: &StorageNodeId) -> Option<StorageAddress> {
        self.get(id).map(|n| n.command_address())
    }

    /// Client endpoint of a node, handed to clients and to copy sources.
    pub fn client_address_of(&self, id: &StorageNodeId) -> Option<StorageAddress> {
        self.get(id).map(|n| n.client_address())
    }

    pub fn first(&self) -> Option<StorageNodeInfo> {
        self.nodes.read().first().cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}
