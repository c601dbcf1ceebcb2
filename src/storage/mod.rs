pub mod http;

pub use http::HttpStorageClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Network endpoint of a storage node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageAddress {
    pub host: String,
    pub port: u16,
}

impl StorageAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for StorageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Remote operations a storage node exposes to the naming service.
///
/// Calls are not retried; a failure is reported to the caller, which decides
/// whether it is fatal (creation) or best-effort (replication, teardown).
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn create_file(&self, node: &StorageAddress, path: &str) -> Result<()>;

    async fn delete_file(&self, node: &StorageAddress, path: &str) -> Result<()>;

    async fn read_file(
        &self,
        node: &StorageAddress,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>>;

    async fn write_file(
        &self,
        node: &StorageAddress,
        path: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<()>;

    async fn size_of(&self, node: &StorageAddress, path: &str) -> Result<u64>;

    /// Ask `node` to pull a copy of `path` from the storage node at `source`.
    async fn copy_file(
        &self,
        node: &StorageAddress,
        path: &str,
        source: &StorageAddress,
    ) -> Result<()>;
}
