use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::{ArborError, Result};
use crate::storage::{StorageAddress, StorageClient};
use crate::wire::{
    BooleanReturn, CopyRequest, DataReturn, ExceptionReturn, PathRequest, ReadRequest,
    SizeReturn, WriteRequest,
};

/// Talks to storage nodes over their JSON command endpoints.
pub struct HttpStorageClient {
    client: reqwest::Client,
}

impl HttpStorageClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArborError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn post<B, R>(&self, node: &StorageAddress, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("http://{}:{}/{}", node.host, node.port, endpoint);
        tracing::trace!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ExceptionReturn>().await {
                Ok(exception) => {
                    format!("{}: {}", exception.exception_type, exception.exception_info)
                }
                Err(_) => format!("{} returned {}", endpoint, status),
            };
            return Err(ArborError::Storage {
                node: node.to_string(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }

    async fn post_checked<B>(&self, node: &StorageAddress, endpoint: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let reply: BooleanReturn = self.post(node, endpoint, body).await?;
        if reply.success {
            Ok(())
        } else {
            Err(ArborError::Storage {
                node: node.to_string(),
                message: format!("{} was rejected", endpoint),
            })
        }
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    async fn create_file(&self, node: &StorageAddress, path: &str) -> Result<()> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.post_checked(node, "storage_create", &body).await
    }

    async fn delete_file(&self, node: &StorageAddress, path: &str) -> Result<()> {
        let body = PathRequest {
            path: path.to_string(),
        };
        self.post_checked(node, "storage_delete", &body).await
    }

    async fn read_file(
        &self,
        node: &StorageAddress,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>> {
        let body = ReadRequest {
            path: path.to_string(),
            offset,
            length,
        };
        let reply: DataReturn = self.post(node, "storage_read", &body).await?;
        STANDARD.decode(reply.data).map_err(|e| ArborError::Storage {
            node: node.to_string(),
            message: format!("Invalid base64 payload: {}", e),
        })
    }

    async fn write_file(
        &self,
        node: &StorageAddress,
        path: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<()> {
        let body = WriteRequest {
            path: path.to_string(),
            offset,
            data: STANDARD.encode(data),
        };
        self.post_checked(node, "storage_write", &body).await
    }

    async fn size_of(&self, node: &StorageAddress, path: &str) -> Result<u64> {
        let body = PathRequest {
            path: path.to_string(),
        };
        let reply: SizeReturn = self.post(node, "storage_size", &body).await?;
        Ok(reply.size)
    }

    async fn copy_file(
        &self,
        node: &StorageAddress,
        path: &str,
        source: &StorageAddress,
    ) -> Result<()> {
        let body = CopyRequest {
            path: path.to_string(),
            server_ip: source.host.clone(),
            server_port: source.port,
        };
        self.post_checked(node, "storage_copy", &body).await
    }
}
