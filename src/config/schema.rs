use crate::error::{ArborError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_bind: Option<String>,
}

impl ServerConfig {
    pub fn get_bind(&self) -> String {
        self.bind.clone().unwrap_or_else(super::default_bind)
    }

    pub fn get_registration_bind(&self) -> String {
        self.registration_bind
            .clone()
            .unwrap_or_else(super::default_registration_bind)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        parse_addr("server.bind", &self.get_bind())
    }

    pub fn registration_addr(&self) -> Result<SocketAddr> {
        parse_addr("server.registration_bind", &self.get_registration_bind())
    }
}

fn parse_addr(key: &str, value: &str) -> Result<SocketAddr> {
    value.parse().map_err(|e| {
        ArborError::Config(format!("Invalid {} address '{}': {}", key, value, e))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReplicationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ReplicationConfig {
    pub fn get_read_threshold(&self) -> u32 {
        self.read_threshold
            .unwrap_or_else(super::default_read_threshold)
    }

    pub fn get_enabled(&self) -> bool {
        self.enabled
            .unwrap_or_else(super::default_replication_enabled)
    }
}

const MIN_REQUEST_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl StorageConfig {
    pub fn get_request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
            .unwrap_or_else(super::default_request_timeout_ms)
    }

    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_millis(self.get_request_timeout_ms())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.replication.get_read_threshold() == 0 {
        return Err(ArborError::Config(
            "replication.read_threshold must be at least 1".to_string(),
        ));
    }

    let service = config.server.bind_addr()?;
    let registration = config.server.registration_addr()?;
    if service == registration {
        return Err(ArborError::Config(format!(
            "server.bind and server.registration_bind must differ (both are {})",
            service
        )));
    }

    let timeout_ms = config.storage.get_request_timeout_ms();
    if timeout_ms < MIN_REQUEST_TIMEOUT_MS {
        tracing::warn!(
            "storage.request_timeout_ms ({}) is below the recommended minimum of {}ms. \
             Replication calls may time out before a storage node can answer.",
            timeout_ms,
            MIN_REQUEST_TIMEOUT_MS
        );
    }

    Ok(())
}
