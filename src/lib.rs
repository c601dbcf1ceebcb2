pub mod config;
pub mod error;
pub mod naming;
pub mod server;
pub mod storage;
pub mod wire;

pub use config::get_config_path;
pub use config::load_config;
pub use config::save_config;
pub use config::Config;
pub use config::ReplicationConfig;

pub use error::{ArborError, Result};

pub use naming::{LockMode, NamingService, Registry, StorageNodeId, StorageNodeInfo};

pub use storage::{HttpStorageClient, StorageAddress, StorageClient};
